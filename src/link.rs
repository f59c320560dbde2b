//! The serial connection to the adapter.

use crate::AdapterError;
use serialport::{ClearBuffer, DataBits, Parity, SerialPort, StopBits};
use std::io::{self, Read, Write};
use std::time::Duration;

/// Serial speed of the adapter's USB-serial bridge
pub const BAUD_RATE: u32 = 115_200;

/// Read timeout; bounds how long the reader takes to notice a close or cancel
pub const READ_TIMEOUT: Duration = Duration::from_millis(1);

/// A byte stream to the adapter that can be split into a reading and a writing half.
pub trait SerialLink: Read + Write + Send {
    /// Discard bytes received but not yet read
    fn clear_input(&mut self) -> io::Result<()>;

    /// Discard bytes written but not yet transmitted
    fn clear_output(&mut self) -> io::Result<()>;

    /// Another handle to the same device
    fn try_clone_link(&self) -> io::Result<Box<dyn SerialLink>>;
}

impl SerialLink for Box<dyn SerialPort> {
    fn clear_input(&mut self) -> io::Result<()> {
        self.clear(ClearBuffer::Input).map_err(io::Error::from)
    }

    fn clear_output(&mut self) -> io::Result<()> {
        self.clear(ClearBuffer::Output).map_err(io::Error::from)
    }

    fn try_clone_link(&self) -> io::Result<Box<dyn SerialLink>> {
        let port = self.try_clone().map_err(io::Error::from)?;
        Ok(Box::new(port))
    }
}

/// Open the adapter's serial port with 8N1 framing
pub fn open_port(path: &str) -> Result<Box<dyn SerialLink>, AdapterError> {
    let port = serialport::new(path, BAUD_RATE)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .timeout(READ_TIMEOUT)
        .open()
        .map_err(|source| AdapterError::PortOpen {
            port: path.to_string(),
            source,
        })?;
    Ok(Box::new(port))
}
