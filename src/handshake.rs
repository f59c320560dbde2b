//! Puts the adapter into CAN mode with the configured filter and bit-rate.

use crate::link::SerialLink;
use crate::AdapterError;
use log::*;
use std::io::Write;
use std::thread;
use std::time::Duration;

/// Empties the adapter's buffer, also takes it out of CAN mode
pub const EXIT: &str = "\x1B";

/// Enter CAN bus mode
pub const OPEN: &str = "O";

/// Send the configuration sequence.
///
/// Commands go out in a fixed order, each terminated with `\r` and followed by `settle`.
/// Input received before the bit-rate command is thrown away so echoes of the earlier commands
/// never reach the framer.
pub fn run(
    link: &mut dyn SerialLink,
    bit_rate: &str,
    filter: &str,
    settle: Duration,
    verbose: bool,
) -> Result<(), AdapterError> {
    if let Err(e) = link.clear_output() {
        warn!("failed to clear output buffer: {}", e);
    }

    let commands = [EXIT, OPEN, filter, bit_rate];
    for (n, command) in commands.iter().enumerate() {
        if n == commands.len() - 1 {
            if let Err(e) = link.clear_input() {
                warn!("failed to clear input buffer: {}", e);
            }
        }
        if verbose {
            info!("sending: {:?}", command);
        } else {
            debug!("sending: {:?}", command);
        }
        let line = format!("{}\r", command);
        link.write_all(line.as_bytes())
            .and_then(|_| link.flush())
            .map_err(AdapterError::LinkWriteFailed)?;
        thread::sleep(settle);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{self, Event};
    use std::io::Read;
    use test_log::test;

    #[test]
    fn command_sequence() {
        let (device, mut link) = mock::pair();
        run(link.as_mut(), "s2", "t5", Duration::ZERO, false).unwrap();
        assert_eq!(
            device.events(),
            vec![
                Event::ClearOutput,
                Event::Write(b"\x1B\r".to_vec()),
                Event::Write(b"O\r".to_vec()),
                Event::Write(b"t5\r".to_vec()),
                Event::ClearInput,
                Event::Write(b"s2\r".to_vec()),
            ]
        );
    }

    #[test]
    fn empty_filter_still_sent() {
        let (device, mut link) = mock::pair();
        run(link.as_mut(), "S6", "", Duration::ZERO, true).unwrap();
        assert_eq!(device.written(), b"\x1B\rO\r\rS6\r".to_vec());
    }

    #[test]
    fn stale_input_dropped_before_bit_rate() {
        let (device, mut link) = mock::pair();
        device.send(b"\x07\rOK\r");
        run(link.as_mut(), "S6", "", Duration::ZERO, false).unwrap();
        let mut buf = [0u8; 8];
        assert_eq!(
            link.read(&mut buf).unwrap_err().kind(),
            std::io::ErrorKind::TimedOut
        );
    }

    #[test]
    fn write_failure_aborts() {
        let (device, mut link) = mock::pair();
        device.fail_writes_from(1);
        let err = run(link.as_mut(), "S6", "f8", Duration::ZERO, false).unwrap_err();
        assert!(matches!(err, AdapterError::LinkWriteFailed(_)));
        assert_eq!(device.written(), b"\x1B\r".to_vec());
    }
}
