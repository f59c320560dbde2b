//! # j4t_can
//!
//! ## Features
//!
//! This crate drives a Just4Trionic CAN adapter over its serial line. The adapter speaks a
//! line oriented ASCII protocol:
//!
//! Commands sent to the adapter are terminated with `\r`:
//! `\x1B` - empty the adapter's buffer / leave CAN mode
//! `O` - enter CAN bus mode
//! `t5`, `f7`, `f8` - hardware filters
//! `S0`..`S8`, `s2` - CAN bit-rate
//!
//! Outgoing frames always carry 8 data bytes on the wire, the length digit tells the adapter
//! how many of them are real:
//! `t<hex id><dlc><16 hex chars>\r`
//!
//! Frames received from the bus arrive as lines starting with `w`, terminated by `\n`:
//! `w<3 hex id><dlc><2 * dlc hex chars>`
//!
//! Any other line coming from the adapter is a status or echo line and is ignored.
//!
//! An example for a received frame:
//! id: 0x5
//! data length: 3
//! data bytes: 0xaa 0xbb 0xcc
//!
//! the bytes to represent this are:
//! w0053aabbcc\n
//!
//! The [`LineFramer`] reassembles lines from arbitrary read chunks with a state machine
//! implemented with the `machine` crate. [`Just4Trionic`] runs the handshake and then a reader
//! and a writer thread that move [`CanFrame`]s between the serial port and two bounded queues.

#[macro_use]
extern crate machine;

pub mod adapter;
pub mod cancel;
pub mod codec;
pub mod config;
pub mod error;
mod hal_02;
pub mod handshake;
pub mod link;
pub mod parser;
pub mod rate;

#[cfg(test)]
mod mock;

pub use crate::adapter::{Adapter, Just4Trionic};
pub use crate::cancel::CancelToken;
pub use crate::config::AdapterConfig;
pub use crate::error::AdapterError;
pub use crate::parser::LineFramer;

use embedded_can::{ErrorKind, ExtendedId, Frame, Id, StandardId};

/// Errors raised while turning adapter lines into frames
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DecodeError {
    /// Identifier field missing or not hexadecimal
    #[error("malformed identifier")]
    MalformedIdentifier,
    /// Length digit or payload characters missing or not hexadecimal
    #[error("malformed payload")]
    MalformedPayload,
    /// Data length not within bounds
    #[error("data length {0} out of range")]
    DataLen(usize),
    /// No line terminator seen before the line buffer filled up
    #[error("line too long")]
    LineTooLong,
}

impl embedded_can::Error for DecodeError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

/// Constrain a usize to values allowed for frame data length [0..8]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FrameDataLen(usize);

impl FrameDataLen {
    /// Create a new `FrameDataLen`
    pub const fn new(value: usize) -> Result<Self, DecodeError> {
        if value <= 8 {
            Ok(Self(value))
        } else {
            Err(DecodeError::DataLen(value))
        }
    }
    /// Get the raw value of the FrameDataLen
    pub const fn raw(&self) -> usize {
        self.0
    }
}

impl TryFrom<usize> for FrameDataLen {
    type Error = DecodeError;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        FrameDataLen::new(value)
    }
}

/// Which way a frame travels relative to the application
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// Received from the bus
    Incoming,
    /// Queued by the application for transmission
    Outgoing,
}

/// A classic CAN frame as carried by the adapter
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct CanFrame {
    id: Id,
    dlc: FrameDataLen,
    data: [u8; 8],
    direction: Direction,
}

impl CanFrame {
    /// an outgoing frame
    pub fn new_frame(can_id: impl Into<Id>, data: &[u8]) -> Result<Self, DecodeError> {
        Self::with_direction(can_id.into(), data, Direction::Outgoing)
    }

    /// an incoming frame
    pub fn incoming(can_id: impl Into<Id>, data: &[u8]) -> Result<Self, DecodeError> {
        Self::with_direction(can_id.into(), data, Direction::Incoming)
    }

    /// Build a frame from a raw identifier.
    ///
    /// Values up to `0x7FF` become standard ids, anything larger that still fits 29 bits is
    /// kept as an extended id.
    pub fn from_raw(raw_id: u32, data: &[u8], direction: Direction) -> Result<Self, DecodeError> {
        let id = match u16::try_from(raw_id).ok().and_then(StandardId::new) {
            Some(std) => Id::Standard(std),
            None => Id::Extended(ExtendedId::new(raw_id).ok_or(DecodeError::MalformedIdentifier)?),
        };
        Self::with_direction(id, data, direction)
    }

    fn with_direction(id: Id, data: &[u8], direction: Direction) -> Result<Self, DecodeError> {
        let mut frame = CanFrame {
            id,
            dlc: FrameDataLen::try_from(data.len())?,
            data: [0; 8],
            direction,
        };
        frame.data[..frame.dlc.raw()].copy_from_slice(data);
        Ok(frame)
    }

    /// The identifier as a plain number
    pub fn raw_id(&self) -> u32 {
        match self.id {
            Id::Standard(std) => std.as_raw() as u32,
            Id::Extended(ext) => ext.as_raw(),
        }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }
}

/// Renders the frame the way it is written to the adapter, without the trailing `\r`.
impl core::fmt::Display for CanFrame {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "t{:x}{}", self.raw_id(), self.dlc.raw())?;
        // the adapter expects all 8 bytes, unused ones are zero
        for byte in self.data.iter() {
            write!(f, "{:02x}", *byte)?;
        }
        Ok(())
    }
}

impl Frame for CanFrame {
    /// Creates a new outgoing frame.
    ///
    /// This will return `None` if the data slice is too long.
    fn new(id: impl Into<Id>, data: &[u8]) -> Option<Self> {
        CanFrame::new_frame(id, data).ok()
    }

    /// Remote frames can not be expressed in the adapter's protocol.
    fn new_remote(_id: impl Into<Id>, _dlc: usize) -> Option<Self> {
        None
    }

    /// Returns true if this frame is a extended frame.
    fn is_extended(&self) -> bool {
        matches!(self.id, Id::Extended(_))
    }

    fn is_remote_frame(&self) -> bool {
        false
    }

    /// Returns the frame identifier.
    fn id(&self) -> Id {
        self.id
    }

    /// Returns the data length code (DLC) which is in the range 0..8.
    fn dlc(&self) -> usize {
        self.dlc.raw()
    }

    /// Returns the frame data (0..8 bytes in length).
    fn data(&self) -> &[u8] {
        &self.data[..self.dlc.raw()]
    }
}
