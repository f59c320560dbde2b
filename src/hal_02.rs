use super::*;
use embedded_hal_02::can as hal;

impl hal::Error for DecodeError {
    fn kind(&self) -> hal::ErrorKind {
        hal::ErrorKind::Other
    }
}

fn from_hal_id(val: hal::Id) -> Id {
    match val {
        // note(unsafe) the Id has to be ok, unless it was itself created unsafely
        hal::Id::Standard(si) => Id::Standard(unsafe { StandardId::new_unchecked(si.as_raw()) }),
        // note(unsafe) the Id has to be ok, unless it was itself created unsafely
        hal::Id::Extended(ei) => Id::Extended(unsafe { ExtendedId::new_unchecked(ei.as_raw()) }),
    }
}

impl hal::Frame for CanFrame {
    /// Creates a new outgoing frame.
    ///
    /// This will return `None` if the data slice is too long.
    fn new(id: impl Into<hal::Id>, data: &[u8]) -> Option<Self> {
        CanFrame::new_frame(from_hal_id(id.into()), data).ok()
    }

    /// Remote frames can not be expressed in the adapter's protocol.
    fn new_remote(_id: impl Into<hal::Id>, _dlc: usize) -> Option<Self> {
        None
    }

    /// Returns true if this frame is a extended frame.
    fn is_extended(&self) -> bool {
        Frame::is_extended(self)
    }

    fn is_remote_frame(&self) -> bool {
        false
    }

    /// Returns the frame identifier.
    fn id(&self) -> hal::Id {
        match self.id {
            // note(unsafe) the Id has to be ok as it was checked when creating the frame
            Id::Extended(i) => hal::Id::from(unsafe { hal::ExtendedId::new_unchecked(i.as_raw()) }),
            // note(unsafe) the Id has to be ok, as it was checked when creating the frame
            Id::Standard(i) => hal::Id::from(unsafe { hal::StandardId::new_unchecked(i.as_raw()) }),
        }
    }

    /// Returns the data length code (DLC) which is in the range 0..=8.
    fn dlc(&self) -> usize {
        self.dlc.raw()
    }

    /// Returns the frame data (0..8 bytes in length).
    fn data(&self) -> &[u8] {
        Frame::data(self)
    }
}
