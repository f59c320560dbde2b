use crate::codec::decode_frame;
use crate::CanFrame;
use crate::DecodeError;
use heapless::Vec;
use log::*;

/// Longest line kept before the framer gives up and waits for the next line feed.
pub const MAX_LINE_LEN: usize = 64;

/// Tag byte of a frame line
const FRAME_TAG: u8 = b'w';

// Define the machine states
machine!(
    #[derive(Clone, Debug, PartialEq)]
    enum LineState {
        Idle,
        Collecting,
        LineReady,
        Discarding,
    }
);

/// The state transition types
#[derive(Clone, Debug, PartialEq)]
pub struct Advance {
    byte: u8,
}

// the allowed state, transition pairs
transitions!(LineState,
             [
                 (Idle, Advance) => [Idle, Collecting],
                 (Collecting, Advance) => [Collecting, LineReady],
                 (LineReady, Advance) => [Idle, Collecting],
                 (Discarding, Advance) => [Discarding, Idle]
             ]
);

// additional methods to add to the state for inspecting it
methods!(LineState,
         [
             Collecting => fn collects_byte(&self) -> bool,
             LineReady => fn has_line(&self) -> bool
         ]
);

/// nothing buffered, bare terminators are dropped
impl Idle {
    pub fn on_advance(self, input: Advance) -> LineState {
        match input.byte {
            b'\r' | b'\n' => LineState::idle(),
            _ => LineState::collecting(),
        }
    }
}

/// inside a line, anything but a line feed belongs to it
impl Collecting {
    pub fn on_advance(self, input: Advance) -> LineState {
        match input.byte {
            b'\n' => LineState::line_ready(),
            _ => LineState::collecting(),
        }
    }

    pub fn collects_byte(&self) -> bool {
        true
    }
}

/// a line was just handed out, the next byte starts over
impl LineReady {
    pub fn on_advance(self, input: Advance) -> LineState {
        Idle {}.on_advance(input)
    }

    pub fn has_line(&self) -> bool {
        true
    }
}

/// line overflowed, skip to the next line feed
impl Discarding {
    pub fn on_advance(self, input: Advance) -> LineState {
        match input.byte {
            b'\n' => LineState::idle(),
            _ => LineState::discarding(),
        }
    }
}

/// Reassembles adapter lines from a byte stream and decodes the frame lines
#[derive(Debug)]
pub struct LineFramer {
    state: LineState,
    line: Vec<u8, MAX_LINE_LEN>,
    verbose: bool,
}

impl Default for LineFramer {
    fn default() -> Self {
        Self::new(false)
    }
}

impl LineFramer {
    /// Create a new framer, `verbose` logs status lines at info level
    pub fn new(verbose: bool) -> Self {
        LineFramer {
            state: LineState::idle(),
            line: Vec::new(),
            verbose,
        }
    }

    /// framer that works incrementally
    ///
    /// If the byte completes a frame line, that frame is returned, otherwise the ok result is
    /// None. Decode errors are returned for the offending line only, the framer keeps working
    /// with the next line.
    pub fn feed(&mut self, byte: u8) -> Result<Option<CanFrame>, DecodeError> {
        self.state = self.state.clone().on_advance(Advance { byte });
        if self.state.collects_byte().is_some() {
            if self.line.push(byte).is_err() {
                warn!("line exceeds {} bytes, resyncing", MAX_LINE_LEN);
                self.line.clear();
                self.state = LineState::discarding();
                return Err(DecodeError::LineTooLong);
            }
            Ok(None)
        } else if self.state.has_line().is_some() {
            let result = self.dispatch();
            self.line.clear();
            result
        } else {
            Ok(None)
        }
    }

    /// Feed a whole read chunk, handing decoded frames and decode errors to the callbacks in
    /// stream order.
    pub fn feed_chunk(
        &mut self,
        chunk: &[u8],
        mut on_frame: impl FnMut(CanFrame),
        mut on_error: impl FnMut(DecodeError, &[u8]),
    ) {
        for byte in chunk {
            // keep a copy of the line for the error report, dispatch clears it
            let pending = if *byte == b'\n' { self.line.clone() } else { Vec::new() };
            match self.feed(*byte) {
                Ok(Some(frame)) => on_frame(frame),
                Ok(None) => {}
                Err(e) => on_error(e, &pending[..]),
            }
        }
    }

    fn dispatch(&self) -> Result<Option<CanFrame>, DecodeError> {
        let mut line: &[u8] = &self.line;
        while let [rest @ .., b'\r'] = line {
            line = rest;
        }
        match line.split_first() {
            Some((&FRAME_TAG, body)) => decode_frame(body).map(Some),
            Some(_) => {
                if self.verbose {
                    info!("COM>> {:?}", String::from_utf8_lossy(line));
                } else {
                    debug!("COM>> {:?}", String::from_utf8_lossy(line));
                }
                Ok(None)
            }
            None => Ok(None),
        }
    }
}
