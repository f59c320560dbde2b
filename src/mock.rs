//! In-memory serial link for tests.

use crate::link::{SerialLink, READ_TIMEOUT};
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    Write(Vec<u8>),
    ClearInput,
    ClearOutput,
}

#[derive(Debug)]
struct Shared {
    events: Mutex<Vec<Event>>,
    writes: AtomicUsize,
    fail_from_write: AtomicUsize,
    handles: AtomicUsize,
}

/// Device side of the mock, owned by the test
pub struct MockDevice {
    shared: Arc<Shared>,
    feed: Sender<Vec<u8>>,
}

pub struct MockLink {
    shared: Arc<Shared>,
    incoming: Receiver<Vec<u8>>,
    pending: Vec<u8>,
}

pub fn pair() -> (MockDevice, Box<dyn SerialLink>) {
    let (feed, incoming) = unbounded();
    let shared = Arc::new(Shared {
        events: Mutex::new(Vec::new()),
        writes: AtomicUsize::new(0),
        fail_from_write: AtomicUsize::new(usize::MAX),
        handles: AtomicUsize::new(1),
    });
    let link = MockLink {
        shared: shared.clone(),
        incoming,
        pending: Vec::new(),
    };
    (MockDevice { shared, feed }, Box::new(link))
}

impl MockDevice {
    /// Bytes the adapter sends to the host
    pub fn send(&self, bytes: &[u8]) {
        self.feed.send(bytes.to_vec()).unwrap();
    }

    /// Every write call from the host fails starting with the `n`th (0 based)
    pub fn fail_writes_from(&self, n: usize) {
        self.shared.fail_from_write.store(n, Ordering::SeqCst);
    }

    pub fn events(&self) -> Vec<Event> {
        self.shared.events.lock().unwrap().clone()
    }

    /// All bytes written by the host, concatenated
    pub fn written(&self) -> Vec<u8> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Write(bytes) => Some(bytes),
                _ => None,
            })
            .flatten()
            .collect()
    }

    /// Host side handles still alive
    pub fn open_handles(&self) -> usize {
        self.shared.handles.load(Ordering::SeqCst)
    }
}

impl Read for MockLink {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.pending.is_empty() {
            match self.incoming.recv_timeout(READ_TIMEOUT) {
                Ok(chunk) => self.pending = chunk,
                Err(RecvTimeoutError::Timeout) => return Err(io::ErrorKind::TimedOut.into()),
                Err(RecvTimeoutError::Disconnected) => return Err(io::ErrorKind::BrokenPipe.into()),
            }
        }
        let n = buf.len().min(self.pending.len());
        buf[..n].copy_from_slice(&self.pending[..n]);
        self.pending.drain(..n);
        Ok(n)
    }
}

impl Write for MockLink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.shared.writes.fetch_add(1, Ordering::SeqCst);
        if n >= self.shared.fail_from_write.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::Other, "device unplugged"));
        }
        self.shared.events.lock().unwrap().push(Event::Write(buf.to_vec()));
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl SerialLink for MockLink {
    fn clear_input(&mut self) -> io::Result<()> {
        self.pending.clear();
        while self.incoming.try_recv().is_ok() {}
        self.shared.events.lock().unwrap().push(Event::ClearInput);
        Ok(())
    }

    fn clear_output(&mut self) -> io::Result<()> {
        self.shared.events.lock().unwrap().push(Event::ClearOutput);
        Ok(())
    }

    fn try_clone_link(&self) -> io::Result<Box<dyn SerialLink>> {
        self.shared.handles.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockLink {
            shared: self.shared.clone(),
            incoming: self.incoming.clone(),
            pending: Vec::new(),
        }))
    }
}

impl Drop for MockLink {
    fn drop(&mut self) {
        self.shared.handles.fetch_sub(1, Ordering::SeqCst);
    }
}
