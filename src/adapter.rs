//! The Just4Trionic adapter: handshake, reader and writer threads, shutdown.
//!
//! Frames flow through two bounded queues. The reader thread owns one half of the serial
//! handle together with the [`LineFramer`] and pushes decoded frames onto the inbound queue,
//! dropping the newest frame when the application falls behind. The writer thread owns the
//! other half and drains the outbound queue; senders block while that queue is full.

use crate::cancel::CancelToken;
use crate::codec::encode_frame;
use crate::config::AdapterConfig;
use crate::handshake::{self, EXIT};
use crate::link::{self, SerialLink};
use crate::parser::LineFramer;
use crate::rate::{resolve_bit_rate, resolve_filter};
use crate::{AdapterError, CanFrame};
use crossbeam_channel::{bounded, select, Receiver, Sender, TrySendError};
use log::*;
use std::io::{ErrorKind, Read, Write};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Display name of the adapter
pub const NAME: &str = "Just4Trionic";

const READ_CHUNK: usize = 64;

/// Pause after the exit command before the handle is released
const EXIT_SETTLE: Duration = Duration::from_millis(10);

/// A CAN interface as seen by the bus layer
pub trait Adapter {
    fn name(&self) -> &'static str;

    /// Open and configure the device, then start moving frames.
    ///
    /// Cancelling `cancel` stops both directions; the adapter still has to be closed.
    fn init(&mut self, cancel: CancelToken) -> Result<(), AdapterError>;

    /// Queue for frames to transmit
    fn sender(&self) -> Sender<CanFrame>;

    /// Queue of frames received from the bus
    fn receiver(&self) -> Receiver<CanFrame>;

    /// Stop the workers, take the adapter out of CAN mode and release the port.
    ///
    /// Calling it again is a no-op.
    fn close(&mut self) -> Result<(), AdapterError>;
}

#[derive(Debug, Default)]
struct Counters {
    dropped: AtomicU64,
    write_failures: AtomicU64,
}

struct Workers {
    reader: JoinHandle<()>,
    writer: JoinHandle<Box<dyn SerialLink>>,
}

pub struct Just4Trionic {
    config: AdapterConfig,
    bit_rate: &'static str,
    filter: &'static str,
    outbound_tx: Sender<CanFrame>,
    outbound_rx: Option<Receiver<CanFrame>>,
    inbound_tx: Option<Sender<CanFrame>>,
    inbound_rx: Receiver<CanFrame>,
    close_tx: Sender<()>,
    close_rx: Receiver<()>,
    closed: Arc<AtomicBool>,
    counters: Arc<Counters>,
    workers: Option<Workers>,
}

impl Just4Trionic {
    /// Resolve the bit-rate and filter commands and set up the queues.
    ///
    /// Fails with [`AdapterError::UnsupportedRate`] before touching any hardware.
    pub fn new(config: AdapterConfig) -> Result<Self, AdapterError> {
        let bit_rate = resolve_bit_rate(config.can_rate)?;
        let filter = resolve_filter(&config.can_filter);
        let (outbound_tx, outbound_rx) = bounded(config.queue_capacity);
        let (inbound_tx, inbound_rx) = bounded(config.queue_capacity);
        let (close_tx, close_rx) = bounded(1);
        Ok(Just4Trionic {
            config,
            bit_rate,
            filter,
            outbound_tx,
            outbound_rx: Some(outbound_rx),
            inbound_tx: Some(inbound_tx),
            inbound_rx,
            close_tx,
            close_rx,
            closed: Arc::new(AtomicBool::new(false)),
            counters: Arc::new(Counters::default()),
            workers: None,
        })
    }

    /// Run the handshake over an already open link and start the workers.
    pub fn init_with_link(
        &mut self,
        mut link: Box<dyn SerialLink>,
        cancel: CancelToken,
    ) -> Result<(), AdapterError> {
        self.check_idle()?;
        let (Some(outbound), Some(inbound)) = (self.outbound_rx.clone(), self.inbound_tx.clone())
        else {
            return Err(AdapterError::Closed);
        };

        handshake::run(
            link.as_mut(),
            self.bit_rate,
            self.filter,
            self.config.settle_delay,
            self.config.debug,
        )?;
        let reader_link = link.try_clone_link().map_err(AdapterError::LinkClone)?;

        let reader = ReadWorker {
            link: reader_link,
            framer: LineFramer::new(self.config.debug),
            inbound,
            closed: self.closed.clone(),
            cancel: cancel.clone(),
            counters: self.counters.clone(),
        };
        let reader = thread::Builder::new()
            .name("j4t-read".into())
            .spawn(move || reader.run())
            .map_err(|e| AdapterError::Spawn("read", e))?;

        let writer = WriteWorker {
            link,
            outbound,
            close: self.close_rx.clone(),
            cancel,
            counters: self.counters.clone(),
            verbose: self.config.debug,
        };
        let writer = match thread::Builder::new()
            .name("j4t-write".into())
            .spawn(move || writer.run())
        {
            Ok(writer) => writer,
            Err(e) => {
                self.closed.store(true, Ordering::Release);
                let _ = reader.join();
                return Err(AdapterError::Spawn("write", e));
            }
        };

        self.workers = Some(Workers { reader, writer });
        info!(
            "{} ready, bit-rate {:?}, filter {:?}",
            NAME, self.bit_rate, self.filter
        );
        Ok(())
    }

    /// Bit-rate command sent during the handshake
    pub fn bit_rate(&self) -> &'static str {
        self.bit_rate
    }

    /// Filter command sent during the handshake, empty when unfiltered
    pub fn filter(&self) -> &'static str {
        self.filter
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Received frames thrown away because the inbound queue was full
    pub fn dropped_frames(&self) -> u64 {
        self.counters.dropped.load(Ordering::Relaxed)
    }

    /// Frames that could not be written to the port
    pub fn write_failures(&self) -> u64 {
        self.counters.write_failures.load(Ordering::Relaxed)
    }

    fn check_idle(&self) -> Result<(), AdapterError> {
        if self.is_closed() {
            return Err(AdapterError::Closed);
        }
        if self.workers.is_some() {
            return Err(AdapterError::AlreadyInitialized);
        }
        Ok(())
    }

    fn stop(&self, workers: Workers) -> Result<(), AdapterError> {
        let _ = self.close_tx.try_send(());
        let result = match workers.writer.join() {
            Ok(mut link) => {
                thread::sleep(self.config.close_settle);
                if let Err(e) = link.write_all(EXIT.as_bytes()).and_then(|_| link.flush()) {
                    warn!("failed to send exit command: {}", e);
                }
                thread::sleep(EXIT_SETTLE);
                Ok(())
            }
            Err(_) => Err(AdapterError::WorkerPanicked("write")),
        };
        match workers.reader.join() {
            Ok(()) => result,
            Err(_) => result.and(Err(AdapterError::WorkerPanicked("read"))),
        }
    }
}

impl Adapter for Just4Trionic {
    fn name(&self) -> &'static str {
        NAME
    }

    fn init(&mut self, cancel: CancelToken) -> Result<(), AdapterError> {
        self.check_idle()?;
        let link = link::open_port(&self.config.port)?;
        self.init_with_link(link, cancel)
    }

    fn sender(&self) -> Sender<CanFrame> {
        self.outbound_tx.clone()
    }

    fn receiver(&self) -> Receiver<CanFrame> {
        self.inbound_rx.clone()
    }

    fn close(&mut self) -> Result<(), AdapterError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        let result = match self.workers.take() {
            Some(workers) => self.stop(workers),
            None => Ok(()),
        };
        // blocked senders fail and receivers drain to the end instead of waiting forever
        self.outbound_rx = None;
        self.inbound_tx = None;
        info!("{} closed", NAME);
        result
    }
}

impl Drop for Just4Trionic {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            error!("failed to close {}: {}", NAME, e);
        }
    }
}

struct ReadWorker {
    link: Box<dyn SerialLink>,
    framer: LineFramer,
    inbound: Sender<CanFrame>,
    closed: Arc<AtomicBool>,
    cancel: CancelToken,
    counters: Arc<Counters>,
}

impl ReadWorker {
    fn run(mut self) {
        let mut buf = [0u8; READ_CHUNK];
        while !self.cancel.is_cancelled() && !self.closed.load(Ordering::Acquire) {
            let n = match self.link.read(&mut buf) {
                Ok(n) => n,
                Err(e)
                    if matches!(
                        e.kind(),
                        ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::Interrupted
                    ) =>
                {
                    continue
                }
                Err(e) => {
                    // closing the port ends a pending read with an error
                    if !self.closed.load(Ordering::Acquire) {
                        error!("failed to read com port: {}", e);
                    }
                    break;
                }
            };
            let inbound = &self.inbound;
            let counters = &self.counters;
            self.framer.feed_chunk(
                &buf[..n],
                |frame| match inbound.try_send(frame) {
                    Ok(()) => {}
                    Err(TrySendError::Full(frame)) => {
                        counters.dropped.fetch_add(1, Ordering::Relaxed);
                        warn!("dropped frame {:03x}: inbound queue full", frame.raw_id());
                    }
                    Err(TrySendError::Disconnected(_)) => {}
                },
                |e, line| {
                    warn!(
                        "failed to decode frame: {} {:?}",
                        e,
                        String::from_utf8_lossy(line)
                    )
                },
            );
        }
        debug!("read worker stopped");
    }
}

struct WriteWorker {
    link: Box<dyn SerialLink>,
    outbound: Receiver<CanFrame>,
    close: Receiver<()>,
    cancel: CancelToken,
    counters: Arc<Counters>,
    verbose: bool,
}

impl WriteWorker {
    /// Returns the link so the exit command can be sent after the last frame.
    fn run(self) -> Box<dyn SerialLink> {
        let WriteWorker {
            mut link,
            outbound,
            close,
            cancel,
            counters,
            verbose,
        } = self;
        let deadline = cancel.deadline();
        loop {
            select! {
                recv(outbound) -> frame => match frame {
                    Ok(frame) => write_frame(link.as_mut(), &frame, verbose, &counters),
                    Err(_) => break,
                },
                recv(close) -> _ => break,
                recv(cancel.receiver()) -> _ => break,
                recv(deadline) -> _ => break,
            }
        }
        debug!("write worker stopped");
        link
    }
}

fn write_frame(link: &mut dyn SerialLink, frame: &CanFrame, verbose: bool, counters: &Counters) {
    let line = encode_frame(frame);
    match link.write_all(line.as_bytes()).and_then(|_| link.flush()) {
        Ok(()) if verbose => info!("{:?}", line),
        Ok(()) => trace!("{:?}", line),
        Err(e) => {
            counters.write_failures.fetch_add(1, Ordering::Relaxed);
            error!("failed to write to com port: {:?}, {}", line, e);
        }
    }
}
