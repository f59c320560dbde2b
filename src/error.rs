//! Errors surfaced to callers of the adapter.
//!
//! Only construction, `init` and `close` return these. Once the workers run, read, write and
//! decode failures are logged instead of returned.

use std::io;

#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    /// The requested bus speed has no bit-rate command on this adapter.
    #[error("unknown rate: {0}")]
    UnsupportedRate(f64),

    /// The serial device could not be opened.
    #[error("failed to open com port {port:?}: {source}")]
    PortOpen {
        port: String,
        #[source]
        source: serialport::Error,
    },

    /// A handshake command could not be written, the port has been closed.
    #[error("failed to write to com port: {0}")]
    LinkWriteFailed(#[source] io::Error),

    /// The serial handle could not be split into a reader and a writer.
    #[error("failed to clone com port handle: {0}")]
    LinkClone(#[source] io::Error),

    /// A worker thread could not be started.
    #[error("failed to spawn {0} worker: {1}")]
    Spawn(&'static str, #[source] io::Error),

    #[error("adapter already initialized")]
    AlreadyInitialized,

    /// The session is terminal once closed.
    #[error("adapter is closed")]
    Closed,

    #[error("{0} worker panicked")]
    WorkerPanicked(&'static str),
}
