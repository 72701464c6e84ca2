//! Console link abstraction.
//!
//! Defines the `Transport` trait over the character-oriented link, allowing
//! different backings (live serial port, captured-log replay, scripted mock).

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("failed to open {path}: {message}")]
    OpenFailed { path: String, message: String },

    #[error("write failed: {0}")]
    WriteFailed(String),

    #[error("read failed: {0}")]
    ReadFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Replay-mode annotation carrying the log position of the failure.
    #[error("{source} (at byte offset {offset} in replay log)")]
    AtOffset {
        offset: u64,
        #[source]
        source: Box<TransportError>,
    },
}

/// Abstract console link.
///
/// The engine only ever writes a command string and reads either raw bytes
/// or one line at a time; no seeking, no random access.
pub trait Transport {
    /// Write raw bytes to the console.
    fn write(&mut self, data: &[u8]) -> Result<usize, TransportError>;

    /// Read up to `max_len` raw bytes. A timeout or EOF yields fewer bytes,
    /// possibly none; neither is an error.
    fn read(&mut self, max_len: usize) -> Result<Vec<u8>, TransportError>;

    /// Read one line, up to and including its terminator. Empty on EOF.
    fn read_line(&mut self) -> Result<Vec<u8>, TransportError>;

    /// Whether the far end reacts to what we write. Replayed logs do not:
    /// they get no prompt synchronization and no junk draining.
    fn is_interactive(&self) -> bool {
        true
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn write(&mut self, data: &[u8]) -> Result<usize, TransportError> {
        (**self).write(data)
    }

    fn read(&mut self, max_len: usize) -> Result<Vec<u8>, TransportError> {
        (**self).read(max_len)
    }

    fn read_line(&mut self) -> Result<Vec<u8>, TransportError> {
        (**self).read_line()
    }

    fn is_interactive(&self) -> bool {
        (**self).is_interactive()
    }
}
