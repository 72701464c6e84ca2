//! Captured-console-log replay transport.
//!
//! Replays a previously captured console session so an image can be
//! reconstructed offline. Writes go nowhere; any error crossing this
//! boundary is annotated with the byte offset reached in the log, exactly
//! once.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use tracing::trace;

use super::traits::{Transport, TransportError};

pub struct ReplayTransport<R: Read = File> {
    reader: BufReader<R>,
    offset: u64,
}

impl ReplayTransport<File> {
    /// Open a captured console log.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, TransportError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| TransportError::OpenFailed {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Ok(Self::from_reader(file))
    }
}

impl<R: Read> ReplayTransport<R> {
    /// Replay from any byte source; tests use in-memory logs.
    pub fn from_reader(source: R) -> Self {
        Self {
            reader: BufReader::new(source),
            offset: 0,
        }
    }

    /// Byte offset of the next unread log byte, for diagnostics.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    fn annotate(&self, err: TransportError) -> TransportError {
        match err {
            annotated @ TransportError::AtOffset { .. } => annotated,
            other => TransportError::AtOffset {
                offset: self.offset,
                source: Box::new(other),
            },
        }
    }
}

impl<R: Read> Transport for ReplayTransport<R> {
    fn write(&mut self, data: &[u8]) -> Result<usize, TransportError> {
        // Nothing to drive; the log already contains the responses.
        trace!(len = data.len(), "replay write discarded");
        Ok(0)
    }

    fn read(&mut self, max_len: usize) -> Result<Vec<u8>, TransportError> {
        let mut buf = vec![0u8; max_len];
        let n = self
            .reader
            .read(&mut buf)
            .map_err(|e| self.annotate(e.into()))?;
        buf.truncate(n);
        self.offset += n as u64;
        Ok(buf)
    }

    fn read_line(&mut self) -> Result<Vec<u8>, TransportError> {
        let mut line = Vec::new();
        self.reader
            .read_until(b'\n', &mut line)
            .map_err(|e| self.annotate(e.into()))?;
        self.offset += line.len() as u64;
        Ok(line)
    }

    fn is_interactive(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn test_line_reads_advance_offset() {
        let log = b"CFE> dn 0 0 1\r\nsecond line\n";
        let mut replay = ReplayTransport::from_reader(Cursor::new(&log[..]));

        let first = replay.read_line().unwrap();
        assert_eq!(first, b"CFE> dn 0 0 1\r\n");
        assert_eq!(replay.offset(), 15);

        let second = replay.read_line().unwrap();
        assert_eq!(second, b"second line\n");
        assert_eq!(replay.offset(), log.len() as u64);

        // Exhausted: empty line, offset unchanged.
        assert!(replay.read_line().unwrap().is_empty());
        assert_eq!(replay.offset(), log.len() as u64);
    }

    #[test]
    fn test_writes_are_discarded() {
        let mut replay = ReplayTransport::from_reader(Cursor::new(&b"data"[..]));
        assert_eq!(replay.write(b"dn 0 0 1\r\n").unwrap(), 0);
        assert_eq!(replay.read_line().unwrap(), b"data");
    }

    #[test]
    fn test_errors_annotated_once() {
        let replay = ReplayTransport::from_reader(Cursor::new(&b""[..]));
        let plain = TransportError::ReadFailed("boom".into());

        let annotated = replay.annotate(plain);
        let TransportError::AtOffset { offset, ref source } = annotated else {
            panic!("expected offset annotation");
        };
        assert_eq!(offset, 0);
        assert!(matches!(**source, TransportError::ReadFailed(_)));

        // A second pass must not nest another annotation.
        let again = replay.annotate(annotated);
        let TransportError::AtOffset { ref source, .. } = again else {
            panic!("expected offset annotation");
        };
        assert!(matches!(**source, TransportError::ReadFailed(_)));
    }
}
