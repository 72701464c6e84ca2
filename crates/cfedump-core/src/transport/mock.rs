//! Scripted transport for engine tests.

use std::collections::VecDeque;

use super::traits::{Transport, TransportError};

/// Mock console: every write releases the next scripted response into the
/// read buffer, mimicking the request/response rhythm of the real console.
pub struct MockTransport {
    /// Responses released one per write.
    responses: VecDeque<Vec<u8>>,
    /// Bytes currently readable.
    read_buf: VecDeque<u8>,
    /// Captured writes.
    write_log: Vec<Vec<u8>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            responses: VecDeque::new(),
            read_buf: VecDeque::new(),
            write_log: Vec::new(),
        }
    }

    /// Queue the response released by the next unanswered write.
    pub fn queue_response(&mut self, bytes: &[u8]) {
        self.responses.push_back(bytes.to_vec());
    }

    /// Every command the engine sent, in order.
    pub fn writes(&self) -> &[Vec<u8>] {
        &self.write_log
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for MockTransport {
    fn write(&mut self, data: &[u8]) -> Result<usize, TransportError> {
        self.write_log.push(data.to_vec());
        if let Some(response) = self.responses.pop_front() {
            self.read_buf.extend(response);
        }
        Ok(data.len())
    }

    fn read(&mut self, max_len: usize) -> Result<Vec<u8>, TransportError> {
        let n = max_len.min(self.read_buf.len());
        Ok(self.read_buf.drain(..n).collect())
    }

    fn read_line(&mut self) -> Result<Vec<u8>, TransportError> {
        let mut line = Vec::new();
        while let Some(byte) = self.read_buf.pop_front() {
            line.push(byte);
            if byte == b'\n' {
                break;
            }
        }
        Ok(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_released_per_write() {
        let mut mock = MockTransport::new();
        mock.queue_response(b"first\r\n");
        mock.queue_response(b"second\r\n");

        // Nothing readable until a write happens.
        assert!(mock.read(8).unwrap().is_empty());

        mock.write(b"dn 0 0 1\r\n").unwrap();
        assert_eq!(mock.read_line().unwrap(), b"first\r\n");
        assert!(mock.read_line().unwrap().is_empty());

        mock.write(b"dn 0 1 1\r\n").unwrap();
        assert_eq!(mock.read_line().unwrap(), b"second\r\n");
    }

    #[test]
    fn test_write_capture() {
        let mut mock = MockTransport::new();
        mock.write(b"dn 0 0 1\r\n").unwrap();
        mock.write(b"dn 0 1 1\r\n").unwrap();

        assert_eq!(mock.writes().len(), 2);
        assert_eq!(mock.writes()[0], b"dn 0 0 1\r\n");
        assert_eq!(mock.writes()[1], b"dn 0 1 1\r\n");
    }

    #[test]
    fn test_byte_reads() {
        let mut mock = MockTransport::new();
        mock.queue_response(b"CFE>");
        mock.write(b"\r\n").unwrap();

        assert_eq!(mock.read(1).unwrap(), b"C");
        assert_eq!(mock.read(2).unwrap(), b"FE");
        assert_eq!(mock.read(4).unwrap(), b">");
        assert!(mock.read(1).unwrap().is_empty());
    }
}
