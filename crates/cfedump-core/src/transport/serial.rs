//! Live serial console transport.

use std::io::{Read, Write};
use std::time::Duration;

use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use tracing::{info, trace};

use super::traits::{Transport, TransportError};

/// Serial port transport, 8N1.
pub struct SerialTransport {
    port: Box<dyn SerialPort>,
}

impl SerialTransport {
    /// Open `device` at `baud_rate` with the given read timeout.
    ///
    /// The timeout is the liveness bound for every read the engine makes;
    /// an expired read yields whatever arrived, possibly nothing.
    pub fn open(device: &str, baud_rate: u32, timeout: Duration) -> Result<Self, TransportError> {
        let port = serialport::new(device, baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(timeout)
            .open()
            .map_err(|e| TransportError::OpenFailed {
                path: device.to_string(),
                message: e.to_string(),
            })?;

        info!(device, baud_rate, "opened serial port");
        Ok(Self { port })
    }
}

impl Transport for SerialTransport {
    fn write(&mut self, data: &[u8]) -> Result<usize, TransportError> {
        self.port
            .write_all(data)
            .map_err(|e| TransportError::WriteFailed(e.to_string()))?;
        trace!(len = data.len(), "serial write");
        Ok(data.len())
    }

    fn read(&mut self, max_len: usize) -> Result<Vec<u8>, TransportError> {
        let mut buf = vec![0u8; max_len];
        let n = match self.port.read(&mut buf) {
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => 0,
            Err(e) => return Err(TransportError::ReadFailed(e.to_string())),
        };
        buf.truncate(n);
        Ok(buf)
    }

    fn read_line(&mut self) -> Result<Vec<u8>, TransportError> {
        // The port is unbuffered; collect bytes until the newline or until
        // the line goes quiet.
        let mut line = Vec::new();
        loop {
            let mut byte = [0u8; 1];
            match self.port.read(&mut byte) {
                Ok(0) => break,
                Ok(_) => {
                    line.push(byte[0]);
                    if byte[0] == b'\n' {
                        break;
                    }
                }
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => break,
                Err(e) => return Err(TransportError::ReadFailed(e.to_string())),
            }
        }
        Ok(line)
    }
}
