//! Serial port transport layer.
//!
//! Line-oriented reads from a board's USB serial port. The port is closed
//! when the `SerialPort` is dropped.

use anyhow::Result;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio_serial::SerialPortBuilderExt;

use crate::error::SketchError;
use crate::telemetry::{Incoming, LineSource};

/// Longest line kept before it is handed back unterminated.
pub const MAX_LINE_LEN: usize = 4096;

/// Take the next line out of `buf`, if one is complete or `buf` is full.
fn take_line(buf: &mut Vec<u8>) -> Option<String> {
    let line: Vec<u8> = match buf.iter().position(|&b| b == b'\n') {
        Some(pos) => {
            let mut line: Vec<u8> = buf.drain(..=pos).collect();
            line.pop();
            line
        }
        None if buf.len() >= MAX_LINE_LEN => buf.drain(..MAX_LINE_LEN).collect(),
        None => return None,
    };
    Some(String::from_utf8_lossy(&line).trim_end().to_string())
}

/// Serial port connection.
pub struct SerialPort {
    port: tokio_serial::SerialStream,
    read_buf: Vec<u8>,
    idle_timeout: Option<Duration>,
}

impl SerialPort {
    /// Open a serial port connection (8N1, no flow control).
    pub fn open(port_name: &str, baud_rate: u32) -> Result<Self, SketchError> {
        let port = tokio_serial::new(port_name, baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .stop_bits(tokio_serial::StopBits::One)
            .parity(tokio_serial::Parity::None)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|source| SketchError::OpenPort {
                port: port_name.to_string(),
                source,
            })?;

        Ok(Self {
            port,
            read_buf: Vec::with_capacity(4096),
            idle_timeout: None,
        })
    }

    /// Give up waiting for a line after `timeout`.
    pub fn with_idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Read a line from the serial port. `None` on EOF.
    ///
    /// Lines longer than [`MAX_LINE_LEN`] are split at that length.
    pub async fn read_line(&mut self) -> Result<Option<String>> {
        loop {
            // Check if we have a complete (or overlong) line in buffer
            if let Some(line) = take_line(&mut self.read_buf) {
                return Ok(Some(line));
            }

            let mut tmp = [0u8; 256];
            let n = self.port.read(&mut tmp).await?;
            if n == 0 {
                return Ok(None);
            }
            self.read_buf.extend_from_slice(&tmp[..n]);
        }
    }

    /// Read a line with timeout.
    pub async fn read_line_timeout(&mut self, timeout: Duration) -> Result<Option<Option<String>>> {
        match tokio::time::timeout(timeout, self.read_line()).await {
            Ok(Ok(line)) => Ok(Some(line)),
            Ok(Err(e)) => Err(e),
            Err(_) => Ok(None), // Timeout
        }
    }
}

impl LineSource for SerialPort {
    async fn next_line(&mut self) -> Result<Incoming> {
        let line = match self.idle_timeout {
            Some(timeout) => match self.read_line_timeout(timeout).await? {
                Some(line) => line,
                None => return Ok(Incoming::Idle),
            },
            None => self.read_line().await?,
        };
        Ok(line.map_or(Incoming::Closed, Incoming::Line))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_line_complete_lines() {
        let mut buf = b"1 2 3\r\n4 5".to_vec();
        assert_eq!(take_line(&mut buf).as_deref(), Some("1 2 3"));
        assert_eq!(take_line(&mut buf), None);
        assert_eq!(buf, b"4 5");
    }

    #[test]
    fn test_take_line_caps_unterminated_input() {
        let mut buf = vec![b'7'; MAX_LINE_LEN + 10];
        let line = take_line(&mut buf).unwrap();
        assert_eq!(line.len(), MAX_LINE_LEN);
        assert_eq!(buf.len(), 10);
        // an overlong run of digits is not a sample of the expected width
        assert_eq!(crate::telemetry::parse_sample(&line, 2), None);
    }

    #[tokio::test]
    async fn test_open_missing_port_names_device() {
        let err = SerialPort::open("/dev/sketchctl-no-such-port", 9600).err().unwrap();
        assert!(err.to_string().contains("/dev/sketchctl-no-such-port"));
    }
}
