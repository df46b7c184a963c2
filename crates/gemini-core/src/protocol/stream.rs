//! Byte-stream transports
//!
//! The protocol engine only needs a duplex byte stream that can report how
//! many bytes are waiting. Deadlines are handled by polling, so the stream
//! itself never has to block for long.

use serialport::SerialPort;
use std::io::{self, Read, Write};

/// Abstraction for the link to the drive
pub trait Transport: Read + Write + Send {
    /// Clear input buffers
    fn clear_input_buffer(&mut self) -> io::Result<()>;

    /// Get number of bytes available to read without blocking
    fn bytes_to_read(&mut self) -> io::Result<u32>;

    /// Read whatever is currently buffered, never blocking
    fn read_available(&mut self) -> io::Result<Vec<u8>> {
        let available = self.bytes_to_read()? as usize;
        if available == 0 {
            return Ok(Vec::new());
        }

        let mut buf = vec![0u8; available];
        let mut filled = 0;
        while filled < available {
            match self.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(ref e)
                    if e.kind() == io::ErrorKind::TimedOut
                        || e.kind() == io::ErrorKind::WouldBlock =>
                {
                    break
                }
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        buf.truncate(filled);
        Ok(buf)
    }

    /// Throw away anything left over from earlier exchanges
    fn discard_input(&mut self) -> io::Result<usize> {
        Ok(self.read_available()?.len())
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn clear_input_buffer(&mut self) -> io::Result<()> {
        (**self).clear_input_buffer()
    }

    fn bytes_to_read(&mut self) -> io::Result<u32> {
        (**self).bytes_to_read()
    }

    fn read_available(&mut self) -> io::Result<Vec<u8>> {
        (**self).read_available()
    }
}

/// Serial port wrapper implementing Transport
pub struct SerialChannel {
    port: Box<dyn SerialPort>,
}

impl SerialChannel {
    /// Wrap a port opened with [`open_port`](super::open_port)
    pub fn new(port: Box<dyn SerialPort>) -> Self {
        Self { port }
    }
}

impl Read for SerialChannel {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.port.read(buf)
    }
}

impl Write for SerialChannel {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.port.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.port.flush()
    }
}

impl Transport for SerialChannel {
    fn clear_input_buffer(&mut self) -> io::Result<()> {
        self.port
            .clear(serialport::ClearBuffer::Input)
            .map_err(io::Error::other)
    }

    fn bytes_to_read(&mut self) -> io::Result<u32> {
        self.port.bytes_to_read().map_err(io::Error::other)
    }
}
