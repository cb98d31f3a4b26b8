use std::{
    io::{self, Read, Write},
    net::{Shutdown, TcpStream},
    time::Duration,
};

const MIN_WAIT: Duration = Duration::from_millis(1);

/// A connected, reliable, ordered byte stream. Implemented for `TcpStream`;
/// tests substitute in-memory streams that hand out data in small chunks.
pub trait ByteStream: Read + Write + Send {
    /// Blocks until data (or end of stream) is available, or until `timeout`
    /// elapses. Returns whether the stream is readable.
    fn wait_readable(&mut self, timeout: Duration) -> io::Result<bool>;

    fn set_nodelay(&self, _nodelay: bool) -> io::Result<()> {
        Ok(())
    }

    fn shutdown(&self) -> io::Result<()> {
        Ok(())
    }
}

impl ByteStream for TcpStream {
    fn wait_readable(&mut self, timeout: Duration) -> io::Result<bool> {
        // a zero read timeout means "block forever" to the OS
        self.set_read_timeout(Some(timeout.max(MIN_WAIT)))?;
        let mut probe = [0u8; 1];
        let result = self.peek(&mut probe);
        self.set_read_timeout(None)?;
        match result {
            Ok(_) => Ok(true),
            Err(error)
                if matches!(
                    error.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
                ) =>
            {
                Ok(false)
            }
            Err(error) => Err(error),
        }
    }

    fn set_nodelay(&self, nodelay: bool) -> io::Result<()> {
        TcpStream::set_nodelay(self, nodelay)
    }

    fn shutdown(&self) -> io::Result<()> {
        match TcpStream::shutdown(self, Shutdown::Both) {
            Err(error) if error.kind() == io::ErrorKind::NotConnected => Ok(()),
            other => other,
        }
    }
}
