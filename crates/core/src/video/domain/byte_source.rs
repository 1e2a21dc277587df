use std::io;

/// Origin of a seek request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Whence {
    /// Offset is absolute from the start of the data.
    Beginning,
    /// Offset is added to the current position.
    Relative,
    /// Offset is relative to the end of the data.
    End,
}

impl Whence {
    /// Maps a C `SEEK_SET` / `SEEK_CUR` / `SEEK_END` value.
    pub fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            0 => Some(Whence::Beginning),
            1 => Some(Whence::Relative),
            2 => Some(Whence::End),
            _ => None,
        }
    }

    pub fn as_raw(self) -> i32 {
        match self {
            Whence::Beginning => 0,
            Whence::Relative => 1,
            Whence::End => 2,
        }
    }
}

/// Pull-based supplier of raw container bytes.
///
/// Implemented by whatever owns the underlying handle: a file, a network
/// stream, or callbacks into a host runtime. The decode session drives it
/// synchronously; any blocking happens inside the implementation.
pub trait ByteSource {
    /// Fills up to `buf.len()` bytes. `Ok(0)` means clean end of data.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Moves the read position. Sources may reject whence values they
    /// cannot honour.
    fn seek(&mut self, offset: i64, whence: Whence) -> io::Result<()>;

    /// Current read position in bytes from the start.
    fn tell(&mut self) -> io::Result<u64>;
}

impl<T: ByteSource + ?Sized> ByteSource for Box<T> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        (**self).read(buf)
    }

    fn seek(&mut self, offset: i64, whence: Whence) -> io::Result<()> {
        (**self).seek(offset, whence)
    }

    fn tell(&mut self) -> io::Result<u64> {
        (**self).tell()
    }
}
