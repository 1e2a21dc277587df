use std::fs::File;
use std::io::{self, Cursor, Read, Seek, SeekFrom};
use std::path::Path;

use crate::video::domain::byte_source::{ByteSource, Whence};

/// [`ByteSource`] over any std reader: files, in-memory buffers, pipes
/// wrapped in a seekable buffer.
pub struct ReaderSource<R> {
    inner: R,
}

impl<R: Read + Seek> ReaderSource<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl ReaderSource<File> {
    pub fn open(path: &Path) -> io::Result<Self> {
        Ok(Self::new(File::open(path)?))
    }
}

impl ReaderSource<Cursor<Vec<u8>>> {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self::new(Cursor::new(bytes))
    }
}

impl<R: Read + Seek> ByteSource for ReaderSource<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            match self.inner.read(buf) {
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                result => return result,
            }
        }
    }

    fn seek(&mut self, offset: i64, whence: Whence) -> io::Result<()> {
        let target = match whence {
            Whence::Beginning => SeekFrom::Start(offset.max(0) as u64),
            Whence::Relative => SeekFrom::Current(offset),
            Whence::End => SeekFrom::End(offset),
        };
        self.inner.seek(target)?;
        Ok(())
    }

    fn tell(&mut self) -> io::Result<u64> {
        self.inner.stream_position()
    }
}

/// [`ByteSource`] backed by three host-supplied closures.
///
/// Mirrors how an embedding runtime hands over its own read / seek / tell
/// callbacks. `read` returns the number of bytes written (0 at end of data,
/// negative on failure), `seek` returns whether it succeeded and `tell`
/// returns the position or a negative value on failure.
pub struct CallbackSource<R, S, T> {
    read: R,
    seek: S,
    tell: T,
}

impl<R, S, T> CallbackSource<R, S, T>
where
    R: FnMut(&mut [u8]) -> i64,
    S: FnMut(i64, Whence) -> bool,
    T: FnMut() -> i64,
{
    pub fn new(read: R, seek: S, tell: T) -> Self {
        Self { read, seek, tell }
    }
}

impl<R, S, T> ByteSource for CallbackSource<R, S, T>
where
    R: FnMut(&mut [u8]) -> i64,
    S: FnMut(i64, Whence) -> bool,
    T: FnMut() -> i64,
{
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = (self.read)(buf);
        if n < 0 {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                format!("read callback failed ({n})"),
            ));
        }
        Ok((n as usize).min(buf.len()))
    }

    fn seek(&mut self, offset: i64, whence: Whence) -> io::Result<()> {
        if (self.seek)(offset, whence) {
            Ok(())
        } else {
            Err(io::Error::new(
                io::ErrorKind::Other,
                format!("seek callback rejected {offset} ({whence:?})"),
            ))
        }
    }

    fn tell(&mut self) -> io::Result<u64> {
        let position = (self.tell)();
        u64::try_from(position).map_err(|_| {
            io::Error::new(
                io::ErrorKind::Other,
                format!("tell callback failed ({position})"),
            )
        })
    }
}
