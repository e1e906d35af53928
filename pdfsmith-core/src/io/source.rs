//! Input side: documents that are modified or copied from.

use std::fmt;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Caller-supplied input stream.
pub trait InputStream: Read + Seek + Send {}

impl<T: Read + Seek + Send> InputStream for T {}

/// A readable PDF source.
pub enum InputSource {
    File(PathBuf),
    Bytes(Vec<u8>),
    Stream(Box<dyn InputStream>),
}

impl InputSource {
    pub fn file(path: impl AsRef<Path>) -> Self {
        InputSource::File(path.as_ref().to_path_buf())
    }

    pub fn bytes(bytes: impl Into<Vec<u8>>) -> Self {
        InputSource::Bytes(bytes.into())
    }

    pub fn stream(stream: impl InputStream + 'static) -> Self {
        InputSource::Stream(Box::new(stream))
    }

    /// Total length of the source in bytes.
    pub fn size(&mut self) -> io::Result<u64> {
        match self {
            InputSource::File(path) => Ok(std::fs::metadata(path)?.len()),
            InputSource::Bytes(bytes) => Ok(bytes.len() as u64),
            InputSource::Stream(stream) => {
                let current = stream.stream_position()?;
                let end = stream.seek(SeekFrom::End(0))?;
                stream.seek(SeekFrom::Start(current))?;
                Ok(end)
            }
        }
    }

    /// Load the whole source, from offset 0.
    pub fn read_all(self) -> io::Result<Vec<u8>> {
        match self {
            InputSource::File(path) => std::fs::read(path),
            InputSource::Bytes(bytes) => Ok(bytes),
            InputSource::Stream(mut stream) => {
                stream.seek(SeekFrom::Start(0))?;
                let mut data = Vec::new();
                stream.read_to_end(&mut data)?;
                Ok(data)
            }
        }
    }

    /// Path of a file-backed source.
    pub fn path(&self) -> Option<&Path> {
        match self {
            InputSource::File(path) => Some(path),
            _ => None,
        }
    }

    pub(crate) fn describe(&self) -> String {
        match self {
            InputSource::File(path) => path.display().to_string(),
            InputSource::Bytes(bytes) => format!("<{} bytes>", bytes.len()),
            InputSource::Stream(_) => "<stream>".to_string(),
        }
    }
}

impl fmt::Debug for InputSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InputSource({})", self.describe())
    }
}
