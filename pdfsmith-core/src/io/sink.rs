//! Output side of a session: the caller picks a target once, the session
//! owns it until it is handed back as [`FinishedOutput`].

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Cursor, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Caller-supplied output stream.
pub trait OutputStream: Write + Seek + Send {}

impl<T: Write + Seek + Send> OutputStream for T {}

/// Where a document is written.
pub enum OutputTarget {
    /// File on disk; created (truncated) on start, appended to on continue
    File(PathBuf),
    /// In-memory buffer, handed back as bytes
    Memory(Vec<u8>),
    /// Any seekable stream; offsets are its absolute positions
    Stream(Box<dyn OutputStream>),
}

impl OutputTarget {
    pub fn file(path: impl AsRef<Path>) -> Self {
        OutputTarget::File(path.as_ref().to_path_buf())
    }

    pub fn memory() -> Self {
        OutputTarget::Memory(Vec::new())
    }

    pub fn stream(stream: impl OutputStream + 'static) -> Self {
        OutputTarget::Stream(Box::new(stream))
    }

    /// Whether this target is backed by a stream rather than a file path.
    pub fn is_stream(&self) -> bool {
        !matches!(self, OutputTarget::File(_))
    }

    pub(crate) fn describe(&self) -> &'static str {
        if self.is_stream() {
            "stream-backed"
        } else {
            "file-backed"
        }
    }
}

impl fmt::Debug for OutputTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputTarget::File(path) => f.debug_tuple("File").field(path).finish(),
            OutputTarget::Memory(bytes) => write!(f, "Memory({} bytes)", bytes.len()),
            OutputTarget::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// Output handed back when a session ends, is suspended or abandoned.
pub enum FinishedOutput {
    File(PathBuf),
    Memory(Vec<u8>),
    Stream(Box<dyn OutputStream>),
}

impl FinishedOutput {
    /// Bytes of a memory-backed output.
    pub fn into_bytes(self) -> Option<Vec<u8>> {
        match self {
            FinishedOutput::Memory(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Turn the output back into a target, e.g. to continue a suspended
    /// session on it.
    pub fn into_target(self) -> OutputTarget {
        match self {
            FinishedOutput::File(path) => OutputTarget::File(path),
            FinishedOutput::Memory(bytes) => OutputTarget::Memory(bytes),
            FinishedOutput::Stream(stream) => OutputTarget::Stream(stream),
        }
    }
}

impl fmt::Debug for FinishedOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FinishedOutput::File(path) => f.debug_tuple("File").field(path).finish(),
            FinishedOutput::Memory(bytes) => write!(f, "Memory({} bytes)", bytes.len()),
            FinishedOutput::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

enum SinkInner {
    File {
        path: PathBuf,
        writer: BufWriter<File>,
    },
    Memory(Cursor<Vec<u8>>),
    Stream(Box<dyn OutputStream>),
}

/// Write adapter over an [`OutputTarget`] that tracks the absolute byte
/// position, which is what cross-reference offsets are made of.
pub(crate) struct Sink {
    inner: SinkInner,
    position: u64,
}

impl Sink {
    /// Open a target for a brand-new document.
    pub(crate) fn create(target: OutputTarget) -> io::Result<Self> {
        match target {
            OutputTarget::File(path) => {
                let file = File::create(&path)?;
                Ok(Self {
                    inner: SinkInner::File {
                        path,
                        writer: BufWriter::new(file),
                    },
                    position: 0,
                })
            }
            OutputTarget::Memory(mut bytes) => {
                bytes.clear();
                Ok(Self {
                    inner: SinkInner::Memory(Cursor::new(bytes)),
                    position: 0,
                })
            }
            OutputTarget::Stream(mut stream) => {
                let position = stream.stream_position()?;
                Ok(Self {
                    inner: SinkInner::Stream(stream),
                    position,
                })
            }
        }
    }

    /// Open a target positioned at its end, keeping existing bytes.
    pub(crate) fn append(target: OutputTarget) -> io::Result<Self> {
        match target {
            OutputTarget::File(path) => {
                let mut file = OpenOptions::new().write(true).open(&path)?;
                let position = file.seek(SeekFrom::End(0))?;
                Ok(Self {
                    inner: SinkInner::File {
                        path,
                        writer: BufWriter::new(file),
                    },
                    position,
                })
            }
            OutputTarget::Memory(bytes) => {
                let position = bytes.len() as u64;
                let mut cursor = Cursor::new(bytes);
                cursor.set_position(position);
                Ok(Self {
                    inner: SinkInner::Memory(cursor),
                    position,
                })
            }
            OutputTarget::Stream(mut stream) => {
                let position = stream.seek(SeekFrom::End(0))?;
                Ok(Self {
                    inner: SinkInner::Stream(stream),
                    position,
                })
            }
        }
    }

    pub(crate) fn position(&self) -> u64 {
        self.position
    }

    pub(crate) fn finish(mut self) -> io::Result<FinishedOutput> {
        self.flush()?;
        Ok(match self.inner {
            SinkInner::File { path, .. } => FinishedOutput::File(path),
            SinkInner::Memory(cursor) => FinishedOutput::Memory(cursor.into_inner()),
            SinkInner::Stream(stream) => FinishedOutput::Stream(stream),
        })
    }
}

impl Write for Sink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let written = match &mut self.inner {
            SinkInner::File { writer, .. } => writer.write(buf)?,
            SinkInner::Memory(cursor) => cursor.write(buf)?,
            SinkInner::Stream(stream) => stream.write(buf)?,
        };
        self.position += written as u64;
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut self.inner {
            SinkInner::File { writer, .. } => writer.flush(),
            SinkInner::Memory(_) => Ok(()),
            SinkInner::Stream(stream) => stream.flush(),
        }
    }
}
