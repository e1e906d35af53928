//! Byte sinks and sources a session reads from and writes to.

mod sink;
mod source;

pub(crate) use sink::Sink;
pub use sink::{FinishedOutput, OutputStream, OutputTarget};
pub use source::{InputSource, InputStream};
