//! # pdfsmith
//!
//! Incremental PDF construction in pure Rust. A document is written object
//! by object to a file, a memory buffer or any seekable stream, and a
//! session can be suspended to disk and continued later, even in another
//! process.
//!
//! ## Features
//!
//! - **Suspendable sessions**: `suspend` saves the writer state next to the
//!   partial output, `continue_pdf` picks it up again
//! - **Pausable content streams**: a page's content can be interrupted and
//!   resumed; each pause closes a complete content stream segment
//! - **Image embedding**: JPEG (pass-through), TIFF (decoded, with alpha as
//!   soft mask) and PDF pages, each embedded once per document
//! - **Page copying**: append pages of other PDFs, or draw them as form
//!   XObjects onto new pages
//! - **Incremental updates**: add pages to an existing PDF without touching
//!   its bytes
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdfsmith::{
//!     CreationSettings, DocumentDriver, Font, ImagePlacement, LogConfig, OutputTarget,
//!     PdfVersion, Rectangle, Result,
//! };
//!
//! # fn main() -> Result<()> {
//! let mut driver = DocumentDriver::new();
//! driver.start_pdf(
//!     OutputTarget::file("out.pdf"),
//!     PdfVersion::V1_7,
//!     LogConfig::disabled(),
//!     CreationSettings::default(),
//! )?;
//!
//! let page = driver.create_page(Rectangle::a4())?;
//! let handle = driver.start_page_content_context(page)?;
//! driver
//!     .content(handle)?
//!     .text_at(Font::Helvetica, 24.0, 72.0, 750.0, "Hello, PDF!")?
//!     .draw_image("photo.jpg", 0, 72.0, 400.0, ImagePlacement::Scale(0.5, 0.5))?;
//! driver.write_page(page)?;
//!
//! driver.end()?;
//! # Ok(())
//! # }
//! ```
//!
//! ### Suspending and continuing
//!
//! ```rust,no_run
//! use pdfsmith::{CreationSettings, DocumentDriver, LogConfig, OutputTarget, PdfVersion, Result};
//!
//! # fn main() -> Result<()> {
//! let mut driver = DocumentDriver::new();
//! driver.start_pdf(
//!     OutputTarget::file("big.pdf"),
//!     PdfVersion::V1_7,
//!     LogConfig::default(),
//!     CreationSettings::default(),
//! )?;
//! // ... first batch of pages ...
//! driver.suspend("big.pdf.state")?;
//!
//! // Later
//! let mut driver = DocumentDriver::new();
//! driver.continue_pdf(
//!     OutputTarget::file("big.pdf"),
//!     "big.pdf.state",
//!     None,
//!     LogConfig::default(),
//! )?;
//! // ... more pages ...
//! driver.end()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`session`] - `DocumentDriver` and the session lifecycle
//! - [`content`] - page and form content streams
//! - [`resources`] - image identity, detection and the resource cache
//! - [`operations`] - page ranges and copying from other documents
//! - [`parser`] - reading existing PDFs
//! - [`writer`] - object serialization and the cross-reference section
//! - [`io`] - output targets and input sources

pub mod compression;
pub mod content;
pub mod error;
pub mod geometry;
pub mod graphics;
pub mod io;
pub mod objects;
pub mod operations;
pub mod parser;
pub mod resources;
pub mod session;
pub mod text;
pub mod writer;

pub use content::{ContentContext, ContentHandle, ContentState, FormHandle, PageId};
pub use error::{ErrorKind, PdfError, Result};
pub use geometry::{Point, Rectangle};
pub use graphics::Color;
pub use io::{FinishedOutput, InputSource, InputStream, OutputStream, OutputTarget};
pub use objects::{Dictionary, Object, ObjectId};
pub use operations::PageRange;
pub use parser::{PdfReader, PdfVersion};
pub use resources::{ImageDimensions, ImageKey, ImagePlacement, ImageType};
pub use session::{
    CopyingContextId, CreationSettings, DocumentDriver, DocumentMetadata, LogConfig, Phase,
};
pub use text::Font;

/// Current version of pdfsmith
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
