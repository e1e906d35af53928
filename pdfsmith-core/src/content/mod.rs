//! Page and form content streams that can be paused and resumed.
//!
//! Drawing operations are buffered per page. Pausing a page writes the
//! buffer out as one complete content stream object and records its id;
//! the page dictionary written by `write_page` lists every segment in call
//! order, so readers see a single logical stream.

mod annotation;
mod context;
mod page;

pub(crate) use annotation::UriLink;
pub use context::ContentContext;
pub(crate) use context::Target;
pub(crate) use page::{ContentManager, ResourceNames};

use serde::{Deserialize, Serialize};

/// A page created in the current document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PageId(pub(crate) usize);

impl PageId {
    /// Position of the page among all pages created in the document
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Token for an open (or paused) page content stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHandle {
    pub(crate) page: PageId,
}

impl ContentHandle {
    pub fn page(&self) -> PageId {
        self.page
    }
}

/// A form XObject under construction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FormHandle(pub(crate) usize);

/// Content stream state of a page or form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentState {
    /// No content context started yet
    Idle,
    Open,
    /// Buffered operations written out, can be reopened
    Paused,
    /// Page or form written; no further content
    Closed,
}
