use crate::parser::ParseError;
use std::path::PathBuf;
use thiserror::Error;

/// Broad classification of a [`PdfError`].
///
/// Callers that only need to decide "retry, discard output, or fix the
/// caller" can match on the kind instead of every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Operation issued in the wrong session phase or on a closed handle
    Lifecycle,
    /// Sink or source I/O failure
    Io,
    /// Saved session state is missing, corrupt or incompatible
    State,
    /// Unsupported or undecodable resource or source document
    Resource,
    /// Programming error on the caller side; the session is poisoned
    ContractViolation,
}

#[derive(Error, Debug)]
pub enum PdfError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("A document session is already in progress")]
    AlreadyStarted,

    #[error("No document session has been started")]
    NotStarted,

    #[error("The document session is closed")]
    SessionClosed,

    #[error("Content stream of {0} is still open; pause or write it first")]
    IncompleteContentStream(String),

    #[error("Content handle for page {0} is closed")]
    HandleClosed(usize),

    #[error("Unknown page handle: {0}")]
    UnknownPage(usize),

    #[error("Unknown form handle: {0}")]
    UnknownForm(usize),

    #[error("Unknown or ended copying context: {0}")]
    UnknownCopyingContext(usize),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Saved state not found: {}", .0.display())]
    StateNotFound(PathBuf),

    #[error("Saved state is corrupt: {0}")]
    StateCorrupt(String),

    #[error("Saved state format version {found} is not supported (expected {expected})")]
    VersionMismatch { found: u32, expected: u32 },

    #[error("Saved state was produced by a {recorded} session, cannot continue on a {supplied} target")]
    TargetMismatch {
        recorded: &'static str,
        supplied: &'static str,
    },

    #[error("Unsupported image format for {0}")]
    UnsupportedImageFormat(String),

    #[error("Decode error: {0}")]
    DecodeError(String),

    #[error("Unsupported source document: {0}")]
    UnsupportedSource(String),

    #[error("Source document unreadable: {0}")]
    SourceUnreadable(String),

    #[error("Page index {index} out of range (source has {count} pages)")]
    PageIndexOutOfRange { index: usize, count: usize },

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Object id {found} does not match the reservation for {key} (expected {expected:?})")]
    IdentifierMismatch {
        key: String,
        expected: Option<u32>,
        found: u32,
    },

    #[error("Image {0} has already been embedded")]
    ImageAlreadyEmbedded(String),

    #[error("Page {0} already has an open content stream")]
    PageAlreadyOpen(usize),

    #[error("Object {0} has already been written")]
    ObjectAlreadyWritten(u32),

    #[error("Session refused further work after a contract violation")]
    SessionPoisoned,
}

impl PdfError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            PdfError::AlreadyStarted
            | PdfError::NotStarted
            | PdfError::SessionClosed
            | PdfError::IncompleteContentStream(_)
            | PdfError::HandleClosed(_)
            | PdfError::UnknownPage(_)
            | PdfError::UnknownForm(_)
            | PdfError::UnknownCopyingContext(_)
            | PdfError::InvalidArgument(_) => ErrorKind::Lifecycle,
            PdfError::Io(_) => ErrorKind::Io,
            PdfError::StateNotFound(_)
            | PdfError::StateCorrupt(_)
            | PdfError::VersionMismatch { .. }
            | PdfError::TargetMismatch { .. } => ErrorKind::State,
            PdfError::UnsupportedImageFormat(_)
            | PdfError::DecodeError(_)
            | PdfError::UnsupportedSource(_)
            | PdfError::SourceUnreadable(_)
            | PdfError::PageIndexOutOfRange { .. }
            | PdfError::Parse(_) => ErrorKind::Resource,
            PdfError::IdentifierMismatch { .. }
            | PdfError::ImageAlreadyEmbedded(_)
            | PdfError::PageAlreadyOpen(_)
            | PdfError::ObjectAlreadyWritten(_)
            | PdfError::SessionPoisoned => ErrorKind::ContractViolation,
        }
    }

    /// Whether this error poisons the session it was raised on.
    pub fn is_contract_violation(&self) -> bool {
        self.kind() == ErrorKind::ContractViolation
    }
}

pub type Result<T> = std::result::Result<T, PdfError>;
