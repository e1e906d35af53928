//! PDF Header Parser
//!
//! Parses PDF header and version according to ISO 32000-1 Section 7.5.2

use super::objects::find;
use super::{ParseError, ParseResult};
use serde::{Deserialize, Serialize};

/// How far into the file the `%PDF-` marker may appear
const HEADER_SEARCH_WINDOW: usize = 1024;

/// PDF Version information
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PdfVersion {
    pub major: u8,
    pub minor: u8,
}

impl PdfVersion {
    pub const V1_3: PdfVersion = PdfVersion::new(1, 3);
    pub const V1_4: PdfVersion = PdfVersion::new(1, 4);
    pub const V1_5: PdfVersion = PdfVersion::new(1, 5);
    pub const V1_6: PdfVersion = PdfVersion::new(1, 6);
    pub const V1_7: PdfVersion = PdfVersion::new(1, 7);
    pub const V2_0: PdfVersion = PdfVersion::new(2, 0);

    /// Create a new PDF version
    pub const fn new(major: u8, minor: u8) -> Self {
        Self { major, minor }
    }

    /// Check if this version is supported
    pub fn is_supported(&self) -> bool {
        // We support PDF 1.0 through 2.0
        matches!((self.major, self.minor), (1, 0..=7) | (2, 0))
    }

    /// Parse `"1.7"` style text
    pub fn parse(text: &str) -> Option<Self> {
        let (major, minor) = text.trim().split_once('.')?;
        let version = Self::new(major.parse().ok()?, minor.parse().ok()?);
        version.is_supported().then_some(version)
    }

    /// Name form used for the catalog `/Version` entry
    pub fn as_name(&self) -> String {
        self.to_string()
    }
}

impl Default for PdfVersion {
    fn default() -> Self {
        Self::V1_7
    }
}

impl std::fmt::Display for PdfVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Locate the header and read its version.
///
/// Leading garbage before `%PDF-` is tolerated within the first kilobyte.
pub fn parse_header(data: &[u8]) -> ParseResult<PdfVersion> {
    let window = &data[..data.len().min(HEADER_SEARCH_WINDOW)];
    let start = find(window, b"%PDF-").ok_or(ParseError::InvalidHeader)? + 5;

    let digits: Vec<u8> = data[start..]
        .iter()
        .take(8)
        .take_while(|b| b.is_ascii_digit() || **b == b'.')
        .copied()
        .collect();
    let text = std::str::from_utf8(&digits).map_err(|_| ParseError::InvalidHeader)?;
    PdfVersion::parse(text).ok_or(ParseError::InvalidHeader)
}
