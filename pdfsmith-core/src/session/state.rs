//! Saved-state record written by `suspend` and read by `continue_pdf`.

use super::options::CreationSettings;
use super::Phase;
use crate::content::ContentManager;
use crate::error::{PdfError, Result};
use crate::objects::{Object, ObjectId};
use crate::parser::objects::ObjectParser;
use crate::parser::PdfVersion;
use crate::resources::ResourceCache;
use crate::text::Font;
use crate::writer::serialize::to_bytes;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Version of the record layout below
pub const STATE_FORMAT_VERSION: u32 = 1;

/// Whether the session wrote to a file path or to a caller-owned stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputMode {
    File,
    Stream,
}

impl OutputMode {
    pub(crate) fn describe(&self) -> &'static str {
        match self {
            OutputMode::File => "file-backed",
            OutputMode::Stream => "stream-backed",
        }
    }
}

/// Modify-session data that outlives the parsed source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct SavedModifyContext {
    pub(crate) previous_startxref: u64,
    pub(crate) source_version: PdfVersion,
    /// Serialized original catalog dictionary
    pub(crate) catalog: Vec<u8>,
    pub(crate) original_pages: Option<ObjectId>,
    pub(crate) original_page_count: usize,
    pub(crate) info: Option<ObjectId>,
    /// Serialized trailer `/ID`
    pub(crate) document_id: Option<Vec<u8>>,
}

/// Object value stored as PDF syntax
pub(crate) fn encode_object(object: &Object) -> Vec<u8> {
    to_bytes(object)
}

pub(crate) fn decode_object(bytes: &[u8]) -> Result<Object> {
    ObjectParser::new(bytes, 0)
        .parse_object()
        .map_err(|e| PdfError::StateCorrupt(format!("stored object: {e}")))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct SavedState {
    pub(crate) format_version: u32,
    pub(crate) phase: Phase,
    pub(crate) version: PdfVersion,
    pub(crate) output_mode: OutputMode,
    /// Output length when suspended; the target must still have it
    pub(crate) sink_length: u64,
    pub(crate) next_object_number: u32,
    pub(crate) offsets: BTreeMap<u32, u64>,
    pub(crate) pages_root: ObjectId,
    pub(crate) written_pages: Vec<ObjectId>,
    pub(crate) content: ContentManager,
    pub(crate) fonts: Vec<(Font, ObjectId)>,
    pub(crate) cache: ResourceCache,
    pub(crate) settings: CreationSettings,
    pub(crate) modify: Option<SavedModifyContext>,
    /// Annotations waiting for the next `write_page`
    #[serde(default)]
    pub(crate) pending_annotations: Vec<ObjectId>,
}

impl SavedState {
    pub(crate) fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_vec_pretty(self)
            .map_err(|e| PdfError::StateCorrupt(format!("cannot encode state: {e}")))?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Read a record, checking the format version before the layout.
    pub(crate) fn load(path: &Path) -> Result<Self> {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(PdfError::StateNotFound(path.to_path_buf()))
            }
            Err(e) => return Err(e.into()),
        };

        let value: serde_json::Value = serde_json::from_slice(&bytes)
            .map_err(|e| PdfError::StateCorrupt(e.to_string()))?;
        let found = value
            .get("format_version")
            .and_then(serde_json::Value::as_u64)
            .ok_or_else(|| PdfError::StateCorrupt("missing format_version".to_string()))?;
        if found != u64::from(STATE_FORMAT_VERSION) {
            return Err(PdfError::VersionMismatch {
                found: u32::try_from(found).unwrap_or(u32::MAX),
                expected: STATE_FORMAT_VERSION,
            });
        }

        let state: SavedState =
            serde_json::from_value(value).map_err(|e| PdfError::StateCorrupt(e.to_string()))?;
        if state.phase != Phase::PausedForContinuation {
            return Err(PdfError::StateCorrupt(format!(
                "record phase is {:?}",
                state.phase
            )));
        }
        Ok(state)
    }
}
