//! Per-session configuration.

use crate::error::{PdfError, Result};
use crate::objects::{Dictionary, Object};
use crate::writer::{format_pdf_date, text_string};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::Dispatch;
use tracing_subscriber::layer::SubscriberExt;

/// Logging for one document session.
///
/// With a `log_file`, the session's events go to that file through their
/// own subscriber, installed for the duration of each call. Without one,
/// events go to whatever subscriber the host installed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    pub enabled: bool,
    pub log_file: Option<PathBuf>,
    /// `EnvFilter` directive for the file subscriber
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            log_file: None,
            filter: "pdfsmith=debug".to_string(),
        }
    }
}

impl LogConfig {
    /// Silence the session entirely
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    pub fn to_file(path: impl Into<PathBuf>) -> Self {
        Self {
            log_file: Some(path.into()),
            ..Self::default()
        }
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }

    /// Dispatcher for this configuration; `None` keeps the host's.
    pub(crate) fn dispatch(&self) -> Result<Option<Dispatch>> {
        if !self.enabled {
            return Ok(Some(Dispatch::none()));
        }
        let Some(path) = &self.log_file else {
            return Ok(None);
        };

        let filter = tracing_subscriber::EnvFilter::try_new(&self.filter)
            .map_err(|e| PdfError::InvalidArgument(format!("log filter {:?}: {e}", self.filter)))?;
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let subscriber = tracing_subscriber::registry().with(filter).with(
            tracing_subscriber::fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false),
        );
        Ok(Some(Dispatch::new(subscriber)))
    }
}

/// Document information dictionary entries
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub keywords: Option<String>,
    pub creator: Option<String>,
    /// Defaults to `pdfsmith` when unset
    pub producer: Option<String>,
    pub creation_date: Option<DateTime<Utc>>,
    pub modification_date: Option<DateTime<Utc>>,
}

impl DocumentMetadata {
    /// Metadata with both dates set to the current time
    pub fn now() -> Self {
        let now = Utc::now();
        Self {
            creation_date: Some(now),
            modification_date: Some(now),
            ..Self::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    /// Whether anything beyond the default producer is set
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Merge these entries over `base` (an existing Info dictionary).
    pub fn to_info_dictionary(&self, base: Option<&Dictionary>) -> Dictionary {
        let mut info = base.cloned().unwrap_or_default();
        let texts = [
            ("Title", &self.title),
            ("Author", &self.author),
            ("Subject", &self.subject),
            ("Keywords", &self.keywords),
            ("Creator", &self.creator),
        ];
        for (key, value) in texts {
            if let Some(value) = value {
                info.set(key, text_string(value));
            }
        }
        let producer = self.producer.as_deref().unwrap_or("pdfsmith");
        info.set("Producer", text_string(producer));
        for (key, date) in [
            ("CreationDate", self.creation_date),
            ("ModDate", self.modification_date),
        ] {
            if let Some(date) = date {
                info.set(key, Object::String(format_pdf_date(date).into_bytes()));
            }
        }
        info
    }
}

/// Settings fixed when a document is created
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreationSettings {
    /// Flate-compress content streams and decoded image samples
    pub compress_streams: bool,
    pub metadata: DocumentMetadata,
}

impl Default for CreationSettings {
    fn default() -> Self {
        Self {
            compress_streams: true,
            metadata: DocumentMetadata::default(),
        }
    }
}

impl CreationSettings {
    pub fn uncompressed() -> Self {
        Self {
            compress_streams: false,
            ..Self::default()
        }
    }

    pub fn with_metadata(mut self, metadata: DocumentMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_log_config_defaults() {
        let config = LogConfig::default();
        assert!(config.enabled);
        assert_eq!(config.filter, "pdfsmith=debug");
        assert!(config.dispatch().unwrap().is_none());
        assert!(LogConfig::disabled().dispatch().unwrap().is_some());
    }

    #[test]
    fn test_log_file_receives_events() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.log");
        let dispatch = LogConfig::to_file(&path).dispatch().unwrap().unwrap();
        tracing::dispatcher::with_default(&dispatch, || {
            tracing::info!(target: "pdfsmith::session", "hello from the session");
            tracing::info!(target: "other", "filtered out");
        });
        let log = std::fs::read_to_string(&path).unwrap();
        assert!(log.contains("hello from the session"));
        assert!(!log.contains("filtered out"));
    }

    #[test]
    fn test_invalid_filter() {
        let config = LogConfig::to_file("/tmp/unused.log").with_filter("pdfsmith=notalevel");
        assert!(matches!(config.dispatch(), Err(PdfError::InvalidArgument(_))));
    }

    #[test]
    fn test_info_dictionary() {
        let date = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let metadata = DocumentMetadata {
            creation_date: Some(date),
            ..DocumentMetadata::default().with_title("Report")
        };
        let info = metadata.to_info_dictionary(None);
        assert_eq!(info.get("Title"), Some(&Object::String(b"Report".to_vec())));
        assert_eq!(info.get("Producer"), Some(&Object::String(b"pdfsmith".to_vec())));
        assert_eq!(
            info.get("CreationDate"),
            Some(&Object::String(b"D:20240102030405+00'00".to_vec()))
        );
        assert!(!info.contains_key("ModDate"));
    }

    #[test]
    fn test_info_merges_over_base() {
        let mut base = Dictionary::new();
        base.set("Title", Object::String(b"Old".to_vec()));
        base.set("Author", Object::String(b"Someone".to_vec()));
        let info = DocumentMetadata::default()
            .with_title("New")
            .to_info_dictionary(Some(&base));
        assert_eq!(info.get("Title"), Some(&Object::String(b"New".to_vec())));
        assert_eq!(info.get("Author"), Some(&Object::String(b"Someone".to_vec())));
    }

    #[test]
    fn test_settings_serde() {
        let settings = CreationSettings::uncompressed()
            .with_metadata(DocumentMetadata::default().with_author("me"));
        let json = serde_json::to_string(&settings).unwrap();
        let restored: CreationSettings = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, settings);
        assert!(!restored.compress_streams);
    }
}
