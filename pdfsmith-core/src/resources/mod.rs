//! Image resources: identity, type detection, measurement and embedding.
//!
//! An image is identified by an [`ImageKey`], its locator plus a page or
//! directory index. Each key is embedded at most once per document; the
//! [`ResourceCache`] remembers the object id reserved for it.

mod cache;
pub mod detect;
pub(crate) mod embed;
mod sources;

pub use cache::ResourceCache;
pub(crate) use sources::SourceRegistry;

use crate::objects::ObjectId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of an image resource: where it lives and which page or
/// directory of it is meant.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ImageKey {
    pub locator: String,
    pub index: u32,
}

impl ImageKey {
    pub fn new(locator: impl Into<String>, index: u32) -> Self {
        Self {
            locator: locator.into(),
            index,
        }
    }
}

impl fmt::Display for ImageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.locator, self.index)
    }
}

/// Detected format of an image source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImageType {
    Undefined,
    Pdf,
    Jpeg,
    Tiff,
}

/// Size of an image in points; `-1` in both for an unknown image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImageDimensions {
    pub width: f64,
    pub height: f64,
}

impl ImageDimensions {
    pub const UNKNOWN: ImageDimensions = ImageDimensions {
        width: -1.0,
        height: -1.0,
    };

    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn is_unknown(&self) -> bool {
        *self == Self::UNKNOWN
    }
}

/// Embedding progress of one image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmbedState {
    NotEmbedded,
    /// Id handed out, form not yet written
    Reserved(ObjectId),
    Written(ObjectId),
}

impl EmbedState {
    pub fn object_id(&self) -> Option<ObjectId> {
        match *self {
            EmbedState::NotEmbedded => None,
            EmbedState::Reserved(id) | EmbedState::Written(id) => Some(id),
        }
    }
}

/// What is known about an image so far. Type and dimensions are filled
/// in lazily.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedImageInfo {
    pub embed: EmbedState,
    pub image_type: Option<ImageType>,
    pub dimensions: Option<ImageDimensions>,
}

impl Default for CachedImageInfo {
    fn default() -> Self {
        Self {
            embed: EmbedState::NotEmbedded,
            image_type: None,
            dimensions: None,
        }
    }
}

/// How an image is scaled when drawn
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ImagePlacement {
    /// Natural size in points
    Natural,
    /// Scale factors applied to the natural size
    Scale(f64, f64),
    /// Fit into a box, keeping the aspect ratio when `proportional`
    Fit {
        width: f64,
        height: f64,
        proportional: bool,
    },
}

impl ImagePlacement {
    /// Scale factors for an image of `natural` size
    pub fn scale_for(&self, natural: ImageDimensions) -> (f64, f64) {
        match *self {
            ImagePlacement::Natural => (1.0, 1.0),
            ImagePlacement::Scale(sx, sy) => (sx, sy),
            ImagePlacement::Fit {
                width,
                height,
                proportional,
            } => {
                if natural.width <= 0.0 || natural.height <= 0.0 {
                    return (1.0, 1.0);
                }
                let sx = width / natural.width;
                let sy = height / natural.height;
                if proportional {
                    let s = sx.min(sy);
                    (s, s)
                } else {
                    (sx, sy)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_key_ordering_and_display() {
        let a = ImageKey::new("a.jpg", 0);
        let b = ImageKey::new("a.jpg", 1);
        assert!(a < b);
        assert_eq!(b.to_string(), "a.jpg#1");
    }

    #[test]
    fn test_unknown_dimensions() {
        assert!(ImageDimensions::UNKNOWN.is_unknown());
        assert!(!ImageDimensions::new(10.0, 10.0).is_unknown());
    }

    #[test]
    fn test_embed_state_object_id() {
        let id = ObjectId::new(4, 0);
        assert_eq!(EmbedState::NotEmbedded.object_id(), None);
        assert_eq!(EmbedState::Reserved(id).object_id(), Some(id));
        assert_eq!(EmbedState::Written(id).object_id(), Some(id));
    }

    #[test]
    fn test_placement_scale() {
        let natural = ImageDimensions::new(200.0, 100.0);
        assert_eq!(ImagePlacement::Natural.scale_for(natural), (1.0, 1.0));
        assert_eq!(
            ImagePlacement::Fit {
                width: 100.0,
                height: 100.0,
                proportional: true
            }
            .scale_for(natural),
            (0.5, 0.5)
        );
        assert_eq!(
            ImagePlacement::Fit {
                width: 100.0,
                height: 100.0,
                proportional: false
            }
            .scale_for(natural),
            (0.5, 1.0)
        );
    }
}
