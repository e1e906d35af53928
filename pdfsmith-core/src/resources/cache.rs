use super::{CachedImageInfo, EmbedState, ImageDimensions, ImageKey, ImageType};
use crate::objects::ObjectId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Image identity cache for one document.
///
/// A key gets at most one entry, and once an object id is recorded for it
/// that id never changes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceCache {
    entries: BTreeMap<ImageKey, CachedImageInfo>,
}

#[derive(Serialize, Deserialize)]
struct CacheEntry {
    key: ImageKey,
    info: CachedImageInfo,
}

impl ResourceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &ImageKey) -> Option<&CachedImageInfo> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ImageKey, &CachedImageInfo)> {
        self.entries.iter()
    }

    /// Whether anything was recorded for an image of `locator`
    pub(crate) fn has_locator(&self, locator: &str) -> bool {
        self.entries.keys().any(|key| key.locator == locator)
    }

    pub(crate) fn set_type(&mut self, key: &ImageKey, image_type: ImageType) {
        self.entries.entry(key.clone()).or_default().image_type = Some(image_type);
    }

    pub(crate) fn set_dimensions(&mut self, key: &ImageKey, dimensions: ImageDimensions) {
        self.entries.entry(key.clone()).or_default().dimensions = Some(dimensions);
    }

    /// Record a reservation. Keeps an existing id.
    pub(crate) fn reserve(&mut self, key: &ImageKey, id: ObjectId) -> ObjectId {
        let entry = self.entries.entry(key.clone()).or_default();
        match entry.embed.object_id() {
            Some(existing) => existing,
            None => {
                entry.embed = EmbedState::Reserved(id);
                id
            }
        }
    }

    pub(crate) fn mark_written(&mut self, key: &ImageKey, id: ObjectId) {
        self.entries.entry(key.clone()).or_default().embed = EmbedState::Written(id);
    }

    /// Ids reserved but never written
    pub fn pending(&self) -> Vec<(&ImageKey, ObjectId)> {
        self.entries
            .iter()
            .filter_map(|(key, info)| match info.embed {
                EmbedState::Reserved(id) => Some((key, id)),
                _ => None,
            })
            .collect()
    }
}

// JSON maps need string keys, so the cache persists as a list of entries.
impl Serialize for ResourceCache {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let entries: Vec<CacheEntry> = self
            .entries
            .iter()
            .map(|(key, info)| CacheEntry {
                key: key.clone(),
                info: info.clone(),
            })
            .collect();
        entries.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ResourceCache {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let entries = Vec::<CacheEntry>::deserialize(deserializer)?;
        Ok(Self {
            entries: entries.into_iter().map(|e| (e.key, e.info)).collect(),
        })
    }
}
