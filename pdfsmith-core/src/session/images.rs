//! Image resources: dimension queries, reservation and embedding.

use super::DocumentDriver;
use crate::error::Result;
use crate::objects::ObjectId;
use crate::resources::{ImageDimensions, ImageKey};

impl DocumentDriver {
    /// Size in points of image `index` of `locator`, measured once and
    /// cached. Unrecognised formats report [`ImageDimensions::UNKNOWN`].
    pub fn get_image_dimensions(&mut self, locator: &str, index: u32) -> Result<ImageDimensions> {
        let key = ImageKey::new(locator, index);
        self.with_session(|session| session.image_dimensions(&key))
    }

    /// Reserve an object id for an image. Returns the existing id and
    /// `false` when the image was registered before.
    pub fn register_image_for_drawing(
        &mut self,
        locator: &str,
        index: u32,
    ) -> Result<(ObjectId, bool)> {
        let key = ImageKey::new(locator, index);
        self.with_session(|session| session.register_image(&key))
    }

    /// Embed a registered image as a form XObject under its reserved `id`.
    pub fn write_form_for_image(&mut self, locator: &str, index: u32, id: ObjectId) -> Result<()> {
        let key = ImageKey::new(locator, index);
        self.with_session(|session| session.write_image(&key, id))
    }

    /// Serve `locator` from memory instead of the file system.
    ///
    /// Binding the same bytes again does nothing. Once an image of
    /// `locator` has been measured or registered, binding different bytes
    /// is refused: the cached type, size and object id describe the old
    /// ones.
    pub fn register_image_source(&mut self, locator: &str, bytes: impl Into<Vec<u8>>) -> Result<()> {
        let bytes = bytes.into();
        self.with_session(|session| session.register_source(locator, bytes))
    }
}
