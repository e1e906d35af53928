//! Link annotations and annotation references for pages.

use super::DocumentDriver;
use crate::content::PageId;
use crate::error::Result;
use crate::geometry::Rectangle;
use crate::objects::ObjectId;

impl DocumentDriver {
    /// Attach a link opening `url` over `rect` of `page`. The annotation
    /// is written at once and listed in the page's `/Annots` when the page
    /// is written, also after `suspend` and `continue_pdf`.
    pub fn attach_url_link_to_page(
        &mut self,
        page: PageId,
        url: &str,
        rect: Rectangle,
    ) -> Result<ObjectId> {
        self.with_session(|session| session.attach_uri_link(page, url, rect))
    }

    /// Attach a link opening `url` over `rect` of the next page passed to
    /// [`DocumentDriver::write_page`].
    pub fn attach_url_link_to_current_page(&mut self, url: &str, rect: Rectangle) -> Result<ObjectId> {
        self.with_session(|session| session.attach_uri_link_to_next_page(url, rect))
    }

    /// List annotation object `id` on the next page passed to
    /// [`DocumentDriver::write_page`], after that page's own annotations.
    /// Pages copied from other documents do not take pending references.
    pub fn register_annotation_reference_for_next_page_write(&mut self, id: ObjectId) -> Result<()> {
        self.with_session(|session| session.register_annotation_for_next_page(id))
    }
}
