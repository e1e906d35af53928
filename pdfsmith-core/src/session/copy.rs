//! Pages and page content taken from other PDF documents.

use super::{CopyingContextId, DocumentDriver};
use crate::content::PageId;
use crate::error::Result;
use crate::io::InputSource;
use crate::objects::ObjectId;
use crate::operations::PageRange;

impl DocumentDriver {
    /// Copy the selected pages of `source` to the end of this document.
    pub fn append_pdf_pages_from_pdf(
        &mut self,
        source: InputSource,
        range: &PageRange,
    ) -> Result<Vec<ObjectId>> {
        self.with_session(|session| session.append_pages(source, range))
    }

    /// Draw the selected pages of `source` on `page`, each at the origin.
    pub fn merge_pdf_pages_to_page(
        &mut self,
        page: PageId,
        source: InputSource,
        range: &PageRange,
    ) -> Result<()> {
        self.with_session(|session| session.merge_to_page(page, source, range))
    }

    /// One reusable form XObject per selected page of `source`.
    pub fn create_form_xobjects_from_pdf(
        &mut self,
        source: InputSource,
        range: &PageRange,
    ) -> Result<Vec<ObjectId>> {
        self.with_session(|session| session.forms_from_pdf(source, range))
    }

    /// Open `source` for repeated copying. Objects copied through the
    /// context are written once however many calls reach them.
    pub fn create_pdf_copying_context(&mut self, source: InputSource) -> Result<CopyingContextId> {
        self.with_session(|session| session.create_copying_context(source))
    }

    /// Copying context over the source of the running incremental update.
    /// Its objects are already part of the output and are referenced in
    /// place. Needs the source to have been supplied to this session.
    pub fn create_pdf_copying_context_for_modified_file(&mut self) -> Result<CopyingContextId> {
        self.with_session(|session| session.create_modified_source_context())
    }

    pub fn append_pdf_pages_from_copying_context(
        &mut self,
        context: CopyingContextId,
        range: &PageRange,
    ) -> Result<Vec<ObjectId>> {
        self.with_session(|session| session.append_pages_from_context(context, range))
    }

    pub fn merge_pdf_pages_from_copying_context_to_page(
        &mut self,
        context: CopyingContextId,
        page: PageId,
        range: &PageRange,
    ) -> Result<()> {
        self.with_session(|session| session.merge_from_context(context, page, range))
    }

    pub fn create_form_xobjects_from_copying_context(
        &mut self,
        context: CopyingContextId,
        range: &PageRange,
    ) -> Result<Vec<ObjectId>> {
        self.with_session(|session| session.forms_from_context(context, range))
    }

    /// Copy object `source` of the context's document, with everything it
    /// references, and return its id in this document.
    pub fn copy_object_from_copying_context(
        &mut self,
        context: CopyingContextId,
        source: ObjectId,
    ) -> Result<ObjectId> {
        self.with_session(|session| session.copy_object_from_context(context, source))
    }

    /// Id in this document of a source object already copied through
    /// `context`, if any.
    pub fn copied_object_id(
        &mut self,
        context: CopyingContextId,
        source: ObjectId,
    ) -> Result<Option<ObjectId>> {
        self.with_session(|session| session.copied_object_id(context, source))
    }

    pub fn copying_context_page_count(&mut self, context: CopyingContextId) -> Result<usize> {
        self.with_session(|session| session.copying_context_page_count(context))
    }

    /// Release the context's parsed source and mapping.
    pub fn end_copying_context(&mut self, context: CopyingContextId) -> Result<()> {
        self.with_session(|session| session.end_copying_context(context))
    }
}
