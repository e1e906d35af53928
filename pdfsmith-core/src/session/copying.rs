//! Copying contexts: one parsed source document and its object mapping,
//! kept alive across several copy calls.
//!
//! One-shot copy calls parse their source and start a fresh mapping every
//! time, so objects shared between calls (fonts, images) are written once
//! per call. A copying context writes each source object at most once for
//! its whole lifetime.

use super::document::{open_copy_source, reclassify_copy_error, unreadable_source};
use super::Session;
use crate::content::PageId;
use crate::error::{PdfError, Result};
use crate::io::InputSource;
use crate::objects::{Object, ObjectId};
use crate::operations::{ObjectCopier, PageRange};
use crate::parser::{PdfReader, XRefEntry};

/// Handle to a copying context of the current session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CopyingContextId(pub(crate) usize);

impl CopyingContextId {
    pub fn index(&self) -> usize {
        self.0
    }
}

enum CopySource {
    Document(PdfReader),
    /// The source of the running incremental update, borrowed from the
    /// modify context for each call
    ModifiedSource,
}

pub(crate) struct CopyingContext {
    source: CopySource,
    copier: ObjectCopier,
}

impl Session {
    pub(crate) fn create_copying_context(&mut self, source: InputSource) -> Result<CopyingContextId> {
        let reader = open_copy_source(source)?;
        let copier = ObjectCopier::new(self.compress());
        Ok(self.add_copying_context(CopyingContext {
            source: CopySource::Document(reader),
            copier,
        }))
    }

    /// Context over the document being updated. Its objects are already in
    /// the output, so they are referenced rather than copied.
    pub(crate) fn create_modified_source_context(&mut self) -> Result<CopyingContextId> {
        match &self.modify {
            None => {
                return Err(PdfError::InvalidArgument(
                    "not an incremental update session".to_string(),
                ))
            }
            Some(context) if context.reader.is_none() => {
                return Err(PdfError::InvalidArgument(
                    "the modified source was not supplied to this session".to_string(),
                ))
            }
            Some(_) => {}
        }
        let copier = ObjectCopier::for_modified_source(self.compress());
        Ok(self.add_copying_context(CopyingContext {
            source: CopySource::ModifiedSource,
            copier,
        }))
    }

    fn add_copying_context(&mut self, context: CopyingContext) -> CopyingContextId {
        self.copy_contexts.push(Some(context));
        let id = CopyingContextId(self.copy_contexts.len() - 1);
        tracing::debug!(context = id.0, "created copying context");
        id
    }

    pub(crate) fn end_copying_context(&mut self, id: CopyingContextId) -> Result<()> {
        self.copy_contexts
            .get_mut(id.0)
            .and_then(Option::take)
            .ok_or(PdfError::UnknownCopyingContext(id.0))?;
        tracing::debug!(context = id.0, "ended copying context");
        Ok(())
    }

    /// Live copying contexts, which are not carried across `suspend`
    pub(crate) fn copying_context_count(&self) -> usize {
        self.copy_contexts.iter().flatten().count()
    }

    /// Run `op` with the reader and copier of context `id`. The context is
    /// taken out of its slot for the call and always put back.
    fn with_copying_context<T>(
        &mut self,
        id: CopyingContextId,
        op: impl FnOnce(&mut Session, &mut PdfReader, &mut ObjectCopier) -> Result<T>,
    ) -> Result<T> {
        let mut context = self
            .copy_contexts
            .get_mut(id.0)
            .and_then(Option::take)
            .ok_or(PdfError::UnknownCopyingContext(id.0))?;

        let result = match &mut context.source {
            CopySource::Document(reader) => op(self, reader, &mut context.copier),
            CopySource::ModifiedSource => {
                match self.modify.as_mut().and_then(|modify| modify.reader.take()) {
                    Some(mut reader) => {
                        let result = op(self, &mut reader, &mut context.copier);
                        if let Some(modify) = self.modify.as_mut() {
                            modify.reader = Some(reader);
                        }
                        result
                    }
                    None => Err(PdfError::InvalidArgument(
                        "the modified source is no longer available".to_string(),
                    )),
                }
            }
        };

        if let Some(slot) = self.copy_contexts.get_mut(id.0) {
            *slot = Some(context);
        }
        result
    }

    pub(crate) fn append_pages_from_context(
        &mut self,
        id: CopyingContextId,
        range: &PageRange,
    ) -> Result<Vec<ObjectId>> {
        self.with_copying_context(id, |session, reader, copier| {
            session.append_pages_with(reader, copier, range)
        })
    }

    pub(crate) fn forms_from_context(
        &mut self,
        id: CopyingContextId,
        range: &PageRange,
    ) -> Result<Vec<ObjectId>> {
        self.with_copying_context(id, |session, reader, copier| {
            session.forms_with(reader, copier, range)
        })
    }

    pub(crate) fn merge_from_context(
        &mut self,
        id: CopyingContextId,
        page: PageId,
        range: &PageRange,
    ) -> Result<()> {
        self.with_copying_context(id, |session, reader, copier| {
            session.merge_to_page_with(page, reader, copier, range)
        })
    }

    /// Copy source object `source` and everything it references. Returns
    /// its id in the output; a second call returns the same id.
    pub(crate) fn copy_object_from_context(
        &mut self,
        id: CopyingContextId,
        source: ObjectId,
    ) -> Result<ObjectId> {
        self.with_copying_context(id, |session, reader, copier| {
            match reader.xref().get(source.number()) {
                Some(XRefEntry::InUse { .. } | XRefEntry::Compressed { .. }) => {}
                _ => {
                    return Err(PdfError::InvalidArgument(format!(
                        "source has no object {source}"
                    )))
                }
            }
            let copied = copier
                .copy(reader, &mut session.writer, &Object::Reference(source))
                .map_err(reclassify_copy_error)?;
            match copied {
                Object::Reference(target) => Ok(target),
                other => Err(PdfError::SourceUnreadable(format!(
                    "copy of {source} produced {other:?}"
                ))),
            }
        })
    }

    /// Output id of a source object copied through context `id`
    pub(crate) fn copied_object_id(
        &self,
        id: CopyingContextId,
        source: ObjectId,
    ) -> Result<Option<ObjectId>> {
        match self.copy_contexts.get(id.0).and_then(Option::as_ref) {
            Some(context) => Ok(context.copier.mapped(source)),
            None => Err(PdfError::UnknownCopyingContext(id.0)),
        }
    }

    /// Page count of the source of context `id`
    pub(crate) fn copying_context_page_count(&mut self, id: CopyingContextId) -> Result<usize> {
        self.with_copying_context(id, |_, reader, _| {
            reader.page_count().map_err(unreadable_source)
        })
    }
}
