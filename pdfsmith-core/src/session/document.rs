//! Live state of one document and the operations on it.
//!
//! [`super::DocumentDriver`] checks the phase and handles logging and
//! poisoning; everything here assumes a session in the `Writing` phase.

use super::copying::CopyingContext;
use super::options::CreationSettings;
use super::state::{
    decode_object, encode_object, OutputMode, SavedModifyContext, SavedState,
    STATE_FORMAT_VERSION,
};
use super::Phase;
use crate::content::{ContentHandle, ContentManager, ContentState, FormHandle, PageId, UriLink};
use crate::error::{PdfError, Result};
use crate::geometry::Rectangle;
use crate::io::{FinishedOutput, InputSource, OutputTarget, Sink};
use crate::objects::{Dictionary, Object, ObjectId};
use crate::operations::{pages, ObjectCopier, PageRange};
use crate::parser::{ParseError, PdfReader, PdfVersion};
use crate::resources::{
    detect, embed, EmbedState, ImageDimensions, ImageKey, ImageType, ResourceCache,
    SourceRegistry,
};
use crate::text::Font;
use crate::writer::{ObjectWriter, XRefLayout};
use std::collections::BTreeMap;

/// Modify-session data; the parsed source is only present when it was
/// supplied to this process.
pub(crate) struct ModifyContext {
    pub(crate) saved: SavedModifyContext,
    pub(crate) reader: Option<PdfReader>,
}

pub(crate) struct Session {
    pub(crate) writer: ObjectWriter,
    pub(crate) version: PdfVersion,
    pub(crate) output_mode: OutputMode,
    pub(crate) settings: CreationSettings,
    pub(crate) pages_root: ObjectId,
    pub(crate) content: ContentManager,
    /// Pages in document order
    pub(crate) written_pages: Vec<ObjectId>,
    pub(crate) fonts: BTreeMap<Font, ObjectId>,
    pub(crate) cache: ResourceCache,
    pub(crate) sources: SourceRegistry,
    pub(crate) modify: Option<ModifyContext>,
    /// Ended contexts leave an empty slot so ids stay stable
    pub(crate) copy_contexts: Vec<Option<CopyingContext>>,
    /// Annotations the next written page lists after its own
    pub(crate) pending_annotations: Vec<ObjectId>,
    pub(crate) poisoned: bool,
}

fn output_mode_of(target: &OutputTarget) -> OutputMode {
    if target.is_stream() {
        OutputMode::Stream
    } else {
        OutputMode::File
    }
}

fn unsupported_source(err: ParseError) -> PdfError {
    match err {
        ParseError::Io(e) => PdfError::Io(e),
        other => PdfError::UnsupportedSource(other.to_string()),
    }
}

pub(super) fn unreadable_source(err: ParseError) -> PdfError {
    match err {
        ParseError::Io(e) => PdfError::Io(e),
        other => PdfError::SourceUnreadable(other.to_string()),
    }
}

/// Parse failures while copying mean the source is unreadable
pub(super) fn reclassify_copy_error(err: PdfError) -> PdfError {
    match err {
        PdfError::Parse(e) => unreadable_source(e),
        other => other,
    }
}

pub(super) fn open_copy_source(source: InputSource) -> Result<PdfReader> {
    let description = source.describe();
    let reader = PdfReader::from_bytes(source.read_all()?).map_err(unreadable_source)?;
    tracing::debug!(source = %description, "opened copy source");
    Ok(reader)
}

fn ends_with_eol(data: &[u8]) -> bool {
    matches!(data.last(), Some(b'\n' | b'\r'))
}

impl Session {
    fn new(
        writer: ObjectWriter,
        version: PdfVersion,
        output_mode: OutputMode,
        settings: CreationSettings,
        pages_root: ObjectId,
    ) -> Self {
        Self {
            writer,
            version,
            output_mode,
            settings,
            pages_root,
            content: ContentManager::default(),
            written_pages: Vec::new(),
            fonts: BTreeMap::new(),
            cache: ResourceCache::new(),
            sources: SourceRegistry::default(),
            modify: None,
            copy_contexts: Vec::new(),
            pending_annotations: Vec::new(),
            poisoned: false,
        }
    }

    /// New document: header written, page tree root reserved.
    pub(crate) fn start(
        target: OutputTarget,
        version: PdfVersion,
        settings: CreationSettings,
    ) -> Result<Self> {
        if !version.is_supported() {
            return Err(PdfError::InvalidArgument(format!(
                "unsupported PDF version {version}"
            )));
        }
        let output_mode = output_mode_of(&target);
        let mut writer = ObjectWriter::new(Sink::create(target)?, 1);
        writer.write_header(version)?;
        let pages_root = writer.allocate();
        Ok(Self::new(writer, version, output_mode, settings, pages_root))
    }

    /// Incremental update of `source`, written to `destination` or
    /// appended to the source file itself.
    pub(crate) fn modify(
        source: InputSource,
        version: PdfVersion,
        destination: Option<OutputTarget>,
        settings: CreationSettings,
    ) -> Result<Self> {
        let in_place = match (&destination, source.path()) {
            (Some(_), _) => None,
            (None, Some(path)) => Some(OutputTarget::File(path.to_path_buf())),
            (None, None) => {
                return Err(PdfError::InvalidArgument(
                    "modifying in place needs a file source; supply a destination".to_string(),
                ))
            }
        };

        let mut reader = PdfReader::from_bytes(source.read_all()?).map_err(unsupported_source)?;
        if reader.xref().is_recovered() {
            return Err(PdfError::UnsupportedSource(
                "no usable cross-reference table".to_string(),
            ));
        }
        let catalog = reader.catalog().map_err(unsupported_source)?;
        let original_pages = catalog.get_reference("Pages");
        let original_page_count = match original_pages {
            Some(_) => reader.page_count().map_err(unsupported_source)?,
            None => 0,
        };

        let output_mode = destination.as_ref().map_or(OutputMode::File, output_mode_of);
        let first_number = reader.max_object_number() + 1;
        let mut writer = match in_place {
            Some(source_file) => ObjectWriter::new(Sink::append(source_file)?, first_number),
            None => {
                let target = destination.unwrap_or_else(OutputTarget::memory);
                let mut writer = ObjectWriter::new(Sink::create(target)?, first_number);
                writer.write_bytes(reader.data())?;
                writer
            }
        };
        if !ends_with_eol(reader.data()) {
            writer.write_bytes(b"\n")?;
        }
        let pages_root = writer.allocate();

        let saved = SavedModifyContext {
            previous_startxref: reader.startxref(),
            source_version: reader.version(),
            catalog: encode_object(&Object::Dictionary(catalog)),
            original_pages,
            original_page_count,
            info: reader.info_id(),
            document_id: reader.trailer().get("ID").map(encode_object),
        };
        tracing::info!(
            source_version = %saved.source_version,
            first_number,
            pages = original_page_count,
            "opened document for incremental update"
        );

        let mut session = Self::new(writer, version, output_mode, settings, pages_root);
        session.modify = Some(ModifyContext {
            saved,
            reader: Some(reader),
        });
        Ok(session)
    }

    /// Rebuild a suspended session on `target`.
    pub(crate) fn restore(
        target: OutputTarget,
        state: SavedState,
        modified_source: Option<InputSource>,
    ) -> Result<Self> {
        let supplied = output_mode_of(&target);
        if supplied != state.output_mode {
            return Err(PdfError::TargetMismatch {
                recorded: state.output_mode.describe(),
                supplied: supplied.describe(),
            });
        }

        let sink = Sink::append(target)?;
        if sink.position() != state.sink_length {
            return Err(PdfError::StateCorrupt(format!(
                "output is {} bytes long, the saved state expects {}",
                sink.position(),
                state.sink_length
            )));
        }
        let writer = ObjectWriter::restore(sink, state.next_object_number, state.offsets);

        let modify = match (state.modify, modified_source) {
            (Some(saved), source) => {
                let reader = match source {
                    Some(source) => Some(
                        PdfReader::from_bytes(source.read_all()?).map_err(unsupported_source)?,
                    ),
                    None => None,
                };
                Some(ModifyContext { saved, reader })
            }
            (None, Some(_)) => {
                tracing::warn!("ignoring modified source: saved state is not an update session");
                None
            }
            (None, None) => None,
        };

        let mut session = Self::new(
            writer,
            state.version,
            state.output_mode,
            state.settings,
            state.pages_root,
        );
        session.content = state.content;
        session.written_pages = state.written_pages;
        session.fonts = state.fonts.into_iter().collect();
        session.cache = state.cache;
        session.pending_annotations = state.pending_annotations;
        session.modify = modify;
        Ok(session)
    }

    pub(crate) fn to_saved_state(&self) -> SavedState {
        SavedState {
            format_version: STATE_FORMAT_VERSION,
            phase: Phase::PausedForContinuation,
            version: self.version,
            output_mode: self.output_mode,
            sink_length: self.writer.position(),
            next_object_number: self.writer.next_number(),
            offsets: self.writer.offsets().clone(),
            pages_root: self.pages_root,
            written_pages: self.written_pages.clone(),
            content: self.content.clone(),
            fonts: self.fonts.iter().map(|(font, id)| (*font, *id)).collect(),
            cache: self.cache.clone(),
            settings: self.settings.clone(),
            modify: self.modify.as_ref().map(|context| context.saved.clone()),
            pending_annotations: self.pending_annotations.clone(),
        }
    }

    /// Poison the session on a contract violation, passing the result on.
    pub(crate) fn track<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(err) = &result {
            if err.is_contract_violation() && !self.poisoned {
                tracing::error!(error = %err, "contract violation, refusing further work");
                self.poisoned = true;
            }
        }
        result
    }

    pub(super) fn compress(&self) -> bool {
        self.settings.compress_streams
    }

    // Pages and forms

    pub(crate) fn create_page(&mut self, media_box: Rectangle) -> PageId {
        let id = self.writer.allocate();
        let page = self.content.create_page(id, media_box);
        tracing::debug!(page = page.index(), %id, "created page");
        page
    }

    pub(crate) fn pause_page(&mut self, handle: ContentHandle) -> Result<()> {
        let record = self.content.live_page_mut(handle.page)?;
        if record.state != ContentState::Open {
            return Ok(());
        }
        self.flush_segment(handle.page)?;
        self.content.page_mut(handle.page)?.state = ContentState::Paused;
        tracing::debug!(page = handle.page.index(), "paused content stream");
        Ok(())
    }

    /// Write buffered operations as one content stream segment.
    fn flush_segment(&mut self, page: PageId) -> Result<()> {
        let buffer = std::mem::take(&mut self.content.page_mut(page)?.buffer);
        if buffer.is_empty() {
            return Ok(());
        }
        let segment = self.write_segment(buffer)?;
        self.content.page_mut(page)?.segments.push(segment);
        Ok(())
    }

    fn write_segment(&mut self, operations: Vec<u8>) -> Result<ObjectId> {
        let id = self.writer.allocate();
        let length = operations.len();
        let compress = self.compress();
        self.writer
            .write_stream(id, Dictionary::new(), operations, compress)?;
        tracing::debug!(%id, length, "wrote content segment");
        Ok(id)
    }

    pub(crate) fn write_page(&mut self, page: PageId) -> Result<ObjectId> {
        self.content.live_page_mut(page)?;
        self.flush_segment(page)?;
        if !self.pending_annotations.is_empty() {
            let pending = std::mem::take(&mut self.pending_annotations);
            self.content.page_mut(page)?.annotations.extend(pending);
        }

        let record = self.content.page(page)?;
        let id = record.id;
        let dict = record.to_dictionary(self.pages_root);
        self.writer.write_object(id, &Object::Dictionary(dict))?;

        self.content.page_mut(page)?.state = ContentState::Closed;
        self.written_pages.push(id);
        tracing::debug!(page = page.index(), %id, "wrote page");
        Ok(id)
    }

    pub(crate) fn create_form(&mut self, bbox: Rectangle) -> FormHandle {
        let id = self.writer.allocate();
        self.content.create_form(id, bbox)
    }

    pub(crate) fn end_form(&mut self, form: FormHandle) -> Result<ObjectId> {
        let record = self.content.open_form_mut(form)?;
        let buffer = std::mem::take(&mut record.buffer);
        let dict = record.to_dictionary();
        let id = record.id;

        let compress = self.compress();
        self.writer.write_stream(id, dict, buffer, compress)?;
        self.content.open_form_mut(form)?.state = ContentState::Closed;
        tracing::debug!(%id, "wrote form XObject");
        Ok(id)
    }

    /// Resource name and object of a standard font, writing the font
    /// dictionary on first use.
    pub(crate) fn font_resource(&mut self, font: Font) -> Result<(String, ObjectId)> {
        let id = match self.fonts.get(&font) {
            Some(&id) => id,
            None => {
                let id = self.writer.allocate();
                self.writer
                    .write_object(id, &Object::Dictionary(font.to_dictionary()))?;
                self.fonts.insert(font, id);
                id
            }
        };
        Ok((format!("F{}", id.number()), id))
    }

    // Annotations

    fn write_uri_link(&mut self, uri: &str, rect: Rectangle) -> Result<ObjectId> {
        let link = UriLink::new(rect, uri)?;
        let id = self.writer.allocate();
        self.writer
            .write_object(id, &Object::Dictionary(link.to_dictionary()))?;
        tracing::debug!(%id, uri, "wrote link annotation");
        Ok(id)
    }

    /// Write a link annotation and list it on `page`, which must not be
    /// written yet.
    pub(crate) fn attach_uri_link(
        &mut self,
        page: PageId,
        uri: &str,
        rect: Rectangle,
    ) -> Result<ObjectId> {
        self.content.live_page_mut(page)?;
        let id = self.write_uri_link(uri, rect)?;
        self.content.page_mut(page)?.annotations.push(id);
        Ok(id)
    }

    /// Write a link annotation for whichever page `write_page` writes next.
    pub(crate) fn attach_uri_link_to_next_page(&mut self, uri: &str, rect: Rectangle) -> Result<ObjectId> {
        let id = self.write_uri_link(uri, rect)?;
        self.pending_annotations.push(id);
        Ok(id)
    }

    pub(crate) fn register_annotation_for_next_page(&mut self, id: ObjectId) -> Result<()> {
        if id.number() == 0 || id.number() >= self.writer.next_number() {
            return Err(PdfError::InvalidArgument(format!(
                "{id} was not allocated in this document"
            )));
        }
        self.pending_annotations.push(id);
        tracing::debug!(%id, "annotation registered for the next page");
        Ok(())
    }

    // Images

    fn image_type(&mut self, key: &ImageKey) -> Result<ImageType> {
        if let Some(image_type) = self.cache.get(key).and_then(|info| info.image_type) {
            return Ok(image_type);
        }
        let data = self.sources.load(&key.locator)?;
        let image_type = detect::sniff(&data);
        self.cache.set_type(key, image_type);
        Ok(image_type)
    }

    pub(crate) fn image_dimensions(&mut self, key: &ImageKey) -> Result<ImageDimensions> {
        if let Some(dimensions) = self.cache.get(key).and_then(|info| info.dimensions) {
            return Ok(dimensions);
        }
        let image_type = self.image_type(key)?;
        let dimensions = match image_type {
            ImageType::Undefined => ImageDimensions::UNKNOWN,
            _ => {
                let data = self.sources.load(&key.locator)?;
                detect::measure(&data, image_type, key.index)?
            }
        };
        self.cache.set_dimensions(key, dimensions);
        Ok(dimensions)
    }

    pub(crate) fn register_source(&mut self, locator: &str, bytes: Vec<u8>) -> Result<()> {
        match self.sources.bound(locator) {
            Some(existing) if existing == bytes.as_slice() => {
                tracing::debug!(locator, "image source already bound");
                return Ok(());
            }
            Some(_) if self.cache.has_locator(locator) => {
                return Err(PdfError::InvalidArgument(format!(
                    "{locator} is already bound to other bytes that are in use"
                )));
            }
            Some(_) => tracing::warn!(locator, "replacing unused image source"),
            None => {}
        }
        tracing::debug!(locator, length = bytes.len(), "registered image source");
        self.sources.register(locator, bytes);
        Ok(())
    }

    pub(crate) fn register_image(&mut self, key: &ImageKey) -> Result<(ObjectId, bool)> {
        if let Some(id) = self.cache.get(key).and_then(|info| info.embed.object_id()) {
            return Ok((id, false));
        }
        if self.image_type(key)? == ImageType::Undefined {
            return Err(PdfError::UnsupportedImageFormat(key.to_string()));
        }
        // Measuring validates the page or directory index
        self.image_dimensions(key)?;

        let id = self.cache.reserve(key, self.writer.allocate());
        tracing::debug!(%key, %id, "reserved image");
        Ok((id, true))
    }

    pub(crate) fn write_image(&mut self, key: &ImageKey, id: ObjectId) -> Result<()> {
        let embed = self
            .cache
            .get(key)
            .map_or(EmbedState::NotEmbedded, |info| info.embed);
        match embed {
            EmbedState::Reserved(reserved) if reserved == id => {}
            EmbedState::Reserved(reserved) => {
                return Err(PdfError::IdentifierMismatch {
                    key: key.to_string(),
                    expected: Some(reserved.number()),
                    found: id.number(),
                })
            }
            EmbedState::Written(_) => return Err(PdfError::ImageAlreadyEmbedded(key.to_string())),
            EmbedState::NotEmbedded => {
                return Err(PdfError::IdentifierMismatch {
                    key: key.to_string(),
                    expected: None,
                    found: id.number(),
                })
            }
        }

        let image_type = self.image_type(key)?;
        let data = self.sources.load(&key.locator)?;
        let compress = self.compress();
        let dimensions =
            embed::write_image_form(&mut self.writer, &data, image_type, key.index, id, compress)?;
        self.cache.set_dimensions(key, dimensions);
        self.cache.mark_written(key, id);
        tracing::debug!(%key, %id, ?image_type, "embedded image");
        Ok(())
    }

    /// Object id of an image ready to be painted: reserved if needed, and
    /// written unless an earlier call already wrote it. A reservation left
    /// unwritten by `register_image` or by a failed write is completed here.
    pub(crate) fn embedded_image(&mut self, key: &ImageKey) -> Result<ObjectId> {
        let (id, _) = self.register_image(key)?;
        let written = self
            .cache
            .get(key)
            .is_some_and(|info| matches!(info.embed, EmbedState::Written(_)));
        if !written {
            self.write_image(key, id)?;
        }
        Ok(id)
    }

    // Copying from other documents

    pub(crate) fn append_pages(
        &mut self,
        source: InputSource,
        range: &PageRange,
    ) -> Result<Vec<ObjectId>> {
        let mut reader = open_copy_source(source)?;
        let mut copier = ObjectCopier::new(self.compress());
        self.append_pages_with(&mut reader, &mut copier, range)
    }

    /// Copy the selected pages of `reader` as new pages of this document.
    pub(crate) fn append_pages_with(
        &mut self,
        reader: &mut PdfReader,
        copier: &mut ObjectCopier,
        range: &PageRange,
    ) -> Result<Vec<ObjectId>> {
        let count = reader.page_count().map_err(unreadable_source)?;
        let indices = range.get_indices(count)?;

        let mut ids = Vec::with_capacity(indices.len());
        for index in indices {
            let page = reader
                .page(index)
                .map_err(unreadable_source)?
                .ok_or(PdfError::PageIndexOutOfRange { index, count })?;
            let id = pages::copy_page(reader, &mut self.writer, copier, &page, self.pages_root)
                .map_err(reclassify_copy_error)?;
            self.written_pages.push(id);
            ids.push(id);
        }
        tracing::info!(pages = ids.len(), "appended pages from source document");
        Ok(ids)
    }

    pub(crate) fn forms_from_pdf(
        &mut self,
        source: InputSource,
        range: &PageRange,
    ) -> Result<Vec<ObjectId>> {
        let mut reader = open_copy_source(source)?;
        let mut copier = ObjectCopier::new(self.compress());
        self.forms_with(&mut reader, &mut copier, range)
    }

    /// One form XObject per selected page of `reader`.
    pub(crate) fn forms_with(
        &mut self,
        reader: &mut PdfReader,
        copier: &mut ObjectCopier,
        range: &PageRange,
    ) -> Result<Vec<ObjectId>> {
        let count = reader.page_count().map_err(unreadable_source)?;
        let indices = range.get_indices(count)?;

        let compress = self.compress();
        let mut ids = Vec::with_capacity(indices.len());
        for index in indices {
            let page = reader
                .page(index)
                .map_err(unreadable_source)?
                .ok_or(PdfError::PageIndexOutOfRange { index, count })?;
            let form_id = self.writer.allocate();
            pages::write_page_as_form(reader, &mut self.writer, copier, &page, form_id, compress)
                .map_err(reclassify_copy_error)?;
            ids.push(form_id);
        }
        Ok(ids)
    }

    /// Draw the selected source pages at the origin of `page`.
    pub(crate) fn merge_to_page(
        &mut self,
        page: PageId,
        source: InputSource,
        range: &PageRange,
    ) -> Result<()> {
        self.content.live_page_mut(page)?;
        let forms = self.forms_from_pdf(source, range)?;
        self.place_forms(page, &forms)
    }

    pub(crate) fn merge_to_page_with(
        &mut self,
        page: PageId,
        reader: &mut PdfReader,
        copier: &mut ObjectCopier,
        range: &PageRange,
    ) -> Result<()> {
        self.content.live_page_mut(page)?;
        let forms = self.forms_with(reader, copier, range)?;
        self.place_forms(page, &forms)
    }

    /// Paint `forms` at the origin of `page`, in order.
    fn place_forms(&mut self, page: PageId, forms: &[ObjectId]) -> Result<()> {
        let record = self.content.live_page_mut(page)?;
        let mut operations = Vec::new();
        for form in forms {
            let name = format!("Fm{}", form.number());
            operations.extend_from_slice(format!("q\n/{name} Do\nQ\n").as_bytes());
            record.resources.xobjects.insert(name, *form);
        }

        if record.state == ContentState::Open {
            record.buffer.extend_from_slice(&operations);
        } else {
            let segment = self.write_segment(operations)?;
            self.content.page_mut(page)?.segments.push(segment);
        }
        tracing::debug!(page = page.index(), forms = forms.len(), "merged source pages");
        Ok(())
    }

    // Finishing

    /// Write the page tree, info, catalog, cross-reference section and
    /// trailer, then hand the output back.
    pub(crate) fn finalize(mut self) -> Result<FinishedOutput> {
        for (index, record) in self.content.unwritten_pages() {
            tracing::warn!(page = index, id = %record.id, "page was never written and is left out");
        }
        for (key, id) in self.cache.pending() {
            tracing::warn!(%key, %id, "image id reserved but never written");
        }
        if !self.pending_annotations.is_empty() {
            tracing::warn!(
                annotations = self.pending_annotations.len(),
                "annotations registered for a page that was never written"
            );
        }

        match self.modify.take() {
            None => self.finalize_new()?,
            Some(context) => self.finalize_update(context)?,
        }
        self.writer.flush()?;
        self.writer.finish()
    }

    /// Flush and hand the output back without finalizing.
    pub(crate) fn close(mut self) -> Result<FinishedOutput> {
        self.writer.flush()?;
        self.writer.finish()
    }

    fn write_pages_root(&mut self, mut kids: Vec<ObjectId>, count: usize) -> Result<()> {
        kids.extend(self.written_pages.iter().copied());
        let mut pages = Dictionary::new();
        pages.set("Type", Object::name("Pages"));
        pages.set(
            "Kids",
            Object::Array(kids.into_iter().map(Object::Reference).collect()),
        );
        pages.set("Count", count + self.written_pages.len());
        self.writer
            .write_object(self.pages_root, &Object::Dictionary(pages))
    }

    fn finalize_new(&mut self) -> Result<()> {
        self.write_pages_root(Vec::new(), 0)?;

        let info_id = self.writer.allocate();
        let info = self.settings.metadata.to_info_dictionary(None);
        self.writer.write_object(info_id, &Object::Dictionary(info))?;

        let catalog_id = self.writer.allocate();
        let mut catalog = Dictionary::new();
        catalog.set("Type", Object::name("Catalog"));
        catalog.set("Pages", self.pages_root);
        self.writer
            .write_object(catalog_id, &Object::Dictionary(catalog))?;

        let mut trailer = Dictionary::new();
        trailer.set("Root", catalog_id);
        trailer.set("Info", info_id);
        self.writer.write_xref_and_trailer(trailer, XRefLayout::Full)?;
        tracing::info!(pages = self.written_pages.len(), "document finalized");
        Ok(())
    }

    fn finalize_update(&mut self, mut context: ModifyContext) -> Result<()> {
        let saved = &context.saved;
        let original_kids: Vec<ObjectId> = saved.original_pages.into_iter().collect();
        self.write_pages_root(original_kids, saved.original_page_count)?;

        let mut catalog = match decode_object(&saved.catalog)? {
            Object::Dictionary(dict) => dict,
            _ => return Err(PdfError::StateCorrupt("stored catalog is not a dictionary".to_string())),
        };
        catalog.set("Pages", self.pages_root);
        if self.version > saved.source_version {
            catalog.set("Version", Object::name(self.version.as_name()));
        }
        let catalog_id = self.writer.allocate();
        self.writer
            .write_object(catalog_id, &Object::Dictionary(catalog))?;

        let info_id = if self.settings.metadata.is_empty() {
            saved.info
        } else {
            let base = match context.reader.as_mut() {
                Some(reader) => reader.info().unwrap_or_else(|e| {
                    tracing::warn!(error = %e, "original info dictionary unreadable");
                    None
                }),
                None => None,
            };
            let info = self.settings.metadata.to_info_dictionary(base.as_ref());
            let id = self.writer.allocate();
            self.writer.write_object(id, &Object::Dictionary(info))?;
            Some(id)
        };

        let mut trailer = Dictionary::new();
        trailer.set("Root", catalog_id);
        if let Some(info_id) = info_id {
            trailer.set("Info", info_id);
        }
        if let Some(id) = &saved.document_id {
            trailer.set("ID", decode_object(id)?);
        }
        trailer.set(
            "Prev",
            Object::Integer(i64::try_from(saved.previous_startxref).unwrap_or(i64::MAX)),
        );
        self.writer
            .write_xref_and_trailer(trailer, XRefLayout::Incremental)?;
        tracing::info!(
            new_pages = self.written_pages.len(),
            "incremental update finalized"
        );
        Ok(())
    }

    /// Original page count of a modify session
    pub(crate) fn modified_page_count(&self) -> Option<usize> {
        self.modify
            .as_ref()
            .map(|context| context.saved.original_page_count)
    }
}
