//! Document sessions: the `DocumentDriver` lifecycle.
//!
//! A driver runs exactly one session:
//!
//! ```text
//! Uninitialized -> Writing -> Closed
//!                          -> PausedForContinuation
//! ```
//!
//! A session is begun with [`DocumentDriver::start_pdf`],
//! [`DocumentDriver::modify_pdf`] or [`DocumentDriver::continue_pdf`] and
//! left with [`DocumentDriver::end`], [`DocumentDriver::suspend`] or
//! [`DocumentDriver::abandon`]. Errors never roll back bytes already
//! written. A contract violation poisons the session; afterwards only
//! `abandon` succeeds.

mod copy;
mod copying;
mod document;
mod images;
mod links;
mod options;
mod state;

pub use copying::CopyingContextId;
pub(crate) use document::Session;
pub use options::{CreationSettings, DocumentMetadata, LogConfig};
pub use state::{OutputMode, STATE_FORMAT_VERSION};

use crate::content::{ContentContext, ContentHandle, FormHandle, PageId, Target};
use crate::error::{PdfError, Result};
use crate::geometry::Rectangle;
use crate::io::{FinishedOutput, InputSource, OutputTarget};
use crate::objects::ObjectId;
use crate::parser::PdfVersion;
use serde::{Deserialize, Serialize};
use state::SavedState;
use std::path::Path;
use tracing::dispatcher::{self, DefaultGuard, Dispatch};

/// Lifecycle phase of a [`DocumentDriver`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Uninitialized,
    Writing,
    /// Suspended with a saved-state record; resume with a new driver
    PausedForContinuation,
    Closed,
}

/// Builds one PDF document, or one incremental update of an existing one,
/// across any number of calls and, through `suspend`/`continue_pdf`,
/// across processes.
pub struct DocumentDriver {
    phase: Phase,
    session: Option<Session>,
    log: Option<Dispatch>,
}

impl Default for DocumentDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentDriver {
    pub fn new() -> Self {
        Self {
            phase: Phase::Uninitialized,
            session: None,
            log: None,
        }
    }

    /// Start a document on `target`, run `f` and end the document. If `f`
    /// fails the document is abandoned and the error returned.
    pub fn with_document<T>(
        target: OutputTarget,
        version: PdfVersion,
        log: LogConfig,
        settings: CreationSettings,
        f: impl FnOnce(&mut DocumentDriver) -> Result<T>,
    ) -> Result<(T, FinishedOutput)> {
        let mut driver = DocumentDriver::new();
        driver.start_pdf(target, version, log, settings)?;
        match f(&mut driver) {
            Ok(value) => {
                let output = driver.end()?;
                Ok((value, output))
            }
            Err(err) => {
                if let Err(abandon_err) = driver.abandon() {
                    tracing::warn!(error = %abandon_err, "abandoning failed document");
                }
                Err(err)
            }
        }
    }

    /// Thread-default subscriber for this session's logging, if it has one
    fn log_guard(&self) -> Option<DefaultGuard> {
        self.log.as_ref().map(dispatcher::set_default)
    }

    fn live(&mut self) -> Result<&mut Session> {
        match self.phase {
            Phase::Uninitialized => Err(PdfError::NotStarted),
            Phase::PausedForContinuation | Phase::Closed => Err(PdfError::SessionClosed),
            Phase::Writing => {
                let session = self.session.as_mut().ok_or(PdfError::SessionClosed)?;
                if session.poisoned {
                    return Err(PdfError::SessionPoisoned);
                }
                Ok(session)
            }
        }
    }

    /// Run `op` on the live session, poisoning it on a contract violation.
    fn with_session<T>(&mut self, op: impl FnOnce(&mut Session) -> Result<T>) -> Result<T> {
        let _guard = self.log_guard();
        let session = self.live()?;
        let result = op(session);
        session.track(result)
    }

    fn ensure_fresh(&self) -> Result<()> {
        match self.phase {
            Phase::Uninitialized => Ok(()),
            Phase::Writing => Err(PdfError::AlreadyStarted),
            Phase::PausedForContinuation | Phase::Closed => Err(PdfError::SessionClosed),
        }
    }

    fn begin(&mut self, session: Session) {
        self.session = Some(session);
        self.phase = Phase::Writing;
    }

    // Lifecycle

    /// Begin a new document on `target`.
    pub fn start_pdf(
        &mut self,
        target: OutputTarget,
        version: PdfVersion,
        log: LogConfig,
        settings: CreationSettings,
    ) -> Result<()> {
        self.ensure_fresh()?;
        self.log = log.dispatch()?;
        let _guard = self.log_guard();

        let output = target.describe();
        let session = Session::start(target, version, settings)?;
        tracing::info!(%version, output, "started document");
        self.begin(session);
        Ok(())
    }

    /// Resume a suspended session from the record at `state`, appending
    /// to `target`. `modified_source` re-attaches the source document of a
    /// suspended incremental update.
    pub fn continue_pdf(
        &mut self,
        target: OutputTarget,
        state: impl AsRef<Path>,
        modified_source: Option<InputSource>,
        log: LogConfig,
    ) -> Result<()> {
        self.ensure_fresh()?;
        self.log = log.dispatch()?;
        let _guard = self.log_guard();

        let state = state.as_ref();
        let saved = SavedState::load(state)?;
        let session = Session::restore(target, saved, modified_source)?;
        tracing::info!(
            state = %state.display(),
            position = session.writer.position(),
            next_object = session.writer.next_number(),
            "continued document"
        );
        self.begin(session);
        Ok(())
    }

    /// Begin an incremental update of `source`. Without a `destination`
    /// the update is appended to the source file itself.
    pub fn modify_pdf(
        &mut self,
        source: InputSource,
        version: PdfVersion,
        destination: Option<OutputTarget>,
        log: LogConfig,
        settings: CreationSettings,
    ) -> Result<()> {
        self.ensure_fresh()?;
        self.log = log.dispatch()?;
        let _guard = self.log_guard();

        let session = Session::modify(source, version, destination, settings)?;
        self.begin(session);
        Ok(())
    }

    /// Finalize the document and hand back its output.
    pub fn end(&mut self) -> Result<FinishedOutput> {
        let _guard = self.log_guard();
        let session = self.live()?;
        let open = session.content.open_items();
        if !open.is_empty() {
            return Err(PdfError::IncompleteContentStream(open.join(", ")));
        }

        self.phase = Phase::Closed;
        let session = self.session.take().ok_or(PdfError::SessionClosed)?;
        session.finalize()
    }

    /// Save the session to `state` and release the output without
    /// finalizing it. Continue later with [`DocumentDriver::continue_pdf`].
    pub fn suspend(&mut self, state: impl AsRef<Path>) -> Result<FinishedOutput> {
        let _guard = self.log_guard();
        let session = self.live()?;
        let open = session.content.open_items();
        if !open.is_empty() {
            return Err(PdfError::IncompleteContentStream(open.join(", ")));
        }

        let contexts = session.copying_context_count();
        if contexts > 0 {
            tracing::warn!(contexts, "copying contexts are not kept across suspend");
        }
        let state = state.as_ref();
        session.writer.flush()?;
        session.to_saved_state().save(state)?;
        tracing::info!(
            state = %state.display(),
            position = session.writer.position(),
            "suspended document"
        );

        self.phase = Phase::PausedForContinuation;
        let session = self.session.take().ok_or(PdfError::SessionClosed)?;
        session.close()
    }

    /// Give up on the document: flush what was written and release the
    /// output. Works on a poisoned session too.
    pub fn abandon(&mut self) -> Result<FinishedOutput> {
        let _guard = self.log_guard();
        match self.phase {
            Phase::Uninitialized => return Err(PdfError::NotStarted),
            Phase::PausedForContinuation | Phase::Closed => return Err(PdfError::SessionClosed),
            Phase::Writing => {}
        }
        self.phase = Phase::Closed;
        let session = self.session.take().ok_or(PdfError::SessionClosed)?;
        tracing::warn!(
            position = session.writer.position(),
            "abandoned document without finalizing"
        );
        session.close()
    }

    // Accessors

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_poisoned(&self) -> bool {
        self.session.as_ref().is_some_and(|session| session.poisoned)
    }

    /// Bytes written to the output so far, while a session is live
    pub fn output_position(&self) -> Option<u64> {
        self.session.as_ref().map(|session| session.writer.position())
    }

    /// Number the next allocated object will get, while a session is live
    pub fn next_object_number(&self) -> Option<u32> {
        self.session
            .as_ref()
            .map(|session| session.writer.next_number())
    }

    /// Object id reserved for `page`
    pub fn page_object_id(&self, page: PageId) -> Result<ObjectId> {
        let session = self.session.as_ref().ok_or(PdfError::NotStarted)?;
        Ok(session.content.page(page)?.id)
    }

    /// Page count of the source document in an incremental update
    pub fn modified_source_page_count(&self) -> Option<usize> {
        self.session
            .as_ref()
            .and_then(|session| session.modified_page_count())
    }

    // Pages and forms

    pub fn create_page(&mut self, media_box: Rectangle) -> Result<PageId> {
        self.with_session(|session| Ok(session.create_page(media_box)))
    }

    /// Open the content stream of `page`. A paused page can be reopened.
    pub fn start_page_content_context(&mut self, page: PageId) -> Result<ContentHandle> {
        self.with_session(|session| {
            let handle = session.content.open(page)?;
            tracing::debug!(page = page.index(), "opened content stream");
            Ok(handle)
        })
    }

    /// Drawing view of an open or paused page. A paused page is resumed.
    pub fn content(&mut self, handle: ContentHandle) -> Result<ContentContext<'_>> {
        let guard = self.log_guard();
        let session = self.live()?;
        let result = session.content.resume(handle);
        session.track(result)?;
        Ok(ContentContext::new(session, Target::Page(handle.page()), guard))
    }

    /// Write buffered operations as a complete content stream and pause
    /// the page. Pausing a paused page does nothing.
    pub fn pause_page_content_context(&mut self, handle: ContentHandle) -> Result<()> {
        self.with_session(|session| session.pause_page(handle))
    }

    /// Write the page dictionary; the page can take no more content.
    pub fn write_page(&mut self, page: PageId) -> Result<ObjectId> {
        self.with_session(|session| session.write_page(page))
    }

    pub fn create_form_xobject(&mut self, bbox: Rectangle) -> Result<FormHandle> {
        self.with_session(|session| Ok(session.create_form(bbox)))
    }

    pub fn form_content(&mut self, form: FormHandle) -> Result<ContentContext<'_>> {
        let guard = self.log_guard();
        let session = self.live()?;
        let result = session.content.open_form_mut(form).map(|_| ());
        session.track(result)?;
        Ok(ContentContext::new(session, Target::Form(form), guard))
    }

    pub fn end_form_xobject(&mut self, form: FormHandle) -> Result<ObjectId> {
        self.with_session(|session| session.end_form(form))
    }
}

impl Drop for DocumentDriver {
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            let _guard = self.log_guard();
            tracing::warn!("document driver dropped with a live session, abandoning it");
            if let Err(err) = session.close() {
                tracing::warn!(error = %err, "failed to flush abandoned document");
            }
        }
    }
}
