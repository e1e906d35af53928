use super::{ContentHandle, ContentState, FormHandle, PageId};
use crate::error::{PdfError, Result};
use crate::geometry::Rectangle;
use crate::objects::{Dictionary, Object, ObjectId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Named resources referenced from a content stream
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct ResourceNames {
    pub(crate) fonts: BTreeMap<String, ObjectId>,
    pub(crate) xobjects: BTreeMap<String, ObjectId>,
}

impl ResourceNames {
    pub(crate) fn to_dictionary(&self) -> Dictionary {
        let mut resources = Dictionary::new();
        if !self.fonts.is_empty() {
            resources.set("Font", Self::named(&self.fonts));
        }
        if !self.xobjects.is_empty() {
            resources.set("XObject", Self::named(&self.xobjects));
        }
        resources
    }

    fn named(entries: &BTreeMap<String, ObjectId>) -> Dictionary {
        entries
            .iter()
            .map(|(name, id)| (name.clone(), Object::Reference(*id)))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct PageRecord {
    pub(crate) id: ObjectId,
    pub(crate) media_box: Rectangle,
    pub(crate) state: ContentState,
    /// Operations not yet written; only non-empty while open
    #[serde(skip)]
    pub(crate) buffer: Vec<u8>,
    /// Content stream objects already written, in call order
    pub(crate) segments: Vec<ObjectId>,
    pub(crate) resources: ResourceNames,
    /// Annotation objects listed in `/Annots`, in attach order
    #[serde(default)]
    pub(crate) annotations: Vec<ObjectId>,
}

impl PageRecord {
    /// Page dictionary as written by `write_page`
    pub(crate) fn to_dictionary(&self, parent: ObjectId) -> Dictionary {
        let mut dict = Dictionary::new();
        dict.set("Type", Object::name("Page"));
        dict.set("Parent", parent);
        dict.set("MediaBox", self.media_box.to_object());
        dict.set("Resources", self.resources.to_dictionary());
        match self.segments.as_slice() {
            [] => {}
            [single] => dict.set("Contents", *single),
            segments => dict.set(
                "Contents",
                Object::Array(segments.iter().copied().map(Object::Reference).collect()),
            ),
        }
        if !self.annotations.is_empty() {
            dict.set(
                "Annots",
                Object::Array(self.annotations.iter().copied().map(Object::Reference).collect()),
            );
        }
        dict
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct FormRecord {
    pub(crate) id: ObjectId,
    pub(crate) bbox: Rectangle,
    pub(crate) state: ContentState,
    #[serde(skip)]
    pub(crate) buffer: Vec<u8>,
    pub(crate) resources: ResourceNames,
}

impl FormRecord {
    pub(crate) fn to_dictionary(&self) -> Dictionary {
        let mut dict = Dictionary::new();
        dict.set("Type", Object::name("XObject"));
        dict.set("Subtype", Object::name("Form"));
        dict.set("FormType", 1);
        dict.set("BBox", self.bbox.to_object());
        dict.set("Resources", self.resources.to_dictionary());
        dict
    }
}

/// Page and form records of one document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct ContentManager {
    pub(crate) pages: Vec<PageRecord>,
    pub(crate) forms: Vec<FormRecord>,
}

impl ContentManager {
    pub(crate) fn create_page(&mut self, id: ObjectId, media_box: Rectangle) -> PageId {
        self.pages.push(PageRecord {
            id,
            media_box,
            state: ContentState::Idle,
            buffer: Vec::new(),
            segments: Vec::new(),
            resources: ResourceNames::default(),
            annotations: Vec::new(),
        });
        PageId(self.pages.len() - 1)
    }

    pub(crate) fn page(&self, page: PageId) -> Result<&PageRecord> {
        self.pages.get(page.0).ok_or(PdfError::UnknownPage(page.0))
    }

    pub(crate) fn page_mut(&mut self, page: PageId) -> Result<&mut PageRecord> {
        self.pages.get_mut(page.0).ok_or(PdfError::UnknownPage(page.0))
    }

    /// Unwritten page record, for operations that add content
    pub(crate) fn live_page_mut(&mut self, page: PageId) -> Result<&mut PageRecord> {
        let record = self.page_mut(page)?;
        if record.state == ContentState::Closed {
            return Err(PdfError::HandleClosed(page.0));
        }
        Ok(record)
    }

    /// Idle or Paused to Open
    pub(crate) fn open(&mut self, page: PageId) -> Result<ContentHandle> {
        let record = self.live_page_mut(page)?;
        if record.state == ContentState::Open {
            return Err(PdfError::PageAlreadyOpen(page.0));
        }
        record.state = ContentState::Open;
        Ok(ContentHandle { page })
    }

    /// Make sure the handle's page accepts operations, resuming it if paused
    pub(crate) fn resume(&mut self, handle: ContentHandle) -> Result<()> {
        let record = self.live_page_mut(handle.page)?;
        if record.state != ContentState::Open {
            tracing::debug!(page = handle.page.0, "resuming content stream");
            record.state = ContentState::Open;
        }
        Ok(())
    }

    pub(crate) fn create_form(&mut self, id: ObjectId, bbox: Rectangle) -> FormHandle {
        self.forms.push(FormRecord {
            id,
            bbox,
            state: ContentState::Open,
            buffer: Vec::new(),
            resources: ResourceNames::default(),
        });
        FormHandle(self.forms.len() - 1)
    }

    pub(crate) fn open_form_mut(&mut self, form: FormHandle) -> Result<&mut FormRecord> {
        let record = self
            .forms
            .get_mut(form.0)
            .ok_or(PdfError::UnknownForm(form.0))?;
        if record.state == ContentState::Closed {
            return Err(PdfError::HandleClosed(form.0));
        }
        Ok(record)
    }

    /// Descriptions of everything whose content is still open
    pub(crate) fn open_items(&self) -> Vec<String> {
        let pages = self
            .pages
            .iter()
            .enumerate()
            .filter(|(_, record)| record.state == ContentState::Open)
            .map(|(index, _)| format!("page {index}"));
        let forms = self
            .forms
            .iter()
            .enumerate()
            .filter(|(_, record)| record.state == ContentState::Open)
            .map(|(index, _)| format!("form {index}"));
        pages.chain(forms).collect()
    }

    /// Pages created but never written
    pub(crate) fn unwritten_pages(&self) -> impl Iterator<Item = (usize, &PageRecord)> {
        self.pages
            .iter()
            .enumerate()
            .filter(|(_, record)| record.state != ContentState::Closed)
    }
}
