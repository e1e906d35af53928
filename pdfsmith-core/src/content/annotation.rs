//! Link annotations

use crate::error::{PdfError, Result};
use crate::geometry::Rectangle;
use crate::objects::{Dictionary, Object};

/// Print flag: the annotation is printed with the page
const FLAG_PRINT: i64 = 4;

/// A link that opens `uri` when the area `rect` of the page is clicked.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct UriLink {
    rect: Rectangle,
    uri: String,
}

impl UriLink {
    /// URIs are 7-bit ASCII; anything else must be percent-encoded first.
    pub(crate) fn new(rect: Rectangle, uri: &str) -> Result<Self> {
        if uri.is_empty() {
            return Err(PdfError::InvalidArgument("link URI is empty".to_string()));
        }
        if !uri.is_ascii() {
            return Err(PdfError::InvalidArgument(format!(
                "link URI {uri:?} is not ASCII"
            )));
        }
        Ok(Self {
            rect,
            uri: uri.to_string(),
        })
    }

    fn action(&self) -> Dictionary {
        let mut action = Dictionary::new();
        action.set("Type", Object::name("Action"));
        action.set("S", Object::name("URI"));
        action.set("URI", Object::String(self.uri.clone().into_bytes()));
        action
    }

    /// Annotation dictionary, written as its own object. No border is drawn.
    pub(crate) fn to_dictionary(&self) -> Dictionary {
        let mut border = Dictionary::new();
        border.set("W", 0);

        let mut dict = Dictionary::new();
        dict.set("Type", Object::name("Annot"));
        dict.set("Subtype", Object::name("Link"));
        dict.set("Rect", self.rect.to_object());
        dict.set("F", FLAG_PRINT);
        dict.set("BS", border);
        dict.set("A", self.action());
        dict
    }
}
