//! Page tree flattening (ISO 32000-1 Section 7.7.3).
//!
//! Attributes that may be inherited from `/Pages` nodes are copied into each
//! page's dictionary so a page can be used on its own.

use super::reader::PdfReader;
use super::ParseResult;
use crate::geometry::Rectangle;
use crate::objects::{Dictionary, Object, ObjectId};
use std::collections::HashSet;

/// Attributes a page inherits from its ancestors (Table 30)
pub const INHERITABLE_KEYS: [&str; 4] = ["Resources", "MediaBox", "CropBox", "Rotate"];

/// A leaf of the page tree with inherited attributes resolved
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedPage {
    /// Object id of the page dictionary in the source document
    pub id: ObjectId,
    /// The page dictionary, inherited keys merged in
    pub dict: Dictionary,
    /// Effective media box (US Letter when none is given anywhere)
    pub media_box: Rectangle,
}

impl ParsedPage {
    pub fn width(&self) -> f64 {
        self.media_box.width()
    }

    pub fn height(&self) -> f64 {
        self.media_box.height()
    }

    pub fn resources(&self) -> Option<&Object> {
        self.dict.get("Resources")
    }

    pub fn rotation(&self) -> i64 {
        self.dict.get_integer("Rotate").unwrap_or(0)
    }
}

/// Walk the tree under `root` in document order.
pub fn collect_pages(reader: &mut PdfReader, root: ObjectId) -> ParseResult<Vec<ParsedPage>> {
    let mut pages = Vec::new();
    let mut visited = HashSet::new();
    let mut stack = vec![(root, Dictionary::new())];

    while let Some((id, inherited)) = stack.pop() {
        if !visited.insert(id) {
            tracing::warn!(%id, "page tree node visited twice, skipping");
            continue;
        }

        let node = match reader.get_object(id)? {
            Object::Dictionary(dict) => dict,
            other => {
                tracing::warn!(%id, ?other, "page tree node is not a dictionary");
                continue;
            }
        };

        let kids = match node.get("Kids") {
            Some(kids) => Some(reader.resolve(kids)?),
            None => None,
        };
        let is_pages = node.get_type() == Some("Pages") || kids.is_some();

        if is_pages {
            let mut passed_down = inherited;
            for key in INHERITABLE_KEYS {
                if let Some(value) = node.get(key) {
                    passed_down.set(key, value.clone());
                }
            }
            if let Some(Object::Array(kids)) = kids {
                // Reversed so the first kid is popped first
                for kid in kids.iter().rev() {
                    if let Some(kid) = kid.as_reference() {
                        stack.push((kid, passed_down.clone()));
                    }
                }
            }
        } else {
            let mut dict = node;
            for (key, value) in inherited.iter() {
                if !dict.contains_key(key) {
                    dict.set(key.clone(), value.clone());
                }
            }
            let media_box = match dict.get("MediaBox") {
                Some(value) => Rectangle::from_object(&reader.resolve(value)?),
                None => None,
            }
            .unwrap_or_else(Rectangle::letter);
            pages.push(ParsedPage { id, dict, media_box });
        }
    }

    Ok(pages)
}
