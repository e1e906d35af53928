//! Copying pages and objects out of other PDF documents.
//!
//! The session-level operations (`append_pdf_pages_from_pdf`,
//! `merge_pdf_pages_to_page`, `create_form_xobjects_from_pdf`) live on
//! [`crate::DocumentDriver`]; this module holds the page selection and the
//! object graph copier they share.

mod copier;
pub(crate) mod pages;

pub(crate) use copier::ObjectCopier;

use crate::error::{PdfError, Result};
use std::str::FromStr;

/// Page range specification (0-based indices)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageRange {
    /// All pages
    All,
    /// Specific pages, in the given order
    Indices(Vec<usize>),
    /// Inclusive range of pages
    Span { start: usize, end: usize },
}

impl PageRange {
    pub fn single(index: usize) -> Self {
        PageRange::Indices(vec![index])
    }

    /// Parse a 1-based page specification
    ///
    /// Examples:
    /// - "all" -> All pages
    /// - "3" -> page index 2
    /// - "1-5" -> indices 0 through 4
    /// - "1-3,5" -> indices 0, 1, 2, 4
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(PdfError::InvalidArgument("Empty page range".to_string()));
        }
        if s.eq_ignore_ascii_case("all") {
            return Ok(PageRange::All);
        }

        let mut indices = Vec::new();
        let mut parts = 0;
        let mut last_span = None;
        for part in s.split(',') {
            parts += 1;
            let part = part.trim();
            match part.split_once('-') {
                Some((start, end)) => {
                    let start = parse_page_number(start)?;
                    let end = parse_page_number(end)?;
                    if start > end {
                        return Err(PdfError::InvalidArgument(format!(
                            "Start {} is greater than end {}",
                            start + 1,
                            end + 1
                        )));
                    }
                    indices.extend(start..=end);
                    last_span = Some((start, end));
                }
                None => indices.push(parse_page_number(part)?),
            }
        }

        Ok(match (parts, last_span) {
            (1, Some((start, end))) => PageRange::Span { start, end },
            _ => PageRange::Indices(indices),
        })
    }

    /// Resolve against a document with `total_pages` pages.
    pub fn get_indices(&self, total_pages: usize) -> Result<Vec<usize>> {
        let out_of_range = |index| PdfError::PageIndexOutOfRange {
            index,
            count: total_pages,
        };
        match self {
            PageRange::All => Ok((0..total_pages).collect()),
            PageRange::Span { start, end } => {
                if *end >= total_pages {
                    Err(out_of_range(*end))
                } else {
                    Ok((*start..=*end).collect())
                }
            }
            PageRange::Indices(pages) => {
                if let Some(&page) = pages.iter().find(|&&page| page >= total_pages) {
                    return Err(out_of_range(page));
                }
                Ok(pages.clone())
            }
        }
    }
}

impl FromStr for PageRange {
    type Err = PdfError;

    fn from_str(s: &str) -> Result<Self> {
        PageRange::parse(s)
    }
}

fn parse_page_number(text: &str) -> Result<usize> {
    let text = text.trim();
    match text.parse::<usize>() {
        Ok(0) => Err(PdfError::InvalidArgument(
            "Page numbers start at 1".to_string(),
        )),
        Ok(page) => Ok(page - 1),
        Err(_) => Err(PdfError::InvalidArgument(format!("Invalid page: {text}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_forms() {
        assert_eq!(PageRange::parse("all").unwrap(), PageRange::All);
        assert_eq!(PageRange::parse("3").unwrap(), PageRange::Indices(vec![2]));
        assert_eq!(
            PageRange::parse("1-5").unwrap(),
            PageRange::Span { start: 0, end: 4 }
        );
        assert_eq!(
            PageRange::parse("1-3, 5").unwrap(),
            PageRange::Indices(vec![0, 1, 2, 4])
        );
        assert_eq!(
            PageRange::parse("4,1").unwrap(),
            PageRange::Indices(vec![3, 0])
        );
    }

    #[test]
    fn test_parse_rejects() {
        for text in ["", "0", "3-1", "a", "1,,2", "1-"] {
            assert!(
                matches!(PageRange::parse(text), Err(PdfError::InvalidArgument(_))),
                "{text:?}"
            );
        }
    }

    #[test]
    fn test_get_indices() {
        assert_eq!(PageRange::All.get_indices(3).unwrap(), vec![0, 1, 2]);
        assert_eq!(
            PageRange::Span { start: 1, end: 2 }.get_indices(3).unwrap(),
            vec![1, 2]
        );
        assert!(matches!(
            PageRange::Span { start: 1, end: 3 }.get_indices(3),
            Err(PdfError::PageIndexOutOfRange { index: 3, count: 3 })
        ));
        assert!(matches!(
            PageRange::single(5).get_indices(2),
            Err(PdfError::PageIndexOutOfRange { index: 5, count: 2 })
        ));
    }

    proptest! {
        #[test]
        fn prop_span_parses_to_inclusive_range(start in 1usize..500, len in 0usize..500) {
            let end = start + len;
            let range = PageRange::parse(&format!("{start}-{end}")).unwrap();
            let indices = range.get_indices(end).unwrap();
            prop_assert_eq!(indices.len(), len + 1);
            prop_assert_eq!(indices[0], start - 1);
            prop_assert_eq!(*indices.last().unwrap(), end - 1);
        }

        #[test]
        fn prop_list_keeps_order(pages in proptest::collection::vec(1usize..100, 1..20)) {
            let text = pages.iter().map(|p| p.to_string()).collect::<Vec<_>>().join(",");
            let range = PageRange::parse(&text).unwrap();
            let expected: Vec<usize> = pages.iter().map(|p| p - 1).collect();
            prop_assert_eq!(range.get_indices(100).unwrap(), expected);
        }
    }
}
