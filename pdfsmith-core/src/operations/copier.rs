use crate::error::Result;
use crate::objects::{Dictionary, Object, ObjectId};
use crate::parser::PdfReader;
use crate::writer::ObjectWriter;
use std::collections::{HashMap, VecDeque};

/// Deep-copies objects from a source document into the output,
/// renumbering every reference.
///
/// Each source object is copied once per copier: the mapping from source
/// ids to output ids is kept for the copier's lifetime, so objects shared
/// between several copied pages are written a single time.
///
/// A copier over the source of an incremental update maps every id to
/// itself and copies nothing, since the output already holds those
/// objects.
pub(crate) struct ObjectCopier {
    mapping: HashMap<ObjectId, ObjectId>,
    pending: VecDeque<(ObjectId, ObjectId)>,
    compress: bool,
    identity: bool,
}

/// Object types that would drag a whole document along
const BARRIER_TYPES: [&str; 3] = ["Page", "Pages", "Catalog"];

impl ObjectCopier {
    pub(crate) fn new(compress: bool) -> Self {
        Self {
            mapping: HashMap::new(),
            pending: VecDeque::new(),
            compress,
            identity: false,
        }
    }

    pub(crate) fn for_modified_source(compress: bool) -> Self {
        Self {
            identity: true,
            ..Self::new(compress)
        }
    }

    /// Output id for a source id, allocating one on first sight.
    pub(crate) fn map_reference(&mut self, writer: &mut ObjectWriter, source: ObjectId) -> ObjectId {
        if self.identity {
            return source;
        }
        if let Some(&target) = self.mapping.get(&source) {
            return target;
        }
        let target = writer.allocate();
        self.mapping.insert(source, target);
        self.pending.push_back((source, target));
        target
    }

    /// Output id a source object was copied to, if it was
    pub(crate) fn mapped(&self, source: ObjectId) -> Option<ObjectId> {
        if self.identity {
            return Some(source);
        }
        self.mapping.get(&source).copied()
    }

    /// Copy of `object` with references renumbered; everything it refers
    /// to is written before this returns.
    pub(crate) fn copy(
        &mut self,
        reader: &mut PdfReader,
        writer: &mut ObjectWriter,
        object: &Object,
    ) -> Result<Object> {
        let copied = self.rewrite(writer, object);
        self.drain(reader, writer)?;
        Ok(copied)
    }

    /// Copy every entry of a dictionary except `skip`.
    pub(crate) fn copy_dictionary(
        &mut self,
        reader: &mut PdfReader,
        writer: &mut ObjectWriter,
        dict: &Dictionary,
        skip: &[&str],
    ) -> Result<Dictionary> {
        let mut copied = Dictionary::with_capacity(dict.len());
        for (key, value) in dict.iter() {
            if !skip.contains(&key.as_str()) {
                copied.set(key.clone(), self.rewrite(writer, value));
            }
        }
        self.drain(reader, writer)?;
        Ok(copied)
    }

    fn rewrite(&mut self, writer: &mut ObjectWriter, object: &Object) -> Object {
        match object {
            Object::Reference(id) => Object::Reference(self.map_reference(writer, *id)),
            Object::Array(items) => {
                Object::Array(items.iter().map(|item| self.rewrite(writer, item)).collect())
            }
            Object::Dictionary(dict) => Object::Dictionary(self.rewrite_dict(writer, dict)),
            Object::Stream(dict, data) => {
                let mut dict = self.rewrite_dict(writer, dict);
                // Recomputed on write
                dict.remove("Length");
                Object::Stream(dict, data.clone())
            }
            other => other.clone(),
        }
    }

    fn rewrite_dict(&mut self, writer: &mut ObjectWriter, dict: &Dictionary) -> Dictionary {
        let mut rewritten = Dictionary::with_capacity(dict.len());
        for (key, value) in dict.iter() {
            // An indirect stream length would otherwise be copied for nothing
            if key == "Length" && value.as_reference().is_some() {
                continue;
            }
            rewritten.set(key.clone(), self.rewrite(writer, value));
        }
        rewritten
    }

    fn drain(&mut self, reader: &mut PdfReader, writer: &mut ObjectWriter) -> Result<()> {
        while let Some((source, target)) = self.pending.pop_front() {
            let object = reader.get_object(source)?;
            let barrier = object
                .as_dict()
                .and_then(Dictionary::get_type)
                .is_some_and(|kind| BARRIER_TYPES.contains(&kind));
            if barrier {
                tracing::warn!(%source, "not copying page tree object reached by reference");
                writer.write_object(target, &Object::Null)?;
                continue;
            }

            match self.rewrite(writer, &object) {
                Object::Stream(dict, data) => {
                    // Raw data keeps its filters; compress only plain streams
                    writer.write_stream(target, dict, data, self.compress)?
                }
                other => writer.write_object(target, &other)?,
            }
            tracing::debug!(%source, %target, "copied object");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{OutputTarget, Sink};

    fn source_pdf() -> Vec<u8> {
        let mut pdf = b"%PDF-1.4\n".to_vec();
        let mut offsets = Vec::new();
        let objects = [
            "<< /Type /Catalog /Pages 2 0 R >>",
            "<< /Type /Pages /Kids [3 0 R] /Count 1 >>",
            "<< /Type /Page /Parent 2 0 R /Resources << /Font << /F1 4 0 R >> >> >>",
            "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Self 4 0 R /Shared 5 0 R >>",
            "<< /Back 4 0 R /Page 3 0 R >>",
        ];
        for (i, body) in objects.iter().enumerate() {
            offsets.push(pdf.len());
            pdf.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, body).as_bytes());
        }
        let xref = pdf.len();
        pdf.extend_from_slice(format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1).as_bytes());
        for offset in offsets {
            pdf.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
        }
        pdf.extend_from_slice(
            format!("trailer\n<< /Size 6 /Root 1 0 R >>\nstartxref\n{xref}\n%%EOF\n").as_bytes(),
        );
        pdf
    }

    #[test]
    fn test_copy_renumbers_and_handles_cycles() {
        let mut reader = PdfReader::from_bytes(source_pdf()).unwrap();
        let mut writer = ObjectWriter::new(Sink::create(OutputTarget::memory()).unwrap(), 10);
        let mut copier = ObjectCopier::new(false);

        let copied = copier
            .copy(&mut reader, &mut writer, &Object::Reference(ObjectId::new(4, 0)))
            .unwrap();
        assert_eq!(copied, Object::Reference(ObjectId::new(10, 0)));
        assert_eq!(copier.mapped(ObjectId::new(5, 0)), Some(ObjectId::new(11, 0)));
        // The page reached through /Page is replaced by null
        assert_eq!(copier.mapped(ObjectId::new(3, 0)), Some(ObjectId::new(12, 0)));
        assert_eq!(writer.next_number(), 13);
        assert!(writer.is_written(ObjectId::new(12, 0)));

        let output = writer.finish().unwrap().into_bytes().unwrap();
        let text = String::from_utf8_lossy(&output);
        assert!(text.contains("10 0 obj\n<<\n/Type /Font"));
        assert!(text.contains("/Self 10 0 R"));
        assert!(text.contains("/Back 10 0 R"));
        assert!(text.contains("12 0 obj\nnull\nendobj"));
    }

    #[test]
    fn test_copy_is_shared_across_calls() {
        let mut reader = PdfReader::from_bytes(source_pdf()).unwrap();
        let mut writer = ObjectWriter::new(Sink::create(OutputTarget::memory()).unwrap(), 1);
        let mut copier = ObjectCopier::new(false);
        let font = Object::Reference(ObjectId::new(4, 0));

        let first = copier.copy(&mut reader, &mut writer, &font).unwrap();
        let next = writer.next_number();
        let second = copier.copy(&mut reader, &mut writer, &font).unwrap();
        assert_eq!(first, second);
        assert_eq!(writer.next_number(), next);
    }

    #[test]
    fn test_modified_source_copier_keeps_ids() {
        let mut reader = PdfReader::from_bytes(source_pdf()).unwrap();
        let mut writer = ObjectWriter::new(Sink::create(OutputTarget::memory()).unwrap(), 6);
        let mut copier = ObjectCopier::for_modified_source(false);

        let page = reader.get_object(ObjectId::new(3, 0)).unwrap();
        let copied = copier
            .copy_dictionary(&mut reader, &mut writer, page.as_dict().unwrap(), &["Parent"])
            .unwrap();
        assert_eq!(
            copied.get_dict("Resources").and_then(|r| r.get_dict("Font")).and_then(|f| f.get_reference("F1")),
            Some(ObjectId::new(4, 0))
        );
        assert_eq!(copier.mapped(ObjectId::new(4, 0)), Some(ObjectId::new(4, 0)));
        assert_eq!(writer.next_number(), 6);
        assert_eq!(writer.position(), 0);
    }

    #[test]
    fn test_copy_dictionary_skips_keys() {
        let mut reader = PdfReader::from_bytes(source_pdf()).unwrap();
        let mut writer = ObjectWriter::new(Sink::create(OutputTarget::memory()).unwrap(), 1);
        let mut copier = ObjectCopier::new(false);
        let page = reader.get_object(ObjectId::new(3, 0)).unwrap();

        let copied = copier
            .copy_dictionary(&mut reader, &mut writer, page.as_dict().unwrap(), &["Parent"])
            .unwrap();
        assert!(!copied.contains_key("Parent"));
        assert!(copied.contains_key("Resources"));
        assert!(copier.mapped(ObjectId::new(2, 0)).is_none());
    }
}
