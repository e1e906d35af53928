use super::serialize::write_value;
use crate::compression;
use crate::error::{PdfError, Result};
use crate::io::{FinishedOutput, Sink};
use crate::objects::{Dictionary, Object, ObjectId};
use crate::parser::PdfVersion;
use std::collections::BTreeMap;
use std::io::Write;

/// Shape of the cross-reference section written at the end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XRefLayout {
    /// One subsection from object 0, gaps written as free entries
    Full,
    /// Only objects written by this session, in contiguous subsections
    Incremental,
}

/// Streams objects to the sink and remembers where each one starts.
pub(crate) struct ObjectWriter {
    sink: Sink,
    next_number: u32,
    offsets: BTreeMap<u32, u64>,
}

impl ObjectWriter {
    /// `first_number` is the number the first allocation returns.
    pub(crate) fn new(sink: Sink, first_number: u32) -> Self {
        Self {
            sink,
            next_number: first_number.max(1),
            offsets: BTreeMap::new(),
        }
    }

    /// Rebuild a writer from persisted counters.
    pub(crate) fn restore(sink: Sink, next_number: u32, offsets: BTreeMap<u32, u64>) -> Self {
        Self {
            sink,
            next_number: next_number.max(1),
            offsets,
        }
    }

    pub(crate) fn allocate(&mut self) -> ObjectId {
        let id = ObjectId::new(self.next_number, 0);
        self.next_number += 1;
        id
    }

    pub(crate) fn next_number(&self) -> u32 {
        self.next_number
    }

    pub(crate) fn position(&self) -> u64 {
        self.sink.position()
    }

    pub(crate) fn offsets(&self) -> &BTreeMap<u32, u64> {
        &self.offsets
    }

    pub(crate) fn is_written(&self, id: ObjectId) -> bool {
        self.offsets.contains_key(&id.number())
    }

    pub(crate) fn write_header(&mut self, version: PdfVersion) -> Result<()> {
        self.write_bytes(format!("%PDF-{version}\n").as_bytes())?;
        // Binary comment to ensure file is treated as binary
        self.write_bytes(&[b'%', 0xE2, 0xE3, 0xCF, 0xD3, b'\n'])
    }

    pub(crate) fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        self.sink.write_all(data)?;
        Ok(())
    }

    pub(crate) fn write_object(&mut self, id: ObjectId, object: &Object) -> Result<()> {
        if self.is_written(id) {
            return Err(PdfError::ObjectAlreadyWritten(id.number()));
        }
        let offset = self.sink.position();
        self.offsets.insert(id.number(), offset);

        writeln!(self.sink, "{} {} obj", id.number(), id.generation())?;
        write_value(&mut self.sink, object)?;
        self.sink.write_all(b"\nendobj\n")?;

        tracing::debug!(%id, offset, "wrote object");
        Ok(())
    }

    /// Write a stream, Flate-compressing it first unless it is already
    /// filtered or `compress` is off.
    pub(crate) fn write_stream(
        &mut self,
        id: ObjectId,
        mut dict: Dictionary,
        data: Vec<u8>,
        compress: bool,
    ) -> Result<()> {
        let data = if compress {
            compression::encode_stream(&mut dict, data)?
        } else {
            data
        };
        self.write_object(id, &Object::Stream(dict, data))
    }

    /// Write the cross-reference section and trailer. `trailer` carries
    /// everything but `/Size`. Returns the `startxref` offset.
    pub(crate) fn write_xref_and_trailer(
        &mut self,
        trailer: Dictionary,
        layout: XRefLayout,
    ) -> Result<u64> {
        let xref_position = self.sink.position();
        let mut table = String::from("xref\n");

        match layout {
            XRefLayout::Full => {
                table.push_str(&format!("0 {}\n", self.next_number));
                table.push_str("0000000000 65535 f \n");
                for number in 1..self.next_number {
                    match self.offsets.get(&number) {
                        Some(offset) => table.push_str(&format!("{offset:010} 00000 n \n")),
                        // Allocated but never written
                        None => table.push_str("0000000000 00000 f \n"),
                    }
                }
            }
            XRefLayout::Incremental => {
                for (first, offsets) in contiguous_runs(&self.offsets) {
                    table.push_str(&format!("{first} {}\n", offsets.len()));
                    for offset in offsets {
                        table.push_str(&format!("{offset:010} 00000 n \n"));
                    }
                }
            }
        }
        self.write_bytes(table.as_bytes())?;

        // /Size goes first
        let mut ordered = Dictionary::with_capacity(trailer.len());
        ordered.set("Size", Object::Integer(i64::from(self.next_number)));
        for (key, value) in trailer.entries() {
            if key != "Size" {
                ordered.set(key.clone(), value.clone());
            }
        }

        self.write_bytes(b"trailer\n")?;
        write_value(&mut self.sink, &Object::Dictionary(ordered))?;
        self.write_bytes(format!("\nstartxref\n{xref_position}\n%%EOF\n").as_bytes())?;

        tracing::debug!(
            xref_position,
            size = self.next_number,
            ?layout,
            "wrote cross-reference section"
        );
        Ok(xref_position)
    }

    pub(crate) fn flush(&mut self) -> Result<()> {
        self.sink.flush()?;
        Ok(())
    }

    pub(crate) fn finish(self) -> Result<FinishedOutput> {
        Ok(self.sink.finish()?)
    }
}

/// Group sorted object numbers into `(first, offsets)` runs
fn contiguous_runs(offsets: &BTreeMap<u32, u64>) -> Vec<(u32, Vec<u64>)> {
    let mut runs: Vec<(u32, Vec<u64>)> = Vec::new();
    for (&number, &offset) in offsets {
        match runs.last_mut() {
            Some((first, run)) if *first + run.len() as u32 == number => run.push(offset),
            _ => runs.push((number, vec![offset])),
        }
    }
    runs
}
