//! PDF writing functionality

mod object_writer;
pub mod serialize;

pub(crate) use object_writer::ObjectWriter;
pub use object_writer::XRefLayout;
pub use serialize::{format_number, format_pdf_date, text_string};
