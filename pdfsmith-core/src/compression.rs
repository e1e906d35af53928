//! Flate encoding of outgoing stream data.

use crate::error::Result;
use crate::objects::{Dictionary, Object};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::Write;

/// Zlib-compress `data` at the default level. Output depends only on the
/// input, which keeps resumed sessions byte-identical.
pub fn compress(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::with_capacity(data.len() / 2), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

/// Flate-encode stream `data` and mark `dict` accordingly. Data that is
/// empty or already carries a `/Filter` is returned unchanged.
pub fn encode_stream(dict: &mut Dictionary, data: Vec<u8>) -> Result<Vec<u8>> {
    if data.is_empty() || dict.contains_key("Filter") {
        return Ok(data);
    }
    let encoded = compress(&data)?;
    dict.set("Filter", Object::name("FlateDecode"));
    Ok(encoded)
}
