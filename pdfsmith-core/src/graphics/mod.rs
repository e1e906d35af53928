//! Colors and image decoding used when drawing.

mod color;
pub mod jpeg;
pub mod tiff_image;

pub use color::Color;
pub use jpeg::{parse_jpeg_header, ImageColorSpace, JpegDensity, JpegInfo};
pub use tiff_image::{DecodedImage, TiffInfo};
