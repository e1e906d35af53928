//! Text with the standard 14 fonts.

mod encoding;
mod font;

pub use encoding::encode_win_ansi;
pub use font::{Font, FontFamily};
