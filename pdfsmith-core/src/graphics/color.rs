use crate::writer::format_number;
use serde::{Deserialize, Serialize};

/// Represents a color in PDF documents.
///
/// Supports RGB, Grayscale, and CMYK color spaces.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Color {
    /// RGB color (red, green, blue) with values from 0.0 to 1.0
    Rgb(f64, f64, f64),
    /// Grayscale color with value from 0.0 (black) to 1.0 (white)
    Gray(f64),
    /// CMYK color (cyan, magenta, yellow, key/black) with values from 0.0 to 1.0
    Cmyk(f64, f64, f64, f64),
}

impl Color {
    /// Creates an RGB color with values clamped to 0.0-1.0.
    pub fn rgb(r: f64, g: f64, b: f64) -> Self {
        Color::Rgb(r.clamp(0.0, 1.0), g.clamp(0.0, 1.0), b.clamp(0.0, 1.0))
    }

    /// Creates a grayscale color with value clamped to 0.0-1.0.
    pub fn gray(value: f64) -> Self {
        Color::Gray(value.clamp(0.0, 1.0))
    }

    /// Creates a CMYK color with values clamped to 0.0-1.0.
    pub fn cmyk(c: f64, m: f64, y: f64, k: f64) -> Self {
        Color::Cmyk(
            c.clamp(0.0, 1.0),
            m.clamp(0.0, 1.0),
            y.clamp(0.0, 1.0),
            k.clamp(0.0, 1.0),
        )
    }

    pub fn black() -> Self {
        Color::Gray(0.0)
    }

    pub fn white() -> Self {
        Color::Gray(1.0)
    }

    pub fn red() -> Self {
        Color::Rgb(1.0, 0.0, 0.0)
    }

    pub fn green() -> Self {
        Color::Rgb(0.0, 1.0, 0.0)
    }

    pub fn blue() -> Self {
        Color::Rgb(0.0, 0.0, 1.0)
    }

    /// Operator setting this as the non-stroking color, e.g. `1 0 0 rg`
    pub fn fill_operator(&self) -> String {
        self.operator(false)
    }

    /// Operator setting this as the stroking color, e.g. `1 0 0 RG`
    pub fn stroke_operator(&self) -> String {
        self.operator(true)
    }

    fn operator(&self, stroke: bool) -> String {
        let (components, op): (Vec<f64>, &str) = match *self {
            Color::Rgb(r, g, b) => (vec![r, g, b], "rg"),
            Color::Gray(g) => (vec![g], "g"),
            Color::Cmyk(c, m, y, k) => (vec![c, m, y, k], "k"),
        };
        let mut text: Vec<String> = components.into_iter().map(format_number).collect();
        text.push(if stroke {
            op.to_uppercase()
        } else {
            op.to_string()
        });
        text.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors_clamp() {
        assert_eq!(Color::rgb(1.5, -0.5, 0.5), Color::Rgb(1.0, 0.0, 0.5));
        assert_eq!(Color::gray(2.0), Color::Gray(1.0));
        assert_eq!(Color::cmyk(0.1, 0.2, 0.3, 1.4), Color::Cmyk(0.1, 0.2, 0.3, 1.0));
    }

    #[test]
    fn test_fill_and_stroke_operators() {
        assert_eq!(Color::red().fill_operator(), "1 0 0 rg");
        assert_eq!(Color::red().stroke_operator(), "1 0 0 RG");
        assert_eq!(Color::gray(0.5).fill_operator(), "0.5 g");
        assert_eq!(Color::black().stroke_operator(), "0 G");
        assert_eq!(
            Color::cmyk(0.0, 0.25, 1.0, 0.0).fill_operator(),
            "0 0.25 1 0 k"
        );
    }
}
