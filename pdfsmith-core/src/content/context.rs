use super::{FormHandle, PageId, ResourceNames};
use crate::error::{PdfError, Result};
use crate::graphics::Color;
use crate::objects::ObjectId;
use crate::resources::{ImageKey, ImagePlacement};
use crate::session::Session;
use crate::text::{encode_win_ansi, Font};
use crate::writer::format_number;
use crate::writer::serialize::escape_string;
use tracing::dispatcher::DefaultGuard;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Target {
    Page(PageId),
    Form(FormHandle),
}

/// Drawing view over one open page or form content stream.
///
/// Operations are buffered in call order. Numbers are written with at
/// most six decimals.
///
/// Once the session is poisoned the chainable operators record nothing,
/// and the fallible ones (`text_at`, `draw_image`) return
/// [`PdfError::SessionPoisoned`].
pub struct ContentContext<'a> {
    session: &'a mut Session,
    target: Target,
    _log: Option<DefaultGuard>,
}

fn numbers(values: &[f64]) -> String {
    values
        .iter()
        .map(|&value| format_number(value))
        .collect::<Vec<_>>()
        .join(" ")
}

impl<'a> ContentContext<'a> {
    /// `target` must name an open page or form of `session`.
    pub(crate) fn new(session: &'a mut Session, target: Target, log: Option<DefaultGuard>) -> Self {
        Self {
            session,
            target,
            _log: log,
        }
    }

    fn buffer(&mut self) -> &mut Vec<u8> {
        match self.target {
            Target::Page(page) => &mut self.session.content.pages[page.0].buffer,
            Target::Form(form) => &mut self.session.content.forms[form.0].buffer,
        }
    }

    fn resources(&mut self) -> &mut ResourceNames {
        match self.target {
            Target::Page(page) => &mut self.session.content.pages[page.0].resources,
            Target::Form(form) => &mut self.session.content.forms[form.0].resources,
        }
    }

    fn op(&mut self, line: impl AsRef<[u8]>) -> &mut Self {
        if self.session.poisoned {
            return self;
        }
        let buffer = self.buffer();
        buffer.extend_from_slice(line.as_ref());
        buffer.push(b'\n');
        self
    }

    fn ensure_usable(&self) -> Result<()> {
        if self.session.poisoned {
            return Err(PdfError::SessionPoisoned);
        }
        Ok(())
    }

    /// Append raw content stream bytes
    pub fn raw(&mut self, bytes: &[u8]) -> &mut Self {
        if !self.session.poisoned {
            self.buffer().extend_from_slice(bytes);
        }
        self
    }

    pub fn save_state(&mut self) -> &mut Self {
        self.op("q")
    }

    pub fn restore_state(&mut self) -> &mut Self {
        self.op("Q")
    }

    /// Concatenate `[a b c d e f]` to the current transformation matrix
    pub fn transform(&mut self, a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> &mut Self {
        let line = format!("{} cm", numbers(&[a, b, c, d, e, f]));
        self.op(line)
    }

    pub fn translate(&mut self, tx: f64, ty: f64) -> &mut Self {
        self.transform(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    pub fn scale(&mut self, sx: f64, sy: f64) -> &mut Self {
        self.transform(sx, 0.0, 0.0, sy, 0.0, 0.0)
    }

    pub fn move_to(&mut self, x: f64, y: f64) -> &mut Self {
        let line = format!("{} m", numbers(&[x, y]));
        self.op(line)
    }

    pub fn line_to(&mut self, x: f64, y: f64) -> &mut Self {
        let line = format!("{} l", numbers(&[x, y]));
        self.op(line)
    }

    pub fn curve_to(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, x3: f64, y3: f64) -> &mut Self {
        let line = format!("{} c", numbers(&[x1, y1, x2, y2, x3, y3]));
        self.op(line)
    }

    pub fn rect(&mut self, x: f64, y: f64, width: f64, height: f64) -> &mut Self {
        let line = format!("{} re", numbers(&[x, y, width, height]));
        self.op(line)
    }

    pub fn close_path(&mut self) -> &mut Self {
        self.op("h")
    }

    pub fn stroke(&mut self) -> &mut Self {
        self.op("S")
    }

    pub fn fill(&mut self) -> &mut Self {
        self.op("f")
    }

    pub fn fill_stroke(&mut self) -> &mut Self {
        self.op("B")
    }

    pub fn set_fill_color(&mut self, color: Color) -> &mut Self {
        self.op(color.fill_operator())
    }

    pub fn set_stroke_color(&mut self, color: Color) -> &mut Self {
        self.op(color.stroke_operator())
    }

    pub fn set_line_width(&mut self, width: f64) -> &mut Self {
        let line = format!("{} w", format_number(width));
        self.op(line)
    }

    /// Show `text` at `(x, y)` in one of the standard fonts. Text is
    /// encoded as WinAnsi; characters outside it print as `?`.
    pub fn text_at(&mut self, font: Font, size: f64, x: f64, y: f64, text: &str) -> Result<&mut Self> {
        self.ensure_usable()?;
        let result = self.session.font_resource(font);
        let (name, id) = self.session.track(result)?;
        self.resources().fonts.insert(name.clone(), id);

        let mut block = format!(
            "BT\n/{name} {} Tf\n{} Td\n(",
            format_number(size),
            numbers(&[x, y])
        )
        .into_bytes();
        block.extend_from_slice(&escape_string(&encode_win_ansi(text)));
        block.extend_from_slice(b") Tj\nET\n");
        self.buffer().extend_from_slice(&block);
        Ok(self)
    }

    /// Paint form XObject `form` with its origin at `(x, y)`
    pub fn draw_form(&mut self, form: ObjectId, x: f64, y: f64) -> &mut Self {
        if self.session.poisoned {
            return self;
        }
        let name = format!("Fm{}", form.number());
        self.resources().xobjects.insert(name.clone(), form);
        let line = format!("q\n{} cm\n/{name} Do\nQ", numbers(&[1.0, 0.0, 0.0, 1.0, x, y]));
        self.op(line)
    }

    /// Draw image `index` of `locator` with its lower-left corner at
    /// `(x, y)`. The image is embedded on first use and reused afterwards;
    /// an id reserved earlier through registration is written here.
    pub fn draw_image(
        &mut self,
        locator: &str,
        index: u32,
        x: f64,
        y: f64,
        placement: ImagePlacement,
    ) -> Result<&mut Self> {
        self.ensure_usable()?;
        let key = ImageKey::new(locator, index);

        let result = self.session.embedded_image(&key);
        let id = self.session.track(result)?;
        let result = self.session.image_dimensions(&key);
        let dimensions = self.session.track(result)?;

        let (sx, sy) = placement.scale_for(dimensions);
        let name = format!("Im{}", id.number());
        self.resources().xobjects.insert(name.clone(), id);
        let line = format!("q\n{} cm\n/{name} Do\nQ", numbers(&[sx, 0.0, 0.0, sy, x, y]));
        Ok(self.op(line))
    }
}
