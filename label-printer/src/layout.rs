//! Label layout engine
//!
//! Computes the one [`LayoutPlan`] that both the TSPL command builder and the
//! PDF preview serialize. Neither serializer derives geometry on its own: they
//! only read plan fields and scale them with [`LayoutPlan::to_points`] /
//! [`LayoutPlan::to_dots`].
//!
//! Text widths are estimated as `chars × char_width` from the printer font
//! cell size. This is an approximation, not a font metrics engine.

use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::job::{LabelContent, MediaSpec};
use crate::symbology::ModuleMatrix;

pub const MM_PER_INCH: f32 = 25.4;
pub const POINTS_PER_INCH: f32 = 72.0;

/// Baseline position inside a font cell, as a fraction of the cell height
const BASELINE_FRACTION: f32 = 0.8;

/// Coordinate system a plan is expressed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceUnit {
    /// PDF points, 72 per inch
    Point,
    /// Printer dots, `media.dot_density` per millimetre
    Dot,
}

impl DeviceUnit {
    pub fn units_per_mm(self, media: &MediaSpec) -> f32 {
        match self {
            DeviceUnit::Point => POINTS_PER_INCH / MM_PER_INCH,
            DeviceUnit::Dot => media.dot_density,
        }
    }
}

/// Built-in TSPL bitmap fonts
///
/// Cell sizes are defined on the 8 dots/mm (203 dpi) grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrinterFont {
    Font1,
    Font2,
    Font3,
    Font4,
    Font5,
}

impl PrinterFont {
    /// Font selector token used in `TEXT` commands
    pub fn selector(self) -> &'static str {
        match self {
            PrinterFont::Font1 => "1",
            PrinterFont::Font2 => "2",
            PrinterFont::Font3 => "3",
            PrinterFont::Font4 => "4",
            PrinterFont::Font5 => "5",
        }
    }

    /// Character cell `(width, height)` in 203 dpi dots
    fn cell_dots(self) -> (f32, f32) {
        match self {
            PrinterFont::Font1 => (8.0, 12.0),
            PrinterFont::Font2 => (12.0, 20.0),
            PrinterFont::Font3 => (16.0, 24.0),
            PrinterFont::Font4 => (24.0, 32.0),
            PrinterFont::Font5 => (32.0, 48.0),
        }
    }

    pub fn height_mm(self) -> f32 {
        self.cell_dots().1 / 8.0
    }

    /// Average glyph width in millimetres
    pub fn glyph_width_mm(self) -> f32 {
        self.cell_dots().0 / 8.0
    }
}

/// Layout policy knobs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelStyle {
    /// Blank border kept on every side
    pub margin_mm: f32,
    /// Narrowest legible module
    pub min_module_mm: f32,
    /// Vertical gap between barcode, code line and article line
    pub line_gap_mm: f32,
    /// Shortest bar height accepted before text bands give way
    pub min_bar_height_mm: f32,
    pub code_font: PrinterFont,
    pub article_font: PrinterFont,
    /// Space out the human-readable code ("4 0 0 6 ...") when it still fits
    pub spaced_code: bool,
    /// Prepended to the article text
    pub article_prefix: String,
}

impl Default for LabelStyle {
    fn default() -> Self {
        Self {
            margin_mm: 2.0,
            min_module_mm: 0.25,
            line_gap_mm: 1.0,
            min_bar_height_mm: 5.0,
            code_font: PrinterFont::Font3,
            article_font: PrinterFont::Font2,
            spaced_code: true,
            article_prefix: "Арт: ".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

/// One positioned line of text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextLine {
    pub text: String,
    pub font: PrinterFont,
    /// Centering offset from the left label edge
    pub origin_x: f32,
    /// Top of the font cell (TSPL anchor)
    pub top_y: f32,
    /// Baseline (PDF anchor)
    pub baseline_y: f32,
    pub font_height: f32,
    pub char_width: f32,
    pub estimated_width: f32,
}

/// Geometry of one label, shared by every output form
///
/// Y grows downwards from the top label edge in every unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutPlan {
    pub unit: DeviceUnit,
    pub units_per_mm: f32,
    pub label_width: f32,
    pub label_height: f32,
    pub barcode_origin: Point,
    pub barcode_size: Size,
    /// Narrow bar width
    pub module_width: f32,
    pub code_line: TextLine,
    pub article_line: TextLine,
}

impl LayoutPlan {
    pub fn human_text_baseline_y(&self) -> f32 {
        self.code_line.baseline_y
    }

    pub fn article_baseline_y(&self) -> f32 {
        self.article_line.baseline_y
    }

    /// Convert a plan value to PDF points
    pub fn to_points(&self, value: f32) -> f32 {
        value / self.units_per_mm * POINTS_PER_INCH / MM_PER_INCH
    }

    /// Convert a plan value to printer dots
    pub fn to_dots(&self, value: f32, media: &MediaSpec) -> f32 {
        value / self.units_per_mm * media.dot_density
    }

    /// Whole printer dots for a command token
    pub fn dots(&self, value: f32, media: &MediaSpec) -> u32 {
        self.to_dots(value, media).round().max(0.0) as u32
    }
}

/// Compute the label layout with the default style
pub fn compute_layout_default(
    matrix: &ModuleMatrix,
    content: &LabelContent,
    media: &MediaSpec,
    unit: DeviceUnit,
) -> LayoutPlan {
    compute_layout(matrix, content, media, unit, &LabelStyle::default())
}

/// Compute the label layout
///
/// Never fails: module width, bar height and text offsets are clamped so an
/// extreme input still yields a plan that stays on the label.
#[instrument(level = "debug", skip_all, fields(code = %content.code(), unit = ?unit))]
pub fn compute_layout(
    matrix: &ModuleMatrix,
    content: &LabelContent,
    media: &MediaSpec,
    unit: DeviceUnit,
    style: &LabelStyle,
) -> LayoutPlan {
    let upm = unit.units_per_mm(media);
    let snap = |v: f32| if unit == DeviceUnit::Dot { v.floor() } else { v };

    let label_width = media.width_mm * upm;
    let label_height = media.height_mm * upm;
    let margin = style.margin_mm * upm;
    let gap = style.line_gap_mm * upm;
    let inner_width = (label_width - 2.0 * margin).max(0.0);

    // Module width
    let modules = matrix.width().max(1) as f32;
    let min_module = match unit {
        DeviceUnit::Dot => (style.min_module_mm * upm).ceil().max(1.0),
        DeviceUnit::Point => style.min_module_mm * upm,
    };
    let mut module_width = snap(inner_width / modules).max(min_module);
    if module_width * modules > label_width {
        let fit = label_width / modules;
        module_width = if snap(fit) >= 1.0 { snap(fit) } else { fit };
    }
    let barcode_width = module_width * modules;
    let barcode_x = snap(((label_width - barcode_width) / 2.0).max(0.0));

    // Text lines, laid out bottom-up
    let code_text = human_readable_code(content.code(), style, inner_width, upm);
    let article_text = format!("{}{}", style.article_prefix, content.article());

    let article_height = style.article_font.height_mm() * upm;
    let code_height = style.code_font.height_mm() * upm;
    let article_top = snap((label_height - margin - article_height).max(0.0));
    let code_top = snap((article_top - gap - code_height).max(0.0));

    let barcode_y = snap(margin.min(label_height));
    let min_bar = style.min_bar_height_mm * upm;
    let barcode_height = snap(
        (code_top - gap - barcode_y)
            .max(min_bar)
            .min(label_height - barcode_y),
    );

    let code_line = text_line(code_text, style.code_font, code_top, label_width, margin, upm, snap);
    let article_line = text_line(
        article_text,
        style.article_font,
        article_top,
        label_width,
        margin,
        upm,
        snap,
    );

    LayoutPlan {
        unit,
        units_per_mm: upm,
        label_width,
        label_height,
        barcode_origin: Point {
            x: barcode_x,
            y: barcode_y,
        },
        barcode_size: Size {
            width: barcode_width,
            height: barcode_height,
        },
        module_width,
        code_line,
        article_line,
    }
}

/// Digit-spaced code when it fits the printable width, the plain code otherwise
fn human_readable_code(code: &str, style: &LabelStyle, inner_width: f32, upm: f32) -> String {
    if !style.spaced_code {
        return code.to_string();
    }
    let spaced = code.chars().map(String::from).collect::<Vec<_>>().join(" ");
    let width = spaced.chars().count() as f32 * style.code_font.glyph_width_mm() * upm;
    if width <= inner_width {
        spaced
    } else {
        code.to_string()
    }
}

fn text_line(
    text: String,
    font: PrinterFont,
    top_y: f32,
    label_width: f32,
    margin: f32,
    upm: f32,
    snap: impl Fn(f32) -> f32,
) -> TextLine {
    let font_height = font.height_mm() * upm;
    let char_width = font.glyph_width_mm() * upm;
    let estimated_width = text.chars().count() as f32 * char_width;
    let origin_x = snap(((label_width - estimated_width) / 2.0).max(margin));
    TextLine {
        text,
        font,
        origin_x,
        top_y,
        baseline_y: top_y + font_height * BASELINE_FRACTION,
        font_height,
        char_width,
        estimated_width,
    }
}
