//! Label preview rendering
//!
//! Turns a [`LayoutPlan`] into a one-page document in PDF points for operator
//! confirmation before printing. The page is a plain display list (bars and
//! text runs, top-left origin) that can be written as a PDF with `lopdf` or
//! rasterized with `image` for on-screen display.

use std::path::Path;

use image::{GrayImage, Luma};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use rusttype::{point, Font, Scale};
use tracing::{info, instrument};

use crate::encoding::{encode_text, Codepage};
use crate::error::{LabelError, LabelResult};
use crate::job::{LabelContent, MediaSpec};
use crate::layout::{LayoutPlan, TextLine};
use crate::symbology::ModuleMatrix;

/// Advance width of every Courier glyph, in text space units per point of size
const COURIER_ADVANCE: f32 = 0.6;

/// Filled rectangle, in points from the top-left page corner
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// One text run, in points from the top-left page corner
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewText {
    pub text: String,
    pub x: f32,
    pub baseline_y: f32,
    pub font_size: f32,
    pub char_width: f32,
}

impl PreviewText {
    /// Horizontal scaling (percent) that makes Courier match `char_width`
    pub fn horizontal_scale(&self) -> f32 {
        if self.font_size <= 0.0 {
            return 100.0;
        }
        self.char_width / (COURIER_ADVANCE * self.font_size) * 100.0
    }
}

/// Single-page label preview
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewDocument {
    pub page_width: f32,
    pub page_height: f32,
    pub bars: Vec<Rect>,
    pub texts: Vec<PreviewText>,
}

/// Render the preview page for a plan
///
/// Reads positions from `plan` only; `media` and `content` are accepted so the
/// preview has the same inputs as the command stream.
#[instrument(level = "debug", skip_all, fields(code = %content.code()))]
pub fn render_preview(
    plan: &LayoutPlan,
    matrix: &ModuleMatrix,
    content: &LabelContent,
    media: &MediaSpec,
) -> PreviewDocument {
    let rows = matrix.height().max(1);
    let row_height = plan.barcode_size.height / rows as f32;

    let mut bars = Vec::new();
    for y in 0..matrix.height() {
        for (start, len) in matrix.runs(y) {
            bars.push(Rect {
                x: plan.to_points(plan.barcode_origin.x + start as f32 * plan.module_width),
                y: plan.to_points(plan.barcode_origin.y + y as f32 * row_height),
                width: plan.to_points(len as f32 * plan.module_width),
                height: plan.to_points(row_height),
            });
        }
    }

    let text = |line: &TextLine| PreviewText {
        text: line.text.clone(),
        x: plan.to_points(line.origin_x),
        baseline_y: plan.to_points(line.baseline_y),
        font_size: plan.to_points(line.font_height),
        char_width: plan.to_points(line.char_width),
    };

    let doc = PreviewDocument {
        page_width: plan.to_points(plan.label_width),
        page_height: plan.to_points(plan.label_height),
        bars,
        texts: vec![text(&plan.code_line), text(&plan.article_line)],
    };
    info!(
        bars = doc.bars.len(),
        width_mm = media.width_mm,
        height_mm = media.height_mm,
        "Preview rendered"
    );
    doc
}

impl PreviewDocument {
    /// Serialize as a one-page PDF
    pub fn to_pdf_bytes(&self) -> LabelResult<Vec<u8>> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
            "Encoding" => cyrillic_encoding(),
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! {
                "F1" => font_id,
            },
        });

        let content = Content {
            operations: self.operations(),
        };
        let encoded = content
            .encode()
            .map_err(|e| LabelError::Preview(format!("Content encoding failed: {}", e)))?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
            "Resources" => resources_id,
            "MediaBox" => vec![
                0.into(),
                0.into(),
                self.page_width.into(),
                self.page_height.into(),
            ],
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut out = Vec::new();
        doc.save_to(&mut out)
            .map_err(|e| LabelError::Preview(format!("PDF write failed: {}", e)))?;
        Ok(out)
    }

    /// Write the PDF to `path`
    #[instrument(skip(self), fields(path = %path.as_ref().display()))]
    pub fn save(&self, path: impl AsRef<Path>) -> LabelResult<()> {
        let bytes = self.to_pdf_bytes()?;
        std::fs::write(path.as_ref(), bytes)
            .map_err(|e| LabelError::Preview(format!("Write failed: {}", e)))?;
        info!("Preview saved");
        Ok(())
    }

    /// Content stream operators; PDF y grows upwards from the page bottom
    fn operations(&self) -> Vec<Operation> {
        let mut ops = vec![Operation::new("g", vec![0.into()])];
        for bar in &self.bars {
            ops.push(Operation::new(
                "re",
                vec![
                    bar.x.into(),
                    (self.page_height - bar.y - bar.height).into(),
                    bar.width.into(),
                    bar.height.into(),
                ],
            ));
        }
        if !self.bars.is_empty() {
            ops.push(Operation::new("f", vec![]));
        }

        for text in &self.texts {
            ops.push(Operation::new("BT", vec![]));
            ops.push(Operation::new("Tf", vec!["F1".into(), text.font_size.into()]));
            ops.push(Operation::new("Tz", vec![text.horizontal_scale().into()]));
            ops.push(Operation::new(
                "Td",
                vec![text.x.into(), (self.page_height - text.baseline_y).into()],
            ));
            ops.push(Operation::new(
                "Tj",
                vec![Object::string_literal(encode_text(
                    &text.text,
                    Codepage::Windows1251,
                ))],
            ));
            ops.push(Operation::new("ET", vec![]));
        }
        ops
    }

    /// Rasterize for on-screen display
    ///
    /// `scale` is pixels per point. Text is drawn only when a font is given.
    pub fn rasterize(&self, scale: f32, font: Option<&Font<'_>>) -> GrayImage {
        let w = (self.page_width * scale).ceil().max(1.0) as u32;
        let h = (self.page_height * scale).ceil().max(1.0) as u32;
        let mut img = GrayImage::from_pixel(w, h, Luma([255]));

        for bar in &self.bars {
            let x0 = (bar.x * scale).round().max(0.0) as u32;
            let y0 = (bar.y * scale).round().max(0.0) as u32;
            let x1 = (((bar.x + bar.width) * scale).round().max(0.0) as u32).min(w);
            let y1 = (((bar.y + bar.height) * scale).round().max(0.0) as u32).min(h);
            for y in y0..y1 {
                for x in x0..x1 {
                    img.put_pixel(x, y, Luma([0]));
                }
            }
        }

        if let Some(font) = font {
            for text in &self.texts {
                let size = text.font_size * scale;
                let glyph_scale = Scale {
                    x: size * text.horizontal_scale() / 100.0,
                    y: size,
                };
                let origin = point(text.x * scale, text.baseline_y * scale);
                for g in font.layout(&text.text, glyph_scale, origin) {
                    if let Some(bb) = g.pixel_bounding_box() {
                        g.draw(|gx, gy, v| {
                            if v > 0.5 {
                                let px = gx as i32 + bb.min.x;
                                let py = gy as i32 + bb.min.y;
                                if px >= 0 && py >= 0 && (px as u32) < w && (py as u32) < h {
                                    img.put_pixel(px as u32, py as u32, Luma([0]));
                                }
                            }
                        });
                    }
                }
            }
        }
        img
    }
}

/// Glyph names for windows-1251 bytes 0x80..=0xBF
const CP1251_HIGH: [&str; 64] = [
    "afii10051", "afii10052", "quotesinglbase", "afii10100", "quotedblbase", "ellipsis",
    "dagger", "daggerdbl", "Euro", "perthousand", "afii10058", "guilsinglleft", "afii10059",
    "afii10061", "afii10060", "afii10145", "afii10099", "quoteleft", "quoteright",
    "quotedblleft", "quotedblright", "bullet", "endash", "emdash", ".notdef", "trademark",
    "afii10106", "guilsinglright", "afii10107", "afii10109", "afii10108", "afii10193", "space",
    "afii10062", "afii10110", "afii10057", "currency", "afii10050", "brokenbar", "section",
    "afii10023", "copyright", "afii10053", "guillemotleft", "logicalnot", "hyphen",
    "registered", "afii10056", "degree", "plusminus", "afii10055", "afii10103", "afii10098",
    "mu", "paragraph", "periodcentered", "afii10071", "afii61352", "afii10101",
    "guillemotright", "afii10105", "afii10054", "afii10102", "afii10104",
];

/// WinAnsi with the upper half of windows-1251 mapped onto its glyph names
fn cyrillic_encoding() -> Object {
    fn names(first: u32, last: u32, skip: u32) -> impl Iterator<Item = Object> {
        (first..=last)
            .filter(move |n| *n != skip)
            .map(|n| Object::Name(format!("afii{}", n).into_bytes()))
    }

    // One run from 0x80: symbols and extra letters, then А..Я and а..я without Ё/ё
    let mut differences = vec![Object::Integer(0x80)];
    differences.extend(CP1251_HIGH.iter().map(|n| Object::Name(n.as_bytes().to_vec())));
    differences.extend(names(10017, 10049, 10023));
    differences.extend(names(10065, 10097, 10071));

    Object::Dictionary(dictionary! {
        "Type" => "Encoding",
        "BaseEncoding" => "WinAnsiEncoding",
        "Differences" => differences,
    })
}
