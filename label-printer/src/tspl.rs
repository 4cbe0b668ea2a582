//! TSPL command builder
//!
//! Provides a fluent API for building TSPL label printer jobs, and
//! [`build_command_stream`], which serializes a [`LayoutPlan`] into one.

use tracing::instrument;

use crate::encoding::{encode_text, Codepage};
use crate::job::{LabelContent, MediaSpec};
use crate::layout::LayoutPlan;
use crate::symbology::{code128_subset, Symbology};

/// TSPL command builder
///
/// Every command is one CRLF-terminated line. Command tokens are ASCII; quoted
/// payloads are encoded with the builder's codepage.
pub struct TsplBuilder {
    buf: Vec<u8>,
    codepage: Codepage,
}

impl TsplBuilder {
    pub fn new(codepage: Codepage) -> Self {
        Self {
            buf: Vec::with_capacity(512),
            codepage,
        }
    }

    pub fn codepage(&self) -> Codepage {
        self.codepage
    }

    // === Media ===

    /// `SIZE w mm, h mm`
    pub fn size(&mut self, width_mm: f32, height_mm: f32) -> &mut Self {
        self.line(&format!("SIZE {} mm, {} mm", width_mm, height_mm))
    }

    /// `GAP g mm, offset mm`
    pub fn gap(&mut self, gap_mm: f32, offset_mm: f32) -> &mut Self {
        self.line(&format!("GAP {} mm, {} mm", gap_mm, offset_mm))
    }

    /// Clear the image buffer
    pub fn cls(&mut self) -> &mut Self {
        self.line("CLS")
    }

    /// Printout direction (0 or 1)
    pub fn direction(&mut self, direction: u8) -> &mut Self {
        self.line(&format!("DIRECTION {}", direction.min(1)))
    }

    /// Select the builder's codepage on the printer
    pub fn select_codepage(&mut self) -> &mut Self {
        let token = self.codepage.tspl_token();
        self.line(&format!("CODEPAGE {}", token))
    }

    // === Content ===

    /// `BARCODE x,y,"type",height,readable,rotation,narrow,wide,"content"`
    #[allow(clippy::too_many_arguments)]
    pub fn barcode(
        &mut self,
        x: u32,
        y: u32,
        code_type: &str,
        height: u32,
        human_readable: bool,
        rotation: u16,
        narrow: u32,
        wide: u32,
        content: &str,
    ) -> &mut Self {
        let head = format!(
            "BARCODE {},{},\"{}\",{},{},{},{},{},",
            x,
            y,
            code_type,
            height,
            u8::from(human_readable),
            rotation,
            narrow,
            wide
        );
        self.buf.extend_from_slice(head.as_bytes());
        self.quoted(content);
        self.end_line()
    }

    /// `TEXT x,y,"font",rotation,x-mul,y-mul,"content"`
    pub fn text(&mut self, x: u32, y: u32, font: &str, rotation: u16, content: &str) -> &mut Self {
        let head = format!("TEXT {},{},\"{}\",{},1,1,", x, y, font, rotation);
        self.buf.extend_from_slice(head.as_bytes());
        self.quoted(content);
        self.end_line()
    }

    /// Print the buffered label `sets` times
    pub fn print(&mut self, sets: u32) -> &mut Self {
        self.line(&format!("PRINT {}", sets.max(1)))
    }

    // === Raw Commands ===

    /// Write one raw ASCII command line
    pub fn line(&mut self, command: &str) -> &mut Self {
        self.buf.extend_from_slice(command.as_bytes());
        self.end_line()
    }

    // === Build ===

    pub fn build(self) -> Vec<u8> {
        self.buf
    }

    fn end_line(&mut self) -> &mut Self {
        self.buf.extend_from_slice(b"\r\n");
        self
    }

    /// Double-quoted payload; `"` becomes the TSPL escape `\["]`
    fn quoted(&mut self, content: &str) {
        self.buf.push(b'"');
        for (i, part) in content.split('"').enumerate() {
            if i > 0 {
                self.buf.extend_from_slice(br#"\["]"#);
            }
            self.buf.extend_from_slice(&encode_text(part, self.codepage));
        }
        self.buf.push(b'"');
    }
}

impl Default for TsplBuilder {
    fn default() -> Self {
        Self::new(Codepage::default())
    }
}

/// Printer-side options that are not geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TsplOptions {
    pub direction: u8,
    pub codepage: Codepage,
    /// Number of labels printed from the buffer
    pub copies: u32,
}

impl Default for TsplOptions {
    fn default() -> Self {
        Self {
            direction: 1,
            codepage: Codepage::default(),
            copies: 1,
        }
    }
}

fn code_type(symbology: Symbology) -> &'static str {
    match symbology {
        Symbology::Ean13 => "EAN13",
        // Manual subset selection: the printer draws exactly the symbols in the plan
        Symbology::Code128 => "128M",
    }
}

/// Barcode payload; Code 128 is prefixed with the start code of its subset
fn barcode_content(symbology: Symbology, code: &str) -> String {
    match symbology {
        Symbology::Ean13 => code.to_string(),
        Symbology::Code128 => format!("!{:03}{}", code128_subset(code).start_value(), code),
    }
}

/// Serialize a layout plan into a complete TSPL job
///
/// Every position and size comes from `plan`; this function only converts to
/// dots and formats tokens.
#[instrument(level = "debug", skip_all, fields(code = %content.code(), symbology = %symbology))]
pub fn build_command_stream(
    plan: &LayoutPlan,
    symbology: Symbology,
    content: &LabelContent,
    media: &MediaSpec,
    options: &TsplOptions,
) -> Vec<u8> {
    let narrow = plan.dots(plan.module_width, media).max(1);

    let mut b = TsplBuilder::new(options.codepage);
    b.size(media.width_mm, media.height_mm)
        .gap(media.gap_mm, 0.0)
        .cls()
        .direction(options.direction)
        .select_codepage()
        .barcode(
            plan.dots(plan.barcode_origin.x, media),
            plan.dots(plan.barcode_origin.y, media),
            code_type(symbology),
            plan.dots(plan.barcode_size.height, media),
            false,
            0,
            narrow,
            narrow,
            &barcode_content(symbology, content.code()),
        );
    for line in [&plan.code_line, &plan.article_line] {
        b.text(
            plan.dots(line.origin_x, media),
            plan.dots(line.top_y, media),
            line.font.selector(),
            0,
            &line.text,
        );
    }
    b.print(options.copies);
    b.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{compute_layout_default, DeviceUnit};
    use crate::symbology::encode;

    fn stream_for(code: &str, article: &str) -> String {
        let content = LabelContent::new(code, article).unwrap();
        let media = MediaSpec::default();
        let encoded = encode(code).unwrap();
        let plan = compute_layout_default(&encoded.matrix, &content, &media, DeviceUnit::Dot);
        let data = build_command_stream(
            &plan,
            encoded.symbology,
            &content,
            &media,
            &TsplOptions {
                codepage: Codepage::Utf8,
                ..TsplOptions::default()
            },
        );
        String::from_utf8(data).unwrap()
    }

    #[test]
    fn test_builder_basic() {
        let mut b = TsplBuilder::new(Codepage::Windows1251);
        b.size(55.0, 40.0).gap(2.0, 0.0).cls().print(1);
        assert_eq!(
            b.build(),
            b"SIZE 55 mm, 40 mm\r\nGAP 2 mm, 0 mm\r\nCLS\r\nPRINT 1\r\n".to_vec()
        );
    }

    #[test]
    fn test_fractional_sizes() {
        let mut b = TsplBuilder::default();
        b.size(50.5, 30.0);
        assert_eq!(b.build(), b"SIZE 50.5 mm, 30 mm\r\n".to_vec());
    }

    #[test]
    fn test_text_is_codepage_encoded() {
        let mut b = TsplBuilder::new(Codepage::Windows1251);
        b.text(10, 20, "2", 0, "Болт");
        assert_eq!(
            b.build(),
            [
                b"TEXT 10,20,\"2\",0,1,1,\"".as_slice(),
                &[0xC1, 0xEE, 0xEB, 0xF2],
                b"\"\r\n"
            ]
            .concat()
        );
    }

    #[test]
    fn test_quote_escape() {
        let mut b = TsplBuilder::new(Codepage::Windows1251);
        b.text(0, 0, "2", 0, "6\" pipe");
        let s = String::from_utf8(b.build()).unwrap();
        assert_eq!(s, "TEXT 0,0,\"2\",0,1,1,\"6\\[\"] pipe\"\r\n");
    }

    #[test]
    fn test_scenario_stream() {
        let s = stream_for("ABC123", "Bolt M6");
        let lines: Vec<&str> = s.split("\r\n").collect();
        assert_eq!(lines[0], "SIZE 55 mm, 40 mm");
        assert_eq!(lines[1], "GAP 2 mm, 0 mm");
        assert_eq!(lines[2], "CLS");
        assert_eq!(lines.iter().filter(|l| l.starts_with("BARCODE ")).count(), 1);
        assert_eq!(lines.iter().filter(|l| l.starts_with("TEXT ")).count(), 2);
        // Trailing CRLF leaves an empty last element
        assert_eq!(lines[lines.len() - 1], "");
        assert_eq!(lines[lines.len() - 2], "PRINT 1");
        assert!(s.ends_with("PRINT 1\r\n"));
    }

    #[test]
    fn test_barcode_line_uses_plan() {
        let s = stream_for("4006381333931", "Bolt M6");
        assert!(s.contains("BARCODE 30,16,\"EAN13\",228,0,0,4,4,\"4006381333931\"\r\n"));
        assert!(s.contains("TEXT 20,252,\"3\",0,1,1,\"4 0 0 6 3 8 1 3 3 3 9 3 1\"\r\n"));
        assert!(s.contains("CODEPAGE UTF-8\r\n"));
        assert!(s.contains("DIRECTION 1\r\n"));
    }

    #[test]
    fn test_copies() {
        let content = LabelContent::new("ABC123", "").unwrap();
        let media = MediaSpec::default();
        let encoded = encode("ABC123").unwrap();
        let plan = compute_layout_default(&encoded.matrix, &content, &media, DeviceUnit::Dot);
        let opts = |copies| TsplOptions {
            copies,
            ..TsplOptions::default()
        };
        let three = build_command_stream(&plan, encoded.symbology, &content, &media, &opts(3));
        assert!(three.ends_with(b"PRINT 3\r\n"));
        // Zero is clamped to one label
        let zero = build_command_stream(&plan, encoded.symbology, &content, &media, &opts(0));
        assert!(zero.ends_with(b"PRINT 1\r\n"));
    }

    #[test]
    fn test_code128_pins_subset() {
        let s = stream_for("ABC123", "Bolt M6");
        assert!(s.contains(",\"128M\","));
        assert!(s.contains(",\"!104ABC123\"\r\n"));

        let s = stream_for("123456", "");
        assert!(s.contains(",\"!105123456\"\r\n"));

        // Odd-length digits stay in subset B, as in the module matrix
        let s = stream_for("12345678901", "");
        assert!(s.contains(",\"!10412345678901\"\r\n"));
    }
}
