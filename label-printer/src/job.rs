//! Label job model and the preview → print pipeline
//!
//! A [`PrintJob`] is built once per operator action. [`PreparedLabel`] holds
//! everything derived from it (barcode matrix, layout plan) for the lifetime
//! of one preview/print cycle; dropping it before [`PreparedLabel::print`]
//! cancels the job without touching the network.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::error::{EncodingError, LabelResult};
use crate::layout::{compute_layout, DeviceUnit, LabelStyle, LayoutPlan};
use crate::preview::{render_preview, PreviewDocument};
use crate::printer::{NetworkPrinter, Printer, PrinterAddress};
use crate::symbology::{encode, ChecksumStatus, EncodedBarcode, ModuleMatrix, Symbology};
use crate::tspl::{build_command_stream, TsplOptions};

/// Code plus article text for one label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelContent {
    code: String,
    article: String,
}

impl LabelContent {
    /// Fails only on an empty code
    pub fn new(code: impl Into<String>, article: impl Into<String>) -> Result<Self, EncodingError> {
        let code = code.into();
        if code.is_empty() {
            return Err(EncodingError::Empty);
        }
        Ok(Self {
            code,
            article: article.into(),
        })
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn article(&self) -> &str {
        &self.article
    }
}

/// Physical label stock for one printer model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MediaSpec {
    pub width_mm: f32,
    pub height_mm: f32,
    /// Gap between labels on the roll
    pub gap_mm: f32,
    /// Dots per millimetre (8 ≈ 203 dpi, 12 ≈ 300 dpi)
    pub dot_density: f32,
}

impl MediaSpec {
    pub fn new(width_mm: f32, height_mm: f32, gap_mm: f32, dot_density: f32) -> Self {
        Self {
            width_mm,
            height_mm,
            gap_mm,
            dot_density,
        }
    }

    pub fn dpi(&self) -> f32 {
        self.dot_density * crate::layout::MM_PER_INCH
    }

    pub fn width_in(&self, unit: DeviceUnit) -> f32 {
        self.width_mm * unit.units_per_mm(self)
    }

    pub fn height_in(&self, unit: DeviceUnit) -> f32 {
        self.height_mm * unit.units_per_mm(self)
    }
}

impl Default for MediaSpec {
    /// 55 × 40 mm labels, 2 mm gap, 203 dpi
    fn default() -> Self {
        Self::new(55.0, 40.0, 2.0, 8.0)
    }
}

/// Lookup of article text by code (external item store)
pub trait ArticleLookup {
    fn article(&self, code: &str) -> Option<String>;
}

impl ArticleLookup for HashMap<String, String> {
    fn article(&self, code: &str) -> Option<String> {
        self.get(code).cloned()
    }
}

/// One confirmed print request
#[derive(Debug, Clone, PartialEq)]
pub struct PrintJob {
    pub content: LabelContent,
    pub media: MediaSpec,
    pub address: PrinterAddress,
}

impl PrintJob {
    pub fn new(content: LabelContent, media: MediaSpec, address: PrinterAddress) -> Self {
        Self {
            content,
            media,
            address,
        }
    }

    /// Encode and lay out the label
    ///
    /// The plan is computed once, in printer dots, and reused for both the
    /// preview and the command stream.
    #[instrument(skip(self, style), fields(code = %self.content.code()))]
    pub fn prepare(self, style: &LabelStyle) -> Result<PreparedLabel, EncodingError> {
        let barcode = encode(self.content.code())?;
        let plan = compute_layout(
            &barcode.matrix,
            &self.content,
            &self.media,
            DeviceUnit::Dot,
            style,
        );
        info!(
            symbology = %barcode.symbology,
            modules = barcode.matrix.width(),
            module_width = plan.module_width,
            "Label prepared"
        );
        Ok(PreparedLabel {
            job: self,
            barcode,
            plan,
        })
    }
}

/// Derived state of one job, owned by a single preview/print cycle
#[derive(Debug, Clone)]
pub struct PreparedLabel {
    job: PrintJob,
    barcode: EncodedBarcode,
    plan: LayoutPlan,
}

impl PreparedLabel {
    pub fn job(&self) -> &PrintJob {
        &self.job
    }

    pub fn symbology(&self) -> Symbology {
        self.barcode.symbology
    }

    pub fn matrix(&self) -> &ModuleMatrix {
        &self.barcode.matrix
    }

    pub fn checksum(&self) -> ChecksumStatus {
        self.barcode.checksum
    }

    pub fn plan(&self) -> &LayoutPlan {
        &self.plan
    }

    /// Preview page for operator confirmation
    pub fn preview(&self) -> PreviewDocument {
        render_preview(
            &self.plan,
            &self.barcode.matrix,
            &self.job.content,
            &self.job.media,
        )
    }

    /// TSPL bytes for the printer
    pub fn command_stream(&self, options: &TsplOptions) -> Vec<u8> {
        build_command_stream(
            &self.plan,
            self.barcode.symbology,
            &self.job.content,
            &self.job.media,
            options,
        )
    }

    /// Build the command stream and send it to the job's printer
    ///
    /// Success means the bytes were written; the printer gives no
    /// acknowledgement that a label actually came out.
    #[instrument(skip(self, options), fields(addr = %self.job.address))]
    pub async fn print(self, options: &TsplOptions) -> LabelResult<()> {
        if self.barcode.checksum.is_mismatch() {
            warn!("Printing label with mismatched EAN-13 check digit");
        }
        let data = self.command_stream(options);
        let printer = NetworkPrinter::new(self.job.address.clone());
        printer.print(&data).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_content_rejects_empty_code() {
        assert_eq!(LabelContent::new("", "x"), Err(EncodingError::Empty));
        let c = LabelContent::new("ABC123", "").unwrap();
        assert_eq!(c.code(), "ABC123");
        assert_eq!(c.article(), "");
    }

    #[test]
    fn test_default_media() {
        let m = MediaSpec::default();
        assert_eq!(m.width_mm, 55.0);
        assert_eq!(m.height_mm, 40.0);
        assert_eq!(m.gap_mm, 2.0);
        assert!((m.dpi() - 203.2).abs() < 0.01);
        assert_eq!(m.width_in(DeviceUnit::Dot), 440.0);
        assert_eq!(m.height_in(DeviceUnit::Dot), 320.0);
        assert!((m.width_in(DeviceUnit::Point) - 155.905).abs() < 0.01);
    }

    #[test]
    fn test_article_lookup() {
        let mut store = HashMap::new();
        store.insert("4006381333931".to_string(), "Bolt M6".to_string());
        assert_eq!(store.article("4006381333931").as_deref(), Some("Bolt M6"));
        assert_eq!(store.article("missing"), None);
    }

    #[test]
    fn test_prepare() {
        let job = PrintJob::new(
            LabelContent::new("4006381333932", "Bolt M6").unwrap(),
            MediaSpec::default(),
            PrinterAddress::new("127.0.0.1", 9100),
        );
        let prepared = job.prepare(&LabelStyle::default()).unwrap();
        assert_eq!(prepared.symbology(), Symbology::Ean13);
        assert!(prepared.checksum().is_mismatch());
        assert_eq!(prepared.plan().unit, DeviceUnit::Dot);
        assert_eq!(prepared.matrix().width(), 95);
    }

    #[test]
    fn test_prepare_rejects_unsupported_code() {
        let job = PrintJob::new(
            LabelContent::new("Болт", "x").unwrap(),
            MediaSpec::default(),
            PrinterAddress::new("127.0.0.1", 9100),
        );
        assert!(matches!(
            job.prepare(&LabelStyle::default()),
            Err(EncodingError::UnsupportedCharacter { .. })
        ));
    }
}
