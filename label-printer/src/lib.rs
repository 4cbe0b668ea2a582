//! # label-printer
//!
//! Barcode label engine for TSPL thermal label printers.
//!
//! ## Scope
//!
//! This crate handles the whole path from a code string to printed bytes:
//! - Symbology selection and encoding (EAN-13, Code 128)
//! - Layout: one [`LayoutPlan`] shared by preview and printer output
//! - TSPL command building with 8-bit codepage text
//! - PDF preview (and optional raster) of the exact same plan
//! - Network printing (raw TCP, port 9100)
//!
//! Where the article text comes from stays in application code, behind
//! [`ArticleLookup`].
//!
//! ## Example
//!
//! ```ignore
//! use label_printer::{LabelContent, LabelStyle, MediaSpec, PrintJob, PrinterAddress, TsplOptions};
//!
//! let content = LabelContent::new("4006381333931", "Bolt M6")?;
//! let job = PrintJob::new(content, MediaSpec::default(), "192.168.1.100".parse()?);
//!
//! let label = job.prepare(&LabelStyle::default())?;
//! label.preview().save("preview.pdf")?;
//!
//! // After the operator confirms
//! label.print(&TsplOptions::default()).await?;
//! ```

mod encoding;
mod error;
mod job;
mod layout;
mod preview;
mod printer;
mod symbology;
mod tspl;

// Re-exports
pub use encoding::{encode_text, encoded_width, Codepage};
pub use error::{EncodingError, LabelError, LabelResult, PrintError, PrintResult};
pub use job::{ArticleLookup, LabelContent, MediaSpec, PreparedLabel, PrintJob};
pub use layout::{
    compute_layout, compute_layout_default, DeviceUnit, LabelStyle, LayoutPlan, Point,
    PrinterFont, Size, TextLine, MM_PER_INCH, POINTS_PER_INCH,
};
pub use preview::{render_preview, PreviewDocument, PreviewText, Rect};
pub use printer::{send, NetworkPrinter, Printer, PrinterAddress, DEFAULT_PORT};
pub use symbology::{
    code128_subset, ean13_check_digit, encode, select, ChecksumStatus, Code128Subset,
    EncodedBarcode, ModuleMatrix, Symbology,
};
pub use tspl::{build_command_stream, TsplBuilder, TsplOptions};
