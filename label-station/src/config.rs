use std::path::PathBuf;

use label_printer::{Codepage, MediaSpec, PrinterAddress, DEFAULT_PORT};

/// Factory address of the shop-floor printer
const DEFAULT_HOST: &str = "192.168.1.100";

/// label-station configuration, read from environment variables
#[derive(Debug, Clone, PartialEq)]
pub struct StationConfig {
    /// Printer host
    pub printer_host: String,
    /// Raw printing port
    pub printer_port: u16,
    /// Label stock
    pub media: MediaSpec,
    /// Codepage for text payloads
    pub codepage: Codepage,
    /// Where preview files are written
    pub preview_dir: PathBuf,
    /// Prefix of the article line
    pub article_prefix: String,
    /// Tab-separated `code<TAB>article` catalog
    pub articles_file: Option<PathBuf>,
}

impl StationConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = MediaSpec::default();
        let mm = |key: &str, default: f32| {
            var(key)
                .and_then(|v| v.parse::<f32>().ok())
                .filter(|v| *v > 0.0)
                .unwrap_or(default)
        };

        Self {
            printer_host: var("PRINTER_HOST")
                .map(|h| h.trim().to_string())
                .filter(|h| !h.is_empty())
                .unwrap_or_else(|| DEFAULT_HOST.to_string()),
            printer_port: var("PRINTER_PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_PORT),
            media: MediaSpec::new(
                mm("LABEL_WIDTH_MM", defaults.width_mm),
                mm("LABEL_HEIGHT_MM", defaults.height_mm),
                var("LABEL_GAP_MM")
                    .and_then(|v| v.parse::<f32>().ok())
                    .filter(|v| *v >= 0.0)
                    .unwrap_or(defaults.gap_mm),
                mm("PRINTER_DOTS_PER_MM", defaults.dot_density),
            ),
            codepage: var("LABEL_CODEPAGE")
                .and_then(|c| c.parse().ok())
                .unwrap_or_default(),
            preview_dir: var("PREVIEW_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("previews")),
            article_prefix: var("ARTICLE_PREFIX").unwrap_or_else(|| "Арт: ".to_string()),
            articles_file: var("ARTICLES_FILE").map(PathBuf::from),
        }
    }

    pub fn printer_address(&self) -> PrinterAddress {
        PrinterAddress::new(self.printer_host.clone(), self.printer_port)
    }
}
