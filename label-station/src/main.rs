mod catalog;
mod config;

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use label_printer::{
    ArticleLookup, ChecksumStatus, LabelContent, LabelStyle, PrintJob, PrinterAddress, TsplOptions,
};
use tracing::{info, warn};

use config::StationConfig;

/// Print a barcode label on a TSPL network printer
#[derive(Debug, Parser)]
#[command(name = "label-station", version)]
struct Args {
    /// Code to print (13 digits → EAN-13, anything else → Code 128)
    code: String,

    /// Article text; looked up in the catalog when omitted
    #[arg(short, long)]
    article: Option<String>,

    /// Printer address, `host` or `host:port` (overrides PRINTER_HOST/PRINTER_PORT)
    #[arg(short, long)]
    printer: Option<PrinterAddress>,

    /// Tab-separated article catalog
    #[arg(long, env = "ARTICLES_FILE")]
    articles: Option<PathBuf>,

    /// Preview PDF path (default: PREVIEW_DIR/<code>.pdf)
    #[arg(long)]
    preview_out: Option<PathBuf>,

    /// Also write a PNG raster of the preview
    #[arg(long)]
    raster_out: Option<PathBuf>,

    /// TrueType font for raster text; without it only bars are drawn
    #[arg(long)]
    font: Option<PathBuf>,

    /// Raster pixels per point
    #[arg(long, default_value_t = 4.0)]
    raster_scale: f32,

    /// Number of labels
    #[arg(short = 'n', long, default_value_t = 1)]
    copies: u32,

    /// Print without asking for confirmation
    #[arg(short, long)]
    yes: bool,

    /// Write the preview only
    #[arg(long)]
    no_print: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "label_station=info,label_printer=info".into()),
        )
        .with_target(false)
        .init();

    dotenvy::dotenv().ok();

    let config = StationConfig::from_env();
    let args = Args::parse();

    let code = args.code();
    let article = match args.article.clone() {
        Some(article) => article,
        None => match args.articles.as_ref().or(config.articles_file.as_ref()) {
            Some(path) => lookup_article(code, path)?,
            None => String::new(),
        },
    };
    let content = LabelContent::new(code, article)?;
    let address = args
        .printer
        .clone()
        .unwrap_or_else(|| config.printer_address());

    let style = LabelStyle {
        article_prefix: config.article_prefix.clone(),
        ..LabelStyle::default()
    };
    let label = PrintJob::new(content, config.media, address).prepare(&style)?;
    if let ChecksumStatus::Mismatch { expected, found } = label.checksum() {
        warn!(expected, found, "EAN-13 check digit does not match");
    }

    // Preview
    let preview = label.preview();
    let preview_path = args
        .preview_out
        .clone()
        .unwrap_or_else(|| config.preview_dir.join(preview_file_name(code)));
    ensure_parent(&preview_path)?;
    preview.save(&preview_path)?;
    info!(path = %preview_path.display(), "Preview written");

    if let Some(raster_path) = &args.raster_out {
        let font = match &args.font {
            Some(path) => Some(load_font(path)?),
            None => None,
        };
        ensure_parent(raster_path)?;
        preview
            .rasterize(args.raster_scale, font.as_ref())
            .save(raster_path)
            .with_context(|| format!("Failed to write raster {}", raster_path.display()))?;
        info!(path = %raster_path.display(), "Raster preview written");
    }

    if args.no_print {
        return Ok(());
    }
    if !args.yes {
        let prompt = format!("Print {} on {}?", code, label.job().address);
        // Stdin blocks; keep it off the runtime workers
        let confirmed = tokio::task::spawn_blocking(move || {
            confirm(&prompt, std::io::stdin().lock(), std::io::stdout())
        })
        .await??;
        if !confirmed {
            info!("Print cancelled");
            return Ok(());
        }
    }

    let options = TsplOptions {
        codepage: config.codepage,
        copies: args.copies,
        ..TsplOptions::default()
    };
    label.print(&options).await?;

    Ok(())
}

impl Args {
    /// Code as printed, without surrounding whitespace
    fn code(&self) -> &str {
        self.code.trim()
    }
}

fn lookup_article(code: &str, catalog_path: &Path) -> anyhow::Result<String> {
    let catalog = catalog::load_catalog(catalog_path)?;
    Ok(catalog.article(code).unwrap_or_else(|| {
        warn!(code, "Code not in catalog, printing without article");
        String::new()
    }))
}

/// `<code>.pdf` with path-hostile characters replaced
fn preview_file_name(code: &str) -> String {
    let stem: String = code
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    format!("{}.pdf", stem)
}

fn ensure_parent(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    Ok(())
}

fn load_font(path: &Path) -> anyhow::Result<rusttype::Font<'static>> {
    let data =
        std::fs::read(path).with_context(|| format!("Failed to read font {}", path.display()))?;
    rusttype::Font::try_from_vec(data)
        .with_context(|| format!("Not a TrueType font: {}", path.display()))
}

fn confirm(prompt: &str, mut input: impl BufRead, mut output: impl Write) -> anyhow::Result<bool> {
    write!(output, "{} [y/N] ", prompt)?;
    output.flush()?;
    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes" | "д" | "да"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_file_name() {
        assert_eq!(preview_file_name("4006381333931"), "4006381333931.pdf");
        assert_eq!(preview_file_name("AB/C 1.2"), "AB_C_1_2.pdf");
    }

    #[test]
    fn test_code_is_trimmed_once() {
        let args = Args::try_parse_from(["label-station", "  ABC123\t"]).unwrap();
        assert_eq!(args.code(), "ABC123");
        assert_eq!(preview_file_name(args.code()), "ABC123.pdf");

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("articles.tsv");
        std::fs::write(&path, "ABC123\tBolt M6\n").unwrap();
        assert_eq!(lookup_article(args.code(), &path).unwrap(), "Bolt M6");
        assert_eq!(lookup_article("missing", &path).unwrap(), "");
    }

    #[test]
    fn test_confirm() {
        let mut shown = Vec::new();
        assert!(confirm("Print?", "y\n".as_bytes(), &mut shown).unwrap());
        assert_eq!(shown, b"Print? [y/N] ");

        assert!(confirm("Print?", "Да\n".as_bytes(), Vec::new()).unwrap());
        assert!(!confirm("Print?", "\n".as_bytes(), Vec::new()).unwrap());
        // Closed stdin declines
        assert!(!confirm("Print?", "".as_bytes(), Vec::new()).unwrap());
    }

    #[test]
    fn test_args() {
        let args = Args::try_parse_from([
            "label-station",
            "ABC123",
            "--article",
            "Bolt M6",
            "--printer",
            "10.0.0.5:9101",
            "-n",
            "2",
            "--no-print",
        ])
        .unwrap();
        assert_eq!(args.code, "ABC123");
        assert_eq!(args.article.as_deref(), Some("Bolt M6"));
        assert_eq!(args.printer, Some(PrinterAddress::new("10.0.0.5", 9101)));
        assert_eq!(args.copies, 2);
        assert!(args.no_print);
        assert!(!args.yes);

        assert!(Args::try_parse_from(["label-station", "X", "--printer", "host:abc"]).is_err());
    }
}
