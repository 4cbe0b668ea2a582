//! Article catalog
//!
//! In-memory stand-in for the item store: a tab-separated file with one
//! `code<TAB>article` pair per line. Blank lines and `#` comments are skipped.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;
use tracing::{debug, warn};

pub fn parse_catalog(text: &str) -> HashMap<String, String> {
    let mut catalog = HashMap::new();
    for (n, line) in text.lines().enumerate() {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }
        match line.split_once('\t') {
            Some((code, article)) if !code.trim().is_empty() => {
                catalog.insert(code.trim().to_string(), article.trim().to_string());
            }
            _ => warn!(line = n + 1, "Skipping malformed catalog line"),
        }
    }
    catalog
}

pub fn load_catalog(path: &Path) -> anyhow::Result<HashMap<String, String>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read article catalog {}", path.display()))?;
    let catalog = parse_catalog(&text);
    debug!(entries = catalog.len(), path = %path.display(), "Catalog loaded");
    Ok(catalog)
}
