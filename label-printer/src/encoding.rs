//! Text codepage utilities for label printers
//!
//! TSPL printers take command tokens in ASCII and text payloads in a single
//! 8-bit (or double-byte) codepage selected with `CODEPAGE`. This module maps
//! UTF-8 strings onto that codepage via `encoding_rs`.

use std::str::FromStr;

use encoding_rs::Encoding;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Codepage for text payloads
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Codepage {
    /// Central European
    Windows1250,
    /// Cyrillic
    #[default]
    Windows1251,
    /// Western European
    Windows1252,
    /// Simplified Chinese
    Gbk,
    Utf8,
}

impl Codepage {
    pub fn encoding(self) -> &'static Encoding {
        match self {
            Codepage::Windows1250 => encoding_rs::WINDOWS_1250,
            Codepage::Windows1251 => encoding_rs::WINDOWS_1251,
            Codepage::Windows1252 => encoding_rs::WINDOWS_1252,
            Codepage::Gbk => encoding_rs::GBK,
            Codepage::Utf8 => encoding_rs::UTF_8,
        }
    }

    /// Argument of the TSPL `CODEPAGE` command
    pub fn tspl_token(self) -> &'static str {
        match self {
            Codepage::Windows1250 => "1250",
            Codepage::Windows1251 => "1251",
            Codepage::Windows1252 => "1252",
            Codepage::Gbk => "936",
            Codepage::Utf8 => "UTF-8",
        }
    }
}

impl FromStr for Codepage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1250" | "windows-1250" | "cp1250" => Ok(Codepage::Windows1250),
            "1251" | "windows-1251" | "cp1251" => Ok(Codepage::Windows1251),
            "1252" | "windows-1252" | "cp1252" => Ok(Codepage::Windows1252),
            "936" | "gbk" => Ok(Codepage::Gbk),
            "utf-8" | "utf8" => Ok(Codepage::Utf8),
            other => Err(format!("Unknown codepage: {}", other)),
        }
    }
}

/// Encode `s` in `codepage`, replacing unmappable characters with `?`
///
/// `encoding_rs` would substitute HTML numeric references, which a printer
/// prints literally.
pub fn encode_text(s: &str, codepage: Codepage) -> Vec<u8> {
    let encoding = codepage.encoding();
    let (bytes, _, had_errors) = encoding.encode(s);
    if !had_errors {
        return bytes.into_owned();
    }

    debug!(codepage = ?codepage, "Text has characters outside the codepage");
    let mut out = Vec::with_capacity(s.len());
    let mut tmp = [0u8; 4];
    for c in s.chars() {
        let (bytes, _, had_errors) = encoding.encode(c.encode_utf8(&mut tmp));
        if had_errors {
            out.push(b'?');
        } else {
            out.extend_from_slice(&bytes);
        }
    }
    out
}

/// Byte width of `s` once encoded
pub fn encoded_width(s: &str, codepage: Codepage) -> usize {
    encode_text(s, codepage).len()
}
