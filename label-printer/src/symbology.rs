//! Barcode symbology selection and module encoding
//!
//! Two symbologies are supported:
//! - EAN-13 for 13-digit retail codes (fixed 95 modules)
//! - Code 128 for everything else (subset C for even-length digit runs,
//!   subset B for printable ASCII)
//!
//! Encoding is permissive about EAN-13 check digits: the physical item already
//! carries the code, so a mismatch is reported through [`ChecksumStatus`]
//! instead of refusing to print.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};

use crate::error::EncodingError;

/// Barcode symbology
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Symbology {
    Ean13,
    Code128,
}

impl fmt::Display for Symbology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Symbology::Ean13 => f.write_str("EAN-13"),
            Symbology::Code128 => f.write_str("Code 128"),
        }
    }
}

/// Pick the symbology for a code string
///
/// Exactly 13 ASCII digits selects EAN-13, anything else Code 128.
pub fn select(code: &str) -> Symbology {
    if code.len() == 13 && code.bytes().all(|b| b.is_ascii_digit()) {
        Symbology::Ean13
    } else {
        Symbology::Code128
    }
}

/// Barcode as a grid of modules (`true` = bar)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleMatrix {
    width: usize,
    height: usize,
    modules: Vec<bool>,
}

impl ModuleMatrix {
    /// Single-row matrix for a linear symbology
    pub fn from_row(row: Vec<bool>) -> Self {
        Self {
            width: row.len(),
            height: 1,
            modules: row,
        }
    }

    /// Number of modules across
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn get(&self, x: usize, y: usize) -> bool {
        x < self.width && y < self.height && self.modules[y * self.width + x]
    }

    pub fn row(&self, y: usize) -> &[bool] {
        let start = y * self.width;
        &self.modules[start..start + self.width]
    }

    /// Runs of consecutive bars in a row as `(start, len)` pairs
    pub fn runs(&self, y: usize) -> Vec<(usize, usize)> {
        let mut runs = Vec::new();
        let mut start = None;
        for (x, &bar) in self.row(y).iter().enumerate() {
            match (bar, start) {
                (true, None) => start = Some(x),
                (false, Some(s)) => {
                    runs.push((s, x - s));
                    start = None;
                }
                _ => {}
            }
        }
        if let Some(s) = start {
            runs.push((s, self.width - s));
        }
        runs
    }
}

/// Check digit validation result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumStatus {
    Valid,
    /// Encoded as given; the caller should warn the operator
    Mismatch { expected: u8, found: u8 },
    /// Symbology carries no user-visible check digit
    NotApplicable,
}

impl ChecksumStatus {
    pub fn is_mismatch(&self) -> bool {
        matches!(self, ChecksumStatus::Mismatch { .. })
    }
}

/// Result of [`encode`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedBarcode {
    pub symbology: Symbology,
    pub matrix: ModuleMatrix,
    pub checksum: ChecksumStatus,
}

/// Select a symbology and encode `code` into its module matrix
#[instrument(level = "debug")]
pub fn encode(code: &str) -> Result<EncodedBarcode, EncodingError> {
    if code.is_empty() {
        return Err(EncodingError::Empty);
    }

    let encoded = match select(code) {
        Symbology::Ean13 => {
            let (row, checksum) = encode_ean13(code);
            EncodedBarcode {
                symbology: Symbology::Ean13,
                matrix: ModuleMatrix::from_row(row),
                checksum,
            }
        }
        Symbology::Code128 => EncodedBarcode {
            symbology: Symbology::Code128,
            matrix: ModuleMatrix::from_row(encode_code128(code)?),
            checksum: ChecksumStatus::NotApplicable,
        },
    };

    if let ChecksumStatus::Mismatch { expected, found } = encoded.checksum {
        warn!(code, expected, found, "EAN-13 check digit mismatch, encoding as given");
    }

    Ok(encoded)
}

// ============================================================================
// EAN-13
// ============================================================================

const EAN_L: [&str; 10] = [
    "0001101", "0011001", "0010011", "0111101", "0100011", "0110001", "0101111", "0111011",
    "0110111", "0001011",
];

const EAN_G: [&str; 10] = [
    "0100111", "0110011", "0011011", "0100001", "0011101", "0111001", "0000101", "0010001",
    "0001001", "0010111",
];

const EAN_R: [&str; 10] = [
    "1110010", "1100110", "1101100", "1000010", "1011100", "1001110", "1010000", "1000100",
    "1001000", "1110100",
];

/// Left-half parity keyed by the first digit (`L` = odd, `G` = even)
const EAN_PARITY: [&str; 10] = [
    "LLLLLL", "LLGLGG", "LLGGLG", "LLGGGL", "LGLLGG", "LGGLLG", "LGGGLL", "LGLGLG", "LGLGGL",
    "LGGLGL",
];

const EAN_GUARD: &str = "101";
const EAN_CENTER: &str = "01010";

/// Mod-10 check digit over the first twelve digits of an EAN-13
///
/// Returns `None` unless `digits` starts with at least twelve ASCII digits.
pub fn ean13_check_digit(digits: &str) -> Option<u8> {
    let bytes = digits.as_bytes();
    if bytes.len() < 12 || !bytes[..12].iter().all(u8::is_ascii_digit) {
        return None;
    }
    let sum: u32 = bytes[..12]
        .iter()
        .enumerate()
        .map(|(i, b)| {
            let d = u32::from(b - b'0');
            if i % 2 == 0 { d } else { d * 3 }
        })
        .sum();
    Some(((10 - sum % 10) % 10) as u8)
}

fn push_pattern(row: &mut Vec<bool>, pattern: &str) {
    row.extend(pattern.bytes().map(|b| b == b'1'));
}

/// Caller guarantees 13 ASCII digits (see [`select`])
fn encode_ean13(code: &str) -> (Vec<bool>, ChecksumStatus) {
    let digits: Vec<usize> = code.bytes().map(|b| usize::from(b - b'0')).collect();

    let mut row = Vec::with_capacity(95);
    push_pattern(&mut row, EAN_GUARD);
    let parity = EAN_PARITY[digits[0]].as_bytes();
    for (i, &d) in digits[1..7].iter().enumerate() {
        let table = if parity[i] == b'L' { &EAN_L } else { &EAN_G };
        push_pattern(&mut row, table[d]);
    }
    push_pattern(&mut row, EAN_CENTER);
    for &d in &digits[7..13] {
        push_pattern(&mut row, EAN_R[d]);
    }
    push_pattern(&mut row, EAN_GUARD);

    let found = digits[12] as u8;
    let checksum = match ean13_check_digit(code) {
        Some(expected) if expected == found => ChecksumStatus::Valid,
        Some(expected) => ChecksumStatus::Mismatch { expected, found },
        None => ChecksumStatus::NotApplicable,
    };
    (row, checksum)
}

// ============================================================================
// Code 128
// ============================================================================

/// Bar/space widths for symbol values 0..=105
const CODE128_WIDTHS: [&str; 106] = [
    "212222", "222122", "222221", "121223", "121322", "131222", "122213", "122312", "132212",
    "221213", "221312", "231212", "112232", "122132", "122231", "113222", "123122", "123221",
    "223211", "221132", "221231", "213212", "223112", "312131", "311222", "321122", "321221",
    "312212", "322112", "322211", "212123", "212321", "232121", "111323", "131123", "131321",
    "112313", "132113", "132311", "211313", "231113", "231311", "112133", "112331", "132131",
    "113123", "113321", "133121", "313121", "211331", "231131", "213113", "213311", "213131",
    "311123", "311321", "331121", "312113", "312311", "332111", "314111", "221411", "431111",
    "111224", "111422", "121124", "121421", "141122", "141221", "112214", "112412", "122114",
    "122411", "142112", "142211", "241211", "221114", "413111", "241112", "134111", "111242",
    "121142", "121241", "114212", "124112", "124211", "411212", "421112", "421211", "212141",
    "214121", "412121", "111143", "111341", "131141", "114113", "114311", "411113", "411311",
    "113141", "114131", "311141", "411131", "211412", "211214", "211232",
];

const CODE128_STOP: &str = "2331112";
const CODE128_START_B: usize = 104;
const CODE128_START_C: usize = 105;

fn push_widths(row: &mut Vec<bool>, widths: &str) {
    for (i, w) in widths.bytes().enumerate() {
        let bar = i % 2 == 0;
        row.extend(std::iter::repeat_n(bar, usize::from(w - b'0')));
    }
}

/// Code 128 code set used for a whole symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Code128Subset {
    /// Printable ASCII, one symbol per character
    B,
    /// Digit pairs, one symbol per pair
    C,
}

impl Code128Subset {
    /// Value of the start symbol selecting this subset
    pub fn start_value(self) -> u8 {
        match self {
            Code128Subset::B => CODE128_START_B as u8,
            Code128Subset::C => CODE128_START_C as u8,
        }
    }
}

/// Subset C for even-length all-digit content, subset B otherwise
pub fn code128_subset(code: &str) -> Code128Subset {
    if !code.is_empty() && code.len() % 2 == 0 && code.bytes().all(|b| b.is_ascii_digit()) {
        Code128Subset::C
    } else {
        Code128Subset::B
    }
}

/// Symbol values for `code`, start and check symbols included
fn code128_symbols(code: &str) -> Result<Vec<usize>, EncodingError> {
    let mut symbols = Vec::with_capacity(code.len() + 2);
    match code128_subset(code) {
        Code128Subset::C => {
            symbols.push(CODE128_START_C);
            for pair in code.as_bytes().chunks(2) {
                symbols.push(usize::from(pair[0] - b'0') * 10 + usize::from(pair[1] - b'0'));
            }
        }
        Code128Subset::B => {
            symbols.push(CODE128_START_B);
            for (position, ch) in code.chars().enumerate() {
                if !(' '..='~').contains(&ch) {
                    return Err(EncodingError::UnsupportedCharacter {
                        ch,
                        position,
                        symbology: Symbology::Code128,
                    });
                }
                symbols.push(ch as usize - 32);
            }
        }
    }

    let check = symbols
        .iter()
        .enumerate()
        .map(|(i, &v)| if i == 0 { v } else { v * i })
        .sum::<usize>()
        % 103;
    symbols.push(check);
    Ok(symbols)
}

fn encode_code128(code: &str) -> Result<Vec<bool>, EncodingError> {
    let symbols = code128_symbols(code)?;
    let mut row = Vec::with_capacity(symbols.len() * 11 + 13);
    for &s in &symbols {
        push_widths(&mut row, CODE128_WIDTHS[s]);
    }
    push_widths(&mut row, CODE128_STOP);
    Ok(row)
}
