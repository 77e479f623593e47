//! Maidenhead grid locator decoding.
//!
//! A locator nests up to three precision levels, each a (longitude, latitude)
//! character pair:
//! - Field:     `A`–`R`, 18 divisions → 20° × 10°
//! - Square:    `0`–`9`, 10 divisions → 2° × 1°
//! - Subsquare: `A`–`X`, 24 divisions → 5' × 2.5'
//!
//! Decoding folds the pairs left to right starting from (-90°, -180°).
//! Letters are case-insensitive.

use crate::types::{Result, TelemetryError};

const FIELD_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQR";
const SQUARE_CHARS: &[u8] = b"0123456789";
const SUBSQUARE_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWX";

/// Alphabets for each precision level, coarsest first.
const LEVELS: [&[u8]; 3] = [FIELD_CHARS, SQUARE_CHARS, SUBSQUARE_CHARS];

/// A resolved grid cell: south-west corner plus its extent in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridCell {
    pub south: f64,
    pub west: f64,
    pub lat_size: f64,
    pub lon_size: f64,
}

impl GridCell {
    /// `(latitude, longitude)` of the south-west corner.
    pub fn corner(&self) -> (f64, f64) {
        (self.south, self.west)
    }

    /// `(latitude, longitude)` of the cell centre.
    pub fn center(&self) -> (f64, f64) {
        (
            self.south + self.lat_size / 2.0,
            self.west + self.lon_size / 2.0,
        )
    }
}

/// Decode a 4- or 6-character locator to the corner of its finest cell.
pub fn decode(locator: &str) -> Result<(f64, f64)> {
    let chars: Vec<char> = locator.chars().collect();
    if chars.len() != 4 && chars.len() != 6 {
        return Err(format_error(locator, chars.len()));
    }
    Ok(fold(&chars)?.corner())
}

/// Decode a 2-, 4- or 6-character locator to the centre of its finest cell.
///
/// A field-only locator (2 characters) resolves to the middle of the field.
/// This is the position published locator tables list.
pub fn decode_center(locator: &str) -> Result<(f64, f64)> {
    Ok(cell(locator)?.center())
}

/// Resolve a 2-, 4- or 6-character locator to its grid cell.
pub fn cell(locator: &str) -> Result<GridCell> {
    let chars: Vec<char> = locator.chars().collect();
    if !matches!(chars.len(), 2 | 4 | 6) {
        return Err(format_error(locator, chars.len()));
    }
    fold(&chars)
}

fn format_error(locator: &str, len: usize) -> TelemetryError {
    TelemetryError::InvalidLocatorFormat {
        locator: locator.to_string(),
        len,
    }
}

/// Fold character pairs into a cell. `chars.len()` must be even and ≤ 6.
fn fold(chars: &[char]) -> Result<GridCell> {
    let mut west = -180.0;
    let mut south = -90.0;
    let mut lon_size = 360.0;
    let mut lat_size = 180.0;

    for (level, pair) in chars.chunks(2).enumerate() {
        let alphabet = LEVELS[level];
        let divisions = alphabet.len() as f64;
        lon_size /= divisions;
        lat_size /= divisions;

        let position = level * 2;
        west += index_in(alphabet, pair[0], position)? as f64 * lon_size;
        south += index_in(alphabet, pair[1], position + 1)? as f64 * lat_size;
    }

    Ok(GridCell {
        south,
        west,
        lat_size,
        lon_size,
    })
}

fn index_in(alphabet: &[u8], ch: char, position: usize) -> Result<usize> {
    let upper = ch.to_ascii_uppercase();
    u8::try_from(upper)
        .ok()
        .and_then(|b| alphabet.iter().position(|&a| a == b))
        .ok_or(TelemetryError::InvalidLocatorCharacter { ch, position })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
