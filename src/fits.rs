//! Minimal FITS primary header reader.
//!
//! Only the header cards are read. Parsing stops at the `END` card,
//! so pixel data is never touched.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use crate::organize::{MetadataReader, MetadataRecord, MetadataValue, ReadError};

/// Size of one header card.
pub const CARD_SIZE: usize = 80;

/// Size of one FITS block. Headers are padded to a multiple of this.
pub const BLOCK_SIZE: usize = 2880;

/// Upper bound for header blocks read before giving up on a missing `END` card.
pub const MAX_HEADER_BLOCKS: usize = 256;

const CARDS_PER_BLOCK: usize = BLOCK_SIZE / CARD_SIZE;

/// Reads the primary header of FITS files from disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct FitsHeaderReader;

impl MetadataReader for FitsHeaderReader {
    fn read(&self, path: &Path) -> Result<MetadataRecord, ReadError> {
        read_header(path)
    }
}

/// Read the primary header of a FITS file.
///
/// # Errors
/// Returns an error if the file cannot be read or does not start with a valid FITS header.
pub fn read_header(path: &Path) -> Result<MetadataRecord, ReadError> {
    let file = File::open(path).map_err(|source| ReadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_header(BufReader::new(file), path)
}

/// Parse header cards from a reader until the `END` card.
///
/// # Errors
/// Returns an error if reading fails, the first card is not `SIMPLE = T`,
/// or no `END` card is found.
pub fn parse_header<R: Read>(mut reader: R, path: &Path) -> Result<MetadataRecord, ReadError> {
    let invalid = |reason: &str| ReadError::InvalidHeader {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    };

    let mut record = MetadataRecord::new();
    let mut block = [0u8; BLOCK_SIZE];

    for block_index in 0..MAX_HEADER_BLOCKS {
        match reader.read_exact(&mut block) {
            Ok(()) => {}
            Err(error) if error.kind() == io::ErrorKind::UnexpectedEof => {
                return Err(if block_index == 0 {
                    invalid("file is smaller than one FITS block")
                } else {
                    invalid("header ends without END card")
                });
            }
            Err(source) => {
                return Err(ReadError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        }

        for (card_index, card) in block.chunks_exact(CARD_SIZE).enumerate() {
            let keyword = card_keyword(card);
            if block_index == 0 && card_index == 0 {
                if keyword != "SIMPLE" {
                    return Err(invalid("first card is not SIMPLE"));
                }
                if parse_card(card).map(|(_, value)| value) != Some(MetadataValue::Bool(true)) {
                    return Err(invalid("SIMPLE is not T"));
                }
            }
            if keyword == "END" {
                return Ok(record);
            }
            if let Some((key, value)) = parse_card(card) {
                record.insert(&key, value);
            }
        }
    }

    Err(invalid(&format!(
        "no END card within {} header cards",
        MAX_HEADER_BLOCKS * CARDS_PER_BLOCK
    )))
}

/// Parse one `KEYWORD = value / comment` card.
///
/// Returns `None` for cards without a value, like `COMMENT`, `HISTORY` or blank cards.
#[must_use]
pub fn parse_card(card: &[u8]) -> Option<(String, MetadataValue)> {
    if card.len() < 10 || &card[8..10] != b"= " {
        return None;
    }
    let keyword = card_keyword(card);
    if keyword.is_empty() {
        return None;
    }
    let value = parse_value(&String::from_utf8_lossy(&card[10..]))?;
    Some((keyword, value))
}

/// Parse the value field of a card.
///
/// ```rust
/// use fits_organizer::fits::parse_value;
/// use fits_organizer::organize::MetadataValue;
///
/// assert_eq!(parse_value("'M 51    '  / target"), Some(MetadataValue::from("M 51")));
/// assert_eq!(parse_value("                 180 / [s]"), Some(MetadataValue::Integer(180)));
/// assert_eq!(parse_value("-9.8"), Some(MetadataValue::Float(-9.8)));
/// assert_eq!(parse_value("T"), Some(MetadataValue::Bool(true)));
/// ```
#[must_use]
pub fn parse_value(field: &str) -> Option<MetadataValue> {
    let field = field.trim_start();
    if let Some(rest) = field.strip_prefix('\'') {
        return Some(MetadataValue::Text(parse_string(rest)));
    }

    let value = field.split_once('/').map_or(field, |(value, _)| value).trim();
    if value.is_empty() {
        return None;
    }

    match value {
        "T" => return Some(MetadataValue::Bool(true)),
        "F" => return Some(MetadataValue::Bool(false)),
        _ => {}
    }

    if let Ok(integer) = value.parse::<i64>() {
        return Some(MetadataValue::Integer(integer));
    }

    if let Ok(float) = value.replace(['D', 'd'], "E").parse::<f64>() {
        return Some(MetadataValue::Float(float));
    }

    Some(MetadataValue::Text(value.to_string()))
}

/// Encode a minimal header with the given fields, padded to a full block.
///
/// `SIMPLE`, `BITPIX` and `NAXIS` come first, so the result is a valid FITS file
/// without data.
#[must_use]
pub fn encode_header(record: &MetadataRecord) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(BLOCK_SIZE);
    bytes.extend(encode_card("SIMPLE", &MetadataValue::Bool(true)));
    bytes.extend(encode_card("BITPIX", &MetadataValue::Integer(8)));
    bytes.extend(encode_card("NAXIS", &MetadataValue::Integer(0)));

    for (key, value) in record.iter() {
        if matches!(key, "SIMPLE" | "BITPIX" | "NAXIS" | "END") {
            continue;
        }
        bytes.extend(encode_card(key, value));
    }

    let mut end = [b' '; CARD_SIZE];
    end[..3].copy_from_slice(b"END");
    bytes.extend(end);

    let padded_len = bytes.len().div_ceil(BLOCK_SIZE) * BLOCK_SIZE;
    bytes.resize(padded_len, b' ');
    bytes
}

/// Encode a single 80 byte card. Non-ASCII characters are replaced.
#[must_use]
pub fn encode_card(key: &str, value: &MetadataValue) -> [u8; CARD_SIZE] {
    let value = match value {
        MetadataValue::Text(text) => format!("'{:<8}'", text.replace('\'', "''")),
        MetadataValue::Integer(integer) => format!("{integer:>20}"),
        MetadataValue::Float(float) => format!("{:>20}", format!("{float:?}")),
        MetadataValue::Bool(flag) => format!("{:>20}", if *flag { "T" } else { "F" }),
    };
    let text = format!("{:<8}= {value}", key.to_uppercase());

    let mut card = [b' '; CARD_SIZE];
    for (slot, c) in card.iter_mut().zip(text.chars()) {
        *slot = if c.is_ascii() { c as u8 } else { b'_' };
    }
    card
}

fn card_keyword(card: &[u8]) -> String {
    String::from_utf8_lossy(&card[..8.min(card.len())]).trim().to_string()
}

/// Read a quoted string after the opening quote. Two quotes are an escaped quote.
fn parse_string(rest: &str) -> String {
    let mut value = String::new();
    let mut chars = rest.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\'' {
            if chars.peek() == Some(&'\'') {
                value.push('\'');
                chars.next();
            } else {
                break;
            }
        } else {
            value.push(c);
        }
    }
    value.trim_end().to_string()
}
