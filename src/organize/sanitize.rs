//! Normalization of raw header values into filesystem-safe tokens.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use crate::organize::metadata::{Attribute, MetadataRecord, MetadataValue};

/// Token used for every missing, blank or unusable value.
pub const UNKNOWN: &str = "UNKNOWN";

/// Character that replaces invalid path characters inside a value.
pub const SEPARATOR: char = '-';

static RE_REPEATED_DASH: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-{2,}").expect("Invalid dash regex"));

static RE_REPEATED_UNDERSCORE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_{2,}").expect("Invalid underscore regex"));

/// All attribute tokens of one record, sanitized once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizedRecord {
    pub object: String,
    /// Upper-case IMAGETYP value, used as the label for unrecognized frame types.
    pub image_type: String,
    pub telescope: String,
    pub date: String,
    pub focal_length: String,
    pub exposure: String,
    pub gain: String,
    pub temperature: String,
    pub camera: String,
    pub filter: String,
}

/// Normalize a raw value into a filesystem-safe token.
///
/// Never fails and always returns the same output for the same input.
/// Sanitizing an already sanitized value returns it unchanged.
///
/// ```rust
/// use fits_organizer::organize::sanitize;
///
/// assert_eq!(sanitize("M 51"), "M-51");
/// assert_eq!(sanitize("  NGC 7000 / North America "), "NGC-7000-North-America");
/// assert_eq!(sanitize("-9.8"), "-9.8");
/// assert_eq!(sanitize("\"quoted\""), "quoted");
/// assert_eq!(sanitize("   "), "UNKNOWN");
/// ```
#[must_use]
pub fn sanitize(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return UNKNOWN.to_string();
    }

    let replaced: String = trimmed.nfc().filter_map(replace_invalid_char).collect();
    let collapsed = RE_REPEATED_DASH.replace_all(&replaced, "-");
    let stripped = strip_separators(&collapsed);

    if stripped.is_empty() {
        UNKNOWN.to_string()
    } else {
        stripped.to_string()
    }
}

/// Sanitize an optional header value.
#[must_use]
pub fn sanitize_value(value: Option<&MetadataValue>) -> String {
    value.map_or_else(|| UNKNOWN.to_string(), |value| sanitize(&value.to_string()))
}

/// Collapse separator runs produced by joining name fragments.
///
/// ```rust
/// use fits_organizer::organize::collapse_separators;
///
/// assert_eq!(collapse_separators("LIGHT__2025-06-14_e--180-"), "LIGHT_2025-06-14_e-180");
/// ```
#[must_use]
pub fn collapse_separators(name: &str) -> String {
    let collapsed = RE_REPEATED_DASH.replace_all(name, "-");
    let collapsed = RE_REPEATED_UNDERSCORE.replace_all(&collapsed, "_");
    strip_separators(collapsed.trim_matches('_')).to_string()
}

/// Date portion of a timestamp like `2025-06-14T23:10:00.115`.
///
/// Returns [`UNKNOWN`] when the value does not start with a valid calendar date.
#[must_use]
pub fn sanitize_date(value: Option<&MetadataValue>) -> String {
    let Some(MetadataValue::Text(text)) = value else {
        return UNKNOWN.to_string();
    };
    let date_part = text.trim().split(['T', ' ']).next().unwrap_or_default();
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .map_or_else(|_| UNKNOWN.to_string(), |date| date.format("%Y-%m-%d").to_string())
}

/// Camera model with a leading vendor word removed.
///
/// `ZWOptical_ZWO ASI2600MC-Pro` becomes `ASI2600MC-Pro`.
/// Single word values are returned as is.
#[must_use]
pub fn camera_model(raw: &str) -> String {
    let words: Vec<&str> = raw.split_whitespace().collect();
    if words.len() > 1 {
        words[1..].join(" ")
    } else {
        raw.trim().to_string()
    }
}

/// Count how many critical attributes are unknown.
#[must_use]
pub fn classify_quality(record: &MetadataRecord) -> usize {
    SanitizedRecord::new(record).unknown_count()
}

impl SanitizedRecord {
    #[must_use]
    pub fn new(record: &MetadataRecord) -> Self {
        let field = |attribute| sanitize_value(record.attribute(attribute));
        let camera = record
            .attribute(Attribute::Camera)
            .map_or_else(|| UNKNOWN.to_string(), |value| sanitize(&camera_model(&value.to_string())));

        Self {
            object: field(Attribute::Object),
            image_type: field(Attribute::ImageType).to_uppercase(),
            telescope: field(Attribute::Telescope),
            date: sanitize_date(record.attribute(Attribute::Date)),
            focal_length: field(Attribute::FocalLength),
            exposure: field(Attribute::Exposure),
            gain: field(Attribute::Gain),
            temperature: field(Attribute::Temperature),
            camera,
            filter: field(Attribute::Filter),
        }
    }

    /// Sanitized token of an attribute.
    #[must_use]
    pub fn get(&self, attribute: Attribute) -> &str {
        match attribute {
            Attribute::Object => &self.object,
            Attribute::ImageType => &self.image_type,
            Attribute::Telescope => &self.telescope,
            Attribute::Date => &self.date,
            Attribute::FocalLength => &self.focal_length,
            Attribute::Exposure => &self.exposure,
            Attribute::Gain => &self.gain,
            Attribute::Temperature => &self.temperature,
            Attribute::Camera => &self.camera,
            Attribute::Filter => &self.filter,
        }
    }

    /// Number of critical attributes that resolved to [`UNKNOWN`].
    #[must_use]
    pub fn unknown_count(&self) -> usize {
        Attribute::CRITICAL
            .iter()
            .filter(|attribute| self.get(**attribute) == UNKNOWN)
            .count()
    }
}

fn replace_invalid_char(c: char) -> Option<char> {
    match c {
        '"' => None,
        ' ' | '/' | '\\' | ':' | '|' | '<' | '>' | '*' | '?' => Some(SEPARATOR),
        c if c.is_whitespace() || c.is_control() => Some(SEPARATOR),
        c => Some(c),
    }
}

/// Strip leading and trailing dashes, keeping a leading minus sign of a number.
fn strip_separators(value: &str) -> &str {
    let value = value.trim_end_matches(SEPARATOR);
    match value.strip_prefix(SEPARATOR) {
        Some(rest) if rest.starts_with(|c: char| c.is_ascii_digit()) => value,
        Some(rest) => rest.trim_start_matches(SEPARATOR),
        None => value,
    }
}

#[cfg(test)]
mod sanitize_tests {
    use super::*;

    #[test]
    fn replaces_path_characters() {
        let result = sanitize("a b/c\\d:e|f");
        assert_eq!(result, "a-b-c-d-e-f");
        assert!(!result.contains([' ', '/', '\\', ':', '|']));
    }

    #[test]
    fn removes_quotes() {
        assert_eq!(sanitize("\"M 51\""), "M-51");
    }

    #[test]
    fn collapses_repeated_separators() {
        assert_eq!(sanitize("NGC   7000"), "NGC-7000");
        assert_eq!(sanitize("a - / - b"), "a-b");
        assert!(!sanitize("x :: y").contains("--"));
    }

    #[test]
    fn strips_leading_and_trailing_separators() {
        assert_eq!(sanitize(" /M 51/ "), "M-51");
        assert_eq!(sanitize("--abc--"), "abc");
    }

    #[test]
    fn keeps_negative_numbers() {
        assert_eq!(sanitize("-9.8"), "-9.8");
        assert_eq!(sanitize("-10"), "-10");
    }

    #[test]
    fn empty_values_become_unknown() {
        assert_eq!(sanitize(""), UNKNOWN);
        assert_eq!(sanitize("  \t "), UNKNOWN);
        assert_eq!(sanitize("///"), UNKNOWN);
        assert_eq!(sanitize_value(None), UNKNOWN);
    }

    #[test]
    fn sanitize_is_idempotent() {
        for raw in [
            "M 51",
            " -9.8 ",
            "ZWO ASI2600MC Pro",
            "a//b::c",
            "",
            "\"x\" | y",
            "- 9",
            "Sh2-129 (Flying Bat)",
        ] {
            let once = sanitize(raw);
            assert_eq!(sanitize(&once), once, "not idempotent for {raw:?}");
        }
    }

    #[test]
    fn sanitize_composes_unicode() {
        assert_eq!(sanitize("Ha\u{30a}kan"), "H\u{e5}kan");
    }

    #[test]
    fn numeric_values_are_rendered() {
        assert_eq!(sanitize_value(Some(&MetadataValue::Float(180.0))), "180");
        assert_eq!(sanitize_value(Some(&MetadataValue::Float(-9.8))), "-9.8");
        assert_eq!(sanitize_value(Some(&MetadataValue::Integer(950))), "950");
    }

    #[test]
    fn date_uses_only_date_part() {
        let value = MetadataValue::from("2025-06-14T23:10:00.115");
        assert_eq!(sanitize_date(Some(&value)), "2025-06-14");
        let value = MetadataValue::from("2025-06-14 23:10:00");
        assert_eq!(sanitize_date(Some(&value)), "2025-06-14");
    }

    #[test]
    fn garbled_date_is_unknown() {
        assert_eq!(sanitize_date(Some(&MetadataValue::from("yesterday"))), UNKNOWN);
        assert_eq!(sanitize_date(Some(&MetadataValue::from("2025-13-40T00:00:00"))), UNKNOWN);
        assert_eq!(sanitize_date(Some(&MetadataValue::Integer(2025))), UNKNOWN);
        assert_eq!(sanitize_date(None), UNKNOWN);
    }

    #[test]
    fn camera_vendor_is_dropped() {
        assert_eq!(camera_model("ZWOptical_ZWO ASI2600MC-Pro"), "ASI2600MC-Pro");
        assert_eq!(camera_model("ZWO ASI2600MM Pro"), "ASI2600MM Pro");
        assert_eq!(camera_model("ASI294MC"), "ASI294MC");
    }

    #[test]
    fn collapse_separators_cleans_joined_names() {
        assert_eq!(collapse_separators("M-51__ASA10"), "M-51_ASA10");
        assert_eq!(collapse_separators("LIGHT_e--180"), "LIGHT_e-180");
        assert_eq!(collapse_separators("t-9.8"), "t-9.8");
    }

    #[test]
    fn quality_counts_missing_critical_fields() {
        let record = MetadataRecord::new()
            .with("OBJECT", "M 51")
            .with("TELESCOP", "ASA10")
            .with("DATE-LOC", "2025-06-14T23:10:00")
            .with("FOCALLEN", 950_i64)
            .with("EXPOSURE", 180.0)
            .with("CAMERAID", "ZWO ASI2600MC Pro");
        assert_eq!(classify_quality(&record), 0);

        let sparse = MetadataRecord::new().with("OBJECT", "M 51").with("DATE-LOC", "garbage");
        assert_eq!(classify_quality(&sparse), 5);
    }

    #[test]
    fn quality_uses_fallback_fields() {
        let record = MetadataRecord::new()
            .with("OBJECT", "M 51")
            .with("TELESCOP", "ASA10")
            .with("DATE-OBS", "2025-06-14T21:10:00")
            .with("FOCALLEN", 950_i64)
            .with("EXPTIME", 180.0)
            .with("INSTRUME", "ZWO ASI2600MC Pro");
        assert_eq!(classify_quality(&record), 0);
    }

    #[test]
    fn sanitized_record_uses_camera_model() {
        let record = MetadataRecord::new().with("CAMERAID", "ZWOptical_ZWO ASI2600MC-Pro");
        assert_eq!(SanitizedRecord::new(&record).camera, "ASI2600MC-Pro");
    }
}
