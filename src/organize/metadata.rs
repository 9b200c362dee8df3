//! Metadata records and the reader seam.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::Serialize;

use crate::organize::error::ReadError;

/// A single raw header value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
}

/// Header fields of one file keyed by upper-case field name.
///
/// Created once per file by a [`MetadataReader`] and never modified afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetadataRecord {
    fields: BTreeMap<String, MetadataValue>,
}

/// Logical attributes used for grouping and naming.
///
/// Each attribute is read from an ordered list of candidate header fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Attribute {
    Object,
    ImageType,
    Telescope,
    Date,
    FocalLength,
    Exposure,
    Gain,
    Temperature,
    Camera,
    Filter,
}

/// Produces a metadata record for a file path.
pub trait MetadataReader {
    /// Read the header fields of the given file.
    ///
    /// # Errors
    /// Returns a [`ReadError`] if the file cannot be opened or its header is not valid.
    fn read(&self, path: &Path) -> Result<MetadataRecord, ReadError>;
}

impl<F> MetadataReader for F
where
    F: Fn(&Path) -> Result<MetadataRecord, ReadError>,
{
    fn read(&self, path: &Path) -> Result<MetadataRecord, ReadError> {
        self(path)
    }
}

impl MetadataValue {
    /// True for text values that contain only whitespace.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        matches!(self, Self::Text(text) if text.trim().is_empty())
    }

    /// Numeric value if this is a number or numeric text.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(value) => Some(*value as f64),
            Self::Float(value) => Some(*value),
            Self::Text(text) => text.trim().parse().ok(),
            Self::Bool(_) => None,
        }
    }
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => write!(f, "{text}"),
            Self::Integer(value) => write!(f, "{value}"),
            // 180.0 -> "180", -9.8 -> "-9.8"
            Self::Float(value) if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 => {
                write!(f, "{}", *value as i64)
            }
            Self::Float(value) => write!(f, "{value}"),
            Self::Bool(value) => write!(f, "{}", if *value { "T" } else { "F" }),
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for MetadataValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for MetadataValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for MetadataValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl MetadataRecord {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder style insert used by readers and tests.
    #[must_use]
    pub fn with(mut self, key: &str, value: impl Into<MetadataValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert a field. Keys are stored upper-case.
    pub fn insert(&mut self, key: &str, value: impl Into<MetadataValue>) {
        self.fields.insert(key.trim().to_uppercase(), value.into());
    }

    /// Get a field by name, ignoring case.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&MetadataValue> {
        self.fields.get(&key.trim().to_uppercase())
    }

    /// First present, non-blank value of the given fields.
    #[must_use]
    pub fn first_present(&self, keys: &[&str]) -> Option<&MetadataValue> {
        keys.iter()
            .filter_map(|key| self.get(key))
            .find(|value| !value.is_blank())
    }

    /// Raw value of a logical attribute using its candidate field list.
    #[must_use]
    pub fn attribute(&self, attribute: Attribute) -> Option<&MetadataValue> {
        self.first_present(attribute.candidates())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetadataValue)> {
        self.fields.iter().map(|(key, value)| (key.as_str(), value))
    }
}

impl<K: AsRef<str>, V: Into<MetadataValue>> FromIterator<(K, V)> for MetadataRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Self::new();
        for (key, value) in iter {
            record.insert(key.as_ref(), value);
        }
        record
    }
}

impl Attribute {
    /// Attributes whose absence makes a record untrustworthy.
    pub const CRITICAL: [Self; 6] = [
        Self::Object,
        Self::Telescope,
        Self::Date,
        Self::FocalLength,
        Self::Exposure,
        Self::Camera,
    ];

    /// Header fields tried in order, first present value wins.
    #[must_use]
    pub const fn candidates(self) -> &'static [&'static str] {
        match self {
            Self::Object => &["OBJECT"],
            Self::ImageType => &["IMAGETYP"],
            Self::Telescope => &["TELESCOP"],
            Self::Date => &["DATE-LOC", "DATE-OBS"],
            Self::FocalLength => &["FOCALLEN"],
            Self::Exposure => &["EXPOSURE", "EXPTIME"],
            Self::Gain => &["GAIN"],
            Self::Temperature => &["CCD-TEMP"],
            Self::Camera => &["CAMERAID", "INSTRUME"],
            Self::Filter => &["FILTER"],
        }
    }

    /// Short marker written in front of the value in composed names.
    #[must_use]
    pub const fn name_prefix(self) -> &'static str {
        match self {
            Self::Exposure => "e",
            Self::Gain => "g",
            Self::Temperature => "t",
            _ => "",
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.candidates()[0])
    }
}
