//! Grouping keys and folder/file names derived from header metadata.

use std::fmt;
use std::path::Path;
use std::sync::LazyLock;

use itertools::Itertools;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::organize::context::OrganizeOptions;
use crate::organize::metadata::{Attribute, MetadataRecord};
use crate::organize::sanitize::{SanitizedRecord, collapse_separators};

/// The single file extension handled by the organizer.
pub const FITS_EXTENSION: &str = "fits";

/// A 3 to 6 digit frame number at the end of a file stem.
/// An optional `_<n>` collision suffix from an earlier run may follow it.
static RE_SEQUENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|_)(\d{3,6})(?:_\d{1,2})?$").expect("Invalid sequence regex"));

const LIGHT_KEY_ATTRIBUTES: [Attribute; 8] = [
    Attribute::Object,
    Attribute::Telescope,
    Attribute::Date,
    Attribute::FocalLength,
    Attribute::Exposure,
    Attribute::Gain,
    Attribute::Temperature,
    Attribute::Camera,
];

const CALIBRATION_KEY_ATTRIBUTES: [Attribute; 8] = [
    Attribute::ImageType,
    Attribute::Telescope,
    Attribute::Date,
    Attribute::FocalLength,
    Attribute::Exposure,
    Attribute::Gain,
    Attribute::Temperature,
    Attribute::Camera,
];

const CALIBRATION_DATE_KEY_ATTRIBUTES: [Attribute; 2] = [Attribute::ImageType, Attribute::Date];

const LIGHT_FILE_ATTRIBUTES: [Attribute; 6] = [
    Attribute::ImageType,
    Attribute::Date,
    Attribute::Exposure,
    Attribute::Gain,
    Attribute::Temperature,
    Attribute::Object,
];

const CALIBRATION_FILE_ATTRIBUTES: [Attribute; 5] = [
    Attribute::ImageType,
    Attribute::Date,
    Attribute::Exposure,
    Attribute::Gain,
    Attribute::Temperature,
];

/// Frame type from the IMAGETYP header field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ImageType {
    Light,
    Dark,
    Flat,
    Bias,
    Snapshot,
    Other,
}

/// How calibration frames are grouped into folders.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CalibrationGrouping {
    /// Same optics and camera signature as light frames, without the object.
    #[default]
    Signature,
    /// Image type and date only.
    Date,
}

/// Ordered tuple of sanitized attribute values identifying one session setup.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupKey {
    parts: Vec<(Attribute, String)>,
}

impl ImageType {
    /// Image types that get their own subfolder in every destination.
    pub const CANONICAL: [Self; 5] = [Self::Light, Self::Dark, Self::Flat, Self::Bias, Self::Snapshot];

    /// Parse an IMAGETYP value, ignoring case and repeated whitespace.
    ///
    /// The whole value must match a type name or one of its `<TYPE> FRAME` aliases,
    /// anything else like `Dark Flat` is `Other`.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let normalized = raw.split_whitespace().join(" ").to_uppercase();
        match normalized.as_str() {
            "LIGHT" | "LIGHT FRAME" => Self::Light,
            "DARK" | "DARK FRAME" => Self::Dark,
            "FLAT" | "FLAT FRAME" | "FLAT FIELD" => Self::Flat,
            "BIAS" | "BIAS FRAME" => Self::Bias,
            "SNAPSHOT" => Self::Snapshot,
            _ => Self::Other,
        }
    }

    /// Image type of a metadata record, `Other` when missing or unrecognized.
    #[must_use]
    pub fn from_record(record: &MetadataRecord) -> Self {
        record
            .attribute(Attribute::ImageType)
            .map_or(Self::Other, |value| Self::parse(&value.to_string()))
    }

    /// Image type for a known subfolder name like `LIGHT`.
    #[must_use]
    pub fn from_folder_name(name: &str) -> Option<Self> {
        Self::CANONICAL.into_iter().find(|image_type| image_type.as_str() == name)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Light => "LIGHT",
            Self::Dark => "DARK",
            Self::Flat => "FLAT",
            Self::Bias => "BIAS",
            Self::Snapshot => "SNAPSHOT",
            Self::Other => "OTHER",
        }
    }

    /// Dark, flat and bias frames are not tied to a target object.
    #[must_use]
    pub const fn is_calibration(self) -> bool {
        matches!(self, Self::Dark | Self::Flat | Self::Bias)
    }
}

impl fmt::Display for ImageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl GroupKey {
    /// Build the key for an already sanitized record.
    #[must_use]
    pub fn from_sanitized(record: &SanitizedRecord, image_type: ImageType, options: &OrganizeOptions) -> Self {
        let attributes: &[Attribute] = if uses_calibration_rules(image_type, options) {
            match options.calibration_grouping {
                CalibrationGrouping::Signature => &CALIBRATION_KEY_ATTRIBUTES,
                CalibrationGrouping::Date => &CALIBRATION_DATE_KEY_ATTRIBUTES,
            }
        } else {
            &LIGHT_KEY_ATTRIBUTES
        };

        let parts = attributes
            .iter()
            .map(|&attribute| (attribute, name_value(record, image_type, attribute)))
            .collect();

        Self { parts }
    }

    /// Sanitized value of an attribute if it is part of this key.
    #[must_use]
    pub fn value(&self, attribute: Attribute) -> Option<&str> {
        self.parts
            .iter()
            .find(|(part, _)| *part == attribute)
            .map(|(_, value)| value.as_str())
    }

    pub fn parts(&self) -> impl Iterator<Item = (Attribute, &str)> {
        self.parts.iter().map(|(attribute, value)| (*attribute, value.as_str()))
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", build_folder_name(self))
    }
}

/// Compute the image type and grouping key of a record.
#[must_use]
pub fn build_key(record: &MetadataRecord, options: &OrganizeOptions) -> (ImageType, GroupKey) {
    let image_type = ImageType::from_record(record);
    let key = GroupKey::from_sanitized(&SanitizedRecord::new(record), image_type, options);
    (image_type, key)
}

/// Folder name for a grouping key, for example
/// `M-51_ASA10_2025-06-14_950_e180_g200_t-9.8_ASI2600MC-Pro`.
#[must_use]
pub fn build_folder_name(key: &GroupKey) -> String {
    let joined = key
        .parts()
        .map(|(attribute, value)| format!("{}{value}", attribute.name_prefix()))
        .collect::<Vec<_>>()
        .join("_");
    collapse_separators(&joined)
}

/// File name for a record, keeping the original frame number when there is one.
#[must_use]
pub fn build_file_name(record: &MetadataRecord, sequence_suffix: Option<&str>, options: &OrganizeOptions) -> String {
    let image_type = ImageType::from_record(record);
    file_name_from_sanitized(&SanitizedRecord::new(record), image_type, sequence_suffix, options)
}

/// File name for an already sanitized record.
#[must_use]
pub fn file_name_from_sanitized(
    record: &SanitizedRecord,
    image_type: ImageType,
    sequence_suffix: Option<&str>,
    options: &OrganizeOptions,
) -> String {
    let attributes: &[Attribute] = if uses_calibration_rules(image_type, options) {
        &CALIBRATION_FILE_ATTRIBUTES
    } else {
        &LIGHT_FILE_ATTRIBUTES
    };

    let mut parts: Vec<String> = attributes
        .iter()
        .map(|&attribute| format!("{}{}", attribute.name_prefix(), name_value(record, image_type, attribute)))
        .collect();

    if let Some(sequence) = sequence_suffix.filter(|s| !s.is_empty()) {
        parts.push(sequence.to_string());
    }

    format!("{}.{FITS_EXTENSION}", collapse_separators(&parts.join("_")))
}

/// Extract the frame number from the original file name.
///
/// ```rust
/// use std::path::Path;
/// use fits_organizer::organize::extract_sequence_suffix;
///
/// assert_eq!(extract_sequence_suffix(Path::new("light_0007.fits")).as_deref(), Some("0007"));
/// assert_eq!(extract_sequence_suffix(Path::new("NGC7000.fits")), None);
/// ```
#[must_use]
pub fn extract_sequence_suffix(path: &Path) -> Option<String> {
    let stem = crate::path_to_file_stem_string(path);
    RE_SEQUENCE
        .captures(&stem)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str().to_string())
}

/// Frame number of a file that is about to be named from the given record.
///
/// When the stem already starts with the organized name of the record,
/// only the rest of the stem is searched, so digits at the end of the object name
/// (`IC_1396`) are not taken as a frame number on the next run.
#[must_use]
pub fn sequence_for_record(
    path: &Path,
    record: &SanitizedRecord,
    image_type: ImageType,
    options: &OrganizeOptions,
) -> Option<String> {
    let stem = crate::path_to_file_stem_string(path);
    let base_name = file_name_from_sanitized(record, image_type, None, options);
    let base = base_name
        .strip_suffix(&format!(".{FITS_EXTENSION}"))
        .unwrap_or(&base_name);

    let searched = match stem.strip_prefix(base) {
        Some(rest) if rest.is_empty() || rest.starts_with('_') => rest,
        _ => stem.as_str(),
    };
    RE_SEQUENCE
        .captures(searched)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str().to_string())
}

const fn uses_calibration_rules(image_type: ImageType, options: &OrganizeOptions) -> bool {
    image_type.is_calibration() && options.group_calibration_without_object
}

/// Value written into names for an attribute.
/// Known image types use their canonical label, others the raw IMAGETYP token.
fn name_value(record: &SanitizedRecord, image_type: ImageType, attribute: Attribute) -> String {
    match attribute {
        Attribute::ImageType if image_type != ImageType::Other => image_type.as_str().to_string(),
        _ => record.get(attribute).to_string(),
    }
}
