//! Metadata driven grouping, naming and relocation of FITS exposures.
//!
//! A run reads the header of every candidate file, derives a grouping key
//! and a file name from it, moves the file into the destination of that key
//! without overwriting anything, and finally removes directories left empty.

pub mod cleaner;
pub mod context;
pub mod destination;
pub mod error;
pub mod logger;
pub mod metadata;
pub mod mover;
pub mod naming;
pub mod report;
pub mod sanitize;
pub mod walker;

pub use cleaner::{CleanupSummary, EmptyDirCleaner};
pub use context::{DEFAULT_UNKNOWN_THRESHOLD, Layout, OrganizeOptions, RunContext};
pub use destination::{Destination, DestinationResolver};
pub use error::{OrganizeError, ReadError};
pub use logger::{LogEntry, LogLevel, RunLogger};
pub use metadata::{Attribute, MetadataReader, MetadataRecord, MetadataValue};
pub use mover::{CollisionSafeMover, MAX_COLLISION_ATTEMPTS, MoveOutcome};
pub use naming::{
    CalibrationGrouping, FITS_EXTENSION, GroupKey, ImageType, build_file_name, build_folder_name, build_key,
    extract_sequence_suffix, sequence_for_record,
};
pub use report::{Failure, Report};
pub use sanitize::{SanitizedRecord, UNKNOWN, classify_quality, collapse_separators, sanitize};
pub use walker::{FileTask, TreeWalker};
