use std::path::PathBuf;

use serde::Serialize;

use crate::organize::destination::DestinationResolver;
use crate::organize::logger::RunLogger;
use crate::organize::mover::CollisionSafeMover;
use crate::organize::naming::CalibrationGrouping;

/// Default number of unknown critical fields tolerated before a file is skipped.
pub const DEFAULT_UNKNOWN_THRESHOLD: usize = 2;

/// How candidate files are discovered under the root directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum Layout {
    /// `root/<session>/<IMAGETYPE>/*.fits`
    #[default]
    Sessions,
    /// Every FITS file anywhere below the root.
    Recursive,
}

/// Options for one organizer run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrganizeOptions {
    /// Dark, flat and bias frames are grouped without the object name.
    pub group_calibration_without_object: bool,
    pub calibration_grouping: CalibrationGrouping,
    /// Create and use LIGHT, DARK, FLAT, BIAS and SNAPSHOT subfolders in each destination.
    pub nested_subfolders: bool,
    /// Skip files with more unknown critical fields than this. `None` disables the check.
    pub unknown_field_threshold: Option<usize>,
    pub dryrun: bool,
    pub layout: Layout,
    /// Destination root. Defaults to the input root.
    pub output: Option<PathBuf>,
}

impl Default for OrganizeOptions {
    fn default() -> Self {
        Self {
            group_calibration_without_object: true,
            calibration_grouping: CalibrationGrouping::Signature,
            nested_subfolders: true,
            unknown_field_threshold: Some(DEFAULT_UNKNOWN_THRESHOLD),
            dryrun: false,
            layout: Layout::Sessions,
            output: None,
        }
    }
}

/// Explicit state of a single run.
///
/// Owns the destination cache and the paths claimed and vacated so far,
/// so a fresh context gives a fully independent run.
pub struct RunContext {
    pub options: OrganizeOptions,
    pub logger: RunLogger,
    pub resolver: DestinationResolver,
    pub mover: CollisionSafeMover,
}

impl RunContext {
    #[must_use]
    pub fn new(options: OrganizeOptions, logger: RunLogger) -> Self {
        let resolver = DestinationResolver::new(options.nested_subfolders, options.dryrun);
        let mover = CollisionSafeMover::new(options.dryrun);
        Self {
            options,
            logger,
            resolver,
            mover,
        }
    }

    /// Context with default options and a silent in-memory logger.
    #[must_use]
    pub fn in_memory(options: OrganizeOptions) -> Self {
        let logger = RunLogger::in_memory(options.dryrun);
        Self::new(options, logger)
    }
}
