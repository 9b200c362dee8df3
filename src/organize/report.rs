use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use colored::Colorize;
use serde::Serialize;

use crate::organize::mover::MoveOutcome;

/// A file or directory that could not be handled, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure {
    pub path: PathBuf,
    pub reason: String,
}

/// Summary of one organizer run.
#[derive(Debug, Default, Serialize)]
pub struct Report {
    pub dryrun: bool,
    pub moved: usize,
    pub moved_with_suffix: usize,
    pub skipped_identical: usize,
    pub skipped_low_quality: usize,
    pub read_errors: usize,
    pub failed: usize,
    pub dirs_deleted: usize,
    pub cleanup_errors: usize,
    pub failures: Vec<Failure>,
    /// Destination directories used for the files of each source directory.
    pub destinations: BTreeMap<PathBuf, BTreeSet<PathBuf>>,
}

impl Report {
    #[must_use]
    pub fn new(dryrun: bool) -> Self {
        Self {
            dryrun,
            ..Self::default()
        }
    }

    /// Count a move outcome.
    pub fn add_outcome(&mut self, source: &Path, outcome: &MoveOutcome) {
        match outcome {
            MoveOutcome::Moved(_) => self.moved += 1,
            MoveOutcome::MovedWithSuffix(..) => self.moved_with_suffix += 1,
            MoveOutcome::SkippedIdentical => self.skipped_identical += 1,
            MoveOutcome::Failed(error) => {
                self.failed += 1;
                self.add_failure(source, error.to_string());
            }
        }
    }

    pub fn add_failure(&mut self, path: &Path, reason: impl Into<String>) {
        self.failures.push(Failure {
            path: path.to_path_buf(),
            reason: reason.into(),
        });
    }

    /// Record the destination directory used for a source file.
    pub fn add_destination(&mut self, source: &Path, target_dir: &Path) {
        let source_dir = source.parent().unwrap_or(source).to_path_buf();
        self.destinations
            .entry(source_dir)
            .or_default()
            .insert(target_dir.to_path_buf());
    }

    /// Files moved to a new path, with or without a suffix.
    #[must_use]
    pub const fn total_moved(&self) -> usize {
        self.moved + self.moved_with_suffix
    }

    #[must_use]
    pub const fn total_skipped(&self) -> usize {
        self.skipped_identical + self.skipped_low_quality
    }

    #[must_use]
    pub const fn total_files(&self) -> usize {
        self.total_moved() + self.total_skipped() + self.read_errors + self.failed
    }

    #[must_use]
    pub const fn has_errors(&self) -> bool {
        self.read_errors > 0 || self.failed > 0 || self.cleanup_errors > 0
    }

    pub fn print_summary(&self) {
        let title = if self.dryrun {
            "\n--- Organize Summary (dry-run) ---"
        } else {
            "\n--- Organize Summary ---"
        };
        println!("{}", title.bold().magenta());
        println!("Files found:            {}", self.total_files());
        println!("Files moved:            {}", self.total_moved());
        if self.moved_with_suffix > 0 {
            println!("  - With suffix:        {}", self.moved_with_suffix);
        }
        println!("Files skipped:          {}", self.total_skipped());
        if self.total_skipped() > 0 {
            println!("  - Already in place:   {}", self.skipped_identical);
            println!("  - Low quality:        {}", self.skipped_low_quality);
        }
        println!("Read errors:            {}", colored_count(self.read_errors));
        println!("Files failed:           {}", colored_count(self.failed));
        println!("Directories deleted:    {}", self.dirs_deleted);
        if self.cleanup_errors > 0 {
            println!("Cleanup errors:         {}", colored_count(self.cleanup_errors));
        }

        if !self.failures.is_empty() {
            println!("{}", "\nFailures:".bold());
            for failure in &self.failures {
                println!("  {}: {}", failure.path.display(), failure.reason.red());
            }
        }
    }
}

fn colored_count(count: usize) -> colored::ColoredString {
    if count > 0 {
        count.to_string().red()
    } else {
        "0".normal()
    }
}

#[cfg(test)]
mod report_tests {
    use super::*;

    use crate::organize::error::OrganizeError;

    #[test]
    fn outcomes_are_counted() {
        let mut report = Report::new(false);
        let source = Path::new("/astro/session/LIGHT/light_0001.fits");
        report.add_outcome(source, &MoveOutcome::Moved(PathBuf::from("/astro/M-51/LIGHT/a.fits")));
        report.add_outcome(source, &MoveOutcome::MovedWithSuffix(PathBuf::from("/astro/M-51/LIGHT/a_1.fits"), 1));
        report.add_outcome(source, &MoveOutcome::SkippedIdentical);
        report.add_outcome(
            source,
            &MoveOutcome::Failed(OrganizeError::CollisionExhausted {
                path: PathBuf::from("/astro/M-51/LIGHT/a.fits"),
                attempts: 99,
            }),
        );

        assert_eq!(report.moved, 1);
        assert_eq!(report.moved_with_suffix, 1);
        assert_eq!(report.total_moved(), 2);
        assert_eq!(report.skipped_identical, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.total_files(), 4);
        assert!(report.has_errors());
    }

    #[test]
    fn destinations_are_grouped_by_source_dir() {
        let mut report = Report::new(false);
        report.add_destination(Path::new("/s/LIGHT/a.fits"), Path::new("/o/M-51/LIGHT"));
        report.add_destination(Path::new("/s/LIGHT/b.fits"), Path::new("/o/M-51/LIGHT"));
        report.add_destination(Path::new("/s/DARK/c.fits"), Path::new("/o/DARK_x/DARK"));
        assert_eq!(report.destinations.len(), 2);
        assert_eq!(report.destinations[Path::new("/s/LIGHT")].len(), 1);
    }

    #[test]
    fn report_serializes_to_json() {
        let mut report = Report::new(true);
        report.moved = 3;
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["moved"], 3);
        assert_eq!(json["dryrun"], true);
    }
}
