use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::organize::destination::DestinationResolver;
use crate::organize::error::OrganizeError;
use crate::organize::logger::RunLogger;
use crate::organize::mover::CollisionSafeMover;

/// Result of cleaning one directory tree.
#[derive(Debug, Default)]
pub struct CleanupSummary {
    pub deleted: Vec<PathBuf>,
    pub errors: Vec<OrganizeError>,
}

/// Removes directories that no longer contain any files.
///
/// Directories resolved as destinations in this run, and their ancestors, are kept.
/// In dry-run, files the mover has already moved away count as gone,
/// and deletions are only logged.
pub struct EmptyDirCleaner<'a> {
    resolver: &'a DestinationResolver,
    mover: &'a CollisionSafeMover,
    logger: &'a mut RunLogger,
    dryrun: bool,
}

impl<'a> EmptyDirCleaner<'a> {
    pub const fn new(
        resolver: &'a DestinationResolver,
        mover: &'a CollisionSafeMover,
        logger: &'a mut RunLogger,
        dryrun: bool,
    ) -> Self {
        Self {
            resolver,
            mover,
            logger,
            dryrun,
        }
    }

    /// Delete empty directories below `root`, deepest first.
    /// The root itself is only removed when `remove_root` is set.
    pub fn cleanup(&mut self, root: &Path, remove_root: bool) -> CleanupSummary {
        let mut summary = CleanupSummary::default();
        let mut removed: HashSet<PathBuf> = HashSet::new();

        let directories: Vec<PathBuf> = WalkDir::new(root)
            .contents_first(true)
            .sort_by_file_name()
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_dir())
            .filter(|entry| remove_root || entry.depth() > 0)
            .map(walkdir::DirEntry::into_path)
            .collect();

        for dir in directories {
            if self.resolver.is_protected(&dir) || !self.is_empty(&dir, &removed) {
                continue;
            }

            if self.dryrun {
                self.logger.delete(format!("Delete {}", dir.display()));
                removed.insert(dir.clone());
                summary.deleted.push(dir);
                continue;
            }

            match fs::remove_dir(&dir) {
                Ok(()) => {
                    self.logger.delete(format!("Delete {}", dir.display()));
                    removed.insert(dir.clone());
                    summary.deleted.push(dir);
                }
                Err(error) => {
                    let error = OrganizeError::Cleanup {
                        path: dir,
                        source: error,
                    };
                    self.logger.error(error.to_string());
                    summary.errors.push(error);
                }
            }
        }

        summary
    }

    /// A directory is empty when every entry is a removed subdirectory,
    /// or a file that was moved away in this run and nothing took its place.
    fn is_empty(&self, dir: &Path, removed: &HashSet<PathBuf>) -> bool {
        let Ok(entries) = fs::read_dir(dir) else {
            return false;
        };

        for entry in entries {
            let Ok(entry) = entry else {
                return false;
            };
            let path = entry.path();
            let Ok(file_type) = entry.file_type() else {
                return false;
            };
            let gone = if file_type.is_dir() {
                removed.contains(&path)
            } else {
                file_type.is_file() && self.mover.is_vacated(&path) && !self.mover.is_claimed(&path)
            };
            if !gone {
                return false;
            }
        }
        true
    }
}
