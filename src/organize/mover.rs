use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::insert_suffix_before_extension;
use crate::organize::error::OrganizeError;

/// Highest numeric suffix tried before giving up on a name.
pub const MAX_COLLISION_ATTEMPTS: usize = 99;

/// Result of relocating one file.
#[derive(Debug)]
pub enum MoveOutcome {
    /// Moved to the exact target name.
    Moved(PathBuf),
    /// Source already is the target.
    SkippedIdentical,
    /// Moved to a free name with a `_<n>` suffix.
    MovedWithSuffix(PathBuf, usize),
    Failed(OrganizeError),
}

/// Moves files without ever overwriting an existing file.
///
/// Keeps track of the targets claimed and the sources vacated during the run,
/// so dry-run numbering matches what a real run would do.
#[derive(Debug, Default)]
pub struct CollisionSafeMover {
    dryrun: bool,
    claimed: HashSet<PathBuf>,
    vacated: HashSet<PathBuf>,
}

impl MoveOutcome {
    /// Final path if the file was (or would be) moved.
    #[must_use]
    pub const fn target(&self) -> Option<&PathBuf> {
        match self {
            Self::Moved(path) | Self::MovedWithSuffix(path, _) => Some(path),
            Self::SkippedIdentical | Self::Failed(_) => None,
        }
    }
}

impl CollisionSafeMover {
    #[must_use]
    pub fn new(dryrun: bool) -> Self {
        Self {
            dryrun,
            ..Self::default()
        }
    }

    /// Move `source` into `target_dir` as `file_name`, picking a free name on collision.
    pub fn move_file(&mut self, source: &Path, target_dir: &Path, file_name: &str) -> MoveOutcome {
        let source_key = normalize(source);
        let candidate = target_dir.join(file_name);
        if normalize(&candidate) == source_key {
            return MoveOutcome::SkippedIdentical;
        }

        if !self.is_taken(&candidate) {
            return match self.relocate(source, &candidate) {
                Ok(()) => MoveOutcome::Moved(candidate),
                Err(error) => MoveOutcome::Failed(error),
            };
        }

        for number in 1..=MAX_COLLISION_ATTEMPTS {
            let suffixed = insert_suffix_before_extension(&candidate, &format!("_{number}"));
            if normalize(&suffixed) == source_key {
                return MoveOutcome::SkippedIdentical;
            }
            if !self.is_taken(&suffixed) {
                return match self.relocate(source, &suffixed) {
                    Ok(()) => MoveOutcome::MovedWithSuffix(suffixed, number),
                    Err(error) => MoveOutcome::Failed(error),
                };
            }
        }

        MoveOutcome::Failed(OrganizeError::CollisionExhausted {
            path: candidate,
            attempts: MAX_COLLISION_ATTEMPTS,
        })
    }

    /// True if the file was moved away earlier in this run.
    #[must_use]
    pub fn is_vacated(&self, path: &Path) -> bool {
        self.vacated.contains(&normalize(path))
    }

    /// True if a file was moved to this path earlier in this run.
    #[must_use]
    pub fn is_claimed(&self, path: &Path) -> bool {
        self.claimed.contains(&normalize(path))
    }

    fn is_taken(&self, candidate: &Path) -> bool {
        let key = normalize(candidate);
        self.claimed.contains(&key) || (candidate.exists() && !self.vacated.contains(&key))
    }

    fn relocate(&mut self, source: &Path, target: &Path) -> Result<(), OrganizeError> {
        let source_key = normalize(source);
        if !self.dryrun {
            rename_or_copy(source, target).map_err(|error| OrganizeError::Move {
                path: source.to_path_buf(),
                target: target.to_path_buf(),
                source: error,
            })?;
        }
        self.claimed.insert(normalize(target));
        self.vacated.insert(source_key);
        Ok(())
    }
}

/// Rename the file, falling back to copy and remove when crossing filesystems.
/// The source is left untouched if the move fails.
fn rename_or_copy(source: &Path, target: &Path) -> std::io::Result<()> {
    match fs::rename(source, target) {
        Ok(()) => Ok(()),
        Err(rename_error) => {
            if target.exists() || !source.is_file() {
                return Err(rename_error);
            }
            fs::copy(source, target)?;
            if let Err(error) = fs::remove_file(source) {
                let _ = fs::remove_file(target);
                return Err(error);
            }
            Ok(())
        }
    }
}

/// Absolute path with symlinks resolved where possible.
/// Paths that do not exist yet are resolved through their parent.
fn normalize(path: &Path) -> PathBuf {
    if let Ok(canonical) = dunce::canonicalize(path) {
        return canonical;
    }
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) => dunce::canonicalize(parent)
            .map_or_else(|_| dunce::simplified(path).to_path_buf(), |parent| parent.join(name)),
        _ => dunce::simplified(path).to_path_buf(),
    }
}
