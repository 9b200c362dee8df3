use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use crate::organize::error::OrganizeError;
use crate::organize::logger::RunLogger;
use crate::organize::naming::{GroupKey, ImageType, build_folder_name};

/// Destination directory of one grouping key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    pub path: PathBuf,
    pub key: GroupKey,
}

/// Maps grouping keys to destination directories for the duration of a run.
///
/// Each key is resolved and created at most once.
/// Creation failures are cached as well,
/// so every file of a broken key fails the same way without retrying.
#[derive(Debug)]
pub struct DestinationResolver {
    nested_subfolders: bool,
    dryrun: bool,
    /// Failures keep the claimed folder path next to the reason.
    cache: HashMap<GroupKey, Result<Destination, (PathBuf, String)>>,
    folder_owners: HashMap<PathBuf, GroupKey>,
    /// Directories created or verified by this resolver during the run.
    resolved_dirs: BTreeSet<PathBuf>,
}

impl Destination {
    /// Directory where files of the given image type are placed.
    #[must_use]
    pub fn dir_for(&self, image_type: ImageType, nested_subfolders: bool) -> PathBuf {
        if nested_subfolders {
            self.path.join(image_type.as_str())
        } else {
            self.path.clone()
        }
    }
}

impl DestinationResolver {
    #[must_use]
    pub fn new(nested_subfolders: bool, dryrun: bool) -> Self {
        Self {
            nested_subfolders,
            dryrun,
            cache: HashMap::new(),
            folder_owners: HashMap::new(),
            resolved_dirs: BTreeSet::new(),
        }
    }

    /// Resolve the destination of a key below the given root, creating it on first use.
    ///
    /// # Errors
    /// Returns `OrganizeError::DestinationCreate` if the directory could not be created,
    /// now or during an earlier resolution of the same key.
    pub fn resolve(&mut self, key: &GroupKey, root: &Path, logger: &mut RunLogger) -> Result<Destination, OrganizeError> {
        if let Some(cached) = self.cache.get(key) {
            return Self::to_result(cached);
        }

        let path = self.claim_folder(key, root);
        let mut dirs = vec![path.clone()];
        if self.nested_subfolders {
            dirs.extend(ImageType::CANONICAL.iter().map(|image_type| path.join(image_type.as_str())));
        }

        let result = self
            .ensure_dirs(&path, &dirs, logger)
            .map(|()| Destination {
                path: path.clone(),
                key: key.clone(),
            })
            .map_err(|reason| (path.clone(), reason));

        if let Err((path, reason)) = &result {
            logger.error(format!("Failed to create destination {}: {reason}", path.display()));
        }

        let outcome = Self::to_result(&result);
        self.cache.insert(key.clone(), result);
        outcome
    }

    /// Directory for an image type inside a resolved destination.
    ///
    /// The OTHER subfolder is created on demand.
    ///
    /// # Errors
    /// Returns `OrganizeError::DestinationCreate` if the subfolder could not be created.
    pub fn subfolder(
        &mut self,
        destination: &Destination,
        image_type: ImageType,
        logger: &mut RunLogger,
    ) -> Result<PathBuf, OrganizeError> {
        let dir = destination.dir_for(image_type, self.nested_subfolders);
        if self.resolved_dirs.contains(&dir) {
            return Ok(dir);
        }

        self.ensure_dirs(&dir, std::slice::from_ref(&dir), logger)
            .map_err(|reason| OrganizeError::DestinationCreate {
                path: dir.clone(),
                reason,
            })?;
        Ok(dir)
    }

    /// True if the directory was resolved in this run or contains a resolved directory.
    #[must_use]
    pub fn is_protected(&self, dir: &Path) -> bool {
        self.resolved_dirs.iter().any(|resolved| resolved.starts_with(dir))
    }

    #[must_use]
    pub const fn resolved_dirs(&self) -> &BTreeSet<PathBuf> {
        &self.resolved_dirs
    }

    /// Number of distinct keys resolved so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Pick the folder path for a new key.
    /// Distinct keys whose names collapse to the same text get a numbered folder.
    fn claim_folder(&mut self, key: &GroupKey, root: &Path) -> PathBuf {
        let name = build_folder_name(key);
        let mut path = root.join(&name);
        let mut number = 2;
        while self.folder_owners.get(&path).is_some_and(|owner| owner != key) {
            path = root.join(format!("{name}_{number}"));
            number += 1;
        }
        self.folder_owners.insert(path.clone(), key.clone());
        path
    }

    fn ensure_dirs(&mut self, path: &Path, dirs: &[PathBuf], logger: &mut RunLogger) -> Result<(), String> {
        let missing: Vec<&PathBuf> = dirs.iter().filter(|dir| !dir.is_dir()).collect();
        if !missing.is_empty() {
            if !self.dryrun {
                for dir in &missing {
                    fs::create_dir_all(dir).map_err(|error| error.to_string())?;
                }
            }
            logger.create(format!("Create {}", path.display()));
        }
        self.resolved_dirs.extend(dirs.iter().cloned());
        Ok(())
    }

    fn to_result(cached: &Result<Destination, (PathBuf, String)>) -> Result<Destination, OrganizeError> {
        cached
            .clone()
            .map_err(|(path, reason)| OrganizeError::DestinationCreate { path, reason })
    }
}

#[cfg(test)]
mod destination_tests {
    use super::*;

    use tempfile::tempdir;

    use crate::organize::context::OrganizeOptions;
    use crate::organize::logger::LogLevel;
    use crate::organize::metadata::MetadataRecord;
    use crate::organize::naming::build_key;

    fn light_key(object: &str) -> GroupKey {
        let record = MetadataRecord::new()
            .with("OBJECT", object)
            .with("TELESCOP", "ASA10")
            .with("DATE-LOC", "2025-06-14T23:10:00")
            .with("IMAGETYP", "LIGHT");
        build_key(&record, &OrganizeOptions::default()).1
    }

    fn dark_key() -> GroupKey {
        let record = MetadataRecord::new()
            .with("TELESCOP", "ASA10")
            .with("DATE-LOC", "2025-06-14T23:10:00")
            .with("IMAGETYP", "DARK");
        build_key(&record, &OrganizeOptions::default()).1
    }

    #[test]
    fn creates_destination_with_subfolders() {
        let dir = tempdir().unwrap();
        let mut logger = RunLogger::in_memory(false);
        let mut resolver = DestinationResolver::new(true, false);

        let destination = resolver.resolve(&light_key("M 51"), dir.path(), &mut logger).unwrap();
        assert!(destination.path.is_dir());
        for image_type in ImageType::CANONICAL {
            assert!(destination.path.join(image_type.as_str()).is_dir());
        }
        assert!(!destination.path.join("OTHER").exists());
        assert_eq!(logger.entries_of(LogLevel::Create).count(), 1);
    }

    #[test]
    fn equal_keys_resolve_once() {
        let dir = tempdir().unwrap();
        let mut logger = RunLogger::in_memory(false);
        let mut resolver = DestinationResolver::new(true, false);

        let first = resolver.resolve(&light_key("M 51"), dir.path(), &mut logger).unwrap();
        let second = resolver.resolve(&light_key("M 51"), dir.path(), &mut logger).unwrap();
        assert_eq!(first, second);
        assert_eq!(resolver.len(), 1);
        assert_eq!(logger.entries_of(LogLevel::Create).count(), 1);
    }

    #[test]
    fn existing_destination_is_reused_without_logging() {
        let dir = tempdir().unwrap();
        let mut resolver = DestinationResolver::new(false, false);
        let key = light_key("M 51");
        fs::create_dir_all(dir.path().join(build_folder_name(&key))).unwrap();

        let mut logger = RunLogger::in_memory(false);
        resolver.resolve(&key, dir.path(), &mut logger).unwrap();
        assert_eq!(logger.entries_of(LogLevel::Create).count(), 0);
    }

    #[test]
    fn dryrun_creates_nothing() {
        let dir = tempdir().unwrap();
        let mut logger = RunLogger::in_memory(true);
        let mut resolver = DestinationResolver::new(true, true);

        let destination = resolver.resolve(&light_key("M 51"), dir.path(), &mut logger).unwrap();
        resolver.resolve(&light_key("M 51"), dir.path(), &mut logger).unwrap();
        assert!(!destination.path.exists());
        assert_eq!(logger.entries_of(LogLevel::Create).count(), 1);
        assert!(logger.entries()[0].message.starts_with("[DRY-RUN]"));
    }

    #[test]
    fn creation_failure_is_cached() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("not-a-dir");
        fs::write(&root, b"file").unwrap();

        let mut logger = RunLogger::in_memory(false);
        let mut resolver = DestinationResolver::new(true, false);
        let key = light_key("M 51");

        let first = resolver.resolve(&key, &root, &mut logger);
        let second = resolver.resolve(&key, &root, &mut logger);
        assert!(matches!(first, Err(OrganizeError::DestinationCreate { .. })));
        assert!(matches!(second, Err(OrganizeError::DestinationCreate { .. })));
        assert_eq!(logger.entries_of(LogLevel::Error).count(), 1);
    }

    #[test]
    fn flat_destination_has_no_subfolders() {
        let dir = tempdir().unwrap();
        let mut logger = RunLogger::in_memory(false);
        let mut resolver = DestinationResolver::new(false, false);

        let destination = resolver.resolve(&light_key("M 51"), dir.path(), &mut logger).unwrap();
        assert!(!destination.path.join("LIGHT").exists());
        let target = resolver.subfolder(&destination, ImageType::Light, &mut logger).unwrap();
        assert_eq!(target, destination.path);
    }

    #[test]
    fn other_subfolder_created_on_demand() {
        let dir = tempdir().unwrap();
        let mut logger = RunLogger::in_memory(false);
        let mut resolver = DestinationResolver::new(true, false);

        let destination = resolver.resolve(&light_key("M 51"), dir.path(), &mut logger).unwrap();
        let other = resolver.subfolder(&destination, ImageType::Other, &mut logger).unwrap();
        assert_eq!(other, destination.path.join("OTHER"));
        assert!(other.is_dir());
    }

    #[test]
    fn distinct_keys_never_share_a_folder() {
        let dir = tempdir().unwrap();
        let mut logger = RunLogger::in_memory(false);
        let mut resolver = DestinationResolver::new(true, false);

        // A light frame of an object literally named DARK renders like a dark frame key
        let light = light_key("DARK");
        let dark = dark_key();
        assert_ne!(light, dark);
        assert_eq!(build_folder_name(&light), build_folder_name(&dark));

        let first = resolver.resolve(&light, dir.path(), &mut logger).unwrap();
        let second = resolver.resolve(&dark, dir.path(), &mut logger).unwrap();
        assert_ne!(first.path, second.path);
    }

    #[test]
    fn resolved_dirs_and_ancestors_are_protected() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("organized");
        let mut logger = RunLogger::in_memory(false);
        let mut resolver = DestinationResolver::new(true, false);

        let destination = resolver.resolve(&light_key("M 51"), &root, &mut logger).unwrap();
        assert!(resolver.is_protected(&destination.path));
        assert!(resolver.is_protected(&destination.path.join("DARK")));
        assert!(resolver.is_protected(&root));
        assert!(!resolver.is_protected(&dir.path().join("session")));
    }

    #[test]
    fn creation_failure_reports_numbered_folder() {
        let dir = tempdir().unwrap();
        let mut logger = RunLogger::in_memory(false);
        let mut resolver = DestinationResolver::new(false, false);

        let light = light_key("DARK");
        let dark = dark_key();
        let name = build_folder_name(&dark);
        resolver.resolve(&light, dir.path(), &mut logger).unwrap();
        fs::write(dir.path().join(format!("{name}_2")), b"file").unwrap();

        for _ in 0..2 {
            let error = resolver.resolve(&dark, dir.path(), &mut logger).unwrap_err();
            assert_eq!(error.path(), Some(dir.path().join(format!("{name}_2")).as_path()));
        }
    }
}
