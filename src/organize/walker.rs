use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::organize::cleaner::EmptyDirCleaner;
use crate::organize::context::{Layout, RunContext};
use crate::organize::error::OrganizeError;
use crate::organize::metadata::MetadataReader;
use crate::organize::mover::MoveOutcome;
use crate::organize::naming::{FITS_EXTENSION, GroupKey, ImageType, file_name_from_sanitized, sequence_for_record};
use crate::organize::report::Report;
use crate::organize::sanitize::SanitizedRecord;
use crate::{get_relative_path_or_filename, has_extension, is_hidden};

/// Folder scanned in each session after the canonical image type folders.
const OTHER_FOLDER: &str = "OTHER";

/// One file to organize.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTask {
    pub path: PathBuf,
    /// Image type implied by the session subfolder the file was found in.
    pub folder_type: Option<ImageType>,
}

/// Enumerates candidate files under a root and organizes them one by one.
pub struct TreeWalker<R: MetadataReader> {
    reader: R,
    context: RunContext,
}

impl<R: MetadataReader> TreeWalker<R> {
    pub const fn new(reader: R, context: RunContext) -> Self {
        Self { reader, context }
    }

    #[must_use]
    pub const fn context(&self) -> &RunContext {
        &self.context
    }

    #[must_use]
    pub fn into_context(self) -> RunContext {
        self.context
    }

    /// Organize all files below `root` and prune directories left empty.
    ///
    /// # Errors
    /// Returns `OrganizeError::InvalidRoot` if the root is not an existing directory.
    /// Every other failure is recorded in the report.
    pub fn run(&mut self, root: &Path) -> Result<Report, OrganizeError> {
        if !root.is_dir() {
            return Err(OrganizeError::InvalidRoot(root.to_path_buf()));
        }
        let root = dunce::canonicalize(root).map_err(|_| OrganizeError::InvalidRoot(root.to_path_buf()))?;
        let destination_root = self
            .context
            .options
            .output
            .as_ref()
            .map_or_else(|| root.clone(), |output| dunce::canonicalize(output).unwrap_or_else(|_| output.clone()));

        let mut report = Report::new(self.context.options.dryrun);
        self.context.logger.info(format!("Organizing {}", root.display()));
        if destination_root != root {
            self.context
                .logger
                .info(format!("Destination {}", destination_root.display()));
        }

        match self.context.options.layout {
            Layout::Sessions => {
                let sessions = self.collect_sessions(&root);
                let tasks: Vec<FileTask> = sessions.iter().flat_map(|session| Self::session_files(session)).collect();
                self.context.logger.info(format!(
                    "Found {} files in {} sessions",
                    tasks.len(),
                    sessions.len()
                ));
                self.process_all(&tasks, &root, &destination_root, &mut report);
                self.cleanup(&sessions, true, &mut report);
            }
            Layout::Recursive => {
                let tasks = Self::collect_recursive(&root);
                self.context.logger.info(format!("Found {} files", tasks.len()));
                self.process_all(&tasks, &root, &destination_root, &mut report);
                self.cleanup(std::slice::from_ref(&root), false, &mut report);
            }
        }

        Ok(report)
    }

    fn process_all(&mut self, tasks: &[FileTask], root: &Path, destination_root: &Path, report: &mut Report) {
        for task in tasks {
            self.process_file(task, root, destination_root, report);
        }
    }

    /// Read, name and move a single file. Never fails the whole run.
    fn process_file(&mut self, task: &FileTask, root: &Path, destination_root: &Path, report: &mut Report) {
        let context = &mut self.context;
        let display_path = get_relative_path_or_filename(&task.path, root);

        let record = match self.reader.read(&task.path) {
            Ok(record) => record,
            Err(error) => {
                context.logger.error(error.to_string());
                report.read_errors += 1;
                report.add_failure(&task.path, error.to_string());
                return;
            }
        };

        let sanitized = SanitizedRecord::new(&record);
        let unknown = sanitized.unknown_count();
        if let Some(threshold) = context.options.unknown_field_threshold
            && unknown > threshold
        {
            let error = OrganizeError::LowQualityMetadata { unknown, threshold };
            context.logger.warning(format!("Skip {display_path}: {error}"));
            report.skipped_low_quality += 1;
            return;
        }

        let image_type = match (ImageType::from_record(&record), task.folder_type) {
            (ImageType::Other, Some(folder_type)) => folder_type,
            (image_type, _) => image_type,
        };
        let key = GroupKey::from_sanitized(&sanitized, image_type, &context.options);
        context.logger.debug(format!("{display_path}: {image_type} {key}"));

        let target_dir = match context
            .resolver
            .resolve(&key, destination_root, &mut context.logger)
            .and_then(|destination| context.resolver.subfolder(&destination, image_type, &mut context.logger))
        {
            Ok(dir) => dir,
            Err(error) => {
                context.logger.error(format!("Failed {display_path}: {error}"));
                report.failed += 1;
                report.add_failure(&task.path, error.to_string());
                return;
            }
        };

        let sequence = sequence_for_record(&task.path, &sanitized, image_type, &context.options);
        let file_name = file_name_from_sanitized(&sanitized, image_type, sequence.as_deref(), &context.options);
        let outcome = context.mover.move_file(&task.path, &target_dir, &file_name);

        match &outcome {
            MoveOutcome::Moved(target) => {
                let target = get_relative_path_or_filename(target, destination_root);
                context.logger.moved(format!("{display_path} -> {target}"));
            }
            MoveOutcome::MovedWithSuffix(target, number) => {
                let target = get_relative_path_or_filename(target, destination_root);
                context
                    .logger
                    .moved(format!("{display_path} -> {target} (name taken, suffix {number})"));
            }
            MoveOutcome::SkippedIdentical => {
                context.logger.skip(format!("{display_path}: already in place"));
            }
            MoveOutcome::Failed(error) => {
                context.logger.error(format!("Failed {display_path}: {error}"));
            }
        }

        if !matches!(outcome, MoveOutcome::Failed(_)) {
            report.add_destination(&task.path, &target_dir);
        }
        report.add_outcome(&task.path, &outcome);
    }

    fn cleanup(&mut self, dirs: &[PathBuf], remove_root: bool, report: &mut Report) {
        let context = &mut self.context;
        let mut cleaner = EmptyDirCleaner::new(
            &context.resolver,
            &context.mover,
            &mut context.logger,
            context.options.dryrun,
        );
        for dir in dirs {
            let summary = cleaner.cleanup(dir, remove_root);
            report.dirs_deleted += summary.deleted.len();
            report.cleanup_errors += summary.errors.len();
            for error in summary.errors {
                report.add_failure(error.path().unwrap_or(dir), error.to_string());
            }
        }
    }

    /// Non-hidden directories directly under the root, sorted by name.
    fn collect_sessions(&mut self, root: &Path) -> Vec<PathBuf> {
        let mut sessions = Vec::new();
        for entry in WalkDir::new(root)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden(e))
        {
            match entry {
                Ok(entry) if entry.file_type().is_dir() => sessions.push(entry.into_path()),
                Ok(_) => {}
                Err(error) => self.context.logger.warning(format!("Skip unreadable entry: {error}")),
            }
        }
        sessions
    }

    /// Files of one session in image type order.
    fn session_files(session: &Path) -> Vec<FileTask> {
        ImageType::CANONICAL
            .iter()
            .map(|image_type| (image_type.as_str(), Some(*image_type)))
            .chain(std::iter::once((OTHER_FOLDER, None)))
            .flat_map(|(folder, folder_type)| {
                fits_files(&session.join(folder), Some(1))
                    .into_iter()
                    .map(move |path| FileTask { path, folder_type })
            })
            .collect()
    }

    /// Every FITS file below the root.
    fn collect_recursive(root: &Path) -> Vec<FileTask> {
        fits_files(root, None)
            .into_iter()
            .map(|path| FileTask {
                path,
                folder_type: None,
            })
            .collect()
    }
}

/// Sorted non-hidden FITS files in a directory, optionally limited in depth.
fn fits_files(dir: &Path, max_depth: Option<usize>) -> Vec<PathBuf> {
    if !dir.is_dir() {
        return Vec::new();
    }
    let mut walker = WalkDir::new(dir).min_depth(1).sort_by_file_name();
    if let Some(depth) = max_depth {
        walker = walker.max_depth(depth);
    }
    walker
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e))
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file() && has_extension(entry.path(), FITS_EXTENSION))
        .map(walkdir::DirEntry::into_path)
        .collect()
}
