use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use colored::Colorize;

/// Kind of decision recorded by the run logger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Create,
    Move,
    Delete,
    Skip,
    Warning,
    Error,
}

/// One timestamped log line.
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub timestamp: DateTime<Local>,
    pub level: LogLevel,
    pub message: String,
}

/// Records every decision of a run.
///
/// Entries are kept in memory, optionally echoed to the console
/// and appended to a log file with buffered writes.
pub struct RunLogger {
    entries: Vec<LogEntry>,
    writer: Option<BufWriter<File>>,
    log_path: Option<PathBuf>,
    console: bool,
    verbose: bool,
    debug: bool,
    dryrun: bool,
}

impl LogLevel {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Create => "CREATE",
            Self::Move => "MOVE",
            Self::Delete => "DELETE",
            Self::Skip => "SKIP",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Pad to the longest label so messages line up in the log file
        write!(f, "{:<7}", self.label())
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.level,
            self.message
        )
    }
}

impl RunLogger {
    /// Logger that only keeps entries in memory.
    #[must_use]
    pub const fn in_memory(dryrun: bool) -> Self {
        Self {
            entries: Vec::new(),
            writer: None,
            log_path: None,
            console: false,
            verbose: false,
            debug: false,
            dryrun,
        }
    }

    /// Logger that echoes to the console.
    #[must_use]
    pub const fn console(dryrun: bool, verbose: bool, debug: bool) -> Self {
        Self {
            entries: Vec::new(),
            writer: None,
            log_path: None,
            console: true,
            verbose,
            debug,
            dryrun,
        }
    }

    /// Also append all entries to `<log_dir>/fits_organizer_<timestamp>.log`.
    ///
    /// # Errors
    /// Returns an error if the log directory or file cannot be created.
    pub fn with_log_file(mut self, log_dir: &Path) -> io::Result<Self> {
        if !log_dir.exists() {
            fs::create_dir_all(log_dir)?;
        }

        let log_path = log_dir.join(format!(
            "fits_organizer_{}.log",
            Local::now().format("%Y-%m-%d_%H-%M-%S")
        ));

        let file = OpenOptions::new().create(true).append(true).open(&log_path)?;

        self.writer = Some(BufWriter::new(file));
        self.log_path = Some(log_path);
        Ok(self)
    }

    #[must_use]
    pub fn log_path(&self) -> Option<&Path> {
        self.log_path.as_deref()
    }

    #[must_use]
    pub const fn is_dryrun(&self) -> bool {
        self.dryrun
    }

    #[must_use]
    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// Entries of the given level.
    pub fn entries_of(&self, level: LogLevel) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter().filter(move |entry| entry.level == level)
    }

    pub fn debug(&mut self, message: impl Into<String>) {
        self.log(LogLevel::Debug, message);
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.log(LogLevel::Info, message);
    }

    pub fn create(&mut self, message: impl Into<String>) {
        self.log(LogLevel::Create, message);
    }

    pub fn moved(&mut self, message: impl Into<String>) {
        self.log(LogLevel::Move, message);
    }

    pub fn delete(&mut self, message: impl Into<String>) {
        self.log(LogLevel::Delete, message);
    }

    pub fn skip(&mut self, message: impl Into<String>) {
        self.log(LogLevel::Skip, message);
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.log(LogLevel::Warning, message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.log(LogLevel::Error, message);
    }

    /// Record a decision. Actions are marked when running in dry-run mode.
    pub fn log(&mut self, level: LogLevel, message: impl Into<String>) {
        let mut message = message.into();
        if self.dryrun && matches!(level, LogLevel::Create | LogLevel::Move | LogLevel::Delete) {
            message = format!("[DRY-RUN] {message}");
        }

        let entry = LogEntry {
            timestamp: Local::now(),
            level,
            message,
        };

        if let Some(writer) = self.writer.as_mut() {
            let _ = writeln!(writer, "{entry}");
            let _ = writer.flush();
        }

        if self.console {
            self.print_entry(&entry);
        }

        self.entries.push(entry);
    }

    fn print_entry(&self, entry: &LogEntry) {
        let dryrun_action = self.dryrun && matches!(entry.level, LogLevel::Create | LogLevel::Move | LogLevel::Delete);
        match entry.level {
            LogLevel::Debug if self.debug => println!("{}", entry.message.dimmed()),
            LogLevel::Info | LogLevel::Skip if self.verbose => println!("{}", entry.message),
            _ if dryrun_action => println!("{}", entry.message.cyan()),
            LogLevel::Create => println!("{}", entry.message.magenta()),
            LogLevel::Move => println!("{}", entry.message.green()),
            LogLevel::Delete => println!("{}", entry.message.blue()),
            LogLevel::Warning => eprintln!("{}", entry.message.yellow()),
            LogLevel::Error => eprintln!("{}", entry.message.red()),
            _ => {}
        }
    }
}

#[cfg(test)]
mod logger_tests {
    use super::*;

    use tempfile::tempdir;

    #[test]
    fn in_memory_logger_keeps_entries() {
        let mut logger = RunLogger::in_memory(false);
        logger.moved("a -> b");
        logger.error("broken");
        assert_eq!(logger.entries().len(), 2);
        assert_eq!(logger.entries()[0].level, LogLevel::Move);
        assert_eq!(logger.entries_of(LogLevel::Error).count(), 1);
        assert!(logger.log_path().is_none());
    }

    #[test]
    fn dryrun_actions_are_marked() {
        let mut logger = RunLogger::in_memory(true);
        logger.moved("a -> b");
        logger.warning("low quality");
        assert_eq!(logger.entries()[0].message, "[DRY-RUN] a -> b");
        assert_eq!(logger.entries()[1].message, "low quality");
    }

    #[test]
    fn entry_format_has_timestamp_and_level() {
        let mut logger = RunLogger::in_memory(false);
        logger.skip("same path");
        let line = logger.entries()[0].to_string();
        assert!(line.starts_with('['));
        assert!(line.contains("] SKIP    same path"));
    }

    #[test]
    fn log_file_receives_lines() {
        let dir = tempdir().unwrap();
        let log_dir = dir.path().join("logs");
        let mut logger = RunLogger::in_memory(false).with_log_file(&log_dir).unwrap();
        logger.create("M-51_ASA10");
        logger.delete("2025-06-14");

        let log_path = logger.log_path().unwrap().to_path_buf();
        let file_name = log_path.file_name().unwrap().to_string_lossy().to_string();
        assert!(file_name.starts_with("fits_organizer_"));
        assert!(file_name.ends_with(".log"));

        let content = fs::read_to_string(&log_path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("CREATE  M-51_ASA10"));
        assert!(lines[1].contains("DELETE  2025-06-14"));
    }
}
