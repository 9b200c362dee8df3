use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;

use fits_organizer::fits::FitsHeaderReader;
use fits_organizer::organize::{RunContext, RunLogger, TreeWalker};
use fits_organizer::{format_duration, print_bold, print_warning};

use crate::Args;
use crate::config::Config;

#[derive(Debug)]
pub struct FitsOrganizer {
    root: PathBuf,
    config: Config,
}

impl FitsOrganizer {
    pub fn new(args: Args) -> anyhow::Result<Self> {
        let root = fits_organizer::resolve_input_dir(args.path.as_deref())?;
        let mut config = Config::from_args(args)?;
        let output = fits_organizer::resolve_output_dir(config.options.output.as_deref(), &root)?;
        config.options.output = Some(output);
        if config.debug {
            eprintln!("Config: {config:#?}");
            eprintln!("Root: {}", root.display());
        }
        Ok(Self { root, config })
    }

    pub fn run(self) -> anyhow::Result<()> {
        let start = Instant::now();
        let logger = self.create_logger()?;
        let log_path = logger.log_path().map(PathBuf::from);
        let dryrun = self.config.options.dryrun;

        if dryrun && !self.config.json {
            print_bold!("Dry-run: no files will be moved");
        }

        let context = RunContext::new(self.config.options, logger);
        let mut walker = TreeWalker::new(FitsHeaderReader, context);
        let report = walker
            .run(&self.root)
            .with_context(|| format!("Failed to organize {}", self.root.display()))?;

        if self.config.json {
            let json = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
            println!("{json}");
            return Ok(());
        }

        report.print_summary();
        println!("Total time:             {}", format_duration(start.elapsed()));
        if let Some(path) = log_path {
            println!("Log file:               {}", path.display());
        }
        if report.has_errors() {
            print_warning!("Some files could not be organized, see the failures above");
        }
        Ok(())
    }

    /// Console logger, with a log file unless disabled.
    fn create_logger(&self) -> anyhow::Result<RunLogger> {
        // JSON output goes to stdout, so keep the console quiet
        let logger = if self.config.json {
            RunLogger::in_memory(self.config.options.dryrun)
        } else {
            RunLogger::console(self.config.options.dryrun, self.config.verbose, self.config.debug)
        };

        if !self.config.log_file {
            return Ok(logger);
        }

        let log_dir = self
            .config
            .log_dir
            .clone()
            .or_else(|| fits_organizer::config::default_log_dir().map(PathBuf::from))
            .context("Failed to determine log directory")?;

        logger
            .with_log_file(&log_dir)
            .with_context(|| format!("Failed to create log file in {}", log_dir.display()))
    }
}
