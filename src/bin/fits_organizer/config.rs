use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use serde::Deserialize;

use fits_organizer::organize::{CalibrationGrouping, DEFAULT_UNKNOWN_THRESHOLD, Layout, OrganizeOptions};

use crate::Args;

/// Final config created from CLI arguments and user config file.
#[derive(Debug)]
pub struct Config {
    pub(crate) debug: bool,
    pub(crate) json: bool,
    pub(crate) log_dir: Option<PathBuf>,
    pub(crate) log_file: bool,
    pub(crate) options: OrganizeOptions,
    pub(crate) verbose: bool,
}

/// Config from the user config file
#[derive(Debug, Deserialize)]
struct OrganizerConfig {
    #[serde(default)]
    date_only: bool,
    #[serde(default)]
    debug: bool,
    #[serde(default)]
    dryrun: bool,
    #[serde(default)]
    flat: bool,
    #[serde(default)]
    keep_object: bool,
    #[serde(default)]
    log_dir: Option<PathBuf>,
    #[serde(default = "default_true")]
    log_file: bool,
    #[serde(default)]
    no_threshold: bool,
    #[serde(default)]
    output: Option<PathBuf>,
    #[serde(default)]
    recurse: bool,
    #[serde(default)]
    unknown_threshold: Option<usize>,
    #[serde(default)]
    verbose: bool,
}

/// Wrapper needed for parsing the config file section.
#[derive(Debug, Default, Deserialize)]
struct UserConfig {
    #[serde(default)]
    fitsorg: OrganizerConfig,
}

const fn default_true() -> bool {
    true
}

impl Default for OrganizerConfig {
    fn default() -> Self {
        Self {
            date_only: false,
            debug: false,
            dryrun: false,
            flat: false,
            keep_object: false,
            log_dir: None,
            log_file: true,
            no_threshold: false,
            output: None,
            recurse: false,
            unknown_threshold: None,
            verbose: false,
        }
    }
}

impl OrganizerConfig {
    /// Try to read user config from the file if it exists.
    /// Otherwise, fall back to default config.
    ///
    /// # Errors
    /// Returns an error if config file exists but cannot be read or parsed.
    fn get_user_config() -> anyhow::Result<Self> {
        let Some(path) = fits_organizer::config_path() else {
            return Ok(Self::default());
        };

        match fs::read_to_string(path) {
            Ok(content) => Self::from_toml_str(&content)
                .map_err(|e| anyhow::anyhow!("Failed to parse config file {}:\n{e}", path.display())),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(error) => Err(anyhow::anyhow!(
                "Failed to read config file {}: {error}",
                path.display()
            )),
        }
    }

    /// Parse config from a TOML string.
    ///
    /// # Errors
    /// Returns an error if the TOML string is invalid.
    fn from_toml_str(toml_str: &str) -> anyhow::Result<Self> {
        toml::from_str::<UserConfig>(toml_str)
            .map(|config| config.fitsorg)
            .context("Failed to parse fitsorg config TOML")
    }
}

impl Config {
    /// Create config from given command line args and user config file.
    ///
    /// # Errors
    /// Returns an error if the config file cannot be read or parsed.
    pub fn from_args(args: Args) -> anyhow::Result<Self> {
        let user_config = OrganizerConfig::get_user_config()?;
        Ok(Self::from_parts(args, user_config))
    }

    /// Combine CLI arguments with the user config.
    /// Flags are combined, explicit CLI values win over config values.
    fn from_parts(args: Args, user_config: OrganizerConfig) -> Self {
        let unknown_field_threshold = if args.all || user_config.no_threshold {
            None
        } else {
            Some(
                args.threshold
                    .or(user_config.unknown_threshold)
                    .unwrap_or(DEFAULT_UNKNOWN_THRESHOLD),
            )
        };

        let calibration_grouping = if args.date_only || user_config.date_only {
            CalibrationGrouping::Date
        } else {
            CalibrationGrouping::Signature
        };

        let layout = if args.recurse || user_config.recurse {
            Layout::Recursive
        } else {
            Layout::Sessions
        };

        let options = OrganizeOptions {
            group_calibration_without_object: !(args.keep_object || user_config.keep_object),
            calibration_grouping,
            nested_subfolders: !(args.flat || user_config.flat),
            unknown_field_threshold,
            dryrun: args.print || user_config.dryrun,
            layout,
            output: args.output.or(user_config.output),
        };

        Self {
            debug: args.debug || user_config.debug,
            json: args.json,
            log_dir: user_config.log_dir,
            log_file: !args.no_log && user_config.log_file,
            options,
            verbose: args.verbose || user_config.verbose,
        }
    }
}
