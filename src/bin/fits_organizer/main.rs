mod config;
mod organizer;

use std::path::PathBuf;

use clap::{CommandFactory, Parser};
use clap_complete::Shell;

use crate::organizer::FitsOrganizer;

#[derive(Parser)]
#[command(
    author,
    version,
    name = env!("CARGO_BIN_NAME"),
    about = "Organize FITS exposures into folders based on their header metadata"
)]
pub(crate) struct Args {
    /// Optional root directory with imaging sessions
    #[arg(value_hint = clap::ValueHint::DirPath)]
    path: Option<PathBuf>,

    /// Destination root directory (defaults to the input directory)
    #[arg(short, long, value_hint = clap::ValueHint::DirPath)]
    output: Option<PathBuf>,

    /// Organize all files regardless of missing metadata
    #[arg(short, long, conflicts_with = "threshold")]
    all: bool,

    /// Group calibration frames by image type and date only
    #[arg(short, long)]
    date_only: bool,

    /// Print debug information
    #[arg(short = 'D', long)]
    debug: bool,

    /// Do not create image type subfolders in destinations
    #[arg(short, long)]
    flat: bool,

    /// Print the run report as JSON
    #[arg(short, long)]
    json: bool,

    /// Keep the object name for calibration frames
    #[arg(short, long)]
    keep_object: bool,

    /// Do not write a log file
    #[arg(short, long)]
    no_log: bool,

    /// Only print changes without moving files
    #[arg(short, long)]
    print: bool,

    /// Recurse into all subdirectories instead of session folders
    #[arg(short, long)]
    recurse: bool,

    /// Skip files with more unknown critical header fields than this
    #[arg(short, long, value_name = "COUNT")]
    threshold: Option<usize>,

    /// Generate shell completion
    #[arg(short = 'l', long, name = "SHELL")]
    completion: Option<Shell>,

    /// Print verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    if let Some(ref shell) = args.completion {
        fits_organizer::generate_shell_completion(*shell, Args::command(), true, env!("CARGO_BIN_NAME"))
    } else {
        FitsOrganizer::new(args)?.run()
    }
}
