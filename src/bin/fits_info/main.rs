use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{CommandFactory, Parser};
use clap_complete::Shell;
use colored::Colorize;
use itertools::Itertools;
use serde::Serialize;
use walkdir::WalkDir;

use fits_organizer::fits::read_header;
use fits_organizer::organize::naming::file_name_from_sanitized;
use fits_organizer::organize::{
    Attribute, CalibrationGrouping, FITS_EXTENSION, GroupKey, ImageType, MetadataRecord, MetadataValue,
    OrganizeOptions, SanitizedRecord, build_folder_name, sequence_for_record,
};
use fits_organizer::{has_extension, is_hidden, path_to_filename_string, print_error, print_warning};

/// Sensor temperature above which cooling is likely insufficient.
const SENSOR_TEMP_WARNING: f64 = -10.0;

/// Airmass above which atmospheric distortion is likely.
const AIRMASS_WARNING: f64 = 2.0;

#[derive(Parser)]
#[command(
    author,
    version,
    name = env!("CARGO_BIN_NAME"),
    about = "Show FITS header summary and the names the organizer would use"
)]
struct Args {
    /// Input FITS files or directories
    #[arg(value_hint = clap::ValueHint::AnyPath)]
    paths: Vec<PathBuf>,

    /// Print all header cards
    #[arg(short, long)]
    all: bool,

    /// Group calibration frames by image type and date only
    #[arg(short, long)]
    date_only: bool,

    /// Print output as JSON
    #[arg(short, long)]
    json: bool,

    /// Keep the object name for calibration frames
    #[arg(short, long)]
    keep_object: bool,

    /// Recurse into subdirectories
    #[arg(short, long)]
    recurse: bool,

    /// Generate shell completion
    #[arg(short = 'l', long, name = "SHELL")]
    completion: Option<Shell>,
}

/// Header summary and derived names of one file.
#[derive(Debug, Serialize)]
struct FileInfo {
    path: PathBuf,
    image_type: ImageType,
    folder: String,
    file_name: String,
    unknown_fields: usize,
    header: MetadataRecord,
}

impl FileInfo {
    fn new(path: PathBuf, header: MetadataRecord, options: &OrganizeOptions) -> Self {
        let sanitized = SanitizedRecord::new(&header);
        let image_type = ImageType::from_record(&header);
        let key = GroupKey::from_sanitized(&sanitized, image_type, options);
        let sequence = sequence_for_record(&path, &sanitized, image_type, options);
        Self {
            folder: build_folder_name(&key),
            file_name: file_name_from_sanitized(&sanitized, image_type, sequence.as_deref(), options),
            unknown_fields: sanitized.unknown_count(),
            image_type,
            path,
            header,
        }
    }

    fn print(&self, all: bool) {
        let header = &self.header;
        let value_of = |attribute: Attribute| display_value(header.attribute(attribute));
        let field = |key: &str| display_value(header.get(key));

        println!("{}", "=".repeat(60));
        println!("{}", path_to_filename_string(&self.path).bold());
        println!(
            "{} ({})",
            value_of(Attribute::Object).cyan().bold(),
            value_of(Attribute::Telescope)
        );
        println!("{}", "=".repeat(60));
        println!("Image type:   {}", value_of(Attribute::ImageType));
        println!("Date:         {}", value_of(Attribute::Date));
        println!(
            "Camera:       {} (gain: {}, sensor: {} °C)",
            value_of(Attribute::Camera),
            value_of(Attribute::Gain),
            value_of(Attribute::Temperature)
        );
        println!(
            "Exposure:     {} s | focal length: {} mm | f/{}",
            value_of(Attribute::Exposure),
            value_of(Attribute::FocalLength),
            field("FOCRATIO")
        );
        println!(
            "Pixel size:   {} x {} µm | bayer pattern: {}",
            field("XPIXSZ"),
            field("YPIXSZ"),
            field("BAYERPAT")
        );
        println!("Filter:       {}", value_of(Attribute::Filter));
        println!("RA / DEC:     {} / {}", format_degrees(header.get("RA")), format_degrees(header.get("DEC")));
        println!("Airmass:      {}", format_airmass(header.get("AIRMASS")));

        println!("Folder:       {}", self.folder.green());
        println!("File name:    {}", self.file_name.green());
        if self.unknown_fields > 0 {
            println!("Unknown:      {} critical fields", self.unknown_fields);
        }

        if let Some(temperature) = header.attribute(Attribute::Temperature).and_then(MetadataValue::as_f64)
            && temperature > SENSOR_TEMP_WARNING
        {
            print_warning!("Sensor temperature {temperature} °C is above {SENSOR_TEMP_WARNING} °C");
        }
        if let Some(airmass) = header.get("AIRMASS").and_then(MetadataValue::as_f64)
            && airmass > AIRMASS_WARNING
        {
            print_warning!("High airmass {airmass:.2}, atmospheric distortion likely");
        }

        if all {
            println!("{}", "Header:".bold());
            for (key, value) in header.iter() {
                println!("  {key:<8} = {value}");
            }
        }
    }
}

fn display_value(value: Option<&MetadataValue>) -> String {
    value.map_or_else(|| "-".to_string(), ToString::to_string)
}

fn format_degrees(value: Option<&MetadataValue>) -> String {
    value
        .and_then(MetadataValue::as_f64)
        .map_or_else(|| display_value(value), |degrees| format!("{degrees:.4}°"))
}

fn format_airmass(value: Option<&MetadataValue>) -> String {
    value.and_then(MetadataValue::as_f64).map_or_else(
        || display_value(value),
        |airmass| format!("{airmass:.2} ({})", if airmass < 1.5 { "good" } else { "moderate" }),
    )
}

/// FITS files from the given paths without duplicates.
fn collect_files(paths: &[PathBuf], recurse: bool) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_file() {
            files.push(path.clone());
            continue;
        }
        if !path.is_dir() {
            anyhow::bail!("Input path does not exist: '{}'", path.display());
        }
        let max_depth = if recurse { usize::MAX } else { 1 };
        files.extend(
            WalkDir::new(path)
                .min_depth(1)
                .max_depth(max_depth)
                .sort_by_file_name()
                .into_iter()
                .filter_entry(|e| e.depth() == 0 || !is_hidden(e))
                .filter_map(Result::ok)
                .filter(|entry| entry.file_type().is_file() && has_extension(entry.path(), FITS_EXTENSION))
                .map(walkdir::DirEntry::into_path),
        );
    }
    Ok(files.into_iter().unique().collect())
}

fn read_file_info(path: &Path, options: &OrganizeOptions) -> Option<FileInfo> {
    match read_header(path) {
        Ok(header) => Some(FileInfo::new(path.to_path_buf(), header, options)),
        Err(error) => {
            print_error!("{error}");
            None
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    if let Some(ref shell) = args.completion {
        return fits_organizer::generate_shell_completion(*shell, Args::command(), true, env!("CARGO_BIN_NAME"));
    }

    let paths = if args.paths.is_empty() {
        vec![std::env::current_dir().context("Failed to get current working directory")?]
    } else {
        args.paths.clone()
    };

    let options = OrganizeOptions {
        group_calibration_without_object: !args.keep_object,
        calibration_grouping: if args.date_only {
            CalibrationGrouping::Date
        } else {
            CalibrationGrouping::Signature
        },
        ..OrganizeOptions::default()
    };

    let files = collect_files(&paths, args.recurse)?;
    if files.is_empty() {
        print_warning!("No FITS files found");
        return Ok(());
    }

    let infos: Vec<FileInfo> = files.iter().filter_map(|path| read_file_info(path, &options)).collect();

    if args.json {
        let json = serde_json::to_string_pretty(&infos).context("Failed to serialize header info")?;
        println!("{json}");
    } else {
        for info in &infos {
            info.print(args.all);
        }
    }
    Ok(())
}
