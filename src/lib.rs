pub mod config;
pub mod fits;
pub mod organize;

use std::env;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Command;
use clap_complete::Shell;
use colored::Colorize;
use unicode_normalization::UnicodeNormalization;

pub use config::config_path;

/// Check if entry is a hidden file or directory (starts with '.')
#[must_use]
pub fn is_hidden(entry: &walkdir::DirEntry) -> bool {
    let name_bytes = entry.file_name().as_encoded_bytes();
    !name_bytes.is_empty() && name_bytes[0] == b'.'
}

/// Check if the path has the given extension, ignoring case.
#[must_use]
pub fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
}

/// Insert a suffix before the file extension.
///
/// Takes a path and inserts the given suffix string between the file stem and the file extension.
/// If the file has no extension, the suffix is appended to the end.
///
/// ```rust
/// use std::path::Path;
/// use fits_organizer::insert_suffix_before_extension;
///
/// let path = Path::new("LIGHT_2025-06-14_e180_M-51_0007.fits");
/// let result = insert_suffix_before_extension(path, "_1");
/// assert_eq!(result.to_str().unwrap(), "LIGHT_2025-06-14_e180_M-51_0007_1.fits");
///
/// let path = Path::new("session/DARK/frame.fits");
/// let result = insert_suffix_before_extension(path, "_2");
/// assert_eq!(result, Path::new("session/DARK/frame_2.fits"));
///
/// let path = Path::new("README");
/// let result = insert_suffix_before_extension(path, "_1");
/// assert_eq!(result.to_str().unwrap(), "README_1");
/// ```
#[must_use]
pub fn insert_suffix_before_extension(path: &Path, suffix: &str) -> PathBuf {
    let parent = path.parent().unwrap_or_else(|| Path::new(""));
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("");
    let extension = path.extension().and_then(|s| s.to_str()).unwrap_or("");

    let new_name = if extension.is_empty() {
        format!("{stem}{suffix}")
    } else {
        format!("{stem}{suffix}.{extension}")
    };

    if parent.as_os_str().is_empty() {
        PathBuf::from(new_name)
    } else {
        parent.join(new_name)
    }
}

/// Resolves the provided input directory to an absolute path.
///
/// If `path` is `None`, the current working directory is used.
/// Returns an error if the path does not exist or is not a directory,
/// since every other failure during a run is handled per file.
/// ```rust
/// use std::path::Path;
/// use fits_organizer::resolve_input_dir;
///
/// let absolute_path = resolve_input_dir(Some(Path::new("src"))).unwrap();
/// assert!(absolute_path.is_absolute());
/// ```
pub fn resolve_input_dir(path: Option<&Path>) -> Result<PathBuf> {
    let input_path = path
        .map(|p| p.to_str().unwrap_or(""))
        .unwrap_or_default()
        .trim()
        .to_string();

    let dirpath = if input_path.is_empty() {
        env::current_dir().context("Failed to get current working directory")?
    } else {
        PathBuf::from(input_path)
    };
    if !dirpath.exists() {
        anyhow::bail!(
            "Input path does not exist or is not accessible: '{}'",
            dirpath.display()
        );
    }
    if !dirpath.is_dir() {
        anyhow::bail!("Input path is not a directory: '{}'", dirpath.display());
    }

    let absolute_input_path = dunce::canonicalize(&dirpath)?;

    // Canonicalize fails for network drives on Windows :(
    if path_to_string(&absolute_input_path).starts_with(r"\\?") && !path_to_string(&dirpath).starts_with(r"\\?") {
        Ok(dirpath)
    } else {
        Ok(absolute_input_path)
    }
}

/// Resolves the destination root for organized sessions.
///
/// If `path` is `None` or empty, the input directory itself is used.
/// A relative output path is resolved against the current working directory.
pub fn resolve_output_dir(path: Option<&Path>, absolute_input_path: &Path) -> Result<PathBuf> {
    let output = path.map(path_to_string).unwrap_or_default().trim().to_string();
    if output.is_empty() {
        return Ok(absolute_input_path.to_path_buf());
    }
    let output_path = PathBuf::from(output);
    if output_path.is_absolute() {
        Ok(dunce::simplified(&output_path).to_path_buf())
    } else {
        let current_dir = env::current_dir().context("Failed to get current working directory")?;
        Ok(dunce::simplified(&current_dir.join(output_path)).to_path_buf())
    }
}

/// Gets the relative path or filename from a full path based on a root directory.
///
/// If the full path is within the root directory, the function returns the relative path.
/// Otherwise, it returns just the filename. If the filename cannot be determined, the
/// full path is returned.
///
/// ```rust
/// use std::path::Path;
/// use fits_organizer::get_relative_path_or_filename;
///
/// let root = Path::new("/astro/nina");
/// let full_path = root.join("2025-06-14/LIGHT/light_0007.fits");
/// assert_eq!(get_relative_path_or_filename(&full_path, root), "2025-06-14/LIGHT/light_0007.fits");
///
/// let outside_path = Path::new("/other/flat_0001.fits");
/// assert_eq!(get_relative_path_or_filename(outside_path, root), "flat_0001.fits");
/// ```
#[must_use]
pub fn get_relative_path_or_filename(full_path: &Path, root: &Path) -> String {
    if full_path == root {
        return full_path.file_name().unwrap_or_default().to_string_lossy().to_string();
    }
    full_path.strip_prefix(root).map_or_else(
        |_| {
            full_path.file_name().map_or_else(
                || full_path.display().to_string(),
                |name| name.to_string_lossy().to_string(),
            )
        },
        |relative_path| relative_path.display().to_string(),
    )
}

/// Convert `OsStr` to String with invalid Unicode handling.
pub fn os_str_to_string(name: &OsStr) -> String {
    name.to_str().map_or_else(
        || name.to_string_lossy().replace('\u{FFFD}', ""),
        std::string::ToString::to_string,
    )
}

/// Convert given path to string with invalid Unicode handling.
pub fn path_to_string(path: &Path) -> String {
    path.to_str().map_or_else(
        || path.to_string_lossy().to_string().replace('\u{FFFD}', ""),
        std::string::ToString::to_string,
    )
}

/// Convert given path to filename string with invalid Unicode handling.
#[must_use]
pub fn path_to_filename_string(path: &Path) -> String {
    os_str_to_string(path.file_name().unwrap_or_default())
}

/// Convert given path to file stem string with special characters composed (NFC).
///
/// Rust uses Unicode NFD on some platforms, which converts characters like "å"
/// to "a\u{30a}". Composing keeps derived names identical between runs.
#[must_use]
pub fn path_to_file_stem_string(path: &Path) -> String {
    os_str_to_string(path.file_stem().unwrap_or_default())
        .nfc()
        .collect::<String>()
}

#[inline]
pub fn print_error(message: &str) {
    eprintln!("{}", format!("Error: {message}").red());
}

#[macro_export]
macro_rules! print_error {
    ($($arg:tt)*) => {
        $crate::print_error(&format!($($arg)*))
    };
}

#[inline]
pub fn print_warning(message: &str) {
    eprintln!("{}", message.yellow());
}

#[macro_export]
macro_rules! print_warning {
    ($($arg:tt)*) => {
        $crate::print_warning(&format!($($arg)*))
    };
}

#[inline]
pub fn print_bold(message: &str) {
    println!("{}", message.bold());
}

#[macro_export]
macro_rules! print_bold {
    ($($arg:tt)*) => {
        $crate::print_bold(&format!($($arg)*))
    };
}

/// Format duration as a human-readable string
#[must_use]
pub fn format_duration(duration: std::time::Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 3600 {
        format!("{}h {:02}m {:02}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    } else if secs >= 60 {
        format!("{}m {:02}s", secs / 60, secs % 60)
    } else {
        format!("{:.1}s", duration.as_secs_f64())
    }
}

/// Generate a shell completion script for the given shell.
pub fn generate_shell_completion(shell: Shell, mut command: Command, install: bool, command_name: &str) -> Result<()> {
    if install {
        let out_dir = get_shell_completion_dir(shell, command_name)?;
        let path = clap_complete::generate_to(shell, &mut command, command_name, out_dir)?;
        println!("Completion file generated to: {}", path.display());
    } else {
        clap_complete::generate(shell, &mut command, command_name, &mut std::io::stdout());
    }
    Ok(())
}

/// Determine the appropriate directory for storing shell completions.
///
/// First checks if the user-specific directory exists,
/// then checks for the global directory.
/// If neither exist, creates and uses the user-specific dir.
fn get_shell_completion_dir(shell: Shell, name: &str) -> Result<PathBuf> {
    let home = dirs::home_dir().context("Failed to get home directory")?;

    // Special handling for oh-my-zsh.
    // Create custom "plugin", which will then have to be loaded in .zshrc
    if shell == Shell::Zsh {
        let omz_plugins = home.join(".oh-my-zsh/custom/plugins");
        if omz_plugins.exists() {
            let plugin_dir = omz_plugins.join(name);
            std::fs::create_dir_all(&plugin_dir)?;
            return Ok(plugin_dir);
        }
    }

    let user_dir = match shell {
        Shell::PowerShell => {
            if cfg!(windows) {
                home.join(r"Documents\PowerShell\completions")
            } else {
                home.join(".config/powershell/completions")
            }
        }
        Shell::Bash => home.join(".bash_completion.d"),
        Shell::Elvish => home.join(".elvish"),
        Shell::Fish => home.join(".config/fish/completions"),
        Shell::Zsh => home.join(".zsh/completions"),
        _ => anyhow::bail!("Unsupported shell"),
    };

    if user_dir.exists() {
        return Ok(user_dir);
    }

    let global_dir = match shell {
        Shell::PowerShell => user_dir.clone(),
        Shell::Bash => PathBuf::from("/etc/bash_completion.d"),
        Shell::Fish => PathBuf::from("/usr/share/fish/completions"),
        Shell::Zsh => PathBuf::from("/usr/share/zsh/site-functions"),
        _ => anyhow::bail!("Unsupported shell"),
    };

    if global_dir.exists() {
        return Ok(global_dir);
    }

    std::fs::create_dir_all(&user_dir)?;
    Ok(user_dir)
}
