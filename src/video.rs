use anyhow::{Context, Result};
use log::debug;
use std::path::{Path, PathBuf};

/// Supported video file extensions
const SUPPORTED_EXTENSIONS: &[&str] = &[
    "mp4", "avi", "mov", "mkv", "wmv", "flv", "webm", "m4v", "3gp", "mpg", "mpeg"
];

/// Suffix inserted before the extension of the default output file
pub const OUTPUT_SUFFIX: &str = "-redacted";

/// Validate that the given file is a supported video file
pub fn validate_video_file(path: &Path) -> Result<()> {
    if !path.exists() {
        anyhow::bail!("Video file does not exist: {:?}", path);
    }

    if !path.is_file() {
        anyhow::bail!("Path is not a file: {:?}", path);
    }

    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .context("File has no extension")?
        .to_lowercase();

    if !SUPPORTED_EXTENSIONS.contains(&extension.as_str()) {
        anyhow::bail!(
            "Unsupported video format: {}. Supported formats: {:?}",
            extension,
            SUPPORTED_EXTENSIONS
        );
    }

    debug!("Video file validation passed for: {:?}", path);
    Ok(())
}

/// Extension of `path` including the leading dot, or empty
pub fn dotted_extension(path: &Path) -> String {
    path.extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default()
}

/// `dir/name.ext` becomes `dir/name-redacted.ext`
pub fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let file_name = format!("{}{}{}", stem, OUTPUT_SUFFIX, dotted_extension(input));
    input.with_file_name(file_name)
}
