use crate::error::{RedactError, Result};
use log::info;
use std::path::Path;
use tokio::process::Command;

/// Check that the transcoding tool can be executed
pub async fn validate_dependencies(ffmpeg: &Path) -> Result<()> {
    info!("Validating system dependencies...");
    check_ffmpeg(ffmpeg).await?;
    info!("All dependencies validated successfully");
    Ok(())
}

async fn check_ffmpeg(ffmpeg: &Path) -> Result<()> {
    let output = Command::new(ffmpeg)
        .arg("-version")
        .output()
        .await
        .map_err(|_| RedactError::MissingDependency {
            name: ffmpeg.display().to_string(),
            suggestion: "Install FFmpeg: https://ffmpeg.org/download.html".to_string(),
        })?;

    if !output.status.success() {
        return Err(RedactError::MissingDependency {
            name: ffmpeg.display().to_string(),
            suggestion: "FFmpeg is installed but not working properly".to_string(),
        });
    }

    let version_info = String::from_utf8_lossy(&output.stdout);
    if let Some(version_line) = version_info.lines().next() {
        info!("FFmpeg found: {}", version_line);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_ffmpeg_reported() {
        let err = validate_dependencies(Path::new("/nonexistent/bin/ffmpeg"))
            .await
            .unwrap_err();
        match err {
            RedactError::MissingDependency { name, .. } => {
                assert_eq!(name, "/nonexistent/bin/ffmpeg")
            }
            other => panic!("unexpected error: {}", other),
        }
    }
}
