use std::path::PathBuf;
use std::time::Duration;

use crate::analysis::DEFAULT_POLL_INTERVAL;
use crate::error::{validation_error, Result};
use crate::keep_range::{BufferMode, DEFAULT_BUFFER_MS};
use crate::service::CheckOptions;
use crate::video::default_output_path;

pub const DEFAULT_SERVICE_URL: &str = "http://localhost:8080";
pub const DEFAULT_THRESHOLD: f64 = 0.4;

/// Configuration for one redaction run
#[derive(Debug, Clone)]
pub struct Config {
    pub input_file: PathBuf,
    pub output_file: Option<PathBuf>,
    pub service_url: String,
    pub threshold: f64,
    pub skip_frames: Option<u32>,
    pub skip_seconds: Option<u32>,
    pub buffer_ms: i64,
    pub buffer_mode: BufferMode,
    pub poll_interval: Duration,
    pub analysis_timeout: Option<Duration>,
    pub transcode_timeout: Option<Duration>,
    pub ffmpeg_path: PathBuf,
    pub workspace_root: PathBuf,
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if !self.input_file.exists() {
            return Err(validation_error(
                "input_file",
                format!("Input file does not exist: {}", self.input_file.display()),
            ));
        }

        if !self.input_file.is_file() {
            return Err(validation_error(
                "input_file",
                format!("Input path is not a file: {}", self.input_file.display()),
            ));
        }

        self.check_options().validate()?;

        if self.buffer_ms < 0 {
            return Err(validation_error(
                "buffer_ms",
                format!("Buffer must not be negative, got {}", self.buffer_ms),
            ));
        }

        if self.service_url.trim().is_empty() {
            return Err(validation_error("service_url", "Service URL cannot be empty"));
        }

        if let Some(output) = &self.output_file {
            if output == &self.input_file {
                return Err(validation_error(
                    "output_file",
                    "Output file must differ from the input file",
                ));
            }
        }

        Ok(())
    }

    /// Options forwarded to the analysis service
    pub fn check_options(&self) -> CheckOptions {
        CheckOptions {
            threshold: self.threshold,
            skip_frames: self.skip_frames,
            skip_seconds: self.skip_seconds,
        }
    }

    /// Explicit output path, or the input path with a suffix
    pub fn output_path(&self) -> PathBuf {
        self.output_file
            .clone()
            .unwrap_or_else(|| default_output_path(&self.input_file))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_file: PathBuf::new(),
            output_file: None,
            service_url: DEFAULT_SERVICE_URL.to_string(),
            threshold: DEFAULT_THRESHOLD,
            skip_frames: None,
            skip_seconds: None,
            buffer_ms: DEFAULT_BUFFER_MS,
            buffer_mode: BufferMode::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            analysis_timeout: None,
            transcode_timeout: None,
            ffmpeg_path: PathBuf::from("ffmpeg"),
            workspace_root: std::env::temp_dir(),
        }
    }
}

/// Builder pattern for Config
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    input_file: Option<PathBuf>,
    output_file: Option<PathBuf>,
    service_url: Option<String>,
    threshold: Option<f64>,
    skip_frames: Option<u32>,
    skip_seconds: Option<u32>,
    buffer_ms: Option<i64>,
    buffer_mode: Option<BufferMode>,
    poll_interval: Option<Duration>,
    analysis_timeout: Option<Duration>,
    transcode_timeout: Option<Duration>,
    ffmpeg_path: Option<PathBuf>,
    workspace_root: Option<PathBuf>,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn input_file(mut self, path: PathBuf) -> Self {
        self.input_file = Some(path);
        self
    }

    pub fn output_file(mut self, path: PathBuf) -> Self {
        self.output_file = Some(path);
        self
    }

    pub fn service_url(mut self, url: impl Into<String>) -> Self {
        self.service_url = Some(url.into());
        self
    }

    pub fn threshold(mut self, threshold: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(validation_error(
                "threshold",
                format!("Threshold must be between 0 and 1, got {}", threshold),
            ));
        }
        self.threshold = Some(threshold);
        Ok(self)
    }

    pub fn skip_frames(mut self, frames: u32) -> Self {
        self.skip_frames = Some(frames);
        self
    }

    pub fn skip_seconds(mut self, seconds: u32) -> Self {
        self.skip_seconds = Some(seconds);
        self
    }

    pub fn buffer_ms(mut self, buffer_ms: i64) -> Result<Self> {
        if buffer_ms < 0 {
            return Err(validation_error(
                "buffer_ms",
                format!("Buffer must not be negative, got {}", buffer_ms),
            ));
        }
        self.buffer_ms = Some(buffer_ms);
        Ok(self)
    }

    pub fn buffer_mode(mut self, mode: BufferMode) -> Self {
        self.buffer_mode = Some(mode);
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval);
        self
    }

    pub fn analysis_timeout(mut self, timeout: Duration) -> Self {
        self.analysis_timeout = Some(timeout);
        self
    }

    pub fn transcode_timeout(mut self, timeout: Duration) -> Self {
        self.transcode_timeout = Some(timeout);
        self
    }

    pub fn ffmpeg_path(mut self, path: PathBuf) -> Self {
        self.ffmpeg_path = Some(path);
        self
    }

    pub fn workspace_root(mut self, path: PathBuf) -> Self {
        self.workspace_root = Some(path);
        self
    }

    pub fn build(self) -> Result<Config> {
        let input_file = self
            .input_file
            .ok_or_else(|| validation_error("input_file", "Input file is required"))?;
        let defaults = Config::default();

        let config = Config {
            input_file,
            output_file: self.output_file,
            service_url: self.service_url.unwrap_or(defaults.service_url),
            threshold: self.threshold.unwrap_or(defaults.threshold),
            skip_frames: self.skip_frames,
            skip_seconds: self.skip_seconds,
            buffer_ms: self.buffer_ms.unwrap_or(defaults.buffer_ms),
            buffer_mode: self.buffer_mode.unwrap_or(defaults.buffer_mode),
            poll_interval: self.poll_interval.unwrap_or(defaults.poll_interval),
            analysis_timeout: self.analysis_timeout,
            transcode_timeout: self.transcode_timeout,
            ffmpeg_path: self.ffmpeg_path.unwrap_or(defaults.ffmpeg_path),
            workspace_root: self.workspace_root.unwrap_or(defaults.workspace_root),
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::tempdir;

    #[test]
    fn test_config_builder() {
        let temp_dir = tempdir().unwrap();
        let input_path = temp_dir.path().join("test.mp4");
        File::create(&input_path).unwrap();

        let config = Config::builder()
            .input_file(input_path.clone())
            .threshold(0.2).unwrap()
            .skip_seconds(3)
            .buffer_ms(250).unwrap()
            .build()
            .unwrap();

        assert_eq!(config.threshold, 0.2);
        assert_eq!(config.buffer_ms, 250);
        assert_eq!(config.skip_seconds, Some(3));
        assert_eq!(config.skip_frames, None);
        assert_eq!(config.poll_interval, Duration::from_secs(2));
        assert_eq!(config.output_path(), temp_dir.path().join("test-redacted.mp4"));
    }

    #[test]
    fn test_threshold_out_of_range() {
        assert!(Config::builder().threshold(1.01).is_err());
        assert!(Config::builder().threshold(-0.5).is_err());
        assert!(Config::builder().threshold(f64::NAN).is_err());
    }

    #[test]
    fn test_config_validation() {
        let config = Config {
            input_file: PathBuf::from("/nonexistent/file.mp4"),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let temp_dir = tempdir().unwrap();
        let input_path = temp_dir.path().join("in.mp4");
        File::create(&input_path).unwrap();
        let config = Config {
            input_file: input_path.clone(),
            output_file: Some(input_path),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_input_rejected() {
        assert!(ConfigBuilder::new().build().is_err());
    }

    #[test]
    fn test_check_options_mirror_config() {
        let config = Config {
            threshold: 0.7,
            skip_frames: Some(5),
            ..Default::default()
        };
        let opts = config.check_options();
        assert_eq!(opts.threshold, 0.7);
        assert_eq!(opts.skip_frames, Some(5));
        assert_eq!(opts.skip_seconds, None);
    }
}
