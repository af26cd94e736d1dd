use crate::config::ConfigBuilder;
use crate::error::{validation_error, RedactError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

/// Configuration file format that can be serialized to YAML/JSON
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Analysis service base URL
    pub service_url: Option<String>,
    /// Detection threshold (lower is stricter)
    pub threshold: Option<f64>,
    pub skip_frames: Option<u32>,
    pub skip_seconds: Option<u32>,
    /// Padding around each cut in milliseconds
    pub buffer_ms: Option<i64>,
    /// `expand_cuts` or `expand_keeps`
    pub buffer_mode: Option<String>,
    pub analysis_timeout_secs: Option<u64>,
    pub transcode_timeout_secs: Option<u64>,
    pub ffmpeg_path: Option<PathBuf>,
    pub workspace_root: Option<PathBuf>,
    /// Enable progress indicators by default
    pub show_progress: Option<bool>,
    /// Named setting overrides
    pub profiles: Option<HashMap<String, ProfileConfig>>,
}

/// Profile-specific configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileConfig {
    pub threshold: Option<f64>,
    pub skip_frames: Option<u32>,
    pub skip_seconds: Option<u32>,
    pub buffer_ms: Option<i64>,
    pub buffer_mode: Option<String>,
    pub description: Option<String>,
}

impl ConfigFile {
    /// Settings file pre-populated with the built-in profiles
    pub fn with_builtin_profiles() -> Self {
        let mut profiles = HashMap::new();

        profiles.insert("strict".to_string(), ProfileConfig {
            threshold: Some(0.2),
            skip_frames: Some(0),
            buffer_ms: Some(1000),
            description: Some("Low threshold, every frame, wide cuts".to_string()),
            ..Default::default()
        });

        profiles.insert("balanced".to_string(), ProfileConfig {
            threshold: Some(0.4),
            buffer_ms: Some(500),
            description: Some("Default detection sensitivity".to_string()),
            ..Default::default()
        });

        profiles.insert("fast".to_string(), ProfileConfig {
            threshold: Some(0.5),
            skip_seconds: Some(1),
            buffer_ms: Some(750),
            description: Some("Samples one frame per second for long videos".to_string()),
            ..Default::default()
        });

        Self {
            show_progress: Some(true),
            profiles: Some(profiles),
            ..Default::default()
        }
    }

    /// Load configuration from a YAML file
    pub async fn load_yaml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref()).await
            .map_err(|e| RedactError::FileSystem {
                source: e,
                path: path.as_ref().to_path_buf(),
            })?;

        serde_yaml::from_str(&contents)
            .map_err(|e| validation_error("config_file", format!("Failed to parse YAML config: {}", e)))
    }

    /// Load configuration from a JSON file
    pub async fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref()).await
            .map_err(|e| RedactError::FileSystem {
                source: e,
                path: path.as_ref().to_path_buf(),
            })?;

        serde_json::from_str(&contents)
            .map_err(|e| validation_error("config_file", format!("Failed to parse JSON config: {}", e)))
    }

    /// Auto-detect and load configuration file based on extension
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        match path.as_ref().extension().and_then(|s| s.to_str()) {
            Some("yaml") | Some("yml") => Self::load_yaml(path).await,
            Some("json") => Self::load_json(path).await,
            Some(ext) => Err(validation_error(
                "config_file",
                format!("Unsupported config format '{}'. Supported formats: yaml, yml, json", ext),
            )),
            None => Err(validation_error(
                "config_file",
                "Config file must have .yaml, .yml, or .json extension",
            )),
        }
    }

    #[cfg(test)]
    async fn save_yaml<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml_content = serde_yaml::to_string(self)
            .map_err(|e| validation_error("config_file", format!("Failed to serialize config to YAML: {}", e)))?;

        fs::write(path.as_ref(), yaml_content).await
            .map_err(|e| RedactError::FileSystem {
                source: e,
                path: path.as_ref().to_path_buf(),
            })
    }

    /// Get default config file paths to search
    pub fn default_config_paths() -> Vec<PathBuf> {
        vec![
            PathBuf::from(".videoredact.yaml"),
            PathBuf::from(".videoredact.yml"),
            PathBuf::from(".videoredact.json"),
            dirs::config_dir().unwrap_or_else(|| PathBuf::from("."))
                .join("videoredact").join("config.yaml"),
            dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
                .join(".config").join("videoredact.yaml"),
        ]
    }

    /// Try to load configuration from default locations
    pub async fn load_from_default_locations() -> Option<Self> {
        for path in Self::default_config_paths() {
            if path.exists() {
                match Self::load(&path).await {
                    Ok(config) => {
                        log::info!("Loaded configuration from: {}", path.display());
                        return Some(config);
                    }
                    Err(e) => {
                        log::warn!("Failed to load config from {}: {}", path.display(), e);
                    }
                }
            }
        }
        None
    }

    /// Apply this config file to a ConfigBuilder
    pub fn apply_to_builder(&self, mut builder: ConfigBuilder) -> Result<ConfigBuilder> {
        if let Some(ref url) = self.service_url {
            builder = builder.service_url(url.clone());
        }
        if let Some(threshold) = self.threshold {
            builder = builder.threshold(threshold)?;
        }
        if let Some(frames) = self.skip_frames {
            builder = builder.skip_frames(frames);
        }
        if let Some(seconds) = self.skip_seconds {
            builder = builder.skip_seconds(seconds);
        }
        if let Some(buffer) = self.buffer_ms {
            builder = builder.buffer_ms(buffer)?;
        }
        if let Some(ref mode) = self.buffer_mode {
            builder = builder.buffer_mode(mode.parse()?);
        }
        if let Some(secs) = self.analysis_timeout_secs {
            builder = builder.analysis_timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = self.transcode_timeout_secs {
            builder = builder.transcode_timeout(Duration::from_secs(secs));
        }
        if let Some(ref path) = self.ffmpeg_path {
            builder = builder.ffmpeg_path(path.clone());
        }
        if let Some(ref path) = self.workspace_root {
            builder = builder.workspace_root(path.clone());
        }
        Ok(builder)
    }

    /// Apply a specific profile to a ConfigBuilder
    pub fn apply_profile_to_builder(&self, profile_name: &str, builder: ConfigBuilder) -> Result<ConfigBuilder> {
        let profile = self
            .profile(profile_name)
            .ok_or_else(|| validation_error("profile", format!("Profile '{}' not found", profile_name)))?;

        // Base settings first, profile overrides second
        let mut builder = self.apply_to_builder(builder)?;

        if let Some(threshold) = profile.threshold {
            builder = builder.threshold(threshold)?;
        }
        if let Some(frames) = profile.skip_frames {
            builder = builder.skip_frames(frames);
        }
        if let Some(seconds) = profile.skip_seconds {
            builder = builder.skip_seconds(seconds);
        }
        if let Some(buffer) = profile.buffer_ms {
            builder = builder.buffer_ms(buffer)?;
        }
        if let Some(ref mode) = profile.buffer_mode {
            builder = builder.buffer_mode(mode.parse()?);
        }

        Ok(builder)
    }

    /// Look up a profile in this file, falling back to the built-in ones
    pub fn profile(&self, name: &str) -> Option<ProfileConfig> {
        self.profiles
            .as_ref()
            .and_then(|p| p.get(name).cloned())
            .or_else(|| {
                Self::with_builtin_profiles()
                    .profiles
                    .and_then(|mut p| p.remove(name))
            })
    }

    /// Profile names with descriptions, sorted by name
    pub fn list_profiles(&self) -> Vec<(String, String)> {
        let mut merged = Self::with_builtin_profiles().profiles.unwrap_or_default();
        if let Some(ref own) = self.profiles {
            merged.extend(own.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        let mut listed: Vec<_> = merged
            .into_iter()
            .map(|(name, p)| (name, p.description.unwrap_or_else(|| "No description".to_string())))
            .collect();
        listed.sort();
        listed
    }
}
