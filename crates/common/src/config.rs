//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Global application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory where projects are stored.
    pub projects_dir: PathBuf,

    /// Live preview settings.
    pub preview: PreviewDefaults,

    /// Default export parameters.
    pub export: ExportDefaults,

    /// Auto-zoom synthesis defaults.
    pub auto_zoom: AutoZoomDefaults,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Live preview parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewDefaults {
    /// Display refresh rate driving the preview loop (Hz).
    pub refresh_hz: u32,

    /// Preview canvas size in pixels.
    pub width: u32,
    pub height: u32,
}

/// Default export parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportDefaults {
    /// Output frame rate.
    pub fps: u32,

    /// Output size in pixels.
    pub width: u32,
    pub height: u32,

    /// Output format name (`mp4-h264`, `webm`, `png-sequence`, ...).
    pub format: String,
}

/// Auto-zoom synthesis defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoZoomDefaults {
    /// Zoom factor applied around clicks. Kept within `[2.0, 2.5]`.
    pub focus_zoom: f64,

    /// How long a click-driven zoom region lasts (seconds).
    pub region_duration_secs: f64,

    /// Interval between sampled frames during motion analysis (seconds).
    pub motion_sample_interval_secs: f64,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "glide=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            projects_dir: dirs_default_projects(),
            preview: PreviewDefaults::default(),
            export: ExportDefaults::default(),
            auto_zoom: AutoZoomDefaults::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for PreviewDefaults {
    fn default() -> Self {
        Self {
            refresh_hz: 60,
            width: 1280,
            height: 720,
        }
    }
}

impl Default for ExportDefaults {
    fn default() -> Self {
        Self {
            fps: 30,
            width: 1920,
            height: 1080,
            format: "mp4-h264".to_string(),
        }
    }
}

impl Default for AutoZoomDefaults {
    fn default() -> Self {
        Self {
            focus_zoom: 2.0,
            region_duration_secs: 3.0,
            motion_sample_interval_secs: 0.5,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AutoZoomDefaults {
    /// Focus zoom restricted to the supported click-zoom band.
    pub fn clamped_focus_zoom(&self) -> f64 {
        self.focus_zoom.clamp(2.0, 2.5)
    }

    /// Motion sampling interval restricted to `[0.5, 1.0]` seconds.
    pub fn clamped_motion_interval(&self) -> f64 {
        self.motion_sample_interval_secs.clamp(0.5, 1.0)
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match std::fs::read_to_string(&config_path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", config_path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<(), std::io::Error> {
        let config_path = config_file_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(config_path, json)
    }
}

/// Standard config file location.
fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("glide").join("config.json")
}

/// Default projects directory.
fn dirs_default_projects() -> PathBuf {
    let base = std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local").join("share")
        });
    base.join("glide").join("projects")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_fills_defaults() {
        let parsed: AppConfig = serde_json::from_str(r#"{"preview":{"refresh_hz":120}}"#).unwrap();
        assert_eq!(parsed.preview.refresh_hz, 120);
        assert_eq!(parsed.preview.width, 1280);
        assert_eq!(parsed.export.fps, 30);
        assert_eq!(parsed.logging.level, "info");
    }

    #[test]
    fn test_focus_zoom_is_clamped_to_band() {
        let mut defaults = AutoZoomDefaults::default();
        assert!((defaults.clamped_focus_zoom() - 2.0).abs() < 1e-9);

        defaults.focus_zoom = 4.0;
        assert!((defaults.clamped_focus_zoom() - 2.5).abs() < 1e-9);

        defaults.motion_sample_interval_secs = 0.1;
        assert!((defaults.clamped_motion_interval() - 0.5).abs() < 1e-9);
    }
}
