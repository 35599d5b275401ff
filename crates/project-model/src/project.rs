//! Project metadata and configuration types.
//!
//! A project is the top-level container that ties together the source
//! recording, its event stream, timeline decisions, and export configuration.
//!
//! On disk a project is a directory:
//!
//! ```text
//! <root>/
//!   sources/          recorded media
//!   meta/project.json
//!   meta/timeline.json
//!   meta/events.jsonl
//!   exports/
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::event::{check_event_stream, parse_events, serialize_events, InputEvent};
use crate::style::CanvasStyle;
use crate::timeline::Timeline;

/// Schema version written to new projects.
pub const PROJECT_VERSION: &str = "1.0";

/// Top-level project file (`project.json`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    /// Schema version.
    pub version: String,

    /// Human-readable project name.
    pub name: String,

    /// Unique project identifier (UUID).
    pub id: String,

    /// Creation timestamp (ISO 8601).
    pub created_at: String,

    /// Last modified timestamp (ISO 8601).
    pub modified_at: String,

    /// Recorded screen capture, if one has been attached.
    #[serde(default)]
    pub source: Option<SourceRef>,

    /// Export configuration.
    pub export: ExportConfig,

    /// Compositor styling shared by preview and export.
    #[serde(default)]
    pub canvas: CanvasStyle,
}

/// Reference to the source recording (relative to project root).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRef {
    /// Relative path from project root to the media file.
    pub path: String,

    /// Capture resolution in pixels.
    pub width: u32,
    pub height: u32,

    /// Duration in seconds.
    pub duration_secs: f64,

    /// Recording frame rate.
    #[serde(default = "default_source_fps")]
    pub fps: u32,
}

fn default_source_fps() -> u32 {
    30
}

/// Export configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Output format.
    pub format: ExportFormat,

    /// Output resolution (width x height in pixels).
    pub width: u32,
    pub height: u32,

    /// Output frame rate.
    pub fps: u32,

    /// Video bitrate in kbps (0 = auto).
    #[serde(default)]
    pub video_bitrate_kbps: u32,

    /// Which easing curve `ease-in-out` keyframes resolve to on export.
    #[serde(default)]
    pub easing_profile: EasingProfile,
}

impl ExportConfig {
    pub fn new(width: u32, height: u32, fps: u32) -> Self {
        Self {
            format: ExportFormat::Mp4H264,
            width,
            height,
            fps,
            video_bitrate_kbps: 8000,
            easing_profile: EasingProfile::default(),
        }
    }
}

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[serde(rename = "mp4-h264")]
    Mp4H264,
    #[serde(rename = "mp4-h265")]
    Mp4H265,
    Gif,
    Webm,
    /// Numbered PNG files in a directory. No encoder required.
    #[serde(rename = "png-sequence")]
    PngSequence,
}

impl ExportFormat {
    /// Conventional file extension, `None` for directory outputs.
    pub fn extension(&self) -> Option<&'static str> {
        match self {
            ExportFormat::Mp4H264 | ExportFormat::Mp4H265 => Some("mp4"),
            ExportFormat::Gif => Some("gif"),
            ExportFormat::Webm => Some("webm"),
            ExportFormat::PngSequence => None,
        }
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mp4" | "mp4-h264" | "h264" => Ok(ExportFormat::Mp4H264),
            "mp4-h265" | "h265" | "hevc" => Ok(ExportFormat::Mp4H265),
            "gif" => Ok(ExportFormat::Gif),
            "webm" => Ok(ExportFormat::Webm),
            "png" | "png-sequence" => Ok(ExportFormat::PngSequence),
            other => Err(format!("unknown export format '{other}'")),
        }
    }
}

/// How keyframe easing names map onto concrete curves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EasingProfile {
    /// `ease-in-out` is the cubic curve everywhere.
    #[default]
    Canonical,
    /// `ease-in-out` is the quadratic curve on export only, matching the
    /// output of older renders.
    LegacyQuadExport,
}

/// The complete in-memory representation of a loaded project.
#[derive(Debug, Clone)]
pub struct LoadedProject {
    /// Filesystem path to the project directory.
    pub root: PathBuf,

    /// Project metadata.
    pub project: Project,

    /// Editing timeline.
    pub timeline: Timeline,
}

impl Project {
    /// Create a new project with defaults.
    pub fn new(name: impl Into<String>, width: u32, height: u32, fps: u32) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            version: PROJECT_VERSION.to_string(),
            name: name.into(),
            id: uuid_v4(),
            created_at: now.clone(),
            modified_at: now,
            source: None,
            export: ExportConfig::new(width, height, fps),
            canvas: CanvasStyle::default(),
        }
    }

    /// Bump `modified_at` to now.
    pub fn touch(&mut self) {
        self.modified_at = chrono::Utc::now().to_rfc3339();
    }
}

impl LoadedProject {
    pub fn meta_dir(&self) -> PathBuf {
        self.root.join("meta")
    }

    pub fn events_path(&self) -> PathBuf {
        self.meta_dir().join("events.jsonl")
    }

    pub fn exports_dir(&self) -> PathBuf {
        self.root.join("exports")
    }

    /// Absolute path of the source recording, if one is attached.
    pub fn source_path(&self) -> Option<PathBuf> {
        self.project
            .source
            .as_ref()
            .map(|source| self.root.join(&source.path))
    }

    /// Load a project from a directory.
    ///
    /// A missing `timeline.json` yields a fresh timeline. A timeline whose
    /// `start` keyframe is missing or displaced is repaired in memory.
    pub fn load(root: impl AsRef<Path>) -> Result<Self, ProjectError> {
        let root = root.as_ref().to_path_buf();

        let project_path = root.join("meta").join("project.json");
        let timeline_path = root.join("meta").join("timeline.json");

        let project: Project = read_json(&project_path)?;

        let mut timeline: Timeline = if timeline_path.exists() {
            read_json(&timeline_path)?
        } else {
            Timeline::new()
        };
        timeline.ensure_start();

        Ok(Self {
            root,
            project,
            timeline,
        })
    }

    /// Save project and timeline to disk.
    pub fn save(&self) -> Result<(), ProjectError> {
        let meta_dir = self.meta_dir();
        std::fs::create_dir_all(&meta_dir).map_err(|e| ProjectError::IoError {
            path: meta_dir.clone(),
            source: e,
        })?;

        write_json(&meta_dir.join("project.json"), &self.project)?;
        write_json(&meta_dir.join("timeline.json"), &self.timeline)?;
        Ok(())
    }

    /// Create a new project on disk with the standard directory structure.
    pub fn create(
        root: impl AsRef<Path>,
        name: impl Into<String>,
        width: u32,
        height: u32,
        fps: u32,
    ) -> Result<Self, ProjectError> {
        let root = root.as_ref().to_path_buf();

        for subdir in &["sources", "meta", "exports"] {
            std::fs::create_dir_all(root.join(subdir)).map_err(|e| ProjectError::IoError {
                path: root.join(subdir),
                source: e,
            })?;
        }

        let loaded = Self {
            root,
            project: Project::new(name, width, height, fps),
            timeline: Timeline::new(),
        };
        loaded.save()?;
        Ok(loaded)
    }

    /// Read the recorded event stream.
    ///
    /// A missing file is an empty stream, which sends auto-zoom down the
    /// motion-analysis path. A stream that breaks ordering or range rules is
    /// rejected.
    pub fn load_events(&self) -> Result<Vec<InputEvent>, ProjectError> {
        let path = self.events_path();
        if !path.exists() {
            return Ok(vec![]);
        }
        let content = std::fs::read_to_string(&path).map_err(|e| ProjectError::IoError {
            path: path.clone(),
            source: e,
        })?;
        let events = parse_events(&content).map_err(|e| ProjectError::ParseError {
            path: path.clone(),
            source: e,
        })?;
        check_event_stream(&events).map_err(|e| ProjectError::ValidationError {
            message: format!("{}: {e}", path.display()),
        })?;
        Ok(events)
    }

    /// Write the event stream, replacing any existing file.
    pub fn save_events(&self, events: &[InputEvent]) -> Result<(), ProjectError> {
        let path = self.events_path();
        let mut content = String::from("# glide events v1\n");
        content.push_str(&serialize_events(events).map_err(|e| ProjectError::ParseError {
            path: path.clone(),
            source: e,
        })?);
        std::fs::write(&path, content).map_err(|e| ProjectError::IoError { path, source: e })
    }

    /// Validate that all referenced source files exist.
    pub fn validate_sources(&self) -> Vec<String> {
        let mut errors = vec![];

        match &self.project.source {
            Some(source) => {
                if !self.root.join(&source.path).exists() {
                    errors.push(format!("Source recording missing: {}", source.path));
                }
                if source.width == 0 || source.height == 0 {
                    errors.push(format!(
                        "Source recording has no size: {}x{}",
                        source.width, source.height
                    ));
                }
            }
            None => errors.push("No source recording attached".to_string()),
        }

        if !self.events_path().exists() {
            errors.push("Events file missing: meta/events.jsonl".to_string());
        }

        if self.timeline.start_keyframe().map(|kf| kf.time) != Some(0.0) {
            errors.push("Timeline has no 'start' keyframe at t=0".to_string());
        }
        for region in &self.timeline.regions {
            if !region.is_valid() {
                errors.push(format!("Region '{}' is invalid", region.id));
            }
        }

        errors
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ProjectError> {
    let content = std::fs::read_to_string(path).map_err(|e| ProjectError::IoError {
        path: path.to_path_buf(),
        source: e,
    })?;
    serde_json::from_str(&content).map_err(|e| ProjectError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), ProjectError> {
    let json = serde_json::to_string_pretty(value).map_err(|e| ProjectError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })?;
    std::fs::write(path, json).map_err(|e| ProjectError::IoError {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Errors that can occur when working with projects.
#[derive(Debug, thiserror::Error)]
pub enum ProjectError {
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Parse error in {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid project: {message}")]
    ValidationError { message: String },
}

/// Generate a simple UUID v4 without external dependency.
fn uuid_v4() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let seed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    format!(
        "{:08x}-{:04x}-4{:03x}-{:04x}-{:012x}",
        (seed & 0xFFFF_FFFF) as u32,
        ((seed >> 32) & 0xFFFF) as u16,
        ((seed >> 48) & 0x0FFF) as u16,
        (((seed >> 60) & 0x3FFF) as u16) | 0x8000,
        (seed >> 76) & 0xFFFF_FFFF_FFFF,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::{Keyframe, Pose};

    fn temp_project_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("glide_test_{name}_{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_project_creation() {
        let project = Project::new("Test Recording", 1920, 1080, 60);
        assert_eq!(project.name, "Test Recording");
        assert_eq!(project.export.fps, 60);
        assert_eq!(project.export.easing_profile, EasingProfile::Canonical);
        assert!(project.source.is_none());
    }

    #[test]
    fn test_project_serialization() {
        let project = Project::new("Test", 1920, 1080, 30);
        let json = serde_json::to_string_pretty(&project).unwrap();
        assert!(json.contains("\"mp4-h264\""));
        let parsed: Project = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.name, "Test");
        assert_eq!(parsed.version, PROJECT_VERSION);
    }

    #[test]
    fn test_export_format_parsing() {
        assert_eq!("mp4".parse::<ExportFormat>(), Ok(ExportFormat::Mp4H264));
        assert_eq!(
            "png-sequence".parse::<ExportFormat>(),
            Ok(ExportFormat::PngSequence)
        );
        assert!("avi".parse::<ExportFormat>().is_err());
        assert_eq!(ExportFormat::PngSequence.extension(), None);
    }

    #[test]
    fn test_loaded_project_create_and_load() {
        let dir = temp_project_dir("create_load");

        let created = LoadedProject::create(&dir, "Integration Test", 1920, 1080, 60).unwrap();
        assert_eq!(created.project.name, "Integration Test");

        let loaded = LoadedProject::load(&dir).unwrap();
        assert_eq!(loaded.project.name, "Integration Test");
        assert_eq!(loaded.timeline.keyframes.len(), 1);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_load_repairs_missing_start_keyframe() {
        let dir = temp_project_dir("repair_start");
        let mut created = LoadedProject::create(&dir, "Repair", 1280, 720, 30).unwrap();
        created.timeline.keyframes = vec![Keyframe::new(
            "kf-1",
            2.0,
            Pose::new(2.0, 10.0, 10.0),
            None,
        )];
        created.save().unwrap();

        let loaded = LoadedProject::load(&dir).unwrap();
        let start = loaded.timeline.start_keyframe().unwrap();
        assert_eq!(start.time, 0.0);
        assert_eq!(loaded.timeline.keyframes.len(), 2);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_events_roundtrip_and_missing_file() {
        let dir = temp_project_dir("events");
        let loaded = LoadedProject::create(&dir, "Events", 1280, 720, 30).unwrap();
        assert!(loaded.load_events().unwrap().is_empty());

        let events = vec![
            InputEvent::pointer_move(0.5, 10.0, 20.0),
            InputEvent::down(1.0, 40.0, 60.0),
        ];
        loaded.save_events(&events).unwrap();
        assert_eq!(loaded.load_events().unwrap(), events);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_load_events_rejects_backwards_time() {
        let dir = temp_project_dir("events_bad");
        let loaded = LoadedProject::create(&dir, "Bad", 1280, 720, 30).unwrap();
        std::fs::write(
            loaded.events_path(),
            "{\"type\":\"move\",\"time\":2.0,\"x\":1,\"y\":1}\n{\"type\":\"move\",\"time\":1.0,\"x\":1,\"y\":1}\n",
        )
        .unwrap();
        assert!(matches!(
            loaded.load_events(),
            Err(ProjectError::ValidationError { .. })
        ));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_validate_sources_reports_missing() {
        let dir = temp_project_dir("validate");
        let mut loaded = LoadedProject::create(&dir, "Validate Test", 1920, 1080, 60).unwrap();
        loaded.project.source = Some(SourceRef {
            path: "sources/screen.mkv".to_string(),
            width: 1920,
            height: 1080,
            duration_secs: 60.0,
            fps: 60,
        });

        let errors = loaded.validate_sources();
        assert!(errors.iter().any(|e| e.contains("Source recording missing")));
        assert!(errors.iter().any(|e| e.contains("events.jsonl")));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_uuid_shape() {
        let id = uuid_v4();
        let parts: Vec<&str> = id.split('-').collect();
        assert_eq!(parts.len(), 5);
        assert!(parts[2].starts_with('4'));
    }
}
