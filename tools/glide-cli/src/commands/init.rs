//! Initialize a new Glide project.

use std::path::{Path, PathBuf};

use glide_project_model::event::{check_event_stream, parse_events};
use glide_project_model::project::{LoadedProject, SourceRef};
use glide_render_engine::media::probe_video;

pub fn run(
    name: String,
    output: PathBuf,
    width: u32,
    height: u32,
    fps: u32,
    source: Option<PathBuf>,
    events: Option<PathBuf>,
) -> anyhow::Result<()> {
    let project_dir = output.join(&name);
    println!("Creating project '{}' at {}", name, project_dir.display());

    let mut project = LoadedProject::create(&project_dir, &name, width, height, fps)
        .map_err(|e| anyhow::anyhow!("Failed to create project: {e}"))?;

    if let Some(source) = source {
        let source_ref = import_source(&project, &source)?;
        println!(
            "  Source: {} ({}x{}, {:.1}s)",
            source_ref.path, source_ref.width, source_ref.height, source_ref.duration_secs
        );
        project.project.source = Some(source_ref);
    }

    if let Some(events) = events {
        let content = std::fs::read_to_string(&events)
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {e}", events.display()))?;
        let parsed = parse_events(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse {}: {e}", events.display()))?;
        check_event_stream(&parsed)
            .map_err(|e| anyhow::anyhow!("Rejected event stream {}: {e}", events.display()))?;
        project
            .save_events(&parsed)
            .map_err(|e| anyhow::anyhow!("Failed to write events: {e}"))?;
        println!("  Events: {}", parsed.len());
    }

    project.project.touch();
    project
        .save()
        .map_err(|e| anyhow::anyhow!("Failed to save project: {e}"))?;

    println!("Project created successfully:");
    println!("  Directory: {}", project.root.display());
    println!("  Export: {}x{} @ {}fps", width, height, fps);
    println!();
    println!("Directory structure:");
    println!("  {}/", name);
    println!("  ├── sources/     (screen recording)");
    println!("  ├── meta/        (project.json, timeline.json, events.jsonl)");
    println!("  └── exports/     (rendered output)");

    Ok(())
}

/// Copy a recording into `sources/` and describe it.
fn import_source(project: &LoadedProject, source: &Path) -> anyhow::Result<SourceRef> {
    let info = probe_video(source)
        .map_err(|e| anyhow::anyhow!("Failed to probe {}: {e}", source.display()))?;

    let file_name = source
        .file_name()
        .ok_or_else(|| anyhow::anyhow!("Not a file: {}", source.display()))?
        .to_string_lossy()
        .into_owned();
    let relative = format!("sources/{file_name}");
    std::fs::copy(source, project.root.join(&relative))
        .map_err(|e| anyhow::anyhow!("Failed to copy {}: {e}", source.display()))?;

    Ok(SourceRef {
        path: relative,
        width: info.width,
        height: info.height,
        duration_secs: info.duration_secs,
        fps: info.fps.round().max(1.0) as u32,
    })
}
