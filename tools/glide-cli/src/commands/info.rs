//! Show project information.

use std::path::PathBuf;

use glide_processing_core::trajectory::compile_timeline;
use glide_project_model::project::LoadedProject;
use glide_project_model::style::Background;

pub fn run(path: PathBuf) -> anyhow::Result<()> {
    let project =
        LoadedProject::load(&path).map_err(|e| anyhow::anyhow!("Failed to load project: {e}"))?;
    let events = project
        .load_events()
        .map_err(|e| anyhow::anyhow!("Failed to load events: {e}"))?;

    let p = &project.project;

    println!("Project: {}", p.name);
    println!("  ID: {}", p.id);
    println!("  Created: {}", p.created_at);
    println!("  Modified: {}", p.modified_at);
    println!();

    println!("Source:");
    match &p.source {
        Some(source) => println!(
            "  {} ({}x{} @ {}fps, {:.1}s)",
            source.path, source.width, source.height, source.fps, source.duration_secs
        ),
        None => println!("  (none attached)"),
    }
    println!("  Events: {}", events.len());
    println!();

    println!("Export:");
    println!("  Format: {:?}", p.export.format);
    println!(
        "  Resolution: {}x{} @ {}fps",
        p.export.width, p.export.height, p.export.fps
    );
    println!("  Easing profile: {:?}", p.export.easing_profile);
    println!();

    println!("Canvas:");
    match &p.canvas.background {
        Background::Solid { color } => println!("  Background: {}", color.to_hex()),
        Background::LinearGradient { from, to, angle_deg } => println!(
            "  Background: {} -> {} ({angle_deg}°)",
            from.to_hex(),
            to.to_hex()
        ),
    }
    println!(
        "  Frame: scale {:.2}, radius {:.0}px, crop policy {:?}",
        p.canvas.clamped_frame_scale(),
        p.canvas.corner_radius,
        p.canvas.crop_policy
    );
    println!();

    let trajectory = compile_timeline(&project.timeline, &events);
    println!("Timeline:");
    println!("  Keyframes: {}", project.timeline.keyframes.len());
    println!("  Regions: {}", project.timeline.regions.len());
    println!(
        "  Compiled: {} keyframes, ends at {:.2}s",
        trajectory.len(),
        trajectory.end_time()
    );

    Ok(())
}
