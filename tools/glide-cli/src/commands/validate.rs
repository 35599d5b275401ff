//! Validate a Glide project bundle.

use std::path::PathBuf;

use glide_project_model::project::LoadedProject;

pub fn run(path: PathBuf) -> anyhow::Result<()> {
    println!("Validating project at: {}", path.display());

    let project =
        LoadedProject::load(&path).map_err(|e| anyhow::anyhow!("Failed to load project: {e}"))?;

    println!("  Name: {}", project.project.name);
    println!("  Version: {}", project.project.version);
    println!(
        "  Export: {}x{} @ {}fps",
        project.project.export.width, project.project.export.height, project.project.export.fps
    );
    println!("  Timeline keyframes: {}", project.timeline.keyframes.len());
    println!("  Timeline regions: {}", project.timeline.regions.len());

    let mut errors = project.validate_sources();
    match project.load_events() {
        Ok(events) => println!("  Events: {}", events.len()),
        Err(e) => errors.push(format!("Event stream unusable: {e}")),
    }

    if errors.is_empty() {
        println!("  Sources: All present");
        println!("\nProject is valid.");
    } else {
        println!("\nValidation issues:");
        for error in &errors {
            println!("  - {error}");
        }
        println!(
            "\n{} issue(s) found. Project may not be fully usable.",
            errors.len()
        );
    }

    Ok(())
}
