//! Timeline edits: keyframes and zoom regions.
//!
//! Each command opens an editing session, applies one change and saves.

use std::path::{Path, PathBuf};

use glide_project_model::pose::{Easing, Pose, START_KEYFRAME_ID};
use glide_studio::EditorSession;

fn open(path: &Path) -> anyhow::Result<EditorSession> {
    EditorSession::open(path).map_err(|e| anyhow::anyhow!("Failed to load project: {e}"))
}

fn save(session: &mut EditorSession) -> anyhow::Result<()> {
    session
        .save()
        .map_err(|e| anyhow::anyhow!("Failed to save project: {e}"))?;
    println!(
        "  Timeline: {} keyframes, {} regions ({} compiled keyframes)",
        session.timeline().keyframes.len(),
        session.timeline().regions.len(),
        session.trajectory().len()
    );
    Ok(())
}

fn parse_easing(name: &str) -> anyhow::Result<Easing> {
    match name {
        "linear" => Ok(Easing::Linear),
        "ease-in-out" | "ease" => Ok(Easing::EaseInOut),
        other => Err(anyhow::anyhow!(
            "Unknown easing: {other}. Use: linear, ease-in-out"
        )),
    }
}

pub fn add_keyframe(
    path: PathBuf,
    time: f64,
    zoom: f64,
    x: f64,
    y: f64,
    easing: Option<String>,
) -> anyhow::Result<()> {
    let easing = easing.as_deref().map(parse_easing).transpose()?;
    let mut session = open(&path)?;

    let pose = Pose::new(zoom, x, y);
    let id = if time == 0.0 {
        session
            .update_start_pose(pose, easing)
            .map_err(|e| anyhow::anyhow!("Failed to update start keyframe: {e}"))?;
        START_KEYFRAME_ID.to_string()
    } else {
        session
            .add_keyframe(time, pose, easing)
            .map_err(|e| anyhow::anyhow!("Failed to add keyframe: {e}"))?
    };

    println!("Keyframe {id} at {time:.2}s: zoom {zoom:.2} at ({x:.1}%, {y:.1}%)");
    save(&mut session)
}

pub fn remove_keyframe(path: PathBuf, id: String) -> anyhow::Result<()> {
    let mut session = open(&path)?;
    session
        .delete_keyframe(&id)
        .map_err(|e| anyhow::anyhow!("Failed to remove keyframe: {e}"))?;
    println!("Removed keyframe {id}");
    save(&mut session)
}

pub fn add_region(
    path: PathBuf,
    start: f64,
    end: f64,
    zoom: f64,
    x: f64,
    y: f64,
) -> anyhow::Result<()> {
    let mut session = open(&path)?;
    let id = session
        .add_region(start, end, zoom, x, y)
        .map_err(|e| anyhow::anyhow!("Failed to add region: {e}"))?;
    println!("Region {id}: {start:.2}s-{end:.2}s, zoom {zoom:.2} at ({x:.1}%, {y:.1}%)");
    save(&mut session)
}

pub fn resize_region(path: PathBuf, id: String, start: f64, end: f64) -> anyhow::Result<()> {
    let mut session = open(&path)?;
    session
        .resize_region(&id, start, end)
        .map_err(|e| anyhow::anyhow!("Failed to resize region: {e}"))?;
    println!("Region {id}: {start:.2}s-{end:.2}s");
    save(&mut session)
}

pub fn remove_region(path: PathBuf, id: String) -> anyhow::Result<()> {
    let mut session = open(&path)?;
    session
        .delete_region(&id)
        .map_err(|e| anyhow::anyhow!("Failed to remove region: {e}"))?;
    println!("Removed region {id}");
    save(&mut session)
}
