//! Trajectory compilation: manual keyframes + zoom regions + events into the
//! sorted, debounced [`EffectiveTrajectory`] the interpolator samples.
//!
//! # Region expansion
//!
//! Each region `{start, end, zoom, anchor}` becomes:
//!
//! 1. `anchor` at `start - transition` with the neutral pose (only when
//!    `start > transition`)
//! 2. `start` at `start`, focus pose, ease-in-out
//! 3. `follow-N` at each pointer-move strictly inside the region, spaced at
//!    least `follow_spacing` apart, region zoom, linear
//! 4. `hold` at `end` at the last followed position (or the anchor)
//! 5. `end` at `end + zoom_out` with the neutral pose, ease-in-out
//!
//! Manual keyframes join verbatim. The merged set is stably sorted by time and
//! any keyframe within `debounce` of the previous survivor is dropped.

use glide_project_model::event::{EventKind, InputEvent};
use glide_project_model::pose::{Easing, Keyframe, Pose, ZoomRegion};
use glide_project_model::timeline::{EffectiveTrajectory, Timeline};

/// Timing constants for region expansion and debounce.
#[derive(Debug, Clone, PartialEq)]
pub struct CompileConfig {
    /// Lead time of the neutral anchor before a region starts (seconds).
    pub transition_secs: f64,
    /// Length of the zoom-out after a region ends (seconds).
    pub zoom_out_secs: f64,
    /// Minimum spacing between follow keyframes (seconds).
    pub follow_spacing_secs: f64,
    /// Keyframes closer than this to the previous survivor are dropped.
    pub debounce_secs: f64,
}

impl Default for CompileConfig {
    fn default() -> Self {
        Self {
            transition_secs: 0.5,
            zoom_out_secs: 0.8,
            follow_spacing_secs: 0.15,
            debounce_secs: 0.05,
        }
    }
}

/// Compile a timeline with the default constants.
pub fn compile_timeline(timeline: &Timeline, events: &[InputEvent]) -> EffectiveTrajectory {
    compile(
        &timeline.keyframes,
        &timeline.regions,
        events,
        &CompileConfig::default(),
    )
}

/// Build the effective trajectory.
///
/// Deterministic: the same inputs always produce the same output. On exact
/// time ties `start` sorts first, then manual keyframes ahead of region
/// keyframes, and the debounce keeps the earliest of a close pair, so `start`
/// always survives.
pub fn compile(
    manual: &[Keyframe],
    regions: &[ZoomRegion],
    events: &[InputEvent],
    config: &CompileConfig,
) -> EffectiveTrajectory {
    let mut merged: Vec<Keyframe> = manual.to_vec();
    for region in regions {
        merged.extend(expand_region(region, events, config));
    }

    merged.sort_by(|a, b| {
        a.time
            .total_cmp(&b.time)
            .then_with(|| b.is_start().cmp(&a.is_start()))
    });
    let compiled = debounce(merged, config.debounce_secs);

    tracing::debug!(
        manual = manual.len(),
        regions = regions.len(),
        keyframes = compiled.len(),
        "Compiled trajectory"
    );

    EffectiveTrajectory::from_sorted(compiled)
}

/// Expand one region into its derived keyframes, in time order.
pub fn expand_region(
    region: &ZoomRegion,
    events: &[InputEvent],
    config: &CompileConfig,
) -> Vec<Keyframe> {
    let id = |suffix: &str| format!("{}:{suffix}", region.id);
    let zoom = region.target_zoom;
    let mut keyframes = Vec::new();

    if region.start_time > config.transition_secs {
        keyframes.push(Keyframe::new(
            id("anchor"),
            region.start_time - config.transition_secs,
            Pose::NEUTRAL,
            None,
        ));
    }

    keyframes.push(Keyframe::new(
        id("start"),
        region.start_time,
        region.focus_pose(),
        Some(Easing::EaseInOut),
    ));

    let mut last_position = (region.anchor_x, region.anchor_y);
    let mut last_follow_time = region.start_time;
    let mut follow_index = 0usize;
    for event in events
        .iter()
        .filter(|e| e.kind == EventKind::Move)
        .filter(|e| e.time > region.start_time && e.time < region.end_time)
    {
        if event.time - last_follow_time < config.follow_spacing_secs {
            continue;
        }
        keyframes.push(Keyframe::new(
            id(&format!("follow-{follow_index}")),
            event.time,
            Pose::new(zoom, event.x, event.y),
            Some(Easing::Linear),
        ));
        follow_index += 1;
        last_follow_time = event.time;
        last_position = (event.x, event.y);
    }

    keyframes.push(Keyframe::new(
        id("hold"),
        region.end_time,
        Pose::new(zoom, last_position.0, last_position.1),
        Some(Easing::Linear),
    ));

    keyframes.push(Keyframe::new(
        id("end"),
        region.end_time + config.zoom_out_secs,
        Pose::NEUTRAL,
        Some(Easing::EaseInOut),
    ));

    keyframes
}

/// Drop keyframes within `min_gap` of the previous surviving keyframe.
/// Input must be sorted by time; the earlier keyframe always wins.
pub fn debounce(sorted: Vec<Keyframe>, min_gap: f64) -> Vec<Keyframe> {
    let mut kept: Vec<Keyframe> = Vec::with_capacity(sorted.len());
    for keyframe in sorted {
        match kept.last() {
            Some(previous) if keyframe.time - previous.time <= min_gap => {}
            _ => kept.push(keyframe),
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    fn times(trajectory: &EffectiveTrajectory) -> Vec<f64> {
        trajectory.keyframes().iter().map(|kf| kf.time).collect()
    }

    #[test]
    fn test_single_region_without_events() {
        let region = ZoomRegion::new("r", 5.0, 8.0, 2.0, 30.0, 70.0);
        let trajectory = compile(
            &[Keyframe::start()],
            &[region],
            &[],
            &CompileConfig::default(),
        );

        assert_eq!(times(&trajectory), vec![0.0, 4.5, 5.0, 8.0, 8.8]);
        let kfs = trajectory.keyframes();
        assert_eq!(kfs[1].pose(), Pose::NEUTRAL);
        assert_eq!(kfs[2].pose(), Pose::new(2.0, 30.0, 70.0));
        assert_eq!(kfs[2].easing, Some(Easing::EaseInOut));
        assert_eq!(kfs[3].pose(), Pose::new(2.0, 30.0, 70.0));
        assert_eq!(kfs[4].pose(), Pose::NEUTRAL);
    }

    #[test]
    fn test_start_survives_tie_with_earlier_listed_keyframe() {
        let manual = [
            Keyframe::new("kf-1", 0.0, Pose::new(2.0, 40.0, 40.0), None),
            Keyframe::start(),
        ];
        let trajectory = compile(&manual, &[], &[], &CompileConfig::default());
        let ids: Vec<&str> = trajectory.keyframes().iter().map(|kf| kf.id.as_str()).collect();
        assert_eq!(ids, vec!["start"]);
        assert_eq!(trajectory.keyframes()[0].pose(), Pose::NEUTRAL);
    }

    #[test]
    fn test_region_near_zero_has_no_anchor() {
        let region = ZoomRegion::new("r", 0.4, 2.0, 2.0, 30.0, 70.0);
        let keyframes = expand_region(&region, &[], &CompileConfig::default());
        assert_eq!(keyframes.len(), 3);
        assert_eq!(keyframes[0].id, "r:start");
    }

    #[test]
    fn test_follow_keyframes_respect_spacing() {
        let region = ZoomRegion::new("r", 1.0, 2.0, 2.0, 50.0, 50.0);
        let events = vec![
            InputEvent::pointer_move(1.05, 10.0, 10.0), // too close to start
            InputEvent::pointer_move(1.20, 20.0, 20.0),
            InputEvent::pointer_move(1.30, 30.0, 30.0), // too close to previous follow
            InputEvent::pointer_move(1.40, 40.0, 40.0),
            InputEvent::down(1.60, 45.0, 45.0), // not a move
            InputEvent::pointer_move(2.00, 90.0, 90.0), // on the boundary
        ];
        let keyframes = expand_region(&region, &events, &CompileConfig::default());
        let follows: Vec<&Keyframe> = keyframes
            .iter()
            .filter(|kf| kf.id.contains("follow"))
            .collect();

        assert_eq!(follows.len(), 2);
        assert_eq!(follows[0].pose(), Pose::new(2.0, 20.0, 20.0));
        assert_eq!(follows[1].pose(), Pose::new(2.0, 40.0, 40.0));
        assert_eq!(follows[0].easing, Some(Easing::Linear));

        let hold = keyframes.iter().find(|kf| kf.id == "r:hold").unwrap();
        assert_eq!(hold.pose(), Pose::new(2.0, 40.0, 40.0));
    }

    #[test]
    fn test_debounce_keeps_earlier_keyframe() {
        let manual = vec![
            Keyframe::start(),
            Keyframe::new("kf-1", 1.0, Pose::new(2.0, 10.0, 10.0), None),
            Keyframe::new("kf-2", 1.04, Pose::new(3.0, 90.0, 90.0), None),
            Keyframe::new("kf-3", 1.03, Pose::new(3.0, 90.0, 90.0), None),
            Keyframe::new("kf-4", 1.2, Pose::new(3.0, 90.0, 90.0), None),
        ];
        let trajectory = compile(&manual, &[], &[], &CompileConfig::default());
        let ids: Vec<&str> = trajectory.keyframes().iter().map(|k| k.id.as_str()).collect();
        assert_eq!(ids, vec!["start", "kf-1", "kf-4"]);
    }

    #[test]
    fn test_start_wins_tie_with_region_at_zero() {
        let region = ZoomRegion::new("r", 0.0, 1.0, 2.0, 20.0, 20.0);
        let trajectory = compile(
            &[Keyframe::start()],
            &[region],
            &[],
            &CompileConfig::default(),
        );
        assert!(trajectory.keyframes()[0].is_start());
    }

    #[test]
    fn test_manual_keyframes_are_sorted() {
        let manual = vec![
            Keyframe::new("kf-2", 3.0, Pose::NEUTRAL, None),
            Keyframe::start(),
            Keyframe::new("kf-1", 1.0, Pose::NEUTRAL, None),
        ];
        let trajectory = compile(&manual, &[], &[], &CompileConfig::default());
        assert_eq!(times(&trajectory), vec![0.0, 1.0, 3.0]);
    }

    #[test]
    fn test_overlapping_regions_are_merged_not_resolved() {
        let regions = vec![
            ZoomRegion::new("a", 2.0, 5.0, 2.0, 20.0, 20.0),
            ZoomRegion::new("b", 3.0, 6.0, 2.5, 80.0, 80.0),
        ];
        let trajectory = compile(
            &[Keyframe::start()],
            &regions,
            &[],
            &CompileConfig::default(),
        );
        // start, a:anchor 1.5, a:start 2, b:anchor 2.5, b:start 3, a:hold 5,
        // a:end 5.8, b:hold 6, b:end 6.8
        assert_eq!(
            times(&trajectory),
            vec![0.0, 1.5, 2.0, 2.5, 3.0, 5.0, 5.8, 6.0, 6.8]
        );
    }
}
