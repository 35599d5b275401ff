//! Editing timeline: manual keyframes and zoom regions.
//!
//! The timeline is the authored state persisted to `meta/timeline.json`.
//! The [`EffectiveTrajectory`] is the derived, sorted keyframe sequence the
//! interpolator consumes; it is recomputed from the timeline and never
//! persisted.

use serde::{Deserialize, Serialize};

use crate::pose::{Easing, Keyframe, Pose, ZoomRegion, START_KEYFRAME_ID};

/// Schema version written to new timelines.
pub const TIMELINE_VERSION: &str = "1.0";

/// Authored camera decisions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    /// Schema version.
    pub version: String,

    /// Manual keyframes. Always contains the `start` keyframe at `t = 0`.
    pub keyframes: Vec<Keyframe>,

    /// Zoom regions.
    #[serde(default)]
    pub regions: Vec<ZoomRegion>,
}

/// Errors raised by timeline mutations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TimelineError {
    #[error("no keyframe or region with id '{id}'")]
    UnknownId { id: String },

    #[error("the '{START_KEYFRAME_ID}' keyframe cannot be deleted or moved")]
    ProtectedKeyframe,

    #[error("invalid pose (zoom {zoom}, x {x}, y {y}): zoom must be >= 1 and x/y within [0, 100]")]
    InvalidPose { zoom: f64, x: f64, y: f64 },

    #[error("invalid time {time}s: must be finite and >= 0")]
    InvalidTime { time: f64 },

    #[error("invalid region span [{start}s, {end}s]: need 0 <= start < end")]
    InvalidSpan { start: f64, end: f64 },
}

impl Default for Timeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Timeline {
    /// A timeline holding only the neutral `start` keyframe.
    pub fn new() -> Self {
        Self {
            version: TIMELINE_VERSION.to_string(),
            keyframes: vec![Keyframe::start()],
            regions: vec![],
        }
    }

    /// Restore the `start` invariant after loading foreign data.
    ///
    /// Re-inserts a neutral `start` keyframe when missing, pins an existing
    /// one back to `t = 0` and moves it to the front of the list. Returns
    /// `true` when something was repaired.
    pub fn ensure_start(&mut self) -> bool {
        match self.keyframes.iter().position(Keyframe::is_start) {
            Some(0) if self.keyframes[0].time == 0.0 => false,
            Some(index) => {
                let mut start = self.keyframes.remove(index);
                start.time = 0.0;
                self.keyframes.insert(0, start);
                true
            }
            None => {
                self.keyframes.insert(0, Keyframe::start());
                true
            }
        }
    }

    /// The `start` keyframe.
    pub fn start_keyframe(&self) -> Option<&Keyframe> {
        self.keyframes.iter().find(|kf| kf.is_start())
    }

    pub fn keyframe(&self, id: &str) -> Option<&Keyframe> {
        self.keyframes.iter().find(|kf| kf.id == id)
    }

    pub fn region(&self, id: &str) -> Option<&ZoomRegion> {
        self.regions.iter().find(|r| r.id == id)
    }

    /// Add a manual keyframe and return its generated id.
    pub fn add_keyframe(
        &mut self,
        time: f64,
        pose: Pose,
        easing: Option<Easing>,
    ) -> Result<String, TimelineError> {
        check_time(time)?;
        check_pose(&pose)?;
        let id = self.next_id("kf");
        self.keyframes.push(Keyframe::new(id.clone(), time, pose, easing));
        Ok(id)
    }

    /// Delete a manual keyframe. The `start` keyframe is protected.
    pub fn remove_keyframe(&mut self, id: &str) -> Result<Keyframe, TimelineError> {
        if id == START_KEYFRAME_ID {
            return Err(TimelineError::ProtectedKeyframe);
        }
        let index = self
            .keyframes
            .iter()
            .position(|kf| kf.id == id)
            .ok_or_else(|| unknown(id))?;
        Ok(self.keyframes.remove(index))
    }

    /// Update the pose (and optionally easing) of any keyframe, `start` included.
    pub fn set_keyframe_pose(
        &mut self,
        id: &str,
        pose: Pose,
        easing: Option<Easing>,
    ) -> Result<(), TimelineError> {
        check_pose(&pose)?;
        let kf = self
            .keyframes
            .iter_mut()
            .find(|kf| kf.id == id)
            .ok_or_else(|| unknown(id))?;
        kf.set_pose(pose);
        if easing.is_some() {
            kf.easing = easing;
        }
        Ok(())
    }

    /// Move a manual keyframe in time. The `start` keyframe stays at `t = 0`.
    pub fn retime_keyframe(&mut self, id: &str, time: f64) -> Result<(), TimelineError> {
        if id == START_KEYFRAME_ID {
            return Err(TimelineError::ProtectedKeyframe);
        }
        check_time(time)?;
        let kf = self
            .keyframes
            .iter_mut()
            .find(|kf| kf.id == id)
            .ok_or_else(|| unknown(id))?;
        kf.time = time;
        Ok(())
    }

    /// Add a zoom region and return its generated id.
    pub fn add_region(
        &mut self,
        start_time: f64,
        end_time: f64,
        target_zoom: f64,
        anchor_x: f64,
        anchor_y: f64,
    ) -> Result<String, TimelineError> {
        check_span(start_time, end_time)?;
        check_pose(&Pose::new(target_zoom, anchor_x, anchor_y))?;
        let id = self.next_id("region");
        self.regions.push(ZoomRegion::new(
            id.clone(),
            start_time,
            end_time,
            target_zoom,
            anchor_x,
            anchor_y,
        ));
        Ok(id)
    }

    /// Change a region's time span.
    pub fn resize_region(
        &mut self,
        id: &str,
        start_time: f64,
        end_time: f64,
    ) -> Result<(), TimelineError> {
        check_span(start_time, end_time)?;
        let region = self
            .regions
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| unknown(id))?;
        region.start_time = start_time;
        region.end_time = end_time;
        Ok(())
    }

    pub fn remove_region(&mut self, id: &str) -> Result<ZoomRegion, TimelineError> {
        let index = self
            .regions
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| unknown(id))?;
        Ok(self.regions.remove(index))
    }

    /// Replace every manual keyframe except `start`, and every region.
    ///
    /// Used by auto-zoom synthesis, which is destructive by contract.
    pub fn replace_generated(&mut self, keyframes: Vec<Keyframe>, regions: Vec<ZoomRegion>) {
        self.ensure_start();
        self.keyframes.retain(Keyframe::is_start);
        self.keyframes
            .extend(keyframes.into_iter().filter(|kf| !kf.is_start()));
        self.regions = regions;
    }

    /// Next free `prefix-N` id across keyframes and regions.
    fn next_id(&self, prefix: &str) -> String {
        let marker = format!("{prefix}-");
        let max = self
            .keyframes
            .iter()
            .map(|kf| kf.id.as_str())
            .chain(self.regions.iter().map(|r| r.id.as_str()))
            .filter_map(|id| id.strip_prefix(&marker))
            .filter_map(|n| n.parse::<u64>().ok())
            .max()
            .unwrap_or(0);
        format!("{prefix}-{}", max + 1)
    }
}

fn unknown(id: &str) -> TimelineError {
    TimelineError::UnknownId { id: id.to_string() }
}

fn check_time(time: f64) -> Result<(), TimelineError> {
    if time.is_finite() && time >= 0.0 {
        Ok(())
    } else {
        Err(TimelineError::InvalidTime { time })
    }
}

fn check_pose(pose: &Pose) -> Result<(), TimelineError> {
    if pose.is_valid() {
        Ok(())
    } else {
        Err(TimelineError::InvalidPose {
            zoom: pose.zoom,
            x: pose.x,
            y: pose.y,
        })
    }
}

fn check_span(start: f64, end: f64) -> Result<(), TimelineError> {
    if start.is_finite() && end.is_finite() && start >= 0.0 && start < end {
        Ok(())
    } else {
        Err(TimelineError::InvalidSpan { start, end })
    }
}

/// The time-sorted keyframe sequence actually sampled by the interpolator.
///
/// Only the trajectory compiler and tests build one; it is a derived view.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct EffectiveTrajectory {
    keyframes: Vec<Keyframe>,
}

impl EffectiveTrajectory {
    /// Wrap keyframes that the caller guarantees are sorted by time.
    pub fn from_sorted(keyframes: Vec<Keyframe>) -> Self {
        debug_assert!(keyframes.windows(2).all(|w| w[0].time <= w[1].time));
        Self { keyframes }
    }

    /// A trajectory holding only the neutral `start` keyframe.
    pub fn identity() -> Self {
        Self {
            keyframes: vec![Keyframe::start()],
        }
    }

    pub fn keyframes(&self) -> &[Keyframe] {
        &self.keyframes
    }

    pub fn len(&self) -> usize {
        self.keyframes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keyframes.is_empty()
    }

    /// Time of the last keyframe, or `0` when empty.
    pub fn end_time(&self) -> f64 {
        self.keyframes.last().map(|kf| kf.time).unwrap_or(0.0)
    }

    pub fn into_keyframes(self) -> Vec<Keyframe> {
        self.keyframes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_timeline_has_start() {
        let timeline = Timeline::new();
        assert_eq!(timeline.keyframes.len(), 1);
        assert!(timeline.start_keyframe().unwrap().is_start());
        assert_eq!(timeline.version, TIMELINE_VERSION);
    }

    #[test]
    fn test_start_keyframe_is_protected() {
        let mut timeline = Timeline::new();
        assert_eq!(
            timeline.remove_keyframe(START_KEYFRAME_ID),
            Err(TimelineError::ProtectedKeyframe)
        );
        assert_eq!(
            timeline.retime_keyframe(START_KEYFRAME_ID, 2.0),
            Err(TimelineError::ProtectedKeyframe)
        );

        timeline
            .set_keyframe_pose(START_KEYFRAME_ID, Pose::new(1.5, 20.0, 30.0), None)
            .unwrap();
        let start = timeline.start_keyframe().unwrap();
        assert_eq!(start.pose(), Pose::new(1.5, 20.0, 30.0));
        assert_eq!(start.time, 0.0);
    }

    #[test]
    fn test_add_and_remove_keyframe() {
        let mut timeline = Timeline::new();
        let a = timeline
            .add_keyframe(2.0, Pose::new(2.0, 80.0, 20.0), Some(Easing::EaseInOut))
            .unwrap();
        let b = timeline.add_keyframe(4.0, Pose::NEUTRAL, None).unwrap();
        assert_eq!(a, "kf-1");
        assert_eq!(b, "kf-2");

        timeline.remove_keyframe(&a).unwrap();
        assert!(timeline.keyframe(&a).is_none());
        assert_eq!(
            timeline.remove_keyframe("kf-99"),
            Err(TimelineError::UnknownId {
                id: "kf-99".to_string()
            })
        );
    }

    #[test]
    fn test_ids_are_not_reused_after_deleting_a_lower_id() {
        let mut timeline = Timeline::new();
        let first = timeline.add_keyframe(1.0, Pose::NEUTRAL, None).unwrap();
        let second = timeline.add_keyframe(2.0, Pose::NEUTRAL, None).unwrap();
        timeline.remove_keyframe(&first).unwrap();
        let third = timeline.add_keyframe(3.0, Pose::NEUTRAL, None).unwrap();
        assert_ne!(third, second);
    }

    #[test]
    fn test_invalid_pose_rejected() {
        let mut timeline = Timeline::new();
        assert!(matches!(
            timeline.add_keyframe(1.0, Pose::new(0.5, 50.0, 50.0), None),
            Err(TimelineError::InvalidPose { .. })
        ));
        assert!(matches!(
            timeline.add_keyframe(-1.0, Pose::NEUTRAL, None),
            Err(TimelineError::InvalidTime { .. })
        ));
    }

    #[test]
    fn test_region_lifecycle() {
        let mut timeline = Timeline::new();
        let id = timeline.add_region(5.0, 8.0, 2.0, 30.0, 70.0).unwrap();
        assert_eq!(id, "region-1");

        timeline.resize_region(&id, 4.0, 9.0).unwrap();
        let region = timeline.region(&id).unwrap();
        assert_eq!((region.start_time, region.end_time), (4.0, 9.0));

        assert!(matches!(
            timeline.resize_region(&id, 9.0, 4.0),
            Err(TimelineError::InvalidSpan { .. })
        ));

        timeline.remove_region(&id).unwrap();
        assert!(timeline.regions.is_empty());
    }

    #[test]
    fn test_ensure_start_repairs_missing_and_moved_start() {
        let mut timeline = Timeline::new();
        timeline.keyframes.clear();
        assert!(timeline.ensure_start());
        assert!(timeline.start_keyframe().is_some());

        timeline.keyframes[0].time = 3.0;
        assert!(timeline.ensure_start());
        assert_eq!(timeline.start_keyframe().unwrap().time, 0.0);

        assert!(!timeline.ensure_start());
    }

    #[test]
    fn test_ensure_start_moves_start_to_front() {
        let mut timeline = Timeline::new();
        timeline.keyframes.insert(
            0,
            Keyframe::new("kf-1", 0.0, Pose::new(2.0, 40.0, 40.0), None),
        );
        assert!(timeline.ensure_start());
        assert!(timeline.keyframes[0].is_start());
        assert_eq!(timeline.keyframes[1].id, "kf-1");
        assert!(!timeline.ensure_start());
    }

    #[test]
    fn test_replace_generated_keeps_start_pose() {
        let mut timeline = Timeline::new();
        timeline
            .set_keyframe_pose(START_KEYFRAME_ID, Pose::new(1.2, 40.0, 40.0), None)
            .unwrap();
        timeline.add_keyframe(1.0, Pose::NEUTRAL, None).unwrap();
        timeline.add_region(2.0, 3.0, 2.0, 10.0, 10.0).unwrap();

        timeline.replace_generated(
            vec![
                Keyframe::start(),
                Keyframe::new("auto-1", 4.0, Pose::new(2.0, 60.0, 60.0), None),
            ],
            vec![],
        );

        assert_eq!(timeline.keyframes.len(), 2);
        assert_eq!(
            timeline.start_keyframe().unwrap().pose(),
            Pose::new(1.2, 40.0, 40.0)
        );
        assert!(timeline.keyframe("auto-1").is_some());
        assert!(timeline.regions.is_empty());
    }

    #[test]
    fn test_timeline_json_roundtrip_keeps_regions() {
        let mut timeline = Timeline::new();
        timeline.add_region(1.0, 2.0, 2.0, 50.0, 50.0).unwrap();
        let json = serde_json::to_string(&timeline).unwrap();
        let parsed: Timeline = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, timeline);
    }

    proptest::proptest! {
        #[test]
        fn prop_edits_keep_start_and_valid_content(
            ops in proptest::collection::vec(
                (
                    proptest::bool::ANY,
                    -5.0f64..20.0,
                    -5.0f64..20.0,
                    0.5f64..4.0,
                    -10.0f64..110.0,
                    -10.0f64..110.0,
                ),
                0..30,
            )
        ) {
            let mut timeline = Timeline::new();
            for (is_region, a, b, zoom, x, y) in ops {
                if is_region {
                    let _ = timeline.add_region(a, b, zoom, x, y);
                } else {
                    let _ = timeline.add_keyframe(a, Pose::new(zoom, x, y), None);
                }
            }

            let starts = timeline.keyframes.iter().filter(|kf| kf.is_start()).count();
            proptest::prop_assert_eq!(starts, 1);
            proptest::prop_assert_eq!(timeline.start_keyframe().map(|kf| kf.time), Some(0.0));
            for kf in &timeline.keyframes {
                proptest::prop_assert!(kf.time >= 0.0);
                proptest::prop_assert!(kf.pose().is_valid());
            }
            for region in &timeline.regions {
                proptest::prop_assert!(region.is_valid());
            }
        }
    }
}
