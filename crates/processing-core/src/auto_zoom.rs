//! Auto-zoom synthesis.
//!
//! Two mutually exclusive strategies, picked by what the recording offers:
//!
//! - **Event-driven**: each pointer-down becomes a [`ZoomRegion`] centred on
//!   the click.
//! - **Motion fallback**: with no clicks to go on, frame differences of the
//!   source video are turned into keyframes (see [`crate::motion`]).
//!
//! Synthesis output replaces the timeline's generated content wholesale; the
//! caller applies it as a single transaction.

use std::sync::atomic::AtomicBool;

use glide_common::config::AutoZoomDefaults;
use glide_common::error::GlideResult;
use glide_project_model::event::InputEvent;
use glide_project_model::pose::{Keyframe, ZoomRegion};

use crate::motion::{analyze_motion, MotionConfig};
use crate::source::VideoSource;

/// Lower and upper bound for click focus zoom.
pub const FOCUS_ZOOM_RANGE: (f64, f64) = (2.0, 2.5);

/// Configuration for click-driven regions.
#[derive(Debug, Clone, PartialEq)]
pub struct EventZoomConfig {
    /// Region length after each click (seconds).
    pub region_duration_secs: f64,
    /// Zoom applied around each click. Clamped into [`FOCUS_ZOOM_RANGE`].
    pub focus_zoom: f64,
}

impl Default for EventZoomConfig {
    fn default() -> Self {
        Self {
            region_duration_secs: 3.0,
            focus_zoom: 2.0,
        }
    }
}

impl EventZoomConfig {
    pub fn clamped_focus_zoom(&self) -> f64 {
        self.focus_zoom.clamp(FOCUS_ZOOM_RANGE.0, FOCUS_ZOOM_RANGE.1)
    }
}

/// Which heuristic produced a synthesis result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynthesisStrategy {
    EventDriven,
    MotionFallback,
    /// Neither heuristic had input; the camera stays on `start`.
    Identity,
}

impl SynthesisStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            SynthesisStrategy::EventDriven => "event-driven",
            SynthesisStrategy::MotionFallback => "motion-fallback",
            SynthesisStrategy::Identity => "identity",
        }
    }
}

/// Generated keyframes and regions, to replace the timeline's current ones.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisOutcome {
    pub strategy: SynthesisStrategy,
    pub keyframes: Vec<Keyframe>,
    pub regions: Vec<ZoomRegion>,
}

impl SynthesisOutcome {
    fn identity() -> Self {
        Self {
            strategy: SynthesisStrategy::Identity,
            keyframes: vec![],
            regions: vec![],
        }
    }
}

/// One region per pointer-down event. Overlapping regions are not merged.
pub fn regions_from_clicks(events: &[InputEvent], config: &EventZoomConfig) -> Vec<ZoomRegion> {
    let zoom = config.clamped_focus_zoom();
    events
        .iter()
        .filter(|e| e.is_down())
        .enumerate()
        .map(|(i, e)| {
            ZoomRegion::new(
                format!("auto-region-{}", i + 1),
                e.time,
                e.time + config.region_duration_secs,
                zoom,
                e.x.clamp(0.0, 100.0),
                e.y.clamp(0.0, 100.0),
            )
        })
        .collect()
}

/// Picks and runs a synthesis strategy.
#[derive(Debug, Clone, Default)]
pub struct AutoZoomSynthesizer {
    pub events: EventZoomConfig,
    pub motion: MotionConfig,
}

impl AutoZoomSynthesizer {
    pub fn new(events: EventZoomConfig, motion: MotionConfig) -> Self {
        Self { events, motion }
    }

    /// Build from the user-facing application defaults.
    pub fn from_defaults(defaults: &AutoZoomDefaults) -> Self {
        Self {
            events: EventZoomConfig {
                region_duration_secs: defaults.region_duration_secs,
                focus_zoom: defaults.clamped_focus_zoom(),
            },
            motion: MotionConfig {
                sample_interval_secs: defaults.clamped_motion_interval(),
                ..MotionConfig::default()
            },
        }
    }

    /// Event-driven synthesis when the stream has at least one click,
    /// otherwise motion analysis of `source` when one is available.
    pub fn synthesize(
        &self,
        events: &[InputEvent],
        source: Option<&mut dyn VideoSource>,
        cancel: &AtomicBool,
    ) -> GlideResult<SynthesisOutcome> {
        if events.iter().any(InputEvent::is_down) {
            let regions = regions_from_clicks(events, &self.events);
            tracing::info!(
                strategy = SynthesisStrategy::EventDriven.as_str(),
                regions = regions.len(),
                "Auto-zoom synthesized"
            );
            return Ok(SynthesisOutcome {
                strategy: SynthesisStrategy::EventDriven,
                keyframes: vec![],
                regions,
            });
        }

        let Some(source) = source else {
            tracing::info!(
                strategy = SynthesisStrategy::Identity.as_str(),
                "No clicks and no source video; keeping identity camera"
            );
            return Ok(SynthesisOutcome::identity());
        };

        let analysis = analyze_motion(source, &self.motion, cancel)?;
        if analysis.keyframes.is_empty() {
            tracing::info!(
                strategy = SynthesisStrategy::Identity.as_str(),
                samples = analysis.samples.len(),
                "Motion analysis found nothing to follow"
            );
            return Ok(SynthesisOutcome::identity());
        }

        tracing::info!(
            strategy = SynthesisStrategy::MotionFallback.as_str(),
            keyframes = analysis.keyframes.len(),
            "Auto-zoom synthesized"
        );
        Ok(SynthesisOutcome {
            strategy: SynthesisStrategy::MotionFallback,
            keyframes: analysis.keyframes,
            regions: vec![],
        })
    }
}

#[cfg(test)]
mod tests {
    use glide_project_model::timeline::Timeline;

    use crate::source::FrameSequenceSource;

    use super::*;

    #[test]
    fn test_single_click_becomes_one_region() {
        let events = vec![
            InputEvent::pointer_move(9.0, 10.0, 10.0),
            InputEvent::down(10.0, 40.0, 60.0),
            InputEvent::up(10.1, 40.0, 60.0),
        ];
        let regions = regions_from_clicks(&events, &EventZoomConfig::default());
        assert_eq!(regions.len(), 1);
        let region = &regions[0];
        assert_eq!(region.start_time, 10.0);
        assert_eq!(region.end_time, 13.0);
        assert!((2.0..=2.5).contains(&region.target_zoom));
        assert_eq!((region.anchor_x, region.anchor_y), (40.0, 60.0));
    }

    #[test]
    fn test_focus_zoom_is_clamped() {
        let config = EventZoomConfig {
            focus_zoom: 4.0,
            ..Default::default()
        };
        let regions = regions_from_clicks(&[InputEvent::down(1.0, 5.0, 5.0)], &config);
        assert_eq!(regions[0].target_zoom, 2.5);
    }

    #[test]
    fn test_overlapping_clicks_are_not_merged() {
        let events = vec![InputEvent::down(1.0, 5.0, 5.0), InputEvent::down(2.0, 6.0, 6.0)];
        let regions = regions_from_clicks(&events, &EventZoomConfig::default());
        assert_eq!(regions.len(), 2);
        assert_ne!(regions[0].id, regions[1].id);
    }

    #[test]
    fn test_no_clicks_no_source_is_identity() {
        let synth = AutoZoomSynthesizer::default();
        let cancel = AtomicBool::new(false);
        let events = vec![InputEvent::pointer_move(1.0, 5.0, 5.0)];
        let outcome = synth.synthesize(&events, None, &cancel).unwrap();
        assert_eq!(outcome.strategy, SynthesisStrategy::Identity);

        let mut timeline = Timeline::new();
        timeline.add_region(1.0, 2.0, 2.0, 50.0, 50.0).unwrap();
        timeline.replace_generated(outcome.keyframes, outcome.regions);
        assert_eq!(timeline.keyframes.len(), 1);
        assert!(timeline.regions.is_empty());
    }

    #[test]
    fn test_static_source_falls_back_to_identity() {
        let synth = AutoZoomSynthesizer::default();
        let cancel = AtomicBool::new(false);
        let mut source = FrameSequenceSource::generate(6, 16, 16, 2, |_, _| {}).unwrap();
        let outcome = synth
            .synthesize(&[], Some(&mut source as &mut dyn VideoSource), &cancel)
            .unwrap();
        assert_eq!(outcome.strategy, SynthesisStrategy::Identity);
    }

    #[test]
    fn test_clicks_win_over_source() {
        let synth = AutoZoomSynthesizer::default();
        let cancel = AtomicBool::new(true);
        let mut source = FrameSequenceSource::generate(6, 16, 16, 2, |_, _| {}).unwrap();
        let outcome = synth
            .synthesize(
                &[InputEvent::down(1.0, 20.0, 20.0)],
                Some(&mut source as &mut dyn VideoSource),
                &cancel,
            )
            .unwrap();
        assert_eq!(outcome.strategy, SynthesisStrategy::EventDriven);
    }
}
