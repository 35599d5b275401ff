use std::sync::atomic::AtomicBool;

use glide_processing_core::auto_zoom::{regions_from_clicks, AutoZoomSynthesizer, EventZoomConfig};
use glide_processing_core::interpolate::{sample, EasingCurve, Interpolator};
use glide_processing_core::trajectory::{compile, compile_timeline, CompileConfig};
use glide_project_model::event::InputEvent;
use glide_project_model::pose::{Easing, Keyframe, Pose, ZoomRegion};
use glide_project_model::timeline::{EffectiveTrajectory, Timeline};
use proptest::prelude::*;

fn within(value: f64, a: f64, b: f64) -> bool {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    value >= lo - 1e-9 && value <= hi + 1e-9
}

#[test]
fn midpoint_of_ease_in_out_segment() {
    let trajectory = EffectiveTrajectory::from_sorted(vec![
        Keyframe::start(),
        Keyframe::new("kf-1", 2.0, Pose::new(2.0, 80.0, 20.0), Some(Easing::EaseInOut)),
    ]);
    let pose = sample(&trajectory, 1.0);
    assert!((pose.zoom - 1.5).abs() < 1e-9);
    assert!((pose.x - 65.0).abs() < 1e-9);
    assert!((pose.y - 35.0).abs() < 1e-9);
}

#[test]
fn single_region_compiles_to_four_keyframes_plus_start() {
    let mut timeline = Timeline::new();
    timeline.add_region(5.0, 8.0, 2.0, 30.0, 70.0).unwrap();

    let trajectory = compile_timeline(&timeline, &[]);
    let times: Vec<f64> = trajectory.keyframes().iter().map(|kf| kf.time).collect();

    assert_eq!(trajectory.len(), 5);
    assert!(trajectory.keyframes()[0].is_start());
    for (actual, expected) in times.iter().zip([0.0, 4.5, 5.0, 8.0, 8.8]) {
        assert!((actual - expected).abs() < 1e-9, "{times:?}");
    }
}

#[test]
fn single_click_synthesizes_one_region() {
    let events = vec![InputEvent::down(10.0, 40.0, 60.0)];
    let synth = AutoZoomSynthesizer::default();
    let outcome = synth
        .synthesize(&events, None, &AtomicBool::new(false))
        .unwrap();

    assert!(outcome.keyframes.is_empty());
    assert_eq!(outcome.regions.len(), 1);
    let region = &outcome.regions[0];
    assert_eq!((region.start_time, region.end_time), (10.0, 13.0));
    assert!((2.0..=2.5).contains(&region.target_zoom));
    assert_eq!((region.anchor_x, region.anchor_y), (40.0, 60.0));
}

#[test]
fn click_regions_follow_pointer_moves_after_compilation() {
    let events = vec![
        InputEvent::down(2.0, 30.0, 30.0),
        InputEvent::pointer_move(2.5, 35.0, 32.0),
        InputEvent::pointer_move(3.0, 40.0, 34.0),
        InputEvent::pointer_move(6.0, 90.0, 90.0),
    ];
    let regions = regions_from_clicks(&events, &EventZoomConfig::default());
    let trajectory = compile(
        &[Keyframe::start()],
        &regions,
        &events,
        &CompileConfig::default(),
    );

    let hold = trajectory
        .keyframes()
        .iter()
        .find(|kf| kf.id.ends_with(":hold"))
        .unwrap();
    assert_eq!(hold.time, 5.0);
    assert_eq!((hold.x, hold.y), (40.0, 34.0));

    // back to neutral once the zoom-out has finished
    assert_eq!(sample(&trajectory, 6.0), Pose::NEUTRAL);
}

#[test]
fn compilation_is_idempotent() {
    let manual = vec![
        Keyframe::start(),
        Keyframe::new("kf-1", 1.0, Pose::new(1.5, 20.0, 20.0), None),
    ];
    let regions = vec![
        ZoomRegion::new("a", 3.0, 6.0, 2.0, 10.0, 10.0),
        ZoomRegion::new("b", 4.0, 9.0, 2.5, 90.0, 90.0),
    ];
    let config = CompileConfig::default();
    let first = compile(&manual, &regions, &[], &config);
    let second = compile(&manual, &regions, &[], &config);
    assert_eq!(first, second);
}

#[test]
fn legacy_export_curve_differs_from_canonical_off_midpoint() {
    let trajectory = EffectiveTrajectory::from_sorted(vec![
        Keyframe::start(),
        Keyframe::new("kf-1", 4.0, Pose::new(3.0, 50.0, 50.0), Some(Easing::EaseInOut)),
    ]);
    let canonical = Interpolator::default();
    let legacy = Interpolator {
        ease_in_out: EasingCurve::EaseInOutQuad,
        ..Interpolator::default()
    };
    assert_ne!(
        canonical.sample(&trajectory, 1.0),
        legacy.sample(&trajectory, 1.0)
    );
    assert_eq!(
        canonical.sample(&trajectory, 2.0),
        legacy.sample(&trajectory, 2.0)
    );
}

fn pose_strategy() -> impl Strategy<Value = Pose> {
    (1.0f64..4.0, 0.0f64..=100.0, 0.0f64..=100.0).prop_map(|(z, x, y)| Pose::new(z, x, y))
}

fn keyframes_strategy() -> impl Strategy<Value = Vec<Keyframe>> {
    prop::collection::vec(
        (0.0f64..30.0, pose_strategy(), prop::bool::ANY),
        1..12,
    )
    .prop_map(|items| {
        let mut keyframes: Vec<Keyframe> = items
            .into_iter()
            .enumerate()
            .map(|(i, (t, pose, linear))| {
                let easing = if linear { Easing::Linear } else { Easing::EaseInOut };
                Keyframe::new(format!("kf-{i}"), t, pose, Some(easing))
            })
            .collect();
        keyframes.sort_by(|a, b| a.time.total_cmp(&b.time));
        keyframes
    })
}

fn region_strategy() -> impl Strategy<Value = ZoomRegion> {
    (0.0f64..20.0, 0.1f64..5.0, 1.0f64..3.0, 0.0f64..=100.0, 0.0f64..=100.0).prop_map(
        |(start, len, zoom, x, y)| ZoomRegion::new("r", start, start + len, zoom, x, y),
    )
}

proptest! {
    #[test]
    fn holds_first_pose_before_start(keyframes in keyframes_strategy(), before in 0.0f64..10.0) {
        let trajectory = EffectiveTrajectory::from_sorted(keyframes.clone());
        let t = keyframes[0].time - before - 1e-6;
        prop_assert_eq!(sample(&trajectory, t), keyframes[0].pose());
    }

    #[test]
    fn holds_last_pose_after_end(keyframes in keyframes_strategy(), after in 0.0f64..10.0) {
        let trajectory = EffectiveTrajectory::from_sorted(keyframes.clone());
        let last = keyframes.last().unwrap();
        prop_assert_eq!(sample(&trajectory, last.time + after), last.pose());
    }

    #[test]
    fn interpolation_never_overshoots(keyframes in keyframes_strategy(), frac in 0.0f64..=1.0) {
        let compiled = compile(&keyframes, &[], &[], &CompileConfig::default());
        let kfs = compiled.keyframes();
        for pair in kfs.windows(2) {
            let (k1, k2) = (&pair[0], &pair[1]);
            let t = k1.time + (k2.time - k1.time) * frac;
            let pose = sample(&compiled, t);
            prop_assert!(within(pose.zoom, k1.zoom, k2.zoom));
            prop_assert!(within(pose.x, k1.x, k2.x));
            prop_assert!(within(pose.y, k1.y, k2.y));
        }
    }

    #[test]
    fn compiled_keyframes_are_spaced_past_debounce(
        keyframes in keyframes_strategy(),
        regions in prop::collection::vec(region_strategy(), 0..5),
    ) {
        let compiled = compile(&keyframes, &regions, &[], &CompileConfig::default());
        for pair in compiled.keyframes().windows(2) {
            prop_assert!(pair[1].time - pair[0].time > 0.05);
        }
    }
}
