//! Trail planning tests against fixed orbits.

mod common;

use approx::assert_relative_eq;
use bevy::math::Vec3;
use common::orbit_ring;
use orbitview::coords::to_scene_position;
use orbitview::render::trail::{
    TrailSettings, forward_window, plan_trail, satellite_index, segment_opacity,
    segment_transform,
};
use orbitview::types::{GeoPoint, OrbitPoint};
use proptest::prelude::*;

fn geo(latitude: f64, longitude: f64) -> GeoPoint {
    GeoPoint::new(latitude, longitude).unwrap()
}

#[test]
fn test_split_index_is_exact_match() {
    let orbit = [
        OrbitPoint::new(10.0, 20.0),
        OrbitPoint::new(11.0, 21.0),
        OrbitPoint::new(9.0, 19.0),
    ];
    assert_eq!(satellite_index(&orbit, geo(10.0, 20.0)), Some(0));
}

#[test]
fn test_split_index_first_minimum_wins() {
    let orbit = [
        OrbitPoint::new(0.0, 1.0),
        OrbitPoint::new(5.0, 5.0),
        OrbitPoint::new(0.0, -1.0),
    ];
    assert_eq!(satellite_index(&orbit, geo(0.0, 0.0)), Some(0));
    assert_eq!(satellite_index(&[], geo(0.0, 0.0)), None);
}

#[test]
fn test_satellite_sample_is_not_drawn() {
    let orbit = [
        OrbitPoint::new(10.0, 20.0),
        OrbitPoint::new(11.0, 21.0),
        OrbitPoint::new(12.0, 22.0),
    ];
    let settings = TrailSettings::default();
    let plan = plan_trail(&orbit, geo(11.0, 21.0), &settings).unwrap();

    assert_eq!(plan.satellite_index, 1);
    assert_eq!(plan.window, 2..3);
    // A single point ahead draws nothing
    assert!(plan.segments.is_empty());

    let plan = plan_trail(&orbit, geo(10.0, 20.0), &settings).unwrap();
    assert_eq!(plan.segments.len(), 1);
    let first = &plan.segments[0];
    assert!(first.start.abs_diff_eq(to_scene_position(11.0, 21.0, 1.06), 1e-6));
    assert!(first.end.abs_diff_eq(to_scene_position(12.0, 22.0, 1.06), 1e-6));
}

#[test]
fn test_window_is_clamped_to_horizon_and_orbit() {
    assert_eq!(forward_window(180, 0, 150), 1..151);
    assert_eq!(forward_window(180, 100, 150), 101..180);
    assert_eq!(forward_window(180, 179, 150), 180..180);
    assert_eq!(forward_window(0, 0, 150), 0..0);
}

#[test]
fn test_opacity_starts_opaque_and_floors() {
    let settings = TrailSettings::default();
    assert_relative_eq!(segment_opacity(0, 10, &settings), 1.0);
    assert_relative_eq!(segment_opacity(9, 10, &settings), settings.min_opacity);
    assert_relative_eq!(segment_opacity(0, 1, &settings), 1.0);
}

#[test]
fn test_cutoff_does_not_shift_indices() {
    let orbit = orbit_ring(180);
    let settings = TrailSettings {
        render_cutoff: 0.2,
        ..TrailSettings::default()
    };
    let satellite = orbit[0].geo();
    let plan = plan_trail(&orbit, satellite, &settings).unwrap();
    let full = plan_trail(
        &orbit,
        satellite,
        &TrailSettings {
            render_cutoff: 0.0,
            ..TrailSettings::default()
        },
    )
    .unwrap();

    assert!(plan.segments.len() < full.segments.len());
    for segment in &plan.segments {
        assert_eq!(*segment, full.segments[segment.index]);
        assert!(segment.opacity >= 0.2);
    }
}

#[test]
fn test_segment_transform_spans_endpoints() {
    let start = to_scene_position(0.0, 0.0, 1.06);
    let end = to_scene_position(0.0, 2.0, 1.06);
    let transform = segment_transform(start, end, 0.003);

    assert!(transform.translation.abs_diff_eq((start + end) / 2.0, 1e-6));
    assert_relative_eq!(transform.scale.y, start.distance(end), epsilon = 1e-6);
    let axis = transform.rotation * Vec3::Y;
    assert!(axis.abs_diff_eq((end - start).normalize(), 1e-5));
}

proptest! {
    #[test]
    fn prop_trail_points_lie_on_trail_shell(n in 2usize..300, pick in 0usize..300) {
        let orbit = orbit_ring(n);
        let satellite = orbit[pick % n].geo();
        let settings = TrailSettings::default();
        let plan = plan_trail(&orbit, satellite, &settings).unwrap();

        prop_assert!(plan.window.start > plan.satellite_index);
        prop_assert!(plan.window.len() <= settings.horizon);
        for segment in &plan.segments {
            prop_assert!((segment.start.length() - 1.06).abs() < 1e-4);
            prop_assert!((segment.end.length() - 1.06).abs() < 1e-4);
        }
        for pair in plan.segments.windows(2) {
            prop_assert!(pair[0].opacity >= pair[1].opacity);
        }
    }
}
