//! Orbit trail ahead of the satellite.
//!
//! The trail is rebuilt wholesale from the predicted orbit every time new
//! data arrives. Only the future part is drawn: the window starts at the
//! sample after the one nearest to the satellite and covers a fixed number
//! of samples. Each segment is its own entity with its own material, fading
//! out along the window with `(1 - d)^power`.

use std::ops::Range;
use std::sync::Arc;

use bevy::prelude::*;

use crate::coords::to_scene_position;
use crate::render::satellite::SatelliteFix;
use crate::types::{FrameSet, GeoPoint, OrbitPoint, SATELLITE_ALTITUDE, SatelliteId};

/// Trail rendering settings.
#[derive(Resource, Debug, Clone)]
pub struct TrailSettings {
    /// Radial distance of the trail in scene units.
    pub altitude: f64,
    /// Number of samples ahead of the satellite to draw.
    pub horizon: usize,
    pub fade_power: f32,
    pub min_opacity: f32,
    /// Segments fainter than this are not spawned at all.
    pub render_cutoff: f32,
    pub color: Color,
    /// Segment thickness.
    pub width: f32,
}

impl Default for TrailSettings {
    fn default() -> Self {
        Self {
            altitude: SATELLITE_ALTITUDE,
            horizon: 150,
            fade_power: 3.2,
            min_opacity: 0.01,
            render_cutoff: 0.008,
            color: Color::srgb(1.0, 0.85, 0.2),
            width: 0.003,
        }
    }
}

/// Ask for the trail to be rebuilt from a predicted orbit.
#[derive(Message, Debug, Clone)]
pub struct TrailRequest {
    pub satellite: SatelliteId,
    pub orbit: Arc<Vec<OrbitPoint>>,
}

/// Rendered trail.
#[derive(Resource, Debug, Default, Clone, PartialEq)]
pub enum TrailRender {
    #[default]
    Absent,
    Segments(Vec<Entity>),
}

impl TrailRender {
    pub fn len(&self) -> usize {
        match self {
            TrailRender::Absent => 0,
            TrailRender::Segments(segments) => segments.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A spawned trail segment.
#[derive(Component, Debug, Clone, Copy)]
pub struct TrailSegment {
    pub index: usize,
    pub opacity: f32,
}

/// One planned segment between two consecutive window samples.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentPlan {
    pub index: usize,
    pub start: Vec3,
    pub end: Vec3,
    pub opacity: f32,
}

/// Output of [`plan_trail`].
#[derive(Debug, Clone, PartialEq)]
pub struct TrailPlan {
    pub satellite_index: usize,
    pub window: Range<usize>,
    pub segments: Vec<SegmentPlan>,
}

/// Index of the sample nearest to the satellite; the first minimum wins.
pub fn satellite_index(orbit: &[OrbitPoint], satellite: GeoPoint) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, point) in orbit.iter().enumerate() {
        let distance = point.geo().squared_distance(&satellite);
        if best.is_none_or(|(_, d)| distance < d) {
            best = Some((i, distance));
        }
    }
    best.map(|(i, _)| i)
}

/// Sample range drawn ahead of the satellite, excluding its own sample.
pub fn forward_window(len: usize, satellite_index: usize, horizon: usize) -> Range<usize> {
    let start = (satellite_index + 1).min(len);
    let end = satellite_index.saturating_add(horizon).saturating_add(1).min(len);
    start..end.max(start)
}

/// Opacity of segment `i` out of `n`.
pub fn segment_opacity(i: usize, n: usize, settings: &TrailSettings) -> f32 {
    let d = if n <= 1 {
        0.0
    } else {
        i as f32 / (n - 1) as f32
    };
    (1.0 - d).max(0.0).powf(settings.fade_power).max(settings.min_opacity)
}

/// Plan the trail for an orbit and the satellite's position.
///
/// Returns `None` for an empty orbit.
pub fn plan_trail(
    orbit: &[OrbitPoint],
    satellite: GeoPoint,
    settings: &TrailSettings,
) -> Option<TrailPlan> {
    let satellite_index = satellite_index(orbit, satellite)?;
    let window = forward_window(orbit.len(), satellite_index, settings.horizon);

    let points: Vec<Vec3> = orbit[window.clone()]
        .iter()
        .map(|p| to_scene_position(p.latitude, p.longitude, settings.altitude))
        .collect();

    let n = points.len().saturating_sub(1);
    let segments = points
        .windows(2)
        .enumerate()
        .map(|(i, pair)| SegmentPlan {
            index: i,
            start: pair[0],
            end: pair[1],
            opacity: segment_opacity(i, n, settings),
        })
        .filter(|segment| segment.opacity >= settings.render_cutoff)
        .collect();

    Some(TrailPlan {
        satellite_index,
        window,
        segments,
    })
}

/// Transform placing a unit-height cylinder between two points.
pub fn segment_transform(start: Vec3, end: Vec3, width: f32) -> Transform {
    let delta = end - start;
    let length = delta.length();
    let rotation = delta
        .try_normalize()
        .map(|dir| Quat::from_rotation_arc(Vec3::Y, dir))
        .unwrap_or_default();
    Transform {
        translation: (start + end) / 2.0,
        rotation,
        scale: Vec3::new(width, length.max(f32::EPSILON), width),
    }
}

/// Plugin providing the orbit trail.
pub struct TrailPlugin;

impl Plugin for TrailPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<TrailSettings>()
            .init_resource::<TrailRender>()
            .init_resource::<SatelliteFix>()
            .add_message::<TrailRequest>()
            .add_systems(Update, rebuild_trail.in_set(FrameSet::Trail));
    }
}

/// Tear down the previous trail and build a new one from the latest request.
pub fn rebuild_trail(
    mut commands: Commands,
    mut requests: MessageReader<TrailRequest>,
    mut render: ResMut<TrailRender>,
    settings: Res<TrailSettings>,
    fix: Res<SatelliteFix>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut unit_mesh: Local<Option<Handle<Mesh>>>,
) {
    let Some(request) = requests.read().last() else {
        return;
    };

    if let TrailRender::Segments(previous) = std::mem::take(&mut *render) {
        for entity in previous {
            commands.entity(entity).try_despawn();
        }
    }

    let satellite = match &fix.0 {
        Some((id, geo)) if *id == request.satellite => *geo,
        _ => {
            debug!("No position fix for {}, trail left empty", request.satellite);
            return;
        }
    };
    let Some(plan) = plan_trail(&request.orbit, satellite, &settings) else {
        return;
    };

    let mesh = unit_mesh
        .get_or_insert_with(|| meshes.add(Cylinder::new(0.5, 1.0)))
        .clone();
    let base = settings.color.to_linear();

    let segments = plan
        .segments
        .iter()
        .map(|segment| {
            let material = materials.add(StandardMaterial {
                base_color: Color::LinearRgba(base.with_alpha(segment.opacity)),
                unlit: true,
                alpha_mode: AlphaMode::Blend,
                ..default()
            });
            commands
                .spawn((
                    Mesh3d(mesh.clone()),
                    MeshMaterial3d(material),
                    segment_transform(segment.start, segment.end, settings.width),
                    TrailSegment {
                        index: segment.index,
                        opacity: segment.opacity,
                    },
                ))
                .id()
        })
        .collect::<Vec<_>>();

    debug!(
        "Trail rebuilt: {} segments from sample {}",
        segments.len(),
        plan.satellite_index
    );
    *render = TrailRender::Segments(segments);
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_forward_window_excludes_satellite_sample() {
        assert_eq!(forward_window(10, 3, 150), 4..10);
        assert_eq!(forward_window(10, 9, 150), 10..10);
        assert_eq!(forward_window(500, 10, 150), 11..161);
    }

    #[test]
    fn test_opacity_bounds() {
        let settings = TrailSettings::default();
        assert_relative_eq!(segment_opacity(0, 10, &settings), 1.0);
        assert_relative_eq!(segment_opacity(9, 10, &settings), settings.min_opacity);
        assert_relative_eq!(segment_opacity(0, 1, &settings), 1.0);
    }

    #[test]
    fn test_segment_transform_spans_endpoints() {
        let start = Vec3::new(1.0, 0.0, 0.0);
        let end = Vec3::new(1.0, 0.5, 0.0);
        let transform = segment_transform(start, end, 0.01);
        assert_relative_eq!(transform.scale.y, 0.5, epsilon = 1e-6);
        let top = transform.transform_point(Vec3::new(0.0, 0.5, 0.0));
        assert!(top.abs_diff_eq(end, 1e-5));
    }

    #[test]
    fn test_empty_orbit_has_no_plan() {
        let settings = TrailSettings::default();
        let geo = GeoPoint::new(0.0, 0.0).unwrap();
        assert!(plan_trail(&[], geo, &settings).is_none());
    }
}
