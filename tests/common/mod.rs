//! Common test utilities for integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use bevy::prelude::*;
use orbitview::ViewerPlugins;
use orbitview::backend::{FetchError, TrackingBackend};
use orbitview::render::background::StarfieldSettings;
use orbitview::render::picking::{PointerState, cast_pointer_ray, update_hover};
use orbitview::render::satellite::{AssetSource, LoadRequest, PoseUpdate};
use orbitview::types::{FrameSet, GeographicSample, OrbitPoint, SatelliteId, SatelliteSummary};
use orbitview::ui::notifications::NotificationPlugin;

/// Id used by every fixture.
pub const ISS: &str = "ISS_1";

pub fn iss() -> SatelliteId {
    SatelliteId::new(ISS)
}

/// Orbit of `n` samples sweeping once around the globe.
pub fn orbit_ring(n: usize) -> Vec<OrbitPoint> {
    (0..n)
        .map(|i| {
            let phase = i as f64 / n.max(1) as f64;
            OrbitPoint::new(
                51.6 * (phase * std::f64::consts::TAU).sin(),
                -180.0 + 360.0 * phase,
            )
        })
        .collect()
}

/// Backend answering from fixed data.
pub struct StubBackend {
    pub position: GeographicSample,
    pub orbit: Vec<OrbitPoint>,
    pub position_calls: AtomicU32,
}

impl Default for StubBackend {
    fn default() -> Self {
        Self {
            position: GeographicSample::at(10.0, 20.0),
            orbit: orbit_ring(180),
            position_calls: AtomicU32::new(0),
        }
    }
}

impl TrackingBackend for StubBackend {
    fn satellites(&self) -> Result<Vec<SatelliteSummary>, FetchError> {
        Ok(vec![SatelliteSummary {
            id: ISS.to_string(),
            name: "ISS (ZARYA)".to_string(),
            norad_id: None,
        }])
    }

    fn select(&self, _id: &SatelliteId) -> Result<(), FetchError> {
        Ok(())
    }

    fn predicted_position(&self, _id: &SatelliteId) -> Result<GeographicSample, FetchError> {
        self.position_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.position.clone())
    }

    fn predicted_orbit(
        &self,
        _id: &SatelliteId,
        _samples: u32,
        _step_secs: u32,
    ) -> Result<Vec<OrbitPoint>, FetchError> {
        Ok(self.orbit.clone())
    }
}

/// Headless app with asset storage but no window or GPU.
pub fn headless_app() -> App {
    let mut app = App::new();
    app.add_plugins((MinimalPlugins, AssetPlugin::default()))
        .init_asset::<Mesh>()
        .init_asset::<StandardMaterial>()
        .init_asset::<Image>()
        .init_asset::<Scene>()
        .insert_resource(StarfieldSettings {
            count: 16,
            ..default()
        });
    app
}

/// Headless viewer without a backend; tests drive it with messages.
pub fn viewer_app() -> App {
    let mut app = headless_app();
    app.add_plugins((ViewerPlugins, NotificationPlugin));
    app.update();
    app
}

/// Run frames until `done` holds or the frame budget is spent.
pub fn run_until(app: &mut App, max_frames: usize, done: impl Fn(&World) -> bool) -> bool {
    for _ in 0..max_frames {
        app.update();
        if done(app.world()) {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    false
}

/// Load the built-in model for the fixture satellite and wait for it.
pub fn attach_procedural(app: &mut App) {
    app.world_mut().write_message(LoadRequest {
        satellite: iss(),
        source: AssetSource::Procedural,
    });
    app.update();
}

/// Deliver a pose sample for a satellite and run one frame.
pub fn send_pose(app: &mut App, satellite: SatelliteId, latitude: f64, longitude: f64) {
    app.world_mut().write_message(PoseUpdate {
        satellite,
        sample: GeographicSample::at(latitude, longitude),
    });
    app.update();
}

/// Pointer input standing in for the window cursor.
#[derive(Resource, Debug, Default)]
pub struct AimedPointer {
    pub ray: Option<Ray3d>,
    /// Delivered as a click for one frame.
    pub click: bool,
}

fn aim_pointer(mut aimed: ResMut<AimedPointer>, mut pointer: ResMut<PointerState>) {
    pointer.ray = aimed.ray;
    pointer.clicked = std::mem::take(&mut aimed.click);
}

/// Headless viewer whose pick ray is set through [`AimedPointer`].
pub fn aimed_viewer_app() -> App {
    let mut app = headless_app();
    app.add_plugins((ViewerPlugins, NotificationPlugin))
        .init_resource::<AimedPointer>()
        .add_systems(
            Update,
            aim_pointer
                .in_set(FrameSet::Picking)
                .after(cast_pointer_ray)
                .before(update_hover),
        );
    app.update();
    app
}

/// Ray from outside the globe straight down onto `target`.
pub fn ray_towards(target: Vec3) -> Ray3d {
    let direction = Dir3::new(-target).expect("target away from the origin");
    Ray3d::new(target.normalize() * 3.0, direction)
}

pub fn aim(app: &mut App, ray: Option<Ray3d>, click: bool) {
    let mut aimed = app.world_mut().resource_mut::<AimedPointer>();
    aimed.ray = ray;
    aimed.click = click;
}
