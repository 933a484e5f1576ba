//! Tracking pipeline: bootstrap and periodic refreshes.
//!
//! Network calls run as blocking tasks on Bevy's `IoTaskPool` and are polled
//! every frame. Finished work is applied on the main thread in a fixed order:
//! the pose first, then the trail. At most one bootstrap and one refresh are
//! in flight. Results fetched for a satellite that is no longer the active
//! one are dropped.

use std::sync::Arc;

use bevy::prelude::*;
use bevy::tasks::futures::check_ready;
use bevy::tasks::{IoTaskPool, Task};

use crate::backend::{Backend, FetchError, TrackingBackend};
use crate::clock::RefreshClock;
use crate::config::ViewerConfig;
use crate::render::satellite::{LoadRequest, PoseUpdate};
use crate::render::trail::TrailRequest;
use crate::types::{FrameSet, GeographicSample, OrbitPoint, SatelliteId, SatelliteSummary};
use crate::ui::notifications::Notification;

/// Result of the bootstrap sequence.
#[derive(Debug, Clone)]
pub struct Bootstrapped {
    pub satellites: Vec<SatelliteSummary>,
    pub selected: SatelliteId,
}

/// Result of one refresh cycle.
#[derive(Debug, Clone)]
pub struct RefreshOutcome {
    pub satellite: SatelliteId,
    pub position: Result<GeographicSample, FetchError>,
    /// `None` when the orbit was not due this cycle.
    pub orbit: Option<Result<Vec<OrbitPoint>, FetchError>>,
}

/// Tracking state and in-flight work.
#[derive(Resource, Default)]
pub struct TrackingState {
    active: Option<SatelliteId>,
    /// Satellites listed by the backend at bootstrap.
    pub satellites: Vec<SatelliteSummary>,
    bootstrap: Option<Task<Result<Bootstrapped, FetchError>>>,
    refresh: Option<Task<RefreshOutcome>>,
    cycles: u32,
    orbit: Option<Arc<Vec<OrbitPoint>>>,
    /// Results dropped because they were fetched for another satellite.
    pub discarded: u32,
}

impl TrackingState {
    pub fn active(&self) -> Option<&SatelliteId> {
        self.active.as_ref()
    }

    /// Make `satellite` the active one, forgetting data of the previous one.
    pub fn activate(&mut self, satellite: SatelliteId) {
        if self.active.as_ref() != Some(&satellite) {
            self.orbit = None;
            self.cycles = 0;
        }
        self.active = Some(satellite);
    }

    pub fn is_bootstrapping(&self) -> bool {
        self.bootstrap.is_some()
    }

    pub fn is_refreshing(&self) -> bool {
        self.refresh.is_some()
    }

    pub fn orbit(&self) -> Option<&Arc<Vec<OrbitPoint>>> {
        self.orbit.as_ref()
    }

    /// Whether the next refresh should also fetch the orbit.
    pub fn orbit_due(&self, refetch_every: u32) -> bool {
        self.orbit.is_none() || self.cycles.is_multiple_of(refetch_every.max(1))
    }
}

/// Plugin providing the tracking pipeline.
pub struct TrackingPlugin;

impl Plugin for TrackingPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<TrackingState>()
            .init_resource::<RefreshClock>()
            .add_message::<LoadRequest>()
            .add_message::<PoseUpdate>()
            .add_message::<TrailRequest>()
            .add_message::<Notification>()
            .add_systems(Startup, start_bootstrap)
            .add_systems(
                Update,
                (poll_bootstrap, poll_refresh, schedule_refresh)
                    .chain()
                    .in_set(FrameSet::Tracking),
            );
    }
}

/// List satellites, pick one and make it the backend's current satellite.
pub fn run_bootstrap(
    backend: &dyn TrackingBackend,
    preferred: Option<SatelliteId>,
) -> Result<Bootstrapped, FetchError> {
    let satellites = backend.satellites()?;
    let selected = match preferred {
        Some(id) => {
            if !satellites.iter().any(|s| s.id == id.as_str()) {
                warn!("Satellite {id} is not listed by the backend, tracking it anyway");
            }
            id
        }
        None => satellites
            .first()
            .map(|s| SatelliteId::new(s.id.clone()))
            .ok_or_else(|| FetchError::Server("backend lists no satellites".to_string()))?,
    };
    backend.select(&selected)?;
    Ok(Bootstrapped {
        satellites,
        selected,
    })
}

/// Fetch the position and, when due, the predicted orbit.
pub fn run_refresh(
    backend: &dyn TrackingBackend,
    satellite: SatelliteId,
    fetch_orbit: bool,
    samples: u32,
    step_secs: u32,
) -> RefreshOutcome {
    let position = backend.predicted_position(&satellite);
    let orbit = fetch_orbit.then(|| backend.predicted_orbit(&satellite, samples, step_secs));
    RefreshOutcome {
        satellite,
        position,
        orbit,
    }
}

fn spawn_bootstrap(state: &mut TrackingState, backend: &Backend, config: &ViewerConfig) {
    let backend = backend.0.clone();
    let preferred = config.satellite.clone();
    state.bootstrap = Some(
        IoTaskPool::get().spawn(async move { run_bootstrap(backend.as_ref(), preferred) }),
    );
    info!("Bootstrapping from {}", config.backend_url);
}

fn start_bootstrap(
    mut state: ResMut<TrackingState>,
    backend: Option<Res<Backend>>,
    config: Option<Res<ViewerConfig>>,
) {
    let Some(backend) = backend else {
        warn!("No tracking backend configured");
        return;
    };
    let config = config.map(|c| c.clone()).unwrap_or_default();
    spawn_bootstrap(&mut state, &backend, &config);
}

/// Apply a finished bootstrap: activate the satellite and load its asset.
pub fn poll_bootstrap(
    mut state: ResMut<TrackingState>,
    config: Option<Res<ViewerConfig>>,
    mut clock: ResMut<RefreshClock>,
    mut loads: MessageWriter<LoadRequest>,
    mut notifications: MessageWriter<Notification>,
) {
    let Some(task) = state.bootstrap.as_mut() else {
        return;
    };
    let Some(result) = check_ready(task) else {
        return;
    };
    state.bootstrap = None;

    match result {
        Ok(bootstrapped) => {
            info!(
                "Tracking {} ({} satellites listed)",
                bootstrapped.selected,
                bootstrapped.satellites.len()
            );
            let source = config
                .map(|c| c.asset_source.clone())
                .unwrap_or_else(|| ViewerConfig::default().asset_source);
            let name = bootstrapped
                .satellites
                .iter()
                .find(|s| s.id == bootstrapped.selected.as_str())
                .map_or_else(|| bootstrapped.selected.to_string(), |s| s.name.clone());
            notifications.write(Notification::info(format!("Tracking {name}")));
            state.satellites = bootstrapped.satellites;
            state.activate(bootstrapped.selected.clone());
            loads.write(LoadRequest {
                satellite: bootstrapped.selected,
                source,
            });
            clock.request_now();
        }
        Err(e) => {
            error!("Bootstrap failed: {e}");
            notifications.write(Notification::error(format!("Unable to load satellites: {e}")));
        }
    }
}

/// Apply a finished refresh: pose first, then trail.
pub fn poll_refresh(
    mut state: ResMut<TrackingState>,
    mut poses: MessageWriter<PoseUpdate>,
    mut trails: MessageWriter<TrailRequest>,
    mut notifications: MessageWriter<Notification>,
) {
    let Some(task) = state.refresh.as_mut() else {
        return;
    };
    let Some(outcome) = check_ready(task) else {
        return;
    };
    state.refresh = None;

    if state.active.as_ref() != Some(&outcome.satellite) {
        state.discarded += 1;
        debug!("Dropping refresh for inactive satellite {}", outcome.satellite);
        return;
    }
    state.cycles += 1;

    let position_ok = match outcome.position {
        Ok(sample) => {
            poses.write(PoseUpdate {
                satellite: outcome.satellite.clone(),
                sample,
            });
            true
        }
        Err(e) => {
            error!("Position fetch for {} failed: {e}", outcome.satellite);
            notifications.write(Notification::error(format!(
                "Unable to fetch satellite position: {e}"
            )));
            false
        }
    };

    let orbit_fresh = match outcome.orbit {
        Some(Ok(points)) => {
            if points.is_empty() {
                warn!("Backend returned an empty orbit for {}", outcome.satellite);
            }
            state.orbit = Some(Arc::new(points));
            true
        }
        Some(Err(e)) => {
            warn!("Orbit fetch for {} failed: {e}", outcome.satellite);
            notifications.write(Notification::error(format!("Unable to fetch orbit: {e}")));
            false
        }
        None => false,
    };

    if (position_ok || orbit_fresh)
        && let Some(orbit) = &state.orbit
    {
        trails.write(TrailRequest {
            satellite: outcome.satellite,
            orbit: orbit.clone(),
        });
    }
}

/// Start a refresh when the clock says so and nothing is in flight.
///
/// Without an active satellite a due tick retries the bootstrap instead.
pub fn schedule_refresh(
    mut state: ResMut<TrackingState>,
    mut clock: ResMut<RefreshClock>,
    backend: Option<Res<Backend>>,
    config: Option<Res<ViewerConfig>>,
) {
    if !clock.take_due() {
        return;
    }
    let Some(backend) = backend else {
        return;
    };
    let config = config.map(|c| c.clone()).unwrap_or_default();

    let Some(satellite) = state.active.clone() else {
        if !state.is_bootstrapping() {
            spawn_bootstrap(&mut state, &backend, &config);
        }
        return;
    };

    if state.is_refreshing() {
        debug!("Refresh still in flight, skipping tick");
        return;
    }

    let fetch_orbit = state.orbit_due(config.orbit_refetch_every);
    let backend = backend.0.clone();
    let (samples, step) = (config.orbit_samples, config.orbit_step_secs);
    state.refresh = Some(IoTaskPool::get().spawn(async move {
        run_refresh(backend.as_ref(), satellite, fetch_orbit, samples, step)
    }));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::fixtures::{StubBackend, orbit_ring};

    #[test]
    fn test_bootstrap_picks_first_listed() {
        let backend = StubBackend::default();
        let result = run_bootstrap(&backend, None).unwrap();
        assert_eq!(result.selected, SatelliteId::new("ISS_1"));
        assert_eq!(backend.selected(), vec![SatelliteId::new("ISS_1")]);
    }

    #[test]
    fn test_bootstrap_with_empty_list_fails() {
        let backend = StubBackend {
            satellites: Vec::new(),
            ..StubBackend::default()
        };
        assert!(matches!(
            run_bootstrap(&backend, None),
            Err(FetchError::Server(_))
        ));
    }

    #[test]
    fn test_refresh_skips_orbit_when_not_due() {
        let backend = StubBackend::default();
        let outcome = run_refresh(&backend, SatelliteId::new("ISS_1"), false, 10, 60);
        assert!(outcome.position.is_ok());
        assert!(outcome.orbit.is_none());
    }

    #[test]
    fn test_orbit_due_cadence() {
        let mut state = TrackingState::default();
        assert!(state.orbit_due(15));
        state.orbit = Some(Arc::new(orbit_ring(10)));
        state.cycles = 1;
        assert!(!state.orbit_due(15));
        state.cycles = 15;
        assert!(state.orbit_due(15));
    }

    #[test]
    fn test_activate_other_satellite_forgets_orbit() {
        let mut state = TrackingState::default();
        state.activate(SatelliteId::new("ISS_1"));
        state.orbit = Some(Arc::new(orbit_ring(4)));
        state.activate(SatelliteId::new("ISS_1"));
        assert!(state.orbit().is_some());
        state.activate(SatelliteId::new("ISS_2"));
        assert!(state.orbit().is_none());
    }
}
