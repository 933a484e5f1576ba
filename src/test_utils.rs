//! Test utilities for the viewer.
//!
//! Provides orbit fixtures and a scripted tracking backend.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::backend::{FetchError, TrackingBackend};
use crate::types::{GeographicSample, OrbitPoint, SatelliteId, SatelliteSummary};

/// Fixtures for creating test orbits and backends.
pub mod fixtures {
    use super::*;

    /// An orbit of `n` samples with a 51.6° inclination, sweeping once
    /// around the globe from longitude -180°.
    pub fn orbit_ring(n: usize) -> Vec<OrbitPoint> {
        (0..n)
            .map(|i| {
                let phase = i as f64 / n.max(1) as f64;
                let latitude = 51.6 * (phase * std::f64::consts::TAU).sin();
                let longitude = -180.0 + 360.0 * phase;
                OrbitPoint::new(latitude, longitude)
            })
            .collect()
    }

    /// Backend that answers from fixed data and records calls.
    pub struct StubBackend {
        pub satellites: Vec<SatelliteSummary>,
        pub position: Result<GeographicSample, FetchError>,
        pub orbit: Result<Vec<OrbitPoint>, FetchError>,
        pub position_calls: AtomicU32,
        pub orbit_calls: AtomicU32,
        pub selected: Mutex<Vec<SatelliteId>>,
    }

    impl Default for StubBackend {
        fn default() -> Self {
            Self {
                satellites: vec![SatelliteSummary {
                    id: "ISS_1".to_string(),
                    name: "ISS (ZARYA)".to_string(),
                    norad_id: None,
                }],
                position: Ok(GeographicSample::at(10.0, 20.0)),
                orbit: Ok(orbit_ring(180)),
                position_calls: AtomicU32::new(0),
                orbit_calls: AtomicU32::new(0),
                selected: Mutex::new(Vec::new()),
            }
        }
    }

    impl StubBackend {
        /// Satellites passed to `select`, in call order.
        pub fn selected(&self) -> Vec<SatelliteId> {
            self.selected.lock().map(|s| s.clone()).unwrap_or_default()
        }
    }

    impl TrackingBackend for StubBackend {
        fn satellites(&self) -> Result<Vec<SatelliteSummary>, FetchError> {
            Ok(self.satellites.clone())
        }

        fn select(&self, id: &SatelliteId) -> Result<(), FetchError> {
            if let Ok(mut selected) = self.selected.lock() {
                selected.push(id.clone());
            }
            Ok(())
        }

        fn predicted_position(&self, _id: &SatelliteId) -> Result<GeographicSample, FetchError> {
            self.position_calls.fetch_add(1, Ordering::SeqCst);
            self.position.clone()
        }

        fn predicted_orbit(
            &self,
            _id: &SatelliteId,
            _samples: u32,
            _step_secs: u32,
        ) -> Result<Vec<OrbitPoint>, FetchError> {
            self.orbit_calls.fetch_add(1, Ordering::SeqCst);
            self.orbit.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;

    #[test]
    fn test_orbit_ring_stays_in_range() {
        let ring = orbit_ring(90);
        assert_eq!(ring.len(), 90);
        assert!(ring.iter().all(|p| p.geo().latitude.abs() <= 51.6));
        assert_eq!(ring[0].longitude, -180.0);
    }
}
