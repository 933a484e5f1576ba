//! Core data types and constants shared by the viewer.

use std::fmt;

use bevy::prelude::*;
use serde::Deserialize;

/// System sets ordering one frame of the viewer.
///
/// Results of network work are applied before the actor moves, the actor
/// moves before the trail is rebuilt from its new position, and picking runs
/// against the final pose of the frame.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum FrameSet {
    /// Pointer, keyboard and resize handling.
    Input,
    /// Finished bootstrap/refresh tasks are drained into messages.
    Tracking,
    /// Satellite asset loading and pose updates.
    Actor,
    /// Orbit trail rebuilds.
    Trail,
    /// Hover and click picking.
    Picking,
    /// Passive animation of globe, clouds, atmosphere and close-up view.
    Animate,
}

/// Radius of the globe in scene units. Everything else is relative to it.
pub const GLOBE_RADIUS: f32 = 1.0;

/// Scene altitude at which the satellite is drawn (~400 km above the surface).
pub const SATELLITE_ALTITUDE: f64 = 1.06;

/// Degrees to radians conversion factor
pub const DEG_TO_RAD: f64 = std::f64::consts::PI / 180.0;

/// Identifier of a satellite as used by the backend (e.g. `ISS_1`).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SatelliteId(pub String);

impl SatelliteId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SatelliteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A sample that cannot be placed on the globe.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum SampleError {
    #[error("sample has no {0}")]
    MissingCoordinate(&'static str),

    #[error("{axis} {value} outside valid range")]
    OutOfRange { axis: &'static str, value: f64 },
}

/// A validated geographic coordinate in degrees.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    /// Validate a latitude/longitude pair.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, SampleError> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(SampleError::OutOfRange {
                axis: "latitude",
                value: latitude,
            });
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(SampleError::OutOfRange {
                axis: "longitude",
                value: longitude,
            });
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Squared distance in lat/lon degrees. Only meaningful for ranking.
    pub fn squared_distance(&self, other: &GeoPoint) -> f64 {
        let dlat = self.latitude - other.latitude;
        let dlon = self.longitude - other.longitude;
        dlat * dlat + dlon * dlon
    }
}

/// Predicted position of a satellite as returned by the backend.
///
/// Latitude and longitude stay optional so that a malformed reply can be
/// reported as a data error instead of failing to decode.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct GeographicSample {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default, alias = "altitude")]
    pub altitude_km: f64,
    #[serde(default, alias = "velocity")]
    pub velocity_kms: f64,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl GeographicSample {
    /// Sample at the given coordinate with nominal ISS altitude and speed.
    pub fn at(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude: Some(latitude),
            longitude: Some(longitude),
            altitude_km: 408.0,
            velocity_kms: 7.66,
            ..default()
        }
    }

    /// The validated coordinate of this sample.
    pub fn geo(&self) -> Result<GeoPoint, SampleError> {
        let latitude = self
            .latitude
            .ok_or(SampleError::MissingCoordinate("latitude"))?;
        let longitude = self
            .longitude
            .ok_or(SampleError::MissingCoordinate("longitude"))?;
        GeoPoint::new(latitude, longitude)
    }
}

/// One predicted trajectory sample (minimal shape consumed by the trail).
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct OrbitPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl OrbitPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn geo(&self) -> GeoPoint {
        GeoPoint {
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }
}

/// Entry of the backend's satellite list.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct SatelliteSummary {
    pub id: String,
    pub name: String,
    /// Catalog number; the backend sends it as text or number.
    #[serde(default)]
    pub norad_id: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geo_point_rejects_out_of_range() {
        assert!(GeoPoint::new(91.0, 0.0).is_err());
        assert!(GeoPoint::new(0.0, -180.5).is_err());
        assert!(GeoPoint::new(f64::NAN, 0.0).is_err());
        assert!(GeoPoint::new(-90.0, 180.0).is_ok());
    }

    #[test]
    fn test_sample_missing_latitude_is_data_error() {
        let sample = GeographicSample {
            longitude: Some(12.0),
            ..default()
        };
        assert_eq!(
            sample.geo(),
            Err(SampleError::MissingCoordinate("latitude"))
        );
    }

    #[test]
    fn test_sample_decodes_legacy_field_names() {
        let json = r#"{"id": 1, "name": "ISS", "latitude": 10.5, "longitude": -20.25,
                       "altitude": 408, "velocity": 7.66, "timestamp": "2025-01-01T00:00:00"}"#;
        let sample: GeographicSample = serde_json::from_str(json).unwrap();
        assert_eq!(sample.altitude_km, 408.0);
        assert_eq!(sample.velocity_kms, 7.66);
        assert_eq!(sample.geo().unwrap(), GeoPoint::new(10.5, -20.25).unwrap());
    }

    #[test]
    fn test_summary_accepts_numeric_norad_id() {
        let json = r#"[{"id": "ISS_1", "name": "ISS", "norad_id": 25544}]"#;
        let list: Vec<SatelliteSummary> = serde_json::from_str(json).unwrap();
        assert_eq!(list[0].id, "ISS_1");
    }
}
