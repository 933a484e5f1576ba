//! Geographic to scene-space conversion.
//!
//! The scene uses a unit globe centred at the origin with +Y through the
//! north pole. Longitude -180° lies on the -X axis and longitude 0° on +X,
//! matching the equirectangular texture wrapped by the globe mesh.
//!
//! Every placement of something "above a lat/lon" (satellite, trail, label)
//! must go through [`to_scene_position`] so the pieces stay geometrically
//! consistent with each other.

use bevy::math::{DVec3, Vec3};

use crate::types::{DEG_TO_RAD, GeoPoint};

/// Convert latitude/longitude (degrees) and a radial distance in scene units
/// to a scene position.
///
/// The length of the result equals `altitude`.
pub fn to_scene_position(latitude: f64, longitude: f64, altitude: f64) -> Vec3 {
    to_scene_position_f64(latitude, longitude, altitude).as_vec3()
}

/// Double precision variant of [`to_scene_position`].
pub fn to_scene_position_f64(latitude: f64, longitude: f64, altitude: f64) -> DVec3 {
    let phi = (90.0 - latitude) * DEG_TO_RAD;
    let theta = (longitude + 180.0) * DEG_TO_RAD;

    DVec3::new(
        -(altitude * phi.sin() * theta.cos()),
        altitude * phi.cos(),
        altitude * phi.sin() * theta.sin(),
    )
}

/// Scene position of a validated geographic point.
pub fn geo_to_scene(point: GeoPoint, altitude: f64) -> Vec3 {
    to_scene_position(point.latitude, point.longitude, altitude)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_equator_prime_meridian_on_positive_x() {
        let p = to_scene_position(0.0, 0.0, 1.06);
        assert_relative_eq!(p.x, 1.06, epsilon = 1e-6);
        assert_relative_eq!(p.y, 0.0, epsilon = 1e-6);
        assert_relative_eq!(p.z, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_north_pole_on_positive_y() {
        let p = to_scene_position(90.0, 0.0, 1.06);
        assert_relative_eq!(p.x, 0.0, epsilon = 1e-6);
        assert_relative_eq!(p.y, 1.06, epsilon = 1e-6);
        assert_relative_eq!(p.z, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_antimeridian_on_negative_x() {
        let p = to_scene_position(0.0, -180.0, 1.0);
        assert_relative_eq!(p.x, -1.0, epsilon = 1e-6);
        assert_relative_eq!(p.z, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_east_is_negative_z() {
        // lon 90°E: theta = 270°, sin = -1
        let p = to_scene_position(0.0, 90.0, 1.0);
        assert_relative_eq!(p.z, -1.0, epsilon = 1e-6);
    }
}

#[cfg(test)]
mod proptest_coords {
    use proptest::prelude::*;

    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(256))]

        /// The transform is a pure spherical embedding: the radius is the altitude.
        #[test]
        fn prop_magnitude_equals_altitude(
            latitude in -90.0f64..=90.0,
            longitude in -180.0f64..=180.0,
            altitude in 0.5f64..20.0,
        ) {
            let p = to_scene_position_f64(latitude, longitude, altitude);
            prop_assert!((p.length() - altitude).abs() < 1e-9 * altitude.max(1.0));
        }

        /// Latitude alone determines the height above the equatorial plane.
        #[test]
        fn prop_latitude_sets_height(
            latitude in -90.0f64..=90.0,
            lon_a in -180.0f64..=180.0,
            lon_b in -180.0f64..=180.0,
        ) {
            let a = to_scene_position_f64(latitude, lon_a, 1.0);
            let b = to_scene_position_f64(latitude, lon_b, 1.0);
            prop_assert!((a.y - b.y).abs() < 1e-12);
        }
    }
}
