//! Viewer configuration.
//!
//! Command line options are parsed once in `main` and turned into the
//! [`ViewerConfig`] resource. Everything has a default so the library can be
//! driven from tests without touching the command line.

use std::time::Duration;

use bevy::prelude::*;
use clap::Parser;

use crate::render::satellite::AssetSource;
use crate::types::SatelliteId;

/// Default backend base URL (the Flask service mounts its API under `/api`).
pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:5000/api";

/// Position refresh interval when none (or an unusable one) is given.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(2);

/// Command line options.
#[derive(Parser, Debug, Clone)]
#[command(name = "orbitview", about = "Live 3D view of the ISS orbiting the globe")]
pub struct ViewerArgs {
    /// Base URL of the tracking backend.
    #[arg(long, env = "ORBITVIEW_BACKEND", default_value = DEFAULT_BACKEND_URL)]
    pub backend: String,

    /// Satellite id to track. Defaults to the first one the backend lists.
    #[arg(long)]
    pub satellite: Option<String>,

    /// glTF model for the satellite, relative to the assets folder.
    /// The built-in model is used when omitted.
    #[arg(long)]
    pub model: Option<String>,

    /// Seconds between position refreshes.
    #[arg(long, default_value_t = 2.0)]
    pub refresh_secs: f32,

    /// Number of predicted orbit samples to request.
    #[arg(long, default_value_t = 180)]
    pub orbit_samples: u32,

    /// Seconds between predicted orbit samples.
    #[arg(long, default_value_t = 60)]
    pub orbit_step: u32,
}

/// Runtime configuration shared by tracking and rendering.
#[derive(Resource, Debug, Clone)]
pub struct ViewerConfig {
    /// Base URL of the tracking backend, without trailing slash.
    pub backend_url: String,
    /// Satellite to track; `None` picks the first listed one.
    pub satellite: Option<SatelliteId>,
    /// Where the satellite's renderable comes from.
    pub asset_source: AssetSource,
    /// Interval of the periodic position refresh.
    pub refresh_interval: Duration,
    /// Predicted orbit sample count (`n` query parameter).
    pub orbit_samples: u32,
    /// Predicted orbit sample spacing in seconds (`step` query parameter).
    pub orbit_step_secs: u32,
    /// Refetch the orbit every N refresh cycles.
    pub orbit_refetch_every: u32,
    /// Network timeout for a single request.
    pub request_timeout: Duration,
    /// Globe surface texture, relative to the assets folder.
    pub globe_texture: String,
    /// Cloud layer texture, relative to the assets folder.
    pub cloud_texture: String,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            satellite: None,
            asset_source: AssetSource::Procedural,
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            orbit_samples: 180,
            orbit_step_secs: 60,
            orbit_refetch_every: 15,
            request_timeout: Duration::from_secs(10),
            globe_texture: "textures/earth_daymap.png".to_string(),
            cloud_texture: "textures/earth_clouds.png".to_string(),
        }
    }
}

impl From<ViewerArgs> for ViewerConfig {
    fn from(args: ViewerArgs) -> Self {
        Self {
            backend_url: args.backend.trim_end_matches('/').to_string(),
            satellite: args.satellite.map(SatelliteId),
            asset_source: args
                .model
                .map(AssetSource::Model)
                .unwrap_or(AssetSource::Procedural),
            refresh_interval: Duration::try_from_secs_f32(args.refresh_secs.max(0.25))
                .unwrap_or(DEFAULT_REFRESH_INTERVAL),
            orbit_samples: args.orbit_samples.max(2),
            orbit_step_secs: args.orbit_step.max(1),
            ..default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_defaults_match_config_defaults() {
        let args = ViewerArgs::parse_from(["orbitview"]);
        let config = ViewerConfig::from(args);
        let defaults = ViewerConfig::default();
        assert_eq!(config.refresh_interval, defaults.refresh_interval);
        assert_eq!(config.orbit_samples, defaults.orbit_samples);
        assert_eq!(config.asset_source, AssetSource::Procedural);
    }

    #[test]
    fn test_args_override() {
        let args = ViewerArgs::parse_from([
            "orbitview",
            "--backend",
            "http://example.test/api/",
            "--satellite",
            "ISS_7",
            "--model",
            "models/iss.glb",
            "--refresh-secs",
            "0.01",
        ]);
        let config = ViewerConfig::from(args);
        assert_eq!(config.backend_url, "http://example.test/api");
        assert_eq!(config.satellite, Some(SatelliteId::new("ISS_7")));
        assert_eq!(
            config.asset_source,
            AssetSource::Model("models/iss.glb".to_string())
        );
        assert_eq!(config.refresh_interval, Duration::from_secs_f32(0.25));
    }

    #[test]
    fn test_unbounded_refresh_falls_back_to_default() {
        let args = ViewerArgs::parse_from(["orbitview", "--refresh-secs", "inf"]);
        let config = ViewerConfig::from(args);
        assert_eq!(config.refresh_interval, DEFAULT_REFRESH_INTERVAL);

        let args = ViewerArgs::parse_from(["orbitview", "--refresh-secs", "NaN"]);
        let config = ViewerConfig::from(args);
        assert_eq!(config.refresh_interval, Duration::from_secs_f32(0.25));
    }
}
