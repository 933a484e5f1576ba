//! Rendering systems for the viewer.
//!
//! This module provides the primary scene (globe, clouds, atmosphere, stars),
//! the satellite actor, its orbit trail, pointer picking and the close-up
//! viewport.

pub mod background;
pub mod closeup;
pub mod globe;
pub mod labels;
pub mod picking;
pub mod satellite;
pub mod trail;

use bevy::prelude::*;

use crate::types::FrameSet;

use self::background::StarfieldSettings;
use self::closeup::CloseupPlugin;
use self::globe::{build_primary_scene, tick_primary_scene, update_atmosphere_rim};
use self::labels::LabelSettings;
use self::picking::{
    HoverState, PointerCue, PointerState, cast_pointer_ray, track_pointer, update_hover,
};
use self::satellite::SatellitePlugin;
use self::trail::TrailPlugin;

// Re-export for use in other modules
pub use self::closeup::CloseupViewport;
pub use self::satellite::{AssetSource, SatelliteActor};
pub use self::trail::{TrailRender, TrailSettings};

/// Plugin aggregating all rendering functionality.
pub struct RenderPlugin;

impl Plugin for RenderPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins((SatellitePlugin, TrailPlugin, CloseupPlugin))
            .init_resource::<StarfieldSettings>()
            .init_resource::<LabelSettings>()
            .init_resource::<PointerState>()
            .init_resource::<HoverState>()
            .init_resource::<PointerCue>()
            .add_systems(Startup, build_primary_scene)
            .add_systems(Update, track_pointer.in_set(FrameSet::Input))
            .add_systems(
                Update,
                (cast_pointer_ray, update_hover)
                    .chain()
                    .in_set(FrameSet::Picking),
            )
            // Ambient animation, once per tick
            .add_systems(
                Update,
                (tick_primary_scene, update_atmosphere_rim).in_set(FrameSet::Animate),
            );
    }
}
