//! Orbitview - live 3D satellite tracker
//!
//! A library crate providing the viewer's plugins and data types for the
//! binary and for integration testing.

pub mod backend;
pub mod camera;
pub mod clock;
pub mod config;
pub mod coords;
pub mod render;
pub mod tracking;
pub mod types;
pub mod ui;

#[cfg(test)]
pub mod test_utils;

use bevy::prelude::*;

/// Plugins that need no window or GPU: clock, cameras, scene, actor, trail,
/// picking, close-up and tracking.
///
/// The binary adds [`ui::UiPlugin`] on top; headless tests use this alone.
pub struct ViewerPlugins;

impl Plugin for ViewerPlugins {
    fn build(&self, app: &mut App) {
        app.add_plugins((
            clock::ClockPlugin,
            camera::CameraPlugin,
            render::RenderPlugin,
            tracking::TrackingPlugin,
        ));
    }
}
