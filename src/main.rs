//! Orbitview - live 3D satellite tracker
//!
//! A desktop application showing the ISS orbiting a textured globe, with its
//! predicted path and a close-up view on click.

use bevy::prelude::*;
use bevy_egui::EguiPlugin;
use clap::Parser;

use orbitview::ViewerPlugins;
use orbitview::backend::{Backend, HttpBackend};
use orbitview::config::{ViewerArgs, ViewerConfig};
use orbitview::ui::UiPlugin;

fn main() {
    let config = ViewerConfig::from(ViewerArgs::parse());
    let backend = HttpBackend::new(config.backend_url.clone(), config.request_timeout);

    App::new()
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "Orbitview".to_string(),
                ..default()
            }),
            ..default()
        }))
        .add_plugins(EguiPlugin::default())
        // Insert resources before plugins that depend on them
        .insert_resource(ClearColor(Color::BLACK))
        .insert_resource(Backend::new(backend))
        .insert_resource(config)
        .add_plugins((ViewerPlugins, UiPlugin))
        .run();
}
