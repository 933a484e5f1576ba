//! UI module providing the egui overlay.
//!
//! Everything drawn with egui lives here or is registered here: toasts,
//! the loading indicator, the satellite label, the close-up header and the
//! pointer cue.

pub mod icons;
pub mod notifications;

use bevy::prelude::*;
use bevy_egui::{EguiContexts, EguiPrimaryContextPass, egui};

use crate::render::closeup::closeup_header;
use crate::render::labels::draw_satellite_labels;
use crate::render::picking::PointerCue;

use self::notifications::{NotificationPlugin, draw_notifications};

/// Plugin that adds all UI systems.
pub struct UiPlugin;

impl Plugin for UiPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(NotificationPlugin)
            .init_resource::<icons::FontsInitialized>()
            // Font initialization MUST run before any UI systems that use icons
            .add_systems(EguiPrimaryContextPass, icons::setup_fonts)
            .add_systems(
                EguiPrimaryContextPass,
                (
                    draw_satellite_labels,
                    closeup_header,
                    draw_notifications,
                    apply_pointer_cue,
                )
                    .after(icons::setup_fonts)
                    .run_if(|init: Res<icons::FontsInitialized>| init.0),
            );
    }
}

/// Show the pointing hand while the satellite is hovered.
fn apply_pointer_cue(mut contexts: EguiContexts, cue: Res<PointerCue>) {
    if !cue.pointing {
        return;
    }
    if let Ok(ctx) = contexts.ctx_mut() {
        ctx.set_cursor_icon(egui::CursorIcon::PointingHand);
    }
}
