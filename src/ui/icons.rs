//! Phosphor icon definitions for the UI.
//!
//! Icons are initialized via `setup_fonts` when the app starts.

use bevy::prelude::*;
use bevy_egui::{EguiContexts, egui};

/// Resource to track if fonts have been initialized.
#[derive(Resource, Default)]
pub struct FontsInitialized(pub bool);

/// System to initialize Phosphor icon fonts.
/// Runs in EguiPrimaryContextPass where the egui context is guaranteed to be ready.
pub fn setup_fonts(mut contexts: EguiContexts, mut initialized: ResMut<FontsInitialized>) {
    if initialized.0 {
        return;
    }

    let Ok(ctx) = contexts.ctx_mut() else {
        return;
    };

    let mut fonts = egui::FontDefinitions::default();
    egui_phosphor::add_to_fonts(&mut fonts, egui_phosphor::Variant::Regular);

    ctx.set_fonts(fonts);
    initialized.0 = true;

    info!("Phosphor icon fonts initialized");
}

/// Icon text in a given size and colour.
pub fn icon_colored(icon: &str, size: f32, color: egui::Color32) -> egui::RichText {
    egui::RichText::new(icon).size(size).color(color)
}

// Browse all icons at https://phosphoricons.com/

/// Close/X icon
pub const CLOSE: &str = egui_phosphor::regular::X;
/// Warning/alert icon
pub const WARNING: &str = egui_phosphor::regular::WARNING;
/// Info icon
pub const INFO: &str = egui_phosphor::regular::INFO;
/// Globe icon for the loading indicator
pub const GLOBE: &str = egui_phosphor::regular::GLOBE;
