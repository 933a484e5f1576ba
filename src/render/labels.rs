//! Satellite name label using egui for text rendering.
//!
//! The label entity itself is owned by the satellite actor; this module only
//! projects its anchor to the screen and paints the text there.

use bevy::prelude::*;
use bevy_egui::{EguiContexts, egui};

use crate::camera::MainCamera;
use crate::render::closeup::CloseupViewport;
use crate::render::satellite::SatelliteLabel;

/// Settings for label rendering.
#[derive(Resource, Debug, Clone)]
pub struct LabelSettings {
    pub visible: bool,
    pub font_size: f32,
    /// Offset from the anchor in screen pixels.
    pub offset: f32,
}

impl Default for LabelSettings {
    fn default() -> Self {
        Self {
            visible: true,
            font_size: 14.0,
            offset: 6.0,
        }
    }
}

/// Draw the satellite label above its anchor.
pub fn draw_satellite_labels(
    mut contexts: EguiContexts,
    labels: Query<(&SatelliteLabel, &GlobalTransform)>,
    camera: Query<(&Camera, &GlobalTransform), With<MainCamera>>,
    settings: Res<LabelSettings>,
    closeup: Res<CloseupViewport>,
) {
    if !settings.visible || !closeup.is_closed() {
        return;
    }

    let Ok((camera, camera_transform)) = camera.single() else {
        return;
    };
    let Ok(ctx) = contexts.ctx_mut() else {
        return;
    };

    egui::Area::new(egui::Id::new("satellite_labels"))
        .fixed_pos(egui::pos2(0.0, 0.0))
        .order(egui::Order::Background)
        .interactable(false)
        .show(ctx, |ui| {
            let painter = ui.painter();

            for (label, transform) in &labels {
                let Ok(screen_pos) =
                    camera.world_to_viewport(camera_transform, transform.translation())
                else {
                    continue;
                };

                let label_pos = egui::pos2(screen_pos.x, screen_pos.y - settings.offset);
                let font = egui::FontId::proportional(settings.font_size);

                // Shadow
                painter.text(
                    label_pos + egui::vec2(1.0, 1.0),
                    egui::Align2::CENTER_BOTTOM,
                    &label.text,
                    font.clone(),
                    egui::Color32::from_rgba_unmultiplied(0, 0, 0, 180),
                );

                painter.text(
                    label_pos,
                    egui::Align2::CENTER_BOTTOM,
                    &label.text,
                    font,
                    egui::Color32::from_rgba_unmultiplied(220, 235, 255, 235),
                );
            }
        });
}
