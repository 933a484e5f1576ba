//! Transient notifications and the loading indicator.
//!
//! Errors from the network and the asset loader, and tracking status, arrive
//! as [`Notification`] messages. Each becomes a toast in the top-right corner that dismisses
//! itself after a few seconds.

use std::time::Duration;

use bevy::prelude::*;
use bevy_egui::{EguiContexts, egui};

use crate::render::satellite::SatelliteActor;
use crate::tracking::TrackingState;

use super::icons;

/// How long a toast stays on screen.
pub const TOAST_LIFETIME: Duration = Duration::from_secs(5);

/// Most toasts shown at once; older ones are dropped first.
const MAX_TOASTS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Error,
}

/// A message for the user.
#[derive(Message, Debug, Clone, PartialEq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub text: String,
}

impl Notification {
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            text: text.into(),
        }
    }

    pub fn info(text: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Info,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Toast {
    pub notification: Notification,
    pub remaining: Timer,
}

/// Toasts currently on screen.
#[derive(Resource, Debug, Default)]
pub struct Toasts {
    toasts: Vec<Toast>,
}

impl Toasts {
    pub fn push(&mut self, notification: Notification) {
        // Same text already showing: restart its timer instead of stacking
        if let Some(existing) = self
            .toasts
            .iter_mut()
            .find(|t| t.notification == notification)
        {
            existing.remaining.reset();
            return;
        }
        self.toasts.push(Toast {
            notification,
            remaining: Timer::new(TOAST_LIFETIME, TimerMode::Once),
        });
        if self.toasts.len() > MAX_TOASTS {
            self.toasts.remove(0);
        }
    }

    /// Advance lifetimes and drop expired toasts.
    pub fn tick(&mut self, delta: Duration) {
        for toast in &mut self.toasts {
            toast.remaining.tick(delta);
        }
        self.toasts.retain(|t| !t.remaining.is_finished());
    }

    pub fn len(&self) -> usize {
        self.toasts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.toasts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Toast> {
        self.toasts.iter()
    }
}

/// Plugin collecting notifications into toasts.
///
/// Drawing lives in the UI plugin; collection runs headless too.
pub struct NotificationPlugin;

impl Plugin for NotificationPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<Toasts>()
            .add_message::<Notification>()
            .add_systems(Update, collect_notifications);
    }
}

/// Turn new notifications into toasts and expire old ones.
pub fn collect_notifications(
    mut incoming: MessageReader<Notification>,
    mut toasts: ResMut<Toasts>,
    time: Res<Time>,
) {
    toasts.tick(time.delta());
    for notification in incoming.read() {
        toasts.push(notification.clone());
    }
}

/// Draw toasts and the loading indicator.
pub fn draw_notifications(
    mut contexts: EguiContexts,
    toasts: Res<Toasts>,
    actor: Res<SatelliteActor>,
    tracking: Option<Res<TrackingState>>,
) {
    let Ok(ctx) = contexts.ctx_mut() else {
        return;
    };

    let loading = actor.is_loading() || tracking.is_some_and(|t| t.is_bootstrapping());
    if loading {
        egui::Area::new(egui::Id::new("loading_indicator"))
            .anchor(egui::Align2::CENTER_BOTTOM, [0.0, -24.0])
            .interactable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.spinner();
                    ui.label(icons::icon_colored(
                        icons::GLOBE,
                        16.0,
                        egui::Color32::from_rgb(150, 190, 255),
                    ));
                    ui.label("Loading satellite...");
                });
            });
    }

    if toasts.is_empty() {
        return;
    }

    egui::Area::new(egui::Id::new("notifications"))
        .anchor(egui::Align2::RIGHT_TOP, [-16.0, 16.0])
        .order(egui::Order::Foreground)
        .show(ctx, |ui| {
            ui.set_max_width(320.0);
            for toast in toasts.iter() {
                let (icon, color) = match toast.notification.level {
                    NotificationLevel::Error => {
                        (icons::WARNING, egui::Color32::from_rgb(224, 85, 85))
                    }
                    NotificationLevel::Info => (icons::INFO, egui::Color32::from_rgb(85, 153, 221)),
                };
                // Fade out over the last second
                let alpha = toast.remaining.remaining_secs().clamp(0.0, 1.0);
                let fill = egui::Color32::from_rgba_unmultiplied(40, 24, 24, (235.0 * alpha) as u8);

                egui::Frame::NONE
                    .fill(fill)
                    .stroke(egui::Stroke::new(1.0, color.gamma_multiply(alpha)))
                    .corner_radius(6.0)
                    .inner_margin(egui::Margin::symmetric(12, 8))
                    .show(ui, |ui| {
                        ui.horizontal(|ui| {
                            ui.label(icons::icon_colored(icon, 18.0, color.gamma_multiply(alpha)));
                            ui.label(
                                egui::RichText::new(&toast.notification.text)
                                    .color(egui::Color32::WHITE.gamma_multiply(alpha)),
                            );
                        });
                    });
                ui.add_space(6.0);
            }
        });
}
