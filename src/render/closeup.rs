//! Close-up viewport of the satellite.
//!
//! Clicking the satellite opens an isolated scene on its own render layer:
//! a star field, its own lights, a copy of the satellite asset at the origin
//! and an orbit controller. It is drawn by a second camera into a centred
//! rectangle of the window.
//!
//! Lifecycle is `Closed → Opening → Open → Closed`. Closing flips the
//! liveness flag first, so the per-frame systems of the close-up stop before
//! anything is torn down, then releases the camera, every modal entity and
//! the resize listener. Closing an already closed viewport does nothing.

use bevy::camera::visibility::RenderLayers;
use bevy::prelude::*;
use bevy::window::PrimaryWindow;
use bevy_egui::{EguiContexts, egui};

use crate::camera::{
    MainCamera, OrbitController, ResizeListeners, SceneViewport, ViewportFit, primary_window_size,
};
use crate::render::background::{StarfieldSettings, spawn_starfield};
use crate::render::satellite::{SatelliteActor, SatelliteLabel, spawn_procedural_model};
use crate::types::FrameSet;
use crate::ui::icons;

/// Request to open the close-up viewport.
#[derive(Message, Debug, Clone, Copy, Default)]
pub struct OpenCloseup;

/// Request to close the close-up viewport.
#[derive(Message, Debug, Clone, Copy, Default)]
pub struct CloseCloseup;

/// Close-up tuning.
#[derive(Resource, Debug, Clone)]
pub struct CloseupSettings {
    /// Fraction of each window dimension covered by the viewport.
    pub fraction: f32,
    pub start_distance: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    /// Spin of the satellite copy per frame in radians.
    pub spin: f32,
    /// Render layer of the close-up scene.
    pub layer: usize,
    pub stars: usize,
}

impl Default for CloseupSettings {
    fn default() -> Self {
        Self {
            fraction: 0.7,
            start_distance: 0.3,
            min_distance: 0.05,
            max_distance: 2.0,
            spin: 0.005,
            layer: 1,
            stars: 2000,
        }
    }
}

/// Entities of an open close-up.
#[derive(Debug, Clone)]
pub struct CloseupScene {
    pub camera: Entity,
    /// Copy of the satellite asset.
    pub subject: Entity,
    /// Every entity spawned for the close-up, camera and subject included.
    pub entities: Vec<Entity>,
    /// Name shown in the header.
    pub title: String,
}

/// Close-up lifecycle.
#[derive(Debug, Default)]
pub enum CloseupState {
    #[default]
    Closed,
    Opening,
    Open(CloseupScene),
}

/// The close-up viewport.
#[derive(Resource, Debug, Default)]
pub struct CloseupViewport {
    state: CloseupState,
    live: bool,
    /// Completed open/close cycles.
    pub opened: u32,
}

impl CloseupViewport {
    pub fn is_closed(&self) -> bool {
        matches!(self.state, CloseupState::Closed)
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, CloseupState::Open(_))
    }

    /// Whether the close-up's per-frame systems should run.
    pub fn is_live(&self) -> bool {
        self.live
    }

    pub fn state(&self) -> &CloseupState {
        &self.state
    }

    pub fn scene(&self) -> Option<&CloseupScene> {
        match &self.state {
            CloseupState::Open(scene) => Some(scene),
            _ => None,
        }
    }

    /// Tear the close-up down. Returns false when it was already closed.
    pub fn close(
        &mut self,
        commands: &mut Commands,
        listeners: &mut ResizeListeners,
        mut camera: Option<Mut<Camera>>,
    ) -> bool {
        if self.is_closed() {
            return false;
        }
        self.live = false;

        if let CloseupState::Open(scene) = std::mem::take(&mut self.state) {
            if let Some(camera) = camera.as_mut() {
                camera.is_active = false;
            }
            for entity in scene.entities {
                commands.entity(entity).try_despawn();
            }
            listeners.remove(scene.camera);
        }

        self.state = CloseupState::Closed;
        true
    }
}

/// Marker for the close-up camera.
#[derive(Component)]
pub struct CloseupCamera;

/// Marker for the satellite copy shown in the close-up.
#[derive(Component)]
pub struct CloseupSubject;

/// Plugin providing the close-up viewport.
pub struct CloseupPlugin;

impl Plugin for CloseupPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<CloseupSettings>()
            .init_resource::<CloseupViewport>()
            .init_resource::<ResizeListeners>()
            .add_message::<OpenCloseup>()
            .add_message::<CloseCloseup>()
            .add_systems(
                Update,
                (close_closeup, open_closeup).chain().in_set(FrameSet::Input),
            )
            .add_systems(
                Update,
                (spin_subject, propagate_closeup_layers)
                    .in_set(FrameSet::Animate)
                    .run_if(closeup_is_live),
            );
    }
}

/// Run condition: the close-up loop is live.
pub fn closeup_is_live(closeup: Res<CloseupViewport>) -> bool {
    closeup.is_live()
}

/// Build the close-up scene when asked to and nothing is open yet.
pub fn open_closeup(
    mut commands: Commands,
    mut requests: MessageReader<OpenCloseup>,
    mut closeup: ResMut<CloseupViewport>,
    mut listeners: ResMut<ResizeListeners>,
    settings: Res<CloseupSettings>,
    starfield: Option<Res<StarfieldSettings>>,
    actor: Res<SatelliteActor>,
    labels: Query<&SatelliteLabel>,
    window: Query<&Window, With<PrimaryWindow>>,
    mut main_controller: Query<&mut OrbitController, With<MainCamera>>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    if requests.read().count() == 0 || !closeup.is_closed() {
        return;
    }
    let Some(asset) = actor.asset() else {
        debug!("Close-up requested without a satellite asset");
        return;
    };

    closeup.state = CloseupState::Opening;
    let layer = RenderLayers::layer(settings.layer);
    let fit = ViewportFit::Centered {
        fraction: settings.fraction,
    };
    let window_size = primary_window_size(window.single().ok());
    let viewport = SceneViewport {
        size: fit.rect(window_size).1,
    };

    let mut controller = OrbitController::new(
        settings.start_distance,
        settings.min_distance,
        settings.max_distance,
    );
    controller.pitch = 0.3;

    let camera = commands
        .spawn((
            Camera3d::default(),
            Camera {
                order: 1,
                viewport: fit.viewport(window_size),
                clear_color: ClearColorConfig::Custom(Color::BLACK),
                ..default()
            },
            Projection::from(PerspectiveProjection {
                fov: 50f32.to_radians(),
                aspect_ratio: viewport.aspect_ratio(),
                near: 0.01,
                far: 1000.0,
                ..default()
            }),
            AmbientLight {
                color: Color::WHITE,
                brightness: 300.0,
                ..default()
            },
            controller.transform(),
            controller,
            viewport,
            layer.clone(),
            CloseupCamera,
        ))
        .id();

    let mut entities = vec![camera];

    let lights = [
        (Vec3::new(1.0, 1.0, 1.0), 6000.0),
        (Vec3::new(-1.0, -0.5, -1.0), 2000.0),
    ];
    for (position, illuminance) in lights {
        entities.push(
            commands
                .spawn((
                    DirectionalLight {
                        illuminance,
                        shadows_enabled: false,
                        ..default()
                    },
                    Transform::from_translation(position).looking_at(Vec3::ZERO, Vec3::Y),
                    layer.clone(),
                ))
                .id(),
        );
    }

    let stars = StarfieldSettings {
        count: settings.stars,
        ..starfield.map(|s| s.clone()).unwrap_or_default()
    };
    entities.extend(spawn_starfield(
        &mut commands,
        &mut meshes,
        &mut materials,
        &stars,
        Some(layer.clone()),
    ));

    let subject = match &asset.scene {
        Some(scene) => commands
            .spawn((SceneRoot(scene.clone()), layer.clone()))
            .id(),
        None => spawn_procedural_model(
            &mut commands,
            &mut meshes,
            &mut materials,
            asset.satellite.clone(),
            Some(layer.clone()),
        ),
    };
    commands
        .entity(subject)
        .insert((Transform::IDENTITY, CloseupSubject));
    entities.push(subject);

    listeners.register(camera, fit);
    if let Ok(mut main) = main_controller.single_mut() {
        main.enabled = false;
    }

    let title = actor
        .label()
        .and_then(|label| labels.get(label).ok())
        .map(|label| label.text.clone())
        .unwrap_or_else(|| asset.satellite.to_string());

    info!("Close-up opened for {}", title);
    closeup.state = CloseupState::Open(CloseupScene {
        camera,
        subject,
        entities,
        title,
    });
    closeup.live = true;
    closeup.opened += 1;
}

/// Close on request or on Escape.
pub fn close_closeup(
    mut commands: Commands,
    mut requests: MessageReader<CloseCloseup>,
    keys: Option<Res<ButtonInput<KeyCode>>>,
    mut closeup: ResMut<CloseupViewport>,
    mut listeners: ResMut<ResizeListeners>,
    mut cameras: Query<&mut Camera, With<CloseupCamera>>,
    mut main_controller: Query<&mut OrbitController, With<MainCamera>>,
) {
    let requested = requests.read().count() > 0;
    let escape = keys.is_some_and(|keys| keys.just_pressed(KeyCode::Escape));
    if !requested && !escape {
        return;
    }

    let camera = closeup
        .scene()
        .map(|scene| scene.camera)
        .and_then(|camera| cameras.get_mut(camera).ok());
    if closeup.close(&mut commands, &mut listeners, camera) {
        if let Ok(mut main) = main_controller.single_mut() {
            main.enabled = true;
        }
        info!("Close-up closed");
    }
}

/// Slow constant spin of the satellite copy.
fn spin_subject(
    settings: Res<CloseupSettings>,
    mut subjects: Query<&mut Transform, With<CloseupSubject>>,
) {
    for mut transform in &mut subjects {
        transform.rotate_y(settings.spin);
    }
}

/// Put late-spawned scene children of the copy on the close-up layer.
fn propagate_closeup_layers(
    mut commands: Commands,
    settings: Res<CloseupSettings>,
    subjects: Query<Entity, With<CloseupSubject>>,
    children: Query<&Children>,
    unlayered: Query<(), Without<RenderLayers>>,
) {
    for subject in &subjects {
        for descendant in children.iter_descendants(subject) {
            if unlayered.contains(descendant) {
                commands
                    .entity(descendant)
                    .insert(RenderLayers::layer(settings.layer));
            }
        }
    }
}

/// Header strip above the close-up viewport with a close button.
pub fn closeup_header(
    mut contexts: EguiContexts,
    closeup: Res<CloseupViewport>,
    cameras: Query<&Camera, With<CloseupCamera>>,
    window: Query<&Window, With<PrimaryWindow>>,
    mut close: MessageWriter<CloseCloseup>,
) {
    let Some(scene) = closeup.scene() else {
        return;
    };
    let Ok(ctx) = contexts.ctx_mut() else {
        return;
    };
    let scale = window.single().map(|w| w.scale_factor()).unwrap_or(1.0);
    let Some(viewport) = cameras
        .get(scene.camera)
        .ok()
        .and_then(|camera| camera.viewport.clone())
    else {
        return;
    };

    let origin = viewport.physical_position.as_vec2() / scale;
    let width = viewport.physical_size.x as f32 / scale;

    egui::Area::new(egui::Id::new("closeup_header"))
        .fixed_pos(egui::pos2(origin.x, (origin.y - 34.0).max(0.0)))
        .order(egui::Order::Foreground)
        .show(ctx, |ui| {
            egui::Frame::NONE
                .fill(egui::Color32::from_rgba_premultiplied(20, 24, 32, 235))
                .inner_margin(egui::Margin::symmetric(10, 6))
                .show(ui, |ui| {
                    ui.set_width(width - 20.0);
                    ui.horizontal(|ui| {
                        ui.label(
                            egui::RichText::new(&scene.title)
                                .strong()
                                .color(egui::Color32::WHITE),
                        );
                        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                            if ui
                                .button(egui::RichText::new(icons::CLOSE).size(16.0))
                                .on_hover_text("Close (Esc)")
                                .clicked()
                            {
                                close.write(CloseCloseup);
                            }
                        });
                    });
                });
        });
}
