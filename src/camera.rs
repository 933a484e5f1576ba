//! Cameras, orbit controls and viewport resizing.
//!
//! The main camera looks at the globe from a distance of 3 units and is
//! driven by an [`OrbitController`]: left drag rotates around the target,
//! the scroll wheel dollies in and out, and rotation eases out with damping.
//! The close-up viewport reuses the same controller with its own limits.
//!
//! Window resizes are delivered to every camera registered in
//! [`ResizeListeners`]. Each listener gets its viewport rectangle and its
//! projection's aspect ratio updated in the same system.

use std::f32::consts::{FRAC_PI_2, TAU};

use bevy::{
    camera::Viewport,
    input::mouse::{AccumulatedMouseMotion, AccumulatedMouseScroll},
    prelude::*,
    window::{PrimaryWindow, WindowResized},
};
use bevy_egui::input::EguiWantsInput;

use crate::types::FrameSet;

/// Window size used before a window exists (headless runs).
pub const FALLBACK_WINDOW_SIZE: UVec2 = UVec2::new(1280, 720);

/// Keep pitch away from the poles so `looking_at` stays well defined.
const PITCH_LIMIT: f32 = FRAC_PI_2 - 0.01;

/// Marker component for the main camera.
#[derive(Component)]
pub struct MainCamera;

/// Tuning of the main camera and its orbit controls.
#[derive(Resource, Debug, Clone)]
pub struct OrbitControlSettings {
    /// Vertical field of view in degrees.
    pub fov_degrees: f32,
    /// Initial distance from the globe centre.
    pub start_distance: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    /// Fraction of the pending rotation applied per frame.
    pub damping: f32,
    pub rotate_speed: f32,
    /// Distance multiplier per scroll line.
    pub zoom_step: f32,
}

impl Default for OrbitControlSettings {
    fn default() -> Self {
        Self {
            fov_degrees: 75.0,
            start_distance: 3.0,
            min_distance: 1.5,
            max_distance: 10.0,
            damping: 0.05,
            rotate_speed: 0.5,
            zoom_step: 0.95,
        }
    }
}

/// Orbit-style camera controller around a fixed target.
#[derive(Component, Debug, Clone, PartialEq)]
pub struct OrbitController {
    pub target: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub distance: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    pub damping: f32,
    pub rotate_speed: f32,
    pub zoom_step: f32,
    /// Disabled controllers ignore input but still settle pending motion.
    pub enabled: bool,
    pending_yaw: f32,
    pending_pitch: f32,
}

impl OrbitController {
    pub fn new(distance: f32, min_distance: f32, max_distance: f32) -> Self {
        Self {
            target: Vec3::ZERO,
            yaw: 0.0,
            pitch: 0.0,
            distance: distance.clamp(min_distance, max_distance),
            min_distance,
            max_distance,
            damping: 0.05,
            rotate_speed: 0.5,
            zoom_step: 0.95,
            enabled: true,
            pending_yaw: 0.0,
            pending_pitch: 0.0,
        }
    }

    pub fn from_settings(settings: &OrbitControlSettings) -> Self {
        Self {
            damping: settings.damping,
            rotate_speed: settings.rotate_speed,
            zoom_step: settings.zoom_step,
            ..Self::new(
                settings.start_distance,
                settings.min_distance,
                settings.max_distance,
            )
        }
    }

    /// Queue a rotation from a pointer drag of `delta` pixels.
    ///
    /// A drag across the full viewport height turns the view by one full
    /// revolution times `rotate_speed`.
    pub fn rotate(&mut self, delta: Vec2, viewport_height: f32) {
        let height = viewport_height.max(1.0);
        self.pending_yaw -= TAU * delta.x / height * self.rotate_speed;
        self.pending_pitch += TAU * delta.y / height * self.rotate_speed;
    }

    /// Dolly by `lines` scroll lines; positive moves closer.
    pub fn zoom(&mut self, lines: f32) {
        self.distance = (self.distance * self.zoom_step.powf(lines))
            .clamp(self.min_distance, self.max_distance);
    }

    /// Apply one frame of damped motion.
    pub fn step(&mut self) {
        self.yaw += self.pending_yaw * self.damping;
        self.pitch =
            (self.pitch + self.pending_pitch * self.damping).clamp(-PITCH_LIMIT, PITCH_LIMIT);
        self.pending_yaw *= 1.0 - self.damping;
        self.pending_pitch *= 1.0 - self.damping;
    }

    /// Camera position for the current angles and distance.
    pub fn eye(&self) -> Vec3 {
        let (sin_yaw, cos_yaw) = self.yaw.sin_cos();
        let (sin_pitch, cos_pitch) = self.pitch.sin_cos();
        self.target + self.distance * Vec3::new(cos_pitch * sin_yaw, sin_pitch, cos_pitch * cos_yaw)
    }

    pub fn transform(&self) -> Transform {
        Transform::from_translation(self.eye()).looking_at(self.target, Vec3::Y)
    }

    pub fn is_settled(&self) -> bool {
        self.pending_yaw.abs() < 1e-6 && self.pending_pitch.abs() < 1e-6
    }
}

/// How a resize listener's viewport follows the window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ViewportFit {
    /// The whole window.
    Full,
    /// A centred rectangle covering `fraction` of each window dimension.
    Centered { fraction: f32 },
}

impl ViewportFit {
    /// Physical position and size of the viewport for a window size.
    pub fn rect(&self, window: UVec2) -> (UVec2, UVec2) {
        match *self {
            ViewportFit::Full => (UVec2::ZERO, window.max(UVec2::ONE)),
            ViewportFit::Centered { fraction } => {
                let fraction = fraction.clamp(0.05, 1.0);
                let size = (window.as_vec2() * fraction).round().as_uvec2().max(UVec2::ONE);
                let position = (window - size.min(window)) / 2;
                (position, size)
            }
        }
    }

    /// Camera viewport for a window size; `None` means the full target.
    pub fn viewport(&self, window: UVec2) -> Option<Viewport> {
        match self {
            ViewportFit::Full => None,
            ViewportFit::Centered { .. } => {
                let (physical_position, physical_size) = self.rect(window);
                Some(Viewport {
                    physical_position,
                    physical_size,
                    ..default()
                })
            }
        }
    }
}

/// Current size in physical pixels of the area a camera renders to.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq)]
pub struct SceneViewport {
    pub size: UVec2,
}

impl SceneViewport {
    pub fn aspect_ratio(&self) -> f32 {
        let size = self.size.max(UVec2::ONE).as_vec2();
        size.x / size.y
    }
}

/// Cameras that follow window resizes.
#[derive(Resource, Debug, Default)]
pub struct ResizeListeners {
    listeners: Vec<(Entity, ViewportFit)>,
}

impl ResizeListeners {
    /// Register (or re-register) a camera.
    pub fn register(&mut self, camera: Entity, fit: ViewportFit) {
        self.remove(camera);
        self.listeners.push((camera, fit));
    }

    /// Returns true if the camera was registered.
    pub fn remove(&mut self, camera: Entity) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(entity, _)| *entity != camera);
        self.listeners.len() != before
    }

    pub fn contains(&self, camera: Entity) -> bool {
        self.listeners.iter().any(|(entity, _)| *entity == camera)
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Entity, ViewportFit)> + '_ {
        self.listeners.iter().copied()
    }
}

/// Plugin providing the main camera, orbit controls and resize dispatch.
pub struct CameraPlugin;

impl Plugin for CameraPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<OrbitControlSettings>()
            .init_resource::<ResizeListeners>()
            .add_message::<WindowResized>()
            .add_systems(Startup, setup_camera)
            .add_systems(
                Update,
                (dispatch_resize, orbit_controller_input).in_set(FrameSet::Input),
            )
            .add_systems(Update, apply_orbit_controllers.in_set(FrameSet::Animate));
    }
}

/// Physical size of the primary window, if there is one.
pub fn primary_window_size(window: Option<&Window>) -> UVec2 {
    window
        .map(|w| UVec2::new(w.physical_width(), w.physical_height()))
        .filter(|size| size.x > 0 && size.y > 0)
        .unwrap_or(FALLBACK_WINDOW_SIZE)
}

/// Spawn the main perspective camera and register it for resizes.
fn setup_camera(
    mut commands: Commands,
    settings: Res<OrbitControlSettings>,
    mut listeners: ResMut<ResizeListeners>,
    window: Query<&Window, With<PrimaryWindow>>,
) {
    let size = primary_window_size(window.single().ok());
    let controller = OrbitController::from_settings(&settings);
    let viewport = SceneViewport { size };

    let camera = commands
        .spawn((
            Camera3d::default(),
            Projection::from(PerspectiveProjection {
                fov: settings.fov_degrees.to_radians(),
                aspect_ratio: viewport.aspect_ratio(),
                near: 0.1,
                far: 1000.0,
                ..default()
            }),
            controller.transform(),
            controller,
            viewport,
            MainCamera,
        ))
        .id();

    listeners.register(camera, ViewportFit::Full);
    info!("Main camera ready at distance {}", settings.start_distance);
}

/// Apply window resizes to every registered camera.
///
/// Viewport rectangle, aspect ratio and [`SceneViewport`] size are written
/// together so no frame renders with a mismatched projection.
pub fn dispatch_resize(
    mut resized: MessageReader<WindowResized>,
    windows: Query<&Window>,
    listeners: Res<ResizeListeners>,
    mut cameras: Query<(&mut Camera, &mut Projection, &mut SceneViewport)>,
) {
    let Some(event) = resized.read().last() else {
        return;
    };

    let scale = windows
        .get(event.window)
        .map(|window| window.scale_factor())
        .unwrap_or(1.0);
    let window_size = (Vec2::new(event.width, event.height) * scale)
        .round()
        .as_uvec2()
        .max(UVec2::ONE);

    for (entity, fit) in listeners.iter() {
        let Ok((mut camera, mut projection, mut viewport)) = cameras.get_mut(entity) else {
            continue;
        };
        camera.viewport = fit.viewport(window_size);
        viewport.size = fit.rect(window_size).1;
        if let Projection::Perspective(ref mut perspective) = *projection {
            perspective.aspect_ratio = viewport.aspect_ratio();
        }
    }

    debug!("Resized {} viewport(s) to {}", listeners.len(), window_size);
}

/// Feed pointer drag and scroll into enabled orbit controllers.
fn orbit_controller_input(
    mouse_buttons: Option<Res<ButtonInput<MouseButton>>>,
    mouse_motion: Option<Res<AccumulatedMouseMotion>>,
    mouse_scroll: Option<Res<AccumulatedMouseScroll>>,
    egui_input: Option<Res<EguiWantsInput>>,
    mut controllers: Query<(&mut OrbitController, &SceneViewport)>,
) {
    if egui_input.is_some_and(|input| input.wants_any_pointer_input()) {
        return;
    }

    let dragging = mouse_buttons.is_some_and(|buttons| buttons.pressed(MouseButton::Left));
    let drag = mouse_motion.map(|motion| motion.delta).unwrap_or(Vec2::ZERO);
    let scroll = mouse_scroll.map(|scroll| scroll.delta.y).unwrap_or(0.0);

    if (!dragging || drag == Vec2::ZERO) && scroll == 0.0 {
        return;
    }

    for (mut controller, viewport) in &mut controllers {
        if !controller.enabled {
            continue;
        }
        if dragging {
            controller.rotate(drag, viewport.size.y as f32);
        }
        if scroll != 0.0 {
            controller.zoom(scroll);
        }
    }
}

/// Advance damping and write controller poses into camera transforms.
fn apply_orbit_controllers(mut controllers: Query<(&mut OrbitController, &mut Transform)>) {
    for (mut controller, mut transform) in &mut controllers {
        controller.step();
        *transform = controller.transform();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_default_controller_starts_on_positive_z() {
        let controller = OrbitController::from_settings(&OrbitControlSettings::default());
        let eye = controller.eye();
        assert_relative_eq!(eye.z, 3.0, epsilon = 1e-6);
        assert_relative_eq!(eye.x, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_zoom_is_clamped() {
        let mut controller = OrbitController::new(3.0, 1.5, 10.0);
        controller.zoom(500.0);
        assert_eq!(controller.distance, 1.5);
        controller.zoom(-500.0);
        assert_eq!(controller.distance, 10.0);
    }

    #[test]
    fn test_rotation_eases_out() {
        let mut controller = OrbitController::new(3.0, 1.5, 10.0);
        controller.rotate(Vec2::new(-100.0, 0.0), 800.0);
        controller.step();
        let first = controller.yaw;
        controller.step();
        let second = controller.yaw - first;
        assert!(first > 0.0);
        assert!(second > 0.0 && second < first);
        for _ in 0..2000 {
            controller.step();
        }
        assert!(controller.is_settled());
    }

    #[test]
    fn test_pitch_never_reaches_pole() {
        let mut controller = OrbitController::new(3.0, 1.5, 10.0);
        controller.rotate(Vec2::new(0.0, 1.0e6), 100.0);
        for _ in 0..100 {
            controller.step();
        }
        assert!(controller.pitch <= PITCH_LIMIT);
    }

    #[test]
    fn test_centered_fit_is_centered() {
        let fit = ViewportFit::Centered { fraction: 0.7 };
        let (position, size) = fit.rect(UVec2::new(1000, 800));
        assert_eq!(size, UVec2::new(700, 560));
        assert_eq!(position, UVec2::new(150, 120));
        assert!(ViewportFit::Full.viewport(UVec2::new(10, 10)).is_none());
    }

    #[test]
    fn test_listeners_register_and_remove() {
        let mut listeners = ResizeListeners::default();
        let camera = Entity::from_raw_u32(7).unwrap();
        listeners.register(camera, ViewportFit::Full);
        listeners.register(camera, ViewportFit::Centered { fraction: 0.5 });
        assert_eq!(listeners.len(), 1);
        assert!(listeners.remove(camera));
        assert!(!listeners.remove(camera));
        assert!(listeners.is_empty());
    }
}
