//! Pointer picking against the satellite.
//!
//! The cursor is tracked in window coordinates and normalized to the main
//! camera's viewport. Each frame a ray is cast from the main camera through
//! the cursor and tested against the spheres of the [`PickableRegistry`].
//! Hover changes toggle the actor's glow and the pointing-hand cursor; a
//! click on the satellite asks the close-up viewport to open.

use bevy::prelude::*;
use bevy::window::PrimaryWindow;
use bevy_egui::input::EguiWantsInput;

use crate::camera::MainCamera;
use crate::render::closeup::{CloseupViewport, OpenCloseup};
use crate::render::satellite::SatelliteActor;

/// Pointer travel in pixels beyond which a press is a drag, not a click.
const CLICK_SLOP: f32 = 4.0;

/// Pick sphere attached to a pickable entity.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct PickTarget {
    pub radius: f32,
}

/// Entities eligible for ray intersection, with their pick radius.
#[derive(Resource, Debug, Default)]
pub struct PickableRegistry {
    entries: Vec<(Entity, f32)>,
}

impl PickableRegistry {
    /// Replace every entry.
    pub fn rebuild(&mut self, entries: impl IntoIterator<Item = (Entity, f32)>) {
        self.entries.clear();
        self.entries.extend(entries);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn contains(&self, entity: Entity) -> bool {
        self.entries.iter().any(|(e, _)| *e == entity)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Entity, f32)> + '_ {
        self.entries.iter().copied()
    }
}

/// Cursor state and the pick ray cast through it.
#[derive(Resource, Debug, Default)]
pub struct PointerState {
    /// Cursor in logical window pixels; `None` when outside the window or
    /// captured by the UI.
    pub cursor: Option<Vec2>,
    /// Cursor in [-1, 1] per axis of the main viewport, y up.
    pub ndc: Option<Vec2>,
    /// Ray from the main camera through the cursor.
    pub ray: Option<Ray3d>,
    /// Set for the frame in which a left click (press and release without
    /// dragging) completed.
    pub clicked: bool,
    press_origin: Option<Vec2>,
    travel: f32,
}

/// Hover edge reported by [`HoverState::observe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoverTransition {
    Entered,
    Left,
}

/// Which pickable, if any, is under the pointer.
#[derive(Resource, Debug, Default)]
pub struct HoverState {
    pub hovered: Option<Entity>,
}

impl HoverState {
    /// Record the latest hit. Only a change between "something" and
    /// "nothing" produces a transition.
    pub fn observe(&mut self, hit: Option<Entity>) -> Option<HoverTransition> {
        let was = self.hovered.is_some();
        self.hovered = hit;
        match (was, hit.is_some()) {
            (false, true) => Some(HoverTransition::Entered),
            (true, false) => Some(HoverTransition::Left),
            _ => None,
        }
    }
}

/// Whether the pointer should show the pointing-hand cue.
#[derive(Resource, Debug, Default)]
pub struct PointerCue {
    pub pointing: bool,
}

/// Map a position relative to a viewport's top-left corner to [-1, 1] per
/// axis, y up.
pub fn cursor_to_ndc(cursor: Vec2, viewport_size: Vec2) -> Vec2 {
    let size = viewport_size.max(Vec2::ONE);
    Vec2::new(cursor.x / size.x * 2.0 - 1.0, -(cursor.y / size.y * 2.0 - 1.0))
}

/// Distance along the ray to the first intersection with a sphere.
pub fn ray_sphere(ray: Ray3d, center: Vec3, radius: f32) -> Option<f32> {
    let to_center = center - ray.origin;
    let along = to_center.dot(*ray.direction);
    let closest_sq = to_center.length_squared() - along * along;
    let radius_sq = radius * radius;
    if closest_sq > radius_sq {
        return None;
    }
    let half_chord = (radius_sq - closest_sq).sqrt();
    let near = along - half_chord;
    let far = along + half_chord;
    if far < 0.0 {
        None
    } else if near >= 0.0 {
        Some(near)
    } else {
        Some(far)
    }
}

/// Nearest registry entry hit by the ray.
pub fn pick(
    ray: Ray3d,
    registry: &PickableRegistry,
    position: impl Fn(Entity) -> Option<Vec3>,
) -> Option<Entity> {
    registry
        .iter()
        .filter_map(|(entity, radius)| {
            let center = position(entity)?;
            ray_sphere(ray, center, radius).map(|t| (entity, t))
        })
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(entity, _)| entity)
}

/// Track cursor position and detect clicks.
pub fn track_pointer(
    window: Query<&Window, With<PrimaryWindow>>,
    mouse_buttons: Option<Res<ButtonInput<MouseButton>>>,
    egui_input: Option<Res<EguiWantsInput>>,
    mut pointer: ResMut<PointerState>,
) {
    pointer.clicked = false;

    let position = window.single().ok().and_then(Window::cursor_position);
    let over_ui = egui_input.is_some_and(|input| input.wants_any_pointer_input());
    pointer.cursor = position.filter(|_| !over_ui);

    let Some(buttons) = mouse_buttons else {
        return;
    };

    if buttons.just_pressed(MouseButton::Left) {
        pointer.press_origin = position.filter(|_| !over_ui);
        pointer.travel = 0.0;
    } else if buttons.pressed(MouseButton::Left)
        && let (Some(origin), Some(position)) = (pointer.press_origin, position)
    {
        pointer.travel = pointer.travel.max(origin.distance(position));
    }

    if buttons.just_released(MouseButton::Left) {
        if pointer.press_origin.take().is_some() && pointer.travel <= CLICK_SLOP {
            pointer.clicked = true;
        }
        pointer.travel = 0.0;
    }
}

/// Cast the pick ray through the cursor from the main camera.
pub fn cast_pointer_ray(
    mut pointer: ResMut<PointerState>,
    camera: Query<(&Camera, &GlobalTransform), With<MainCamera>>,
) {
    let cast = pointer.cursor.and_then(|cursor| {
        let (camera, transform) = camera.single().ok()?;
        let viewport = camera.logical_viewport_rect()?;
        let ray = camera.viewport_to_world(transform, cursor).ok()?;
        Some((cursor_to_ndc(cursor - viewport.min, viewport.size()), ray))
    });
    pointer.ndc = cast.map(|(ndc, _)| ndc);
    pointer.ray = cast.map(|(_, ray)| ray);
}

/// Ray-pick the satellite, drive hover glow and open the close-up on click.
///
/// Pick centres come from `Transform`: pickables are root entities moved
/// earlier in the frame, and their `GlobalTransform` is only propagated in
/// `PostUpdate`.
pub fn update_hover(
    pointer: Res<PointerState>,
    registry: Res<PickableRegistry>,
    closeup: Res<CloseupViewport>,
    transforms: Query<&Transform, With<PickTarget>>,
    mut hover: ResMut<HoverState>,
    mut actor: ResMut<SatelliteActor>,
    mut cue: ResMut<PointerCue>,
    mut open: MessageWriter<OpenCloseup>,
) {
    let hit = pointer.ray.filter(|_| closeup.is_closed()).and_then(|ray| {
        pick(ray, &registry, |entity| {
            transforms.get(entity).ok().map(|transform| transform.translation)
        })
    });

    match hover.observe(hit) {
        Some(HoverTransition::Entered) => {
            actor.set_glow(true);
            cue.pointing = true;
        }
        Some(HoverTransition::Left) => {
            actor.set_glow(false);
            cue.pointing = false;
        }
        None => {}
    }

    if pointer.clicked && hit.is_some() {
        open.write(OpenCloseup);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn ray(origin: Vec3, direction: Vec3) -> Ray3d {
        Ray3d::new(origin, Dir3::new(direction).unwrap())
    }

    #[test]
    fn test_cursor_to_ndc_corners() {
        let size = Vec2::new(800.0, 600.0);
        assert_eq!(cursor_to_ndc(Vec2::ZERO, size), Vec2::new(-1.0, 1.0));
        assert_eq!(cursor_to_ndc(size, size), Vec2::new(1.0, -1.0));
        assert_eq!(cursor_to_ndc(size / 2.0, size), Vec2::ZERO);
    }

    #[test]
    fn test_ray_sphere_hit_and_miss() {
        let r = ray(Vec3::new(0.0, 0.0, 5.0), Vec3::NEG_Z);
        assert_relative_eq!(ray_sphere(r, Vec3::ZERO, 1.0).unwrap(), 4.0, epsilon = 1e-5);
        assert!(ray_sphere(r, Vec3::new(2.0, 0.0, 0.0), 1.0).is_none());
        // Sphere behind the origin
        assert!(ray_sphere(r, Vec3::new(0.0, 0.0, 10.0), 1.0).is_none());
    }

    #[test]
    fn test_pick_prefers_nearest() {
        let near = Entity::from_raw_u32(1).unwrap();
        let far = Entity::from_raw_u32(2).unwrap();
        let mut registry = PickableRegistry::default();
        registry.rebuild([(far, 0.5), (near, 0.5)]);
        let positions = |e: Entity| {
            if e == near {
                Some(Vec3::new(0.0, 0.0, 2.0))
            } else {
                Some(Vec3::ZERO)
            }
        };
        let r = ray(Vec3::new(0.0, 0.0, 5.0), Vec3::NEG_Z);
        assert_eq!(pick(r, &registry, positions), Some(near));
    }

    #[test]
    fn test_hover_transitions_only_on_change() {
        let target = Entity::from_raw_u32(3).unwrap();
        let mut hover = HoverState::default();
        assert_eq!(hover.observe(None), None);
        assert_eq!(hover.observe(Some(target)), Some(HoverTransition::Entered));
        assert_eq!(hover.observe(Some(target)), None);
        assert_eq!(hover.observe(None), Some(HoverTransition::Left));
        assert_eq!(hover.observe(None), None);
    }
}
