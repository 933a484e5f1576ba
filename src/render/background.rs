//! Star field and scene lighting.
//!
//! The same star field builder serves the primary scene and the close-up
//! viewport; the latter passes its own render layer.

use bevy::camera::visibility::RenderLayers;
use bevy::prelude::*;
use rand::Rng;

/// Settings for the background star field.
#[derive(Resource, Debug, Clone)]
pub struct StarfieldSettings {
    pub count: usize,
    /// Radius of the shell the stars are scattered on.
    pub radius: f32,
    /// Star sphere radius range.
    pub size: (f32, f32),
}

impl Default for StarfieldSettings {
    fn default() -> Self {
        Self {
            count: 5000,
            radius: 300.0,
            size: (0.25, 0.6),
        }
    }
}

/// Marker for star entities.
#[derive(Component)]
pub struct Star;

/// Spawn a star field of randomly placed stars.
///
/// Stars share one mesh and one unlit material. Returns the spawned entities.
pub fn spawn_starfield(
    commands: &mut Commands,
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<StandardMaterial>,
    settings: &StarfieldSettings,
    layer: Option<RenderLayers>,
) -> Vec<Entity> {
    let star_material = materials.add(StandardMaterial {
        base_color: Color::WHITE,
        emissive: LinearRgba::WHITE * 0.5,
        unlit: true,
        ..default()
    });
    let star_mesh = meshes.add(Sphere::new(1.0).mesh().uv(8, 6));

    let mut rng = rand::thread_rng();
    let mut stars = Vec::with_capacity(settings.count);

    for _ in 0..settings.count {
        // Uniform direction, radius jittered so the shell has some depth
        let direction = Vec3::new(
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
        )
        .try_normalize()
        .unwrap_or(Vec3::X);
        let distance = settings.radius * rng.gen_range(0.8..1.2);
        let scale = rng.gen_range(settings.size.0..settings.size.1);

        let mut star = commands.spawn((
            Mesh3d(star_mesh.clone()),
            MeshMaterial3d(star_material.clone()),
            Transform::from_translation(direction * distance).with_scale(Vec3::splat(scale)),
            Star,
        ));
        if let Some(layer) = &layer {
            star.insert(layer.clone());
        }
        stars.push(star.id());
    }

    stars
}

/// Spawn lighting for the primary scene.
///
/// A dim global ambient term, a sun-like key light and a weaker fill light
/// from the opposite side.
pub fn spawn_lighting(commands: &mut Commands) -> Vec<Entity> {
    commands.insert_resource(GlobalAmbientLight {
        color: Color::srgb_u8(0x33, 0x33, 0x33),
        brightness: 400.0,
        ..default()
    });

    let sun = commands
        .spawn((
            DirectionalLight {
                illuminance: 5000.0,
                shadows_enabled: false,
                ..default()
            },
            Transform::from_xyz(5.0, 3.0, 5.0).looking_at(Vec3::ZERO, Vec3::Y),
        ))
        .id();

    let fill = commands
        .spawn((
            DirectionalLight {
                illuminance: 1500.0,
                shadows_enabled: false,
                ..default()
            },
            Transform::from_xyz(-5.0, -3.0, -5.0).looking_at(Vec3::ZERO, Vec3::Y),
        ))
        .id();

    info!("Scene lighting initialized");
    vec![sun, fill]
}
