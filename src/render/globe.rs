//! Primary scene: globe, cloud shell, atmosphere, star field and lights.
//!
//! [`build_primary_scene`] is idempotent; the [`PrimaryScene`] resource is
//! the guard and holds the handles of the long-lived entities.

use bevy::mesh::VertexAttributeValues;
use bevy::prelude::*;

use crate::camera::MainCamera;
use crate::config::ViewerConfig;
use crate::render::background::{StarfieldSettings, spawn_lighting, spawn_starfield};
use crate::types::GLOBE_RADIUS;

/// Cloud shell radius relative to the globe.
pub const CLOUD_RADIUS: f32 = 1.01;
/// Atmosphere shell radius relative to the globe.
pub const ATMOSPHERE_RADIUS: f32 = 1.04;
/// Globe yaw per frame in radians.
pub const GLOBE_SPIN: f32 = 0.0005;
/// Cloud yaw per frame in radians.
pub const CLOUD_SPIN: f32 = 0.0007;

/// Entities of the primary scene.
#[derive(Resource, Debug, Clone)]
pub struct PrimaryScene {
    pub globe: Entity,
    pub clouds: Entity,
    pub atmosphere: Entity,
    pub lights: Vec<Entity>,
    pub stars: usize,
}

#[derive(Component)]
pub struct Globe;

#[derive(Component)]
pub struct CloudLayer;

/// Rim lighting state of the atmosphere shell.
///
/// The shell's vertex colours carry a fresnel term `(1 - n·v)^power`. The
/// view direction is refreshed once per tick from the main camera.
#[derive(Component, Debug, Clone)]
pub struct AtmosphereRim {
    /// Unit direction from the globe centre towards the viewer.
    pub view_dir: Vec3,
    pub color: LinearRgba,
    pub power: f32,
    pub intensity: f32,
    mesh: Handle<Mesh>,
    normals: Vec<Vec3>,
}

impl AtmosphereRim {
    /// Rim glow colour for one vertex normal.
    pub fn vertex_color(&self, normal: Vec3) -> [f32; 4] {
        let facing = normal.dot(self.view_dir).clamp(0.0, 1.0);
        let rim = (1.0 - facing).powf(self.power) * self.intensity;
        [
            self.color.red * rim,
            self.color.green * rim,
            self.color.blue * rim,
            rim.min(1.0),
        ]
    }

    fn colors(&self) -> Vec<[f32; 4]> {
        self.normals.iter().map(|n| self.vertex_color(*n)).collect()
    }
}

/// Build the globe, clouds, atmosphere, star field and lights once.
///
/// Calling it again after the scene exists does nothing.
pub fn build_primary_scene(
    mut commands: Commands,
    existing: Option<Res<PrimaryScene>>,
    config: Option<Res<ViewerConfig>>,
    starfield: Option<Res<StarfieldSettings>>,
    asset_server: Option<Res<AssetServer>>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    if existing.is_some() {
        debug!("Primary scene already built");
        return;
    }

    let config = config.map(|c| c.clone()).unwrap_or_default();
    let load = |path: &str| {
        asset_server
            .as_ref()
            .map(|server| server.load::<Image>(path.to_string()))
    };

    let globe_material = materials.add(StandardMaterial {
        base_color_texture: load(&config.globe_texture),
        perceptual_roughness: 0.9,
        ..default()
    });
    let globe = commands
        .spawn((
            Mesh3d(meshes.add(Sphere::new(GLOBE_RADIUS).mesh().uv(64, 64))),
            MeshMaterial3d(globe_material),
            Transform::default(),
            Globe,
        ))
        .id();

    let cloud_material = materials.add(StandardMaterial {
        base_color: Color::srgba(1.0, 1.0, 1.0, 0.4),
        base_color_texture: load(&config.cloud_texture),
        alpha_mode: AlphaMode::Blend,
        perceptual_roughness: 1.0,
        ..default()
    });
    let clouds = commands
        .spawn((
            Mesh3d(meshes.add(Sphere::new(GLOBE_RADIUS * CLOUD_RADIUS).mesh().uv(64, 64))),
            MeshMaterial3d(cloud_material),
            Transform::default(),
            CloudLayer,
        ))
        .id();

    let atmosphere = spawn_atmosphere(&mut commands, &mut meshes, &mut materials);

    let settings = starfield.map(|s| s.clone()).unwrap_or_default();
    let stars = spawn_starfield(&mut commands, &mut meshes, &mut materials, &settings, None);
    let lights = spawn_lighting(&mut commands);

    commands.insert_resource(PrimaryScene {
        globe,
        clouds,
        atmosphere,
        lights,
        stars: stars.len(),
    });

    info!("Primary scene built with {} stars", stars.len());
}

fn spawn_atmosphere(
    commands: &mut Commands,
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<StandardMaterial>,
) -> Entity {
    let mesh = Sphere::new(GLOBE_RADIUS * ATMOSPHERE_RADIUS).mesh().uv(48, 48);
    let normals = match mesh.attribute(Mesh::ATTRIBUTE_NORMAL) {
        Some(VertexAttributeValues::Float32x3(normals)) => {
            normals.iter().map(|n| Vec3::from_array(*n)).collect()
        }
        _ => Vec::new(),
    };

    let mut rim = AtmosphereRim {
        view_dir: Vec3::Z,
        color: LinearRgba::rgb(0.3, 0.6, 1.0),
        power: 3.0,
        intensity: 1.2,
        mesh: Handle::default(),
        normals,
    };
    let colors = rim.colors();
    let handle = meshes.add(mesh.with_inserted_attribute(Mesh::ATTRIBUTE_COLOR, colors));
    rim.mesh = handle.clone();

    let material = materials.add(StandardMaterial {
        base_color: Color::WHITE,
        unlit: true,
        alpha_mode: AlphaMode::Add,
        cull_mode: None,
        ..default()
    });

    commands
        .spawn((Mesh3d(handle), MeshMaterial3d(material), Transform::default(), rim))
        .id()
}

/// Per-frame ambient animation of the primary scene.
pub fn tick_primary_scene(
    mut globe: Query<&mut Transform, (With<Globe>, Without<CloudLayer>)>,
    mut clouds: Query<&mut Transform, (With<CloudLayer>, Without<Globe>)>,
) {
    for mut transform in &mut globe {
        transform.rotate_y(GLOBE_SPIN);
    }
    for mut transform in &mut clouds {
        transform.rotate_y(CLOUD_SPIN);
    }
}

/// Refresh the atmosphere's view direction and rim colours.
pub fn update_atmosphere_rim(
    camera: Query<&GlobalTransform, With<MainCamera>>,
    mut atmospheres: Query<(&GlobalTransform, &mut AtmosphereRim)>,
    mut meshes: ResMut<Assets<Mesh>>,
) {
    let Ok(camera) = camera.single() else {
        return;
    };

    for (transform, mut rim) in &mut atmospheres {
        let Some(view_dir) = (camera.translation() - transform.translation()).try_normalize()
        else {
            continue;
        };
        if view_dir.abs_diff_eq(rim.view_dir, 1e-5) {
            continue;
        }
        rim.view_dir = view_dir;

        let colors = rim.colors();
        let Some(mesh) = meshes.get_mut(&rim.mesh) else {
            continue;
        };
        if let Err(e) = mesh.try_insert_attribute(Mesh::ATTRIBUTE_COLOR, colors) {
            warn!("Atmosphere rim update skipped: {e}");
        }
    }
}
