//! The satellite actor: asset loading, pose updates and hover glow.
//!
//! [`SatelliteActor`] is the single writer of the satellite's pose. It owns
//! the asset root entity, the floating label entity and the glow state.
//!
//! Loads are asynchronous. At most one load is pending; a newer
//! [`LoadRequest`] supersedes the pending one and the superseded handle is
//! dropped, so a slow load can never attach after a newer one was asked for.
//! A failed load leaves the previously held asset untouched.

use bevy::asset::RecursiveDependencyLoadState;
use bevy::camera::visibility::RenderLayers;
use bevy::prelude::*;

use crate::coords::geo_to_scene;
use crate::render::picking::{HoverState, PickTarget, PickableRegistry, PointerCue};
use crate::types::{FrameSet, GeoPoint, GeographicSample, SATELLITE_ALTITUDE, SatelliteId};
use crate::ui::notifications::Notification;

/// Position the asset is parked at until the first pose update arrives.
pub const PLACEHOLDER_POSITION: Vec3 = Vec3::new(1.5, 0.0, 0.0);

/// Radial distance of the label beyond the satellite.
pub const LABEL_OFFSET: f32 = 0.08;

/// Solar panel rotation per pose update in radians.
pub const PANEL_STEP: f32 = 0.01;

/// Pick radius around the asset root.
const ASSET_PICK_RADIUS: f32 = 0.08;

/// Pick radius around the label anchor.
const LABEL_PICK_RADIUS: f32 = 0.04;

/// Where the satellite's renderable comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetSource {
    /// Built-in model: body, two solar panels and an antenna.
    Procedural,
    /// glTF file relative to the assets folder.
    Model(String),
}

impl AssetSource {
    pub fn describe(&self) -> &str {
        match self {
            AssetSource::Procedural => "built-in model",
            AssetSource::Model(path) => path,
        }
    }
}

/// Asset loading failure.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum AssetLoadError {
    #[error("failed to load satellite model {path}: {reason}")]
    Failed { path: String, reason: String },
}

/// Ask the actor to load the renderable for a satellite.
#[derive(Message, Debug, Clone)]
pub struct LoadRequest {
    pub satellite: SatelliteId,
    pub source: AssetSource,
}

/// A fresh sample for the satellite, tagged with the id it was fetched for.
#[derive(Message, Debug, Clone)]
pub struct PoseUpdate {
    pub satellite: SatelliteId,
    pub sample: GeographicSample,
}

/// The asset currently shown for the satellite.
#[derive(Debug, Clone)]
pub struct HeldAsset {
    pub root: Entity,
    pub satellite: SatelliteId,
    pub source: AssetSource,
    /// Loaded glTF scene; `None` for the built-in model.
    pub scene: Option<Handle<Scene>>,
}

#[derive(Debug)]
struct PendingLoad {
    satellite: SatelliteId,
    source: AssetSource,
    scene: Option<Handle<Scene>>,
}

/// Satellite actor state.
#[derive(Resource, Debug, Default)]
pub struct SatelliteActor {
    asset: Option<HeldAsset>,
    pending: Option<PendingLoad>,
    label: Option<Entity>,
    glow: bool,
    glow_dirty: bool,
    panel_angle: f32,
    /// Number of pending loads replaced by a newer request.
    pub superseded: u32,
    /// Number of glow state changes.
    pub glow_toggles: u32,
}

impl SatelliteActor {
    pub fn asset(&self) -> Option<&HeldAsset> {
        self.asset.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    pub fn label(&self) -> Option<Entity> {
        self.label
    }

    pub fn glow(&self) -> bool {
        self.glow
    }

    pub fn panel_angle(&self) -> f32 {
        self.panel_angle
    }

    /// Whether the held asset belongs to `satellite`.
    pub fn holds(&self, satellite: &SatelliteId) -> bool {
        self.asset
            .as_ref()
            .is_some_and(|asset| asset.satellite == *satellite)
    }

    /// Turn hover glow on or off. Returns whether the state changed.
    pub fn set_glow(&mut self, enabled: bool) -> bool {
        if self.glow == enabled {
            return false;
        }
        self.glow = enabled;
        self.glow_dirty = true;
        self.glow_toggles += 1;
        true
    }

    fn begin(&mut self, pending: PendingLoad) {
        if let Some(previous) = self.pending.replace(pending) {
            self.superseded += 1;
            debug!(
                "Load of {} for {} superseded",
                previous.source.describe(),
                previous.satellite
            );
        }
    }
}

/// Latest accepted position of the satellite, read by the trail.
#[derive(Resource, Debug, Clone, Default, PartialEq)]
pub struct SatelliteFix(pub Option<(SatelliteId, GeoPoint)>);

/// Root of a satellite asset.
#[derive(Component, Debug, Clone)]
pub struct SatelliteModel {
    pub satellite: SatelliteId,
}

/// A solar panel of the built-in model.
#[derive(Component)]
pub struct SolarPanel;

/// Floating name label anchored above the satellite.
#[derive(Component, Debug, Clone)]
pub struct SatelliteLabel {
    pub text: String,
}

/// Base and glow material of one mesh below the asset root.
#[derive(Component, Debug, Clone)]
pub struct GlowMaterials {
    pub base: Handle<StandardMaterial>,
    pub glow: Handle<StandardMaterial>,
}

/// Plugin providing the satellite actor.
pub struct SatellitePlugin;

impl Plugin for SatellitePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<SatelliteActor>()
            .init_resource::<SatelliteFix>()
            .init_resource::<PickableRegistry>()
            .init_resource::<HoverState>()
            .init_resource::<PointerCue>()
            .add_message::<LoadRequest>()
            .add_message::<PoseUpdate>()
            .add_message::<Notification>()
            .add_systems(
                Update,
                (begin_loads, finish_loads, apply_pose_updates, apply_glow)
                    .chain()
                    .in_set(FrameSet::Actor),
            );
    }
}

/// Build the built-in satellite model and return its root.
///
/// The model is a small body with two solar panels on either side and an
/// antenna on top. `layer` puts every part on a render layer.
pub fn spawn_procedural_model(
    commands: &mut Commands,
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<StandardMaterial>,
    satellite: SatelliteId,
    layer: Option<RenderLayers>,
) -> Entity {
    let body_material = materials.add(StandardMaterial {
        base_color: Color::srgb(0.8, 0.8, 0.8),
        metallic: 0.6,
        perceptual_roughness: 0.4,
        ..default()
    });
    let panel_material = materials.add(StandardMaterial {
        base_color: Color::srgb(0.1, 0.2, 0.6),
        metallic: 0.3,
        perceptual_roughness: 0.5,
        ..default()
    });
    let antenna_material = materials.add(StandardMaterial {
        base_color: Color::srgb(0.9, 0.9, 0.9),
        ..default()
    });

    let body_mesh = meshes.add(Cuboid::new(0.03, 0.02, 0.05));
    let panel_mesh = meshes.add(Cuboid::new(0.1, 0.008, 0.06));
    let antenna_mesh = meshes.add(Cylinder::new(0.002, 0.03));

    let layers = layer.unwrap_or_default();
    commands
        .spawn((
            Transform::from_translation(PLACEHOLDER_POSITION),
            Visibility::default(),
            layers.clone(),
            SatelliteModel { satellite },
        ))
        .with_children(|parent| {
            parent.spawn((
                Mesh3d(body_mesh),
                MeshMaterial3d(body_material),
                Transform::default(),
                layers.clone(),
            ));
            for side in [-1.0, 1.0] {
                parent.spawn((
                    Mesh3d(panel_mesh.clone()),
                    MeshMaterial3d(panel_material.clone()),
                    Transform::from_xyz(side * 0.065, 0.0, 0.0),
                    layers.clone(),
                    SolarPanel,
                ));
            }
            parent.spawn((
                Mesh3d(antenna_mesh),
                MeshMaterial3d(antenna_material),
                Transform::from_xyz(0.0, 0.025, 0.0),
                layers.clone(),
            ));
        })
        .id()
}

/// Start loads for new requests; the newest request wins.
fn begin_loads(
    mut requests: MessageReader<LoadRequest>,
    mut actor: ResMut<SatelliteActor>,
    asset_server: Option<Res<AssetServer>>,
    mut notifications: MessageWriter<Notification>,
) {
    for request in requests.read() {
        let scene = match &request.source {
            AssetSource::Procedural => None,
            AssetSource::Model(path) => match &asset_server {
                Some(server) => {
                    let label = GltfAssetLabel::Scene(0).from_asset(path.clone());
                    Some(server.load::<Scene>(label))
                }
                None => {
                    report_failure(
                        &mut notifications,
                        AssetLoadError::Failed {
                            path: path.clone(),
                            reason: "no asset server".to_string(),
                        },
                    );
                    continue;
                }
            },
        };

        info!(
            "Loading {} for {}",
            request.source.describe(),
            request.satellite
        );
        actor.begin(PendingLoad {
            satellite: request.satellite.clone(),
            source: request.source.clone(),
            scene,
        });
    }
}

/// Attach a finished load, or report its failure.
fn finish_loads(
    mut commands: Commands,
    mut actor: ResMut<SatelliteActor>,
    asset_server: Option<Res<AssetServer>>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut registry: ResMut<PickableRegistry>,
    mut fix: ResMut<SatelliteFix>,
    mut hover: ResMut<HoverState>,
    mut cue: ResMut<PointerCue>,
    mut notifications: MessageWriter<Notification>,
) {
    let Some(pending) = actor.pending.as_ref() else {
        return;
    };

    if let Some(scene) = pending.scene.as_ref().map(Handle::id) {
        let Some(server) = &asset_server else {
            return;
        };
        match server.recursive_dependency_load_state(scene) {
            RecursiveDependencyLoadState::Loaded => {}
            RecursiveDependencyLoadState::Failed(error) => {
                let pending = actor.pending.take();
                let path = pending
                    .map(|p| p.source.describe().to_string())
                    .unwrap_or_default();
                report_failure(
                    &mut notifications,
                    AssetLoadError::Failed {
                        path,
                        reason: error.to_string(),
                    },
                );
                return;
            }
            _ => return,
        }
    }

    let Some(pending) = actor.pending.take() else {
        return;
    };

    let root = match &pending.scene {
        Some(scene) => commands
            .spawn((
                SceneRoot(scene.clone()),
                Transform::from_translation(PLACEHOLDER_POSITION),
                SatelliteModel {
                    satellite: pending.satellite.clone(),
                },
            ))
            .id(),
        None => spawn_procedural_model(
            &mut commands,
            &mut meshes,
            &mut materials,
            pending.satellite.clone(),
            None,
        ),
    };
    commands.entity(root).insert(PickTarget {
        radius: ASSET_PICK_RADIUS,
    });

    if let Some(previous) = actor.asset.take() {
        commands.entity(previous.root).try_despawn();
    }
    if let Some(label) = actor.label.take() {
        commands.entity(label).try_despawn();
    }

    info!(
        "Attached {} for {}",
        pending.source.describe(),
        pending.satellite
    );
    actor.asset = Some(HeldAsset {
        root,
        satellite: pending.satellite,
        source: pending.source,
        scene: pending.scene,
    });
    // A pointer resting over the new asset must be able to re-enter hover
    actor.glow = false;
    actor.glow_dirty = false;
    hover.hovered = None;
    cue.pointing = false;
    fix.0 = None;
    registry.rebuild([(root, ASSET_PICK_RADIUS)]);
}

fn report_failure(notifications: &mut MessageWriter<Notification>, error: AssetLoadError) {
    error!("{error}");
    notifications.write(Notification::error(error.to_string()));
}

/// Move the satellite to each accepted sample and rebuild its label.
fn apply_pose_updates(
    mut commands: Commands,
    mut updates: MessageReader<PoseUpdate>,
    mut actor: ResMut<SatelliteActor>,
    mut fix: ResMut<SatelliteFix>,
    mut registry: ResMut<PickableRegistry>,
    mut roots: Query<&mut Transform, (With<SatelliteModel>, Without<SolarPanel>)>,
    mut panels: Query<(&ChildOf, &mut Transform), With<SolarPanel>>,
) {
    for update in updates.read() {
        if !actor.holds(&update.satellite) {
            continue;
        }
        let Some(asset) = actor.asset.clone() else {
            continue;
        };

        let geo = match update.sample.geo() {
            Ok(geo) => geo,
            Err(e) => {
                warn!("Skipping pose update for {}: {e}", update.satellite);
                continue;
            }
        };

        let position = geo_to_scene(geo, SATELLITE_ALTITUDE);
        if let Ok(mut transform) = roots.get_mut(asset.root) {
            *transform = Transform::from_translation(position).looking_at(Vec3::ZERO, Vec3::Y);
        }

        actor.panel_angle += PANEL_STEP;
        for (parent, mut transform) in &mut panels {
            if parent.parent() == asset.root {
                transform.rotation = Quat::from_rotation_x(actor.panel_angle);
            }
        }

        if let Some(previous) = actor.label.take() {
            commands.entity(previous).try_despawn();
        }
        let text = update
            .sample
            .name
            .clone()
            .unwrap_or_else(|| update.satellite.to_string());
        let anchor = position + position.normalize_or_zero() * LABEL_OFFSET;
        let label = commands
            .spawn((
                Transform::from_translation(anchor),
                SatelliteLabel { text },
                PickTarget {
                    radius: LABEL_PICK_RADIUS,
                },
            ))
            .id();

        actor.label = Some(label);
        fix.0 = Some((asset.satellite.clone(), geo));
        registry.rebuild([
            (asset.root, ASSET_PICK_RADIUS),
            (label, LABEL_PICK_RADIUS),
        ]);
    }
}

/// Swap every mesh below the asset root between its base and glow material.
fn apply_glow(
    mut commands: Commands,
    mut actor: ResMut<SatelliteActor>,
    children: Query<&Children>,
    mut meshes: Query<(&mut MeshMaterial3d<StandardMaterial>, Option<&GlowMaterials>)>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    if !actor.glow_dirty {
        return;
    }
    actor.glow_dirty = false;
    let Some(asset) = actor.asset.as_ref() else {
        return;
    };
    let glow = actor.glow;

    let targets: Vec<Entity> = std::iter::once(asset.root)
        .chain(children.iter_descendants(asset.root))
        .collect();
    for entity in targets {
        let Ok((mut material, swap)) = meshes.get_mut(entity) else {
            continue;
        };
        let swap = match swap {
            Some(swap) => swap.clone(),
            None => {
                let base = material.0.clone();
                let glow_material = materials
                    .get(&base)
                    .cloned()
                    .map(|mut m| {
                        m.emissive = LinearRgba::rgb(0.3, 0.6, 1.0);
                        m
                    })
                    .unwrap_or_else(|| StandardMaterial {
                        emissive: LinearRgba::rgb(0.3, 0.6, 1.0),
                        ..default()
                    });
                let swap = GlowMaterials {
                    base,
                    glow: materials.add(glow_material),
                };
                commands.entity(entity).insert(swap.clone());
                swap
            }
        };
        material.0 = if glow { swap.glow } else { swap.base };
    }
}
