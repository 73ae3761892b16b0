//! Scene assembly and tier reconciliation.
//!
//! [`setup_scene`] builds the core hierarchy from whatever bundle is active
//! at startup (the `high` default until classification runs):
//!
//! ```text
//! ParallaxRig
//! ├── FloatRig
//! │   ├── InnerCore      wireframe icosphere, emissive
//! │   └── OuterShell     glass icosphere, subdivision per bundle
//! ├── ParticleField      (bundle.particle_count instances)
//! └── StarField          (omitted when bundle.star_count == 0)
//! ShadowCatcher          disc at y = -3, hidden when shadows are off
//! ```
//!
//! [`apply_tier_to_scene_system`] consumes [`TierResolved`] and rebuilds
//! whatever differs from the bundle the scene was built with: shell mesh
//! and material, particle field, star field, multisampling and shadows.

use crate::animation::{CoreMaterial, FloatRig, InnerCore, OuterShell, ParallaxRig};
use crate::constants::*;
use crate::error::{CoreError, CoreResult};
use crate::graphics::{apply_render_settings, KeyLight, MainCamera};
use crate::particles::{spawn_particle_field, ParticleAssets};
use crate::quality::{RenderParameterBundle, ShellMaterial};
use crate::stars::spawn_star_field;
use crate::tier::{resolve_tier_system, ActiveQuality, FrameSet, TierResolved};
use bevy::light::{DirectionalLightShadowMap, NotShadowCaster};
use bevy::prelude::*;
use bevy_asset::RenderAssetUsages;
use bevy_mesh::{Indices, PrimitiveTopology, VertexAttributeValues};

// ── Components & resources ────────────────────────────────────────────────────

/// Marker for the shadow-catcher disc.
#[derive(Component)]
pub struct ShadowCatcher;

/// Entities owned by the current quality build.
#[derive(Resource, Debug)]
pub struct SceneEntities {
    pub parallax: Entity,
    pub shell: Entity,
    pub particles: Entity,
    pub stars: Option<Entity>,
    /// Bundle the entities above were built from.
    pub built: &'static RenderParameterBundle,
}

// ── Plugin ────────────────────────────────────────────────────────────────────

pub struct ScenePlugin;

impl Plugin for ScenePlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, setup_scene).add_systems(
            Update,
            apply_tier_to_scene_system
                .in_set(FrameSet::Resolve)
                .after(resolve_tier_system),
        );
    }
}

// ── Geometry ──────────────────────────────────────────────────────────────────

/// Outer shell icosphere at `detail` subdivisions.
pub fn shell_mesh(detail: u32) -> CoreResult<Mesh> {
    Sphere::new(OUTER_SHELL_RADIUS)
        .mesh()
        .ico(detail)
        .map_err(|e| CoreError::ShellGeometry {
            detail,
            reason: e.to_string(),
        })
}

/// Outer shell mesh, stepping down the subdivision level until one builds.
pub fn shell_mesh_or_fallback(detail: u32) -> Mesh {
    let mut detail = detail;
    loop {
        match shell_mesh(detail) {
            Ok(mesh) => return mesh,
            Err(e) if detail > 0 => {
                warn!("{e}; retrying with fewer subdivisions");
                detail = (detail - 1).min(SHELL_FALLBACK_DETAIL);
            }
            Err(e) => {
                warn!("{e}; using UV sphere");
                return Sphere::new(OUTER_SHELL_RADIUS).mesh().uv(32, 18);
            }
        }
    }
}

/// Line-list mesh of every unique triangle edge in `source`.
///
/// Positions and normals are shared with the source so the result shades
/// like the solid mesh it outlines.
pub fn wireframe_mesh(source: &Mesh) -> Mesh {
    let mut edges: Vec<[u32; 2]> = Vec::new();
    if let Some(indices) = source.indices() {
        let indices: Vec<u32> = indices.iter().map(|i| i as u32).collect();
        for tri in indices.chunks_exact(3) {
            for (a, b) in [(tri[0], tri[1]), (tri[1], tri[2]), (tri[2], tri[0])] {
                edges.push(if a < b { [a, b] } else { [b, a] });
            }
        }
    }
    edges.sort_unstable();
    edges.dedup();

    let mut mesh = Mesh::new(PrimitiveTopology::LineList, RenderAssetUsages::RENDER_WORLD);
    if let Some(VertexAttributeValues::Float32x3(positions)) =
        source.attribute(Mesh::ATTRIBUTE_POSITION)
    {
        mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, positions.clone());
    }
    if let Some(VertexAttributeValues::Float32x3(normals)) = source.attribute(Mesh::ATTRIBUTE_NORMAL)
    {
        mesh.insert_attribute(Mesh::ATTRIBUTE_NORMAL, normals.clone());
    }
    mesh.insert_indices(Indices::U32(edges.into_iter().flatten().collect()));
    mesh
}

/// Inner core outline.
fn inner_core_mesh() -> Mesh {
    match Sphere::new(INNER_CORE_RADIUS).mesh().ico(INNER_CORE_DETAIL) {
        Ok(solid) => wireframe_mesh(&solid),
        Err(e) => {
            warn!("Inner core icosphere unavailable ({e}); using UV sphere outline");
            wireframe_mesh(&Sphere::new(INNER_CORE_RADIUS).mesh().uv(16, 12))
        }
    }
}

// ── Materials ─────────────────────────────────────────────────────────────────

/// Realise a shell material family.
pub fn shell_material(shell: ShellMaterial) -> StandardMaterial {
    match shell {
        ShellMaterial::Transmissive => StandardMaterial {
            base_color: Color::WHITE,
            specular_transmission: 1.0,
            diffuse_transmission: 0.0,
            thickness: 1.5,
            ior: 1.5,
            perceptual_roughness: 0.0,
            metallic: 0.0,
            clearcoat: 1.0,
            clearcoat_perceptual_roughness: 0.1,
            ..default()
        },
        // No transmission: alpha-blended clearcoat, no extra screen pass.
        ShellMaterial::PhysicalFallback => StandardMaterial {
            base_color: Color::srgba(0.667, 0.8, 1.0, 0.25),
            alpha_mode: AlphaMode::Blend,
            perceptual_roughness: 0.05,
            metallic: 0.2,
            reflectance: 1.0,
            clearcoat: 1.0,
            clearcoat_perceptual_roughness: 0.05,
            double_sided: true,
            cull_mode: None,
            ..default()
        },
    }
}

fn inner_core_material() -> StandardMaterial {
    StandardMaterial {
        base_color: Color::WHITE,
        emissive: LinearRgba::WHITE * IDLE_EMISSIVE_INTENSITY,
        ..default()
    }
}

fn shadow_catcher_material() -> StandardMaterial {
    StandardMaterial {
        base_color: Color::srgba(1.0, 1.0, 1.0, SHADOW_PLANE_OPACITY),
        alpha_mode: AlphaMode::Blend,
        perceptual_roughness: 1.0,
        ..default()
    }
}

fn catcher_visibility(bundle: &RenderParameterBundle) -> Visibility {
    if bundle.shadows_enabled() {
        Visibility::Inherited
    } else {
        Visibility::Hidden
    }
}

// ── Startup ───────────────────────────────────────────────────────────────────

/// Build the core hierarchy from the active bundle.
pub fn setup_scene(
    mut commands: Commands,
    quality: Res<ActiveQuality>,
    particle_assets: Res<ParticleAssets>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let bundle = quality.bundle;

    let parallax = commands
        .spawn((ParallaxRig, Transform::default(), Visibility::default()))
        .id();
    let float = commands
        .spawn((
            FloatRig,
            Transform::default(),
            Visibility::default(),
            ChildOf(parallax),
        ))
        .id();

    let core_material = materials.add(inner_core_material());
    commands.insert_resource(CoreMaterial(core_material.clone()));
    commands.spawn((
        InnerCore,
        Mesh3d(meshes.add(inner_core_mesh())),
        MeshMaterial3d(core_material),
        Transform::default(),
        ChildOf(float),
    ));

    let shell = commands
        .spawn((
            OuterShell,
            Mesh3d(meshes.add(shell_mesh_or_fallback(bundle.geometry_detail))),
            MeshMaterial3d(materials.add(shell_material(bundle.shell))),
            Transform::default(),
            ChildOf(float),
        ))
        .id();

    let particles = spawn_particle_field(&mut commands, parallax, &particle_assets, bundle.particle_count);
    let stars = spawn_star_field(
        &mut commands,
        &mut meshes,
        &mut materials,
        parallax,
        bundle.star_count,
    );

    commands.spawn((
        ShadowCatcher,
        Mesh3d(meshes.add(Circle::new(SHADOW_PLANE_RADIUS))),
        MeshMaterial3d(materials.add(shadow_catcher_material())),
        Transform::from_xyz(0.0, SHADOW_PLANE_Y, 0.0)
            .with_rotation(Quat::from_rotation_x(-std::f32::consts::FRAC_PI_2)),
        catcher_visibility(bundle),
        NotShadowCaster,
    ));

    commands.insert_resource(SceneEntities {
        parallax,
        shell,
        particles,
        stars,
        built: bundle,
    });
    info!(
        "Scene built for {} tier: {} particles, {} stars",
        quality.tier, bundle.particle_count, bundle.star_count
    );
}

// ── Reconciliation ────────────────────────────────────────────────────────────

/// Rebuild the parts of the scene that differ from the resolved bundle.
#[allow(clippy::too_many_arguments)]
pub fn apply_tier_to_scene_system(
    mut commands: Commands,
    mut resolved: MessageReader<TierResolved>,
    quality: Res<ActiveQuality>,
    scene: Option<ResMut<SceneEntities>>,
    particle_assets: Option<Res<ParticleAssets>>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut shells: Query<(&mut Mesh3d, &mut MeshMaterial3d<StandardMaterial>), With<OuterShell>>,
    mut cameras: Query<&mut Msaa, With<MainCamera>>,
    mut lights: Query<&mut DirectionalLight, With<KeyLight>>,
    mut catchers: Query<&mut Visibility, With<ShadowCatcher>>,
    mut shadow_map: ResMut<DirectionalLightShadowMap>,
) {
    if resolved.read().last().is_none() {
        return;
    }
    let (Some(mut scene), Some(particle_assets)) = (scene, particle_assets) else {
        return;
    };
    let bundle = quality.bundle;
    let built = scene.built;
    if std::ptr::eq(built, bundle) {
        return;
    }

    if built.geometry_detail != bundle.geometry_detail || built.shell != bundle.shell {
        if let Ok((mut mesh, mut material)) = shells.get_mut(scene.shell) {
            mesh.0 = meshes.add(shell_mesh_or_fallback(bundle.geometry_detail));
            material.0 = materials.add(shell_material(bundle.shell));
        }
    }

    if built.particle_count != bundle.particle_count {
        commands.entity(scene.particles).despawn();
        scene.particles = spawn_particle_field(
            &mut commands,
            scene.parallax,
            &particle_assets,
            bundle.particle_count,
        );
    }

    if built.star_count != bundle.star_count {
        if let Some(stars) = scene.stars.take() {
            commands.entity(stars).despawn();
        }
        scene.stars = spawn_star_field(
            &mut commands,
            &mut meshes,
            &mut materials,
            scene.parallax,
            bundle.star_count,
        );
    }

    for mut msaa in cameras.iter_mut() {
        for mut light in lights.iter_mut() {
            apply_render_settings(bundle, &mut msaa, &mut light, &mut shadow_map);
        }
    }
    for mut visibility in catchers.iter_mut() {
        *visibility = catcher_visibility(bundle);
    }

    scene.built = bundle;
    info!(
        "Scene rebuilt for {} tier: {} particles, {} stars, shell {:?}",
        quality.tier, bundle.particle_count, bundle.star_count, bundle.shell
    );
}
