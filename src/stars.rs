//! Background star field.
//!
//! All stars live in one `PointList` mesh, so the field is a single draw
//! regardless of count.  Positions are drawn uniformly over directions and
//! uniformly over radius in `[STAR_RADIUS, STAR_RADIUS + STAR_DEPTH)`.
//!
//! Each star twinkles: its vertex colour oscillates between
//! `STAR_TWINKLE_FLOOR` and full white around a per-star phase offset.  The
//! shared twinkle clock runs five times faster while the call-to-action is
//! hovered.
//!
//! A star count of `0` means no field at all: [`spawn_star_field`] returns
//! `None` and nothing is spawned.

use crate::constants::*;
use crate::interaction::InteractionState;
use crate::tier::FrameSet;
use bevy::prelude::*;
use bevy_asset::RenderAssetUsages;
use bevy_mesh::{PrimitiveTopology, VertexAttributeValues};
use rand::Rng;
use std::f32::consts::TAU;

/// Twinkle state of a star field entity.
#[derive(Component, Debug)]
pub struct StarField {
    /// Shared twinkle clock (rad).
    clock: f32,
    /// Per-star phase offset, one per mesh vertex.
    phases: Vec<f32>,
}

impl StarField {
    pub fn new(phases: Vec<f32>) -> Self {
        Self { clock: 0.0, phases }
    }

    #[inline]
    pub fn clock(&self) -> f32 {
        self.clock
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.phases.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }

    /// Advance the clock and write every star's colour into `colors`.
    pub fn twinkle(&mut self, delta: f32, colors: &mut [[f32; 4]]) {
        self.clock = (self.clock + delta).rem_euclid(TAU);
        for (phase, color) in self.phases.iter().zip(colors.iter_mut()) {
            let b = twinkle_brightness(self.clock + phase);
            *color = [b, b, b, 1.0];
        }
    }
}

/// Brightness at twinkle angle `x`, in `[STAR_TWINKLE_FLOOR, 1]`.
#[inline]
pub fn twinkle_brightness(x: f32) -> f32 {
    STAR_TWINKLE_FLOOR + (1.0 - STAR_TWINKLE_FLOOR) * 0.5 * (1.0 + x.sin())
}

pub struct StarFieldPlugin;

impl Plugin for StarFieldPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Update, star_twinkle_system.in_set(FrameSet::Animate));
    }
}

// ── Geometry ──────────────────────────────────────────────────────────────────

/// One star position in the shell around the origin.
pub fn random_star_position(rng: &mut impl Rng) -> Vec3 {
    // Uniform direction: z uniform in [-1, 1], azimuth uniform.
    let z: f32 = rng.gen_range(-1.0..=1.0);
    let azimuth = rng.gen_range(0.0..TAU);
    let ring = (1.0 - z * z).max(0.0).sqrt();
    let direction = Vec3::new(ring * azimuth.cos(), ring * azimuth.sin(), z);
    direction * (STAR_RADIUS + rng.gen_range(0.0..STAR_DEPTH))
}

/// Build a point-list mesh of `count` stars.
///
/// The mesh stays in the main world too, since the twinkle rewrites its
/// colour attribute every tick.
pub fn star_mesh(count: u32, rng: &mut impl Rng) -> Mesh {
    let positions: Vec<[f32; 3]> = (0..count)
        .map(|_| random_star_position(rng).to_array())
        .collect();
    let colors = vec![[1.0_f32; 4]; positions.len()];

    let mut mesh = Mesh::new(
        PrimitiveTopology::PointList,
        RenderAssetUsages::MAIN_WORLD | RenderAssetUsages::RENDER_WORLD,
    );
    mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, positions);
    mesh.insert_attribute(Mesh::ATTRIBUTE_COLOR, colors);
    mesh
}

// ── Spawn helper ──────────────────────────────────────────────────────────────

/// Spawn a star field of `count` stars under `parent`, or nothing for `0`.
pub fn spawn_star_field(
    commands: &mut Commands,
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<StandardMaterial>,
    parent: Entity,
    count: u32,
) -> Option<Entity> {
    if count == 0 {
        return None;
    }
    let mut rng = rand::thread_rng();
    let mesh = star_mesh(count, &mut rng);
    let phases = (0..count).map(|_| rng.gen_range(0.0..TAU)).collect();
    let material = StandardMaterial {
        base_color: Color::WHITE,
        unlit: true,
        ..default()
    };
    let entity = commands
        .spawn((
            StarField::new(phases),
            Mesh3d(meshes.add(mesh)),
            MeshMaterial3d(materials.add(material)),
            Transform::default(),
            ChildOf(parent),
        ))
        .id();
    debug!("Star field spawned with {count} stars");
    Some(entity)
}

// ── Update ────────────────────────────────────────────────────────────────────

/// Advance each field's twinkle, five times faster while the
/// call-to-action is hovered.
pub fn star_twinkle_system(
    time: Res<Time>,
    interaction: Res<InteractionState>,
    mut fields: Query<(&mut StarField, &Mesh3d)>,
    mut meshes: ResMut<Assets<Mesh>>,
) {
    let multiplier = if interaction.is_hovering_button() {
        HOVER_SPEED_MULTIPLIER
    } else {
        IDLE_SPEED_MULTIPLIER
    };
    let delta = STAR_TWINKLE_RATE * multiplier * time.delta_secs();
    for (mut field, mesh) in fields.iter_mut() {
        let Some(mesh) = meshes.get_mut(&mesh.0) else {
            continue;
        };
        if let Some(VertexAttributeValues::Float32x4(colors)) =
            mesh.attribute_mut(Mesh::ATTRIBUTE_COLOR)
        {
            field.twinkle(delta, colors);
        }
    }
}
