//! Instanced particle cloud orbiting the core.
//!
//! ## Design
//!
//! A [`ParticleField`] owns a fixed set of [`ParticleRecord`]s drawn once at
//! construction, plus a pre-allocated instance buffer with one `Transform`
//! per record.  Two systems handle it each tick:
//!
//! | System                     | Set                    | Purpose                                  |
//! |----------------------------|------------------------|------------------------------------------|
//! | `particle_update_system`   | `FrameSet::Particles`  | Advance phases, fill the instance buffer |
//! | `instance_flush_system`    | `FrameSet::Flush`      | Copy a dirty buffer onto instance entities |
//!
//! The buffer is marked dirty once per tick, never per particle, and the
//! flush touches every instance in a single pass.  All instances share one
//! mesh and one material, so Bevy draws them as a single instanced batch.
//!
//! The field is never resized.  A new particle count (tier change) means
//! despawning the field and spawning a new one.

use crate::constants::*;
use crate::tier::FrameSet;
use bevy::light::NotShadowCaster;
use bevy::prelude::*;
use rand::Rng;

// ── Resources ─────────────────────────────────────────────────────────────────

/// Shared mesh and material used by every particle instance.
#[derive(Resource, Clone)]
pub struct ParticleAssets {
    pub mesh: Handle<Mesh>,
    pub material: Handle<StandardMaterial>,
}

// ── Records ───────────────────────────────────────────────────────────────────

/// Trajectory parameters of one particle.  Mutated in place every tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParticleRecord {
    /// Phase accumulator.  Double precision so it keeps advancing in long
    /// sessions; reduced to `[0, 2π)` before any trig.
    pub phase: f64,
    /// Trajectory shape factor.
    pub factor: f32,
    /// Oscillation speed; the phase advances by half of this per tick.
    pub speed: f64,
    /// Fixed positional offset.
    pub offset: Vec3,
}

impl ParticleRecord {
    /// Draw a record from independent uniform samples.
    pub fn random(rng: &mut impl Rng) -> Self {
        let mut axis = || rng.gen_range(-PARTICLE_OFFSET_RANGE..PARTICLE_OFFSET_RANGE);
        let offset = Vec3::new(axis(), axis(), axis());
        Self {
            phase: rng.gen_range(0.0..PARTICLE_PHASE_MAX),
            factor: rng.gen_range(PARTICLE_FACTOR_MIN..PARTICLE_FACTOR_MIN + PARTICLE_FACTOR_SPAN),
            speed: rng.gen_range(PARTICLE_SPEED_MIN..PARTICLE_SPEED_MIN + PARTICLE_SPEED_SPAN),
            offset,
        }
    }

    /// Advance the phase by one tick and return it.
    #[inline]
    pub fn advance(&mut self) -> f64 {
        self.phase += self.speed / 2.0;
        self.phase
    }

    /// Closed-form transform at the current phase.
    ///
    /// Every term is a bounded trig function times a bounded coefficient, so
    /// the orbit stays inside `offset ± (1 + factor / 10)` on each axis.
    #[inline]
    pub fn transform(&self) -> Transform {
        let t = self.phase;
        let f = self.factor;
        let wobble = angle(t / 10.0 * f as f64);
        let (t1, t2, t3) = (angle(t), angle(t * 2.0), angle(t * 3.0));
        let s = t1.cos();
        let spin = s * PARTICLE_SPIN;
        Transform {
            translation: self.offset
                + Vec3::new(
                    wobble.cos() + t1.sin() * f / 10.0,
                    wobble.sin() + t2.cos() * f / 10.0,
                    wobble.cos() + t3.sin() * f / 10.0,
                ),
            rotation: Quat::from_euler(EulerRot::XYZ, spin, spin, spin),
            scale: Vec3::splat(s),
        }
    }
}

/// Wrap a phase-derived angle into `[0, 2π)` and narrow it for the trig.
#[inline]
fn angle(x: f64) -> f32 {
    x.rem_euclid(std::f64::consts::TAU) as f32
}

// ── Component ─────────────────────────────────────────────────────────────────

/// Fixed-size particle set and its batched instance buffer.
#[derive(Component, Debug)]
pub struct ParticleField {
    records: Vec<ParticleRecord>,
    instances: Vec<Transform>,
    dirty: bool,
}

/// Index of an instance entity inside its parent [`ParticleField`].
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParticleInstance(pub usize);

impl ParticleField {
    pub fn new(count: usize, rng: &mut impl Rng) -> Self {
        let records: Vec<ParticleRecord> = (0..count).map(|_| ParticleRecord::random(rng)).collect();
        let instances = records.iter().map(ParticleRecord::transform).collect();
        Self {
            records,
            instances,
            dirty: true,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[ParticleRecord] {
        &self.records
    }

    pub fn instances(&self) -> &[Transform] {
        &self.instances
    }

    /// Advance every record one tick and rewrite the instance buffer.
    ///
    /// Allocation-free: writes into the buffer created by [`Self::new`].
    pub fn step(&mut self) {
        for (record, slot) in self.records.iter_mut().zip(self.instances.iter_mut()) {
            record.advance();
            *slot = record.transform();
        }
        self.dirty = true;
    }

    /// The instance buffer if it changed since the last call.
    pub fn take_dirty(&mut self) -> Option<&[Transform]> {
        if !self.dirty {
            return None;
        }
        self.dirty = false;
        Some(&self.instances)
    }
}

// ── Plugin ────────────────────────────────────────────────────────────────────

pub struct ParticlesPlugin;

impl Plugin for ParticlesPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(PreStartup, init_particle_assets).add_systems(
            Update,
            (
                particle_update_system.in_set(FrameSet::Particles),
                instance_flush_system.in_set(FrameSet::Flush),
            ),
        );
    }
}

// ── Startup system ────────────────────────────────────────────────────────────

/// Create the shared particle mesh and material.
fn init_particle_assets(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let mesh = match Sphere::new(PARTICLE_RADIUS).mesh().ico(0) {
        Ok(mesh) => mesh,
        Err(e) => {
            warn!("Particle icosahedron unavailable ({e}); using UV sphere");
            Sphere::new(PARTICLE_RADIUS).mesh().uv(8, 6)
        }
    };
    let material = StandardMaterial {
        base_color: Color::srgba(1.0, 1.0, 1.0, PARTICLE_OPACITY),
        alpha_mode: AlphaMode::Blend,
        unlit: true,
        ..default()
    };
    commands.insert_resource(ParticleAssets {
        mesh: meshes.add(mesh),
        material: materials.add(material),
    });
}

// ── Spawn helper ──────────────────────────────────────────────────────────────

/// Spawn a field of `count` particles under `parent`.
///
/// Returns the field entity; despawning it removes every instance.
pub fn spawn_particle_field(
    commands: &mut Commands,
    parent: Entity,
    assets: &ParticleAssets,
    count: u32,
) -> Entity {
    let field = ParticleField::new(count as usize, &mut rand::thread_rng());
    let initial: Vec<Transform> = field.instances().to_vec();

    commands
        .spawn((
            field,
            Transform::from_scale(Vec3::splat(PARTICLE_CLOUD_SCALE)),
            Visibility::default(),
            ChildOf(parent),
        ))
        .with_children(|cloud| {
            for (i, transform) in initial.into_iter().enumerate() {
                cloud.spawn((
                    ParticleInstance(i),
                    Mesh3d(assets.mesh.clone()),
                    MeshMaterial3d(assets.material.clone()),
                    transform,
                    NotShadowCaster,
                ));
            }
        })
        .id()
}

// ── Update systems ────────────────────────────────────────────────────────────

/// Advance every particle field one tick.
pub fn particle_update_system(mut fields: Query<&mut ParticleField>) {
    for mut field in fields.iter_mut() {
        field.step();
    }
}

/// Write each dirty instance buffer onto its instance entities in one pass.
pub fn instance_flush_system(
    mut fields: Query<(&mut ParticleField, &Children)>,
    mut instances: Query<(&ParticleInstance, &mut Transform)>,
) {
    for (mut field, children) in fields.iter_mut() {
        let Some(buffer) = field.take_dirty() else {
            continue;
        };
        for child in children.iter() {
            if let Ok((instance, mut transform)) = instances.get_mut(child) {
                if let Some(next) = buffer.get(instance.0) {
                    *transform = *next;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn seeded_field(count: usize) -> ParticleField {
        ParticleField::new(count, &mut StdRng::seed_from_u64(42))
    }

    #[test]
    fn draws_respect_their_ranges() {
        let field = seeded_field(500);
        for r in field.records() {
            assert!((0.0..100.0).contains(&r.phase));
            assert!((20.0..120.0).contains(&r.factor));
            assert!((0.01..0.015).contains(&r.speed));
            assert!(r.offset.abs().max_element() < 50.0);
        }
    }

    #[test]
    fn phase_strictly_increases_every_tick() {
        let mut field = seeded_field(64);
        let mut previous: Vec<f64> = field.records().iter().map(|r| r.phase).collect();
        for _ in 0..1_000 {
            field.step();
            for (r, p) in field.records().iter().zip(previous.iter_mut()) {
                assert!(r.phase > *p);
                *p = r.phase;
            }
        }
    }

    #[test]
    fn phase_keeps_advancing_in_long_sessions() {
        // Past ~1.3e5 a single-precision phase no longer moves at this speed.
        let mut record = ParticleRecord {
            phase: 2.0e5,
            factor: 120.0,
            speed: PARTICLE_SPEED_MIN,
            offset: Vec3::ZERO,
        };
        for _ in 0..1_000 {
            let before = record.phase;
            assert!(record.advance() > before);
        }
        let expected = 2.0e5 + 1_000.0 * PARTICLE_SPEED_MIN / 2.0;
        assert!((record.phase - expected).abs() < 1e-6);

        let t = record.transform();
        assert!(t.translation.is_finite());
        assert!(t.translation.abs().max_element() <= 1.0 + 12.0 + 1e-3);
    }

    #[test]
    fn reduced_angles_match_small_phases() {
        let record = ParticleRecord {
            phase: 1.25,
            factor: 40.0,
            speed: PARTICLE_SPEED_MIN,
            offset: Vec3::ZERO,
        };
        let t = 1.25_f32;
        let direct = Vec3::new(
            (t / 10.0 * 40.0).cos() + t.sin() * 4.0,
            (t / 10.0 * 40.0).sin() + (t * 2.0).cos() * 4.0,
            (t / 10.0 * 40.0).cos() + (t * 3.0).sin() * 4.0,
        );
        assert!((record.transform().translation - direct).length() < 1e-4);
    }

    #[test]
    fn positions_stay_finite_and_bounded_for_ten_thousand_ticks() {
        let mut field = seeded_field(200);
        for _ in 0..10_000 {
            field.step();
        }
        for (r, t) in field.records().iter().zip(field.instances()) {
            assert!(t.translation.is_finite());
            assert!(t.rotation.is_finite());
            assert!(t.scale.is_finite());
            let bound = 1.0 + r.factor / 10.0 + 1e-3;
            let drift = (t.translation - r.offset).abs();
            assert!(drift.max_element() <= bound, "drift {drift:?} > {bound}");
        }
    }

    #[test]
    fn size_never_changes() {
        let mut field = seeded_field(30);
        for _ in 0..100 {
            field.step();
        }
        assert_eq!(field.len(), 30);
        assert_eq!(field.instances().len(), 30);
    }

    #[test]
    fn buffer_is_dirty_once_per_tick() {
        let mut field = seeded_field(10);
        assert!(field.take_dirty().is_some(), "fresh buffer needs a first flush");
        assert!(field.take_dirty().is_none());

        field.step();
        assert!(field.take_dirty().is_some());
        assert!(field.take_dirty().is_none());
    }

    #[test]
    fn empty_field_is_allowed() {
        let mut field = seeded_field(0);
        field.step();
        assert!(field.is_empty());
    }

    #[test]
    fn flush_copies_buffer_to_instances() {
        let mut world = World::new();
        let field = seeded_field(3);
        let expected: Vec<Transform> = {
            let mut reference = seeded_field(3);
            reference.step();
            reference.instances().to_vec()
        };

        let root = world.spawn(field).id();
        let children: Vec<Entity> = (0..3)
            .map(|i| {
                world
                    .spawn((ParticleInstance(i), Transform::default(), ChildOf(root)))
                    .id()
            })
            .collect();

        let mut schedule = Schedule::default();
        schedule.add_systems((particle_update_system, instance_flush_system).chain());
        schedule.run(&mut world);

        for (i, child) in children.iter().enumerate() {
            assert_eq!(*world.get::<Transform>(*child).unwrap(), expected[i]);
        }
        assert!(world
            .get_mut::<ParticleField>(root)
            .unwrap()
            .take_dirty()
            .is_none());
    }
}
