//! Per-tick procedural motion of the Quantum Core.
//!
//! [`CoreMotion`] is the animation state: every value is approached by the
//! same smoothing law, `current += (target - current) * factor`, evaluated
//! once per tick.  Nothing snaps, so motion stays continuous under uneven
//! frame pacing.  The factor is *not* scaled by delta time; the
//! visual tuning assumes 60 Hz.
//!
//! ## Entities
//!
//! ```text
//! ParallaxRig            (pointer tilt, responsive scale)
//! └── FloatRig           (bobbing / sway)
//!     ├── InnerCore      (spin, pulse, emissive colour)
//!     └── OuterShell     (counter-spin)
//! ```
//!
//! [`core_motion_system`] computes the new state; [`apply_core_motion_system`]
//! copies it onto transforms and the core material.

use crate::constants::*;
use crate::interaction::{InteractionState, PointerPosition};
use crate::tier::FrameSet;
use bevy::prelude::*;

// ── Components ────────────────────────────────────────────────────────────────

/// Marker for the pointer-parallax group.
#[derive(Component)]
pub struct ParallaxRig;

/// Marker for the floating group holding both meshes.
#[derive(Component)]
pub struct FloatRig;

/// Marker for the emissive inner core mesh.
#[derive(Component)]
pub struct InnerCore;

/// Marker for the glass outer shell mesh.
#[derive(Component)]
pub struct OuterShell;

/// Handle to the inner core's material, written every tick.
#[derive(Resource, Clone)]
pub struct CoreMaterial(pub Handle<StandardMaterial>);

/// Animation state of the core.
#[derive(Resource, Debug, Clone, PartialEq)]
pub struct CoreMotion {
    /// Seconds since the scene started, as of the last tick.
    pub elapsed: f32,
    /// Uniform scale of the inner core.
    pub scale: f32,
    pub emissive_intensity: f32,
    /// Inner core base colour (linear RGB).
    pub base_color: Vec3,
    /// Inner core emissive colour (linear RGB).
    pub emissive_color: Vec3,
    /// Inner core Euler rotation (X, Y), accumulated.
    pub inner_rotation: Vec2,
    /// Outer shell Euler rotation (X, Y), accumulated.
    pub outer_rotation: Vec2,
    /// Parallax rig Euler rotation (X, Y).
    pub parallax: Vec2,
    /// Float rig rotation (X, Y, Z) and vertical offset.
    pub float_rotation: Vec3,
    pub float_offset: f32,
    /// Whether the last tick ran in the hovered state.
    pub hovering: bool,
    palette: CorePalette,
}

/// Target colours, converted to linear once at construction.
#[derive(Debug, Clone, Copy, PartialEq)]
struct CorePalette {
    idle_base: Vec3,
    hover_base: Vec3,
    idle_emissive: Vec3,
    hover_emissive: Vec3,
}

impl Default for CorePalette {
    fn default() -> Self {
        Self {
            idle_base: linear_rgb(Color::WHITE),
            hover_base: linear_rgb(Color::srgb_u8(0xff, 0x33, 0x33)),
            idle_emissive: linear_rgb(Color::WHITE),
            hover_emissive: linear_rgb(Color::srgb_u8(0xff, 0x00, 0x00)),
        }
    }
}

fn linear_rgb(color: Color) -> Vec3 {
    let c = color.to_linear();
    Vec3::new(c.red, c.green, c.blue)
}

impl Default for CoreMotion {
    fn default() -> Self {
        let palette = CorePalette::default();
        Self {
            elapsed: 0.0,
            scale: 1.0,
            emissive_intensity: IDLE_EMISSIVE_INTENSITY,
            base_color: palette.idle_base,
            emissive_color: palette.idle_emissive,
            inner_rotation: Vec2::ZERO,
            outer_rotation: Vec2::ZERO,
            parallax: Vec2::ZERO,
            float_rotation: Vec3::ZERO,
            float_offset: 0.0,
            hovering: false,
            palette,
        }
    }
}

/// One exponential-smoothing step toward `target`.
#[inline]
pub fn approach(current: f32, target: f32, factor: f32) -> f32 {
    current + (target - current) * factor
}

/// Pulse scale the core is pulled toward at `elapsed` seconds.
#[inline]
pub fn target_scale(elapsed: f32, hovering: bool) -> f32 {
    if hovering {
        HOVER_PULSE_BASE + (elapsed * HOVER_PULSE_FREQ).sin() * HOVER_PULSE_AMP
    } else {
        IDLE_PULSE_BASE + (elapsed * IDLE_PULSE_FREQ).sin() * IDLE_PULSE_AMP
    }
}

impl CoreMotion {
    /// Advance one tick.
    ///
    /// `pointer` is normalised to `[-1, 1]`.  All divisors are non-zero
    /// constants, so finite inputs always give finite outputs.
    pub fn step(&mut self, elapsed: f32, delta: f32, hovering: bool, pointer: Vec2) {
        self.elapsed = elapsed;
        self.hovering = hovering;
        let speed = if hovering {
            HOVER_SPEED_MULTIPLIER
        } else {
            IDLE_SPEED_MULTIPLIER
        };

        // Spin
        self.inner_rotation.x += delta * INNER_SPIN_X * speed;
        self.inner_rotation.y += delta * INNER_SPIN_Y * speed;
        self.outer_rotation.x -= delta * OUTER_SPIN_X * speed;
        self.outer_rotation.y -= delta * OUTER_SPIN_Y * speed;

        // Pulse
        self.scale = approach(self.scale, target_scale(elapsed, hovering), CORE_SMOOTHING);

        // Glow
        let (intensity, base, emissive) = if hovering {
            (
                HOVER_EMISSIVE_INTENSITY,
                self.palette.hover_base,
                self.palette.hover_emissive,
            )
        } else {
            (
                IDLE_EMISSIVE_INTENSITY,
                self.palette.idle_base,
                self.palette.idle_emissive,
            )
        };
        self.emissive_intensity = approach(self.emissive_intensity, intensity, CORE_SMOOTHING);
        self.base_color = self.base_color.lerp(base, CORE_SMOOTHING);
        self.emissive_color = self.emissive_color.lerp(emissive, CORE_SMOOTHING);

        // Parallax: horizontal pointer turns around Y, vertical tilts around X.
        let target = Vec2::new(-pointer.y, pointer.x) * PARALLAX_MAX_ANGLE;
        self.parallax = self.parallax.lerp(target, PARALLAX_SMOOTHING);

        self.step_float(elapsed, hovering);
    }

    /// Gentle bob and sway of the whole core.
    fn step_float(&mut self, elapsed: f32, hovering: bool) {
        let (speed, rotation_intensity) = if hovering {
            (FLOAT_SPEED_HOVER, FLOAT_ROTATION_HOVER)
        } else {
            (FLOAT_SPEED_IDLE, FLOAT_ROTATION_IDLE)
        };
        let t = elapsed / 4.0 * speed;
        self.float_rotation = Vec3::new(
            t.cos() / 8.0 * rotation_intensity,
            t.sin() / 8.0 * rotation_intensity,
            t.sin() / 20.0 * rotation_intensity,
        );
        // sin(t)/10 spans [-0.1, 0.1]; mapped onto the same range, then scaled.
        self.float_offset = t.sin() / 10.0 * FLOAT_INTENSITY;
    }
}

/// `min(1, viewport_width / RESPONSIVE_FULL_WIDTH)` for a perspective camera
/// at [`CAMERA_DISTANCE`] with vertical fov [`CAMERA_FOV_DEGREES`].
pub fn responsive_scale(aspect_ratio: f32) -> f32 {
    let half_fov = (CAMERA_FOV_DEGREES / 2.0).to_radians();
    let viewport_height = 2.0 * CAMERA_DISTANCE * half_fov.tan();
    let viewport_width = viewport_height * aspect_ratio.max(0.0);
    (viewport_width / RESPONSIVE_FULL_WIDTH).min(1.0)
}

// ── Plugin ────────────────────────────────────────────────────────────────────

pub struct CoreAnimationPlugin;

impl Plugin for CoreAnimationPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<CoreMotion>().add_systems(
            Update,
            (
                core_motion_system,
                apply_core_motion_system,
                responsive_scale_system,
            )
                .chain()
                .in_set(FrameSet::Animate),
        );
    }
}

// ── Update systems ────────────────────────────────────────────────────────────

/// Advance [`CoreMotion`] from the frame clock, hover flag and pointer.
pub fn core_motion_system(
    time: Res<Time>,
    interaction: Res<InteractionState>,
    pointer: Res<PointerPosition>,
    mut motion: ResMut<CoreMotion>,
) {
    motion.step(
        time.elapsed_secs(),
        time.delta_secs(),
        interaction.is_hovering_button(),
        pointer.0,
    );
}

/// Copy [`CoreMotion`] onto the rig transforms and the core material.
#[allow(clippy::type_complexity)]
pub fn apply_core_motion_system(
    motion: Res<CoreMotion>,
    core_material: Option<Res<CoreMaterial>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut inner: Query<&mut Transform, (With<InnerCore>, Without<OuterShell>)>,
    mut outer: Query<&mut Transform, (With<OuterShell>, Without<InnerCore>)>,
    mut float: Query<
        &mut Transform,
        (With<FloatRig>, Without<InnerCore>, Without<OuterShell>),
    >,
    mut parallax: Query<
        &mut Transform,
        (
            With<ParallaxRig>,
            Without<FloatRig>,
            Without<InnerCore>,
            Without<OuterShell>,
        ),
    >,
) {
    for mut t in inner.iter_mut() {
        t.rotation = Quat::from_euler(
            EulerRot::XYZ,
            motion.inner_rotation.x,
            motion.inner_rotation.y,
            0.0,
        );
        t.scale = Vec3::splat(motion.scale);
    }
    for mut t in outer.iter_mut() {
        t.rotation = Quat::from_euler(
            EulerRot::XYZ,
            motion.outer_rotation.x,
            motion.outer_rotation.y,
            0.0,
        );
    }
    for mut t in float.iter_mut() {
        let r = motion.float_rotation;
        t.rotation = Quat::from_euler(EulerRot::XYZ, r.x, r.y, r.z);
        t.translation.y = motion.float_offset;
    }
    for mut t in parallax.iter_mut() {
        t.rotation = Quat::from_euler(EulerRot::XYZ, motion.parallax.x, motion.parallax.y, 0.0);
    }

    let Some(handle) = core_material else {
        return;
    };
    if let Some(mat) = materials.get_mut(&handle.0) {
        let b = motion.base_color;
        let e = motion.emissive_color * motion.emissive_intensity;
        mat.base_color = Color::linear_rgb(b.x, b.y, b.z);
        mat.emissive = LinearRgba::rgb(e.x, e.y, e.z);
    }
}

/// Keep the parallax rig's scale in step with the window aspect ratio.
pub fn responsive_scale_system(
    windows: Query<&Window, With<bevy::window::PrimaryWindow>>,
    mut rigs: Query<&mut Transform, With<ParallaxRig>>,
) {
    let Ok(window) = windows.single() else {
        return;
    };
    if window.height() <= 0.0 {
        return;
    }
    let scale = responsive_scale(window.width() / window.height());
    for mut t in rigs.iter_mut() {
        t.scale = Vec3::splat(scale);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    #[test]
    fn idle_scale_converges_to_pulse() {
        let mut motion = CoreMotion::default();
        let mut t = 0.0;
        for _ in 0..600 {
            t += DT;
            motion.step(t, DT, false, Vec2::ZERO);
        }
        // A factor-0.1 follower on a 3 rad/s sine at 60 Hz trails by ~0.4 rad,
        // bounding the error to ~40 % of the pulse amplitude.
        let expected = 1.0 + (t * 3.0).sin() * 0.05;
        assert!(
            (motion.scale - expected).abs() < 0.5 * IDLE_PULSE_AMP,
            "scale {} vs pulse {}",
            motion.scale,
            expected
        );
    }

    #[test]
    fn constant_target_converges_geometrically() {
        let mut value = 0.0;
        for _ in 0..100 {
            value = approach(value, 1.0, CORE_SMOOTHING);
        }
        assert!((value - 1.0).abs() < 1e-4);
    }

    #[test]
    fn smoothing_never_snaps() {
        let mut motion = CoreMotion::default();
        motion.step(DT, DT, true, Vec2::ZERO);
        assert!(motion.emissive_intensity > IDLE_EMISSIVE_INTENSITY);
        assert!(motion.emissive_intensity < HOVER_EMISSIVE_INTENSITY);
    }

    #[test]
    fn hover_spins_five_times_faster() {
        let mut idle = CoreMotion::default();
        let mut hot = CoreMotion::default();
        idle.step(DT, DT, false, Vec2::ZERO);
        hot.step(DT, DT, true, Vec2::ZERO);
        let ratio = hot.inner_rotation.y / idle.inner_rotation.y;
        assert!((ratio - HOVER_SPEED_MULTIPLIER).abs() < 1e-4);
        assert!(hot.outer_rotation.x < idle.outer_rotation.x);
    }

    #[test]
    fn hover_glow_approaches_red() {
        let mut motion = CoreMotion::default();
        for i in 1..=200 {
            motion.step(i as f32 * DT, DT, true, Vec2::ZERO);
        }
        assert!((motion.emissive_intensity - HOVER_EMISSIVE_INTENSITY).abs() < 1e-3);
        assert!(motion.emissive_color.x > 0.99);
        assert!(motion.emissive_color.y < 1e-3);
    }

    #[test]
    fn parallax_stays_within_max_angle() {
        let mut motion = CoreMotion::default();
        for i in 1..=1000 {
            motion.step(i as f32 * DT, DT, false, Vec2::new(1.0, -1.0));
        }
        assert!(motion.parallax.x.abs() <= PARALLAX_MAX_ANGLE + 1e-5);
        assert!(motion.parallax.y.abs() <= PARALLAX_MAX_ANGLE + 1e-5);
        assert!((motion.parallax.y - PARALLAX_MAX_ANGLE).abs() < 1e-3);
    }

    #[test]
    fn outputs_stay_finite_with_extreme_deltas() {
        let mut motion = CoreMotion::default();
        for i in 0..1000 {
            let dt = if i % 2 == 0 { 0.0 } else { 2.5 };
            motion.step(i as f32, dt, i % 3 == 0, Vec2::ONE);
        }
        assert!(motion.scale.is_finite());
        assert!(motion.inner_rotation.is_finite());
        assert!(motion.base_color.is_finite());
        assert!(motion.float_rotation.is_finite());
    }

    #[test]
    fn responsive_scale_caps_at_one() {
        assert_eq!(responsive_scale(16.0 / 9.0), 1.0);
        let portrait = responsive_scale(9.0 / 19.5);
        assert!(portrait > 0.0 && portrait < 1.0);
    }
}
