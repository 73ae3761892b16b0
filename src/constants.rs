//! Centralised quality-policy and animation constants.
//!
//! All tuneable values live here so they can be found, reasoned-about, and
//! modified in one place without source-diving across multiple modules.
//!
//! ## Tuning guidance
//!
//! Values that a deployment is expected to tune (classification thresholds,
//! monitor windows) are mirrored in [`crate::config::RenderConfig`] and can be
//! overridden from `assets/render.toml`.  Animation constants are visual
//! tuning and are read directly.

use std::f32::consts::PI;

// ── Tier Classification ───────────────────────────────────────────────────────

/// Viewports narrower than this (logical px) are treated as mobile.
pub const MOBILE_VIEWPORT_WIDTH: f32 = 768.0;

/// Devices at or below this logical core count are low-end when mobile.
pub const LOW_END_CORES: u32 = 2;

/// Devices at or below this memory (GB) are low-end when mobile.
pub const LOW_END_MEMORY_GB: f32 = 2.0;

/// Core count assumed when the host does not report one.
///
/// Mid-range on purpose: unknown desktops must not be downgraded.
pub const DEFAULT_CORES: u32 = 4;

/// Memory (GB) assumed when the host does not report it.
pub const DEFAULT_MEMORY_GB: f32 = 4.0;

/// Max texture dimension assumed when the GPU probe fails.
pub const DEFAULT_MAX_TEXTURE_SIZE: u32 = 4096;

/// User-agent fragments that identify a phone or tablet (matched case-insensitively).
pub const MOBILE_USER_AGENT_TOKENS: [&str; 8] = [
    "android",
    "webos",
    "iphone",
    "ipad",
    "ipod",
    "blackberry",
    "iemobile",
    "opera mini",
];

// ── Adaptive Monitor ──────────────────────────────────────────────────────────

/// Length of one frame-rate evaluation window (s).
pub const MONITOR_WINDOW_SECS: f32 = 0.25;

/// Average fps below which a window counts as degraded.
///
/// 40 fps is the lower bound used for 60 Hz displays; a 120 Hz display that
/// drops to 40 is already badly overloaded.
pub const MONITOR_DECLINE_FPS: f32 = 40.0;

/// Average fps above which a window counts as having headroom.
pub const MONITOR_INCLINE_FPS: f32 = 55.0;

/// Consecutive degraded (or healthy) windows required before the monitor acts.
pub const MONITOR_FLIPFLOPS: u32 = 3;

/// Resolution-scale change applied per monitor action.
pub const MONITOR_SCALE_STEP: f32 = 0.1;

// ── Core Animation ────────────────────────────────────────────────────────────

/// Speed multiplier applied to all rotations while the CTA button is hovered.
pub const HOVER_SPEED_MULTIPLIER: f32 = 5.0;

/// Speed multiplier while idle.
pub const IDLE_SPEED_MULTIPLIER: f32 = 1.0;

/// Inner core rotation rates (rad/s at multiplier 1) around X and Y.
pub const INNER_SPIN_X: f32 = 0.5;
pub const INNER_SPIN_Y: f32 = 0.8;

/// Outer shell rotation rates (rad/s at multiplier 1); applied counter-wise.
pub const OUTER_SPIN_X: f32 = 0.2;
pub const OUTER_SPIN_Y: f32 = 0.3;

/// Idle pulse: `IDLE_PULSE_BASE + sin(t · IDLE_PULSE_FREQ) · IDLE_PULSE_AMP`.
pub const IDLE_PULSE_BASE: f32 = 1.0;
pub const IDLE_PULSE_FREQ: f32 = 3.0;
pub const IDLE_PULSE_AMP: f32 = 0.05;

/// Hover pulse: larger, faster heartbeat.
pub const HOVER_PULSE_BASE: f32 = 1.2;
pub const HOVER_PULSE_FREQ: f32 = 15.0;
pub const HOVER_PULSE_AMP: f32 = 0.1;

/// Emissive intensity endpoints.
pub const IDLE_EMISSIVE_INTENSITY: f32 = 2.0;
pub const HOVER_EMISSIVE_INTENSITY: f32 = 5.0;

/// Per-tick interpolation factor for scale, emissive and colours.
///
/// Applied once per tick regardless of delta time, so convergence in wall
/// clock time depends on frame rate.  Visual tuning was done at 60 Hz.
pub const CORE_SMOOTHING: f32 = 0.1;

/// Per-tick interpolation factor for the pointer parallax.
pub const PARALLAX_SMOOTHING: f32 = 0.05;

/// Maximum parallax tilt (rad) at the edge of the viewport.
pub const PARALLAX_MAX_ANGLE: f32 = PI / 8.0;

/// Float rig: speed (hover / idle), rotation intensity (hover / idle) and
/// vertical float intensity.
pub const FLOAT_SPEED_HOVER: f32 = 5.0;
pub const FLOAT_SPEED_IDLE: f32 = 2.0;
pub const FLOAT_ROTATION_HOVER: f32 = 2.0;
pub const FLOAT_ROTATION_IDLE: f32 = 1.0;
pub const FLOAT_INTENSITY: f32 = 1.5;

/// World-space viewport width at which the core renders at full size.
pub const RESPONSIVE_FULL_WIDTH: f32 = 6.0;

// ── Scene ─────────────────────────────────────────────────────────────────────

/// Camera distance from the origin and vertical field of view (degrees).
pub const CAMERA_DISTANCE: f32 = 7.0;
pub const CAMERA_FOV_DEGREES: f32 = 45.0;

/// Radius of the inner wireframe core and the outer glass shell.
pub const INNER_CORE_RADIUS: f32 = 1.0;
pub const OUTER_SHELL_RADIUS: f32 = 2.0;

/// Subdivision level of the inner core icosphere.
pub const INNER_CORE_DETAIL: u32 = 1;

/// Height of the contact-shadow catcher below the core.
pub const SHADOW_PLANE_Y: f32 = -3.0;

/// Radius of the shadow catcher disc.
pub const SHADOW_PLANE_RADIUS: f32 = 10.0;

/// Opacity of the shadow catcher.
pub const SHADOW_PLANE_OPACITY: f32 = 0.5;

/// Highest shell subdivision tried when the requested level fails to build.
pub const SHELL_FALLBACK_DETAIL: u32 = 8;

/// Ambient fill brightness (cd/m²).
pub const AMBIENT_BRIGHTNESS: f32 = 400.0;

/// Key light position and illuminance (lux).
pub const KEY_LIGHT_POSITION: [f32; 3] = [10.0, 10.0, 5.0];
pub const KEY_LIGHT_ILLUMINANCE: f32 = 2_000.0;

/// Camera auto-orbit speed (rad/s), one revolution every two minutes.
pub const ORBIT_AUTO_ROTATE_SPEED: f32 = PI / 60.0;

/// Radians of orbit per pixel of pointer drag.
pub const ORBIT_DRAG_SENSITIVITY: f32 = 0.005;

/// Orbit pitch limit either side of the horizon.
pub const ORBIT_PITCH_LIMIT: f32 = PI / 2.0 - 0.05;

// ── Particles ─────────────────────────────────────────────────────────────────

/// Uniform scale of the particle cloud root.
pub const PARTICLE_CLOUD_SCALE: f32 = 0.1;

/// Radius of a single particle mesh.
pub const PARTICLE_RADIUS: f32 = 0.2;

/// Opacity of the particle material.
pub const PARTICLE_OPACITY: f32 = 0.5;

/// Initial phase draw range.
pub const PARTICLE_PHASE_MAX: f64 = 100.0;

/// Trajectory factor draw range `[MIN, MIN + SPAN)`.
pub const PARTICLE_FACTOR_MIN: f32 = 20.0;
pub const PARTICLE_FACTOR_SPAN: f32 = 100.0;

/// Oscillation speed draw range `[MIN, MIN + SPAN)`.
pub const PARTICLE_SPEED_MIN: f64 = 0.01;
pub const PARTICLE_SPEED_SPAN: f64 = 0.005;

/// Half-extent of the per-particle positional offset draw.
pub const PARTICLE_OFFSET_RANGE: f32 = 50.0;

/// Multiplier from `cos(phase)` to the per-axis Euler rotation.
pub const PARTICLE_SPIN: f32 = 5.0;

// ── Stars ─────────────────────────────────────────────────────────────────────

/// Inner radius and shell depth of the background star field.
pub const STAR_RADIUS: f32 = 100.0;
pub const STAR_DEPTH: f32 = 50.0;

/// Twinkle clock rate (rad/s at multiplier 1).
pub const STAR_TWINKLE_RATE: f32 = 1.0;

/// Brightness of a star at the dim end of its twinkle; the bright end is 1.
pub const STAR_TWINKLE_FLOOR: f32 = 0.35;
