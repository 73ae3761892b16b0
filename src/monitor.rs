//! Adaptive resolution monitor.
//!
//! Watches the achieved frame rate in fixed-length evaluation windows and
//! nudges the live resolution scale inside the active bundle's declared
//! range.  It never re-classifies the tier and never touches discrete counts
//! (particles, stars, shadows): the scale is the only knob.
//!
//! The ceiling is the bundle maximum or the display's native pixel density,
//! whichever is lower, so a 1× display never renders above 1×.  The scale is
//! applied by resizing the scene's render target (see
//! [`crate::graphics::apply_resolution_scale_system`]); the window itself is
//! never resized.
//!
//! ## Policy
//!
//! | Window average          | Effect after `flipflops` consecutive windows |
//! |-------------------------|----------------------------------------------|
//! | `< decline_fps`         | scale −= `step`, floored at range min        |
//! | `> incline_fps`         | scale += `step`, capped at the ceiling       |
//! | in between              | both streaks reset                           |
//!
//! A degraded streak while already at the floor is reported once as a
//! fallback.  That is a steady-state signal, logged at `warn`, not an error.

use crate::quality::ResolutionScaleRange;
use crate::tier::{resolve_tier_system, ActiveQuality, FrameSet, TierResolved};
use bevy::prelude::*;
use bevy::window::PrimaryWindow;

/// Monitor tuning; see [`crate::config::RenderConfig::monitor_settings`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonitorSettings {
    pub window_secs: f32,
    pub decline_fps: f32,
    pub incline_fps: f32,
    pub flipflops: u32,
    pub step: f32,
}

/// Outcome of a completed evaluation streak.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MonitorVerdict {
    /// Scale lowered to the contained value.
    Declined(f32),
    /// Scale raised to the contained value.
    Inclined(f32),
    /// Still degraded at the range floor; nothing left to lower.
    Fallback,
}

/// Sent whenever the live resolution scale changes.
#[derive(Message, Debug, Clone, Copy, PartialEq)]
pub struct ResolutionScaleChanged {
    pub scale: f32,
}

/// Rolling frame-rate monitor owning the live resolution scale.
#[derive(Resource, Debug, Clone)]
pub struct AdaptiveMonitor {
    settings: MonitorSettings,
    range: ResolutionScaleRange,
    scale: f32,
    window_elapsed: f32,
    window_frames: u32,
    low_streak: u32,
    high_streak: u32,
    fallback_reported: bool,
}

impl AdaptiveMonitor {
    /// Start a monitor for a bundle `range` on a display of `native` pixel
    /// density.  The scale starts at the ceiling.
    pub fn new(settings: MonitorSettings, range: ResolutionScaleRange, native: f32) -> Self {
        let range = range.capped_at(native);
        Self {
            settings,
            range,
            scale: range.max,
            window_elapsed: 0.0,
            window_frames: 0,
            low_streak: 0,
            high_streak: 0,
            fallback_reported: false,
        }
    }

    #[inline]
    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Effective range: the bundle range with its ceiling capped at the
    /// native density.
    #[inline]
    pub fn range(&self) -> ResolutionScaleRange {
        self.range
    }

    /// Start from `scale` instead of the ceiling, clamped into the range.
    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = self.range.clamp(scale);
        self
    }

    /// Adopt a new bundle range and restart evaluation at its ceiling.
    pub fn reset(&mut self, range: ResolutionScaleRange, native: f32) {
        *self = Self::new(self.settings, range, native);
    }

    /// Feed one frame's delta time (s).  Returns a verdict when a streak completes.
    pub fn sample(&mut self, delta_secs: f32) -> Option<MonitorVerdict> {
        if !delta_secs.is_finite() || delta_secs <= 0.0 {
            return None;
        }

        self.window_elapsed += delta_secs;
        self.window_frames += 1;
        if self.window_elapsed < self.settings.window_secs {
            return None;
        }

        let fps = self.window_frames as f32 / self.window_elapsed;
        self.window_elapsed = 0.0;
        self.window_frames = 0;

        if fps < self.settings.decline_fps {
            self.low_streak += 1;
            self.high_streak = 0;
        } else if fps > self.settings.incline_fps {
            self.high_streak += 1;
            self.low_streak = 0;
        } else {
            self.low_streak = 0;
            self.high_streak = 0;
        }

        if self.low_streak >= self.settings.flipflops {
            self.low_streak = 0;
            let lowered = self.range.clamp(self.scale - self.settings.step);
            if lowered < self.scale {
                self.scale = lowered;
                return Some(MonitorVerdict::Declined(lowered));
            }
            if !self.fallback_reported {
                self.fallback_reported = true;
                return Some(MonitorVerdict::Fallback);
            }
        } else if self.high_streak >= self.settings.flipflops {
            self.high_streak = 0;
            let raised = self.range.clamp(self.scale + self.settings.step);
            if raised > self.scale {
                self.scale = raised;
                self.fallback_reported = false;
                return Some(MonitorVerdict::Inclined(raised));
            }
        }
        None
    }
}

// ── Plugin ────────────────────────────────────────────────────────────────────

/// Registers the monitor systems.  Expects [`AdaptiveMonitor`] to be
/// inserted by the app (see `main.rs`).  Applying the published scale is the
/// graphics plugin's job.
pub struct MonitorPlugin;

impl Plugin for MonitorPlugin {
    fn build(&self, app: &mut App) {
        app.add_message::<ResolutionScaleChanged>().add_systems(
            Update,
            (
                reset_monitor_on_tier_system
                    .in_set(FrameSet::Resolve)
                    .after(resolve_tier_system),
                adaptive_monitor_system.in_set(FrameSet::Monitor),
            ),
        );
    }
}

/// Native pixel density of the primary window, or `1.0` headless.
fn native_scale(windows: &Query<&Window, With<PrimaryWindow>>) -> f32 {
    windows
        .single()
        .map(|w| w.resolution.base_scale_factor())
        .unwrap_or(1.0)
}

/// Re-seat the monitor on the resolved bundle's range.
pub fn reset_monitor_on_tier_system(
    mut resolved: MessageReader<TierResolved>,
    quality: Res<ActiveQuality>,
    windows: Query<&Window, With<PrimaryWindow>>,
    mut monitor: ResMut<AdaptiveMonitor>,
    mut changed: MessageWriter<ResolutionScaleChanged>,
) {
    if resolved.read().last().is_none() {
        return;
    }
    monitor.reset(quality.bundle.resolution_scale, native_scale(&windows));
    changed.write(ResolutionScaleChanged {
        scale: monitor.scale(),
    });
}

/// Feed frame time into the monitor and publish scale changes.
pub fn adaptive_monitor_system(
    time: Res<Time>,
    mut monitor: ResMut<AdaptiveMonitor>,
    mut changed: MessageWriter<ResolutionScaleChanged>,
) {
    match monitor.sample(time.delta_secs()) {
        Some(MonitorVerdict::Declined(scale)) => {
            info!("Frame rate below target; resolution scale lowered to {scale:.2}");
            changed.write(ResolutionScaleChanged { scale });
        }
        Some(MonitorVerdict::Inclined(scale)) => {
            debug!("Frame rate has headroom; resolution scale raised to {scale:.2}");
            changed.write(ResolutionScaleChanged { scale });
        }
        Some(MonitorVerdict::Fallback) => {
            warn!(
                "Performance fallback: frame rate still low at minimum resolution scale {:.2}",
                monitor.scale()
            );
        }
        None => {}
    }
}
