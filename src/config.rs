//! Runtime quality-policy configuration loaded from `assets/render.toml`.
//!
//! [`RenderConfig`] is a Bevy [`Resource`] that mirrors the deployment-tunable
//! constants in [`crate::constants`].  [`load_render_config`] reads
//! `assets/render.toml` and overwrites the defaults with any values present in
//! the file.  Missing keys fall back to the compile-time defaults, so a minimal
//! TOML can override just the values you care about:
//!
//! ```toml
//! # assets/render.toml
//! flipflops = 5
//! forced_tier = "medium"
//! ```
//!
//! Unlike most resources, the config is loaded in `main` *before* the app is
//! built: the tier classifier and GPU probe need it before the renderer
//! exists.  The `QUANTUM_CORE_TIER` environment variable overrides
//! `forced_tier`.

use crate::constants::*;
use crate::error::{validate_positive, validate_unit_fraction, CoreError, CoreResult};
use crate::monitor::MonitorSettings;
use crate::tier::PerformanceTier;
use bevy::prelude::*;
use serde::Deserialize;

/// Default location of the config file, relative to the working directory.
pub const RENDER_CONFIG_PATH: &str = "assets/render.toml";

/// Environment variable that forces a tier, e.g. `QUANTUM_CORE_TIER=low`.
pub const FORCED_TIER_ENV: &str = "QUANTUM_CORE_TIER";

/// Runtime-tunable quality policy.
#[derive(Resource, Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    // ── Tier Classification ───────────────────────────────────────────────────
    pub mobile_viewport_width: f32,
    pub low_end_cores: u32,
    pub low_end_memory_gb: f32,
    /// Skip classification and use this tier.
    pub forced_tier: Option<PerformanceTier>,

    // ── Adaptive Monitor ──────────────────────────────────────────────────────
    pub monitor_window_secs: f32,
    pub decline_fps: f32,
    pub incline_fps: f32,
    pub flipflops: u32,
    pub scale_step: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            mobile_viewport_width: MOBILE_VIEWPORT_WIDTH,
            low_end_cores: LOW_END_CORES,
            low_end_memory_gb: LOW_END_MEMORY_GB,
            forced_tier: None,
            monitor_window_secs: MONITOR_WINDOW_SECS,
            decline_fps: MONITOR_DECLINE_FPS,
            incline_fps: MONITOR_INCLINE_FPS,
            flipflops: MONITOR_FLIPFLOPS,
            scale_step: MONITOR_SCALE_STEP,
        }
    }
}

impl RenderConfig {
    /// Check the monitor settings for values that would stall or invert it.
    pub fn validate(&self) -> CoreResult<()> {
        validate_positive("mobile_viewport_width", self.mobile_viewport_width)?;
        validate_positive("monitor_window_secs", self.monitor_window_secs)?;
        validate_positive("decline_fps", self.decline_fps)?;
        validate_unit_fraction("scale_step", self.scale_step)?;
        if self.incline_fps <= self.decline_fps {
            return Err(CoreError::InvalidSetting {
                name: "incline_fps",
                value: self.incline_fps,
                safe_range: "(decline_fps, ∞)",
            });
        }
        if self.flipflops == 0 {
            return Err(CoreError::InvalidSetting {
                name: "flipflops",
                value: 0.0,
                safe_range: "[1, ∞)",
            });
        }
        Ok(())
    }

    /// Monitor settings derived from this config.
    pub fn monitor_settings(&self) -> MonitorSettings {
        MonitorSettings {
            window_secs: self.monitor_window_secs,
            decline_fps: self.decline_fps,
            incline_fps: self.incline_fps,
            flipflops: self.flipflops,
            step: self.scale_step,
        }
    }

    /// Parse a TOML document; missing keys keep their defaults.
    pub fn from_toml(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Apply the `QUANTUM_CORE_TIER` override if the variable holds a valid tier.
    pub fn apply_env_override(&mut self, value: Option<&str>) {
        let Some(value) = value else {
            return;
        };
        match value.parse::<PerformanceTier>() {
            Ok(tier) => self.forced_tier = Some(tier),
            Err(e) => eprintln!("⚠ Ignoring {FORCED_TIER_ENV}: {e}"),
        }
    }
}

/// Attempt to load `path` and return the resulting config.
///
/// Missing keys retain their compiled defaults.  TOML parse errors and
/// failed validation are printed to stderr and yield the defaults.  A
/// missing file is not an error.
pub fn load_render_config(path: &str) -> RenderConfig {
    let mut config = match std::fs::read_to_string(path) {
        Ok(contents) => match RenderConfig::from_toml(&contents) {
            Ok(loaded) => match loaded.validate() {
                Ok(()) => {
                    println!("✓ Loaded render config from {path}");
                    loaded
                }
                Err(e) => {
                    eprintln!("⚠ Rejected {path}: {e}; using defaults");
                    RenderConfig::default()
                }
            },
            Err(e) => {
                eprintln!("⚠ Failed to parse {path}: {e}; using defaults");
                RenderConfig::default()
            }
        },
        Err(_) => {
            // Missing file is the normal case.
            println!("ℹ No {path} found; using compiled defaults");
            RenderConfig::default()
        }
    };

    config.apply_env_override(std::env::var(FORCED_TIER_ENV).ok().as_deref());
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_remaining_defaults() {
        let config = RenderConfig::from_toml("flipflops = 5\nforced_tier = \"low\"\n")
            .expect("valid toml");
        assert_eq!(config.flipflops, 5);
        assert_eq!(config.forced_tier, Some(PerformanceTier::Low));
        assert_eq!(config.decline_fps, MONITOR_DECLINE_FPS);
        assert_eq!(config.mobile_viewport_width, MOBILE_VIEWPORT_WIDTH);
    }

    #[test]
    fn unknown_tier_name_is_a_parse_error() {
        assert!(RenderConfig::from_toml("forced_tier = \"ultra\"").is_err());
    }

    #[test]
    fn defaults_validate() {
        assert!(RenderConfig::default().validate().is_ok());
    }

    #[test]
    fn inverted_fps_bounds_are_rejected() {
        let config = RenderConfig {
            decline_fps: 60.0,
            incline_fps: 30.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_flipflops_are_rejected() {
        let config = RenderConfig {
            flipflops: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn env_override_sets_forced_tier() {
        let mut config = RenderConfig::default();
        config.apply_env_override(Some("medium"));
        assert_eq!(config.forced_tier, Some(PerformanceTier::Medium));

        config.apply_env_override(Some("bogus"));
        assert_eq!(config.forced_tier, Some(PerformanceTier::Medium));

        config.apply_env_override(None);
        assert_eq!(config.forced_tier, Some(PerformanceTier::Medium));
    }

    #[test]
    fn missing_file_yields_defaults() {
        let config = load_render_config("does/not/exist.toml");
        assert_eq!(config.flipflops, MONITOR_FLIPFLOPS);
    }
}
