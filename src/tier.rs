//! Performance tier classification and the active quality resource.
//!
//! ## Flow
//!
//! 1. `main` gathers [`DeviceCapabilitySignals`] (see [`crate::device`]) and
//!    inserts them as a resource before the app runs.
//! 2. Until the first `Update` tick, [`ActiveQuality`] holds the `High`
//!    bundle so startup spawning is deterministic and capability-independent.
//! 3. [`resolve_tier_system`] runs once, classifies, stores the result and
//!    sends [`TierResolved`]; scene systems reconcile against that message.
//!
//! With no signals resource at all (headless runs, tests) resolution yields
//! `High` without probing anything.

use crate::config::RenderConfig;
use crate::device::DeviceCapabilitySignals;
use crate::quality::{bundle_for, RenderParameterBundle};
use bevy::prelude::*;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

// ── Tier ──────────────────────────────────────────────────────────────────────

/// Discrete device-capability bucket.
///
/// Variants are declared in decreasing capability order, so `High < Low`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PerformanceTier {
    #[default]
    High,
    Medium,
    Low,
}

impl PerformanceTier {
    pub const ALL: [PerformanceTier; 3] = [
        PerformanceTier::High,
        PerformanceTier::Medium,
        PerformanceTier::Low,
    ];

    #[inline]
    pub fn label(self) -> &'static str {
        match self {
            PerformanceTier::High => "high",
            PerformanceTier::Medium => "medium",
            PerformanceTier::Low => "low",
        }
    }
}

impl fmt::Display for PerformanceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for PerformanceTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(PerformanceTier::High),
            "medium" => Ok(PerformanceTier::Medium),
            "low" => Ok(PerformanceTier::Low),
            other => Err(format!("unknown performance tier '{other}'")),
        }
    }
}

// ── Classification ────────────────────────────────────────────────────────────

/// Thresholds below which a mobile device is considered low-end.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LowEndThresholds {
    pub max_cores: u32,
    pub max_memory_gb: f32,
}

impl From<&RenderConfig> for LowEndThresholds {
    fn from(config: &RenderConfig) -> Self {
        Self {
            max_cores: config.low_end_cores,
            max_memory_gb: config.low_end_memory_gb,
        }
    }
}

impl Default for LowEndThresholds {
    fn default() -> Self {
        Self::from(&RenderConfig::default())
    }
}

/// Classify a device.  Deterministic and side-effect free.
///
/// Desktops always get `High`; only mobile devices with a weak spot
/// (few cores, little memory, or a known weak GPU) drop to `Low`.
pub fn classify(signals: &DeviceCapabilitySignals, thresholds: LowEndThresholds) -> PerformanceTier {
    if !signals.is_mobile {
        return PerformanceTier::High;
    }
    let low_end = signals.cores <= thresholds.max_cores
        || signals.memory_gb <= thresholds.max_memory_gb
        || is_weak_gpu(&signals.gpu_renderer);
    if low_end {
        PerformanceTier::Low
    } else {
        PerformanceTier::Medium
    }
}

/// Match the renderer string against known low-end GPU families:
/// Adreno 3xx/4xx/5xx, Mali-4xx and Mali-T600 series, PowerVR SGX, and the
/// SwiftShader software rasteriser.  Case-insensitive.
pub fn is_weak_gpu(renderer: &str) -> bool {
    let r = renderer.to_ascii_lowercase();

    let adreno = after_each(&r, "adreno", |rest| {
        // Drivers report both "Adreno 530" and "Adreno (TM) 530".
        let rest = rest.trim_start();
        let rest = rest.strip_prefix("(tm)").unwrap_or(rest).trim_start();
        let digits: Vec<u8> = rest.bytes().take(3).collect();
        digits.len() == 3
            && matches!(digits[0], b'3'..=b'5')
            && digits[1].is_ascii_digit()
            && digits[2].is_ascii_digit()
    });
    let mali = after_each(&r, "mali-", |rest| {
        let mut bytes = rest.bytes();
        matches!(
            (bytes.next(), bytes.next()),
            (Some(b'4' | b't'), Some(b'0'..=b'6'))
        )
    });
    let powervr = after_each(&r, "powervr", |rest| rest.trim_start().starts_with("sgx"));

    adreno || mali || powervr || r.contains("swiftshader")
}

/// `true` if `predicate` holds for the text following any occurrence of `needle`.
fn after_each(haystack: &str, needle: &str, predicate: impl Fn(&str) -> bool) -> bool {
    haystack
        .match_indices(needle)
        .any(|(i, _)| predicate(&haystack[i + needle.len()..]))
}

// ── Resources & messages ──────────────────────────────────────────────────────

/// The tier and bundle the scene is currently built from.
///
/// Exactly one bundle is active per session.  `resolved` flips to `true`
/// once the classifier has run.
#[derive(Resource, Debug, Clone, Copy)]
pub struct ActiveQuality {
    pub tier: PerformanceTier,
    pub bundle: &'static RenderParameterBundle,
    pub resolved: bool,
}

impl Default for ActiveQuality {
    fn default() -> Self {
        Self {
            tier: PerformanceTier::High,
            bundle: bundle_for(PerformanceTier::High),
            resolved: false,
        }
    }
}

/// Sent once when classification completes.
#[derive(Message, Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierResolved {
    pub tier: PerformanceTier,
}

// ── Plugin ────────────────────────────────────────────────────────────────────

/// Per-tick ordering shared by every frame system in the crate.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum FrameSet {
    /// Tier resolution and scene reconciliation.
    Resolve,
    /// Interaction flag capture from UI and pointer input.
    Interaction,
    /// Core animation state update.
    Animate,
    /// Particle phase advance and instance buffer fill.
    Particles,
    /// Instance buffer flush to the instanced entities.
    Flush,
    /// Adaptive resolution monitoring.
    Monitor,
}

pub struct TierPlugin;

impl Plugin for TierPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ActiveQuality>()
            .add_message::<TierResolved>()
            .configure_sets(
                Update,
                (
                    FrameSet::Resolve,
                    FrameSet::Interaction,
                    FrameSet::Animate,
                    FrameSet::Particles,
                    FrameSet::Flush,
                    FrameSet::Monitor,
                )
                    .chain(),
            )
            .add_systems(
                Update,
                resolve_tier_system
                    .in_set(FrameSet::Resolve)
                    .run_if(tier_unresolved),
            );
    }
}

/// Run condition: classification has not happened yet.
pub fn tier_unresolved(quality: Res<ActiveQuality>) -> bool {
    !quality.resolved
}

/// Classify the device (or honour a forced tier) and publish the bundle.
pub fn resolve_tier_system(
    signals: Option<Res<DeviceCapabilitySignals>>,
    config: Res<RenderConfig>,
    mut quality: ResMut<ActiveQuality>,
    mut resolved: MessageWriter<TierResolved>,
) {
    let tier = match (config.forced_tier, signals) {
        (Some(forced), _) => {
            info!("Performance tier forced to {forced}");
            forced
        }
        (None, Some(signals)) => {
            let tier = classify(&signals, LowEndThresholds::from(&*config));
            info!(
                "Performance tier {tier} (mobile: {}, cores: {}, memory: {:.1} GB, gpu: '{}', max texture: {})",
                signals.is_mobile,
                signals.cores,
                signals.memory_gb,
                signals.gpu_renderer,
                signals.max_texture_size
            );
            tier
        }
        (None, None) => {
            debug!("No device signals available; defaulting to high tier");
            PerformanceTier::High
        }
    };

    *quality = ActiveQuality {
        tier,
        bundle: bundle_for(tier),
        resolved: true,
    };
    resolved.write(TierResolved { tier });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mobile(cores: u32, memory_gb: f32, gpu: &str) -> DeviceCapabilitySignals {
        DeviceCapabilitySignals {
            is_mobile: true,
            cores,
            memory_gb,
            gpu_renderer: gpu.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn weak_gpu_families_match() {
        assert!(is_weak_gpu("Adreno (TM) 418"));
        assert!(is_weak_gpu("Qualcomm Adreno 540"));
        assert!(is_weak_gpu("Mali-T628"));
        assert!(is_weak_gpu("ARM Mali-400 MP"));
        assert!(is_weak_gpu("PowerVR SGX 544MP"));
        assert!(is_weak_gpu("Google SwiftShader"));
    }

    #[test]
    fn capable_gpus_do_not_match() {
        assert!(!is_weak_gpu("Adreno (TM) 740"));
        assert!(!is_weak_gpu("Adreno (TM) 30"));
        assert!(!is_weak_gpu("Mali-G78"));
        assert!(!is_weak_gpu("Mali-T760"));
        assert!(!is_weak_gpu("Apple M2"));
        assert!(!is_weak_gpu("NVIDIA GeForce RTX 4080"));
        assert!(!is_weak_gpu(""));
    }

    #[test]
    fn healthy_mobile_is_medium() {
        let tier = classify(&mobile(8, 6.0, "Adreno (TM) 740"), LowEndThresholds::default());
        assert_eq!(tier, PerformanceTier::Medium);
    }

    #[test]
    fn weak_gpu_on_mobile_is_low() {
        let tier = classify(&mobile(8, 8.0, "Mali-T628"), LowEndThresholds::default());
        assert_eq!(tier, PerformanceTier::Low);
        let tier = classify(&mobile(8, 8.0, "ARM Mali-400 MP"), LowEndThresholds::default());
        assert_eq!(tier, PerformanceTier::Low);
        // T7xx and later are outside the weak family.
        let tier = classify(&mobile(8, 8.0, "Mali-T860"), LowEndThresholds::default());
        assert_eq!(tier, PerformanceTier::Medium);
    }

    #[test]
    fn tier_order_is_decreasing_capability() {
        assert!(PerformanceTier::High < PerformanceTier::Medium);
        assert!(PerformanceTier::Medium < PerformanceTier::Low);
    }

    #[test]
    fn tier_parses_case_insensitively() {
        assert_eq!("LOW".parse::<PerformanceTier>(), Ok(PerformanceTier::Low));
        assert_eq!(" medium ".parse::<PerformanceTier>(), Ok(PerformanceTier::Medium));
        assert!("ultra".parse::<PerformanceTier>().is_err());
    }

    #[test]
    fn resolve_without_signals_is_high() {
        let mut world = World::new();
        world.insert_resource(RenderConfig::default());
        world.init_resource::<ActiveQuality>();
        world.init_resource::<Messages<TierResolved>>();

        let mut schedule = Schedule::default();
        schedule.add_systems(resolve_tier_system);
        schedule.run(&mut world);

        let quality = world.resource::<ActiveQuality>();
        assert!(quality.resolved);
        assert_eq!(quality.tier, PerformanceTier::High);
    }

    #[test]
    fn forced_tier_overrides_signals() {
        let mut world = World::new();
        world.insert_resource(RenderConfig {
            forced_tier: Some(PerformanceTier::Medium),
            ..Default::default()
        });
        world.insert_resource(DeviceCapabilitySignals::default());
        world.init_resource::<ActiveQuality>();
        world.init_resource::<Messages<TierResolved>>();

        let mut schedule = Schedule::default();
        schedule.add_systems(resolve_tier_system);
        schedule.run(&mut world);

        let quality = world.resource::<ActiveQuality>();
        assert_eq!(quality.tier, PerformanceTier::Medium);
        assert_eq!(quality.bundle, bundle_for(PerformanceTier::Medium));
    }
}
