//! Device capability signals and the throwaway GPU probe.
//!
//! Signals are gathered once, in `main`, before the Bevy app creates its
//! rendering device.  The probe opens its own wgpu instance and adapter,
//! reads two parameters, and drops both before returning, so it never
//! competes with the real renderer for a context.
//!
//! Every signal is best-effort.  A missing value becomes the mid-range
//! default from [`crate::constants`]; a failed probe becomes an empty renderer
//! string.  Nothing here returns an error to the caller of [`gather_signals`].

use crate::constants::{
    DEFAULT_CORES, DEFAULT_MAX_TEXTURE_SIZE, DEFAULT_MEMORY_GB, MOBILE_USER_AGENT_TOKENS,
};
use crate::error::{CoreError, CoreResult};
use bevy::prelude::*;

// ── Signals ───────────────────────────────────────────────────────────────────

/// Snapshot of what the host tells us about itself.  Never persisted.
#[derive(Resource, Debug, Clone, PartialEq)]
pub struct DeviceCapabilitySignals {
    /// Touch device, phone/tablet user agent, or narrow viewport.
    pub is_mobile: bool,
    /// Logical core count.
    pub cores: u32,
    /// Approximate device memory in GB.
    pub memory_gb: f32,
    /// Adapter / renderer name; empty when unknown.
    pub gpu_renderer: String,
    /// Maximum supported 2D texture dimension.
    pub max_texture_size: u32,
}

impl Default for DeviceCapabilitySignals {
    fn default() -> Self {
        Self {
            is_mobile: false,
            cores: DEFAULT_CORES,
            memory_gb: DEFAULT_MEMORY_GB,
            gpu_renderer: String::new(),
            max_texture_size: DEFAULT_MAX_TEXTURE_SIZE,
        }
    }
}

/// Raw host inputs before defaults are applied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HostSignals {
    /// User-agent style platform string.
    pub user_agent: String,
    pub touch_capable: bool,
    /// Logical width of the primary viewport (px).
    pub viewport_width: f32,
    pub cores: Option<u32>,
    pub memory_gb: Option<f32>,
}

impl HostSignals {
    /// Read host signals from the running process.
    ///
    /// Native builds have no browser user agent, so the OS and architecture
    /// stand in for it; Android and iOS builds are treated as touch devices.
    pub fn from_environment(viewport_width: f32) -> Self {
        let os = std::env::consts::OS;
        let cores = std::thread::available_parallelism()
            .ok()
            .map(|n| n.get() as u32);

        Self {
            user_agent: format!("{} ({})", os, std::env::consts::ARCH),
            touch_capable: matches!(os, "android" | "ios"),
            viewport_width,
            cores,
            memory_gb: total_memory_gb(),
        }
    }
}

/// Total physical memory in GB, or `None` when the platform does not report it.
fn total_memory_gb() -> Option<f32> {
    let mut system = sysinfo::System::new();
    system.refresh_memory();
    let bytes = system.total_memory();
    if bytes == 0 {
        return None;
    }
    Some(bytes as f32 / (1024.0 * 1024.0 * 1024.0))
}

/// Case-insensitive match of the phone/tablet user-agent families.
pub fn is_mobile_user_agent(user_agent: &str) -> bool {
    let ua = user_agent.to_ascii_lowercase();
    MOBILE_USER_AGENT_TOKENS.iter().any(|token| ua.contains(token))
}

// ── GPU probe ─────────────────────────────────────────────────────────────────

/// Parameters read from a disposable graphics adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GpuCapabilities {
    pub renderer: String,
    pub max_texture_size: u32,
}

impl Default for GpuCapabilities {
    fn default() -> Self {
        Self {
            renderer: String::new(),
            max_texture_size: DEFAULT_MAX_TEXTURE_SIZE,
        }
    }
}

/// Source of GPU capability information.
///
/// Implementations must release every resource they acquire before
/// returning.
pub trait GpuProbe {
    fn probe(&self) -> CoreResult<GpuCapabilities>;
}

impl<F> GpuProbe for F
where
    F: Fn() -> CoreResult<GpuCapabilities>,
{
    fn probe(&self) -> CoreResult<GpuCapabilities> {
        self()
    }
}

/// Probes the high-performance adapter through a throwaway wgpu instance.
///
/// No device is requested; the adapter alone exposes the name and limits.
#[derive(Debug, Default, Clone, Copy)]
pub struct WgpuProbe;

impl GpuProbe for WgpuProbe {
    fn probe(&self) -> CoreResult<GpuCapabilities> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::from_env_or_default());
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            force_fallback_adapter: false,
            compatible_surface: None,
        }))
        .map_err(|e| CoreError::ProbeUnavailable {
            reason: e.to_string(),
        })?;

        let info = adapter.get_info();
        let limits = adapter.limits();
        Ok(GpuCapabilities {
            renderer: info.name,
            max_texture_size: limits.max_texture_dimension_2d,
        })
        // `adapter` and `instance` drop here.
    }
}

// ── Gathering ─────────────────────────────────────────────────────────────────

/// Combine host inputs and a probe into a signals snapshot.
///
/// `mobile_viewport_width` is the narrow-viewport threshold.  Probe failure
/// is recovered here and reported back so the caller can log it.
pub fn gather_signals(
    host: &HostSignals,
    probe: &dyn GpuProbe,
    mobile_viewport_width: f32,
) -> (DeviceCapabilitySignals, Option<CoreError>) {
    let is_mobile = is_mobile_user_agent(&host.user_agent)
        || host.touch_capable
        || host.viewport_width < mobile_viewport_width;

    let (gpu, probe_error) = match probe.probe() {
        Ok(caps) => (caps, None),
        Err(e) => (GpuCapabilities::default(), Some(e)),
    };

    let signals = DeviceCapabilitySignals {
        is_mobile,
        cores: host.cores.filter(|&c| c > 0).unwrap_or(DEFAULT_CORES),
        memory_gb: host
            .memory_gb
            .filter(|m| m.is_finite() && *m > 0.0)
            .unwrap_or(DEFAULT_MEMORY_GB),
        gpu_renderer: gpu.renderer,
        max_texture_size: gpu.max_texture_size,
    };
    (signals, probe_error)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn desktop_host() -> HostSignals {
        HostSignals {
            user_agent: "Mozilla/5.0 (X11; Linux x86_64)".into(),
            touch_capable: false,
            viewport_width: 1440.0,
            cores: Some(16),
            memory_gb: Some(32.0),
        }
    }

    fn default_probe() -> CoreResult<GpuCapabilities> {
        Ok(GpuCapabilities::default())
    }

    fn failing_probe() -> CoreResult<GpuCapabilities> {
        Err(CoreError::ProbeUnavailable {
            reason: "no adapter".into(),
        })
    }

    #[test]
    fn mobile_user_agents_are_recognised() {
        assert!(is_mobile_user_agent(
            "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X)"
        ));
        assert!(is_mobile_user_agent("Mozilla/5.0 (Linux; Android 14; Pixel 8)"));
        assert!(is_mobile_user_agent("Opera/9.80 (J2ME/MIDP; Opera Mini/9.80)"));
        assert!(!is_mobile_user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64)"));
    }

    #[test]
    fn narrow_viewport_alone_marks_mobile() {
        let host = HostSignals {
            viewport_width: 600.0,
            ..desktop_host()
        };
        let (signals, _) = gather_signals(&host, &default_probe, 768.0);
        assert!(signals.is_mobile);
    }

    #[test]
    fn probe_failure_falls_back_to_defaults() {
        let (signals, err) = gather_signals(&desktop_host(), &failing_probe, 768.0);
        assert!(err.is_some());
        assert_eq!(signals.gpu_renderer, "");
        assert_eq!(signals.max_texture_size, DEFAULT_MAX_TEXTURE_SIZE);
        assert_eq!(signals.cores, 16);
    }

    #[test]
    fn missing_host_values_use_mid_range_defaults() {
        let host = HostSignals {
            cores: None,
            memory_gb: Some(f32::NAN),
            ..desktop_host()
        };
        let (signals, _) = gather_signals(&host, &default_probe, 768.0);
        assert_eq!(signals.cores, DEFAULT_CORES);
        assert_eq!(signals.memory_gb, DEFAULT_MEMORY_GB);
    }

    #[test]
    fn probe_values_are_copied_through() {
        let probe = || -> CoreResult<GpuCapabilities> {
            Ok(GpuCapabilities {
                renderer: "Adreno (TM) 418".into(),
                max_texture_size: 8192,
            })
        };
        let (signals, err) = gather_signals(&desktop_host(), &probe, 768.0);
        assert!(err.is_none());
        assert_eq!(signals.gpu_renderer, "Adreno (TM) 418");
        assert_eq!(signals.max_texture_size, 8192);
    }
}
