//! Tier configuration table: the fixed mapping from [`PerformanceTier`] to the
//! bundle of render parameters the scene is built from.
//!
//! | Tier     | Scale     | Particles | Stars | Shell            | Shadow | Detail | AA  |
//! |----------|-----------|-----------|-------|------------------|--------|--------|-----|
//! | `High`   | 1.0 – 2.0 | 200       | 1000  | Transmissive     | 1024   | 4      | on  |
//! | `Medium` | 1.0 – 1.5 | 60        | 200   | PhysicalFallback | off    | 3      | off |
//! | `Low`    | 1.0 – 1.0 | 30        | off   | PhysicalFallback | off    | 2      | off |
//!
//! Bundles are `'static` data.  Consumers hold `&'static RenderParameterBundle`
//! and never mutate it; the only continuous parameter that changes at runtime
//! (the live resolution scale) is owned by [`crate::monitor::AdaptiveMonitor`].

use crate::tier::PerformanceTier;

/// Bounds for dynamic pixel-ratio adaptation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolutionScaleRange {
    pub min: f32,
    pub max: f32,
}

impl ResolutionScaleRange {
    /// Clamp `scale` into the range.
    #[inline]
    pub fn clamp(self, scale: f32) -> f32 {
        scale.clamp(self.min, self.max)
    }

    #[inline]
    pub fn contains(self, scale: f32) -> bool {
        scale >= self.min && scale <= self.max
    }

    /// Lower the ceiling to `native` (the display's pixel density), never
    /// below `min`.  Non-finite or non-positive densities leave the range as is.
    pub fn capped_at(self, native: f32) -> Self {
        if !native.is_finite() || native <= 0.0 {
            return self;
        }
        Self {
            min: self.min,
            max: self.max.min(native).max(self.min),
        }
    }
}

/// Outer-shell material family.
///
/// `Transmissive` needs an extra screen-space transmission pass per frame;
/// `PhysicalFallback` is plain alpha-blended PBR with strong clearcoat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellMaterial {
    Transmissive,
    PhysicalFallback,
}

/// The resolved render configuration for one tier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderParameterBundle {
    /// Bounds for the live resolution scale.
    pub resolution_scale: ResolutionScaleRange,
    /// Number of instanced particles around the core.
    pub particle_count: u32,
    /// Number of background stars; `0` disables the star field.
    pub star_count: u32,
    /// Outer shell material family.
    pub shell: ShellMaterial,
    /// Shadow map resolution; `0` disables shadows.
    pub shadow_resolution: u32,
    /// Outer shell icosphere subdivision level.
    pub geometry_detail: u32,
    /// Multisample anti-aliasing.
    pub antialias: bool,
}

impl RenderParameterBundle {
    #[inline]
    pub fn use_transmission(&self) -> bool {
        self.shell == ShellMaterial::Transmissive
    }

    #[inline]
    pub fn shadows_enabled(&self) -> bool {
        self.shadow_resolution > 0
    }

    #[inline]
    pub fn stars_enabled(&self) -> bool {
        self.star_count > 0
    }
}

// ── Table ─────────────────────────────────────────────────────────────────────

static HIGH: RenderParameterBundle = RenderParameterBundle {
    resolution_scale: ResolutionScaleRange { min: 1.0, max: 2.0 },
    particle_count: 200,
    star_count: 1000,
    shell: ShellMaterial::Transmissive,
    shadow_resolution: 1024,
    geometry_detail: 4,
    antialias: true,
};

static MEDIUM: RenderParameterBundle = RenderParameterBundle {
    resolution_scale: ResolutionScaleRange { min: 1.0, max: 1.5 },
    particle_count: 60,
    star_count: 200,
    // Transmission passes are what sink mid-range mobile GPUs.
    shell: ShellMaterial::PhysicalFallback,
    shadow_resolution: 0,
    geometry_detail: 3,
    antialias: false,
};

static LOW: RenderParameterBundle = RenderParameterBundle {
    resolution_scale: ResolutionScaleRange { min: 1.0, max: 1.0 },
    particle_count: 30,
    star_count: 0,
    shell: ShellMaterial::PhysicalFallback,
    shadow_resolution: 0,
    geometry_detail: 2,
    antialias: false,
};

/// Look up the bundle for `tier`.
#[inline]
pub fn bundle_for(tier: PerformanceTier) -> &'static RenderParameterBundle {
    match tier {
        PerformanceTier::High => &HIGH,
        PerformanceTier::Medium => &MEDIUM,
        PerformanceTier::Low => &LOW,
    }
}
