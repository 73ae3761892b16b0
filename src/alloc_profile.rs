//! Counting global allocator.
//!
//! Disabled by default; set `QUANTUM_CORE_ALLOC_PROFILE=1` to enable.  When
//! enabled, [`AllocProfilePlugin`] logs the allocation delta once per second,
//! and a steady scene should report zero allocation calls from the particle
//! tick.
//!
//! Counting is process-wide: every thread's allocations land in the same
//! [`Counters`].

use bevy::prelude::*;
use std::alloc::{GlobalAlloc, Layout, System};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering::Relaxed};

/// Environment variable that turns the profiler on.
pub const ALLOC_PROFILE_ENV: &str = "QUANTUM_CORE_ALLOC_PROFILE";

// ── Counters ──────────────────────────────────────────────────────────────────

/// Cumulative allocator counters.  All operations are relaxed atomics.
pub struct Counters {
    enabled: AtomicBool,
    live: AtomicUsize,
    peak: AtomicUsize,
    allocated: AtomicU64,
    freed: AtomicU64,
    allocs: AtomicU64,
    frees: AtomicU64,
    reallocs: AtomicU64,
}

impl Counters {
    const fn new() -> Self {
        Self {
            enabled: AtomicBool::new(false),
            live: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            allocated: AtomicU64::new(0),
            freed: AtomicU64::new(0),
            allocs: AtomicU64::new(0),
            frees: AtomicU64::new(0),
            reallocs: AtomicU64::new(0),
        }
    }

    #[inline]
    fn grow(&self, bytes: usize) {
        self.allocated.fetch_add(bytes as u64, Relaxed);
        let live = self.live.fetch_add(bytes, Relaxed) + bytes;
        self.peak.fetch_max(live, Relaxed);
    }

    #[inline]
    fn shrink(&self, bytes: usize) {
        self.freed.fetch_add(bytes as u64, Relaxed);
        self.live.fetch_sub(bytes, Relaxed);
    }

    #[inline]
    fn on_alloc(&self, size: usize) {
        self.allocs.fetch_add(1, Relaxed);
        self.grow(size);
    }

    #[inline]
    fn on_free(&self, size: usize) {
        self.frees.fetch_add(1, Relaxed);
        self.shrink(size);
    }

    #[inline]
    fn on_realloc(&self, old_size: usize, new_size: usize) {
        self.reallocs.fetch_add(1, Relaxed);
        if new_size >= old_size {
            self.grow(new_size - old_size);
        } else {
            self.shrink(old_size - new_size);
        }
    }

    fn reset(&self) {
        for counter in [&self.live, &self.peak] {
            counter.store(0, Relaxed);
        }
        for counter in [
            &self.allocated,
            &self.freed,
            &self.allocs,
            &self.frees,
            &self.reallocs,
        ] {
            counter.store(0, Relaxed);
        }
    }

    fn snapshot(&self) -> AllocProfileSnapshot {
        AllocProfileSnapshot {
            live_bytes: self.live.load(Relaxed),
            peak_live_bytes: self.peak.load(Relaxed),
            total_alloc_bytes: self.allocated.load(Relaxed),
            total_dealloc_bytes: self.freed.load(Relaxed),
            alloc_calls: self.allocs.load(Relaxed),
            dealloc_calls: self.frees.load(Relaxed),
            realloc_calls: self.reallocs.load(Relaxed),
        }
    }
}

static COUNTERS: Counters = Counters::new();

// ── Allocator ─────────────────────────────────────────────────────────────────

/// System allocator wrapper feeding [`COUNTERS`] while profiling is on.
pub struct CountingAlloc;

#[global_allocator]
static GLOBAL: CountingAlloc = CountingAlloc;

unsafe impl GlobalAlloc for CountingAlloc {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let ptr = unsafe { System.alloc(layout) };
        if !ptr.is_null() && is_enabled() {
            COUNTERS.on_alloc(layout.size());
        }
        ptr
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        let ptr = unsafe { System.alloc_zeroed(layout) };
        if !ptr.is_null() && is_enabled() {
            COUNTERS.on_alloc(layout.size());
        }
        ptr
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        let moved = unsafe { System.realloc(ptr, layout, new_size) };
        if !moved.is_null() && is_enabled() {
            COUNTERS.on_realloc(layout.size(), new_size);
        }
        moved
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        if is_enabled() {
            COUNTERS.on_free(layout.size());
        }
        unsafe { System.dealloc(ptr, layout) };
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Point-in-time copy of the counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AllocProfileSnapshot {
    pub live_bytes: usize,
    pub peak_live_bytes: usize,
    pub total_alloc_bytes: u64,
    pub total_dealloc_bytes: u64,
    pub alloc_calls: u64,
    pub dealloc_calls: u64,
    pub realloc_calls: u64,
}

impl AllocProfileSnapshot {
    pub fn net_bytes(self) -> i64 {
        self.total_alloc_bytes as i64 - self.total_dealloc_bytes as i64
    }

    /// Counter growth from `earlier` to `self`.  Live and peak are carried
    /// over as-is.
    pub fn since(self, earlier: AllocProfileSnapshot) -> AllocProfileSnapshot {
        AllocProfileSnapshot {
            live_bytes: self.live_bytes,
            peak_live_bytes: self.peak_live_bytes,
            total_alloc_bytes: self.total_alloc_bytes.saturating_sub(earlier.total_alloc_bytes),
            total_dealloc_bytes: self
                .total_dealloc_bytes
                .saturating_sub(earlier.total_dealloc_bytes),
            alloc_calls: self.alloc_calls.saturating_sub(earlier.alloc_calls),
            dealloc_calls: self.dealloc_calls.saturating_sub(earlier.dealloc_calls),
            realloc_calls: self.realloc_calls.saturating_sub(earlier.realloc_calls),
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Enable profiling if `QUANTUM_CORE_ALLOC_PROFILE` holds a truthy value.
pub fn init_from_env() {
    let enabled = std::env::var(ALLOC_PROFILE_ENV)
        .map(|value| parse_flag(&value))
        .unwrap_or(false);
    set_enabled(enabled);
}

pub fn set_enabled(enabled: bool) {
    COUNTERS.enabled.store(enabled, Relaxed);
}

#[inline]
pub fn is_enabled() -> bool {
    COUNTERS.enabled.load(Relaxed)
}

pub fn reset_counters() {
    COUNTERS.reset();
}

pub fn snapshot() -> AllocProfileSnapshot {
    COUNTERS.snapshot()
}

// ── Reporting ─────────────────────────────────────────────────────────────────

/// Logs per-second allocator deltas while profiling is enabled.
pub struct AllocProfilePlugin;

impl Plugin for AllocProfilePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<AllocReport>()
            .add_systems(Last, alloc_report_system.run_if(is_enabled));
    }
}

/// Reporting cadence and the snapshot at the previous report.
#[derive(Resource)]
pub struct AllocReport {
    timer: Timer,
    previous: AllocProfileSnapshot,
}

impl Default for AllocReport {
    fn default() -> Self {
        Self {
            timer: Timer::from_seconds(1.0, TimerMode::Repeating),
            previous: snapshot(),
        }
    }
}

pub fn alloc_report_system(time: Res<Time>, mut report: ResMut<AllocReport>) {
    if !report.timer.tick(time.delta()).just_finished() {
        return;
    }
    let now = snapshot();
    let delta = now.since(report.previous);
    report.previous = now;
    info!(
        "alloc/s: {} calls, {} bytes (net {}), {} reallocs; live {} bytes, peak {} bytes",
        delta.alloc_calls,
        delta.total_alloc_bytes,
        delta.net_bytes(),
        delta.realloc_calls,
        now.live_bytes,
        now.peak_live_bytes
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_parsing_accepts_common_spellings() {
        for on in ["1", "true", "TRUE", "yes", " on "] {
            assert!(parse_flag(on), "{on}");
        }
        for off in ["0", "false", "", "nope"] {
            assert!(!parse_flag(off), "{off}");
        }
    }

    #[test]
    fn counters_track_live_and_peak() {
        let counters = Counters::new();
        counters.on_alloc(100);
        counters.on_realloc(100, 250);
        counters.on_free(250);
        counters.on_alloc(40);

        let s = counters.snapshot();
        assert_eq!(s.live_bytes, 40);
        assert_eq!(s.peak_live_bytes, 250);
        assert_eq!(s.alloc_calls, 2);
        assert_eq!(s.realloc_calls, 1);
        assert_eq!(s.net_bytes(), 40);

        counters.reset();
        assert_eq!(counters.snapshot(), AllocProfileSnapshot::default());
    }

    #[test]
    fn since_subtracts_cumulative_counters() {
        let earlier = AllocProfileSnapshot {
            total_alloc_bytes: 100,
            alloc_calls: 4,
            ..Default::default()
        };
        let later = AllocProfileSnapshot {
            total_alloc_bytes: 160,
            total_dealloc_bytes: 20,
            alloc_calls: 7,
            live_bytes: 40,
            ..Default::default()
        };
        let delta = later.since(earlier);
        assert_eq!(delta.total_alloc_bytes, 60);
        assert_eq!(delta.alloc_calls, 3);
        assert_eq!(delta.net_bytes(), 40);
        assert_eq!(delta.live_bytes, 40);
    }
}
