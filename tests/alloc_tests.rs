//! Allocation check for the particle hot path.
//!
//! Kept as the only test in this binary: the counting allocator is global,
//! so a concurrently running test would pollute the counters.

use quantum_core::alloc_profile;
use quantum_core::particles::ParticleField;
use rand::rngs::StdRng;
use rand::SeedableRng;

#[test]
fn particle_tick_does_not_allocate() {
    let mut field = ParticleField::new(200, &mut StdRng::seed_from_u64(3));
    // Warm up outside the measured window.
    field.step();
    let _ = field.take_dirty();

    alloc_profile::reset_counters();
    alloc_profile::set_enabled(true);
    for _ in 0..1_000 {
        field.step();
        let _ = field.take_dirty();
    }
    alloc_profile::set_enabled(false);

    let snapshot = alloc_profile::snapshot();
    assert_eq!(snapshot.alloc_calls, 0, "{snapshot:?}");
    assert_eq!(snapshot.realloc_calls, 0, "{snapshot:?}");
    assert_eq!(field.len(), 200);
}
