use bevy::prelude::*;
use bevy::window::WindowResolution;

use quantum_core::alloc_profile;
use quantum_core::config::{load_render_config, RENDER_CONFIG_PATH};
use quantum_core::device::{gather_signals, HostSignals, WgpuProbe};
use quantum_core::monitor::AdaptiveMonitor;
use quantum_core::quality::bundle_for;
use quantum_core::tier::PerformanceTier;
use quantum_core::QuantumCorePlugins;

const WINDOW_WIDTH: u32 = 1200;
const WINDOW_HEIGHT: u32 = 680;

fn main() {
    alloc_profile::init_from_env();

    // Config and device signals are read before the renderer exists so the
    // throwaway probe adapter never overlaps the real one.
    let config = load_render_config(RENDER_CONFIG_PATH);
    let host = HostSignals::from_environment(WINDOW_WIDTH as f32);
    let (signals, probe_error) = gather_signals(&host, &WgpuProbe, config.mobile_viewport_width);
    match probe_error {
        None => println!(
            "✓ GPU probe: '{}' (max texture {})",
            signals.gpu_renderer, signals.max_texture_size
        ),
        Some(e) => println!("ℹ {e}; assuming a capable GPU"),
    }
    println!(
        "ℹ Host: {} | mobile: {} | cores: {} | memory: {:.1} GB",
        host.user_agent, signals.is_mobile, signals.cores, signals.memory_gb
    );

    // The first frame uses the high bundle; the tier resolves on the first
    // update and the scene is reconciled from there.  The window's pixel
    // density is not known yet, so the monitor starts at 1× and is re-seated
    // on the real density at resolution.
    let monitor = AdaptiveMonitor::new(
        config.monitor_settings(),
        bundle_for(PerformanceTier::High).resolution_scale,
        1.0,
    );

    App::new()
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "Quantum Core".into(),
                resolution: WindowResolution::new(WINDOW_WIDTH, WINDOW_HEIGHT),
                ..Default::default()
            }),
            ..Default::default()
        }))
        .insert_resource(ClearColor(Color::BLACK))
        .insert_resource(config)
        .insert_resource(signals)
        .insert_resource(monitor)
        .add_plugins(QuantumCorePlugins)
        .run();
}
