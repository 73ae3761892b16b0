//! Quantum Core library
//!
//! An animated 3D centrepiece that classifies the host device into a
//! performance tier, builds its scene from that tier's render bundle, and
//! adapts resolution scale to the measured frame rate.

pub mod alloc_profile;
pub mod animation;
pub mod config;
pub mod constants;
pub mod device;
pub mod error;
pub mod graphics;
pub mod interaction;
pub mod monitor;
pub mod particles;
pub mod quality;
pub mod scene;
pub mod stars;
pub mod tier;

use bevy::prelude::*;

/// Every Quantum Core plugin, in registration order.
///
/// Expects [`config::RenderConfig`] and [`monitor::AdaptiveMonitor`] to be
/// inserted by the caller; [`device::DeviceCapabilitySignals`] is optional.
pub struct QuantumCorePlugins;

impl Plugin for QuantumCorePlugins {
    fn build(&self, app: &mut App) {
        app.add_plugins((
            tier::TierPlugin,
            interaction::InteractionPlugin,
            animation::CoreAnimationPlugin,
            particles::ParticlesPlugin,
            stars::StarFieldPlugin,
            graphics::GraphicsPlugin,
            scene::ScenePlugin,
            monitor::MonitorPlugin,
            alloc_profile::AllocProfilePlugin,
        ));
    }
}
