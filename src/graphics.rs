//! Camera, lights and the bundle-driven render settings.
//!
//! The camera orbits the origin at a fixed distance.  It auto-rotates slowly
//! and follows pointer drags; zoom and pan are not offered.
//!
//! [`apply_render_settings`] maps a [`RenderParameterBundle`] onto the
//! camera's [`Msaa`] and the key light's shadow configuration.  It is called
//! once at startup and again whenever the tier changes.
//!
//! ## Render scale
//!
//! The scene camera draws into an offscreen [`SceneTarget`] image, which a
//! full-window UI image stretches onto the window.  The live resolution scale
//! only changes that image's size:
//!
//! | Scale vs native density | Target size             |
//! |-------------------------|-------------------------|
//! | equal                   | window physical size    |
//! | lower                   | `physical × scale / native`, upsampled |
//!
//! The window, its logical size and the UI on top are never touched.

use crate::constants::*;
use crate::interaction::CtaButton;
use crate::monitor::{adaptive_monitor_system, ResolutionScaleChanged};
use crate::quality::RenderParameterBundle;
use crate::tier::{ActiveQuality, FrameSet};
use bevy::input::mouse::AccumulatedMouseMotion;
use bevy::light::DirectionalLightShadowMap;
use bevy::prelude::*;
use bevy::render::render_resource::{Extent3d, TextureFormat};
use bevy::window::PrimaryWindow;

// ── Components ────────────────────────────────────────────────────────────────

/// Marker for the scene camera.
#[derive(Component)]
pub struct MainCamera;

/// Marker for the directional key light.
#[derive(Component)]
pub struct KeyLight;

/// Marker for the full-window image showing the scene target.
#[derive(Component)]
pub struct SceneView;

/// Offscreen image the scene camera renders into, and the scale it is
/// currently sized for.
#[derive(Resource, Debug, Clone)]
pub struct SceneTarget {
    pub image: Handle<Image>,
    pub scale: f32,
}

/// Spherical orbit around the origin.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct OrbitCamera {
    pub yaw: f32,
    pub pitch: f32,
    pub radius: f32,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self {
            yaw: 0.0,
            pitch: 0.0,
            radius: CAMERA_DISTANCE,
        }
    }
}

impl OrbitCamera {
    /// Auto-rotate by `delta_secs` and apply a pointer drag in pixels.
    pub fn advance(&mut self, delta_secs: f32, drag: Vec2) {
        let delta_secs = if delta_secs.is_finite() { delta_secs.max(0.0) } else { 0.0 };
        self.yaw += ORBIT_AUTO_ROTATE_SPEED * delta_secs - drag.x * ORBIT_DRAG_SENSITIVITY;
        self.yaw = self.yaw.rem_euclid(std::f32::consts::TAU);
        self.pitch = (self.pitch + drag.y * ORBIT_DRAG_SENSITIVITY)
            .clamp(-ORBIT_PITCH_LIMIT, ORBIT_PITCH_LIMIT);
    }

    /// Camera transform looking at the origin.
    pub fn transform(&self) -> Transform {
        let rotation = Quat::from_euler(EulerRot::YXZ, self.yaw, -self.pitch, 0.0);
        let eye = rotation * Vec3::new(0.0, 0.0, self.radius);
        Transform::from_translation(eye).looking_at(Vec3::ZERO, Vec3::Y)
    }
}

// ── Plugin ────────────────────────────────────────────────────────────────────

pub struct GraphicsPlugin;

impl Plugin for GraphicsPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<DirectionalLightShadowMap>()
            .add_message::<ResolutionScaleChanged>()
            .add_systems(Startup, (setup_camera, setup_lights))
            .add_systems(
                Update,
                (
                    orbit_camera_system.in_set(FrameSet::Interaction),
                    apply_resolution_scale_system
                        .in_set(FrameSet::Monitor)
                        .after(adaptive_monitor_system),
                ),
            );
    }
}

// ── Render settings ───────────────────────────────────────────────────────────

/// Multisampling for a bundle.
pub fn msaa_for(bundle: &RenderParameterBundle) -> Msaa {
    if bundle.antialias {
        Msaa::Sample4
    } else {
        Msaa::Off
    }
}

/// Apply anti-aliasing and shadow settings from `bundle`.
pub fn apply_render_settings(
    bundle: &RenderParameterBundle,
    msaa: &mut Msaa,
    light: &mut DirectionalLight,
    shadow_map: &mut DirectionalLightShadowMap,
) {
    *msaa = msaa_for(bundle);
    light.shadows_enabled = bundle.shadows_enabled();
    if bundle.shadows_enabled() {
        shadow_map.size = bundle.shadow_resolution as usize;
    }
}

/// Scene target size for a window of `physical` pixels at `native`
/// density rendered at `scale`.  Never smaller than one pixel.
pub fn scaled_target_size(physical: UVec2, scale: f32, native: f32) -> UVec2 {
    let ratio = scale / native;
    if !ratio.is_finite() || ratio <= 0.0 {
        return physical.max(UVec2::ONE);
    }
    (physical.as_vec2() * ratio).round().as_uvec2().max(UVec2::ONE)
}

fn extent(size: UVec2) -> Extent3d {
    Extent3d {
        width: size.x,
        height: size.y,
        ..default()
    }
}

// ── Startup systems ───────────────────────────────────────────────────────────

/// Spawn the orbiting 3D camera into an offscreen target, plus the window
/// camera and full-window image that present it.
pub fn setup_camera(
    mut commands: Commands,
    quality: Res<ActiveQuality>,
    windows: Query<&Window, With<PrimaryWindow>>,
    mut images: ResMut<Assets<Image>>,
) {
    let (physical, native) = windows
        .single()
        .map(|w| (w.resolution.physical_size(), w.resolution.base_scale_factor()))
        .unwrap_or((UVec2::ONE, 1.0));
    let size = scaled_target_size(physical, native, native);
    let image = images.add(Image::new_target_texture(
        size.x,
        size.y,
        TextureFormat::bevy_default(),
    ));
    commands.insert_resource(SceneTarget {
        image: image.clone(),
        scale: native,
    });

    let orbit = OrbitCamera::default();
    commands.spawn((
        Camera3d::default(),
        Camera {
            order: -1,
            target: image.clone().into(),
            clear_color: ClearColorConfig::Custom(Color::BLACK),
            ..default()
        },
        Projection::from(PerspectiveProjection {
            fov: CAMERA_FOV_DEGREES.to_radians(),
            ..default()
        }),
        msaa_for(quality.bundle),
        orbit.transform(),
        orbit,
        MainCamera,
    ));

    // Window camera: presents the scene image and hosts the UI.
    commands.spawn((Camera2d, Msaa::Off));
    commands.spawn((
        ImageNode::new(image),
        Node {
            position_type: PositionType::Absolute,
            width: Val::Percent(100.0),
            height: Val::Percent(100.0),
            ..default()
        },
        GlobalZIndex(-1),
        SceneView,
    ));
    debug!(
        "Camera spawned at distance {CAMERA_DISTANCE}; scene target {}x{}",
        size.x, size.y
    );
}

/// Ambient fill plus one directional key light.
pub fn setup_lights(
    mut commands: Commands,
    quality: Res<ActiveQuality>,
    mut shadow_map: ResMut<DirectionalLightShadowMap>,
) {
    commands.insert_resource(AmbientLight {
        color: Color::WHITE,
        brightness: AMBIENT_BRIGHTNESS,
        ..default()
    });

    let bundle = quality.bundle;
    if bundle.shadows_enabled() {
        shadow_map.size = bundle.shadow_resolution as usize;
    }
    commands.spawn((
        DirectionalLight {
            illuminance: KEY_LIGHT_ILLUMINANCE,
            shadows_enabled: bundle.shadows_enabled(),
            ..default()
        },
        Transform::from_translation(Vec3::from_array(KEY_LIGHT_POSITION))
            .looking_at(Vec3::ZERO, Vec3::Y),
        KeyLight,
    ));
}

// ── Update ────────────────────────────────────────────────────────────────────

/// Auto-rotate the camera and follow left-button / touch drags that do not
/// start on the call-to-action.
pub fn orbit_camera_system(
    time: Res<Time>,
    mouse: Res<ButtonInput<MouseButton>>,
    mouse_motion: Res<AccumulatedMouseMotion>,
    touches: Res<Touches>,
    buttons: Query<&Interaction, With<CtaButton>>,
    mut cameras: Query<(&mut OrbitCamera, &mut Transform)>,
) {
    let over_button = buttons.iter().any(|i| *i != Interaction::None);
    let drag = if over_button {
        Vec2::ZERO
    } else if mouse.pressed(MouseButton::Left) {
        mouse_motion.delta
    } else {
        touches.iter().next().map(|t| t.delta()).unwrap_or(Vec2::ZERO)
    };

    for (mut orbit, mut transform) in cameras.iter_mut() {
        orbit.advance(time.delta_secs(), drag);
        *transform = orbit.transform();
    }
}

/// Resize the scene target for the latest live scale or a resized window.
///
/// The window is only read.  The image is touched only when its size must
/// change.
pub fn apply_resolution_scale_system(
    mut changed: MessageReader<ResolutionScaleChanged>,
    windows: Query<&Window, With<PrimaryWindow>>,
    target: Option<ResMut<SceneTarget>>,
    mut images: ResMut<Assets<Image>>,
) {
    let latest = changed.read().last().copied();
    let Some(mut target) = target else {
        return;
    };
    if let Some(latest) = latest {
        target.scale = latest.scale;
    }
    let Ok(window) = windows.single() else {
        return;
    };

    let size = scaled_target_size(
        window.resolution.physical_size(),
        target.scale,
        window.resolution.base_scale_factor(),
    );
    let current = images.get(&target.image).map(|image| image.size());
    if current.is_none() || current == Some(size) {
        return;
    }
    if let Some(image) = images.get_mut(&target.image) {
        image.resize(extent(size));
        debug!(
            "Scene target resized to {}x{} at scale {:.2}",
            size.x, size.y, target.scale
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quality::bundle_for;
    use crate::tier::PerformanceTier;
    use bevy::window::WindowResolution;

    #[test]
    fn default_orbit_sits_on_the_z_axis() {
        let t = OrbitCamera::default().transform();
        assert!((t.translation - Vec3::new(0.0, 0.0, CAMERA_DISTANCE)).length() < 1e-4);
    }

    #[test]
    fn auto_rotation_keeps_distance() {
        let mut orbit = OrbitCamera::default();
        for _ in 0..600 {
            orbit.advance(1.0 / 60.0, Vec2::ZERO);
        }
        assert!((orbit.yaw - ORBIT_AUTO_ROTATE_SPEED * 10.0).abs() < 1e-3);
        let distance = orbit.transform().translation.length();
        assert!((distance - CAMERA_DISTANCE).abs() < 1e-3);
    }

    #[test]
    fn pitch_is_clamped() {
        let mut orbit = OrbitCamera::default();
        orbit.advance(0.0, Vec2::new(0.0, 1.0e6));
        assert_eq!(orbit.pitch, ORBIT_PITCH_LIMIT);
        orbit.advance(0.0, Vec2::new(0.0, -1.0e7));
        assert_eq!(orbit.pitch, -ORBIT_PITCH_LIMIT);
        assert!(orbit.transform().translation.is_finite());
    }

    #[test]
    fn low_tier_disables_shadows_and_msaa() {
        let mut msaa = Msaa::Sample4;
        let mut light = DirectionalLight {
            shadows_enabled: true,
            ..default()
        };
        let mut shadow_map = DirectionalLightShadowMap { size: 1024 };

        apply_render_settings(
            bundle_for(PerformanceTier::Low),
            &mut msaa,
            &mut light,
            &mut shadow_map,
        );
        assert_eq!(msaa, Msaa::Off);
        assert!(!light.shadows_enabled);

        apply_render_settings(
            bundle_for(PerformanceTier::High),
            &mut msaa,
            &mut light,
            &mut shadow_map,
        );
        assert_eq!(msaa, Msaa::Sample4);
        assert!(light.shadows_enabled);
        assert_eq!(shadow_map.size, 1024);
    }

    #[test]
    fn target_size_follows_scale_over_native() {
        let window = UVec2::new(1200, 680);
        assert_eq!(scaled_target_size(window, 1.0, 1.0), window);
        assert_eq!(scaled_target_size(UVec2::new(2400, 1360), 2.0, 2.0), UVec2::new(2400, 1360));
        assert_eq!(scaled_target_size(UVec2::new(2400, 1360), 1.5, 2.0), UVec2::new(1800, 1020));
        assert_eq!(scaled_target_size(window, 1.0, 0.0), window);
        assert_eq!(scaled_target_size(UVec2::ZERO, 1.0, 1.0), UVec2::ONE);
    }

    /// World with a 1200×680 primary window at `native` density and a scene
    /// target sized for it.
    fn scaled_world(native: f32) -> (World, Entity, Handle<Image>) {
        let mut world = World::new();
        let mut resolution = WindowResolution::new(1200, 680);
        resolution.set_scale_factor(native);
        let window = world
            .spawn((
                Window {
                    resolution,
                    ..default()
                },
                PrimaryWindow,
            ))
            .id();

        let mut images = Assets::<Image>::default();
        let image = images.add(Image::new_target_texture(
            1200,
            680,
            TextureFormat::bevy_default(),
        ));
        world.insert_resource(images);
        world.insert_resource(SceneTarget {
            image: image.clone(),
            scale: native,
        });
        world.init_resource::<Messages<ResolutionScaleChanged>>();
        (world, window, image)
    }

    fn apply_scale(world: &mut World, scale: f32) {
        world.write_message(ResolutionScaleChanged { scale });
        let mut schedule = Schedule::default();
        schedule.add_systems(apply_resolution_scale_system);
        schedule.run(world);
    }

    #[test]
    fn applying_a_scale_keeps_the_window_size() {
        let (mut world, window, image) = scaled_world(2.0);
        let before = world.get::<Window>(window).unwrap().resolution.clone();

        apply_scale(&mut world, 1.0);

        let after = &world.get::<Window>(window).unwrap().resolution;
        assert_eq!(after.width(), before.width());
        assert_eq!(after.height(), before.height());
        assert_eq!(after.physical_size(), before.physical_size());
        assert_eq!(after.scale_factor_override(), None);

        let size = world.resource::<Assets<Image>>().get(&image).unwrap().size();
        assert_eq!(size, UVec2::new(600, 340));
        assert_eq!(world.resource::<SceneTarget>().scale, 1.0);
    }

    #[test]
    fn native_scale_renders_one_to_one() {
        let (mut world, window, image) = scaled_world(1.0);
        apply_scale(&mut world, 1.0);

        let resolution = &world.get::<Window>(window).unwrap().resolution;
        assert_eq!(resolution.width(), 1200.0);
        let size = world.resource::<Assets<Image>>().get(&image).unwrap().size();
        assert_eq!(size, UVec2::new(1200, 680));
    }

    #[test]
    fn scale_above_native_supersamples_without_shrinking_the_window() {
        let (mut world, window, image) = scaled_world(1.0);
        apply_scale(&mut world, 2.0);

        let resolution = &world.get::<Window>(window).unwrap().resolution;
        assert_eq!(resolution.width(), 1200.0);
        assert_eq!(resolution.height(), 680.0);
        assert_eq!(resolution.physical_size(), UVec2::new(1200, 680));
        let size = world.resource::<Assets<Image>>().get(&image).unwrap().size();
        assert_eq!(size, UVec2::new(2400, 1360));
    }

    #[test]
    fn window_resize_reallocates_at_the_current_scale() {
        let (mut world, window, image) = scaled_world(2.0);
        apply_scale(&mut world, 1.5);
        assert_eq!(
            world.resource::<Assets<Image>>().get(&image).unwrap().size(),
            UVec2::new(900, 510)
        );

        world
            .get_mut::<Window>(window)
            .unwrap()
            .resolution
            .set_physical_resolution(1600, 900);
        let mut schedule = Schedule::default();
        schedule.add_systems(apply_resolution_scale_system);
        schedule.run(&mut world);

        assert_eq!(
            world.resource::<Assets<Image>>().get(&image).unwrap().size(),
            UVec2::new(1200, 675)
        );
    }
}
