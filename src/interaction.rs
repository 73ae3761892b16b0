//! Interaction state shared between UI handlers and the animation layer.
//!
//! [`InteractionState`] is an ordinary resource: writers and readers receive
//! it through system parameters, there is no global.  Each field has exactly
//! one writer system:
//!
//! | Field                | Writer                  | Readers                         |
//! |----------------------|-------------------------|---------------------------------|
//! | `is_hovering_button` | `cta_hover_system`      | core animation, star field      |
//! | `has_interacted`     | `drag_start_system`     | `drag_hint_visibility_system`   |
//!
//! Writers run in [`FrameSet::Interaction`], before [`FrameSet::Animate`], so a
//! change captured on tick N is visible to the animation on tick N at the
//! earliest and tick N+1 at the latest.  The animation reads a snapshot per
//! tick; a later write never rewrites an already-computed frame.

use crate::tier::FrameSet;
use bevy::prelude::*;
use bevy::window::PrimaryWindow;

// ── Resources ─────────────────────────────────────────────────────────────────

/// Hover / first-interaction flags.
#[derive(Resource, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct InteractionState {
    is_hovering_button: bool,
    has_interacted: bool,
}

impl InteractionState {
    #[inline]
    pub fn is_hovering_button(&self) -> bool {
        self.is_hovering_button
    }

    #[inline]
    pub fn has_interacted(&self) -> bool {
        self.has_interacted
    }

    #[inline]
    pub fn set_hovering(&mut self, hovering: bool) {
        self.is_hovering_button = hovering;
    }

    #[inline]
    pub fn set_interacted(&mut self, interacted: bool) {
        self.has_interacted = interacted;
    }
}

/// Pointer position normalised to `[-1, 1]` on both axes, +Y up.
///
/// Stays at the last known position when the cursor leaves the window.
#[derive(Resource, Debug, Default, Clone, Copy, PartialEq)]
pub struct PointerPosition(pub Vec2);

// ── Components ────────────────────────────────────────────────────────────────

/// The call-to-action button whose hover drives the core's excited state.
#[derive(Component)]
pub struct CtaButton;

/// "Drag to inspect" hint, hidden after the first drag.
#[derive(Component)]
pub struct DragHint;

// ── Plugin ────────────────────────────────────────────────────────────────────

pub struct InteractionPlugin;

impl Plugin for InteractionPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<InteractionState>()
            .init_resource::<PointerPosition>()
            .add_systems(Startup, setup_interaction_ui)
            .add_systems(
                Update,
                (
                    cta_hover_system,
                    drag_start_system,
                    pointer_tracking_system,
                    drag_hint_visibility_system,
                )
                    .in_set(FrameSet::Interaction),
            );
    }
}

// ── Colour helpers ────────────────────────────────────────────────────────────

fn cta_border() -> Color {
    Color::srgb(0.85, 0.85, 0.85)
}
fn cta_border_hot() -> Color {
    Color::srgb(1.0, 0.2, 0.2)
}
fn cta_text() -> Color {
    Color::srgb(0.9, 0.9, 0.9)
}
fn hint_text() -> Color {
    Color::srgba(1.0, 1.0, 1.0, 0.7)
}

// ── Startup ───────────────────────────────────────────────────────────────────

/// Spawn the CTA button (bottom right) and the drag hint (bottom centre).
pub fn setup_interaction_ui(mut commands: Commands) {
    commands
        .spawn((
            Button,
            Node {
                position_type: PositionType::Absolute,
                right: Val::Px(32.0),
                bottom: Val::Px(32.0),
                padding: UiRect::axes(Val::Px(18.0), Val::Px(10.0)),
                border: UiRect::all(Val::Px(1.0)),
                ..default()
            },
            BackgroundColor(Color::NONE),
            BorderColor::all(cta_border()),
            CtaButton,
        ))
        .with_children(|btn| {
            btn.spawn((
                Text::new("INITIALIZE SEQUENCE"),
                TextFont {
                    font_size: 14.0,
                    ..default()
                },
                TextColor(cta_text()),
            ));
        });

    commands
        .spawn(Node {
            position_type: PositionType::Absolute,
            bottom: Val::Px(24.0),
            width: Val::Percent(100.0),
            justify_content: JustifyContent::Center,
            ..default()
        })
        .with_children(|row| {
            row.spawn((
                Text::new("[ Drag to inspect core ]"),
                TextFont {
                    font_size: 12.0,
                    ..default()
                },
                TextColor(hint_text()),
                DragHint,
            ));
        });
}

// ── Update ────────────────────────────────────────────────────────────────────

/// Pointer enter / leave on the CTA button → `set_hovering`.
#[allow(clippy::type_complexity)]
pub fn cta_hover_system(
    mut buttons: Query<(&Interaction, &mut BorderColor), (Changed<Interaction>, With<CtaButton>)>,
    mut state: ResMut<InteractionState>,
) {
    for (interaction, mut border) in buttons.iter_mut() {
        let hovering = matches!(interaction, Interaction::Hovered | Interaction::Pressed);
        // Compare first so `is_changed()` only fires on real transitions.
        if state.is_hovering_button() != hovering {
            state.set_hovering(hovering);
        }
        *border = BorderColor::all(if hovering { cta_border_hot() } else { cta_border() });
    }
}

/// A left-button press or touch outside the CTA starts an orbit drag →
/// `set_interacted(true)`.
pub fn drag_start_system(
    mouse: Res<ButtonInput<MouseButton>>,
    touches: Res<Touches>,
    buttons: Query<&Interaction, With<CtaButton>>,
    mut state: ResMut<InteractionState>,
) {
    if state.has_interacted() {
        return;
    }
    let pressed = mouse.just_pressed(MouseButton::Left) || touches.any_just_pressed();
    let over_button = buttons.iter().any(|i| *i != Interaction::None);
    if pressed && !over_button {
        state.set_interacted(true);
        debug!("First interaction with the core");
    }
}

/// Normalise the cursor position into [`PointerPosition`].
pub fn pointer_tracking_system(
    windows: Query<&Window, With<PrimaryWindow>>,
    mut pointer: ResMut<PointerPosition>,
) {
    let Ok(window) = windows.single() else {
        return;
    };
    let Some(cursor) = window.cursor_position() else {
        return;
    };
    pointer.0 = normalized_pointer(cursor, Vec2::new(window.width(), window.height()));
}

/// Window-space cursor (origin top-left, +Y down) → `[-1, 1]`, +Y up.
pub fn normalized_pointer(cursor: Vec2, size: Vec2) -> Vec2 {
    if size.x <= 0.0 || size.y <= 0.0 {
        return Vec2::ZERO;
    }
    let x = cursor.x / size.x * 2.0 - 1.0;
    let y = -(cursor.y / size.y) * 2.0 + 1.0;
    Vec2::new(x, y).clamp(Vec2::NEG_ONE, Vec2::ONE)
}

/// Hide the drag hint once the viewer has interacted.
pub fn drag_hint_visibility_system(
    state: Res<InteractionState>,
    mut hints: Query<&mut Visibility, With<DragHint>>,
) {
    if !state.is_changed() {
        return;
    }
    let visibility = if state.has_interacted() {
        Visibility::Hidden
    } else {
        Visibility::Inherited
    };
    for mut v in hints.iter_mut() {
        *v = visibility;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setters_update_independent_fields() {
        let mut state = InteractionState::default();
        state.set_hovering(true);
        assert!(state.is_hovering_button());
        assert!(!state.has_interacted());

        state.set_interacted(true);
        state.set_hovering(false);
        assert!(!state.is_hovering_button());
        assert!(state.has_interacted());
    }

    #[test]
    fn pointer_is_normalised_with_y_up() {
        let size = Vec2::new(800.0, 600.0);
        assert_eq!(normalized_pointer(Vec2::new(400.0, 300.0), size), Vec2::ZERO);
        assert_eq!(normalized_pointer(Vec2::new(0.0, 0.0), size), Vec2::new(-1.0, 1.0));
        assert_eq!(normalized_pointer(Vec2::new(800.0, 600.0), size), Vec2::new(1.0, -1.0));
        assert_eq!(normalized_pointer(Vec2::new(5.0, 5.0), Vec2::ZERO), Vec2::ZERO);
    }

    #[test]
    fn hint_hides_after_interaction() {
        let mut world = World::new();
        world.insert_resource(InteractionState::default());
        let hint = world.spawn((DragHint, Visibility::Inherited)).id();

        world.resource_mut::<InteractionState>().set_interacted(true);

        let mut schedule = Schedule::default();
        schedule.add_systems(drag_hint_visibility_system);
        schedule.run(&mut world);

        assert_eq!(*world.get::<Visibility>(hint).unwrap(), Visibility::Hidden);
    }
}
