// Latinkeys Input Layer - Key Events
// The key transition record handed to the rewriter by the shim

use std::fmt;

use crate::{Keysym, ModifierState};

/// Kind of event delivered by the windowing system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Press,
    Release,
    /// Any non-keyboard event (pointer, expose, focus, ...)
    Other,
}

impl EventKind {
    /// Key presses and releases are the only events eligible for remapping
    pub fn is_key_transition(self) -> bool {
        matches!(self, EventKind::Press | EventKind::Release)
    }
}

/// One hardware key transition.
///
/// Only `group` and `keyval` are ever written by the rewriter; the rest is
/// read-only input describing the physical key and modifier state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub kind: EventKind,
    /// Physical key position, stable across layout changes
    pub hardware_keycode: u16,
    pub state: ModifierState,
    /// True when the key itself is a modifier (Shift, Ctrl, ...)
    pub is_modifier: bool,
    /// Active layout group when the event was generated
    pub group: u8,
    /// Logical key value resolved for `group`
    pub keyval: Keysym,
}

impl KeyEvent {
    /// Create a key press with no modifiers held
    pub fn press(hardware_keycode: u16, group: u8, keyval: Keysym) -> Self {
        Self {
            kind: EventKind::Press,
            hardware_keycode,
            state: ModifierState::empty(),
            is_modifier: false,
            group,
            keyval,
        }
    }

    /// Create a key release with no modifiers held
    pub fn release(hardware_keycode: u16, group: u8, keyval: Keysym) -> Self {
        Self {
            kind: EventKind::Release,
            ..Self::press(hardware_keycode, group, keyval)
        }
    }

    /// Set the modifier state
    pub fn with_state(mut self, state: ModifierState) -> Self {
        self.state = state;
        self
    }

    /// Mark the key itself as a modifier key
    pub fn as_modifier(mut self) -> Self {
        self.is_modifier = true;
        self
    }
}

impl fmt::Display for KeyEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "type {:?} state {} keyval {} hardware_keycode {} group {} is_modifier {}",
            self.kind,
            self.state,
            self.keyval,
            self.hardware_keycode,
            self.group,
            u8::from(self.is_modifier)
        )
    }
}
