// Keymap Query Interface
//
// This module defines the interface to the windowing system's keymap,
// which maps hardware keycodes to (group, level, keyval) triples and
// signals when the configured layouts change.

pub mod fixture;

use smallvec::SmallVec;

use crate::{Keysym, ModifierState};

pub use fixture::StaticKeymap;

/// Owned query result. Small enough to stay on the stack for the common
/// case of a handful of groups and levels per key.
pub type Entries<T> = SmallVec<[T; 8]>;

/// Callback invoked when the windowing system reports a layout change
pub type KeysChangedListener = Box<dyn Fn() + Send + Sync + 'static>;

/// Errors from keymap queries
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeymapError {
    /// No keycode produces this keyval in any group
    #[error("no keymap entries for keyval {0}")]
    NoEntriesForKeyval(Keysym),

    /// The keycode is not bound in the keymap
    #[error("no keymap entries for hardware keycode {0}")]
    NoEntriesForKeycode(u16),

    /// Translating keyboard state to a shift level failed
    #[error("cannot translate keycode {keycode} in group {group} with state {state}")]
    TranslateFailed {
        keycode: u16,
        group: u8,
        state: ModifierState,
    },

    /// Subscribing to layout change notifications failed
    #[error("cannot subscribe to keys-changed: {0}")]
    SubscribeFailed(String),
}

/// Position of a keyval in the keymap: which physical key, in which group,
/// at which shift level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeymapKey {
    pub keycode: u32,
    pub group: i32,
    pub level: i32,
}

/// One output of a hardware keycode: the keyval it produces in `group`
/// at `level`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeycodeEntry {
    pub group: i32,
    pub level: i32,
    pub keyval: Keysym,
}

/// Read access to the windowing system's keymap.
///
/// Every query returns owned data; implementations backed by foreign
/// allocations must release them before returning, on success and error
/// paths alike.
pub trait KeymapQuery {
    /// All keymap positions that produce `keyval`
    fn entries_for_keyval(&self, keyval: Keysym) -> Result<Entries<KeymapKey>, KeymapError>;

    /// All (group, level, keyval) outputs of a hardware keycode, in keymap
    /// order
    fn entries_for_keycode(&self, keycode: u16) -> Result<Entries<KeycodeEntry>, KeymapError>;

    /// Shift level selected by `state` for `keycode` in `group`
    fn translate_level(
        &self,
        keycode: u16,
        state: ModifierState,
        group: u8,
    ) -> Result<i32, KeymapError>;

    /// Register a listener for layout changes.
    ///
    /// The listener lives as long as the keymap does; there is no way to
    /// unsubscribe.
    fn on_keys_changed(&self, listener: KeysChangedListener) -> Result<(), KeymapError>;
}
