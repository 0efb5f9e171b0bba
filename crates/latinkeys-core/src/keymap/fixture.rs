// In-memory keymap
//
// A keymap built from explicit (keycode, group, level, keyval) rows. It
// counts queries and lets callers fire layout change notifications, which
// makes it the stand-in for the windowing system in tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::{Mutex, RwLock};

use super::{Entries, KeycodeEntry, KeymapError, KeymapKey, KeymapQuery, KeysChangedListener};
use crate::{Keysym, ModifierState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Binding {
    keycode: u16,
    group: i32,
    level: i32,
    keyval: Keysym,
}

/// Keymap backed by a list of bindings
#[derive(Default)]
pub struct StaticKeymap {
    bindings: RwLock<Vec<Binding>>,
    listeners: Mutex<Vec<KeysChangedListener>>,
    translation_disabled: bool,
    keyval_queries: AtomicUsize,
    keycode_queries: AtomicUsize,
}

impl StaticKeymap {
    /// Create an empty keymap
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a binding: `keycode` produces `keyval` in `group` at `level`
    pub fn bind(self, keycode: u16, group: i32, level: i32, keyval: Keysym) -> Self {
        self.bindings.write().push(Binding {
            keycode,
            group,
            level,
            keyval,
        });
        self
    }

    /// Make every `translate_level` call fail
    pub fn without_translation(mut self) -> Self {
        self.translation_disabled = true;
        self
    }

    /// Replace all bindings, simulating a layout reconfiguration.
    ///
    /// Listeners are not notified; call [`StaticKeymap::fire_keys_changed`]
    /// for that.
    pub fn rebind(&self, rows: &[(u16, i32, i32, Keysym)]) {
        let mut bindings = self.bindings.write();
        bindings.clear();
        bindings.extend(rows.iter().map(|&(keycode, group, level, keyval)| Binding {
            keycode,
            group,
            level,
            keyval,
        }));
    }

    /// Invoke every registered keys-changed listener
    pub fn fire_keys_changed(&self) {
        for listener in self.listeners.lock().iter() {
            listener();
        }
    }

    /// Number of registered keys-changed listeners
    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }

    /// Number of `entries_for_keyval` calls so far
    pub fn keyval_queries(&self) -> usize {
        self.keyval_queries.load(Ordering::Relaxed)
    }

    /// Number of `entries_for_keycode` calls so far
    pub fn keycode_queries(&self) -> usize {
        self.keycode_queries.load(Ordering::Relaxed)
    }
}

impl KeymapQuery for StaticKeymap {
    fn entries_for_keyval(&self, keyval: Keysym) -> Result<Entries<KeymapKey>, KeymapError> {
        self.keyval_queries.fetch_add(1, Ordering::Relaxed);
        let keys: Entries<KeymapKey> = self
            .bindings
            .read()
            .iter()
            .filter(|b| b.keyval == keyval)
            .map(|b| KeymapKey {
                keycode: u32::from(b.keycode),
                group: b.group,
                level: b.level,
            })
            .collect();
        if keys.is_empty() {
            return Err(KeymapError::NoEntriesForKeyval(keyval));
        }
        Ok(keys)
    }

    fn entries_for_keycode(&self, keycode: u16) -> Result<Entries<KeycodeEntry>, KeymapError> {
        self.keycode_queries.fetch_add(1, Ordering::Relaxed);
        let entries: Entries<KeycodeEntry> = self
            .bindings
            .read()
            .iter()
            .filter(|b| b.keycode == keycode)
            .map(|b| KeycodeEntry {
                group: b.group,
                level: b.level,
                keyval: b.keyval,
            })
            .collect();
        if entries.is_empty() {
            return Err(KeymapError::NoEntriesForKeycode(keycode));
        }
        Ok(entries)
    }

    /// Level 1 when Shift is held and the key has a shifted output in
    /// `group`, level 0 otherwise
    fn translate_level(
        &self,
        keycode: u16,
        state: ModifierState,
        group: u8,
    ) -> Result<i32, KeymapError> {
        let failed = KeymapError::TranslateFailed {
            keycode,
            group,
            state,
        };
        if self.translation_disabled {
            return Err(failed);
        }
        let bindings = self.bindings.read();
        let mut levels = bindings
            .iter()
            .filter(|b| b.keycode == keycode && b.group == i32::from(group))
            .map(|b| b.level);
        let Some(first) = levels.next() else {
            return Err(failed);
        };
        let has_shifted = first == 1 || levels.any(|level| level == 1);
        if state.contains(ModifierState::SHIFT) && has_shifted {
            Ok(1)
        } else {
            Ok(0)
        }
    }

    fn on_keys_changed(&self, listener: KeysChangedListener) -> Result<(), KeymapError> {
        self.listeners.lock().push(listener);
        Ok(())
    }
}
