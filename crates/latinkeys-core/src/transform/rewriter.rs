// Latinkeys Event Rewriter
// Replaces the group and keyval of non-Latin hotkey events with the Latin
// output of the same physical key

use crate::classifier::{Classifier, LayoutClassifier};
use crate::config::RemapConfig;
use crate::keymap::KeymapQuery;
use crate::{KeyEvent, Keysym, ModifierState};

/// Why an event was left alone before any keymap lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Not a key press or release
    NotKeyTransition,
    /// The key itself is a modifier
    ModifierKey,
    /// No hotkey modifier is held
    NoHotkeyModifier,
    /// The event already resolves to a Latin key
    AlreadyLatin,
}

/// Result of rewriting a single key event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewriteOutcome {
    /// Event not eligible for remapping
    Skipped(SkipReason),
    /// The keymap could not resolve the current shift level
    LevelUnresolved,
    /// The key has no Latin output at the current level
    NoLatinEntry,
    /// Group and keyval were replaced
    Remapped {
        from: (u8, Keysym),
        to: (u8, Keysym),
    },
}

impl RewriteOutcome {
    /// Whether the event was modified
    pub fn is_remapped(&self) -> bool {
        matches!(self, RewriteOutcome::Remapped { .. })
    }
}

/// Per-event rewrite decision.
///
/// The rewriter holds no per-event state; the only state it owns is what
/// its classifier caches about the current layout.
#[derive(Debug)]
pub struct EventRewriter<C = Classifier> {
    classifier: C,
    hotkeys: ModifierState,
}

impl EventRewriter<Classifier> {
    /// Create a rewriter from configuration
    pub fn from_config(config: &RemapConfig) -> Self {
        Self::new(Classifier::for_strategy(config.strategy), config.hotkeys)
    }
}

impl<C: LayoutClassifier> EventRewriter<C> {
    /// Create a rewriter with an explicit classifier
    pub fn new(classifier: C, hotkeys: ModifierState) -> Self {
        Self {
            classifier,
            hotkeys,
        }
    }

    /// The classifier in use
    pub fn classifier(&self) -> &C {
        &self.classifier
    }

    /// Rewrite `event` in place when it is a non-Latin hotkey.
    ///
    /// Only `event.group` and `event.keyval` are ever modified, and only
    /// when the outcome is [`RewriteOutcome::Remapped`]. Keymap failures
    /// leave the event untouched.
    pub fn rewrite(&self, keymap: &dyn KeymapQuery, event: &mut KeyEvent) -> RewriteOutcome {
        if !event.kind.is_key_transition() {
            return RewriteOutcome::Skipped(SkipReason::NotKeyTransition);
        }

        self.classifier.prepare(keymap);

        if event.is_modifier {
            return RewriteOutcome::Skipped(SkipReason::ModifierKey);
        }
        if !event.state.holds_any(self.hotkeys) {
            return RewriteOutcome::Skipped(SkipReason::NoHotkeyModifier);
        }
        if self.classifier.is_latin_event(event) {
            return RewriteOutcome::Skipped(SkipReason::AlreadyLatin);
        }

        log::debug!("non-Latin hotkey event with keyval={}", event.keyval);

        let level = match keymap.translate_level(event.hardware_keycode, event.state, event.group) {
            Ok(level) => level,
            Err(e) => {
                log::debug!("{}", e);
                return RewriteOutcome::LevelUnresolved;
            }
        };

        let entries = match keymap.entries_for_keycode(event.hardware_keycode) {
            Ok(entries) => entries,
            Err(e) => {
                log::debug!("{}", e);
                return RewriteOutcome::NoLatinEntry;
            }
        };

        for entry in entries.iter() {
            log::trace!(
                "group: {}, level: {}, keycode: {}",
                entry.group,
                entry.level,
                event.hardware_keycode
            );
            if !self.classifier.is_latin_entry(event, entry, level) {
                continue;
            }
            let Ok(group) = u8::try_from(entry.group) else {
                continue;
            };

            log::debug!("found Latin keyval={}", entry.keyval);
            let from = (event.group, event.keyval);
            event.group = group;
            event.keyval = entry.keyval;
            return RewriteOutcome::Remapped {
                from,
                to: (group, entry.keyval),
            };
        }

        RewriteOutcome::NoLatinEntry
    }
}
