// Direct layout classification
// A keyval is Latin when it is an ASCII digit or letter; no keymap scan

use super::LayoutClassifier;
use crate::keymap::KeycodeEntry;
use crate::KeyEvent;

/// Stateless classifier looking only at keyvals
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectClassification;

impl LayoutClassifier for DirectClassification {
    fn name(&self) -> &'static str {
        "direct"
    }

    fn is_latin_event(&self, event: &KeyEvent) -> bool {
        event.keyval.is_latin()
    }

    /// Any Latin output of the same key at the same level, from a group
    /// other than the active one
    fn is_latin_entry(&self, event: &KeyEvent, entry: &KeycodeEntry, level: i32) -> bool {
        entry.group != i32::from(event.group) && entry.level == level && entry.keyval.is_latin()
    }
}
