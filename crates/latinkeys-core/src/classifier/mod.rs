// Latinkeys Layout Classification
// Decides which keymap entries count as "Latin" for a given key event

mod active_scan;
mod direct;

pub use active_scan::{ActiveScan, LatinGroupTable};
pub use direct::DirectClassification;

use crate::config::Strategy;
use crate::keymap::{KeycodeEntry, KeymapQuery};
use crate::KeyEvent;

/// Interface shared by the layout classification strategies
pub trait LayoutClassifier {
    /// Short name used in log output
    fn name(&self) -> &'static str;

    /// Called for every key press/release before any other check, so that
    /// stateful classifiers can refresh cached layout data
    fn prepare(&self, _keymap: &dyn KeymapQuery) {}

    /// Whether the event already resolves to a Latin key
    fn is_latin_event(&self, event: &KeyEvent) -> bool;

    /// Whether `entry` is the Latin counterpart of `event` at shift `level`
    fn is_latin_entry(&self, event: &KeyEvent, entry: &KeycodeEntry, level: i32) -> bool;
}

/// Classifier selected at runtime from a [`Strategy`]
#[derive(Debug)]
pub enum Classifier {
    ActiveScan(ActiveScan),
    Direct(DirectClassification),
}

impl Classifier {
    /// Create the classifier for a strategy
    pub fn for_strategy(strategy: Strategy) -> Self {
        match strategy {
            Strategy::ActiveScan => Classifier::ActiveScan(ActiveScan::new()),
            Strategy::Direct => Classifier::Direct(DirectClassification),
        }
    }

    /// The strategy this classifier implements
    pub fn strategy(&self) -> Strategy {
        match self {
            Classifier::ActiveScan(_) => Strategy::ActiveScan,
            Classifier::Direct(_) => Strategy::Direct,
        }
    }

    /// The active-scan classifier, if that strategy is in use
    pub fn as_active_scan(&self) -> Option<&ActiveScan> {
        match self {
            Classifier::ActiveScan(scan) => Some(scan),
            Classifier::Direct(_) => None,
        }
    }
}

impl LayoutClassifier for Classifier {
    fn name(&self) -> &'static str {
        match self {
            Classifier::ActiveScan(c) => c.name(),
            Classifier::Direct(c) => c.name(),
        }
    }

    fn prepare(&self, keymap: &dyn KeymapQuery) {
        match self {
            Classifier::ActiveScan(c) => c.prepare(keymap),
            Classifier::Direct(c) => c.prepare(keymap),
        }
    }

    fn is_latin_event(&self, event: &KeyEvent) -> bool {
        match self {
            Classifier::ActiveScan(c) => c.is_latin_event(event),
            Classifier::Direct(c) => c.is_latin_event(event),
        }
    }

    fn is_latin_entry(&self, event: &KeyEvent, entry: &KeycodeEntry, level: i32) -> bool {
        match self {
            Classifier::ActiveScan(c) => c.is_latin_entry(event, entry, level),
            Classifier::Direct(c) => c.is_latin_entry(event, entry, level),
        }
    }
}
