// Latinkeys Core Library
// Layout classification and hotkey rewriting, independent of the toolkit

pub mod classifier;
pub mod config;
pub mod input;
pub mod keymap;
pub mod keysym;
pub mod modifier;
pub mod transform;

pub use classifier::{ActiveScan, Classifier, DirectClassification, LatinGroupTable, LayoutClassifier};
pub use config::{RemapConfig, Strategy};
pub use input::{EventKind, KeyEvent};
pub use keymap::{
    Entries, KeycodeEntry, KeymapError, KeymapKey, KeymapQuery, KeysChangedListener, StaticKeymap,
};
pub use keysym::Keysym;
pub use modifier::ModifierState;
pub use transform::{EventRewriter, RewriteOutcome, SkipReason};
