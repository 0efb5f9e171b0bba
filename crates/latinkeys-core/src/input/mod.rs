// Latinkeys Input Layer
// Key event model shared by the rewriter and the shim

mod event;

pub use event::{EventKind, KeyEvent};
