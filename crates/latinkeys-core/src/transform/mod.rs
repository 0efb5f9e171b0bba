// Latinkeys Transform Module
// Per-event rewriting of non-Latin hotkeys

pub mod rewriter;

pub use rewriter::{EventRewriter, RewriteOutcome, SkipReason};
