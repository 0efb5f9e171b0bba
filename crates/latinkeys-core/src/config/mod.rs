// Latinkeys Remap Configuration
// Strategy selection and hotkey modifiers, fixed when the rewriter is built

use std::fmt;

use crate::ModifierState;

/// Layout classification strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Strategy {
    /// Scan the keymap for the group holding the Latin letters and remap
    /// towards that group
    #[default]
    ActiveScan,
    /// Treat any ASCII digit or letter as Latin, no keymap scan
    Direct,
}

impl Strategy {
    /// Convert Strategy to string
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::ActiveScan => "active-scan",
            Strategy::Direct => "direct",
        }
    }

    /// Modifiers that mark a key press as a hotkey for this strategy
    pub fn default_hotkeys(&self) -> ModifierState {
        match self {
            Strategy::ActiveScan => ModifierState::CONTROL | ModifierState::ALT,
            Strategy::Direct => ModifierState::CONTROL,
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Settings for the event rewriter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemapConfig {
    pub strategy: Strategy,
    /// Holding any of these marks a key press as a hotkey
    pub hotkeys: ModifierState,
}

impl RemapConfig {
    /// Configuration for a strategy with its default hotkey modifiers
    pub fn for_strategy(strategy: Strategy) -> Self {
        Self {
            strategy,
            hotkeys: strategy.default_hotkeys(),
        }
    }

    /// Override the hotkey modifiers
    pub fn with_hotkeys(mut self, hotkeys: ModifierState) -> Self {
        self.hotkeys = hotkeys;
        self
    }
}

impl Default for RemapConfig {
    fn default() -> Self {
        Self::for_strategy(Strategy::default())
    }
}
