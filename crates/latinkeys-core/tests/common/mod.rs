// Shared fixtures for the rewriter integration suites

#![allow(dead_code)]

use latinkeys_core::{EventRewriter, KeyEvent, Keysym, ModifierState, RemapConfig, StaticKeymap, Strategy};

pub const EF: Keysym = Keysym(0x06c6); // Cyrillic ф
pub const ES: Keysym = Keysym(0x06d3); // Cyrillic с
pub const ZHE: Keysym = Keysym(0x06d6); // Cyrillic ж
pub const A: Keysym = Keysym(0x61);
pub const C: Keysym = Keysym(0x63);
pub const ONE: Keysym = Keysym(0x31);
pub const SHIFT_L: Keysym = Keysym(0xffe1);
pub const RETURN: Keysym = Keysym(0xff0d);

pub const KEY_A: u16 = 38;
pub const KEY_C: u16 = 54;
pub const KEY_1: u16 = 10;
pub const KEY_SHIFT: u16 = 50;
pub const KEY_RETURN: u16 = 36;
/// Only bound in the Cyrillic group
pub const KEY_CYRILLIC_ONLY: u16 = 47;

pub const STRATEGIES: [Strategy; 2] = [Strategy::ActiveScan, Strategy::Direct];

/// Two-group keymap: group 0 Cyrillic, group 1 Latin
pub fn ru_us() -> StaticKeymap {
    StaticKeymap::new()
        .bind(KEY_A, 0, 0, EF)
        .bind(KEY_A, 1, 0, A)
        .bind(KEY_C, 0, 0, ES)
        .bind(KEY_C, 1, 0, C)
        .bind(KEY_1, 0, 0, ONE)
        .bind(KEY_1, 1, 0, ONE)
        .bind(KEY_SHIFT, 0, 0, SHIFT_L)
        .bind(KEY_SHIFT, 1, 0, SHIFT_L)
        .bind(KEY_RETURN, 0, 0, RETURN)
        .bind(KEY_RETURN, 1, 0, RETURN)
        .bind(KEY_CYRILLIC_ONLY, 0, 0, ZHE)
}

/// Rewriter for a strategy; Ctrl is a hotkey for every strategy
pub fn rewriter(strategy: Strategy) -> EventRewriter {
    EventRewriter::from_config(&RemapConfig::for_strategy(strategy))
}

/// Ctrl+key press typed under the Cyrillic group
pub fn ctrl_press(keycode: u16, keyval: Keysym) -> KeyEvent {
    KeyEvent::press(keycode, 0, keyval).with_state(ModifierState::CONTROL)
}

/// Every modifier combination the suites iterate over
pub fn modifier_states() -> Vec<ModifierState> {
    vec![
        ModifierState::empty(),
        ModifierState::SHIFT,
        ModifierState::CONTROL,
        ModifierState::ALT,
        ModifierState::CONTROL | ModifierState::ALT,
        ModifierState::CONTROL | ModifierState::SHIFT,
        ModifierState::SUPER,
    ]
}
