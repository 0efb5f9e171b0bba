// Latinkeys Preload Library
// Loaded ahead of GDK (LD_PRELOAD) to make Ctrl/Alt shortcuts work under
// non-Latin keyboard layouts

pub mod error;
pub mod gdk;
pub mod keymap;
pub mod logging;
pub mod shim;

pub use error::{ShimError, ShimResult};
pub use keymap::{GBuffer, GdkKeymapQuery};
pub use shim::{default_config, gdk_event_handler_set, InterceptionState};
