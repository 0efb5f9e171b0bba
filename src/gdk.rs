// GDK FFI Surface
//
// The handful of GDK 3 / GLib types and functions the shim touches. Nothing
// here links against GTK: every function is looked up at runtime with
// dlsym, since the shim only ever runs inside a process that already has
// GDK loaded.

use std::ffi::{c_char, c_int, c_uint, c_ulong, c_void, CStr};
use std::mem;

use latinkeys_core::{EventKind, KeyEvent, Keysym, ModifierState};

use crate::error::{ShimError, ShimResult};

pub type GPointer = *mut c_void;
pub type GBoolean = c_int;

pub const GDK_KEY_PRESS: c_int = 8;
pub const GDK_KEY_RELEASE: c_int = 9;

/// Name of the registration function the shim replaces
pub const EVENT_HANDLER_SET: &CStr = c"gdk_event_handler_set";
/// Signal emitted by GdkKeymap when the layout configuration changes
pub const KEYS_CHANGED: &CStr = c"keys-changed";
const GDK_LIBRARY: &CStr = c"libgdk-3.so.0";

/// Opaque `GdkEvent` union; only its leading type field is read directly
#[repr(C)]
pub struct GdkEvent {
    _private: [u8; 0],
}

#[repr(C)]
pub struct GdkKeymap {
    _private: [u8; 0],
}

#[repr(C)]
pub struct GdkWindow {
    _private: [u8; 0],
}

/// `GdkEventKey` from gdkevents.h
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct GdkEventKey {
    pub type_: c_int,
    pub window: *mut GdkWindow,
    pub send_event: i8,
    pub time: u32,
    pub state: c_uint,
    pub keyval: c_uint,
    pub length: c_int,
    pub string: *mut c_char,
    pub hardware_keycode: u16,
    pub group: u8,
    /// `guint is_modifier : 1` shares the storage unit of the fields
    /// above, so it lands in the low bit of this byte
    pub flags: u8,
}

impl GdkEventKey {
    pub fn is_modifier(&self) -> bool {
        self.flags & 1 != 0
    }

    /// Copy the rewritable fields of `event` back into the raw event
    pub fn apply(&mut self, event: &KeyEvent) {
        self.group = event.group;
        self.keyval = event.keyval.raw();
    }
}

impl From<&GdkEventKey> for KeyEvent {
    fn from(raw: &GdkEventKey) -> Self {
        let kind = match raw.type_ {
            GDK_KEY_PRESS => EventKind::Press,
            GDK_KEY_RELEASE => EventKind::Release,
            _ => EventKind::Other,
        };
        KeyEvent {
            kind,
            hardware_keycode: raw.hardware_keycode,
            state: ModifierState::from_bits_retain(raw.state),
            is_modifier: raw.is_modifier(),
            group: raw.group,
            keyval: Keysym(raw.keyval),
        }
    }
}

/// `GdkKeymapKey` from gdkkeys.h
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GdkKeymapKey {
    pub keycode: c_uint,
    pub group: c_int,
    pub level: c_int,
}

pub type GdkEventFunc = Option<unsafe extern "C" fn(event: *mut GdkEvent, data: GPointer)>;
pub type GDestroyNotify = Option<unsafe extern "C" fn(data: GPointer)>;
pub type GCallback = Option<unsafe extern "C" fn()>;
pub type GClosureNotify = Option<unsafe extern "C" fn(data: GPointer, closure: GPointer)>;

/// Signature of `gdk_event_handler_set`
pub type GdkEventHandlerSet =
    unsafe extern "C" fn(func: GdkEventFunc, data: GPointer, notify: GDestroyNotify);

/// Check whether a raw event is a key press or release.
///
/// # Safety
/// `event` must be null or point to a live `GdkEvent`.
pub unsafe fn is_key_event(event: *const GdkEvent) -> bool {
    if event.is_null() {
        return false;
    }
    let type_ = unsafe { *event.cast::<c_int>() };
    type_ == GDK_KEY_PRESS || type_ == GDK_KEY_RELEASE
}

/// View a raw event as a key event, if it is one.
///
/// # Safety
/// `event` must be null or point to a live `GdkEvent` not aliased for `'a`.
pub unsafe fn as_key_event<'a>(event: *mut GdkEvent) -> Option<&'a mut GdkEventKey> {
    if unsafe { is_key_event(event) } {
        Some(unsafe { &mut *event.cast::<GdkEventKey>() })
    } else {
        None
    }
}

/// GDK keymap entry points, resolved from the running process
#[derive(Debug, Clone, Copy)]
pub struct GdkApi {
    pub keymap_get_default: unsafe extern "C" fn() -> *mut GdkKeymap,
    pub keymap_get_entries_for_keyval: unsafe extern "C" fn(
        keymap: *mut GdkKeymap,
        keyval: c_uint,
        keys: *mut *mut GdkKeymapKey,
        n_keys: *mut c_int,
    ) -> GBoolean,
    pub keymap_get_entries_for_keycode: unsafe extern "C" fn(
        keymap: *mut GdkKeymap,
        hardware_keycode: c_uint,
        keys: *mut *mut GdkKeymapKey,
        keyvals: *mut *mut c_uint,
        n_entries: *mut c_int,
    ) -> GBoolean,
    pub keymap_translate_keyboard_state: unsafe extern "C" fn(
        keymap: *mut GdkKeymap,
        hardware_keycode: c_uint,
        state: c_uint,
        group: c_int,
        keyval: *mut c_uint,
        effective_group: *mut c_int,
        level: *mut c_int,
        consumed_modifiers: *mut c_uint,
    ) -> GBoolean,
    pub signal_connect_data: unsafe extern "C" fn(
        instance: GPointer,
        detailed_signal: *const c_char,
        handler: GCallback,
        data: GPointer,
        destroy_data: GClosureNotify,
        connect_flags: c_int,
    ) -> c_ulong,
    pub free: unsafe extern "C" fn(mem: GPointer),
}

impl GdkApi {
    /// Resolve every entry point from the global symbol scope
    pub fn load() -> ShimResult<Self> {
        unsafe {
            Ok(Self {
                keymap_get_default: lookup(libc::RTLD_DEFAULT, c"gdk_keymap_get_default")?,
                keymap_get_entries_for_keyval: lookup(
                    libc::RTLD_DEFAULT,
                    c"gdk_keymap_get_entries_for_keyval",
                )?,
                keymap_get_entries_for_keycode: lookup(
                    libc::RTLD_DEFAULT,
                    c"gdk_keymap_get_entries_for_keycode",
                )?,
                keymap_translate_keyboard_state: lookup(
                    libc::RTLD_DEFAULT,
                    c"gdk_keymap_translate_keyboard_state",
                )?,
                signal_connect_data: lookup(libc::RTLD_DEFAULT, c"g_signal_connect_data")?,
                free: lookup(libc::RTLD_DEFAULT, c"g_free")?,
            })
        }
    }
}

/// Find the real `gdk_event_handler_set`, skipping our own export.
///
/// Tries the next object in lookup order first, then asks an already loaded
/// libgdk directly.
pub fn resolve_original_setter() -> ShimResult<GdkEventHandlerSet> {
    match unsafe { lookup::<GdkEventHandlerSet>(libc::RTLD_NEXT, EVENT_HANDLER_SET) } {
        Ok(original) => return Ok(original),
        Err(e) => log::warn!("{}; trying {}", e, GDK_LIBRARY.to_string_lossy()),
    }

    let handle = unsafe { libc::dlopen(GDK_LIBRARY.as_ptr(), libc::RTLD_LAZY | libc::RTLD_NOLOAD) };
    if handle.is_null() {
        return Err(ShimError::SymbolNotFound {
            name: EVENT_HANDLER_SET.to_string_lossy().into_owned(),
            reason: last_dl_error(),
        });
    }
    unsafe { lookup(handle, EVENT_HANDLER_SET) }
}

/// Look up `name` in `handle` and reinterpret it as the function pointer `F`.
///
/// # Safety
/// `F` must be a function pointer type matching the symbol's real signature.
unsafe fn lookup<F: Copy>(handle: *mut c_void, name: &CStr) -> ShimResult<F> {
    debug_assert_eq!(mem::size_of::<F>(), mem::size_of::<*mut c_void>());

    // Clear any stale error so a null result can be told apart
    unsafe { libc::dlerror() };
    let symbol = unsafe { libc::dlsym(handle, name.as_ptr()) };
    if symbol.is_null() {
        return Err(ShimError::SymbolNotFound {
            name: name.to_string_lossy().into_owned(),
            reason: last_dl_error(),
        });
    }
    Ok(unsafe { mem::transmute_copy::<*mut c_void, F>(&symbol) })
}

fn last_dl_error() -> String {
    let message = unsafe { libc::dlerror() };
    if message.is_null() {
        "not exported by any loaded object".to_string()
    } else {
        unsafe { CStr::from_ptr(message) }.to_string_lossy().into_owned()
    }
}
