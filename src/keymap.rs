// GDK Keymap Backend
//
// KeymapQuery implemented on top of the default GdkKeymap. GDK hands back
// g_malloc'd arrays; each one is owned by a GBuffer for the length of the
// query, so it is freed on every return path.

use std::ffi::{c_int, c_uint};
use std::mem;
use std::panic::{self, AssertUnwindSafe};
use std::ptr;
use std::slice;

use latinkeys_core::{
    Entries, KeycodeEntry, KeymapError, KeymapKey, KeymapQuery, KeysChangedListener, Keysym,
    ModifierState,
};

use crate::error::{ShimError, ShimResult};
use crate::gdk::{GPointer, GdkApi, GdkKeymap, GdkKeymapKey, KEYS_CHANGED};

/// Array allocated by GLib, released with `g_free` when dropped
pub struct GBuffer<T> {
    ptr: *mut T,
    len: usize,
    free: unsafe extern "C" fn(GPointer),
}

impl<T> GBuffer<T> {
    /// Take ownership of `len` elements at `ptr`. A null pointer yields an
    /// empty buffer.
    ///
    /// # Safety
    /// `ptr` must be null or a live allocation of at least `len` elements
    /// that `free` can release.
    pub unsafe fn from_raw(ptr: *mut T, len: c_int, free: unsafe extern "C" fn(GPointer)) -> Self {
        Self {
            ptr,
            len: usize::try_from(len).unwrap_or(0),
            free,
        }
    }

    pub fn as_slice(&self) -> &[T] {
        if self.ptr.is_null() || self.len == 0 {
            return &[];
        }
        unsafe { slice::from_raw_parts(self.ptr, self.len) }
    }
}

impl<T> Drop for GBuffer<T> {
    fn drop(&mut self) {
        if !self.ptr.is_null() {
            unsafe { (self.free)(self.ptr.cast()) };
        }
    }
}

/// The process-wide default GDK keymap
pub struct GdkKeymapQuery<'a> {
    api: &'a GdkApi,
    keymap: *mut GdkKeymap,
}

impl<'a> GdkKeymapQuery<'a> {
    /// Bind to `gdk_keymap_get_default()`
    pub fn default_for(api: &'a GdkApi) -> ShimResult<Self> {
        let keymap = unsafe { (api.keymap_get_default)() };
        if keymap.is_null() {
            return Err(ShimError::NoDefaultKeymap);
        }
        Ok(Self { api, keymap })
    }
}

impl KeymapQuery for GdkKeymapQuery<'_> {
    fn entries_for_keyval(&self, keyval: Keysym) -> Result<Entries<KeymapKey>, KeymapError> {
        let mut keys: *mut GdkKeymapKey = ptr::null_mut();
        let mut n_keys: c_int = 0;
        let found = unsafe {
            (self.api.keymap_get_entries_for_keyval)(self.keymap, keyval.raw(), &mut keys, &mut n_keys)
        };
        let keys = unsafe { GBuffer::from_raw(keys, n_keys, self.api.free) };
        if found == 0 {
            return Err(KeymapError::NoEntriesForKeyval(keyval));
        }

        Ok(keys
            .as_slice()
            .iter()
            .map(|key| KeymapKey {
                keycode: key.keycode,
                group: key.group,
                level: key.level,
            })
            .collect())
    }

    fn entries_for_keycode(&self, keycode: u16) -> Result<Entries<KeycodeEntry>, KeymapError> {
        let mut keys: *mut GdkKeymapKey = ptr::null_mut();
        let mut keyvals: *mut c_uint = ptr::null_mut();
        let mut n_entries: c_int = 0;
        let found = unsafe {
            (self.api.keymap_get_entries_for_keycode)(
                self.keymap,
                c_uint::from(keycode),
                &mut keys,
                &mut keyvals,
                &mut n_entries,
            )
        };
        let keys = unsafe { GBuffer::from_raw(keys, n_entries, self.api.free) };
        let keyvals = unsafe { GBuffer::from_raw(keyvals, n_entries, self.api.free) };
        if found == 0 {
            return Err(KeymapError::NoEntriesForKeycode(keycode));
        }

        Ok(keys
            .as_slice()
            .iter()
            .zip(keyvals.as_slice())
            .map(|(key, &keyval)| KeycodeEntry {
                group: key.group,
                level: key.level,
                keyval: Keysym(keyval),
            })
            .collect())
    }

    fn translate_level(
        &self,
        keycode: u16,
        state: ModifierState,
        group: u8,
    ) -> Result<i32, KeymapError> {
        let mut level: c_int = 0;
        let translated = unsafe {
            (self.api.keymap_translate_keyboard_state)(
                self.keymap,
                c_uint::from(keycode),
                state.bits(),
                c_int::from(group),
                ptr::null_mut(),
                ptr::null_mut(),
                &mut level,
                ptr::null_mut(),
            )
        };
        if translated == 0 {
            return Err(KeymapError::TranslateFailed {
                keycode,
                group,
                state,
            });
        }
        Ok(level)
    }

    fn on_keys_changed(&self, listener: KeysChangedListener) -> Result<(), KeymapError> {
        let data = Box::into_raw(Box::new(listener));
        let handler: unsafe extern "C" fn(*mut GdkKeymap, GPointer) = keys_changed_trampoline;
        let handler = unsafe {
            mem::transmute::<unsafe extern "C" fn(*mut GdkKeymap, GPointer), unsafe extern "C" fn()>(
                handler,
            )
        };

        let handler_id = unsafe {
            (self.api.signal_connect_data)(
                self.keymap.cast(),
                KEYS_CHANGED.as_ptr(),
                Some(handler),
                data.cast(),
                Some(drop_listener),
                0,
            )
        };
        if handler_id == 0 {
            drop(unsafe { Box::from_raw(data) });
            return Err(KeymapError::SubscribeFailed(
                "g_signal_connect_data returned no handler id".to_string(),
            ));
        }
        log::debug!("connected keys-changed handler {}", handler_id);
        Ok(())
    }
}

/// GObject signal handler forwarding to a boxed listener
unsafe extern "C" fn keys_changed_trampoline(_keymap: *mut GdkKeymap, data: GPointer) {
    let listener = unsafe { &*data.cast::<KeysChangedListener>() };
    if panic::catch_unwind(AssertUnwindSafe(|| listener())).is_err() {
        log::error!("keys-changed listener panicked");
    }
}

/// Closure destroy notify releasing the boxed listener
unsafe extern "C" fn drop_listener(data: GPointer, _closure: GPointer) {
    drop(unsafe { Box::from_raw(data.cast::<KeysChangedListener>()) });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::ffi::{c_char, c_ulong};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use latinkeys_core::{EventRewriter, KeyEvent, RemapConfig, RewriteOutcome};

    use crate::gdk::{GBoolean, GCallback, GClosureNotify};

    /// One keymap row: (keycode, group, level, keyval)
    type Row = (u32, i32, i32, u32);

    thread_local! {
        static ALLOCATED: Cell<usize> = const { Cell::new(0) };
        static FREED: Cell<usize> = const { Cell::new(0) };
        static ROWS: RefCell<Vec<Row>> = const { RefCell::new(Vec::new()) };
        /// GLib may hand back an allocation even when a lookup finds nothing
        static ALLOCATE_ON_MISS: Cell<bool> = const { Cell::new(false) };
        /// Handler id returned by the fake g_signal_connect_data, 0 on failure
        static HANDLER_ID: Cell<c_ulong> = const { Cell::new(0) };
        static CONNECTED: RefCell<Vec<(GPointer, GClosureNotify)>> = const { RefCell::new(Vec::new()) };
    }

    fn allocated() -> usize {
        ALLOCATED.with(Cell::get)
    }

    fn freed() -> usize {
        FREED.with(Cell::get)
    }

    unsafe extern "C" fn counting_free(mem: GPointer) {
        FREED.with(|freed| freed.set(freed.get() + 1));
        unsafe { libc::free(mem) };
    }

    fn allocate<T: Copy>(values: &[T]) -> *mut T {
        let size = mem::size_of_val(values).max(1);
        let ptr = unsafe { libc::malloc(size) }.cast::<T>();
        assert!(!ptr.is_null());
        unsafe { ptr::copy_nonoverlapping(values.as_ptr(), ptr, values.len()) };
        ALLOCATED.with(|allocated| allocated.set(allocated.get() + 1));
        ptr
    }

    /// Write `values` to an out-parameter the way GDK does
    fn hand_back<T: Copy>(out: *mut *mut T, values: &[T]) {
        if out.is_null() {
            return;
        }
        let ptr = if values.is_empty() && !ALLOCATE_ON_MISS.with(Cell::get) {
            ptr::null_mut()
        } else {
            allocate(values)
        };
        unsafe { *out = ptr };
    }

    unsafe extern "C" fn fake_get_default() -> *mut GdkKeymap {
        ptr::NonNull::<GdkKeymap>::dangling().as_ptr()
    }

    unsafe extern "C" fn fake_entries_for_keyval(
        _keymap: *mut GdkKeymap,
        keyval: c_uint,
        keys: *mut *mut GdkKeymapKey,
        n_keys: *mut c_int,
    ) -> GBoolean {
        let found: Vec<GdkKeymapKey> = ROWS.with(|rows| {
            rows.borrow()
                .iter()
                .filter(|row| row.3 == keyval)
                .map(|&(keycode, group, level, _)| GdkKeymapKey { keycode, group, level })
                .collect()
        });
        hand_back(keys, &found);
        unsafe { *n_keys = found.len() as c_int };
        GBoolean::from(!found.is_empty())
    }

    unsafe extern "C" fn fake_entries_for_keycode(
        _keymap: *mut GdkKeymap,
        hardware_keycode: c_uint,
        keys: *mut *mut GdkKeymapKey,
        keyvals: *mut *mut c_uint,
        n_entries: *mut c_int,
    ) -> GBoolean {
        let found: Vec<Row> = ROWS.with(|rows| {
            rows.borrow()
                .iter()
                .filter(|row| row.0 == hardware_keycode)
                .copied()
                .collect()
        });
        let found_keys: Vec<GdkKeymapKey> = found
            .iter()
            .map(|&(keycode, group, level, _)| GdkKeymapKey { keycode, group, level })
            .collect();
        let found_keyvals: Vec<c_uint> = found.iter().map(|row| row.3).collect();
        hand_back(keys, &found_keys);
        hand_back(keyvals, &found_keyvals);
        unsafe { *n_entries = found.len() as c_int };
        GBoolean::from(!found.is_empty())
    }

    #[allow(clippy::too_many_arguments)]
    unsafe extern "C" fn fake_translate_keyboard_state(
        _keymap: *mut GdkKeymap,
        hardware_keycode: c_uint,
        state: c_uint,
        group: c_int,
        _keyval: *mut c_uint,
        _effective_group: *mut c_int,
        level: *mut c_int,
        _consumed_modifiers: *mut c_uint,
    ) -> GBoolean {
        let levels: Vec<i32> = ROWS.with(|rows| {
            rows.borrow()
                .iter()
                .filter(|row| row.0 == hardware_keycode && row.1 == group)
                .map(|row| row.2)
                .collect()
        });
        if levels.is_empty() {
            return 0;
        }
        let shifted = ModifierState::from_bits_retain(state).contains(ModifierState::SHIFT);
        if !level.is_null() {
            unsafe { *level = c_int::from(shifted && levels.contains(&1)) };
        }
        1
    }

    unsafe extern "C" fn fake_signal_connect_data(
        _instance: GPointer,
        _detailed_signal: *const c_char,
        _handler: GCallback,
        data: GPointer,
        destroy_data: GClosureNotify,
        _connect_flags: c_int,
    ) -> c_ulong {
        let id = HANDLER_ID.with(Cell::get);
        if id != 0 {
            CONNECTED.with(|connected| connected.borrow_mut().push((data, destroy_data)));
        }
        id
    }

    fn fake_api() -> GdkApi {
        GdkApi {
            keymap_get_default: fake_get_default,
            keymap_get_entries_for_keyval: fake_entries_for_keyval,
            keymap_get_entries_for_keycode: fake_entries_for_keycode,
            keymap_translate_keyboard_state: fake_translate_keyboard_state,
            signal_connect_data: fake_signal_connect_data,
            free: counting_free,
        }
    }

    /// Reset the fake keymap: Cyrillic in group 0, Latin in group 1 on
    /// keycode 38, and keycode 54 bound in group 0 only
    fn load_ru_us(allocate_on_miss: bool, handler_id: c_ulong) {
        ROWS.with(|rows| {
            *rows.borrow_mut() = vec![
                (38, 0, 0, 0x06c6), // ф
                (38, 0, 1, 0x06e6), // Ф
                (38, 1, 0, 0x61),   // a
                (38, 1, 1, 0x41),   // A
                (54, 0, 0, 0x06d3), // с
            ];
        });
        ALLOCATE_ON_MISS.with(|flag| flag.set(allocate_on_miss));
        HANDLER_ID.with(|id| id.set(handler_id));
        CONNECTED.with(|connected| connected.borrow_mut().clear());
    }

    /// Release every listener the fake signal system still holds
    fn disconnect_all() {
        let connected = CONNECTED.with(|connected| connected.take());
        for (data, destroy) in connected {
            if let Some(destroy) = destroy {
                unsafe { destroy(data, ptr::null_mut()) };
            }
        }
    }

    fn ctrl_press(keycode: u16, keyval: u32) -> KeyEvent {
        KeyEvent::press(keycode, 0, Keysym(keyval)).with_state(ModifierState::CONTROL)
    }

    #[test]
    fn test_gbuffer_frees_on_drop() {
        let before = freed();
        {
            let buffer = unsafe { GBuffer::from_raw(allocate(&[1u32, 2, 3]), 3, counting_free) };
            assert_eq!(buffer.as_slice(), &[1, 2, 3]);
        }
        assert_eq!(freed(), before + 1);
    }

    #[test]
    fn test_gbuffer_frees_on_early_return() {
        fn first_even(values: &[u32]) -> Option<u32> {
            let buffer = unsafe { GBuffer::from_raw(allocate(values), values.len() as c_int, counting_free) };
            for &value in buffer.as_slice() {
                if value % 2 == 0 {
                    return Some(value);
                }
            }
            None
        }

        let before = freed();
        assert_eq!(first_even(&[1, 4, 5]), Some(4));
        assert_eq!(first_even(&[1, 3]), None);
        assert_eq!(freed(), before + 2);
    }

    #[test]
    fn test_gbuffer_null_is_empty() {
        let before = freed();
        {
            let buffer = unsafe { GBuffer::<u32>::from_raw(ptr::null_mut(), 4, counting_free) };
            assert!(buffer.as_slice().is_empty());
        }
        assert_eq!(freed(), before);
    }

    #[test]
    fn test_gbuffer_negative_length() {
        let buffer = unsafe { GBuffer::from_raw(allocate(&[7u32]), -1, counting_free) };
        assert!(buffer.as_slice().is_empty());
    }

    #[test]
    fn test_trampoline_invokes_and_drops_listener() {
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        let listener: KeysChangedListener = Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let data: GPointer = Box::into_raw(Box::new(listener)).cast();

        unsafe {
            keys_changed_trampoline(ptr::null_mut(), data);
            keys_changed_trampoline(ptr::null_mut(), data);
            drop_listener(data, ptr::null_mut());
        }

        assert_eq!(fired.load(Ordering::SeqCst), 2);
        // The listener (and its clone of the Arc) is gone
        assert_eq!(Arc::strong_count(&fired), 1);
    }

    // ==================== GdkKeymapQuery ====================

    #[test]
    fn test_entries_for_keyval() {
        load_ru_us(false, 0);
        let api = fake_api();
        let keymap = GdkKeymapQuery::default_for(&api).unwrap();

        let keys = keymap.entries_for_keyval(Keysym(0x61)).unwrap();
        assert_eq!(
            keys.as_slice(),
            &[KeymapKey {
                keycode: 38,
                group: 1,
                level: 0
            }]
        );
        assert!(matches!(
            keymap.entries_for_keyval(Keysym(0x7a)),
            Err(KeymapError::NoEntriesForKeyval(Keysym(0x7a)))
        ));
    }

    #[test]
    fn test_entries_for_keycode_pairs_keys_with_keyvals() {
        load_ru_us(false, 0);
        let api = fake_api();
        let keymap = GdkKeymapQuery::default_for(&api).unwrap();
        let before = (allocated(), freed());

        let entries = keymap.entries_for_keycode(38).unwrap();

        assert_eq!(entries.len(), 4);
        assert_eq!(
            entries[2],
            KeycodeEntry {
                group: 1,
                level: 0,
                keyval: Keysym(0x61)
            }
        );
        assert_eq!(allocated() - before.0, 2);
        assert_eq!(freed() - before.1, 2);
    }

    #[test]
    fn test_failed_lookup_still_frees_buffers() {
        load_ru_us(true, 0);
        let api = fake_api();
        let keymap = GdkKeymapQuery::default_for(&api).unwrap();
        let before = (allocated(), freed());

        assert!(matches!(
            keymap.entries_for_keycode(99),
            Err(KeymapError::NoEntriesForKeycode(99))
        ));
        assert!(keymap.entries_for_keyval(Keysym(0x7a)).is_err());

        assert_eq!(allocated() - before.0, 3);
        assert_eq!(freed() - before.1, 3);
    }

    #[test]
    fn test_translate_level() {
        load_ru_us(false, 0);
        let api = fake_api();
        let keymap = GdkKeymapQuery::default_for(&api).unwrap();

        assert_eq!(keymap.translate_level(38, ModifierState::CONTROL, 0).unwrap(), 0);
        assert_eq!(
            keymap
                .translate_level(38, ModifierState::CONTROL | ModifierState::SHIFT, 0)
                .unwrap(),
            1
        );
        assert!(matches!(
            keymap.translate_level(54, ModifierState::CONTROL, 1),
            Err(KeymapError::TranslateFailed {
                keycode: 54,
                group: 1,
                ..
            })
        ));
    }

    #[test]
    fn test_subscribe_failure_drops_listener() {
        load_ru_us(false, 0);
        let api = fake_api();
        let keymap = GdkKeymapQuery::default_for(&api).unwrap();
        let alive = Arc::new(());
        let held = Arc::clone(&alive);

        let result = keymap.on_keys_changed(Box::new(move || {
            let _ = &held;
        }));

        assert!(matches!(result, Err(KeymapError::SubscribeFailed(_))));
        assert_eq!(Arc::strong_count(&alive), 1);
    }

    #[test]
    fn test_subscribe_keeps_listener_until_destroyed() {
        load_ru_us(false, 7);
        let api = fake_api();
        let keymap = GdkKeymapQuery::default_for(&api).unwrap();
        let alive = Arc::new(());
        let held = Arc::clone(&alive);

        keymap
            .on_keys_changed(Box::new(move || {
                let _ = &held;
            }))
            .unwrap();
        assert_eq!(Arc::strong_count(&alive), 2);

        disconnect_all();
        assert_eq!(Arc::strong_count(&alive), 1);
    }

    // ==================== Rewriting over GDK ====================

    #[test]
    fn test_rewrite_remaps_and_frees_every_buffer() {
        load_ru_us(true, 7);
        let api = fake_api();
        let keymap = GdkKeymapQuery::default_for(&api).unwrap();
        let rewriter = EventRewriter::from_config(&RemapConfig::default());
        let before = (allocated(), freed());

        let mut event = ctrl_press(38, 0x06c6);
        let outcome = rewriter.rewrite(&keymap, &mut event);

        assert!(outcome.is_remapped());
        assert_eq!(event.group, 1);
        assert_eq!(event.keyval, Keysym(0x61));
        // 26 letter scans plus the two keycode arrays
        assert_eq!(allocated() - before.0, 28);
        assert_eq!(allocated() - before.0, freed() - before.1);
        disconnect_all();
    }

    #[test]
    fn test_single_entry_keycode_unchanged_and_freed() {
        load_ru_us(false, 7);
        let api = fake_api();
        let keymap = GdkKeymapQuery::default_for(&api).unwrap();
        let rewriter = EventRewriter::from_config(&RemapConfig::default());
        let before = (allocated(), freed());

        let mut event = ctrl_press(54, 0x06d3);
        let original = event;
        let outcome = rewriter.rewrite(&keymap, &mut event);

        assert_eq!(outcome, RewriteOutcome::NoLatinEntry);
        assert_eq!(event, original);
        assert!(allocated() > before.0);
        assert_eq!(allocated() - before.0, freed() - before.1);
        disconnect_all();
    }

    #[test]
    fn test_rewrite_with_failed_subscription_still_remaps() {
        load_ru_us(false, 0);
        let api = fake_api();
        let keymap = GdkKeymapQuery::default_for(&api).unwrap();
        let rewriter = EventRewriter::from_config(&RemapConfig::default());

        let mut event = ctrl_press(38, 0x06c6);
        assert!(rewriter.rewrite(&keymap, &mut event).is_remapped());
        assert_eq!(event.keyval, Keysym(0x61));
    }
}
