// Latinkeys Interception Shim
//
// Replaces gdk_event_handler_set. The application's callback is captured
// and an internal hook is registered in its place; the hook rewrites key
// events and then forwards every event to the captured callback.

use std::ffi::c_void;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{LazyLock, OnceLock};

use parking_lot::RwLock;

use latinkeys_core::{
    EventRewriter, KeyEvent, KeymapQuery, RemapConfig, RewriteOutcome, Strategy,
};

use crate::error::ShimResult;
use crate::gdk::{
    self, GDestroyNotify, GPointer, GdkApi, GdkEvent, GdkEventFunc, GdkEventHandlerSet,
    GdkEventKey,
};
use crate::keymap::GdkKeymapQuery;
use crate::logging;

/// Raw event callback as GDK invokes it
pub type EventCallback = unsafe extern "C" fn(event: *mut GdkEvent, data: GPointer);

/// The application's event handler and its user data
#[derive(Debug, Clone, Copy)]
struct CapturedHandler {
    func: EventCallback,
    data: GPointer,
}

// The pair is only ever handed back to GDK's dispatch thread; the shim
// never dereferences `data` itself.
unsafe impl Send for CapturedHandler {}
unsafe impl Sync for CapturedHandler {}

/// Process-wide interception context.
///
/// Holds the original registration function (resolved once), the
/// currently captured application handler and the event rewriter.
pub struct InterceptionState {
    original: OnceLock<GdkEventHandlerSet>,
    captured: RwLock<Option<CapturedHandler>>,
    rewriter: EventRewriter,
    gdk: OnceLock<Option<GdkApi>>,
}

impl InterceptionState {
    pub fn new(config: &RemapConfig) -> Self {
        Self {
            original: OnceLock::new(),
            captured: RwLock::new(None),
            rewriter: EventRewriter::from_config(config),
            gdk: OnceLock::new(),
        }
    }

    /// Whether the original registration function has been resolved
    pub fn is_active(&self) -> bool {
        self.original.get().is_some()
    }

    /// Whether an application handler is captured
    pub fn has_handler(&self) -> bool {
        self.captured.read().is_some()
    }

    /// Capture `func` and register `hook` in its place.
    ///
    /// `resolve` runs only until it first succeeds; afterwards the cached
    /// original is reused. `data` and `notify` are passed through untouched.
    pub fn install(
        &self,
        func: GdkEventFunc,
        data: GPointer,
        notify: GDestroyNotify,
        hook: EventCallback,
        resolve: impl FnOnce() -> ShimResult<GdkEventHandlerSet>,
    ) -> ShimResult<()> {
        let original = match self.original.get() {
            Some(original) => *original,
            None => {
                let resolved = resolve()?;
                log::debug!(
                    "found original gdk_event_handler_set at {:p}",
                    resolved as *const c_void
                );
                *self.original.get_or_init(|| resolved)
            }
        };

        *self.captured.write() = func.map(|func| CapturedHandler { func, data });

        log::debug!("setup our GDK event handler");
        unsafe { original(Some(hook), data, notify) };
        Ok(())
    }

    /// Hook body: rewrite key events through the default GDK keymap, then
    /// forward.
    ///
    /// # Safety
    /// `event` must be null or point to a live `GdkEvent`.
    pub unsafe fn dispatch(&self, event: *mut GdkEvent) {
        let keymap = if unsafe { gdk::is_key_event(event) } {
            self.gdk_keymap()
        } else {
            None
        };
        let keymap = keymap.as_ref().map(|k| k as &dyn KeymapQuery);
        unsafe { self.dispatch_with(event, keymap) };
    }

    /// Rewrite `event` against `keymap` when it is a key event, then hand
    /// it to the captured handler along with the user data it was
    /// registered with. Without a handler the event is dropped.
    ///
    /// # Safety
    /// `event` must be null or point to a live `GdkEvent`.
    pub unsafe fn dispatch_with(&self, event: *mut GdkEvent, keymap: Option<&dyn KeymapQuery>) {
        if let (Some(keymap), Some(raw)) = (keymap, unsafe { gdk::as_key_event(event) }) {
            let rewritten = panic::catch_unwind(AssertUnwindSafe(|| self.rewrite_raw(keymap, raw)));
            if rewritten.is_err() {
                log::error!("hotkey rewrite panicked, forwarding event unmodified");
            }
        }

        // Copied out so the lock is not held while the application runs; it
        // may well register a new handler from inside its callback.
        let captured = *self.captured.read();
        match captured {
            Some(handler) => unsafe { (handler.func)(event, handler.data) },
            None => log::trace!("no application event handler, event dropped"),
        }
    }

    fn rewrite_raw(&self, keymap: &dyn KeymapQuery, raw: &mut GdkEventKey) {
        let mut event = KeyEvent::from(&*raw);
        log::trace!("{}", event);

        if let RewriteOutcome::Remapped { from, to } = self.rewriter.rewrite(keymap, &mut event) {
            raw.apply(&event);
            log::debug!(
                "keycode {} remapped from group {} keyval {} to group {} keyval {}",
                event.hardware_keycode,
                from.0,
                from.1,
                to.0,
                to.1
            );
        }
    }

    fn gdk_keymap(&self) -> Option<GdkKeymapQuery<'_>> {
        let api = self
            .gdk
            .get_or_init(|| match GdkApi::load() {
                Ok(api) => Some(api),
                Err(e) => {
                    log::error!("{}; hotkeys will not be remapped", e);
                    None
                }
            })
            .as_ref()?;

        match GdkKeymapQuery::default_for(api) {
            Ok(keymap) => Some(keymap),
            Err(e) => {
                log::debug!("{}", e);
                None
            }
        }
    }
}

/// Configuration baked in at build time
pub fn default_config() -> RemapConfig {
    if cfg!(feature = "direct-classification") {
        RemapConfig::for_strategy(Strategy::Direct)
    } else {
        RemapConfig::default()
    }
}

static STATE: LazyLock<InterceptionState> = LazyLock::new(|| {
    let config = default_config();
    log::debug!(
        "using {} layout classification, hotkeys {}",
        config.strategy,
        config.hotkeys
    );
    InterceptionState::new(&config)
});

// GDK hands back the same user data the application registered; the
// captured copy is forwarded instead.
unsafe extern "C" fn event_hook(event: *mut GdkEvent, _data: GPointer) {
    unsafe { STATE.dispatch(event) };
}

/// Replacement for GDK's `gdk_event_handler_set`.
///
/// When the original cannot be found there is no way to deliver events at
/// all, so the process is aborted rather than left without keyboard input.
///
/// # Safety
/// Same contract as `gdk_event_handler_set`.
#[no_mangle]
pub unsafe extern "C" fn gdk_event_handler_set(
    func: GdkEventFunc,
    data: GPointer,
    notify: GDestroyNotify,
) {
    logging::init();
    log::debug!(
        "enter in gdk_event_handler_set({:?}, {:p}, {:?})",
        func.map(|f| f as *const c_void),
        data,
        notify.map(|f| f as *const c_void)
    );

    if let Err(e) = STATE.install(func, data, notify, event_hook, gdk::resolve_original_setter) {
        log::error!("{}; cannot install the keyboard hook", e);
        std::process::abort();
    }
    log::debug!("leave in gdk_event_handler_set");
}
