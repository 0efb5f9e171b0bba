// Latinkeys Logging
// Installs env_logger once per process, the first time the shim is entered

use std::sync::Once;

/// Default filter when `RUST_LOG` is not set
pub const DEFAULT_FILTER: &str = "warn";

/// Install the logger. Later calls are no-ops, and a logger installed by
/// the host process is left in place.
pub fn init() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        #[cfg(feature = "logging")]
        {
            let env = env_logger::Env::default().default_filter_or(DEFAULT_FILTER);
            let _ = env_logger::Builder::from_env(env)
                .format_timestamp(None)
                .try_init();
        }
    });
}
