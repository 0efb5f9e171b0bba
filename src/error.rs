// Latinkeys Shim Errors

/// Errors raised while wiring the shim into the host process
#[derive(Debug, thiserror::Error)]
pub enum ShimError {
    /// A required symbol is missing from the process
    #[error("symbol '{name}' not found: {reason}")]
    SymbolNotFound { name: String, reason: String },

    /// GDK has no default keymap (no display opened yet)
    #[error("GDK default keymap unavailable")]
    NoDefaultKeymap,
}

/// Result type for shim operations
pub type ShimResult<T> = Result<T, ShimError>;
