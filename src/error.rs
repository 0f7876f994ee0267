//! Error taxonomy for the compositor.
//!
//! Initialization failures are fatal and exit the process with a single
//! stderr line; everything else degrades silently or logs at `debug!` and is
//! retried on the next damage/paint cycle. This draws the same line between
//! setup-time fatal errors and operation-time recoverable ones that
//! Smithay's `backend::x11::error` module draws for its own X11 backend.

use thiserror::Error;

/// Fatal during startup. The caller prints `Display` for this type to
/// stderr and exits with status 1 (status 2 is reserved for CLI parse
/// errors, handled separately by `clap`).
#[derive(Debug, Error)]
pub enum InitError {
    #[error("failed to open X display: {0}")]
    Connect(#[from] x11rb::errors::ConnectError),

    #[error("X protocol error during setup: {0}")]
    Protocol(#[from] x11rb::errors::ReplyOrIdError),

    #[error("X protocol error during setup: {0}")]
    Reply(#[from] x11rb::errors::ReplyError),

    #[error("X connection error: {0}")]
    Connection(#[from] x11rb::errors::ConnectionError),

    #[error("required X11 extension \"{name}\" is missing or too old (need >= {need_major}.{need_minor})")]
    MissingExtension {
        name: &'static str,
        need_major: u32,
        need_minor: u32,
    },

    #[error("another compositing manager already owns the manager selection for screen {screen}")]
    SelectionOwned { screen: usize },

    #[error("failed to redirect subwindows: another compositor raced us ({0})")]
    RedirectFailed(String),

    #[error("failed to load {lib}: {source}")]
    LoadLibrary {
        lib: &'static str,
        #[source]
        source: libloading::Error,
    },

    #[error("EGL initialization failed: {0}")]
    Egl(String),

    #[error("GLSL shader compile/link failed: {0}")]
    Shader(String),

    #[error("daemonization failed: {0}")]
    Daemonize(#[source] std::io::Error),
}

/// Non-fatal. Raised by the per-frame resource-upgrade paths (texture
/// upload, shadow allocation, pixmap fetch); the caller logs at `debug!`
/// and skips the affected window for the current paint.
#[derive(Debug, Error)]
pub enum PaintError {
    #[error("pixmap has zero size")]
    ZeroSizedPixmap,

    #[error("unsupported window depth {0} (only 24 and 32 are supported)")]
    UnsupportedDepth(u8),

    #[error("X request failed: {0}")]
    Reply(#[from] x11rb::errors::ReplyError),

    #[error("X connection error: {0}")]
    Connection(#[from] x11rb::errors::ConnectionError),

    #[error("zero-copy pixmap binding failed: {0}")]
    NativeImage(String),
}
