//! Error taxonomy for the daemon and CLI.
//!
//! Mirrors the kinds described in spec §7: invalid input, missing
//! environment, filesystem, parse, backend init/transient, weather, and
//! kernel-feature-missing. Parse and weather failures are deliberately
//! non-fatal everywhere except at their own narrow call sites — callers
//! that need to distinguish "absent" from "fatal" match on the variant;
//! everything else is propagated as `anyhow::Error` with `.context(...)`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AbraxasError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("$HOME is not set")]
    MissingHome,

    #[error("no location configured")]
    NoLocation,

    #[error("filesystem error at {path}: {source}")]
    Filesystem {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("no usable CRTC available on any backend")]
    NoCrtc,

    #[error("backend init failed: {0}")]
    BackendInit(String),

    #[error("daemon is not running")]
    DaemonNotRunning,
}

pub type Result<T> = std::result::Result<T, AbraxasError>;
