//! Crate-wide error taxonomy and exit-code mapping.

use std::path::PathBuf;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, LauncherError>;

/// The error taxonomy from the design: kind, not name. Each variant maps to
/// exactly one exit code via [`LauncherError::exit_code`].
#[derive(Debug, thiserror::Error)]
pub enum LauncherError {
    /// Malformed CLI tokens.
    #[error("syntax error: {0}")]
    Syntax(String),

    /// Semantically invalid inputs: bad paths, unparseable durations, conflicting options.
    #[error("configuration error: {0}")]
    Config(String),

    /// The instance lock is held by another process.
    #[error("instance busy: {path} is locked by another process")]
    InstanceBusy { path: PathBuf },

    /// An on-disk operation on the instance failed.
    #[error("instance I/O error at {path}: {source}")]
    InstanceIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Install/update/uninstall of a single bundle failed. Logged by the
    /// runtime and never propagated out of plan execution.
    #[error("bundle operation failed for {location}: {message}")]
    BundleOpFailure { location: String, message: String },

    /// Container init/start/stop failed.
    #[error("container fault: {0}")]
    Container(String),

    /// The cipher or digest required by the command channel is unavailable.
    #[error("crypto unavailable: {0}")]
    CryptoUnavailable(String),

    /// UDP send/recv or bind failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// Operation was cancelled before it started running.
    #[error("cancelled")]
    Cancelled,
}

impl LauncherError {
    /// Maps an error to the process exit code defined in the external
    /// interfaces section: 0 success, 1 runtime fault, 2 argument syntax,
    /// 3 configuration inconsistency, 4 execution failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            LauncherError::Syntax(_) => 2,
            LauncherError::Config(_) => 3,
            LauncherError::CryptoUnavailable(_) => 3,
            LauncherError::InstanceBusy { .. } => 4,
            LauncherError::InstanceIo { .. } => 4,
            LauncherError::Container(_) => 4,
            LauncherError::Transport(_) => 4,
            LauncherError::BundleOpFailure { .. } => 1,
            LauncherError::Cancelled => 0,
        }
    }
}
