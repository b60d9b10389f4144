//! Error types for controller bridge operations.

use thiserror::Error;

/// Primary error type for the bridge.
#[derive(Error, Debug)]
pub enum BridgeError {
    // Argument errors
    #[error("{0}")]
    InvalidArguments(String),

    // Configuration errors
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    #[error("Failed to read config at {path}: {reason}")]
    ConfigRead { path: String, reason: String },

    #[error("Failed to decode JSON config: {0}")]
    ConfigParse(String),

    #[error("Invalid configuration: {}", errors.join("; "))]
    ConfigInvalid { errors: Vec<String> },

    // Action errors
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Process '{program}' exited with status {}", status.map_or_else(|| "unknown".to_string(), |s| s.to_string()))]
    ProcessFailed { program: String, status: Option<i32> },

    #[error("Action failed: {0}")]
    ActionFailed(String),

    // Input errors
    #[error("No controller input backend available")]
    NoInputBackend,

    #[error("Input source error: {0}")]
    Input(String),

    // General errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl BridgeError {
    /// Returns true if the error is recoverable by the user.
    pub const fn is_user_recoverable(&self) -> bool {
        matches!(
            self,
            Self::InvalidArguments(_)
                | Self::ConfigNotFound { .. }
                | Self::ConfigParse(_)
                | Self::ConfigInvalid { .. }
                | Self::PermissionDenied(_)
                | Self::NoInputBackend
        )
    }

    /// Returns true for failures raised while executing an action.
    ///
    /// These are logged and swallowed by the sequencer, never fatal.
    pub const fn is_action_error(&self) -> bool {
        matches!(
            self,
            Self::PermissionDenied(_) | Self::ProcessFailed { .. } | Self::ActionFailed(_)
        )
    }

    /// Returns a suggestion for how to fix the error.
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::InvalidArguments(_) => Some("Run: controller-bridge --help"),
            Self::ConfigNotFound { .. } => Some("Pass --config <path> or create config/mappings.json"),
            Self::PermissionDenied(_) => {
                Some("Grant Accessibility access, or run with --prompt-accessibility")
            }
            Self::NoInputBackend => {
                Some("Rebuild with --features gamepad, or feed events with --replay <file>")
            }
            _ => None,
        }
    }
}

/// Convenience type alias for Results using BridgeError.
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Extension trait for adding context to errors.
pub trait ResultExt<T> {
    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T, E: std::error::Error> ResultExt<T> for std::result::Result<T, E> {
    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|e| BridgeError::Other(format!("{}: {e}", f().into())))
    }
}
