//! Error handling for the NanoEdge AI monitor
//!
//! Every failure the monitor loop can run into maps to one variant here.
//! The loop itself never stops on these; it turns them into the
//! connection-lost screen and keeps polling.

use core::fmt;

/// Result type alias for monitor operations
pub type NeaiResult<T> = Result<T, NeaiError>;

/// Error type for all monitor operations
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum NeaiError {
    /// A serial line could not be parsed as a number or sample buffer
    ValueParse {
        /// Offending input, truncated for display
        input: String,
        /// What was expected
        reason: &'static str,
    },

    /// The external engine could not be run or exited with failure
    EngineFailure {
        /// Engine subcommand that failed
        command: &'static str,
        /// Description of the failure
        reason: String,
    },

    /// The engine ran but its answer did not have the expected shape
    MalformedResponse {
        /// Engine subcommand that produced the response
        command: &'static str,
        /// Description of the problem
        reason: String,
    },

    /// Serial link could not be opened or read
    LinkError {
        /// Port that failed
        port: String,
        /// Underlying error description
        reason: String,
    },

    /// Configuration rejected during validation or loading
    InvalidConfig {
        /// Description of the configuration error
        reason: String,
    },

    /// Learning target announced by the device is not usable
    InvalidLearningTarget {
        /// Value that was received
        target: f32,
    },
}

impl NeaiError {
    /// Failures that show the connection-lost screen and reset learning
    pub fn is_connection_failure(&self) -> bool {
        matches!(
            self,
            NeaiError::ValueParse { .. }
                | NeaiError::EngineFailure { .. }
                | NeaiError::MalformedResponse { .. }
                | NeaiError::LinkError { .. }
        )
    }

    /// Build a parse error, keeping at most 32 characters of the input
    pub fn value_parse(input: &str, reason: &'static str) -> Self {
        let input = if input.chars().count() > 32 {
            let head: String = input.chars().take(32).collect();
            format!("{}...", head)
        } else {
            input.to_string()
        };
        NeaiError::ValueParse { input, reason }
    }
}

impl fmt::Display for NeaiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NeaiError::ValueParse { input, reason } => {
                write!(f, "Cannot parse {:?}: {}", input, reason)
            }
            NeaiError::EngineFailure { command, reason } => {
                write!(f, "Engine command {} failed: {}", command, reason)
            }
            NeaiError::MalformedResponse { command, reason } => {
                write!(f, "Malformed response from {}: {}", command, reason)
            }
            NeaiError::LinkError { port, reason } => {
                write!(f, "Serial link error on {}: {}", port, reason)
            }
            NeaiError::InvalidConfig { reason } => {
                write!(f, "Invalid configuration: {}", reason)
            }
            NeaiError::InvalidLearningTarget { target } => {
                write!(f, "Invalid learning target: {}", target)
            }
        }
    }
}

impl std::error::Error for NeaiError {}

/// Convenience macro for creating configuration errors
#[macro_export]
macro_rules! config_error {
    ($($arg:tt)*) => {
        $crate::error::NeaiError::InvalidConfig {
            reason: format!($($arg)*)
        }
    };
}
