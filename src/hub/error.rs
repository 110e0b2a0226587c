//! Hub error types

/// Error type for hub operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HubError {
    /// The control loop has stopped and no longer accepts requests
    Closed,
}

impl std::fmt::Display for HubError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HubError::Closed => write!(f, "Hub control loop is closed"),
        }
    }
}

impl std::error::Error for HubError {}
