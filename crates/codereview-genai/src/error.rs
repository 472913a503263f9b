use std::time::Duration;

/// Failure talking to the generation provider.
///
/// `Display` renders the underlying message only; callers surface it as-is.
#[derive(Clone, Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("{0}")]
    Transport(String),
    #[error("generation request timed out after {}s", .0.as_secs())]
    Timeout(Duration),
    #[error("{message}")]
    Provider { status: u16, message: String },
    #[error("{0}")]
    Decode(String),
}

impl GenerationError {
    /// HTTP status reported by the provider, when it answered at all.
    pub fn provider_status(&self) -> Option<u16> {
        match self {
            GenerationError::Provider { status, .. } => Some(*status),
            _ => None,
        }
    }
}
