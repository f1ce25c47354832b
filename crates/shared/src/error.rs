use thiserror::Error;

/// Failures crossing the boundary to the upstream request service.
///
/// Field-level validation never takes this path: it stays inside the response
/// workflow's field-error map and only keeps submission disabled.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("no request found for tracking number {tracking_number}")]
    NotFound { tracking_number: String },
    #[error("transport failure: {0}")]
    Transport(String),
}

impl GatewayError {
    pub fn not_found(tracking_number: impl Into<String>) -> Self {
        Self::NotFound {
            tracking_number: tracking_number.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
