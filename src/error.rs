use thiserror::Error;

#[derive(Debug, Error)]
pub enum StudioError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Raised before any network call is made.
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Request failed: {0}")]
    RequestError(String),

    /// Any non-200 answer from the API, with the raw body it sent back.
    #[error("Error: {status} - {body}")]
    ApiError { status: u16, body: String },

    #[error("Response error: {0}")]
    ResponseError(String),

    #[error("Image error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("Generation {job_id} still in progress after {attempts} attempts, giving up")]
    PollTimeout { job_id: String, attempts: u32 },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl StudioError {
    pub fn validation(msg: impl Into<String>) -> Self {
        StudioError::ValidationError(msg.into())
    }

    /// Status code of the failed API call, if this error came from one.
    pub fn status(&self) -> Option<u16> {
        match self {
            StudioError::ApiError { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, StudioError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_message_carries_status_and_body() {
        let err = StudioError::ApiError {
            status: 403,
            body: r#"{"errors":["content moderation"]}"#.to_string(),
        };
        assert_eq!(
            err.to_string(),
            r#"Error: 403 - {"errors":["content moderation"]}"#
        );
        assert_eq!(err.status(), Some(403));
    }

    #[test]
    fn non_api_errors_have_no_status() {
        assert_eq!(StudioError::validation("empty prompt").status(), None);
    }
}
