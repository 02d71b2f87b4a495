use reqwest::StatusCode;
use thiserror::Error;

/// Every failure the API client can surface.
///
/// Transport errors, non-2xx statuses and failed logins all end up here, so
/// callers deal with a single error type carrying a readable message.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced a response (DNS, connect, TLS, timeout).
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The server answered outside 2xx. The message is the status text.
    #[error("{message}")]
    Status { status: StatusCode, message: String },

    #[error("authentication failed: {message}")]
    Authentication { message: String },

    #[error("login response did not contain a token")]
    MissingToken,

    #[error("redirect response without a Location header")]
    MissingLocation,

    #[error("too many redirects (gave up after {0} hops)")]
    TooManyRedirects(usize),

    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("invalid JSON from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("could not encode request body: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("expected a JSON response from {url}, got {content_type}")]
    UnexpectedPayload { url: String, content_type: String },

    #[error("no account found for the current user")]
    NoAccount,
}

impl ApiError {
    pub fn from_status(status: StatusCode) -> Self {
        let message = status
            .canonical_reason()
            .map(str::to_string)
            .unwrap_or_else(|| status.as_str().to_string());
        ApiError::Status { status, message }
    }

    /// Like [`from_status`](Self::from_status), but keeps the reason phrase
    /// the server actually sent when there is one.
    pub fn from_reason(status: StatusCode, reason: Option<&str>) -> Self {
        match reason.map(str::trim).filter(|r| !r.is_empty()) {
            Some(reason) => ApiError::Status {
                status,
                message: reason.to_string(),
            },
            None => Self::from_status(status),
        }
    }

    /// HTTP status behind the error, when the server answered at all.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Network(e) => e.status(),
            _ => None,
        }
    }
}

pub type Result<T, E = ApiError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_message_is_status_text() {
        let err = ApiError::from_status(StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "Not Found");
        assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
    }

    #[test]
    fn status_without_reason_falls_back_to_code() {
        let code = StatusCode::from_u16(599).unwrap();
        let err = ApiError::from_status(code);
        assert_eq!(err.to_string(), "599");
    }

    #[test]
    fn server_reason_phrase_wins() {
        let err = ApiError::from_reason(StatusCode::NOT_FOUND, Some("Resource Missing"));
        assert_eq!(err.to_string(), "Resource Missing");
        assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));

        let err = ApiError::from_reason(StatusCode::NOT_FOUND, Some(" "));
        assert_eq!(err.to_string(), "Not Found");
        assert_eq!(
            ApiError::from_reason(StatusCode::FORBIDDEN, None).to_string(),
            "Forbidden"
        );
    }

    #[test]
    fn non_status_errors_have_no_status() {
        assert_eq!(ApiError::MissingToken.status(), None);
        assert_eq!(ApiError::TooManyRedirects(3).status(), None);
    }
}
