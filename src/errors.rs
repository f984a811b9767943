use std::fmt;

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, NoCrmError>;

/// Errors surfaced by the NoCRM client.
#[derive(Debug, Clone, PartialEq)]
pub enum NoCrmError {
    /// Missing credentials or malformed base URL at construction time.
    Configuration(String),
    /// The remote API rejected the access token (HTTP 401).
    Authentication(String),
    /// Any other non-2xx response, or a connection that could not complete.
    Api {
        /// HTTP status, absent when the request never got a response.
        status: Option<u16>,
        /// Server-supplied message, or a generic one.
        message: String,
    },
    /// A business rule was violated, or the lead to update does not exist.
    Validation(String),
    /// A response body did not have the expected shape.
    Decode(String),
}

impl NoCrmError {
    /// Builds an `Api` error carrying an HTTP status.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        NoCrmError::Api {
            status: Some(status),
            message: message.into(),
        }
    }

    /// HTTP status code, when the error came from a response.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            NoCrmError::Api { status, .. } => *status,
            NoCrmError::Authentication(_) => Some(401),
            _ => None,
        }
    }

    /// True for the `Api` error produced by a 404 response.
    pub fn is_not_found(&self) -> bool {
        matches!(self, NoCrmError::Api { status: Some(404), .. })
    }
}

impl fmt::Display for NoCrmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoCrmError::Configuration(msg) => write!(f, "Configuration error: {}", msg),
            NoCrmError::Authentication(msg) => write!(f, "Authentication error: {}", msg),
            NoCrmError::Api {
                status: Some(status),
                message,
            } => write!(f, "API error ({}): {}", status, message),
            NoCrmError::Api {
                status: None,
                message,
            } => write!(f, "API error: {}", message),
            NoCrmError::Validation(msg) => write!(f, "Validation error: {}", msg),
            NoCrmError::Decode(msg) => write!(f, "Decode error: {}", msg),
        }
    }
}

impl std::error::Error for NoCrmError {}

impl From<reqwest::Error> for NoCrmError {
    /// Transport failures never carry a status; they are reported as connection errors.
    fn from(err: reqwest::Error) -> Self {
        NoCrmError::Api {
            status: None,
            message: format!("Connection error: {}", err),
        }
    }
}

impl From<serde_json::Error> for NoCrmError {
    fn from(err: serde_json::Error) -> Self {
        NoCrmError::Decode(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_code_and_not_found() {
        let err = NoCrmError::api(404, "Lead not found");
        assert_eq!(err.status_code(), Some(404));
        assert!(err.is_not_found());

        let err = NoCrmError::api(500, "boom");
        assert!(!err.is_not_found());

        let err = NoCrmError::Api {
            status: None,
            message: "Connection error: refused".to_string(),
        };
        assert_eq!(err.status_code(), None);
        assert!(!err.is_not_found());

        assert_eq!(
            NoCrmError::Authentication("Invalid API key".to_string()).status_code(),
            Some(401)
        );
        assert_eq!(NoCrmError::Validation("x".to_string()).status_code(), None);
    }

    #[test]
    fn test_display_messages() {
        assert_eq!(
            NoCrmError::api(422, "Title can't be blank").to_string(),
            "API error (422): Title can't be blank"
        );
        assert_eq!(
            NoCrmError::Validation("Lead amount cannot be negative".to_string()).to_string(),
            "Validation error: Lead amount cannot be negative"
        );
        assert_eq!(
            NoCrmError::Configuration("API key is required".to_string()).to_string(),
            "Configuration error: API key is required"
        );
    }

    #[test]
    fn test_from_serde_json_error() {
        let err: NoCrmError = serde_json::from_str::<serde_json::Value>("{not json")
            .unwrap_err()
            .into();
        assert!(matches!(err, NoCrmError::Decode(_)));
    }
}
