//! Error taxonomy shared by the loader, the query layer and the HTTP front end.
//!
//! Every failure carries a human message plus a stable kind tag and the HTTP
//! status it maps to at the service boundary.

use thiserror::Error;

pub type Result<T, E = AnnoSearchError> = std::result::Result<T, E>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnnoSearchError {
    /// Bad caller input. Never retried.
    #[error("{0}")]
    Validation(String),

    /// Engine or upstream document host unreachable, or a 5xx from either.
    #[error("{0}")]
    Network(String),

    #[error("{0}")]
    NotFound(String),

    /// A document did not have the expected IIIF/W3C shape.
    #[error("{0}")]
    Parse(String),

    /// Any other failure reported by the engine.
    #[error("{0}")]
    Application(String),
}

impl AnnoSearchError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse(message.into())
    }

    pub fn application(message: impl Into<String>) -> Self {
        Self::Application(message.into())
    }

    /// Stable lowercase tag used in structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Network(_) => "network",
            Self::NotFound(_) => "not_found",
            Self::Parse(_) => "parse",
            Self::Application(_) => "application",
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::Network(_) => 503,
            Self::NotFound(_) => 404,
            Self::Parse(_) => 422,
            Self::Application(_) => 500,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Validation(m)
            | Self::Network(m)
            | Self::NotFound(m)
            | Self::Parse(m)
            | Self::Application(m) => m,
        }
    }

    /// Emit the single-line structured record every error gets before it
    /// leaves a command or request handler.
    pub fn log(&self) {
        tracing::error!(kind = self.kind(), message = %self.message(), "annosearch_error");
    }
}

impl From<reqwest::Error> for AnnoSearchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return Self::Parse(format!("Invalid JSON response: {err}"));
        }
        if let Some(status) = err.status() {
            return match status.as_u16() {
                404 => Self::NotFound(format!("Resource not found: {err}")),
                s if s >= 500 => Self::Network(format!("Upstream error: {err}")),
                _ => Self::Application(err.to_string()),
            };
        }
        Self::Network(format!("Network error: {err}"))
    }
}

impl From<serde_json::Error> for AnnoSearchError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(format!("Error parsing data: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_taxonomy() {
        assert_eq!(AnnoSearchError::validation("x").status_code(), 400);
        assert_eq!(AnnoSearchError::network("x").status_code(), 503);
        assert_eq!(AnnoSearchError::not_found("x").status_code(), 404);
        assert_eq!(AnnoSearchError::parse("x").status_code(), 422);
        assert_eq!(AnnoSearchError::application("x").status_code(), 500);
    }

    #[test]
    fn display_is_bare_message() {
        let err = AnnoSearchError::validation("Missing query parameter");
        assert_eq!(err.to_string(), "Missing query parameter");
        assert_eq!(err.message(), "Missing query parameter");
        assert_eq!(err.kind(), "validation");
    }

    #[test]
    fn json_errors_become_parse_errors() {
        let err: AnnoSearchError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert_eq!(err.kind(), "parse");
    }
}
