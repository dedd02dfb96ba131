use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Errors raised while resolving the i18n context of a request.
///
/// Only `MissingLanguageProperty` can occur per request; the adapter and
/// generator variants surface wiring mistakes and are normally caught when
/// the detector is built.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DetectorError {
    #[error("{document_type} ({id}) does not have a valid language property!")]
    MissingLanguageProperty { document_type: String, id: u64 },

    #[error("No language adapter registered under alias '{0}'")]
    UnknownLanguageAdapter(String),

    #[error("No country adapter registered under alias '{0}'")]
    UnknownCountryAdapter(String),

    #[error("No path generator registered under alias '{0}'")]
    UnknownPathGenerator(String),
}

impl DetectorError {
    pub fn missing_language(document_type: impl Into<String>, id: u64) -> Self {
        Self::MissingLanguageProperty {
            document_type: document_type.into(),
            id,
        }
    }
}

impl IntoResponse for DetectorError {
    fn into_response(self) -> Response {
        (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()).into_response()
    }
}

pub type DetectorResult<T> = Result<T, DetectorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_language_message_names_document() {
        let err = DetectorError::missing_language("Page", 42);
        assert_eq!(
            err.to_string(),
            "Page (42) does not have a valid language property!"
        );
    }

    #[test]
    fn test_into_response_is_server_error() {
        let response = DetectorError::missing_language("Page", 7).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
