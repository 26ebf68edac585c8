#[derive(Debug, thiserror::Error)]
pub enum SheetsError {
    #[error(transparent)]
    ReqwestError(#[from] reqwest::Error),

    #[error(transparent)]
    SerdeJsonError(#[from] serde_json::Error),

    #[error(transparent)]
    XmlError(#[from] quick_xml::se::SeError),

    #[error("Invalid URL: {0}")]
    UrlParseError(String),

    /// The remote service answered with a non-success status.
    #[error("Remote operation failed with status {status}: {message}")]
    Remote {
        status: reqwest::StatusCode,
        message: String,
    },

    #[error("Authentication failed ({code}): {message}")]
    AuthError { code: String, message: String },

    #[error("Invalid connection parameters: {0}")]
    InvalidConnectionParameters(String),

    /// A feed entry was missing a field we need (e.g. an edit link).
    #[error("Invalid feed: {0}")]
    InvalidFeed(String),
}

impl SheetsError {
    pub fn remote(status: reqwest::StatusCode, message: impl Into<String>) -> Self {
        Self::Remote {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::remote(reqwest::StatusCode::NOT_FOUND, message)
    }
}

impl From<url::ParseError> for SheetsError {
    fn from(value: url::ParseError) -> Self {
        Self::UrlParseError(value.to_string())
    }
}

pub type Result<T, E = SheetsError> = std::result::Result<T, E>;
