//! Error types for the harvester.
//!
//! A single `HarvesterError` carries detailed context for library consumers.
//! [`HarvesterError::kind`] folds the variants into the four classes callers
//! actually branch on: bad configuration, transport failure, protocol
//! violation, and a missing record.

use thiserror::Error;

/// Broad classification of a [`HarvesterError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid page size, filter, URL or configuration file.
    /// Raised before any network activity.
    Configuration,
    /// Network failure, timeout or non-success HTTP status.
    Transport,
    /// Response could not be parsed or does not match the expected schema.
    Protocol,
    /// The requested identifier is absent from a retrieval response.
    RecordNotFound,
}

/// Main error type for the harvester library.
#[derive(Debug, Error)]
pub enum HarvesterError {
    /// Page size below one.
    #[error("Invalid page size: {0}. Page size must be at least 1")]
    InvalidPageSize(usize),

    /// Filter specification rejected by the parser.
    #[error("Invalid filter '{spec}': {reason}")]
    InvalidFilter { spec: String, reason: String },

    /// Namespace prefix missing from the registry.
    #[error("Unknown namespace prefix: '{0}'")]
    UnknownNamespace(String),

    /// Endpoint URL is not an absolute http(s) URL.
    #[error("Invalid endpoint URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    /// XML parsing failed.
    #[error("XML parsing failed: {0}")]
    XmlParse(#[from] roxmltree::Error),

    /// Serializing a request document failed.
    #[error("XML writing failed: {0}")]
    XmlWrite(String),

    /// Missing required XML element.
    #[error("Missing required XML element: {element} in {context}")]
    MissingElement { element: String, context: String },

    /// Missing required XML attribute.
    #[error("Missing required attribute '{attribute}' on <{element}>")]
    MissingAttribute { attribute: String, element: String },

    /// Attribute present but not usable.
    #[error("Invalid value '{value}' for attribute '{attribute}' on <{element}>")]
    InvalidAttribute {
        attribute: String,
        element: String,
        value: String,
    },

    /// Response document has an unexpected root element.
    #[error("Unexpected response: expected <{expected}>, found <{found}>")]
    UnexpectedResponse { expected: String, found: String },

    /// Server returned an OWS exception report.
    #[error("Server exception{}: {text}", .code.as_ref().map(|c| format!(" [{c}]")).unwrap_or_default())]
    ExceptionReport { code: Option<String>, text: String },

    /// Requested record absent from the response.
    #[error("Record not found: '{0}'")]
    RecordNotFound(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML (de)serialization error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl HarvesterError {
    /// Classify this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidPageSize(_)
            | Self::InvalidFilter { .. }
            | Self::UnknownNamespace(_)
            | Self::InvalidUrl { .. }
            | Self::Io(_)
            | Self::Yaml(_)
            | Self::Json(_) => ErrorKind::Configuration,
            Self::Http(_) | Self::HttpStatus { .. } => ErrorKind::Transport,
            Self::XmlParse(_)
            | Self::XmlWrite(_)
            | Self::MissingElement { .. }
            | Self::MissingAttribute { .. }
            | Self::InvalidAttribute { .. }
            | Self::UnexpectedResponse { .. }
            | Self::ExceptionReport { .. } => ErrorKind::Protocol,
            Self::RecordNotFound(_) => ErrorKind::RecordNotFound,
        }
    }

    pub(crate) fn invalid_filter(spec: &str, reason: impl Into<String>) -> Self {
        Self::InvalidFilter {
            spec: spec.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn missing_element(element: &str, context: &str) -> Self {
        Self::MissingElement {
            element: element.to_string(),
            context: context.to_string(),
        }
    }
}

/// Result type alias for harvester operations.
pub type Result<T> = std::result::Result<T, HarvesterError>;
