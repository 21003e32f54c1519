//! Error type definitions for epg-merge
//!
//! Errors are split by the stage that raises them. Everything that can go
//! wrong while handling a single source folds into [`SourceError`], which the
//! merge engine catches at its per-source boundary. [`AppError`] covers the
//! failures that end a run.

use thiserror::Error;

/// Top-level application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration or remap file could not be loaded
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Writing the merged guide failed
    #[error("Serialize error: {0}")]
    Serialize(#[from] SerializeError),

    /// No usable sources after configuration was validated
    #[error("No sources defined in {path}")]
    NoSources { path: String },
}

/// Failures retrieving raw bytes for a source
#[derive(Error, Debug)]
pub enum FetchError {
    /// The request did not complete within the configured timeout
    #[error("Request timed out after {timeout_secs}s: {url}")]
    Timeout { url: String, timeout_secs: u64 },

    /// The server answered with a non-2xx status
    #[error("HTTP error: {status} {reason} - URL: {url}")]
    Status {
        url: String,
        status: u16,
        reason: String,
    },

    /// Connection refused, DNS failure, TLS failure and friends
    #[error("Transport error: {message} - URL: {url}")]
    Transport { url: String, message: String },

    /// The response started but the body could not be read
    #[error("Failed to read response body: {message} - URL: {url}")]
    Body { url: String, message: String },

    /// The HTTP client itself could not be constructed
    #[error("Failed to build HTTP client: {message}")]
    Client { message: String },
}

/// Failures decompressing a payload that carried the gzip magic bytes
#[derive(Error, Debug)]
pub enum DecompressError {
    #[error("Failed to decompress gzip data: {0}")]
    Gzip(#[source] std::io::Error),
}

/// Failures turning source bytes into records
#[derive(Error, Debug)]
pub enum ParseError {
    /// Malformed XML
    #[error("XML parsing error at byte {position}: {message}")]
    Xml { position: u64, message: String },

    /// Invalid JSON syntax
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// Syntactically valid content with the wrong overall shape
    #[error("Unexpected document structure: {message}")]
    Structure { message: String },
}

/// Failures rendering or writing the merged guide
#[derive(Error, Debug)]
pub enum SerializeError {
    #[error("Failed to render XMLTV: {0}")]
    Xml(String),

    #[error("Failed to write {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Everything that can cause a single source to be skipped
#[derive(Error, Debug)]
pub enum SourceError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Decompress(#[from] DecompressError),

    #[error("Unknown content type")]
    UnknownFormat,

    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Configuration loading and validation errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file not present
    #[error("Config file not found: {path}")]
    NotFound { path: String },

    /// Figment failed to extract the configuration
    #[error("Failed to load {path}: {source}")]
    Load {
        path: String,
        #[source]
        source: Box<figment::Error>,
    },

    /// Values were readable but not acceptable
    #[error("Invalid configuration: {field} - {message}")]
    Invalid { field: String, message: String },
}

impl FetchError {
    /// Create a transport error
    pub fn transport<U: Into<String>, M: Into<String>>(url: U, message: M) -> Self {
        Self::Transport {
            url: url.into(),
            message: message.into(),
        }
    }
}

impl ParseError {
    /// Create a structure error with a custom message
    pub fn structure<S: Into<String>>(message: S) -> Self {
        Self::Structure {
            message: message.into(),
        }
    }
}

impl SourceError {
    /// Short label for the pipeline stage that failed, used in log fields
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Fetch(_) => "fetch",
            Self::Decompress(_) => "decompress",
            Self::UnknownFormat => "detect",
            Self::Parse(_) => "parse",
        }
    }
}

impl ConfigError {
    /// Create an invalid configuration error
    pub fn invalid<F: Into<String>, M: Into<String>>(field: F, message: M) -> Self {
        Self::Invalid {
            field: field.into(),
            message: message.into(),
        }
    }

    pub(crate) fn load(path: &str, source: figment::Error) -> Self {
        Self::Load {
            path: path.to_string(),
            source: Box::new(source),
        }
    }
}
