use std::path::PathBuf;
use thiserror::Error;

/// Core library errors
#[derive(Error, Debug)]
pub enum ForgeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The file set or project name was rejected before anything touched disk.
    #[error("File validation failed: {}", .0.join(", "))]
    Validation(Vec<String>),

    /// Workspace creation, deletion or artifact IO failed.
    #[error("Workspace error at '{path}': {source}")]
    Resource {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No {language} source files found")]
    NotFound { language: String },

    /// An external tool exited non-zero, timed out, or could not be started.
    #[error("{tool} failed: {output}")]
    Build { tool: String, output: String },

    #[error("Invalid build request: {0}")]
    InvalidRequest(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ForgeError {
    /// Stable short code for mapping errors onto responses.
    pub fn kind(&self) -> &'static str {
        match self {
            ForgeError::Config(_) => "config",
            ForgeError::Validation(_) => "validation",
            ForgeError::Resource { .. } | ForgeError::Io(_) => "resource",
            ForgeError::NotFound { .. } => "not_found",
            ForgeError::Build { .. } => "build",
            ForgeError::InvalidRequest(_) => "invalid_request",
        }
    }

    pub(crate) fn resource(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ForgeError::Resource {
            path: path.into(),
            source,
        }
    }
}

/// Configuration-specific errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")]
    ParseError {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, ForgeError>;
