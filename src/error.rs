use std::path::PathBuf;
use thiserror::Error;

/// Codemap error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Config validation error: {0}")]
    ConfigValidation(String),

    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    #[error("Parser error: {0}")]
    Parser(String),

    #[error("Template {template} references undefined key: {key}")]
    MissingSubstitution { template: String, key: String },

    #[error("Unknown template: {0}")]
    UnknownTemplate(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Glob pattern error: {0}")]
    GlobPattern(#[from] glob::PatternError),

    #[error("Glob error: {0}")]
    Glob(#[from] glob::GlobError),
}

/// Result type alias for codemap operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a config validation error
    pub fn config_validation(msg: impl Into<String>) -> Self {
        Error::ConfigValidation(msg.into())
    }

    /// Create a parser error
    pub fn parser(msg: impl Into<String>) -> Self {
        Error::Parser(msg.into())
    }

    /// Create a missing substitution error
    pub fn missing_substitution(template: impl Into<String>, key: impl Into<String>) -> Self {
        Error::MissingSubstitution {
            template: template.into(),
            key: key.into(),
        }
    }
}
