//! Error types for codestash-core

use thiserror::Error;

/// Result type alias using codestash-core's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Configuration error types for codestash
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Invalid configuration format
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// JSON parsing error
    #[error("Configuration file is not valid JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Missing required field
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    /// Two entries of the same kind share an id
    #[error("Duplicate {kind} id in config: {id}")]
    DuplicateId { kind: &'static str, id: String },

    /// Timezone name is not a known IANA zone
    #[error("Invalid timezone for project '{project}': {timezone}")]
    InvalidTimezone { project: String, timezone: String },

    /// Step name outside the recognized set
    #[error("Unknown backup step: {step}")]
    UnknownStep { step: String },

    /// Project id not present in the configuration
    #[error("Unknown project: {id}")]
    UnknownProject { id: String },

    /// Profile id not present in the configuration
    #[error("Unknown profile: {id}")]
    UnknownProfile { id: String },
}

impl Error {
    /// Create a config not found error
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    /// Create an invalid config error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create a missing field error
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    /// Create a duplicate id error
    pub fn duplicate_id(kind: &'static str, id: impl Into<String>) -> Self {
        Self::DuplicateId {
            kind,
            id: id.into(),
        }
    }

    /// Create an invalid timezone error
    pub fn invalid_timezone(project: impl Into<String>, timezone: impl Into<String>) -> Self {
        Self::InvalidTimezone {
            project: project.into(),
            timezone: timezone.into(),
        }
    }

    /// Create an unknown step error
    pub fn unknown_step(step: impl Into<String>) -> Self {
        Self::UnknownStep { step: step.into() }
    }

    /// Create an unknown project error
    pub fn unknown_project(id: impl Into<String>) -> Self {
        Self::UnknownProject { id: id.into() }
    }

    /// Create an unknown profile error
    pub fn unknown_profile(id: impl Into<String>) -> Self {
        Self::UnknownProfile { id: id.into() }
    }
}
