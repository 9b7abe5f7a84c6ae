use thiserror::Error;

pub type ModelResult<T> = Result<T, ModelError>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    /// The registered schemas cannot be used safely. Fatal at startup.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// An entity payload does not fit its schema.
    #[error("invalid value for {entity_type}.{field}: {reason}")]
    Validation {
        entity_type: String,
        field: String,
        reason: String,
    },
}
