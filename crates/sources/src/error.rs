use projection::ProjectionError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("descriptor is not valid: {0}")]
    Json(#[from] serde_json::Error),

    #[error("descriptor is missing {0}")]
    MissingField(&'static str),

    #[error("descriptor field {field} is invalid: {message}")]
    InvalidField {
        field: &'static str,
        message: String,
    },

    #[error(transparent)]
    Projection(#[from] ProjectionError),
}
