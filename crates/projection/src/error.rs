use thiserror::Error;

use crate::tin::TinError;

#[derive(Debug, Error)]
pub enum ProjectionError {
    /// A named coordinate system the datum provider has no definition for.
    #[error("unsupported projection: {0}")]
    UnsupportedProjection(String),

    #[error("invalid definition for {code}: {message}")]
    InvalidDefinition { code: String, message: String },

    #[error("datum transform {from} -> {to} failed: {message}")]
    Datum {
        from: String,
        to: String,
        message: String,
    },

    #[error("world file parameters are not invertible (determinant {determinant})")]
    DegenerateWorldFile { determinant: f64 },

    #[error("projection {0} is not registered")]
    UnknownProjection(String),

    #[error("no transform registered from {from} to {to}")]
    NoTransform { from: String, to: String },

    #[error("transform produced a non-finite coordinate")]
    NonFinite,

    #[error(transparent)]
    Tin(#[from] TinError),
}
