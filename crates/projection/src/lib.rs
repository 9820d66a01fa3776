//! Projection registry and the three-stage transform chain that links a
//! historical map's pixel space to the shared Web Mercator reference.

pub mod chain;
pub mod continuity;
pub mod datum;
pub mod error;
pub mod polyconic;
pub mod registry;
pub mod tin;
pub mod world_file;

pub use chain::*;
pub use continuity::*;
pub use datum::{DatumProvider, DatumRoute, NamedTransform, Proj4Datums};
pub use error::*;
pub use polyconic::{Ellipsoid, Polyconic};
pub use registry::*;
pub use tin::{CompiledTin, Tin, TinEngine, TinError};
pub use world_file::*;
