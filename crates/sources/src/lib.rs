//! Map descriptors and the factory that turns them into tile sources with a
//! registered projection.

pub mod descriptor;
pub mod error;
pub mod factory;
pub mod strategy;
pub mod tile_grid;

pub use descriptor::MapDescriptor;
pub use error::*;
pub use factory::*;
pub use strategy::*;
pub use tile_grid::*;
