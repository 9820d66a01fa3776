pub mod cluster;
pub mod cluster_layer;
pub mod feature;
pub mod filter;
pub mod hull;
pub mod interaction;
pub mod layer;
pub mod spatial;
pub mod spider;
pub mod symbology;

pub use cluster::*;
pub use cluster_layer::*;
pub use feature::*;
pub use filter::*;
pub use interaction::*;
pub use layer::*;
pub use symbology::*;
