pub mod generator;
pub mod geometry;
pub mod partition;
pub mod topology;

pub use geometry::{Geometry, Mesh};
pub use partition::PartitionMap;
pub use topology::{Connectivity, Element, ElementKind};
