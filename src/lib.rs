//! Lagrangian marker localization and advection on partitioned
//! unstructured meshes.
//!
//! The crate tracks point particles ("markers") through a distributed
//! finite-element mesh: it inverts the isoparametric map to find local
//! coordinates, walks the element topology to follow moving points,
//! interpolates nodal fields at marker positions, hands authoritative
//! marker state across partition boundaries, and advances markers with
//! explicit Runge-Kutta schemes that re-localize at every stage.

pub mod config;
pub mod error;
pub mod fem;
pub mod mesh;
pub mod tracking;

pub use config::{DriverConfig, TrackingConfig};
pub use error::MarkerError;
pub use fem::{interpolate, NodalField, Solution};
pub use mesh::{Connectivity, Element, ElementKind, Geometry, Mesh, PartitionMap};
pub use tracking::{
    fast_forward, forward_map, inverse_map, inverse_map_surface3, locate, next_element_2d,
    next_element_3d, ButcherTableau, Communicator, InverseMapOutcome, LocateOutcome, Located,
    Marker, MarkerSet, MarkerStatus, MaterialState, SerialComm, ThreadComm, WalkStep,
};
