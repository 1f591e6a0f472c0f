//! Fatal error types for marker construction and configuration.
//!
//! Expected runtime conditions (a Newton solve that does not converge, a
//! marker that leaves the domain, a walk that must escalate) are ordinary
//! returned outcomes in their modules, never errors. `MarkerError` covers
//! precondition violations only: these indicate a misconfigured driver and
//! are not recoverable.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MarkerError {
    /// A nodal field does not match the mesh it is paired with.
    #[error("field `{name}` has {found} nodal values but the mesh has {expected} nodes")]
    FieldSizeMismatch {
        name: &'static str,
        expected: usize,
        found: usize,
    },

    /// A mesh without elements cannot host markers.
    #[error("mesh has no elements")]
    EmptyMesh,

    /// An element references a node id outside the geometry.
    #[error("element {element} references node {node} but the mesh has {num_nodes} nodes")]
    InvalidConnectivity {
        element: usize,
        node: usize,
        num_nodes: usize,
    },

    /// The partition map must cover every element.
    #[error("partition map covers {found} elements but the mesh has {expected}")]
    PartitionSizeMismatch { expected: usize, found: usize },

    /// Runge-Kutta tableaux are provided for orders 1 through 4.
    #[error("unsupported Runge-Kutta order {0} (supported: 1..=4)")]
    UnsupportedOrder(usize),

    /// The number of sub-intervals of a macro step must be positive.
    #[error("advection requires at least one sub-interval, got {0}")]
    ZeroSubsteps(usize),

    #[error("failed to read config file `{path}`: {source}")]
    ConfigIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file `{path}`: {message}")]
    ConfigParse { path: String, message: String },
}
