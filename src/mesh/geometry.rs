//! Node coordinates and the assembled mesh type.

use crate::error::MarkerError;
use crate::mesh::partition::PartitionMap;
use crate::mesh::topology::{Connectivity, ElementKind};
use nalgebra::Point;

/// Node coordinates of a mesh with spatial dimension `D`.
#[derive(Debug, Clone, Default)]
pub struct Geometry<const D: usize> {
    pub nodes: Vec<Point<f64, D>>,
}

impl<const D: usize> Geometry<D> {
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    pub fn add_node(&mut self, p: Point<f64, D>) -> usize {
        let idx = self.nodes.len();
        self.nodes.push(p);
        idx
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }
}

/// Complete mesh: geometry, connectivity, and the element-to-rank
/// partition map. The mesh is read-only from the tracking core's point of
/// view and must outlive every marker referencing it.
#[derive(Debug, Clone)]
pub struct Mesh<const D: usize> {
    pub geometry: Geometry<D>,
    pub connectivity: Connectivity,
    pub partition: PartitionMap,
}

impl<const D: usize> Mesh<D> {
    /// Assemble a single-rank mesh, building neighbor adjacency.
    pub fn new(geometry: Geometry<D>, mut connectivity: Connectivity) -> Self {
        connectivity.build_neighbors();
        let partition = PartitionMap::all_local(connectivity.num_elements());
        Self {
            geometry,
            connectivity,
            partition,
        }
    }

    /// Replace the partition map, e.g. to decompose the mesh over ranks.
    pub fn with_partition(mut self, partition: PartitionMap) -> Self {
        self.partition = partition;
        self
    }

    pub fn num_nodes(&self) -> usize {
        self.geometry.num_nodes()
    }

    pub fn num_elements(&self) -> usize {
        self.connectivity.num_elements()
    }

    pub fn element_kind(&self, elem: usize) -> ElementKind {
        self.connectivity.elements[elem].kind
    }

    /// Check structural preconditions once, at setup time. Violations are
    /// configuration errors, not runtime outcomes.
    pub fn validate(&self) -> Result<(), MarkerError> {
        if self.num_elements() == 0 {
            return Err(MarkerError::EmptyMesh);
        }
        let num_nodes = self.num_nodes();
        for (eid, elem) in self.connectivity.elements.iter().enumerate() {
            for &n in &elem.nodes {
                if n >= num_nodes {
                    return Err(MarkerError::InvalidConnectivity {
                        element: eid,
                        node: n,
                        num_nodes,
                    });
                }
            }
        }
        if self.partition.len() != self.num_elements() {
            return Err(MarkerError::PartitionSizeMismatch {
                expected: self.num_elements(),
                found: self.partition.len(),
            });
        }
        Ok(())
    }

    /// Axis-aligned bounding box of one element's nodes.
    pub fn element_aabb(&self, elem: usize) -> (Point<f64, D>, Point<f64, D>) {
        let nodes = &self.connectivity.elements[elem].nodes;
        let mut lo = self.geometry.nodes[nodes[0]];
        let mut hi = lo;
        for &n in &nodes[1..] {
            let p = self.geometry.nodes[n];
            for d in 0..D {
                lo[d] = lo[d].min(p[d]);
                hi[d] = hi[d].max(p[d]);
            }
        }
        (lo, hi)
    }

    /// Axis-aligned bounding box of the whole mesh.
    pub fn domain_aabb(&self) -> (Point<f64, D>, Point<f64, D>) {
        let mut lo = self.geometry.nodes[0];
        let mut hi = lo;
        for p in &self.geometry.nodes[1..] {
            for d in 0..D {
                lo[d] = lo[d].min(p[d]);
                hi[d] = hi[d].max(p[d]);
            }
        }
        (lo, hi)
    }
}
