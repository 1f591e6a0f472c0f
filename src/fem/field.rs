//! Solution field access and interpolation.
//!
//! A `NodalField` carries the previous and current nodal values of one
//! vector field; samples are blended by the pass fraction `s` in `[0, 1]`
//! so that a marker mid-way through a macro step sees a consistent state.
//! `Solution` bundles the fields the tracking core consumes: velocity, and
//! optionally a displacement field for moving-mesh (FSI) configurations
//! where the physical node position is topology coordinates plus blended
//! displacement.

use crate::error::MarkerError;
use crate::fem::basis;
use crate::mesh::Mesh;
use nalgebra::{Point, SVector};

/// Previous/current nodal values of a `D`-vector field.
#[derive(Debug, Clone)]
pub struct NodalField<const D: usize> {
    pub old: Vec<SVector<f64, D>>,
    pub new: Vec<SVector<f64, D>>,
}

impl<const D: usize> NodalField<D> {
    /// A steady field: previous and current values coincide.
    pub fn steady(values: Vec<SVector<f64, D>>) -> Self {
        Self {
            old: values.clone(),
            new: values,
        }
    }

    /// The same constant vector at every node.
    pub fn constant(num_nodes: usize, v: SVector<f64, D>) -> Self {
        Self::steady(vec![v; num_nodes])
    }

    pub fn zero(num_nodes: usize) -> Self {
        Self::constant(num_nodes, SVector::zeros())
    }

    pub fn len(&self) -> usize {
        self.new.len()
    }

    pub fn is_empty(&self) -> bool {
        self.new.is_empty()
    }

    /// Value at node `i` blended by the pass fraction `s`.
    pub fn blend(&self, i: usize, s: f64) -> SVector<f64, D> {
        self.old[i] * (1.0 - s) + self.new[i] * s
    }
}

/// The solution state the tracking core reads: nodal velocity, and an
/// optional nodal displacement for moving meshes.
#[derive(Debug, Clone)]
pub struct Solution<const D: usize> {
    pub velocity: NodalField<D>,
    pub displacement: Option<NodalField<D>>,
}

impl<const D: usize> Solution<D> {
    pub fn new(mesh: &Mesh<D>, velocity: NodalField<D>) -> Result<Self, MarkerError> {
        if velocity.len() != mesh.num_nodes() {
            return Err(MarkerError::FieldSizeMismatch {
                name: "velocity",
                expected: mesh.num_nodes(),
                found: velocity.len(),
            });
        }
        Ok(Self {
            velocity,
            displacement: None,
        })
    }

    pub fn with_displacement(
        mut self,
        mesh: &Mesh<D>,
        displacement: NodalField<D>,
    ) -> Result<Self, MarkerError> {
        if displacement.len() != mesh.num_nodes() {
            return Err(MarkerError::FieldSizeMismatch {
                name: "displacement",
                expected: mesh.num_nodes(),
                found: displacement.len(),
            });
        }
        self.displacement = Some(displacement);
        Ok(self)
    }

    /// Physical position of node `i` at pass fraction `s`.
    pub fn node_position(&self, mesh: &Mesh<D>, i: usize, s: f64) -> Point<f64, D> {
        let base = mesh.geometry.nodes[i];
        match &self.displacement {
            Some(disp) => base + disp.blend(i, s),
            None => base,
        }
    }

    /// Physical positions of all nodes of one element at pass fraction `s`.
    pub fn element_node_positions(
        &self,
        mesh: &Mesh<D>,
        elem: usize,
        s: f64,
    ) -> Vec<Point<f64, D>> {
        mesh.connectivity.elements[elem]
            .nodes
            .iter()
            .map(|&i| self.node_position(mesh, i, s))
            .collect()
    }
}

/// Interpolate a nodal field at local coordinates `xi` inside `elem`:
/// the shape-function-weighted sum of blended nodal values. Side-effect
/// free.
pub fn interpolate<const D: usize>(
    mesh: &Mesh<D>,
    field: &NodalField<D>,
    elem: usize,
    xi: &[f64],
    s: f64,
) -> SVector<f64, D> {
    let element = &mesh.connectivity.elements[elem];
    let b = basis::eval(element.kind, xi);
    let mut out = SVector::<f64, D>::zeros();
    for (i, &node) in element.nodes.iter().enumerate() {
        out += field.blend(node, s) * b.values[i];
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::generator;
    use approx::assert_relative_eq;
    use nalgebra::Vector2;

    #[test]
    fn blend_interpolates_in_time() {
        let field = NodalField::<2> {
            old: vec![Vector2::new(0.0, 0.0)],
            new: vec![Vector2::new(2.0, 4.0)],
        };
        let mid = field.blend(0, 0.5);
        assert_relative_eq!(mid.x, 1.0);
        assert_relative_eq!(mid.y, 2.0);
    }

    #[test]
    fn constant_field_interpolates_exactly() {
        let mesh = generator::quad_grid(2, 2, 1.0, 1.0);
        let v = Vector2::new(0.3, -0.7);
        let field = NodalField::constant(mesh.num_nodes(), v);
        // Anywhere inside any element, a constant field reproduces itself
        // because shape functions form a partition of unity.
        let val = interpolate(&mesh, &field, 0, &[0.2, -0.4], 0.5);
        assert_relative_eq!((val - v).norm(), 0.0, epsilon = 1e-14);
    }

    #[test]
    fn field_size_is_validated() {
        let mesh = generator::quad_grid(2, 2, 1.0, 1.0);
        let bad = NodalField::<2>::zero(3);
        assert!(Solution::new(&mesh, bad).is_err());
    }

    #[test]
    fn displacement_moves_node_positions() {
        let mesh = generator::quad_grid(1, 1, 1.0, 1.0);
        let vel = NodalField::zero(mesh.num_nodes());
        let disp = NodalField::<2> {
            old: vec![Vector2::zeros(); mesh.num_nodes()],
            new: vec![Vector2::new(0.1, 0.0); mesh.num_nodes()],
        };
        let sol = Solution::new(&mesh, vel)
            .unwrap()
            .with_displacement(&mesh, disp)
            .unwrap();
        let p0 = sol.node_position(&mesh, 0, 0.0);
        let p1 = sol.node_position(&mesh, 0, 1.0);
        assert_relative_eq!(p1.x - p0.x, 0.1, epsilon = 1e-14);
    }
}
