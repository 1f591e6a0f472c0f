//! Inverse isoparametric mapping: physical point to reference coordinates.
//!
//! Newton-Raphson on the residual `F(xi) - x`, where `F` is the element's
//! geometric map assembled from the basis-evaluation service. The warm
//! start (previous local coordinates) is used when available; otherwise
//! iteration starts from the reference centroid. Non-convergence and
//! singular Jacobians are ordinary outcomes carrying the last iterate,
//! which the element walker still needs to pick the crossed face.

use crate::config::TrackingConfig;
use crate::fem::basis;
use crate::mesh::ElementKind;
use nalgebra::{Matrix2, Point, Point3, SMatrix, SVector, Vector2, Vector3};

/// Result of one inverse-map attempt.
#[derive(Debug, Clone)]
pub enum InverseMapOutcome<const D: usize> {
    /// Newton converged. `inside` reports containment in the reference
    /// domain within the geometric tolerance.
    Converged { local: SVector<f64, D>, inside: bool },
    /// Iteration cap reached or singular Jacobian; `last` is the final
    /// iterate.
    NoConvergence { last: SVector<f64, D> },
}

/// Solve the `D x D` Newton system by Gaussian elimination with partial
/// pivoting. nalgebra's `lu()` is not available for a bare `const D`
/// dimension, and the systems here are at most 3x3. Returns `None` when
/// a pivot vanishes (degenerate element geometry).
fn solve_newton<const D: usize>(
    a: &SMatrix<f64, D, D>,
    rhs: &SVector<f64, D>,
) -> Option<SVector<f64, D>> {
    let mut m = *a;
    let mut x = *rhs;
    for col in 0..D {
        let mut pivot = col;
        for row in col + 1..D {
            if m[(row, col)].abs() > m[(pivot, col)].abs() {
                pivot = row;
            }
        }
        if m[(pivot, col)] == 0.0 {
            return None;
        }
        if pivot != col {
            m.swap_rows(pivot, col);
            x.swap_rows(pivot, col);
        }
        for row in col + 1..D {
            let f = m[(row, col)] / m[(col, col)];
            for c in col + 1..D {
                m[(row, c)] -= f * m[(col, c)];
            }
            x[row] -= f * x[col];
        }
    }
    for col in (0..D).rev() {
        let mut s = x[col];
        for c in col + 1..D {
            s -= m[(col, c)] * x[c];
        }
        x[col] = s / m[(col, col)];
    }
    Some(x)
}

impl<const D: usize> InverseMapOutcome<D> {
    /// The reference coordinates regardless of outcome.
    pub fn local(&self) -> &SVector<f64, D> {
        match self {
            InverseMapOutcome::Converged { local, .. } => local,
            InverseMapOutcome::NoConvergence { last } => last,
        }
    }

    pub fn is_inside(&self) -> bool {
        matches!(self, InverseMapOutcome::Converged { inside: true, .. })
    }
}

/// Forward isoparametric map: reference point to physical point.
pub fn forward_map<const D: usize>(
    kind: ElementKind,
    nodes: &[Point<f64, D>],
    xi: &[f64],
) -> Point<f64, D> {
    let b = basis::eval(kind, xi);
    let mut x = SVector::<f64, D>::zeros();
    for (i, p) in nodes.iter().enumerate() {
        x += p.coords * b.values[i];
    }
    Point::from(x)
}

/// Invert the geometric map of a volumetric element (`kind.dim() == D`).
pub fn inverse_map<const D: usize>(
    kind: ElementKind,
    nodes: &[Point<f64, D>],
    x: &Point<f64, D>,
    warm: Option<SVector<f64, D>>,
    cfg: &TrackingConfig,
) -> InverseMapOutcome<D> {
    debug_assert_eq!(kind.dim(), D);
    debug_assert_eq!(nodes.len(), kind.num_nodes());

    let mut xi = warm.unwrap_or_else(|| {
        let c = basis::reference_centroid(kind);
        SVector::from_fn(|i, _| c[i])
    });

    for _ in 0..cfg.newton_max_iter {
        let b = basis::eval(kind, xi.as_slice());
        let mut f = SVector::<f64, D>::zeros();
        let mut jac = SMatrix::<f64, D, D>::zeros();
        for (i, p) in nodes.iter().enumerate() {
            f += p.coords * b.values[i];
            for a in 0..D {
                for c in 0..D {
                    jac[(a, c)] += b.gradients[i][c] * p[a];
                }
            }
        }
        let residual = f - x.coords;
        let step = match solve_newton(&jac, &residual) {
            Some(step) => step,
            None => return InverseMapOutcome::NoConvergence { last: xi },
        };
        xi -= step;
        if step.norm() <= cfg.newton_tol * (1.0 + xi.norm()) {
            let inside = basis::is_inside_reference(kind, xi.as_slice(), cfg.geometric_tol);
            return InverseMapOutcome::Converged { local: xi, inside };
        }
    }
    InverseMapOutcome::NoConvergence { last: xi }
}

/// Invert the geometric map of a co-dimension-one element: a 2-D element
/// (triangle or quadrilateral) embedded in 3-D space, e.g. an interface.
/// The 3x2 Jacobian is rectangular, so the Newton step solves the normal
/// equations `(J^T J) d = J^T r` through the surface metric. The returned
/// coordinates minimize the distance to the surface; containment is
/// judged in the 2-D reference domain.
pub fn inverse_map_surface3(
    kind: ElementKind,
    nodes: &[Point3<f64>],
    x: &Point3<f64>,
    warm: Option<Vector2<f64>>,
    cfg: &TrackingConfig,
) -> InverseMapOutcome<2> {
    debug_assert_eq!(kind.dim(), 2);
    debug_assert_eq!(nodes.len(), kind.num_nodes());

    let mut xi = warm.unwrap_or_else(|| {
        let c = basis::reference_centroid(kind);
        Vector2::new(c[0], c[1])
    });

    for _ in 0..cfg.newton_max_iter {
        let b = basis::eval(kind, xi.as_slice());
        let mut f = Vector3::zeros();
        let mut jac = SMatrix::<f64, 3, 2>::zeros();
        for (i, p) in nodes.iter().enumerate() {
            f += p.coords * b.values[i];
            for a in 0..3 {
                for c in 0..2 {
                    jac[(a, c)] += b.gradients[i][c] * p[a];
                }
            }
        }
        let residual = f - x.coords;
        let metric: Matrix2<f64> = jac.transpose() * jac;
        let rhs = jac.transpose() * residual;
        let step = match metric.lu().solve(&rhs) {
            Some(step) => step,
            None => return InverseMapOutcome::NoConvergence { last: xi },
        };
        xi -= step;
        if step.norm() <= cfg.newton_tol * (1.0 + xi.norm()) {
            let inside = basis::is_inside_reference(kind, xi.as_slice(), cfg.geometric_tol);
            return InverseMapOutcome::Converged { local: xi, inside };
        }
    }
    InverseMapOutcome::NoConvergence { last: xi }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Point2;

    fn cfg() -> TrackingConfig {
        TrackingConfig::default()
    }

    #[test]
    fn round_trip_distorted_quad() {
        let nodes = [
            Point2::new(0.0, 0.0),
            Point2::new(1.2, 0.1),
            Point2::new(1.0, 1.3),
            Point2::new(-0.2, 0.9),
        ];
        let xi_ref = [0.3, -0.4];
        let x = forward_map(ElementKind::Quad4, &nodes, &xi_ref);
        match inverse_map(ElementKind::Quad4, &nodes, &x, None, &cfg()) {
            InverseMapOutcome::Converged { local, inside } => {
                assert!(inside);
                assert_relative_eq!(local.x, xi_ref[0], epsilon = 1e-9);
                assert_relative_eq!(local.y, xi_ref[1], epsilon = 1e-9);
            }
            InverseMapOutcome::NoConvergence { .. } => panic!("should converge"),
        }
    }

    #[test]
    fn round_trip_tet10_curved() {
        // Curve one edge of the reference Tet10 slightly.
        let mut nodes = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(0.0, 0.0, 1.0),
            Point3::new(0.5, 0.0, 0.0),
            Point3::new(0.5, 0.5, 0.0),
            Point3::new(0.0, 0.5, 0.0),
            Point3::new(0.0, 0.0, 0.5),
            Point3::new(0.5, 0.0, 0.5),
            Point3::new(0.0, 0.5, 0.5),
        ];
        nodes[4].y -= 0.05;
        let xi_ref = [0.2, 0.25, 0.3];
        let x = forward_map(ElementKind::Tet10, &nodes, &xi_ref);
        let out = inverse_map(ElementKind::Tet10, &nodes, &x, None, &cfg());
        assert!(out.is_inside());
        let local = out.local();
        for d in 0..3 {
            assert_relative_eq!(local[d], xi_ref[d], epsilon = 1e-8);
        }
    }

    #[test]
    fn warm_start_converges_to_same_point() {
        let nodes = [
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(0.0, 1.0),
        ];
        let x = Point2::new(0.6, 0.4);
        let cold = inverse_map(ElementKind::Quad4, &nodes, &x, None, &cfg());
        let warm = inverse_map(ElementKind::Quad4, &nodes, &x, Some(*cold.local()), &cfg());
        assert!(warm.is_inside());
        assert_relative_eq!((warm.local() - cold.local()).norm(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn exterior_point_is_flagged_outside() {
        let nodes = [
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(0.0, 1.0),
        ];
        let x = Point2::new(1.5, 0.5);
        match inverse_map(ElementKind::Quad4, &nodes, &x, None, &cfg()) {
            InverseMapOutcome::Converged { inside, local } => {
                assert!(!inside);
                assert!(local.x > 1.0);
            }
            InverseMapOutcome::NoConvergence { .. } => panic!("affine quad must converge"),
        }
    }

    #[test]
    fn rotated_element_needs_pivoting() {
        // A unit quad rotated 90 degrees: the Jacobian has zeros on the
        // diagonal, so elimination must pivot to solve at all.
        let nodes = [
            Point2::new(0.0, 0.0),
            Point2::new(0.0, 1.0),
            Point2::new(-1.0, 1.0),
            Point2::new(-1.0, 0.0),
        ];
        let x = forward_map(ElementKind::Quad4, &nodes, &[0.2, -0.3]);
        let out = inverse_map(ElementKind::Quad4, &nodes, &x, None, &cfg());
        assert!(out.is_inside());
        assert_relative_eq!(out.local().x, 0.2, epsilon = 1e-9);
        assert_relative_eq!(out.local().y, -0.3, epsilon = 1e-9);
    }

    #[test]
    fn degenerate_element_does_not_converge() {
        // All nodes collinear: the geometric map is singular everywhere.
        let nodes = [
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(2.0, 0.0),
            Point2::new(3.0, 0.0),
        ];
        let x = Point2::new(0.5, 0.5);
        assert!(matches!(
            inverse_map(ElementKind::Quad4, &nodes, &x, None, &cfg()),
            InverseMapOutcome::NoConvergence { .. }
        ));
    }

    #[test]
    fn surface_triangle_in_3d() {
        // A tilted planar triangle; invert a point on the surface.
        let nodes = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.5),
            Point3::new(0.0, 1.0, 0.5),
        ];
        let xi_ref = [0.3, 0.3];
        let x = forward_map_surface(&nodes, &xi_ref);
        let out = inverse_map_surface3(ElementKind::Tri3, &nodes, &x, None, &cfg());
        assert!(out.is_inside());
        assert_relative_eq!(out.local().x, 0.3, epsilon = 1e-9);
        assert_relative_eq!(out.local().y, 0.3, epsilon = 1e-9);
    }

    fn forward_map_surface(nodes: &[Point3<f64>], xi: &[f64]) -> Point3<f64> {
        let b = crate::fem::basis::eval(ElementKind::Tri3, xi);
        let mut x = Vector3::zeros();
        for (i, p) in nodes.iter().enumerate() {
            x += p.coords * b.values[i];
        }
        Point3::from(x)
    }
}
