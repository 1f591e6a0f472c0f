//! Point location: which element, and which rank, contains a point.
//!
//! The protocol follows the coherent fast path first: test the hint
//! element, then walk the neighbor topology, then retry once from a
//! straight-line skip toward the target, and only then fall back to a
//! serial sweep over all elements. The sweep is the correctness safety
//! net; it must stay off the hot path.

use crate::config::TrackingConfig;
use crate::fem::Solution;
use crate::mesh::Mesh;
use crate::tracking::inverse_map::{inverse_map, InverseMapOutcome};
use crate::tracking::walker::{fast_forward, next_element, WalkStep};
use log::{debug, trace};
use nalgebra::{Point, SVector};

/// A successfully located point.
#[derive(Debug, Clone)]
pub struct Located<const D: usize> {
    pub element: usize,
    pub owner: usize,
    pub local: SVector<f64, D>,
}

/// Definitive result of a location attempt. `NotInDomain` is only
/// reported after the serial fallback has been exhausted.
#[derive(Debug, Clone)]
pub enum LocateOutcome<const D: usize> {
    Located(Located<D>),
    NotInDomain,
}

/// Locate `x` in the mesh. `hint` and `warm` seed the coherent fast path
/// from the point's last known element and local coordinates; `previous`
/// is the element it came from, excluded from the walk so the search
/// cannot bounce straight back; `s` is the pass fraction used to position
/// nodes on a moving mesh.
pub fn locate<const D: usize>(
    x: &Point<f64, D>,
    hint: Option<usize>,
    previous: Option<usize>,
    warm: Option<SVector<f64, D>>,
    mesh: &Mesh<D>,
    sol: &Solution<D>,
    s: f64,
    cfg: &TrackingConfig,
) -> LocateOutcome<D> {
    if let Some(start) = hint {
        // Step 1: the point may not have left the hinted element at all.
        let out = try_element(x, start, warm, mesh, sol, s, cfg);
        if out.is_inside() {
            return located(start, *out.local(), mesh);
        }

        // Step 2: walk the neighbor topology from the hint.
        let mut visited = vec![start];
        if let Some(p) = previous {
            if p != start {
                visited.push(p);
            }
        }
        if let Some((elem, xi)) = walk(x, start, *out.local(), &mut visited, mesh, sol, s, cfg) {
            return located(elem, xi, mesh);
        }

        // Step 3: straight-line skip toward the target, then walk again.
        let skip = fast_forward(mesh, start, x, cfg.max_hops);
        if !visited.contains(&skip) {
            trace!("fast forward from element {start} to {skip}");
            let out = try_element(x, skip, None, mesh, sol, s, cfg);
            if out.is_inside() {
                return located(skip, *out.local(), mesh);
            }
            visited.push(skip);
            if let Some((elem, xi)) = walk(x, skip, *out.local(), &mut visited, mesh, sol, s, cfg)
            {
                return located(elem, xi, mesh);
            }
        }
    }

    // Step 4: serial brute force, the slow path of last resort.
    serial_fallback(x, mesh, sol, s, cfg)
}

/// Newton-guided neighbor walk with a hop cap. Returns the containing
/// element and its local coordinates, or `None` when the walk hits a
/// boundary, becomes ambiguous, or exhausts its budget.
#[allow(clippy::too_many_arguments)]
fn walk<const D: usize>(
    x: &Point<f64, D>,
    start: usize,
    start_xi: SVector<f64, D>,
    visited: &mut Vec<usize>,
    mesh: &Mesh<D>,
    sol: &Solution<D>,
    s: f64,
    cfg: &TrackingConfig,
) -> Option<(usize, SVector<f64, D>)> {
    let mut current = start;
    let mut xi = start_xi;
    for hop in 0..cfg.max_hops {
        match next_element(mesh, current, xi.as_slice(), visited) {
            WalkStep::Neighbor(next) => {
                let out = try_element(x, next, None, mesh, sol, s, cfg);
                if out.is_inside() {
                    trace!("walk found element {next} after {} hops", hop + 1);
                    return Some((next, *out.local()));
                }
                xi = *out.local();
                visited.push(next);
                current = next;
            }
            WalkStep::LeftDomain => {
                trace!("walk hit the boundary after {hop} hops; escalating");
                return None;
            }
            WalkStep::Ambiguous => {
                trace!("walk became ambiguous after {hop} hops; escalating");
                return None;
            }
        }
    }
    None
}

/// Exhaustive sweep over all elements. Guarantees either a containing
/// element or a definitive verdict that the point is outside the domain.
/// Bounding boxes of element nodes underestimate curved quadratic
/// elements, so the box filters only apply where they are exact: the
/// whole-domain reject requires a mesh with no quadratic kinds and no
/// displacement field, and the per-element filter skips quadratic kinds.
pub fn serial_fallback<const D: usize>(
    x: &Point<f64, D>,
    mesh: &Mesh<D>,
    sol: &Solution<D>,
    s: f64,
    cfg: &TrackingConfig,
) -> LocateOutcome<D> {
    debug!("serial fallback search over {} elements", mesh.num_elements());
    let curved = mesh
        .connectivity
        .elements
        .iter()
        .any(|e| e.kind.is_quadratic());
    if !curved && sol.displacement.is_none() {
        let (lo, hi) = mesh.domain_aabb();
        if !box_contains(x, &lo, &hi, cfg.geometric_tol) {
            return LocateOutcome::NotInDomain;
        }
    }
    for elem in 0..mesh.num_elements() {
        if !mesh.element_kind(elem).is_quadratic()
            && !element_box_contains(x, mesh, sol, elem, s, cfg.geometric_tol)
        {
            continue;
        }
        let out = try_element(x, elem, None, mesh, sol, s, cfg);
        if out.is_inside() {
            return located(elem, *out.local(), mesh);
        }
    }
    LocateOutcome::NotInDomain
}

fn located<const D: usize>(
    element: usize,
    local: SVector<f64, D>,
    mesh: &Mesh<D>,
) -> LocateOutcome<D> {
    LocateOutcome::Located(Located {
        element,
        owner: mesh.partition.owner(element),
        local,
    })
}

fn try_element<const D: usize>(
    x: &Point<f64, D>,
    elem: usize,
    warm: Option<SVector<f64, D>>,
    mesh: &Mesh<D>,
    sol: &Solution<D>,
    s: f64,
    cfg: &TrackingConfig,
) -> InverseMapOutcome<D> {
    let nodes = sol.element_node_positions(mesh, elem, s);
    inverse_map(mesh.element_kind(elem), &nodes, x, warm, cfg)
}

/// Bounding-box pre-filter: the static element box when the mesh does not
/// move, otherwise the box of the displaced nodes at pass fraction `s`.
fn element_box_contains<const D: usize>(
    x: &Point<f64, D>,
    mesh: &Mesh<D>,
    sol: &Solution<D>,
    elem: usize,
    s: f64,
    tol: f64,
) -> bool {
    let (lo, hi) = match &sol.displacement {
        None => mesh.element_aabb(elem),
        Some(_) => {
            let nodes = sol.element_node_positions(mesh, elem, s);
            let mut lo = nodes[0];
            let mut hi = nodes[0];
            for p in &nodes[1..] {
                for d in 0..D {
                    lo[d] = lo[d].min(p[d]);
                    hi[d] = hi[d].max(p[d]);
                }
            }
            (lo, hi)
        }
    };
    box_contains(x, &lo, &hi, tol)
}

/// Box test with a relative pad so points on faces are not rejected.
fn box_contains<const D: usize>(
    x: &Point<f64, D>,
    lo: &Point<f64, D>,
    hi: &Point<f64, D>,
    tol: f64,
) -> bool {
    (0..D).all(|d| {
        let pad = tol + 1e-12 * (hi[d] - lo[d]).abs().max(1.0);
        x[d] >= lo[d] - pad && x[d] <= hi[d] + pad
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fem::NodalField;
    use crate::mesh::generator;
    use approx::assert_relative_eq;
    use nalgebra::{Point2, Point3};

    fn setup2d() -> (Mesh<2>, Solution<2>, TrackingConfig) {
        let mesh = generator::quad_grid(4, 4, 4.0, 4.0);
        let sol = Solution::new(&mesh, NodalField::zero(mesh.num_nodes())).unwrap();
        (mesh, sol, TrackingConfig::default())
    }

    #[test]
    fn cold_search_finds_the_right_cell() {
        let (mesh, sol, cfg) = setup2d();
        let x = Point2::new(2.5, 1.5);
        match locate(&x, None, None, None, &mesh, &sol, 0.0, &cfg) {
            LocateOutcome::Located(l) => {
                // Unit cells; (2.5, 1.5) lies in column 2, row 1.
                assert_eq!(l.element, 1 * 4 + 2);
                assert_eq!(l.owner, 0);
            }
            LocateOutcome::NotInDomain => panic!("point is inside the mesh"),
        }
    }

    #[test]
    fn hinted_walk_crosses_the_mesh() {
        let (mesh, sol, cfg) = setup2d();
        let x = Point2::new(3.5, 3.5);
        // Hint at the opposite corner: the walk has to traverse the grid.
        match locate(&x, Some(0), None, None, &mesh, &sol, 0.0, &cfg) {
            LocateOutcome::Located(l) => assert_eq!(l.element, 3 * 4 + 3),
            LocateOutcome::NotInDomain => panic!("point is inside the mesh"),
        }
    }

    #[test]
    fn relocation_is_idempotent() {
        let (mesh, sol, cfg) = setup2d();
        let x = Point2::new(0.25, 0.75);
        let first = match locate(&x, None, None, None, &mesh, &sol, 0.0, &cfg) {
            LocateOutcome::Located(l) => l,
            LocateOutcome::NotInDomain => panic!(),
        };
        let again = match locate(
            &x,
            Some(first.element),
            None,
            Some(first.local),
            &mesh,
            &sol,
            0.0,
            &cfg,
        ) {
            LocateOutcome::Located(l) => l,
            LocateOutcome::NotInDomain => panic!(),
        };
        assert_eq!(first.element, again.element);
        assert_relative_eq!((first.local - again.local).norm(), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn far_point_is_not_in_domain() {
        let (mesh, sol, cfg) = setup2d();
        // 10x the mesh extent.
        let x = Point2::new(40.0, -40.0);
        assert!(matches!(
            locate(&x, Some(0), None, None, &mesh, &sol, 0.0, &cfg),
            LocateOutcome::NotInDomain
        ));
    }

    #[test]
    fn locates_in_tet_mesh() {
        let mesh = generator::tet_grid(2, 2, 2, 1.0, 1.0, 1.0);
        let sol = Solution::new(&mesh, NodalField::zero(mesh.num_nodes())).unwrap();
        let cfg = TrackingConfig::default();
        let x = Point3::new(0.3, 0.6, 0.7);
        match locate(&x, None, None, None, &mesh, &sol, 0.0, &cfg) {
            LocateOutcome::Located(l) => {
                // Verify containment by mapping back.
                let nodes = sol.element_node_positions(&mesh, l.element, 0.0);
                let fwd = crate::tracking::inverse_map::forward_map(
                    mesh.element_kind(l.element),
                    &nodes,
                    l.local.as_slice(),
                );
                assert_relative_eq!((fwd - x).norm(), 0.0, epsilon = 1e-9);
            }
            LocateOutcome::NotInDomain => panic!("point is inside the mesh"),
        }
    }

    #[test]
    fn hinted_walk_in_tet_mesh() {
        let mesh = generator::tet_grid(2, 2, 2, 1.0, 1.0, 1.0);
        let sol = Solution::new(&mesh, NodalField::zero(mesh.num_nodes())).unwrap();
        let cfg = TrackingConfig::default();
        let x = Point3::new(0.9, 0.9, 0.9);
        let hinted = locate(&x, Some(0), None, None, &mesh, &sol, 0.0, &cfg);
        let cold = locate(&x, None, None, None, &mesh, &sol, 0.0, &cfg);
        match (hinted, cold) {
            (LocateOutcome::Located(a), LocateOutcome::Located(b)) => {
                assert_eq!(a.element, b.element)
            }
            _ => panic!("point is inside the mesh"),
        }
    }
}
