//! Topology-guided element walking.
//!
//! Given reference coordinates that fell outside the current element, the
//! walker picks the neighbor across the face the point crossed: the face
//! with the most negative inside-distance in reference space. This is a
//! local descent that relies on spatial coherence between consecutive
//! positions, so the expected cost is a handful of hops; the point
//! locator escalates to brute force when the walk cannot decide.

use crate::fem::basis;
use crate::mesh::Mesh;
use nalgebra::{Point, SVector};

/// One step of a walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkStep {
    /// Continue the search in this neighbor.
    Neighbor(usize),
    /// The crossed face is a domain boundary.
    LeftDomain,
    /// No outward face leads anywhere new; escalate to brute force.
    Ambiguous,
}

/// Dimension-agnostic face descent shared by the 2-D and 3-D entry
/// points. `visited` holds elements already rejected in this walk; they
/// are skipped to prevent cycles.
pub(crate) fn next_element<const D: usize>(
    mesh: &Mesh<D>,
    elem: usize,
    xi: &[f64],
    visited: &[usize],
) -> WalkStep {
    let kind = mesh.element_kind(elem);
    let mut g = Vec::with_capacity(6);
    basis::face_inside_distances(kind, xi, &mut g);

    let mut outward: Vec<usize> = (0..g.len()).filter(|&f| g[f] < 0.0).collect();
    if outward.is_empty() {
        // The local coordinates claim containment, yet the caller decided
        // the point is not here (e.g. a non-converged solve).
        return WalkStep::Ambiguous;
    }
    // Most negative first: the face the point is furthest outside of.
    outward.sort_by(|&a, &b| g[a].total_cmp(&g[b]));

    let mut saw_boundary = false;
    for face in outward {
        match mesh.connectivity.neighbor(elem, face) {
            Some(n) if !visited.contains(&n) => return WalkStep::Neighbor(n),
            Some(_) => {} // rejected earlier in this walk
            None => saw_boundary = true,
        }
    }
    if saw_boundary {
        WalkStep::LeftDomain
    } else {
        WalkStep::Ambiguous
    }
}

/// Edge-based walking for planar meshes. `previous` is the element the
/// marker came from; it is not re-entered unless it is the only choice
/// left, which reports `Ambiguous` instead.
pub fn next_element_2d(
    mesh: &Mesh<2>,
    elem: usize,
    xi: &SVector<f64, 2>,
    previous: Option<usize>,
) -> WalkStep {
    let visited: Vec<usize> = previous.into_iter().collect();
    next_element(mesh, elem, xi.as_slice(), &visited)
}

/// Straight-line skip toward a target point: hop to the adjacent element
/// whose node centroid is closest to `x` while that strictly shrinks the
/// distance. A cheap geometric descent that shortens long coherent walks;
/// the caller resumes exact per-element testing from the returned element.
/// Uses topology coordinates only, so on a moving mesh the result is a
/// seed, not a verdict.
pub fn fast_forward<const D: usize>(
    mesh: &Mesh<D>,
    start: usize,
    x: &Point<f64, D>,
    max_hops: usize,
) -> usize {
    let centroid = |e: usize| {
        let nodes = &mesh.connectivity.elements[e].nodes;
        let mut c = SVector::<f64, D>::zeros();
        for &n in nodes {
            c += mesh.geometry.nodes[n].coords;
        }
        c / nodes.len() as f64
    };
    let mut current = start;
    let mut best = (centroid(current) - x.coords).norm_squared();
    for _ in 0..max_hops {
        let mut next = None;
        for face in 0..mesh.element_kind(current).num_faces() {
            if let Some(n) = mesh.connectivity.neighbor(current, face) {
                let d = (centroid(n) - x.coords).norm_squared();
                if d < best {
                    best = d;
                    next = Some(n);
                }
            }
        }
        match next {
            Some(n) => current = n,
            None => break,
        }
    }
    current
}

/// Face-based walking for volumetric meshes, with a search history to
/// avoid revisiting rejected elements within one walk.
pub fn next_element_3d(
    mesh: &Mesh<3>,
    elem: usize,
    xi: &SVector<f64, 3>,
    history: &[usize],
) -> WalkStep {
    next_element(mesh, elem, xi.as_slice(), history)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrackingConfig;
    use crate::fem::{NodalField, Solution};
    use crate::mesh::generator;
    use crate::tracking::inverse_map::inverse_map;
    use nalgebra::{Point2, Vector3};

    /// Local coordinates of a physical point relative to one element,
    /// converged or not.
    fn local_in(mesh: &Mesh<2>, elem: usize, x: Point2<f64>) -> SVector<f64, 2> {
        let cfg = TrackingConfig::default();
        let sol = Solution::new(mesh, NodalField::zero(mesh.num_nodes())).unwrap();
        let nodes = sol.element_node_positions(mesh, elem, 0.0);
        let kind = mesh.element_kind(elem);
        *inverse_map(kind, &nodes, &x, None, &cfg).local()
    }

    #[test]
    fn steps_into_the_right_neighbor() {
        // 1x2 strip of unit quads; a point in element 1 queried from 0.
        let mesh = generator::quad_grid(2, 1, 2.0, 1.0);
        let xi = local_in(&mesh, 0, Point2::new(1.5, 0.5));
        assert_eq!(next_element_2d(&mesh, 0, &xi, None), WalkStep::Neighbor(1));
    }

    #[test]
    fn neighbor_choice_is_symmetric() {
        let mesh = generator::quad_grid(2, 1, 2.0, 1.0);
        let xi = local_in(&mesh, 0, Point2::new(1.5, 0.5));
        let WalkStep::Neighbor(n) = next_element_2d(&mesh, 0, &xi, None) else {
            panic!("expected a neighbor");
        };
        // The reported neighbor must list the origin element in its own
        // adjacency (shared face).
        let back: Vec<usize> = (0..4).filter_map(|f| mesh.connectivity.neighbor(n, f)).collect();
        assert!(back.contains(&0));
    }

    #[test]
    fn boundary_edge_reports_domain_exit() {
        let mesh = generator::quad_grid(2, 1, 2.0, 1.0);
        let xi = local_in(&mesh, 0, Point2::new(-0.5, 0.5));
        assert_eq!(next_element_2d(&mesh, 0, &xi, None), WalkStep::LeftDomain);
    }

    #[test]
    fn fast_forward_closes_in_on_the_target() {
        let mesh = generator::quad_grid(8, 8, 8.0, 8.0);
        let target = Point2::new(7.5, 7.5);
        // From the opposite corner the descent must reach the cell whose
        // centroid is the target itself.
        let skip = fast_forward(&mesh, 0, &target, 64);
        assert_eq!(skip, 7 * 8 + 7);
    }

    #[test]
    fn history_prevents_cycles() {
        let mesh = generator::tet_grid(1, 1, 1, 1.0, 1.0, 1.0);
        // Pick reference coordinates outside one interior face and mark
        // all neighbors as visited: the walk must not loop.
        let elem = 0;
        let xi = Vector3::new(0.5, 0.5, -0.4);
        let history: Vec<usize> = (0..mesh.num_elements()).collect();
        let step = next_element_3d(&mesh, elem, &xi, &history);
        assert!(matches!(step, WalkStep::LeftDomain | WalkStep::Ambiguous));
    }

    #[test]
    fn interior_coordinates_are_ambiguous() {
        let mesh = generator::quad_grid(2, 1, 2.0, 1.0);
        let xi = SVector::<f64, 2>::new(0.0, 0.0);
        assert_eq!(next_element_2d(&mesh, 0, &xi, None), WalkStep::Ambiguous);
    }
}
