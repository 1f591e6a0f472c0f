//! Structured mesh generators used by tests and the demo driver.

use crate::mesh::geometry::{Geometry, Mesh};
use crate::mesh::topology::{Connectivity, Element, ElementKind};
use nalgebra::Point;

/// Structured `nx` x `ny` grid of Quad4 elements over `[0, lx] x [0, ly]`.
pub fn quad_grid(nx: usize, ny: usize, lx: f64, ly: f64) -> Mesh<2> {
    assert!(nx > 0 && ny > 0);
    let mut geometry = Geometry::new();
    for j in 0..=ny {
        for i in 0..=nx {
            geometry.add_node(Point::from([
                lx * i as f64 / nx as f64,
                ly * j as f64 / ny as f64,
            ]));
        }
    }
    let node = |i: usize, j: usize| i + j * (nx + 1);

    let mut connectivity = Connectivity::new();
    for j in 0..ny {
        for i in 0..nx {
            connectivity.add_element(Element::new(
                ElementKind::Quad4,
                vec![node(i, j), node(i + 1, j), node(i + 1, j + 1), node(i, j + 1)],
            ));
        }
    }
    Mesh::new(geometry, connectivity)
}

/// Structured grid of Hex8 elements over `[0, lx] x [0, ly] x [0, lz]`.
pub fn hex_grid(nx: usize, ny: usize, nz: usize, lx: f64, ly: f64, lz: f64) -> Mesh<3> {
    assert!(nx > 0 && ny > 0 && nz > 0);
    let mut geometry = Geometry::new();
    for k in 0..=nz {
        for j in 0..=ny {
            for i in 0..=nx {
                geometry.add_node(Point::from([
                    lx * i as f64 / nx as f64,
                    ly * j as f64 / ny as f64,
                    lz * k as f64 / nz as f64,
                ]));
            }
        }
    }
    let node = |i: usize, j: usize, k: usize| i + j * (nx + 1) + k * (nx + 1) * (ny + 1);

    let mut connectivity = Connectivity::new();
    for k in 0..nz {
        for j in 0..ny {
            for i in 0..nx {
                connectivity.add_element(Element::new(
                    ElementKind::Hex8,
                    vec![
                        node(i, j, k),
                        node(i + 1, j, k),
                        node(i + 1, j + 1, k),
                        node(i, j + 1, k),
                        node(i, j, k + 1),
                        node(i + 1, j, k + 1),
                        node(i + 1, j + 1, k + 1),
                        node(i, j + 1, k + 1),
                    ],
                ));
            }
        }
    }
    Mesh::new(geometry, connectivity)
}

/// Structured Tet4 mesh: each cell of a hex grid split into six
/// tetrahedra around the main diagonal. Using the same diagonal in every
/// cell keeps faces conforming across cells.
pub fn tet_grid(nx: usize, ny: usize, nz: usize, lx: f64, ly: f64, lz: f64) -> Mesh<3> {
    assert!(nx > 0 && ny > 0 && nz > 0);
    let mut geometry = Geometry::new();
    for k in 0..=nz {
        for j in 0..=ny {
            for i in 0..=nx {
                geometry.add_node(Point::from([
                    lx * i as f64 / nx as f64,
                    ly * j as f64 / ny as f64,
                    lz * k as f64 / nz as f64,
                ]));
            }
        }
    }
    let node = |i: usize, j: usize, k: usize| i + j * (nx + 1) + k * (nx + 1) * (ny + 1);

    let mut connectivity = Connectivity::new();
    for k in 0..nz {
        for j in 0..ny {
            for i in 0..nx {
                let c = [
                    node(i, j, k),
                    node(i + 1, j, k),
                    node(i + 1, j + 1, k),
                    node(i, j + 1, k),
                    node(i, j, k + 1),
                    node(i + 1, j, k + 1),
                    node(i + 1, j + 1, k + 1),
                    node(i, j + 1, k + 1),
                ];
                // Six tets sharing the c0-c6 diagonal.
                for tet in [
                    [c[0], c[1], c[2], c[6]],
                    [c[0], c[2], c[3], c[6]],
                    [c[0], c[3], c[7], c[6]],
                    [c[0], c[7], c[4], c[6]],
                    [c[0], c[4], c[5], c[6]],
                    [c[0], c[5], c[1], c[6]],
                ] {
                    connectivity.add_element(Element::new(ElementKind::Tet4, tet.to_vec()));
                }
            }
        }
    }
    Mesh::new(geometry, connectivity)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quad_grid_counts() {
        let mesh = quad_grid(3, 2, 3.0, 2.0);
        assert_eq!(mesh.num_nodes(), 4 * 3);
        assert_eq!(mesh.num_elements(), 6);
        mesh.validate().unwrap();
        // Interior element (1, 0) has neighbors on three sides.
        let n: usize = (0..4)
            .filter(|&f| mesh.connectivity.neighbor(1, f).is_some())
            .count();
        assert_eq!(n, 3);
    }

    #[test]
    fn hex_grid_counts() {
        let mesh = hex_grid(2, 2, 2, 1.0, 1.0, 1.0);
        assert_eq!(mesh.num_nodes(), 27);
        assert_eq!(mesh.num_elements(), 8);
        mesh.validate().unwrap();
    }

    #[test]
    fn tet_grid_is_conforming() {
        let mesh = tet_grid(2, 1, 1, 2.0, 1.0, 1.0);
        assert_eq!(mesh.num_elements(), 12);
        mesh.validate().unwrap();
        // Every tet face is either on the boundary or shared with exactly
        // one neighbor; count boundary faces of the 2x1x1 block.
        let mut boundary = 0;
        for e in 0..mesh.num_elements() {
            for f in 0..4 {
                if mesh.connectivity.neighbor(e, f).is_none() {
                    boundary += 1;
                }
            }
        }
        // Each cube face on the block surface carries 2 triangles; the
        // block has 10 surface cube faces.
        assert_eq!(boundary, 20);
    }
}
