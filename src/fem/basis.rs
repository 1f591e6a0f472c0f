//! Shape-function evaluation at arbitrary reference points.
//!
//! This is the basis-evaluation service consumed by the inverse map, the
//! walker, and the field interpolator: values and reference-space
//! derivatives per element kind, plus the reference-domain queries
//! (centroid, face inside-distances, containment).
//!
//! Reference domains:
//! - triangles: unit triangle, `r, s >= 0`, `r + s <= 1`
//! - quadrilaterals: `[-1, 1]^2`
//! - tetrahedra: unit tetrahedron, `r, s, t >= 0`, `r + s + t <= 1`
//! - hexahedra: `[-1, 1]^3`

use crate::mesh::ElementKind;

/// Shape-function values and reference-space gradients at one point.
/// Gradient rows use the first `kind.dim()` entries.
#[derive(Debug, Clone)]
pub struct BasisEval {
    pub values: Vec<f64>,
    pub gradients: Vec<[f64; 3]>,
}

/// Evaluate all shape functions and their reference-space derivatives of
/// `kind` at reference point `xi` (length `kind.dim()`).
pub fn eval(kind: ElementKind, xi: &[f64]) -> BasisEval {
    debug_assert_eq!(xi.len(), kind.dim());
    match kind {
        ElementKind::Tri3 => tri3(xi),
        ElementKind::Tri6 => tri6(xi),
        ElementKind::Quad4 => quad4(xi),
        ElementKind::Tet4 => tet4(xi),
        ElementKind::Tet10 => tet10(xi),
        ElementKind::Hex8 => hex8(xi),
    }
}

/// Reference-space centroid, the default Newton starting point.
pub fn reference_centroid(kind: ElementKind) -> [f64; 3] {
    match kind {
        ElementKind::Tri3 | ElementKind::Tri6 => [1.0 / 3.0, 1.0 / 3.0, 0.0],
        ElementKind::Quad4 | ElementKind::Hex8 => [0.0, 0.0, 0.0],
        ElementKind::Tet4 | ElementKind::Tet10 => [0.25, 0.25, 0.25],
    }
}

/// Signed inside-distance of `xi` to each reference face, in the same
/// face order as `ElementKind::face_corner_nodes`. Negative means outside
/// that face; the most negative entry identifies the crossed face.
pub fn face_inside_distances(kind: ElementKind, xi: &[f64], out: &mut Vec<f64>) {
    out.clear();
    match kind {
        ElementKind::Tri3 | ElementKind::Tri6 => {
            let (r, s) = (xi[0], xi[1]);
            out.extend_from_slice(&[s, 1.0 - r - s, r]);
        }
        ElementKind::Quad4 => {
            let (r, s) = (xi[0], xi[1]);
            out.extend_from_slice(&[1.0 + s, 1.0 - r, 1.0 - s, 1.0 + r]);
        }
        ElementKind::Tet4 | ElementKind::Tet10 => {
            let (r, s, t) = (xi[0], xi[1], xi[2]);
            out.extend_from_slice(&[t, s, r, 1.0 - r - s - t]);
        }
        ElementKind::Hex8 => {
            let (r, s, t) = (xi[0], xi[1], xi[2]);
            out.extend_from_slice(&[1.0 + t, 1.0 - t, 1.0 + s, 1.0 - s, 1.0 - r, 1.0 + r]);
        }
    }
}

/// Containment test with geometric slack `tol`.
pub fn is_inside_reference(kind: ElementKind, xi: &[f64], tol: f64) -> bool {
    let mut g = Vec::with_capacity(6);
    face_inside_distances(kind, xi, &mut g);
    g.iter().all(|&d| d >= -tol)
}

fn tri3(xi: &[f64]) -> BasisEval {
    let (r, s) = (xi[0], xi[1]);
    BasisEval {
        values: vec![1.0 - r - s, r, s],
        gradients: vec![[-1.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
    }
}

/// Quadratic triangle in area coordinates L0 = 1-r-s, L1 = r, L2 = s.
/// Vertex i: L_i (2 L_i - 1); edge nodes 4 L_a L_b on edges 0-1, 1-2, 2-0.
fn tri6(xi: &[f64]) -> BasisEval {
    let (r, s) = (xi[0], xi[1]);
    let l0 = 1.0 - r - s;
    let values = vec![
        l0 * (2.0 * l0 - 1.0),
        r * (2.0 * r - 1.0),
        s * (2.0 * s - 1.0),
        4.0 * l0 * r,
        4.0 * r * s,
        4.0 * s * l0,
    ];
    // dL0/dr = dL0/ds = -1
    let gradients = vec![
        [1.0 - 4.0 * l0, 1.0 - 4.0 * l0, 0.0],
        [4.0 * r - 1.0, 0.0, 0.0],
        [0.0, 4.0 * s - 1.0, 0.0],
        [4.0 * (l0 - r), -4.0 * r, 0.0],
        [4.0 * s, 4.0 * r, 0.0],
        [-4.0 * s, 4.0 * (l0 - s), 0.0],
    ];
    BasisEval { values, gradients }
}

fn quad4(xi: &[f64]) -> BasisEval {
    let (r, s) = (xi[0], xi[1]);
    // Node signs: 0:(-,-) 1:(+,-) 2:(+,+) 3:(-,+)
    const SIGNS: [(f64, f64); 4] = [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)];
    let mut values = Vec::with_capacity(4);
    let mut gradients = Vec::with_capacity(4);
    for (ri, si) in SIGNS {
        values.push(0.25 * (1.0 + ri * r) * (1.0 + si * s));
        gradients.push([0.25 * ri * (1.0 + si * s), 0.25 * si * (1.0 + ri * r), 0.0]);
    }
    BasisEval { values, gradients }
}

fn tet4(xi: &[f64]) -> BasisEval {
    let (r, s, t) = (xi[0], xi[1], xi[2]);
    BasisEval {
        values: vec![1.0 - r - s - t, r, s, t],
        gradients: vec![
            [-1.0, -1.0, -1.0],
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 1.0],
        ],
    }
}

/// Quadratic tetrahedron in volume coordinates L = (1-r-s-t, r, s, t).
/// Same numbering as the linear tet plus edge midpoints
/// 4: 0-1, 5: 1-2, 6: 2-0, 7: 0-3, 8: 1-3, 9: 2-3.
fn tet10(xi: &[f64]) -> BasisEval {
    let (r, s, t) = (xi[0], xi[1], xi[2]);
    let l = [1.0 - r - s - t, r, s, t];
    // dL_i/d(r,s,t)
    const DL: [[f64; 3]; 4] = [
        [-1.0, -1.0, -1.0],
        [1.0, 0.0, 0.0],
        [0.0, 1.0, 0.0],
        [0.0, 0.0, 1.0],
    ];
    const EDGES: [(usize, usize); 6] = [(0, 1), (1, 2), (2, 0), (0, 3), (1, 3), (2, 3)];

    let mut values = Vec::with_capacity(10);
    let mut gradients = Vec::with_capacity(10);
    for i in 0..4 {
        values.push(l[i] * (2.0 * l[i] - 1.0));
        let c = 4.0 * l[i] - 1.0;
        gradients.push([c * DL[i][0], c * DL[i][1], c * DL[i][2]]);
    }
    for (a, b) in EDGES {
        values.push(4.0 * l[a] * l[b]);
        gradients.push([
            4.0 * (DL[a][0] * l[b] + l[a] * DL[b][0]),
            4.0 * (DL[a][1] * l[b] + l[a] * DL[b][1]),
            4.0 * (DL[a][2] * l[b] + l[a] * DL[b][2]),
        ]);
    }
    BasisEval { values, gradients }
}

fn hex8(xi: &[f64]) -> BasisEval {
    let (r, s, t) = (xi[0], xi[1], xi[2]);
    const SIGNS: [(f64, f64, f64); 8] = [
        (-1.0, -1.0, -1.0),
        (1.0, -1.0, -1.0),
        (1.0, 1.0, -1.0),
        (-1.0, 1.0, -1.0),
        (-1.0, -1.0, 1.0),
        (1.0, -1.0, 1.0),
        (1.0, 1.0, 1.0),
        (-1.0, 1.0, 1.0),
    ];
    let mut values = Vec::with_capacity(8);
    let mut gradients = Vec::with_capacity(8);
    for (ri, si, ti) in SIGNS {
        let (fr, fs, ft) = (1.0 + ri * r, 1.0 + si * s, 1.0 + ti * t);
        values.push(0.125 * fr * fs * ft);
        gradients.push([
            0.125 * ri * fs * ft,
            0.125 * si * fr * ft,
            0.125 * ti * fr * fs,
        ]);
    }
    BasisEval { values, gradients }
}
