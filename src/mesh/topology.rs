//! Element kinds, connectivity, and neighbor-by-face adjacency.

use std::collections::HashMap;

/// Supported element kinds. The variant fixes both the geometric shape and
/// the order of the geometric basis family (linear or quadratic).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    /// 3-node linear triangle.
    Tri3,
    /// 6-node quadratic triangle (vertices 0..3, edge midpoints 3..6
    /// on edges 0-1, 1-2, 2-0).
    Tri6,
    /// 4-node bilinear quadrilateral on [-1, 1]^2.
    Quad4,
    /// 4-node linear tetrahedron.
    Tet4,
    /// 10-node quadratic tetrahedron (vertices 0..4, edge midpoints
    /// 4: 0-1, 5: 1-2, 6: 2-0, 7: 0-3, 8: 1-3, 9: 2-3).
    Tet10,
    /// 8-node trilinear hexahedron on [-1, 1]^3.
    Hex8,
}

impl ElementKind {
    /// Reference-space dimension of the element.
    pub fn dim(self) -> usize {
        match self {
            ElementKind::Tri3 | ElementKind::Tri6 | ElementKind::Quad4 => 2,
            ElementKind::Tet4 | ElementKind::Tet10 | ElementKind::Hex8 => 3,
        }
    }

    /// Number of geometric nodes.
    pub fn num_nodes(self) -> usize {
        match self {
            ElementKind::Tri3 => 3,
            ElementKind::Tri6 => 6,
            ElementKind::Quad4 => 4,
            ElementKind::Tet4 => 4,
            ElementKind::Tet10 => 10,
            ElementKind::Hex8 => 8,
        }
    }

    /// Whether the geometric basis is quadratic. Curved edges of these
    /// kinds can bulge past the bounding box of the element's nodes, so
    /// nodal boxes must not be used to reject points against them.
    pub fn is_quadratic(self) -> bool {
        matches!(self, ElementKind::Tri6 | ElementKind::Tet10)
    }

    /// Number of faces (edges in 2-D) of the reference element.
    pub fn num_faces(self) -> usize {
        match self {
            ElementKind::Tri3 | ElementKind::Tri6 => 3,
            ElementKind::Quad4 => 4,
            ElementKind::Tet4 | ElementKind::Tet10 => 4,
            ElementKind::Hex8 => 6,
        }
    }

    /// Corner (vertex) node local indices of a face. Mid-side nodes are
    /// excluded so that linear and quadratic elements of the same shape
    /// match across a shared face.
    pub fn face_corner_nodes(self, face: usize) -> &'static [usize] {
        const TRI_EDGES: [[usize; 2]; 3] = [[0, 1], [1, 2], [2, 0]];
        const QUAD_EDGES: [[usize; 2]; 4] = [[0, 1], [1, 2], [2, 3], [3, 0]];
        const TET_FACES: [[usize; 3]; 4] = [[0, 1, 2], [0, 1, 3], [0, 2, 3], [1, 2, 3]];
        const HEX_FACES: [[usize; 4]; 6] = [
            [0, 1, 2, 3], // t = -1
            [4, 5, 6, 7], // t = +1
            [0, 1, 5, 4], // s = -1
            [3, 2, 6, 7], // s = +1
            [1, 2, 6, 5], // r = +1
            [0, 3, 7, 4], // r = -1
        ];
        match self {
            ElementKind::Tri3 | ElementKind::Tri6 => &TRI_EDGES[face],
            ElementKind::Quad4 => &QUAD_EDGES[face],
            ElementKind::Tet4 | ElementKind::Tet10 => &TET_FACES[face],
            ElementKind::Hex8 => &HEX_FACES[face],
        }
    }
}

/// A mesh element: kind plus global node indices.
#[derive(Debug, Clone)]
pub struct Element {
    pub kind: ElementKind,
    pub nodes: Vec<usize>,
}

impl Element {
    pub fn new(kind: ElementKind, nodes: Vec<usize>) -> Self {
        debug_assert_eq!(nodes.len(), kind.num_nodes());
        Self { kind, nodes }
    }

    /// Global node ids of the corner nodes of a face, sorted. Used as the
    /// matching key when building adjacency.
    fn face_key(&self, face: usize) -> Vec<usize> {
        let mut key: Vec<usize> = self
            .kind
            .face_corner_nodes(face)
            .iter()
            .map(|&i| self.nodes[i])
            .collect();
        key.sort_unstable();
        key
    }
}

/// Element list plus neighbor-by-face adjacency.
#[derive(Debug, Clone, Default)]
pub struct Connectivity {
    pub elements: Vec<Element>,
    /// `neighbors[e][f]` is the element sharing face `f` of element `e`,
    /// or `None` on the domain boundary. Populated by `build_neighbors`.
    pub neighbors: Vec<Vec<Option<usize>>>,
}

impl Connectivity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_element(&mut self, element: Element) -> usize {
        let id = self.elements.len();
        self.elements.push(element);
        id
    }

    pub fn num_elements(&self) -> usize {
        self.elements.len()
    }

    pub fn neighbor(&self, elem: usize, face: usize) -> Option<usize> {
        self.neighbors[elem][face]
    }

    /// Build the neighbor-by-face table by matching sorted corner-node
    /// sets. Each interior face must be shared by exactly two elements.
    pub fn build_neighbors(&mut self) {
        self.neighbors = self
            .elements
            .iter()
            .map(|e| vec![None; e.kind.num_faces()])
            .collect();

        let mut open: HashMap<Vec<usize>, (usize, usize)> = HashMap::new();
        for (eid, elem) in self.elements.iter().enumerate() {
            for face in 0..elem.kind.num_faces() {
                let key = elem.face_key(face);
                match open.remove(&key) {
                    Some((other, other_face)) => {
                        self.neighbors[eid][face] = Some(other);
                        self.neighbors[other][other_face] = Some(eid);
                    }
                    None => {
                        open.insert(key, (eid, face));
                    }
                }
            }
        }
    }
}
