///! Insertion-ordered output tables with epsilon-tolerant spatial lookup.

use hashbrown::HashMap;
use itertools::iproduct;

use crate::{
    bsp::FaceId,
    game::{Contents, GameRules},
    geom::{self, Plane},
    math::Vec3d,
};

/// Plane table entry
pub struct TablePlane {
    pub plane: Plane,

    /// Index in the plane lump once exported
    pub output_num: Option<u32>,
}

/// Insertion-ordered plane list with near-duplicate lookup.
///
/// Planes are stored as even/odd pairs: the even entry has a non-negative
/// normal component along its dominant axis, the odd entry is its negation.
/// Lookup runs over a 4-D cell grid keyed by (nx, ny, nz, d).
pub struct PlaneTable {
    planes: Vec<TablePlane>,
    grid: HashMap<[i64; 4], Vec<usize>>,
}

impl PlaneTable {
    pub fn new() -> Self {
        Self {
            planes: Vec::new(),
            grid: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.planes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.planes.is_empty()
    }

    fn cell_of(plane: &Plane) -> [i64; 4] {
        [
            (plane.normal.x / geom::NORMAL_EPSILON).floor() as i64,
            (plane.normal.y / geom::NORMAL_EPSILON).floor() as i64,
            (plane.normal.z / geom::NORMAL_EPSILON).floor() as i64,
            (plane.distance / geom::DIST_EPSILON).floor() as i64,
        ]
    }

    fn insert_cell(&mut self, index: usize) {
        let cell = Self::cell_of(&self.planes[index].plane);
        self.grid.entry(cell).or_default().push(index);
    }

    /// Emplace the canonical plane pair, returning the index of the side that
    /// matches the input orientation.
    pub fn add(&mut self, plane: Plane) -> usize {
        let even = self.planes.len();
        let odd = even + 1;

        let axis = plane.plane_type().axis();
        let input_is_even = plane.normal[axis] >= 0.0;

        let even_plane = if input_is_even { plane } else { plane.negate_direction() };

        self.planes.push(TablePlane {
            plane: even_plane,
            output_num: None,
        });
        self.planes.push(TablePlane {
            plane: even_plane.negate_direction(),
            output_num: None,
        });

        self.insert_cell(even);
        self.insert_cell(odd);

        if input_is_even {
            even
        } else {
            odd
        }
    }

    /// Find a stored plane within half an epsilon box of the query
    pub fn find(&self, plane: &Plane) -> Option<usize> {
        let cell = Self::cell_of(plane);

        for (dx, dy, dz, dw) in iproduct!(-1..=1, -1..=1, -1..=1, -1..=1) {
            let key = [cell[0] + dx, cell[1] + dy, cell[2] + dz, cell[3] + dw];

            let Some(bucket) = self.grid.get(&key) else {
                continue;
            };

            for &index in bucket {
                let stored = &self.planes[index].plane;

                if (stored.normal.x - plane.normal.x).abs() < geom::NORMAL_EPSILON * 0.5
                    && (stored.normal.y - plane.normal.y).abs() < geom::NORMAL_EPSILON * 0.5
                    && (stored.normal.z - plane.normal.z).abs() < geom::NORMAL_EPSILON * 0.5
                    && (stored.distance - plane.distance).abs() < geom::DIST_EPSILON * 0.5
                {
                    return Some(index);
                }
            }
        }

        None
    }

    pub fn add_or_find(&mut self, plane: Plane) -> usize {
        if let Some(index) = self.find(&plane) {
            return index;
        }

        self.add(plane)
    }

    /// Get plane by table index. An out-of-range index is a programming error.
    pub fn get(&self, index: usize) -> Plane {
        self.entry(index).plane
    }

    pub fn entry(&self, index: usize) -> &TablePlane {
        self.planes
            .get(index)
            .unwrap_or_else(|| panic!("plane table index {index} out of range"))
    }

    pub fn entry_mut(&mut self, index: usize) -> &mut TablePlane {
        let count = self.planes.len();

        self.planes
            .get_mut(index)
            .unwrap_or_else(|| panic!("plane table index {index} out of range ({count} planes)"))
    }
}

impl Default for PlaneTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Insertion-ordered vertex list, deduplicated within `POINT_EPSILON`.
pub struct VertexTable {
    points: Vec<Vec3d>,
    grid: HashMap<[i64; 3], Vec<usize>>,
}

impl VertexTable {
    pub fn new() -> Self {
        Self {
            points: Vec::new(),
            grid: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[Vec3d] {
        &self.points
    }

    pub fn reserve(&mut self, additional: usize) {
        self.points.reserve(additional);
    }

    fn cell_of(point: Vec3d) -> [i64; 3] {
        [
            (point.x / geom::POINT_EPSILON).floor() as i64,
            (point.y / geom::POINT_EPSILON).floor() as i64,
            (point.z / geom::POINT_EPSILON).floor() as i64,
        ]
    }

    /// Look the point up, appending it on a miss. Coordinates within
    /// `ZERO_EPSILON` of an integer are snapped before hashing, so values
    /// like 63.99999 and 64.00001 collapse into one vertex.
    pub fn get_or_add(&mut self, mut point: Vec3d) -> usize {
        for axis in 0..3 {
            let rounded = point[axis].round();

            if (point[axis] - rounded).abs() < geom::ZERO_EPSILON {
                point[axis] = rounded;
            }
        }

        let cell = Self::cell_of(point);

        for (dx, dy, dz) in iproduct!(-1..=1, -1..=1, -1..=1) {
            let key = [cell[0] + dx, cell[1] + dy, cell[2] + dz];

            let Some(bucket) = self.grid.get(&key) else {
                continue;
            };

            for &index in bucket {
                if geom::points_equal(self.points[index], point, geom::POINT_EPSILON * 0.5) {
                    return index;
                }
            }
        }

        let index = self.points.len();

        self.points.push(point);
        self.grid.entry(cell).or_default().push(index);

        index
    }
}

impl Default for VertexTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Insertion-ordered directed edge list.
///
/// Entry 0 is a reserved sentinel: surfedge signs encode traversal
/// direction, so index 0 could never be referenced in reverse.
/// The `(v1, v2)` lookup and the per-side face claims are emission
/// scratch, reset around every `make_face_edges` run.
pub struct EdgeTable {
    edges: Vec<[u32; 2]>,
    lookup: HashMap<(u32, u32), Vec<usize>>,
    side_faces: [HashMap<usize, (FaceId, i32)>; 2],
}

impl EdgeTable {
    pub fn new() -> Self {
        Self {
            edges: vec![[0, 0]],
            lookup: HashMap::new(),
            side_faces: [HashMap::new(), HashMap::new()],
        }
    }

    /// Edge count including the sentinel entry
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn edges(&self) -> &[[u32; 2]] {
        &self.edges
    }

    /// Drop the per-run lookup and face-claim scratch
    pub fn reset_scratch(&mut self) {
        self.lookup.clear();
        self.side_faces[0].clear();
        self.side_faces[1].clear();
    }

    /// Get a signed surfedge index for the directed pair `(v1, v2)`.
    ///
    /// An existing `(v2, v1)` edge is reused in reverse when its second side
    /// is unclaimed and its first side belongs to the same native contents;
    /// reuse yields the negated index. Invalid face contents are fatal.
    pub fn get_or_add_directed(
        &mut self,
        v1: u32,
        v2: u32,
        face: FaceId,
        contents: Contents,
        game: &dyn GameRules,
    ) -> i32 {
        if !game.is_valid(contents, false) {
            panic!("face {face:?} carries invalid contents {:?}", contents.native);
        }

        if let Some(bucket) = self.lookup.get(&(v2, v1)) {
            for &index in bucket {
                if self.side_faces[1].contains_key(&index) {
                    continue;
                }

                let (_, native) = self.side_faces[0][&index];
                if native != contents.native {
                    continue;
                }

                self.side_faces[1].insert(index, (face, contents.native));
                return -(index as i32);
            }
        }

        let index = self.edges.len();

        self.edges.push([v1, v2]);
        self.lookup.entry((v1, v2)).or_default().push(index);
        self.side_faces[0].insert(index, (face, contents.native));

        index as i32
    }
}

impl Default for EdgeTable {
    fn default() -> Self {
        Self::new()
    }
}


// tables.rs
