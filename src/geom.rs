///! Planes, windings and bound boxes shared by the output pipeline stages.

use crate::math::Vec3d;

/// Plane table normal deduplication box
pub const NORMAL_EPSILON: f64 = 1e-5;

/// Plane table distance deduplication box
pub const DIST_EPSILON: f64 = 0.01;

/// Vertex table deduplication box
pub const POINT_EPSILON: f64 = 0.01;

/// Integer snap distance applied before vertex hashing
pub const ZERO_EPSILON: f64 = 0.001;

/// Point/plane classification tolerance
pub const ON_EPSILON: f64 = 0.001;

/// Point identity tolerance of the face merger
pub const EQUAL_EPSILON: f64 = 0.001;

/// Join convexity tolerance of the face merger
pub const CONTINUOUS_EPSILON: f64 = 0.001;

/// Componentwise point identity check
pub fn points_equal(a: Vec3d, b: Vec3d, epsilon: f64) -> bool {
    (a.x - b.x).abs() <= epsilon && (a.y - b.y).abs() <= epsilon && (a.z - b.z).abs() <= epsilon
}

/// Oriented plane: `normal ^ point == distance` for points on the plane
#[derive(Debug, Copy, Clone)]
pub struct Plane {
    pub normal: Vec3d,
    pub distance: f64,
}

/// Six-way plane classification by dominant normal axis
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum PlaneType {
    X = 0,
    Y = 1,
    Z = 2,
    AnyX = 3,
    AnyY = 4,
    AnyZ = 5,
}

impl PlaneType {
    /// Dominant axis index
    pub fn axis(self) -> usize {
        self as usize % 3
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum PointRelation {
    Front,
    Back,
    OnPlane,
}

pub enum WindingSplitResult {
    Front,
    Back,
    OnPlane,
    Split { front: Winding, back: Winding },
}

impl Plane {
    pub fn new(normal: Vec3d, distance: f64) -> Self {
        Self { normal, distance }
    }

    pub fn negate_direction(self) -> Self {
        Self {
            normal: -self.normal,
            distance: -self.distance,
        }
    }

    /// Classify the plane by its dominant normal axis
    pub fn plane_type(&self) -> PlaneType {
        if self.normal.x == 1.0 || self.normal.x == -1.0 {
            return PlaneType::X;
        }
        if self.normal.y == 1.0 || self.normal.y == -1.0 {
            return PlaneType::Y;
        }
        if self.normal.z == 1.0 || self.normal.z == -1.0 {
            return PlaneType::Z;
        }

        let ax = self.normal.x.abs();
        let ay = self.normal.y.abs();
        let az = self.normal.z.abs();

        if ax >= ay && ax >= az {
            PlaneType::AnyX
        } else if ay >= ax && ay >= az {
            PlaneType::AnyY
        } else {
            PlaneType::AnyZ
        }
    }

    /// Get relation of point and plane
    pub fn get_point_relation(&self, point: Vec3d) -> PointRelation {
        let metrics = (point ^ self.normal) - self.distance;

        if metrics > ON_EPSILON {
            PointRelation::Front
        } else if metrics < -ON_EPSILON {
            PointRelation::Back
        } else {
            PointRelation::OnPlane
        }
    }

    /// Split a winding by the plane. Points within `ON_EPSILON` of the plane
    /// land in both output windings; a winding that never crosses comes back
    /// as a plain side classification.
    pub fn split_winding(&self, winding: &Winding) -> WindingSplitResult {
        let dists = winding
            .points
            .iter()
            .map(|point| (*point ^ self.normal) - self.distance)
            .collect::<Vec<_>>();

        let sides = dists
            .iter()
            .map(|dist| {
                if *dist > ON_EPSILON {
                    PointRelation::Front
                } else if *dist < -ON_EPSILON {
                    PointRelation::Back
                } else {
                    PointRelation::OnPlane
                }
            })
            .collect::<Vec<_>>();

        let front_occured = sides.iter().any(|side| *side == PointRelation::Front);
        let back_occured = sides.iter().any(|side| *side == PointRelation::Back);

        match (front_occured, back_occured) {
            (false, false) => return WindingSplitResult::OnPlane,
            (true, false) => return WindingSplitResult::Front,
            (false, true) => return WindingSplitResult::Back,
            (true, true) => {}
        }

        let count = winding.points.len();
        let mut front_points = Vec::with_capacity(count + 2);
        let mut back_points = Vec::with_capacity(count + 2);

        for index in 0..count {
            let point = winding.points[index];

            match sides[index] {
                PointRelation::OnPlane => {
                    front_points.push(point);
                    back_points.push(point);
                    continue;
                }
                PointRelation::Front => front_points.push(point),
                PointRelation::Back => back_points.push(point),
            }

            let next_index = (index + 1) % count;
            if sides[next_index] == PointRelation::OnPlane || sides[next_index] == sides[index] {
                continue;
            }

            // edge crosses the plane, both parts get the intersection point
            let next = winding.points[next_index];
            let t = dists[index] / (dists[index] - dists[next_index]);
            let mut mid = point + (next - point) * t;

            // keep axial cuts exact
            for axis in 0..3 {
                if self.normal[axis] == 1.0 {
                    mid[axis] = self.distance;
                } else if self.normal[axis] == -1.0 {
                    mid[axis] = -self.distance;
                }
            }

            front_points.push(mid);
            back_points.push(mid);
        }

        WindingSplitResult::Split {
            front: Winding::new(front_points),
            back: Winding::new(back_points),
        }
    }
}

/// Finite convex polygon, stored as an ordered point loop
#[derive(Debug, Default, Clone)]
pub struct Winding {
    pub points: Vec<Vec3d>,
}

impl Winding {
    pub fn new(points: Vec<Vec3d>) -> Self {
        Self { points }
    }

    /// Same polygon with the opposite orientation
    pub fn flipped(&self) -> Self {
        Self {
            points: self.points.iter().rev().copied().collect(),
        }
    }

    pub fn area(&self) -> f64 {
        let mut total = 0.0;

        for index in 2..self.points.len() {
            let d1 = self.points[index - 1] - self.points[0];
            let d2 = self.points[index] - self.points[0];

            total += (d1 % d2).length() * 0.5;
        }

        total
    }

    pub fn build_bound_box(&self) -> BoundBox {
        BoundBox::for_points(&self.points)
    }
}

#[derive(Debug, Copy, Clone)]
pub struct BoundBox {
    min: Vec3d,
    max: Vec3d,
}

impl BoundBox {
    pub fn zero() -> Self {
        Self {
            min: Vec3d::new(f64::INFINITY, f64::INFINITY, f64::INFINITY),
            max: Vec3d::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }

    pub fn for_points(points: &[Vec3d]) -> Self {
        let mut result = Self::zero();

        for point in points {
            result.min.x = f64::min(result.min.x, point.x);
            result.min.y = f64::min(result.min.y, point.y);
            result.min.z = f64::min(result.min.z, point.z);

            result.max.x = f64::max(result.max.x, point.x);
            result.max.y = f64::max(result.max.y, point.y);
            result.max.z = f64::max(result.max.z, point.z);
        }

        result
    }

    pub fn min(&self) -> Vec3d {
        self.min
    }

    pub fn max(&self) -> Vec3d {
        self.max
    }
}


// geom.rs
