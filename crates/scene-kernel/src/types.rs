use nalgebra::{Point2, Point3, Unit, Vector3};
use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

// ─── Arena Keys ──────────────────────────────────────────────────────────────

new_key_type! {
    /// A node in the scene graph (group or mesh).
    pub struct NodeId;
    /// Vertex data shared by mesh nodes.
    pub struct GeometryId;
    /// A surface material.
    pub struct MaterialId;
    /// An RGBA image used as a material map.
    pub struct TextureId;
}

// ─── Errors ──────────────────────────────────────────────────────────────────

/// Errors from scene queries and mutations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SceneError {
    #[error("node not found: {id:?}")]
    NodeNotFound { id: NodeId },

    #[error("node {id:?} has no mesh")]
    NotAMesh { id: NodeId },

    #[error("geometry not found: {id:?}")]
    GeometryNotFound { id: GeometryId },

    #[error("material not found: {id:?}")]
    MaterialNotFound { id: MaterialId },

    #[error("texture not found: {id:?}")]
    TextureNotFound { id: TextureId },

    #[error("{attribute} has {actual} entries, expected {expected}")]
    AttributeLength {
        attribute: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("index {index} out of range for {vertex_count} vertices")]
    IndexOutOfRange { index: u32, vertex_count: usize },

    #[error("attaching {child:?} under {parent:?} would create a cycle")]
    CyclicAttach { parent: NodeId, child: NodeId },

    #[error("transform of {id:?} is not invertible")]
    SingularTransform { id: NodeId },

    #[error("image decode failed: {reason}")]
    ImageDecode { reason: String },
}

// ─── Bounds ──────────────────────────────────────────────────────────────────

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Point3<f64>,
    pub max: Point3<f64>,
}

impl Aabb {
    pub fn new(min: Point3<f64>, max: Point3<f64>) -> Self {
        Self { min, max }
    }

    pub fn empty() -> Self {
        Self {
            min: Point3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY),
            max: Point3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }

    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point3<f64>>) -> Self {
        let mut bb = Self::empty();
        for p in points {
            bb.expand_to_include(p);
        }
        bb
    }

    pub fn expand_to_include(&mut self, p: &Point3<f64>) {
        self.min = self.min.inf(p);
        self.max = self.max.sup(p);
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Center of the box; the origin for an empty box.
    pub fn center(&self) -> Point3<f64> {
        if self.is_empty() {
            return Point3::origin();
        }
        nalgebra::center(&self.min, &self.max)
    }

    pub fn size(&self) -> Vector3<f64> {
        if self.is_empty() {
            return Vector3::zeros();
        }
        self.max - self.min
    }

    pub fn volume(&self) -> f64 {
        let s = self.size();
        s.x * s.y * s.z
    }

    /// Slab test. Returns true if the ray enters the box at `t >= 0`.
    pub fn intersects_ray(&self, origin: &Point3<f64>, direction: &Vector3<f64>) -> bool {
        if self.is_empty() {
            return false;
        }
        let mut t_min = 0.0_f64;
        let mut t_max = f64::INFINITY;
        for axis in 0..3 {
            let o = origin[axis];
            let d = direction[axis];
            if d.abs() < 1e-15 {
                if o < self.min[axis] || o > self.max[axis] {
                    return false;
                }
                continue;
            }
            let inv = 1.0 / d;
            let mut t0 = (self.min[axis] - o) * inv;
            let mut t1 = (self.max[axis] - o) * inv;
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            t_min = t_min.max(t0);
            t_max = t_max.min(t1);
            if t_min > t_max + 1e-12 {
                return false;
            }
        }
        true
    }
}

// ─── Rays ────────────────────────────────────────────────────────────────────

/// A half-line in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Point3<f64>,
    pub direction: Unit<Vector3<f64>>,
}

impl Ray {
    /// Build a ray, or `None` when the origin is non-finite or the direction
    /// cannot be normalized.
    pub fn new(origin: Point3<f64>, direction: Vector3<f64>) -> Option<Self> {
        if !origin.coords.iter().all(|c| c.is_finite())
            || !direction.iter().all(|c| c.is_finite())
        {
            return None;
        }
        let direction = Unit::try_new(direction, 1e-12)?;
        Some(Self { origin, direction })
    }

    pub fn at(&self, t: f64) -> Point3<f64> {
        self.origin + self.direction.into_inner() * t
    }
}

/// A ray-mesh intersection in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RaycastHit {
    pub point: Point3<f64>,
    /// Face normal transformed to world space.
    pub normal: Unit<Vector3<f64>>,
    /// Interpolated texture coordinate, when the geometry carries UVs.
    pub uv: Option<Point2<f64>>,
    pub distance: f64,
    pub face_index: usize,
}
