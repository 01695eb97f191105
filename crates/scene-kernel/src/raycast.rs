//! CPU ray-mesh intersection.
//!
//! Rays are moved into the mesh's local space so the cached local bounding
//! box can reject misses early; hits are reported back in world space.

use nalgebra::{Matrix4, Point2, Point3, Unit, Vector3};

use crate::geometry::Geometry;
use crate::material::FaceSide;
use crate::math;
use crate::types::{Ray, RaycastHit};

const DET_EPSILON: f64 = 1e-12;

/// Local-space hit on a single triangle.
#[derive(Debug, Clone, Copy)]
pub struct TriangleHit {
    pub t: f64,
    pub u: f64,
    pub v: f64,
    /// Sign of the determinant: true when the ray hits the front face.
    pub front: bool,
}

/// Möller–Trumbore ray/triangle test. The ray direction need not be unit
/// length; `t` is measured in multiples of it.
pub fn intersect_triangle(
    origin: &Point3<f64>,
    direction: &Vector3<f64>,
    a: &Point3<f64>,
    b: &Point3<f64>,
    c: &Point3<f64>,
    side: FaceSide,
) -> Option<TriangleHit> {
    let edge1 = b - a;
    let edge2 = c - a;
    let p = direction.cross(&edge2);
    let det = edge1.dot(&p);

    let front = det > DET_EPSILON;
    let back = det < -DET_EPSILON;
    let accepted = match side {
        FaceSide::Front => front,
        FaceSide::Back => back,
        FaceSide::Double => front || back,
    };
    if !accepted {
        return None;
    }

    let inv_det = 1.0 / det;
    let s = origin - a;
    let u = s.dot(&p) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }
    let q = s.cross(&edge1);
    let v = direction.dot(&q) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }
    let t = edge2.dot(&q) * inv_det;
    if t < 0.0 {
        return None;
    }
    Some(TriangleHit { t, u, v, front })
}

/// Every intersection of `ray` with `geometry` placed at `world`, nearest first.
///
/// A mesh with a singular world transform cannot be hit.
pub fn intersect_geometry(
    geometry: &Geometry,
    side: FaceSide,
    world: &Matrix4<f64>,
    ray: &Ray,
) -> Vec<RaycastHit> {
    let Some(inverse) = world.try_inverse() else {
        return Vec::new();
    };
    let local_origin = inverse.transform_point(&ray.origin);
    let local_dir = inverse.transform_vector(ray.direction.as_ref());

    if !geometry.bounding_box().intersects_ray(&local_origin, &local_dir) {
        return Vec::new();
    }

    let positions = geometry.positions();
    let uvs = geometry.uvs();
    let mut hits = Vec::new();

    for (face_index, [ia, ib, ic]) in geometry.triangles().into_iter().enumerate() {
        let (a, b, c) = (&positions[ia], &positions[ib], &positions[ic]);
        let Some(tri) = intersect_triangle(&local_origin, &local_dir, a, b, c, side) else {
            continue;
        };

        let local_point = local_origin + local_dir * tri.t;
        let point = world.transform_point(&local_point);
        let w = 1.0 - tri.u - tri.v;

        // Face normal, flipped when the back face was hit so it faces the ray.
        let mut face_normal = (b - a).cross(&(c - a));
        if !tri.front {
            face_normal = -face_normal;
        }
        let normal = math::transform_normal(world, &face_normal)
            .unwrap_or_else(|| Unit::new_unchecked(-ray.direction.into_inner()));

        let uv = uvs.map(|uv| {
            Point2::from(uv[ia].coords * w + uv[ib].coords * tri.u + uv[ic].coords * tri.v)
        });

        hits.push(RaycastHit {
            point,
            normal,
            uv,
            distance: (point - ray.origin).norm(),
            face_index,
        });
    }

    hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    hits
}
