//! Projected decal geometry: the target mesh's triangles clipped to an
//! oriented box around the hit point.

use nalgebra::{Isometry3, Matrix4, Point2, Point3, Translation3, Unit, UnitQuaternion, Vector3};
use scene_kernel::{Geometry, SceneError};

/// Oriented box the decal is projected through. Local +Z is the projection
/// axis; X and Y span the logo.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecalProjector {
    pub position: Point3<f64>,
    pub orientation: UnitQuaternion<f64>,
    pub size: Vector3<f64>,
}

impl DecalProjector {
    fn isometry(&self) -> Isometry3<f64> {
        Isometry3::from_parts(Translation3::from(self.position.coords), self.orientation)
    }
}

/// World-space triangle soup produced by clipping.
#[derive(Debug, Clone, Default)]
pub struct ClippedDecal {
    pub positions: Vec<Point3<f64>>,
    pub normals: Vec<Vector3<f64>>,
    pub uvs: Vec<Point2<f64>>,
}

impl ClippedDecal {
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn triangle_count(&self) -> usize {
        self.positions.len() / 3
    }

    pub fn into_geometry(self) -> Result<Geometry, SceneError> {
        Geometry::new(self.positions)
            .with_normals(self.normals)?
            .with_uvs(self.uvs)
    }
}

/// Clip every triangle of `geometry` (placed at `world`) against the
/// projector box using Sutherland–Hodgman on each of the six faces.
pub fn clip_decal(
    projector: &DecalProjector,
    geometry: &Geometry,
    world: &Matrix4<f64>,
) -> ClippedDecal {
    let iso = projector.isometry();
    let half = projector.size * 0.5;
    let positions = geometry.positions();
    let mut out = ClippedDecal::default();

    for [ia, ib, ic] in geometry.triangles() {
        let tri = [ia, ib, ic].map(|i| world.transform_point(&positions[i]));
        let face = (tri[1] - tri[0]).cross(&(tri[2] - tri[0]));
        let Some(normal) = Unit::try_new(face, 1e-18) else {
            continue;
        };

        // Projector-space polygon.
        let mut polygon: Vec<Point3<f64>> =
            tri.iter().map(|p| iso.inverse_transform_point(p)).collect();
        for axis in 0..3 {
            for sign in [1.0, -1.0] {
                polygon = clip_against_plane(&polygon, axis, sign, half[axis]);
                if polygon.len() < 3 {
                    break;
                }
            }
            if polygon.len() < 3 {
                break;
            }
        }
        if polygon.len() < 3 {
            continue;
        }

        for k in 1..polygon.len() - 1 {
            for p in [polygon[0], polygon[k], polygon[k + 1]] {
                out.positions.push(iso.transform_point(&p));
                out.normals.push(normal.into_inner());
                out.uvs.push(Point2::new(
                    0.5 + p.x / projector.size.x,
                    0.5 + p.y / projector.size.y,
                ));
            }
        }
    }
    out
}

/// Keep the part of `polygon` where `sign * p[axis] <= limit`.
fn clip_against_plane(
    polygon: &[Point3<f64>],
    axis: usize,
    sign: f64,
    limit: f64,
) -> Vec<Point3<f64>> {
    let distance = |p: &Point3<f64>| sign * p[axis] - limit;
    let mut out = Vec::with_capacity(polygon.len() + 2);
    for (i, current) in polygon.iter().enumerate() {
        let next = &polygon[(i + 1) % polygon.len()];
        let dc = distance(current);
        let dn = distance(next);
        if dc <= 0.0 {
            out.push(*current);
        }
        if (dc <= 0.0) != (dn <= 0.0) {
            let t = dc / (dc - dn);
            out.push(current + (next - current) * t);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn projector_at(position: Point3<f64>, width: f64) -> DecalProjector {
        DecalProjector {
            position,
            orientation: UnitQuaternion::identity(),
            size: Vector3::new(width, width, 0.4),
        }
    }

    #[test]
    fn small_projector_cuts_a_square_out_of_a_large_plane() {
        let plane = Geometry::plane(2.0, 2.0);
        let decal = clip_decal(
            &projector_at(Point3::new(0.3, 0.2, 0.0), 0.2),
            &plane,
            &Matrix4::identity(),
        );
        assert!(!decal.is_empty());
        for p in &decal.positions {
            assert!((p.x - 0.3).abs() <= 0.1 + 1e-9);
            assert!((p.y - 0.2).abs() <= 0.1 + 1e-9);
        }
        for uv in &decal.uvs {
            assert!((-1e-9..=1.0 + 1e-9).contains(&uv.x));
            assert!((-1e-9..=1.0 + 1e-9).contains(&uv.y));
        }
        // Total clipped area equals the projector footprint.
        let area: f64 = decal
            .positions
            .chunks_exact(3)
            .map(|t| (t[1] - t[0]).cross(&(t[2] - t[0])).norm() * 0.5)
            .sum();
        assert_relative_eq!(area, 0.04, epsilon = 1e-9);
    }

    #[test]
    fn projector_off_the_mesh_yields_nothing() {
        let plane = Geometry::plane(1.0, 1.0);
        let decal = clip_decal(
            &projector_at(Point3::new(5.0, 5.0, 0.0), 0.2),
            &plane,
            &Matrix4::identity(),
        );
        assert!(decal.is_empty());
    }

    #[test]
    fn surface_outside_projector_depth_is_ignored() {
        let plane = Geometry::plane(1.0, 1.0);
        let decal = clip_decal(
            &projector_at(Point3::new(0.0, 0.0, 1.0), 0.2),
            &plane,
            &Matrix4::identity(),
        );
        assert!(decal.is_empty());
    }

    #[test]
    fn clipped_decal_converts_to_geometry() {
        let plane = Geometry::plane(1.0, 1.0);
        let decal = clip_decal(
            &projector_at(Point3::origin(), 0.5),
            &plane,
            &Matrix4::identity(),
        );
        let triangles = decal.triangle_count();
        let geometry = decal.into_geometry().unwrap();
        assert_eq!(geometry.triangle_count(), triangles);
        assert!(geometry.has_uvs());
    }
}
