//! Small transform helpers shared by the scene graph and the placement code.

use nalgebra::{Matrix3, Matrix4, Point3, Translation3, Unit, UnitQuaternion, Vector3};

/// Compose translation, rotation and (non-uniform) scale into a 4x4 matrix.
pub fn compose(
    translation: &Vector3<f64>,
    rotation: &UnitQuaternion<f64>,
    scale: &Vector3<f64>,
) -> Matrix4<f64> {
    Translation3::from(*translation).to_homogeneous()
        * rotation.to_homogeneous()
        * Matrix4::new_nonuniform_scaling(scale)
}

/// Rigid pose (no scale) as a 4x4 matrix.
pub fn pose(position: &Point3<f64>, orientation: &UnitQuaternion<f64>) -> Matrix4<f64> {
    compose(&position.coords, orientation, &Vector3::repeat(1.0))
}

/// Inverse-transpose of the upper 3x3 block, for transforming normals.
/// Falls back to the plain linear part when the block is singular.
pub fn normal_matrix(m: &Matrix4<f64>) -> Matrix3<f64> {
    let linear: Matrix3<f64> = m.fixed_view::<3, 3>(0, 0).into_owned();
    match linear.try_inverse() {
        Some(inv) => inv.transpose(),
        None => linear,
    }
}

/// Transform a normal and renormalize it. `None` if it collapses.
pub fn transform_normal(m: &Matrix4<f64>, n: &Vector3<f64>) -> Option<Unit<Vector3<f64>>> {
    let v = normal_matrix(m) * n;
    if !v.iter().all(|c| c.is_finite()) {
        return None;
    }
    Unit::try_new(v, 1e-12)
}

/// Rotation taking the local +Z axis onto `normal`.
///
/// Handles the antiparallel case (normal = -Z) with a half turn about +Y.
pub fn orient_to_normal(normal: &Unit<Vector3<f64>>) -> UnitQuaternion<f64> {
    UnitQuaternion::rotation_between(&Vector3::z(), normal.as_ref()).unwrap_or_else(|| {
        if normal.z < 0.0 {
            UnitQuaternion::from_axis_angle(&Vector3::y_axis(), std::f64::consts::PI)
        } else {
            UnitQuaternion::identity()
        }
    })
}

/// Linear interpolation.
pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Unit vector from `from` toward `to`, or `fallback` when they coincide.
pub fn direction_or(
    from: &Point3<f64>,
    to: &Point3<f64>,
    fallback: Unit<Vector3<f64>>,
) -> Unit<Vector3<f64>> {
    let d = to - from;
    if d.norm_squared() < 1e-12 || !d.iter().all(|c| c.is_finite()) {
        return fallback;
    }
    Unit::new_normalize(d)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn orient_maps_z_onto_normal() {
        for n in [
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(0.0, 0.0, -1.0),
            Vector3::new(0.3, -0.4, 0.8),
        ] {
            let n = Unit::new_normalize(n);
            let q = orient_to_normal(&n);
            let mapped = q * Vector3::z();
            assert_relative_eq!(mapped, n.into_inner(), epsilon = 1e-9);
        }
    }

    #[test]
    fn normal_matrix_handles_nonuniform_scale() {
        let m = compose(
            &Vector3::zeros(),
            &UnitQuaternion::identity(),
            &Vector3::new(2.0, 1.0, 1.0),
        );
        // A 45° surface stretched along X tilts toward the Y axis.
        let n = transform_normal(&m, &Vector3::new(1.0, 1.0, 0.0)).unwrap();
        assert!(n.y > n.x);
    }

    #[test]
    fn direction_falls_back_on_coincident_points() {
        let p = Point3::new(1.0, 2.0, 3.0);
        let d = direction_or(&p, &p, Vector3::z_axis());
        assert_eq!(d, Vector3::z_axis());
    }
}
