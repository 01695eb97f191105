//! Bounding-box-to-local-point mapping.

use garment_types::PlacementIntent;
use nalgebra::Point3;
use scene_kernel::math::lerp;
use scene_kernel::Aabb;

/// Highest local Y a logo may be centered at: below the neckline band.
pub fn neckline_limit(bbox: &Aabb, neckline_ratio: f64) -> f64 {
    bbox.max.y - neckline_ratio * (bbox.max.y - bbox.min.y)
}

/// Map an intent to a point in the mesh's local space.
///
/// X and Y interpolate across the box from its center; Y is capped at the
/// neckline. Z sits at the box's mid-depth plus `offset_z`. An empty box maps
/// everything onto the local origin.
pub fn local_point(bbox: &Aabb, intent: &PlacementIntent, neckline_ratio: f64) -> Point3<f64> {
    if bbox.is_empty() {
        return Point3::new(0.0, 0.0, intent.offset_z);
    }
    let x = lerp(bbox.min.x, bbox.max.x, 0.5 + intent.offset_x);
    let y = lerp(bbox.min.y, bbox.max.y, 0.5 + intent.offset_y)
        .min(neckline_limit(bbox, neckline_ratio));
    let z = lerp(bbox.min.z, bbox.max.z, 0.5) + intent.offset_z;
    Point3::new(x, y, z)
}

/// Inverse of [`local_point`] for X and Y (ignoring the neckline cap): the
/// offsets that map onto `point`. Flat axes map to a zero offset.
pub fn offsets_for_local_point(bbox: &Aabb, point: &Point3<f64>) -> (f64, f64, f64) {
    if bbox.is_empty() {
        return (0.0, 0.0, point.z);
    }
    let size = bbox.size();
    let along = |axis: usize| {
        if size[axis] > 1e-12 {
            (point[axis] - bbox.min[axis]) / size[axis] - 0.5
        } else {
            0.0
        }
    };
    (along(0), along(1), point.z - bbox.center().z)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn unit_box() -> Aabb {
        Aabb::new(Point3::new(-0.4, -0.6, -0.1), Point3::new(0.4, 0.6, 0.1))
    }

    #[test]
    fn center_intent_maps_to_box_center() {
        let p = local_point(&unit_box(), &PlacementIntent::default(), 0.18);
        assert_relative_eq!(p, Point3::origin(), epsilon = 1e-12);
    }

    #[test]
    fn top_edge_is_capped_at_neckline() {
        let intent = PlacementIntent::new(0.0, 0.5, 0.0, 0.5);
        let p = local_point(&unit_box(), &intent, 0.18);
        // 0.6 - 0.18 * 1.2
        assert_relative_eq!(p.y, 0.384, epsilon = 1e-12);
    }

    #[test]
    fn offset_z_is_added_to_mid_depth() {
        let intent = PlacementIntent::new(0.0, 0.0, 0.05, 0.5);
        let p = local_point(&unit_box(), &intent, 0.18);
        assert_relative_eq!(p.z, 0.05, epsilon = 1e-12);
    }

    #[test]
    fn offsets_invert_the_mapping_below_the_neckline() {
        let bbox = unit_box();
        let intent = PlacementIntent::new(0.2, -0.3, 0.0, 0.5);
        let p = local_point(&bbox, &intent, 0.18);
        let (x, y, z) = offsets_for_local_point(&bbox, &p);
        assert_relative_eq!(x, 0.2, epsilon = 1e-12);
        assert_relative_eq!(y, -0.3, epsilon = 1e-12);
        assert_relative_eq!(z, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn empty_box_maps_to_origin() {
        let p = local_point(&Aabb::empty(), &PlacementIntent::default(), 0.18);
        assert_eq!(p, Point3::origin());
    }

    fn arb_box() -> impl Strategy<Value = Aabb> {
        (
            -5.0f64..5.0,
            -5.0f64..5.0,
            -5.0f64..5.0,
            0.0f64..4.0,
            0.0f64..4.0,
            0.0f64..4.0,
        )
            .prop_map(|(x, y, z, w, h, d)| {
                Aabb::new(Point3::new(x, y, z), Point3::new(x + w, y + h, z + d))
            })
    }

    proptest! {
        #[test]
        fn mapped_point_stays_inside_box_below_neckline(
            bbox in arb_box(),
            ox in -0.5f64..=0.5,
            oy in -0.5f64..=0.5,
            ratio in 0.0f64..0.5,
        ) {
            let intent = PlacementIntent::new(ox, oy, 0.0, 0.5);
            let p = local_point(&bbox, &intent, ratio);
            let eps = 1e-9;
            prop_assert!(p.x >= bbox.min.x - eps && p.x <= bbox.max.x + eps);
            prop_assert!(p.y >= bbox.min.y - eps && p.y <= bbox.max.y + eps);
            prop_assert!(p.y <= neckline_limit(&bbox, ratio) + eps);
        }
    }
}
