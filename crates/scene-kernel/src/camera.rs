use nalgebra::{Isometry3, Perspective3, Point2, Point3, Vector3};
use serde::{Deserialize, Serialize};

use crate::types::Ray;

/// Perspective camera looking at a target point.
///
/// Projection follows the OpenGL convention used by browser renderers:
/// normalized device coordinates span `[-1, 1]` on every axis, +Y up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerspectiveCamera {
    pub fov_y_degrees: f64,
    pub aspect: f64,
    pub near: f64,
    pub far: f64,
    pub position: Point3<f64>,
    pub target: Point3<f64>,
    pub up: Vector3<f64>,
}

/// Storefront default: 50° field of view, two units in front of the garment.
impl Default for PerspectiveCamera {
    fn default() -> Self {
        Self {
            fov_y_degrees: 50.0,
            aspect: 1.0,
            near: 0.1,
            far: 1000.0,
            position: Point3::new(0.0, 0.0, 2.0),
            target: Point3::origin(),
            up: Vector3::y(),
        }
    }
}

impl PerspectiveCamera {
    /// World-to-view isometry. Degenerate setups (eye on target, view
    /// direction parallel to `up`) are nudged to a valid basis.
    pub fn view(&self) -> Isometry3<f64> {
        let mut target = self.target;
        if (target - self.position).norm_squared() < 1e-18 {
            target = self.position - Vector3::z();
        }
        let forward = target - self.position;
        let mut up = self.up;
        if forward.cross(&up).norm_squared() < 1e-18 {
            up = if forward.cross(&Vector3::z()).norm_squared() < 1e-18 {
                Vector3::y()
            } else {
                Vector3::z()
            };
        }
        Isometry3::look_at_rh(&self.position, &target, &up)
    }

    pub fn projection(&self) -> Perspective3<f64> {
        let aspect = if self.aspect.is_finite() && self.aspect > 1e-6 {
            self.aspect
        } else {
            1.0
        };
        let near = self.near.max(1e-6);
        let far = self.far.max(near + 1e-3);
        Perspective3::new(aspect, self.fov_y_degrees.to_radians(), near, far)
    }

    /// Project a world point into normalized device coordinates.
    ///
    /// Points behind the camera come out mirrored, as with any perspective
    /// divide; callers treat a miss from such a projection as a normal miss.
    pub fn project(&self, world: &Point3<f64>) -> Point3<f64> {
        let view = self.view().transform_point(world);
        self.projection().project_point(&view)
    }

    /// Ray from the camera through an NDC coordinate.
    pub fn ray_through_ndc(&self, ndc: &Point2<f64>) -> Option<Ray> {
        let on_frustum = self
            .projection()
            .unproject_point(&Point3::new(ndc.x, ndc.y, 0.5));
        let world = self.view().inverse_transform_point(&on_frustum);
        Ray::new(self.position, world - self.position)
    }

    /// Ray from the camera toward a world point.
    pub fn ray_toward(&self, world: &Point3<f64>) -> Option<Ray> {
        Ray::new(self.position, world - self.position)
    }

    /// Update the aspect ratio for a resized viewport. Zero sizes are ignored.
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.aspect = width as f64 / height as f64;
        }
    }

    /// Restore the default viewpoint, keeping the current lens and aspect.
    pub fn reset_view(&mut self) {
        let d = Self::default();
        self.position = d.position;
        self.target = d.target;
        self.up = d.up;
    }
}
