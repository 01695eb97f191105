use nalgebra::Matrix4;

use crate::geometry::Geometry;
use crate::material::Material;
use crate::types::{Aabb, NodeId, Ray, RaycastHit, SceneError};

/// Read-only scene queries used by placement.
///
/// Placement code only needs world transforms, vertex data, material slots
/// and raycasts. Keeping it behind this trait lets tests drive placement
/// with hand-built fixtures.
pub trait SceneQuery {
    /// Accumulated local-to-world transform of a node.
    fn world_matrix(&self, id: NodeId) -> Result<Matrix4<f64>, SceneError>;

    fn mesh_geometry(&self, id: NodeId) -> Result<&Geometry, SceneError>;

    fn mesh_materials(&self, id: NodeId) -> Result<Vec<&Material>, SceneError>;

    /// Local-space bounding box of a mesh's geometry.
    fn bounding_box(&self, id: NodeId) -> Result<Aabb, SceneError> {
        Ok(*self.mesh_geometry(id)?.bounding_box())
    }

    /// World-space bounding box of a mesh: the local box's corners transformed.
    fn world_bounding_box(&self, id: NodeId) -> Result<Aabb, SceneError> {
        let local = self.bounding_box(id)?;
        if local.is_empty() {
            return Ok(local);
        }
        let world = self.world_matrix(id)?;
        let corners: Vec<_> = (0..8)
            .map(|i| {
                let p = nalgebra::Point3::new(
                    if i & 1 == 0 { local.min.x } else { local.max.x },
                    if i & 2 == 0 { local.min.y } else { local.max.y },
                    if i & 4 == 0 { local.min.z } else { local.max.z },
                );
                world.transform_point(&p)
            })
            .collect();
        Ok(Aabb::from_points(corners.iter()))
    }

    /// Intersections of a world-space ray with one mesh, nearest first.
    fn raycast(&self, id: NodeId, ray: &Ray) -> Result<Vec<RaycastHit>, SceneError>;
}
