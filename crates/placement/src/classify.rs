use garment_types::MeshRole;
use scene_kernel::{Aabb, NodeId, SceneError, SceneQuery};
use tracing::debug;

/// Role of a mesh from its local bounding-box center: meshes centered near
/// the garment's vertical axis are body panels, the rest are sleeves.
pub fn classify_mesh(bbox: &Aabb, body_threshold: f64) -> MeshRole {
    if bbox.center().x.abs() <= body_threshold {
        MeshRole::Body
    } else {
        MeshRole::Sleeve
    }
}

/// Garment meshes grouped by role, each group in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MeshPartition {
    pub body: Vec<NodeId>,
    pub sleeves: Vec<NodeId>,
}

pub fn classify_meshes(
    scene: &dyn SceneQuery,
    meshes: &[NodeId],
    body_threshold: f64,
) -> Result<MeshPartition, SceneError> {
    let mut partition = MeshPartition::default();
    for &mesh in meshes {
        match classify_mesh(&scene.bounding_box(mesh)?, body_threshold) {
            MeshRole::Body => partition.body.push(mesh),
            MeshRole::Sleeve => partition.sleeves.push(mesh),
        }
    }
    debug!(
        body = partition.body.len(),
        sleeves = partition.sleeves.len(),
        "classified garment meshes"
    );
    Ok(partition)
}
