use garment_types::PlacementSide;
use scene_kernel::{NodeId, SceneError, SceneQuery};
use tracing::debug;

/// Pick the mesh a logo goes on.
///
/// `Front` takes the candidate whose world-space bounding-box center has the
/// largest Z, `Back` the smallest, `Any` the largest local bounding-box
/// volume. Ties keep the earliest candidate.
pub fn select_target(
    scene: &dyn SceneQuery,
    candidates: &[NodeId],
    side: PlacementSide,
) -> Result<Option<NodeId>, SceneError> {
    let mut best: Option<(NodeId, f64)> = None;
    for &mesh in candidates {
        let score = match side {
            PlacementSide::Front => scene.world_bounding_box(mesh)?.center().z,
            PlacementSide::Back => -scene.world_bounding_box(mesh)?.center().z,
            PlacementSide::Any => scene.bounding_box(mesh)?.volume(),
        };
        if best.map_or(true, |(_, top)| score > top) {
            best = Some((mesh, score));
        }
    }
    debug!(?side, target = ?best.map(|(m, _)| m), "selected target mesh");
    Ok(best.map(|(mesh, _)| mesh))
}
