use scene_kernel::{MaterialId, NodeId, Scene};
use slotmap::SecondaryMap;
use tracing::debug;

use crate::types::PlacementError;

/// Pre-bake material slots of every mesh that has been painted.
///
/// At most one record per mesh. Records survive re-placement so a repeated
/// bake always starts from the original materials, and are only dropped all
/// at once by [`PaintedMaterials::clear`].
#[derive(Debug, Default)]
pub struct PaintedMaterials {
    records: SecondaryMap<NodeId, Vec<MaterialId>>,
}

impl PaintedMaterials {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `slots` as the original materials of `mesh`.
    pub fn snapshot(&mut self, mesh: NodeId, slots: Vec<MaterialId>) -> Result<(), PlacementError> {
        if self.records.contains_key(mesh) {
            return Err(PlacementError::AlreadySnapshotted { mesh });
        }
        self.records.insert(mesh, slots);
        Ok(())
    }

    pub fn get(&self, mesh: NodeId) -> Option<&[MaterialId]> {
        self.records.get(mesh).map(Vec::as_slice)
    }

    pub fn contains(&self, mesh: NodeId) -> bool {
        self.records.contains_key(mesh)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Put the recorded slots back on `mesh`, keeping the record.
    /// Returns the slots that were replaced.
    pub fn restore_one(
        &self,
        scene: &mut Scene,
        mesh: NodeId,
    ) -> Result<Vec<MaterialId>, PlacementError> {
        let slots = self
            .records
            .get(mesh)
            .ok_or(PlacementError::NoSnapshot { mesh })?;
        Ok(scene.set_materials(mesh, slots.clone())?)
    }

    /// Restore every recorded mesh that is still in the scene.
    pub fn restore_all(&self, scene: &mut Scene) -> Result<(), PlacementError> {
        for (mesh, slots) in &self.records {
            if scene.contains(mesh) {
                scene.set_materials(mesh, slots.clone())?;
            } else {
                debug!(?mesh, "painted mesh no longer in scene");
            }
        }
        Ok(())
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Matrix4;
    use scene_kernel::{Geometry, Material};

    fn mesh_with_material(scene: &mut Scene) -> (NodeId, MaterialId) {
        let g = scene.insert_geometry(Geometry::plane(1.0, 1.0));
        let m = scene.insert_material(Material::standard());
        let root = scene.root();
        let mesh = scene.add_mesh(root, "body", Matrix4::identity(), g, vec![m]).unwrap();
        (mesh, m)
    }

    #[test]
    fn second_snapshot_for_same_mesh_is_rejected() {
        let mut scene = Scene::new();
        let (mesh, m) = mesh_with_material(&mut scene);
        let mut painted = PaintedMaterials::new();
        painted.snapshot(mesh, vec![m]).unwrap();
        assert!(matches!(
            painted.snapshot(mesh, vec![m]),
            Err(PlacementError::AlreadySnapshotted { .. })
        ));
        painted.clear();
        assert!(painted.snapshot(mesh, vec![m]).is_ok());
    }

    #[test]
    fn restore_puts_original_slots_back() {
        let mut scene = Scene::new();
        let (mesh, original) = mesh_with_material(&mut scene);
        let mut painted = PaintedMaterials::new();
        painted.snapshot(mesh, vec![original]).unwrap();

        let baked = scene.insert_material(Material::standard());
        scene.set_materials(mesh, vec![baked]).unwrap();

        let replaced = painted.restore_one(&mut scene, mesh).unwrap();
        assert_eq!(replaced, vec![baked]);
        assert_eq!(scene.mesh_data(mesh).unwrap().materials, vec![original]);
        assert!(painted.contains(mesh));
    }

    #[test]
    fn restore_one_without_record_fails() {
        let mut scene = Scene::new();
        let (mesh, _) = mesh_with_material(&mut scene);
        assert!(matches!(
            PaintedMaterials::new().restore_one(&mut scene, mesh),
            Err(PlacementError::NoSnapshot { .. })
        ));
    }
}
