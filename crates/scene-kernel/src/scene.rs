use image::RgbaImage;
use nalgebra::Matrix4;
use slotmap::SlotMap;
use tracing::debug;
use uuid::Uuid;

use crate::geometry::Geometry;
use crate::material::{FaceSide, Material};
use crate::raycast;
use crate::traits::SceneQuery;
use crate::types::*;

/// Mesh component of a node: one geometry, one or more material slots.
#[derive(Debug, Clone)]
pub struct MeshData {
    pub geometry: GeometryId,
    pub materials: Vec<MaterialId>,
}

/// A scene-graph node.
#[derive(Debug, Clone)]
pub struct Node {
    pub name: String,
    /// Stable identity exposed to the browser.
    pub uuid: Uuid,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// Transform relative to the parent.
    pub local: Matrix4<f64>,
    pub visible: bool,
    pub render_order: i32,
    pub frustum_culled: bool,
    pub mesh: Option<MeshData>,
}

impl Node {
    fn new(name: impl Into<String>, local: Matrix4<f64>) -> Self {
        Self {
            name: name.into(),
            uuid: Uuid::new_v4(),
            parent: None,
            children: Vec::new(),
            local,
            visible: true,
            render_order: 0,
            frustum_culled: true,
            mesh: None,
        }
    }
}

/// Live object counts, used to check that placement does not leak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResourceCounts {
    pub nodes: usize,
    pub geometries: usize,
    pub materials: usize,
    pub textures: usize,
}

/// Scene graph with slot-map arenas for every resource kind.
///
/// The scene owns everything it stores. Removing a node does not free the
/// geometry or materials it references; callers that created them dispose
/// them explicitly, which keeps shared resources (a logo texture used by
/// several decals) alive as long as needed.
pub struct Scene {
    root: NodeId,
    nodes: SlotMap<NodeId, Node>,
    geometries: SlotMap<GeometryId, Geometry>,
    materials: SlotMap<MaterialId, Material>,
    textures: SlotMap<TextureId, RgbaImage>,
}

impl Scene {
    pub fn new() -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(Node::new("scene", Matrix4::identity()));
        Self {
            root,
            nodes,
            geometries: SlotMap::with_key(),
            materials: SlotMap::with_key(),
            textures: SlotMap::with_key(),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    // ── Resources ───────────────────────────────────────────────────

    pub fn insert_geometry(&mut self, geometry: Geometry) -> GeometryId {
        self.geometries.insert(geometry)
    }

    pub fn insert_material(&mut self, material: Material) -> MaterialId {
        self.materials.insert(material)
    }

    pub fn insert_texture(&mut self, image: RgbaImage) -> TextureId {
        self.textures.insert(image)
    }

    pub fn geometry(&self, id: GeometryId) -> Result<&Geometry, SceneError> {
        self.geometries
            .get(id)
            .ok_or(SceneError::GeometryNotFound { id })
    }

    pub fn material(&self, id: MaterialId) -> Result<&Material, SceneError> {
        self.materials
            .get(id)
            .ok_or(SceneError::MaterialNotFound { id })
    }

    pub fn material_mut(&mut self, id: MaterialId) -> Result<&mut Material, SceneError> {
        self.materials
            .get_mut(id)
            .ok_or(SceneError::MaterialNotFound { id })
    }

    pub fn texture(&self, id: TextureId) -> Result<&RgbaImage, SceneError> {
        self.textures
            .get(id)
            .ok_or(SceneError::TextureNotFound { id })
    }

    pub fn dispose_geometry(&mut self, id: GeometryId) -> Result<(), SceneError> {
        self.geometries
            .remove(id)
            .map(|_| ())
            .ok_or(SceneError::GeometryNotFound { id })
    }

    /// Free a material. Its map texture is not freed.
    pub fn dispose_material(&mut self, id: MaterialId) -> Result<(), SceneError> {
        self.materials
            .remove(id)
            .map(|_| ())
            .ok_or(SceneError::MaterialNotFound { id })
    }

    pub fn dispose_texture(&mut self, id: TextureId) -> Result<(), SceneError> {
        self.textures
            .remove(id)
            .map(|_| ())
            .ok_or(SceneError::TextureNotFound { id })
    }

    pub fn resource_counts(&self) -> ResourceCounts {
        ResourceCounts {
            nodes: self.nodes.len(),
            geometries: self.geometries.len(),
            materials: self.materials.len(),
            textures: self.textures.len(),
        }
    }

    // ── Nodes ───────────────────────────────────────────────────────

    pub fn node(&self, id: NodeId) -> Result<&Node, SceneError> {
        self.nodes.get(id).ok_or(SceneError::NodeNotFound { id })
    }

    pub fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, SceneError> {
        self.nodes.get_mut(id).ok_or(SceneError::NodeNotFound { id })
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Add an empty group node under `parent`.
    pub fn add_group(
        &mut self,
        parent: NodeId,
        name: impl Into<String>,
        local: Matrix4<f64>,
    ) -> Result<NodeId, SceneError> {
        self.node(parent)?;
        let id = self.nodes.insert(Node::new(name, local));
        self.link(parent, id);
        Ok(id)
    }

    /// Add a mesh node under `parent`.
    pub fn add_mesh(
        &mut self,
        parent: NodeId,
        name: impl Into<String>,
        local: Matrix4<f64>,
        geometry: GeometryId,
        materials: Vec<MaterialId>,
    ) -> Result<NodeId, SceneError> {
        self.geometry(geometry)?;
        for &m in &materials {
            self.material(m)?;
        }
        let id = self.add_group(parent, name, local)?;
        self.nodes[id].mesh = Some(MeshData {
            geometry,
            materials,
        });
        Ok(id)
    }

    fn link(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[child].parent = Some(parent);
        self.nodes[parent].children.push(child);
    }

    /// Detach a node from its parent. The node stays alive, parentless.
    pub fn detach(&mut self, id: NodeId) -> Result<(), SceneError> {
        let parent = self.node(id)?.parent;
        if let Some(parent) = parent {
            if let Some(p) = self.nodes.get_mut(parent) {
                p.children.retain(|&c| c != id);
            }
        }
        self.nodes[id].parent = None;
        Ok(())
    }

    /// Reparent `child` under `parent` without moving it in world space.
    pub fn attach(&mut self, parent: NodeId, child: NodeId) -> Result<(), SceneError> {
        if self.is_ancestor_or_self(child, parent)? {
            return Err(SceneError::CyclicAttach { parent, child });
        }
        let child_world = self.world_matrix(child)?;
        let parent_world = self.world_matrix(parent)?;
        let parent_inv = parent_world
            .try_inverse()
            .ok_or(SceneError::SingularTransform { id: parent })?;
        self.detach(child)?;
        self.nodes[child].local = parent_inv * child_world;
        self.link(parent, child);
        debug!(?parent, ?child, "attached preserving world transform");
        Ok(())
    }

    /// Place a node at a world transform, whatever its parent chain.
    pub fn set_world_matrix(&mut self, id: NodeId, world: Matrix4<f64>) -> Result<(), SceneError> {
        let parent_world = match self.node(id)?.parent {
            Some(parent) => self.world_matrix(parent)?,
            None => Matrix4::identity(),
        };
        let parent_inv = parent_world
            .try_inverse()
            .ok_or(SceneError::SingularTransform { id })?;
        self.nodes[id].local = parent_inv * world;
        Ok(())
    }

    fn is_ancestor_or_self(&self, ancestor: NodeId, node: NodeId) -> Result<bool, SceneError> {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return Ok(true);
            }
            current = self.node(id)?.parent;
        }
        Ok(false)
    }

    /// Remove a node and all of its descendants from the graph.
    /// Returns the removed nodes' mesh data so callers can free resources.
    pub fn remove_subtree(&mut self, id: NodeId) -> Result<Vec<MeshData>, SceneError> {
        self.detach(id)?;
        let mut removed = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.remove(current) {
                stack.extend(node.children);
                if let Some(mesh) = node.mesh {
                    removed.push(mesh);
                }
            }
        }
        Ok(removed)
    }

    /// Remove a subtree and free every geometry and material its meshes use.
    /// Textures are left alone.
    pub fn dispose_subtree(&mut self, id: NodeId) -> Result<(), SceneError> {
        for mesh in self.remove_subtree(id)? {
            // Shared resources may already be gone; that is fine here.
            let _ = self.dispose_geometry(mesh.geometry);
            for m in mesh.materials {
                let _ = self.dispose_material(m);
            }
        }
        Ok(())
    }

    /// Mesh nodes under `root` (inclusive), depth-first in insertion order.
    pub fn mesh_nodes(&self, root: NodeId) -> Result<Vec<NodeId>, SceneError> {
        self.node(root)?;
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id];
            if node.mesh.is_some() {
                out.push(id);
            }
            stack.extend(node.children.iter().rev().copied());
        }
        Ok(out)
    }

    pub fn find_by_uuid(&self, uuid: Uuid) -> Option<NodeId> {
        self.nodes
            .iter()
            .find(|(_, n)| n.uuid == uuid)
            .map(|(id, _)| id)
    }

    pub fn set_visible(&mut self, id: NodeId, visible: bool) -> Result<(), SceneError> {
        self.node_mut(id)?.visible = visible;
        Ok(())
    }

    // ── Mesh components ─────────────────────────────────────────────

    pub fn mesh_data(&self, id: NodeId) -> Result<&MeshData, SceneError> {
        self.node(id)?
            .mesh
            .as_ref()
            .ok_or(SceneError::NotAMesh { id })
    }

    /// Replace the material slots of a mesh node, returning the old slots.
    pub fn set_materials(
        &mut self,
        id: NodeId,
        materials: Vec<MaterialId>,
    ) -> Result<Vec<MaterialId>, SceneError> {
        for &m in &materials {
            self.material(m)?;
        }
        let mesh = self
            .node_mut(id)?
            .mesh
            .as_mut()
            .ok_or(SceneError::NotAMesh { id })?;
        Ok(std::mem::replace(&mut mesh.materials, materials))
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneQuery for Scene {
    fn world_matrix(&self, id: NodeId) -> Result<Matrix4<f64>, SceneError> {
        let mut m = self.node(id)?.local;
        let mut current = self.nodes[id].parent;
        while let Some(parent) = current {
            let node = self.node(parent)?;
            m = node.local * m;
            current = node.parent;
        }
        Ok(m)
    }

    fn mesh_geometry(&self, id: NodeId) -> Result<&Geometry, SceneError> {
        let mesh = self.mesh_data(id)?;
        self.geometry(mesh.geometry)
    }

    fn mesh_materials(&self, id: NodeId) -> Result<Vec<&Material>, SceneError> {
        self.mesh_data(id)?
            .materials
            .iter()
            .map(|&m| self.material(m))
            .collect()
    }

    fn raycast(&self, id: NodeId, ray: &Ray) -> Result<Vec<RaycastHit>, SceneError> {
        let geometry = self.mesh_geometry(id)?;
        let materials = self.mesh_materials(id)?;
        let side = if materials.iter().any(|m| m.side == FaceSide::Double) {
            FaceSide::Double
        } else {
            materials.first().map(|m| m.side).unwrap_or_default()
        };
        let world = self.world_matrix(id)?;
        Ok(raycast::intersect_geometry(geometry, side, &world, ray))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::{Point3, Vector3};

    fn translation(x: f64, y: f64, z: f64) -> Matrix4<f64> {
        Matrix4::new_translation(&Vector3::new(x, y, z))
    }

    #[test]
    fn attach_preserves_world_position() {
        let mut scene = Scene::new();
        let root = scene.root();
        let model = scene
            .add_group(root, "model", translation(0.0, -1.4, 0.5))
            .unwrap();
        let child = scene.add_group(root, "decal", translation(1.0, 2.0, 3.0)).unwrap();

        scene.attach(model, child).unwrap();

        let world = scene.world_matrix(child).unwrap();
        let p = world.transform_point(&Point3::origin());
        assert_relative_eq!(p, Point3::new(1.0, 2.0, 3.0), epsilon = 1e-12);
        assert_eq!(scene.node(child).unwrap().parent, Some(model));
        assert!(scene.node(root).unwrap().children.iter().all(|&c| c != child));
    }

    #[test]
    fn attach_rejects_cycles() {
        let mut scene = Scene::new();
        let a = scene.add_group(scene.root(), "a", Matrix4::identity()).unwrap();
        let b = scene.add_group(a, "b", Matrix4::identity()).unwrap();
        assert!(matches!(
            scene.attach(b, a),
            Err(SceneError::CyclicAttach { .. })
        ));
    }

    #[test]
    fn dispose_subtree_frees_mesh_resources() {
        let mut scene = Scene::new();
        let before = scene.resource_counts();
        let g = scene.insert_geometry(Geometry::plane(1.0, 1.0));
        let m = scene.insert_material(Material::standard());
        let group = scene.add_group(scene.root(), "g", Matrix4::identity()).unwrap();
        scene.add_mesh(group, "m", Matrix4::identity(), g, vec![m]).unwrap();

        scene.dispose_subtree(group).unwrap();
        assert_eq!(scene.resource_counts(), before);
    }

    #[test]
    fn mesh_nodes_are_listed_in_insertion_order() {
        let mut scene = Scene::new();
        let root = scene.root();
        let g = scene.insert_geometry(Geometry::plane(1.0, 1.0));
        let m = scene.insert_material(Material::standard());
        let a = scene.add_mesh(root, "a", Matrix4::identity(), g, vec![m]).unwrap();
        let group = scene.add_group(root, "group", Matrix4::identity()).unwrap();
        let b = scene.add_mesh(group, "b", Matrix4::identity(), g, vec![m]).unwrap();
        let c = scene.add_mesh(root, "c", Matrix4::identity(), g, vec![m]).unwrap();
        assert_eq!(scene.mesh_nodes(root).unwrap(), vec![a, b, c]);
    }

    #[test]
    fn set_materials_returns_previous_slots() {
        let mut scene = Scene::new();
        let g = scene.insert_geometry(Geometry::plane(1.0, 1.0));
        let m1 = scene.insert_material(Material::standard());
        let m2 = scene.insert_material(Material::basic());
        let mesh = scene
            .add_mesh(scene.root(), "m", Matrix4::identity(), g, vec![m1])
            .unwrap();
        let old = scene.set_materials(mesh, vec![m2]).unwrap();
        assert_eq!(old, vec![m1]);
        assert_eq!(scene.mesh_data(mesh).unwrap().materials, vec![m2]);
    }
}
