//! Garment assets as delivered by the browser loader, and the placeholder
//! garment used when loading fails.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use nalgebra::{Quaternion, UnitQuaternion, Vector3};
use scene_kernel::math::compose;
use scene_kernel::{
    FaceSide, Geometry, Material, MaterialKind, NodeId, Scene, SceneError, TextureId,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::session::SessionError;

/// A garment model flattened to plain buffers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelAsset {
    #[serde(default)]
    pub name: String,
    pub meshes: Vec<AssetMesh>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetMesh {
    #[serde(default)]
    pub name: String,
    /// Flat `[x, y, z, ...]` positions.
    pub vertices: Vec<f32>,
    #[serde(default)]
    pub normals: Option<Vec<f32>>,
    /// Flat `[u, v, ...]` texture coordinates.
    #[serde(default)]
    pub uvs: Option<Vec<f32>>,
    #[serde(default)]
    pub indices: Option<Vec<u32>>,
    #[serde(default)]
    pub transform: AssetTransform,
    #[serde(default)]
    pub materials: Vec<AssetMaterial>,
}

/// Local TRS transform. Rotation is a quaternion `[x, y, z, w]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetTransform {
    pub translation: [f64; 3],
    pub rotation: [f64; 4],
    pub scale: [f64; 3],
}

impl Default for AssetTransform {
    fn default() -> Self {
        Self {
            translation: [0.0; 3],
            rotation: [0.0, 0.0, 0.0, 1.0],
            scale: [1.0; 3],
        }
    }
}

impl AssetTransform {
    /// Local matrix. Non-finite components, a zero-length rotation or a zero
    /// scale axis are rejected.
    pub fn matrix(&self) -> Result<nalgebra::Matrix4<f64>, SessionError> {
        let finite = self
            .translation
            .iter()
            .chain(&self.rotation)
            .chain(&self.scale)
            .all(|c| c.is_finite());
        if !finite {
            return Err(SessionError::Asset {
                reason: format!("non-finite transform {self:?}"),
            });
        }
        if self.scale.iter().any(|&s| s.abs() < f64::EPSILON) {
            return Err(SessionError::Asset {
                reason: format!("zero scale {:?}", self.scale),
            });
        }
        let [x, y, z, w] = self.rotation;
        let rotation = UnitQuaternion::try_new(Quaternion::new(w, x, y, z), f64::EPSILON)
            .ok_or_else(|| SessionError::Asset {
                reason: format!("degenerate rotation {:?}", self.rotation),
            })?;
        Ok(compose(
            &Vector3::from(self.translation),
            &rotation,
            &Vector3::from(self.scale),
        ))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetMaterial {
    pub kind: MaterialKind,
    pub color: [f32; 4],
    pub side: FaceSide,
    /// Base color map as a `data:image/png;base64,...` URL.
    pub map: Option<String>,
}

impl Default for AssetMaterial {
    fn default() -> Self {
        Self {
            kind: MaterialKind::Standard,
            color: [1.0; 4],
            side: FaceSide::Front,
            map: None,
        }
    }
}

/// Scene objects created for a model.
#[derive(Debug, Clone, Default)]
pub struct InstantiatedModel {
    pub meshes: Vec<NodeId>,
    /// Map textures owned by the model's materials.
    pub textures: Vec<TextureId>,
}

impl ModelAsset {
    pub fn from_json(json: &str) -> Result<Self, SessionError> {
        serde_json::from_str(json).map_err(|e| SessionError::Asset {
            reason: e.to_string(),
        })
    }

    /// Create every mesh under `parent`. On failure nothing created so far is
    /// left behind.
    #[instrument(skip_all, fields(name = %self.name, meshes = self.meshes.len()))]
    pub fn instantiate(
        &self,
        scene: &mut Scene,
        parent: NodeId,
    ) -> Result<InstantiatedModel, SessionError> {
        let mut model = InstantiatedModel::default();
        for mesh in &self.meshes {
            if let Err(err) = mesh.instantiate(scene, parent, &mut model) {
                for &node in &model.meshes {
                    scene.dispose_subtree(node)?;
                }
                for &texture in &model.textures {
                    scene.dispose_texture(texture)?;
                }
                return Err(err);
            }
        }
        debug!(meshes = model.meshes.len(), textures = model.textures.len(), "model instantiated");
        Ok(model)
    }
}

impl AssetMesh {
    fn instantiate(
        &self,
        scene: &mut Scene,
        parent: NodeId,
        model: &mut InstantiatedModel,
    ) -> Result<(), SessionError> {
        let local = self.transform.matrix()?;
        let geometry = Geometry::from_flat(
            &self.vertices,
            self.normals.as_deref(),
            self.uvs.as_deref(),
            self.indices.as_deref(),
        )?;

        // Decode every map before touching the scene.
        let mut decoded = Vec::with_capacity(self.materials.len().max(1));
        for material in &self.materials {
            let map = match &material.map {
                Some(url) => Some(decode_png(&decode_data_url(url)?)?),
                None => None,
            };
            decoded.push((material, map));
        }

        let mut materials = Vec::with_capacity(decoded.len().max(1));
        for (asset, map) in decoded {
            let mut material = Material::new(asset.kind)
                .with_color(asset.color)
                .with_side(asset.side);
            if let Some(image) = map {
                let texture = scene.insert_texture(image);
                model.textures.push(texture);
                material = material.with_map(texture);
            }
            materials.push(scene.insert_material(material));
        }
        if materials.is_empty() {
            materials.push(scene.insert_material(Material::standard()));
        }

        let geometry = scene.insert_geometry(geometry);
        let node = scene.add_mesh(parent, self.name.as_str(), local, geometry, materials)?;
        model.meshes.push(node);
        Ok(())
    }
}

/// Decode the payload of a base64 `data:` URL.
pub fn decode_data_url(url: &str) -> Result<Vec<u8>, SessionError> {
    let rest = url.strip_prefix("data:").ok_or_else(|| SessionError::DataUrl {
        reason: "missing data: scheme".to_string(),
    })?;
    let (header, payload) = rest.split_once(',').ok_or_else(|| SessionError::DataUrl {
        reason: "missing ',' separator".to_string(),
    })?;
    if !header.ends_with(";base64") {
        return Err(SessionError::DataUrl {
            reason: format!("unsupported encoding in '{header}'"),
        });
    }
    STANDARD
        .decode(payload.trim())
        .map_err(|e| SessionError::DataUrl {
            reason: e.to_string(),
        })
}

/// Encode bytes as a PNG `data:` URL.
pub fn encode_png_data_url(bytes: &[u8]) -> String {
    format!("data:image/png;base64,{}", STANDARD.encode(bytes))
}

fn decode_png(bytes: &[u8]) -> Result<image::RgbaImage, SceneError> {
    image::load_from_memory(bytes)
        .map(|img| img.to_rgba8())
        .map_err(|e| SceneError::ImageDecode {
            reason: e.to_string(),
        })
}

/// Two 0.8 x 1.2 double-sided panels, front and back, standing in for a
/// garment that failed to load.
pub fn placeholder_garment(scene: &mut Scene, parent: NodeId) -> Result<Vec<NodeId>, SceneError> {
    let panels = [
        ("placeholder-front", 0.02, UnitQuaternion::identity()),
        (
            "placeholder-back",
            -0.02,
            UnitQuaternion::from_axis_angle(&Vector3::y_axis(), std::f64::consts::PI),
        ),
    ];
    let mut meshes = Vec::with_capacity(panels.len());
    for (name, z, rotation) in panels {
        let geometry = scene.insert_geometry(Geometry::plane(0.8, 1.2));
        let material = scene.insert_material(Material::standard().with_side(FaceSide::Double));
        let local = compose(&Vector3::new(0.0, -0.2, z), &rotation, &Vector3::repeat(1.0));
        meshes.push(scene.add_mesh(parent, name, local, geometry, vec![material])?);
    }
    Ok(meshes)
}
