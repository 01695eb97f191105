//! Decal artifacts: baking into the mesh texture, or attaching a conformed
//! decal mesh or a flat rectangle under the model root.

use image::RgbaImage;
use nalgebra::{Matrix4, Point2, Point3, UnitQuaternion, Vector3};
use scene_kernel::math::{orient_to_normal, pose};
use scene_kernel::{
    FaceSide, Geometry, GeometryId, Material, MaterialId, NodeId, Scene, SceneQuery, TextureId,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::bake::{blank_canvas, composite_logo};
use crate::clip::{clip_decal, DecalProjector};
use crate::config::DecalConfig;
use crate::snapshot::PaintedMaterials;
use crate::types::{CascadeTier, PlacementError, PlacementOrigin, SurfaceHit};

/// Decoded logo, stored as a scene texture so decal materials can map it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogoImage {
    texture: TextureId,
    width: u32,
    height: u32,
}

impl LogoImage {
    pub fn insert(scene: &mut Scene, image: RgbaImage) -> Result<Self, PlacementError> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(PlacementError::EmptyLogo { width, height });
        }
        Ok(Self {
            texture: scene.insert_texture(image),
            width,
            height,
        })
    }

    /// Decode PNG bytes into a logo texture.
    pub fn decode(scene: &mut Scene, bytes: &[u8]) -> Result<Self, PlacementError> {
        let image = image::load_from_memory(bytes)
            .map_err(|e| PlacementError::LogoDecode {
                reason: e.to_string(),
            })?
            .to_rgba8();
        Self::insert(scene, image)
    }

    pub fn texture(&self) -> TextureId {
        self.texture
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Height over width.
    pub fn aspect(&self) -> f64 {
        self.height as f64 / self.width as f64
    }

    pub fn dispose(self, scene: &mut Scene) -> Result<(), PlacementError> {
        Ok(scene.dispose_texture(self.texture)?)
    }
}

/// Shape of a decal attached as its own mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachedShape {
    /// Mesh triangles clipped to the projector box.
    Conformed,
    /// Flat textured quad.
    Rectangle,
}

/// Outcome of one placement.
#[derive(Debug, Clone, PartialEq)]
pub enum DecalResult {
    /// Logo painted into the mesh texture.
    Baked {
        mesh: NodeId,
        texture: TextureId,
        /// Materials created for the painted slots.
        materials: Vec<MaterialId>,
        /// Unoccluded feedback plane, when it could be built.
        overlay: Option<NodeId>,
    },
    PlaneAttached {
        node: NodeId,
        world_position: Point3<f64>,
        world_orientation: UnitQuaternion<f64>,
        shape: AttachedShape,
    },
    Failed {
        reason: String,
    },
}

impl DecalResult {
    pub fn is_baked(&self) -> bool {
        matches!(self, DecalResult::Baked { .. })
    }

    /// Scene node carrying the visible decal geometry, if any.
    pub fn visual_node(&self) -> Option<NodeId> {
        match self {
            DecalResult::Baked { overlay, .. } => *overlay,
            DecalResult::PlaneAttached { node, .. } => Some(*node),
            DecalResult::Failed { .. } => None,
        }
    }
}

/// Inputs for one decal placement.
#[derive(Debug, Clone)]
pub struct DecalRequest<'a> {
    pub mesh: NodeId,
    /// Decal nodes are parented here.
    pub model_root: NodeId,
    pub hit: SurfaceHit,
    pub logo: &'a LogoImage,
    pub size_factor: f64,
    pub origin: PlacementOrigin,
    /// Orientation captured by a drag, used instead of the surface normal.
    pub orientation_override: Option<UnitQuaternion<f64>>,
}

impl DecalRequest<'_> {
    fn orientation(&self) -> UnitQuaternion<f64> {
        self.orientation_override
            .unwrap_or_else(|| orient_to_normal(&self.hit.normal))
    }
}

/// Bake when the direct projection hit a UV-mapped, paintable mesh; attach a
/// decal mesh otherwise. A failed bake falls back to attaching.
#[instrument(skip_all, fields(mesh = ?request.mesh, tier = ?request.hit.tier))]
pub fn place_decal(
    scene: &mut Scene,
    painted: &mut PaintedMaterials,
    request: &DecalRequest<'_>,
    config: &DecalConfig,
) -> DecalResult {
    if !(request.size_factor.is_finite() && request.size_factor > 0.0) {
        let err = PlacementError::InvalidSize {
            size_factor: request.size_factor,
        };
        warn!(%err, "decal not placed");
        return DecalResult::Failed {
            reason: err.to_string(),
        };
    }
    if let Some(uv) = bake_uv(scene, request) {
        match bake(scene, painted, request, &uv, config) {
            Ok(result) => {
                info!("logo baked into mesh texture");
                return result;
            }
            Err(err) => warn!(%err, "bake failed; attaching decal instead"),
        }
    }
    match attach(scene, request, config) {
        Ok(result) => result,
        Err(err) => {
            warn!(%err, "decal placement failed");
            DecalResult::Failed {
                reason: err.to_string(),
            }
        }
    }
}

/// Hit UV, when the hit and the mesh qualify for baking.
fn bake_uv(scene: &Scene, request: &DecalRequest<'_>) -> Option<Point2<f64>> {
    if request.hit.tier != CascadeTier::DirectProjection {
        return None;
    }
    let has_uvs = scene
        .mesh_geometry(request.mesh)
        .map(Geometry::has_uvs)
        .unwrap_or(false);
    let paintable = scene
        .mesh_materials(request.mesh)
        .map(|ms| ms.iter().any(|m| m.kind.is_paintable()))
        .unwrap_or(false);
    if has_uvs && paintable {
        request.hit.uv
    } else {
        None
    }
}

/// Map image of the first paintable slot that has one.
fn first_paintable_map(scene: &Scene, slots: &[MaterialId]) -> Option<RgbaImage> {
    slots.iter().find_map(|&id| {
        let material = scene.material(id).ok()?;
        if !material.kind.is_paintable() {
            return None;
        }
        scene.texture(material.map?).ok().cloned()
    })
}

fn bake(
    scene: &mut Scene,
    painted: &mut PaintedMaterials,
    request: &DecalRequest<'_>,
    uv: &Point2<f64>,
    config: &DecalConfig,
) -> Result<DecalResult, PlacementError> {
    let mesh = request.mesh;
    let current = scene.mesh_data(mesh)?.materials.clone();

    // Always composite onto the pre-bake map so logos never stack up.
    let base = painted
        .get(mesh)
        .and_then(|original| first_paintable_map(scene, original))
        .or_else(|| first_paintable_map(scene, &current))
        .unwrap_or_else(|| blank_canvas(config.blank_texture_size));
    let composite = composite_logo(
        &base,
        scene.texture(request.logo.texture())?,
        uv,
        request.size_factor,
        config,
    )?;

    // Baked copies of the paintable slots; the rest stay as they are.
    let mut replacements = Vec::with_capacity(current.len());
    for &id in &current {
        let material = scene.material(id)?;
        replacements.push(material.kind.is_paintable().then(|| material.clone()));
    }

    if !painted.contains(mesh) {
        painted.snapshot(mesh, current.clone())?;
    }
    let texture = scene.insert_texture(composite);
    let mut slots = Vec::with_capacity(current.len());
    let mut created = Vec::new();
    for (&id, replacement) in current.iter().zip(replacements) {
        match replacement {
            Some(material) => {
                let baked = scene.insert_material(Material {
                    map: Some(texture),
                    side: FaceSide::Double,
                    transparent: true,
                    alpha_test: config.baked_alpha_test,
                    depth_write: true,
                    ..material
                });
                slots.push(baked);
                created.push(baked);
            }
            None => slots.push(id),
        }
    }
    scene.set_materials(mesh, slots)?;
    debug!(painted_slots = created.len(), "baked materials installed");

    let overlay = match attach_overlay(scene, request, config) {
        Ok(node) => Some(node),
        Err(err) => {
            warn!(%err, "overlay creation failed");
            None
        }
    };

    Ok(DecalResult::Baked {
        mesh,
        texture,
        materials: created,
        overlay,
    })
}

fn logo_material(logo: &LogoImage) -> Material {
    Material {
        transparent: true,
        ..Material::basic().with_map(logo.texture())
    }
}

/// Add a mesh at a world transform and parent it under `model_root` without
/// moving it. Frees the geometry and material if that fails.
fn attach_in_world(
    scene: &mut Scene,
    model_root: NodeId,
    name: &str,
    geometry: GeometryId,
    material: MaterialId,
    world: Matrix4<f64>,
) -> Result<NodeId, PlacementError> {
    let root = scene.root();
    let node = match scene.add_mesh(root, name, world, geometry, vec![material]) {
        Ok(node) => node,
        Err(err) => {
            let _ = scene.dispose_geometry(geometry);
            let _ = scene.dispose_material(material);
            return Err(err.into());
        }
    };
    if let Err(err) = scene.attach(model_root, node) {
        scene.dispose_subtree(node)?;
        return Err(err.into());
    }
    Ok(node)
}

fn attach_overlay(
    scene: &mut Scene,
    request: &DecalRequest<'_>,
    config: &DecalConfig,
) -> Result<NodeId, PlacementError> {
    let width = config.overlay_width * request.size_factor;
    let geometry = scene.insert_geometry(Geometry::plane(width, width * request.logo.aspect()));
    let material = scene.insert_material(Material {
        side: FaceSide::Double,
        depth_test: false,
        depth_write: false,
        ..logo_material(request.logo)
    });
    let position = request.hit.point + request.hit.normal.into_inner() * config.overlay_offset;
    let node = attach_in_world(
        scene,
        request.model_root,
        "logo-overlay",
        geometry,
        material,
        pose(&position, &request.orientation()),
    )?;
    let overlay = scene.node_mut(node)?;
    overlay.render_order = config.overlay_render_order;
    overlay.frustum_culled = false;
    Ok(node)
}

fn attach(
    scene: &mut Scene,
    request: &DecalRequest<'_>,
    config: &DecalConfig,
) -> Result<DecalResult, PlacementError> {
    let orientation = request.orientation();
    let width = config.projector_width * request.size_factor;
    let projector = DecalProjector {
        position: request.hit.point,
        orientation,
        size: Vector3::new(width, width, config.projector_depth),
    };
    let clipped = clip_decal(
        &projector,
        scene.mesh_geometry(request.mesh)?,
        &scene.world_matrix(request.mesh)?,
    );

    if !clipped.is_empty() {
        debug!(triangles = clipped.triangle_count(), "conformed decal");
        let geometry = scene.insert_geometry(clipped.into_geometry()?);
        let material = scene.insert_material(Material {
            depth_write: false,
            polygon_offset: Some(config.projector_polygon_offset),
            ..logo_material(request.logo)
        });
        // Clipped vertices are already in world space.
        let node = attach_in_world(
            scene,
            request.model_root,
            "logo-decal",
            geometry,
            material,
            Matrix4::identity(),
        )?;
        return Ok(DecalResult::PlaneAttached {
            node,
            world_position: request.hit.point,
            world_orientation: orientation,
            shape: AttachedShape::Conformed,
        });
    }

    debug!("projected decal is empty; attaching rectangle");
    let lift = match request.origin {
        PlacementOrigin::Drag => config.drag_offset,
        PlacementOrigin::Recompute => config.rectangle_offset,
    };
    let position = request.hit.point + request.hit.normal.into_inner() * lift;
    let width = config.rectangle_width * request.size_factor;
    let geometry = scene.insert_geometry(Geometry::plane(width, width * request.logo.aspect()));
    let material = scene.insert_material(Material {
        polygon_offset: Some(config.projector_polygon_offset),
        ..logo_material(request.logo)
    });
    let node = attach_in_world(
        scene,
        request.model_root,
        "logo-plane",
        geometry,
        material,
        pose(&position, &orientation),
    )?;
    let plane = scene.node_mut(node)?;
    plane.render_order = config.rectangle_render_order;
    plane.frustum_culled = false;
    Ok(DecalResult::PlaneAttached {
        node,
        world_position: position,
        world_orientation: orientation,
        shape: AttachedShape::Rectangle,
    })
}

/// Free everything a placement created. A baked mesh gets its recorded
/// original materials back; the record itself is kept.
pub fn dispose_decal(
    scene: &mut Scene,
    painted: &PaintedMaterials,
    result: DecalResult,
) -> Result<(), PlacementError> {
    match result {
        DecalResult::Baked {
            mesh,
            texture,
            materials,
            overlay,
        } => {
            if let Some(overlay) = overlay.filter(|&n| scene.contains(n)) {
                scene.dispose_subtree(overlay)?;
            }
            if scene.contains(mesh) && painted.contains(mesh) {
                painted.restore_one(scene, mesh)?;
            }
            for material in materials {
                // Already gone if the mesh was disposed while still baked.
                if let Err(err) = scene.dispose_material(material) {
                    debug!(%err, "baked material already freed");
                }
            }
            scene.dispose_texture(texture)?;
        }
        DecalResult::PlaneAttached { node, .. } => {
            if scene.contains(node) {
                scene.dispose_subtree(node)?;
            }
        }
        DecalResult::Failed { .. } => {}
    }
    Ok(())
}
