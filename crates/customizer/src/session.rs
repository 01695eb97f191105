//! The customizer session: one owned value holding the scene, the loaded
//! garment, the logo and the current decal.

use std::io::Cursor;

use garment_types::{GarmentStyle, PlacementIntent, PlacementSide};
use image::ImageFormat;
use nalgebra::{Matrix4, Point2, UnitQuaternion, Vector3};
use placement::local_point::offsets_for_local_point;
use placement::{
    classify_meshes, dispose_decal, place_decal, select_target, CascadeTier, DecalRequest,
    DecalResult, LogoImage, MeshPartition, PaintedMaterials, PlaceRequest, PlacementError,
    PlacementOrigin, Resolver, SurfaceHit,
};
use scene_kernel::math::orient_to_normal;
use scene_kernel::{
    NodeId, PerspectiveCamera, RaycastHit, Scene, SceneError, SceneQuery, TextureId,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::config::SessionConfig;
use crate::drag::DragState;
use crate::messages::DecalSummary;
use crate::model::{decode_data_url, placeholder_garment, ModelAsset};

/// Errors from session operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SessionError {
    #[error("no garment model loaded")]
    NoModel,

    #[error("no logo uploaded")]
    NoLogo,

    #[error("logo ticket {ticket} is stale (latest is {latest})")]
    StaleTicket { ticket: u64, latest: u64 },

    #[error("logo ticket {ticket} was never issued")]
    UnknownTicket { ticket: u64 },

    #[error("invalid data URL: {reason}")]
    DataUrl { reason: String },

    #[error("invalid placement intent {intent:?}")]
    InvalidIntent { intent: PlacementIntent },

    #[error("invalid model asset: {reason}")]
    Asset { reason: String },

    #[error("placement error: {0}")]
    Placement(#[from] PlacementError),

    #[error("scene error: {0}")]
    Scene(#[from] SceneError),

    #[error("image encode failed: {reason}")]
    Encode { reason: String },
}

/// Handle for one logo upload. Only the newest ticket is honored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogoTicket(u64);

impl LogoTicket {
    pub fn new(generation: u64) -> Self {
        Self(generation)
    }

    pub fn generation(self) -> u64 {
        self.0
    }
}

/// Outcome of a recomputation.
#[derive(Debug, Clone, PartialEq)]
pub enum PlacementStatus {
    Placed(DecalSummary),
    Skipped { reason: String },
}

impl PlacementStatus {
    pub fn decal(&self) -> Option<&DecalSummary> {
        match self {
            PlacementStatus::Placed(decal) => Some(decal),
            PlacementStatus::Skipped { .. } => None,
        }
    }
}

/// A garment in the scene.
#[derive(Debug, Clone)]
struct LoadedModel {
    root: NodeId,
    meshes: Vec<NodeId>,
    partition: MeshPartition,
    textures: Vec<TextureId>,
    placeholder: bool,
}

#[derive(Debug, Clone)]
struct PlacedDecal {
    result: DecalResult,
    hit: SurfaceHit,
}

pub struct CustomizerSession {
    config: SessionConfig,
    scene: Scene,
    camera: PerspectiveCamera,
    resolver: Resolver,
    painted: PaintedMaterials,
    model: Option<LoadedModel>,
    intent: PlacementIntent,
    side: PlacementSide,
    style: GarmentStyle,
    logo: Option<LogoImage>,
    logo_generation: u64,
    decal: Option<PlacedDecal>,
    /// Orientation captured by the last drag; reapplied on recomputation.
    orientation_override: Option<UnitQuaternion<f64>>,
    drag: DragState,
    /// World-space positions of the visible decal geometry, flat.
    decal_vertices: Vec<f32>,
}

impl CustomizerSession {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            scene: Scene::new(),
            camera: config.camera.clone(),
            resolver: Resolver::new(config.placement.clone()),
            painted: PaintedMaterials::new(),
            model: None,
            intent: config.intent,
            side: config.side,
            style: config.style,
            logo: None,
            logo_generation: 0,
            decal: None,
            orientation_override: None,
            drag: DragState::new(),
            decal_vertices: Vec::new(),
            config,
        }
    }

    // ── Model ────────────────────────────────────────────────────────────

    /// Replace the current garment. A broken asset is logged and replaced by
    /// the placeholder garment; only scene bookkeeping errors are returned.
    #[instrument(skip_all, fields(name = %asset.name))]
    pub fn load_model(&mut self, asset: &ModelAsset) -> Result<PlacementStatus, SessionError> {
        self.unload()?;
        let root = self.add_model_root()?;
        match asset.instantiate(&mut self.scene, root) {
            Ok(model) => {
                info!(meshes = model.meshes.len(), "garment loaded");
                self.install_model(root, model.meshes, model.textures, false)?;
            }
            Err(err) => {
                warn!(%err, "garment failed to load; using placeholder");
                let meshes = placeholder_garment(&mut self.scene, root)?;
                self.install_model(root, meshes, Vec::new(), true)?;
            }
        }
        self.recompute()
    }

    /// Replace the current garment with the placeholder.
    pub fn load_placeholder(&mut self, reason: &str) -> Result<PlacementStatus, SessionError> {
        warn!(reason, "showing placeholder garment");
        self.unload()?;
        let root = self.add_model_root()?;
        let meshes = placeholder_garment(&mut self.scene, root)?;
        self.install_model(root, meshes, Vec::new(), true)?;
        self.recompute()
    }

    fn add_model_root(&mut self) -> Result<NodeId, SceneError> {
        let scene_root = self.scene.root();
        let local = Matrix4::new_translation(&Vector3::from(self.config.model_position));
        self.scene.add_group(scene_root, "model", local)
    }

    fn install_model(
        &mut self,
        root: NodeId,
        meshes: Vec<NodeId>,
        textures: Vec<TextureId>,
        placeholder: bool,
    ) -> Result<(), SessionError> {
        let partition = classify_meshes(
            &self.scene,
            &meshes,
            self.resolver.config().body_threshold,
        )?;
        self.model = Some(LoadedModel {
            root,
            meshes,
            partition,
            textures,
            placeholder,
        });
        self.apply_style()?;
        Ok(())
    }

    /// Remove the garment and everything placed on it.
    pub fn unload(&mut self) -> Result<(), SessionError> {
        self.clear_decal()?;
        self.painted.restore_all(&mut self.scene)?;
        self.painted.clear();
        self.orientation_override = None;
        if let Some(model) = self.model.take() {
            self.scene.dispose_subtree(model.root)?;
            for texture in model.textures {
                self.scene.dispose_texture(texture)?;
            }
            debug!("garment unloaded");
        }
        Ok(())
    }

    // ── Logo ─────────────────────────────────────────────────────────────

    /// Start a logo upload.
    pub fn begin_logo_load(&mut self) -> LogoTicket {
        self.logo_generation += 1;
        LogoTicket(self.logo_generation)
    }

    fn check_ticket(&self, ticket: LogoTicket) -> Result<(), SessionError> {
        let latest = self.logo_generation;
        if ticket.0 == 0 || ticket.0 > latest {
            return Err(SessionError::UnknownTicket { ticket: ticket.0 });
        }
        if ticket.0 < latest && self.config.discard_stale_loads {
            return Err(SessionError::StaleTicket {
                ticket: ticket.0,
                latest,
            });
        }
        Ok(())
    }

    /// Finish an upload with the encoded image. Stale tickets are rejected
    /// before decoding.
    #[instrument(skip(self, bytes), fields(len = bytes.len()))]
    pub fn complete_logo_load(
        &mut self,
        ticket: LogoTicket,
        bytes: &[u8],
    ) -> Result<PlacementStatus, SessionError> {
        self.check_ticket(ticket)?;
        let logo = LogoImage::decode(&mut self.scene, bytes)?;
        if let Err(err) = self.clear_decal() {
            logo.dispose(&mut self.scene)?;
            return Err(err);
        }
        if let Some(old) = self.logo.replace(logo) {
            old.dispose(&mut self.scene)?;
        }
        info!(width = logo.width(), height = logo.height(), "logo ready");
        self.recompute()
    }

    pub fn complete_logo_load_data_url(
        &mut self,
        ticket: LogoTicket,
        data_url: &str,
    ) -> Result<PlacementStatus, SessionError> {
        self.check_ticket(ticket)?;
        let bytes = decode_data_url(data_url)?;
        self.complete_logo_load(ticket, &bytes)
    }

    // ── Placement ────────────────────────────────────────────────────────

    /// Meshes eligible as the decal target: the body group, or every mesh
    /// when classification found no body.
    fn candidates(model: &LoadedModel) -> &[NodeId] {
        if model.partition.body.is_empty() {
            &model.meshes
        } else {
            &model.partition.body
        }
    }

    fn target_mesh(&self) -> Result<Option<NodeId>, SessionError> {
        let model = self.model.as_ref().ok_or(SessionError::NoModel)?;
        Ok(select_target(&self.scene, Self::candidates(model), self.side)?)
    }

    /// Dispose the current decal and place a new one from the current intent.
    /// `Ok(None)` when the garment has no mesh to place on.
    pub fn place_logo(&mut self, origin: PlacementOrigin) -> Result<Option<DecalSummary>, SessionError> {
        self.clear_decal()?;
        let model_root = self.model.as_ref().ok_or(SessionError::NoModel)?.root;
        let logo = self.logo.ok_or(SessionError::NoLogo)?;
        let Some(mesh) = self.target_mesh()? else {
            info!("no target mesh; nothing placed");
            return Ok(None);
        };

        let request = PlaceRequest {
            mesh,
            model_root,
            camera: &self.camera,
            intent: self.intent,
            logo: &logo,
            origin,
            orientation_override: self.orientation_override,
        };
        let (hit, result) = self.resolver.place(&mut self.scene, &mut self.painted, &request)?;
        self.finish_placement(hit, result).map(Some)
    }

    fn finish_placement(
        &mut self,
        hit: SurfaceHit,
        result: DecalResult,
    ) -> Result<DecalSummary, SessionError> {
        let summary = DecalSummary::describe(&self.scene, &hit, &result);
        self.decal = Some(PlacedDecal { result, hit });
        self.refresh_decal_vertices()?;
        Ok(summary?)
    }

    /// Re-run placement after any input change.
    pub fn recompute(&mut self) -> Result<PlacementStatus, SessionError> {
        match self.place_logo(PlacementOrigin::Recompute) {
            Ok(Some(decal)) => Ok(PlacementStatus::Placed(decal)),
            Ok(None) => Ok(PlacementStatus::Skipped {
                reason: "no target mesh".to_string(),
            }),
            Err(SessionError::NoModel) => Ok(PlacementStatus::Skipped {
                reason: SessionError::NoModel.to_string(),
            }),
            Err(SessionError::NoLogo) => Ok(PlacementStatus::Skipped {
                reason: SessionError::NoLogo.to_string(),
            }),
            Err(err) => Err(err),
        }
    }

    fn clear_decal(&mut self) -> Result<(), SessionError> {
        if let Some(previous) = self.decal.take() {
            dispose_decal(&mut self.scene, &self.painted, previous.result)?;
        }
        self.decal_vertices.clear();
        Ok(())
    }

    fn refresh_decal_vertices(&mut self) -> Result<(), SceneError> {
        self.decal_vertices.clear();
        let Some(node) = self.decal.as_ref().and_then(|d| d.result.visual_node()) else {
            return Ok(());
        };
        let world = self.scene.world_matrix(node)?;
        for p in self.scene.mesh_geometry(node)?.positions() {
            let w = world.transform_point(p);
            self.decal_vertices
                .extend([w.x as f32, w.y as f32, w.z as f32]);
        }
        Ok(())
    }

    /// Replace the intent and recompute. An invalid intent is rejected and
    /// the current one kept.
    pub fn set_intent(&mut self, intent: PlacementIntent) -> Result<PlacementStatus, SessionError> {
        if !intent.is_valid() {
            return Err(SessionError::InvalidIntent { intent });
        }
        self.intent = intent;
        self.recompute()
    }

    pub fn set_sliders(&mut self, x: f64, y: f64, size: f64) -> Result<PlacementStatus, SessionError> {
        self.set_intent(PlacementIntent::from_sliders(x, y, size))
    }

    pub fn set_side(&mut self, side: PlacementSide) -> Result<PlacementStatus, SessionError> {
        self.side = side;
        self.recompute()
    }

    /// Switch the garment cut. Returns whether sleeves are now visible.
    pub fn set_garment_style(&mut self, style: GarmentStyle) -> Result<bool, SessionError> {
        self.style = style;
        self.apply_style()?;
        Ok(style.shows_sleeves())
    }

    fn apply_style(&mut self) -> Result<(), SceneError> {
        let Some(model) = &self.model else {
            return Ok(());
        };
        let visible = self.style.shows_sleeves();
        for &sleeve in &model.partition.sleeves {
            self.scene.set_visible(sleeve, visible)?;
        }
        Ok(())
    }

    /// Returns the new aspect ratio.
    pub fn set_viewport(&mut self, width: u32, height: u32) -> f64 {
        self.camera.set_viewport(width, height);
        self.camera.aspect
    }

    pub fn reset_view(&mut self) {
        self.camera.reset_view();
    }

    /// Back to a fresh customization on the same garment: logo removed,
    /// painted meshes restored, intent and side at their defaults.
    #[instrument(skip_all)]
    pub fn reset(&mut self) -> Result<(), SessionError> {
        self.clear_decal()?;
        self.painted.restore_all(&mut self.scene)?;
        self.painted.clear();
        if let Some(logo) = self.logo.take() {
            logo.dispose(&mut self.scene)?;
        }
        self.intent = self.config.intent;
        self.side = self.config.side;
        self.orientation_override = None;
        self.drag.set_enabled(false);
        self.camera.reset_view();
        info!("session reset");
        Ok(())
    }

    // ── Drag ─────────────────────────────────────────────────────────────

    pub fn toggle_drag(&mut self, enabled: bool) {
        self.drag.set_enabled(enabled);
        debug!(enabled, "drag mode");
    }

    /// Pointer pressed at `ndc`. Starts a drag when drag mode is on and the
    /// pointer is over the target mesh.
    pub fn pointer_down(&mut self, ndc: Point2<f64>) -> Result<Option<DecalSummary>, SessionError> {
        if !self.drag.is_enabled() || self.logo.is_none() {
            return Ok(None);
        }
        let Some((mesh, hit)) = self.pick(ndc)? else {
            return Ok(None);
        };
        self.drag.begin();
        self.drag_to(mesh, hit).map(Some)
    }

    pub fn pointer_move(&mut self, ndc: Point2<f64>) -> Result<Option<DecalSummary>, SessionError> {
        if !self.drag.is_dragging() {
            return Ok(None);
        }
        match self.pick(ndc)? {
            Some((mesh, hit)) => self.drag_to(mesh, hit).map(Some),
            None => Ok(None),
        }
    }

    pub fn pointer_up(&mut self) {
        self.drag.end();
    }

    pub fn pointer_leave(&mut self) {
        self.drag.end();
    }

    /// Nearest hit on the target mesh under the pointer.
    fn pick(&self, ndc: Point2<f64>) -> Result<Option<(NodeId, RaycastHit)>, SessionError> {
        let Some(mesh) = self.target_mesh()? else {
            return Ok(None);
        };
        let Some(ray) = self.camera.ray_through_ndc(&ndc) else {
            return Ok(None);
        };
        Ok(self.scene.raycast(mesh, &ray)?.first().map(|hit| (mesh, *hit)))
    }

    /// Place the logo exactly where the pointer touches the garment and keep
    /// the intent in step so the next recompute lands on the same spot.
    fn drag_to(&mut self, mesh: NodeId, hit: RaycastHit) -> Result<DecalSummary, SessionError> {
        self.clear_decal()?;
        let model_root = self.model.as_ref().ok_or(SessionError::NoModel)?.root;
        let logo = self.logo.ok_or(SessionError::NoLogo)?;

        let world = self.scene.world_matrix(mesh)?;
        let inverse = world
            .try_inverse()
            .ok_or(SceneError::SingularTransform { id: mesh })?;
        let (x, y, _) = offsets_for_local_point(
            &self.scene.bounding_box(mesh)?,
            &inverse.transform_point(&hit.point),
        );
        self.intent.offset_x = x.clamp(-0.5, 0.5);
        self.intent.offset_y = y.clamp(-0.5, 0.5);
        self.orientation_override = Some(orient_to_normal(&hit.normal));

        let surface = SurfaceHit {
            point: hit.point,
            normal: hit.normal,
            uv: hit.uv,
            tier: CascadeTier::DirectProjection,
        };
        let result = place_decal(
            &mut self.scene,
            &mut self.painted,
            &DecalRequest {
                mesh,
                model_root,
                hit: surface,
                logo: &logo,
                size_factor: self.intent.size_factor,
                origin: PlacementOrigin::Drag,
                orientation_override: None,
            },
            &self.resolver.config().decal,
        );
        self.finish_placement(surface, result)
    }

    pub fn orbit_enabled(&self) -> bool {
        self.drag.orbit_enabled()
    }

    // ── Output ───────────────────────────────────────────────────────────

    /// PNG encoding of the current baked texture, if the logo is baked.
    pub fn baked_texture_png(&self) -> Result<Option<Vec<u8>>, SessionError> {
        let Some(DecalResult::Baked { texture, .. }) = self.decal.as_ref().map(|d| &d.result) else {
            return Ok(None);
        };
        let mut png = Cursor::new(Vec::new());
        self.scene
            .texture(*texture)?
            .write_to(&mut png, ImageFormat::Png)
            .map_err(|e| SessionError::Encode {
                reason: e.to_string(),
            })?;
        Ok(Some(png.into_inner()))
    }

    pub fn decal_vertices(&self) -> &[f32] {
        &self.decal_vertices
    }

    // ── Accessors ────────────────────────────────────────────────────────

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn camera(&self) -> &PerspectiveCamera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut PerspectiveCamera {
        &mut self.camera
    }

    pub fn painted(&self) -> &PaintedMaterials {
        &self.painted
    }

    pub fn intent(&self) -> PlacementIntent {
        self.intent
    }

    pub fn side(&self) -> PlacementSide {
        self.side
    }

    pub fn style(&self) -> GarmentStyle {
        self.style
    }

    pub fn logo(&self) -> Option<&LogoImage> {
        self.logo.as_ref()
    }

    pub fn drag(&self) -> &DragState {
        &self.drag
    }

    pub fn orientation_override(&self) -> Option<UnitQuaternion<f64>> {
        self.orientation_override
    }

    pub fn decal(&self) -> Option<&DecalResult> {
        self.decal.as_ref().map(|d| &d.result)
    }

    pub fn last_hit(&self) -> Option<&SurfaceHit> {
        self.decal.as_ref().map(|d| &d.hit)
    }

    pub fn model_root(&self) -> Option<NodeId> {
        self.model.as_ref().map(|m| m.root)
    }

    pub fn model_meshes(&self) -> &[NodeId] {
        self.model.as_ref().map_or(&[], |m| m.meshes.as_slice())
    }

    pub fn sleeves(&self) -> &[NodeId] {
        self.model.as_ref().map_or(&[], |m| m.partition.sleeves.as_slice())
    }

    pub fn is_placeholder(&self) -> bool {
        self.model.as_ref().is_some_and(|m| m.placeholder)
    }

    /// Mesh the logo would be placed on right now.
    pub fn current_target(&self) -> Result<Option<NodeId>, SessionError> {
        self.target_mesh()
    }
}

impl Default for CustomizerSession {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AssetMesh, AssetTransform};
    use image::{Rgba, RgbaImage};

    fn png(width: u32, height: u32) -> Vec<u8> {
        let mut bytes = Cursor::new(Vec::new());
        RgbaImage::from_pixel(width, height, Rgba([10, 200, 10, 255]))
            .write_to(&mut bytes, ImageFormat::Png)
            .unwrap();
        bytes.into_inner()
    }

    fn panel() -> ModelAsset {
        ModelAsset {
            name: "panel".into(),
            meshes: vec![AssetMesh {
                name: "body".into(),
                vertices: vec![-0.3, 0.6, 0.0, 0.3, 0.6, 0.0, -0.5, -0.6, 0.0, 0.5, -0.6, 0.0],
                normals: None,
                uvs: Some(vec![0.2, 1.0, 0.8, 1.0, 0.0, 0.0, 1.0, 0.0]),
                indices: Some(vec![0, 2, 3, 0, 3, 1]),
                transform: AssetTransform::default(),
                materials: vec![Default::default()],
            }],
        }
    }

    #[test]
    fn new_logo_is_freed_when_clearing_the_old_decal_fails() {
        let mut s = CustomizerSession::new(SessionConfig {
            model_position: [0.0; 3],
            ..SessionConfig::default()
        });
        s.load_model(&panel()).unwrap();
        let ticket = s.begin_logo_load();
        s.complete_logo_load(ticket, &png(8, 4)).unwrap();

        let Some(DecalResult::Baked { texture, .. }) = s.decal() else {
            panic!("expected bake, got {:?}", s.decal());
        };
        let texture = *texture;
        // Freeing the baked texture behind the decal's back makes disposal fail.
        s.scene.dispose_texture(texture).unwrap();
        let textures = s.scene.resource_counts().textures;

        let ticket = s.begin_logo_load();
        assert!(s.complete_logo_load(ticket, &png(4, 4)).is_err());
        assert_eq!(s.scene.resource_counts().textures, textures);
        assert_eq!(s.logo().map(|l| l.width()), Some(8));
    }
}
