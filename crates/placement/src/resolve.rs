use garment_types::PlacementIntent;
use nalgebra::UnitQuaternion;
use scene_kernel::{NodeId, PerspectiveCamera, Scene, SceneError, SceneQuery};
use tracing::instrument;

use crate::cascade::{CascadeContext, RaycastCascade};
use crate::config::PlacementConfig;
use crate::decal::{place_decal, DecalRequest, DecalResult, LogoImage};
use crate::local_point::local_point;
use crate::snapshot::PaintedMaterials;
use crate::types::{PlacementError, PlacementOrigin, SurfaceHit};

/// One placement: where the logo goes and what it looks like.
#[derive(Debug, Clone)]
pub struct PlaceRequest<'a> {
    pub mesh: NodeId,
    pub model_root: NodeId,
    pub camera: &'a PerspectiveCamera,
    pub intent: PlacementIntent,
    pub logo: &'a LogoImage,
    pub origin: PlacementOrigin,
    pub orientation_override: Option<UnitQuaternion<f64>>,
}

/// Surface placement resolver: intent mapping, raycast cascade and decal
/// decision behind one call.
pub struct Resolver {
    config: PlacementConfig,
    cascade: RaycastCascade,
}

impl Resolver {
    pub fn new(config: PlacementConfig) -> Self {
        Self {
            config,
            cascade: RaycastCascade::standard(),
        }
    }

    /// Use a custom strategy list.
    pub fn with_cascade(mut self, cascade: RaycastCascade) -> Self {
        self.cascade = cascade;
        self
    }

    pub fn config(&self) -> &PlacementConfig {
        &self.config
    }

    /// Resolve an intent to a surface point on `mesh`. Only scene lookups on
    /// the mesh itself can fail; geometric misses fall through to the floor.
    #[instrument(skip(self, scene, camera))]
    pub fn resolve_hit(
        &self,
        scene: &dyn SceneQuery,
        mesh: NodeId,
        camera: &PerspectiveCamera,
        intent: &PlacementIntent,
    ) -> Result<SurfaceHit, SceneError> {
        let bbox = scene.bounding_box(mesh)?;
        let local = local_point(&bbox, intent, self.config.neckline_ratio);
        let ctx = CascadeContext::new(scene, mesh, camera, local, &self.config.cascade)?;
        Ok(self.cascade.resolve(&ctx))
    }

    /// Resolve the surface point and build the decal there.
    pub fn place(
        &self,
        scene: &mut Scene,
        painted: &mut PaintedMaterials,
        request: &PlaceRequest<'_>,
    ) -> Result<(SurfaceHit, DecalResult), PlacementError> {
        let hit = self.resolve_hit(&*scene, request.mesh, request.camera, &request.intent)?;
        let decal = place_decal(
            scene,
            painted,
            &DecalRequest {
                mesh: request.mesh,
                model_root: request.model_root,
                hit,
                logo: request.logo,
                size_factor: request.intent.size_factor,
                origin: request.origin,
                orientation_override: request.orientation_override,
            },
            &self.config.decal,
        );
        Ok((hit, decal))
    }
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new(PlacementConfig::default())
    }
}
