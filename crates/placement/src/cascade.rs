//! Raycast cascade: an ordered list of placement strategies evaluated until
//! one finds the surface, with an infallible floor behind them.

use nalgebra::{Matrix4, Point2, Point3, Unit, Vector3};
use scene_kernel::math::{direction_or, transform_normal};
use scene_kernel::{Aabb, NodeId, PerspectiveCamera, Ray, RaycastHit, SceneError, SceneQuery};
use tracing::{debug, instrument, warn};

use crate::config::CascadeConfig;
use crate::types::{CascadeTier, SurfaceHit};

/// Everything a strategy needs to look for the surface near a target point.
pub struct CascadeContext<'a> {
    pub scene: &'a dyn SceneQuery,
    pub mesh: NodeId,
    pub camera: &'a PerspectiveCamera,
    pub config: &'a CascadeConfig,
    /// Local bounding box of the mesh geometry.
    pub bbox: Aabb,
    /// Mesh local-to-world transform.
    pub world: Matrix4<f64>,
    pub local_point: Point3<f64>,
    pub world_point: Point3<f64>,
}

impl<'a> CascadeContext<'a> {
    pub fn new(
        scene: &'a dyn SceneQuery,
        mesh: NodeId,
        camera: &'a PerspectiveCamera,
        local_point: Point3<f64>,
        config: &'a CascadeConfig,
    ) -> Result<Self, SceneError> {
        let bbox = scene.bounding_box(mesh)?;
        let world = scene.world_matrix(mesh)?;
        Ok(Self {
            scene,
            mesh,
            camera,
            config,
            bbox,
            world,
            local_point,
            world_point: world.transform_point(&local_point),
        })
    }

    /// Nearest hit of `ray` on the target mesh. Degenerate rays and scene
    /// errors count as misses.
    pub fn cast(&self, ray: Option<Ray>) -> Option<RaycastHit> {
        let ray = ray?;
        match self.scene.raycast(self.mesh, &ray) {
            Ok(hits) => hits.into_iter().next(),
            Err(err) => {
                debug!(%err, "raycast failed; treating as miss");
                None
            }
        }
    }

    /// Project a world point through the camera and cast along that pixel.
    pub fn cast_through_screen(&self, world: &Point3<f64>) -> Option<RaycastHit> {
        let ndc = self.camera.project(world);
        if !ndc.x.is_finite() || !ndc.y.is_finite() {
            return None;
        }
        self.cast(self.camera.ray_through_ndc(&Point2::new(ndc.x, ndc.y)))
    }

    fn surface_hit(&self, hit: RaycastHit, tier: CascadeTier) -> SurfaceHit {
        SurfaceHit {
            point: hit.point,
            normal: hit.normal,
            uv: None,
            tier,
        }
    }
}

/// One way of finding the surface near the target point.
pub trait PlacementStrategy {
    fn tier(&self) -> CascadeTier;

    fn attempt(&self, ctx: &CascadeContext<'_>) -> Option<SurfaceHit>;
}

/// Camera ray through the target point's screen position. The only tier
/// that keeps the hit's UV.
pub struct DirectProjection;

impl PlacementStrategy for DirectProjection {
    fn tier(&self) -> CascadeTier {
        CascadeTier::DirectProjection
    }

    fn attempt(&self, ctx: &CascadeContext<'_>) -> Option<SurfaceHit> {
        let hit = ctx.cast_through_screen(&ctx.world_point)?;
        Some(SurfaceHit {
            uv: hit.uv,
            ..ctx.surface_hit(hit, self.tier())
        })
    }
}

/// Ray from the camera position straight at the target point.
pub struct CameraToPoint;

impl PlacementStrategy for CameraToPoint {
    fn tier(&self) -> CascadeTier {
        CascadeTier::CameraToPoint
    }

    fn attempt(&self, ctx: &CascadeContext<'_>) -> Option<SurfaceHit> {
        let hit = ctx.cast(ctx.camera.ray_toward(&ctx.world_point))?;
        Some(ctx.surface_hit(hit, self.tier()))
    }
}

/// Ray straight down from above the target point.
pub struct Downward;

impl PlacementStrategy for Downward {
    fn tier(&self) -> CascadeTier {
        CascadeTier::Downward
    }

    fn attempt(&self, ctx: &CascadeContext<'_>) -> Option<SurfaceHit> {
        let lift = ctx
            .config
            .downward_min_lift
            .max((ctx.camera.position.y - ctx.world_point.y) * ctx.config.downward_lift_factor);
        let origin = ctx.world_point + Vector3::new(0.0, lift, 0.0);
        let hit = ctx.cast(Ray::new(origin, -Vector3::y()))?;
        Some(ctx.surface_hit(hit, self.tier()))
    }
}

/// Screen-space probes over an evenly spaced grid across the box's XY extent.
pub struct GridScan;

impl PlacementStrategy for GridScan {
    fn tier(&self) -> CascadeTier {
        CascadeTier::GridScan
    }

    fn attempt(&self, ctx: &CascadeContext<'_>) -> Option<SurfaceHit> {
        if ctx.bbox.is_empty() {
            return None;
        }
        let n = ctx.config.grid_resolution.max(2);
        let size = ctx.bbox.size();
        let step_x = size.x / (n - 1) as f64;
        let step_y = size.y / (n - 1) as f64;
        for i in 0..n {
            for j in 0..n {
                let sample = Point3::new(
                    ctx.bbox.min.x + i as f64 * step_x,
                    ctx.bbox.min.y + j as f64 * step_y,
                    ctx.local_point.z,
                );
                let world = ctx.world.transform_point(&sample);
                if let Some(hit) = ctx.cast_through_screen(&world) {
                    debug!(i, j, "grid scan hit");
                    return Some(ctx.surface_hit(hit, self.tier()));
                }
            }
        }
        None
    }
}

/// Nearest mesh vertex to the target point. Never misses on a non-empty mesh.
pub struct VertexSnap;

impl PlacementStrategy for VertexSnap {
    fn tier(&self) -> CascadeTier {
        CascadeTier::VertexSnap
    }

    fn attempt(&self, ctx: &CascadeContext<'_>) -> Option<SurfaceHit> {
        let geometry = ctx.scene.mesh_geometry(ctx.mesh).ok()?;
        let mut closest: Option<(usize, f64)> = None;
        for (i, v) in geometry.positions().iter().enumerate() {
            let d2 = (v - ctx.local_point).norm_squared();
            if closest.map_or(true, |(_, best)| d2 < best) {
                closest = Some((i, d2));
            }
        }
        let (index, _) = closest?;

        let point = ctx.world.transform_point(&geometry.positions()[index]);
        let normal = geometry
            .normals()
            .and_then(|normals| transform_normal(&ctx.world, &normals[index]))
            .unwrap_or_else(|| direction_or(&point, &ctx.camera.position, Vector3::z_axis()));
        debug!(index, "snapped to vertex");
        Some(SurfaceHit {
            point,
            normal,
            uv: None,
            tier: self.tier(),
        })
    }
}

/// Ordered strategies with a first-success combinator.
pub struct RaycastCascade {
    strategies: Vec<Box<dyn PlacementStrategy>>,
}

impl RaycastCascade {
    pub fn new(strategies: Vec<Box<dyn PlacementStrategy>>) -> Self {
        Self { strategies }
    }

    /// The five tiers in order: direct projection, camera-to-point, downward,
    /// grid scan, vertex snap.
    pub fn standard() -> Self {
        Self::new(vec![
            Box::new(DirectProjection),
            Box::new(CameraToPoint),
            Box::new(Downward),
            Box::new(GridScan),
            Box::new(VertexSnap),
        ])
    }

    pub fn tiers(&self) -> Vec<CascadeTier> {
        self.strategies.iter().map(|s| s.tier()).collect()
    }

    /// First strategy that finds the surface, or the floor.
    #[instrument(skip(self, ctx), fields(mesh = ?ctx.mesh))]
    pub fn resolve(&self, ctx: &CascadeContext<'_>) -> SurfaceHit {
        for strategy in &self.strategies {
            if let Some(hit) = strategy.attempt(ctx) {
                debug!(tier = ?hit.tier, "surface resolved");
                return hit;
            }
            debug!(tier = ?strategy.tier(), "tier missed");
        }
        warn!("every cascade tier missed; using bounding-box center");
        floor_hit(ctx)
    }
}

impl Default for RaycastCascade {
    fn default() -> Self {
        Self::standard()
    }
}

/// Bounding-box center facing the camera. Cannot fail.
pub fn floor_hit(ctx: &CascadeContext<'_>) -> SurfaceHit {
    let point = ctx.world.transform_point(&ctx.bbox.center());
    let normal: Unit<Vector3<f64>> = direction_or(&point, &ctx.camera.position, Vector3::z_axis());
    SurfaceHit {
        point,
        normal,
        uv: None,
        tier: CascadeTier::Floor,
    }
}
