use std::cell::Cell;

use approx::assert_relative_eq;
use garment_types::{PlacementIntent, PlacementSide};
use nalgebra::{Matrix4, Point3, UnitQuaternion, Vector3};
use placement::{
    select_target, CascadeTier, PlaceRequest, PaintedMaterials, PlacementOrigin, Resolver,
};
use placement::{decal::dispose_decal, LogoImage};
use proptest::prelude::*;
use scene_kernel::math::compose;
use scene_kernel::{
    FaceSide, Geometry, Material, NodeId, PerspectiveCamera, Ray, RaycastHit, Scene, SceneError,
    SceneQuery,
};

/// Scene wrapper that turns the first `misses` raycasts (and any ray the
/// filter rejects) into misses.
struct Scripted<'a> {
    inner: &'a Scene,
    misses: Cell<usize>,
    accept: fn(&Ray) -> bool,
}

impl<'a> Scripted<'a> {
    fn miss_first(inner: &'a Scene, misses: usize) -> Self {
        Self {
            inner,
            misses: Cell::new(misses),
            accept: |_| true,
        }
    }

    fn filtered(inner: &'a Scene, accept: fn(&Ray) -> bool) -> Self {
        Self {
            inner,
            misses: Cell::new(0),
            accept,
        }
    }
}

impl SceneQuery for Scripted<'_> {
    fn world_matrix(&self, id: NodeId) -> Result<Matrix4<f64>, SceneError> {
        self.inner.world_matrix(id)
    }

    fn mesh_geometry(&self, id: NodeId) -> Result<&Geometry, SceneError> {
        self.inner.mesh_geometry(id)
    }

    fn mesh_materials(&self, id: NodeId) -> Result<Vec<&Material>, SceneError> {
        self.inner.mesh_materials(id)
    }

    fn raycast(&self, id: NodeId, ray: &Ray) -> Result<Vec<RaycastHit>, SceneError> {
        if self.misses.get() > 0 {
            self.misses.set(self.misses.get() - 1);
            return Ok(Vec::new());
        }
        if !(self.accept)(ray) {
            return Ok(Vec::new());
        }
        self.inner.raycast(id, ray)
    }
}

fn add_mesh(scene: &mut Scene, geometry: Geometry, local: Matrix4<f64>) -> NodeId {
    let g = scene.insert_geometry(geometry);
    let m = scene.insert_material(Material::standard().with_side(FaceSide::Double));
    let root = scene.root();
    scene.add_mesh(root, "panel", local, g, vec![m]).unwrap()
}

fn centered_plane(scene: &mut Scene) -> NodeId {
    add_mesh(scene, Geometry::plane(1.0, 1.0), Matrix4::identity())
}

fn box_geometry(center: Point3<f64>, half: Vector3<f64>) -> Geometry {
    let corners: Vec<_> = (0..8)
        .map(|i| {
            Point3::new(
                center.x + if i & 1 == 0 { -half.x } else { half.x },
                center.y + if i & 2 == 0 { -half.y } else { half.y },
                center.z + if i & 4 == 0 { -half.z } else { half.z },
            )
        })
        .collect();
    Geometry::new(corners)
}

// ── Cascade Tiers ──────────────────────────────────────────────────────────

#[test]
fn direct_projection_reports_uv() {
    let mut scene = Scene::new();
    let mesh = centered_plane(&mut scene);
    let camera = PerspectiveCamera::default();

    let hit = Resolver::default()
        .resolve_hit(&scene, mesh, &camera, &PlacementIntent::new(0.1, -0.2, 0.0, 0.5))
        .unwrap();

    assert_eq!(hit.tier, CascadeTier::DirectProjection);
    assert_relative_eq!(hit.point, Point3::new(0.1, -0.2, 0.0), epsilon = 1e-9);
    let uv = hit.uv.expect("direct projection keeps the uv");
    assert_relative_eq!(uv.x, 0.6, epsilon = 1e-9);
    assert_relative_eq!(uv.y, 0.3, epsilon = 1e-9);
}

#[test]
fn camera_to_point_follows_a_direct_miss() {
    let mut scene = Scene::new();
    let mesh = centered_plane(&mut scene);
    let scripted = Scripted::miss_first(&scene, 1);

    let hit = Resolver::default()
        .resolve_hit(&scripted, mesh, &PerspectiveCamera::default(), &PlacementIntent::default())
        .unwrap();

    assert_eq!(hit.tier, CascadeTier::CameraToPoint);
    assert!(hit.uv.is_none());
}

#[test]
fn downward_ray_finds_horizontal_panel() {
    let mut scene = Scene::new();
    // Plane turned to face +Y.
    let rotation = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), -std::f64::consts::FRAC_PI_2);
    let mesh = add_mesh(
        &mut scene,
        Geometry::plane(1.0, 1.0),
        compose(&Vector3::zeros(), &rotation, &Vector3::repeat(1.0)),
    );
    let scripted = Scripted::filtered(&scene, |ray| ray.direction.y < -0.999);

    let hit = Resolver::default()
        .resolve_hit(&scripted, mesh, &PerspectiveCamera::default(), &PlacementIntent::default())
        .unwrap();

    assert_eq!(hit.tier, CascadeTier::Downward);
    assert_relative_eq!(hit.point, Point3::origin(), epsilon = 1e-9);
    assert_relative_eq!(hit.normal.y.abs(), 1.0, epsilon = 1e-9);
}

#[test]
fn grid_scan_samples_until_the_surface() {
    let mut scene = Scene::new();
    // Two stray vertices widen the bounds beyond the panel itself.
    let plane = Geometry::plane(1.0, 1.0);
    let mut positions = plane.positions().to_vec();
    positions.push(Point3::new(-1.0, -1.0, 0.0));
    positions.push(Point3::new(1.0, 1.0, 0.0));
    let geometry = Geometry::new(positions)
        .with_indices(plane.indices().unwrap().to_vec())
        .unwrap();
    let mesh = add_mesh(&mut scene, geometry, Matrix4::identity());
    let scripted = Scripted::miss_first(&scene, 3);

    let hit = Resolver::default()
        .resolve_hit(&scripted, mesh, &PerspectiveCamera::default(), &PlacementIntent::default())
        .unwrap();

    assert_eq!(hit.tier, CascadeTier::GridScan);
    // Third column, third row: the first sample inside the panel.
    assert_relative_eq!(hit.point.x, -1.0 / 3.0, epsilon = 1e-9);
    assert_relative_eq!(hit.point.y, -1.0 / 3.0, epsilon = 1e-9);
}

#[test]
fn vertex_snap_takes_first_nearest_vertex() {
    let mut scene = Scene::new();
    let mesh = centered_plane(&mut scene);
    let scripted = Scripted::filtered(&scene, |_| false);

    // Equidistant from (0.5, 0.5) and (0.5, -0.5); the first in vertex order wins.
    let hit = Resolver::default()
        .resolve_hit(
            &scripted,
            mesh,
            &PerspectiveCamera::default(),
            &PlacementIntent::new(0.5, 0.0, 0.0, 0.5),
        )
        .unwrap();

    assert_eq!(hit.tier, CascadeTier::VertexSnap);
    assert_relative_eq!(hit.point, Point3::new(0.5, 0.5, 0.0), epsilon = 1e-12);
    assert_relative_eq!(hit.normal.z, 1.0, epsilon = 1e-12);
}

#[test]
fn vertex_snap_without_normals_faces_the_camera() {
    let mut scene = Scene::new();
    let mesh = add_mesh(
        &mut scene,
        Geometry::new(vec![Point3::new(0.0, 0.0, -1.0)]),
        Matrix4::identity(),
    );
    let hit = Resolver::default()
        .resolve_hit(&scene, mesh, &PerspectiveCamera::default(), &PlacementIntent::default())
        .unwrap();
    assert_eq!(hit.tier, CascadeTier::VertexSnap);
    assert_relative_eq!(hit.normal.z, 1.0, epsilon = 1e-12);
}

#[test]
fn empty_mesh_lands_on_the_floor() {
    let mut scene = Scene::new();
    let mesh = add_mesh(&mut scene, Geometry::new(Vec::new()), Matrix4::identity());
    let hit = Resolver::default()
        .resolve_hit(&scene, mesh, &PerspectiveCamera::default(), &PlacementIntent::default())
        .unwrap();
    assert_eq!(hit.tier, CascadeTier::Floor);
    assert_eq!(hit.point, Point3::origin());
    assert_eq!(hit.normal, Vector3::z_axis());
}

// ── Target Selection ───────────────────────────────────────────────────────

#[test]
fn front_and_back_pick_extreme_z() {
    let mut scene = Scene::new();
    let meshes: Vec<_> = [1.0, -1.0, 0.3]
        .iter()
        .map(|&z| {
            add_mesh(
                &mut scene,
                Geometry::plane(1.0, 1.0),
                Matrix4::new_translation(&Vector3::new(0.0, 0.0, z)),
            )
        })
        .collect();

    assert_eq!(
        select_target(&scene, &meshes, PlacementSide::Front).unwrap(),
        Some(meshes[0])
    );
    assert_eq!(
        select_target(&scene, &meshes, PlacementSide::Back).unwrap(),
        Some(meshes[1])
    );
}

#[test]
fn any_side_picks_largest_volume_and_keeps_first_on_ties() {
    let mut scene = Scene::new();
    let small = add_mesh(
        &mut scene,
        box_geometry(Point3::origin(), Vector3::repeat(0.1)),
        Matrix4::identity(),
    );
    let big_a = add_mesh(
        &mut scene,
        box_geometry(Point3::origin(), Vector3::repeat(0.5)),
        Matrix4::identity(),
    );
    let big_b = add_mesh(
        &mut scene,
        box_geometry(Point3::new(2.0, 0.0, 0.0), Vector3::repeat(0.5)),
        Matrix4::identity(),
    );
    assert_eq!(
        select_target(&scene, &[small, big_a, big_b], PlacementSide::Any).unwrap(),
        Some(big_a)
    );
}

#[test]
fn no_candidates_selects_nothing() {
    let scene = Scene::new();
    assert_eq!(select_target(&scene, &[], PlacementSide::Front).unwrap(), None);
}

// ── Resource Stability ─────────────────────────────────────────────────────

#[test]
fn repeated_placement_keeps_resource_counts_stable() {
    let mut scene = Scene::new();
    let mesh = centered_plane(&mut scene);
    let logo = LogoImage::insert(&mut scene, image::RgbaImage::new(8, 4)).unwrap();
    let camera = PerspectiveCamera::default();
    let resolver = Resolver::default();
    let mut painted = PaintedMaterials::new();

    let mut counts = Vec::new();
    let mut previous = None;
    for _ in 0..5 {
        if let Some(result) = previous.take() {
            dispose_decal(&mut scene, &painted, result).unwrap();
        }
        let request = PlaceRequest {
            mesh,
            model_root: scene.root(),
            camera: &camera,
            intent: PlacementIntent::default(),
            logo: &logo,
            origin: PlacementOrigin::Recompute,
            orientation_override: None,
        };
        let (_, result) = resolver.place(&mut scene, &mut painted, &request).unwrap();
        assert!(result.is_baked());
        previous = Some(result);
        counts.push(scene.resource_counts());
    }
    assert!(counts.windows(2).all(|w| w[0] == w[1]), "{counts:?}");
    assert_eq!(painted.len(), 1);
}

// ── Properties ─────────────────────────────────────────────────────────────

fn arb_camera() -> impl Strategy<Value = PerspectiveCamera> {
    (-5.0f64..5.0, -5.0f64..5.0, -5.0f64..5.0).prop_map(|(x, y, z)| PerspectiveCamera {
        position: Point3::new(x, y, z),
        ..PerspectiveCamera::default()
    })
}

fn arb_triangle() -> impl Strategy<Value = Vec<Point3<f64>>> {
    prop::collection::vec(
        (-1.0f64..1.0, -1.0f64..1.0, -1.0f64..1.0).prop_map(|(x, y, z)| Point3::new(x, y, z)),
        3..=12,
    )
    .prop_map(|mut points| {
        points.truncate(points.len() / 3 * 3);
        points
    })
}

proptest! {
    #[test]
    fn cascade_always_yields_a_finite_point(
        camera in arb_camera(),
        points in arb_triangle(),
        ox in -0.5f64..=0.5,
        oy in -0.5f64..=0.5,
    ) {
        let mut scene = Scene::new();
        let mesh = add_mesh(&mut scene, Geometry::new(points), Matrix4::identity());
        let hit = Resolver::default()
            .resolve_hit(&scene, mesh, &camera, &PlacementIntent::new(ox, oy, 0.0, 0.5))
            .unwrap();
        prop_assert!(hit.point.coords.iter().all(|c| c.is_finite()));
        prop_assert!((hit.normal.norm() - 1.0).abs() < 1e-9);
    }
}
