//! Software scene substrate for garment decal placement.
//!
//! Provides just enough of a 3D scene graph to place decals on a garment:
//! meshes with cached bounds, materials and textures held in slot-map arenas,
//! world-transform-preserving attachment, a perspective camera, and CPU
//! ray-mesh intersection.

pub mod camera;
pub mod geometry;
pub mod material;
pub mod math;
pub mod raycast;
pub mod scene;
pub mod traits;
pub mod types;

pub use camera::PerspectiveCamera;
pub use geometry::Geometry;
pub use material::{FaceSide, Material, MaterialKind};
pub use scene::{Node, ResourceCounts, Scene};
pub use traits::SceneQuery;
pub use types::*;
