//! Surface placement: maps a 2D placement intent onto an arbitrary garment
//! mesh and turns the resolved surface point into a baked texture or an
//! attached decal.

pub mod bake;
pub mod cascade;
pub mod clip;
pub mod classify;
pub mod config;
pub mod decal;
pub mod local_point;
pub mod resolve;
pub mod snapshot;
pub mod target;
pub mod types;

pub use cascade::{CascadeContext, PlacementStrategy, RaycastCascade};
pub use classify::{classify_meshes, MeshPartition};
pub use config::{CascadeConfig, DecalConfig, PlacementConfig};
pub use decal::{dispose_decal, place_decal, AttachedShape, DecalRequest, DecalResult, LogoImage};
pub use resolve::{PlaceRequest, Resolver};
pub use snapshot::PaintedMaterials;
pub use target::select_target;
pub use types::*;
