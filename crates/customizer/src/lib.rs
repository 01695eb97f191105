//! Customizer session and browser bridge.
//!
//! Owns the scene, the garment, the uploaded logo and the current decal, and
//! exposes them to the storefront page through a JSON message protocol.

pub mod config;
pub mod dispatch;
pub mod drag;
pub mod messages;
pub mod model;
pub mod session;

#[cfg(target_arch = "wasm32")]
mod wasm_api;

pub use config::SessionConfig;
pub use dispatch::{dispatch, process_json};
pub use drag::DragState;
pub use messages::{DecalSummary, SessionToUi, UiToSession};
pub use model::{AssetMaterial, AssetMesh, AssetTransform, ModelAsset};
pub use session::{CustomizerSession, LogoTicket, PlacementStatus, SessionError};
