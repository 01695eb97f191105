//! Helper functions: error type, garment assets, logo images.

use std::io::Cursor;

use customizer::model::encode_png_data_url;
use customizer::{AssetMaterial, AssetMesh, AssetTransform, ModelAsset};
use image::{ImageFormat, Rgba, RgbaImage};
use scene_kernel::{FaceSide, MaterialKind};

// ── Error Type ──────────────────────────────────────────────────────────────

/// Unified error type for the test harness.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error("dispatch error: {message}")]
    DispatchError { message: String },

    #[error("unexpected response to {request}: {response}")]
    UnexpectedResponse { request: String, response: String },

    #[error("assertion failed: {detail}")]
    AssertionFailed { detail: String },

    #[error("session error: {0}")]
    Session(#[from] customizer::SessionError),

    #[error("image error: {reason}")]
    Image { reason: String },
}

// ── Logos ───────────────────────────────────────────────────────────────────

/// Solid-color RGBA image encoded as PNG.
pub fn logo_png(width: u32, height: u32, color: [u8; 4]) -> Result<Vec<u8>, HarnessError> {
    let image = RgbaImage::from_pixel(width, height, Rgba(color));
    let mut bytes = Cursor::new(Vec::new());
    image
        .write_to(&mut bytes, ImageFormat::Png)
        .map_err(|e| HarnessError::Image {
            reason: e.to_string(),
        })?;
    Ok(bytes.into_inner())
}

/// The default test logo: a 16x8 opaque red banner, as a data URL.
pub fn logo_data_url() -> Result<String, HarnessError> {
    Ok(encode_png_data_url(&logo_png(16, 8, [220, 30, 30, 255])?))
}

// ── Garments ────────────────────────────────────────────────────────────────

pub fn material(kind: MaterialKind, side: FaceSide) -> AssetMaterial {
    AssetMaterial {
        kind,
        side,
        ..AssetMaterial::default()
    }
}

/// Axis-aligned quad in the XY plane at depth `z`, facing +Z.
pub fn quad(name: &str, min: [f32; 2], max: [f32; 2], z: f32, uvs: bool) -> AssetMesh {
    let [x0, y0] = min;
    let [x1, y1] = max;
    panel(name, [[x0, y1], [x1, y1], [x0, y0], [x1, y0]], z, uvs)
}

/// Four-corner panel at depth `z`, facing +Z. Corners are top-left,
/// top-right, bottom-left, bottom-right; the split runs from top-left to
/// bottom-right.
pub fn panel(name: &str, corners: [[f32; 2]; 4], z: f32, uvs: bool) -> AssetMesh {
    let vertices = corners.iter().flat_map(|&[x, y]| [x, y, z]).collect();
    AssetMesh {
        name: name.to_string(),
        vertices,
        normals: Some([0.0, 0.0, 1.0].repeat(4)),
        uvs: uvs.then(|| vec![0.0, 1.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0]),
        indices: Some(vec![0, 2, 3, 0, 3, 1]),
        transform: AssetTransform::default(),
        materials: vec![material(MaterialKind::Standard, FaceSide::Front)],
    }
}

/// Tapered torso panel; narrower at the shoulders so the center of its
/// bounding box is clear of the triangle split.
fn torso(name: &str, uvs: bool) -> AssetMesh {
    panel(name, [[-0.3, 0.6], [0.3, 0.6], [-0.5, -0.6], [0.5, -0.6]], 0.0, uvs)
}

/// Front torso, a double-sided back torso turned away from the camera, and
/// two sleeves. Everything is UV-mapped.
pub fn tshirt() -> ModelAsset {
    let mut back = torso("back", true);
    back.transform.translation = [0.0, 0.0, -0.3];
    back.transform.rotation = [0.0, 1.0, 0.0, 0.0];
    back.materials = vec![material(MaterialKind::Standard, FaceSide::Double)];
    ModelAsset {
        name: "tshirt".into(),
        meshes: vec![
            torso("front", true),
            back,
            quad("sleeve-left", [-0.9, 0.1], [-0.5, 0.5], -0.1, true),
            quad("sleeve-right", [0.5, 0.1], [0.9, 0.5], -0.1, true),
        ],
    }
}

/// Same shape as [`tshirt`] but without texture coordinates anywhere.
pub fn tshirt_without_uvs() -> ModelAsset {
    let mut asset = tshirt();
    for mesh in &mut asset.meshes {
        mesh.uvs = None;
    }
    asset.name = "tshirt-no-uv".into();
    asset
}

/// T-shirt whose front panel carries a 64x64 fabric texture.
pub fn textured_tshirt() -> Result<ModelAsset, HarnessError> {
    let fabric = encode_png_data_url(&logo_png(64, 64, [240, 240, 230, 255])?);
    let mut asset = tshirt();
    asset.meshes[0].materials[0].map = Some(fabric);
    asset.name = "tshirt-textured".into();
    Ok(asset)
}

/// T-shirt with a toon-shaded front panel that has no paintable map slot.
pub fn toon_tshirt() -> ModelAsset {
    let mut asset = tshirt();
    asset.meshes[0].materials[0].kind = MaterialKind::Other;
    asset.name = "tshirt-toon".into();
    asset
}
