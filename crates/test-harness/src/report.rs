//! Structured text reports of a session's scene.
//!
//! Plain text rather than JSON so a failing test can print it as-is.

use std::fmt;

use placement::DecalResult;
use scene_kernel::{ResourceCounts, SceneQuery};

use crate::helpers::HarnessError;
use crate::workflow::SessionDriver;

/// Snapshot of what the session holds.
pub struct SessionReport {
    pub counts: ResourceCounts,
    pub meshes: Vec<MeshEntry>,
    pub placeholder: bool,
    pub logo: Option<(u32, u32)>,
    pub decal: String,
    pub painted: usize,
    pub orbit_enabled: bool,
}

/// One garment mesh.
pub struct MeshEntry {
    pub name: String,
    pub triangles: usize,
    pub has_uvs: bool,
    pub visible: bool,
    pub materials: usize,
    pub painted: bool,
}

impl SessionReport {
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        out.push_str("=== Customizer Session Report ===\n\n");

        let kind = if self.placeholder { "placeholder" } else { "garment" };
        out.push_str(&format!("Model: {} ({} meshes)\n", kind, self.meshes.len()));
        for mesh in &self.meshes {
            let mut flags = Vec::new();
            if mesh.has_uvs {
                flags.push("uv");
            }
            if !mesh.visible {
                flags.push("hidden");
            }
            if mesh.painted {
                flags.push("painted");
            }
            out.push_str(&format!(
                "  \"{}\": {} triangles, {} materials [{}]\n",
                mesh.name,
                mesh.triangles,
                mesh.materials,
                flags.join(", "),
            ));
        }

        match self.logo {
            Some((w, h)) => out.push_str(&format!("\nLogo: {}x{}\n", w, h)),
            None => out.push_str("\nLogo: none\n"),
        }
        out.push_str(&format!("Decal: {}\n", self.decal));
        out.push_str(&format!("Painted records: {}\n", self.painted));
        out.push_str(&format!(
            "Orbit: {}\n",
            if self.orbit_enabled { "on" } else { "suspended" }
        ));

        let c = &self.counts;
        out.push_str(&format!(
            "\nResources: {} nodes, {} geometries, {} materials, {} textures\n",
            c.nodes, c.geometries, c.materials, c.textures,
        ));
        out
    }
}

impl fmt::Display for SessionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_text())
    }
}

impl SessionDriver {
    /// Generate a report of the current session.
    pub fn report(&self) -> Result<SessionReport, HarnessError> {
        let session = &self.session;
        let scene = session.scene();
        let mut meshes = Vec::new();
        for &id in session.model_meshes() {
            let node = scene.node(id).map_err(session_error)?;
            let geometry = scene.mesh_geometry(id).map_err(session_error)?;
            meshes.push(MeshEntry {
                name: node.name.clone(),
                triangles: geometry.triangle_count(),
                has_uvs: geometry.has_uvs(),
                visible: node.visible,
                materials: node.mesh.as_ref().map_or(0, |m| m.materials.len()),
                painted: session.painted().contains(id),
            });
        }

        let decal = match (session.decal(), session.last_hit()) {
            (Some(DecalResult::Baked { .. }), Some(hit)) => format!("baked via {:?}", hit.tier),
            (Some(DecalResult::PlaneAttached { shape, .. }), Some(hit)) => {
                format!("{:?} via {:?}", shape, hit.tier)
            }
            (Some(DecalResult::Failed { reason }), _) => format!("failed: {reason}"),
            _ => "none".to_string(),
        };

        Ok(SessionReport {
            counts: scene.resource_counts(),
            meshes,
            placeholder: session.is_placeholder(),
            logo: session.logo().map(|l| (l.width(), l.height())),
            decal,
            painted: session.painted().len(),
            orbit_enabled: session.orbit_enabled(),
        })
    }
}

fn session_error(e: scene_kernel::SceneError) -> HarnessError {
    HarnessError::Session(e.into())
}
