use std::cell::OnceCell;

use nalgebra::{Point2, Point3, Vector3};

use crate::types::{Aabb, SceneError};

/// Triangle mesh vertex data in the mesh's local space.
///
/// Normals, UVs and indices are optional, matching what arbitrary garment
/// assets actually ship with. The bounding box is computed on first access
/// and cached.
#[derive(Debug, Clone)]
pub struct Geometry {
    positions: Vec<Point3<f64>>,
    normals: Option<Vec<Vector3<f64>>>,
    uvs: Option<Vec<Point2<f64>>>,
    indices: Option<Vec<u32>>,
    bounds: OnceCell<Aabb>,
}

impl Geometry {
    pub fn new(positions: Vec<Point3<f64>>) -> Self {
        Self {
            positions,
            normals: None,
            uvs: None,
            indices: None,
            bounds: OnceCell::new(),
        }
    }

    pub fn with_normals(mut self, normals: Vec<Vector3<f64>>) -> Result<Self, SceneError> {
        self.check_len("normals", normals.len())?;
        self.normals = Some(normals);
        Ok(self)
    }

    pub fn with_uvs(mut self, uvs: Vec<Point2<f64>>) -> Result<Self, SceneError> {
        self.check_len("uvs", uvs.len())?;
        self.uvs = Some(uvs);
        Ok(self)
    }

    pub fn with_indices(mut self, indices: Vec<u32>) -> Result<Self, SceneError> {
        if let Some(&bad) = indices
            .iter()
            .find(|&&i| i as usize >= self.positions.len())
        {
            return Err(SceneError::IndexOutOfRange {
                index: bad,
                vertex_count: self.positions.len(),
            });
        }
        if indices.len() % 3 != 0 {
            return Err(SceneError::AttributeLength {
                attribute: "indices",
                expected: indices.len() - indices.len() % 3,
                actual: indices.len(),
            });
        }
        self.indices = Some(indices);
        Ok(self)
    }

    /// Build from flat `f32` buffers as they arrive from a browser asset loader.
    pub fn from_flat(
        vertices: &[f32],
        normals: Option<&[f32]>,
        uvs: Option<&[f32]>,
        indices: Option<&[u32]>,
    ) -> Result<Self, SceneError> {
        let vertex_count = vertices.len() / 3;
        check_stride("vertices", vertices, 3, vertex_count)?;
        let positions = vertices
            .chunks_exact(3)
            .map(|c| Point3::new(c[0] as f64, c[1] as f64, c[2] as f64))
            .collect();
        let mut geometry = Self::new(positions);

        if let Some(normals) = normals {
            check_stride("normals", normals, 3, vertex_count)?;
            let n = normals
                .chunks_exact(3)
                .map(|c| Vector3::new(c[0] as f64, c[1] as f64, c[2] as f64))
                .collect();
            geometry = geometry.with_normals(n)?;
        }
        if let Some(uvs) = uvs {
            check_stride("uvs", uvs, 2, vertex_count)?;
            let uv = uvs
                .chunks_exact(2)
                .map(|c| Point2::new(c[0] as f64, c[1] as f64))
                .collect();
            geometry = geometry.with_uvs(uv)?;
        }
        if let Some(indices) = indices {
            geometry = geometry.with_indices(indices.to_vec())?;
        }
        Ok(geometry)
    }

    /// A `width` x `height` quad in the XY plane facing +Z, centered on the origin.
    pub fn plane(width: f64, height: f64) -> Self {
        let (hw, hh) = (width * 0.5, height * 0.5);
        Self {
            positions: vec![
                Point3::new(-hw, hh, 0.0),
                Point3::new(hw, hh, 0.0),
                Point3::new(-hw, -hh, 0.0),
                Point3::new(hw, -hh, 0.0),
            ],
            normals: Some(vec![Vector3::z(); 4]),
            uvs: Some(vec![
                Point2::new(0.0, 1.0),
                Point2::new(1.0, 1.0),
                Point2::new(0.0, 0.0),
                Point2::new(1.0, 0.0),
            ]),
            indices: Some(vec![0, 2, 1, 2, 3, 1]),
            bounds: OnceCell::new(),
        }
    }

    fn check_len(&self, attribute: &'static str, actual: usize) -> Result<(), SceneError> {
        if actual != self.positions.len() {
            return Err(SceneError::AttributeLength {
                attribute,
                expected: self.positions.len(),
                actual,
            });
        }
        Ok(())
    }

    pub fn positions(&self) -> &[Point3<f64>] {
        &self.positions
    }

    pub fn normals(&self) -> Option<&[Vector3<f64>]> {
        self.normals.as_deref()
    }

    pub fn uvs(&self) -> Option<&[Point2<f64>]> {
        self.uvs.as_deref()
    }

    pub fn indices(&self) -> Option<&[u32]> {
        self.indices.as_deref()
    }

    pub fn has_uvs(&self) -> bool {
        self.uvs.is_some()
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Local-space bounding box, computed once.
    pub fn bounding_box(&self) -> &Aabb {
        self.bounds
            .get_or_init(|| Aabb::from_points(self.positions.iter()))
    }

    /// Vertex index triples, from the index buffer or consecutive vertices.
    pub fn triangles(&self) -> Vec<[usize; 3]> {
        match &self.indices {
            Some(indices) => indices
                .chunks_exact(3)
                .map(|c| [c[0] as usize, c[1] as usize, c[2] as usize])
                .collect(),
            None => (0..self.positions.len() / 3)
                .map(|t| [3 * t, 3 * t + 1, 3 * t + 2])
                .collect(),
        }
    }

    pub fn triangle_count(&self) -> usize {
        match &self.indices {
            Some(indices) => indices.len() / 3,
            None => self.positions.len() / 3,
        }
    }

    /// Flat `f32` position buffer for upload to the browser renderer.
    pub fn flat_positions(&self) -> Vec<f32> {
        self.positions
            .iter()
            .flat_map(|p| [p.x as f32, p.y as f32, p.z as f32])
            .collect()
    }
}

/// A flat buffer must hold exactly `stride` floats per vertex.
fn check_stride(
    attribute: &'static str,
    buffer: &[f32],
    stride: usize,
    vertex_count: usize,
) -> Result<(), SceneError> {
    if buffer.len() != vertex_count * stride {
        return Err(SceneError::AttributeLength {
            attribute,
            expected: vertex_count * stride,
            actual: buffer.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plane_faces_positive_z() {
        let plane = Geometry::plane(2.0, 1.0);
        let p = plane.positions();
        for [a, b, c] in plane.triangles() {
            let n = (p[b] - p[a]).cross(&(p[c] - p[a]));
            assert!(n.z > 0.0);
        }
        let bb = plane.bounding_box();
        assert_eq!(bb.min, Point3::new(-1.0, -0.5, 0.0));
        assert_eq!(bb.max, Point3::new(1.0, 0.5, 0.0));
    }

    #[test]
    fn attribute_length_mismatch_is_rejected() {
        let g = Geometry::new(vec![Point3::origin(); 3]);
        let err = g.with_uvs(vec![Point2::origin(); 2]).unwrap_err();
        assert!(matches!(err, SceneError::AttributeLength { attribute: "uvs", .. }));
    }

    #[test]
    fn out_of_range_index_is_rejected() {
        let g = Geometry::new(vec![Point3::origin(); 3]);
        assert!(matches!(
            g.with_indices(vec![0, 1, 3]),
            Err(SceneError::IndexOutOfRange { index: 3, .. })
        ));
    }

    #[test]
    fn flat_buffers_with_trailing_floats_are_rejected() {
        let tri = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
        let normals = [0.0, 0.0, 1.0].repeat(3).into_iter().chain([0.5]).collect::<Vec<f32>>();
        assert!(matches!(
            Geometry::from_flat(&tri, Some(&normals), None, None),
            Err(SceneError::AttributeLength { attribute: "normals", expected: 9, actual: 10 })
        ));
        assert!(matches!(
            Geometry::from_flat(&tri, None, Some(&[0.0; 7]), None),
            Err(SceneError::AttributeLength { attribute: "uvs", expected: 6, actual: 7 })
        ));
        assert!(matches!(
            Geometry::from_flat(&tri[..8], None, None, None),
            Err(SceneError::AttributeLength { attribute: "vertices", .. })
        ));
    }

    #[test]
    fn flat_buffers_round_into_attributes() {
        let g = Geometry::from_flat(
            &[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
            None,
            Some(&[0.0, 0.0, 1.0, 0.0, 0.0, 1.0]),
            None,
        )
        .unwrap();
        assert_eq!(g.vertex_count(), 3);
        assert!(g.has_uvs());
        assert!(g.normals().is_none());
        assert_eq!(g.triangles(), vec![[0, 1, 2]]);
    }
}
