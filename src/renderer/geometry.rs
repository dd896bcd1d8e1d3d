use glam::{Vec2, Vec3};

use super::vertex::Vertex;

/// Indexed triangle list shared between meshes.
#[derive(Debug, Clone)]
pub struct Geometry {
    pub label: String,
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    /// Whether `Vertex::tangent` holds meaningful data.
    pub has_tangents: bool,
}

impl Geometry {
    pub fn new(label: impl Into<String>, vertices: Vec<Vertex>, indices: Vec<u32>) -> Self {
        Self {
            label: label.into(),
            vertices,
            indices,
            has_tangents: false,
        }
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn triangles(&self) -> impl Iterator<Item = [usize; 3]> + '_ {
        self.indices
            .chunks_exact(3)
            .map(|t| [t[0] as usize, t[1] as usize, t[2] as usize])
    }

    /// Triangles whose three indices address existing vertices. Any other
    /// triangle is skipped with a warning.
    pub fn valid_triangles(&self) -> impl Iterator<Item = [usize; 3]> + '_ {
        let count = self.vertices.len();
        self.triangles().filter(move |tri| {
            let in_range = tri.iter().all(|&i| i < count);
            if !in_range {
                log::warn!(
                    "Geometry '{}': skipping triangle {:?} ({} vertices)",
                    self.label,
                    tri,
                    count
                );
            }
            in_range
        })
    }

    /// Derives per-vertex tangents from positions and UVs. Triangle
    /// contributions are accumulated, then orthogonalized against the normal;
    /// w stores the bitangent handedness. Degenerate UVs fall back to any
    /// vector perpendicular to the normal.
    pub fn with_generated_tangents(mut self) -> Self {
        let count = self.vertices.len();
        let mut tangents = vec![Vec3::ZERO; count];
        let mut bitangents = vec![Vec3::ZERO; count];

        let triangles: Vec<[usize; 3]> = self.valid_triangles().collect();
        for [i0, i1, i2] in triangles {
            let p0 = Vec3::from(self.vertices[i0].pos);
            let p1 = Vec3::from(self.vertices[i1].pos);
            let p2 = Vec3::from(self.vertices[i2].pos);
            let uv0 = Vec2::from(self.vertices[i0].uv);
            let uv1 = Vec2::from(self.vertices[i1].uv);
            let uv2 = Vec2::from(self.vertices[i2].uv);

            let e1 = p1 - p0;
            let e2 = p2 - p0;
            let d1 = uv1 - uv0;
            let d2 = uv2 - uv0;

            let det = d1.x * d2.y - d2.x * d1.y;
            if det.abs() < 1e-12 {
                continue;
            }
            let r = 1.0 / det;
            let t = (e1 * d2.y - e2 * d1.y) * r;
            let b = (e2 * d1.x - e1 * d2.x) * r;

            for i in [i0, i1, i2] {
                tangents[i] += t;
                bitangents[i] += b;
            }
        }

        for (i, vertex) in self.vertices.iter_mut().enumerate() {
            let n = Vec3::from(vertex.normal);
            let t = tangents[i] - n * n.dot(tangents[i]);
            let t = if t.length_squared() > 1e-12 {
                t.normalize()
            } else {
                n.any_orthonormal_vector()
            };
            let w = if n.cross(t).dot(bitangents[i]) < 0.0 {
                -1.0
            } else {
                1.0
            };
            vertex.tangent = [t.x, t.y, t.z, w];
        }

        self.has_tangents = true;
        self
    }
}
