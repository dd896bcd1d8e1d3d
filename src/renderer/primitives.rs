use super::geometry::Geometry;
use super::vertex::{v, Vertex};
use std::f32::consts::{FRAC_PI_2, PI, TAU};

/// UV sphere centered at the origin. Rings run from the south pole (v = 0)
/// to the north pole (v = 1); u wraps once around the Y axis. Tangents are
/// analytic, so the result can carry a bump map.
pub fn sphere(radius: f32, segments: u32, rings: u32) -> Geometry {
    let segments = segments.max(3);
    let rings = rings.max(2);
    let mut vertices = Vec::with_capacity(((segments + 1) * (rings + 1)) as usize);
    let mut indices = Vec::with_capacity((segments * rings * 6) as usize);

    for ring in 0..=rings {
        let phi = -FRAC_PI_2 + PI * ring as f32 / rings as f32;
        let y = phi.sin();
        let ring_radius = phi.cos();

        for segment in 0..=segments {
            let theta = TAU * segment as f32 / segments as f32;
            let normal = [ring_radius * theta.sin(), y, ring_radius * theta.cos()];
            let pos = normal.map(|c| c * radius);

            let uv = [
                segment as f32 / segments as f32,
                ring as f32 / rings as f32,
            ];

            // direction of increasing u
            let tangent = [theta.cos(), 0.0, -theta.sin(), 1.0];

            vertices.push(v(pos, normal, uv, tangent));
        }
    }

    let stride = segments + 1;
    for ring in 0..rings {
        for segment in 0..segments {
            let a = ring * stride + segment;
            let b = a + 1;
            let c = a + stride;
            let d = c + 1;

            // counter-clockwise seen from outside
            indices.extend_from_slice(&[a, b, c, b, d, c]);
        }
    }

    let mut geometry = Geometry::new("Sphere", vertices, indices);
    geometry.has_tangents = true;
    geometry
}

/// Rectangle in the XY plane facing +Z, centered at the origin.
pub fn rectangle(width: f32, height: f32) -> Geometry {
    let (hw, hh) = (width * 0.5, height * 0.5);
    let n = [0.0, 0.0, 1.0];
    let t = [1.0, 0.0, 0.0, 1.0];

    let vertices: Vec<Vertex> = vec![
        v([-hw, -hh, 0.0], n, [0.0, 0.0], t),
        v([hw, -hh, 0.0], n, [1.0, 0.0], t),
        v([-hw, hh, 0.0], n, [0.0, 1.0], t),
        v([hw, hh, 0.0], n, [1.0, 1.0], t),
    ];

    let mut geometry = Geometry::new("Rectangle", vertices, vec![0, 1, 3, 0, 3, 2]);
    geometry.has_tangents = true;
    geometry
}
