use glam::{Vec3, Vec4};

/// Clip-space `w` below which a vertex counts as behind the eye.
const MIN_W: f32 = 1e-5;

/// A covered pixel: coordinates, NDC depth and perspective-correct
/// barycentric weights of the three vertices.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Fragment {
    pub x: u32,
    pub y: u32,
    pub depth: f32,
    pub weights: Vec3,
}

/// Scan-converts one triangle given in clip space. Both windings are
/// rasterized. Triangles with a vertex behind the eye are dropped; there is
/// no near-plane clipping. Pixel row 0 is the top of the image.
pub(crate) fn rasterize(
    width: u32,
    height: u32,
    clip: [Vec4; 3],
    mut emit: impl FnMut(Fragment),
) {
    if clip.iter().any(|c| c.w <= MIN_W) {
        return;
    }

    let inv_w = clip.map(|c| 1.0 / c.w);
    let screen = [0, 1, 2].map(|i| {
        let ndc = clip[i].truncate() * inv_w[i];
        Vec3::new(
            (ndc.x * 0.5 + 0.5) * width as f32,
            (0.5 - ndc.y * 0.5) * height as f32,
            ndc.z,
        )
    });

    let edge = |a: Vec3, b: Vec3, px: f32, py: f32| (b.x - a.x) * (py - a.y) - (b.y - a.y) * (px - a.x);

    let area = edge(screen[0], screen[1], screen[2].x, screen[2].y);
    if area.abs() < 1e-12 {
        return;
    }

    let min_x = screen.iter().map(|s| s.x).fold(f32::INFINITY, f32::min).floor().max(0.0) as u32;
    let min_y = screen.iter().map(|s| s.y).fold(f32::INFINITY, f32::min).floor().max(0.0) as u32;
    let max_x = screen.iter().map(|s| s.x).fold(f32::NEG_INFINITY, f32::max).ceil().min(width as f32) as u32;
    let max_y = screen.iter().map(|s| s.y).fold(f32::NEG_INFINITY, f32::max).ceil().min(height as f32) as u32;

    for y in min_y..max_y {
        for x in min_x..max_x {
            let px = x as f32 + 0.5;
            let py = y as f32 + 0.5;

            let b0 = edge(screen[1], screen[2], px, py) / area;
            let b1 = edge(screen[2], screen[0], px, py) / area;
            let b2 = edge(screen[0], screen[1], px, py) / area;
            if b0 < 0.0 || b1 < 0.0 || b2 < 0.0 {
                continue;
            }

            let depth = b0 * screen[0].z + b1 * screen[1].z + b2 * screen[2].z;
            if !(0.0..=1.0).contains(&depth) {
                continue;
            }

            let persp = Vec3::new(b0 * inv_w[0], b1 * inv_w[1], b2 * inv_w[2]);
            let weights = persp / (persp.x + persp.y + persp.z);

            emit(Fragment {
                x,
                y,
                depth,
                weights,
            });
        }
    }
}
