// renderer/texture.rs

use std::path::Path;

use glam::{Vec2, Vec3, Vec4};

use crate::error::TextureError;

/// Decoded RGBA8 image kept on the CPU. Rows are stored bottom-up so that
/// `v = 0` addresses the bottom edge of the picture; GPU backends upload
/// the same bytes unchanged.
#[derive(Debug, Clone)]
pub struct TextureData {
    pub label: String,
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl TextureData {
    /// Load an image file through the `image` crate.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, TextureError> {
        let path = path.as_ref();
        log::info!("Loading texture: {:?}", path);

        let img = image::open(path).map_err(|source| TextureError::Load {
            path: path.display().to_string(),
            source,
        })?;

        let rgba = image::imageops::flip_vertical(&img.to_rgba8());
        let (width, height) = rgba.dimensions();

        Ok(Self {
            label: path.display().to_string(),
            width,
            height,
            rgba: rgba.into_raw(),
        })
    }

    /// Wraps raw bottom-up RGBA8 pixels. Returns `None` if the buffer size
    /// does not match the dimensions.
    pub fn from_rgba8(label: impl Into<String>, width: u32, height: u32, rgba: Vec<u8>) -> Option<Self> {
        if width == 0 || height == 0 || rgba.len() != (width * height * 4) as usize {
            return None;
        }
        Some(Self {
            label: label.into(),
            width,
            height,
            rgba,
        })
    }

    pub fn solid(label: impl Into<String>, color: [u8; 4]) -> Self {
        Self {
            label: label.into(),
            width: 1,
            height: 1,
            rgba: color.to_vec(),
        }
    }

    /// Two-color checkerboard with `cells` squares per side.
    pub fn checkerboard(label: impl Into<String>, size: u32, cells: u32, a: [u8; 4], b: [u8; 4]) -> Self {
        let size = size.max(1);
        let cell = (size / cells.max(1)).max(1);
        let mut rgba = Vec::with_capacity((size * size * 4) as usize);
        for y in 0..size {
            for x in 0..size {
                let color = if ((x / cell) + (y / cell)) % 2 == 0 { a } else { b };
                rgba.extend_from_slice(&color);
            }
        }
        Self {
            label: label.into(),
            width: size,
            height: size,
            rgba,
        }
    }

    /// Flat tangent-space normal map (every texel points straight out).
    pub fn flat_normal_map(label: impl Into<String>) -> Self {
        Self::solid(label, [128, 128, 255, 255])
    }

    pub fn texel(&self, x: u32, y: u32) -> Vec4 {
        let x = x.min(self.width - 1);
        let y = y.min(self.height - 1);
        let i = ((y * self.width + x) * 4) as usize;
        let p = &self.rgba[i..i + 4];
        Vec4::new(p[0] as f32, p[1] as f32, p[2] as f32, p[3] as f32) / 255.0
    }

    /// Nearest-neighbour lookup with repeat addressing.
    pub fn sample(&self, uv: Vec2) -> Vec4 {
        let u = uv.x - uv.x.floor();
        let v = uv.y - uv.y.floor();
        let x = ((u * self.width as f32) as u32).min(self.width - 1);
        let y = ((v * self.height as f32) as u32).min(self.height - 1);
        self.texel(x, y)
    }

    pub fn sample_rgb(&self, uv: Vec2) -> Vec3 {
        self.sample(uv).truncate()
    }
}
