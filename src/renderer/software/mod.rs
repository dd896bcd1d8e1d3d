//! Headless CPU implementation of [`RenderBackend`]. It evaluates the same
//! lighting as the GPU programs (see `renderer::shading`) and is what the
//! tests render with.

mod raster;

use std::collections::{HashMap, HashSet};
use std::path::Path;

use glam::{Mat4, Vec2, Vec3, Vec4};

use self::raster::{rasterize, Fragment};
use crate::asset::Assets;
use crate::error::{RenderError, ShaderError};
use crate::renderer::backend::{DepthTargetId, RenderBackend, SubmitStatus};
use crate::renderer::frame::{DrawItem, FrameData, ShadowPass};
use crate::renderer::material::{ShaderFeatures, ShaderKey, ShadingModel};
use crate::renderer::shading::{self, LightTerms};
use crate::renderer::Geometry;

/// Square CPU depth image, row 0 at the top.
#[derive(Debug, Clone)]
pub struct DepthImage {
    size: u32,
    data: Vec<f32>,
}

impl DepthImage {
    fn new(size: u32) -> Self {
        Self {
            size,
            data: vec![1.0; (size * size) as usize],
        }
    }

    fn clear(&mut self) {
        self.data.fill(1.0);
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn at(&self, x: u32, y: u32) -> f32 {
        let x = x.min(self.size - 1);
        let y = y.min(self.size - 1);
        self.data[(y * self.size + x) as usize]
    }

    /// Nearest texel at shadow-space texture coordinates.
    pub fn sample(&self, u: f32, v: f32) -> f32 {
        let x = (u * self.size as f32).max(0.0) as u32;
        let y = (v * self.size as f32).max(0.0) as u32;
        self.at(x, y)
    }

    fn write_min(&mut self, x: u32, y: u32, depth: f32) {
        let i = (y * self.size + x) as usize;
        if depth < self.data[i] {
            self.data[i] = depth;
        }
    }
}

/// Interpolated per-vertex data of the main pass.
#[derive(Debug, Clone, Copy)]
struct Varyings {
    world: Vec3,
    normal: Vec3,
    tangent: Vec4,
    uv: Vec2,
}

impl Varyings {
    fn blend(v: &[Varyings; 3], w: Vec3) -> Self {
        Self {
            world: v[0].world * w.x + v[1].world * w.y + v[2].world * w.z,
            normal: v[0].normal * w.x + v[1].normal * w.y + v[2].normal * w.z,
            tangent: (v[0].tangent * w.x + v[1].tangent * w.y + v[2].tangent * w.z)
                .truncate()
                .extend(v[0].tangent.w),
            uv: v[0].uv * w.x + v[1].uv * w.y + v[2].uv * w.z,
        }
    }
}

pub struct SoftwareBackend {
    width: u32,
    height: u32,
    color: Vec<Vec3>,
    depth: Vec<f32>,
    depth_targets: HashMap<DepthTargetId, DepthImage>,
    next_target: u64,
    programs: HashSet<ShaderKey>,
    view_projection: Mat4,
}

impl SoftwareBackend {
    pub fn new(width: u32, height: u32) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        Self {
            width,
            height,
            color: vec![Vec3::ZERO; (width * height) as usize],
            depth: vec![1.0; (width * height) as usize],
            depth_targets: HashMap::new(),
            next_target: 0,
            programs: HashSet::new(),
            view_projection: Mat4::IDENTITY,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        *self = Self {
            depth_targets: std::mem::take(&mut self.depth_targets),
            next_target: self.next_target,
            programs: std::mem::take(&mut self.programs),
            ..Self::new(width, height)
        };
    }

    pub fn color_at(&self, x: u32, y: u32) -> Vec3 {
        let x = x.min(self.width - 1);
        let y = y.min(self.height - 1);
        self.color[(y * self.width + x) as usize]
    }

    /// Pixel covering `world` in the last submitted frame.
    pub fn project_to_pixel(&self, world: Vec3) -> Option<(u32, u32)> {
        let clip = self.view_projection * world.extend(1.0);
        if clip.w <= 0.0 {
            return None;
        }
        let ndc = clip.truncate() / clip.w;
        if ndc.x.abs() > 1.0 || ndc.y.abs() > 1.0 {
            return None;
        }
        let x = ((ndc.x * 0.5 + 0.5) * self.width as f32) as u32;
        let y = ((0.5 - ndc.y * 0.5) * self.height as f32) as u32;
        Some((x.min(self.width - 1), y.min(self.height - 1)))
    }

    pub fn programs_compiled(&self) -> usize {
        self.programs.len()
    }

    pub fn depth_target(&self, id: DepthTargetId) -> Option<&DepthImage> {
        self.depth_targets.get(&id)
    }

    pub fn depth_target_count(&self) -> usize {
        self.depth_targets.len()
    }

    pub fn save_png(&self, path: impl AsRef<Path>) -> Result<(), image::ImageError> {
        let image = image::RgbImage::from_fn(self.width, self.height, |x, y| {
            let c = (self.color_at(x, y).clamp(Vec3::ZERO, Vec3::ONE) * 255.0).round();
            image::Rgb([c.x as u8, c.y as u8, c.z as u8])
        });
        image.save(path)
    }

    fn shadow_pre_pass(&mut self, frame: &FrameData, pass: &ShadowPass, assets: &Assets) -> Result<(), RenderError> {
        let target = self
            .depth_targets
            .get_mut(&pass.target)
            .ok_or(RenderError::UnknownDepthTarget(pass.target.0))?;
        target.clear();
        let size = target.size;

        for caster in &frame.casters {
            let Ok(geometry) = assets.geometry(caster.geometry) else {
                continue;
            };
            let mvp = pass.light_view_projection * caster.model;
            for tri in geometry.valid_triangles() {
                let clip = tri.map(|i| mvp * Vec3::from(geometry.vertices[i].pos).extend(1.0));
                rasterize(size, size, clip, |f| target.write_min(f.x, f.y, f.depth));
            }
        }
        Ok(())
    }

    fn draw(&mut self, frame: &FrameData, draw: &DrawItem, geometry: &Geometry, assets: &Assets) {
        let vp = frame.camera.view_projection();
        let camera_position = frame.camera.position;
        let model3 = glam::Mat3::from_mat4(draw.model);

        let shadow = frame
            .shadow
            .filter(|_| draw.key.features.contains(ShaderFeatures::RECEIVE_SHADOW))
            .and_then(|pass| self.depth_targets.get(&pass.target).map(|image| (pass, image)));
        let visibility = |world: Vec3| match shadow {
            Some((pass, image)) => shading::shadow_visibility(
                pass.light_view_projection,
                world,
                pass.bias,
                pass.strength,
                |u, v| image.sample(u, v),
            ),
            None => 1.0,
        };

        let color_texture = draw.color_texture.and_then(|h| assets.texture(h).ok());
        let bump = draw
            .bump
            .and_then(|b| assets.texture(b.texture).ok().map(|t| (t, b.strength)));

        let (width, height) = (self.width, self.height);
        let mut writes: Vec<(usize, f32, Vec3)> = Vec::new();

        for tri in geometry.valid_triangles() {
            let varyings = tri.map(|i| {
                let v = &geometry.vertices[i];
                let tangent = Vec4::from(v.tangent);
                Varyings {
                    world: draw.model.transform_point3(Vec3::from(v.pos)),
                    normal: draw.normal_matrix * Vec3::from(v.normal),
                    tangent: (model3 * tangent.truncate()).extend(tangent.w),
                    uv: Vec2::from(v.uv),
                }
            });
            let clip = varyings.map(|v| vp * v.world.extend(1.0));

            // provoking vertex is the first one
            let flat_terms = (draw.params.model == ShadingModel::Flat).then(|| {
                let p = varyings[0];
                shading::light_terms(
                    &draw.params,
                    &draw.lights,
                    p.world,
                    p.normal,
                    camera_position,
                    visibility(p.world),
                )
            });

            rasterize(width, height, clip, |f: Fragment| {
                let index = (f.y * width + f.x) as usize;
                let v = Varyings::blend(&varyings, f.weights);

                let base = match color_texture {
                    Some(texture) => texture.sample_rgb(v.uv),
                    None => draw.base_color,
                };

                let terms: LightTerms = match flat_terms {
                    Some(terms) => terms,
                    None => {
                        let normal = match bump {
                            Some((texture, strength)) => shading::perturb_normal(
                                v.normal,
                                v.tangent,
                                texture.sample_rgb(v.uv),
                                strength,
                            ),
                            None => v.normal,
                        };
                        shading::light_terms(
                            &draw.params,
                            &draw.lights,
                            v.world,
                            normal,
                            camera_position,
                            visibility(v.world),
                        )
                    }
                };

                writes.push((index, f.depth, shading::combine(base, &terms)));
            });

            for (index, depth, color) in writes.drain(..) {
                if depth < self.depth[index] {
                    self.depth[index] = depth;
                    self.color[index] = color.clamp(Vec3::ZERO, Vec3::ONE);
                }
            }
        }
    }
}

impl RenderBackend for SoftwareBackend {
    fn prepare_program(&mut self, key: &ShaderKey, material: &str) -> Result<(), ShaderError> {
        if self.programs.insert(*key) {
            log::debug!("Software program {} ready for '{}'", key.label(), material);
        }
        Ok(())
    }

    fn create_depth_target(&mut self, size: u32) -> Result<DepthTargetId, RenderError> {
        let id = DepthTargetId(self.next_target);
        self.next_target += 1;
        self.depth_targets.insert(id, DepthImage::new(size.max(1)));
        Ok(id)
    }

    fn release_depth_target(&mut self, id: DepthTargetId) -> Result<(), RenderError> {
        self.depth_targets
            .remove(&id)
            .map(|_| ())
            .ok_or(RenderError::UnknownDepthTarget(id.0))
    }

    fn viewport(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn submit(&mut self, frame: &FrameData, assets: &Assets) -> Result<SubmitStatus, RenderError> {
        if let Some(pass) = &frame.shadow {
            self.shadow_pre_pass(frame, pass, assets)?;
        }

        self.color.fill(frame.clear_color);
        self.depth.fill(1.0);
        self.view_projection = frame.camera.view_projection();

        for draw in &frame.draws {
            let Ok(geometry) = assets.geometry(draw.geometry) else {
                log::warn!("Draw for {:?} lost its geometry", draw.entity);
                continue;
            };
            self.draw(frame, draw, geometry, assets);
        }
        Ok(SubmitStatus::Rendered)
    }
}
