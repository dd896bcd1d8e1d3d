use glam::{Mat3, Mat4, Vec3};
use hecs::Entity;

use super::backend::DepthTargetId;
use super::lights::PackedLights;
use super::material::{BumpMap, ShaderKey};
use super::shading::ShadingParams;
use super::{Geometry, TextureData};
use crate::asset::Handle;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraData {
    pub view: Mat4,
    pub projection: Mat4,
    pub position: Vec3,
}

impl CameraData {
    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view
    }
}

/// Depth pre-pass inputs for the active caster.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowPass {
    pub target: DepthTargetId,
    pub resolution: u32,
    pub light_view_projection: Mat4,
    pub bias: f32,
    pub strength: f32,
}

/// One mesh in the main pass, with everything its program consumes.
#[derive(Debug, Clone)]
pub struct DrawItem {
    pub entity: Entity,
    pub label: String,
    pub geometry: Handle<Geometry>,
    pub key: ShaderKey,
    pub model: Mat4,
    pub normal_matrix: Mat3,
    pub params: ShadingParams,
    pub base_color: Vec3,
    pub color_texture: Option<Handle<TextureData>>,
    pub bump: Option<BumpMap>,
    pub lights: PackedLights,
}

/// One mesh in the depth pre-pass.
#[derive(Debug, Clone, Copy)]
pub struct DepthDraw {
    pub entity: Entity,
    pub geometry: Handle<Geometry>,
    pub model: Mat4,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub drawn: usize,
    /// Meshes left out of the main pass this frame (capacity or asset errors).
    pub skipped: usize,
    pub shadow_casters: usize,
}

#[derive(Debug, Clone)]
pub struct FrameData {
    pub camera: CameraData,
    pub clear_color: Vec3,
    pub shadow: Option<ShadowPass>,
    pub casters: Vec<DepthDraw>,
    pub draws: Vec<DrawItem>,
    pub stats: FrameStats,
}

pub(crate) fn normal_matrix(model: Mat4) -> Mat3 {
    let m = Mat3::from_mat4(model);
    if m.determinant().abs() < 1e-12 {
        return m;
    }
    m.inverse().transpose()
}
