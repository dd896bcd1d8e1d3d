use std::collections::HashMap;
use std::mem;

use super::buffers::{Layouts, LightCameraUniform};
use super::context::DEPTH_FORMAT;
use super::pipeline_builder::PipelineBuilder;
use crate::error::RenderError;
use crate::renderer::backend::DepthTargetId;
use crate::renderer::Vertex;

struct DepthTarget {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
}

fn depth_texture(device: &wgpu::Device, label: &str, size: u32) -> DepthTarget {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width: size,
            height: size,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    DepthTarget { texture, view }
}

/// Shadow pre-pass resources: depth targets handed out through
/// [`RenderBackend`](crate::renderer::RenderBackend), the depth-only pipeline
/// and the light's view-projection uniform.
pub(crate) struct ShadowResources {
    targets: HashMap<DepthTargetId, DepthTarget>,
    next_id: u64,
    /// Bound in place of a shadow map when no shadow pass is active.
    dummy: DepthTarget,
    pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
}

impl ShadowResources {
    pub(crate) fn new(device: &wgpu::Device, layouts: &Layouts) -> Self {
        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("LightCameraBuffer"),
            size: mem::size_of::<LightCameraUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("LightCameraBindGroup"),
            layout: &layouts.light_camera,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("DepthShader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../../shader/depth.wgsl").into()),
        });
        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("DepthPipelineLayout"),
            bind_group_layouts: &[&layouts.light_camera, &layouts.objects],
            push_constant_ranges: &[],
        });
        let pipeline = PipelineBuilder::new(device, &layout, &shader)
            .with_label("ShadowDepthPipeline")
            .with_vertex_entry("vs_depth")
            .depth_only()
            .with_vertex_buffer(Vertex::layout())
            .with_depth(DEPTH_FORMAT)
            .with_no_culling()
            .build();

        Self {
            targets: HashMap::new(),
            next_id: 0,
            dummy: depth_texture(device, "EmptyShadowMap", 1),
            pipeline,
            uniform_buffer,
            uniform_bind_group,
        }
    }

    pub(crate) fn create(&mut self, device: &wgpu::Device, size: u32) -> DepthTargetId {
        let id = DepthTargetId(self.next_id);
        self.next_id += 1;
        let target = depth_texture(device, &format!("ShadowMap{}", id.0), size.max(1));
        self.targets.insert(id, target);
        log::info!("Created shadow map {id} ({size}x{size})");
        id
    }

    pub(crate) fn release(&mut self, id: DepthTargetId) -> Result<(), RenderError> {
        let target = self
            .targets
            .remove(&id)
            .ok_or(RenderError::UnknownDepthTarget(id.0))?;
        target.texture.destroy();
        log::info!("Released shadow map {id}");
        Ok(())
    }

    pub(crate) fn contains(&self, id: DepthTargetId) -> bool {
        self.targets.contains_key(&id)
    }

    /// View sampled by the main pass: the active map or the 1x1 placeholder.
    pub(crate) fn sampled_view(&self, id: Option<DepthTargetId>) -> &wgpu::TextureView {
        id.and_then(|id| self.targets.get(&id))
            .map_or(&self.dummy.view, |target| &target.view)
    }

    pub(crate) fn target_view(&self, id: DepthTargetId) -> Result<&wgpu::TextureView, RenderError> {
        self.targets
            .get(&id)
            .map(|target| &target.view)
            .ok_or(RenderError::UnknownDepthTarget(id.0))
    }

    pub(crate) fn pipeline(&self) -> &wgpu::RenderPipeline {
        &self.pipeline
    }

    pub(crate) fn uniform_bind_group(&self) -> &wgpu::BindGroup {
        &self.uniform_bind_group
    }

    pub(crate) fn write_light_camera(&self, queue: &wgpu::Queue, view_proj: glam::Mat4) {
        let uniform = LightCameraUniform {
            view_proj: view_proj.to_cols_array_2d(),
        };
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniform));
    }
}
