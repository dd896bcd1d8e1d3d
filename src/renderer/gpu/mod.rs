//! wgpu implementation of [`RenderBackend`].
//!
//! Every surface program shares one WGSL source specialized by constants
//! derived from its [`ShaderKey`]. Object transforms and packed lights live
//! in storage buffers indexed by instance, so each mesh is a single
//! `draw_indexed` with a one-instance range.

mod buffers;
mod context;
mod pipeline_builder;
mod programs;
mod resources;
mod shadows;

use std::sync::Arc;

use winit::dpi::PhysicalSize;
use winit::window::Window;

use self::buffers::{clear_color, CameraUniform, FrameBuffers, Layouts};
use self::context::RenderContext;
use self::programs::ProgramCache;
use self::resources::GpuResources;
use self::shadows::ShadowResources;
use crate::asset::Assets;
use crate::error::{RenderError, ShaderError};
use crate::renderer::backend::{DepthTargetId, RenderBackend, SubmitStatus};
use crate::renderer::frame::{FrameData, ShadowPass};
use crate::renderer::material::ShaderKey;
use crate::settings::RenderSettings;

pub struct GpuBackend {
    context: RenderContext,
    layouts: Layouts,
    programs: ProgramCache,
    buffers: FrameBuffers,
    resources: GpuResources,
    shadows: ShadowResources,
    camera_bind_group: Option<(Option<DepthTargetId>, wgpu::BindGroup)>,
}

impl GpuBackend {
    pub async fn new(window: Arc<Window>, settings: &RenderSettings) -> Result<Self, RenderError> {
        let context = RenderContext::new(window, settings).await?;
        let device = &context.device;

        let layouts = Layouts::new(device);
        let programs = ProgramCache::new(device, &layouts, context.config.format);
        let buffers = FrameBuffers::new(device, &layouts);
        let resources = GpuResources::new(device, &context.queue);
        let shadows = ShadowResources::new(device, &layouts);

        Ok(Self {
            context,
            layouts,
            programs,
            buffers,
            resources,
            shadows,
            camera_bind_group: None,
        })
    }

    pub fn resize(&mut self, size: PhysicalSize<u32>) {
        self.context.resize(size);
    }

    pub fn programs_compiled(&self) -> usize {
        self.programs.len()
    }

    fn ensure_camera_bind_group(&mut self, shadow: Option<DepthTargetId>) {
        if matches!(&self.camera_bind_group, Some((id, _)) if *id == shadow) {
            return;
        }
        let group = self
            .context
            .device
            .create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("CameraBindGroup"),
                layout: &self.layouts.camera,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: self.buffers.camera.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(self.shadows.sampled_view(shadow)),
                    },
                ],
            });
        self.camera_bind_group = Some((shadow, group));
    }

    fn depth_pass(&self, encoder: &mut wgpu::CommandEncoder, frame: &FrameData, pass: &ShadowPass) -> Result<(), RenderError> {
        let target = self.shadows.target_view(pass.target)?;
        self.shadows
            .write_light_camera(&self.context.queue, pass.light_view_projection);

        let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("ShadowDepthPass"),
            color_attachments: &[],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: target,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        rpass.set_pipeline(self.shadows.pipeline());
        rpass.set_bind_group(0, self.shadows.uniform_bind_group(), &[]);
        rpass.set_bind_group(1, &self.buffers.objects_bind_group, &[]);

        for (instance, caster) in frame.casters.iter().enumerate() {
            let Some(mesh) = self.resources.mesh(caster.geometry) else {
                continue;
            };
            let instance = instance as u32;
            rpass.set_vertex_buffer(0, mesh.vbuf.slice(..));
            rpass.set_index_buffer(mesh.ibuf.slice(..), wgpu::IndexFormat::Uint32);
            rpass.draw_indexed(0..mesh.index_count, 0, instance..instance + 1);
        }
        Ok(())
    }

    fn main_pass(&self, encoder: &mut wgpu::CommandEncoder, view: &wgpu::TextureView, frame: &FrameData) {
        let Some((_, camera_group)) = &self.camera_bind_group else {
            return;
        };

        let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("MainPass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(clear_color(frame.clear_color)),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.context.depth.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        rpass.set_bind_group(0, camera_group, &[]);
        rpass.set_bind_group(1, &self.buffers.objects_bind_group, &[]);

        let first_surface = frame.casters.len() as u32;
        for (i, draw) in frame.draws.iter().enumerate() {
            let Some(pipeline) = self.programs.get(&draw.key) else {
                log::warn!("No program {} for '{}'", draw.key.label(), draw.label);
                continue;
            };
            let (Some(mesh), Some(material)) = (
                self.resources.mesh(draw.geometry),
                self.resources.material_group(draw),
            ) else {
                continue;
            };
            let instance = first_surface + i as u32;
            rpass.set_pipeline(pipeline);
            rpass.set_bind_group(2, material, &[]);
            rpass.set_vertex_buffer(0, mesh.vbuf.slice(..));
            rpass.set_index_buffer(mesh.ibuf.slice(..), wgpu::IndexFormat::Uint32);
            rpass.draw_indexed(0..mesh.index_count, 0, instance..instance + 1);
        }
    }
}

impl RenderBackend for GpuBackend {
    fn prepare_program(&mut self, key: &ShaderKey, material: &str) -> Result<(), ShaderError> {
        self.programs.prepare(&self.context.device, key, material)
    }

    fn create_depth_target(&mut self, size: u32) -> Result<DepthTargetId, RenderError> {
        let limit = self.context.device.limits().max_texture_dimension_2d;
        if size == 0 || size > limit {
            return Err(RenderError::Backend(format!(
                "shadow map size {size} is outside 1..={limit}"
            )));
        }
        Ok(self.shadows.create(&self.context.device, size))
    }

    fn release_depth_target(&mut self, id: DepthTargetId) -> Result<(), RenderError> {
        if matches!(&self.camera_bind_group, Some((Some(bound), _)) if *bound == id) {
            self.camera_bind_group = None;
        }
        self.shadows.release(id)
    }

    fn viewport(&self) -> (u32, u32) {
        (self.context.config.width, self.context.config.height)
    }

    fn submit(&mut self, frame: &FrameData, assets: &Assets) -> Result<SubmitStatus, RenderError> {
        let device = &self.context.device;
        let queue = &self.context.queue;

        for caster in &frame.casters {
            self.resources.ensure_mesh(device, assets, caster.geometry);
        }
        for draw in &frame.draws {
            self.resources.ensure_mesh(device, assets, draw.geometry);
        }
        self.resources
            .prepare_materials(device, queue, &self.layouts, assets, &frame.draws);
        self.buffers
            .upload(device, queue, &self.layouts, &frame.casters, &frame.draws);

        let shadow = frame
            .shadow
            .filter(|pass| self.shadows.contains(pass.target));
        let uniform = CameraUniform::new(&frame.camera, shadow.as_ref());
        queue.write_buffer(&self.buffers.camera, 0, bytemuck::bytes_of(&uniform));
        self.ensure_camera_bind_group(shadow.map(|pass| pass.target));

        let output = match self.context.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::warn!("Surface lost, reconfiguring");
                self.context.resize(self.context.size);
                return Ok(SubmitStatus::Skipped);
            }
            Err(e) => return Err(e.into()),
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("FrameEncoder"),
            });

        if let Some(pass) = &shadow {
            self.depth_pass(&mut encoder, frame, pass)?;
        }
        self.main_pass(&mut encoder, &view, frame);

        self.context.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(SubmitStatus::Rendered)
    }
}
