use std::collections::HashMap;

use super::buffers::Layouts;
use super::context::DEPTH_FORMAT;
use super::pipeline_builder::PipelineBuilder;
use crate::error::ShaderError;
use crate::renderer::material::{ShaderFeatures, ShaderKey, ShadingModel};
use crate::renderer::Vertex;

/// Constants that specialize the shared WGSL source for one key.
fn key_constants(key: &ShaderKey) -> String {
    let model = match key.model {
        ShadingModel::Flat => "MODEL_FLAT",
        ShadingModel::Lambert => "MODEL_LAMBERT",
        ShadingModel::Phong => "MODEL_PHONG",
    };
    format!(
        "const MODEL_FLAT: u32 = 0u;\n\
         const MODEL_LAMBERT: u32 = 1u;\n\
         const MODEL_PHONG: u32 = 2u;\n\
         const SHADING_MODEL: u32 = {model};\n\
         const LIGHT_CAPACITY: u32 = {}u;\n\
         const USE_COLOR_TEXTURE: bool = {};\n\
         const USE_BUMP_TEXTURE: bool = {};\n\
         const RECEIVE_SHADOW: bool = {};\n",
        key.light_capacity,
        key.features.contains(ShaderFeatures::COLOR_TEXTURE),
        key.features.contains(ShaderFeatures::BUMP_TEXTURE),
        key.features.contains(ShaderFeatures::RECEIVE_SHADOW),
    )
}

fn program_source(key: &ShaderKey) -> String {
    format!(
        "{}\n{}\n{}\n{}",
        key_constants(key),
        include_str!("../../shader/bindings.wgsl"),
        include_str!("../../shader/lighting.wgsl"),
        include_str!("../../shader/surface.wgsl"),
    )
}

/// Compiled surface programs, one per [`ShaderKey`].
pub(crate) struct ProgramCache {
    layout: wgpu::PipelineLayout,
    format: wgpu::TextureFormat,
    pipelines: HashMap<ShaderKey, wgpu::RenderPipeline>,
}

impl ProgramCache {
    pub(crate) fn new(device: &wgpu::Device, layouts: &Layouts, format: wgpu::TextureFormat) -> Self {
        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("SurfacePipelineLayout"),
            bind_group_layouts: &[&layouts.camera, &layouts.objects, &layouts.material],
            push_constant_ranges: &[],
        });
        Self {
            layout,
            format,
            pipelines: HashMap::new(),
        }
    }

    pub(crate) fn get(&self, key: &ShaderKey) -> Option<&wgpu::RenderPipeline> {
        self.pipelines.get(key)
    }

    pub(crate) fn len(&self) -> usize {
        self.pipelines.len()
    }

    /// Compiles the program for `key` unless it is cached. Validation
    /// failures are reported as [`ShaderError::Compilation`] instead of
    /// reaching the device's uncaptured error handler.
    pub(crate) fn prepare(&mut self, device: &wgpu::Device, key: &ShaderKey, material: &str) -> Result<(), ShaderError> {
        if self.pipelines.contains_key(key) {
            return Ok(());
        }

        let label = key.label();
        let source = program_source(key);

        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&label),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });
        let pipeline = PipelineBuilder::new(device, &self.layout, &shader)
            .with_label(&label)
            .with_vertex_buffer(Vertex::layout())
            .with_color_target(self.format)
            .with_depth(DEPTH_FORMAT)
            .with_no_culling()
            .build();

        if let Some(error) = pollster::block_on(device.pop_error_scope()) {
            log::error!("Program {label} for '{material}' failed: {error}");
            return Err(ShaderError::Compilation {
                key: *key,
                material: material.to_string(),
                message: error.to_string(),
            });
        }

        log::info!("Compiled program {label}");
        self.pipelines.insert(*key, pipeline);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constants_follow_the_key() {
        let key = ShaderKey {
            model: ShadingModel::Phong,
            features: ShaderFeatures::COLOR_TEXTURE | ShaderFeatures::RECEIVE_SHADOW,
            light_capacity: 3,
        };
        let header = key_constants(&key);
        assert!(header.contains("const SHADING_MODEL: u32 = MODEL_PHONG;"));
        assert!(header.contains("const LIGHT_CAPACITY: u32 = 3u;"));
        assert!(header.contains("const USE_COLOR_TEXTURE: bool = true;"));
        assert!(header.contains("const USE_BUMP_TEXTURE: bool = false;"));
        assert!(header.contains("const RECEIVE_SHADOW: bool = true;"));
    }

    #[test]
    fn source_contains_entry_points() {
        let key = ShaderKey {
            model: ShadingModel::Flat,
            features: ShaderFeatures::empty(),
            light_capacity: 1,
        };
        let source = program_source(&key);
        assert!(source.contains("fn vs_main"));
        assert!(source.contains("fn fs_main"));
        assert!(source.contains("fn light_terms"));
    }
}
