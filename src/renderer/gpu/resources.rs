use std::collections::HashMap;

use wgpu::util::DeviceExt;

use super::buffers::Layouts;
use crate::asset::{Assets, Handle};
use crate::renderer::frame::DrawItem;
use crate::renderer::{Geometry, TextureData};

pub(crate) struct MeshBuffers {
    pub(crate) vbuf: wgpu::Buffer,
    pub(crate) ibuf: wgpu::Buffer,
    pub(crate) index_count: u32,
}

impl MeshBuffers {
    fn new(device: &wgpu::Device, geometry: &Geometry) -> Self {
        let vbuf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{}.VertexBuffer", geometry.label)),
            contents: bytemuck::cast_slice(&geometry.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let ibuf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{}.IndexBuffer", geometry.label)),
            contents: bytemuck::cast_slice(&geometry.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        Self {
            vbuf,
            ibuf,
            index_count: geometry.indices.len() as u32,
        }
    }
}

fn upload_texture(device: &wgpu::Device, queue: &wgpu::Queue, source: &TextureData) -> wgpu::TextureView {
    let size = wgpu::Extent3d {
        width: source.width,
        height: source.height,
        depth_or_array_layers: 1,
    };
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(&source.label),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8Unorm,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });

    // row 0 of the data is the bottom of the image, which keeps v = 0 at the bottom
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        &source.rgba,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(4 * source.width),
            rows_per_image: Some(source.height),
        },
        size,
    );

    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

type MaterialKey = (Option<Handle<TextureData>>, Option<Handle<TextureData>>);

/// GPU copies of geometry and textures, created the first time a frame
/// references them.
pub(crate) struct GpuResources {
    meshes: HashMap<Handle<Geometry>, MeshBuffers>,
    textures: HashMap<Handle<TextureData>, wgpu::TextureView>,
    material_groups: HashMap<MaterialKey, wgpu::BindGroup>,
    white: wgpu::TextureView,
    flat_normal: wgpu::TextureView,
    sampler: wgpu::Sampler,
}

impl GpuResources {
    pub(crate) fn new(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("MaterialSampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        Self {
            meshes: HashMap::new(),
            textures: HashMap::new(),
            material_groups: HashMap::new(),
            white: upload_texture(device, queue, &TextureData::solid("White", [255; 4])),
            flat_normal: upload_texture(device, queue, &TextureData::flat_normal_map("FlatNormal")),
            sampler,
        }
    }

    pub(crate) fn ensure_mesh(&mut self, device: &wgpu::Device, assets: &Assets, handle: Handle<Geometry>) -> bool {
        if self.meshes.contains_key(&handle) {
            return true;
        }
        match assets.geometry(handle) {
            Ok(geometry) => {
                log::debug!("Uploading geometry '{}'", geometry.label);
                self.meshes.insert(handle, MeshBuffers::new(device, geometry));
                true
            }
            Err(e) => {
                log::warn!("{e}");
                false
            }
        }
    }

    pub(crate) fn mesh(&self, handle: Handle<Geometry>) -> Option<&MeshBuffers> {
        self.meshes.get(&handle)
    }

    fn ensure_texture(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, assets: &Assets, handle: Handle<TextureData>) -> bool {
        if self.textures.contains_key(&handle) {
            return true;
        }
        match assets.texture(handle) {
            Ok(source) => {
                log::debug!("Uploading texture '{}' ({}x{})", source.label, source.width, source.height);
                self.textures.insert(handle, upload_texture(device, queue, source));
                true
            }
            Err(e) => {
                log::warn!("{e}");
                false
            }
        }
    }

    /// Uploads everything `draws` reference and builds their material bind groups.
    pub(crate) fn prepare_materials(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layouts: &Layouts,
        assets: &Assets,
        draws: &[DrawItem],
    ) {
        for draw in draws {
            let key = Self::material_key(draw);
            if self.material_groups.contains_key(&key) {
                continue;
            }
            let color = key.0.filter(|h| self.ensure_texture(device, queue, assets, *h));
            let bump = key.1.filter(|h| self.ensure_texture(device, queue, assets, *h));

            let color_view = color.and_then(|h| self.textures.get(&h)).unwrap_or(&self.white);
            let bump_view = bump.and_then(|h| self.textures.get(&h)).unwrap_or(&self.flat_normal);

            let group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("MaterialBindGroup"),
                layout: &layouts.material,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(color_view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(bump_view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::Sampler(&self.sampler),
                    },
                ],
            });
            self.material_groups.insert(key, group);
        }
    }

    fn material_key(draw: &DrawItem) -> MaterialKey {
        (draw.color_texture, draw.bump.map(|b| b.texture))
    }

    pub(crate) fn material_group(&self, draw: &DrawItem) -> Option<&wgpu::BindGroup> {
        self.material_groups.get(&Self::material_key(draw))
    }
}
