use std::mem;

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

use crate::renderer::frame::{CameraData, DepthDraw, DrawItem, ShadowPass};
use crate::renderer::lights::LightsRaw;

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub(crate) struct CameraUniform {
    view_proj: [[f32; 4]; 4],
    position: [f32; 4],
    light_view_proj: [[f32; 4]; 4],
    /// bias, strength, enabled, map size
    shadow: [f32; 4],
}

impl CameraUniform {
    pub(crate) fn new(camera: &CameraData, shadow: Option<&ShadowPass>) -> Self {
        let (light_view_proj, shadow) = match shadow {
            Some(pass) => (
                pass.light_view_projection,
                [pass.bias, pass.strength, 1.0, pass.resolution as f32],
            ),
            None => (Mat4::IDENTITY, [0.0; 4]),
        };
        Self {
            view_proj: camera.view_projection().to_cols_array_2d(),
            position: camera.position.extend(1.0).to_array(),
            light_view_proj: light_view_proj.to_cols_array_2d(),
            shadow,
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub(crate) struct LightCameraUniform {
    pub(crate) view_proj: [[f32; 4]; 4],
}

/// One entry of the `objects` storage array, indexed by instance.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub(crate) struct ObjectData {
    model: [[f32; 4]; 4],
    normal: [[f32; 4]; 4],
    base_color: [f32; 4],
    /// shininess, specular strength, bump strength
    params: [f32; 4],
    /// x: first entry in the lights array
    info: [u32; 4],
}

impl ObjectData {
    pub(crate) fn caster(draw: &DepthDraw) -> Self {
        Self {
            model: draw.model.to_cols_array_2d(),
            normal: Mat4::IDENTITY.to_cols_array_2d(),
            ..Zeroable::zeroed()
        }
    }

    pub(crate) fn surface(draw: &DrawItem, lights_offset: u32) -> Self {
        let bump_strength = draw.bump.map_or(0.0, |b| b.strength);
        Self {
            model: draw.model.to_cols_array_2d(),
            normal: Mat4::from_mat3(draw.normal_matrix).to_cols_array_2d(),
            base_color: draw.base_color.extend(1.0).to_array(),
            params: [
                draw.params.shininess,
                draw.params.specular_strength,
                bump_strength,
                0.0,
            ],
            info: [lights_offset, 0, 0, 0],
        }
    }
}

pub(crate) fn clear_color(color: Vec3) -> wgpu::Color {
    wgpu::Color {
        r: color.x as f64,
        g: color.y as f64,
        b: color.z as f64,
        a: 1.0,
    }
}

/// Growable read-only storage buffer of `T`.
pub(crate) struct StorageBuffer<T: Pod> {
    label: &'static str,
    pub(crate) buffer: wgpu::Buffer,
    capacity: usize,
    _marker: std::marker::PhantomData<T>,
}

impl<T: Pod> StorageBuffer<T> {
    pub(crate) fn new(device: &wgpu::Device, label: &'static str, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            label,
            buffer: Self::allocate(device, label, capacity),
            capacity,
            _marker: std::marker::PhantomData,
        }
    }

    fn allocate(device: &wgpu::Device, label: &str, capacity: usize) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: (capacity * mem::size_of::<T>()) as u64,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    /// Uploads `data`, returning true when the buffer was reallocated and
    /// bind groups referencing it must be rebuilt.
    pub(crate) fn write(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, data: &[T]) -> bool {
        let mut grown = false;
        if data.len() > self.capacity {
            let new_capacity = data.len().max(self.capacity * 2);
            log::info!("Growing {} buffer: {} -> {}", self.label, self.capacity, new_capacity);
            self.buffer = Self::allocate(device, self.label, new_capacity);
            self.capacity = new_capacity;
            grown = true;
        }
        if !data.is_empty() {
            queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(data));
        }
        grown
    }
}

/// Bind group layouts shared by the surface programs and the depth pass.
pub(crate) struct Layouts {
    pub(crate) camera: wgpu::BindGroupLayout,
    pub(crate) objects: wgpu::BindGroupLayout,
    pub(crate) material: wgpu::BindGroupLayout,
    pub(crate) light_camera: wgpu::BindGroupLayout,
}

fn uniform_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn storage_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only: true },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn texture_entry(binding: u32, sample_type: wgpu::TextureSampleType, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Texture {
            sample_type,
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

impl Layouts {
    pub(crate) fn new(device: &wgpu::Device) -> Self {
        let both = wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT;

        let camera = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("CameraBindLayout"),
            entries: &[
                uniform_entry(0, both),
                // flat programs test the shadow map per vertex
                texture_entry(1, wgpu::TextureSampleType::Depth, both),
            ],
        });

        let objects = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("ObjectsBindLayout"),
            entries: &[storage_entry(0), storage_entry(1)],
        });

        let color = wgpu::TextureSampleType::Float { filterable: true };
        let material = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("MaterialBindLayout"),
            entries: &[
                texture_entry(0, color, wgpu::ShaderStages::FRAGMENT),
                texture_entry(1, color, wgpu::ShaderStages::FRAGMENT),
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let light_camera = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("LightCameraBindLayout"),
            entries: &[uniform_entry(0, wgpu::ShaderStages::VERTEX)],
        });

        Self {
            camera,
            objects,
            material,
            light_camera,
        }
    }
}

/// Per-frame uniforms and storage arrays.
pub(crate) struct FrameBuffers {
    pub(crate) camera: wgpu::Buffer,
    pub(crate) objects: StorageBuffer<ObjectData>,
    pub(crate) lights: StorageBuffer<LightsRaw>,
    pub(crate) objects_bind_group: wgpu::BindGroup,
    pub(crate) object_scratch: Vec<ObjectData>,
    pub(crate) light_scratch: Vec<LightsRaw>,
}

impl FrameBuffers {
    pub(crate) fn new(device: &wgpu::Device, layouts: &Layouts) -> Self {
        let camera = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("CameraUniformBuffer"),
            size: mem::size_of::<CameraUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let objects = StorageBuffer::new(device, "ObjectsBuffer", 64);
        let lights = StorageBuffer::new(device, "LightsBuffer", 256);
        let objects_bind_group = Self::objects_bind_group(device, layouts, &objects, &lights);

        Self {
            camera,
            objects,
            lights,
            objects_bind_group,
            object_scratch: Vec::new(),
            light_scratch: Vec::new(),
        }
    }

    fn objects_bind_group(
        device: &wgpu::Device,
        layouts: &Layouts,
        objects: &StorageBuffer<ObjectData>,
        lights: &StorageBuffer<LightsRaw>,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("ObjectsBindGroup"),
            layout: &layouts.objects,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: objects.buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: lights.buffer.as_entire_binding(),
                },
            ],
        })
    }

    /// Fills the storage arrays: casters take instances `0..casters.len()`,
    /// surface draws follow in order.
    pub(crate) fn upload(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layouts: &Layouts,
        casters: &[DepthDraw],
        draws: &[DrawItem],
    ) {
        self.object_scratch.clear();
        self.light_scratch.clear();

        self.object_scratch.extend(casters.iter().map(ObjectData::caster));
        for draw in draws {
            let offset = self.light_scratch.len() as u32;
            self.light_scratch.extend(draw.lights.to_uniform());
            self.object_scratch.push(ObjectData::surface(draw, offset));
        }

        let grown_objects = self.objects.write(device, queue, &self.object_scratch);
        let grown_lights = self.lights.write(device, queue, &self.light_scratch);
        if grown_objects || grown_lights {
            self.objects_bind_group = Self::objects_bind_group(device, layouts, &self.objects, &self.lights);
        }
    }
}
