// renderer/material.rs

use bitflags::bitflags;
use glam::Vec3;

use crate::asset::Handle;
use crate::error::ShaderError;
use crate::renderer::TextureData;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShadingModel {
    /// Lighting evaluated once per vertex, constant across each face.
    Flat,
    /// Per-fragment diffuse only.
    Lambert,
    /// Per-fragment diffuse and specular.
    Phong,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Surface {
    Color(Vec3),
    Texture(Handle<TextureData>),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BumpMap {
    pub texture: Handle<TextureData>,
    pub strength: f32,
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ShaderFeatures: u32 {
        const COLOR_TEXTURE = 1 << 0;
        const BUMP_TEXTURE = 1 << 1;
        const RECEIVE_SHADOW = 1 << 2;
    }
}

/// Identifies one compiled shading program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderKey {
    pub model: ShadingModel,
    pub features: ShaderFeatures,
    pub light_capacity: usize,
}

impl ShaderKey {
    pub fn label(&self) -> String {
        format!(
            "{:?}[{}]{}{}{}",
            self.model,
            self.light_capacity,
            if self.features.contains(ShaderFeatures::COLOR_TEXTURE) { "+tex" } else { "" },
            if self.features.contains(ShaderFeatures::BUMP_TEXTURE) { "+bump" } else { "" },
            if self.features.contains(ShaderFeatures::RECEIVE_SHADOW) { "+shadow" } else { "" },
        )
    }
}

/// Validated surface description. Build one with [`Material::flat`],
/// [`Material::lambert`] or [`Material::phong`].
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub label: String,
    pub shading_model: ShadingModel,
    light_capacity: usize,
    pub surface: Surface,
    pub bump: Option<BumpMap>,
    pub receives_shadow: bool,
    pub shininess: f32,
    pub specular_strength: f32,
}

impl Material {
    pub const MAX_LIGHT_CAPACITY: usize = 16;
    pub const FALLBACK_COLOR: Vec3 = Vec3::ONE;
    pub const DEFAULT_SHININESS: f32 = 32.0;
    pub const DEFAULT_SPECULAR_STRENGTH: f32 = 1.0;

    pub fn flat(label: impl Into<String>) -> MaterialBuilder {
        MaterialBuilder::new(label, ShadingModel::Flat)
    }

    pub fn lambert(label: impl Into<String>) -> MaterialBuilder {
        MaterialBuilder::new(label, ShadingModel::Lambert)
    }

    pub fn phong(label: impl Into<String>) -> MaterialBuilder {
        MaterialBuilder::new(label, ShadingModel::Phong)
    }

    /// Number of slots per light kind; fixed at construction.
    pub fn light_capacity(&self) -> usize {
        self.light_capacity
    }

    pub fn requires_tangents(&self) -> bool {
        self.bump.is_some()
    }

    pub fn features(&self) -> ShaderFeatures {
        let mut features = ShaderFeatures::empty();
        if matches!(self.surface, Surface::Texture(_)) {
            features |= ShaderFeatures::COLOR_TEXTURE;
        }
        if self.bump.is_some() {
            features |= ShaderFeatures::BUMP_TEXTURE;
        }
        if self.receives_shadow {
            features |= ShaderFeatures::RECEIVE_SHADOW;
        }
        features
    }

    pub fn shader_key(&self) -> ShaderKey {
        ShaderKey {
            model: self.shading_model,
            features: self.features(),
            light_capacity: self.light_capacity,
        }
    }

    pub fn base_color(&self) -> Vec3 {
        match self.surface {
            Surface::Color(color) => color,
            Surface::Texture(_) => Self::FALLBACK_COLOR,
        }
    }
}

pub struct MaterialBuilder {
    label: String,
    model: ShadingModel,
    light_capacity: usize,
    color: Option<Vec3>,
    texture: Option<Handle<TextureData>>,
    bump: Option<BumpMap>,
    receives_shadow: bool,
    shininess: f32,
    specular_strength: f32,
}

impl MaterialBuilder {
    fn new(label: impl Into<String>, model: ShadingModel) -> Self {
        Self {
            label: label.into(),
            model,
            light_capacity: 1,
            color: None,
            texture: None,
            bump: None,
            receives_shadow: false,
            shininess: Material::DEFAULT_SHININESS,
            specular_strength: Material::DEFAULT_SPECULAR_STRENGTH,
        }
    }

    pub fn with_light_capacity(mut self, capacity: usize) -> Self {
        self.light_capacity = capacity;
        self
    }

    pub fn with_color(mut self, color: Vec3) -> Self {
        self.color = Some(color);
        self
    }

    pub fn with_texture(mut self, texture: Handle<TextureData>) -> Self {
        self.texture = Some(texture);
        self
    }

    pub fn with_bump(mut self, texture: Handle<TextureData>, strength: f32) -> Self {
        self.bump = Some(BumpMap { texture, strength });
        self
    }

    pub fn receive_shadow(mut self, receives: bool) -> Self {
        self.receives_shadow = receives;
        self
    }

    pub fn with_shininess(mut self, shininess: f32) -> Self {
        self.shininess = shininess;
        self
    }

    pub fn with_specular_strength(mut self, strength: f32) -> Self {
        self.specular_strength = strength;
        self
    }

    pub fn build(self) -> Result<Material, ShaderError> {
        let material = self.label;

        if self.light_capacity == 0 || self.light_capacity > Material::MAX_LIGHT_CAPACITY {
            return Err(ShaderError::InvalidLightCapacity {
                material,
                capacity: self.light_capacity,
                max: Material::MAX_LIGHT_CAPACITY,
            });
        }

        let surface = match (self.color, self.texture) {
            (Some(_), Some(_)) => return Err(ShaderError::ConflictingSurface { material }),
            (Some(color), None) => Surface::Color(color),
            (None, Some(texture)) => Surface::Texture(texture),
            (None, None) => Surface::Color(Material::FALLBACK_COLOR),
        };

        if self.model == ShadingModel::Flat && self.bump.is_some() {
            return Err(ShaderError::BumpOnFlat { material });
        }

        let checks = [
            ("shininess", self.shininess, self.shininess.is_finite() && self.shininess > 0.0),
            (
                "specular strength",
                self.specular_strength,
                self.specular_strength.is_finite() && self.specular_strength >= 0.0,
            ),
            (
                "bump strength",
                self.bump.map_or(0.0, |b| b.strength),
                self.bump.map_or(true, |b| b.strength.is_finite()),
            ),
        ];
        if let Some(&(parameter, value, _)) = checks.iter().find(|(_, _, ok)| !ok) {
            return Err(ShaderError::InvalidParameter {
                material,
                parameter,
                value,
            });
        }

        if let Surface::Color(c) = surface {
            if !c.is_finite() {
                return Err(ShaderError::InvalidParameter {
                    material,
                    parameter: "base color",
                    value: c.max_element(),
                });
            }
        }

        Ok(Material {
            label: material,
            shading_model: self.model,
            light_capacity: self.light_capacity,
            surface,
            bump: self.bump,
            receives_shadow: self.receives_shadow,
            shininess: self.shininess,
            specular_strength: self.specular_strength,
        })
    }
}
