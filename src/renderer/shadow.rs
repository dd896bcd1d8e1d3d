use glam::Mat4;
use hecs::Entity;

use super::backend::{DepthTargetId, RenderBackend};
use crate::error::ShadowError;
use crate::scene::LightKind;
use crate::settings::RenderSettings;

/// Orthographic extent of a directional light's shadow camera, in light
/// view space. `near`/`far` also bound a point light's perspective frustum.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowBounds {
    pub left: f32,
    pub right: f32,
    pub bottom: f32,
    pub top: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for ShadowBounds {
    fn default() -> Self {
        Self {
            left: -5.0,
            right: 5.0,
            bottom: -5.0,
            top: 5.0,
            near: 0.0,
            far: 20.0,
        }
    }
}

impl ShadowBounds {
    pub fn symmetric(half_extent: f32, near: f32, far: f32) -> Self {
        Self {
            left: -half_extent,
            right: half_extent,
            bottom: -half_extent,
            top: half_extent,
            near,
            far,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowConfig {
    /// Width and height of the square depth texture.
    pub resolution: u32,
    pub bounds: ShadowBounds,
    /// Vertical field of view in degrees, used for point casters.
    pub field_of_view: f32,
    /// Depth-compare offset in light-space depth units.
    pub bias: f32,
    /// Fraction of the caster's direct light removed in shadow.
    pub strength: f32,
}

impl Default for ShadowConfig {
    fn default() -> Self {
        Self {
            resolution: 512,
            bounds: ShadowBounds::default(),
            field_of_view: 90.0,
            bias: 0.01,
            strength: 1.0,
        }
    }
}

impl ShadowConfig {
    /// Nearest plane used by perspective (point light) shadow cameras when
    /// `bounds.near` is not positive.
    pub const MIN_PERSPECTIVE_NEAR: f32 = 0.05;

    pub fn from_settings(settings: &RenderSettings) -> Self {
        Self {
            resolution: settings.shadow_map_size,
            ..Self::default()
        }
    }

    pub fn with_bounds(mut self, bounds: ShadowBounds) -> Self {
        self.bounds = bounds;
        self
    }

    pub fn with_resolution(mut self, resolution: u32) -> Self {
        self.resolution = resolution;
        self
    }

    pub fn with_bias(mut self, bias: f32) -> Self {
        self.bias = bias;
        self
    }

    pub fn with_strength(mut self, strength: f32) -> Self {
        self.strength = strength;
        self
    }

    pub fn validate(&self) -> Result<(), ShadowError> {
        let b = &self.bounds;
        let invalid = |msg: String| Err(ShadowError::InvalidConfig(msg));

        if self.resolution == 0 || self.resolution > 8192 {
            return invalid(format!("resolution {} is outside 1..=8192", self.resolution));
        }
        if !(b.left < b.right && b.bottom < b.top) {
            return invalid(format!(
                "empty bounds: left {} right {} bottom {} top {}",
                b.left, b.right, b.bottom, b.top
            ));
        }
        if !(b.near >= 0.0 && b.near < b.far) {
            return invalid(format!("near {} must be >= 0 and below far {}", b.near, b.far));
        }
        if !(self.field_of_view > 0.0 && self.field_of_view < 180.0) {
            return invalid(format!("field of view {} is outside (0, 180)", self.field_of_view));
        }
        if !(self.bias.is_finite() && self.bias >= 0.0) {
            return invalid(format!("bias {} must be a non-negative number", self.bias));
        }
        if !(0.0..=1.0).contains(&self.strength) {
            return invalid(format!("strength {} is outside 0..=1", self.strength));
        }
        Ok(())
    }

    pub fn projection(&self, kind: LightKind) -> Mat4 {
        let b = &self.bounds;
        match kind {
            LightKind::Point => Mat4::perspective_rh(
                self.field_of_view.to_radians(),
                1.0,
                b.near.max(Self::MIN_PERSPECTIVE_NEAR),
                b.far,
            ),
            _ => Mat4::orthographic_rh(b.left, b.right, b.bottom, b.top, b.near, b.far),
        }
    }
}

/// Depth render target plus the light camera that fills it.
#[derive(Debug, Clone, PartialEq)]
pub struct ShadowMap {
    pub light: Entity,
    pub kind: LightKind,
    pub config: ShadowConfig,
    pub target: DepthTargetId,
    pub light_view_projection: Mat4,
}

impl ShadowMap {
    /// Re-derives the light camera from the light's world matrix. Scale is
    /// discarded so a scaled light node does not distort the frustum.
    pub fn update(&mut self, light_world: Mat4) {
        let (_, rotation, translation) = light_world.to_scale_rotation_translation();
        let view = Mat4::from_rotation_translation(rotation, translation).inverse();
        self.light_view_projection = self.config.projection(self.kind) * view;
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum ShadowState {
    #[default]
    Disabled,
    /// Target allocated, nothing rendered into it yet.
    Enabled(ShadowMap),
    /// The depth pre-pass has run at least once for this map.
    MapValid(ShadowMap),
}

#[derive(Debug, Default)]
pub struct ShadowMapper {
    state: ShadowState,
}

impl ShadowMapper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &ShadowState {
        &self.state
    }

    pub fn is_enabled(&self) -> bool {
        !matches!(self.state, ShadowState::Disabled)
    }

    pub fn map(&self) -> Option<&ShadowMap> {
        match &self.state {
            ShadowState::Disabled => None,
            ShadowState::Enabled(map) | ShadowState::MapValid(map) => Some(map),
        }
    }

    pub fn map_mut(&mut self) -> Option<&mut ShadowMap> {
        match &mut self.state {
            ShadowState::Disabled => None,
            ShadowState::Enabled(map) | ShadowState::MapValid(map) => Some(map),
        }
    }

    /// Allocates a depth target for `light` and makes it the caster. An
    /// existing map is replaced only after the new target exists.
    pub fn enable<B: RenderBackend>(
        &mut self,
        backend: &mut B,
        light: Entity,
        kind: LightKind,
        config: ShadowConfig,
    ) -> Result<(), ShadowError> {
        if kind == LightKind::Ambient {
            return Err(ShadowError::UnsupportedLight(kind));
        }
        config.validate()?;

        let target = backend.create_depth_target(config.resolution)?;
        let map = ShadowMap {
            light,
            kind,
            config,
            target,
            light_view_projection: Mat4::IDENTITY,
        };

        let previous = std::mem::replace(&mut self.state, ShadowState::Enabled(map));
        Self::release(backend, previous);

        log::info!(
            "Shadows enabled for {} light {:?} ({}x{})",
            kind,
            light,
            config.resolution,
            config.resolution
        );
        Ok(())
    }

    pub fn disable<B: RenderBackend>(&mut self, backend: &mut B) {
        let previous = std::mem::take(&mut self.state);
        if matches!(previous, ShadowState::Disabled) {
            return;
        }
        Self::release(backend, previous);
        log::info!("Shadows disabled");
    }

    pub fn mark_rendered(&mut self) {
        if let ShadowState::Enabled(_) = self.state {
            if let ShadowState::Enabled(map) = std::mem::take(&mut self.state) {
                self.state = ShadowState::MapValid(map);
            }
        }
    }

    fn release<B: RenderBackend>(backend: &mut B, state: ShadowState) {
        let map = match state {
            ShadowState::Disabled => return,
            ShadowState::Enabled(map) | ShadowState::MapValid(map) => map,
        };
        if let Err(e) = backend.release_depth_target(map.target) {
            log::warn!("Failed to release shadow target {:?}: {}", map.target, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::shading::project_to_shadow_space;
    use crate::renderer::software::SoftwareBackend;
    use glam::Vec3;

    fn entity(world: &mut hecs::World) -> Entity {
        world.spawn(())
    }

    #[test]
    fn default_config_is_valid() {
        let config = ShadowConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.bias, 0.01);
        assert_eq!(config.bounds.far, 20.0);
    }

    #[test]
    fn invalid_configs_are_rejected() {
        let bad = [
            ShadowConfig::default().with_resolution(0),
            ShadowConfig::default().with_strength(1.5),
            ShadowConfig::default().with_bias(-1.0),
            ShadowConfig::default().with_bounds(ShadowBounds::symmetric(5.0, 10.0, 1.0)),
        ];
        for config in bad {
            assert!(matches!(config.validate(), Err(ShadowError::InvalidConfig(_))));
        }
    }

    #[test]
    fn state_machine_transitions() {
        let mut world = hecs::World::new();
        let light = entity(&mut world);
        let mut backend = SoftwareBackend::new(8, 8);
        let mut mapper = ShadowMapper::new();
        assert_eq!(mapper.state(), &ShadowState::Disabled);

        mapper
            .enable(&mut backend, light, LightKind::Directional, ShadowConfig::default())
            .unwrap();
        assert!(matches!(mapper.state(), ShadowState::Enabled(_)));

        mapper.mark_rendered();
        assert!(matches!(mapper.state(), ShadowState::MapValid(_)));

        mapper.disable(&mut backend);
        assert_eq!(mapper.state(), &ShadowState::Disabled);
        assert_eq!(backend.depth_target_count(), 0);
    }

    #[test]
    fn re_enable_replaces_target() {
        let mut world = hecs::World::new();
        let first = entity(&mut world);
        let second = entity(&mut world);
        let mut backend = SoftwareBackend::new(8, 8);
        let mut mapper = ShadowMapper::new();

        mapper
            .enable(&mut backend, first, LightKind::Directional, ShadowConfig::default())
            .unwrap();
        mapper.mark_rendered();
        let old_target = mapper.map().unwrap().target;

        mapper
            .enable(&mut backend, second, LightKind::Point, ShadowConfig::default().with_resolution(64))
            .unwrap();
        let map = mapper.map().unwrap();
        assert_eq!(map.light, second);
        assert_ne!(map.target, old_target);
        assert!(matches!(mapper.state(), ShadowState::Enabled(_)));
        assert!(backend.depth_target(old_target).is_none());
        assert_eq!(backend.depth_target_count(), 1);
    }

    #[test]
    fn ambient_cannot_cast() {
        let mut world = hecs::World::new();
        let light = entity(&mut world);
        let mut backend = SoftwareBackend::new(8, 8);
        let mut mapper = ShadowMapper::new();
        let err = mapper
            .enable(&mut backend, light, LightKind::Ambient, ShadowConfig::default())
            .unwrap_err();
        assert!(matches!(err, ShadowError::UnsupportedLight(LightKind::Ambient)));
        assert!(!mapper.is_enabled());
    }

    #[test]
    fn directional_update_looks_along_light() {
        let mut world = hecs::World::new();
        let light = entity(&mut world);
        let mut map = ShadowMap {
            light,
            kind: LightKind::Directional,
            config: ShadowConfig::default(),
            target: DepthTargetId(0),
            light_view_projection: Mat4::IDENTITY,
        };
        let mut transform = crate::scene::Transform::from_translation(Vec3::new(0.0, 10.0, 0.0));
        transform.set_direction(Vec3::NEG_Y);
        transform.scale(Vec3::splat(3.0), true);
        map.update(transform.matrix());

        let p = project_to_shadow_space(map.light_view_projection, Vec3::ZERO).unwrap();
        assert!(p.abs_diff_eq(Vec3::new(0.5, 0.5, 0.5), 1e-5));
    }
}
