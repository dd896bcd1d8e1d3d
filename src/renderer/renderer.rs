// renderer/renderer.rs
use std::collections::HashSet;

use glam::Vec3;
use hecs::Entity;

use crate::asset::{Assets, Handle};
use crate::error::{RenderError, ShaderError, ShadowError};
use crate::renderer::backend::{RenderBackend, SubmitStatus};
use crate::renderer::frame::{
    normal_matrix, CameraData, DepthDraw, DrawItem, FrameData, FrameStats, ShadowPass,
};
use crate::renderer::material::{Material, ShaderFeatures, Surface};
use crate::renderer::shading::ShadingParams;
use crate::renderer::shadow::{ShadowConfig, ShadowMap, ShadowMapper, ShadowState};
use crate::scene::{Camera, Scene};

/// Per-frame orchestration on top of a [`RenderBackend`]: transform refresh,
/// light collection, shadow pre-pass setup and draw list construction.
pub struct Renderer<B: RenderBackend> {
    backend: B,
    shadows: ShadowMapper,
    prepared: HashSet<crate::renderer::ShaderKey>,
    clear_color: Vec3,
}

impl<B: RenderBackend> Renderer<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            shadows: ShadowMapper::new(),
            prepared: HashSet::new(),
            clear_color: Vec3::ZERO,
        }
    }

    pub fn with_clear_color(mut self, color: Vec3) -> Self {
        self.clear_color = color;
        self
    }

    pub fn set_clear_color(&mut self, color: Vec3) {
        self.clear_color = color;
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn aspect_ratio(&self) -> f32 {
        let (w, h) = self.backend.viewport();
        w as f32 / h.max(1) as f32
    }

    /// Registers a material, compiling its program right away so that
    /// configuration errors surface here rather than mid-frame.
    pub fn add_material(
        &mut self,
        assets: &mut Assets,
        material: Material,
    ) -> Result<Handle<Material>, ShaderError> {
        let key = material.shader_key();
        if self.prepared.insert(key) {
            if let Err(e) = self.backend.prepare_program(&key, &material.label) {
                self.prepared.remove(&key);
                return Err(e);
            }
            log::debug!("Prepared program {} for '{}'", key.label(), material.label);
        }
        Ok(assets.materials.insert(material))
    }

    // ========================================================================
    // Shadows
    // ========================================================================

    pub fn enable_shadows(
        &mut self,
        scene: &Scene,
        light: Entity,
        config: ShadowConfig,
    ) -> Result<(), ShadowError> {
        let kind = scene.light(light).ok_or(ShadowError::NotALight(light))?.kind;
        self.shadows.enable(&mut self.backend, light, kind, config)
    }

    pub fn disable_shadows(&mut self) {
        self.shadows.disable(&mut self.backend);
    }

    pub fn shadow_state(&self) -> &ShadowState {
        self.shadows.state()
    }

    pub fn shadow_map(&self) -> Option<&ShadowMap> {
        self.shadows.map()
    }

    // ========================================================================
    // Frames
    // ========================================================================

    /// Builds the frame without submitting it.
    pub fn prepare_frame(&mut self, scene: &mut Scene, camera: Entity) -> Result<FrameData, RenderError> {
        scene.update_global_transforms();

        let camera = self.camera_data(scene, camera)?;
        let lights = scene.collect_lights();
        let shadow = self.shadow_pass(scene);
        let caster = shadow.and(self.shadows.map().map(|m| m.light));

        let mut stats = FrameStats::default();
        let mut casters = Vec::new();
        let mut draws = Vec::new();

        for (entity, mesh, visible, model) in scene.meshes() {
            if !visible {
                continue;
            }

            if scene.assets.geometry(mesh.geometry).is_err() {
                log::error!("Mesh {:?} references a missing geometry, skipping", entity);
                stats.skipped += 1;
                continue;
            }

            if shadow.is_some() && mesh.casts_shadow {
                casters.push(DepthDraw {
                    entity,
                    geometry: mesh.geometry,
                    model,
                });
            }

            let material = match scene.assets.material(mesh.material) {
                Ok(material) => material,
                Err(e) => {
                    log::error!("Mesh {:?}: {}, skipping", entity, e);
                    stats.skipped += 1;
                    continue;
                }
            };

            let packed = match lights.pack(material.light_capacity(), &material.label, caster) {
                Ok(packed) => packed,
                Err(e) => {
                    log::error!("Skipping mesh {:?}: {}", entity, e);
                    stats.skipped += 1;
                    continue;
                }
            };

            let mut key = material.shader_key();
            let mut base_color = material.base_color();
            let mut color_texture = None;
            if let Surface::Texture(texture) = material.surface {
                if scene.assets.texture(texture).is_ok() {
                    color_texture = Some(texture);
                } else {
                    log::warn!(
                        "Material '{}' references a missing texture, using solid color",
                        material.label
                    );
                    key.features.remove(ShaderFeatures::COLOR_TEXTURE);
                    base_color = Material::FALLBACK_COLOR;
                }
            }

            let bump = material
                .bump
                .filter(|b| scene.assets.texture(b.texture).is_ok());
            if material.bump.is_some() && bump.is_none() {
                log::warn!("Material '{}' references a missing bump texture", material.label);
                key.features.remove(ShaderFeatures::BUMP_TEXTURE);
            }

            if shadow.is_none() {
                key.features.remove(ShaderFeatures::RECEIVE_SHADOW);
            }

            if let Err(e) = self.ensure_program(&key, &material.label) {
                log::error!("Skipping mesh {:?}: {}", entity, e);
                stats.skipped += 1;
                continue;
            }

            draws.push(DrawItem {
                entity,
                label: material.label.clone(),
                geometry: mesh.geometry,
                key,
                model,
                normal_matrix: normal_matrix(model),
                params: ShadingParams {
                    model: material.shading_model,
                    shininess: material.shininess,
                    specular_strength: material.specular_strength,
                },
                base_color,
                color_texture,
                bump,
                lights: packed,
            });
        }

        stats.drawn = draws.len();
        stats.shadow_casters = casters.len();
        log::trace!(
            "Frame: {} draws, {} skipped, {} casters, {} lights",
            stats.drawn,
            stats.skipped,
            stats.shadow_casters,
            lights.len()
        );

        Ok(FrameData {
            camera,
            clear_color: self.clear_color,
            shadow,
            casters,
            draws,
            stats,
        })
    }

    /// Prepares and submits one frame from `camera`'s point of view.
    pub fn render(&mut self, scene: &mut Scene, camera: Entity) -> Result<FrameStats, RenderError> {
        let frame = self.prepare_frame(scene, camera)?;
        let status = self.backend.submit(&frame, &scene.assets)?;
        if status == SubmitStatus::Rendered && frame.shadow.is_some() {
            self.shadows.mark_rendered();
        }
        Ok(frame.stats)
    }

    fn ensure_program(&mut self, key: &crate::renderer::ShaderKey, label: &str) -> Result<(), ShaderError> {
        if self.prepared.contains(key) {
            return Ok(());
        }
        self.backend.prepare_program(key, label)?;
        self.prepared.insert(*key);
        Ok(())
    }

    fn camera_data(&self, scene: &Scene, entity: Entity) -> Result<CameraData, RenderError> {
        let camera = scene.camera(entity).ok_or(RenderError::NoSuchCamera(entity))?;
        let world = scene
            .world_matrix(entity)
            .map_err(|_| RenderError::NoSuchCamera(entity))?;
        Ok(CameraData {
            view: Camera::view(world),
            projection: camera.proj(),
            position: world.w_axis.truncate(),
        })
    }

    /// Updates the light camera from the caster's current pose. Skips the
    /// pre-pass when the caster is gone or no longer a light of that kind.
    fn shadow_pass(&mut self, scene: &Scene) -> Option<ShadowPass> {
        let map = self.shadows.map_mut()?;

        match scene.light(map.light) {
            Some(light) if light.kind == map.kind => {}
            _ => {
                log::warn!(
                    "Shadow caster {:?} is no longer a {} light, skipping shadow pass",
                    map.light,
                    map.kind
                );
                return None;
            }
        }

        let light_world = scene.world_matrix(map.light).ok()?;
        map.update(light_world);

        Some(ShadowPass {
            target: map.target,
            resolution: map.config.resolution,
            light_view_projection: map.light_view_projection,
            bias: map.config.bias,
            strength: map.config.strength,
        })
    }
}

impl<B: RenderBackend> Drop for Renderer<B> {
    fn drop(&mut self) {
        self.shadows.disable(&mut self.backend);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::software::SoftwareBackend;
    use crate::renderer::{primitives, Geometry};
    use crate::scene::{Light, LightKind};

    struct Fixture {
        scene: Scene,
        renderer: Renderer<SoftwareBackend>,
        camera: Entity,
        sphere: Handle<Geometry>,
    }

    fn fixture() -> Fixture {
        let mut scene = Scene::new();
        let renderer = Renderer::new(SoftwareBackend::new(32, 32));
        let camera = scene.spawn_camera("Camera", Camera::perspective(60.0, 1.0, 0.1, 100.0));
        scene.set_position(camera, Vec3::new(0.0, 0.0, 5.0)).unwrap();
        let root = scene.root();
        scene.add(root, camera).unwrap();
        let sphere = scene.assets.geometries.insert(primitives::sphere(1.0, 16, 8));
        Fixture {
            scene,
            renderer,
            camera,
            sphere,
        }
    }

    fn add_light(scene: &mut Scene, parent: Entity, light: Light) -> Entity {
        let entity = scene.spawn_light("light", light);
        scene.add(parent, entity).unwrap();
        entity
    }

    #[test]
    fn lights_are_collected_depth_first() {
        let mut f = fixture();
        let root = f.scene.root();
        let l1 = add_light(&mut f.scene, root, Light::point(Vec3::X));
        let l2 = add_light(&mut f.scene, l1, Light::point(Vec3::Y));
        let l3 = add_light(&mut f.scene, root, Light::point(Vec3::Z));

        f.scene.update_global_transforms();
        let lights = f.scene.collect_lights();
        let order: Vec<Entity> = lights.point().iter().map(|l| l.entity).collect();
        assert_eq!(order, vec![l1, l2, l3]);
    }

    #[test]
    fn over_capacity_mesh_is_skipped_but_still_casts() {
        let mut f = fixture();
        let root = f.scene.root();
        let sun = add_light(&mut f.scene, root, Light::directional(Vec3::ONE));
        add_light(&mut f.scene, root, Light::directional(Vec3::ONE));
        f.scene.set_direction(sun, Vec3::NEG_Y).unwrap();

        let small = f
            .renderer
            .add_material(&mut f.scene.assets, Material::lambert("small").build().unwrap())
            .unwrap();
        let big = f
            .renderer
            .add_material(
                &mut f.scene.assets,
                Material::lambert("big").with_light_capacity(2).build().unwrap(),
            )
            .unwrap();
        let a = f.scene.spawn_mesh("a", f.sphere, small).unwrap();
        let b = f.scene.spawn_mesh("b", f.sphere, big).unwrap();
        f.scene.add(root, a).unwrap();
        f.scene.add(root, b).unwrap();

        f.renderer
            .enable_shadows(&f.scene, sun, ShadowConfig::default().with_resolution(16))
            .unwrap();
        let stats = f.renderer.render(&mut f.scene, f.camera).unwrap();

        assert_eq!(stats.drawn, 1);
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.shadow_casters, 2);
        assert!(matches!(f.renderer.shadow_state(), ShadowState::MapValid(_)));
    }

    #[test]
    fn programs_are_shared_per_key() {
        let mut f = fixture();
        for label in ["a", "b", "c"] {
            f.renderer
                .add_material(&mut f.scene.assets, Material::phong(label).with_light_capacity(2).build().unwrap())
                .unwrap();
        }
        f.renderer
            .add_material(&mut f.scene.assets, Material::flat("d").build().unwrap())
            .unwrap();
        assert_eq!(f.renderer.backend().programs_compiled(), 2);
    }

    #[test]
    fn missing_texture_falls_back_to_solid_color() {
        let mut f = fixture();
        let material = Material::lambert("textured")
            .with_texture(Handle::new(42))
            .build()
            .unwrap();
        let handle = f.renderer.add_material(&mut f.scene.assets, material).unwrap();
        let mesh = f.scene.spawn_mesh("m", f.sphere, handle).unwrap();
        let root = f.scene.root();
        f.scene.add(root, mesh).unwrap();

        let frame = f.renderer.prepare_frame(&mut f.scene, f.camera).unwrap();
        let draw = &frame.draws[0];
        assert!(draw.color_texture.is_none());
        assert!(!draw.key.features.contains(ShaderFeatures::COLOR_TEXTURE));
        assert_eq!(draw.base_color, Material::FALLBACK_COLOR);
    }

    #[test]
    fn non_camera_is_rejected() {
        let mut f = fixture();
        let node = f.scene.spawn_node("not a camera");
        let err = f.renderer.render(&mut f.scene, node).unwrap_err();
        assert!(matches!(err, RenderError::NoSuchCamera(e) if e == node));
    }

    #[test]
    fn enable_shadows_requires_a_light() {
        let mut f = fixture();
        let node = f.scene.spawn_node("plain");
        let err = f
            .renderer
            .enable_shadows(&f.scene, node, ShadowConfig::default())
            .unwrap_err();
        assert!(matches!(err, ShadowError::NotALight(_)));

        let ambient = f.scene.spawn_light("ambient", Light::ambient(Vec3::ONE));
        let err = f
            .renderer
            .enable_shadows(&f.scene, ambient, ShadowConfig::default())
            .unwrap_err();
        assert!(matches!(err, ShadowError::UnsupportedLight(LightKind::Ambient)));
    }

    /// Software backend whose frames never reach the screen.
    struct LostSurface(SoftwareBackend);

    impl RenderBackend for LostSurface {
        fn prepare_program(&mut self, key: &crate::renderer::ShaderKey, material: &str) -> Result<(), ShaderError> {
            self.0.prepare_program(key, material)
        }

        fn create_depth_target(&mut self, size: u32) -> Result<crate::renderer::DepthTargetId, RenderError> {
            self.0.create_depth_target(size)
        }

        fn release_depth_target(&mut self, id: crate::renderer::DepthTargetId) -> Result<(), RenderError> {
            self.0.release_depth_target(id)
        }

        fn viewport(&self) -> (u32, u32) {
            self.0.viewport()
        }

        fn submit(&mut self, _frame: &FrameData, _assets: &Assets) -> Result<SubmitStatus, RenderError> {
            Ok(SubmitStatus::Skipped)
        }
    }

    #[test]
    fn skipped_submit_leaves_map_pending() {
        let mut scene = Scene::new();
        let mut renderer = Renderer::new(LostSurface(SoftwareBackend::new(16, 16)));
        let root = scene.root();
        let camera = scene.spawn_camera("Camera", Camera::default());
        scene.add(root, camera).unwrap();
        let sun = add_light(&mut scene, root, Light::directional(Vec3::ONE));

        renderer
            .enable_shadows(&scene, sun, ShadowConfig::default().with_resolution(16))
            .unwrap();
        renderer.render(&mut scene, camera).unwrap();
        assert!(matches!(renderer.shadow_state(), ShadowState::Enabled(_)));
    }

    #[test]
    fn out_of_range_indices_are_skipped_in_both_passes() {
        let mut f = fixture();
        let root = f.scene.root();
        let sun = add_light(&mut f.scene, root, Light::directional(Vec3::ONE));
        f.scene.set_position(sun, Vec3::new(0.0, 0.0, 3.0)).unwrap();
        f.scene.set_direction(sun, Vec3::NEG_Z).unwrap();

        let mut broken = primitives::rectangle(2.0, 2.0);
        broken.indices = vec![0, 1, 99, 0, 3, 2];
        let broken = f.scene.assets.geometries.insert(broken);
        let material = f
            .renderer
            .add_material(
                &mut f.scene.assets,
                Material::lambert("m").receive_shadow(true).build().unwrap(),
            )
            .unwrap();
        let mesh = f.scene.spawn_mesh("broken", broken, material).unwrap();
        f.scene.add(root, mesh).unwrap();

        f.renderer
            .enable_shadows(&f.scene, sun, ShadowConfig::default().with_resolution(16))
            .unwrap();
        let stats = f.renderer.render(&mut f.scene, f.camera).unwrap();
        assert_eq!(stats.drawn, 1);
        assert_eq!(stats.shadow_casters, 1);

        // the remaining triangle covers the upper-left half of the rectangle
        let backend = f.renderer.backend();
        let (x, y) = backend.project_to_pixel(Vec3::new(-0.5, 0.5, 0.0)).unwrap();
        assert!(backend.color_at(x, y).abs_diff_eq(Vec3::ONE, 1e-4));
    }

    #[test]
    fn despawned_caster_skips_pre_pass() {
        let mut f = fixture();
        let root = f.scene.root();
        let sun = add_light(&mut f.scene, root, Light::directional(Vec3::ONE));
        f.renderer
            .enable_shadows(&f.scene, sun, ShadowConfig::default())
            .unwrap();
        f.scene.despawn_recursive(sun).unwrap();

        let frame = f.renderer.prepare_frame(&mut f.scene, f.camera).unwrap();
        assert!(frame.shadow.is_none());
        assert!(matches!(f.renderer.shadow_state(), ShadowState::Enabled(_)));
    }
}
