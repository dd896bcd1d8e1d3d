// scene/builder.rs
// Fluent helper for spawning and attaching scene nodes

use glam::Vec3;
use hecs::Entity;

use super::components::{MeshComponent, Visible};
use crate::asset::Handle;
use crate::error::SceneError;
use crate::renderer::{Geometry, Material};
use crate::scene::{Camera, Light, Scene, Transform};

/// Collects a node's parts, then spawns and attaches it in one call.
///
/// ```ignore
/// let sphere = NodeBuilder::new("Sphere")
///     .with_mesh(geometry, material)
///     .at(Vec3::new(0.0, 1.0, 0.0))
///     .spawn_under(&mut scene, parent)?;
/// ```
pub struct NodeBuilder {
    name: String,
    transform: Transform,
    light: Option<Light>,
    camera: Option<Camera>,
    mesh: Option<MeshComponent>,
    visible: bool,
}

impl NodeBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transform: Transform::IDENTITY,
            light: None,
            camera: None,
            mesh: None,
            visible: true,
        }
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn at(mut self, position: Vec3) -> Self {
        self.transform.set_position(position);
        self
    }

    pub fn looking_at(mut self, target: Vec3) -> Self {
        self.transform.look_at(target);
        self
    }

    pub fn facing(mut self, direction: Vec3) -> Self {
        self.transform.set_direction(direction);
        self
    }

    pub fn with_light(mut self, light: Light) -> Self {
        self.light = Some(light);
        self
    }

    pub fn with_camera(mut self, camera: Camera) -> Self {
        self.camera = Some(camera);
        self
    }

    pub fn with_mesh(mut self, geometry: Handle<Geometry>, material: Handle<Material>) -> Self {
        self.mesh = Some(MeshComponent::new(geometry, material));
        self
    }

    pub fn casts_shadow(mut self, casts: bool) -> Self {
        if let Some(mesh) = &mut self.mesh {
            mesh.casts_shadow = casts;
        }
        self
    }

    pub fn visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    /// Spawns the node detached from the hierarchy.
    pub fn spawn(self, scene: &mut Scene) -> Result<Entity, SceneError> {
        if let Some(mesh) = &self.mesh {
            scene.check_mesh(mesh.geometry, mesh.material)?;
        }

        let entity = scene.spawn_node(self.name);
        scene.set_local_transform(entity, self.transform)?;

        let mut builder = hecs::EntityBuilder::new();
        builder.add(Visible(self.visible));
        if let Some(light) = self.light {
            builder.add(light);
        }
        if let Some(camera) = self.camera {
            builder.add(camera);
        }
        if let Some(mesh) = self.mesh {
            builder.add(mesh);
        }
        scene
            .world
            .insert(entity, builder.build())
            .map_err(|_| SceneError::NoSuchNode(entity))?;

        Ok(entity)
    }

    pub fn spawn_under(self, scene: &mut Scene, parent: Entity) -> Result<Entity, SceneError> {
        let entity = self.spawn(scene)?;
        if let Err(e) = scene.add(parent, entity) {
            let _ = scene.despawn_recursive(entity);
            return Err(e);
        }
        Ok(entity)
    }
}
