use super::components::*;
use super::internal::{hierarchy, lights, transforms};
use crate::asset::{Assets, Handle};
use crate::error::SceneError;
use crate::renderer::lights::LightSet;
use crate::renderer::{Geometry, Material};
use crate::scene::{Camera, Light, Transform};
use glam::{Mat4, Vec3};
use hecs::{Entity, World};

/// Scene graph stored in a `hecs::World`.
///
/// Every node carries `Name`, `LocalTransform`, `GlobalTransform` and
/// `Children`; attached nodes additionally carry `Parent`. The root node is
/// created with the scene and is the starting point of transform propagation
/// and light collection.
pub struct Scene {
    pub world: World,
    pub assets: Assets,
    root: Entity,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    pub fn new() -> Self {
        let mut world = World::new();
        let root = world.spawn(node_components("Scene", Transform::IDENTITY));
        Self {
            world,
            assets: Assets::default(),
            root,
        }
    }

    pub fn root(&self) -> Entity {
        self.root
    }

    // ========================================================================
    // Node creation
    // ========================================================================

    /// Spawns a detached node with an identity transform.
    pub fn spawn_node(&mut self, name: impl Into<String>) -> Entity {
        self.world.spawn(node_components(name, Transform::IDENTITY))
    }

    pub fn spawn_light(&mut self, name: impl Into<String>, light: Light) -> Entity {
        let entity = self.spawn_node(name);
        self.insert_component(entity, light);
        entity
    }

    pub fn spawn_camera(&mut self, name: impl Into<String>, camera: Camera) -> Entity {
        let entity = self.spawn_node(name);
        self.insert_component(entity, camera);
        entity
    }

    /// Spawns a detached mesh node. Fails if the material needs tangents
    /// (bump mapping) and the geometry does not provide them.
    pub fn spawn_mesh(
        &mut self,
        name: impl Into<String>,
        geometry: Handle<Geometry>,
        material: Handle<Material>,
    ) -> Result<Entity, SceneError> {
        self.check_mesh(geometry, material)?;
        let entity = self.spawn_node(name);
        self.insert_component(entity, MeshComponent::new(geometry, material));
        self.insert_component(entity, Visible::default());
        Ok(entity)
    }

    pub(crate) fn check_mesh(
        &self,
        geometry: Handle<Geometry>,
        material: Handle<Material>,
    ) -> Result<(), SceneError> {
        let geo = self.assets.geometry(geometry)?;
        let mat = self.assets.material(material)?;
        if mat.requires_tangents() && !geo.has_tangents {
            return Err(crate::error::ShaderError::MissingTangents {
                material: mat.label.clone(),
                geometry: geo.label.clone(),
            }
            .into());
        }
        Ok(())
    }

    fn insert_component(&mut self, entity: Entity, component: impl hecs::Component) {
        if let Err(e) = self.world.insert_one(entity, component) {
            log::error!("Failed to insert component for {:?}: {:?}", entity, e);
        }
    }

    // ========================================================================
    // Hierarchy
    // ========================================================================

    pub fn is_node(&self, entity: Entity) -> bool {
        self.world.get::<&LocalTransform>(entity).is_ok()
    }

    fn require_node(&self, entity: Entity) -> Result<(), SceneError> {
        if self.is_node(entity) {
            Ok(())
        } else {
            Err(SceneError::NoSuchNode(entity))
        }
    }

    /// Attaches `child` as the last child of `parent`, detaching it from its
    /// previous parent first. The graph is left untouched on error.
    pub fn add(&mut self, parent: Entity, child: Entity) -> Result<(), SceneError> {
        self.require_node(parent)?;
        self.require_node(child)?;

        if hierarchy::is_ancestor_or_self(&self.world, child, parent) {
            return Err(SceneError::Cycle { parent, child });
        }

        hierarchy::attach(&mut self.world, parent, child);
        log::trace!("Attached {:?} under {:?}", child, parent);
        Ok(())
    }

    /// Detaches `child` from `parent`. No-op if it is not a child of `parent`.
    pub fn remove(&mut self, parent: Entity, child: Entity) {
        if hierarchy::parent_of(&self.world, child) == Some(parent) {
            hierarchy::detach(&mut self.world, child);
        }
    }

    /// Detaches `node` and destroys it together with its whole subtree.
    pub fn despawn_recursive(&mut self, node: Entity) -> Result<(), SceneError> {
        self.require_node(node)?;
        if node == self.root {
            log::warn!("Refusing to despawn the scene root");
            return Ok(());
        }

        hierarchy::detach(&mut self.world, node);
        let subtree = hierarchy::depth_first(&self.world, node);
        for entity in &subtree {
            // Already-removed entities are fine to skip.
            let _ = self.world.despawn(*entity);
        }
        log::debug!("Despawned {} nodes", subtree.len());
        Ok(())
    }

    pub fn parent(&self, node: Entity) -> Option<Entity> {
        hierarchy::parent_of(&self.world, node)
    }

    pub fn children(&self, node: Entity) -> Vec<Entity> {
        hierarchy::children_of(&self.world, node)
    }

    /// Depth-first pre-order descendants of `node`, excluding `node` itself.
    pub fn descendants(&self, node: Entity) -> Vec<Entity> {
        let mut order = hierarchy::depth_first(&self.world, node);
        order.remove(0);
        order
    }

    pub fn name(&self, node: Entity) -> Option<String> {
        self.world.get::<&Name>(node).ok().map(|n| n.0.clone())
    }

    pub fn find_by_name(&self, name: &str) -> Option<Entity> {
        hierarchy::depth_first(&self.world, self.root)
            .into_iter()
            .find(|&e| self.world.get::<&Name>(e).map_or(false, |n| n.0 == name))
    }

    pub fn set_visible(&mut self, node: Entity, visible: bool) -> Result<(), SceneError> {
        self.require_node(node)?;
        self.insert_component(node, Visible(visible));
        Ok(())
    }

    pub fn set_casts_shadow(&mut self, node: Entity, casts: bool) -> Result<(), SceneError> {
        let mut mesh = self
            .world
            .get::<&mut MeshComponent>(node)
            .map_err(|_| SceneError::NoSuchNode(node))?;
        mesh.casts_shadow = casts;
        Ok(())
    }

    // ========================================================================
    // Transforms
    // ========================================================================

    pub fn update_global_transforms(&mut self) {
        transforms::propagate_transforms(&mut self.world, self.root);
    }

    /// Propagates from an arbitrary node; its global transform becomes its
    /// local transform.
    pub fn update_global_transforms_from(&mut self, root: Entity) {
        transforms::propagate_transforms(&mut self.world, root);
    }

    /// World matrix computed from the parent chain, independent of the last
    /// propagation pass.
    pub fn world_matrix(&self, node: Entity) -> Result<Mat4, SceneError> {
        hierarchy::world_matrix(&self.world, node).ok_or(SceneError::NoSuchNode(node))
    }

    pub fn world_position(&self, node: Entity) -> Result<Vec3, SceneError> {
        Ok(self.world_matrix(node)?.w_axis.truncate())
    }

    pub fn local_transform(&self, node: Entity) -> Result<Transform, SceneError> {
        self.world
            .get::<&LocalTransform>(node)
            .map(|t| t.0)
            .map_err(|_| SceneError::NoSuchNode(node))
    }

    /// Global transform as of the last propagation pass.
    pub fn global_transform(&self, node: Entity) -> Result<Transform, SceneError> {
        self.world
            .get::<&GlobalTransform>(node)
            .map(|t| t.0)
            .map_err(|_| SceneError::NoSuchNode(node))
    }

    fn with_local(
        &mut self,
        node: Entity,
        f: impl FnOnce(&mut Transform),
    ) -> Result<(), SceneError> {
        let mut local = self
            .world
            .get::<&mut LocalTransform>(node)
            .map_err(|_| SceneError::NoSuchNode(node))?;
        f(&mut local.0);
        Ok(())
    }

    pub fn set_local_transform(&mut self, node: Entity, transform: Transform) -> Result<(), SceneError> {
        self.with_local(node, |t| *t = transform)
    }

    pub fn set_position(&mut self, node: Entity, position: Vec3) -> Result<(), SceneError> {
        self.with_local(node, |t| t.set_position(position))
    }

    pub fn translate(&mut self, node: Entity, offset: Vec3, local: bool) -> Result<(), SceneError> {
        self.with_local(node, |t| t.translate(offset, local))
    }

    pub fn rotate_x(&mut self, node: Entity, angle: f32, local: bool) -> Result<(), SceneError> {
        self.with_local(node, |t| t.rotate_x(angle, local))
    }

    pub fn rotate_y(&mut self, node: Entity, angle: f32, local: bool) -> Result<(), SceneError> {
        self.with_local(node, |t| t.rotate_y(angle, local))
    }

    pub fn rotate_z(&mut self, node: Entity, angle: f32, local: bool) -> Result<(), SceneError> {
        self.with_local(node, |t| t.rotate_z(angle, local))
    }

    pub fn scale(&mut self, node: Entity, factor: Vec3, local: bool) -> Result<(), SceneError> {
        self.with_local(node, |t| t.scale(factor, local))
    }

    pub fn look_at(&mut self, node: Entity, target: Vec3) -> Result<(), SceneError> {
        self.with_local(node, |t| t.look_at(target))
    }

    pub fn set_direction(&mut self, node: Entity, direction: Vec3) -> Result<(), SceneError> {
        self.with_local(node, |t| t.set_direction(direction))
    }

    // ========================================================================
    // Queries used by the renderer
    // ========================================================================

    pub(crate) fn collect_lights(&self) -> LightSet {
        lights::collect_lights(&self.world, self.root)
    }

    pub fn light(&self, node: Entity) -> Option<Light> {
        lights::is_light(&self.world, node)
    }

    pub fn light_mut(&mut self, node: Entity) -> Option<hecs::RefMut<'_, Light>> {
        self.world.get::<&mut Light>(node).ok()
    }

    pub fn camera(&self, node: Entity) -> Option<Camera> {
        self.world.get::<&Camera>(node).ok().map(|c| *c)
    }

    pub fn camera_mut(&mut self, node: Entity) -> Option<hecs::RefMut<'_, Camera>> {
        self.world.get::<&mut Camera>(node).ok()
    }

    /// Meshes reachable from the root in depth-first order with their
    /// current global matrix.
    pub(crate) fn meshes(&self) -> Vec<(Entity, MeshComponent, bool, Mat4)> {
        hierarchy::depth_first(&self.world, self.root)
            .into_iter()
            .filter_map(|entity| {
                let mesh = *self.world.get::<&MeshComponent>(entity).ok()?;
                let visible = self.world.get::<&Visible>(entity).map_or(true, |v| v.0);
                let global = self
                    .world
                    .get::<&GlobalTransform>(entity)
                    .map(|g| g.0.matrix())
                    .unwrap_or(Mat4::IDENTITY);
                Some((entity, mesh, visible, global))
            })
            .collect()
    }
}

fn node_components(
    name: impl Into<String>,
    transform: Transform,
) -> (Name, LocalTransform, GlobalTransform, Children) {
    (
        Name::new(name),
        LocalTransform(transform),
        GlobalTransform(transform),
        Children::default(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    fn chain(scene: &mut Scene) -> (Entity, Entity, Entity) {
        let a = scene.spawn_node("a");
        let b = scene.spawn_node("b");
        let c = scene.spawn_node("c");
        let root = scene.root();
        scene.add(root, a).unwrap();
        scene.add(a, b).unwrap();
        scene.add(b, c).unwrap();
        (a, b, c)
    }

    #[test]
    fn global_is_parent_global_times_local() {
        let mut scene = Scene::new();
        let (a, b, c) = chain(&mut scene);
        scene.set_position(a, Vec3::new(1.0, 0.0, 0.0)).unwrap();
        scene.rotate_y(b, FRAC_PI_2, true).unwrap();
        scene.set_position(c, Vec3::new(0.0, 0.0, -2.0)).unwrap();
        scene.update_global_transforms();

        for node in [a, b, c] {
            let parent = scene.parent(node).unwrap();
            let expected = scene.global_transform(parent).unwrap().matrix()
                * scene.local_transform(node).unwrap().matrix();
            assert!(scene
                .global_transform(node)
                .unwrap()
                .matrix()
                .abs_diff_eq(expected, 1e-5));
        }
        let root = scene.root();
        assert_eq!(
            scene.global_transform(root).unwrap(),
            scene.local_transform(root).unwrap()
        );
        // c sits 2 units along b's -Z, which the rotation turned into -X.
        assert!(scene
            .world_position(c)
            .unwrap()
            .abs_diff_eq(Vec3::new(-1.0, 0.0, 0.0), 1e-5));
    }

    #[test]
    fn attaching_under_descendant_is_a_cycle() {
        let mut scene = Scene::new();
        let (a, _b, c) = chain(&mut scene);

        for _ in 0..2 {
            let err = scene.add(c, a).unwrap_err();
            assert!(matches!(err, SceneError::Cycle { parent, child } if parent == c && child == a));
            assert_eq!(scene.parent(a), Some(scene.root()));
            assert!(scene.children(c).is_empty());
        }

        assert!(matches!(scene.add(a, a), Err(SceneError::Cycle { .. })));
    }

    #[test]
    fn add_moves_node_between_parents() {
        let mut scene = Scene::new();
        let (a, b, c) = chain(&mut scene);
        scene.add(a, c).unwrap();

        assert_eq!(scene.children(a), vec![b, c]);
        assert!(scene.children(b).is_empty());
        assert_eq!(scene.parent(c), Some(a));
    }

    #[test]
    fn remove_ignores_non_children() {
        let mut scene = Scene::new();
        let (a, b, c) = chain(&mut scene);
        scene.remove(a, c);
        assert_eq!(scene.parent(c), Some(b));

        scene.remove(b, c);
        assert_eq!(scene.parent(c), None);
        assert!(scene.children(b).is_empty());
        assert_eq!(scene.descendants(a), vec![b]);
    }

    #[test]
    fn descendants_are_preorder_in_insertion_order() {
        let mut scene = Scene::new();
        let (a, b, c) = chain(&mut scene);
        let d = scene.spawn_node("d");
        let root = scene.root();
        scene.add(root, d).unwrap();

        assert_eq!(scene.descendants(root), vec![a, b, c, d]);
    }

    #[test]
    fn despawn_recursive_removes_subtree() {
        let mut scene = Scene::new();
        let (a, b, c) = chain(&mut scene);
        scene.despawn_recursive(b).unwrap();

        assert!(!scene.world.contains(b));
        assert!(!scene.world.contains(c));
        assert!(scene.children(a).is_empty());
    }

    #[test]
    fn unknown_nodes_are_rejected() {
        let mut scene = Scene::new();
        let a = scene.spawn_node("a");
        scene.despawn_recursive(a).unwrap();
        let root = scene.root();
        assert!(matches!(scene.add(root, a), Err(SceneError::NoSuchNode(e)) if e == a));
        assert!(scene.set_position(a, Vec3::ONE).is_err());
    }

    #[test]
    fn world_matrix_matches_propagation() {
        let mut scene = Scene::new();
        let (a, b, c) = chain(&mut scene);
        scene.translate(a, Vec3::new(0.0, 3.0, 0.0), false).unwrap();
        scene.scale(b, Vec3::splat(2.0), true).unwrap();
        scene.set_position(c, Vec3::X).unwrap();
        scene.update_global_transforms();

        assert!(scene
            .world_matrix(c)
            .unwrap()
            .abs_diff_eq(scene.global_transform(c).unwrap().matrix(), 1e-5));
        assert!(scene
            .world_position(c)
            .unwrap()
            .abs_diff_eq(Vec3::new(2.0, 3.0, 0.0), 1e-5));
    }

    #[test]
    fn bump_material_needs_tangents() {
        use crate::error::ShaderError;
        use crate::renderer::{primitives, TextureData};

        let mut scene = Scene::new();
        let rect = primitives::rectangle(1.0, 1.0);
        let bare = scene
            .assets
            .geometries
            .insert(Geometry::new("bare", rect.vertices.clone(), rect.indices.clone()));
        let with_tangents = scene.assets.geometries.insert(rect);
        let normals = scene.assets.textures.insert(TextureData::flat_normal_map("normals"));
        let bumped = scene
            .assets
            .materials
            .insert(Material::lambert("bumped").with_bump(normals, 1.0).build().unwrap());

        let err = scene.spawn_mesh("wall", bare, bumped).unwrap_err();
        assert!(matches!(
            err,
            SceneError::Shader(ShaderError::MissingTangents { ref material, ref geometry })
                if material == "bumped" && geometry == "bare"
        ));
        assert!(scene.spawn_mesh("wall", with_tangents, bumped).is_ok());
    }
}
