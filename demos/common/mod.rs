//! Helpers shared by the demos.

use glam::{Quat, Vec3};
use hecs::Entity;
use wgpu_lighting::error::SceneError;
use wgpu_lighting::renderer::{primitives, GpuBackend, Material, Renderer};
use wgpu_lighting::scene::{LightKind, NodeBuilder, Scene, Transform};
use wgpu_lighting::Error;

/// Attaches a small unlit-looking sphere in the light's color under `light`,
/// so the marker follows the light's pose. Directional markers are stretched
/// along -Z to show where the light points.
pub fn add_light_marker(
    scene: &mut Scene,
    renderer: &mut Renderer<GpuBackend>,
    light: Entity,
) -> Result<Entity, Error> {
    let source = scene.light(light).ok_or(SceneError::NoSuchNode(light))?;
    let transform = match source.kind {
        LightKind::Directional => {
            Transform::from_trs(Vec3::new(0.0, 0.0, -0.5), Quat::IDENTITY, Vec3::new(0.5, 0.5, 5.0))
        }
        _ => Transform::IDENTITY,
    };

    let geometry = scene.assets.geometries.insert(primitives::sphere(0.1, 8, 4));
    let material = Material::flat(format!("{} marker", source.kind))
        .with_light_capacity(3)
        .with_color(source.color)
        .receive_shadow(false)
        .build()?;
    let material = renderer.add_material(&mut scene.assets, material)?;
    let marker = NodeBuilder::new("Light marker")
        .with_transform(transform)
        .with_mesh(geometry, material)
        .casts_shadow(false)
        .spawn_under(scene, light)?;
    Ok(marker)
}
