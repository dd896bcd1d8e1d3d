use glam::{Mat4, Quat, Vec3};
use wgpu_lighting::renderer::shading::project_to_shadow_space;
use wgpu_lighting::renderer::{
    primitives, Material, Renderer, ShadowBounds, ShadowConfig, SoftwareBackend,
};
use wgpu_lighting::scene::transform::Transform;
use wgpu_lighting::scene::{Camera, Light, LightKind, NodeBuilder, Scene};

const EPSILON: f32 = 1e-5;

fn light_world(position: Vec3, direction: Vec3) -> Mat4 {
    let mut transform = Transform::from_translation(position);
    transform.set_direction(direction);
    transform.matrix()
}

fn light_view_proj(config: &ShadowConfig, kind: LightKind, world: Mat4) -> Mat4 {
    let (_, rotation, translation) = world.to_scale_rotation_translation();
    config.projection(kind) * Mat4::from_rotation_translation(rotation, translation).inverse()
}

#[test]
fn directional_projection_matches_manual_remap() {
    let config = ShadowConfig::default();
    let world = light_world(Vec3::new(3.0, 6.0, 1.0), Vec3::new(-0.4, -1.0, -0.2));
    let matrix = light_view_proj(&config, LightKind::Directional, world);

    for point in [
        Vec3::new(0.0, 0.0, 0.0),
        Vec3::new(1.5, 1.0, -1.0),
        Vec3::new(-1.0, 0.5, 2.0),
    ] {
        let clip = matrix * point.extend(1.0);
        let ndc = clip.truncate() / clip.w;
        let expected = Vec3::new(ndc.x * 0.5 + 0.5, 0.5 - ndc.y * 0.5, ndc.z);
        let projected = project_to_shadow_space(matrix, point).expect("inside the frustum");
        assert!(projected.abs_diff_eq(expected, EPSILON), "{projected} != {expected}");
        assert!((0.0..=1.0).contains(&projected.z));
    }
}

#[test]
fn texture_v_axis_is_flipped_from_clip_space() {
    let config = ShadowConfig::default();
    let world = light_world(Vec3::new(0.0, 10.0, 0.0), Vec3::NEG_Y);
    let matrix = light_view_proj(&config, LightKind::Directional, world);

    // looking straight down, the light's up axis is +Z
    let top = project_to_shadow_space(matrix, Vec3::new(0.0, 0.0, 2.0)).unwrap();
    let bottom = project_to_shadow_space(matrix, Vec3::new(0.0, 0.0, -2.0)).unwrap();
    let top_ndc = matrix.project_point3(Vec3::new(0.0, 0.0, 2.0));

    assert!(top_ndc.y > 0.0);
    assert!(top.y < bottom.y);
}

#[test]
fn points_outside_the_light_frustum_are_not_projected() {
    let config = ShadowConfig::default().with_bounds(ShadowBounds::symmetric(2.0, 1.0, 10.0));
    let world = light_world(Vec3::new(0.0, 5.0, 0.0), Vec3::NEG_Y);

    let ortho = light_view_proj(&config, LightKind::Directional, world);
    assert!(project_to_shadow_space(ortho, Vec3::new(3.0, 0.0, 0.0)).is_none());
    assert!(project_to_shadow_space(ortho, Vec3::new(0.0, 6.0, 0.0)).is_none());
    assert!(project_to_shadow_space(ortho, Vec3::new(0.0, -6.0, 0.0)).is_none());

    let perspective = light_view_proj(&config, LightKind::Point, world);
    assert!(project_to_shadow_space(perspective, Vec3::new(0.0, 8.0, 0.0)).is_none());
    assert!(project_to_shadow_space(perspective, Vec3::new(0.0, 0.0, 0.0)).is_some());
}

#[test]
fn light_scale_does_not_change_the_light_camera() {
    let config = ShadowConfig::default();
    let base = light_world(Vec3::new(1.0, 4.0, 0.0), Vec3::new(-1.0, -1.0, 0.0));
    let scaled = base * Mat4::from_scale(Vec3::splat(3.0));

    let mut scene = Scene::new();
    let root = scene.root();
    let light = NodeBuilder::new("Sun")
        .with_transform(Transform(scaled))
        .with_light(Light::directional(Vec3::ONE))
        .spawn_under(&mut scene, root)
        .unwrap();
    let camera = NodeBuilder::new("Camera")
        .at(Vec3::new(0.0, 0.0, 5.0))
        .with_camera(Camera::default())
        .spawn_under(&mut scene, root)
        .unwrap();

    let mut renderer = Renderer::new(SoftwareBackend::new(16, 16));
    renderer.enable_shadows(&scene, light, config).unwrap();
    renderer.render(&mut scene, camera).unwrap();

    let map = renderer.shadow_map().unwrap();
    let expected = light_view_proj(&config, LightKind::Directional, base);
    assert!(map.light_view_projection.abs_diff_eq(expected, 1e-4));
}

#[test]
fn pre_pass_stores_nearest_caster_depth() {
    let mut scene = Scene::new();
    let root = scene.root();
    let camera = NodeBuilder::new("Camera")
        .at(Vec3::new(0.0, 0.0, 5.0))
        .with_camera(Camera::default())
        .spawn_under(&mut scene, root)
        .unwrap();
    let light = NodeBuilder::new("Sun")
        .at(Vec3::new(0.0, 10.0, 0.0))
        .facing(Vec3::NEG_Y)
        .with_light(Light::directional(Vec3::ONE))
        .spawn_under(&mut scene, root)
        .unwrap();

    let mut renderer = Renderer::new(SoftwareBackend::new(16, 16));
    let sphere = scene.assets.geometries.insert(primitives::sphere(1.0, 32, 16));
    let material = renderer
        .add_material(&mut scene.assets, Material::lambert("white").build().unwrap())
        .unwrap();
    NodeBuilder::new("Sphere")
        .with_transform(Transform::from_trs(Vec3::ZERO, Quat::IDENTITY, Vec3::ONE))
        .with_mesh(sphere, material)
        .spawn_under(&mut scene, root)
        .unwrap();

    let config = ShadowConfig::default()
        .with_resolution(64)
        .with_bounds(ShadowBounds::symmetric(2.0, 0.0, 20.0));
    renderer.enable_shadows(&scene, light, config).unwrap();
    renderer.render(&mut scene, camera).unwrap();

    let map = renderer.shadow_map().unwrap();
    let depth = renderer.backend().depth_target(map.target).unwrap();

    // the top of the sphere is 9 units from the light; the far plane is 20
    assert!((depth.sample(0.5, 0.5) - 9.0 / 20.0).abs() < 0.01);
    // nothing covers the corners
    assert_eq!(depth.at(0, 0), 1.0);
}
