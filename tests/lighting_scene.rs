//! End-to-end frames on the software backend: a sphere above a floor, lit
//! by ambient and one shadow-casting light.

use std::f32::consts::FRAC_PI_2;

use glam::Vec3;
use hecs::Entity;
use wgpu_lighting::renderer::{
    primitives, Material, Renderer, ShadowBounds, ShadowConfig, ShadowState, SoftwareBackend,
};
use wgpu_lighting::scene::{Camera, Light, NodeBuilder, Scene};

const SIZE: u32 = 128;
const AMBIENT: f32 = 0.1;
const SUN: f32 = 0.8;

struct Fixture {
    scene: Scene,
    renderer: Renderer<SoftwareBackend>,
    camera: Entity,
    sun: Entity,
}

fn fixture() -> Fixture {
    let mut scene = Scene::new();
    let mut renderer = Renderer::new(SoftwareBackend::new(SIZE, SIZE));
    let root = scene.root();

    let camera = NodeBuilder::new("Camera")
        .at(Vec3::new(0.0, 4.0, 10.0))
        .looking_at(Vec3::new(0.0, -1.0, 0.0))
        .with_camera(Camera::perspective(60.0, 1.0, 0.1, 100.0))
        .spawn_under(&mut scene, root)
        .unwrap();

    NodeBuilder::new("Ambient")
        .with_light(Light::ambient(Vec3::splat(AMBIENT)))
        .spawn_under(&mut scene, root)
        .unwrap();
    let sun = NodeBuilder::new("Sun")
        .at(Vec3::new(4.0, 4.0, 0.0))
        .facing(Vec3::new(-1.0, -1.0, 0.0))
        .with_light(Light::directional(Vec3::splat(SUN)))
        .spawn_under(&mut scene, root)
        .unwrap();

    let sphere = scene.assets.geometries.insert(primitives::sphere(1.0, 32, 16));
    let phong = renderer
        .add_material(
            &mut scene.assets,
            Material::phong("sphere").with_color(Vec3::new(0.8, 0.2, 0.2)).build().unwrap(),
        )
        .unwrap();
    NodeBuilder::new("Sphere")
        .with_mesh(sphere, phong)
        .spawn_under(&mut scene, root)
        .unwrap();

    let floor = scene.assets.geometries.insert(primitives::rectangle(20.0, 20.0));
    let white = renderer
        .add_material(
            &mut scene.assets,
            Material::lambert("floor")
                .with_light_capacity(2)
                .receive_shadow(true)
                .build()
                .unwrap(),
        )
        .unwrap();
    let floor = NodeBuilder::new("Floor")
        .at(Vec3::new(0.0, -2.0, 0.0))
        .with_mesh(floor, white)
        .spawn_under(&mut scene, root)
        .unwrap();
    scene.rotate_x(floor, -FRAC_PI_2, true).unwrap();

    Fixture {
        scene,
        renderer,
        camera,
        sun,
    }
}

fn shadow_config() -> ShadowConfig {
    ShadowConfig::default()
        .with_resolution(256)
        .with_bounds(ShadowBounds::symmetric(5.0, 0.0, 20.0))
}

fn pixel(f: &Fixture, world: Vec3) -> Vec3 {
    let (x, y) = f
        .renderer
        .backend()
        .project_to_pixel(world)
        .expect("point is on screen");
    f.renderer.backend().color_at(x, y)
}

fn assert_gray(actual: Vec3, expected: f32) {
    assert!(
        actual.abs_diff_eq(Vec3::splat(expected), 0.02),
        "expected {expected}, got {actual}"
    );
}

/// Floor lit head-on by the sun at 45 degrees.
fn lit_floor() -> f32 {
    AMBIENT + SUN * std::f32::consts::FRAC_1_SQRT_2
}

#[test]
fn floor_under_sphere_is_ambient_only() {
    let mut f = fixture();
    f.renderer.enable_shadows(&f.scene, f.sun, shadow_config()).unwrap();

    let stats = f.renderer.render(&mut f.scene, f.camera).unwrap();
    assert_eq!(stats.drawn, 2);
    assert_eq!(stats.shadow_casters, 2);
    assert!(matches!(f.renderer.shadow_state(), ShadowState::MapValid(_)));

    assert_gray(pixel(&f, Vec3::new(-2.0, -2.0, 0.0)), AMBIENT);
    assert_gray(pixel(&f, Vec3::new(2.0, -2.0, 0.0)), lit_floor());
}

#[test]
fn without_shadows_the_floor_is_lit_everywhere() {
    let mut f = fixture();
    f.renderer.render(&mut f.scene, f.camera).unwrap();

    assert_gray(pixel(&f, Vec3::new(-2.0, -2.0, 0.0)), lit_floor());
    assert_gray(pixel(&f, Vec3::new(2.0, -2.0, 0.0)), lit_floor());
}

#[test]
fn partial_strength_keeps_some_light() {
    let mut f = fixture();
    f.renderer
        .enable_shadows(&f.scene, f.sun, shadow_config().with_strength(0.5))
        .unwrap();
    f.renderer.render(&mut f.scene, f.camera).unwrap();

    let expected = AMBIENT + 0.5 * SUN * std::f32::consts::FRAC_1_SQRT_2;
    assert_gray(pixel(&f, Vec3::new(-2.0, -2.0, 0.0)), expected);
}

#[test]
fn shadow_follows_a_replacement_light() {
    let mut f = fixture();
    f.renderer.enable_shadows(&f.scene, f.sun, shadow_config()).unwrap();
    f.renderer.render(&mut f.scene, f.camera).unwrap();

    let root = f.scene.root();
    let moon = NodeBuilder::new("Moon")
        .at(Vec3::new(-4.0, 4.0, 0.0))
        .facing(Vec3::new(1.0, -1.0, 0.0))
        .with_light(Light::directional(Vec3::splat(SUN)))
        .spawn_under(&mut f.scene, root)
        .unwrap();
    f.scene.despawn_recursive(f.sun).unwrap();

    f.renderer.enable_shadows(&f.scene, moon, shadow_config()).unwrap();
    assert!(matches!(f.renderer.shadow_state(), ShadowState::Enabled(_)));
    assert_eq!(f.renderer.backend().depth_target_count(), 1);

    f.renderer.render(&mut f.scene, f.camera).unwrap();
    assert_gray(pixel(&f, Vec3::new(2.0, -2.0, 0.0)), AMBIENT);
    assert_gray(pixel(&f, Vec3::new(-2.0, -2.0, 0.0)), lit_floor());
}

#[test]
fn point_light_casts_a_perspective_shadow() {
    let mut f = fixture();
    let root = f.scene.root();
    f.scene.despawn_recursive(f.sun).unwrap();
    let bulb = NodeBuilder::new("Bulb")
        .at(Vec3::new(0.0, 4.0, 0.0))
        .facing(Vec3::NEG_Y)
        .with_light(Light::point(Vec3::splat(SUN)))
        .spawn_under(&mut f.scene, root)
        .unwrap();

    let config = ShadowConfig::default()
        .with_resolution(256)
        .with_bounds(ShadowBounds::symmetric(5.0, 1.0, 20.0))
        .with_bias(0.005);
    f.renderer.enable_shadows(&f.scene, bulb, config).unwrap();
    f.renderer.render(&mut f.scene, f.camera).unwrap();

    assert_gray(pixel(&f, Vec3::new(0.0, -2.0, 0.0)), AMBIENT);

    // no falloff: only the angle to the bulb matters
    let n_dot_l = Vec3::Y.dot(Vec3::new(-3.0, 6.0, 0.0).normalize());
    assert_gray(pixel(&f, Vec3::new(3.0, -2.0, 0.0)), AMBIENT + SUN * n_dot_l);
}

#[test]
fn disabling_shadows_releases_the_target() {
    let mut f = fixture();
    f.renderer.enable_shadows(&f.scene, f.sun, shadow_config()).unwrap();
    assert_eq!(f.renderer.backend().depth_target_count(), 1);

    f.renderer.disable_shadows();
    assert_eq!(f.renderer.shadow_state(), &ShadowState::Disabled);
    assert_eq!(f.renderer.backend().depth_target_count(), 0);

    let frame = f.renderer.prepare_frame(&mut f.scene, f.camera).unwrap();
    assert!(frame.shadow.is_none());
    assert!(frame.casters.is_empty());
}

#[test]
fn hidden_meshes_neither_draw_nor_cast() {
    let mut f = fixture();
    f.renderer.enable_shadows(&f.scene, f.sun, shadow_config()).unwrap();
    let sphere = f.scene.find_by_name("Sphere").unwrap();
    f.scene.set_visible(sphere, false).unwrap();

    let stats = f.renderer.render(&mut f.scene, f.camera).unwrap();
    assert_eq!(stats.drawn, 1);
    assert_eq!(stats.shadow_casters, 1);
    assert_gray(pixel(&f, Vec3::new(-2.0, -2.0, 0.0)), lit_floor());
}
