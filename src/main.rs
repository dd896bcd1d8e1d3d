use std::f32::consts::FRAC_PI_2;

use glam::Vec3;
use wgpu_lighting::renderer::{primitives, Material, ShadowBounds, ShadowConfig};
use wgpu_lighting::scene::{Camera, Light, NodeBuilder};
use wgpu_lighting::{run_application, Error, RenderApplication, StartupContext};

/// A Phong sphere casting a shadow onto a Lambert floor.
struct Overview;

impl RenderApplication for Overview {
    fn name(&self) -> &str {
        "wgpu-lighting"
    }

    fn setup(&mut self, ctx: &mut StartupContext) -> Result<(), Error> {
        let scene = &mut *ctx.scene;
        let renderer = &mut *ctx.renderer;
        let root = scene.root();

        let camera = NodeBuilder::new("Camera")
            .at(Vec3::new(0.0, 4.0, 10.0))
            .looking_at(Vec3::new(0.0, -1.0, 0.0))
            .with_camera(Camera::perspective(60.0, renderer.aspect_ratio(), 0.1, 100.0))
            .spawn_under(scene, root)?;

        NodeBuilder::new("Ambient")
            .with_light(Light::ambient(Vec3::splat(0.1)))
            .spawn_under(scene, root)?;
        let sun = NodeBuilder::new("Sun")
            .at(Vec3::new(4.0, 4.0, 0.0))
            .facing(Vec3::new(-1.0, -1.0, 0.0))
            .with_light(Light::directional(Vec3::splat(0.8)))
            .spawn_under(scene, root)?;

        let sphere = scene.assets.geometries.insert(primitives::sphere(1.0, 32, 16));
        let phong = renderer.add_material(
            &mut scene.assets,
            Material::phong("sphere").with_color(Vec3::new(0.8, 0.3, 0.2)).build()?,
        )?;
        NodeBuilder::new("Sphere").with_mesh(sphere, phong).spawn_under(scene, root)?;

        let floor = scene.assets.geometries.insert(primitives::rectangle(20.0, 20.0));
        let lambert = renderer.add_material(
            &mut scene.assets,
            Material::lambert("floor").receive_shadow(true).build()?,
        )?;
        let floor = NodeBuilder::new("Floor")
            .at(Vec3::new(0.0, -2.0, 0.0))
            .with_mesh(floor, lambert)
            .spawn_under(scene, root)?;
        scene.rotate_x(floor, -FRAC_PI_2, true)?;

        let config = ShadowConfig::from_settings(ctx.settings).with_bounds(ShadowBounds::symmetric(5.0, 0.0, 20.0));
        renderer.enable_shadows(scene, sun, config)?;

        ctx.set_camera(camera);
        Ok(())
    }
}

fn main() {
    if let Err(err) = run_application(Overview) {
        eprintln!("Application error: {err}");
    }
}
