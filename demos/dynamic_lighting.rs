//! Moving directional and point lights over flat, Lambert and Phong spheres.
//! Each light carries a small marker mesh as a child node, so the marker
//! follows the light's pose.
//!
//! Move the camera: WASDRF (move), QE (turn), TG (look).

mod common;

use glam::Vec3;
use hecs::Entity;
use wgpu_lighting::renderer::{primitives, Material};
use wgpu_lighting::scene::{Camera, Light, MovementRig, NodeBuilder};
use wgpu_lighting::{run_application, Error, RenderApplication, StartupContext, UpdateContext};

struct Lights {
    directional: Entity,
    point: Entity,
}

#[derive(Default)]
struct DynamicLighting {
    rig: Option<MovementRig>,
    lights: Option<Lights>,
}

impl RenderApplication for DynamicLighting {
    fn name(&self) -> &str {
        "Dynamic lighting"
    }

    fn setup(&mut self, ctx: &mut StartupContext) -> Result<(), Error> {
        let scene = &mut *ctx.scene;
        let renderer = &mut *ctx.renderer;
        let root = scene.root();

        let camera = scene.spawn_camera("Camera", Camera::perspective(60.0, renderer.aspect_ratio(), 0.1, 1000.0));
        let rig = MovementRig::spawn(scene)?;
        rig.attach(scene, camera)?;
        rig.set_position(scene, Vec3::new(0.0, 0.0, 6.0))?;
        self.rig = Some(rig);

        NodeBuilder::new("Ambient")
            .with_light(Light::ambient(Vec3::splat(0.1)))
            .spawn_under(scene, root)?;
        // directional lights cover all of space; the position only places the marker
        let directional = NodeBuilder::new("Sun")
            .at(Vec3::new(0.0, 2.0, 0.0))
            .facing(Vec3::new(-1.0, -1.0, 0.0))
            .with_light(Light::directional(Vec3::splat(0.8)))
            .spawn_under(scene, root)?;
        let point = NodeBuilder::new("Red")
            .at(Vec3::new(1.0, 1.0, 0.8))
            .with_light(Light::point(Vec3::new(0.9, 0.0, 0.0)))
            .spawn_under(scene, root)?;

        common::add_light_marker(scene, renderer, directional)?;
        common::add_light_marker(scene, renderer, point)?;

        let sphere = scene.assets.geometries.insert(primitives::sphere(1.0, 32, 16));
        let color = Vec3::new(0.2, 0.5, 0.5);
        let materials = [
            Material::flat("flat").with_light_capacity(3).with_color(color).build()?,
            Material::lambert("lambert").with_light_capacity(3).with_color(color).build()?,
            Material::phong("phong").with_light_capacity(3).with_color(color).build()?,
        ];
        for (column, material) in materials.into_iter().enumerate() {
            let material = renderer.add_material(&mut scene.assets, material)?;
            NodeBuilder::new(format!("Sphere {column}"))
                .at(Vec3::new(-2.5 + 2.5 * column as f32, 0.0, 0.0))
                .with_mesh(sphere, material)
                .spawn_under(scene, root)?;
        }

        self.lights = Some(Lights { directional, point });
        ctx.set_camera(camera);
        Ok(())
    }

    fn update(&mut self, ctx: &mut UpdateContext) -> Result<(), Error> {
        let dt = ctx.delta_time();
        let time = ctx.elapsed();
        if let Some(rig) = &self.rig {
            rig.update(ctx.scene, ctx.input, dt)?;
        }
        if let Some(lights) = &self.lights {
            ctx.scene
                .set_direction(lights.directional, Vec3::new(-1.0, (0.5 * time).sin(), 0.0))?;
            ctx.scene
                .set_position(lights.point, Vec3::new(1.0, time.sin(), 1.0))?;
        }
        Ok(())
    }
}

fn main() {
    if let Err(err) = run_application(DynamicLighting::default()) {
        eprintln!("Application error: {err}");
    }
}
