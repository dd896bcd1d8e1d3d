//! Two textured Phong spheres over a floor, all receiving shadows from a
//! directional light that slowly circles the scene.
//!
//! Move the camera: WASDRF (move), QE (turn), TG (look).

mod common;

use std::f32::consts::FRAC_PI_2;

use glam::Vec3;
use hecs::Entity;
use wgpu_lighting::renderer::{primitives, Material, ShadowConfig, TextureData};
use wgpu_lighting::scene::{Camera, Light, MovementRig, NodeBuilder};
use wgpu_lighting::{run_application, Error, RenderApplication, StartupContext, UpdateContext};

const GRID_TEXTURE: &str = "assets/images/grid.jpg";
const LIGHT_TURN_PER_FRAME: f32 = 0.01337;

#[derive(Default)]
struct Shadows {
    rig: Option<MovementRig>,
    light: Option<Entity>,
}

impl RenderApplication for Shadows {
    fn name(&self) -> &str {
        "Shadows"
    }

    fn setup(&mut self, ctx: &mut StartupContext) -> Result<(), Error> {
        let scene = &mut *ctx.scene;
        let renderer = &mut *ctx.renderer;
        let root = scene.root();
        renderer.set_clear_color(Vec3::splat(0.2));

        let camera = scene.spawn_camera("Camera", Camera::perspective(60.0, renderer.aspect_ratio(), 0.1, 1000.0));
        let rig = MovementRig::spawn(scene)?;
        rig.attach(scene, camera)?;
        rig.set_position(scene, Vec3::new(0.0, 2.0, 5.0))?;
        self.rig = Some(rig);

        NodeBuilder::new("Ambient")
            .with_light(Light::ambient(Vec3::splat(0.2)))
            .spawn_under(scene, root)?;
        let light = NodeBuilder::new("Sun")
            .at(Vec3::new(2.0, 4.0, 0.0))
            .facing(Vec3::new(-1.0, -1.0, 0.0))
            .with_light(Light::directional(Vec3::splat(0.5)))
            .spawn_under(scene, root)?;
        common::add_light_marker(scene, renderer, light)?;

        let grid = TextureData::from_path(GRID_TEXTURE).unwrap_or_else(|err| {
            log::warn!("{err}; using a generated checkerboard");
            TextureData::checkerboard("grid", 256, 8, [230, 230, 230, 255], [40, 40, 40, 255])
        });
        let grid = scene.assets.textures.insert(grid);
        let material = renderer.add_material(
            &mut scene.assets,
            Material::phong("grid")
                .with_light_capacity(2)
                .with_texture(grid)
                .receive_shadow(true)
                .build()?,
        )?;

        let sphere = scene.assets.geometries.insert(primitives::sphere(1.0, 32, 16));
        for (i, position) in [Vec3::new(-2.0, 1.0, 0.0), Vec3::new(1.0, 2.2, -0.5)].into_iter().enumerate() {
            NodeBuilder::new(format!("Sphere {i}"))
                .at(position)
                .with_mesh(sphere, material)
                .spawn_under(scene, root)?;
        }

        let floor = scene.assets.geometries.insert(primitives::rectangle(20.0, 20.0));
        let floor = NodeBuilder::new("Floor")
            .with_mesh(floor, material)
            .spawn_under(scene, root)?;
        scene.rotate_x(floor, -FRAC_PI_2, true)?;

        renderer.enable_shadows(scene, light, ShadowConfig::from_settings(ctx.settings))?;

        self.light = Some(light);
        ctx.set_camera(camera);
        Ok(())
    }

    fn update(&mut self, ctx: &mut UpdateContext) -> Result<(), Error> {
        let dt = ctx.delta_time();
        if let Some(light) = self.light {
            ctx.scene.rotate_y(light, LIGHT_TURN_PER_FRAME, false)?;
        }
        if let Some(rig) = &self.rig {
            rig.update(ctx.scene, ctx.input, dt)?;
        }
        Ok(())
    }
}

fn main() {
    if let Err(err) = run_application(Shadows::default()) {
        eprintln!("Application error: {err}");
    }
}
