//! Flat, Lambert and Phong spheres, with a solid color (top row) and a color
//! texture (bottom row), under ambient, directional and two point lights.
//!
//! Move the camera: WASDRF (move), QE (turn), TG (look).

use glam::Vec3;
use wgpu_lighting::asset::Handle;
use wgpu_lighting::renderer::{primitives, Material, TextureData};
use wgpu_lighting::scene::{Camera, Light, MovementRig, NodeBuilder};
use wgpu_lighting::{run_application, Error, RenderApplication, StartupContext, UpdateContext};

const GRID_TEXTURE: &str = "assets/images/grid.jpg";

fn grid_texture() -> TextureData {
    TextureData::from_path(GRID_TEXTURE).unwrap_or_else(|err| {
        log::warn!("{err}; using a generated checkerboard");
        TextureData::checkerboard("grid", 256, 8, [230, 230, 230, 255], [40, 40, 40, 255])
    })
}

#[derive(Default)]
struct LightedSpheres {
    rig: Option<MovementRig>,
}

impl RenderApplication for LightedSpheres {
    fn name(&self) -> &str {
        "Lighted spheres"
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
        NodeBuilder::new("Sun")
            .facing(Vec3::new(-1.0, -1.0, -2.0))
            .with_light(Light::directional(Vec3::splat(0.8)))
            .spawn_under(scene, root)?;
        NodeBuilder::new("Red")
            .at(Vec3::new(4.0, 0.0, 0.0))
            .with_light(Light::point(Vec3::new(0.9, 0.0, 0.0)))
            .spawn_under(scene, root)?;
        NodeBuilder::new("Green")
            .at(Vec3::new(-4.0, 0.0, 0.0))
            .with_light(Light::point(Vec3::new(0.0, 0.9, 0.0)))
            .spawn_under(scene, root)?;

        let sphere = scene.assets.geometries.insert(primitives::sphere(1.0, 32, 16));
        let grid = scene.assets.textures.insert(grid_texture());
        let color = Vec3::new(0.2, 0.5, 0.5);

        let solid: [Handle<Material>; 3] = [
            renderer.add_material(&mut scene.assets, Material::flat("flat").with_light_capacity(4).with_color(color).build()?)?,
            renderer.add_material(&mut scene.assets, Material::lambert("lambert").with_light_capacity(4).with_color(color).build()?)?,
            renderer.add_material(&mut scene.assets, Material::phong("phong").with_light_capacity(4).with_color(color).build()?)?,
        ];
        let textured: [Handle<Material>; 3] = [
            renderer.add_material(&mut scene.assets, Material::flat("flat+grid").with_light_capacity(4).with_texture(grid).build()?)?,
            renderer.add_material(&mut scene.assets, Material::lambert("lambert+grid").with_light_capacity(4).with_texture(grid).build()?)?,
            renderer.add_material(&mut scene.assets, Material::phong("phong+grid").with_light_capacity(4).with_texture(grid).build()?)?,
        ];

        for (column, (top, bottom)) in solid.into_iter().zip(textured).enumerate() {
            let x = -2.5 + 2.5 * column as f32;
            NodeBuilder::new(format!("Sphere {column} top"))
                .at(Vec3::new(x, 1.5, 0.0))
                .with_mesh(sphere, top)
                .spawn_under(scene, root)?;
            NodeBuilder::new(format!("Sphere {column} bottom"))
                .at(Vec3::new(x, -1.5, 0.0))
                .with_mesh(sphere, bottom)
                .spawn_under(scene, root)?;
        }

        ctx.set_camera(camera);
        Ok(())
    }

    fn update(&mut self, ctx: &mut UpdateContext) -> Result<(), Error> {
        let dt = ctx.delta_time();
        if let Some(rig) = &self.rig {
            rig.update(ctx.scene, ctx.input, dt)?;
        }
        Ok(())
    }
}

fn main() {
    if let Err(err) = run_application(LightedSpheres::default()) {
        eprintln!("Application error: {err}");
    }
}
