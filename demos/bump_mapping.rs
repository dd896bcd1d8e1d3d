//! A Lambert wall combining a color texture with a bump (normal) texture,
//! lit by a point light circling in front of it.

mod common;

use glam::Vec3;
use hecs::Entity;
use wgpu_lighting::renderer::{primitives, Material, TextureData};
use wgpu_lighting::scene::{Camera, Light, NodeBuilder};
use wgpu_lighting::{run_application, Error, RenderApplication, StartupContext, UpdateContext};

const COLOR_TEXTURE: &str = "assets/images/brick-wall.jpg";
const BUMP_TEXTURE: &str = "assets/images/brick-wall-normal-map.jpg";

/// Horizontal ridges: the normal tilts up on the lower half of each band
/// and down on the upper half.
fn ridged_normal_map(size: u32, bands: u32) -> TextureData {
    let mut rgba = Vec::with_capacity((size * size * 4) as usize);
    for y in 0..size {
        let phase = (y * bands % size) as f32 / size as f32;
        let tilt = if phase < 0.5 { 0.5 } else { -0.5 };
        let normal = Vec3::new(0.0, tilt, 1.0).normalize();
        let encoded = (normal * 0.5 + Vec3::splat(0.5)) * 255.0;
        for _ in 0..size {
            rgba.extend_from_slice(&[encoded.x as u8, encoded.y as u8, encoded.z as u8, 255]);
        }
    }
    TextureData::from_rgba8("ridges", size, size, rgba)
        .unwrap_or_else(|| TextureData::flat_normal_map("ridges"))
}

fn load_or(path: &str, fallback: impl FnOnce() -> TextureData) -> TextureData {
    TextureData::from_path(path).unwrap_or_else(|err| {
        log::warn!("{err}; using a generated texture");
        fallback()
    })
}

#[derive(Default)]
struct BumpMapping {
    light: Option<Entity>,
}

impl RenderApplication for BumpMapping {
    fn name(&self) -> &str {
        "Bump mapping"
    }

    fn setup(&mut self, ctx: &mut StartupContext) -> Result<(), Error> {
        let scene = &mut *ctx.scene;
        let renderer = &mut *ctx.renderer;
        let root = scene.root();

        let camera = NodeBuilder::new("Camera")
            .at(Vec3::new(0.0, 0.0, 2.0))
            .with_camera(Camera::perspective(60.0, renderer.aspect_ratio(), 0.1, 1000.0))
            .spawn_under(scene, root)?;

        NodeBuilder::new("Ambient")
            .with_light(Light::ambient(Vec3::splat(0.3)))
            .spawn_under(scene, root)?;
        let light = NodeBuilder::new("Point")
            .at(Vec3::new(1.0, 0.0, 1.0))
            .with_light(Light::point(Vec3::ONE))
            .spawn_under(scene, root)?;
        common::add_light_marker(scene, renderer, light)?;

        let color = load_or(COLOR_TEXTURE, || {
            TextureData::checkerboard("bricks", 256, 8, [178, 84, 60, 255], [120, 52, 40, 255])
        });
        let bump = load_or(BUMP_TEXTURE, || ridged_normal_map(256, 16));
        let color = scene.assets.textures.insert(color);
        let bump = scene.assets.textures.insert(bump);

        let bumped = renderer.add_material(
            &mut scene.assets,
            Material::lambert("wall+bump")
                .with_light_capacity(2)
                .with_texture(color)
                .with_bump(bump, 1.0)
                .build()?,
        )?;

        let wall = scene.assets.geometries.insert(primitives::rectangle(2.0, 2.0));
        NodeBuilder::new("Wall")
            .with_mesh(wall, bumped)
            .spawn_under(scene, root)?;

        self.light = Some(light);
        ctx.set_camera(camera);
        Ok(())
    }

    fn update(&mut self, ctx: &mut UpdateContext) -> Result<(), Error> {
        let t = 0.5 * ctx.elapsed();
        if let Some(light) = self.light {
            ctx.scene
                .set_position(light, Vec3::new(t.cos() / 2.0, t.sin() / 2.0, 1.0))?;
        }
        Ok(())
    }
}

fn main() {
    if let Err(err) = run_application(BumpMapping::default()) {
        eprintln!("Application error: {err}");
    }
}
