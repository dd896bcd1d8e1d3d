use glam::Vec3;
use hecs::Entity;
use winit::keyboard::KeyCode;

use crate::error::SceneError;
use crate::input::Input;
use crate::scene::Scene;

/// Two-node camera rig: the body moves and turns about Y, the look node
/// tilts about X. Objects (usually the camera) are attached to the look node.
///
/// Keys: WASD/RF move, QE turn, TG look up and down.
#[derive(Debug, Clone, Copy)]
pub struct MovementRig {
    pub body: Entity,
    pub look: Entity,
    pub units_per_second: f32,
    pub degrees_per_second: f32,
}

impl MovementRig {
    /// Spawns the rig under the scene root.
    pub fn spawn(scene: &mut Scene) -> Result<Self, SceneError> {
        let body = scene.spawn_node("MovementRig");
        let look = scene.spawn_node("MovementRig.look");
        scene.add(body, look)?;
        let root = scene.root();
        scene.add(root, body)?;

        Ok(Self {
            body,
            look,
            units_per_second: 1.0,
            degrees_per_second: 60.0,
        })
    }

    pub fn attach(&self, scene: &mut Scene, child: Entity) -> Result<(), SceneError> {
        scene.add(self.look, child)
    }

    pub fn set_position(&self, scene: &mut Scene, position: Vec3) -> Result<(), SceneError> {
        scene.set_position(self.body, position)
    }

    pub fn update(&self, scene: &mut Scene, input: &Input, delta_time: f32) -> Result<(), SceneError> {
        let step = self.units_per_second * delta_time;
        let turn = self.degrees_per_second.to_radians() * delta_time;

        let moves = [
            (KeyCode::KeyW, Vec3::new(0.0, 0.0, -step)),
            (KeyCode::KeyS, Vec3::new(0.0, 0.0, step)),
            (KeyCode::KeyA, Vec3::new(-step, 0.0, 0.0)),
            (KeyCode::KeyD, Vec3::new(step, 0.0, 0.0)),
            (KeyCode::KeyR, Vec3::new(0.0, step, 0.0)),
            (KeyCode::KeyF, Vec3::new(0.0, -step, 0.0)),
        ];
        for (key, offset) in moves {
            if input.is_pressed(key) {
                scene.translate(self.body, offset, true)?;
            }
        }

        if input.is_pressed(KeyCode::KeyQ) {
            scene.rotate_y(self.body, turn, true)?;
        }
        if input.is_pressed(KeyCode::KeyE) {
            scene.rotate_y(self.body, -turn, true)?;
        }
        if input.is_pressed(KeyCode::KeyT) {
            scene.rotate_x(self.look, turn, true)?;
        }
        if input.is_pressed(KeyCode::KeyG) {
            scene.rotate_x(self.look, -turn, true)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::Camera;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn forward_follows_body_heading() {
        let mut scene = Scene::new();
        let rig = MovementRig::spawn(&mut scene).unwrap();
        let camera = scene.spawn_camera("Camera", Camera::default());
        rig.attach(&mut scene, camera).unwrap();
        scene.rotate_y(rig.body, FRAC_PI_2, true).unwrap();

        let mut input = Input::new();
        input.set_key(KeyCode::KeyW, true);
        rig.update(&mut scene, &input, 2.0).unwrap();

        // Turned left by 90 degrees, so forward is -X.
        assert!(scene
            .world_position(camera)
            .unwrap()
            .abs_diff_eq(Vec3::new(-2.0, 0.0, 0.0), 1e-5));
    }

    #[test]
    fn look_tilts_only_the_look_node() {
        let mut scene = Scene::new();
        let rig = MovementRig::spawn(&mut scene).unwrap();
        let mut input = Input::new();
        input.set_key(KeyCode::KeyT, true);
        rig.update(&mut scene, &input, 1.0).unwrap();

        assert_eq!(
            scene.local_transform(rig.body).unwrap().matrix(),
            glam::Mat4::IDENTITY
        );
        let look_dir = scene.world_matrix(rig.look).unwrap().transform_vector3(Vec3::NEG_Z);
        assert!(look_dir.y > 0.5);
    }
}
