use glam::Mat4;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Projection {
    Perspective {
        fov_y_radians: f32,
        aspect: f32,
        near: f32,
        far: f32,
    },
    Orthographic {
        left: f32,
        right: f32,
        bottom: f32,
        top: f32,
        near: f32,
        far: f32,
    },
}

impl Projection {
    pub fn matrix(&self) -> Mat4 {
        match *self {
            Projection::Perspective {
                fov_y_radians,
                aspect,
                near,
                far,
            } => Mat4::perspective_rh(fov_y_radians, aspect, near, far),
            Projection::Orthographic {
                left,
                right,
                bottom,
                top,
                near,
                far,
            } => Mat4::orthographic_rh(left, right, bottom, top, near, far),
        }
    }
}

/// Camera component. The view matrix is the inverse of the node's world
/// matrix, so a camera can ride on a movement rig like any other node.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    pub projection: Projection,
}

impl Camera {
    pub fn perspective(fov_y_degrees: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self {
            projection: Projection::Perspective {
                fov_y_radians: fov_y_degrees.to_radians(),
                aspect,
                near,
                far,
            },
        }
    }

    pub fn orthographic(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Self {
        Self {
            projection: Projection::Orthographic {
                left,
                right,
                bottom,
                top,
                near,
                far,
            },
        }
    }

    pub fn proj(&self) -> Mat4 {
        self.projection.matrix()
    }

    pub fn view(world: Mat4) -> Mat4 {
        world.inverse()
    }

    pub fn set_aspect_ratio(&mut self, value: f32) {
        if let Projection::Perspective { aspect, .. } = &mut self.projection {
            *aspect = value;
        }
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::perspective(60.0, 1.0, 0.1, 1000.0)
    }
}
