use glam::{Mat3, Mat4, Quat, Vec3};

/// Affine 4x4 transform of a scene node.
///
/// Operations taking `local` post-multiply when `local` is true (the change is
/// expressed in the node's own axes) and pre-multiply otherwise (expressed in
/// the parent's axes).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform(pub Mat4);

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Self = Self(Mat4::IDENTITY);

    pub fn from_translation(translation: Vec3) -> Self {
        Self(Mat4::from_translation(translation))
    }

    pub fn from_trs(t: Vec3, r: Quat, s: Vec3) -> Self {
        Self(Mat4::from_scale_rotation_translation(s, r, t))
    }

    pub fn matrix(&self) -> Mat4 {
        self.0
    }

    pub fn apply(&mut self, m: Mat4, local: bool) {
        self.0 = if local { self.0 * m } else { m * self.0 };
    }

    pub fn translate(&mut self, offset: Vec3, local: bool) {
        self.apply(Mat4::from_translation(offset), local);
    }

    pub fn rotate_x(&mut self, angle: f32, local: bool) {
        self.apply(Mat4::from_rotation_x(angle), local);
    }

    pub fn rotate_y(&mut self, angle: f32, local: bool) {
        self.apply(Mat4::from_rotation_y(angle), local);
    }

    pub fn rotate_z(&mut self, angle: f32, local: bool) {
        self.apply(Mat4::from_rotation_z(angle), local);
    }

    pub fn scale(&mut self, factor: Vec3, local: bool) {
        self.apply(Mat4::from_scale(factor), local);
    }

    /// Replaces the translation column, keeping rotation and scale.
    pub fn set_position(&mut self, position: Vec3) {
        self.0.w_axis = position.extend(1.0);
    }

    pub fn position(&self) -> Vec3 {
        self.0.w_axis.truncate()
    }

    pub fn rotation_scale(&self) -> Mat3 {
        Mat3::from_mat4(self.0)
    }

    /// Forward (-Z) axis of the rotation part.
    pub fn direction(&self) -> Vec3 {
        safe_normalize(self.rotation_scale() * Vec3::NEG_Z, Vec3::NEG_Z)
    }

    /// Orients -Z toward `target`, keeping the current position. Scale is reset.
    pub fn look_at(&mut self, target: Vec3) {
        let position = self.position();
        let forward = target - position;
        if forward.length_squared() < 1e-12 {
            return;
        }
        let up = up_for(forward.normalize());
        self.0 = Mat4::look_at_rh(position, target, up).inverse();
        self.set_position(position);
    }

    pub fn set_direction(&mut self, direction: Vec3) {
        let position = self.position();
        self.look_at(position + direction);
    }

    /// Rigid part of the transform (rotation and translation, scale removed).
    pub fn rigid(&self) -> Mat4 {
        let (_, rotation, translation) = self.0.to_scale_rotation_translation();
        Mat4::from_rotation_translation(rotation, translation)
    }

    pub fn is_affine(&self) -> bool {
        self.0.row(3).abs_diff_eq(glam::Vec4::W, 1e-5)
    }
}

pub(crate) fn up_for(direction: Vec3) -> Vec3 {
    if direction.abs().dot(Vec3::Y) > 0.999 {
        Vec3::Z
    } else {
        Vec3::Y
    }
}

pub(crate) fn safe_normalize(v: Vec3, fallback: Vec3) -> Vec3 {
    if v.length_squared() > 1e-12 {
        v.normalize()
    } else {
        fallback
    }
}
