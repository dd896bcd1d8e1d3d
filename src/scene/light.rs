use std::fmt;

use glam::Vec3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LightKind {
    Ambient,
    Directional,
    Point,
}

impl fmt::Display for LightKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LightKind::Ambient => "ambient",
            LightKind::Directional => "directional",
            LightKind::Point => "point",
        };
        f.write_str(name)
    }
}

/// Light source attached to a scene node.
///
/// The pose comes from the node: directional lights shine along the node's
/// -Z axis, point lights sit at the node's world position. Ambient lights
/// only contribute their color.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    pub kind: LightKind,
    pub color: Vec3,
}

impl Light {
    pub fn ambient(color: Vec3) -> Self {
        Self {
            kind: LightKind::Ambient,
            color,
        }
    }

    pub fn directional(color: Vec3) -> Self {
        Self {
            kind: LightKind::Directional,
            color,
        }
    }

    pub fn point(color: Vec3) -> Self {
        Self {
            kind: LightKind::Point,
            color,
        }
    }
}
