// scene/components.rs
// hecs components making up a scene node

use crate::asset::Handle;
use crate::renderer::{Geometry, Material};
use crate::scene::Transform;

// ============================================================================
// Node Components
// ============================================================================

/// Transform relative to the parent node.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalTransform(pub Transform);

/// World-space transform, recomputed top-down every frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct GlobalTransform(pub Transform);

/// Name component for diagnostics
#[derive(Debug, Clone)]
pub struct Name(pub String);

impl Name {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

/// Non-owning link to the parent node.
#[derive(Debug, Clone, Copy)]
pub struct Parent(pub hecs::Entity);

/// Owned, ordered children.
#[derive(Debug, Clone, Default)]
pub struct Children(pub Vec<hecs::Entity>);

// ============================================================================
// Rendering Components
// ============================================================================

#[derive(Debug, Clone, Copy)]
pub struct MeshComponent {
    pub geometry: Handle<Geometry>,
    pub material: Handle<Material>,
    pub casts_shadow: bool,
}

impl MeshComponent {
    pub fn new(geometry: Handle<Geometry>, material: Handle<Material>) -> Self {
        Self {
            geometry,
            material,
            casts_shadow: true,
        }
    }
}

/// Visibility component
#[derive(Debug, Clone, Copy)]
pub struct Visible(pub bool);

impl Default for Visible {
    fn default() -> Self {
        Self(true)
    }
}
