// scene/mod.rs

pub mod builder;
pub mod camera;
pub mod components;
pub(crate) mod internal;
pub mod light;
pub mod rig;
pub mod scene;
pub mod transform;

// Re-export commonly used types
pub use builder::NodeBuilder;
pub use camera::{Camera, Projection};
pub use light::{Light, LightKind};
pub use rig::MovementRig;
pub use scene::Scene;
pub use transform::Transform;

// Re-export all components
pub use components::{
    Children, GlobalTransform, LocalTransform, MeshComponent, Name, Parent, Visible,
};
