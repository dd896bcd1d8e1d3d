// error.rs
use thiserror::Error;

use crate::renderer::material::ShaderKey;
use crate::scene::LightKind;

/// Structural errors raised while building or editing the scene graph.
#[derive(Debug, Error)]
pub enum SceneError {
    /// Attaching `child` under `parent` would make a node its own ancestor.
    #[error("cannot attach {child:?} under {parent:?}: {child:?} is an ancestor of {parent:?}")]
    Cycle {
        parent: hecs::Entity,
        child: hecs::Entity,
    },
    #[error("entity {0:?} is not a scene node")]
    NoSuchNode(hecs::Entity),
    #[error("{kind} handle {index} does not exist")]
    NoSuchAsset { kind: &'static str, index: usize },
    #[error(transparent)]
    Shader(#[from] ShaderError),
}

/// Material configurations that cannot produce a valid shading program.
#[derive(Debug, Error)]
pub enum ShaderError {
    #[error("material '{material}': light capacity {capacity} is outside 1..={max}")]
    InvalidLightCapacity {
        material: String,
        capacity: usize,
        max: usize,
    },
    #[error("material '{material}': a base color and a color texture are mutually exclusive")]
    ConflictingSurface { material: String },
    #[error("material '{material}': flat shading is evaluated per vertex and cannot use a bump texture")]
    BumpOnFlat { material: String },
    #[error("material '{material}': invalid {parameter} ({value})")]
    InvalidParameter {
        material: String,
        parameter: &'static str,
        value: f32,
    },
    #[error("material '{material}' needs tangents but geometry '{geometry}' has none")]
    MissingTangents { material: String, geometry: String },
    #[error("program {key:?} for material '{material}' failed to compile: {message}")]
    Compilation {
        key: ShaderKey,
        material: String,
        message: String,
    },
}

/// Per-frame rendering failures.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("material '{material}' accepts {capacity} {kind} lights but {active} are active")]
    LightCapacityExceeded {
        material: String,
        kind: LightKind,
        active: usize,
        capacity: usize,
    },
    #[error("entity {0:?} is not a camera")]
    NoSuchCamera(hecs::Entity),
    #[error("unknown depth target {0}")]
    UnknownDepthTarget(u64),
    #[error("surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),
    #[error("backend error: {0}")]
    Backend(String),
}

#[derive(Debug, Error)]
pub enum ShadowError {
    #[error("entity {0:?} is not a light")]
    NotALight(hecs::Entity),
    #[error("{0} lights cannot cast shadows")]
    UnsupportedLight(LightKind),
    #[error("invalid shadow configuration: {0}")]
    InvalidConfig(String),
    #[error(transparent)]
    Backend(#[from] RenderError),
}

#[derive(Debug, Error)]
pub enum TextureError {
    #[error("failed to load image {path}: {source}")]
    Load {
        path: String,
        #[source]
        source: image::ImageError,
    },
}

/// Crate-level error used by the application driver.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Scene(#[from] SceneError),
    #[error(transparent)]
    Shader(#[from] ShaderError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Shadow(#[from] ShadowError),
    #[error(transparent)]
    Texture(#[from] TextureError),
}
