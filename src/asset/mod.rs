pub mod cache;
pub mod handle;

pub use cache::AssetCache;
pub use handle::Handle;

use crate::error::SceneError;
use crate::renderer::{Geometry, Material, TextureData};

/// Shared, immutable-at-runtime resources referenced by scene nodes.
#[derive(Default)]
pub struct Assets {
    pub geometries: AssetCache<Geometry>,
    pub textures: AssetCache<TextureData>,
    pub materials: AssetCache<Material>,
}

impl Assets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn geometry(&self, handle: Handle<Geometry>) -> Result<&Geometry, SceneError> {
        self.geometries
            .get(handle)
            .ok_or(SceneError::NoSuchAsset {
                kind: "geometry",
                index: handle.index(),
            })
    }

    pub fn texture(&self, handle: Handle<TextureData>) -> Result<&TextureData, SceneError> {
        self.textures
            .get(handle)
            .ok_or(SceneError::NoSuchAsset {
                kind: "texture",
                index: handle.index(),
            })
    }

    pub fn material(&self, handle: Handle<Material>) -> Result<&Material, SceneError> {
        self.materials
            .get(handle)
            .ok_or(SceneError::NoSuchAsset {
                kind: "material",
                index: handle.index(),
            })
    }
}
