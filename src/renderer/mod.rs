pub mod backend;
pub mod frame;
pub mod geometry;
pub mod gpu;
pub mod lights;
pub mod material;
pub mod primitives;
pub mod renderer;
pub mod shading;
pub mod shadow;
pub mod software;
pub mod texture;
pub mod vertex;

pub use backend::{DepthTargetId, RenderBackend, SubmitStatus};
pub use frame::{FrameData, FrameStats};
pub use geometry::Geometry;
pub use gpu::GpuBackend;
pub use material::{BumpMap, Material, MaterialBuilder, ShaderFeatures, ShaderKey, ShadingModel, Surface};
pub use renderer::Renderer;
pub use shadow::{ShadowBounds, ShadowConfig, ShadowMap, ShadowState};
pub use software::SoftwareBackend;
pub use texture::TextureData;
pub use vertex::Vertex;
