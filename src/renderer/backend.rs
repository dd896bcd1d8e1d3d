use std::fmt;

use super::frame::FrameData;
use super::material::ShaderKey;
use crate::asset::Assets;
use crate::error::{RenderError, ShaderError};

/// Backend-owned depth-only render target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DepthTargetId(pub u64);

impl fmt::Display for DepthTargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "depth#{}", self.0)
    }
}

/// Whether [`RenderBackend::submit`] actually executed the frame's passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitStatus {
    Rendered,
    /// Nothing was drawn, e.g. the surface had to be reconfigured.
    Skipped,
}

/// What the renderer needs from a graphics backend.
///
/// The renderer decides *what* is drawn each frame and hands the result to
/// [`RenderBackend::submit`]; the backend owns programs, GPU resources and
/// the actual passes.
pub trait RenderBackend {
    /// Compiles (or finds cached) the program for `key`. Called when a
    /// material is registered and when a frame needs a fallback variant.
    fn prepare_program(&mut self, key: &ShaderKey, material: &str) -> Result<(), ShaderError>;

    /// Allocates a square depth-only target.
    fn create_depth_target(&mut self, size: u32) -> Result<DepthTargetId, RenderError>;

    fn release_depth_target(&mut self, id: DepthTargetId) -> Result<(), RenderError>;

    /// Output size in pixels.
    fn viewport(&self) -> (u32, u32);

    /// Runs the shadow pre-pass (if any) and then the main pass.
    fn submit(&mut self, frame: &FrameData, assets: &Assets) -> Result<SubmitStatus, RenderError>;
}
