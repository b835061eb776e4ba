//! Depth Merge Pass
//!
//! Combines the depth of opaque primitives and of volumes into one packed
//! RGBA8 depth image. Inputs are either native depth textures or packed
//! RGBA8 textures, selected by `packed_depth` at construction.
//!
//! The pass holds no state besides its inputs and the texture-size uniform,
//! which is resynchronized whenever the inputs change size.

use glam::UVec2;
use smallvec::smallvec;

use crate::device::{ClearOp, FullscreenQuad, GpuDevice, PipelineState, QuadProgram, TextureId};

/// Largest value representable by the 24-bit depth encoding.
const DEPTH_SCALE: f32 = 16_777_215.0;

/// Encodes a depth in `[0, 1]` into RGBA8. Ordering is preserved; alpha is
/// always 255.
#[must_use]
pub fn pack_depth(depth: f32) -> [u8; 4] {
    let v = (depth.clamp(0.0, 1.0) * DEPTH_SCALE).round() as u32;
    [(v >> 16) as u8, (v >> 8) as u8, v as u8, 255]
}

#[must_use]
pub fn unpack_depth(rgba: [u8; 4]) -> f32 {
    let v = (u32::from(rgba[0]) << 16) | (u32::from(rgba[1]) << 8) | u32::from(rgba[2]);
    v as f32 / DEPTH_SCALE
}

/// One texel of a depth input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DepthSample {
    Native(f32),
    Packed([u8; 4]),
}

impl DepthSample {
    #[must_use]
    pub fn depth(self) -> f32 {
        match self {
            Self::Native(d) => d,
            Self::Packed(rgba) => unpack_depth(rgba),
        }
    }
}

/// CPU reference of the merge shader for one texel.
#[must_use]
pub fn merge_texel(primitives: DepthSample, volumes: DepthSample) -> [u8; 4] {
    pack_depth(primitives.depth().min(volumes.depth()))
}

/// Full-screen pass writing the nearer of two depths.
#[derive(Debug)]
pub struct DepthMergePass {
    packed_depth: bool,
    primitives: TextureId,
    volumes: TextureId,
    tex_size: UVec2,
}

impl DepthMergePass {
    #[must_use]
    pub fn new(packed_depth: bool, primitives: TextureId, volumes: TextureId, size: UVec2) -> Self {
        Self {
            packed_depth,
            primitives,
            volumes,
            tex_size: size,
        }
    }

    #[must_use]
    pub fn packed_depth(&self) -> bool {
        self.packed_depth
    }

    #[must_use]
    pub fn tex_size(&self) -> UVec2 {
        self.tex_size
    }

    /// Updates the texture-size uniform.
    pub fn set_size(&mut self, width: u32, height: u32) {
        self.tex_size = UVec2::new(width, height);
    }

    /// Merges into the currently bound target, inside the current viewport.
    pub fn render(&mut self, device: &mut dyn GpuDevice) {
        if let Some(size) = device.texture_size(self.primitives)
            && size != self.tex_size
        {
            log::debug!("DepthMergePass: input resized to {size}, resyncing");
            self.tex_size = size;
        }

        device.set_state(&PipelineState::FULLSCREEN);
        device.clear(ClearOp {
            color: Some(glam::Vec4::ONE),
            depth: None,
        });
        device.draw_quad(&FullscreenQuad {
            program: QuadProgram::DepthMerge {
                packed_depth: self.packed_depth,
            },
            inputs: smallvec![self.primitives, self.volumes],
            tex_size: self.tex_size,
        });
    }
}
