//! GPU Command Submission
//!
//! The [`GpuDevice`] trait is the seam between the draw pipeline and the
//! graphics API. It models immediate, in-order command submission: binding a
//! framebuffer, setting fixed-function state, using a program, drawing. Every
//! call is issued synchronously and ordering between passes is purely program
//! order; [`GpuDevice::flush`] hands the recorded frame to the GPU.
//!
//! Two backends are provided:
//!
//! | Backend             | Purpose                                           |
//! |---------------------|---------------------------------------------------|
//! | [`RecordingDevice`] | Headless; records commands and tracks resources   |
//! | [`WgpuDevice`]      | Replays commands into `wgpu` render passes        |
//!
//! Resources are addressed through `slotmap` handles ([`TargetId`],
//! [`TextureId`], [`ProgramId`], [`GeometryId`]). Programs and geometries are
//! registered by the scene graph; the pipeline only references them.

mod recording;
mod state;
mod stats;
pub mod wgpu;

pub use recording::RecordingDevice;
pub use state::{BlendMode, Face, FrontFace, PipelineState};
pub use stats::{DeviceStats, SHADERS_PER_PROGRAM};
pub use self::wgpu::WgpuDevice;

use glam::{UVec2, Vec4};
use smallvec::SmallVec;

use crate::errors::Result;
use crate::renderer::clip::ClipDefines;
use crate::renderer::uniforms::GlobalUniforms;
use crate::scene::DrawableId;

slotmap::new_key_type! {
    /// Handle to a render target (framebuffer + attachments).
    pub struct TargetId;
    /// Handle to a texture (target attachment or standalone depth texture).
    pub struct TextureId;
    /// Handle to a linked program.
    pub struct ProgramId;
    /// Handle to a geometry (vertex array).
    pub struct GeometryId;
}

// ============================================================================
// Capabilities
// ============================================================================

/// Capability flags reported by a device.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeviceCapabilities {
    /// Depth textures can be attached to framebuffers and sampled.
    ///
    /// When `false` the pipeline falls back to packed depth: depth is
    /// rendered into RGBA8 color targets.
    pub depth_texture: bool,
    /// Fragment shaders can write depth manually.
    pub frag_depth: bool,
    /// Floating point color attachments are renderable and blendable.
    pub float_render_targets: bool,
    /// Several color attachments can be written by one draw.
    pub multiple_render_targets: bool,
    /// Ratio of physical to logical pixels.
    pub pixel_ratio: f32,
    /// Current drawing buffer dimensions.
    pub drawing_buffer_size: UVec2,
}

impl Default for DeviceCapabilities {
    fn default() -> Self {
        Self {
            depth_texture: true,
            frag_depth: true,
            float_render_targets: true,
            multiple_render_targets: true,
            pixel_ratio: 1.0,
            drawing_buffer_size: UVec2::ZERO,
        }
    }
}

// ============================================================================
// Resource Descriptors
// ============================================================================

/// Color attachment formats used by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorFormat {
    /// 8-bit RGBA; also used for packed depth.
    Rgba8,
    /// WBOIT accumulation.
    Rgba16Float,
    /// WBOIT weight.
    R16Float,
}

/// Description of a render target.
#[derive(Debug, Clone)]
pub struct RenderTargetDescriptor {
    pub label: &'static str,
    pub width: u32,
    pub height: u32,
    pub colors: SmallVec<[ColorFormat; 2]>,
    /// Whether the target owns a depth buffer of its own.
    pub depth_buffer: bool,
}

impl RenderTargetDescriptor {
    /// Single RGBA8 color attachment with its own depth buffer.
    #[must_use]
    pub fn color(label: &'static str, width: u32, height: u32) -> Self {
        Self {
            label,
            width,
            height,
            colors: smallvec::smallvec![ColorFormat::Rgba8],
            depth_buffer: true,
        }
    }
}

/// Framebuffer selector for [`GpuDevice::bind_framebuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framebuffer {
    /// The presentation surface (or the caller-provided output view).
    DrawingBuffer,
    /// An offscreen render target.
    Target(TargetId),
}

/// Viewport rectangle in physical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Viewport {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    #[must_use]
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_vec4(&self) -> Vec4 {
        Vec4::new(
            self.x as f32,
            self.y as f32,
            self.width as f32,
            self.height as f32,
        )
    }
}

// ============================================================================
// Commands
// ============================================================================

/// Buffers cleared by [`GpuDevice::clear`]. `None` leaves the buffer untouched.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ClearOp {
    pub color: Option<Vec4>,
    pub depth: Option<f32>,
}

/// One drawable drawn with one program.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawCall {
    pub drawable: DrawableId,
    pub program: ProgramId,
    pub geometry: GeometryId,
    pub instance_count: u32,
    /// Depth texture sampled in-shader for manual depth testing.
    pub depth_texture: Option<TextureId>,
}

/// Built-in full-screen programs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuadProgram {
    /// Writes the nearer of two depth inputs, packed into RGBA8.
    DepthMerge { packed_depth: bool },
    /// Composites the WBOIT accumulation and weight inputs.
    WboitResolve,
    /// Copies one color input.
    Copy,
}

/// Full-screen quad draw with its texture inputs.
#[derive(Debug, Clone, PartialEq)]
pub struct FullscreenQuad {
    pub program: QuadProgram,
    pub inputs: SmallVec<[TextureId; 2]>,
    pub tex_size: UVec2,
}

/// Command stream entry. Backends record these in submission order.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCommand {
    AttachDepth {
        target: TargetId,
        /// `None` re-attaches the target's own depth buffer.
        texture: Option<TextureId>,
    },
    BindFramebuffer(Framebuffer),
    SetViewport(Viewport),
    SetState(PipelineState),
    Clear(ClearOp),
    UseProgram(ProgramId),
    /// Global uniforms written for `program`; `slot` indexes the frame's
    /// uniform snapshots.
    UploadGlobals { program: ProgramId, slot: u32 },
    Relink {
        drawable: DrawableId,
        defines: ClipDefines,
    },
    Draw(DrawCall),
    DrawQuad(FullscreenQuad),
    Flush,
}

// ============================================================================
// Device Trait
// ============================================================================

/// Immediate-mode GPU command submission.
///
/// The trait is object safe; the pipeline passes `&mut dyn GpuDevice`
/// explicitly to every operation instead of holding ambient GPU state.
pub trait GpuDevice {
    fn capabilities(&self) -> DeviceCapabilities;

    /// Resource counts and the draw counters of the last flushed frame.
    fn stats(&self) -> DeviceStats;

    // ========================================================================
    // Resources
    // ========================================================================

    fn create_render_target(&mut self, desc: &RenderTargetDescriptor) -> Result<TargetId>;

    /// Reallocates every attachment of `target` at the new size. Texture
    /// handles of the target stay valid.
    fn resize_render_target(&mut self, target: TargetId, width: u32, height: u32) -> Result<()>;

    fn destroy_render_target(&mut self, target: TargetId);

    /// Texture backing color attachment `attachment` of `target`.
    fn target_texture(&self, target: TargetId, attachment: usize) -> Result<TextureId>;

    /// Creates a standalone depth texture with no storage yet.
    fn create_depth_texture(&mut self, label: &'static str) -> Result<TextureId>;

    /// (Re)allocates storage of a standalone depth texture.
    fn define_depth_texture(&mut self, texture: TextureId, width: u32, height: u32) -> Result<()>;

    fn destroy_texture(&mut self, texture: TextureId);

    fn texture_size(&self, texture: TextureId) -> Option<UVec2>;

    // ========================================================================
    // Commands
    // ========================================================================

    /// Attaches `texture` as the depth attachment of `target`, or restores
    /// the target's own depth buffer with `None`.
    fn attach_depth(&mut self, target: TargetId, texture: Option<TextureId>);

    fn bind_framebuffer(&mut self, framebuffer: Framebuffer);

    fn set_viewport(&mut self, viewport: Viewport);

    fn set_state(&mut self, state: &PipelineState);

    fn clear(&mut self, op: ClearOp);

    fn use_program(&mut self, program: ProgramId);

    fn upload_globals(&mut self, program: ProgramId, globals: &GlobalUniforms);

    /// Relinks the programs of `drawable` with new clip defines.
    fn relink(&mut self, drawable: DrawableId, defines: ClipDefines);

    /// Draws a registered geometry with a registered program. Unknown
    /// handles are reported by the next [`GpuDevice::flush`].
    fn draw(&mut self, call: &DrawCall);

    fn draw_quad(&mut self, quad: &FullscreenQuad);

    /// Submits all commands issued since the previous flush.
    ///
    /// Commands that cannot be executed do not stop the submission; the first
    /// such failure is returned once the rest of the frame has been submitted.
    fn flush(&mut self) -> Result<()>;

    // ========================================================================
    // Frames
    // ========================================================================

    /// Opens a frame. Draw counters accumulate over every flush until
    /// [`GpuDevice::end_frame`]; without an open frame each flush counts as a
    /// frame of its own.
    fn begin_frame(&mut self);

    /// Closes the frame and publishes its draw counters.
    fn end_frame(&mut self);
}
