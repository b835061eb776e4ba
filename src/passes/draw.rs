//! Draw Pass
//!
//! Top-level frame orchestration. [`DrawPass`] owns the final color and depth
//! targets and sequences the renderer passes of one frame:
//!
//! ```text
//! Blended path                          Weighted-blended path
//! ────────────                          ─────────────────────
//! clear                                 clear
//! opaque primitives                     WBOIT opaque primitives
//! [packed] depth-only primitives        clear depth
//! [native] clear depth                  WBOIT opaque volumes
//! blended volumes                       depth merge
//! [packed] depth-only volumes           bind OIT target
//! transparent primitives                WBOIT transparent primitives + volumes
//! depth merge                           resolve
//! ```
//!
//! Stereo cameras run the whole sequence once per eye (left first) into the
//! same destination. Helper overlays are drawn last, then the frame is
//! flushed.
//!
//! When the device cannot attach depth textures (`packed_depth`), primitive
//! and volume depth are captured into dedicated RGBA8 targets by depth-only
//! passes; otherwise standalone depth textures are swapped in and out as the
//! depth attachment of the color target.

use glam::UVec2;
use smallvec::smallvec;

use super::depth_merge::DepthMergePass;
use super::wboit::{OrderIndependentTransparency, WboitPass};
use crate::device::{
    ClearOp, Framebuffer, FullscreenQuad, GpuDevice, PipelineState, QuadProgram,
    RenderTargetDescriptor, TextureId,
};
use crate::errors::{LuminaError, Result};
use crate::renderer::{DepthTexture, RenderTarget, Renderer, TransparencyPath};
use crate::scene::{Camera, CameraView, HelperOverlay, Scene};

// ============================================================================
// Depth Capture
// ============================================================================

/// Where the depth of one scene group is captured.
#[derive(Debug)]
enum DepthCapture {
    /// RGBA8 target filled by a depth-only pass.
    Packed {
        target: RenderTarget,
        texture: TextureId,
    },
    /// Depth texture attached to the color target while the group renders.
    Native(DepthTexture),
}

impl DepthCapture {
    fn new(
        device: &mut dyn GpuDevice,
        packed: bool,
        label: &'static str,
        width: u32,
        height: u32,
    ) -> Result<Self> {
        if packed {
            let target =
                RenderTarget::new(device, &RenderTargetDescriptor::color(label, width, height))?;
            let texture = target.texture(device)?;
            Ok(Self::Packed { target, texture })
        } else {
            Ok(Self::Native(DepthTexture::new(device, label, width, height)?))
        }
    }

    fn texture(&self) -> TextureId {
        match self {
            Self::Packed { texture, .. } => *texture,
            Self::Native(depth) => depth.id(),
        }
    }

    fn size(&self) -> UVec2 {
        match self {
            Self::Packed { target, .. } => target.size(),
            Self::Native(depth) => depth.size(),
        }
    }

    fn packed_target(&self) -> Option<&RenderTarget> {
        match self {
            Self::Packed { target, .. } => Some(target),
            Self::Native(_) => None,
        }
    }

    fn resize(&mut self, device: &mut dyn GpuDevice, width: u32, height: u32) -> Result<()> {
        match self {
            Self::Packed { target, .. } => target.resize(device, width, height)?,
            Self::Native(depth) => depth.define(device, width, height)?,
        };
        Ok(())
    }

    /// Makes the captured texture the depth attachment of `target`. Packed
    /// captures cannot be attached.
    fn attach_to(&self, device: &mut dyn GpuDevice, target: &RenderTarget) {
        if let Self::Native(depth) = self {
            depth.attach_to(device, target);
        }
    }

    fn destroy(self, device: &mut dyn GpuDevice) {
        match self {
            Self::Packed { target, .. } => target.destroy(device),
            Self::Native(depth) => depth.destroy(device),
        }
    }
}

// ============================================================================
// Draw Pass
// ============================================================================

/// Frame orchestrator.
pub struct DrawPass {
    color_target: RenderTarget,
    /// RGBA8 target receiving the merged, packed depth.
    depth_target: RenderTarget,
    packed_depth: bool,
    depth_primitives: DepthCapture,
    depth_volumes: DepthCapture,
    depth_merge: DepthMergePass,
    oit: Option<Box<dyn OrderIndependentTransparency>>,
    transparency: TransparencyPath,
}

impl DrawPass {
    /// Allocates all targets at `width` x `height`. With `enable_oit` a
    /// [`WboitPass`] is created; it is used only if the device supports it.
    pub fn new(device: &mut dyn GpuDevice, width: u32, height: u32, enable_oit: bool) -> Result<Self> {
        let oit: Option<Box<dyn OrderIndependentTransparency>> = if enable_oit {
            Some(Box::new(WboitPass::new(device, width, height)?))
        } else {
            None
        };
        Self::with_oit(device, width, height, oit)
    }

    /// Like [`DrawPass::new`] with a caller-provided OIT implementation.
    pub fn with_oit(
        device: &mut dyn GpuDevice,
        width: u32,
        height: u32,
        oit: Option<Box<dyn OrderIndependentTransparency>>,
    ) -> Result<Self> {
        let packed_depth = !device.capabilities().depth_texture;

        let color_target =
            RenderTarget::new(device, &RenderTargetDescriptor::color("Draw Color", width, height))?;
        let depth_target =
            RenderTarget::new(device, &RenderTargetDescriptor::color("Draw Depth", width, height))?;
        let depth_primitives =
            DepthCapture::new(device, packed_depth, "Depth Primitives", width, height)?;
        let depth_volumes = DepthCapture::new(device, packed_depth, "Depth Volumes", width, height)?;
        let depth_merge = DepthMergePass::new(
            packed_depth,
            depth_primitives.texture(),
            depth_volumes.texture(),
            UVec2::new(width, height),
        );

        let oit_usable = oit.as_ref().is_some_and(|o| o.supported());
        let transparency = if oit_usable && !packed_depth {
            TransparencyPath::WeightedBlended
        } else {
            if oit.is_some() {
                log::warn!("DrawPass: order-independent transparency unavailable, using blended");
            }
            TransparencyPath::Blended
        };

        log::debug!(
            "DrawPass: {width}x{height}, packed depth: {packed_depth}, transparency: {transparency:?}"
        );

        Ok(Self {
            color_target,
            depth_target,
            packed_depth,
            depth_primitives,
            depth_volumes,
            depth_merge,
            oit,
            transparency,
        })
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    #[must_use]
    pub fn packed_depth(&self) -> bool {
        self.packed_depth
    }

    #[must_use]
    pub fn transparency(&self) -> TransparencyPath {
        self.transparency
    }

    #[must_use]
    pub fn wboit_enabled(&self) -> bool {
        self.transparency == TransparencyPath::WeightedBlended
    }

    #[must_use]
    pub fn color_target(&self) -> &RenderTarget {
        &self.color_target
    }

    #[must_use]
    pub fn depth_target(&self) -> &RenderTarget {
        &self.depth_target
    }

    /// Primitive depth: packed RGBA8 or native depth texture.
    #[must_use]
    pub fn depth_texture_primitives(&self) -> TextureId {
        self.depth_primitives.texture()
    }

    #[must_use]
    pub fn depth_texture_volumes(&self) -> TextureId {
        self.depth_volumes.texture()
    }

    /// Sizes of both depth captures.
    #[must_use]
    pub fn depth_capture_sizes(&self) -> [UVec2; 2] {
        [self.depth_primitives.size(), self.depth_volumes.size()]
    }

    #[must_use]
    pub fn depth_merge(&self) -> &DepthMergePass {
        &self.depth_merge
    }

    /// Selects the transparency path. The weighted-blended path needs a
    /// supported OIT sub-pass and native depth textures.
    pub fn set_transparency(&mut self, path: TransparencyPath) -> Result<()> {
        if path == TransparencyPath::WeightedBlended {
            let usable = self.oit.as_ref().is_some_and(|o| o.supported());
            if !usable || self.packed_depth {
                return Err(LuminaError::OitNotEnabled);
            }
        }
        self.transparency = path;
        Ok(())
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Resizes every owned target. A no-op when the size is unchanged.
    ///
    /// The color target is resized last: its size only changes once every
    /// other target has been resized, so a failed resize can be retried.
    pub fn set_size(&mut self, device: &mut dyn GpuDevice, width: u32, height: u32) -> Result<()> {
        if self.color_target.size() == UVec2::new(width, height) {
            return Ok(());
        }

        self.depth_target.resize(device, width, height)?;
        self.depth_primitives.resize(device, width, height)?;
        self.depth_volumes.resize(device, width, height)?;
        if let Some(oit) = self.oit.as_deref_mut()
            && oit.supported()
        {
            oit.set_size(device, width, height)?;
        }
        self.color_target.resize(device, width, height)?;
        self.depth_merge.set_size(width, height);

        log::debug!("DrawPass: resized to {width}x{height}");
        Ok(())
    }

    pub fn dispose(mut self, device: &mut dyn GpuDevice) {
        if let Some(mut oit) = self.oit.take() {
            oit.dispose(device);
        }
        self.color_target.destroy(device);
        self.depth_target.destroy(device);
        self.depth_primitives.destroy(device);
        self.depth_volumes.destroy(device);
    }

    // ========================================================================
    // Rendering
    // ========================================================================

    /// Renders one frame, once per eye of `camera`.
    ///
    /// With `to_drawing_buffer` the result ends up in the drawing buffer,
    /// otherwise in the color target (with merged depth in the depth target).
    /// Each eye is flushed separately; the device statistics count the whole
    /// frame.
    pub fn render(
        &mut self,
        device: &mut dyn GpuDevice,
        renderer: &mut Renderer,
        camera: &Camera,
        scene: &Scene,
        helper: &HelperOverlay,
        to_drawing_buffer: bool,
        transparent_background: bool,
    ) -> Result<()> {
        renderer.set_transparent_background(transparent_background);
        let size = self.color_target.size();
        renderer.set_drawing_buffer_size(size.x, size.y);

        device.begin_frame();
        let result = camera.eyes().into_iter().try_for_each(|eye| {
            self.render_eye(
                device,
                renderer,
                eye,
                scene,
                helper,
                to_drawing_buffer,
                transparent_background,
            )
        });
        device.end_frame();
        result
    }

    fn render_eye(
        &mut self,
        device: &mut dyn GpuDevice,
        renderer: &mut Renderer,
        camera: &CameraView,
        scene: &Scene,
        helper: &HelperOverlay,
        to_drawing_buffer: bool,
        transparent_background: bool,
    ) -> Result<()> {
        let vp = camera.viewport;
        renderer.set_viewport(device, vp.x, vp.y, vp.width, vp.height);
        renderer.update(camera);

        if transparent_background && to_drawing_buffer {
            device.bind_framebuffer(Framebuffer::DrawingBuffer);
            renderer.clear(device, false);
        }

        let direct = match self.transparency {
            TransparencyPath::WeightedBlended => {
                self.render_wboit(device, renderer, camera, scene)?;
                false
            }
            TransparencyPath::Blended => {
                // Volumes need the depth capture machinery of the color target.
                let direct = to_drawing_buffer && scene.volumes.is_empty();
                self.render_blended(device, renderer, camera, scene, direct);
                direct
            }
        };

        if to_drawing_buffer && !direct {
            self.copy_to_drawing_buffer(device, renderer)?;
        }

        self.render_helpers(device, renderer, camera, helper);
        device.flush()
    }

    fn render_wboit(
        &mut self,
        device: &mut dyn GpuDevice,
        renderer: &mut Renderer,
        camera: &CameraView,
        scene: &Scene,
    ) -> Result<()> {
        if !self.oit.as_ref().is_some_and(|o| o.supported()) {
            return Err(LuminaError::OitNotEnabled);
        }

        self.color_target.bind(device);
        renderer.clear(device, true);

        self.depth_primitives.attach_to(device, &self.color_target);
        renderer.clear_depth(device);
        renderer.render_wboit_opaque(device, &scene.primitives, camera, None);

        self.depth_volumes.attach_to(device, &self.color_target);
        renderer.clear_depth(device);
        renderer.render_wboit_opaque(
            device,
            &scene.volumes,
            camera,
            Some(self.depth_primitives.texture()),
        );

        self.merge_depth(device);
        let merged = self.depth_target.texture(device)?;

        if let Some(oit) = self.oit.as_deref_mut() {
            oit.bind(device);
        }
        renderer.render_wboit_transparent(device, &scene.primitives, camera, Some(merged));
        renderer.render_wboit_transparent(device, &scene.volumes, camera, Some(merged));

        self.depth_primitives.attach_to(device, &self.color_target);
        self.color_target.bind(device);
        if let Some(oit) = self.oit.as_deref_mut() {
            oit.resolve(device);
        }
        Ok(())
    }

    fn render_blended(
        &mut self,
        device: &mut dyn GpuDevice,
        renderer: &mut Renderer,
        camera: &CameraView,
        scene: &Scene,
        direct: bool,
    ) {
        if direct {
            device.bind_framebuffer(Framebuffer::DrawingBuffer);
            renderer.clear(device, true);
            renderer.render_blended_opaque(device, &scene.primitives, camera, None);
            renderer.render_blended_transparent(device, &scene.primitives, camera, None);
            return;
        }

        self.color_target.bind(device);
        if !self.packed_depth {
            self.depth_primitives.attach_to(device, &self.color_target);
        }
        renderer.clear(device, true);
        renderer.render_blended_opaque(device, &scene.primitives, camera, None);

        if let Some(target) = self.depth_primitives.packed_target() {
            target.bind(device);
            clear_packed_depth(device);
            renderer.render_depth(device, &scene.primitives, camera, None);
            self.color_target.bind(device);
        }

        if !self.packed_depth {
            self.depth_volumes.attach_to(device, &self.color_target);
            renderer.clear_depth(device);
        }
        let primitives_depth = self.depth_primitives.texture();
        renderer.render_blended_volume(device, &scene.volumes, camera, Some(primitives_depth));

        if let Some(target) = self.depth_volumes.packed_target() {
            target.bind(device);
            clear_packed_depth(device);
            renderer.render_depth(device, &scene.volumes, camera, Some(primitives_depth));
            self.color_target.bind(device);
        }

        if !self.packed_depth {
            self.depth_primitives.attach_to(device, &self.color_target);
        }
        renderer.render_blended_transparent(device, &scene.primitives, camera, None);

        self.merge_depth(device);
        self.color_target.bind(device);
    }

    fn merge_depth(&mut self, device: &mut dyn GpuDevice) {
        self.depth_target.bind(device);
        self.depth_merge.render(device);
    }

    fn copy_to_drawing_buffer(
        &self,
        device: &mut dyn GpuDevice,
        renderer: &mut Renderer,
    ) -> Result<()> {
        let color = self.color_target.texture(device)?;
        device.bind_framebuffer(Framebuffer::DrawingBuffer);
        renderer.clear_depth(device);
        device.set_state(&PipelineState::FULLSCREEN);
        device.draw_quad(&FullscreenQuad {
            program: QuadProgram::Copy,
            inputs: smallvec![color],
            tex_size: self.color_target.size(),
        });
        Ok(())
    }

    fn render_helpers(
        &self,
        device: &mut dyn GpuDevice,
        renderer: &mut Renderer,
        camera: &CameraView,
        helper: &HelperOverlay,
    ) {
        if helper.debug.is_active() {
            renderer.render_blended(device, &helper.debug.group, camera);
        }
        if helper.handle.is_active() {
            renderer.render_blended(device, &helper.handle.group, camera);
        }
        if helper.camera.scene.is_active() {
            let gizmo = helper
                .camera
                .camera_for(camera, device.capabilities().pixel_ratio);
            let vp = gizmo.viewport;
            renderer.set_viewport(device, vp.x, vp.y, vp.width, vp.height);
            renderer.update(&gizmo);
            renderer.render_blended(device, &helper.camera.scene.group, &gizmo);
        }
    }
}

/// Clears a packed depth target to the far plane.
fn clear_packed_depth(device: &mut dyn GpuDevice) {
    device.clear(ClearOp {
        color: Some(glam::Vec4::ONE),
        depth: Some(1.0),
    });
}
