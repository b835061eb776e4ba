use glam::UVec2;

use crate::device::{Framebuffer, GpuDevice, RenderTargetDescriptor, TargetId, TextureId};
use crate::errors::Result;

/// Owned render target with a tracked size.
#[derive(Debug)]
pub struct RenderTarget {
    id: TargetId,
    label: &'static str,
    size: UVec2,
}

impl RenderTarget {
    pub fn new(device: &mut dyn GpuDevice, desc: &RenderTargetDescriptor) -> Result<Self> {
        let id = device.create_render_target(desc)?;
        Ok(Self {
            id,
            label: desc.label,
            size: UVec2::new(desc.width, desc.height),
        })
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> TargetId {
        self.id
    }

    #[inline]
    #[must_use]
    pub fn size(&self) -> UVec2 {
        self.size
    }

    /// Resizes all attachments. Returns `false` if the size was unchanged.
    pub fn resize(&mut self, device: &mut dyn GpuDevice, width: u32, height: u32) -> Result<bool> {
        if self.size == UVec2::new(width, height) {
            return Ok(false);
        }
        device.resize_render_target(self.id, width, height)?;
        self.size = UVec2::new(width, height);
        log::debug!("{}: resized to {width}x{height}", self.label);
        Ok(true)
    }

    pub fn bind(&self, device: &mut dyn GpuDevice) {
        device.bind_framebuffer(Framebuffer::Target(self.id));
    }

    /// Texture of the first color attachment.
    pub fn texture(&self, device: &dyn GpuDevice) -> Result<TextureId> {
        device.target_texture(self.id, 0)
    }

    pub fn destroy(self, device: &mut dyn GpuDevice) {
        device.destroy_render_target(self.id);
    }
}

/// Standalone depth texture, attachable to render targets.
#[derive(Debug)]
pub struct DepthTexture {
    id: TextureId,
    size: UVec2,
}

impl DepthTexture {
    pub fn new(device: &mut dyn GpuDevice, label: &'static str, width: u32, height: u32) -> Result<Self> {
        let id = device.create_depth_texture(label)?;
        device.define_depth_texture(id, width, height)?;
        Ok(Self {
            id,
            size: UVec2::new(width, height),
        })
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> TextureId {
        self.id
    }

    #[inline]
    #[must_use]
    pub fn size(&self) -> UVec2 {
        self.size
    }

    /// Reallocates storage at the new size. Returns `false` if unchanged.
    pub fn define(&mut self, device: &mut dyn GpuDevice, width: u32, height: u32) -> Result<bool> {
        if self.size == UVec2::new(width, height) {
            return Ok(false);
        }
        device.define_depth_texture(self.id, width, height)?;
        self.size = UVec2::new(width, height);
        Ok(true)
    }

    /// Makes this texture the depth attachment of `target`.
    pub fn attach_to(&self, device: &mut dyn GpuDevice, target: &RenderTarget) {
        device.attach_depth(target.id(), Some(self.id));
    }

    pub fn destroy(self, device: &mut dyn GpuDevice) {
        device.destroy_texture(self.id);
    }
}
