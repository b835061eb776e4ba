//! Weighted-Blended Order-Independent Transparency
//!
//! Transparent fragments are accumulated into two attachments without
//! sorting:
//!
//! | Attachment   | Format        | Blend (color)  | Blend (alpha)              | Clear        |
//! |--------------|---------------|----------------|----------------------------|--------------|
//! | accumulation | `Rgba16Float` | ONE, ONE       | ZERO, ONE_MINUS_SRC_ALPHA  | (0, 0, 0, 1) |
//! | weight       | `R16Float`    | ONE, ONE       | ZERO, ONE_MINUS_SRC_ALPHA  | (0, 0, 0, 1) |
//!
//! Programs write `(rgb * a * w, a)` into the accumulation attachment and
//! `a * w` into the weight attachment. The alpha channel of the accumulation
//! therefore ends up as the revealage `∏(1 - a)`. The resolve composites
//! `(accum.rgb / clamp(weight, 1e-4, 5e4), 1 - revealage)` over the bound
//! target with separate-alpha blending.

use glam::{UVec2, Vec3, Vec4};
use smallvec::smallvec;

use crate::device::{
    BlendMode, ClearOp, ColorFormat, DeviceCapabilities, FullscreenQuad, GpuDevice,
    PipelineState, QuadProgram, RenderTargetDescriptor,
};
use crate::errors::Result;
use crate::renderer::RenderTarget;

/// Interface of an order-independent transparency sub-pass.
pub trait OrderIndependentTransparency {
    /// Whether the device can run this pass.
    fn supported(&self) -> bool;

    fn set_size(&mut self, device: &mut dyn GpuDevice, width: u32, height: u32) -> Result<()>;

    /// Binds and clears the accumulation target and sets the accumulation
    /// blend state.
    fn bind(&mut self, device: &mut dyn GpuDevice);

    /// Composites the accumulated result into the currently bound target.
    fn resolve(&mut self, device: &mut dyn GpuDevice);

    fn dispose(&mut self, device: &mut dyn GpuDevice);
}

const WEIGHT_MIN: f32 = 1e-4;
const WEIGHT_MAX: f32 = 5e4;

/// One texel of the accumulation attachments; CPU reference of the blend
/// and resolve equations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WboitTexel {
    pub accum: Vec4,
    pub weight: f32,
}

impl WboitTexel {
    /// Value after the clear in [`OrderIndependentTransparency::bind`].
    pub const CLEAR: Self = Self {
        accum: Vec4::new(0.0, 0.0, 0.0, 1.0),
        weight: 0.0,
    };

    /// Blends one fragment of straight color `color`, coverage `alpha` and
    /// depth weight `weight`.
    #[must_use]
    pub fn accumulate(self, color: Vec3, alpha: f32, weight: f32) -> Self {
        let rgb = self.accum.truncate() + color * alpha * weight;
        let revealage = self.accum.w * (1.0 - alpha);
        Self {
            accum: rgb.extend(revealage),
            weight: self.weight + alpha * weight,
        }
    }

    /// Resolved color `(rgb, alpha)`, before blending over the target.
    #[must_use]
    pub fn resolve(self) -> Vec4 {
        let rgb = self.accum.truncate() / self.weight.clamp(WEIGHT_MIN, WEIGHT_MAX);
        rgb.extend(1.0 - self.accum.w)
    }
}

/// Default [`OrderIndependentTransparency`] implementation.
#[derive(Debug)]
pub struct WboitPass {
    target: Option<RenderTarget>,
}

impl WboitPass {
    /// Device requirements of the pass.
    #[must_use]
    pub fn is_supported(caps: &DeviceCapabilities) -> bool {
        caps.float_render_targets && caps.multiple_render_targets
    }

    /// Allocates the accumulation target when the device supports it.
    pub fn new(device: &mut dyn GpuDevice, width: u32, height: u32) -> Result<Self> {
        if !Self::is_supported(&device.capabilities()) {
            log::warn!("WboitPass: float or multiple render targets unavailable");
            return Ok(Self { target: None });
        }
        let target = RenderTarget::new(
            device,
            &RenderTargetDescriptor {
                label: "WBOIT Accumulation",
                width,
                height,
                colors: smallvec![ColorFormat::Rgba16Float, ColorFormat::R16Float],
                depth_buffer: false,
            },
        )?;
        Ok(Self {
            target: Some(target),
        })
    }

    #[must_use]
    pub fn size(&self) -> Option<UVec2> {
        self.target.as_ref().map(RenderTarget::size)
    }
}

impl OrderIndependentTransparency for WboitPass {
    fn supported(&self) -> bool {
        self.target.is_some()
    }

    fn set_size(&mut self, device: &mut dyn GpuDevice, width: u32, height: u32) -> Result<()> {
        if let Some(target) = self.target.as_mut() {
            target.resize(device, width, height)?;
        }
        Ok(())
    }

    fn bind(&mut self, device: &mut dyn GpuDevice) {
        let Some(target) = self.target.as_ref() else {
            return;
        };
        target.bind(device);
        device.clear(ClearOp {
            color: Some(WboitTexel::CLEAR.accum),
            depth: None,
        });
        device.set_state(&PipelineState::WBOIT_ACCUMULATE);
    }

    fn resolve(&mut self, device: &mut dyn GpuDevice) {
        let Some(target) = self.target.as_ref() else {
            return;
        };
        let (Ok(accum), Ok(weight)) = (
            device.target_texture(target.id(), 0),
            device.target_texture(target.id(), 1),
        ) else {
            log::warn!("WboitPass: accumulation textures missing, skipping resolve");
            return;
        };
        device.set_state(&PipelineState::FULLSCREEN.with_blend(BlendMode::SeparateAlpha));
        device.draw_quad(&FullscreenQuad {
            program: QuadProgram::WboitResolve,
            inputs: smallvec![accum, weight],
            tex_size: target.size(),
        });
    }

    fn dispose(&mut self, device: &mut dyn GpuDevice) {
        if let Some(target) = self.target.take() {
            target.destroy(device);
        }
    }
}
