//! Renderer Settings & Transparency Path Configuration
//!
//! Construction-time configuration of the draw pipeline.
//!
//! The core choice is [`TransparencyPath`], which decides whether transparent
//! drawables are composited with plain alpha blending or with weighted-blended
//! order-independent transparency (WBOIT).
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use lumina::renderer::{RendererSettings, TransparencyPath};
//!
//! let settings = RendererSettings {
//!     transparency: TransparencyPath::WeightedBlended,
//!     ..Default::default()
//! };
//! let mut device = pollster::block_on(WgpuDevice::request(&settings))?;
//! let pass = DrawPass::new(&mut device, 1280, 720, settings.enable_oit())?;
//! ```

// ---------------------------------------------------------------------------
// TransparencyPath
// ---------------------------------------------------------------------------

/// Strategy used to composite transparent drawables.
///
/// | Capability                  | `Blended`    | `WeightedBlended`             |
/// |-----------------------------|--------------|-------------------------------|
/// | Order independent           | ❌           | ✅                            |
/// | Depth-writing transparency  | ✅           | ❌                            |
/// | Extra render targets        | None         | `Rgba16Float` + `R16Float`    |
/// | Device requirements         | None         | Float + multiple targets      |
///
/// When the device lacks the requirements of `WeightedBlended`, the draw pass
/// logs a warning and falls back to `Blended`.
#[derive(Debug, Clone, PartialEq, Copy, Eq, Default)]
pub enum TransparencyPath {
    /// Two-phase alpha blending: depth-writing transparent objects first, then
    /// the rest with the depth mask disabled.
    #[default]
    Blended,

    /// Weighted-blended order-independent transparency.
    WeightedBlended,
}

impl TransparencyPath {
    #[inline]
    #[must_use]
    pub fn is_order_independent(&self) -> bool {
        matches!(self, Self::WeightedBlended)
    }
}

// ---------------------------------------------------------------------------
// RendererSettings
// ---------------------------------------------------------------------------

/// Global configuration for pipeline initialization.
///
/// # Fields
///
/// | Field               | Description                         | Default           |
/// |---------------------|-------------------------------------|-------------------|
/// | `transparency`      | Transparency compositing strategy   | `Blended`         |
/// | `backends`          | Forced wgpu backend (or auto)       | `None`            |
/// | `power_preference`  | GPU adapter selection strategy      | `HighPerformance` |
/// | `required_features` | Required wgpu features              | Empty             |
/// | `required_limits`   | Required wgpu limits                | Default           |
/// | `pixel_ratio`       | Physical pixels per logical pixel   | `1.0`             |
#[derive(Debug, Clone)]
pub struct RendererSettings {
    // === Pipeline Configuration ===
    pub transparency: TransparencyPath,

    // === GPU / Backend Configuration ===
    /// Force a specific wgpu backend; `None` lets wgpu choose.
    pub backends: Option<wgpu::Backends>,

    pub power_preference: wgpu::PowerPreference,

    /// Required wgpu features that must be supported by the adapter.
    pub required_features: wgpu::Features,

    pub required_limits: wgpu::Limits,

    // === Display ===
    /// Reported through the device capabilities; scales helper viewports.
    pub pixel_ratio: f32,
}

impl Default for RendererSettings {
    fn default() -> Self {
        Self {
            transparency: TransparencyPath::default(),
            backends: None,
            power_preference: wgpu::PowerPreference::HighPerformance,
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            pixel_ratio: 1.0,
        }
    }
}

impl RendererSettings {
    /// Whether draw passes should be built with the OIT sub-pass.
    #[inline]
    #[must_use]
    pub fn enable_oit(&self) -> bool {
        self.transparency.is_order_independent()
    }
}
