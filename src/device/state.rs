//! Fixed-function pipeline state.
//!
//! [`PipelineState`] captures everything the pipeline varies per draw that is
//! not part of the program itself: culling, winding, depth test/write and the
//! blend equation. It is hashable so that backends which bake state into
//! pipeline objects (wgpu) can use it directly as part of a cache key.

/// Polygon face selector for culling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Face {
    Front,
    Back,
}

/// Winding order that defines the front face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FrontFace {
    #[default]
    Ccw,
    Cw,
}

/// Blend equations used by the pipeline.
///
/// | Mode              | Color (src, dst)             | Alpha (src, dst)             |
/// |-------------------|------------------------------|------------------------------|
/// | `Premultiplied`   | ONE, ONE_MINUS_SRC_ALPHA     | ONE, ONE_MINUS_SRC_ALPHA     |
/// | `SeparateAlpha`   | SRC_ALPHA, ONE_MINUS_SRC_ALPHA | ONE, ONE_MINUS_SRC_ALPHA   |
/// | `WboitAccumulate` | ONE, ONE                     | ZERO, ONE_MINUS_SRC_ALPHA    |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendMode {
    #[default]
    Disabled,
    Premultiplied,
    SeparateAlpha,
    WboitAccumulate,
}

impl BlendMode {
    #[inline]
    #[must_use]
    pub fn is_enabled(self) -> bool {
        !matches!(self, Self::Disabled)
    }
}

/// Complete fixed-function state for one draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipelineState {
    /// Culled face, `None` disables culling.
    pub cull: Option<Face>,
    pub front_face: FrontFace,
    pub depth_test: bool,
    pub depth_write: bool,
    pub blend: BlendMode,
}

impl PipelineState {
    /// Depth tested and written, no blending, back faces culled.
    pub const OPAQUE: Self = Self {
        cull: Some(Face::Back),
        front_face: FrontFace::Ccw,
        depth_test: true,
        depth_write: true,
        blend: BlendMode::Disabled,
    };

    /// State for full-screen passes: nothing culled, no depth, no blending.
    pub const FULLSCREEN: Self = Self {
        cull: None,
        front_face: FrontFace::Ccw,
        depth_test: false,
        depth_write: false,
        blend: BlendMode::Disabled,
    };

    /// WBOIT accumulation: depth is tested in-shader, back faces culled.
    pub const WBOIT_ACCUMULATE: Self = Self {
        cull: Some(Face::Back),
        front_face: FrontFace::Ccw,
        depth_test: false,
        depth_write: false,
        blend: BlendMode::WboitAccumulate,
    };

    #[must_use]
    pub fn with_blend(mut self, blend: BlendMode) -> Self {
        self.blend = blend;
        self
    }

    #[must_use]
    pub fn with_depth_write(mut self, depth_write: bool) -> Self {
        self.depth_write = depth_write;
        self
    }
}

impl Default for PipelineState {
    fn default() -> Self {
        Self::OPAQUE
    }
}
