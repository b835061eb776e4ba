use bitflags::bitflags;
use glam::Mat4;

use crate::device::{GeometryId, ProgramId};

/// Stable identifier of a drawable, assigned by the scene graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DrawableId(pub u32);

bitflags! {
    /// Per-object capabilities and state probed by the renderer.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct DrawableFlags: u32 {
        const VISIBLE             = 1 << 0;
        const PICKABLE            = 1 << 1;
        /// Drawn in the opaque phase of the blended path.
        const OPAQUE              = 1 << 2;
        /// Writes depth while drawn as transparent.
        const WRITE_DEPTH         = 1 << 3;
        /// Never drawn into pick buffers.
        const COLOR_ONLY          = 1 << 4;
        const DOUBLE_SIDED        = 1 << 5;
        const FLIP_SIDED          = 1 << 6;
        const HAS_REFLECTION      = 1 << 7;
        /// Points rendered as filled circles.
        const CIRCLE_POINTS       = 1 << 8;
        const XRAY_SHADED         = 1 << 9;
        /// Ignores the global clip objects.
        const NO_CLIP             = 1 << 10;
        const BACKGROUND_OVERRIDE = 1 << 11;
    }
}

/// How the geometry of a drawable is rasterized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RenderMode {
    /// Plain primitives (meshes, points, lines...).
    #[default]
    Surface,
    /// Ray-marched isosurface; writes fragment depth.
    Isosurface,
    /// Ray-marched direct volume rendering.
    Volume,
}

impl RenderMode {
    #[inline]
    #[must_use]
    pub fn is_volumetric(self) -> bool {
        !matches!(self, Self::Surface)
    }
}

/// Channel encoded by a pick draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PickKind {
    Object,
    Instance,
    Group,
}

/// Semantic purpose of a draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderVariant {
    Pick(PickKind),
    Depth,
    ColorBlended,
    ColorWboit,
}

impl RenderVariant {
    #[inline]
    #[must_use]
    pub fn is_pick(self) -> bool {
        matches!(self, Self::Pick(_))
    }
}

/// One linked program per render variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramSet {
    pub pick_object: ProgramId,
    pub pick_instance: ProgramId,
    pub pick_group: ProgramId,
    pub depth: ProgramId,
    pub color_blended: ProgramId,
    pub color_wboit: ProgramId,
}

impl ProgramSet {
    /// Uses `program` for every variant.
    #[must_use]
    pub fn uniform(program: ProgramId) -> Self {
        Self {
            pick_object: program,
            pick_instance: program,
            pick_group: program,
            depth: program,
            color_blended: program,
            color_wboit: program,
        }
    }

    #[must_use]
    pub fn get(&self, variant: RenderVariant) -> ProgramId {
        match variant {
            RenderVariant::Pick(PickKind::Object) => self.pick_object,
            RenderVariant::Pick(PickKind::Instance) => self.pick_instance,
            RenderVariant::Pick(PickKind::Group) => self.pick_group,
            RenderVariant::Depth => self.depth,
            RenderVariant::ColorBlended => self.color_blended,
            RenderVariant::ColorWboit => self.color_wboit,
        }
    }
}

/// A GPU-bindable unit supplied fully formed by the scene graph.
#[derive(Debug, Clone)]
pub struct Drawable {
    pub id: DrawableId,
    pub flags: DrawableFlags,
    pub render_mode: RenderMode,
    pub alpha: f32,
    /// Multiplier applied to `alpha` (e.g. for fading).
    pub alpha_factor: f32,
    /// Mean per-instance transparency in `[0, 1]`.
    pub transparency_average: f32,
    pub instance_count: u32,
    pub geometry: GeometryId,
    pub programs: ProgramSet,
}

impl Drawable {
    /// Visible, pickable, opaque, depth-writing surface with one instance.
    #[must_use]
    pub fn new(id: DrawableId, geometry: GeometryId, programs: ProgramSet) -> Self {
        Self {
            id,
            flags: DrawableFlags::VISIBLE
                | DrawableFlags::PICKABLE
                | DrawableFlags::OPAQUE
                | DrawableFlags::WRITE_DEPTH,
            render_mode: RenderMode::Surface,
            alpha: 1.0,
            alpha_factor: 1.0,
            transparency_average: 0.0,
            instance_count: 1,
            geometry,
            programs,
        }
    }

    /// Sets `alpha` and keeps the `OPAQUE` flag consistent with it.
    #[must_use]
    pub fn with_alpha(mut self, alpha: f32) -> Self {
        self.alpha = alpha;
        self.flags.set(
            DrawableFlags::OPAQUE,
            alpha >= 1.0 && self.transparency_average == 0.0,
        );
        self
    }

    #[must_use]
    pub fn with_flags(mut self, flags: DrawableFlags) -> Self {
        self.flags |= flags;
        self
    }

    #[must_use]
    pub fn without_flags(mut self, flags: DrawableFlags) -> Self {
        self.flags -= flags;
        self
    }

    #[must_use]
    pub fn with_render_mode(mut self, mode: RenderMode) -> Self {
        self.render_mode = mode;
        self
    }

    #[must_use]
    pub fn with_instance_count(mut self, count: u32) -> Self {
        self.instance_count = count;
        self
    }

    #[must_use]
    pub fn with_transparency_average(mut self, average: f32) -> Self {
        self.transparency_average = average;
        if average > 0.0 {
            self.flags.remove(DrawableFlags::OPAQUE);
        }
        self
    }

    #[inline]
    #[must_use]
    pub fn has(&self, flags: DrawableFlags) -> bool {
        self.flags.contains(flags)
    }

    #[inline]
    #[must_use]
    pub fn is_volumetric(&self) -> bool {
        self.render_mode.is_volumetric()
    }

    /// `alpha * alpha_factor` clamped to `[0, 1]`.
    #[inline]
    #[must_use]
    pub fn effective_alpha(&self) -> f32 {
        (self.alpha * self.alpha_factor).clamp(0.0, 1.0)
    }
}

/// Ordered drawables sharing a model transform.
#[derive(Debug, Clone)]
pub struct Group {
    pub drawables: Vec<Drawable>,
    pub transform: Mat4,
}

impl Default for Group {
    fn default() -> Self {
        Self {
            drawables: Vec::new(),
            transform: Mat4::IDENTITY,
        }
    }
}

impl Group {
    #[must_use]
    pub fn new(drawables: Vec<Drawable>) -> Self {
        Self {
            drawables,
            transform: Mat4::IDENTITY,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.drawables.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Drawable> {
        self.drawables.iter()
    }
}

/// The two groups rendered each frame.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    pub primitives: Group,
    pub volumes: Group,
}
