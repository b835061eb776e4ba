//! Per-draw fixed-function state.
//!
//! The renderer never trusts state left behind by a previous draw: every
//! draw's state is derived from the pass's base state and the drawable alone.
//!
//! | Drawable                            | Cull        | Front face | Depth (color-blended only)       |
//! |-------------------------------------|-------------|------------|----------------------------------|
//! | volumetric, pure volume             | none        | CCW        | test off, write off              |
//! | volumetric, no fragment depth       | none        | CCW        | test off, write off              |
//! | volumetric, other                   | none        | CCW        | test on, write iff alpha == 1    |
//! | double-sided or reflective          | none        | CCW / CW¹  | base                             |
//! | other                               | back / front¹ | CCW / CW¹ | base                            |
//!
//! ¹ flip-sided drawables swap the front face and the culled face.

use crate::device::{DeviceCapabilities, Face, FrontFace, PipelineState};
use crate::scene::{Drawable, DrawableFlags, RenderMode, RenderVariant};

/// State for drawing `drawable` with `variant` on top of the pass state `base`.
#[must_use]
pub fn draw_state(
    base: PipelineState,
    drawable: &Drawable,
    variant: RenderVariant,
    caps: &DeviceCapabilities,
) -> PipelineState {
    let mut state = base;

    if drawable.is_volumetric() {
        state.cull = None;
        state.front_face = FrontFace::Ccw;
        if variant == RenderVariant::ColorBlended {
            if drawable.render_mode == RenderMode::Volume || !caps.frag_depth {
                state.depth_test = false;
                state.depth_write = false;
            } else {
                state.depth_test = true;
                state.depth_write = drawable.effective_alpha() == 1.0;
            }
        }
        return state;
    }

    let culls = !drawable.has(DrawableFlags::DOUBLE_SIDED)
        && !drawable.has(DrawableFlags::HAS_REFLECTION);
    if drawable.has(DrawableFlags::FLIP_SIDED) {
        state.front_face = FrontFace::Cw;
        state.cull = culls.then_some(Face::Front);
    } else {
        state.front_face = FrontFace::Ccw;
        state.cull = culls.then_some(Face::Back);
    }
    state
}
