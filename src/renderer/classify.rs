//! Routing of drawables to the phases of the weighted-blended path.

use crate::scene::{Drawable, DrawableFlags};

/// Drawn by `render_wboit_opaque`.
///
/// Background-override drawables are left to the transparent phase so that
/// no drawable is drawn by both phases.
#[must_use]
pub fn is_wboit_opaque(drawable: &Drawable) -> bool {
    drawable.effective_alpha() == 1.0
        && drawable.transparency_average == 0.0
        && !drawable.is_volumetric()
        && !drawable.has(DrawableFlags::CIRCLE_POINTS)
        && !drawable.has(DrawableFlags::XRAY_SHADED)
        && !drawable.has(DrawableFlags::BACKGROUND_OVERRIDE)
}

/// Drawn by `render_wboit_transparent`. Volumetric drawables always are.
#[must_use]
pub fn is_wboit_transparent(drawable: &Drawable) -> bool {
    drawable.effective_alpha() < 1.0
        || drawable.transparency_average > 0.0
        || drawable.is_volumetric()
        || drawable.has(DrawableFlags::CIRCLE_POINTS)
        || drawable.has(DrawableFlags::BACKGROUND_OVERRIDE)
        || drawable.has(DrawableFlags::XRAY_SHADED)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{GeometryId, ProgramId};
    use crate::scene::{DrawableId, ProgramSet, RenderMode};
    use slotmap::KeyData;

    fn drawable() -> Drawable {
        Drawable::new(
            DrawableId(1),
            GeometryId::from(KeyData::from_ffi(1)),
            ProgramSet::uniform(ProgramId::from(KeyData::from_ffi(1))),
        )
    }

    #[test]
    fn plain_opaque_surface() {
        let d = drawable();
        assert!(is_wboit_opaque(&d));
        assert!(!is_wboit_transparent(&d));
    }

    #[test]
    fn volumes_are_transparent_at_full_alpha() {
        for mode in [RenderMode::Isosurface, RenderMode::Volume] {
            let d = drawable().with_render_mode(mode);
            assert_eq!(d.effective_alpha(), 1.0);
            assert!(is_wboit_transparent(&d));
            assert!(!is_wboit_opaque(&d));
        }
    }

    #[test]
    fn predicates_are_exclusive() {
        let flag_sets = [
            DrawableFlags::empty(),
            DrawableFlags::CIRCLE_POINTS,
            DrawableFlags::XRAY_SHADED,
            DrawableFlags::BACKGROUND_OVERRIDE,
            DrawableFlags::CIRCLE_POINTS | DrawableFlags::BACKGROUND_OVERRIDE,
        ];
        for alpha in [0.0, 0.25, 0.999, 1.0, 1.5] {
            for factor in [0.5, 1.0, 2.0] {
                for average in [0.0, 0.3] {
                    for mode in [RenderMode::Surface, RenderMode::Isosurface, RenderMode::Volume] {
                        for flags in flag_sets {
                            let mut d = drawable()
                                .with_alpha(alpha)
                                .with_render_mode(mode)
                                .with_transparency_average(average)
                                .with_flags(flags);
                            d.alpha_factor = factor;
                            assert!(
                                !(is_wboit_opaque(&d) && is_wboit_transparent(&d)),
                                "alpha {alpha} factor {factor} average {average} {mode:?} {flags:?}"
                            );
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn background_override_goes_to_transparent_phase() {
        let d = drawable().with_flags(DrawableFlags::BACKGROUND_OVERRIDE);
        assert!(is_wboit_transparent(&d));
        assert!(!is_wboit_opaque(&d));
    }

    #[test]
    fn every_visible_drawable_lands_in_one_phase() {
        let d = drawable().with_alpha(0.4);
        assert!(is_wboit_opaque(&d) != is_wboit_transparent(&d));
        let d = drawable().with_flags(DrawableFlags::XRAY_SHADED);
        assert!(is_wboit_opaque(&d) != is_wboit_transparent(&d));
    }
}
