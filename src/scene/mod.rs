//! Scene inputs consumed by the draw pipeline.
//!
//! The scene graph that produces these values is external; everything here is
//! plain data that the renderer reads each frame:
//!
//! - [`Drawable`] and [`Group`]: what gets drawn
//! - [`Camera`] / [`CameraView`]: from where
//! - [`HelperOverlay`]: debug, handle and camera-gizmo overlays

mod camera;
mod drawable;
mod helper;

pub use camera::{Camera, CameraView};
pub use drawable::{
    Drawable, DrawableFlags, DrawableId, Group, PickKind, ProgramSet, RenderMode, RenderVariant,
    Scene,
};
pub use helper::{CameraHelper, HelperOverlay, HelperScene};
