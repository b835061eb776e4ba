#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

//! Multi-pass GPU draw pipeline.
//!
//! A [`DrawPass`] turns a [`Scene`] into pixels through a [`Renderer`] and a
//! [`GpuDevice`]: opaque and transparent phases with either plain blending or
//! weighted-blended order-independent transparency, depth capture and merge
//! for volumes, picking, stereo and helper overlays.

pub mod device;
pub mod errors;
pub mod passes;
pub mod renderer;
pub mod scene;

pub use device::{DeviceCapabilities, DeviceStats, GpuDevice, RecordingDevice, WgpuDevice};
pub use errors::{LuminaError, Result};
pub use passes::{DrawPass, OrderIndependentTransparency, WboitPass};
pub use renderer::{
    LightingStyle, Renderer, RendererProps, RendererPropsUpdate, RendererSettings,
    TransparencyPath,
};
pub use scene::{Camera, CameraView, Drawable, DrawableFlags, Group, HelperOverlay, Scene};
