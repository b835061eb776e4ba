//! Error Types
//!
//! This module defines the error types used throughout the pipeline.
//!
//! # Overview
//!
//! The main error type [`LuminaError`] covers the failure modes of the draw
//! pipeline:
//! - GPU initialization failures
//! - Resource exhaustion (render target / texture allocation)
//! - Misconfiguration (order-independent path without OIT, clip capacity)
//!
//! There are no transient errors: every error surfaces synchronously at the
//! call that triggered it and nothing is retried.
//!
//! # Usage
//!
//! All fallible APIs return [`Result<T>`] which is an alias for
//! `std::result::Result<T, LuminaError>`.
//!
//! ```rust,ignore
//! use lumina::errors::Result;
//!
//! fn resize(pass: &mut DrawPass, device: &mut dyn GpuDevice) -> Result<()> {
//!     pass.set_size(device, 1280, 720)
//! }
//! ```

use thiserror::Error;

/// The main error type for the draw pipeline.
#[derive(Error, Debug)]
pub enum LuminaError {
    // ========================================================================
    // GPU Initialization Errors
    // ========================================================================
    /// Failed to request a compatible GPU adapter.
    #[error("Failed to request WGPU adapter: {0}")]
    AdapterRequestFailed(String),

    /// Failed to create the GPU device.
    #[error("Failed to create WGPU device: {0}")]
    DeviceCreateFailed(#[from] wgpu::RequestDeviceError),

    // ========================================================================
    // Resource Errors
    // ========================================================================
    /// A render target or texture could not be allocated.
    #[error("Failed to allocate {label} ({width}x{height})")]
    TargetAllocation {
        /// Debug label of the resource
        label: &'static str,
        /// Requested width in pixels
        width: u32,
        /// Requested height in pixels
        height: u32,
    },

    /// A render target or texture was requested with a zero dimension.
    #[error("Invalid render target size {width}x{height}")]
    InvalidTargetSize {
        /// Requested width in pixels
        width: u32,
        /// Requested height in pixels
        height: u32,
    },

    /// The render target handle does not belong to this device.
    #[error("Unknown render target")]
    UnknownTarget,

    /// The texture handle does not belong to this device.
    #[error("Unknown texture")]
    UnknownTexture,

    /// The program handle does not belong to this device.
    #[error("Unknown program")]
    UnknownProgram,

    /// The geometry handle does not belong to this device.
    #[error("Unknown geometry")]
    UnknownGeometry,

    /// A frame targeted the drawing buffer but none was provided.
    #[error("Drawing buffer unavailable")]
    DrawingBufferUnavailable,

    // ========================================================================
    // Frame Errors
    // ========================================================================
    /// A clear or draw was issued before any framebuffer was bound.
    #[error("No framebuffer bound")]
    NoFramebufferBound,

    /// A draw was issued with a program whose global uniforms were never
    /// uploaded in this frame.
    #[error("Global uniforms were not uploaded before drawing")]
    MissingGlobals,

    /// The program declares a per-object bind group but the drawable has none.
    #[error("Program '{program}' needs an object bind group")]
    MissingObjectBindGroup {
        /// Label of the program
        program: &'static str,
    },

    /// A full-screen pass was issued without input textures.
    #[error("Full-screen pass without input textures")]
    MissingQuadInputs,

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// The order-independent path was requested on a draw pass built without it.
    #[error("Order-independent transparency was not enabled for this draw pass")]
    OitNotEnabled,

    /// More clip objects were configured than the uniform array can hold.
    #[error("Too many clip objects: {count} (max {max})")]
    TooManyClipObjects {
        /// Number of configured clip objects
        count: usize,
        /// Capacity of the clip object array
        max: usize,
    },
}

/// Alias for `Result<T, LuminaError>`.
pub type Result<T> = std::result::Result<T, LuminaError>;
