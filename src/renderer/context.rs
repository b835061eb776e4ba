//! Per-pass execution context of the renderer.
//!
//! Holds everything that would otherwise be ambient GPU state: the current
//! viewport, the background mode, the last applied pipeline state and the last
//! bound program. Redundant transitions are filtered here before they reach the
//! device.

use glam::UVec2;
use smallvec::SmallVec;

use crate::device::{
    DeviceCapabilities, GpuDevice, PipelineState, ProgramId, Viewport,
};
use crate::renderer::uniforms::GlobalUniforms;

#[derive(Debug, Clone, Default)]
pub struct PassContext {
    pub(crate) viewport: Option<Viewport>,
    pub(crate) transparent_background: bool,
    pub(crate) drawing_buffer_size: UVec2,
    pub(crate) caps: DeviceCapabilities,

    current_state: Option<PipelineState>,
    current_program: Option<ProgramId>,
    /// Programs whose globals are current for this pass.
    uploaded: SmallVec<[ProgramId; 8]>,
}

impl PassContext {
    #[must_use]
    pub fn viewport(&self) -> Option<Viewport> {
        self.viewport
    }

    #[must_use]
    pub fn transparent_background(&self) -> bool {
        self.transparent_background
    }

    #[must_use]
    pub fn current_program(&self) -> Option<ProgramId> {
        self.current_program
    }

    /// Forgets tracked state at the start of a pass.
    pub(crate) fn begin_pass(&mut self, caps: DeviceCapabilities) {
        self.caps = caps;
        self.current_state = None;
        self.current_program = None;
        self.uploaded.clear();
    }

    pub(crate) fn apply_state(&mut self, device: &mut dyn GpuDevice, state: PipelineState) {
        if self.current_state != Some(state) {
            device.set_state(&state);
            self.current_state = Some(state);
        }
    }

    /// Binds `program`, uploading `globals` the first time it is bound in
    /// this pass.
    pub(crate) fn use_program(
        &mut self,
        device: &mut dyn GpuDevice,
        program: ProgramId,
        globals: &GlobalUniforms,
    ) {
        if self.current_program == Some(program) {
            return;
        }
        device.use_program(program);
        self.current_program = Some(program);
        if !self.uploaded.contains(&program) {
            device.upload_globals(program, globals);
            self.uploaded.push(program);
        }
    }
}
