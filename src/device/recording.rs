//! Headless recording backend.
//!
//! [`RecordingDevice`] issues no GPU work. It keeps every submitted
//! [`DeviceCommand`] in order, tracks the size and attachments of every
//! resource, and maintains the same statistics a real backend would. Frame
//! structure (pass order, state transitions, uniform uploads) can be inspected
//! through [`RecordingDevice::commands`].

use glam::UVec2;
use slotmap::SlotMap;
use smallvec::SmallVec;

use super::stats::FrameCounters;
use super::{
    ClearOp, DeviceCapabilities, DeviceCommand, DeviceStats, DrawCall, Framebuffer,
    FullscreenQuad, GeometryId, GpuDevice, PipelineState, ProgramId, RenderTargetDescriptor,
    TargetId, TextureId, Viewport,
};
use crate::errors::{LuminaError, Result};
use crate::renderer::clip::ClipDefines;
use crate::renderer::uniforms::GlobalUniforms;
use crate::scene::DrawableId;

/// Default limit for simulated allocations, matching common desktop limits.
const DEFAULT_MAX_TEXTURE_DIMENSION: u32 = 8192;

struct RecordedTarget {
    size: UVec2,
    colors: SmallVec<[TextureId; 2]>,
    attached_depth: Option<TextureId>,
}

struct RecordedTexture {
    size: Option<UVec2>,
    owner: Option<TargetId>,
}

struct RecordedProgram {
    #[allow(dead_code)]
    label: &'static str,
}

struct RecordedGeometry {
    attributes: u32,
}

/// Device backend that records commands instead of executing them.
pub struct RecordingDevice {
    caps: DeviceCapabilities,
    max_texture_dimension: u32,

    targets: SlotMap<TargetId, RecordedTarget>,
    textures: SlotMap<TextureId, RecordedTexture>,
    programs: SlotMap<ProgramId, RecordedProgram>,
    geometries: SlotMap<GeometryId, RecordedGeometry>,

    commands: Vec<DeviceCommand>,
    globals: Vec<GlobalUniforms>,
    resource_mutations: u32,

    frame: FrameCounters,
    /// First command failure since the last flush.
    pending_error: Option<LuminaError>,
}

impl Default for RecordingDevice {
    fn default() -> Self {
        Self::new(DeviceCapabilities::default())
    }
}

impl RecordingDevice {
    #[must_use]
    pub fn new(caps: DeviceCapabilities) -> Self {
        Self {
            caps,
            max_texture_dimension: DEFAULT_MAX_TEXTURE_DIMENSION,
            targets: SlotMap::with_key(),
            textures: SlotMap::with_key(),
            programs: SlotMap::with_key(),
            geometries: SlotMap::with_key(),
            commands: Vec::with_capacity(256),
            globals: Vec::new(),
            resource_mutations: 0,
            frame: FrameCounters::default(),
            pending_error: None,
        }
    }

    /// Limits simulated allocations; larger requests fail with
    /// [`LuminaError::TargetAllocation`].
    #[must_use]
    pub fn with_max_texture_dimension(mut self, max: u32) -> Self {
        self.max_texture_dimension = max;
        self
    }

    pub fn set_capabilities(&mut self, caps: DeviceCapabilities) {
        self.caps = caps;
    }

    /// Registers a linked program (normally done by the scene graph).
    pub fn create_program(&mut self, label: &'static str) -> ProgramId {
        self.programs.insert(RecordedProgram { label })
    }

    /// Registers a geometry with `attributes` vertex attributes.
    pub fn create_geometry(&mut self, attributes: u32) -> GeometryId {
        self.geometries.insert(RecordedGeometry { attributes })
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    #[must_use]
    pub fn commands(&self) -> &[DeviceCommand] {
        &self.commands
    }

    /// Drops the recorded command stream and uniform snapshots.
    pub fn clear_commands(&mut self) {
        self.commands.clear();
        self.globals.clear();
    }

    /// Uniform snapshot referenced by an `UploadGlobals` command.
    #[must_use]
    pub fn globals(&self, slot: u32) -> Option<&GlobalUniforms> {
        self.globals.get(slot as usize)
    }

    /// Number of create/resize/define/destroy operations so far.
    #[must_use]
    pub fn resource_mutations(&self) -> u32 {
        self.resource_mutations
    }

    #[must_use]
    pub fn target_size(&self, target: TargetId) -> Option<UVec2> {
        self.targets.get(target).map(|t| t.size)
    }

    #[must_use]
    pub fn attached_depth(&self, target: TargetId) -> Option<TextureId> {
        self.targets.get(target).and_then(|t| t.attached_depth)
    }

    /// Draw calls in submission order.
    pub fn draws(&self) -> impl Iterator<Item = &DrawCall> {
        self.commands.iter().filter_map(|cmd| match cmd {
            DeviceCommand::Draw(call) => Some(call),
            _ => None,
        })
    }

    fn check_size(&self, label: &'static str, width: u32, height: u32) -> Result<()> {
        if width == 0 || height == 0 {
            return Err(LuminaError::InvalidTargetSize { width, height });
        }
        if width > self.max_texture_dimension || height > self.max_texture_dimension {
            return Err(LuminaError::TargetAllocation {
                label,
                width,
                height,
            });
        }
        Ok(())
    }

    fn fail(&mut self, error: LuminaError) {
        log::error!("RecordingDevice: {error}");
        self.pending_error.get_or_insert(error);
    }
}

impl GpuDevice for RecordingDevice {
    fn capabilities(&self) -> DeviceCapabilities {
        self.caps
    }

    fn stats(&self) -> DeviceStats {
        DeviceStats {
            attributes: self.geometries.values().map(|g| g.attributes).sum(),
            framebuffers: self.targets.len() as u32,
            textures: self.textures.len() as u32,
            vertex_arrays: self.geometries.len() as u32,
            ..DeviceStats::resources(self.programs.len())
        }
        .with_frame(self.frame.published())
    }

    fn create_render_target(&mut self, desc: &RenderTargetDescriptor) -> Result<TargetId> {
        self.check_size(desc.label, desc.width, desc.height)?;
        self.resource_mutations += 1;

        let size = UVec2::new(desc.width, desc.height);
        let target = self.targets.insert(RecordedTarget {
            size,
            colors: SmallVec::new(),
            attached_depth: None,
        });
        let colors = desc
            .colors
            .iter()
            .map(|_| {
                self.textures.insert(RecordedTexture {
                    size: Some(size),
                    owner: Some(target),
                })
            })
            .collect();
        if let Some(t) = self.targets.get_mut(target) {
            t.colors = colors;
        }
        Ok(target)
    }

    fn resize_render_target(&mut self, target: TargetId, width: u32, height: u32) -> Result<()> {
        self.check_size("render target", width, height)?;
        let size = UVec2::new(width, height);
        let t = self.targets.get_mut(target).ok_or(LuminaError::UnknownTarget)?;
        t.size = size;
        for &color in &t.colors {
            if let Some(tex) = self.textures.get_mut(color) {
                tex.size = Some(size);
            }
        }
        self.resource_mutations += 1;
        Ok(())
    }

    fn destroy_render_target(&mut self, target: TargetId) {
        if let Some(t) = self.targets.remove(target) {
            for color in t.colors {
                self.textures.remove(color);
            }
            self.resource_mutations += 1;
        }
    }

    fn target_texture(&self, target: TargetId, attachment: usize) -> Result<TextureId> {
        let t = self.targets.get(target).ok_or(LuminaError::UnknownTarget)?;
        t.colors
            .get(attachment)
            .copied()
            .ok_or(LuminaError::UnknownTexture)
    }

    fn create_depth_texture(&mut self, _label: &'static str) -> Result<TextureId> {
        self.resource_mutations += 1;
        Ok(self.textures.insert(RecordedTexture {
            size: None,
            owner: None,
        }))
    }

    fn define_depth_texture(&mut self, texture: TextureId, width: u32, height: u32) -> Result<()> {
        self.check_size("depth texture", width, height)?;
        let tex = self
            .textures
            .get_mut(texture)
            .ok_or(LuminaError::UnknownTexture)?;
        debug_assert!(tex.owner.is_none(), "define on a target attachment");
        tex.size = Some(UVec2::new(width, height));
        self.resource_mutations += 1;
        Ok(())
    }

    fn destroy_texture(&mut self, texture: TextureId) {
        if self.textures.remove(texture).is_some() {
            self.resource_mutations += 1;
        }
    }

    fn texture_size(&self, texture: TextureId) -> Option<UVec2> {
        self.textures.get(texture).and_then(|t| t.size)
    }

    fn attach_depth(&mut self, target: TargetId, texture: Option<TextureId>) {
        if let Some(t) = self.targets.get_mut(target) {
            t.attached_depth = texture;
        }
        self.commands
            .push(DeviceCommand::AttachDepth { target, texture });
    }

    fn bind_framebuffer(&mut self, framebuffer: Framebuffer) {
        self.commands.push(DeviceCommand::BindFramebuffer(framebuffer));
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        self.commands.push(DeviceCommand::SetViewport(viewport));
    }

    fn set_state(&mut self, state: &PipelineState) {
        self.commands.push(DeviceCommand::SetState(*state));
    }

    fn clear(&mut self, op: ClearOp) {
        self.commands.push(DeviceCommand::Clear(op));
    }

    fn use_program(&mut self, program: ProgramId) {
        self.commands.push(DeviceCommand::UseProgram(program));
    }

    fn upload_globals(&mut self, program: ProgramId, globals: &GlobalUniforms) {
        let slot = self.globals.len() as u32;
        self.globals.push(*globals);
        self.commands
            .push(DeviceCommand::UploadGlobals { program, slot });
    }

    fn relink(&mut self, drawable: DrawableId, defines: ClipDefines) {
        self.commands.push(DeviceCommand::Relink { drawable, defines });
    }

    fn draw(&mut self, call: &DrawCall) {
        if !self.programs.contains_key(call.program) {
            self.fail(LuminaError::UnknownProgram);
        } else if !self.geometries.contains_key(call.geometry) {
            self.fail(LuminaError::UnknownGeometry);
        }
        self.frame.record_draw(call.instance_count);
        self.commands.push(DeviceCommand::Draw(*call));
    }

    fn draw_quad(&mut self, quad: &FullscreenQuad) {
        if quad.inputs.is_empty() {
            self.fail(LuminaError::MissingQuadInputs);
        } else if quad.inputs.iter().any(|&t| self.texture_size(t).is_none()) {
            self.fail(LuminaError::UnknownTexture);
        }
        self.frame.record_draw(1);
        self.commands.push(DeviceCommand::DrawQuad(quad.clone()));
    }

    fn flush(&mut self) -> Result<()> {
        self.frame.flush();
        self.commands.push(DeviceCommand::Flush);
        log::trace!(
            "RecordingDevice: flushed, {} draws in frame",
            self.frame.published().draw_count
        );
        match self.pending_error.take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn begin_frame(&mut self) {
        self.frame.begin_frame();
    }

    fn end_frame(&mut self) {
        self.frame.end_frame();
    }
}
