//! Command stream replay.

use bytemuck::{Pod, Zeroable};
use glam::{UVec2, Vec4};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use super::pass::{BindingId, PixelRect, TrackedRenderPass};
use super::WgpuDevice;
use super::pipeline::{
    AttachmentFormats, DEPTH_FORMAT, PipelineKey, blend_state, color_targets, depth_stencil,
    primitive_state, quad_entry_point,
};
use crate::device::{
    ClearOp, DeviceCommand, DrawCall, Framebuffer, FullscreenQuad, PipelineState, ProgramId,
    QuadProgram, TextureId, Viewport,
};
use crate::errors::{LuminaError, Result};
use crate::renderer::clip::ClipDefines;
use crate::renderer::uniforms::GlobalUniforms;

/// Parameters of a built-in full-screen draw.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct QuadParams {
    pub tex_size: Vec4,
    pub clear_color: Vec4,
    /// x: clear depth
    pub clear_depth: Vec4,
}

impl QuadParams {
    fn for_command(command: &DeviceCommand) -> Option<Self> {
        match command {
            DeviceCommand::Clear(op) => Some(Self {
                tex_size: Vec4::ZERO,
                clear_color: op.color.unwrap_or(Vec4::ZERO),
                clear_depth: Vec4::splat(op.depth.unwrap_or(1.0)),
            }),
            DeviceCommand::DrawQuad(quad) => Some(Self {
                tex_size: quad.tex_size.as_vec2().extend(0.0).extend(0.0),
                ..Self::zeroed()
            }),
            _ => None,
        }
    }
}

/// Converts a bottom-left origin viewport into a framebuffer rectangle,
/// clamped to the framebuffer. `None` when nothing remains.
pub(super) fn viewport_rect(viewport: Viewport, size: UVec2) -> Option<PixelRect> {
    let width = i64::from(size.x);
    let height = i64::from(size.y);
    let x0 = i64::from(viewport.x).clamp(0, width);
    let x1 = (i64::from(viewport.x) + i64::from(viewport.width)).clamp(0, width);
    let bottom = i64::from(viewport.y).clamp(0, height);
    let top = (i64::from(viewport.y) + i64::from(viewport.height)).clamp(0, height);
    if x1 <= x0 || top <= bottom {
        return None;
    }
    Some(PixelRect {
        x: x0 as u32,
        y: (height - top) as u32,
        width: (x1 - x0) as u32,
        height: (top - bottom) as u32,
    })
}

fn full_rect(size: UVec2) -> PixelRect {
    PixelRect {
        x: 0,
        y: 0,
        width: size.x,
        height: size.y,
    }
}

/// Error for a framebuffer whose attachments cannot be resolved.
fn unavailable(framebuffer: Framebuffer) -> LuminaError {
    match framebuffer {
        Framebuffer::DrawingBuffer => LuminaError::DrawingBufferUnavailable,
        Framebuffer::Target(_) => LuminaError::UnknownTarget,
    }
}

fn wgpu_color(color: Vec4) -> wgpu::Color {
    wgpu::Color {
        r: f64::from(color.x),
        g: f64::from(color.y),
        b: f64::from(color.z),
        a: f64::from(color.w),
    }
}

/// Resolved attachments of the bound framebuffer.
struct Bound {
    colors: SmallVec<[wgpu::TextureView; 2]>,
    depth: Option<wgpu::TextureView>,
    formats: AttachmentFormats,
    size: UVec2,
}

struct Replay {
    encoder: wgpu::CommandEncoder,
    framebuffer: Option<Framebuffer>,
    bound: Option<Bound>,
    pass: Option<TrackedRenderPass>,
    state: PipelineState,
    program_slots: FxHashMap<ProgramId, u32>,
    next_params: u32,
}

impl Replay {
    fn end_pass(&mut self) {
        self.pass = None;
        self.bound = None;
    }
}

impl WgpuDevice {
    /// Records `commands` into one encoder and submits it.
    ///
    /// A command that cannot be executed is skipped and the rest of the frame
    /// is still submitted; the first failure is returned.
    pub(super) fn replay(&mut self, commands: &[DeviceCommand], globals: &[GlobalUniforms]) -> Result<()> {
        self.globals_ring.write(
            &self.device,
            &self.queue,
            &self.layouts.globals,
            globals.iter().map(bytemuck::bytes_of),
        );
        let params: Vec<QuadParams> = commands.iter().filter_map(QuadParams::for_command).collect();
        self.params_ring.write(
            &self.device,
            &self.queue,
            &self.layouts.quad_params,
            params.iter().map(bytemuck::bytes_of),
        );

        let mut replay = Replay {
            encoder: self
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("Lumina Frame"),
                }),
            framebuffer: None,
            bound: None,
            pass: None,
            state: PipelineState::default(),
            program_slots: FxHashMap::default(),
            next_params: 0,
        };

        let mut first_error = None;
        for command in commands {
            let result = match command {
                DeviceCommand::BindFramebuffer(framebuffer) => {
                    replay.end_pass();
                    replay.framebuffer = Some(*framebuffer);
                    Ok(())
                }
                DeviceCommand::AttachDepth { target, texture } => {
                    if let Some(t) = self.targets.get_mut(*target) {
                        t.attached_depth = *texture;
                    }
                    if replay.framebuffer == Some(Framebuffer::Target(*target)) {
                        replay.end_pass();
                    }
                    Ok(())
                }
                DeviceCommand::SetViewport(viewport) => {
                    self.viewport = *viewport;
                    if let (Some(pass), Some(bound)) = (replay.pass.as_mut(), replay.bound.as_ref())
                        && let Some(rect) = viewport_rect(*viewport, bound.size)
                    {
                        pass.set_viewport(rect);
                    }
                    Ok(())
                }
                DeviceCommand::SetState(state) => {
                    replay.state = *state;
                    Ok(())
                }
                DeviceCommand::Clear(op) => {
                    let slot = replay.next_params;
                    replay.next_params += 1;
                    self.replay_clear(&mut replay, *op, slot)
                }
                DeviceCommand::UseProgram(_) | DeviceCommand::Flush => Ok(()),
                DeviceCommand::UploadGlobals { program, slot } => {
                    replay.program_slots.insert(*program, *slot);
                    Ok(())
                }
                DeviceCommand::Relink { drawable, defines } => {
                    self.drawable_defines.insert(*drawable, *defines);
                    Ok(())
                }
                DeviceCommand::Draw(call) => self.replay_draw(&mut replay, call),
                DeviceCommand::DrawQuad(quad) => {
                    let slot = replay.next_params;
                    replay.next_params += 1;
                    self.replay_quad(&mut replay, quad, slot)
                }
            };
            if let Err(error) = result {
                log::error!("WgpuDevice: skipped {command:?}: {error}");
                first_error.get_or_insert(error);
            }
        }

        replay.end_pass();
        self.queue.submit(std::iter::once(replay.encoder.finish()));
        first_error.map_or(Ok(()), Err)
    }

    fn resolve_framebuffer(&self, framebuffer: Framebuffer) -> Option<Bound> {
        match framebuffer {
            Framebuffer::DrawingBuffer => {
                let buffer = self.drawing_buffer.as_ref()?;
                let depth = self.drawing_depth.as_ref()?;
                Some(Bound {
                    colors: smallvec::smallvec![buffer.view.clone()],
                    depth: Some(depth.view.clone()),
                    formats: AttachmentFormats {
                        colors: smallvec::smallvec![buffer.format],
                        depth: Some(DEPTH_FORMAT),
                    },
                    size: depth.size,
                })
            }
            Framebuffer::Target(id) => {
                let target = self.targets.get(id)?;
                let mut colors = SmallVec::new();
                let mut formats = SmallVec::new();
                let mut size = None;
                for &color in &target.colors {
                    let texture = self.textures.get(color)?;
                    let storage = texture.storage.as_ref()?;
                    colors.push(storage.view.clone());
                    formats.push(texture.format);
                    size = Some(storage.size);
                }
                let depth = target
                    .attached_depth
                    .or(target.own_depth)
                    .and_then(|d| self.textures.get(d))
                    .and_then(|t| t.storage.as_ref())
                    .map(|s| s.view.clone());
                Some(Bound {
                    formats: AttachmentFormats {
                        colors: formats,
                        depth: depth.as_ref().map(|_| DEPTH_FORMAT),
                    },
                    colors,
                    depth,
                    size: size?,
                })
            }
        }
    }

    /// Begins a pass on the bound framebuffer, clearing the buffers in
    /// `clear` and loading the others.
    fn begin_pass(&self, replay: &mut Replay, clear: ClearOp) -> Result<()> {
        replay.end_pass();
        let framebuffer = replay.framebuffer.ok_or(LuminaError::NoFramebufferBound)?;
        let bound = self
            .resolve_framebuffer(framebuffer)
            .ok_or_else(|| unavailable(framebuffer))?;

        let color_load = clear
            .color
            .map_or(wgpu::LoadOp::Load, |c| wgpu::LoadOp::Clear(wgpu_color(c)));
        let depth_load = clear.depth.map_or(wgpu::LoadOp::Load, wgpu::LoadOp::Clear);

        let pass = {
            let color_attachments: SmallVec<[Option<wgpu::RenderPassColorAttachment>; 2]> = bound
                .colors
                .iter()
                .map(|view| {
                    Some(wgpu::RenderPassColorAttachment {
                        view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: color_load,
                            store: wgpu::StoreOp::Store,
                        },
                        depth_slice: None,
                    })
                })
                .collect();
            let depth_stencil_attachment =
                bound
                    .depth
                    .as_ref()
                    .map(|view| wgpu::RenderPassDepthStencilAttachment {
                        view,
                        depth_ops: Some(wgpu::Operations {
                            load: depth_load,
                            store: wgpu::StoreOp::Store,
                        }),
                        stencil_ops: None,
                    });
            replay
                .encoder
                .begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("Lumina Pass"),
                    color_attachments: &color_attachments,
                    depth_stencil_attachment,
                    timestamp_writes: None,
                    occlusion_query_set: None,
                    multiview_mask: None,
                })
                .forget_lifetime()
        };

        let mut pass = TrackedRenderPass::new(pass);
        pass.set_scissor(full_rect(bound.size));
        if let Some(rect) = viewport_rect(self.viewport, bound.size) {
            pass.set_viewport(rect);
        }
        replay.pass = Some(pass);
        replay.bound = Some(bound);
        Ok(())
    }

    fn ensure_pass(&self, replay: &mut Replay) -> Result<()> {
        if replay.pass.is_none() {
            self.begin_pass(replay, ClearOp::default())?;
        }
        Ok(())
    }

    fn replay_clear(&mut self, replay: &mut Replay, op: ClearOp, slot: u32) -> Result<()> {
        let framebuffer = replay.framebuffer.ok_or(LuminaError::NoFramebufferBound)?;
        let size = match replay.bound.as_ref() {
            Some(bound) => bound.size,
            None => {
                self.resolve_framebuffer(framebuffer)
                    .ok_or_else(|| unavailable(framebuffer))?
                    .size
            }
        };
        let Some(rect) = viewport_rect(self.viewport, size) else {
            return Ok(());
        };

        if rect == full_rect(size) {
            return self.begin_pass(replay, op);
        }

        self.ensure_pass(replay)?;
        let (Some(pass), Some(bound)) = (replay.pass.as_mut(), replay.bound.as_ref()) else {
            return Ok(());
        };
        let color = op.color.is_some();
        let depth = op.depth.is_some() && bound.depth.is_some();
        let key = PipelineKey::Clear {
            color,
            depth,
            targets: bound.formats.clone(),
        };
        let id = match self.pipelines.lookup(&key) {
            Some(id) => id,
            None => {
                let pipeline = self.create_clear_pipeline(color, depth, &bound.formats);
                self.pipelines.insert(key, pipeline)
            }
        };

        pass.set_pipeline(id, self.pipelines.get(id));
        pass.set_bind_group(
            0,
            BindingId::QuadParams,
            self.params_ring.bind_group(),
            Some(self.params_ring.offset(slot)),
        );
        pass.set_scissor(rect);
        pass.draw(0..3, 0..1);
        pass.set_scissor(full_rect(bound.size));
        Ok(())
    }

    fn replay_draw(&mut self, replay: &mut Replay, call: &DrawCall) -> Result<()> {
        if !self.programs.contains_key(call.program) {
            return Err(LuminaError::UnknownProgram);
        }
        if !self.geometries.contains_key(call.geometry) {
            return Err(LuminaError::UnknownGeometry);
        }
        let &slot = replay
            .program_slots
            .get(&call.program)
            .ok_or(LuminaError::MissingGlobals)?;
        let (depth_id, depth_group) = self.depth_bind_group(call.depth_texture);
        self.ensure_pass(replay)?;
        let (Some(pass), Some(bound)) = (replay.pass.as_mut(), replay.bound.as_ref()) else {
            return Ok(());
        };
        if viewport_rect(self.viewport, bound.size).is_none() {
            return Ok(());
        }

        let defines = self
            .drawable_defines
            .get(&call.drawable)
            .copied()
            .unwrap_or(ClipDefines::NONE);
        let key = PipelineKey::Scene {
            program: call.program,
            state: replay.state,
            defines,
            targets: bound.formats.clone(),
        };
        let id = match self.pipelines.lookup(&key) {
            Some(id) => id,
            None => {
                let pipeline = self
                    .create_scene_pipeline(call.program, &replay.state, defines, &bound.formats)
                    .ok_or(LuminaError::UnknownProgram)?;
                self.pipelines.insert(key, pipeline)
            }
        };

        let program = self.programs.get(call.program).ok_or(LuminaError::UnknownProgram)?;
        let geometry = self
            .geometries
            .get(call.geometry)
            .ok_or(LuminaError::UnknownGeometry)?;

        pass.set_pipeline(id, self.pipelines.get(id));
        pass.set_bind_group(
            0,
            BindingId::Globals,
            self.globals_ring.bind_group(),
            Some(self.globals_ring.offset(slot)),
        );
        pass.set_bind_group(1, depth_id, &depth_group, None);
        if program.has_object_group {
            let bind_group = self.object_bind_groups.get(&call.drawable).ok_or(
                LuminaError::MissingObjectBindGroup {
                    program: program.label,
                },
            )?;
            pass.set_bind_group(2, BindingId::Object(call.drawable), bind_group, None);
        }
        pass.set_geometry(
            call.geometry,
            &geometry.vertex_buffers,
            geometry.index.as_ref().map(|i| (&i.buffer, i.format)),
        );
        match &geometry.index {
            Some(index) => pass.draw_indexed(0..index.count, 0..call.instance_count),
            None => pass.draw(0..geometry.vertex_count, 0..call.instance_count),
        }
        Ok(())
    }

    fn replay_quad(&mut self, replay: &mut Replay, quad: &FullscreenQuad, slot: u32) -> Result<()> {
        let &first = quad.inputs.first().ok_or(LuminaError::MissingQuadInputs)?;
        let inputs = (first, quad.inputs.get(1).copied().unwrap_or(first));
        let input_group = self
            .input_bind_group(inputs)
            .ok_or(LuminaError::UnknownTexture)?;
        self.ensure_pass(replay)?;
        let (Some(pass), Some(bound)) = (replay.pass.as_mut(), replay.bound.as_ref()) else {
            return Ok(());
        };

        let key = PipelineKey::Quad {
            program: quad.program,
            state: replay.state,
            targets: bound.formats.clone(),
        };
        let id = match self.pipelines.lookup(&key) {
            Some(id) => id,
            None => {
                let pipeline = self.create_quad_pipeline(quad.program, &replay.state, &bound.formats);
                self.pipelines.insert(key, pipeline)
            }
        };

        pass.set_pipeline(id, self.pipelines.get(id));
        pass.set_bind_group(
            0,
            BindingId::QuadParams,
            self.params_ring.bind_group(),
            Some(self.params_ring.offset(slot)),
        );
        pass.set_bind_group(1, BindingId::QuadInputs(inputs.0, inputs.1), &input_group, None);
        pass.draw(0..3, 0..1);
        Ok(())
    }

    // ========================================================================
    // Bind Groups
    // ========================================================================

    fn texture_view(&self, texture: TextureId) -> Option<&wgpu::TextureView> {
        self.textures
            .get(texture)
            .and_then(|t| t.storage.as_ref())
            .map(|s| &s.view)
    }

    fn depth_bind_group(&mut self, texture: Option<TextureId>) -> (BindingId, wgpu::BindGroup) {
        let Some(texture) = texture else {
            return (BindingId::Depth(None), self.builtin.null_depth.clone());
        };
        if let Some(group) = self.depth_bind_groups.get(&texture) {
            return (BindingId::Depth(Some(texture)), group.clone());
        }
        let Some(view) = self.texture_view(texture) else {
            return (BindingId::Depth(None), self.builtin.null_depth.clone());
        };
        let group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Depth Texture Bind Group"),
            layout: &self.layouts.depth,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(view),
            }],
        });
        self.depth_bind_groups.insert(texture, group.clone());
        (BindingId::Depth(Some(texture)), group)
    }

    fn input_bind_group(&mut self, inputs: (TextureId, TextureId)) -> Option<wgpu::BindGroup> {
        if let Some(group) = self.input_bind_groups.get(&inputs) {
            return Some(group.clone());
        }
        let group = {
            let first = self.texture_view(inputs.0)?;
            let second = self.texture_view(inputs.1)?;
            self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Quad Inputs Bind Group"),
                layout: &self.layouts.quad_inputs,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(first),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(second),
                    },
                ],
            })
        };
        self.input_bind_groups.insert(inputs, group.clone());
        Some(group)
    }

    // ========================================================================
    // Pipelines
    // ========================================================================

    fn create_scene_pipeline(
        &self,
        program: ProgramId,
        state: &PipelineState,
        defines: ClipDefines,
        targets: &AttachmentFormats,
    ) -> Option<wgpu::RenderPipeline> {
        let program = self.programs.get(program)?;
        log::debug!(
            "WgpuDevice: building pipeline for '{}' ({state:?}, {defines:?})",
            program.label
        );

        let constants = [
            ("CLIP_OBJECT_COUNT", f64::from(defines.object_count)),
            ("CLIP_VARIANT", f64::from(defines.variant.id())),
        ];
        let vertex_buffers: Vec<_> = program
            .vertex_buffers
            .iter()
            .map(super::VertexBufferDesc::as_wgpu)
            .collect();
        let color_targets = color_targets(targets, blend_state(state.blend), wgpu::ColorWrites::ALL);

        Some(self.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(program.label),
            layout: Some(&program.layout),
            vertex: wgpu::VertexState {
                module: &program.module,
                entry_point: Some("vs_main"),
                buffers: &vertex_buffers,
                compilation_options: wgpu::PipelineCompilationOptions {
                    constants: &constants,
                    ..Default::default()
                },
            },
            fragment: Some(wgpu::FragmentState {
                module: &program.module,
                entry_point: Some("fs_main"),
                targets: &color_targets,
                compilation_options: wgpu::PipelineCompilationOptions {
                    constants: &constants,
                    ..Default::default()
                },
            }),
            primitive: primitive_state(state),
            depth_stencil: depth_stencil(state, targets.depth),
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        }))
    }

    fn create_quad_pipeline(
        &self,
        program: QuadProgram,
        state: &PipelineState,
        targets: &AttachmentFormats,
    ) -> wgpu::RenderPipeline {
        let entry_point = quad_entry_point(program);
        let color_targets = color_targets(targets, blend_state(state.blend), wgpu::ColorWrites::ALL);

        self.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(entry_point),
            layout: Some(&self.builtin.quad_layout),
            vertex: wgpu::VertexState {
                module: &self.builtin.module,
                entry_point: Some("vs_main"),
                buffers: &[],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &self.builtin.module,
                entry_point: Some(entry_point),
                targets: &color_targets,
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: primitive_state(state),
            depth_stencil: depth_stencil(state, targets.depth),
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        })
    }

    fn create_clear_pipeline(
        &self,
        color: bool,
        depth: bool,
        targets: &AttachmentFormats,
    ) -> wgpu::RenderPipeline {
        let write_mask = if color {
            wgpu::ColorWrites::ALL
        } else {
            wgpu::ColorWrites::empty()
        };
        let color_targets = color_targets(targets, None, write_mask);
        let depth_stencil = targets.depth.map(|format| wgpu::DepthStencilState {
            format,
            depth_write_enabled: Some(depth),
            depth_compare: Some(wgpu::CompareFunction::Always),
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        });

        self.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Scissored Clear"),
            layout: Some(&self.builtin.clear_layout),
            vertex: wgpu::VertexState {
                module: &self.builtin.module,
                entry_point: Some("vs_clear"),
                buffers: &[],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &self.builtin.module,
                entry_point: Some("fs_clear"),
                targets: &color_targets,
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        })
    }
}
