//! wgpu backend.
//!
//! [`WgpuDevice`] records the immediate-mode command stream of [`GpuDevice`]
//! and replays it into wgpu render passes on [`GpuDevice::flush`]:
//!
//! - binding a framebuffer or changing the depth attachment of the bound
//!   target ends the current render pass; the next draw begins a new one
//!   that loads the previous contents
//! - a clear covering the whole framebuffer begins a pass with clear load
//!   ops; a clear of a partial viewport is a scissored full-screen draw
//! - fixed-function state, program and clip defines select a cached
//!   pipeline at draw time
//! - global uniform snapshots are uploaded once per flush into a
//!   dynamic-offset ring
//!
//! A command that cannot be replayed (unknown program or geometry, missing
//! uniforms or bind groups, no framebuffer) is left out of the submitted
//! frame and the first such failure is returned by `flush`.
//!
//! Viewports use the bottom-left origin of [`Viewport`] and are flipped to
//! wgpu's top-left origin during replay. The viewport persists across passes
//! and flushes.
//!
//! # Programs
//!
//! Scene programs are WGSL modules registered with
//! [`WgpuDevice::register_program`]. They must provide `vs_main` and
//! `fs_main`, declare `override CLIP_OBJECT_COUNT: u32;` and
//! `override CLIP_VARIANT: u32;`, and bind:
//!
//! | Group | Binding                                                       |
//! |-------|---------------------------------------------------------------|
//! | 0     | `var<uniform>` global uniforms (dynamic offset)               |
//! | 1     | `texture_2d<f32>` depth texture, read with `textureLoad`      |
//! | 2     | Optional per-drawable bind group (`object_layout`)            |

mod pass;
mod pipeline;
mod replay;
mod ring;

use std::borrow::Cow;

use glam::UVec2;
use rustc_hash::FxHashMap;
use slotmap::SlotMap;
use smallvec::SmallVec;

use super::stats::FrameCounters;
use super::{
    ClearOp, ColorFormat, DeviceCapabilities, DeviceCommand, DeviceStats, DrawCall, Framebuffer,
    FullscreenQuad, GeometryId, GpuDevice, PipelineState, ProgramId, RenderTargetDescriptor,
    TargetId, TextureId, Viewport,
};
use crate::errors::{LuminaError, Result};
use crate::renderer::RendererSettings;
use crate::renderer::clip::ClipDefines;
use crate::renderer::uniforms::{GLOBAL_UNIFORMS_SIZE, GlobalUniforms};
use crate::scene::DrawableId;

use self::pipeline::{DEPTH_FORMAT, PipelineCache};
use self::replay::QuadParams;
use self::ring::UniformRing;

// ============================================================================
// Registration Descriptors
// ============================================================================

/// Owned `wgpu::VertexBufferLayout`.
#[derive(Debug, Clone)]
pub struct VertexBufferDesc {
    pub array_stride: u64,
    pub step_mode: wgpu::VertexStepMode,
    pub attributes: Vec<wgpu::VertexAttribute>,
}

impl VertexBufferDesc {
    #[must_use]
    pub fn as_wgpu(&self) -> wgpu::VertexBufferLayout<'_> {
        wgpu::VertexBufferLayout {
            array_stride: self.array_stride,
            step_mode: self.step_mode,
            attributes: &self.attributes,
        }
    }
}

/// Scene program registered by the scene graph.
pub struct ProgramDescriptor<'a> {
    pub label: &'static str,
    /// WGSL source with `vs_main` and `fs_main` entry points.
    pub source: &'a str,
    pub vertex_buffers: Vec<VertexBufferDesc>,
    /// Layout of the per-drawable bind group at group 2, if any.
    pub object_layout: Option<wgpu::BindGroupLayout>,
}

#[derive(Debug, Clone)]
pub struct IndexBuffer {
    pub buffer: wgpu::Buffer,
    pub format: wgpu::IndexFormat,
    pub count: u32,
}

/// Vertex data registered by the scene graph.
#[derive(Debug, Clone)]
pub struct GeometryDescriptor {
    /// Bound to vertex buffer slots in order.
    pub vertex_buffers: Vec<wgpu::Buffer>,
    pub index: Option<IndexBuffer>,
    /// Vertex count of non-indexed geometry.
    pub vertex_count: u32,
    /// Number of vertex attributes, for statistics.
    pub attributes: u32,
}

// ============================================================================
// Resources
// ============================================================================

struct TextureStorage {
    view: wgpu::TextureView,
    size: UVec2,
}

struct GpuTexture {
    label: &'static str,
    format: wgpu::TextureFormat,
    /// `None` until a standalone depth texture is defined.
    storage: Option<TextureStorage>,
}

struct GpuTarget {
    colors: SmallVec<[TextureId; 2]>,
    own_depth: Option<TextureId>,
    attached_depth: Option<TextureId>,
}

struct GpuProgram {
    label: &'static str,
    module: wgpu::ShaderModule,
    layout: wgpu::PipelineLayout,
    vertex_buffers: Vec<VertexBufferDesc>,
    has_object_group: bool,
}

struct DrawingBuffer {
    view: wgpu::TextureView,
    format: wgpu::TextureFormat,
}

struct Layouts {
    globals: wgpu::BindGroupLayout,
    depth: wgpu::BindGroupLayout,
    quad_params: wgpu::BindGroupLayout,
    quad_inputs: wgpu::BindGroupLayout,
}

struct BuiltinPrograms {
    module: wgpu::ShaderModule,
    quad_layout: wgpu::PipelineLayout,
    clear_layout: wgpu::PipelineLayout,
    null_depth: wgpu::BindGroup,
}

fn wgpu_format(format: ColorFormat) -> wgpu::TextureFormat {
    match format {
        ColorFormat::Rgba8 => wgpu::TextureFormat::Rgba8Unorm,
        ColorFormat::Rgba16Float => wgpu::TextureFormat::Rgba16Float,
        ColorFormat::R16Float => wgpu::TextureFormat::R16Float,
    }
}

fn unfilterable_texture_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: false },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

// ============================================================================
// Device
// ============================================================================

/// [`GpuDevice`] backed by a `wgpu::Device`.
pub struct WgpuDevice {
    device: wgpu::Device,
    queue: wgpu::Queue,
    caps: DeviceCapabilities,
    max_texture_dimension: u32,

    layouts: Layouts,
    builtin: BuiltinPrograms,
    pipelines: PipelineCache,
    globals_ring: UniformRing,
    params_ring: UniformRing,

    targets: SlotMap<TargetId, GpuTarget>,
    textures: SlotMap<TextureId, GpuTexture>,
    programs: SlotMap<ProgramId, GpuProgram>,
    geometries: SlotMap<GeometryId, GeometryDescriptor>,

    object_bind_groups: FxHashMap<DrawableId, wgpu::BindGroup>,
    drawable_defines: FxHashMap<DrawableId, ClipDefines>,
    depth_bind_groups: FxHashMap<TextureId, wgpu::BindGroup>,
    input_bind_groups: FxHashMap<(TextureId, TextureId), wgpu::BindGroup>,

    drawing_buffer: Option<DrawingBuffer>,
    drawing_depth: Option<TextureStorage>,
    viewport: Viewport,

    commands: Vec<DeviceCommand>,
    globals: Vec<GlobalUniforms>,
    frame: FrameCounters,
}

impl WgpuDevice {
    /// Requests an adapter and a device according to `settings`.
    pub async fn request(settings: &RendererSettings) -> Result<Self> {
        let instance = match settings.backends {
            Some(backends) => wgpu::Instance::new(wgpu::InstanceDescriptor {
                backends,
                ..wgpu::InstanceDescriptor::new_without_display_handle()
            }),
            None => wgpu::Instance::default(),
        };

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: settings.power_preference,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| LuminaError::AdapterRequestFailed(e.to_string()))?;

        let info = adapter.get_info();
        log::info!("WgpuDevice: using {} ({:?})", info.name, info.backend);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Lumina Device"),
                required_features: settings.required_features,
                required_limits: settings.required_limits.clone(),
                memory_hints: wgpu::MemoryHints::Performance,
                ..Default::default()
            })
            .await?;

        let blendable = |format| {
            let features = adapter.get_texture_format_features(format);
            features
                .allowed_usages
                .contains(wgpu::TextureUsages::RENDER_ATTACHMENT)
                && features
                    .flags
                    .contains(wgpu::TextureFormatFeatureFlags::BLENDABLE)
        };
        let float_render_targets = blendable(wgpu::TextureFormat::Rgba16Float)
            && blendable(wgpu::TextureFormat::R16Float);

        let mut this = Self::from_raw(device, queue, settings.pixel_ratio);
        this.caps.float_render_targets = float_render_targets;
        Ok(this)
    }

    /// Wraps an existing device and queue.
    #[must_use]
    pub fn from_raw(device: wgpu::Device, queue: wgpu::Queue, pixel_ratio: f32) -> Self {
        let limits = device.limits();
        let caps = DeviceCapabilities {
            depth_texture: true,
            frag_depth: true,
            float_render_targets: true,
            multiple_render_targets: limits.max_color_attachments >= 2,
            pixel_ratio,
            drawing_buffer_size: UVec2::ZERO,
        };

        let layouts = Layouts {
            globals: UniformRing::layout(&device, "Global Uniforms Layout", GLOBAL_UNIFORMS_SIZE),
            depth: device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Depth Texture Layout"),
                entries: &[unfilterable_texture_entry(0)],
            }),
            quad_params: UniformRing::layout(
                &device,
                "Quad Params Layout",
                std::mem::size_of::<QuadParams>() as u64,
            ),
            quad_inputs: device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Quad Inputs Layout"),
                entries: &[unfilterable_texture_entry(0), unfilterable_texture_entry(1)],
            }),
        };

        let builtin = Self::create_builtin(&device, &queue, &layouts);
        let globals_ring = UniformRing::new(
            &device,
            &layouts.globals,
            "Global Uniforms",
            GLOBAL_UNIFORMS_SIZE,
        );
        let params_ring = UniformRing::new(
            &device,
            &layouts.quad_params,
            "Quad Params",
            std::mem::size_of::<QuadParams>() as u64,
        );

        Self {
            max_texture_dimension: limits.max_texture_dimension_2d,
            device,
            queue,
            caps,
            layouts,
            builtin,
            pipelines: PipelineCache::default(),
            globals_ring,
            params_ring,
            targets: SlotMap::with_key(),
            textures: SlotMap::with_key(),
            programs: SlotMap::with_key(),
            geometries: SlotMap::with_key(),
            object_bind_groups: FxHashMap::default(),
            drawable_defines: FxHashMap::default(),
            depth_bind_groups: FxHashMap::default(),
            input_bind_groups: FxHashMap::default(),
            drawing_buffer: None,
            drawing_depth: None,
            viewport: Viewport::default(),
            commands: Vec::with_capacity(256),
            globals: Vec::new(),
            frame: FrameCounters::default(),
        }
    }

    fn create_builtin(device: &wgpu::Device, queue: &wgpu::Queue, layouts: &Layouts) -> BuiltinPrograms {
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Fullscreen Programs"),
            source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(include_str!("fullscreen.wgsl"))),
        });

        let quad_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Quad Pipeline Layout"),
            bind_group_layouts: &[Some(&layouts.quad_params), Some(&layouts.quad_inputs)],
            immediate_size: 0,
        });
        let clear_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Clear Pipeline Layout"),
            bind_group_layouts: &[Some(&layouts.quad_params)],
            immediate_size: 0,
        });

        // Packed far plane: reads as depth 1 in both representations.
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Null Depth Texture"),
            size: wgpu::Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &[255; 4],
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4),
                rows_per_image: Some(1),
            },
            wgpu::Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: 1,
            },
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let null_depth = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Null Depth Bind Group"),
            layout: &layouts.depth,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&view),
            }],
        });

        BuiltinPrograms {
            module,
            quad_layout,
            clear_layout,
            null_depth,
        }
    }

    #[inline]
    #[must_use]
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    #[inline]
    #[must_use]
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Layout scene programs must use for the global uniforms at group 0.
    #[must_use]
    pub fn globals_layout(&self) -> &wgpu::BindGroupLayout {
        &self.layouts.globals
    }

    /// Number of pipelines built so far.
    #[must_use]
    pub fn pipeline_count(&self) -> usize {
        self.pipelines.len()
    }

    // ========================================================================
    // Scene Registration
    // ========================================================================

    pub fn register_program(&mut self, desc: ProgramDescriptor<'_>) -> ProgramId {
        let module = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(desc.label),
            source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(desc.source)),
        });

        let mut groups: SmallVec<[Option<&wgpu::BindGroupLayout>; 3]> =
            SmallVec::from_slice(&[Some(&self.layouts.globals), Some(&self.layouts.depth)]);
        if let Some(object_layout) = desc.object_layout.as_ref() {
            groups.push(Some(object_layout));
        }
        let layout = self.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(desc.label),
            bind_group_layouts: &groups,
            immediate_size: 0,
        });

        self.programs.insert(GpuProgram {
            label: desc.label,
            module,
            layout,
            vertex_buffers: desc.vertex_buffers,
            has_object_group: desc.object_layout.is_some(),
        })
    }

    pub fn unregister_program(&mut self, program: ProgramId) {
        if self.programs.remove(program).is_some() {
            self.pipelines.forget_program(program);
        }
    }

    pub fn register_geometry(&mut self, desc: GeometryDescriptor) -> GeometryId {
        self.geometries.insert(desc)
    }

    pub fn unregister_geometry(&mut self, geometry: GeometryId) {
        self.geometries.remove(geometry);
    }

    /// Sets the bind group bound at group 2 when drawing `drawable`.
    pub fn set_object_bind_group(&mut self, drawable: DrawableId, bind_group: wgpu::BindGroup) {
        self.object_bind_groups.insert(drawable, bind_group);
    }

    // ========================================================================
    // Drawing Buffer
    // ========================================================================

    /// Sets the view rendered to when [`Framebuffer::DrawingBuffer`] is bound,
    /// usually the current surface texture.
    pub fn set_drawing_buffer(
        &mut self,
        view: wgpu::TextureView,
        format: wgpu::TextureFormat,
        width: u32,
        height: u32,
    ) -> Result<()> {
        self.check_size("drawing buffer", width, height)?;
        let size = UVec2::new(width, height);
        if self.drawing_depth.as_ref().is_none_or(|d| d.size != size) {
            log::debug!("WgpuDevice: drawing buffer resized to {size}");
            self.drawing_depth = Some(self.allocate("Drawing Buffer Depth", DEPTH_FORMAT, size));
        }
        self.drawing_buffer = Some(DrawingBuffer { view, format });
        self.caps.drawing_buffer_size = size;
        Ok(())
    }

    /// Drops the drawing buffer view; call before presenting the surface.
    pub fn release_drawing_buffer(&mut self) {
        self.drawing_buffer = None;
    }

    // ========================================================================
    // Helpers
    // ========================================================================

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

    fn allocate(&self, label: &'static str, format: wgpu::TextureFormat, size: UVec2) -> TextureStorage {
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: size.x,
                height: size.y,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        TextureStorage {
            view: texture.create_view(&wgpu::TextureViewDescriptor::default()),
            size,
        }
    }

    fn reallocate(&mut self, texture: TextureId, size: UVec2) {
        let Some((label, format)) = self.textures.get(texture).map(|t| (t.label, t.format)) else {
            return;
        };
        let storage = self.allocate(label, format, size);
        if let Some(t) = self.textures.get_mut(texture) {
            t.storage = Some(storage);
        }
    }

    /// Views changed; cached bind groups referencing them are stale.
    fn invalidate_bind_groups(&mut self) {
        self.depth_bind_groups.clear();
        self.input_bind_groups.clear();
    }
}

impl GpuDevice for WgpuDevice {
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
        let size = UVec2::new(desc.width, desc.height);

        let mut colors = SmallVec::new();
        for &format in &desc.colors {
            let format = wgpu_format(format);
            let storage = self.allocate(desc.label, format, size);
            colors.push(self.textures.insert(GpuTexture {
                label: desc.label,
                format,
                storage: Some(storage),
            }));
        }
        let own_depth = desc.depth_buffer.then(|| {
            let storage = self.allocate(desc.label, DEPTH_FORMAT, size);
            self.textures.insert(GpuTexture {
                label: desc.label,
                format: DEPTH_FORMAT,
                storage: Some(storage),
            })
        });

        log::debug!("WgpuDevice: created target '{}' {size}", desc.label);
        Ok(self.targets.insert(GpuTarget {
            colors,
            own_depth,
            attached_depth: None,
        }))
    }

    fn resize_render_target(&mut self, target: TargetId, width: u32, height: u32) -> Result<()> {
        self.check_size("render target", width, height)?;
        let t = self.targets.get(target).ok_or(LuminaError::UnknownTarget)?;
        let textures: SmallVec<[TextureId; 3]> = t.colors.iter().copied().chain(t.own_depth).collect();
        let size = UVec2::new(width, height);
        for texture in textures {
            self.reallocate(texture, size);
        }
        self.invalidate_bind_groups();
        Ok(())
    }

    fn destroy_render_target(&mut self, target: TargetId) {
        if let Some(t) = self.targets.remove(target) {
            for texture in t.colors.into_iter().chain(t.own_depth) {
                self.textures.remove(texture);
            }
            self.invalidate_bind_groups();
        }
    }

    fn target_texture(&self, target: TargetId, attachment: usize) -> Result<TextureId> {
        let t = self.targets.get(target).ok_or(LuminaError::UnknownTarget)?;
        t.colors
            .get(attachment)
            .copied()
            .ok_or(LuminaError::UnknownTexture)
    }

    fn create_depth_texture(&mut self, label: &'static str) -> Result<TextureId> {
        Ok(self.textures.insert(GpuTexture {
            label,
            format: DEPTH_FORMAT,
            storage: None,
        }))
    }

    fn define_depth_texture(&mut self, texture: TextureId, width: u32, height: u32) -> Result<()> {
        self.check_size("depth texture", width, height)?;
        if !self.textures.contains_key(texture) {
            return Err(LuminaError::UnknownTexture);
        }
        self.reallocate(texture, UVec2::new(width, height));
        self.invalidate_bind_groups();
        Ok(())
    }

    fn destroy_texture(&mut self, texture: TextureId) {
        if self.textures.remove(texture).is_some() {
            self.invalidate_bind_groups();
        }
    }

    fn texture_size(&self, texture: TextureId) -> Option<UVec2> {
        self.textures
            .get(texture)
            .and_then(|t| t.storage.as_ref())
            .map(|s| s.size)
    }

    fn attach_depth(&mut self, target: TargetId, texture: Option<TextureId>) {
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
        self.frame.record_draw(call.instance_count);
        self.commands.push(DeviceCommand::Draw(*call));
    }

    fn draw_quad(&mut self, quad: &FullscreenQuad) {
        self.frame.record_draw(1);
        self.commands.push(DeviceCommand::DrawQuad(quad.clone()));
    }

    fn flush(&mut self) -> Result<()> {
        let commands = std::mem::take(&mut self.commands);
        let globals = std::mem::take(&mut self.globals);
        self.frame.flush();

        let uses_drawing_buffer = commands
            .iter()
            .any(|c| matches!(c, DeviceCommand::BindFramebuffer(Framebuffer::DrawingBuffer)));
        if uses_drawing_buffer && self.drawing_buffer.is_none() {
            return Err(LuminaError::DrawingBufferUnavailable);
        }

        let result = self.replay(&commands, &globals);
        log::trace!(
            "WgpuDevice: flushed {} commands, {} draws in frame",
            commands.len(),
            self.frame.published().draw_count
        );
        result
    }

    fn begin_frame(&mut self) {
        self.frame.begin_frame();
    }

    fn end_frame(&mut self) {
        self.frame.end_frame();
    }
}
