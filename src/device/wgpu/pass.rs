//! Render pass with state tracking.
//!
//! Skips redundant pipeline, bind group, vertex buffer and rectangle changes.

use crate::device::{GeometryId, TextureId};
use crate::scene::DrawableId;

use super::pipeline::RenderPipelineId;

/// Identity of a bind group as seen by the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingId {
    Globals,
    QuadParams,
    /// Depth texture sampled by scene programs; `None` is the null texture.
    Depth(Option<TextureId>),
    QuadInputs(TextureId, TextureId),
    Object(DrawableId),
}

#[derive(Clone, Copy, PartialEq)]
struct BindGroupState {
    id: BindingId,
    offset: Option<u32>,
}

/// Pixel rectangle in wgpu framebuffer coordinates (top-left origin).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

pub struct TrackedRenderPass {
    pass: wgpu::RenderPass<'static>,
    current_pipeline: Option<RenderPipelineId>,
    current_bind_groups: [Option<BindGroupState>; 3],
    current_geometry: Option<GeometryId>,
    current_viewport: Option<PixelRect>,
    current_scissor: Option<PixelRect>,
}

impl TrackedRenderPass {
    #[must_use]
    pub fn new(pass: wgpu::RenderPass<'static>) -> Self {
        Self {
            pass,
            current_pipeline: None,
            current_bind_groups: [None; 3],
            current_geometry: None,
            current_viewport: None,
            current_scissor: None,
        }
    }

    pub fn set_pipeline(&mut self, id: RenderPipelineId, pipeline: &wgpu::RenderPipeline) {
        if self.current_pipeline != Some(id) {
            self.pass.set_pipeline(pipeline);
            self.current_pipeline = Some(id);
        }
    }

    pub fn set_bind_group(
        &mut self,
        index: u32,
        id: BindingId,
        bind_group: &wgpu::BindGroup,
        offset: Option<u32>,
    ) {
        let state = BindGroupState { id, offset };
        let slot = index as usize;
        if self.current_bind_groups[slot] != Some(state) {
            match offset {
                Some(offset) => self.pass.set_bind_group(index, bind_group, &[offset]),
                None => self.pass.set_bind_group(index, bind_group, &[]),
            }
            self.current_bind_groups[slot] = Some(state);
        }
    }

    /// Binds every vertex buffer of `geometry` (and its index buffer).
    pub fn set_geometry(
        &mut self,
        id: GeometryId,
        vertex_buffers: &[wgpu::Buffer],
        index: Option<(&wgpu::Buffer, wgpu::IndexFormat)>,
    ) {
        if self.current_geometry == Some(id) {
            return;
        }
        for (slot, buffer) in vertex_buffers.iter().enumerate() {
            self.pass.set_vertex_buffer(slot as u32, buffer.slice(..));
        }
        if let Some((buffer, format)) = index {
            self.pass.set_index_buffer(buffer.slice(..), format);
        }
        self.current_geometry = Some(id);
    }

    pub fn set_viewport(&mut self, rect: PixelRect) {
        if self.current_viewport != Some(rect) {
            self.pass.set_viewport(
                rect.x as f32,
                rect.y as f32,
                rect.width as f32,
                rect.height as f32,
                0.0,
                1.0,
            );
            self.current_viewport = Some(rect);
        }
    }

    pub fn set_scissor(&mut self, rect: PixelRect) {
        if self.current_scissor != Some(rect) {
            self.pass
                .set_scissor_rect(rect.x, rect.y, rect.width, rect.height);
            self.current_scissor = Some(rect);
        }
    }

    pub fn draw(&mut self, vertices: std::ops::Range<u32>, instances: std::ops::Range<u32>) {
        self.pass.draw(vertices, instances);
    }

    pub fn draw_indexed(&mut self, indices: std::ops::Range<u32>, instances: std::ops::Range<u32>) {
        self.pass.draw_indexed(indices, 0, instances);
    }
}
