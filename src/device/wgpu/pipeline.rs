//! Pipeline keys and cache.
//!
//! wgpu bakes fixed-function state into pipeline objects, so every distinct
//! combination of program, [`PipelineState`], clip defines and attachment
//! formats seen during replay maps to one `wgpu::RenderPipeline`. All parts of
//! the key are plain hashable values; pipelines are stored contiguously and
//! addressed through [`RenderPipelineId`].

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::device::{BlendMode, Face, FrontFace, PipelineState, ProgramId, QuadProgram};
use crate::renderer::clip::ClipDefines;

/// Format of every depth attachment and standalone depth texture.
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Formats of the attachments of the framebuffer a pipeline renders into.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttachmentFormats {
    pub colors: SmallVec<[wgpu::TextureFormat; 2]>,
    pub depth: Option<wgpu::TextureFormat>,
}

/// Identity of a cached pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PipelineKey {
    /// Registered scene program.
    Scene {
        program: ProgramId,
        state: PipelineState,
        defines: ClipDefines,
        targets: AttachmentFormats,
    },
    /// Built-in full-screen program.
    Quad {
        program: QuadProgram,
        state: PipelineState,
        targets: AttachmentFormats,
    },
    /// Scissored clear of a partial viewport.
    Clear {
        color: bool,
        depth: bool,
        targets: AttachmentFormats,
    },
}

/// Handle to a cached `wgpu::RenderPipeline`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderPipelineId(u32);

impl RenderPipelineId {
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Pipeline storage and deduplication.
#[derive(Default)]
pub struct PipelineCache {
    pipelines: Vec<wgpu::RenderPipeline>,
    lookup: FxHashMap<PipelineKey, RenderPipelineId>,
}

impl PipelineCache {
    #[inline]
    #[must_use]
    pub fn lookup(&self, key: &PipelineKey) -> Option<RenderPipelineId> {
        self.lookup.get(key).copied()
    }

    pub fn insert(&mut self, key: PipelineKey, pipeline: wgpu::RenderPipeline) -> RenderPipelineId {
        let id = RenderPipelineId(self.pipelines.len() as u32);
        self.pipelines.push(pipeline);
        self.lookup.insert(key, id);
        id
    }

    #[inline]
    #[must_use]
    pub fn get(&self, id: RenderPipelineId) -> &wgpu::RenderPipeline {
        &self.pipelines[id.index()]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pipelines.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pipelines.is_empty()
    }

    /// Drops every pipeline built from `program`.
    pub fn forget_program(&mut self, program: ProgramId) {
        self.lookup
            .retain(|key, _| !matches!(key, PipelineKey::Scene { program: p, .. } if *p == program));
    }
}

// ============================================================================
// State Conversion
// ============================================================================

#[must_use]
pub fn blend_state(mode: BlendMode) -> Option<wgpu::BlendState> {
    let component = |src_factor, dst_factor| wgpu::BlendComponent {
        src_factor,
        dst_factor,
        operation: wgpu::BlendOperation::Add,
    };
    match mode {
        BlendMode::Disabled => None,
        BlendMode::Premultiplied => Some(wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING),
        BlendMode::SeparateAlpha => Some(wgpu::BlendState {
            color: component(wgpu::BlendFactor::SrcAlpha, wgpu::BlendFactor::OneMinusSrcAlpha),
            alpha: component(wgpu::BlendFactor::One, wgpu::BlendFactor::OneMinusSrcAlpha),
        }),
        BlendMode::WboitAccumulate => Some(wgpu::BlendState {
            color: component(wgpu::BlendFactor::One, wgpu::BlendFactor::One),
            alpha: component(wgpu::BlendFactor::Zero, wgpu::BlendFactor::OneMinusSrcAlpha),
        }),
    }
}

#[must_use]
pub fn primitive_state(state: &PipelineState) -> wgpu::PrimitiveState {
    wgpu::PrimitiveState {
        topology: wgpu::PrimitiveTopology::TriangleList,
        front_face: match state.front_face {
            FrontFace::Ccw => wgpu::FrontFace::Ccw,
            FrontFace::Cw => wgpu::FrontFace::Cw,
        },
        cull_mode: state.cull.map(|face| match face {
            Face::Front => wgpu::Face::Front,
            Face::Back => wgpu::Face::Back,
        }),
        ..Default::default()
    }
}

/// Depth state for a framebuffer with depth attachment `format`.
///
/// A disabled depth test also disables depth writes.
#[must_use]
pub fn depth_stencil(
    state: &PipelineState,
    format: Option<wgpu::TextureFormat>,
) -> Option<wgpu::DepthStencilState> {
    format.map(|format| wgpu::DepthStencilState {
        format,
        depth_write_enabled: Some(state.depth_test && state.depth_write),
        depth_compare: Some(if state.depth_test {
            wgpu::CompareFunction::LessEqual
        } else {
            wgpu::CompareFunction::Always
        }),
        stencil: wgpu::StencilState::default(),
        bias: wgpu::DepthBiasState::default(),
    })
}

#[must_use]
pub fn color_targets(
    formats: &AttachmentFormats,
    blend: Option<wgpu::BlendState>,
    write_mask: wgpu::ColorWrites,
) -> SmallVec<[Option<wgpu::ColorTargetState>; 2]> {
    formats
        .colors
        .iter()
        .map(|&format| {
            Some(wgpu::ColorTargetState {
                format,
                blend,
                write_mask,
            })
        })
        .collect()
}

/// Fragment entry point of a built-in full-screen program.
#[must_use]
pub fn quad_entry_point(program: QuadProgram) -> &'static str {
    match program {
        QuadProgram::DepthMerge {
            packed_depth: false,
        } => "fs_merge_native",
        QuadProgram::DepthMerge { packed_depth: true } => "fs_merge_packed",
        QuadProgram::WboitResolve => "fs_resolve",
        QuadProgram::Copy => "fs_copy",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::smallvec;

    #[test]
    fn disabled_depth_test_never_writes() {
        let state = PipelineState::OPAQUE;
        let enabled = depth_stencil(&state, Some(DEPTH_FORMAT)).unwrap();
        assert!(enabled.depth_write_enabled == Some(true));
        assert_eq!(enabled.depth_compare, Some(wgpu::CompareFunction::LessEqual));

        let fullscreen = depth_stencil(&PipelineState::FULLSCREEN.with_depth_write(true), Some(DEPTH_FORMAT))
            .unwrap();
        assert!(fullscreen.depth_write_enabled == Some(false));
        assert_eq!(fullscreen.depth_compare, Some(wgpu::CompareFunction::Always));

        assert!(depth_stencil(&state, None).is_none());
    }

    #[test]
    fn wboit_blend_keeps_revealage_in_alpha() {
        let blend = blend_state(BlendMode::WboitAccumulate).unwrap();
        assert_eq!(blend.color.src_factor, wgpu::BlendFactor::One);
        assert_eq!(blend.color.dst_factor, wgpu::BlendFactor::One);
        assert_eq!(blend.alpha.src_factor, wgpu::BlendFactor::Zero);
        assert_eq!(blend.alpha.dst_factor, wgpu::BlendFactor::OneMinusSrcAlpha);
        assert!(blend_state(BlendMode::Disabled).is_none());
    }

    #[test]
    fn every_color_attachment_gets_the_blend() {
        let formats = AttachmentFormats {
            colors: smallvec![wgpu::TextureFormat::Rgba16Float, wgpu::TextureFormat::R16Float],
            depth: None,
        };
        let targets = color_targets(
            &formats,
            blend_state(BlendMode::WboitAccumulate),
            wgpu::ColorWrites::ALL,
        );
        assert_eq!(targets.len(), 2);
        assert!(targets.iter().all(|t| t.as_ref().is_some_and(|t| t.blend.is_some())));
    }

    #[test]
    fn keys_distinguish_clip_defines() {
        let mut programs = slotmap::SlotMap::<ProgramId, ()>::with_key();
        let program = programs.insert(());
        let targets = AttachmentFormats {
            colors: smallvec![wgpu::TextureFormat::Rgba8Unorm],
            depth: Some(DEPTH_FORMAT),
        };
        let a = PipelineKey::Scene {
            program,
            state: PipelineState::OPAQUE,
            defines: ClipDefines::NONE,
            targets: targets.clone(),
        };
        let b = PipelineKey::Scene {
            program,
            state: PipelineState::OPAQUE,
            defines: ClipDefines {
                object_count: 2,
                ..ClipDefines::NONE
            },
            targets,
        };
        assert_ne!(a, b);
    }
}
