//! Draw Pass Integration Tests
//!
//! Tests for:
//! - Target lifecycle: allocation, idempotent resize, allocation failure
//! - Path selection: blended / weighted-blended, fallback and errors
//! - Frame structure: native and packed depth sequences, direct rendering
//! - Stereo and helper overlays
//! - Frame statistics and failure reporting

use std::cell::Cell;
use std::rc::Rc;

use glam::{UVec2, Vec3, Vec4};
use lumina::device::{
    BlendMode, ClearOp, DeviceCapabilities, DeviceCommand, Framebuffer, GeometryId, GpuDevice,
    PipelineState, ProgramId, QuadProgram, RecordingDevice, Viewport,
};
use lumina::renderer::TransparencyPath;
use lumina::scene::{
    Camera, CameraView, Drawable, DrawableId, Group, HelperOverlay, HelperScene, ProgramSet,
    RenderMode, Scene,
};
use lumina::{DrawPass, LuminaError, OrderIndependentTransparency, Renderer, RendererPropsUpdate};
use slotmap::KeyData;

const WIDTH: u32 = 64;
const HEIGHT: u32 = 48;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

struct Fixture {
    device: RecordingDevice,
    programs: ProgramSet,
    geometry: GeometryId,
}

impl Fixture {
    fn new(caps: DeviceCapabilities) -> Self {
        init_logger();
        let mut device = RecordingDevice::new(caps);
        let programs = ProgramSet::uniform(device.create_program("mesh"));
        let geometry = device.create_geometry(3);
        Self {
            device,
            programs,
            geometry,
        }
    }

    fn drawable(&self, id: u32) -> Drawable {
        Drawable::new(DrawableId(id), self.geometry, self.programs)
    }

    fn scene(&self, with_volume: bool) -> Scene {
        let primitives = Group::new(vec![self.drawable(1), self.drawable(2).with_alpha(0.5)]);
        let volumes = if with_volume {
            Group::new(vec![self.drawable(10).with_render_mode(RenderMode::Volume)])
        } else {
            Group::default()
        };
        Scene {
            primitives,
            volumes,
        }
    }
}

fn view(viewport: Viewport) -> CameraView {
    CameraView::perspective(Vec3::new(0.0, 0.0, 8.0), Vec3::ZERO, 45.0, viewport, 0.1, 100.0)
}

fn mono() -> Camera {
    Camera::from(view(Viewport::new(0, 0, WIDTH, HEIGHT)))
}

fn stereo() -> Camera {
    Camera::Stereo {
        left: view(Viewport::new(0, 0, WIDTH / 2, HEIGHT)),
        right: view(Viewport::new((WIDTH / 2) as i32, 0, WIDTH / 2, HEIGHT)),
    }
}

/// OIT sub-pass whose next resize fails once.
struct FailingResizeOit {
    fail_next: bool,
    size: Rc<Cell<UVec2>>,
}

impl OrderIndependentTransparency for FailingResizeOit {
    fn supported(&self) -> bool {
        true
    }

    fn set_size(&mut self, _device: &mut dyn GpuDevice, width: u32, height: u32) -> lumina::Result<()> {
        if std::mem::take(&mut self.fail_next) {
            return Err(LuminaError::TargetAllocation {
                label: "accumulation",
                width,
                height,
            });
        }
        self.size.set(UVec2::new(width, height));
        Ok(())
    }

    fn bind(&mut self, _device: &mut dyn GpuDevice) {}

    fn resolve(&mut self, _device: &mut dyn GpuDevice) {}

    fn dispose(&mut self, _device: &mut dyn GpuDevice) {}
}

fn count(device: &RecordingDevice, pred: impl Fn(&DeviceCommand) -> bool) -> usize {
    device.commands().iter().filter(|c| pred(c)).count()
}

fn position(device: &RecordingDevice, pred: impl Fn(&DeviceCommand) -> bool) -> Option<usize> {
    device.commands().iter().position(pred)
}

// ============================================================================
// Target Lifecycle
// ============================================================================

#[test]
fn new_allocates_every_target_at_the_requested_size() {
    let mut f = Fixture::new(DeviceCapabilities::default());
    let pass = DrawPass::new(&mut f.device, WIDTH, HEIGHT, false).unwrap();

    let size = glam::UVec2::new(WIDTH, HEIGHT);
    assert_eq!(f.device.target_size(pass.color_target().id()), Some(size));
    assert_eq!(f.device.target_size(pass.depth_target().id()), Some(size));
    assert_eq!(pass.depth_capture_sizes(), [size, size]);
    assert_eq!(pass.depth_merge().tex_size(), size);
    assert!(!pass.packed_depth());
    assert_eq!(pass.transparency(), TransparencyPath::Blended);
}

#[test]
fn resize_updates_all_targets_and_is_idempotent() {
    let mut f = Fixture::new(DeviceCapabilities::default());
    let mut pass = DrawPass::new(&mut f.device, WIDTH, HEIGHT, true).unwrap();

    let before = f.device.resource_mutations();
    pass.set_size(&mut f.device, WIDTH, HEIGHT).unwrap();
    assert_eq!(f.device.resource_mutations(), before);

    pass.set_size(&mut f.device, 200, 100).unwrap();
    let size = glam::UVec2::new(200, 100);
    assert_eq!(f.device.target_size(pass.color_target().id()), Some(size));
    assert_eq!(f.device.target_size(pass.depth_target().id()), Some(size));
    assert_eq!(pass.depth_capture_sizes(), [size, size]);
    assert_eq!(pass.depth_merge().tex_size(), size);
    assert_eq!(
        f.device.texture_size(pass.depth_texture_primitives()),
        Some(size)
    );

    let after = f.device.resource_mutations();
    pass.set_size(&mut f.device, 200, 100).unwrap();
    assert_eq!(f.device.resource_mutations(), after);
}

#[test]
fn failed_resize_can_be_retried() {
    let mut f = Fixture::new(DeviceCapabilities::default());
    let oit_size = Rc::new(Cell::new(UVec2::new(WIDTH, HEIGHT)));
    let oit = FailingResizeOit {
        fail_next: true,
        size: Rc::clone(&oit_size),
    };
    let mut pass = DrawPass::with_oit(&mut f.device, WIDTH, HEIGHT, Some(Box::new(oit))).unwrap();

    assert!(matches!(
        pass.set_size(&mut f.device, 200, 100),
        Err(LuminaError::TargetAllocation { label: "accumulation", .. })
    ));
    assert_eq!(pass.color_target().size(), UVec2::new(WIDTH, HEIGHT));

    pass.set_size(&mut f.device, 200, 100).unwrap();
    let size = UVec2::new(200, 100);
    assert_eq!(oit_size.get(), size);
    assert_eq!(f.device.target_size(pass.color_target().id()), Some(size));
    assert_eq!(f.device.target_size(pass.depth_target().id()), Some(size));
    assert_eq!(pass.depth_capture_sizes(), [size, size]);
    assert_eq!(pass.depth_merge().tex_size(), size);
}

#[test]
fn oversized_targets_fail_to_allocate() {
    init_logger();
    let mut device = RecordingDevice::default().with_max_texture_dimension(128);
    assert!(matches!(
        DrawPass::new(&mut device, 256, 16, false),
        Err(LuminaError::TargetAllocation { width: 256, .. })
    ));

    let mut pass = DrawPass::new(&mut device, 16, 16, false).unwrap();
    assert!(matches!(
        pass.set_size(&mut device, 16, 4096),
        Err(LuminaError::TargetAllocation { .. })
    ));
}

#[test]
fn dispose_releases_every_resource() {
    let mut f = Fixture::new(DeviceCapabilities::default());
    let pass = DrawPass::new(&mut f.device, WIDTH, HEIGHT, true).unwrap();
    assert!(f.device.stats().framebuffers > 0);

    pass.dispose(&mut f.device);
    let stats = f.device.stats();
    assert_eq!(stats.framebuffers, 0);
    assert_eq!(stats.textures, 0);
}

// ============================================================================
// Transparency Path Selection
// ============================================================================

#[test]
fn weighted_blended_requires_oit() {
    let mut f = Fixture::new(DeviceCapabilities::default());
    let mut pass = DrawPass::new(&mut f.device, WIDTH, HEIGHT, false).unwrap();
    assert!(matches!(
        pass.set_transparency(TransparencyPath::WeightedBlended),
        Err(LuminaError::OitNotEnabled)
    ));
    assert_eq!(pass.transparency(), TransparencyPath::Blended);
    pass.set_transparency(TransparencyPath::Blended).unwrap();
}

#[test]
fn weighted_blended_falls_back_without_float_targets() {
    let mut f = Fixture::new(DeviceCapabilities {
        float_render_targets: false,
        ..Default::default()
    });
    let mut pass = DrawPass::new(&mut f.device, WIDTH, HEIGHT, true).unwrap();
    assert_eq!(pass.transparency(), TransparencyPath::Blended);
    assert!(!pass.wboit_enabled());
    assert!(matches!(
        pass.set_transparency(TransparencyPath::WeightedBlended),
        Err(LuminaError::OitNotEnabled)
    ));
}

#[test]
fn weighted_blended_needs_native_depth() {
    let mut f = Fixture::new(DeviceCapabilities {
        depth_texture: false,
        ..Default::default()
    });
    let mut pass = DrawPass::new(&mut f.device, WIDTH, HEIGHT, true).unwrap();
    assert!(pass.packed_depth());
    assert_eq!(pass.transparency(), TransparencyPath::Blended);
    assert!(pass.set_transparency(TransparencyPath::WeightedBlended).is_err());
}

#[test]
fn transparency_can_be_switched_at_runtime() {
    let mut f = Fixture::new(DeviceCapabilities::default());
    let mut pass = DrawPass::new(&mut f.device, WIDTH, HEIGHT, true).unwrap();
    assert!(pass.wboit_enabled());
    pass.set_transparency(TransparencyPath::Blended).unwrap();
    assert!(!pass.wboit_enabled());
    pass.set_transparency(TransparencyPath::WeightedBlended).unwrap();
    assert!(pass.wboit_enabled());
}

// ============================================================================
// Frame Structure
// ============================================================================

#[test]
fn native_blended_frame_swaps_depth_attachments() {
    let mut f = Fixture::new(DeviceCapabilities::default());
    let mut pass = DrawPass::new(&mut f.device, WIDTH, HEIGHT, false).unwrap();
    let mut renderer = Renderer::default();
    let scene = f.scene(true);

    pass.render(&mut f.device, &mut renderer, &mono(), &scene, &HelperOverlay::default(), false, false)
        .unwrap();

    let color = pass.color_target().id();
    let attachments: Vec<_> = f
        .device
        .commands()
        .iter()
        .filter_map(|c| match c {
            DeviceCommand::AttachDepth { target, texture } if *target == color => *texture,
            _ => None,
        })
        .collect();
    assert_eq!(
        attachments,
        vec![
            pass.depth_texture_primitives(),
            pass.depth_texture_volumes(),
            pass.depth_texture_primitives(),
        ]
    );

    let merge = position(&f.device, |c| {
        matches!(c, DeviceCommand::DrawQuad(q) if q.program == QuadProgram::DepthMerge { packed_depth: false })
    })
    .expect("depth merge");
    let merge_target = f.device.commands()[..merge]
        .iter()
        .rev()
        .find_map(|c| match c {
            DeviceCommand::BindFramebuffer(fb) => Some(*fb),
            _ => None,
        });
    assert_eq!(merge_target, Some(Framebuffer::Target(pass.depth_target().id())));

    assert_eq!(
        count(&f.device, |c| matches!(c, DeviceCommand::BindFramebuffer(Framebuffer::DrawingBuffer))),
        0
    );
    assert_eq!(count(&f.device, |c| matches!(c, DeviceCommand::Flush)), 1);
}

#[test]
fn blended_frame_draws_opaque_volume_then_transparent() {
    let mut f = Fixture::new(DeviceCapabilities::default());
    let mut pass = DrawPass::new(&mut f.device, WIDTH, HEIGHT, false).unwrap();
    let mut renderer = Renderer::default();
    let scene = f.scene(true);

    pass.render(&mut f.device, &mut renderer, &mono(), &scene, &HelperOverlay::default(), false, false)
        .unwrap();

    let drawn: Vec<_> = f.device.draws().map(|d| d.drawable).collect();
    assert_eq!(drawn, vec![DrawableId(1), DrawableId(10), DrawableId(2)]);

    let volume = f.device.draws().find(|d| d.drawable == DrawableId(10)).unwrap();
    assert_eq!(volume.depth_texture, Some(pass.depth_texture_primitives()));
}

#[test]
fn packed_depth_frame_uses_depth_only_passes() {
    let mut f = Fixture::new(DeviceCapabilities {
        depth_texture: false,
        ..Default::default()
    });
    let mut pass = DrawPass::new(&mut f.device, WIDTH, HEIGHT, false).unwrap();
    let mut renderer = Renderer::default();
    renderer
        .set_props(RendererPropsUpdate {
            background_color: Some(Vec3::ZERO),
            ..Default::default()
        })
        .unwrap();
    let scene = f.scene(true);

    pass.render(&mut f.device, &mut renderer, &mono(), &scene, &HelperOverlay::default(), false, false)
        .unwrap();

    assert_eq!(count(&f.device, |c| matches!(c, DeviceCommand::AttachDepth { .. })), 0);
    assert!(
        position(&f.device, |c| {
            matches!(c, DeviceCommand::DrawQuad(q) if q.program == QuadProgram::DepthMerge { packed_depth: true })
        })
        .is_some()
    );

    let far = ClearOp {
        color: Some(Vec4::ONE),
        depth: Some(1.0),
    };
    assert_eq!(count(&f.device, |c| *c == DeviceCommand::Clear(far)), 2);

    // Primitives: color, depth-only. Volume: color, depth-only. Then transparent.
    let drawn: Vec<_> = f.device.draws().map(|d| d.drawable).collect();
    assert_eq!(
        drawn,
        vec![
            DrawableId(1),
            DrawableId(1),
            DrawableId(2),
            DrawableId(10),
            DrawableId(10),
            DrawableId(2),
        ]
    );
}

#[test]
fn weighted_blended_frame_accumulates_and_resolves() {
    let mut f = Fixture::new(DeviceCapabilities::default());
    let mut pass = DrawPass::new(&mut f.device, WIDTH, HEIGHT, true).unwrap();
    let mut renderer = Renderer::default();
    let scene = f.scene(true);

    pass.render(&mut f.device, &mut renderer, &mono(), &scene, &HelperOverlay::default(), false, false)
        .unwrap();

    let accumulate = position(&f.device, |c| {
        matches!(c, DeviceCommand::SetState(s) if s.blend == BlendMode::WboitAccumulate)
    })
    .expect("accumulation state");
    let resolve = position(&f.device, |c| {
        matches!(c, DeviceCommand::DrawQuad(q) if q.program == QuadProgram::WboitResolve)
    })
    .expect("resolve");
    assert!(accumulate < resolve);
    assert_eq!(
        f.device.commands()[resolve - 1],
        DeviceCommand::SetState(PipelineState::FULLSCREEN.with_blend(BlendMode::SeparateAlpha))
    );

    // Opaque surface first, then the transparent surface and the volume.
    let drawn: Vec<_> = f.device.draws().map(|d| d.drawable).collect();
    assert_eq!(drawn, vec![DrawableId(1), DrawableId(2), DrawableId(10)]);
    let merged = f.device.target_texture(pass.depth_target().id(), 0).unwrap();
    assert!(
        f.device
            .draws()
            .filter(|d| d.drawable != DrawableId(1))
            .all(|d| d.depth_texture == Some(merged))
    );
}

#[test]
fn drawing_buffer_is_rendered_directly_without_volumes() {
    let mut f = Fixture::new(DeviceCapabilities::default());
    let mut pass = DrawPass::new(&mut f.device, WIDTH, HEIGHT, false).unwrap();
    let mut renderer = Renderer::default();

    let scene = f.scene(false);
    pass.render(&mut f.device, &mut renderer, &mono(), &scene, &HelperOverlay::default(), true, false)
        .unwrap();
    assert!(position(&f.device, |c| matches!(c, DeviceCommand::BindFramebuffer(Framebuffer::DrawingBuffer))).is_some());
    assert_eq!(
        count(&f.device, |c| matches!(c, DeviceCommand::DrawQuad(q) if q.program == QuadProgram::Copy)),
        0
    );

    f.device.clear_commands();
    let scene = f.scene(true);
    pass.render(&mut f.device, &mut renderer, &mono(), &scene, &HelperOverlay::default(), true, false)
        .unwrap();
    let copy = position(&f.device, |c| {
        matches!(c, DeviceCommand::DrawQuad(q) if q.program == QuadProgram::Copy)
    })
    .expect("copy to drawing buffer");
    let bind = position(&f.device, |c| {
        matches!(c, DeviceCommand::BindFramebuffer(Framebuffer::DrawingBuffer))
    })
    .unwrap();
    assert!(bind < copy);
}

#[test]
fn transparent_background_clears_drawing_buffer_first() {
    let mut f = Fixture::new(DeviceCapabilities::default());
    let mut pass = DrawPass::new(&mut f.device, WIDTH, HEIGHT, false).unwrap();
    let mut renderer = Renderer::default();

    let scene = f.scene(true);
    pass.render(&mut f.device, &mut renderer, &mono(), &scene, &HelperOverlay::default(), true, true)
        .unwrap();
    let commands = f.device.commands();
    let bind = commands
        .iter()
        .position(|c| matches!(c, DeviceCommand::BindFramebuffer(_)))
        .unwrap();
    assert_eq!(commands[bind], DeviceCommand::BindFramebuffer(Framebuffer::DrawingBuffer));
    assert_eq!(
        commands[bind + 1],
        DeviceCommand::Clear(ClearOp {
            color: Some(Vec4::ZERO),
            depth: Some(1.0),
        })
    );
}

// ============================================================================
// Stereo & Helpers
// ============================================================================

#[test]
fn stereo_renders_left_eye_then_right_eye() {
    let mut f = Fixture::new(DeviceCapabilities::default());
    let mut pass = DrawPass::new(&mut f.device, WIDTH, HEIGHT, false).unwrap();
    let mut renderer = Renderer::default();
    let left = Viewport::new(0, 0, WIDTH / 2, HEIGHT);
    let right = Viewport::new((WIDTH / 2) as i32, 0, WIDTH / 2, HEIGHT);
    let camera = Camera::Stereo {
        left: view(left),
        right: view(right),
    };

    let scene = f.scene(false);
    pass.render(&mut f.device, &mut renderer, &camera, &scene, &HelperOverlay::default(), false, false)
        .unwrap();

    let viewports: Vec<_> = f
        .device
        .commands()
        .iter()
        .filter_map(|c| match c {
            DeviceCommand::SetViewport(v) => Some(*v),
            _ => None,
        })
        .collect();
    assert_eq!(viewports, vec![left, right]);
    assert_eq!(count(&f.device, |c| matches!(c, DeviceCommand::Flush)), 2);

    // Both eyes end in the same color target.
    let color = Framebuffer::Target(pass.color_target().id());
    let flushes: Vec<_> = f
        .device
        .commands()
        .iter()
        .enumerate()
        .filter(|(_, c)| matches!(c, DeviceCommand::Flush))
        .map(|(i, _)| i)
        .collect();
    for flush in flushes {
        let last_bound = f.device.commands()[..flush].iter().rev().find_map(|c| match c {
            DeviceCommand::BindFramebuffer(fb) => Some(*fb),
            _ => None,
        });
        assert_eq!(last_bound, Some(color));
    }
}

#[test]
fn camera_helper_renders_in_its_corner_viewport() {
    let mut f = Fixture::new(DeviceCapabilities {
        pixel_ratio: 2.0,
        ..Default::default()
    });
    let mut pass = DrawPass::new(&mut f.device, 640, 480, false).unwrap();
    let mut renderer = Renderer::default();
    let mut helper = HelperOverlay::default();
    helper.camera.scene = HelperScene::new(Group::new(vec![f.drawable(99)]));

    let main = view(Viewport::new(0, 0, 640, 480));
    let scene = f.scene(false);
    pass.render(&mut f.device, &mut renderer, &Camera::from(main), &scene, &helper, false, false)
        .unwrap();

    let gizmo = Viewport::new(16, 16, 256, 256);
    let set = position(&f.device, |c| *c == DeviceCommand::SetViewport(gizmo)).expect("gizmo viewport");
    let draw = position(&f.device, |c| {
        matches!(c, DeviceCommand::Draw(d) if d.drawable == DrawableId(99))
    })
    .unwrap();
    let flush = position(&f.device, |c| matches!(c, DeviceCommand::Flush)).unwrap();
    assert!(set < draw && draw < flush);
}

#[test]
fn disabled_helpers_are_skipped() {
    let mut f = Fixture::new(DeviceCapabilities::default());
    let mut pass = DrawPass::new(&mut f.device, WIDTH, HEIGHT, false).unwrap();
    let mut renderer = Renderer::default();
    let mut helper = HelperOverlay::default();
    helper.debug = HelperScene::new(Group::new(vec![f.drawable(50)]));
    helper.debug.enabled = false;

    let scene = f.scene(false);
    pass.render(&mut f.device, &mut renderer, &mono(), &scene, &helper, false, false)
        .unwrap();
    assert!(f.device.draws().all(|d| d.drawable != DrawableId(50)));
}

#[test]
fn flush_publishes_frame_statistics() {
    let mut f = Fixture::new(DeviceCapabilities::default());
    let mut pass = DrawPass::new(&mut f.device, WIDTH, HEIGHT, false).unwrap();
    let mut renderer = Renderer::default();
    let scene = Scene {
        primitives: Group::new(vec![f.drawable(1).with_instance_count(5)]),
        volumes: Group::default(),
    };

    pass.render(&mut f.device, &mut renderer, &mono(), &scene, &HelperOverlay::default(), false, false)
        .unwrap();
    let stats = f.device.stats();
    let quads = count(&f.device, |c| matches!(c, DeviceCommand::DrawQuad(_))) as u32;
    assert_eq!(stats.draw_count, 1 + quads);
    assert_eq!(stats.instanced_draw_count, 1);
    assert_eq!(stats.instance_count, 5 + quads);
    assert_eq!(stats.programs, 1);
    assert_eq!(stats.attributes, 3);
}

#[test]
fn stereo_statistics_count_both_eyes() {
    let mut f = Fixture::new(DeviceCapabilities::default());
    let mut pass = DrawPass::new(&mut f.device, WIDTH, HEIGHT, false).unwrap();
    let mut renderer = Renderer::default();
    let scene = Scene {
        primitives: Group::new(vec![f.drawable(1).with_instance_count(3), f.drawable(2)]),
        volumes: Group::default(),
    };

    pass.render(&mut f.device, &mut renderer, &mono(), &scene, &HelperOverlay::default(), false, false)
        .unwrap();
    let single = f.device.stats();
    assert!(single.draw_count >= 2);

    f.device.clear_commands();
    pass.render(&mut f.device, &mut renderer, &stereo(), &scene, &HelperOverlay::default(), false, false)
        .unwrap();
    let both = f.device.stats();
    let issued = count(&f.device, |c| matches!(c, DeviceCommand::Draw(_) | DeviceCommand::DrawQuad(_)));
    assert_eq!(both.draw_count as usize, issued);
    assert_eq!(both.draw_count, 2 * single.draw_count);
    assert_eq!(both.instance_count, 2 * single.instance_count);
    assert_eq!(both.instanced_draw_count, 2);

    // The next mono frame starts from zero again.
    pass.render(&mut f.device, &mut renderer, &mono(), &scene, &HelperOverlay::default(), false, false)
        .unwrap();
    assert_eq!(f.device.stats(), single);
}

#[test]
fn stereo_weighted_blended_resolves_each_eye() {
    let mut f = Fixture::new(DeviceCapabilities::default());
    let mut pass = DrawPass::new(&mut f.device, WIDTH, HEIGHT, true).unwrap();
    assert!(pass.wboit_enabled());
    let mut renderer = Renderer::default();
    let scene = f.scene(true);

    pass.render(&mut f.device, &mut renderer, &stereo(), &scene, &HelperOverlay::default(), false, false)
        .unwrap();

    let drawn: Vec<_> = f.device.draws().map(|d| d.drawable).collect();
    assert_eq!(
        drawn,
        vec![
            DrawableId(1),
            DrawableId(2),
            DrawableId(10),
            DrawableId(1),
            DrawableId(2),
            DrawableId(10),
        ]
    );

    let markers: Vec<_> = f
        .device
        .commands()
        .iter()
        .filter_map(|c| match c {
            DeviceCommand::SetViewport(v) => Some(format!("viewport {}", v.x)),
            DeviceCommand::DrawQuad(q) if q.program == QuadProgram::WboitResolve => {
                Some("resolve".to_owned())
            }
            DeviceCommand::Flush => Some("flush".to_owned()),
            _ => None,
        })
        .collect();
    let half = WIDTH / 2;
    assert_eq!(
        markers,
        vec![
            "viewport 0".to_owned(),
            "resolve".to_owned(),
            "flush".to_owned(),
            format!("viewport {half}"),
            "resolve".to_owned(),
            "flush".to_owned(),
        ]
    );
}

#[test]
fn unregistered_program_fails_the_frame() {
    let mut f = Fixture::new(DeviceCapabilities::default());
    let mut pass = DrawPass::new(&mut f.device, WIDTH, HEIGHT, false).unwrap();
    let mut renderer = Renderer::default();
    let stray = ProgramSet::uniform(ProgramId::from(KeyData::from_ffi(u64::MAX)));
    let mut unknown = f.drawable(5);
    unknown.programs = stray;
    let scene = Scene {
        primitives: Group::new(vec![f.drawable(1), unknown]),
        volumes: Group::default(),
    };

    let result =
        pass.render(&mut f.device, &mut renderer, &mono(), &scene, &HelperOverlay::default(), false, false);
    assert!(matches!(result, Err(LuminaError::UnknownProgram)));
    // The rest of the frame was still submitted.
    assert_eq!(count(&f.device, |c| matches!(c, DeviceCommand::Flush)), 1);
    assert!(f.device.draws().any(|d| d.drawable == DrawableId(1)));

    let scene = f.scene(false);
    pass.render(&mut f.device, &mut renderer, &mono(), &scene, &HelperOverlay::default(), false, false)
        .unwrap();
}
