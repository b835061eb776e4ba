//! wgpu Backend Tests
//!
//! Runs whole frames through [`WgpuDevice`] on whatever adapter is available.
//! Every test returns early when no adapter can be acquired (headless CI).

use glam::Vec3;
use lumina::device::wgpu::{GeometryDescriptor, ProgramDescriptor};
use lumina::device::Viewport;
use lumina::scene::{DrawableId, ProgramSet, RenderMode};
use lumina::{
    Camera, CameraView, DrawPass, Drawable, GpuDevice, Group, HelperOverlay, LuminaError,
    RendererSettings, Renderer, Scene, WgpuDevice,
};

const SIZE: u32 = 64;

const TRIANGLE: &str = r"
override CLIP_OBJECT_COUNT: u32;
override CLIP_VARIANT: u32;

struct Globals {
    model: mat4x4<f32>,
    view: mat4x4<f32>,
};

@group(0) @binding(0) var<uniform> globals: Globals;
@group(1) @binding(0) var t_depth: texture_2d<f32>;

@vertex
fn vs_main(@builtin(vertex_index) index: u32) -> @builtin(position) vec4<f32> {
    var positions = array<vec2<f32>, 3>(
        vec2<f32>(-0.5, -0.5),
        vec2<f32>(0.5, -0.5),
        vec2<f32>(0.0, 0.5),
    );
    return globals.model * vec4<f32>(positions[index], 0.5, 1.0);
}

@fragment
fn fs_main(@builtin(position) position: vec4<f32>) -> @location(0) vec4<f32> {
    let depth = textureLoad(t_depth, vec2<i32>(0, 0), 0).r;
    if CLIP_OBJECT_COUNT > 0u && CLIP_VARIANT == 1u && position.z > depth {
        discard;
    }
    return vec4<f32>(1.0, 0.5, 0.0, 0.8);
}
";

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn request_device() -> Option<WgpuDevice> {
    init_logger();
    match pollster::block_on(WgpuDevice::request(&RendererSettings::default())) {
        Ok(device) => Some(device),
        Err(e) => {
            log::warn!("no wgpu adapter, skipping: {e}");
            None
        }
    }
}

fn triangle_scene(device: &mut WgpuDevice) -> Scene {
    let program = device.register_program(ProgramDescriptor {
        label: "triangle",
        source: TRIANGLE,
        vertex_buffers: Vec::new(),
        object_layout: None,
    });
    let geometry = device.register_geometry(GeometryDescriptor {
        vertex_buffers: Vec::new(),
        index: None,
        vertex_count: 3,
        attributes: 0,
    });
    let programs = ProgramSet::uniform(program);
    Scene {
        primitives: Group::new(vec![
            Drawable::new(DrawableId(1), geometry, programs),
            Drawable::new(DrawableId(2), geometry, programs).with_alpha(0.5),
        ]),
        volumes: Group::new(vec![
            Drawable::new(DrawableId(3), geometry, programs).with_render_mode(RenderMode::Volume),
        ]),
    }
}

fn camera() -> Camera {
    Camera::from(CameraView::perspective(
        Vec3::new(0.0, 0.0, 3.0),
        Vec3::ZERO,
        45.0,
        Viewport::new(0, 0, SIZE, SIZE),
        0.1,
        10.0,
    ))
}

// ============================================================================
// Frames
// ============================================================================

#[test]
fn blended_frame_replays_and_caches_pipelines() {
    let Some(mut device) = request_device() else {
        return;
    };
    let scene = triangle_scene(&mut device);
    let mut pass = DrawPass::new(&mut device, SIZE, SIZE, false).unwrap();
    let mut renderer = Renderer::default();

    pass.render(&mut device, &mut renderer, &camera(), &scene, &HelperOverlay::default(), false, false)
        .unwrap();
    let pipelines = device.pipeline_count();
    assert!(pipelines > 0);
    assert!(device.stats().draw_count >= 3);

    pass.render(&mut device, &mut renderer, &camera(), &scene, &HelperOverlay::default(), false, false)
        .unwrap();
    assert_eq!(device.pipeline_count(), pipelines);

    pass.dispose(&mut device);
    assert_eq!(device.stats().framebuffers, 0);
}

#[test]
fn clip_defines_build_distinct_pipelines() {
    let Some(mut device) = request_device() else {
        return;
    };
    let scene = triangle_scene(&mut device);
    let mut pass = DrawPass::new(&mut device, SIZE, SIZE, false).unwrap();
    let mut renderer = Renderer::default();

    pass.render(&mut device, &mut renderer, &camera(), &scene, &HelperOverlay::default(), false, false)
        .unwrap();
    let before = device.pipeline_count();

    renderer
        .set_props(lumina::RendererPropsUpdate {
            clip: Some(lumina::renderer::ClipConfig {
                variant: lumina::renderer::ClipVariant::Pixel,
                objects: vec![lumina::renderer::ClipObject::default()],
            }),
            ..Default::default()
        })
        .unwrap();
    pass.render(&mut device, &mut renderer, &camera(), &scene, &HelperOverlay::default(), false, false)
        .unwrap();
    assert!(device.pipeline_count() > before);
}

#[test]
fn unknown_program_is_reported_by_flush() {
    let Some(mut device) = request_device() else {
        return;
    };
    let mut scene = triangle_scene(&mut device);
    let stray = device.register_program(ProgramDescriptor {
        label: "stray",
        source: TRIANGLE,
        vertex_buffers: Vec::new(),
        object_layout: None,
    });
    device.unregister_program(stray);
    scene.primitives.drawables[0].programs = ProgramSet::uniform(stray);
    let mut pass = DrawPass::new(&mut device, SIZE, SIZE, false).unwrap();
    let mut renderer = Renderer::default();

    let result = pass.render(&mut device, &mut renderer, &camera(), &scene, &HelperOverlay::default(), false, false);
    assert!(matches!(result, Err(LuminaError::UnknownProgram)));
    assert_eq!(device.stats().shaders, lumina::device::SHADERS_PER_PROGRAM);
}

#[test]
fn resize_keeps_rendering() {
    let Some(mut device) = request_device() else {
        return;
    };
    let scene = triangle_scene(&mut device);
    let mut pass = DrawPass::new(&mut device, SIZE, SIZE, false).unwrap();
    let mut renderer = Renderer::default();

    pass.set_size(&mut device, SIZE * 2, SIZE).unwrap();
    pass.render(&mut device, &mut renderer, &camera(), &scene, &HelperOverlay::default(), false, false)
        .unwrap();
    assert_eq!(
        device.texture_size(pass.depth_texture_primitives()),
        Some(glam::UVec2::new(SIZE * 2, SIZE))
    );
}

// ============================================================================
// Drawing Buffer
// ============================================================================

#[test]
fn drawing_buffer_must_be_provided() {
    let Some(mut device) = request_device() else {
        return;
    };
    let scene = triangle_scene(&mut device);
    let mut pass = DrawPass::new(&mut device, SIZE, SIZE, false).unwrap();
    let mut renderer = Renderer::default();

    let result = pass.render(&mut device, &mut renderer, &camera(), &scene, &HelperOverlay::default(), true, false);
    assert!(matches!(result, Err(LuminaError::DrawingBufferUnavailable)));

    let format = wgpu::TextureFormat::Rgba8Unorm;
    let texture = device.device().create_texture(&wgpu::TextureDescriptor {
        label: Some("output"),
        size: wgpu::Extent3d {
            width: SIZE,
            height: SIZE,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    device.set_drawing_buffer(view, format, SIZE, SIZE).unwrap();
    assert_eq!(device.capabilities().drawing_buffer_size, glam::UVec2::new(SIZE, SIZE));

    pass.render(&mut device, &mut renderer, &camera(), &scene, &HelperOverlay::default(), true, true)
        .unwrap();
}

#[test]
fn oversized_targets_are_rejected() {
    let Some(mut device) = request_device() else {
        return;
    };
    let limit = device.device().limits().max_texture_dimension_2d;
    assert!(matches!(
        DrawPass::new(&mut device, limit + 1, 4, false),
        Err(LuminaError::TargetAllocation { .. })
    ));
}
