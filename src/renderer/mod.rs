//! Renderer
//!
//! [`Renderer`] executes exactly one semantic pass per call over a [`Group`]
//! of drawables: pick, depth, the blended color phases, or the weighted-blended
//! color phases. The caller binds the destination target and viewport first.
//!
//! # Pass summary
//!
//! | Operation                    | Drawables                          | Variant        | Base state                         |
//! |------------------------------|------------------------------------|----------------|------------------------------------|
//! | `render_pick`                | pickable, not color-only           | `Pick(kind)`   | depth test + write, no blend       |
//! | `render_depth`               | all                                | `Depth`        | depth test + write, no blend       |
//! | `render_blended_opaque`      | `OPAQUE`                           | `ColorBlended` | depth test + write, no blend       |
//! | `render_blended_transparent` | not `OPAQUE`, depth writers first  | `ColorBlended` | depth test, blend, mask true/false |
//! | `render_blended_volume`      | volumetric                         | `ColorBlended` | depth test, blend, no cull         |
//! | `render_wboit_opaque`        | [`is_wboit_opaque`]                | `ColorWboit`   | depth test + write, no blend       |
//! | `render_wboit_transparent`   | [`is_wboit_transparent`]           | `ColorWboit`   | accumulate blend, in-shader depth  |
//!
//! Per-draw culling, winding and volume depth handling follow
//! [`rules::draw_state`]. Global uniforms are uploaded at most once per
//! distinct program per pass.

pub mod classify;
pub mod clip;
mod context;
pub mod props;
pub mod rules;
pub mod settings;
pub mod target;
pub mod uniforms;

pub use classify::{is_wboit_opaque, is_wboit_transparent};
pub use clip::{
    AxisAngle, ClipConfig, ClipDefines, ClipObject, ClipObjectKind, ClipObjects, ClipVariant,
    MAX_CLIP_OBJECTS,
};
pub use context::PassContext;
pub use props::{LightingParams, LightingStyle, RendererProps, RendererPropsUpdate};
pub use settings::{RendererSettings, TransparencyPath};
pub use target::{DepthTexture, RenderTarget};
pub use uniforms::{GlobalUniformState, GlobalUniforms};

use glam::{UVec2, Vec2, Vec4};
use rustc_hash::FxHashMap;

use crate::device::{
    BlendMode, ClearOp, DrawCall, GpuDevice, PipelineState, TextureId, Viewport,
};
use crate::errors::Result;
use crate::scene::{
    CameraView, Drawable, DrawableFlags, DrawableId, Group, PickKind, RenderVariant,
};
use uniforms::flag;

/// Executes individual render passes and owns the global uniform state.
#[derive(Debug)]
pub struct Renderer {
    props: RendererProps,
    clip: ClipObjects,
    uniforms: GlobalUniformState,
    ctx: PassContext,
    /// Clip defines each drawable's programs were last linked with.
    clip_defines: FxHashMap<DrawableId, ClipDefines>,
}

impl Default for Renderer {
    fn default() -> Self {
        let mut renderer = Self {
            props: RendererProps::default(),
            clip: ClipObjects::default(),
            uniforms: GlobalUniformState::default(),
            ctx: PassContext::default(),
            clip_defines: FxHashMap::default(),
        };
        renderer.write_props();
        renderer
    }
}

impl Renderer {
    pub fn new(props: RendererProps) -> Result<Self> {
        let mut clip = ClipObjects::default();
        clip.rebuild(&props.clip)?;
        let mut renderer = Self {
            props,
            clip,
            uniforms: GlobalUniformState::default(),
            ctx: PassContext::default(),
            clip_defines: FxHashMap::default(),
        };
        renderer.write_props();
        Ok(renderer)
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    #[must_use]
    pub fn props(&self) -> &RendererProps {
        &self.props
    }

    #[must_use]
    pub fn uniforms(&self) -> &GlobalUniformState {
        &self.uniforms
    }

    #[must_use]
    pub fn clip_objects(&self) -> &ClipObjects {
        &self.clip
    }

    #[must_use]
    pub fn context(&self) -> &PassContext {
        &self.ctx
    }

    // ========================================================================
    // Configuration
    // ========================================================================

    /// Applies the fields present in `update`. Values equal to the current
    /// ones are skipped and cause no uniform write.
    pub fn set_props(&mut self, update: RendererPropsUpdate) -> Result<()> {
        if let Some(clip) = update.clip
            && clip != self.props.clip
        {
            self.clip.rebuild(&clip)?;
            self.props.clip = clip;
            self.uniforms.set_clip_objects(&self.clip);
        }

        let props = &mut self.props;
        if let Some(v) = update.background_color {
            props.background_color = v;
        }
        if let Some(v) = update.pick_threshold {
            props.pick_threshold = v;
        }
        if let Some(v) = update.interior_darkening {
            props.interior_darkening = v;
        }
        if let Some(v) = update.interior_color_flag {
            props.interior_color_flag = v;
        }
        if let Some(v) = update.interior_color {
            props.interior_color = v;
        }
        if let Some(v) = update.highlight_color {
            props.highlight_color = v;
        }
        if let Some(v) = update.select_color {
            props.select_color = v;
        }
        if let Some(v) = update.style {
            props.style = v;
        }

        self.write_props();
        Ok(())
    }

    /// Writes the prop-derived uniforms; unchanged values are filtered by
    /// the uniform state.
    fn write_props(&mut self) {
        let p = &self.props;
        let light = p.style.params();
        let transparent = flag(self.ctx.transparent_background);
        let u = &mut self.uniforms;

        u.set(|u| &mut u.background, p.background_color.extend(transparent));
        u.set(
            |u| &mut u.lighting,
            Vec4::new(
                light.light_intensity,
                light.ambient_intensity,
                light.metalness,
                light.roughness,
            ),
        );
        u.set(
            |u| &mut u.material,
            Vec4::new(
                light.reflectivity,
                p.pick_threshold,
                p.interior_darkening,
                flag(p.interior_color_flag),
            ),
        );
        u.set(|u| &mut u.interior_color, p.interior_color.extend(1.0));
        u.set(|u| &mut u.highlight_color, p.highlight_color.extend(1.0));
        u.set(|u| &mut u.select_color, p.select_color.extend(1.0));
        u.set_clip_objects(&self.clip);
    }

    pub fn set_viewport(&mut self, device: &mut dyn GpuDevice, x: i32, y: i32, width: u32, height: u32) {
        let viewport = Viewport::new(x, y, width, height);
        if self.ctx.viewport == Some(viewport) {
            return;
        }
        device.set_viewport(viewport);
        self.ctx.viewport = Some(viewport);
        self.uniforms.set(|u| &mut u.viewport, viewport.as_vec4());
    }

    pub fn set_transparent_background(&mut self, transparent: bool) {
        self.ctx.transparent_background = transparent;
        self.uniforms.set(
            |u| &mut u.background,
            self.props.background_color.extend(flag(transparent)),
        );
    }

    pub fn set_drawing_buffer_size(&mut self, width: u32, height: u32) {
        let size = UVec2::new(width, height);
        self.ctx.drawing_buffer_size = size;
        let inv = Vec2::ONE / size.max(UVec2::ONE).as_vec2();
        self.uniforms.set(
            |u| &mut u.drawing_buffer_size,
            Vec4::new(width as f32, height as f32, inv.x, inv.y),
        );
    }

    /// Refreshes the camera-derived uniforms.
    pub fn update(&mut self, camera: &CameraView) {
        let u = &mut self.uniforms;
        u.set(|u| &mut u.view, camera.view);
        u.set(|u| &mut u.inv_view, camera.view.inverse());
        u.set(|u| &mut u.projection, camera.projection);
        u.set(|u| &mut u.inv_projection, camera.projection.inverse());
        u.set(
            |u| &mut u.camera_position,
            camera.position().extend(flag(camera.orthographic)),
        );
        u.set(|u| &mut u.camera_direction, camera.direction().extend(0.0));
        u.set(
            |u| &mut u.near_far,
            Vec4::new(camera.near, camera.far, camera.fog_near, camera.fog_far),
        );
        let offset = match camera.view_offset {
            Some(o) => Vec4::new(o.x, o.y, 1.0, 0.0),
            None => Vec4::ZERO,
        };
        u.set(|u| &mut u.view_offset, offset);
    }

    /// Clears color and depth of the bound target.
    ///
    /// The color is transparent black with a transparent background, the
    /// background color when `to_background_color`, and white otherwise.
    pub fn clear(&mut self, device: &mut dyn GpuDevice, to_background_color: bool) {
        let color = if self.ctx.transparent_background {
            Vec4::ZERO
        } else if to_background_color {
            self.props.background_color.extend(1.0)
        } else {
            Vec4::ONE
        };
        device.clear(ClearOp {
            color: Some(color),
            depth: Some(1.0),
        });
    }

    pub fn clear_depth(&mut self, device: &mut dyn GpuDevice) {
        device.clear(ClearOp {
            color: None,
            depth: Some(1.0),
        });
    }

    // ========================================================================
    // Passes
    // ========================================================================

    pub fn render_pick(
        &mut self,
        device: &mut dyn GpuDevice,
        group: &Group,
        camera: &CameraView,
        kind: PickKind,
        depth: Option<TextureId>,
    ) {
        self.update_internal(device, group, camera, depth, false);
        self.ctx.apply_state(device, PipelineState::OPAQUE);
        for d in group.iter() {
            if !d.has(DrawableFlags::COLOR_ONLY) {
                self.render_object(device, d, RenderVariant::Pick(kind), PipelineState::OPAQUE, depth);
            }
        }
    }

    pub fn render_depth(
        &mut self,
        device: &mut dyn GpuDevice,
        group: &Group,
        camera: &CameraView,
        depth: Option<TextureId>,
    ) {
        self.update_internal(device, group, camera, depth, false);
        self.ctx.apply_state(device, PipelineState::OPAQUE);
        for d in group.iter() {
            self.render_object(device, d, RenderVariant::Depth, PipelineState::OPAQUE, depth);
        }
    }

    pub fn render_blended_opaque(
        &mut self,
        device: &mut dyn GpuDevice,
        group: &Group,
        camera: &CameraView,
        depth: Option<TextureId>,
    ) {
        self.update_internal(device, group, camera, depth, false);
        self.ctx.apply_state(device, PipelineState::OPAQUE);
        for d in group.iter() {
            if d.has(DrawableFlags::OPAQUE) {
                self.render_object(device, d, RenderVariant::ColorBlended, PipelineState::OPAQUE, depth);
            }
        }
    }

    /// Depth-writing transparent drawables with the depth mask on, then the
    /// others with it off.
    pub fn render_blended_transparent(
        &mut self,
        device: &mut dyn GpuDevice,
        group: &Group,
        camera: &CameraView,
        depth: Option<TextureId>,
    ) {
        self.update_internal(device, group, camera, depth, false);
        let blended = PipelineState::OPAQUE.with_blend(self.blend_mode());

        let writing = blended.with_depth_write(true);
        self.ctx.apply_state(device, writing);
        for d in group.iter() {
            if !d.has(DrawableFlags::OPAQUE) && d.has(DrawableFlags::WRITE_DEPTH) {
                self.render_object(device, d, RenderVariant::ColorBlended, writing, depth);
            }
        }

        let masked = blended.with_depth_write(false);
        self.ctx.apply_state(device, masked);
        for d in group.iter() {
            if !d.has(DrawableFlags::OPAQUE) && !d.has(DrawableFlags::WRITE_DEPTH) {
                self.render_object(device, d, RenderVariant::ColorBlended, masked, depth);
            }
        }
    }

    /// Opaque then transparent drawables, without an external depth texture.
    pub fn render_blended(&mut self, device: &mut dyn GpuDevice, group: &Group, camera: &CameraView) {
        self.render_blended_opaque(device, group, camera, None);
        self.render_blended_transparent(device, group, camera, None);
    }

    pub fn render_blended_volume(
        &mut self,
        device: &mut dyn GpuDevice,
        group: &Group,
        camera: &CameraView,
        depth: Option<TextureId>,
    ) {
        self.update_internal(device, group, camera, depth, false);
        let base = PipelineState {
            cull: None,
            depth_test: true,
            depth_write: false,
            blend: self.blend_mode(),
            ..PipelineState::OPAQUE
        };
        self.ctx.apply_state(device, base);
        for d in group.iter() {
            if d.is_volumetric() {
                self.render_object(device, d, RenderVariant::ColorBlended, base, depth);
            }
        }
    }

    /// Draws the drawables selected by [`is_wboit_opaque`] with depth test
    /// and write. Background-override drawables never reach this phase; they
    /// are drawn by [`Renderer::render_wboit_transparent`].
    pub fn render_wboit_opaque(
        &mut self,
        device: &mut dyn GpuDevice,
        group: &Group,
        camera: &CameraView,
        depth: Option<TextureId>,
    ) {
        self.update_internal(device, group, camera, depth, false);
        self.ctx.apply_state(device, PipelineState::OPAQUE);
        for d in group.iter() {
            if is_wboit_opaque(d) {
                self.render_object(device, d, RenderVariant::ColorWboit, PipelineState::OPAQUE, depth);
            }
        }
    }

    /// Accumulates transparent drawables into the bound OIT target. Depth is
    /// tested in-shader against `depth`.
    pub fn render_wboit_transparent(
        &mut self,
        device: &mut dyn GpuDevice,
        group: &Group,
        camera: &CameraView,
        depth: Option<TextureId>,
    ) {
        self.update_internal(device, group, camera, depth, true);
        let base = PipelineState::WBOIT_ACCUMULATE;
        self.ctx.apply_state(device, base);
        for d in group.iter() {
            if is_wboit_transparent(d) {
                self.render_object(device, d, RenderVariant::ColorWboit, base, depth);
            }
        }
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn blend_mode(&self) -> BlendMode {
        if self.ctx.transparent_background {
            BlendMode::Premultiplied
        } else {
            BlendMode::SeparateAlpha
        }
    }

    /// Group- and pass-dependent uniforms; resets the pass context.
    fn update_internal(
        &mut self,
        device: &mut dyn GpuDevice,
        group: &Group,
        camera: &CameraView,
        depth: Option<TextureId>,
        render_wboit: bool,
    ) {
        let model = group.transform;
        let model_view = camera.view * model;
        let model_view_projection = camera.projection * model_view;

        let u = &mut self.uniforms;
        u.set(|u| &mut u.model, model);
        u.set(|u| &mut u.model_view, model_view);
        u.set(|u| &mut u.inv_model_view, model_view.inverse());
        u.set(|u| &mut u.model_view_projection, model_view_projection);
        u.set(
            |u| &mut u.inv_model_view_projection,
            model_view_projection.inverse(),
        );
        u.set(
            |u| &mut u.pass_flags,
            Vec4::new(flag(render_wboit), flag(depth.is_some()), 0.0, 0.0),
        );

        self.ctx.begin_pass(device.capabilities());
    }

    fn render_object(
        &mut self,
        device: &mut dyn GpuDevice,
        drawable: &Drawable,
        variant: RenderVariant,
        base: PipelineState,
        depth: Option<TextureId>,
    ) {
        if !drawable.has(DrawableFlags::VISIBLE) {
            return;
        }
        if variant.is_pick() && !drawable.has(DrawableFlags::PICKABLE) {
            return;
        }

        let program = drawable.programs.get(variant);
        self.sync_clip_defines(device, drawable);

        let state = rules::draw_state(base, drawable, variant, &self.ctx.caps);
        self.ctx.apply_state(device, state);
        self.ctx.use_program(device, program, self.uniforms.get());

        device.draw(&DrawCall {
            drawable: drawable.id,
            program,
            geometry: drawable.geometry,
            instance_count: drawable.instance_count,
            depth_texture: depth,
        });
    }

    fn sync_clip_defines(&mut self, device: &mut dyn GpuDevice, drawable: &Drawable) {
        let cached = self
            .clip_defines
            .get(&drawable.id)
            .copied()
            .unwrap_or(ClipDefines::NONE);
        let wanted = if drawable.has(DrawableFlags::NO_CLIP) {
            ClipDefines {
                object_count: 0,
                ..cached
            }
        } else {
            self.clip.defines()
        };
        if wanted == cached {
            return;
        }

        // Relinking keeps the program handle and its uniform binding, so
        // globals uploaded earlier in the pass stay valid.
        log::trace!("Relinking drawable {:?} with {:?}", drawable.id, wanted);
        device.relink(drawable.id, wanted);
        self.clip_defines.insert(drawable.id, wanted);
    }

    /// Drops cached per-drawable state of drawables no longer in the scene.
    pub fn retain_drawables(&mut self, mut keep: impl FnMut(DrawableId) -> bool) {
        self.clip_defines.retain(|id, _| keep(*id));
    }
}
