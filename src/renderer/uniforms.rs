//! Global uniform block shared by every drawable program.
//!
//! [`GlobalUniforms`] is the GPU layout (`#[repr(C)]`, only `Mat4`/`Vec4`
//! members, so there is no padding). [`GlobalUniformState`] owns one copy and
//! exposes change-checked writes: a write of an equal value is dropped and does
//! not bump the version.
//!
//! # Layout
//!
//! | Member                 | Content                                            |
//! |------------------------|----------------------------------------------------|
//! | `viewport`             | x, y, width, height                                |
//! | `drawing_buffer_size`  | width, height, 1/width, 1/height                   |
//! | `view_offset`          | x, y, enabled, 0                                   |
//! | `camera_position`      | xyz, orthographic                                  |
//! | `camera_direction`     | xyz, 0                                             |
//! | `near_far`             | near, far, fog near, fog far                       |
//! | `background`           | rgb, transparent background                        |
//! | `lighting`             | light, ambient, metalness, roughness               |
//! | `material`             | reflectivity, pick threshold, interior darkening, interior color flag |
//! | `pass_flags`           | render WBOIT, has depth texture, 0, 0              |
//! | `clip_params`          | object count, variant id, 0, 0                     |
//! | `clip_positions[i]`    | xyz, kind id                                       |

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec4};

use super::clip::{ClipObjects, MAX_CLIP_OBJECTS};

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GlobalUniforms {
    pub model: Mat4,
    pub view: Mat4,
    pub inv_view: Mat4,
    pub model_view: Mat4,
    pub inv_model_view: Mat4,
    pub projection: Mat4,
    pub inv_projection: Mat4,
    pub model_view_projection: Mat4,
    pub inv_model_view_projection: Mat4,

    pub viewport: Vec4,
    pub drawing_buffer_size: Vec4,
    pub view_offset: Vec4,
    pub camera_position: Vec4,
    pub camera_direction: Vec4,
    pub near_far: Vec4,

    pub background: Vec4,
    pub lighting: Vec4,
    pub material: Vec4,
    pub interior_color: Vec4,
    pub highlight_color: Vec4,
    pub select_color: Vec4,

    pub pass_flags: Vec4,

    pub clip_params: Vec4,
    pub clip_positions: [Vec4; MAX_CLIP_OBJECTS],
    pub clip_rotations: [Vec4; MAX_CLIP_OBJECTS],
    pub clip_scales: [Vec4; MAX_CLIP_OBJECTS],
}

impl Default for GlobalUniforms {
    fn default() -> Self {
        Self {
            model: Mat4::IDENTITY,
            view: Mat4::IDENTITY,
            inv_view: Mat4::IDENTITY,
            model_view: Mat4::IDENTITY,
            inv_model_view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            inv_projection: Mat4::IDENTITY,
            model_view_projection: Mat4::IDENTITY,
            inv_model_view_projection: Mat4::IDENTITY,
            clip_rotations: [Vec4::W; MAX_CLIP_OBJECTS],
            clip_scales: [Vec4::new(1.0, 1.0, 1.0, 0.0); MAX_CLIP_OBJECTS],
            ..Self::zeroed()
        }
    }
}

/// Byte size of the uniform block.
pub const GLOBAL_UNIFORMS_SIZE: u64 = std::mem::size_of::<GlobalUniforms>() as u64;

#[inline]
pub(crate) fn flag(value: bool) -> f32 {
    if value { 1.0 } else { 0.0 }
}

/// Owned uniform block with change tracking.
#[derive(Debug, Clone, Default)]
pub struct GlobalUniformState {
    data: GlobalUniforms,
    version: u64,
}

impl GlobalUniformState {
    #[inline]
    #[must_use]
    pub fn get(&self) -> &GlobalUniforms {
        &self.data
    }

    /// Incremented by every write that changed a value.
    #[inline]
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Writes `value` into the slot selected by `slot` if it differs.
    ///
    /// Returns whether the block changed.
    pub fn set<T, F>(&mut self, slot: F, value: T) -> bool
    where
        T: PartialEq,
        F: FnOnce(&mut GlobalUniforms) -> &mut T,
    {
        let target = slot(&mut self.data);
        if *target == value {
            return false;
        }
        *target = value;
        self.version = self.version.wrapping_add(1);
        true
    }

    /// Writes the clip set. Only the first `count` slots are compared and
    /// written; the rest keep their previous contents.
    pub fn set_clip_objects(&mut self, clip: &ClipObjects) -> bool {
        let mut changed = self.set(
            |u| &mut u.clip_params,
            Vec4::new(clip.count as f32, clip.variant.id() as f32, 0.0, 0.0),
        );
        for i in 0..clip.count {
            changed |= self.set(
                |u| &mut u.clip_positions[i],
                clip.positions[i].extend(clip.kinds[i].id() as f32),
            );
            changed |= self.set(|u| &mut u.clip_rotations[i], Vec4::from(clip.rotations[i]));
            changed |= self.set(|u| &mut u.clip_scales[i], clip.scales[i].extend(0.0));
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_is_padding_free() {
        assert_eq!(GLOBAL_UNIFORMS_SIZE % 16, 0);
        assert_eq!(
            GLOBAL_UNIFORMS_SIZE as usize,
            9 * 64 + 14 * 16 + 3 * MAX_CLIP_OBJECTS * 16
        );
    }

    #[test]
    fn equal_writes_keep_version() {
        let mut state = GlobalUniformState::default();
        assert!(state.set(|u| &mut u.viewport, Vec4::new(0.0, 0.0, 10.0, 10.0)));
        let version = state.version();
        assert!(!state.set(|u| &mut u.viewport, Vec4::new(0.0, 0.0, 10.0, 10.0)));
        assert_eq!(state.version(), version);
        assert!(state.set(|u| &mut u.view, Mat4::from_scale(glam::Vec3::splat(2.0))));
        assert_eq!(state.version(), version + 1);
    }
}
