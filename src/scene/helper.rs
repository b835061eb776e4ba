use glam::{Mat4, Vec3};

use super::{CameraView, Group};
use crate::device::Viewport;

/// A toggleable overlay scene.
#[derive(Debug, Clone, Default)]
pub struct HelperScene {
    pub enabled: bool,
    pub group: Group,
}

impl HelperScene {
    #[must_use]
    pub fn new(group: Group) -> Self {
        Self {
            enabled: true,
            group,
        }
    }

    /// Enabled and non-empty.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.enabled && !self.group.is_empty()
    }
}

/// Orientation gizmo drawn in a corner with its own orthographic camera.
#[derive(Debug, Clone)]
pub struct CameraHelper {
    pub scene: HelperScene,
    /// Edge length of the corner viewport in logical pixels.
    pub size: u32,
    /// Distance to the viewport corner in logical pixels.
    pub margin: u32,
}

impl Default for CameraHelper {
    fn default() -> Self {
        Self {
            scene: HelperScene::default(),
            size: 128,
            margin: 8,
        }
    }
}

impl CameraHelper {
    const DISTANCE: f32 = 4.0;
    const HALF_EXTENT: f32 = 1.5;

    /// Camera that shows the gizmo with the rotation of `main`, in the lower
    /// left corner of the main viewport.
    #[must_use]
    pub fn camera_for(&self, main: &CameraView, pixel_ratio: f32) -> CameraView {
        let size = (self.size as f32 * pixel_ratio).round() as u32;
        let margin = (self.margin as f32 * pixel_ratio).round() as i32;
        let viewport = Viewport::new(
            main.viewport.x + margin,
            main.viewport.y + margin,
            size,
            size,
        );

        // Keep the rotation, drop the translation, and look from a fixed
        // distance.
        let mut rotation = main.view;
        rotation.w_axis = glam::Vec4::W;
        let view = Mat4::from_translation(Vec3::new(0.0, 0.0, -Self::DISTANCE)) * rotation;

        CameraView::orthographic(
            view,
            Self::HALF_EXTENT,
            viewport,
            0.1,
            Self::DISTANCE * 2.0,
        )
    }
}

/// Overlays rendered on top of the main scene.
#[derive(Debug, Clone, Default)]
pub struct HelperOverlay {
    pub debug: HelperScene,
    pub handle: HelperScene,
    pub camera: CameraHelper,
}
