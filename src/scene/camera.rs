use glam::{Mat4, Vec2, Vec3};

use crate::device::Viewport;

/// A fully computed camera view, produced by the camera controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraView {
    pub view: Mat4,
    pub projection: Mat4,
    pub viewport: Viewport,
    pub near: f32,
    pub far: f32,
    pub fog_near: f32,
    pub fog_far: f32,
    pub orthographic: bool,
    /// Sub-pixel offset of the projection, used for supersampling.
    pub view_offset: Option<Vec2>,
}

impl CameraView {
    /// Perspective camera at `eye` looking at `target` (Y up).
    #[must_use]
    pub fn perspective(
        eye: Vec3,
        target: Vec3,
        fov_y_degrees: f32,
        viewport: Viewport,
        near: f32,
        far: f32,
    ) -> Self {
        let aspect = viewport.width.max(1) as f32 / viewport.height.max(1) as f32;
        Self {
            view: Mat4::look_at_rh(eye, target, Vec3::Y),
            projection: Mat4::perspective_rh(fov_y_degrees.to_radians(), aspect, near, far),
            viewport,
            near,
            far,
            fog_near: near,
            fog_far: far,
            orthographic: false,
            view_offset: None,
        }
    }

    /// Orthographic camera with a vertical extent of `2 * half_height`.
    #[must_use]
    pub fn orthographic(
        view: Mat4,
        half_height: f32,
        viewport: Viewport,
        near: f32,
        far: f32,
    ) -> Self {
        let aspect = viewport.width.max(1) as f32 / viewport.height.max(1) as f32;
        let half_width = half_height * aspect;
        Self {
            view,
            projection: Mat4::orthographic_rh(
                -half_width,
                half_width,
                -half_height,
                half_height,
                near,
                far,
            ),
            viewport,
            near,
            far,
            fog_near: near,
            fog_far: far,
            orthographic: true,
            view_offset: None,
        }
    }

    /// World-space camera position.
    #[must_use]
    pub fn position(&self) -> Vec3 {
        self.view.inverse().w_axis.truncate()
    }

    /// World-space viewing direction (normalized).
    #[must_use]
    pub fn direction(&self) -> Vec3 {
        -self.view.inverse().z_axis.truncate().normalize_or_zero()
    }

    #[must_use]
    pub fn with_view_offset(mut self, offset: Vec2) -> Self {
        self.view_offset = Some(offset);
        self
    }
}

/// Camera rendered by a draw pass: one view, or a left/right stereo pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Camera {
    Mono(CameraView),
    Stereo {
        left: CameraView,
        right: CameraView,
    },
}

impl Camera {
    /// Views in render order (left eye first for stereo).
    #[must_use]
    pub fn eyes(&self) -> smallvec::SmallVec<[&CameraView; 2]> {
        match self {
            Self::Mono(view) => smallvec::smallvec![view],
            Self::Stereo { left, right } => smallvec::smallvec![left, right],
        }
    }

    #[must_use]
    pub fn is_stereo(&self) -> bool {
        matches!(self, Self::Stereo { .. })
    }
}

impl From<CameraView> for Camera {
    fn from(view: CameraView) -> Self {
        Self::Mono(view)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-5;

    #[test]
    fn position_and_direction_from_view() {
        let view = CameraView::perspective(
            Vec3::new(0.0, 0.0, 10.0),
            Vec3::ZERO,
            45.0,
            Viewport::new(0, 0, 100, 100),
            0.1,
            100.0,
        );
        assert!((view.position() - Vec3::new(0.0, 0.0, 10.0)).length() < EPSILON);
        assert!((view.direction() - Vec3::NEG_Z).length() < EPSILON);
    }

    #[test]
    fn stereo_eyes_are_left_then_right() {
        let mut left = CameraView::perspective(
            Vec3::new(-1.0, 0.0, 10.0),
            Vec3::ZERO,
            45.0,
            Viewport::new(0, 0, 50, 100),
            0.1,
            100.0,
        );
        left.near = 0.5;
        let right = CameraView { near: 0.7, ..left };
        let camera = Camera::Stereo { left, right };
        let eyes = camera.eyes();
        assert_eq!(eyes.len(), 2);
        assert_eq!(eyes[0].near, 0.5);
        assert_eq!(eyes[1].near, 0.7);
    }
}
