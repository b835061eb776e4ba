//! Clip objects.
//!
//! Up to [`MAX_CLIP_OBJECTS`] geometric volumes cut away fragments of every
//! drawable that does not opt out with `NO_CLIP`. The configuration is kept in
//! user-facing form ([`ClipObject`], rotation as axis + angle) and packed into
//! [`ClipObjects`] (rotation as quaternion) for the global uniforms.

use glam::{Quat, Vec3};

use crate::errors::{LuminaError, Result};

/// Capacity of the clip object array in the global uniforms.
pub const MAX_CLIP_OBJECTS: usize = 5;

/// Where the clip test runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ClipVariant {
    /// Whole instances are discarded by their origin.
    #[default]
    Instance,
    /// Fragments are discarded individually.
    Pixel,
}

impl ClipVariant {
    #[must_use]
    pub fn id(self) -> u32 {
        match self {
            Self::Instance => 0,
            Self::Pixel => 1,
        }
    }
}

/// Clip volume shape. The numeric id is what shaders see.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ClipObjectKind {
    #[default]
    None,
    Plane,
    Sphere,
    Cube,
    Cylinder,
    InfiniteCone,
}

impl ClipObjectKind {
    #[must_use]
    pub fn id(self) -> u32 {
        match self {
            Self::None => 0,
            Self::Plane => 1,
            Self::Sphere => 2,
            Self::Cube => 3,
            Self::Cylinder => 4,
            Self::InfiniteCone => 5,
        }
    }
}

/// Rotation given as an axis and an angle in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisAngle {
    pub axis: Vec3,
    pub angle: f32,
}

impl Default for AxisAngle {
    fn default() -> Self {
        Self {
            axis: Vec3::X,
            angle: 0.0,
        }
    }
}

impl AxisAngle {
    #[must_use]
    pub fn to_quat(self) -> Quat {
        let axis = self.axis.normalize_or_zero();
        if axis == Vec3::ZERO {
            return Quat::IDENTITY;
        }
        Quat::from_axis_angle(axis, self.angle.to_radians())
    }
}

/// One configured clip volume.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipObject {
    pub kind: ClipObjectKind,
    pub position: Vec3,
    pub rotation: AxisAngle,
    pub scale: Vec3,
}

impl Default for ClipObject {
    fn default() -> Self {
        Self {
            kind: ClipObjectKind::Plane,
            position: Vec3::ZERO,
            rotation: AxisAngle::default(),
            scale: Vec3::ONE,
        }
    }
}

/// Clip configuration as exposed through the renderer props.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClipConfig {
    pub variant: ClipVariant,
    pub objects: Vec<ClipObject>,
}

/// Clip-related program defines of a drawable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ClipDefines {
    pub object_count: u32,
    pub variant: ClipVariant,
}

impl ClipDefines {
    /// Clipping disabled.
    pub const NONE: Self = Self {
        object_count: 0,
        variant: ClipVariant::Instance,
    };
}

/// Packed clip object set.
///
/// Slots at or beyond `count` keep whatever a previous configuration left in
/// them; shaders never read past `count`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipObjects {
    pub count: usize,
    pub variant: ClipVariant,
    pub kinds: [ClipObjectKind; MAX_CLIP_OBJECTS],
    pub positions: [Vec3; MAX_CLIP_OBJECTS],
    pub rotations: [Quat; MAX_CLIP_OBJECTS],
    pub scales: [Vec3; MAX_CLIP_OBJECTS],
}

impl Default for ClipObjects {
    fn default() -> Self {
        Self {
            count: 0,
            variant: ClipVariant::Instance,
            kinds: [ClipObjectKind::None; MAX_CLIP_OBJECTS],
            positions: [Vec3::ZERO; MAX_CLIP_OBJECTS],
            rotations: [Quat::IDENTITY; MAX_CLIP_OBJECTS],
            scales: [Vec3::ONE; MAX_CLIP_OBJECTS],
        }
    }
}

impl ClipObjects {
    /// Rebuilds the set from `config`.
    pub fn rebuild(&mut self, config: &ClipConfig) -> Result<()> {
        let count = config.objects.len();
        if count > MAX_CLIP_OBJECTS {
            return Err(LuminaError::TooManyClipObjects {
                count,
                max: MAX_CLIP_OBJECTS,
            });
        }

        self.count = count;
        self.variant = config.variant;
        for (i, object) in config.objects.iter().enumerate() {
            self.kinds[i] = object.kind;
            self.positions[i] = object.position;
            self.rotations[i] = object.rotation.to_quat();
            self.scales[i] = object.scale;
        }
        Ok(())
    }

    #[must_use]
    pub fn defines(&self) -> ClipDefines {
        ClipDefines {
            object_count: self.count as u32,
            variant: self.variant,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sphere(x: f32) -> ClipObject {
        ClipObject {
            kind: ClipObjectKind::Sphere,
            position: Vec3::new(x, 0.0, 0.0),
            ..Default::default()
        }
    }

    #[test]
    fn rebuild_keeps_stale_slots() {
        let mut set = ClipObjects::default();
        set.rebuild(&ClipConfig {
            variant: ClipVariant::Pixel,
            objects: vec![sphere(1.0), sphere(2.0), sphere(3.0)],
        })
        .unwrap();
        assert_eq!(set.count, 3);

        set.rebuild(&ClipConfig {
            variant: ClipVariant::Instance,
            objects: vec![sphere(9.0)],
        })
        .unwrap();
        assert_eq!(set.count, 1);
        assert_eq!(set.positions[0].x, 9.0);
        assert_eq!(set.positions[2].x, 3.0);
        assert_eq!(set.defines(), ClipDefines {
            object_count: 1,
            variant: ClipVariant::Instance,
        });
    }

    #[test]
    fn too_many_objects_is_an_error() {
        let mut set = ClipObjects::default();
        let config = ClipConfig {
            variant: ClipVariant::Instance,
            objects: vec![sphere(0.0); MAX_CLIP_OBJECTS + 1],
        };
        assert!(matches!(
            set.rebuild(&config),
            Err(LuminaError::TooManyClipObjects { count: 6, max: 5 })
        ));
        assert_eq!(set.count, 0);
    }

    #[test]
    fn axis_angle_to_quaternion() {
        let q = AxisAngle {
            axis: Vec3::new(0.0, 0.0, 2.0),
            angle: 90.0,
        }
        .to_quat();
        let v = q * Vec3::X;
        assert!((v - Vec3::Y).length() < 1e-5);
        assert_eq!(
            AxisAngle {
                axis: Vec3::ZERO,
                angle: 45.0
            }
            .to_quat(),
            Quat::IDENTITY
        );
    }
}
