//! Runtime renderer configuration.

use glam::Vec3;

use super::clip::ClipConfig;

/// Parameters of the empirical lighting model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightingParams {
    pub light_intensity: f32,
    pub ambient_intensity: f32,
    pub metalness: f32,
    pub roughness: f32,
    pub reflectivity: f32,
}

/// Named lighting presets.
///
/// | Style      | Light | Ambient | Metalness | Roughness | Reflectivity |
/// |------------|-------|---------|-----------|-----------|--------------|
/// | `Flat`     | 0.0   | 1.0     | 0.0       | 0.4       | 0.5          |
/// | `Matte`    | 0.6   | 0.4     | 0.0       | 1.0       | 0.5          |
/// | `Glossy`   | 0.6   | 0.4     | 0.0       | 0.4       | 0.5          |
/// | `Metallic` | 0.6   | 0.4     | 0.4       | 0.6       | 0.5          |
/// | `Plastic`  | 0.6   | 0.4     | 0.1       | 0.2       | 0.5          |
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum LightingStyle {
    Flat,
    #[default]
    Matte,
    Glossy,
    Metallic,
    Plastic,
    Custom(LightingParams),
}

impl LightingStyle {
    #[must_use]
    pub fn params(self) -> LightingParams {
        let (light_intensity, ambient_intensity, metalness, roughness, reflectivity) = match self {
            Self::Flat => (0.0, 1.0, 0.0, 0.4, 0.5),
            Self::Matte => (0.6, 0.4, 0.0, 1.0, 0.5),
            Self::Glossy => (0.6, 0.4, 0.0, 0.4, 0.5),
            Self::Metallic => (0.6, 0.4, 0.4, 0.6, 0.5),
            Self::Plastic => (0.6, 0.4, 0.1, 0.2, 0.5),
            Self::Custom(params) => return params,
        };
        LightingParams {
            light_intensity,
            ambient_intensity,
            metalness,
            roughness,
            reflectivity,
        }
    }
}

/// Renderer configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct RendererProps {
    pub background_color: Vec3,
    /// Minimum alpha for a fragment to be written into pick buffers.
    pub pick_threshold: f32,
    pub interior_darkening: f32,
    pub interior_color_flag: bool,
    pub interior_color: Vec3,
    pub highlight_color: Vec3,
    pub select_color: Vec3,
    pub style: LightingStyle,
    pub clip: ClipConfig,
}

impl Default for RendererProps {
    fn default() -> Self {
        Self {
            background_color: Vec3::ONE,
            pick_threshold: 0.5,
            interior_darkening: 0.5,
            interior_color_flag: true,
            interior_color: Vec3::splat(0.3),
            highlight_color: Vec3::new(1.0, 0.4, 0.6),
            select_color: Vec3::new(0.2, 1.0, 0.1),
            style: LightingStyle::default(),
            clip: ClipConfig::default(),
        }
    }
}

/// Partial update of [`RendererProps`]; `None` leaves a value untouched.
#[derive(Debug, Clone, Default)]
pub struct RendererPropsUpdate {
    pub background_color: Option<Vec3>,
    pub pick_threshold: Option<f32>,
    pub interior_darkening: Option<f32>,
    pub interior_color_flag: Option<bool>,
    pub interior_color: Option<Vec3>,
    pub highlight_color: Option<Vec3>,
    pub select_color: Option<Vec3>,
    pub style: Option<LightingStyle>,
    pub clip: Option<ClipConfig>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets() {
        let p = LightingStyle::Metallic.params();
        assert_eq!(
            (p.light_intensity, p.ambient_intensity, p.metalness, p.roughness, p.reflectivity),
            (0.6, 0.4, 0.4, 0.6, 0.5)
        );
        assert_eq!(LightingStyle::Flat.params().ambient_intensity, 1.0);

        let custom = LightingParams {
            light_intensity: 0.1,
            ambient_intensity: 0.2,
            metalness: 0.3,
            roughness: 0.4,
            reflectivity: 0.9,
        };
        assert_eq!(LightingStyle::Custom(custom).params(), custom);
    }

    #[test]
    fn defaults() {
        let props = RendererProps::default();
        assert_eq!(props.style, LightingStyle::Matte);
        assert_eq!(props.pick_threshold, 0.5);
        assert!(props.clip.objects.is_empty());
    }
}
