//! Point light consumed by the Phong and Blinn-Phong shading variants.

use glam::Vec3;

/// A point light with classic Phong terms.
///
/// `position` is in world space; the renderer moves it into view space
/// before it reaches the GPU.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Light {
    /// Light position in world space
    pub position: Vec3,
    pub ambient: Vec3,
    pub diffuse: Vec3,
    pub specular: Vec3,
    /// Constant, linear and quadratic attenuation factors.
    pub attenuation: Vec3,
    /// Specular exponent
    pub shininess: f32,
}

impl Default for Light {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 5.0, 5.0),
            ambient: Vec3::splat(0.1),
            diffuse: Vec3::splat(0.8),
            specular: Vec3::ONE,
            attenuation: Vec3::new(1.0, 0.09, 0.032),
            shininess: 32.0,
        }
    }
}

impl Light {
    /// Light at `position` with default colors and falloff.
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    /// Attenuation factor at `distance` from the light.
    pub fn attenuation_at(&self, distance: f32) -> f32 {
        let [constant, linear, quadratic] = self.attenuation.to_array();
        let denominator = constant + linear * distance + quadratic * distance * distance;
        if denominator > f32::EPSILON {
            1.0 / denominator
        } else {
            1.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attenuation_is_one_at_source_with_unit_constant() {
        let light = Light::default();
        assert_eq!(light.attenuation_at(0.0), 1.0);
        assert!(light.attenuation_at(10.0) < light.attenuation_at(1.0));
    }

    #[test]
    fn test_zero_attenuation_terms_do_not_divide_by_zero() {
        let light = Light {
            attenuation: Vec3::ZERO,
            ..Light::default()
        };
        assert_eq!(light.attenuation_at(3.0), 1.0);
    }
}
