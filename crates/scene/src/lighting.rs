//! Camera-relative light rig.
//!
//! All positions and directions here are in view space: the rig rides with
//! the camera every frame, so lighting stays constant on screen no matter
//! how the model or the orbit spins. Intensities and placements match the
//! showcase's studio setup: a soft ambient wash, a key and a fill
//! directional, and a point light straight out of the lens.

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmbientLight {
    pub color: [f32; 3],
    pub intensity: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalLight {
    /// View-space position the light shines from, toward the origin.
    pub position: [f32; 3],
    pub intensity: f32,
}

impl DirectionalLight {
    /// Normalized view-space direction from surface toward the light.
    pub fn direction(&self) -> [f32; 3] {
        let [x, y, z] = self.position;
        let n = (x * x + y * y + z * z).sqrt();
        if n > 1e-10 {
            [x / n, y / n, z / n]
        } else {
            [0.0, 0.0, 1.0]
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLight {
    /// View-space position.
    pub position: [f32; 3],
    pub intensity: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightRig {
    pub ambient: AmbientLight,
    pub key: DirectionalLight,
    pub fill: DirectionalLight,
    pub point: PointLight,
}

impl Default for LightRig {
    fn default() -> Self {
        Self {
            ambient: AmbientLight {
                color: [1.0, 1.0, 1.0],
                intensity: 0.8,
            },
            key: DirectionalLight {
                position: [0.0, 10.0, 10.0],
                intensity: 1.2,
            },
            fill: DirectionalLight {
                position: [-10.0, 5.0, -10.0],
                intensity: 0.8,
            },
            point: PointLight {
                position: [0.0, 0.0, 10.0],
                intensity: 0.7,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_rig_matches_studio_setup() {
        let rig = LightRig::default();
        assert_eq!(rig.ambient.intensity, 0.8);
        assert_eq!(rig.key.intensity, 1.2);
        assert_eq!(rig.fill.intensity, 0.8);
        assert_eq!(rig.point.intensity, 0.7);
        assert_eq!(rig.point.position, [0.0, 0.0, 10.0]);
    }

    #[test]
    fn directional_direction_is_unit_length() {
        let rig = LightRig::default();
        let d = rig.key.direction();
        let len = (d[0] * d[0] + d[1] * d[1] + d[2] * d[2]).sqrt();
        assert!((len - 1.0).abs() < 1e-6);
    }
}
