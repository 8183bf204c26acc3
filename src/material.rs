use glam::Vec3;

/// Default portal inner color (`#cc00cc`).
pub fn default_portal_color_start() -> Vec3 {
    rgb(0xcc, 0x00, 0xcc)
}

/// Default portal outer color (`#df73ff`).
pub fn default_portal_color_end() -> Vec3 {
    rgb(0xdf, 0x73, 0xff)
}

/// Default renderer clear color (`#0c0218`).
pub fn default_clear_color() -> Vec3 {
    rgb(0x0c, 0x02, 0x18)
}

/// Fog color recovered from the authored scene (`#14020f`).
pub fn fog_color() -> Vec3 {
    rgb(0x14, 0x02, 0x0f)
}

/// Fog start distance.
pub const FOG_NEAR: f32 = 0.2;
/// Fog full-saturation distance.
pub const FOG_FAR: f32 = 10.0;

fn rgb(r: u8, g: u8, b: u8) -> Vec3 {
    Vec3::new(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0)
}

/// Uniform state for the animated portal surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PortalMaterial {
    pub time: f32,
    pub color_start: Vec3,
    pub color_end: Vec3,
}

impl Default for PortalMaterial {
    fn default() -> Self {
        Self {
            time: 0.0,
            color_start: default_portal_color_start(),
            color_end: default_portal_color_end(),
        }
    }
}

/// Uniform state for the firefly point field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FirefliesMaterial {
    pub time: f32,
    pub pixel_ratio: f32,
    pub point_size: f32,
}

impl Default for FirefliesMaterial {
    fn default() -> Self {
        Self {
            time: 0.0,
            pixel_ratio: 1.0,
            point_size: 100.0,
        }
    }
}

/// The scene's two time-animated shader materials.
///
/// `advance` is the single write point for their time uniforms; the frame
/// loop calls it exactly once per frame, after sampling the clock and
/// before the draw is issued.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SceneMaterials {
    pub portal: PortalMaterial,
    pub fireflies: FirefliesMaterial,
}

impl SceneMaterials {
    /// Writes the sampled elapsed time into both shader materials.
    pub fn advance(&mut self, elapsed: f32) {
        self.portal.time = elapsed;
        self.fireflies.time = elapsed;
    }

    /// Updates the pixel-ratio uniform the fireflies shader sizes points by.
    pub fn set_pixel_ratio(&mut self, pixel_ratio: f32) {
        self.fireflies.pixel_ratio = pixel_ratio;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_writes_both_time_uniforms() {
        let mut materials = SceneMaterials::default();
        materials.advance(1.25);
        assert_eq!(materials.portal.time, 1.25);
        assert_eq!(materials.fireflies.time, 1.25);
    }

    #[test]
    fn advance_leaves_other_uniforms_untouched() {
        let mut materials = SceneMaterials::default();
        let colors = (materials.portal.color_start, materials.portal.color_end);
        let size = materials.fireflies.point_size;
        materials.advance(42.0);
        assert_eq!(
            colors,
            (materials.portal.color_start, materials.portal.color_end)
        );
        assert_eq!(size, materials.fireflies.point_size);
    }

    #[test]
    fn default_palette_matches_authored_colors() {
        let portal = PortalMaterial::default();
        assert!((portal.color_start.x - 0.8).abs() < 0.01);
        assert_eq!(portal.color_start.y, 0.0);
        let fireflies = FirefliesMaterial::default();
        assert_eq!(fireflies.point_size, 100.0);
    }
}
