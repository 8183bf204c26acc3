use parking_lot::RwLock;

/// Device pixel ratios above this add cost without visible benefit.
pub const MAX_PIXEL_RATIO: f32 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq)]
struct ViewportState {
    width: u32,
    height: u32,
    scale_factor: f64,
}

/// Shared viewport state, mutated by resize events and read by the camera
/// projection and the fireflies pixel-ratio uniform.
#[derive(Debug)]
pub struct Viewport {
    state: RwLock<ViewportState>,
}

impl Viewport {
    pub fn new(width: u32, height: u32, scale_factor: f64) -> Self {
        Self {
            state: RwLock::new(ViewportState {
                width: width.max(1),
                height: height.max(1),
                scale_factor,
            }),
        }
    }

    /// Records new pixel dimensions. Idempotent for repeated sizes.
    pub fn resize(&self, width: u32, height: u32) {
        let mut state = self.state.write();
        state.width = width.max(1);
        state.height = height.max(1);
    }

    pub fn set_scale_factor(&self, scale_factor: f64) {
        self.state.write().scale_factor = scale_factor;
    }

    pub fn size(&self) -> (u32, u32) {
        let state = self.state.read();
        (state.width, state.height)
    }

    pub fn aspect(&self) -> f32 {
        let state = self.state.read();
        state.width as f32 / state.height.max(1) as f32
    }

    /// Device pixel ratio clamped to [`MAX_PIXEL_RATIO`].
    pub fn pixel_ratio(&self) -> f32 {
        (self.state.read().scale_factor as f32).min(MAX_PIXEL_RATIO)
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1280, 720, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resize_is_idempotent() {
        let viewport = Viewport::default();
        viewport.resize(800, 600);
        let first = (viewport.size(), viewport.aspect(), viewport.pixel_ratio());
        viewport.resize(800, 600);
        let second = (viewport.size(), viewport.aspect(), viewport.pixel_ratio());
        assert_eq!(first, second);
    }

    #[test]
    fn pixel_ratio_clamps_to_two() {
        let viewport = Viewport::new(1920, 1080, 3.0);
        assert_eq!(viewport.pixel_ratio(), 2.0);
        viewport.set_scale_factor(1.5);
        assert_eq!(viewport.pixel_ratio(), 1.5);
    }

    #[test]
    fn zero_dimensions_are_guarded() {
        let viewport = Viewport::default();
        viewport.resize(0, 0);
        assert_eq!(viewport.size(), (1, 1));
        assert!(viewport.aspect().is_finite());
    }
}
