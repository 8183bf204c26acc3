use rand::Rng;

/// Number of fireflies in the ambient field.
pub const FIREFLY_COUNT: usize = 40;

/// Horizontal (x/z) half-extent of the spawn volume.
const SPREAD: f32 = 4.0;
/// Lower bound of the vertical spawn range.
const HEIGHT_MIN: f32 = 0.5;
/// Size of the vertical spawn range.
const HEIGHT_SPAN: f32 = 1.8;

/// Immutable particle buffers for the firefly field.
///
/// Generated once at startup; positions are triple-packed, scales are a
/// parallel per-particle sequence. The scale buffer is independent data,
/// never an alias of the position array.
#[derive(Debug, Clone, PartialEq)]
pub struct FireflyField {
    pub positions: Vec<f32>,
    pub scales: Vec<f32>,
}

impl FireflyField {
    /// Generates `count` particles from the provided random source.
    ///
    /// x and z are uniform in [-2, 2), y uniform in [0.5, 2.3), scale
    /// uniform in [0, 1). No input can be invalid.
    pub fn generate<R: Rng>(count: usize, rng: &mut R) -> Self {
        let mut positions = Vec::with_capacity(count * 3);
        let mut scales = Vec::with_capacity(count);

        for _ in 0..count {
            positions.push((rng.gen::<f32>() - 0.5) * SPREAD);
            positions.push(rng.gen::<f32>() * HEIGHT_SPAN + HEIGHT_MIN);
            positions.push((rng.gen::<f32>() - 0.5) * SPREAD);
            scales.push(rng.gen::<f32>());
        }

        Self { positions, scales }
    }

    /// Generates the default field from the thread-local random source.
    pub fn spawn() -> Self {
        Self::generate(FIREFLY_COUNT, &mut rand::thread_rng())
    }

    pub fn len(&self) -> usize {
        self.scales.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scales.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn buffers_have_parallel_lengths() {
        let mut rng = SmallRng::seed_from_u64(7);
        let field = FireflyField::generate(FIREFLY_COUNT, &mut rng);
        assert_eq!(field.positions.len(), FIREFLY_COUNT * 3);
        assert_eq!(field.scales.len(), FIREFLY_COUNT);
        assert_eq!(field.len(), FIREFLY_COUNT);
    }

    #[test]
    fn ordinates_stay_in_spawn_volume() {
        let mut rng = SmallRng::seed_from_u64(99);
        let field = FireflyField::generate(1000, &mut rng);
        for chunk in field.positions.chunks_exact(3) {
            assert!((-2.0..2.0).contains(&chunk[0]), "x out of range: {}", chunk[0]);
            assert!((0.5..2.3).contains(&chunk[1]), "y out of range: {}", chunk[1]);
            assert!((-2.0..2.0).contains(&chunk[2]), "z out of range: {}", chunk[2]);
        }
        for scale in &field.scales {
            assert!((0.0..1.0).contains(scale), "scale out of range: {scale}");
        }
    }

    #[test]
    fn scales_are_not_aliased_onto_positions() {
        let mut rng = SmallRng::seed_from_u64(3);
        let field = FireflyField::generate(FIREFLY_COUNT, &mut rng);
        // The x ordinates span [-2, 2); scales live in [0, 1). If the scale
        // buffer were read from the position array they would match.
        let xs: Vec<f32> = field.positions.iter().step_by(3).copied().collect();
        assert_ne!(xs, field.scales);
    }

    #[test]
    fn zero_count_yields_empty_buffers() {
        let mut rng = SmallRng::seed_from_u64(1);
        let field = FireflyField::generate(0, &mut rng);
        assert!(field.is_empty());
        assert!(field.positions.is_empty());
    }
}
