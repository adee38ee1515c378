//! # Terrain Generator
//!
//! Synthesizes rectangular heightmaps from a [`NoiseField`].
//!
//! ## Algorithm
//!
//! Every sample is a sum of octaves:
//!
//! ```text
//! h(x, y) = Σ persistence^o * (N(2^o * nx, 2^o * ny) + 1) / 2     o = 0..octaves
//! nx = (x + offset_x) / width
//! ny = (y + offset_y) / height
//! ```
//!
//! Offsets turn a grid into a window of one continuous field, so callers can
//! generate neighbouring regions that tile without seams.
//!
//! ## Parallelism
//!
//! ```text
//!  column queue ──┬──> worker 0 ──┐
//!  (x, &mut col)  ├──> worker 1 ──┼──> completion channel ──> barrier ──> normalize
//!                 └──> worker N ──┘        (one msg per column)
//! ```
//!
//! Each column is an independent task that writes only its own slice of the
//! output grid. Normalization needs the extrema of the whole grid, so it runs
//! only after every column has reported completion.
//!
//! ## Output Layout
//!
//! Column-major: all `height` samples of column 0 in increasing y, then
//! column 1, and so on. Clients rebuild the 2D grid from this order.

use std::num::NonZeroUsize;
use std::thread;

use crossbeam_channel::bounded;
use serde::{Deserialize, Serialize};

use crate::error::{GeneratorError, GeneratorResult};
use crate::noise::{NoiseField, SimplexNoise, WorldSeed};

/// Tunable parameters of a [`TerrainGenerator`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorConfig {
    /// Number of octaves summed per sample (at least 1).
    pub octaves: u32,
    /// Amplitude decay per octave, in `(0, 1]`.
    pub persistence: f64,
    /// Final multiplier applied to every sample.
    pub scale_factor: f64,
    /// Rescale the grid into `[0, 1]` before scaling.
    pub normalize: bool,
    /// Fixed seed. `None` picks a time-derived seed at construction.
    pub seed: Option<i64>,
    /// Emit a trace event per noise evaluation.
    pub debug: bool,
    /// Worker threads per generation. `None` uses the available parallelism.
    pub workers: Option<usize>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            octaves: 7,
            persistence: 0.8,
            scale_factor: 1.0,
            normalize: true,
            seed: None,
            debug: false,
            workers: None,
        }
    }
}

impl GeneratorConfig {
    /// Checks every parameter range.
    ///
    /// # Errors
    ///
    /// Returns [`GeneratorError::InvalidConfig`] naming the first bad field.
    pub fn validate(&self) -> GeneratorResult<()> {
        if self.octaves == 0 {
            return Err(GeneratorError::InvalidConfig("octaves must be at least 1".into()));
        }
        if !(self.persistence > 0.0 && self.persistence <= 1.0) {
            return Err(GeneratorError::InvalidConfig(format!(
                "persistence must be in (0, 1], got {}",
                self.persistence
            )));
        }
        if !self.scale_factor.is_finite() {
            return Err(GeneratorError::InvalidConfig(format!(
                "scale_factor must be finite, got {}",
                self.scale_factor
            )));
        }
        if self.workers == Some(0) {
            return Err(GeneratorError::InvalidConfig("workers must be at least 1".into()));
        }
        Ok(())
    }
}

/// Multi-octave heightmap generator.
///
/// Cheap to share: generation takes `&self` and the type is `Sync`, so one
/// instance serves every concurrent request.
pub struct TerrainGenerator<N = SimplexNoise> {
    /// Parameters, with `seed` always resolved.
    config: GeneratorConfig,
    /// Seed of the noise field.
    seed: WorldSeed,
    /// The noise source.
    noise: N,
    /// Worker threads per generation.
    workers: usize,
}

impl TerrainGenerator<SimplexNoise> {
    /// Creates a simplex-backed generator.
    ///
    /// An unset `config.seed` is replaced by [`WorldSeed::from_time`].
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(config: GeneratorConfig) -> GeneratorResult<Self> {
        let seed = config.seed.map_or_else(WorldSeed::from_time, WorldSeed::new);
        Self::with_noise(config, seed, SimplexNoise::new(seed))
    }

    /// Returns a generator with identical parameters over a new seed.
    ///
    /// `self` is left untouched.
    #[must_use]
    pub fn reseeded(&self, seed: WorldSeed) -> Self {
        tracing::debug!(old = self.seed.value(), new = seed.value(), "reseeding terrain generator");
        let mut config = self.config.clone();
        config.seed = Some(seed.value());
        Self {
            config,
            seed,
            noise: SimplexNoise::new(seed),
            workers: self.workers,
        }
    }
}

impl<N: NoiseField> TerrainGenerator<N> {
    /// Creates a generator over an arbitrary noise field.
    ///
    /// `seed` is recorded for reporting; the field is expected to have been
    /// built from it.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn with_noise(mut config: GeneratorConfig, seed: WorldSeed, noise: N) -> GeneratorResult<Self> {
        config.validate()?;
        config.seed = Some(seed.value());

        let workers = config.workers.unwrap_or_else(|| {
            thread::available_parallelism().map_or(1, NonZeroUsize::get)
        });

        tracing::info!(
            seed = seed.value(),
            octaves = config.octaves,
            persistence = config.persistence,
            normalize = config.normalize,
            workers,
            "terrain generator initialized"
        );

        Ok(Self {
            config,
            seed,
            noise,
            workers,
        })
    }

    /// Returns the seed of the noise field.
    #[inline]
    #[must_use]
    pub const fn seed(&self) -> WorldSeed {
        self.seed
    }

    /// Returns the generator parameters (seed resolved).
    #[inline]
    #[must_use]
    pub const fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Generates a `width` x `height` grid, column-major.
    ///
    /// Identical arguments on generators with identical seed and parameters
    /// produce bit-identical output.
    ///
    /// # Errors
    ///
    /// Returns [`GeneratorError::InvalidDimensions`] if either dimension is
    /// zero. No work is started in that case.
    pub fn generate(
        &self,
        width: usize,
        height: usize,
        offset_x: f64,
        offset_y: f64,
    ) -> GeneratorResult<Vec<f32>> {
        if width == 0 || height == 0 {
            return Err(GeneratorError::InvalidDimensions { width, height });
        }

        let mut grid = vec![0.0f64; width * height];
        let completed = self.fill_columns(&mut grid, width, height, offset_x, offset_y);
        debug_assert_eq!(completed, width, "barrier released before every column finished");

        if self.config.normalize {
            normalize(&mut grid);
        }

        let scale = self.config.scale_factor;
        Ok(grid.into_iter().map(|v| (v * scale) as f32).collect())
    }

    /// Fans the columns out to the worker pool and blocks until each one
    /// has reported completion. Returns the number of completed columns.
    fn fill_columns(
        &self,
        grid: &mut [f64],
        width: usize,
        height: usize,
        offset_x: f64,
        offset_y: f64,
    ) -> usize {
        let (work_tx, work_rx) = bounded(width);
        for column in grid.chunks_mut(height).enumerate() {
            // Capacity equals the column count, so this never blocks.
            let _ = work_tx.send(column);
        }
        drop(work_tx);

        let (done_tx, done_rx) = bounded::<usize>(width);
        let workers = self.workers.min(width);

        thread::scope(|scope| {
            for _ in 0..workers {
                let work_rx = work_rx.clone();
                let done_tx = done_tx.clone();
                scope.spawn(move || {
                    for (x, column) in work_rx {
                        self.fill_column(x, column, width, height, offset_x, offset_y);
                        let _ = done_tx.send(x);
                    }
                });
            }
            drop(done_tx);

            // Barrier: one message per finished column.
            done_rx.iter().take(width).count()
        })
    }

    /// Computes every sample of one column.
    fn fill_column(
        &self,
        x: usize,
        column: &mut [f64],
        width: usize,
        height: usize,
        offset_x: f64,
        offset_y: f64,
    ) {
        let nx = (x as f64 + offset_x) / width as f64;

        for (y, sample) in column.iter_mut().enumerate() {
            let ny = (y as f64 + offset_y) / height as f64;
            let mut total = 0.0;

            for octave in 0..self.config.octaves {
                let exponent = octave as i32;
                let frequency = 2.0f64.powi(exponent);
                let amplitude = self.config.persistence.powi(exponent);

                let raw = self.noise.evaluate(frequency * nx, frequency * ny);
                if self.config.debug {
                    tracing::trace!(x, y, octave, frequency, amplitude, nx, ny, raw, "noise sample");
                }

                // [-1, 1] -> [0, 1]
                total += amplitude * (raw + 1.0) / 2.0;
            }

            *sample = total;
        }
    }
}

/// Rescales `grid` into `[0, 1]` by its own extrema.
///
/// A flat grid (max == min) is left as is.
fn normalize(grid: &mut [f64]) {
    let (min, max) = grid
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));

    let range = max - min;
    if range == 0.0 {
        return;
    }

    for v in grid.iter_mut() {
        *v = (*v - min) / range;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A field with the same value everywhere.
    struct FlatField(f64);

    impl NoiseField for FlatField {
        fn evaluate(&self, _x: f64, _y: f64) -> f64 {
            self.0
        }
    }

    /// A field that encodes its input, for layout checks.
    struct CoordinateField;

    impl NoiseField for CoordinateField {
        fn evaluate(&self, x: f64, y: f64) -> f64 {
            (x * 0.25 + y * 0.0625).clamp(-1.0, 1.0)
        }
    }

    fn seeded(seed: i64) -> GeneratorConfig {
        GeneratorConfig {
            seed: Some(seed),
            ..GeneratorConfig::default()
        }
    }

    #[test]
    fn test_output_length_and_range() {
        let gen = TerrainGenerator::new(seeded(7)).unwrap();
        let terrain = gen.generate(10, 10, 0.0, 0.0).unwrap();

        assert_eq!(terrain.len(), 100);
        for point in &terrain {
            assert!((0.0..=1.0).contains(point), "sample {point} outside [0, 1]");
        }
        assert_ne!(terrain, vec![0.0f32; 100], "terrain must not be all zero");
    }

    #[test]
    fn test_non_square_grid() {
        let gen = TerrainGenerator::new(seeded(3)).unwrap();
        let terrain = gen.generate(7, 13, 2.0, -5.0).unwrap();
        assert_eq!(terrain.len(), 7 * 13);
    }

    #[test]
    fn test_zero_dimensions_rejected() {
        let gen = TerrainGenerator::new(seeded(1)).unwrap();

        assert_eq!(
            gen.generate(0, 10, 0.0, 0.0),
            Err(GeneratorError::InvalidDimensions { width: 0, height: 10 })
        );
        assert_eq!(
            gen.generate(10, 0, 0.0, 0.0),
            Err(GeneratorError::InvalidDimensions { width: 10, height: 0 })
        );
    }

    #[test]
    fn test_invalid_configs_rejected() {
        let bad = [
            GeneratorConfig { octaves: 0, ..seeded(1) },
            GeneratorConfig { persistence: 0.0, ..seeded(1) },
            GeneratorConfig { persistence: 1.5, ..seeded(1) },
            GeneratorConfig { scale_factor: f64::NAN, ..seeded(1) },
            GeneratorConfig { workers: Some(0), ..seeded(1) },
        ];

        for config in bad {
            assert!(
                matches!(TerrainGenerator::new(config.clone()), Err(GeneratorError::InvalidConfig(_))),
                "{config:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_flat_field_skips_normalization() {
        let config = GeneratorConfig {
            octaves: 2,
            persistence: 0.5,
            scale_factor: 2.0,
            ..seeded(0)
        };
        let gen = TerrainGenerator::with_noise(config, WorldSeed::new(0), FlatField(0.0)).unwrap();
        let terrain = gen.generate(4, 4, 0.0, 0.0).unwrap();

        // (0 + 1) / 2 * (1 + 0.5) = 0.75, unscaled by normalization, then * 2.
        assert!(terrain.iter().all(|&v| v == 1.5), "{terrain:?}");
    }

    #[test]
    fn test_column_major_layout() {
        let config = GeneratorConfig {
            octaves: 1,
            normalize: false,
            ..seeded(0)
        };
        let gen = TerrainGenerator::with_noise(config, WorldSeed::new(0), CoordinateField).unwrap();
        let (width, height) = (4usize, 3usize);
        let terrain = gen.generate(width, height, 0.0, 0.0).unwrap();

        for x in 0..width {
            for y in 0..height {
                let nx = x as f64 / width as f64;
                let ny = y as f64 / height as f64;
                let expected = ((nx * 0.25 + ny * 0.0625) + 1.0) / 2.0;
                assert_eq!(terrain[x * height + y], expected as f32, "sample ({x}, {y})");
            }
        }
    }

    #[test]
    fn test_worker_count_does_not_change_output() {
        let single = TerrainGenerator::new(GeneratorConfig { workers: Some(1), ..seeded(99) }).unwrap();
        let many = TerrainGenerator::new(GeneratorConfig { workers: Some(8), ..seeded(99) }).unwrap();

        let a = single.generate(33, 17, 5.0, 9.0).unwrap();
        let b = many.generate(33, 17, 5.0, 9.0).unwrap();

        let bits_a: Vec<u32> = a.iter().map(|v| v.to_bits()).collect();
        let bits_b: Vec<u32> = b.iter().map(|v| v.to_bits()).collect();
        assert_eq!(bits_a, bits_b);
    }

    #[test]
    fn test_reseeded_keeps_parameters() {
        let gen = TerrainGenerator::new(GeneratorConfig { octaves: 3, ..seeded(5) }).unwrap();
        let other = gen.reseeded(WorldSeed::new(6));

        assert_eq!(gen.seed(), WorldSeed::new(5));
        assert_eq!(other.seed(), WorldSeed::new(6));
        assert_eq!(other.config().octaves, 3);
        assert_eq!(other.config().seed, Some(6));
    }

    #[test]
    fn test_unset_seed_is_resolved() {
        let gen = TerrainGenerator::new(GeneratorConfig::default()).unwrap();
        assert_eq!(gen.config().seed, Some(gen.seed().value()));
    }
}
