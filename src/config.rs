use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::rng::{mix, mix_f32};

/// Discrete detail ladder. Resolution and view distance both decrease
/// monotonically with level index; `params.lod` holds the actual numbers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DetailLevel {
    Ultra,
    High,
    Medium,
    Low,
    Minimal,
}

pub const DETAIL_LEVELS: [DetailLevel; 5] = [
    DetailLevel::Ultra,
    DetailLevel::High,
    DetailLevel::Medium,
    DetailLevel::Low,
    DetailLevel::Minimal,
];

impl DetailLevel {
    #[inline]
    pub fn index(self) -> usize {
        match self {
            DetailLevel::Ultra => 0,
            DetailLevel::High => 1,
            DetailLevel::Medium => 2,
            DetailLevel::Low => 3,
            DetailLevel::Minimal => 4,
        }
    }

    pub fn from_index(i: usize) -> DetailLevel {
        DETAIL_LEVELS[i.min(4)]
    }
}

/// Per-level LOD configuration. `max_distance[4]` is effectively infinite:
/// the coarsest level always matches.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LodParams {
    pub subdivisions: [usize; 5],
    pub max_distance: [f32; 5],
    /// Tiles farther than this from the viewer are unloaded entirely.
    pub unload_distance: f32,
    /// Bound on LOD transitions applied per update tick.
    pub max_transitions_per_tick: usize,
    /// Budget for loaded-tile memory before distant tiles are forced down
    /// the ladder.
    pub memory_budget_bytes: usize,
}

impl Default for LodParams {
    fn default() -> Self {
        Self {
            subdivisions: [195, 150, 75, 25, 10],
            max_distance: [200.0, 500.0, 1000.0, 2000.0, f32::MAX],
            unload_distance: 3000.0,
            max_transitions_per_tick: 3,
            memory_budget_bytes: 256 * 1024 * 1024,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TectonicParams {
    pub num_plates: usize,
    /// Fraction of plates that are continental; the rest are oceanic.
    pub continental_fraction: f32,
    /// Converts the dimensionless influence field into meters.
    pub tectonic_scale: f32,
}

impl Default for TectonicParams {
    fn default() -> Self {
        Self {
            num_plates: 8,
            continental_fraction: 0.6,
            tectonic_scale: 600.0,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MountainParams {
    pub num_ranges: usize,
    pub min_height: f32,
    pub max_height: f32,
}

impl Default for MountainParams {
    fn default() -> Self {
        Self {
            num_ranges: 4,
            min_height: 800.0,
            max_height: 2500.0,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BasinParams {
    pub num_basins: usize,
    pub min_depth: f32,
    pub max_depth: f32,
}

impl Default for BasinParams {
    fn default() -> Self {
        Self {
            num_basins: 3,
            min_depth: 20.0,
            max_depth: 60.0,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ErosionParams {
    /// Droplets simulated per tile.
    pub iterations: usize,
    pub max_droplet_lifetime: usize,
    pub sediment_capacity_factor: f32,
    pub min_sediment_capacity: f32,
    pub erode_speed: f32,
    pub deposit_speed: f32,
    /// Neighborhood radius (cells) for erode/deposit weighting.
    pub radius: usize,
    pub gravity: f32,
    pub evaporation_rate: f32,
    /// Gradients are recomputed once per this many droplets, not per step.
    /// 1 = exact gradients; larger values trade accuracy for speed.
    pub gradient_refresh_interval: usize,
}

impl Default for ErosionParams {
    fn default() -> Self {
        Self {
            iterations: 4000,
            max_droplet_lifetime: 30,
            sediment_capacity_factor: 4.0,
            min_sediment_capacity: 0.01,
            erode_speed: 0.3,
            deposit_speed: 0.3,
            radius: 3,
            gravity: 4.0,
            evaporation_rate: 0.01,
            gradient_refresh_interval: 1000,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NoiseParams {
    pub octaves: u32,
    pub persistence: f32,
    pub lacunarity: f32,
    /// Frequency multiplier applied to unit-square coordinates.
    pub base_frequency: f32,
    /// Meters of relief contributed by the base fbm field.
    pub base_amplitude: f32,
}

impl Default for NoiseParams {
    fn default() -> Self {
        Self {
            octaves: 8,
            persistence: 0.7,
            lacunarity: 2.5,
            base_frequency: 1.5,
            base_amplitude: 500.0,
        }
    }
}

/// All tunable generation parameters. Every field feeds the cache key:
/// two worlds differing in any value never share tiles.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenerationParams {
    /// World edge length in meters.
    pub world_size: f32,
    /// Tile edge length in meters. Must evenly divide `world_size`.
    pub tile_size: f32,
    pub seed: u64,
    /// Worker threads for the scheduler. 1 = single-threaded execution.
    pub workers: usize,
    /// In-memory tile cache budget in bytes (LRU-evicted past this).
    pub cache_budget_bytes: usize,
    /// Directory for persisted cache entries; `None` disables persistence.
    pub cache_dir: Option<PathBuf>,
    pub noise: NoiseParams,
    pub tectonics: TectonicParams,
    pub mountains: MountainParams,
    pub basins: BasinParams,
    pub erosion: ErosionParams,
    pub lod: LodParams,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            world_size: 8000.0,
            tile_size: 500.0,
            seed: 42,
            workers: num_cpus::get().max(1),
            cache_budget_bytes: 512 * 1024 * 1024,
            cache_dir: None,
            noise: NoiseParams::default(),
            tectonics: TectonicParams::default(),
            mountains: MountainParams::default(),
            basins: BasinParams::default(),
            erosion: ErosionParams::default(),
            lod: LodParams::default(),
        }
    }
}

impl GenerationParams {
    /// Tiles along one world edge.
    pub fn tiles_per_side(&self) -> i32 {
        (self.world_size / self.tile_size).round() as i32
    }

    pub fn subdivisions(&self, level: DetailLevel) -> usize {
        self.lod.subdivisions[level.index()]
    }

    /// Fail-fast validation, run once at world construction.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.world_size <= 0.0
            || self.tile_size <= 0.0
            || (self.world_size / self.tile_size).fract().abs() > 1e-6
        {
            return Err(ConfigError::WorldTileMismatch {
                world: self.world_size,
                tile: self.tile_size,
            });
        }
        if self.lod.subdivisions.iter().any(|&s| s < 2) {
            return Err(ConfigError::ZeroSubdivisions);
        }
        if self.workers == 0 {
            return Err(ConfigError::NoWorkers);
        }
        if self.erosion.radius == 0 {
            return Err(ConfigError::ZeroErosionRadius);
        }
        for i in 1..5 {
            if self.lod.subdivisions[i] > self.lod.subdivisions[i - 1]
                || self.lod.max_distance[i] < self.lod.max_distance[i - 1]
            {
                return Err(ConfigError::NonMonotonicLod);
            }
        }
        Ok(())
    }

    /// Fold every generation-affecting parameter into a key hash. LOD
    /// scheduling knobs and worker/cache settings are deliberately
    /// excluded: they change delivery, not tile content.
    pub fn fold_key(&self, mut h: u64) -> u64 {
        h = mix(h, self.seed);
        h = mix_f32(h, self.world_size);
        h = mix_f32(h, self.tile_size);

        h = mix(h, self.noise.octaves as u64);
        h = mix_f32(h, self.noise.persistence);
        h = mix_f32(h, self.noise.lacunarity);
        h = mix_f32(h, self.noise.base_frequency);
        h = mix_f32(h, self.noise.base_amplitude);

        h = mix(h, self.tectonics.num_plates as u64);
        h = mix_f32(h, self.tectonics.continental_fraction);
        h = mix_f32(h, self.tectonics.tectonic_scale);

        h = mix(h, self.mountains.num_ranges as u64);
        h = mix_f32(h, self.mountains.min_height);
        h = mix_f32(h, self.mountains.max_height);

        h = mix(h, self.basins.num_basins as u64);
        h = mix_f32(h, self.basins.min_depth);
        h = mix_f32(h, self.basins.max_depth);

        h = mix(h, self.erosion.iterations as u64);
        h = mix(h, self.erosion.max_droplet_lifetime as u64);
        h = mix_f32(h, self.erosion.sediment_capacity_factor);
        h = mix_f32(h, self.erosion.min_sediment_capacity);
        h = mix_f32(h, self.erosion.erode_speed);
        h = mix_f32(h, self.erosion.deposit_speed);
        h = mix(h, self.erosion.radius as u64);
        h = mix_f32(h, self.erosion.gravity);
        h = mix_f32(h, self.erosion.evaporation_rate);
        h = mix(h, self.erosion.gradient_refresh_interval as u64);

        for &s in &self.lod.subdivisions {
            h = mix(h, s as u64);
        }
        h
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;

    #[test]
    fn default_params_validate() {
        assert!(GenerationParams::default().validate().is_ok());
    }

    #[test]
    fn world_must_be_multiple_of_tile() {
        let params = GenerationParams {
            world_size: 1000.0,
            tile_size: 333.0,
            ..Default::default()
        };
        assert!(matches!(
            params.validate(),
            Err(ConfigError::WorldTileMismatch { .. })
        ));
    }

    #[test]
    fn zero_workers_rejected() {
        let params = GenerationParams {
            workers: 0,
            ..Default::default()
        };
        assert_eq!(params.validate(), Err(ConfigError::NoWorkers));
    }

    #[test]
    fn non_monotonic_ladder_rejected() {
        let mut params = GenerationParams::default();
        params.lod.subdivisions = [195, 150, 160, 25, 10];
        assert_eq!(params.validate(), Err(ConfigError::NonMonotonicLod));
    }

    #[test]
    fn every_tunable_changes_the_key() {
        let base = GenerationParams::default();
        let h0 = base.fold_key(0);

        let mut p = base.clone();
        p.seed += 1;
        assert_ne!(p.fold_key(0), h0);

        let mut p = base.clone();
        p.erosion.gravity += 0.5;
        assert_ne!(p.fold_key(0), h0);

        let mut p = base.clone();
        p.mountains.max_height += 1.0;
        assert_ne!(p.fold_key(0), h0);

        let mut p = base.clone();
        p.noise.persistence = 0.71;
        assert_ne!(p.fold_key(0), h0);
    }

    #[test]
    fn medium_detail_defaults_to_75() {
        let params = GenerationParams::default();
        assert_eq!(params.subdivisions(DetailLevel::Medium), 75);
    }
}
