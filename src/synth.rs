use std::time::Instant;

use log::debug;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::basins::BasinModel;
use crate::climate::{Biome, BiomeClassifier};
use crate::config::{DetailLevel, GenerationParams};
use crate::erosion;
use crate::error::GenerationError;
use crate::grid::Grid;
use crate::mountains::MountainModel;
use crate::noise::NoiseEngine;
use crate::rng::mix;
use crate::tectonics::TectonicModel;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileRequest {
    pub tile_x: i32,
    pub tile_y: i32,
    pub detail: DetailLevel,
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct TileStats {
    pub min_elevation: f32,
    pub max_elevation: f32,
    pub mean_elevation: f32,
    pub eroded: f32,
    pub deposited: f32,
    pub generation_ms: f64,
}

/// Complete generated tile. Everything is plain data so results can be
/// shared behind `Arc` and persisted as JSON.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TileResult {
    pub tile_x: i32,
    pub tile_y: i32,
    pub detail: DetailLevel,
    /// World-space sample coordinates along each axis, meters.
    pub world_x: Vec<f32>,
    pub world_y: Vec<f32>,
    pub elevation: Grid<f32>,
    pub temperature: Grid<f32>,
    pub humidity: Grid<f32>,
    /// Biome ids (`Biome as u8`), same layout as `elevation`.
    pub biomes: Grid<u8>,
    pub vegetation: Grid<f32>,
    pub rock_exposure: Grid<f32>,
    pub stats: TileStats,
}

impl TileResult {
    pub fn biome_at(&self, x: usize, y: usize) -> Biome {
        Biome::from_id(self.biomes.get(x, y))
    }

    /// Rough in-memory footprint, used for cache budgeting.
    pub fn byte_size(&self) -> usize {
        let cells = self.elevation.data.len();
        // five f32 grids + one u8 grid + two coordinate axes
        cells * (5 * 4 + 1) + (self.world_x.len() + self.world_y.len()) * 4 + 256
    }
}

/// Pure per-tile generation. Holds the immutable world models; a single
/// synthesizer serves every worker thread.
pub struct GeologySynthesizer {
    params: GenerationParams,
    noise: NoiseEngine,
    tectonics: TectonicModel,
    mountains: MountainModel,
    basins: BasinModel,
}

impl GeologySynthesizer {
    pub fn new(params: GenerationParams) -> Self {
        let noise = NoiseEngine::new(params.seed);
        let tectonics = TectonicModel::new(
            params.seed,
            params.tectonics.num_plates,
            params.tectonics.continental_fraction,
        );
        let mountains = MountainModel::new(
            params.seed,
            params.mountains.num_ranges,
            params.mountains.min_height,
            params.mountains.max_height,
        );
        let basins = BasinModel::new(
            params.seed,
            params.basins.num_basins,
            params.basins.min_depth,
            params.basins.max_depth,
        );
        Self {
            params,
            noise,
            tectonics,
            mountains,
            basins,
        }
    }

    pub fn params(&self) -> &GenerationParams {
        &self.params
    }

    pub fn tectonics(&self) -> &TectonicModel {
        &self.tectonics
    }

    /// Per-tile erosion stream: tile coordinates and detail folded into
    /// the world seed so each tile erodes independently but repeatably.
    fn tile_seed(&self, req: &TileRequest) -> u64 {
        let h = mix(self.params.seed, req.tile_x as u32 as u64);
        let h = mix(h, req.tile_y as u32 as u64);
        mix(h, req.detail.index() as u64)
    }

    /// Generates one tile. Referentially transparent: the same request
    /// against the same params yields bit-identical output on any thread.
    pub fn synthesize(&self, req: TileRequest) -> Result<TileResult, GenerationError> {
        let t0 = Instant::now();
        let p = &self.params;
        let n = p.subdivisions(req.detail);

        // Inclusive sample axes across the tile, world centered at origin.
        let start_x = req.tile_x as f32 * p.tile_size - p.world_size / 2.0;
        let start_y = req.tile_y as f32 * p.tile_size - p.world_size / 2.0;
        let step = p.tile_size / (n - 1) as f32;
        let world_x: Vec<f32> = (0..n).map(|i| start_x + step * i as f32).collect();
        let world_y: Vec<f32> = (0..n).map(|i| start_y + step * i as f32).collect();

        // Normalized unit-square coordinates for the world models.
        let us: Vec<f32> = world_x
            .iter()
            .map(|x| (x + p.world_size / 2.0) / p.world_size)
            .collect();
        let vs: Vec<f32> = world_y
            .iter()
            .map(|y| (y + p.world_size / 2.0) / p.world_size)
            .collect();

        let mut elevation: Grid<f32> = Grid::new(n, n);
        elevation
            .data
            .par_chunks_mut(n)
            .zip(vs.par_iter())
            .for_each(|(row, &v)| {
                for (cell, &u) in row.iter_mut().zip(&us) {
                    let base = self.noise.fbm(
                        u * p.noise.base_frequency,
                        v * p.noise.base_frequency,
                        p.noise.octaves,
                        p.noise.persistence,
                        p.noise.lacunarity,
                    ) * p.noise.base_amplitude;
                    let tectonic = self.tectonics.influence(u, v) * p.tectonics.tectonic_scale;
                    let mountains = self.mountains.elevation(&self.noise, u, v);
                    let basins = self.basins.depression(u, v);
                    *cell = base + tectonic + mountains + basins;
                }
            });

        let report = erosion::erode(&mut elevation, &p.erosion, self.tile_seed(&req));

        if !elevation.is_finite() {
            return Err(GenerationError::NonFiniteElevation {
                x: req.tile_x,
                y: req.tile_y,
            });
        }

        let mut temperature: Grid<f32> = Grid::new(n, n);
        let mut humidity: Grid<f32> = Grid::new(n, n);
        let mut biomes: Grid<u8> = Grid::new(n, n);
        let mut vegetation: Grid<f32> = Grid::new(n, n);
        let mut rock_exposure: Grid<f32> = Grid::new(n, n);

        temperature
            .data
            .par_chunks_mut(n)
            .zip(humidity.data.par_chunks_mut(n))
            .zip(biomes.data.par_chunks_mut(n))
            .zip(vegetation.data.par_chunks_mut(n))
            .zip(rock_exposure.data.par_chunks_mut(n))
            .zip(elevation.data.par_chunks(n))
            .zip(vs.par_iter())
            .for_each(|((((((t_row, h_row), b_row), veg_row), rock_row), e_row), &v)| {
                for i in 0..n {
                    let u = us[i];
                    let elev = e_row[i];
                    let (biome, climate) = BiomeClassifier::classify_at(u, v, elev);
                    let props = biome.props();
                    t_row[i] = climate.temperature;
                    h_row[i] = climate.humidity;
                    b_row[i] = biome as u8;
                    veg_row[i] = props.vegetation_density;
                    rock_row[i] = props.rock_exposure;
                }
            });

        let (min, max, mean) = elevation.min_max_mean();
        let stats = TileStats {
            min_elevation: min,
            max_elevation: max,
            mean_elevation: mean,
            eroded: report.eroded,
            deposited: report.deposited,
            generation_ms: t0.elapsed().as_secs_f64() * 1000.0,
        };

        debug!(
            "tile ({}, {}) {:?}: {}x{}, elev [{:.1}, {:.1}] in {:.1} ms",
            req.tile_x, req.tile_y, req.detail, n, n, min, max, stats.generation_ms
        );

        Ok(TileResult {
            tile_x: req.tile_x,
            tile_y: req.tile_y,
            detail: req.detail,
            world_x,
            world_y,
            elevation,
            temperature,
            humidity,
            biomes,
            vegetation,
            rock_exposure,
            stats,
        })
    }
}
