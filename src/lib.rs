pub mod basins;
pub mod cache;
pub mod climate;
pub mod config;
pub mod erosion;
pub mod error;
pub mod grid;
pub mod lod;
pub mod mountains;
pub mod noise;
pub mod render;
pub mod rng;
pub mod scheduler;
pub mod synth;
pub mod tectonics;

use std::sync::Arc;

use cache::{CacheStats, TileCache};
use config::GenerationParams;
use error::{ConfigError, GenerationError};
use lod::AdaptiveLodManager;
use scheduler::{BatchReport, ExecutionMode, TaskScheduler};
use synth::{GeologySynthesizer, TileRequest, TileResult};

#[derive(Clone, Copy, Debug, Default)]
pub struct WorldStats {
    pub tiles_generated: u64,
    pub cache: CacheStats,
    pub failed: usize,
}

/// A fully wired world: immutable geological models, shared tile cache
/// and a scheduler on top. Construction validates the config and builds
/// every model exactly once; everything afterwards is read-only and
/// shared across workers.
pub struct World {
    params: GenerationParams,
    synth: Arc<GeologySynthesizer>,
    cache: Arc<TileCache>,
    scheduler: TaskScheduler,
}

impl World {
    pub fn new(params: GenerationParams) -> Result<Self, ConfigError> {
        params.validate()?;
        let synth = Arc::new(GeologySynthesizer::new(params.clone()));
        let cache = Arc::new(TileCache::new(&params));
        let mode = if params.workers == 1 {
            ExecutionMode::SingleThreaded
        } else {
            ExecutionMode::Parallel
        };
        let scheduler = TaskScheduler::new(
            Arc::clone(&synth),
            Arc::clone(&cache),
            params.workers,
            mode,
        );
        Ok(Self {
            params,
            synth,
            cache,
            scheduler,
        })
    }

    pub fn params(&self) -> &GenerationParams {
        &self.params
    }

    /// Pure per-tile generation, bypassing the cache.
    pub fn synthesize(&self, req: TileRequest) -> Result<TileResult, GenerationError> {
        self.synth.synthesize(req)
    }

    /// Cached per-tile generation. The bool reports a cache hit.
    pub fn tile(&self, req: TileRequest) -> Result<(Arc<TileResult>, bool), GenerationError> {
        self.cache
            .get_or_compute(&req, || self.synth.synthesize(req))
    }

    /// Generates a set of tiles, nearest to the focus tile first.
    pub fn run_batch(&self, requests: &[TileRequest], focus: (i32, i32)) -> BatchReport {
        self.scheduler.run_batch(requests, focus)
    }

    pub fn retry_failed(&self) -> BatchReport {
        self.scheduler.retry_failed()
    }

    /// Fresh LOD manager over this world's tile layout.
    pub fn lod_manager(&self) -> AdaptiveLodManager {
        AdaptiveLodManager::new(&self.params)
    }

    pub fn stats(&self) -> WorldStats {
        let cache = self.cache.stats();
        WorldStats {
            tiles_generated: cache.computed,
            cache,
            failed: self.scheduler.failed_count(),
        }
    }

    /// Requests covering the whole world at one detail level.
    pub fn all_tiles(&self, detail: config::DetailLevel) -> Vec<TileRequest> {
        let n = self.params.tiles_per_side();
        let mut reqs = Vec::with_capacity((n * n) as usize);
        for y in 0..n {
            for x in 0..n {
                reqs.push(TileRequest {
                    tile_x: x,
                    tile_y: y,
                    detail,
                });
            }
        }
        reqs
    }
}
