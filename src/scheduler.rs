use std::cmp::Ordering as CmpOrdering;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use crossbeam_channel::bounded;
use log::{info, warn};

use crate::cache::TileCache;
use crate::error::GenerationError;
use crate::synth::{GeologySynthesizer, TileRequest};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecutionMode {
    Parallel,
    /// Runs every task in priority order on the caller thread. Output is
    /// bit-identical to parallel mode; useful for debugging and tests.
    SingleThreaded,
}

/// Outcome of one scheduled tile.
#[derive(Clone, Debug)]
pub struct TaskReport {
    pub request: TileRequest,
    pub duration_ms: f64,
    pub cache_hit: bool,
    pub error: Option<GenerationError>,
}

#[derive(Clone, Debug, Default)]
pub struct BatchReport {
    pub tasks: Vec<TaskReport>,
    pub total_ms: f64,
    pub tiles_per_second: f64,
    pub cache_hits: usize,
    pub failed: Vec<(TileRequest, GenerationError)>,
}

/// Closer tiles first: inverse Manhattan distance to the focus tile.
fn priority(req: &TileRequest, focus: (i32, i32)) -> f32 {
    let manhattan = (req.tile_x - focus.0).abs() + (req.tile_y - focus.1).abs();
    1.0 / (manhattan as f32 + 1.0)
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

/// Batch tile generation over a bounded worker pool. Failures never abort
/// a batch; they land in the failed set and are retried only on demand.
pub struct TaskScheduler {
    synth: Arc<GeologySynthesizer>,
    cache: Arc<TileCache>,
    workers: usize,
    mode: ExecutionMode,
    failed: Mutex<HashMap<TileRequest, GenerationError>>,
    last_focus: Mutex<(i32, i32)>,
}

impl TaskScheduler {
    pub fn new(
        synth: Arc<GeologySynthesizer>,
        cache: Arc<TileCache>,
        workers: usize,
        mode: ExecutionMode,
    ) -> Self {
        Self {
            synth,
            cache,
            workers: workers.max(1),
            mode,
            failed: Mutex::new(HashMap::new()),
            last_focus: Mutex::new((0, 0)),
        }
    }

    fn execute(&self, req: TileRequest) -> TaskReport {
        let t0 = Instant::now();
        let outcome = self
            .cache
            .get_or_compute(&req, || self.synth.synthesize(req));
        let duration_ms = t0.elapsed().as_secs_f64() * 1000.0;
        match outcome {
            Ok((_, cache_hit)) => {
                lock(&self.failed).remove(&req);
                TaskReport {
                    request: req,
                    duration_ms,
                    cache_hit,
                    error: None,
                }
            }
            Err(e) => {
                warn!("tile ({}, {}) failed: {e}", req.tile_x, req.tile_y);
                lock(&self.failed).insert(req, e.clone());
                TaskReport {
                    request: req,
                    duration_ms,
                    cache_hit: false,
                    error: Some(e),
                }
            }
        }
    }

    /// Generates every requested tile, nearest to `focus` first. Returns
    /// per-task reports plus batch totals.
    pub fn run_batch(&self, requests: &[TileRequest], focus: (i32, i32)) -> BatchReport {
        *lock(&self.last_focus) = focus;

        let mut ordered: Vec<TileRequest> = requests.to_vec();
        ordered.sort_by(|a, b| {
            priority(b, focus)
                .partial_cmp(&priority(a, focus))
                .unwrap_or(CmpOrdering::Equal)
        });

        let t0 = Instant::now();
        let tasks = if self.mode == ExecutionMode::SingleThreaded || self.workers == 1 {
            ordered.iter().map(|&req| self.execute(req)).collect()
        } else {
            self.run_parallel(&ordered)
        };
        let total_ms = t0.elapsed().as_secs_f64() * 1000.0;

        let cache_hits = tasks.iter().filter(|t| t.cache_hit).count();
        let failed: Vec<_> = tasks
            .iter()
            .filter_map(|t| t.error.clone().map(|e| (t.request, e)))
            .collect();
        let completed = tasks.len() - failed.len();
        let tiles_per_second = if total_ms > 0.0 {
            completed as f64 / (total_ms / 1000.0)
        } else {
            0.0
        };

        info!(
            "batch: {} tiles in {:.1} ms ({:.1} tiles/s, {} hits, {} failed)",
            tasks.len(),
            total_ms,
            tiles_per_second,
            cache_hits,
            failed.len()
        );

        BatchReport {
            tasks,
            total_ms,
            tiles_per_second,
            cache_hits,
            failed,
        }
    }

    fn run_parallel(&self, ordered: &[TileRequest]) -> Vec<TaskReport> {
        let cap = ordered.len().max(1);
        let (task_tx, task_rx) = bounded::<TileRequest>(cap);
        let (report_tx, report_rx) = bounded::<TaskReport>(cap);
        for &req in ordered {
            // capacity equals the batch size, cannot block
            let _ = task_tx.send(req);
        }
        drop(task_tx);

        std::thread::scope(|s| {
            for i in 0..self.workers.min(cap) {
                let task_rx = task_rx.clone();
                let report_tx = report_tx.clone();
                std::thread::Builder::new()
                    .name(format!("tile-worker-{i}"))
                    .spawn_scoped(s, move || {
                        while let Ok(req) = task_rx.recv() {
                            let _ = report_tx.send(self.execute(req));
                        }
                    })
                    .expect("failed to spawn tile worker thread");
            }
        });
        drop(report_tx);

        report_rx.try_iter().collect()
    }

    /// Re-runs everything in the failed set against the last focus tile.
    /// Never triggered automatically.
    pub fn retry_failed(&self) -> BatchReport {
        let requests: Vec<TileRequest> = lock(&self.failed).keys().copied().collect();
        let focus = *lock(&self.last_focus);
        if requests.is_empty() {
            return BatchReport::default();
        }
        info!("retrying {} failed tiles", requests.len());
        self.run_batch(&requests, focus)
    }

    pub fn failed_count(&self) -> usize {
        lock(&self.failed).len()
    }

    pub fn cache(&self) -> &TileCache {
        &self.cache
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DetailLevel, GenerationParams};

    fn test_params() -> GenerationParams {
        let mut params = GenerationParams {
            world_size: 2000.0,
            tile_size: 500.0,
            seed: 42,
            ..Default::default()
        };
        params.erosion.iterations = 100;
        params
    }

    fn scheduler(params: &GenerationParams, workers: usize, mode: ExecutionMode) -> TaskScheduler {
        let synth = Arc::new(GeologySynthesizer::new(params.clone()));
        let cache = Arc::new(TileCache::new(params));
        TaskScheduler::new(synth, cache, workers, mode)
    }

    fn grid_requests(n: i32) -> Vec<TileRequest> {
        let mut reqs = Vec::new();
        for y in 0..n {
            for x in 0..n {
                reqs.push(TileRequest {
                    tile_x: x,
                    tile_y: y,
                    detail: DetailLevel::Minimal,
                });
            }
        }
        reqs
    }

    #[test]
    fn batch_completes_every_tile() {
        let params = test_params();
        let sched = scheduler(&params, 4, ExecutionMode::Parallel);
        let report = sched.run_batch(&grid_requests(3), (0, 0));
        assert_eq!(report.tasks.len(), 9);
        assert!(report.failed.is_empty());
        assert_eq!(sched.failed_count(), 0);
        assert!(report.tiles_per_second > 0.0);
    }

    #[test]
    fn focus_tile_sorts_first() {
        let reqs = grid_requests(3);
        let focus = (2, 2);
        let mut ordered = reqs.clone();
        ordered.sort_by(|a, b| {
            priority(b, focus)
                .partial_cmp(&priority(a, focus))
                .unwrap()
        });
        assert_eq!(ordered[0].tile_x, 2);
        assert_eq!(ordered[0].tile_y, 2);
    }

    #[test]
    fn repeated_batch_hits_the_cache() {
        let params = test_params();
        let sched = scheduler(&params, 2, ExecutionMode::Parallel);
        let reqs = grid_requests(2);
        let first = sched.run_batch(&reqs, (0, 0));
        assert_eq!(first.cache_hits, 0);
        let second = sched.run_batch(&reqs, (0, 0));
        assert_eq!(second.cache_hits, 4);
    }

    #[test]
    fn single_threaded_matches_parallel() {
        let params = test_params();
        let parallel = scheduler(&params, 4, ExecutionMode::Parallel);
        let serial = scheduler(&params, 1, ExecutionMode::SingleThreaded);
        let reqs = grid_requests(2);
        parallel.run_batch(&reqs, (0, 0));
        serial.run_batch(&reqs, (0, 0));
        for req in &reqs {
            let a = parallel
                .cache()
                .get_or_compute(req, || unreachable!())
                .unwrap()
                .0;
            let b = serial
                .cache()
                .get_or_compute(req, || unreachable!())
                .unwrap()
                .0;
            assert_eq!(a.elevation.data, b.elevation.data);
            assert_eq!(a.biomes.data, b.biomes.data);
        }
    }

    #[test]
    fn failures_are_isolated_and_retryable() {
        // A one-sample level produces NaN coordinates, so every tile at
        // that level fails while the batch itself still completes.
        let mut params = test_params();
        params.lod.subdivisions = [195, 150, 75, 25, 1];
        let sched = scheduler(&params, 2, ExecutionMode::Parallel);

        let mut reqs = grid_requests(2); // Minimal level, all bad
        reqs.push(TileRequest {
            tile_x: 0,
            tile_y: 0,
            detail: DetailLevel::Low,
        });

        let report = sched.run_batch(&reqs, (0, 0));
        assert_eq!(report.tasks.len(), 5);
        assert_eq!(report.failed.len(), 4);
        assert_eq!(sched.failed_count(), 4);

        // Retry re-runs only the failed set; same config, same failures.
        let retry = sched.retry_failed();
        assert_eq!(retry.tasks.len(), 4);
        assert_eq!(sched.failed_count(), 4);
    }

    #[test]
    fn retry_with_empty_failed_set_is_a_noop() {
        let params = test_params();
        let sched = scheduler(&params, 2, ExecutionMode::Parallel);
        let report = sched.retry_failed();
        assert!(report.tasks.is_empty());
    }
}
