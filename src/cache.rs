use std::collections::HashMap;
use std::fs;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};

use log::{debug, warn};

use crate::config::GenerationParams;
use crate::error::GenerationError;
use crate::rng::mix;
use crate::synth::{TileRequest, TileResult};

pub type CacheKey = u64;

/// Lock that survives a poisoned mutex; the protected maps stay
/// consistent because writers never unwind mid-update.
fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

struct Entry {
    tile: Arc<TileResult>,
    bytes: usize,
    last_access: u64,
}

struct Store {
    map: HashMap<CacheKey, Entry>,
    bytes: usize,
    clock: u64,
}

/// Coalescing slot for one in-flight computation. The first requester
/// computes; everyone else blocks on the condvar and shares the result.
struct Slot {
    done: Mutex<Option<Result<Arc<TileResult>, GenerationError>>>,
    cv: Condvar,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Tiles actually synthesized; misses served from disk are excluded.
    pub computed: u64,
    pub evictions: u64,
    pub entries: usize,
    pub bytes: usize,
}

/// Keyed tile store with an LRU byte budget, request coalescing and
/// optional JSON persistence. Safe to share behind `Arc` across workers.
pub struct TileCache {
    base_key: u64,
    budget: usize,
    dir: Option<PathBuf>,
    store: Mutex<Store>,
    pending: Mutex<HashMap<CacheKey, Arc<Slot>>>,
    hits: AtomicU64,
    misses: AtomicU64,
    computed: AtomicU64,
    evictions: AtomicU64,
}

impl TileCache {
    pub fn new(params: &GenerationParams) -> Self {
        if let Some(dir) = &params.cache_dir {
            if let Err(e) = fs::create_dir_all(dir) {
                warn!("cache dir {} unavailable: {e}", dir.display());
            }
        }
        Self {
            // Folds every generation-affecting parameter once; per-tile
            // keys extend this with coordinates and detail.
            base_key: params.fold_key(0x7469_6c65),
            budget: params.cache_budget_bytes,
            dir: params.cache_dir.clone(),
            store: Mutex::new(Store {
                map: HashMap::new(),
                bytes: 0,
                clock: 0,
            }),
            pending: Mutex::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            computed: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    pub fn key(&self, req: &TileRequest) -> CacheKey {
        let h = mix(self.base_key, req.tile_x as u32 as u64);
        let h = mix(h, req.tile_y as u32 as u64);
        mix(h, req.detail.index() as u64)
    }

    /// Looks the tile up in memory, then on disk, then computes it.
    /// Concurrent identical requests coalesce: exactly one caller runs
    /// `compute`, the rest block and share its result. The bool reports
    /// whether this call was served from cache.
    pub fn get_or_compute<F>(
        &self,
        req: &TileRequest,
        compute: F,
    ) -> Result<(Arc<TileResult>, bool), GenerationError>
    where
        F: FnOnce() -> Result<TileResult, GenerationError>,
    {
        let key = self.key(req);

        if let Some(tile) = self.lookup(key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok((tile, true));
        }

        // Join an in-flight computation, or claim the slot.
        let (slot, winner) = {
            let mut pending = lock(&self.pending);
            match pending.get(&key) {
                Some(slot) => (Arc::clone(slot), false),
                None => {
                    let slot = Arc::new(Slot {
                        done: Mutex::new(None),
                        cv: Condvar::new(),
                    });
                    pending.insert(key, Arc::clone(&slot));
                    (slot, true)
                }
            }
        };

        if !winner {
            let mut done = lock(&slot.done);
            loop {
                if let Some(result) = done.clone() {
                    if result.is_ok() {
                        self.hits.fetch_add(1, Ordering::Relaxed);
                    }
                    return result.map(|t| (t, true));
                }
                done = slot.cv.wait(done).unwrap_or_else(|e| e.into_inner());
            }
        }

        self.misses.fetch_add(1, Ordering::Relaxed);

        // Disk before recompute; corrupt files are just misses.
        let result = match self.load_from_disk(key) {
            Some(tile) => Ok(Arc::new(tile)),
            None => match catch_unwind(AssertUnwindSafe(compute)) {
                Ok(Ok(tile)) => {
                    self.computed.fetch_add(1, Ordering::Relaxed);
                    self.persist(key, &tile);
                    Ok(Arc::new(tile))
                }
                Ok(Err(e)) => Err(e),
                Err(panic) => {
                    let msg = panic
                        .downcast_ref::<&str>()
                        .map(|s| s.to_string())
                        .or_else(|| panic.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "tile generation panicked".into());
                    Err(GenerationError::WorkerPanic(msg))
                }
            },
        };

        if let Ok(tile) = &result {
            self.insert(key, Arc::clone(tile));
        }

        {
            let mut done = lock(&slot.done);
            *done = Some(result.clone());
        }
        slot.cv.notify_all();
        lock(&self.pending).remove(&key);

        result.map(|t| (t, false))
    }

    fn lookup(&self, key: CacheKey) -> Option<Arc<TileResult>> {
        let mut store = lock(&self.store);
        store.clock += 1;
        let clock = store.clock;
        let entry = store.map.get_mut(&key)?;
        entry.last_access = clock;
        Some(Arc::clone(&entry.tile))
    }

    fn insert(&self, key: CacheKey, tile: Arc<TileResult>) {
        let bytes = tile.byte_size();
        let mut store = lock(&self.store);
        store.clock += 1;
        let clock = store.clock;
        if let Some(old) = store.map.insert(
            key,
            Entry {
                tile,
                bytes,
                last_access: clock,
            },
        ) {
            store.bytes -= old.bytes;
        }
        store.bytes += bytes;

        while store.bytes > self.budget && store.map.len() > 1 {
            // LRU victim, never the entry just inserted.
            let victim = store
                .map
                .iter()
                .filter(|(k, _)| **k != key)
                .min_by_key(|(_, e)| e.last_access)
                .map(|(k, _)| *k);
            let Some(victim) = victim else { break };
            if let Some(evicted) = store.map.remove(&victim) {
                store.bytes -= evicted.bytes;
                self.evictions.fetch_add(1, Ordering::Relaxed);
                debug!("evicted tile {victim:016x} ({} bytes)", evicted.bytes);
            }
        }
    }

    fn entry_path(&self, key: CacheKey) -> Option<PathBuf> {
        self.dir.as_ref().map(|d| d.join(format!("{key:016x}.json")))
    }

    fn load_from_disk(&self, key: CacheKey) -> Option<TileResult> {
        let path = self.entry_path(key)?;
        let text = fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&text) {
            Ok(tile) => {
                debug!("loaded tile {key:016x} from {}", path.display());
                Some(tile)
            }
            Err(e) => {
                warn!("corrupt cache entry {}: {e}", path.display());
                None
            }
        }
    }

    fn persist(&self, key: CacheKey, tile: &TileResult) {
        let Some(path) = self.entry_path(key) else {
            return;
        };
        match serde_json::to_string(tile) {
            Ok(text) => {
                if let Err(e) = fs::write(&path, text) {
                    warn!("failed to persist tile {key:016x}: {e}");
                }
            }
            Err(e) => warn!("failed to serialize tile {key:016x}: {e}"),
        }
    }

    pub fn stats(&self) -> CacheStats {
        let store = lock(&self.store);
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            computed: self.computed.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            entries: store.map.len(),
            bytes: store.bytes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DetailLevel, GenerationParams};
    use crate::synth::GeologySynthesizer;
    use std::sync::atomic::AtomicUsize;

    fn test_params() -> GenerationParams {
        let mut params = GenerationParams {
            world_size: 1000.0,
            tile_size: 500.0,
            seed: 42,
            ..Default::default()
        };
        params.erosion.iterations = 100;
        params
    }

    fn req(x: i32, y: i32) -> TileRequest {
        TileRequest {
            tile_x: x,
            tile_y: y,
            detail: DetailLevel::Minimal,
        }
    }

    #[test]
    fn second_request_is_a_hit() {
        let params = test_params();
        let synth = GeologySynthesizer::new(params.clone());
        let cache = TileCache::new(&params);

        let (_, hit) = cache.get_or_compute(&req(0, 0), || synth.synthesize(req(0, 0))).unwrap();
        assert!(!hit);
        let (_, hit) = cache.get_or_compute(&req(0, 0), || synth.synthesize(req(0, 0))).unwrap();
        assert!(hit);

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.computed, 1);
        assert_eq!(stats.entries, 1);
    }

    #[test]
    fn keys_differ_per_tile_and_detail() {
        let params = test_params();
        let cache = TileCache::new(&params);
        let a = cache.key(&req(0, 0));
        let b = cache.key(&req(0, 1));
        let c = cache.key(&TileRequest {
            tile_x: 0,
            tile_y: 0,
            detail: DetailLevel::Low,
        });
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn parameter_change_changes_keys() {
        let params = test_params();
        let mut other = test_params();
        other.erosion.gravity += 0.1;
        let a = TileCache::new(&params).key(&req(0, 0));
        let b = TileCache::new(&other).key(&req(0, 0));
        assert_ne!(a, b);
    }

    #[test]
    fn budget_evicts_least_recent() {
        let mut params = test_params();
        params.cache_budget_bytes = 1; // force eviction on every insert
        let synth = GeologySynthesizer::new(params.clone());
        let cache = TileCache::new(&params);

        cache.get_or_compute(&req(0, 0), || synth.synthesize(req(0, 0))).unwrap();
        cache.get_or_compute(&req(0, 1), || synth.synthesize(req(0, 1))).unwrap();

        let stats = cache.stats();
        assert_eq!(stats.entries, 1);
        assert!(stats.evictions >= 1);
    }

    #[test]
    fn concurrent_identical_requests_compute_once() {
        let params = test_params();
        let synth = Arc::new(GeologySynthesizer::new(params.clone()));
        let cache = Arc::new(TileCache::new(&params));
        let computations = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = Arc::clone(&cache);
            let synth = Arc::clone(&synth);
            let computations = Arc::clone(&computations);
            handles.push(std::thread::spawn(move || {
                cache
                    .get_or_compute(&req(0, 0), || {
                        computations.fetch_add(1, Ordering::SeqCst);
                        synth.synthesize(req(0, 0))
                    })
                    .unwrap()
                    .0
            }));
        }
        let tiles: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(computations.load(Ordering::SeqCst), 1);
        for t in &tiles {
            assert_eq!(t.elevation.data, tiles[0].elevation.data);
        }
    }

    #[test]
    fn disk_persistence_survives_a_new_cache() {
        let dir = std::env::temp_dir().join(format!("tilegen-cache-test-{}", std::process::id()));
        let mut params = test_params();
        params.cache_dir = Some(dir.clone());
        let synth = GeologySynthesizer::new(params.clone());

        {
            let cache = TileCache::new(&params);
            cache.get_or_compute(&req(0, 0), || synth.synthesize(req(0, 0))).unwrap();
        }

        let cache = TileCache::new(&params);
        let computed = AtomicUsize::new(0);
        let (tile, _) = cache
            .get_or_compute(&req(0, 0), || {
                computed.fetch_add(1, Ordering::SeqCst);
                synth.synthesize(req(0, 0))
            })
            .unwrap();
        assert_eq!(computed.load(Ordering::SeqCst), 0);
        assert_eq!(tile.elevation.w, 10);
        // a disk load is a miss but not a generated tile
        let stats = cache.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.computed, 0);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn corrupt_cache_file_falls_back_to_generation() {
        let dir = std::env::temp_dir().join(format!("tilegen-corrupt-test-{}", std::process::id()));
        let mut params = test_params();
        params.cache_dir = Some(dir.clone());
        let synth = GeologySynthesizer::new(params.clone());
        let cache = TileCache::new(&params);

        let key = cache.key(&req(0, 0));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(format!("{key:016x}.json")), b"not json").unwrap();

        let (tile, hit) = cache.get_or_compute(&req(0, 0), || synth.synthesize(req(0, 0))).unwrap();
        assert!(!hit);
        assert!(tile.elevation.is_finite());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
