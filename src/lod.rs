use std::collections::HashMap;

use log::{debug, info};

use crate::config::{DetailLevel, GenerationParams, LodParams, DETAIL_LEVELS};
use crate::synth::TileRequest;

/// One tracked tile and its current detail state.
#[derive(Clone, Copy, Debug)]
pub struct LodChunk {
    pub tile: (i32, i32),
    pub level: DetailLevel,
    pub distance: f32,
    pub loaded: bool,
}

#[derive(Clone, Copy, Debug)]
struct Transition {
    tile: (i32, i32),
    to: DetailLevel,
    priority: f32,
}

#[derive(Clone, Debug, Default)]
pub struct LodStats {
    pub tracked: usize,
    pub loaded: usize,
    pub pending_transitions: usize,
    pub estimated_bytes: usize,
    pub per_level: [usize; 5],
}

/// Distance-driven detail management across the world's tiles. Owns no
/// tile data itself; `tick` hands back the requests to (re)generate.
pub struct AdaptiveLodManager {
    world_size: f32,
    tile_size: f32,
    tiles_per_side: i32,
    lod: LodParams,
    chunks: HashMap<(i32, i32), LodChunk>,
    queue: Vec<Transition>,
}

impl AdaptiveLodManager {
    pub fn new(params: &GenerationParams) -> Self {
        Self {
            world_size: params.world_size,
            tile_size: params.tile_size,
            tiles_per_side: params.tiles_per_side(),
            lod: params.lod.clone(),
            chunks: HashMap::new(),
            queue: Vec::new(),
        }
    }

    /// First level whose reach covers the distance, scanning from the
    /// most detailed. The last level has unbounded reach.
    pub fn level_for_distance(&self, distance: f32) -> DetailLevel {
        for level in DETAIL_LEVELS {
            if distance <= self.lod.max_distance[level.index()] {
                return level;
            }
        }
        DetailLevel::Minimal
    }

    fn tile_center(&self, tile: (i32, i32)) -> (f32, f32) {
        (
            tile.0 as f32 * self.tile_size - self.world_size / 2.0 + self.tile_size / 2.0,
            tile.1 as f32 * self.tile_size - self.world_size / 2.0 + self.tile_size / 2.0,
        )
    }

    /// Estimated footprint of one loaded tile at a level, mirroring
    /// `TileResult::byte_size`.
    fn bytes_for(&self, level: DetailLevel) -> usize {
        let n = self.lod.subdivisions[level.index()];
        n * n * 21 + n * 8 + 256
    }

    fn estimated_bytes(&self) -> usize {
        self.chunks
            .values()
            .filter(|c| c.loaded)
            .map(|c| self.bytes_for(c.level))
            .sum()
    }

    /// Recomputes tile distances and required levels for the new viewer
    /// position, rebuilding the transition queue. Height feeds the
    /// distance like the horizontal axes do.
    pub fn update_viewer(&mut self, x: f32, y: f32, z: f32) {
        self.queue.clear();

        for ty in 0..self.tiles_per_side {
            for tx in 0..self.tiles_per_side {
                let tile = (tx, ty);
                let (cx, cy) = self.tile_center(tile);
                let dx = x - cx;
                let dy = y - cy;
                let distance = (dx * dx + dy * dy + z * z).sqrt();

                if distance > self.lod.unload_distance {
                    if let Some(chunk) = self.chunks.remove(&tile) {
                        debug!(
                            "unloaded tile ({}, {}) at {:.0} m (was {:?})",
                            tile.0, tile.1, distance, chunk.level
                        );
                    }
                    continue;
                }

                let required = self.level_for_distance(distance);
                let chunk = self.chunks.entry(tile).or_insert(LodChunk {
                    tile,
                    level: DetailLevel::Minimal,
                    distance,
                    loaded: false,
                });
                chunk.distance = distance;

                if !chunk.loaded || chunk.level != required {
                    let upgrade = !chunk.loaded || required.index() < chunk.level.index();
                    self.queue.push(Transition {
                        tile,
                        to: required,
                        priority: 1.0 / (distance + 1.0) * if upgrade { 1.0 } else { 0.5 },
                    });
                }
            }
        }

        self.enforce_budget();
    }

    /// Forces the most distant loaded tiles down the ladder until the
    /// estimate fits the budget again.
    fn enforce_budget(&mut self) {
        let mut estimated = self.estimated_bytes();
        if estimated <= self.lod.memory_budget_bytes {
            return;
        }
        info!(
            "loaded tiles exceed memory budget ({} > {}), degrading distant tiles",
            estimated, self.lod.memory_budget_bytes
        );

        loop {
            if estimated <= self.lod.memory_budget_bytes {
                return;
            }
            let victim = self
                .chunks
                .values()
                .filter(|c| c.loaded && c.level != DetailLevel::Minimal)
                .max_by(|a, b| a.distance.total_cmp(&b.distance))
                .map(|c| c.tile);
            let Some(tile) = victim else { return };

            let (old, new, distance) = {
                let chunk = match self.chunks.get_mut(&tile) {
                    Some(c) => c,
                    None => return,
                };
                let old = chunk.level;
                chunk.level = DetailLevel::from_index(old.index() + 1);
                (old, chunk.level, chunk.distance)
            };
            estimated -= self.bytes_for(old);
            estimated += self.bytes_for(new);

            // The degraded tile still needs a rebuild at its new level.
            self.queue.retain(|t| t.tile != tile);
            self.queue.push(Transition {
                tile,
                to: new,
                priority: 1.0 / (distance + 1.0) * 0.5,
            });
            debug!("degraded tile ({}, {}) {old:?} -> {new:?}", tile.0, tile.1);
        }
    }

    /// Applies the highest-priority transitions, bounded per tick, and
    /// returns the tile requests the caller should schedule.
    pub fn tick(&mut self) -> Vec<TileRequest> {
        self.queue
            .sort_by(|a, b| b.priority.total_cmp(&a.priority));
        let take = self.queue.len().min(self.lod.max_transitions_per_tick);
        let mut requests = Vec::with_capacity(take);
        for t in self.queue.drain(..take) {
            if let Some(chunk) = self.chunks.get_mut(&t.tile) {
                chunk.level = t.to;
                chunk.loaded = true;
                requests.push(TileRequest {
                    tile_x: t.tile.0,
                    tile_y: t.tile.1,
                    detail: t.to,
                });
            }
        }
        requests
    }

    pub fn chunk(&self, tile: (i32, i32)) -> Option<&LodChunk> {
        self.chunks.get(&tile)
    }

    pub fn stats(&self) -> LodStats {
        let mut per_level = [0usize; 5];
        let mut loaded = 0;
        for c in self.chunks.values() {
            if c.loaded {
                loaded += 1;
                per_level[c.level.index()] += 1;
            }
        }
        LodStats {
            tracked: self.chunks.len(),
            loaded,
            pending_transitions: self.queue.len(),
            estimated_bytes: self.estimated_bytes(),
            per_level,
        }
    }
}
