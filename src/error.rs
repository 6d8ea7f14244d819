use thiserror::Error;

/// Rejected at world construction, before any tile work starts.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("world size {world} is not a positive multiple of tile size {tile}")]
    WorldTileMismatch { world: f32, tile: f32 },

    #[error("subdivision count must be at least 2 at every detail level")]
    ZeroSubdivisions,

    #[error("worker count must be at least 1")]
    NoWorkers,

    #[error("erosion radius must be at least 1")]
    ZeroErosionRadius,

    #[error("LOD subdivisions must decrease and view distances increase with level index")]
    NonMonotonicLod,
}

/// Failure of a single tile task. Isolated by the scheduler: the batch
/// continues and the failed request is kept for explicit retry.
#[derive(Debug, Error, Clone)]
pub enum GenerationError {
    #[error("synthesis produced non-finite elevation for tile ({x}, {y})")]
    NonFiniteElevation { x: i32, y: i32 },

    #[error("tile worker panicked: {0}")]
    WorkerPanic(String),
}
