use std::path::PathBuf;

use tilegen::config::{DetailLevel, GenerationParams};
use tilegen::render;
use tilegen::synth::TileRequest;
use tilegen::World;

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    let seed: u64 = args.get(1).and_then(|s| s.parse().ok()).unwrap_or(42);
    let world_size: f32 = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(8000.0);
    let tile_size: f32 = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(500.0);
    let out_dir: PathBuf = args
        .get(4)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("artifacts"));

    std::fs::create_dir_all(&out_dir).expect("failed to create output directory");

    let params = GenerationParams {
        seed,
        world_size,
        tile_size,
        ..Default::default()
    };

    eprintln!(
        "Generating {}x{} m world with seed={}, tile={} m, {} workers",
        world_size, world_size, seed, tile_size, params.workers
    );

    let world = World::new(params).expect("invalid generation parameters");

    // Full-world pass at medium detail, scheduled from the center out.
    let requests = world.all_tiles(DetailLevel::Medium);
    let center = world.params().tiles_per_side() / 2;
    let report = world.run_batch(&requests, (center, center));

    eprintln!(
        "\nBatch: {} tiles in {:.1} ms ({:.1} tiles/s, {} cache hits, {} failed)",
        report.tasks.len(),
        report.total_ms,
        report.tiles_per_second,
        report.cache_hits,
        report.failed.len()
    );
    for (req, err) in &report.failed {
        eprintln!("  FAILED ({}, {}): {}", req.tile_x, req.tile_y, err);
    }

    // Diagnostic layers for the center tile at full detail.
    let tile = world
        .tile(TileRequest {
            tile_x: center,
            tile_y: center,
            detail: DetailLevel::Ultra,
        })
        .expect("center tile generation failed")
        .0;

    eprintln!(
        "\nCenter tile ({center}, {center}): elev [{:.1}, {:.1}] m, mean {:.1} m",
        tile.stats.min_elevation, tile.stats.max_elevation, tile.stats.mean_elevation
    );

    let w = tile.elevation.w;
    let h = tile.elevation.h;
    let save = |name: &str, rgba: &[u8]| {
        let path = out_dir.join(name);
        image::save_buffer(&path, rgba, w as u32, h as u32, image::ColorType::Rgba8)
            .expect("failed to save image");
        eprintln!("Saved {}", path.display());
    };

    save("map.png", &render::render_map(&tile.elevation));
    save("heightmap.png", &render::render_heightmap(&tile.elevation));
    save("temperature.png", &render::render_temperature(&tile.temperature));
    save("humidity.png", &render::render_humidity(&tile.humidity));
    save("biomes.png", &render::render_biomes(&tile.biomes));

    let stats = world.stats();
    eprintln!(
        "\nCache: {} entries, {} bytes, {} hits / {} misses, {} evictions",
        stats.cache.entries, stats.cache.bytes, stats.cache.hits, stats.cache.misses,
        stats.cache.evictions
    );
    eprintln!("Done.");
}
