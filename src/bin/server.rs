use std::net::SocketAddr;

use axum::{Json, Router, routing::post};
use base64::Engine;
use image::ImageEncoder;
use image::codecs::png::PngEncoder;
use serde::{Deserialize, Serialize};
use tower_http::services::ServeDir;

use tilegen::config::{DetailLevel, GenerationParams};
use tilegen::render;
use tilegen::synth::TileRequest;
use tilegen::World;

#[derive(Deserialize)]
struct GenerateRequest {
    seed: Option<u64>,
    world_size: Option<f32>,
    tile_size: Option<f32>,
    tile_x: Option<i32>,
    tile_y: Option<i32>,
    detail: Option<DetailLevel>,
    // Geology
    num_plates: Option<usize>,
    continental_fraction: Option<f32>,
    tectonic_scale: Option<f32>,
    num_ranges: Option<usize>,
    max_mountain_height: Option<f32>,
    num_basins: Option<usize>,
    // Erosion
    erosion_iterations: Option<usize>,
    erosion_radius: Option<usize>,
}

#[derive(Serialize)]
struct GenerateResponse {
    layers: Vec<Layer>,
    width: usize,
    height: usize,
    min_elevation: f32,
    max_elevation: f32,
    mean_elevation: f32,
    generation_ms: f64,
}

#[derive(Serialize)]
struct Layer {
    name: String,
    data_url: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

fn encode_png(rgba: &[u8], w: usize, h: usize) -> String {
    let mut buf = Vec::new();
    let encoder = PngEncoder::new(&mut buf);
    encoder
        .write_image(rgba, w as u32, h as u32, image::ExtendedColorType::Rgba8)
        .expect("PNG encode failed");
    let b64 = base64::engine::general_purpose::STANDARD.encode(&buf);
    format!("data:image/png;base64,{}", b64)
}

async fn generate_handler(
    Json(req): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>, Json<ErrorResponse>> {
    let defaults = GenerationParams::default();

    let mut params = GenerationParams {
        seed: req.seed.unwrap_or(defaults.seed),
        world_size: req.world_size.unwrap_or(defaults.world_size),
        tile_size: req.tile_size.unwrap_or(defaults.tile_size),
        ..defaults
    };
    if let Some(v) = req.num_plates {
        params.tectonics.num_plates = v;
    }
    if let Some(v) = req.continental_fraction {
        params.tectonics.continental_fraction = v;
    }
    if let Some(v) = req.tectonic_scale {
        params.tectonics.tectonic_scale = v;
    }
    if let Some(v) = req.num_ranges {
        params.mountains.num_ranges = v;
    }
    if let Some(v) = req.max_mountain_height {
        params.mountains.max_height = v;
    }
    if let Some(v) = req.num_basins {
        params.basins.num_basins = v;
    }
    if let Some(v) = req.erosion_iterations {
        params.erosion.iterations = v;
    }
    if let Some(v) = req.erosion_radius {
        params.erosion.radius = v;
    }

    let request = TileRequest {
        tile_x: req.tile_x.unwrap_or(0),
        tile_y: req.tile_y.unwrap_or(0),
        detail: req.detail.unwrap_or(DetailLevel::High),
    };

    let result = tokio::task::spawn_blocking(move || {
        let world = World::new(params).map_err(|e| e.to_string())?;
        let tile = world.synthesize(request).map_err(|e| e.to_string())?;

        let w = tile.elevation.w;
        let h = tile.elevation.h;
        let layers = vec![
            Layer {
                name: "map".into(),
                data_url: encode_png(&render::render_map(&tile.elevation), w, h),
            },
            Layer {
                name: "heightmap".into(),
                data_url: encode_png(&render::render_heightmap(&tile.elevation), w, h),
            },
            Layer {
                name: "temperature".into(),
                data_url: encode_png(&render::render_temperature(&tile.temperature), w, h),
            },
            Layer {
                name: "humidity".into(),
                data_url: encode_png(&render::render_humidity(&tile.humidity), w, h),
            },
            Layer {
                name: "biomes".into(),
                data_url: encode_png(&render::render_biomes(&tile.biomes), w, h),
            },
        ];

        Ok::<GenerateResponse, String>(GenerateResponse {
            layers,
            width: w,
            height: h,
            min_elevation: tile.stats.min_elevation,
            max_elevation: tile.stats.max_elevation,
            mean_elevation: tile.stats.mean_elevation,
            generation_ms: tile.stats.generation_ms,
        })
    })
    .await
    .map_err(|e| Json(ErrorResponse { error: e.to_string() }))?;

    result.map(Json).map_err(|error| Json(ErrorResponse { error }))
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let frontend = ServeDir::new("frontend");

    let app = Router::new()
        .route("/api/generate", post(generate_handler))
        .fallback_service(frontend);

    let addr = SocketAddr::from(([127, 0, 0, 1], 3000));
    eprintln!("tilegen server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
