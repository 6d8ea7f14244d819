use rayon::prelude::*;

use crate::climate::Biome;
use crate::grid::Grid;

// Color palette tuned for meter-scale elevation
const WATER_DEEP: [u8; 4] = [18, 36, 70, 255];
const WATER_MID: [u8; 4] = [32, 55, 92, 255];
const WATER_SHALLOW: [u8; 4] = [38, 78, 120, 255];
const COAST_SHALLOW: [u8; 4] = [52, 100, 145, 255];
const LAND_LOW: [u8; 4] = [70, 130, 62, 255];
const LAND_MID: [u8; 4] = [140, 180, 100, 255];
const LAND_HIGH: [u8; 4] = [190, 170, 120, 255];
const MOUNTAIN_LOW: [u8; 4] = [140, 120, 100, 255];
const MOUNTAIN_HIGH: [u8; 4] = [220, 220, 215, 255];
const SNOW: [u8; 4] = [245, 248, 250, 255];
const BEACH_SAND: [u8; 4] = [210, 200, 160, 255];

#[inline]
fn lerp_color(a: [u8; 4], b: [u8; 4], t: f32) -> [u8; 4] {
    let t = t.clamp(0.0, 1.0);
    [
        (a[0] as f32 + (b[0] as f32 - a[0] as f32) * t).round() as u8,
        (a[1] as f32 + (b[1] as f32 - a[1] as f32) * t).round() as u8,
        (a[2] as f32 + (b[2] as f32 - a[2] as f32) * t).round() as u8,
        255,
    ]
}

/// Render the elevation color map.
pub fn render_map(height: &Grid<f32>) -> Vec<u8> {
    let w = height.w;
    let h = height.h;
    let mut rgba = vec![0u8; w * h * 4];

    rgba.par_chunks_mut(w * 4).enumerate().for_each(|(y, row)| {
        for x in 0..w {
            let elev = height.get(x, y);
            let color = if elev <= 0.0 {
                // Water
                let depth = (-elev).min(5000.0) / 5000.0;
                if depth < 0.15 {
                    lerp_color(COAST_SHALLOW, WATER_SHALLOW, depth / 0.15)
                } else if depth < 0.5 {
                    lerp_color(WATER_SHALLOW, WATER_MID, (depth - 0.15) / 0.35)
                } else {
                    lerp_color(WATER_MID, WATER_DEEP, (depth - 0.5) / 0.5)
                }
            } else {
                // Land
                let h = elev.min(6000.0);
                if h < 5.0 {
                    BEACH_SAND
                } else if h < 500.0 {
                    lerp_color(LAND_LOW, LAND_MID, (h - 5.0) / 495.0)
                } else if h < 1500.0 {
                    lerp_color(LAND_MID, LAND_HIGH, (h - 500.0) / 1000.0)
                } else if h < 3000.0 {
                    lerp_color(MOUNTAIN_LOW, MOUNTAIN_HIGH, (h - 1500.0) / 1500.0)
                } else {
                    lerp_color(MOUNTAIN_HIGH, SNOW, ((h - 3000.0) / 3000.0).min(1.0))
                }
            };

            row[x * 4..x * 4 + 4].copy_from_slice(&color);
        }
    });

    rgba
}

/// Diagnostic: grayscale heightmap.
pub fn render_heightmap(height: &Grid<f32>) -> Vec<u8> {
    let min_h = height.data.iter().cloned().fold(f32::INFINITY, f32::min);
    let max_h = height.data.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
    let range = (max_h - min_h).max(1.0);
    let w = height.w;
    let h = height.h;
    let mut rgba = vec![0u8; w * h * 4];
    for i in 0..w * h {
        let t = (height.data[i] - min_h) / range;
        let v = (t * 255.0).clamp(0.0, 255.0) as u8;
        rgba[i * 4..i * 4 + 4].copy_from_slice(&[v, v, v, 255]);
    }
    rgba
}

// Temperature color stops
const TEMP_COLD: [u8; 4] = [220, 230, 255, 255]; // -30C: white-blue
const TEMP_FREEZE: [u8; 4] = [80, 180, 220, 255]; // 0C: cyan
const TEMP_COOL: [u8; 4] = [60, 160, 80, 255]; // 15C: green
const TEMP_WARM: [u8; 4] = [220, 200, 60, 255]; // 25C: yellow
const TEMP_HOT: [u8; 4] = [200, 50, 30, 255]; // 35C+: red

/// Render temperature map (Celsius).
pub fn render_temperature(temp: &Grid<f32>) -> Vec<u8> {
    let w = temp.w;
    let h = temp.h;
    let mut rgba = vec![0u8; w * h * 4];

    rgba.par_chunks_mut(w * 4).enumerate().for_each(|(y, row)| {
        for x in 0..w {
            let t = temp.get(x, y);
            let color = if t < -30.0 {
                TEMP_COLD
            } else if t < 0.0 {
                lerp_color(TEMP_COLD, TEMP_FREEZE, (t + 30.0) / 30.0)
            } else if t < 15.0 {
                lerp_color(TEMP_FREEZE, TEMP_COOL, t / 15.0)
            } else if t < 25.0 {
                lerp_color(TEMP_COOL, TEMP_WARM, (t - 15.0) / 10.0)
            } else if t < 35.0 {
                lerp_color(TEMP_WARM, TEMP_HOT, (t - 25.0) / 10.0)
            } else {
                TEMP_HOT
            };
            row[x * 4..x * 4 + 4].copy_from_slice(&color);
        }
    });

    rgba
}

// Humidity color stops
const HUMID_DRY: [u8; 4] = [200, 180, 130, 255]; // parched tan
const HUMID_LOW: [u8; 4] = [210, 200, 80, 255];
const HUMID_MED: [u8; 4] = [60, 160, 70, 255];
const HUMID_HIGH: [u8; 4] = [50, 100, 200, 255];
const HUMID_SAT: [u8; 4] = [20, 40, 120, 255]; // saturated dark blue

/// Render relative humidity in [0, 1].
pub fn render_humidity(humid: &Grid<f32>) -> Vec<u8> {
    let w = humid.w;
    let h = humid.h;
    let mut rgba = vec![0u8; w * h * 4];

    rgba.par_chunks_mut(w * 4).enumerate().for_each(|(y, row)| {
        for x in 0..w {
            let v = humid.get(x, y);
            let color = if v < 0.25 {
                lerp_color(HUMID_DRY, HUMID_LOW, v / 0.25)
            } else if v < 0.5 {
                lerp_color(HUMID_LOW, HUMID_MED, (v - 0.25) / 0.25)
            } else if v < 0.75 {
                lerp_color(HUMID_MED, HUMID_HIGH, (v - 0.5) / 0.25)
            } else {
                lerp_color(HUMID_HIGH, HUMID_SAT, (v - 0.75) / 0.25)
            };
            row[x * 4..x * 4 + 4].copy_from_slice(&color);
        }
    });

    rgba
}

fn biome_color(biome: Biome) -> [u8; 4] {
    match biome {
        Biome::Ocean => [26, 77, 153, 255],
        Biome::Beach => [230, 204, 153, 255],
        Biome::Plains => [102, 153, 51, 255],
        Biome::Forest => [51, 128, 26, 255],
        Biome::Hills => [128, 102, 51, 255],
        Biome::Mountains => [153, 128, 102, 255],
        Biome::Alpine => [179, 153, 128, 255],
        Biome::Snow => [230, 230, 255, 255],
        Biome::Desert => [204, 179, 102, 255],
        Biome::Tundra => [102, 128, 77, 255],
        Biome::Swamp => [64, 90, 51, 255],
    }
}

/// Diagnostic: flat color per biome.
pub fn render_biomes(biomes: &Grid<u8>) -> Vec<u8> {
    let w = biomes.w;
    let h = biomes.h;
    let mut rgba = vec![0u8; w * h * 4];
    for i in 0..w * h {
        let color = biome_color(Biome::from_id(biomes.data[i]));
        rgba[i * 4..i * 4 + 4].copy_from_slice(&color);
    }
    rgba
}
