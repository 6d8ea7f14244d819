use serde::{Deserialize, Serialize};

/// Air temperature in °C at a normalized point. Latitude runs from the
/// equator at y = 0.5 to poles at the edges; lapse rate 6.5 °C per km of
/// elevation, capped at 5 km.
pub fn temperature(x: f32, y: f32, elevation: f32) -> f32 {
    let latitude = (y - 0.5).abs() * 2.0;
    let altitude = (elevation / 1000.0).clamp(0.0, 5.0);
    let base = 30.0 - latitude * 40.0 - altitude * 6.5;
    base + (x * std::f32::consts::PI * 4.0).sin() * (y * std::f32::consts::PI * 3.0).cos() * 5.0
}

/// Relative humidity in [0, 1]. Coastal proximity is approximated by
/// inverse distance to the world center; high terrain is drier.
pub fn humidity(x: f32, y: f32, elevation: f32) -> f32 {
    let center_dist = ((x - 0.5) * (x - 0.5) + (y - 0.5) * (y - 0.5)).sqrt();
    let coastal = 1.0 - (center_dist * 2.0).clamp(0.0, 1.0);
    let altitude = (1.0 - elevation / 2000.0).clamp(0.0, 1.0);
    let orographic =
        (x * std::f32::consts::PI * 6.0).sin() * (y * std::f32::consts::PI * 4.0).cos() * 0.3;
    (coastal * 0.6 + altitude * 0.4 + orographic).clamp(0.0, 1.0)
}

/// Climate at one sample point.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClimateSample {
    pub temperature: f32,
    pub humidity: f32,
}

pub fn sample(x: f32, y: f32, elevation: f32) -> ClimateSample {
    ClimateSample {
        temperature: temperature(x, y, elevation),
        humidity: humidity(x, y, elevation),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Biome {
    Ocean = 0,
    Beach,
    Plains,
    Forest,
    Hills,
    Mountains,
    Alpine,
    Snow,
    Desert,
    Tundra,
    Swamp,
}

pub struct BiomeProps {
    pub name: &'static str,
    pub elevation: (f32, f32),
    pub temperature: (f32, f32),
    pub humidity: (f32, f32),
    pub vegetation_density: f32,
    pub rock_exposure: f32,
}

pub const CATALOG: [Biome; 11] = [
    Biome::Ocean,
    Biome::Beach,
    Biome::Plains,
    Biome::Forest,
    Biome::Hills,
    Biome::Mountains,
    Biome::Alpine,
    Biome::Snow,
    Biome::Desert,
    Biome::Tundra,
    Biome::Swamp,
];

impl Biome {
    /// Inverse of `biome as u8`; out-of-range ids fall back to plains.
    pub fn from_id(id: u8) -> Biome {
        CATALOG.get(id as usize).copied().unwrap_or(Biome::Plains)
    }

    pub fn props(self) -> BiomeProps {
        match self {
            Biome::Ocean => BiomeProps {
                name: "ocean",
                elevation: (-1000.0, 0.0),
                temperature: (0.0, 30.0),
                humidity: (0.7, 1.0),
                vegetation_density: 0.0,
                rock_exposure: 0.0,
            },
            Biome::Beach => BiomeProps {
                name: "beach",
                elevation: (0.0, 10.0),
                temperature: (15.0, 35.0),
                humidity: (0.6, 1.0),
                vegetation_density: 0.1,
                rock_exposure: 0.2,
            },
            Biome::Plains => BiomeProps {
                name: "plains",
                elevation: (10.0, 200.0),
                temperature: (10.0, 30.0),
                humidity: (0.3, 0.8),
                vegetation_density: 0.6,
                rock_exposure: 0.1,
            },
            Biome::Forest => BiomeProps {
                name: "forest",
                elevation: (50.0, 800.0),
                temperature: (5.0, 25.0),
                humidity: (0.6, 1.0),
                vegetation_density: 0.9,
                rock_exposure: 0.05,
            },
            Biome::Hills => BiomeProps {
                name: "hills",
                elevation: (200.0, 600.0),
                temperature: (5.0, 20.0),
                humidity: (0.4, 0.8),
                vegetation_density: 0.5,
                rock_exposure: 0.3,
            },
            Biome::Mountains => BiomeProps {
                name: "mountains",
                elevation: (600.0, 2000.0),
                temperature: (-5.0, 15.0),
                humidity: (0.3, 0.7),
                vegetation_density: 0.2,
                rock_exposure: 0.7,
            },
            Biome::Alpine => BiomeProps {
                name: "alpine",
                elevation: (2000.0, 3500.0),
                temperature: (-15.0, 5.0),
                humidity: (0.2, 0.6),
                vegetation_density: 0.1,
                rock_exposure: 0.8,
            },
            Biome::Snow => BiomeProps {
                name: "snow",
                elevation: (3500.0, 10000.0),
                temperature: (-30.0, -5.0),
                humidity: (0.1, 0.5),
                vegetation_density: 0.0,
                rock_exposure: 0.9,
            },
            Biome::Desert => BiomeProps {
                name: "desert",
                elevation: (0.0, 1000.0),
                temperature: (20.0, 50.0),
                humidity: (0.0, 0.2),
                vegetation_density: 0.05,
                rock_exposure: 0.4,
            },
            Biome::Tundra => BiomeProps {
                name: "tundra",
                elevation: (0.0, 500.0),
                temperature: (-20.0, 5.0),
                humidity: (0.3, 0.8),
                vegetation_density: 0.2,
                rock_exposure: 0.3,
            },
            Biome::Swamp => BiomeProps {
                name: "swamp",
                elevation: (0.0, 50.0),
                temperature: (15.0, 35.0),
                humidity: (0.8, 1.0),
                vegetation_density: 0.8,
                rock_exposure: 0.05,
            },
        }
    }
}

/// How centered a value sits within a range: 1 at the center, 0 at the
/// edges, negative outside. Never gated, so every candidate scores.
#[inline]
fn centeredness(value: f32, (lo, hi): (f32, f32)) -> f32 {
    let half = ((hi - lo) * 0.5).max(1e-3);
    let center = (lo + hi) * 0.5;
    1.0 - (value - center).abs() / half
}

/// Classifies climate samples into the biome catalog. Total over all
/// inputs: the best-scoring biome always exists, ties break by catalog
/// order.
pub struct BiomeClassifier;

impl BiomeClassifier {
    pub fn classify(elevation: f32, temperature: f32, humidity: f32) -> Biome {
        let mut best = CATALOG[0];
        let mut best_score = f32::NEG_INFINITY;
        for biome in CATALOG {
            let p = biome.props();
            let score = centeredness(elevation, p.elevation) * 0.4
                + centeredness(temperature, p.temperature) * 0.3
                + centeredness(humidity, p.humidity) * 0.3;
            if score > best_score {
                best_score = score;
                best = biome;
            }
        }
        best
    }

    /// Full per-point pipeline: climate then classification.
    pub fn classify_at(x: f32, y: f32, elevation: f32) -> (Biome, ClimateSample) {
        let climate = sample(x, y, elevation);
        (
            Self::classify(elevation, climate.temperature, climate.humidity),
            climate,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equator_is_warmer_than_poles() {
        let eq = temperature(0.25, 0.5, 0.0);
        let pole = temperature(0.25, 0.0, 0.0);
        assert!(eq > pole + 20.0);
    }

    #[test]
    fn altitude_cools() {
        let low = temperature(0.3, 0.5, 0.0);
        let high = temperature(0.3, 0.5, 3000.0);
        assert!((low - high - 3.0 * 6.5).abs() < 1e-3);
    }

    #[test]
    fn humidity_clamped_to_unit() {
        for iy in 0..20 {
            for ix in 0..20 {
                let h = humidity(ix as f32 / 19.0, iy as f32 / 19.0, -500.0);
                assert!((0.0..=1.0).contains(&h));
            }
        }
    }

    #[test]
    fn deep_wet_points_are_ocean() {
        assert_eq!(BiomeClassifier::classify(-400.0, 18.0, 0.9), Biome::Ocean);
    }

    #[test]
    fn hot_dry_lowland_is_desert() {
        assert_eq!(BiomeClassifier::classify(300.0, 35.0, 0.1), Biome::Desert);
    }

    #[test]
    fn cold_flat_terrain_is_tundra() {
        assert_eq!(BiomeClassifier::classify(200.0, -8.0, 0.55), Biome::Tundra);
    }

    #[test]
    fn high_peaks_are_snow() {
        assert_eq!(BiomeClassifier::classify(5000.0, -18.0, 0.3), Biome::Snow);
    }

    #[test]
    fn warm_saturated_lowland_is_swamp() {
        assert_eq!(BiomeClassifier::classify(20.0, 25.0, 0.95), Biome::Swamp);
    }

    #[test]
    fn classification_is_total() {
        // Sweep well past plausible ranges; every input must land on a
        // catalog entry without panicking.
        for ei in -5..=15 {
            for ti in -6..=6 {
                for hi in -2..=4 {
                    let e = ei as f32 * 1000.0;
                    let t = ti as f32 * 10.0;
                    let h = hi as f32 * 0.5;
                    let biome = BiomeClassifier::classify(e, t, h);
                    assert!((biome as u8) < 11);
                }
            }
        }
    }
}
