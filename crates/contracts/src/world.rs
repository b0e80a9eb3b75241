//! World-level simulator vocabulary: actor handles, body blueprints, map
//! layers and weather presets.

use serde::{Deserialize, Serialize};

/// Simulator actor handle type
pub type ActorId = u32;

/// One spawnable body blueprint from the simulator library
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BodyBlueprint {
    /// Blueprint identifier, e.g. "vehicle.dodge.charger_2020"
    pub id: String,

    /// Wheel count attribute; non-vehicle bodies report 0
    pub number_of_wheels: u32,
}

impl BodyBlueprint {
    pub fn new(id: impl Into<String>, number_of_wheels: u32) -> Self {
        Self {
            id: id.into(),
            number_of_wheels,
        }
    }
}

/// Cosmetic map layers disabled for performance and determinism
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MapLayer {
    Foliage,
    ParkedVehicles,
}

/// Weather presets, in rotation order
///
/// The capture loop cycles through [`WEATHER_ROTATION`] instead of sampling
/// uniformly, so a run covers the list deterministically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeatherPreset {
    Default,
    ClearNoon,
    CloudyNoon,
    WetNoon,
    WetCloudyNoon,
    MidRainyNoon,
    HardRainNoon,
    SoftRainNoon,
    ClearSunset,
    CloudySunset,
    WetSunset,
    WetCloudySunset,
    MidRainSunset,
    HardRainSunset,
    SoftRainSunset,
}

/// Fixed ordered weather list the capture loop advances through
pub const WEATHER_ROTATION: [WeatherPreset; 15] = [
    WeatherPreset::Default,
    WeatherPreset::ClearNoon,
    WeatherPreset::CloudyNoon,
    WeatherPreset::WetNoon,
    WeatherPreset::WetCloudyNoon,
    WeatherPreset::MidRainyNoon,
    WeatherPreset::HardRainNoon,
    WeatherPreset::SoftRainNoon,
    WeatherPreset::ClearSunset,
    WeatherPreset::CloudySunset,
    WeatherPreset::WetSunset,
    WeatherPreset::WetCloudySunset,
    WeatherPreset::MidRainSunset,
    WeatherPreset::HardRainSunset,
    WeatherPreset::SoftRainSunset,
];

/// Default town rotation, round-robin with wraparound across episodes
pub const TOWN_ROTATION: [&str; 8] = [
    "Town01", "Town02", "Town03", "Town04", "Town05", "Town06", "Town07", "Town10HD",
];
