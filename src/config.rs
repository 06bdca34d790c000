use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::error::Result;

/// Nazwa pliku konfiguracyjnego w katalogu danych
pub const CONFIG_FILE: &str = "atlas.toml";
/// Zmienna środowiskowa z katalogiem danych
pub const DATA_DIR_ENV: &str = "PROJECT_ATLAS_DATA";

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AtlasConfig {
    pub regions_file: String,
    pub stats_file: String,
    /// `.geojson` albo `.csv` (kolumny lat/lng)
    pub projects_file: String,
    pub region_name_property: String,
    pub count_debounce_ms: u64,
    pub fit_padding: f64,
    /// [lon, lat]
    pub home_center: [f64; 2],
    pub home_zoom: f64,
    pub log_dir: String,
}

impl Default for AtlasConfig {
    fn default() -> Self {
        Self {
            regions_file: "regions.geojson".to_string(),
            stats_file: "region_stats.json".to_string(),
            projects_file: "projects.geojson".to_string(),
            region_name_property: "name".to_string(),
            count_debounce_ms: 300,
            fit_padding: 0.1,
            home_center: [8.68, 9.08],
            home_zoom: 5.0,
            log_dir: "logs".to_string(),
        }
    }
}

impl AtlasConfig {
    /// Czyta `atlas.toml` z katalogu danych; brak pliku = wartości domyślne.
    pub fn load<P: AsRef<Path>>(data_dir: P) -> Result<Self> {
        let path = data_dir.as_ref().join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }
        let txt = fs::read_to_string(&path)?;
        Ok(toml::from_str(&txt)?)
    }

    pub fn data_dir() -> PathBuf {
        std::env::var_os(DATA_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("data"))
    }

    pub fn count_debounce(&self) -> Duration {
        Duration::from_millis(self.count_debounce_ms)
    }
}
