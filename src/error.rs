//! Błędy startowe: konfiguracja, pliki danych, terminal.
//!
//! Interactive paths never return these; see `dashboard.rs`.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AtlasError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    #[error("missing data file: {}", .0.display())]
    MissingFile(PathBuf),

    #[error("data loader stopped before sending a result")]
    LoaderGone,
}

pub type Result<T> = std::result::Result<T, AtlasError>;
