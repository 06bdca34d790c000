//! Arkusz CSV → obiekty punktowe GeoJSON.
//!
//! One feature per row. Latitude/longitude columns become the point geometry,
//! every other column is copied verbatim as a string property. Rows without
//! usable coordinates are skipped.

use geojson::{Feature, Geometry, JsonObject, Value as GeoValue};
use serde_json::Value;
use tracing::debug;

const LAT_COLUMNS: [&str; 2] = ["lat", "latitude"];
const LNG_COLUMNS: [&str; 4] = ["lng", "lon", "long", "longitude"];

pub fn rows_to_features(text: &str) -> Vec<Feature> {
    let mut lines = text.lines().filter(|l| !l.trim().is_empty());
    let Some(header) = lines.next() else {
        return Vec::new();
    };
    let columns: Vec<String> = split_fields(header)
        .into_iter()
        .map(|c| c.trim().to_string())
        .collect();

    let find = |names: &[&str]| {
        columns
            .iter()
            .position(|c| names.iter().any(|n| c.eq_ignore_ascii_case(n)))
    };
    let (Some(lat_idx), Some(lng_idx)) = (find(&LAT_COLUMNS), find(&LNG_COLUMNS)) else {
        debug!(?columns, "no latitude/longitude columns, nothing ingested");
        return Vec::new();
    };

    let mut features = Vec::new();
    let mut dropped = 0usize;
    for line in lines {
        let fields = split_fields(line);
        let coord = |idx: usize| fields.get(idx).and_then(|f| parse_decimal(f));
        let (Some(lat), Some(lng)) = (coord(lat_idx), coord(lng_idx)) else {
            dropped += 1;
            continue;
        };

        let mut properties = JsonObject::new();
        for (i, name) in columns.iter().enumerate() {
            if i == lat_idx || i == lng_idx {
                continue;
            }
            let value = fields.get(i).cloned().unwrap_or_default();
            properties.insert(name.clone(), Value::String(value));
        }

        features.push(Feature {
            bbox: None,
            geometry: Some(Geometry::new(GeoValue::Point(vec![lng, lat]))),
            id: None,
            properties: Some(properties),
            foreign_members: None,
        });
    }
    debug!(kept = features.len(), dropped, "spreadsheet rows ingested");
    features
}

/// Przecinek jako separator dziesiętny: "6,5244" == 6.5244
pub fn parse_decimal(raw: &str) -> Option<f64> {
    let cleaned = raw.trim().replace(',', ".");
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Pola rozdzielone przecinkami, cudzysłowy chronią przecinki, `""` to `"`.
fn split_fields(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' if quoted && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => quoted = !quoted,
            ',' if !quoted => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    fields.push(current);
    fields
}
