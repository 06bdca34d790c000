use geo::{Coord, Geometry, MultiPolygon};
use geojson::{Feature, GeoJson, JsonObject};
use serde_json::{Value, from_slice};
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    str::FromStr,
    sync::Arc,
};
use tracing::{debug, info, warn};

use crate::{
    catalog::{
        PROP_ID, PROP_NAME, PROP_REGION, PROP_STATUS, PROP_TOTAL, PROP_TYPE, PROP_YEAR,
        STATUSES, TYPES,
    },
    config::AtlasConfig,
    error::{AtlasError, Result},
    expr::as_text,
    ingest,
    stats::{RegionStats, RegionStore, normalize_region},
};

/// Granica regionu wraz z właściwościami dla renderera (`name`, `total`).
#[derive(Clone, Debug)]
pub struct RegionShape {
    pub name: String,
    pub geometry: MultiPolygon<f64>,
    pub properties: JsonObject,
}

/// Jeden projekt na mapie. Niezmienny po załadowaniu.
#[derive(Clone, Debug, PartialEq)]
pub struct ProjectPoint {
    pub id: String,
    pub coordinates: Coord<f64>,
    pub year: String,
    pub status: String,
    pub project_type: String,
    pub region: String,
    pub title: String,
    pub location: String,
    pub contractor: String,
    pub lot: String,
    /// Wszystkie kolumny źródła; `region` i `id` już znormalizowane
    pub properties: JsonObject,
}

impl ProjectPoint {
    /// Accepts upper- or lower-case keys, the way spreadsheet exports vary.
    pub fn from_feature(index: usize, feature: &Feature) -> Option<Self> {
        let coordinates = match feature.geometry.as_ref().map(|g| &g.value) {
            Some(geojson::Value::Point(p)) if p.len() >= 2 => Coord { x: p[0], y: p[1] },
            _ => return None,
        };
        let source = feature.properties.clone().unwrap_or_default();
        let mut properties = JsonObject::new();
        for (key, value) in &source {
            properties.insert(key.to_lowercase(), value.clone());
        }
        let text = |key: &str| properties.get(key).map(as_text).unwrap_or_default();

        let id = match text(PROP_ID) {
            id if !id.is_empty() => id,
            _ => format!("p-{index}"),
        };
        let region = normalize_region(&text(PROP_REGION));
        let point = Self {
            id: id.clone(),
            coordinates,
            year: text(PROP_YEAR),
            status: text(PROP_STATUS).trim().to_uppercase(),
            project_type: text(PROP_TYPE).trim().to_uppercase(),
            region: region.clone(),
            title: text("title"),
            location: text("location"),
            contractor: text("contractor"),
            lot: text("lot"),
            properties: JsonObject::new(),
        };

        properties.insert(PROP_ID.into(), Value::String(id));
        properties.insert(PROP_REGION.into(), Value::String(region));
        properties.insert(PROP_STATUS.into(), Value::String(point.status.clone()));
        properties.insert(PROP_TYPE.into(), Value::String(point.project_type.clone()));
        Some(Self { properties, ..point })
    }

    pub fn in_known_domain(&self) -> bool {
        STATUSES.contains(&self.status.as_str()) && TYPES.contains(&self.project_type.as_str())
    }
}

/// Wszystko, co ładujemy raz przed pierwszym renderem.
#[derive(Debug)]
pub struct LoadedData {
    pub regions: Vec<RegionShape>,
    pub projects: Vec<Arc<ProjectPoint>>,
    pub store: RegionStore,
}

/// Ładowanie plików z katalogu danych
pub struct DataCache {
    base: PathBuf,
    config: AtlasConfig,
}

impl DataCache {
    pub fn new<P: AsRef<Path>>(base: P, config: AtlasConfig) -> Self {
        Self {
            base: base.as_ref().to_path_buf(),
            config,
        }
    }

    fn path(&self, file: &str) -> Result<PathBuf> {
        let path = self.base.join(file);
        if !path.exists() {
            return Err(AtlasError::MissingFile(path));
        }
        Ok(path)
    }

    pub fn load_all(&self) -> Result<LoadedData> {
        let store = self.load_stats()?;
        let regions = self.load_regions(&store)?;
        let projects = self.load_projects()?;
        info!(
            regions = regions.len(),
            stats = store.len(),
            projects = projects.len(),
            "data loaded"
        );
        Ok(LoadedData {
            regions,
            projects,
            store,
        })
    }

    pub fn load_stats(&self) -> Result<RegionStore> {
        let data = fs::read(self.path(&self.config.stats_file)?)?;
        let records: BTreeMap<String, RegionStats> = from_slice(&data)?;
        for (name, stats) in &records {
            if !stats.is_consistent() {
                debug!(region = %name, "status counts do not add up to total");
            }
        }
        let store = RegionStore::from_records(records);
        if store.is_empty() {
            warn!("region stats file has no records");
        }
        Ok(store)
    }

    /// Regiony wzbogacone o `total` ze statystyk (0, gdy brak rekordu).
    pub fn load_regions(&self, store: &RegionStore) -> Result<Vec<RegionShape>> {
        let file = &self.config.regions_file;
        let txt = fs::read_to_string(self.path(file)?)?;
        let mut out = Vec::new();

        if let GeoJson::FeatureCollection(fc) = GeoJson::from_str(&txt)? {
            for feature in fc.features {
                let mut properties = feature.properties.clone().unwrap_or_default();
                let name = properties
                    .get(&self.config.region_name_property)
                    .map(as_text)
                    .map(|n| normalize_region(&n))
                    .unwrap_or_default();

                let Some(gj) = feature.geometry else { continue };
                let geom: Geometry<f64> = gj.value.try_into()?;
                let geometry = match geom {
                    Geometry::Polygon(p) => p.into(),
                    Geometry::MultiPolygon(m) => m,
                    other => {
                        warn!(region = %name, kind = geometry_kind(&other), "non-polygon region skipped");
                        continue;
                    }
                };

                let total = match store.lookup(&name) {
                    Some(stats) => stats.total,
                    None => {
                        warn!(region = %name, "no aggregate record for region");
                        0
                    }
                };
                properties.insert(PROP_NAME.into(), Value::String(name.clone()));
                properties.insert(PROP_TOTAL.into(), Value::from(total));
                out.push(RegionShape {
                    name,
                    geometry,
                    properties,
                });
            }
        }
        Ok(out)
    }

    pub fn load_projects(&self) -> Result<Vec<Arc<ProjectPoint>>> {
        let file = &self.config.projects_file;
        let path = self.path(file)?;
        let features = if file.to_lowercase().ends_with(".csv") {
            ingest::rows_to_features(&fs::read_to_string(&path)?)
        } else {
            match GeoJson::from_str(&fs::read_to_string(&path)?)? {
                GeoJson::FeatureCollection(fc) => fc.features,
                GeoJson::Feature(f) => vec![f],
                GeoJson::Geometry(_) => Vec::new(),
            }
        };

        let mut projects = Vec::with_capacity(features.len());
        for (index, feature) in features.iter().enumerate() {
            match ProjectPoint::from_feature(index, feature) {
                Some(p) => {
                    if !p.in_known_domain() {
                        debug!(id = %p.id, status = %p.status, kind = %p.project_type, "project outside filter domain");
                    }
                    projects.push(Arc::new(p));
                }
                None => debug!(index, "project without point geometry skipped"),
            }
        }
        Ok(projects)
    }
}

fn geometry_kind(g: &Geometry<f64>) -> &'static str {
    match g {
        Geometry::Point(_) => "Point",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::LineString(_) => "LineString",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        _ => "other",
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    pub(crate) const REGIONS: &str = r#"{
      "type": "FeatureCollection",
      "features": [
        { "type": "Feature", "properties": { "name": "Lagos" },
          "geometry": { "type": "Polygon", "coordinates": [[[2.7,6.3],[4.4,6.3],[4.4,6.8],[2.7,6.8],[2.7,6.3]]] } },
        { "type": "Feature", "properties": { "name": "Kano" },
          "geometry": { "type": "Polygon", "coordinates": [[[7.6,10.6],[9.4,10.6],[9.4,12.6],[7.6,12.6],[7.6,10.6]]] } },
        { "type": "Feature", "properties": { "name": "Federal Capital Territory" },
          "geometry": { "type": "Polygon", "coordinates": [[[6.7,8.4],[7.6,8.4],[7.6,9.3],[6.7,9.3],[6.7,8.4]]] } }
      ]
    }"#;

    pub(crate) const STATS: &str = r#"{
      "LAGOS": { "total": 3, "completed": 1, "ongoing": 2, "yetToMobilize": 0, "pctCompleted": 33.3,
                 "perTechnologyCounts": { "SOLAR STREET LIGHT": 2, "SOLAR MINI GRID": 1 } },
      "kano": { "total": 0, "completed": 0, "ongoing": 0, "yetToMobilize": 0, "pctCompleted": 0 }
    }"#;

    pub(crate) const PROJECTS: &str = r#"{
      "type": "FeatureCollection",
      "features": [
        { "type": "Feature", "geometry": { "type": "Point", "coordinates": [3.35, 6.60] },
          "properties": { "ID": "p-1", "YEAR": 2022, "STATUS": "ONGOING", "TYPE": "SOLAR STREET LIGHT",
                          "REGION": "Lagos", "TITLE": "Ikeja lights", "LOCATION": "Ikeja", "CONTRACTOR": "Acme", "LOT": "12" } },
        { "type": "Feature", "geometry": { "type": "Point", "coordinates": [3.90, 6.45] },
          "properties": { "ID": "p-2", "YEAR": "2021", "STATUS": "COMPLETED", "TYPE": "SOLAR MINI GRID", "REGION": "lagos" } },
        { "type": "Feature", "geometry": { "type": "Point", "coordinates": [8.50, 12.00] },
          "properties": { "ID": "p-3", "YEAR": "2022", "STATUS": "ongoing", "TYPE": "GRID EXTENSION", "REGION": "KANO" } },
        { "type": "Feature", "geometry": null, "properties": { "ID": "p-4" } }
      ]
    }"#;

    pub(crate) fn fixture_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("regions.geojson"), REGIONS).unwrap();
        fs::write(dir.path().join("region_stats.json"), STATS).unwrap();
        fs::write(dir.path().join("projects.geojson"), PROJECTS).unwrap();
        dir
    }

    pub(crate) fn fixture_data() -> LoadedData {
        let dir = fixture_dir();
        DataCache::new(dir.path(), AtlasConfig::default()).load_all().unwrap()
    }

    #[test]
    fn regions_are_normalized_and_enriched() {
        let data = fixture_data();
        let names: Vec<_> = data.regions.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["LAGOS", "KANO", "FEDERAL CAPITAL TERRITORY"]);
        assert_eq!(data.regions[0].properties.get(PROP_TOTAL), Some(&Value::from(3)));
        // brak rekordu nie jest błędem
        assert_eq!(data.regions[2].properties.get(PROP_TOTAL), Some(&Value::from(0)));
    }

    #[test]
    fn projects_are_parsed_and_normalized() {
        let data = fixture_data();
        assert_eq!(data.projects.len(), 3);
        let p1 = &data.projects[0];
        assert_eq!(p1.id, "p-1");
        assert_eq!(p1.year, "2022");
        assert_eq!(p1.region, "LAGOS");
        assert_eq!(p1.contractor, "Acme");
        assert_eq!(p1.properties.get(PROP_REGION), Some(&Value::String("LAGOS".into())));
        assert_eq!(data.projects[2].status, "ONGOING");
        assert!(data.projects.iter().all(|p| p.in_known_domain()));
    }

    #[test]
    fn csv_projects_go_through_ingestion() {
        let dir = fixture_dir();
        fs::write(
            dir.path().join("projects.csv"),
            "id,title,lat,lng,status,type,region,year\n7,Borehole,\"9,05\",\"7,49\",ONGOING,SOLAR POWERED BOREHOLE,fct,2023\n8,No coords,,,ONGOING,TRANSFORMER,fct,2023\n",
        )
        .unwrap();
        let config = AtlasConfig {
            projects_file: "projects.csv".into(),
            ..AtlasConfig::default()
        };
        let projects = DataCache::new(dir.path(), config).load_projects().unwrap();
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].id, "7");
        assert_eq!(projects[0].coordinates, Coord { x: 7.49, y: 9.05 });
        assert_eq!(projects[0].region, "FCT");
    }

    #[test]
    fn non_polygon_regions_are_skipped() {
        let dir = fixture_dir();
        fs::write(
            dir.path().join("regions.geojson"),
            r#"{ "type": "FeatureCollection", "features": [
                { "type": "Feature", "properties": { "name": "Lagos" },
                  "geometry": { "type": "Polygon", "coordinates": [[[2.7,6.3],[4.4,6.3],[4.4,6.8],[2.7,6.8],[2.7,6.3]]] } },
                { "type": "Feature", "properties": { "name": "Label" },
                  "geometry": { "type": "Point", "coordinates": [3.5, 6.5] } }
            ] }"#,
        )
        .unwrap();
        let data = DataCache::new(dir.path(), AtlasConfig::default()).load_all().unwrap();
        let names: Vec<_> = data.regions.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["LAGOS"]);
        assert_eq!(data.projects.len(), 3);
    }

    #[test]
    fn missing_files_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = DataCache::new(dir.path(), AtlasConfig::default()).load_all();
        assert!(matches!(err, Err(AtlasError::MissingFile(_))));
    }
}
