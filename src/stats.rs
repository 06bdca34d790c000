use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::warn;

use crate::view::Technology;

/// Zagregowane statystyki regionu, ładowane z `region_stats.json`
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegionStats {
    pub total: u64,
    pub completed: u64,
    pub ongoing: u64,
    pub yet_to_mobilize: u64,
    pub pct_completed: f64,
    /// Klucz: etykieta technologii ze źródła danych
    #[serde(alias = "perTechnologyCounts")]
    pub technologies: BTreeMap<String, u64>,
}

impl RegionStats {
    /// Percentage of `part` in `total`; 0 when the region has no projects.
    pub fn share_pct(&self, part: u64) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            part as f64 * 100.0 / self.total as f64
        }
    }

    /// Udział każdej technologii, zsumowany po klasach z `Technology::classify`.
    pub fn technology_shares(&self) -> Vec<(Technology, u64, f64)> {
        let mut by_class: BTreeMap<Technology, u64> = BTreeMap::new();
        for (label, count) in &self.technologies {
            *by_class.entry(Technology::classify(label)).or_default() += count;
        }
        by_class
            .into_iter()
            .map(|(tech, count)| (tech, count, self.share_pct(count)))
            .collect()
    }

    /// Status counts that do not add up to `total` are shown as-is.
    pub fn is_consistent(&self) -> bool {
        self.completed + self.ongoing + self.yet_to_mobilize == self.total
    }
}

/// Trim, collapse inner whitespace, upper-case.
pub fn normalize_region(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

#[derive(Debug, Default)]
pub struct RegionStore {
    records: BTreeMap<String, RegionStats>,
}

impl RegionStore {
    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = (String, RegionStats)>,
    {
        let mut out = BTreeMap::new();
        for (name, stats) in records {
            let key = normalize_region(&name);
            if out.insert(key.clone(), stats).is_some() {
                warn!(raw = %name, region = %key, "duplicate region stats, last record kept");
            }
        }
        Self { records: out }
    }

    pub fn lookup(&self, region: &str) -> Option<&RegionStats> {
        self.records.get(&normalize_region(region))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Zawartość prawego panelu dla klikniętego regionu.
#[derive(Clone, Debug, PartialEq)]
pub enum RegionPanel {
    Stats { region: String, stats: RegionStats },
    NoData { region: String },
}

impl RegionPanel {
    pub fn resolve(store: &RegionStore, region: &str) -> Self {
        let region = normalize_region(region);
        match store.lookup(&region) {
            Some(stats) => RegionPanel::Stats {
                region,
                stats: stats.clone(),
            },
            None => RegionPanel::NoData { region },
        }
    }

    pub fn region(&self) -> &str {
        match self {
            RegionPanel::Stats { region, .. } | RegionPanel::NoData { region } => region,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn lagos() -> RegionStats {
        RegionStats {
            total: 10,
            completed: 6,
            ongoing: 3,
            yet_to_mobilize: 1,
            pct_completed: 60.0,
            technologies: [
                ("SOLAR STREET LIGHT".to_string(), 4),
                ("GRID/SOLAR STREET LIGHT".to_string(), 1),
                ("SOLAR MINI GRID".to_string(), 5),
            ]
            .into_iter()
            .collect(),
        }
    }

    #[test]
    fn colliding_names_keep_the_last_record() {
        let store = RegionStore::from_records([
            ("Lagos".to_string(), RegionStats::default()),
            (" LAGOS ".to_string(), lagos()),
        ]);
        assert_eq!(store.len(), 1);
        assert_eq!(store.lookup("lagos"), Some(&lagos()));
    }

    #[test]
    fn lookup_normalizes_names() {
        let store = RegionStore::from_records([("Lagos".to_string(), lagos())]);
        assert!(store.lookup("  lagos ").is_some());
        assert!(store.lookup("LAGOS").is_some());
        assert_eq!(normalize_region(" cross   river "), "CROSS RIVER");
    }

    #[test]
    fn miss_is_a_value_not_an_error() {
        let store = RegionStore::from_records([("LAGOS".to_string(), lagos())]);
        assert_eq!(store.lookup("FCT"), None);
        assert_eq!(
            RegionPanel::resolve(&store, "fct"),
            RegionPanel::NoData { region: "FCT".into() }
        );
    }

    #[test]
    fn zero_total_yields_zero_shares() {
        let empty = RegionStats {
            total: 0,
            technologies: [("SOLAR MINI GRID".to_string(), 3)].into_iter().collect(),
            ..RegionStats::default()
        };
        for (_, _, pct) in empty.technology_shares() {
            assert_eq!(pct, 0.0);
        }
        assert_eq!(empty.share_pct(5), 0.0);
    }

    #[test]
    fn shares_group_by_technology_class() {
        let shares = lagos().technology_shares();
        assert_eq!(
            shares,
            vec![
                (Technology::StreetLight, 5, 50.0),
                (Technology::MiniGrid, 5, 50.0),
            ]
        );
    }

    #[test]
    fn deserializes_camel_case_records() {
        let raw = r#"{ "total": 3, "completed": 1, "ongoing": 1, "yetToMobilize": 0,
                      "pctCompleted": 33.3, "perTechnologyCounts": { "SOLAR HOME SYSTEM": 3 } }"#;
        let stats: RegionStats = serde_json::from_str(raw).unwrap();
        assert_eq!(stats.yet_to_mobilize, 0);
        assert_eq!(stats.technologies.get("SOLAR HOME SYSTEM"), Some(&3));
        assert!(!stats.is_consistent());
    }
}
