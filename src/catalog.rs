//! Stałe domeny filtrów, identyfikatory warstw i kolory.

pub const YEARS: [&str; 8] = ["2017", "2018", "2019", "2020", "2021", "2022", "2023", "2024"];

pub const STATUS_COMPLETED: &str = "COMPLETED";
pub const STATUS_ONGOING: &str = "ONGOING";
pub const STATUS_YET_TO_MOBILIZE: &str = "YET TO MOBILIZE";
pub const STATUSES: [&str; 3] = [STATUS_COMPLETED, STATUS_ONGOING, STATUS_YET_TO_MOBILIZE];

/// Composite labels are opaque tokens; nothing splits them on `/`.
pub const TYPES: [&str; 18] = [
    "SOLAR STREET LIGHT",
    "GRID/SOLAR STREET LIGHT",
    "SOLAR HOME SYSTEM/STREET LIGHT",
    "MINI GRID/STREET LIGHT",
    "SOLAR MINI GRID",
    "HYBRID MINI GRID",
    "SOLAR HYBRID MINI GRID",
    "SOLAR HOME SYSTEM",
    "SOLAR HOME SYSTEM KIT",
    "GRID EXTENSION",
    "GRID CONNECTION",
    "TRANSFORMER",
    "33KV LINE",
    "11KV LINE",
    "SOLAR POWERED BOREHOLE",
    "SOLAR IRRIGATION PUMP",
    "SOLAR COLD ROOM",
    "ENERGIZING EDUCATION",
];

// Warstwy renderera
pub const LAYER_REGIONS_FILL: &str = "regions-fill";
pub const LAYER_REGIONS_BASE: &str = "regions-base";
pub const LAYER_REGIONS_HOVER: &str = "regions-hover";
pub const LAYER_PROJECTS: &str = "projects";

// Klucze właściwości obiektów
pub const PROP_ID: &str = "id";
pub const PROP_NAME: &str = "name";
pub const PROP_TOTAL: &str = "total";
pub const PROP_REGION: &str = "region";
pub const PROP_YEAR: &str = "year";
pub const PROP_STATUS: &str = "status";
pub const PROP_TYPE: &str = "type";

pub const COLOR_COMPLETED: &str = "#22c55e";
pub const COLOR_ONGOING: &str = "#f59e0b";
pub const COLOR_YET_TO_MOBILIZE: &str = "#ef4444";
pub const COLOR_FALLBACK: &str = "#9ca3af";

pub const COLOR_STREET_LIGHT: &str = "#facc15";
pub const COLOR_MINI_GRID: &str = "#3b82f6";
pub const COLOR_HOME_SYSTEM: &str = "#a855f7";
pub const COLOR_GRID: &str = "#f97316";

pub const COLOR_REGION_OUTLINE: &str = "#e5e7eb";
pub const COLOR_REGION_HOVER: &str = "#ffffff";

/// Progi choropletu po `total`: 0, 40, 80, 120, 160+.
pub const CHOROPLETH_STOPS: [(f64, &str); 5] = [
    (0.0, "#f1f5f9"),
    (40.0, "#bfdbfe"),
    (80.0, "#60a5fa"),
    (120.0, "#2563eb"),
    (160.0, "#1e3a8a"),
];
