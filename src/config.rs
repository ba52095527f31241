// In-code configuration: page strings, input locations and map geometry.
//
// There are no command-line flags; the binary always starts from
// `DashboardConfig::default()`. Tests build their own config pointing at a
// temporary directory.
use std::path::{Path, PathBuf};

pub const APP_TITLE: &str = "Fraud and Identity Theft Report";
pub const APP_SUB_TITLE: &str = "Source: Federal Trade Commission";

pub const DATA_DIR: &str = "data";
pub const CONTINENTAL_FILE: &str = "AxS-Continental_Full Data_data.csv";
pub const FRAUD_FILE: &str = "AxS-Fraud Box_Full Data_data.csv";
pub const MEDIAN_FILE: &str = "AxS-Median Box_Full Data_data.csv";
pub const LOSS_FILE: &str = "AxS-Losses Box_Full Data_data.csv";
pub const BOUNDARY_FILE: &str = "us-state-boundaries.geojson";

pub const MAP_FILE: &str = "dashboard_map.html";
pub const SNAPSHOT_FILE: &str = "dashboard_snapshot.json";
pub const REGION_EXPORT_FILE: &str = "region_summary.csv";

/// Leaflet-style view: centre `[lat, lon]`, zoom level and pixel size.
pub const MAP_CENTER: (f64, f64) = (38.0, -96.5);
pub const MAP_ZOOM: u8 = 4;
pub const MAP_WIDTH: u32 = 700;
pub const MAP_HEIGHT: u32 = 450;

#[derive(Debug, Clone)]
pub struct DataPaths {
    pub continental: PathBuf,
    pub fraud: PathBuf,
    pub median: PathBuf,
    pub loss: PathBuf,
    pub boundaries: PathBuf,
}

impl DataPaths {
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        DataPaths {
            continental: dir.join(CONTINENTAL_FILE),
            fraud: dir.join(FRAUD_FILE),
            median: dir.join(MEDIAN_FILE),
            loss: dir.join(LOSS_FILE),
            boundaries: dir.join(BOUNDARY_FILE),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MapSettings {
    pub center_lat: f64,
    pub center_lon: f64,
    pub zoom: u8,
    pub width: u32,
    pub height: u32,
}

impl Default for MapSettings {
    fn default() -> Self {
        MapSettings {
            center_lat: MAP_CENTER.0,
            center_lon: MAP_CENTER.1,
            zoom: MAP_ZOOM,
            width: MAP_WIDTH,
            height: MAP_HEIGHT,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DashboardConfig {
    pub title: String,
    pub subtitle: String,
    pub data: DataPaths,
    pub map: MapSettings,
    pub output_dir: PathBuf,
}

impl DashboardConfig {
    pub fn map_output(&self) -> PathBuf {
        self.output_dir.join(MAP_FILE)
    }

    pub fn snapshot_output(&self) -> PathBuf {
        self.output_dir.join(SNAPSHOT_FILE)
    }

    pub fn region_export_output(&self) -> PathBuf {
        self.output_dir.join(REGION_EXPORT_FILE)
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        DashboardConfig {
            title: APP_TITLE.to_string(),
            subtitle: APP_SUB_TITLE.to_string(),
            data: DataPaths::in_dir(DATA_DIR),
            map: MapSettings::default(),
            output_dir: PathBuf::from("."),
        }
    }
}
