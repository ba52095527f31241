use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tabled::Tabled;

pub const COL_YEAR: &str = "Year";
pub const COL_QUARTER: &str = "Quarter";
pub const COL_STATE: &str = "State Name";
pub const COL_REPORT_TYPE: &str = "Report Type";
pub const COL_STATE_TOTAL: &str = "State Total Reports Quarter";
pub const COL_STATE_POP: &str = "State Pop";
pub const COL_PER_100K: &str = "Reports per 100K-F&O together";

pub const FIELD_FRAUD_COUNT: &str = "State Fraud/Other Count";
pub const FIELD_MEDIAN_LOSS: &str = "Overall Median Losses Qtr";
pub const FIELD_TOTAL_LOSS: &str = "Total Losses";

/// One line of the continental extract as it appears on disk.
#[derive(Debug, Deserialize)]
pub struct ContinentalRawRow {
    #[serde(rename = "Year")]
    pub year: Option<String>,
    #[serde(rename = "Quarter")]
    pub quarter: Option<String>,
    #[serde(rename = "State Name")]
    pub state_name: Option<String>,
    #[serde(rename = "State Total Reports Quarter")]
    pub state_total_reports: Option<String>,
    #[serde(rename = "State Pop")]
    pub state_pop: Option<String>,
    #[serde(rename = "Reports per 100K-F&O together")]
    pub reports_per_100k: Option<String>,
    #[serde(rename = "Fixed State F&O")]
    pub fixed_state_fo: Option<String>,
    #[serde(rename = "Category")]
    pub category: Option<String>,
    #[serde(rename = "Total Reports by Category")]
    pub category_total: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContinentalRecord {
    pub year: i32,
    pub quarter: u8,
    pub state_name: String,
    pub state_total_reports: Option<f64>,
    pub state_pop: Option<f64>,
    pub reports_per_100k: Option<f64>,
    pub fixed_state_fo: Option<String>,
    pub category: Option<String>,
    pub category_total: Option<String>,
}

/// A row of one of the per-metric extracts (fraud counts, median losses,
/// total losses). The key columns are parsed; every raw cell is kept so the
/// metric field can be chosen by name and duplicates compare all columns.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FactRow {
    pub year: i32,
    pub quarter: u8,
    pub state_name: String,
    pub report_type: String,
    pub fields: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct FactTable {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<FactRow>,
}

impl FactTable {
    pub fn column_index(&self, field: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == field)
    }
}

pub type Ring = Vec<(f64, f64)>;

/// Outer ring first, holes after it. Coordinates are `(lon, lat)`.
pub type Polygon = Vec<Ring>;

#[derive(Debug, Clone, PartialEq)]
pub struct RegionBoundary {
    pub name: String,
    pub polygons: Vec<Polygon>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ReportType {
    Fraud,
    Other,
}

impl ReportType {
    pub const ALL: [ReportType; 2] = [ReportType::Fraud, ReportType::Other];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportType::Fraud => "Fraud",
            ReportType::Other => "Other",
        }
    }
}

impl fmt::Display for ReportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fraud" => Ok(ReportType::Fraud),
            "other" => Ok(ReportType::Other),
            other => Err(format!("unknown report type '{}'", other)),
        }
    }
}

/// The authoritative filter tuple for one render cycle. An empty
/// `state_name` means the nationwide view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Selection {
    pub year: i32,
    pub quarter: u8,
    pub state_name: String,
    pub report_type: ReportType,
}

/// One polygon of the choropleth after the join, as shown in its tooltip.
#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct RegionRow {
    #[serde(rename = "Region")]
    #[tabled(rename = "Region")]
    pub name: String,
    #[serde(rename = "TotalReports")]
    #[tabled(rename = "Total Reports")]
    pub total_reports: String,
    #[serde(rename = "Population")]
    #[tabled(rename = "Population")]
    pub population: String,
    #[serde(rename = "Per100K")]
    #[tabled(rename = "Reports/100K")]
    pub per_100k: String,
    #[serde(rename = "Fill")]
    #[tabled(rename = "Fill")]
    pub fill: String,
}
