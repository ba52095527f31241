use crate::config::DataPaths;
use crate::error::{DashResult, DashboardError};
use crate::types::{
    ContinentalRawRow, ContinentalRecord, FactRow, FactTable, Polygon, RegionBoundary, Ring,
    COL_PER_100K, COL_QUARTER, COL_REPORT_TYPE, COL_STATE, COL_STATE_POP, COL_STATE_TOTAL,
    COL_YEAR,
};
use crate::util::{is_blank, parse_f64_safe, parse_i64_safe};
use csv::{Reader, ReaderBuilder, StringRecord};
use log::{debug, info};
use serde::Deserialize;
use std::fs::File;
use std::path::Path;

/// Everything one render cycle reads from disk.
#[derive(Debug, Clone)]
pub struct DataSet {
    pub continental: Vec<ContinentalRecord>,
    pub fraud: FactTable,
    pub median: FactTable,
    pub loss: FactTable,
    pub boundaries: Vec<RegionBoundary>,
}

pub fn load_all(paths: &DataPaths) -> DashResult<DataSet> {
    let continental = load_continental(&paths.continental)?;
    let fraud = load_fact_table(&paths.fraud)?;
    let median = load_fact_table(&paths.median)?;
    let loss = load_fact_table(&paths.loss)?;
    let boundaries = load_boundaries(&paths.boundaries)?;
    Ok(DataSet {
        continental,
        fraud,
        median,
        loss,
        boundaries,
    })
}

fn open_csv(path: &Path) -> DashResult<(Reader<File>, StringRecord)> {
    let file = File::open(path).map_err(|source| DashboardError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(file);
    let headers = rdr
        .headers()
        .map_err(|source| DashboardError::Csv {
            path: path.display().to_string(),
            source,
        })?
        .clone();
    Ok((rdr, headers))
}

fn require_columns(path: &Path, headers: &StringRecord, columns: &[&str]) -> DashResult<()> {
    for column in columns {
        if !headers.iter().any(|h| h == *column) {
            return Err(DashboardError::MissingColumn {
                path: path.display().to_string(),
                column: column.to_string(),
            });
        }
    }
    Ok(())
}

fn bad_value(path: &Path, row: usize, column: &str, value: Option<&str>) -> DashboardError {
    DashboardError::BadValue {
        path: path.display().to_string(),
        row,
        column: column.to_string(),
        value: value.unwrap_or_default().to_string(),
    }
}

fn parse_year(path: &Path, row: usize, value: Option<&str>) -> DashResult<i32> {
    parse_i64_safe(value)
        .and_then(|y| i32::try_from(y).ok())
        .filter(|y| *y > 0)
        .ok_or_else(|| bad_value(path, row, COL_YEAR, value))
}

fn parse_quarter(path: &Path, row: usize, value: Option<&str>) -> DashResult<u8> {
    let quarter = parse_i64_safe(value).ok_or_else(|| bad_value(path, row, COL_QUARTER, value))?;
    if !(1..=4).contains(&quarter) {
        return Err(DashboardError::QuarterOutOfRange {
            path: path.display().to_string(),
            row,
            quarter,
        });
    }
    Ok(quarter as u8)
}

/// Blank cells are missing values; anything else must be numeric.
fn parse_optional_number(
    path: &Path,
    row: usize,
    column: &str,
    value: Option<&str>,
) -> DashResult<Option<f64>> {
    if is_blank(value) {
        return Ok(None);
    }
    parse_f64_safe(value)
        .map(Some)
        .ok_or_else(|| bad_value(path, row, column, value))
}

fn trimmed(value: Option<String>) -> String {
    value.unwrap_or_default().trim().to_string()
}

pub fn load_continental(path: &Path) -> DashResult<Vec<ContinentalRecord>> {
    let (mut rdr, headers) = open_csv(path)?;
    require_columns(
        path,
        &headers,
        &[
            COL_YEAR,
            COL_QUARTER,
            COL_STATE,
            COL_STATE_TOTAL,
            COL_STATE_POP,
            COL_PER_100K,
        ],
    )?;

    let mut records = Vec::new();
    for (idx, result) in rdr.deserialize::<ContinentalRawRow>().enumerate() {
        let row_no = idx + 1;
        let row = result.map_err(|source| DashboardError::Csv {
            path: path.display().to_string(),
            source,
        })?;

        let year = parse_year(path, row_no, row.year.as_deref())?;
        let quarter = parse_quarter(path, row_no, row.quarter.as_deref())?;
        let state_total_reports = parse_optional_number(
            path,
            row_no,
            COL_STATE_TOTAL,
            row.state_total_reports.as_deref(),
        )?;
        let state_pop =
            parse_optional_number(path, row_no, COL_STATE_POP, row.state_pop.as_deref())?;
        let reports_per_100k =
            parse_optional_number(path, row_no, COL_PER_100K, row.reports_per_100k.as_deref())?;

        records.push(ContinentalRecord {
            year,
            quarter,
            state_name: trimmed(row.state_name),
            state_total_reports,
            state_pop,
            reports_per_100k,
            fixed_state_fo: row.fixed_state_fo,
            category: row.category,
            category_total: row.category_total,
        });
    }

    info!(
        "Loaded {} continental rows from {}",
        records.len(),
        path.display()
    );
    Ok(records)
}

pub fn load_fact_table(path: &Path) -> DashResult<FactTable> {
    let (mut rdr, headers) = open_csv(path)?;
    require_columns(
        path,
        &headers,
        &[COL_YEAR, COL_QUARTER, COL_STATE, COL_REPORT_TYPE],
    )?;
    let index_of = |name: &str| headers.iter().position(|h| h == name).unwrap_or(0);
    let (year_idx, quarter_idx, state_idx, type_idx) = (
        index_of(COL_YEAR),
        index_of(COL_QUARTER),
        index_of(COL_STATE),
        index_of(COL_REPORT_TYPE),
    );

    let mut rows = Vec::new();
    for (idx, result) in rdr.records().enumerate() {
        let row_no = idx + 1;
        let record = result.map_err(|source| DashboardError::Csv {
            path: path.display().to_string(),
            source,
        })?;

        let year = parse_year(path, row_no, record.get(year_idx))?;
        let quarter = parse_quarter(path, row_no, record.get(quarter_idx))?;
        rows.push(FactRow {
            year,
            quarter,
            state_name: record.get(state_idx).unwrap_or_default().trim().to_string(),
            report_type: record.get(type_idx).unwrap_or_default().trim().to_string(),
            fields: record.iter().map(str::to_string).collect(),
        });
    }

    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());
    info!("Loaded {} rows from {}", rows.len(), path.display());
    Ok(FactTable {
        name,
        headers: headers.iter().map(str::to_string).collect(),
        rows,
    })
}

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    #[serde(default)]
    properties: Option<serde_json::Map<String, serde_json::Value>>,
    #[serde(default)]
    geometry: Option<Geometry>,
}

type Position = Vec<f64>;

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum Geometry {
    Polygon {
        coordinates: Vec<Vec<Position>>,
    },
    MultiPolygon {
        coordinates: Vec<Vec<Vec<Position>>>,
    },
    #[serde(other)]
    Unsupported,
}

fn to_polygon(rings: Vec<Vec<Position>>) -> Polygon {
    rings
        .into_iter()
        .map(|ring| {
            ring.into_iter()
                .filter_map(|p| match p.as_slice() {
                    [lon, lat, ..] => Some((*lon, *lat)),
                    _ => None,
                })
                .collect::<Ring>()
        })
        .collect()
}

/// Read the GeoJSON `FeatureCollection`. Each feature must carry a string
/// `name` property; features without polygon geometry are kept with no
/// polygons so they still take part in the join.
pub fn load_boundaries(path: &Path) -> DashResult<Vec<RegionBoundary>> {
    let text = std::fs::read_to_string(path).map_err(|source| DashboardError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let collection: FeatureCollection =
        serde_json::from_str(&text).map_err(|source| DashboardError::Boundary {
            path: path.display().to_string(),
            source,
        })?;

    let mut regions = Vec::with_capacity(collection.features.len());
    for (index, feature) in collection.features.into_iter().enumerate() {
        let name = feature
            .properties
            .as_ref()
            .and_then(|props| props.get("name"))
            .and_then(|v| v.as_str())
            .ok_or_else(|| DashboardError::UnnamedRegion {
                path: path.display().to_string(),
                index,
            })?
            .to_string();
        let polygons = match feature.geometry {
            Some(Geometry::Polygon { coordinates }) => vec![to_polygon(coordinates)],
            Some(Geometry::MultiPolygon { coordinates }) => {
                coordinates.into_iter().map(to_polygon).collect()
            }
            Some(Geometry::Unsupported) | None => {
                debug!("Region '{}' has no polygon geometry", name);
                Vec::new()
            }
        };
        regions.push(RegionBoundary { name, polygons });
    }

    info!(
        "Loaded {} boundary regions from {}",
        regions.len(),
        path.display()
    );
    Ok(regions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, contents).expect("write fixture");
        path
    }

    const CONTINENTAL: &str = "\
Year,Quarter,State Name,State Total Reports Quarter,State Pop,Reports per 100K-F&O together,Category
2023,1,Texas,\"1,500\",29145505,51.46,Imposters
2023,1,Ohio,300,11799448,,Imposters
";

    #[test]
    fn continental_rows_are_typed() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = write(&dir, "continental.csv", CONTINENTAL);
        let rows = load_continental(&path).expect("load continental");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].state_name, "Texas");
        assert_eq!(rows[0].state_total_reports, Some(1500.0));
        assert_eq!(rows[0].state_pop, Some(29_145_505.0));
        assert_eq!(rows[0].category.as_deref(), Some("Imposters"));
        assert_eq!(rows[1].reports_per_100k, None);
    }

    #[test]
    fn missing_file_is_fatal() {
        let dir = tempfile::tempdir().expect("temp dir");
        let err = load_continental(&dir.path().join("nope.csv")).unwrap_err();
        assert!(matches!(err, DashboardError::Io { .. }));
    }

    #[test]
    fn missing_required_column_is_fatal() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = write(&dir, "fraud.csv", "Year,Quarter,State Name\n2023,1,Texas\n");
        let err = load_fact_table(&path).unwrap_err();
        match err {
            DashboardError::MissingColumn { column, .. } => assert_eq!(column, COL_REPORT_TYPE),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn quarter_outside_range_is_fatal() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = write(
            &dir,
            "fraud.csv",
            "Year,Quarter,State Name,Report Type,State Fraud/Other Count\n2023,5,Texas,Fraud,10\n",
        );
        let err = load_fact_table(&path).unwrap_err();
        assert!(matches!(err, DashboardError::QuarterOutOfRange { quarter: 5, .. }));
    }

    #[test]
    fn non_numeric_population_is_fatal() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = write(
            &dir,
            "continental.csv",
            "Year,Quarter,State Name,State Total Reports Quarter,State Pop,Reports per 100K-F&O together\n2023,1,Texas,10,lots,1\n",
        );
        let err = load_continental(&path).unwrap_err();
        assert!(matches!(err, DashboardError::BadValue { row: 1, .. }));
    }

    #[test]
    fn fact_table_keeps_every_cell() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = write(
            &dir,
            "AxS-Fraud Box_Full Data_data.csv",
            "Year,Quarter,State Name,Report Type,State Fraud/Other Count\n2023,2, Ohio ,Fraud,\"1,024\"\n",
        );
        let table = load_fact_table(&path).expect("load fact table");
        assert_eq!(table.name, "AxS-Fraud Box_Full Data_data");
        assert_eq!(table.column_index("State Fraud/Other Count"), Some(4));
        let row = &table.rows[0];
        assert_eq!((row.year, row.quarter), (2023, 2));
        assert_eq!(row.state_name, "Ohio");
        assert_eq!(row.report_type, "Fraud");
        assert_eq!(row.fields[4], "1,024");
    }

    #[test]
    fn boundaries_read_polygons_and_multipolygons() {
        let dir = tempfile::tempdir().expect("temp dir");
        let geojson = r#"{
          "type": "FeatureCollection",
          "features": [
            {"type": "Feature", "properties": {"name": "Square"},
             "geometry": {"type": "Polygon", "coordinates": [[[0,0],[1,0],[1,1],[0,1],[0,0]]]}},
            {"type": "Feature", "properties": {"name": "Islands"},
             "geometry": {"type": "MultiPolygon", "coordinates": [
               [[[2,2,0],[3,2,0],[3,3,0],[2,2,0]]],
               [[[4,4],[5,4],[5,5],[4,4]]]
             ]}},
            {"type": "Feature", "properties": {"name": "Dot"},
             "geometry": {"type": "Point", "coordinates": [9,9]}}
          ]
        }"#;
        let path = write(&dir, "bounds.geojson", geojson);
        let regions = load_boundaries(&path).expect("load boundaries");
        assert_eq!(regions.len(), 3);
        assert_eq!(regions[0].polygons[0][0].len(), 5);
        assert_eq!(regions[1].polygons.len(), 2);
        assert_eq!(regions[1].polygons[0][0][1], (3.0, 2.0));
        assert!(regions[2].polygons.is_empty());
    }

    #[test]
    fn unnamed_feature_is_fatal() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = write(
            &dir,
            "bounds.geojson",
            r#"{"type":"FeatureCollection","features":[{"type":"Feature","properties":{},"geometry":null}]}"#,
        );
        let err = load_boundaries(&path).unwrap_err();
        assert!(matches!(err, DashboardError::UnnamedRegion { index: 0, .. }));
    }

    #[test]
    fn corrupt_geojson_is_fatal() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = write(&dir, "bounds.geojson", "{ not json");
        assert!(matches!(
            load_boundaries(&path),
            Err(DashboardError::Boundary { .. })
        ));
    }
}
