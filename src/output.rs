use crate::config::MapSettings;
use crate::dashboard::DashboardFrame;
use crate::error::{DashResult, DashboardError};
use crate::map::render_svg;
use crate::util::escape_html;
use serde::Serialize;
use std::path::Path;
use tabled::{builder::Builder, settings::Style, Table, Tabled};

pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> DashResult<()> {
    let csv_err = |source| DashboardError::Csv {
        path: path.display().to_string(),
        source,
    };
    let mut wtr = csv::Writer::from_path(path).map_err(csv_err)?;
    for r in rows {
        wtr.serialize(r).map_err(csv_err)?;
    }
    wtr.flush().map_err(|source| DashboardError::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> DashResult<()> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s).map_err(|source| DashboardError::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(())
}

pub fn write_text(path: &Path, contents: &str) -> DashResult<()> {
    std::fs::write(path, contents).map_err(|source| DashboardError::Io {
        path: path.display().to_string(),
        source,
    })
}

pub fn table_rows<T>(rows: &[T], max_rows: usize) -> String
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().take(max_rows).cloned().collect();
    if slice.is_empty() {
        return "(no rows)".to_string();
    }
    Table::new(slice).with(Style::markdown()).to_string()
}

/// The three metrics as one markdown table, titles in the header row.
pub fn metrics_table(frame: &DashboardFrame) -> String {
    let mut builder = Builder::default();
    builder.push_record(frame.metrics.iter().map(|m| m.title.clone()));
    builder.push_record(frame.metrics.iter().map(|m| m.display.clone()));
    builder.build().with(Style::markdown()).to_string()
}

/// Terminal rendering of a frame: sidebar selection, map summary, metrics.
pub fn format_frame(frame: &DashboardFrame, map_path: &Path) -> String {
    let sel = &frame.selection;
    let state = if sel.state_name.is_empty() {
        "(all states)"
    } else {
        sel.state_name.as_str()
    };
    let mut out = String::new();
    out.push_str(&format!("{}\n{}\n\n", frame.title, frame.subtitle));
    out.push_str(&format!(
        "Year: {} | Quarter: {} | State: {} | Report Type: {}\n\n",
        sel.year, sel.quarter, state, sel.report_type
    ));
    out.push_str(&format!("{}\n", frame.header));
    out.push_str(&format!(
        "Reports nationwide this quarter: {}\n",
        frame.quarter_total
    ));
    out.push_str(&format!(
        "Map: {} of {} regions with data (saved to {})\n",
        frame.map.matched_count(),
        frame.map.regions.len(),
        map_path.display()
    ));
    if let Some(clicked) = &frame.map.clicked {
        out.push_str(&format!("Last clicked region: {}\n", clicked));
    }
    if !frame.map.unmatched_states.is_empty() {
        out.push_str(&format!(
            "No boundary for: {}\n",
            frame.map.unmatched_states.join(", ")
        ));
    }
    out.push_str(&format!("\n{}\n\n", frame.subheader));
    out.push_str(&metrics_table(frame));
    out.push('\n');
    out
}

/// Standalone HTML page holding the map and the metric cards.
pub fn render_page(frame: &DashboardFrame, settings: &MapSettings) -> String {
    let cards: String = frame
        .metrics
        .iter()
        .map(|m| {
            format!(
                "<div class=\"metric\"><div class=\"label\">{}</div><div class=\"value\">{}</div></div>",
                escape_html(&m.title),
                escape_html(&m.display)
            )
        })
        .collect();
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{title}</title>
<style>
body {{ font-family: sans-serif; max-width: {width}px; margin: 2em auto; color: #262730; }}
.caption {{ color: #808495; font-size: 0.85em; }}
.region:hover {{ stroke-width: 3; fill-opacity: 0.8; }}
.metrics {{ display: flex; gap: 1em; }}
.metric {{ flex: 1; }}
.metric .label {{ font-size: 0.85em; }}
.metric .value {{ font-size: 2em; }}
</style>
</head>
<body>
<h1>{title}</h1>
<p class="caption">{subtitle}</p>
<h2>{header}</h2>
{svg}
<h3>{subheader}</h3>
<div class="metrics">{cards}</div>
<p class="caption">Generated {generated}</p>
</body>
</html>
"#,
        title = escape_html(&frame.title),
        subtitle = escape_html(&frame.subtitle),
        width = settings.width,
        header = escape_html(&frame.header),
        svg = render_svg(&frame.map, settings),
        subheader = escape_html(&frame.subheader),
        cards = cards,
        generated = frame.generated_at.format("%Y-%m-%d %H:%M:%S"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DashboardConfig;
    use crate::dashboard::{render_frame, Interaction};
    use crate::loader::DataSet;
    use crate::types::{ContinentalRecord, FactRow, FactTable, RegionBoundary};

    fn fact_table(field: &str, value: &str) -> FactTable {
        FactTable {
            name: field.to_string(),
            headers: ["Year", "Quarter", "State Name", "Report Type", field]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            rows: vec![FactRow {
                year: 2024,
                quarter: 1,
                state_name: "Utah".to_string(),
                report_type: "Fraud".to_string(),
                fields: ["2024", "1", "Utah", "Fraud", value]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            }],
        }
    }

    fn frame() -> DashboardFrame {
        let data = DataSet {
            continental: vec![ContinentalRecord {
                year: 2024,
                quarter: 1,
                state_name: "Utah".to_string(),
                state_total_reports: Some(1234.0),
                state_pop: Some(3_417_734.0),
                reports_per_100k: Some(36.1),
                fixed_state_fo: None,
                category: None,
                category_total: None,
            }],
            fraud: fact_table("State Fraud/Other Count", "1234"),
            median: fact_table("Overall Median Losses Qtr", "512"),
            loss: fact_table("Total Losses", "98765"),
            boundaries: vec![RegionBoundary {
                name: "Utah".to_string(),
                polygons: vec![vec![vec![
                    (-114.0, 37.0),
                    (-109.0, 37.0),
                    (-109.0, 42.0),
                    (-114.0, 42.0),
                    (-114.0, 37.0),
                ]]],
            }],
        };
        render_frame(&DashboardConfig::default(), &data, &Interaction::default()).expect("frame")
    }

    #[test]
    fn terminal_frame_shows_filters_and_metrics() {
        let text = format_frame(&frame(), Path::new("dashboard_map.html"));
        assert!(text
            .starts_with("Fraud and Identity Theft Report\nSource: Federal Trade Commission"));
        assert!(
            text.contains("Year: 2024 | Quarter: 1 | State: (all states) | Report Type: Fraud")
        );
        assert!(text.contains("2024 Q1"));
        assert!(text.contains("Map: 1 of 1 regions with data"));
        assert!(text.contains("# of Fraud Reports"));
        assert!(text.contains("$98,765"));
    }

    #[test]
    fn page_embeds_map_and_metric_cards() {
        let page = render_page(&frame(), &MapSettings::default());
        assert!(page.contains("<svg"));
        assert!(page.contains("Population: 3,417,734"));
        assert!(page.contains("<div class=\"value\">1,234</div>"));
        assert!(page.contains("<h3>Fraud Facts</h3>"));
    }

    #[test]
    fn region_rows_export_as_csv_and_json() {
        let dir = tempfile::tempdir().expect("temp dir");
        let f = frame();
        let rows = f.map.rows();

        let csv_path = dir.path().join("regions.csv");
        write_csv(&csv_path, &rows).expect("write csv");
        let csv_text = std::fs::read_to_string(&csv_path).expect("read csv");
        let mut lines = csv_text.lines();
        assert_eq!(lines.next(), Some("Region,TotalReports,Population,Per100K,Fill"));
        assert!(lines
            .next()
            .unwrap_or_default()
            .starts_with("Utah,\"1,234\",\"Population: 3,417,734\""));

        let json_path = dir.path().join("snapshot.json");
        write_json(&json_path, &f).expect("write json");
        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&json_path).expect("read json"))
                .expect("parse json");
        assert_eq!(value["selection"]["year"], 2024);
        assert_eq!(value["metrics"][2]["display"], "$98,765");
    }

    #[test]
    fn empty_table_preview() {
        let rows: Vec<crate::types::RegionRow> = Vec::new();
        assert_eq!(table_rows(&rows, 5), "(no rows)");
    }
}
