use crate::error::{DashResult, DashboardError};
use crate::types::{
    ContinentalRecord, FactRow, FactTable, ReportType, Selection, FIELD_FRAUD_COUNT,
    FIELD_MEDIAN_LOSS, FIELD_TOTAL_LOSS,
};
use crate::util::{format_currency, format_int, is_blank, parse_f64_safe, round_half_even};
use log::debug;
use serde::Serialize;
use std::collections::HashSet;
use std::hash::Hash;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NumberFormat {
    /// `1,234`
    Integer,
    /// `$1,234`
    Currency,
}

impl NumberFormat {
    pub fn apply(&self, n: i64) -> String {
        match self {
            NumberFormat::Integer => format_int(n),
            NumberFormat::Currency => format_currency(n),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Aggregation {
    Sum,
    /// Sum of the field divided by the number of matching rows. Applied to
    /// the median-loss table this is a mean of per-row medians.
    Average,
}

/// Which of the three per-metric extracts a metric reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MetricSource {
    Fraud,
    Median,
    Loss,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSpec {
    pub source: MetricSource,
    pub field: String,
    pub title: String,
    pub format: NumberFormat,
    pub aggregation: Aggregation,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricValue {
    pub title: String,
    pub value: f64,
    pub rounded: i64,
    pub display: String,
    pub rows: usize,
}

/// The three metrics shown under the map, left to right.
pub fn standard_metrics(report_type: ReportType) -> Vec<MetricSpec> {
    vec![
        MetricSpec {
            source: MetricSource::Fraud,
            field: FIELD_FRAUD_COUNT.to_string(),
            title: format!("# of {} Reports", report_type),
            format: NumberFormat::Integer,
            aggregation: Aggregation::Sum,
        },
        MetricSpec {
            source: MetricSource::Median,
            field: FIELD_MEDIAN_LOSS.to_string(),
            title: "Median $ Loss".to_string(),
            format: NumberFormat::Currency,
            aggregation: Aggregation::Average,
        },
        MetricSpec {
            source: MetricSource::Loss,
            field: FIELD_TOTAL_LOSS.to_string(),
            title: "Total $ Loss".to_string(),
            format: NumberFormat::Currency,
            aggregation: Aggregation::Sum,
        },
    ]
}

/// Rows that compare equal on every column.
pub trait Deduplicate {
    type Key: Hash + Eq;
    fn dedup_key(&self) -> Self::Key;
}

impl Deduplicate for FactRow {
    type Key = Vec<String>;

    // `fields` holds every raw cell, including the key columns.
    fn dedup_key(&self) -> Self::Key {
        self.fields.clone()
    }
}

type ContinentalKey = (
    i32,
    u8,
    String,
    [Option<u64>; 3],
    Option<String>,
    Option<String>,
    Option<String>,
);

impl Deduplicate for ContinentalRecord {
    type Key = ContinentalKey;

    fn dedup_key(&self) -> Self::Key {
        (
            self.year,
            self.quarter,
            self.state_name.clone(),
            [
                self.state_total_reports.map(f64::to_bits),
                self.state_pop.map(f64::to_bits),
                self.reports_per_100k.map(f64::to_bits),
            ],
            self.fixed_state_fo.clone(),
            self.category.clone(),
            self.category_total.clone(),
        )
    }
}

/// Keep the first occurrence of every distinct row, preserving order.
pub fn distinct<'a, T, I>(rows: I) -> Vec<&'a T>
where
    T: Deduplicate + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let mut seen = HashSet::new();
    rows.into_iter()
        .filter(|r| seen.insert(r.dedup_key()))
        .collect()
}

/// Rows matching the selection: year and quarter, then report type, then the
/// state only when one is selected.
pub fn matching_rows<'a>(table: &'a FactTable, selection: &Selection) -> Vec<&'a FactRow> {
    table
        .rows
        .iter()
        .filter(|r| r.year == selection.year && r.quarter == selection.quarter)
        .filter(|r| r.report_type == selection.report_type.as_str())
        .filter(|r| selection.state_name.is_empty() || r.state_name == selection.state_name)
        .collect()
}

pub fn compute_metric(
    table: &FactTable,
    selection: &Selection,
    spec: &MetricSpec,
) -> DashResult<MetricValue> {
    let column = table
        .column_index(&spec.field)
        .ok_or_else(|| DashboardError::UnknownField {
            table: table.name.clone(),
            field: spec.field.clone(),
        })?;

    let rows = distinct(matching_rows(table, selection));
    let mut sum = 0.0;
    for row in &rows {
        let cell = row.fields.get(column).map(String::as_str);
        // Blank cells add nothing but still count towards the row total.
        if is_blank(cell) {
            continue;
        }
        sum += parse_f64_safe(cell).ok_or_else(|| DashboardError::BadMetricValue {
            table: table.name.clone(),
            field: spec.field.clone(),
            value: cell.unwrap_or_default().to_string(),
        })?;
    }

    let value = match spec.aggregation {
        Aggregation::Sum => sum,
        Aggregation::Average if rows.is_empty() => 0.0,
        Aggregation::Average => sum / rows.len() as f64,
    };
    let rounded = round_half_even(value);
    debug!(
        "{}: {} distinct rows, {:?} = {}",
        spec.title,
        rows.len(),
        spec.aggregation,
        value
    );

    Ok(MetricValue {
        title: spec.title.clone(),
        value,
        rounded,
        display: spec.format.apply(rounded),
        rows: rows.len(),
    })
}

/// Nationwide report total for the quarter, over distinct continental rows.
pub fn continental_quarter_total(table: &[ContinentalRecord], year: i32, quarter: u8) -> f64 {
    distinct(
        table
            .iter()
            .filter(|r| r.year == year && r.quarter == quarter),
    )
    .into_iter()
    .filter_map(|r| r.state_total_reports)
    .sum()
}
