// One render cycle: load -> time filters -> map -> state filter -> report
// type -> metrics. Every interaction runs a whole cycle from the files on
// disk; the only state carried between cycles is the `Interaction`.
use crate::config::DashboardConfig;
use crate::error::{DashResult, DashboardError};
use crate::filters::{
    available_quarters, available_report_types, available_states, available_years,
    select_quarter, select_report_type, select_state, select_year,
};
use crate::loader::{load_all, DataSet};
use crate::map::{build_map, MapClick, MapView};
use crate::metrics::{
    compute_metric, continental_quarter_total, standard_metrics, MetricSource, MetricValue,
};
use crate::types::{FactTable, ReportType, Selection};
use crate::util::{format_int, round_half_even};
use chrono::{DateTime, Local};
use log::{debug, info};
use serde::Serialize;

/// A single user action from the control surface.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    SelectYear(i32),
    SelectQuarter(u8),
    /// `None` returns to the nationwide view.
    SelectState(Option<String>),
    SelectReportType(ReportType),
    ClickMap(MapClick),
}

/// What the user has asked for so far. Requested values are hints: the
/// filters decide what is actually selected.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Interaction {
    pub year: Option<i32>,
    pub quarter: Option<u8>,
    pub state: Option<String>,
    pub report_type: Option<ReportType>,
    pub click: Option<MapClick>,
    /// Last region a click actually hit; a click on open map keeps it.
    pub clicked_region: Option<String>,
}

impl Interaction {
    pub fn apply(&mut self, event: Event) {
        match event {
            Event::SelectYear(y) => self.year = Some(y),
            Event::SelectQuarter(q) => self.quarter = Some(q),
            // The latest of an explicit pick and a map click wins.
            Event::SelectState(state) => {
                self.state = state.filter(|s| !s.is_empty());
                self.click = None;
                self.clicked_region = None;
            }
            Event::ClickMap(click) => {
                self.click = Some(click);
                self.state = None;
            }
            Event::SelectReportType(t) => self.report_type = Some(t),
        }
    }

    /// Pin the filters and the clicked region to what the last cycle
    /// actually showed.
    pub fn settle(&mut self, frame: &DashboardFrame) {
        let selection = &frame.selection;
        self.year = Some(selection.year);
        self.quarter = Some(selection.quarter);
        self.report_type = Some(selection.report_type);
        if let Some(region) = &frame.map.clicked {
            self.clicked_region = Some(region.clone());
        }
    }

    /// Hint for the state filter: the most recently clicked region,
    /// otherwise the explicit pick.
    fn state_hint<'a>(&'a self, map: &'a MapView) -> Option<&'a str> {
        map.clicked.as_deref().or(self.state.as_deref())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FilterOptions {
    pub years: Vec<i32>,
    pub quarters: Vec<u8>,
    pub states: Vec<String>,
    pub report_types: Vec<ReportType>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardFrame {
    pub title: String,
    pub subtitle: String,
    pub generated_at: DateTime<Local>,
    pub header: String,
    pub quarter_total: String,
    pub subheader: String,
    pub options: FilterOptions,
    pub selection: Selection,
    pub map: MapView,
    pub metrics: Vec<MetricValue>,
}

fn source_table(data: &DataSet, source: MetricSource) -> &FactTable {
    match source {
        MetricSource::Fraud => &data.fraud,
        MetricSource::Median => &data.median,
        MetricSource::Loss => &data.loss,
    }
}

pub fn run_cycle(
    config: &DashboardConfig,
    interaction: &Interaction,
) -> DashResult<DashboardFrame> {
    let data = load_all(&config.data)?;
    render_frame(config, &data, interaction)
}

/// Everything after loading; pure over the loaded tables.
pub fn render_frame(
    config: &DashboardConfig,
    data: &DataSet,
    interaction: &Interaction,
) -> DashResult<DashboardFrame> {
    let years = available_years(&data.continental);
    let year = select_year(&years, interaction.year).ok_or_else(|| DashboardError::EmptyTable {
        path: config.data.continental.display().to_string(),
    })?;
    let quarter = select_quarter(interaction.quarter);

    let mut map = build_map(
        &data.continental,
        year,
        quarter,
        &data.boundaries,
        interaction.click.as_ref(),
    );
    if interaction.click.is_some() && map.clicked.is_none() {
        info!("Map click did not land on a region");
        map.clicked = interaction.clicked_region.clone();
    }

    let states = available_states(&data.continental);
    let state_name = select_state(&states, interaction.state_hint(&map));

    let report_types = available_report_types();
    let report_type = select_report_type(&report_types, interaction.report_type);

    let selection = Selection {
        year,
        quarter,
        state_name,
        report_type,
    };
    debug!("Selection: {:?}", selection);

    let metrics = standard_metrics(report_type)
        .iter()
        .map(|spec| compute_metric(source_table(data, spec.source), &selection, spec))
        .collect::<DashResult<Vec<_>>>()?;

    let quarter_total = continental_quarter_total(&data.continental, year, quarter);
    let subheader = format!("{} {} Facts", selection.state_name, report_type)
        .trim_start()
        .to_string();

    Ok(DashboardFrame {
        title: config.title.clone(),
        subtitle: config.subtitle.clone(),
        generated_at: Local::now(),
        header: format!("{} Q{}", year, quarter),
        quarter_total: format_int(round_half_even(quarter_total)),
        subheader,
        options: FilterOptions {
            years,
            quarters: available_quarters(),
            states,
            report_types,
        },
        selection,
        map,
        metrics,
    })
}
