// Choropleth map: joins the continental extract onto the state boundaries,
// colours each region by its quarterly report total and renders the result
// as SVG with hover tooltips. Clicks come back in as a `MapClick` and are
// resolved to a region name, which the state filter takes as its hint.
//
// A matched row with no population or per-100k value is labelled `n/a`.
// The upstream dashboard shows `nan` there; the labels differ on purpose.
use crate::config::MapSettings;
use crate::types::{ContinentalRecord, Polygon, RegionBoundary, RegionRow};
use crate::util::{escape_html, format_int, round_half_even};
use log::{debug, warn};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::f64::consts::PI;

/// ColorBrewer "Blues", six classes, light to dark.
pub const BLUES_6: [&str; 6] = [
    "#eff3ff", "#c6dbef", "#9ecae1", "#6baed6", "#3182bd", "#08519c",
];
pub const NO_DATA_FILL: &str = "#000000";
pub const FILL_OPACITY: f64 = 0.6;
pub const LINE_OPACITY: f64 = 0.8;
const TILE_BACKGROUND: &str = "#f2f2ee";
const GRATICULE: &str = "#d9d9d4";

#[derive(Debug, Clone, PartialEq)]
pub enum MapClick {
    Region(String),
    Point { lon: f64, lat: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapRegion {
    pub name: String,
    pub value: Option<f64>,
    pub population: String,
    pub per_100k: String,
    pub fill: &'static str,
    #[serde(skip)]
    pub polygons: Vec<Polygon>,
}

impl MapRegion {
    pub fn has_data(&self) -> bool {
        !self.population.is_empty()
    }

    pub fn to_row(&self) -> RegionRow {
        RegionRow {
            name: self.name.clone(),
            total_reports: self
                .value
                .map(|v| format_int(round_half_even(v)))
                .unwrap_or_default(),
            population: self.population.clone(),
            per_100k: self.per_100k.clone(),
            fill: self.fill.to_string(),
        }
    }
}

/// Equal-width bins between the smallest and largest value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColorScale {
    pub edges: Vec<f64>,
}

impl ColorScale {
    pub fn from_values(values: &[f64]) -> Option<ColorScale> {
        let lo = values.iter().copied().fold(f64::INFINITY, f64::min);
        let hi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if !lo.is_finite() || !hi.is_finite() {
            return None;
        }
        // A single distinct value gets a unit-wide range around it.
        let (lo, hi) = if hi > lo { (lo, hi) } else { (lo - 0.5, hi + 0.5) };
        let bins = BLUES_6.len();
        let step = (hi - lo) / bins as f64;
        let edges = (0..=bins).map(|i| lo + step * i as f64).collect();
        Some(ColorScale { edges })
    }

    pub fn bin(&self, value: f64) -> usize {
        let bins = self.edges.len() - 1;
        let lo = self.edges[0];
        let step = (self.edges[bins] - lo) / bins as f64;
        let idx = ((value - lo) / step).floor();
        if idx.is_nan() || idx < 0.0 {
            0
        } else {
            (idx as usize).min(bins - 1)
        }
    }

    pub fn color(&self, value: f64) -> &'static str {
        BLUES_6[self.bin(value)]
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MapView {
    pub year: i32,
    pub quarter: u8,
    pub regions: Vec<MapRegion>,
    pub scale: Option<ColorScale>,
    /// Region named by the most recent click that hit one.
    pub clicked: Option<String>,
    /// States with data rows but no boundary polygon.
    pub unmatched_states: Vec<String>,
}

impl MapView {
    pub fn rows(&self) -> Vec<RegionRow> {
        self.regions.iter().map(MapRegion::to_row).collect()
    }

    pub fn matched_count(&self) -> usize {
        self.regions.iter().filter(|r| r.has_data()).count()
    }
}

pub fn population_label(pop: Option<f64>) -> String {
    match pop {
        Some(p) => format!("Population: {}", format_int(round_half_even(p))),
        None => "Population: n/a".to_string(),
    }
}

pub fn per_100k_label(per_100k: Option<f64>) -> String {
    match per_100k {
        Some(v) => format!("Reports/100K Population: {}", round_half_even(v)),
        None => "Reports/100K Population: n/a".to_string(),
    }
}

/// Filter to the quarter, join on state name and colour the regions.
pub fn build_map(
    table: &[ContinentalRecord],
    year: i32,
    quarter: u8,
    boundaries: &[RegionBoundary],
    click: Option<&MapClick>,
) -> MapView {
    let mut by_state: HashMap<&str, &ContinentalRecord> = HashMap::new();
    for r in table.iter().filter(|r| r.year == year && r.quarter == quarter) {
        // First row wins when a state repeats (one row per category).
        by_state.entry(r.state_name.as_str()).or_insert(r);
    }

    let values: Vec<f64> = by_state
        .values()
        .filter_map(|r| r.state_total_reports)
        .collect();
    let scale = ColorScale::from_values(&values);

    let regions: Vec<MapRegion> = boundaries
        .iter()
        .map(|b| match by_state.get(b.name.as_str()) {
            Some(r) => MapRegion {
                name: b.name.clone(),
                value: r.state_total_reports,
                population: population_label(r.state_pop),
                per_100k: per_100k_label(r.reports_per_100k),
                fill: match (r.state_total_reports, &scale) {
                    (Some(v), Some(s)) => s.color(v),
                    _ => NO_DATA_FILL,
                },
                polygons: b.polygons.clone(),
            },
            None => MapRegion {
                name: b.name.clone(),
                value: None,
                population: String::new(),
                per_100k: String::new(),
                fill: NO_DATA_FILL,
                polygons: b.polygons.clone(),
            },
        })
        .collect();

    let known: HashSet<&str> = boundaries.iter().map(|b| b.name.as_str()).collect();
    let mut unmatched_states: Vec<String> = by_state
        .keys()
        .filter(|name| !known.contains(*name))
        .map(|name| name.to_string())
        .collect();
    unmatched_states.sort();
    if !unmatched_states.is_empty() {
        warn!(
            "{} state(s) have data but no boundary: {}",
            unmatched_states.len(),
            unmatched_states.join(", ")
        );
    }

    let clicked = click.and_then(|c| resolve_click(boundaries, c));
    let view = MapView {
        year,
        quarter,
        regions,
        scale,
        clicked,
        unmatched_states,
    };
    debug!(
        "Map {} Q{}: {} of {} regions matched",
        year,
        quarter,
        view.matched_count(),
        view.regions.len()
    );
    view
}

/// Name of the region a click landed on. Names match exactly first, then
/// ignoring case; points are hit-tested against the polygons.
pub fn resolve_click(boundaries: &[RegionBoundary], click: &MapClick) -> Option<String> {
    match click {
        MapClick::Region(name) => {
            let name = name.trim();
            boundaries
                .iter()
                .find(|b| b.name == name)
                .or_else(|| boundaries.iter().find(|b| b.name.eq_ignore_ascii_case(name)))
                .map(|b| b.name.clone())
        }
        MapClick::Point { lon, lat } => boundaries
            .iter()
            .find(|b| region_contains(b, *lon, *lat))
            .map(|b| b.name.clone()),
    }
}

pub fn region_contains(region: &RegionBoundary, lon: f64, lat: f64) -> bool {
    region.polygons.iter().any(|p| polygon_contains(p, lon, lat))
}

/// Even-odd test over all rings, so holes cut out of the outer ring.
pub fn polygon_contains(polygon: &Polygon, lon: f64, lat: f64) -> bool {
    let mut inside = false;
    for ring in polygon {
        let n = ring.len();
        if n < 3 {
            continue;
        }
        let mut j = n - 1;
        for i in 0..n {
            let (xi, yi) = ring[i];
            let (xj, yj) = ring[j];
            if (yi > lat) != (yj > lat) && lon < (xj - xi) * (lat - yi) / (yj - yi) + xi {
                inside = !inside;
            }
            j = i;
        }
    }
    inside
}

/// Web Mercator projection into the viewport's pixel space, the view centred
/// on the configured point.
pub struct Projection {
    world: f64,
    origin_x: f64,
    origin_y: f64,
}

impl Projection {
    pub fn new(settings: &MapSettings) -> Self {
        let world = 256.0 * 2f64.powi(i32::from(settings.zoom));
        let (cx, cy) = mercator(world, settings.center_lon, settings.center_lat);
        Projection {
            world,
            origin_x: cx - f64::from(settings.width) / 2.0,
            origin_y: cy - f64::from(settings.height) / 2.0,
        }
    }

    pub fn project(&self, lon: f64, lat: f64) -> (f64, f64) {
        let (x, y) = mercator(self.world, lon, lat);
        (x - self.origin_x, y - self.origin_y)
    }
}

fn mercator(world: f64, lon: f64, lat: f64) -> (f64, f64) {
    let lat = lat.clamp(-85.0511, 85.0511).to_radians();
    let x = (lon + 180.0) / 360.0 * world;
    let y = (1.0 - (lat.tan() + 1.0 / lat.cos()).ln() / PI) / 2.0 * world;
    (x, y)
}

fn path_data(projection: &Projection, polygons: &[Polygon]) -> String {
    let mut d = String::new();
    for ring in polygons.iter().flatten() {
        for (i, (lon, lat)) in ring.iter().enumerate() {
            let (x, y) = projection.project(*lon, *lat);
            let cmd = if i == 0 { 'M' } else { 'L' };
            d.push_str(&format!("{}{:.1} {:.1} ", cmd, x, y));
        }
        if !ring.is_empty() {
            d.push_str("Z ");
        }
    }
    d.trim_end().to_string()
}

fn render_tiles(projection: &Projection, settings: &MapSettings) -> String {
    let (w, h) = (settings.width, settings.height);
    let mut out = format!(
        "<g class=\"tiles\"><rect x=\"0\" y=\"0\" width=\"{}\" height=\"{}\" fill=\"{}\"/>",
        w, h, TILE_BACKGROUND
    );
    for lon in (-180..=180).step_by(10) {
        let (x, _) = projection.project(f64::from(lon), 0.0);
        out.push_str(&format!(
            "<line x1=\"{x:.1}\" y1=\"0\" x2=\"{x:.1}\" y2=\"{h}\" stroke=\"{GRATICULE}\"/>"
        ));
    }
    for lat in (-80..=80).step_by(10) {
        let (_, y) = projection.project(0.0, f64::from(lat));
        out.push_str(&format!(
            "<line x1=\"0\" y1=\"{y:.1}\" x2=\"{w}\" y2=\"{y:.1}\" stroke=\"{GRATICULE}\"/>"
        ));
    }
    out.push_str("</g>");
    out
}

fn render_legend(scale: &ColorScale, settings: &MapSettings) -> String {
    let swatch = 34.0;
    let x0 = f64::from(settings.width) - swatch * BLUES_6.len() as f64 - 10.0;
    let mut out = String::from("<g class=\"legend\">");
    for (i, color) in BLUES_6.iter().enumerate() {
        let x = x0 + swatch * i as f64;
        out.push_str(&format!(
            "<rect x=\"{x:.1}\" y=\"10\" width=\"{swatch}\" height=\"8\" fill=\"{color}\" fill-opacity=\"{FILL_OPACITY}\"/>"
        ));
    }
    for (i, edge) in scale.edges.iter().enumerate() {
        let x = x0 + swatch * i as f64;
        out.push_str(&format!(
            "<text x=\"{x:.1}\" y=\"30\" font-size=\"8\" text-anchor=\"middle\">{}</text>",
            format_int(round_half_even(*edge))
        ));
    }
    out.push_str("</g>");
    out
}

/// SVG document for the map: tile layer, regions with `<title>` tooltips,
/// then the legend.
pub fn render_svg(view: &MapView, settings: &MapSettings) -> String {
    let projection = Projection::new(settings);
    let mut svg = format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\">",
        w = settings.width,
        h = settings.height
    );
    svg.push_str(&render_tiles(&projection, settings));
    svg.push_str("<g class=\"regions\">");
    for region in view.regions.iter().filter(|r| !r.polygons.is_empty()) {
        let selected = view.clicked.as_deref() == Some(region.name.as_str());
        let tooltip = [&region.name, &region.population, &region.per_100k]
            .iter()
            .filter(|s| !s.is_empty())
            .map(|s| escape_html(s))
            .collect::<Vec<_>>()
            .join("&#10;");
        svg.push_str(&format!(
            "<path class=\"region{}\" data-name=\"{}\" d=\"{}\" fill=\"{}\" fill-opacity=\"{}\" stroke=\"#000000\" stroke-opacity=\"{}\" stroke-width=\"{}\" fill-rule=\"evenodd\"><title>{}</title></path>",
            if selected { " selected" } else { "" },
            escape_html(&region.name),
            path_data(&projection, &region.polygons),
            region.fill,
            FILL_OPACITY,
            LINE_OPACITY,
            if selected { 3 } else { 1 },
            tooltip
        ));
    }
    svg.push_str("</g>");
    if let Some(scale) = &view.scale {
        svg.push_str(&render_legend(scale, settings));
    }
    svg.push_str("</svg>");
    svg
}
