// Sidebar controls: option sets derived from the loaded data and the
// selection logic that turns a requested value (or a map-click hint) into
// the authoritative choice for this cycle.
use crate::types::{ContinentalRecord, ReportType};
use log::debug;

pub const QUARTERS: [u8; 4] = [1, 2, 3, 4];

/// Distinct years, ascending.
pub fn available_years(table: &[ContinentalRecord]) -> Vec<i32> {
    let mut years: Vec<i32> = table.iter().map(|r| r.year).collect();
    years.sort_unstable();
    years.dedup();
    years
}

/// The `""` "no selection" sentinel followed by the distinct state names,
/// sorted.
pub fn available_states(table: &[ContinentalRecord]) -> Vec<String> {
    let mut states: Vec<String> = table.iter().map(|r| r.state_name.clone()).collect();
    states.push(String::new());
    states.sort();
    states.dedup();
    states
}

pub fn available_report_types() -> Vec<ReportType> {
    ReportType::ALL.to_vec()
}

pub fn available_quarters() -> Vec<u8> {
    QUARTERS.to_vec()
}

/// The requested year if offered, otherwise the most recent one. `None` only
/// when the table has no rows at all.
pub fn select_year(years: &[i32], requested: Option<i32>) -> Option<i32> {
    match requested {
        Some(y) if years.contains(&y) => Some(y),
        Some(y) => {
            debug!("Year {} not available, falling back to latest", y);
            years.last().copied()
        }
        None => years.last().copied(),
    }
}

pub fn select_quarter(requested: Option<u8>) -> u8 {
    match requested {
        Some(q) if QUARTERS.contains(&q) => q,
        _ => QUARTERS[0],
    }
}

/// Pre-select the hinted state when it is one of the options; otherwise the
/// sentinel (nationwide view).
pub fn select_state(states: &[String], hint: Option<&str>) -> String {
    match hint {
        Some(name) if !name.is_empty() && states.iter().any(|s| s == name) => name.to_string(),
        Some(name) if !name.is_empty() => {
            debug!("State '{}' has no data rows, showing nationwide view", name);
            String::new()
        }
        _ => String::new(),
    }
}

pub fn select_report_type(types: &[ReportType], prior: Option<ReportType>) -> ReportType {
    match prior {
        Some(t) if types.contains(&t) => t,
        _ => types.first().copied().unwrap_or(ReportType::Fraud),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(year: i32, quarter: u8, state: &str) -> ContinentalRecord {
        ContinentalRecord {
            year,
            quarter,
            state_name: state.to_string(),
            state_total_reports: Some(1.0),
            state_pop: Some(1.0),
            reports_per_100k: Some(1.0),
            fixed_state_fo: None,
            category: None,
            category_total: None,
        }
    }

    fn table() -> Vec<ContinentalRecord> {
        vec![
            rec(2023, 1, "Texas"),
            rec(2021, 2, "Ohio"),
            rec(2022, 1, "Alabama"),
            rec(2023, 3, "Ohio"),
        ]
    }

    #[test]
    fn years_sorted_distinct_and_default_latest() {
        let years = available_years(&table());
        assert_eq!(years, vec![2021, 2022, 2023]);
        assert_eq!(select_year(&years, None), Some(2023));
        assert_eq!(select_year(&years, Some(2021)), Some(2021));
        assert_eq!(select_year(&years, Some(1999)), Some(2023));
        assert_eq!(select_year(&[], None), None);
    }

    #[test]
    fn states_start_with_sentinel() {
        let states = available_states(&table());
        assert_eq!(states, vec!["", "Alabama", "Ohio", "Texas"]);
    }

    #[test]
    fn state_defaults_to_sentinel_without_hint() {
        let states = available_states(&table());
        assert_eq!(select_state(&states, None), "");
        assert_eq!(select_state(&states, Some("")), "");
    }

    #[test]
    fn map_click_hint_preselects_state() {
        let states = available_states(&table());
        assert_eq!(select_state(&states, Some("Ohio")), "Ohio");
        assert_eq!(select_state(&states, Some("Puerto Rico")), "");
    }

    #[test]
    fn quarters_are_fixed_four_way_choice() {
        assert_eq!(available_quarters(), vec![1, 2, 3, 4]);
        assert_eq!(select_quarter(None), 1);
        assert_eq!(select_quarter(Some(3)), 3);
        assert_eq!(select_quarter(Some(7)), 1);
    }

    #[test]
    fn report_type_defaults_to_first_unless_prior() {
        let types = available_report_types();
        assert_eq!(types, vec![ReportType::Fraud, ReportType::Other]);
        assert_eq!(select_report_type(&types, None), ReportType::Fraud);
        assert_eq!(select_report_type(&types, Some(ReportType::Other)), ReportType::Other);
    }
}
