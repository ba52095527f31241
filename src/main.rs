// Entry point: an interactive terminal session over the dashboard.
//
// Every command is one interaction: it updates the carried `Interaction`
// and re-runs the whole cycle (load, filters, map, metrics) from the files
// on disk. The map is rewritten as an HTML page after each cycle.
mod config;
mod dashboard;
mod error;
mod filters;
mod loader;
mod map;
mod metrics;
mod output;
mod types;
mod util;

use config::DashboardConfig;
use dashboard::{run_cycle, DashboardFrame, Event, Interaction};
use error::DashResult;
use log::{error, info};
use map::MapClick;
use std::io::{self, Write};
use types::ReportType;

const HELP: &str = "\
Commands:
  year <YYYY>          select year
  quarter <1-4>        select quarter
  state [name]         select state (no name = all states)
  type <Fraud|Other>   select report type
  click <state name>   click a region on the map
  click <lon> <lat>    click the map at a coordinate
  regions              show the map's region tooltips
  export               save the region table as CSV
  help                 show this list
  quit                 exit
";

#[derive(Debug, Clone, PartialEq)]
enum Command {
    Interact(Event),
    Regions,
    Export,
    Help,
    Quit,
}

fn parse_command(line: &str) -> Result<Command, String> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((w, r)) => (w, r.trim()),
        None => (line, ""),
    };
    match word.to_ascii_lowercase().as_str() {
        "year" => rest
            .parse::<i32>()
            .map(|y| Command::Interact(Event::SelectYear(y)))
            .map_err(|_| format!("'{}' is not a year", rest)),
        "quarter" => match rest.parse::<u8>() {
            Ok(q) if (1..=4).contains(&q) => Ok(Command::Interact(Event::SelectQuarter(q))),
            _ => Err("Quarter must be 1, 2, 3 or 4".to_string()),
        },
        "state" => Ok(Command::Interact(Event::SelectState(
            (!rest.is_empty()).then(|| rest.to_string()),
        ))),
        "type" => rest
            .parse::<ReportType>()
            .map(|t| Command::Interact(Event::SelectReportType(t))),
        "click" => parse_click(rest).map(|c| Command::Interact(Event::ClickMap(c))),
        "regions" => Ok(Command::Regions),
        "export" => Ok(Command::Export),
        "help" | "?" => Ok(Command::Help),
        "quit" | "exit" | "q" => Ok(Command::Quit),
        "" => Err("Enter a command (help lists them)".to_string()),
        other => Err(format!("Unknown command '{}'", other)),
    }
}

/// Two numbers are a coordinate (`lon lat`); anything else is a region name.
fn parse_click(rest: &str) -> Result<MapClick, String> {
    if rest.is_empty() {
        return Err("click needs a state name or '<lon> <lat>'".to_string());
    }
    let parts: Vec<&str> = rest.split_whitespace().collect();
    if let [lon, lat] = parts.as_slice() {
        if let (Ok(lon), Ok(lat)) = (lon.parse::<f64>(), lat.parse::<f64>()) {
            return Ok(MapClick::Point { lon, lat });
        }
    }
    Ok(MapClick::Region(rest.to_string()))
}

/// Read one line after the prompt; `None` at end of input.
fn read_command() -> Option<String> {
    print!("> ");
    let _ = io::stdout().flush();
    let mut buf = String::new();
    match io::stdin().read_line(&mut buf) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(buf),
    }
}

/// Run one cycle, carry its selection forward and publish the results.
fn render(config: &DashboardConfig, interaction: &mut Interaction) -> DashResult<DashboardFrame> {
    let frame = run_cycle(config, interaction)?;
    interaction.settle(&frame);

    let map_path = config.map_output();
    output::write_text(&map_path, &output::render_page(&frame, &config.map))?;
    output::write_json(&config.snapshot_output(), &frame)?;
    println!("{}", output::format_frame(&frame, &map_path));
    Ok(frame)
}

fn main() {
    env_logger::init();

    let config = DashboardConfig::default();
    let mut interaction = Interaction::default();
    let mut frame = match render(&config, &mut interaction) {
        Ok(frame) => frame,
        Err(e) => {
            eprintln!("Failed to load dashboard: {}", e);
            std::process::exit(1);
        }
    };
    println!("{}", HELP);

    while let Some(line) = read_command() {
        let command = match parse_command(&line) {
            Ok(c) => c,
            Err(msg) => {
                println!("{}\n", msg);
                continue;
            }
        };
        match command {
            Command::Interact(event) => {
                info!("Interaction: {:?}", event);
                interaction.apply(event);
                match render(&config, &mut interaction) {
                    Ok(f) => frame = f,
                    Err(e) => {
                        error!("Render failed: {}", e);
                        eprintln!("Render failed: {}\n", e);
                    }
                }
            }
            Command::Regions => {
                println!("{}\n", output::table_rows(&frame.map.rows(), usize::MAX));
            }
            Command::Export => {
                let path = config.region_export_output();
                match output::write_csv(&path, &frame.map.rows()) {
                    Ok(()) => println!("Region table exported to {}\n", path.display()),
                    Err(e) => eprintln!("Write error: {}\n", e),
                }
            }
            Command::Help => println!("{}", HELP),
            Command::Quit => break,
        }
    }
    println!("Exiting the program.");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_filter_commands() {
        assert_eq!(
            parse_command("year 2022"),
            Ok(Command::Interact(Event::SelectYear(2022)))
        );
        assert_eq!(
            parse_command("  QUARTER 3 "),
            Ok(Command::Interact(Event::SelectQuarter(3)))
        );
        assert!(parse_command("quarter 5").is_err());
        assert!(parse_command("year twenty").is_err());
        assert_eq!(
            parse_command("type other"),
            Ok(Command::Interact(Event::SelectReportType(ReportType::Other)))
        );
        assert!(parse_command("type scam").is_err());
    }

    #[test]
    fn state_without_name_clears_selection() {
        assert_eq!(
            parse_command("state New York"),
            Ok(Command::Interact(Event::SelectState(Some("New York".to_string()))))
        );
        assert_eq!(
            parse_command("state"),
            Ok(Command::Interact(Event::SelectState(None)))
        );
    }

    #[test]
    fn click_by_coordinate_or_name() {
        assert_eq!(
            parse_command("click -97.7 30.3"),
            Ok(Command::Interact(Event::ClickMap(MapClick::Point {
                lon: -97.7,
                lat: 30.3
            })))
        );
        assert_eq!(
            parse_command("click North Dakota"),
            Ok(Command::Interact(Event::ClickMap(MapClick::Region(
                "North Dakota".to_string()
            ))))
        );
        assert!(parse_command("click").is_err());
    }

    #[test]
    fn session_commands() {
        assert_eq!(parse_command("regions"), Ok(Command::Regions));
        assert_eq!(parse_command("export"), Ok(Command::Export));
        assert_eq!(parse_command("?"), Ok(Command::Help));
        assert_eq!(parse_command("quit"), Ok(Command::Quit));
        assert!(parse_command("").is_err());
        assert!(parse_command("dance").is_err());
    }
}
