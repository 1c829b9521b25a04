mod app;
mod ui;

use anyhow::{bail, Context, Result};
use app::{App, Input};
use clap::{Parser, Subcommand};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind, MouseButton, MouseEvent,
    MouseEventKind,
};
use crossterm::execute;
use geo::MultiPolygon;
use ratatui::DefaultTerminal;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;
use waste_map::config::{AppConfig, LogConfig};
use waste_map::data;
use waste_map::export;
use waste_map::fetch::FeedClient;
use waste_map::filter::{nearby_with_distance, within_region};
use waste_map::map::{format_tons, legend_ticks, ColorScale, ValueIndex};
use waste_map::names::NameNormalizer;
use waste_map::table::SortKey;
use waste_map::types::{Coordinate, ProcessingType};

#[derive(Parser)]
#[command(name = "waste-map", version, about = "Waste statistics choropleth and recycling-company locator")]
struct Cli {
    /// Configuration file; built-in defaults when missing
    #[arg(long, default_value = "waste-map.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Interactive terminal map (default)
    View,
    /// Companies within a radius of a point
    Nearby {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lng: f64,
        /// Search radius in kilometers
        #[arg(long)]
        radius: Option<f64>,
    },
    /// Companies inside a district
    Within {
        #[arg(long)]
        region: String,
    },
    /// Write CSV files
    Export {
        #[command(subcommand)]
        target: ExportTarget,
    },
    /// Color scale and legend ticks for a view
    Legend {
        /// Province for the district view; national view when omitted
        #[arg(long)]
        province: Option<String>,
        #[arg(long = "type", default_value = "total")]
        kind: ProcessingType,
    },
}

#[derive(Subcommand)]
enum ExportTarget {
    /// Region values; every processing type when --type is omitted
    Regions {
        #[arg(long)]
        province: Option<String>,
        #[arg(long = "type")]
        kind: Option<ProcessingType>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// The company directory
    Companies {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load_or_default(&cli.config)
        .with_context(|| format!("loading configuration {}", cli.config.display()))?;

    let command = cli.command.unwrap_or(Command::View);
    init_logging(&config.log, matches!(command, Command::View))?;
    run_command(command, &config)
}

/// Terminal viewer logs to a file so the alternate screen stays clean
fn init_logging(config: &LogConfig, to_file: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.filter));
    if to_file {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.file)
            .with_context(|| format!("opening log file {}", config.file.display()))?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .init();
    }
    Ok(())
}

fn output(path: Option<PathBuf>) -> Result<Box<dyn Write>> {
    Ok(match path {
        Some(path) => Box::new(BufWriter::new(
            File::create(&path).with_context(|| format!("creating {}", path.display()))?,
        )),
        None => Box::new(io::stdout().lock()),
    })
}

fn region_stats(
    client: &FeedClient,
    normalizer: &NameNormalizer,
    province: Option<&str>,
    kind: ProcessingType,
) -> Result<Vec<(String, f64)>> {
    let stats = match province {
        Some(p) => client
            .districts(&normalizer.canonical_province(p), kind)
            .with_context(|| format!("fetching district statistics for {p}"))?,
        None => client.provinces(kind).context("fetching province statistics")?,
    };
    let mut rows: Vec<(String, f64)> = ValueIndex::from_pairs(stats, normalizer)
        .iter()
        .map(|(n, v)| (n.to_string(), v))
        .collect();
    rows.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(rows)
}

fn run_command(command: Command, config: &AppConfig) -> Result<()> {
    let client = || FeedClient::new(&config.api).context("creating feed client");
    let normalizer = NameNormalizer::from_config(&config.names);

    match command {
        Command::View => view(config.clone())?,
        Command::Nearby { lat, lng, radius } => {
            let origin = Coordinate::new(lat, lng);
            if !origin.is_valid() {
                bail!("invalid coordinate {lat}, {lng}");
            }
            let radius = radius.unwrap_or(config.nearby.radius_km);
            let companies = client()?.companies().context("fetching company directory")?;
            let hits = nearby_with_distance(origin, &companies, radius);
            info!(radius, found = hits.len(), "nearby search");
            for (company, distance) in hits {
                println!(
                    "{}\t{:.2}km\t{}\t{}\t{}",
                    company.name, distance, company.representative, company.phone, company.waste_type
                );
            }
        }
        Command::Within { region } => {
            let key = normalizer.normalize(&region);
            let features = data::load_boundaries(&config.geo.sig_path(), &config.geo.sig_name_property)?;
            let parts: Vec<_> = features
                .into_iter()
                .filter(|f| normalizer.normalize(&f.name) == key)
                .flat_map(|f| f.geometry.0)
                .collect();
            if parts.is_empty() {
                bail!("no district named {region}");
            }
            let companies = client()?.companies().context("fetching company directory")?;
            let hits = within_region(&MultiPolygon::new(parts), &companies);
            info!(region = %key, found = hits.len(), "district search");
            for company in hits {
                println!(
                    "{}\t{:.5}\t{:.5}\t{}",
                    company.name, company.coordinate.lat, company.coordinate.lng, company.waste_type
                );
            }
        }
        Command::Export { target } => {
            let client = client()?;
            match target {
                ExportTarget::Regions { province, kind, output: path } => match (kind, province) {
                    (Some(kind), province) => {
                        let rows = region_stats(&client, &normalizer, province.as_deref(), kind)?;
                        export::write_regions(output(path)?, &rows)?;
                    }
                    (None, Some(province)) => {
                        let canonical = normalizer.canonical_province(&province);
                        let rows = client
                            .breakdown(&canonical)
                            .with_context(|| format!("fetching breakdown for {province}"))?;
                        export::write_breakdown(output(path)?, &rows)?;
                    }
                    (None, None) => {
                        let rows = region_stats(&client, &normalizer, None, ProcessingType::Total)?;
                        export::write_regions(output(path)?, &rows)?;
                    }
                },
                ExportTarget::Companies { output: path } => {
                    let companies = client.companies().context("fetching company directory")?;
                    export::write_entities(output(path)?, &companies)?;
                }
            }
        }
        Command::Legend { province, kind } => {
            let rows = region_stats(&client()?, &normalizer, province.as_deref(), kind)?;
            let values: Vec<f64> = rows.iter().map(|(_, v)| *v).collect();
            let scale = ColorScale::new(&values, &config.scale.stops)?;
            let count = if province.is_some() {
                config.scale.district_ticks
            } else {
                config.scale.province_ticks
            };
            let (min, max) = scale.domain();
            println!("{} · {} ~ {}", kind.label(), format_tons(min), format_tons(max));
            for tick in legend_ticks(&scale, count) {
                println!("{:>5.2}  {}  {}", tick.position, scale.color(tick.value), tick.label);
            }
            for (name, value) in &rows {
                println!("{}\t{}\t{}", name, format_tons(*value), scale.color(*value));
            }
        }
    }
    Ok(())
}

fn view(config: AppConfig) -> Result<()> {
    // Initialize terminal
    let mut terminal = ratatui::init();
    terminal.clear()?;

    // Enable mouse capture
    execute!(io::stdout(), EnableMouseCapture)?;

    let result = run(&mut terminal, config);

    // Disable mouse capture and restore terminal
    let _ = execute!(io::stdout(), DisableMouseCapture);
    ratatui::restore();

    result
}

/// Handle mouse events for panning, zooming and picking
fn handle_mouse(app: &mut App, mouse: MouseEvent, press: &mut Option<(u16, u16)>) {
    app.set_mouse_pos(mouse.column, mouse.row);
    if app.show_table {
        return;
    }

    match mouse.kind {
        MouseEventKind::ScrollUp => app.zoom_in_at(mouse.column, mouse.row),
        MouseEventKind::ScrollDown => app.zoom_out_at(mouse.column, mouse.row),
        MouseEventKind::ScrollLeft => app.pan(-15, 0),
        MouseEventKind::ScrollRight => app.pan(15, 0),
        MouseEventKind::Down(MouseButton::Left) => {
            app.last_mouse = Some((mouse.column, mouse.row));
            *press = Some((mouse.column, mouse.row));
        }
        MouseEventKind::Drag(MouseButton::Left) => {
            app.handle_drag(mouse.column, mouse.row);
        }
        MouseEventKind::Up(MouseButton::Left) => {
            app.end_drag();
            // a click without movement picks a region
            if press.take() == Some((mouse.column, mouse.row)) {
                app.open_company = None;
                app.select_at(mouse.column, mouse.row);
            }
        }
        MouseEventKind::Down(MouseButton::Right) => {
            app.place_marker(mouse.column, mouse.row);
        }
        _ => {}
    }
}

fn handle_input_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Enter => app.submit_input(),
        KeyCode::Esc => app.cancel_input(),
        KeyCode::Backspace => app.input_backspace(),
        KeyCode::Char(c) => app.input_char(c),
        _ => {}
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    if app.input.is_some() {
        handle_input_key(app, key);
        return;
    }

    if app.show_table {
        match key.code {
            KeyCode::Char('q') => app.quit(),
            KeyCode::Tab | KeyCode::Esc => app.show_table = false,
            KeyCode::Char('n') => app.table.sort_by(SortKey::Name),
            KeyCode::Char('v') => app.table.sort_by(SortKey::Value),
            KeyCode::Char('/') => app.begin_input(Input::TableSearch),
            KeyCode::Char('t') => app.next_kind(),
            KeyCode::Char('e') => app.export_view(),
            _ => {}
        }
        return;
    }

    match key.code {
        KeyCode::Char('q') => app.quit(),
        KeyCode::Esc => {
            if app.open_company.is_some() {
                app.open_company = None;
            } else if app.panel_open() {
                app.close_panel();
            } else {
                app.quit();
            }
        }

        // Pan with hjkl or arrow keys
        KeyCode::Left | KeyCode::Char('h') => app.pan(-10, 0),
        KeyCode::Right | KeyCode::Char('l') => app.pan(10, 0),
        KeyCode::Up | KeyCode::Char('k') => app.pan(0, -6),
        KeyCode::Down | KeyCode::Char('j') => app.pan(0, 6),

        // Zoom
        KeyCode::Char('+') | KeyCode::Char('=') => app.zoom_in(),
        KeyCode::Char('-') | KeyCode::Char('_') => app.zoom_out(),

        // Data and navigation
        KeyCode::Char('t') => app.next_kind(),
        KeyCode::Enter => app.drill_down(),
        KeyCode::Backspace => app.back(),
        KeyCode::Char(']') => app.cycle_region(true),
        KeyCode::Char('[') => app.cycle_region(false),
        KeyCode::Char('g') => app.show_regions(),
        KeyCode::Char('/') => app.begin_input(Input::CompanySearch),
        KeyCode::Tab => app.show_table = true,
        KeyCode::Char('e') => app.export_view(),

        // Layer toggles
        KeyCode::Char('f') | KeyCode::Char('F') => app.map_renderer.toggle_fills(),
        KeyCode::Char('b') | KeyCode::Char('B') => app.map_renderer.toggle_borders(),
        KeyCode::Char('L') => app.map_renderer.toggle_labels(),
        KeyCode::Char('c') | KeyCode::Char('C') => app.map_renderer.toggle_companies(),

        // Reset view
        KeyCode::Char('r') | KeyCode::Char('0') => app.fit_to_bounds(),

        _ => {}
    }
}

fn run(terminal: &mut DefaultTerminal, config: AppConfig) -> Result<()> {
    let size = terminal.size()?;
    let mut app = App::new(config, size.width, size.height)?;
    let mut press = None;

    loop {
        app.poll_loaders();

        terminal.draw(|frame| ui::render(frame, &app))?;

        // Handle events with ~60fps target
        if event::poll(Duration::from_millis(16))? {
            match event::read()? {
                // Only handle key press events (not release)
                Event::Key(key) if key.kind == KeyEventKind::Press => handle_key(&mut app, key),
                Event::Mouse(mouse) => handle_mouse(&mut app, mouse, &mut press),
                Event::Resize(width, height) => app.resize(width, height),
                _ => {}
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_export_regions() {
        let cli = Cli::try_parse_from(["waste-map", "export", "regions", "--province", "서울", "--type", "self"]).unwrap();
        match cli.command {
            Some(Command::Export {
                target: ExportTarget::Regions { province, kind, .. },
            }) => {
                assert_eq!(province.as_deref(), Some("서울"));
                assert_eq!(kind, Some(ProcessingType::SelfTreated));
            }
            _ => panic!("wrong subcommand"),
        }
    }

    #[test]
    fn test_bad_type_is_rejected() {
        assert!(Cli::try_parse_from(["waste-map", "legend", "--type", "landfill"]).is_err());
    }
}
