mod app;
mod cli;
mod keymap;
mod logging;
mod mux;
mod pages;
mod screen;
mod session;
mod store;
mod table;
mod theme;
mod ui;

use anyhow::{Context, Result};
use app::{load_startup, App, AppConfig, Startup};
use clap::Parser;
use cli::{AlertsArgs, Cli, Commands, OncallArgs, TeamsArgs};
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use kite_core::columns::{AlertColumn, ColumnSpec, DEFAULT_INCIDENT_COLUMNS};
use kite_core::config::KiteConfig;
use kite_core::filter::{validate_incident_id, Assignment, IncidentFilter};
use kite_core::source::{IncidentSource, SnapshotSource};
use kite_core::OncallScope;
use logging::LogBuffer;
use ratatui::{backend::CrosstermBackend, Terminal};
use session::PtySpawner;
use std::{io, path::PathBuf, process::ExitCode, time::Duration};
use tracing::info;

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("kite: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = KiteConfig::load().context("loading configuration")?;
    let logs = LogBuffer::default();
    let log_file = logging::resolve_log_file(cli.log_file, config.log_dir.as_deref());
    logging::init_logging(log_file.as_deref(), logs.clone());

    match cli.command {
        Commands::Alerts(args) => run_alerts(args, &config, logs),
        Commands::Oncall(args) => run_oncall(args, &config, logs),
        Commands::Teams(args) => run_teams(args, config),
    }
}

fn open_source(config: &KiteConfig, flag: Option<PathBuf>) -> Result<SnapshotSource> {
    let path = config.resolve_snapshot(flag)?;
    SnapshotSource::open(&path).with_context(|| format!("opening snapshot {}", path.display()))
}

fn spawner(config: &KiteConfig) -> Box<PtySpawner> {
    Box::new(PtySpawner::new(config.shell(), config.login_command()))
}

fn run_alerts(args: AlertsArgs, config: &KiteConfig, logs: LogBuffer) -> Result<()> {
    ColumnSpec::<AlertColumn>::parse(&args.columns)?;
    let incident_id = args
        .incident_id
        .as_deref()
        .map(validate_incident_id)
        .transpose()?;
    let assignment = Assignment::parse(&args.assigned_to, config)?;

    let source = open_source(config, args.snapshot)?;
    let user = source.current_user()?;
    let filter = IncidentFilter::for_assignment(assignment);

    let startup = match &incident_id {
        Some(id) => Startup::Alerts(source.fetch_alerts_for_incident(id)?),
        None => load_startup(&source, &filter, &user)?,
    };
    let alerts = match startup {
        Startup::NoIncidents(message) => {
            println!("{message}");
            return Ok(());
        }
        Startup::Alerts(alerts) => alerts,
    };

    let app_config = AppConfig {
        filter,
        alert_columns: args.columns,
        incident_columns: DEFAULT_INCIDENT_COLUMNS.to_string(),
    };
    let mut app = App::new(Box::new(source), spawner(config), app_config, user, logs)?;
    app.open_alerts(alerts);
    run_dashboard(&mut app)
}

fn run_oncall(args: OncallArgs, config: &KiteConfig, logs: LogBuffer) -> Result<()> {
    let source = open_source(config, args.snapshot)?;
    let user = source.current_user()?;
    let entries = source.fetch_oncall(OncallScope::Current)?;

    let app_config = AppConfig {
        filter: IncidentFilter::for_assignment(Assignment::Me),
        alert_columns: kite_core::columns::DEFAULT_ALERT_COLUMNS.to_string(),
        incident_columns: DEFAULT_INCIDENT_COLUMNS.to_string(),
    };
    let mut app = App::new(Box::new(source), spawner(config), app_config, user, logs)?;
    app.open_oncall(entries);
    run_dashboard(&mut app)
}

fn run_teams(args: TeamsArgs, mut config: KiteConfig) -> Result<()> {
    if let Some(team_id) = args.set {
        config.team_id = team_id;
        config.team = args.name.unwrap_or_default();
        let path = config.save()?;
        info!("Saved team {} to {}", config.team_id, path.display());
        println!("Team set to {} ({})", config.team, config.team_id);
        return Ok(());
    }

    if config.team_id.is_empty() {
        println!("No team selected. Use `kite teams --set <team-id> --name <team-name>`.");
    } else {
        println!("Current team: {} ({})", config.team, config.team_id);
    }
    for (alias, user_id) in &config.named_users {
        println!("  {alias}: {user_id}");
    }
    Ok(())
}

fn run_dashboard(app: &mut App) -> Result<()> {
    let mut terminal = setup_terminal()?;
    let size = terminal.size()?;
    app.resize(ui::terminal_content_size(size.width, size.height));
    let result = run_app(&mut terminal, app);
    app.shutdown();
    restore_terminal(&mut terminal)?;
    result
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut App) -> Result<()> {
    let input_poll = Duration::from_millis(100);

    loop {
        app.pump();
        terminal.draw(|f| ui::render(f, app))?;

        // The loading popup is on screen now; run the queued fetch and repaint.
        if app.run_pending() {
            continue;
        }

        if event::poll(input_poll)? {
            match event::read()? {
                Event::Key(key) => {
                    if matches!(key.kind, KeyEventKind::Press | KeyEventKind::Repeat) {
                        app.handle_key(key);
                    }
                }
                Event::Resize(cols, rows) => {
                    app.resize(ui::terminal_content_size(cols, rows));
                }
                _ => {}
            }
        }

        if app.should_quit() {
            break;
        }
    }

    Ok(())
}
