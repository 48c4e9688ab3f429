mod board;
mod config;
mod error;
mod interactive;
mod logging;
mod poller;
mod results;
mod types;
mod ui;

use std::io;
use std::process::exit;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use crossterm::event::{self, Event, KeyEventKind};
use ratatui::{Terminal, backend::CrosstermBackend};
use tokio::sync::{mpsc, watch};
use tracing::{error, info};

use board::Board;
use config::{Cli, MonitorSettings, config_path, load_config, reset_config};
use logging::{LogTarget, default_log_path, init_logging};
use poller::{HttpResultSource, PollOutcome, PollQuery, Poller, RefreshToggle, ResultSource};
use types::{App, KeyAction};

const OUTCOME_QUEUE: usize = 32;

fn print_usage_hint() {
    eprintln!("Usage examples:");
    eprintln!("   votewatch                                    # Guided setup or saved settings");
    eprintln!("   votewatch --endpoint URL --event agm --question 2");
    eprintln!("   votewatch --endpoint URL --event agm --json  # Print the results once");
    eprintln!("   votewatch --reset                            # Reset saved configuration");
}

#[tokio::main]
async fn main() -> Result<(), io::Error> {
    let cli = Cli::parse();

    // Handle reset flag first
    if cli.reset {
        match reset_config() {
            Ok(true) => {
                println!("✅ Saved configuration has been reset.");
                println!("   Run votewatch again to start the guided setup.");
            }
            Ok(false) => {
                println!("ℹ️  No saved configuration found to reset.");
            }
            Err(e) => {
                eprintln!("❌ Error resetting configuration: {}", e);
                exit(1);
            }
        }
        return Ok(());
    }

    let log_target = if cli.json {
        LogTarget::Stderr
    } else {
        match cli.log_file.clone().or_else(default_log_path) {
            Some(path) => LogTarget::File(path),
            None => LogTarget::Off,
        }
    };
    if let Err(e) = init_logging(log_target) {
        eprintln!("⚠️  Warning: Could not open the log file: {}", e);
    }

    let mut saved = load_config();
    if saved.is_none() && cli.is_bare() && !cli.json {
        saved = match interactive::run_interactive_mode()? {
            Some(config) => Some(config),
            None => return Ok(()),
        };
    }

    let settings = match MonitorSettings::resolve(&cli, saved.as_ref()) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("❌ {}", e);
            eprintln!();
            print_usage_hint();
            exit(2);
        }
    };

    let source = match HttpResultSource::new(settings.endpoint.clone(), settings.timeout) {
        Ok(source) => Arc::new(source),
        Err(e) => {
            eprintln!("❌ Could not create the HTTP client: {}", e);
            exit(1);
        }
    };

    if cli.json {
        run_json_mode(source.as_ref(), &settings).await;
        return Ok(());
    }

    run_dashboard(source, settings).await
}

/// Fetch once, print the board as JSON and exit.
async fn run_json_mode(source: &dyn ResultSource, settings: &MonitorSettings) {
    match source.fetch(&settings.query).await {
        Ok(response) => {
            let mut board = Board::new(settings.quorum);
            board.apply(&response);
            match serde_json::to_string_pretty(&board.snapshot()) {
                Ok(json) => println!("{}", json),
                Err(e) => {
                    eprintln!("❌ Could not encode the results: {}", e);
                    exit(1);
                }
            }
        }
        Err(e) => {
            error!("fetch failed: {}", e);
            eprintln!("❌ Could not load the results: {}", e);
            exit(1);
        }
    }
}

/// What the event loop drives besides the App.
struct Controls {
    poller: Poller,
    toggle: RefreshToggle,
    query_tx: watch::Sender<PollQuery>,
    outcomes: mpsc::Receiver<PollOutcome>,
}

async fn run_dashboard(
    source: Arc<dyn ResultSource>,
    settings: MonitorSettings,
) -> Result<(), io::Error> {
    let (outcome_tx, outcomes) = mpsc::channel(OUTCOME_QUEUE);
    let (query_tx, query_rx) = watch::channel(settings.query.clone());

    let poller = Poller::new(source, query_rx, outcome_tx);
    let toggle = RefreshToggle::new(poller.clone(), settings.interval);
    let mut controls = Controls {
        poller,
        toggle,
        query_tx,
        outcomes,
    };

    let mut app = App::new(&settings);
    app.config_path = config_path();

    if settings.auto_refresh {
        controls.toggle.activate();
    } else {
        controls.poller.spawn_refresh();
    }
    app.auto_refresh = controls.toggle.is_active();
    info!(
        endpoint = %settings.endpoint,
        event = %settings.query.event_slug,
        question = settings.query.question_no,
        auto = app.auto_refresh,
        "dashboard started"
    );

    let mut terminal = ui::setup_terminal()?;
    let result = ui::run_then_restore(
        &mut terminal,
        |terminal| run_event_loop(terminal, &mut app, &mut controls),
        ui::restore_terminal,
    );
    controls.toggle.deactivate();
    if let Err(e) = &result {
        error!("dashboard stopped: {}", e);
    }
    info!(polls_ok = app.polls_ok, polls_failed = app.polls_failed, "dashboard closed");
    result
}

fn run_event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    controls: &mut Controls,
) -> Result<(), io::Error> {
    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();

    loop {
        ui::render_ui(app, terminal)?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));

        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match ui::handle_key_event(app, key.code) {
                        KeyAction::Quit => return Ok(()),
                        KeyAction::ToggleRefresh => {
                            app.auto_refresh = controls.toggle.toggle();
                            if app.auto_refresh {
                                let secs = controls.toggle.interval().as_secs();
                                app.notify(format!("✅ Auto-refresh on, every {}s", secs));
                            } else {
                                app.notify("ℹ️ Auto-refresh off");
                            }
                        }
                        KeyAction::RefreshNow => {
                            controls.poller.spawn_refresh();
                        }
                        KeyAction::QuestionChanged => {
                            // The poller holds a receiver, so this cannot fail
                            let _ = controls.query_tx.send(app.query.clone());
                            controls.poller.spawn_refresh();
                        }
                        KeyAction::IntervalChanged => {
                            controls.toggle.set_interval(app.interval);
                        }
                        KeyAction::None => {}
                    }
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            while let Ok(outcome) = controls.outcomes.try_recv() {
                app.handle_outcome(outcome);
            }
            app.expire_notification();
            last_tick = Instant::now();
        }
    }
}
