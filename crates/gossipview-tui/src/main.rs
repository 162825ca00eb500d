use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::thread;

use anyhow::{bail, Context, Result};
use clap::Parser;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use gossipview_service::HttpService;
use gossipview_store::{default_settings_path, JsonFileStore};
use gossipview_tui::app::App;
use gossipview_tui::config::{Cli, Command};
use gossipview_tui::event::AppEvent;
use gossipview_tui::html::render_html;
use ratatui::prelude::*;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::info;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_path())?;
    info!("gossipview v{} starting", env!("CARGO_PKG_VERSION"));

    let settings_path = cli.settings_file.clone().unwrap_or_else(default_settings_path);
    let store = JsonFileStore::open_lenient(settings_path.clone())
        .with_context(|| format!("failed to open settings at {}", settings_path.display()))?;
    info!(path = %settings_path.display(), ui_url = %cli.ui_url, "settings loaded");

    let (tx, rx) = mpsc::unbounded_channel();
    let source = Arc::new(HttpService::new(&cli.ui_url));
    let app = App::new(Box::new(store), source, tx.clone());

    match cli.command {
        Some(Command::Snapshot { html }) => run_snapshot(app, rx, html).await,
        None => run_tui(app, tx, rx).await,
    }
}

/// The terminal belongs to the dashboard, so logs go to a file.
fn init_logging(path: &Path) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create log directory {}", dir.display()))?;
    }
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

async fn run_snapshot(mut app: App, mut rx: UnboundedReceiver<AppEvent>, html: bool) -> Result<()> {
    app.bootstrap().await;
    while app.is_fetching() {
        match rx.recv().await {
            Some(ev @ AppEvent::PollFinished { .. }) => app.handle_event(ev),
            Some(_) => {}
            None => break,
        }
    }

    if !app.status().ok {
        bail!("{}", app.status().text);
    }
    if html {
        print!("{}", render_html(app.view()));
    } else {
        println!("{}", app.snapshot_text());
    }
    Ok(())
}

async fn run_tui(
    app: App,
    tx: UnboundedSender<AppEvent>,
    rx: UnboundedReceiver<AppEvent>,
) -> Result<()> {
    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    spawn_input_reader(tx);
    let result = event_loop(&mut terminal, app, rx).await;

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(ref e) = result {
        eprintln!("Error: {e}");
    }

    result
}

/// Forward terminal input onto the app channel from a blocking thread.
fn spawn_input_reader(tx: UnboundedSender<AppEvent>) {
    thread::spawn(move || loop {
        let forwarded = match event::read() {
            Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => AppEvent::Key(key),
            Ok(Event::Mouse(mouse)) => AppEvent::Mouse(mouse),
            Ok(Event::Resize(..)) => AppEvent::Resize,
            Ok(_) => continue,
            Err(e) => {
                tracing::error!("terminal input failed: {e}");
                break;
            }
        };
        if tx.send(forwarded).is_err() {
            break;
        }
    });
}

async fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    mut app: App,
    mut rx: UnboundedReceiver<AppEvent>,
) -> Result<()> {
    terminal.draw(|frame| app.render(frame))?;
    app.bootstrap().await;

    loop {
        terminal.draw(|frame| app.render(frame))?;

        let Some(event) = rx.recv().await else {
            break;
        };
        app.handle_event(event);
        if app.should_quit() {
            break;
        }
    }

    Ok(())
}
