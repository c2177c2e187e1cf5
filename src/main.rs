mod app;
mod clipboard;
mod config;
mod editor;
mod error;
mod exchange;
mod fence;
mod gemini;
mod theme;
mod ui;

use anyhow::Result;
use clap::Parser;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use app::App;
use config::AppConfig;
use editor::Editor;
use exchange::Exchange;
use gemini::{CompletionClient, GeminiClient};

#[derive(Parser, Debug)]
#[command(name = "codechat")]
#[command(version)]
#[command(about = "A terminal code editor with a Gemini prompt panel")]
struct Args {
    /// File to open in the editor
    file: Option<PathBuf>,

    /// Send one prompt, print the reply and exit
    #[arg(short, long)]
    prompt: Option<String>,

    /// Model to use instead of the configured one
    #[arg(short, long)]
    model: Option<String>,

    /// Config file (default: ~/.config/codechat/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; the TUI owns stdout. Warnings show even without RUST_LOG
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .with(log_filter(std::env::var(EnvFilter::DEFAULT_ENV).ok().as_deref()))
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load()?,
    };
    if let Some(model) = args.model {
        config.api.model = model;
    }

    let api_key = config.api.resolve_api_key(|name| std::env::var(name).ok());
    if api_key.is_empty() {
        tracing::warn!(
            "No API key found in ${} or the config file; requests will be rejected",
            config.api.api_key_env
        );
    }
    let client = GeminiClient::new(&config.api, api_key)?;

    if let Some(prompt) = args.prompt {
        return run_once(client, prompt).await;
    }

    let editor = match &args.file {
        Some(path) => Editor::open(path)?,
        None => Editor::default(),
    };

    ui::set_theme(theme::Theme::load(config.theme_file.as_deref()));

    let model = client.model().to_string();
    let app = App::new(Exchange::new(client), editor, model);
    run_tui(app).await
}

const DEFAULT_LOG_FILTER: &str = "warn";

/// RUST_LOG directives, falling back to warnings only when unset or invalid
fn log_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER))
}

/// One exchange without the TUI; the reply goes to stdout
async fn run_once<C: CompletionClient>(client: C, prompt: String) -> Result<()> {
    let mut exchange = Exchange::new(client);
    exchange.set_prompt(prompt);

    if !exchange.submit() {
        anyhow::bail!("Prompt is empty");
    }
    exchange.settle().await;

    println!("{}", exchange.response());
    Ok(())
}

async fn run_tui<C: CompletionClient>(mut app: App<C>) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Main loop
    let result = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

async fn run_app<C: CompletionClient>(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App<C>,
) -> Result<()> {
    loop {
        terminal.draw(|f| ui::draw(f, app))?;

        if event::poll(std::time::Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
                    match key.code {
                        KeyCode::Char('c') | KeyCode::Char('q') if ctrl => return Ok(()),
                        _ => {
                            // Handle key and catch any errors to prevent crashes
                            if let Err(e) = app.handle_key(key) {
                                app.set_status(format!("Error: {}", e));
                            }
                        }
                    }
                }
            }
        }

        // Let the request task run, then pick up its result
        tokio::task::yield_now().await;
        app.tick();
    }
}
