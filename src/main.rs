use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use tracing::info;
use uet_assistant_core::{AskClient, ChatSession, Config, MAX_QUESTION_CHARS};

mod app;
mod handler;
mod logging;
mod tui;
mod ui;

use app::App;
use tui::{EventHandler, Tui, TICK_RATE};

#[derive(Parser)]
#[command(name = "uet-assistant", version)]
#[command(about = "Chat with the UET department information assistant")]
struct Cli {
    /// Answer endpoint URL (overrides config and UET_ASSISTANT_ENDPOINT)
    #[arg(long, global = true)]
    endpoint: Option<String>,
    /// Seconds to wait for an answer before giving up
    #[arg(long, global = true)]
    timeout: Option<u64>,
    /// Config file to read instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a single question and print the answer
    Ask {
        /// Your question
        question: String,
    },
    /// Show the config file location and effective settings
    Config,
}

/// Endpoint and timeout after applying CLI flags over the config file.
struct Settings {
    endpoint: String,
    timeout: Duration,
}

impl Settings {
    fn resolve(cli: &Cli, config: &Config) -> Self {
        Self {
            endpoint: cli.endpoint.clone().unwrap_or_else(|| config.endpoint()),
            timeout: cli
                .timeout
                .filter(|&secs| secs > 0)
                .map(Duration::from_secs)
                .unwrap_or_else(|| config.request_timeout()),
        }
    }

    fn session(&self) -> Result<ChatSession> {
        let client = AskClient::new(&self.endpoint, self.timeout)?;
        Ok(ChatSession::new(Arc::new(client), self.timeout))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let settings = Settings::resolve(&cli, &config);

    match &cli.command {
        None => {
            let _log_guard = logging::init_file(config.log_level())?;
            run_tui(&settings).await
        }
        Some(Commands::Ask { question }) => {
            logging::init_stderr(config.log_level())?;
            ask_once(&settings, question).await
        }
        Some(Commands::Config) => show_config(&cli, &config, &settings),
    }
}

async fn run_tui(settings: &Settings) -> Result<()> {
    let session = settings.session()?;
    let mut app = App::new(session, settings.endpoint.clone());
    info!(endpoint = %settings.endpoint, timeout = ?settings.timeout, "starting terminal UI");

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new(TICK_RATE);

    let result = event_loop(&mut terminal, &mut app, &mut events).await;

    tui::restore()?;
    info!(messages = app.session.messages().len(), "terminal UI closed");
    result
}

async fn event_loop(terminal: &mut Tui, app: &mut App, events: &mut EventHandler) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event),
            None => break,
        }
    }
    Ok(())
}

async fn ask_once(settings: &Settings, question: &str) -> Result<()> {
    if question.chars().count() > MAX_QUESTION_CHARS {
        bail!("questions are limited to {MAX_QUESTION_CHARS} characters");
    }

    let mut session = settings.session()?;
    session.update_draft(question);
    if session.send().is_none() {
        bail!("question is empty");
    }

    let Some(reply) = session.wait_for_response().await else {
        bail!("no reply was recorded");
    };

    if reply.is_error {
        eprintln!("{}", reply.content);
        bail!("the assistant at {} could not answer", settings.endpoint);
    }

    println!("{}", reply.content);

    if !reply.citations().is_empty() {
        println!("\nSources:");
        for citation in reply.citations() {
            println!("  • Page {} – UET Prospectus", citation.page);
        }
    }

    if let Some(agent) = &reply.agent {
        println!("\nAgent Reasoning:");
        println!("  Tool Used: {}", agent.tool);
        println!("  Action: {}", agent.action);
    }

    Ok(())
}

fn show_config(cli: &Cli, config: &Config, settings: &Settings) -> Result<()> {
    let path = match &cli.config {
        Some(path) => path.clone(),
        None => Config::default_path()?,
    };
    let state = if path.exists() { "" } else { " (not found, using defaults)" };

    println!("Config file: {}{}", path.display(), state);
    println!("Endpoint:    {}", settings.endpoint);
    println!("Timeout:     {}s", settings.timeout.as_secs());
    println!("Log level:   {}", config.log_level());
    if let Ok(dir) = logging::log_dir() {
        println!("Log dir:     {}", dir.display());
    }
    Ok(())
}
