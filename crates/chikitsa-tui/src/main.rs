use std::fs::{self, File};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use chikitsa_core::{
    Config, ConversationController, DiagnosisClient, DiagnosisResult, Labels, Language,
    RequestDispatcher,
};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod app;
mod handler;
mod tui;
mod ui;

use app::App;
use tui::EventHandler;

const TICK_RATE: Duration = Duration::from_millis(250);

#[derive(Parser)]
#[command(name = "chikitsa")]
#[command(version, about = "Bilingual symptom-checker chat for the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Base URL of the diagnosis service
    #[arg(long, global = true)]
    service_url: Option<String>,

    /// Interface language (en, english, hi, hindi)
    #[arg(short, long, global = true)]
    language: Option<String>,

    /// Seconds to wait for the diagnosis service
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Describe symptoms once and print the result
    Ask {
        /// Symptom description
        text: String,
    },
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

fn log_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("chikitsa")
        .join("chikitsa.log")
}

/// Logs go to a file while the alternate screen is active.
fn init_file_logging() -> Result<()> {
    let path = log_path();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = File::options()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("could not open log file {}", path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn init_stderr_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .init();
}

/// Resolved settings: file, then environment, then command line.
fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load().context("could not read configuration")?;
    config.apply_env();

    if let Some(url) = &cli.service_url {
        config.service_url = Some(url.clone());
    }
    if let Some(language) = &cli.language {
        config.default_language = Some(language.clone());
    }
    if let Some(secs) = cli.timeout_secs {
        config.request_timeout_secs = Some(secs);
    }
    Ok(config)
}

fn build_controller(config: &Config) -> Result<ConversationController> {
    let language: Language = config.language()?;
    let locales = config.locale_table()?;
    let dispatcher = RequestDispatcher::new(
        Arc::new(DiagnosisClient::new()),
        config.service_url(),
        &locales,
        config.request_timeout()?,
    )?;

    info!(
        service_url = config.service_url(),
        language = language.as_str(),
        "controller ready"
    );
    Ok(ConversationController::new(Arc::new(dispatcher), locales, language)?)
}

/// Plain-text diagnosis card for non-interactive output.
fn render_plain(labels: &Labels, result: &DiagnosisResult) -> String {
    if result.is_error() {
        return labels.service_unavailable.clone();
    }

    let mut out = vec![
        labels.diagnosis_result.clone(),
        format!("{} {}", labels.condition, result.predicted_disease()),
        format!("{} {}", labels.confidence, result.confidence_display()),
    ];
    let symptoms = result.symptoms_display();
    if !symptoms.is_empty() {
        out.push(labels.matched_symptoms.clone());
        out.extend(symptoms.iter().map(|s| format!("  - {}", s)));
    }
    out.push(format!("{} {}", labels.recommendation, result.recommendation()));
    if !result.disclaimer().is_empty() {
        out.push(String::new());
        out.push(result.disclaimer().to_string());
    }
    out.join("\n")
}

async fn run_ask(mut controller: ConversationController, text: String) -> Result<()> {
    controller.edit_input(text);
    let result = controller
        .submit()
        .await
        .context("nothing to submit: describe at least one symptom")?;

    println!("{}", render_plain(controller.labels(), &result));
    if result.is_error() {
        std::process::exit(1);
    }
    Ok(())
}

async fn run_tui(controller: ConversationController, persist_language: bool) -> Result<()> {
    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new(TICK_RATE);
    let mut app = App::new(controller, persist_language);

    let outcome = async {
        while !app.should_quit {
            terminal.draw(|frame| ui::render(&mut app, frame))?;
            match events.next().await {
                Some(event) => handler::handle_event(&mut app, event).await?,
                None => break,
            }
        }
        Ok::<(), anyhow::Error>(())
    }
    .await;

    if let Some(task) = app.submit_task.take() {
        task.abort();
    }
    tui::restore()?;
    outcome
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Some(Commands::Ask { .. }) => init_stderr_logging(),
        None => init_file_logging()?,
    }

    let config = load_config(&cli)?;
    let controller = build_controller(&config)?;

    match cli.command {
        Some(Commands::Ask { text }) => run_ask(controller, text).await,
        None => {
            // Only remember a language the user picked inside the TUI
            let persist_language =
                cli.language.is_none() && std::env::var_os("CHIKITSA_LANGUAGE").is_none();
            run_tui(controller, persist_language).await
        }
    }
}
