use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use dd_core::Provider;
use dd_providers::{GeminiProvider, OpenAIProvider};
use dd_research::{Gateway, ResearchSession};
use dd_web::{DuckDuckGoSearch, HttpPageFetcher};

mod config;
mod console;
mod setup;

use config::{Config, DEFAULT_PROVIDER};
use console::{Console, Prompter};

/// Log level for tracing output
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// Most verbose
    Trace,
    /// Inference requests, search results, selected URLs
    Debug,
    /// One line per round
    Info,
    /// Quiet: degraded calls (failed fetches, searches, inferences)
    Warn,
    /// Minimal: only errors
    Error,
}

impl LogLevel {
    fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Parser)]
#[command(name = "deepduck")]
#[command(author, version, about = "Iterative LLM-guided web research", long_about = None)]
pub struct Cli {
    /// Research request (prompted for when omitted)
    #[arg(short, long)]
    pub query: Option<String>,

    /// Number of research rounds (prompted for when omitted)
    #[arg(short = 'n', long)]
    pub iterations: Option<usize>,

    /// Provider to use: gemini, openai, or any OpenAI-compatible name
    #[arg(long)]
    pub provider: Option<String>,

    /// Model to use (overrides config)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Base URL for an OpenAI-compatible API (overrides config)
    #[arg(long)]
    pub base_url: Option<String>,

    /// Config file (default: ~/.config/deepduck/config.toml)
    #[arg(short, long, env = "DEEPDUCK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, value_enum, default_value = "warn")]
    pub log_level: LogLevel,

    /// Enable debug logging (shorthand for --log-level debug)
    #[arg(short, long)]
    pub debug: bool,

    /// Write logs to file (JSON-lines format)
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Do not clear the terminal at start
    #[arg(long)]
    pub no_clear: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a configuration template to ~/.config/deepduck
    Setup,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Resolve log level: --debug overrides --log-level
    let log_level = if cli.debug {
        LogLevel::Debug
    } else {
        cli.log_level
    };

    let filter = EnvFilter::new(log_level.as_filter());

    if let Some(log_path) = &cli.log_file {
        let file = std::fs::File::create(log_path)
            .with_context(|| format!("Failed to create log file: {:?}", log_path))?;
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::sync::Mutex::new(file)))
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }

    if matches!(&cli.command, Some(Commands::Setup)) {
        return setup::run();
    }

    let config = Config::load(cli.config.as_deref())?;
    research_mode(&cli, &config).await
}

async fn research_mode(cli: &Cli, config: &Config) -> Result<()> {
    let is_tty = atty::is(atty::Stream::Stdout);
    let console = Console::new(is_tty && !cli.no_color);

    // Fail on configuration problems before asking anything
    let settings = resolve_settings(cli, config)?;
    let provider: Arc<dyn Provider> = Arc::from(create_provider_from_settings(&settings));

    if is_tty && !cli.no_clear {
        console.clear_screen()?;
    }

    let Some((user_request, iterations)) = session_inputs(cli, console)? else {
        return Ok(());
    };

    console.print_iterations(iterations)?;

    let http = config.web.http_config();
    let search = Arc::new(DuckDuckGoSearch::new(http.clone()));
    let fetcher =
        Arc::new(HttpPageFetcher::new(http).with_max_page_chars(config.web.max_page_chars));

    tracing::info!(
        provider = %settings.provider_name,
        model = ?settings.model,
        iterations,
        "Starting research"
    );

    let mut session = ResearchSession::new(user_request, Gateway::new(provider), search, fetcher)
        .with_config(config.research.clone())
        .with_progress(Arc::new(console));

    let report = session.run(iterations).await;

    console.print_history(&report.search_history)?;
    console.print_answer(&report.final_answer)?;

    Ok(())
}

/// Request and iteration count from flags, prompting for whichever is missing.
/// `None` when the user aborts a prompt.
fn session_inputs(cli: &Cli, console: Console) -> Result<Option<(String, usize)>> {
    if let (Some(query), Some(n)) = (&cli.query, cli.iterations) {
        return Ok(Some((query.clone(), n)));
    }

    let mut prompter = Prompter::new(console)?;

    let request = match &cli.query {
        Some(query) => query.clone(),
        None => match prompter.read_request()? {
            Some(request) => request,
            None => return Ok(None),
        },
    };

    let iterations = match cli.iterations {
        Some(n) => n,
        None => match prompter.read_iterations()? {
            Some(n) => n,
            None => return Ok(None),
        },
    };

    Ok(Some((request, iterations)))
}

/// Resolved provider settings from CLI and config
struct ResolvedSettings {
    provider_name: String,
    provider_type: String,
    api_key: String,
    base_url: Option<String>,
    model: Option<String>,
}

fn resolve_settings(cli: &Cli, config: &Config) -> Result<ResolvedSettings> {
    let provider_config = &config.provider;

    // Provider name: CLI > config > default
    let provider_name = cli
        .provider
        .clone()
        .or_else(|| provider_config.name.clone())
        .unwrap_or_else(|| DEFAULT_PROVIDER.to_string());

    // An explicit --provider means the name decides the type
    let explicit_type = if cli.provider.is_some() {
        None
    } else {
        provider_config.provider_type.as_deref()
    };

    let base_url = cli
        .base_url
        .clone()
        .or_else(|| provider_config.base_url.clone());

    let provider_type = resolve_provider_type(explicit_type, &provider_name, base_url.as_deref());

    // API key: config > <NAME>_API_KEY > <TYPE>_API_KEY; local servers accept a dummy key
    let api_key = provider_config
        .api_key
        .clone()
        .or_else(|| std::env::var(format!("{}_API_KEY", provider_name.to_uppercase())).ok())
        .or_else(|| std::env::var(format!("{}_API_KEY", provider_type.to_uppercase())).ok())
        .or_else(|| base_url.as_ref().map(|_| "none".to_string()))
        .with_context(|| {
            format!(
                "API key not found for provider '{}'. Set {}_API_KEY or configure [provider] api_key in {}",
                provider_name,
                provider_name.to_uppercase(),
                Config::config_path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|_| "config.toml".to_string())
            )
        })?;

    // Model: CLI > config > provider default
    let model = cli.model.clone().or_else(|| provider_config.model.clone());

    Ok(ResolvedSettings {
        provider_name,
        provider_type,
        api_key,
        base_url,
        model,
    })
}

/// Resolve the provider type from explicit config, provider name, or base_url.
///
/// Priority:
/// 1. Explicit `type` in provider config always wins
/// 2. If no type but base_url is set → "openai" (OpenAI-compatible mode)
/// 3. If no type and no base_url → infer from provider name
fn resolve_provider_type(
    explicit_type: Option<&str>,
    provider_name: &str,
    base_url: Option<&str>,
) -> String {
    if let Some(t) = explicit_type {
        return t.to_lowercase();
    }

    if base_url.is_some() {
        return "openai".to_string();
    }

    match provider_name.to_lowercase().as_str() {
        "gemini" | "google" => "gemini".to_string(),
        _ => "openai".to_string(),
    }
}

fn create_provider_from_settings(settings: &ResolvedSettings) -> Box<dyn Provider> {
    match settings.provider_type.as_str() {
        "gemini" => {
            let mut provider = GeminiProvider::new(&settings.api_key);
            if let Some(model) = &settings.model {
                provider = provider.with_default_model(model);
            }
            if let Some(url) = &settings.base_url {
                provider = provider.with_base_url(url);
            }
            Box::new(provider)
        }
        _ => {
            // Default: OpenAI-compatible
            let mut provider = OpenAIProvider::new(&settings.api_key);
            if let Some(model) = &settings.model {
                provider = provider.with_default_model(model);
            }
            if let Some(url) = &settings.base_url {
                provider = provider.with_base_url(url);
            }
            Box::new(provider)
        }
    }
}
