use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use eyre::{Result, WrapErr};
use log::{LevelFilter, info, warn};

use ytsum::config::Config;
use ytsum::server::{self, AppState};
use ytsum::summarize::{GeneratorConfig, LlmClient};
use ytsum::transcript::{self, MAX_LANGUAGE_ATTEMPTS};

mod cli;

use cli::Cli;

fn setup_logging(log_file: Option<&Path>, verbose: bool) -> Result<()> {
    let mut builder = env_logger::Builder::new();
    builder
        .filter_level(if verbose { LevelFilter::Debug } else { LevelFilter::Info })
        .parse_default_env();

    if let Some(path) = log_file {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        let target = Box::new(std::fs::OpenOptions::new().create(true).append(true).open(path)?);
        builder.target(env_logger::Target::Pipe(target));
    }

    builder.init();

    if let Some(path) = log_file {
        info!("Logging initialized: {}", path.display());
    }
    Ok(())
}

/// CLI flags take priority over the config file
fn apply_cli(mut config: Config, cli: &Cli) -> Config {
    if let Some(ref bind) = cli.bind {
        config.bind = bind.clone();
    }
    if let Some(backend) = cli.backend {
        config.backend = backend;
    }
    if !cli.langs.is_empty() {
        config.languages = cli.langs.clone();
    }
    if let Some(ref model) = cli.model {
        config.model = model.clone();
    }
    config
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to install Ctrl+C handler: {e}");
    }
    info!("Shutting down");
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.log_file.as_deref(), cli.verbose)?;

    // An explicit --config must load; the default location is best-effort
    let config = match cli.config.as_deref() {
        Some(path) => Config::load(Some(path))?,
        None => Config::load_or_default(None),
    };
    let config = apply_cli(config, &cli);

    if config.languages.is_empty() {
        eyre::bail!("at least one caption language is required");
    }
    if config.languages.len() > MAX_LANGUAGE_ATTEMPTS {
        warn!(
            "Only the first {MAX_LANGUAGE_ATTEMPTS} of {} configured languages will be tried",
            config.languages.len()
        );
    }

    let transcripts = transcript::build_provider(&config).wrap_err("building transcript backend")?;

    let generator_config =
        GeneratorConfig::from_env(&config.model, Duration::from_secs(config.generation_timeout_secs));
    let generator = LlmClient::new(generator_config).wrap_err("building LLM client")?;
    if !generator.is_configured() {
        warn!(
            "{} is not set; summarization requests will fail until it is configured",
            generator.provider().env_var()
        );
    }

    info!(
        "Transcript backend: {} (languages: {}), model: {} via {}",
        transcripts.name(),
        config.languages.join(", "),
        config.model,
        generator.provider().name()
    );

    let state = AppState {
        transcripts,
        generator: Arc::new(generator),
        languages: config.languages.clone().into(),
        transcript_timeout: Duration::from_secs(config.transcript_timeout_secs),
    };

    let listener = tokio::net::TcpListener::bind(&config.bind)
        .await
        .wrap_err_with(|| format!("binding to {}", config.bind))?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, server::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .wrap_err("running HTTP server")?;

    Ok(())
}
