mod config;

use clap::{Parser, Subcommand};
use config::{CommonConfig, Config, ConfigError};
use metrics_exporter_statsd::StatsdBuilder;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "lakeloader", about = "Loads uploaded files and reference data into warehouse tables")]
struct Cli {
    #[arg(long, default_value = "lakeloader.yaml")]
    config_file_path: PathBuf,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Serve the push endpoints of the ingestion pipelines
    Pipeline,
    /// Serve the reference stub and the reference load job
    Reference,
}

#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("could not install metrics recorder: {0}")]
    Metrics(String),
    #[error("could not start runtime: {0}")]
    Runtime(#[from] std::io::Error),
    #[error(transparent)]
    Pipeline(#[from] pipeline::ServeError),
    #[error(transparent)]
    Reference(#[from] reference::ReferenceError),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "lakeloader exited with an error");
            eprintln!("lakeloader: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config = Config::from_file(&cli.config_file_path)?;

    let _sentry = init_logging(&config.common);
    init_metrics(&config.common)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    match cli.command {
        CliCommand::Pipeline => {
            let pipeline_config = config
                .pipeline
                .ok_or(ConfigError::MissingSection("pipeline"))?;
            tracing::info!("starting pipeline service");
            runtime.block_on(pipeline::run(pipeline_config))?;
        }
        CliCommand::Reference => {
            let reference_config = config
                .reference
                .ok_or(ConfigError::MissingSection("reference"))?;
            tracing::info!("starting reference service");
            runtime.block_on(reference::run(reference_config))?;
        }
    }

    Ok(())
}

/// Installs the fmt subscriber and, when a DSN is configured, sentry with its
/// tracing layer. The returned guard flushes sentry events on drop.
fn init_logging(common: &CommonConfig) -> Option<sentry::ClientInitGuard> {
    let guard = common.logging.as_ref().map(|logging| {
        sentry::init((
            logging.sentry_dsn.as_str(),
            sentry::ClientOptions {
                release: sentry::release_name!(),
                ..Default::default()
            },
        ))
    });

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let sentry_layer = guard
        .as_ref()
        .map(|_| sentry::integrations::tracing::layer());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer())
        .with(sentry_layer)
        .init();

    guard
}

fn init_metrics(common: &CommonConfig) -> Result<(), CliError> {
    let Some(metrics_config) = &common.metrics else {
        return Ok(());
    };

    let recorder = StatsdBuilder::from(&metrics_config.statsd_host, metrics_config.statsd_port)
        .build(Some("lakeloader"))
        .map_err(|e| CliError::Metrics(e.to_string()))?;
    metrics::set_global_recorder(recorder).map_err(|e| CliError::Metrics(e.to_string()))?;

    shared::metrics_defs::describe_metrics(pipeline::metrics_defs::ALL_METRICS);
    shared::metrics_defs::describe_metrics(reference::metrics_defs::ALL_METRICS);
    tracing::info!(
        host = %metrics_config.statsd_host,
        port = metrics_config.statsd_port,
        "statsd metrics enabled"
    );

    Ok(())
}
