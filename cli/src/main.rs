mod args;

use access_point::{cloud_api::CloudApiClient, mock::DryRunClient, MessagingClient};
use anyhow::Context;
use broadcast::{
    BroadcastError, BroadcastObserver, Broadcaster, FanoutObserver, Interrupt,
    JsonlAuditObserver, TracingObserver,
};
use clap::Parser;
use config::EffectiveConfig;
use std::collections::HashMap;
use std::fs::OpenOptions;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing(config: &EffectiveConfig) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_new(format!("{},hyper=warn,reqwest=warn", config.log_level))
        .context("Invalid log level")?;

    let file_layer = match &config.log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer())
        .with(file_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;
    Ok(())
}

fn create_messaging_client(config: &EffectiveConfig) -> anyhow::Result<Arc<dyn MessagingClient>> {
    if config.dry_run {
        tracing::info!("Dry-run: no requests will be sent to the Cloud API");
        return Ok(DryRunClient::new());
    }
    tracing::info!(
        api_base = %config.api_base,
        graph_version = %config.graph_version,
        phone_number_id = %config.phone_number_id,
        "Using WhatsApp Cloud API"
    );
    Ok(CloudApiClient::new(
        &config.api_base,
        &config.graph_version,
        &config.phone_number_id,
        config.access_token.clone(),
    )?)
}

fn create_observer(config: &EffectiveConfig) -> anyhow::Result<Arc<dyn BroadcastObserver>> {
    let mut observer = FanoutObserver::new().with(Arc::new(TracingObserver));
    if let Some(path) = &config.audit_log {
        let audit = JsonlAuditObserver::open(path)
            .with_context(|| format!("Failed to open audit log {}", path.display()))?;
        observer = observer.with(Arc::new(audit));
    }
    Ok(Arc::new(observer))
}

fn fatal(message: impl std::fmt::Display, code: u8) -> ExitCode {
    eprintln!("ERROR: {message}");
    ExitCode::from(code)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = args::Cli::parse();
    let process_env: HashMap<String, String> = std::env::vars().collect();

    let resolution = match config::resolve(&cli.overrides(), &process_env) {
        Ok(r) => r,
        Err(e) => {
            let err = BroadcastError::from(e);
            return fatal(&err, err.exit_code());
        }
    };
    if let Err(e) = init_tracing(&resolution.config) {
        return fatal(format!("{e:#}"), 1);
    }
    for warning in &resolution.warnings {
        tracing::warn!("{warning}");
    }
    let config = resolution.config;

    let client = match create_messaging_client(&config) {
        Ok(c) => c,
        Err(e) => return fatal(format!("{e:#}"), 1),
    };
    let observer = match create_observer(&config) {
        Ok(o) => o,
        Err(e) => return fatal(format!("{e:#}"), 1),
    };

    let interrupt = Arc::new(Interrupt::new());
    let broadcaster = Broadcaster::new(config, client)
        .with_observer(observer)
        .with_interrupt(interrupt.subscribe());

    tokio::spawn({
        let interrupt = Arc::clone(&interrupt);
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupt received, abandoning the current recipient");
                interrupt.trigger();
            }
        }
    });

    match broadcaster.run().await {
        Ok(report) => {
            let s = &report.summary;
            println!(
                "Done: {} attempted, {} sent, {} failed in {:.1}s",
                s.attempted,
                s.succeeded,
                s.failed,
                s.elapsed.as_secs_f64()
            );
            if let Some(path) = &report.export_path {
                println!("Failed numbers written to {}", path.display());
            }
            ExitCode::from(report.exit_code())
        }
        Err(e) => fatal(&e, e.exit_code()),
    }
}
