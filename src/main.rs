mod cli;

use std::process::ExitCode;
use std::sync::Arc;

use tracing::info;

use pdfpress_lib::config::Config;
use pdfpress_lib::engine::ChromiumLauncher;
use pdfpress_lib::error::RenderError;
use pdfpress_lib::pipeline::RenderService;
use pdfpress_lib::{http, telemetry};

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            // Telemetry may not be installed yet when startup fails.
            eprintln!("pdfpress: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), RenderError> {
    let args = cli::parse();

    let mut config = Config::load(args.config.as_deref())?;
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }
    if args.log_json {
        config.logging.json = true;
    }
    if let Some(max) = args.max_concurrent {
        config.render.max_concurrent = Some(max);
    }
    config.validate()?;

    telemetry::init(&config.logging)?;

    let launcher = Arc::new(ChromiumLauncher::new(config.engine.clone()));
    let service = RenderService::new(launcher, &config.render);
    let router = http::build_router(service.clone(), config.server.max_body_bytes);

    let listener = tokio::net::TcpListener::bind(config.server.bind).await?;
    info!(addr = %config.server.bind, "pdfpress listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Close the long-lived engine before the process exits.
    service.shared_engine().shutdown().await;
    info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}
