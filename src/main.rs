//! Entry point: parse configuration, build the file cache and TLS context,
//! then run the HTTPS listener and the plaintext redirector under a single
//! graceful shutdown until `SIGINT` is received.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use rama_core::graceful::Shutdown;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use rampart::options::{Cli, ServerConfig};
use rampart::scheduler::Scheduler;
use rampart::{io, Server};

/// How long a shutdown waits for in-flight connections to finish before
/// tearing down anyway.
const SHUTDOWN_GRACE_PERIOD: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let cli = Cli::parse();
    let config = match ServerConfig::from_cli(cli) {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(error = %err, "failed to resolve configuration");
            return ExitCode::FAILURE;
        }
    };

    let https_port = config.https_port;
    let http_port = config.http_port;
    let max_connections = config.max_connections;

    let server = match tokio::task::spawn_blocking(move || Server::build(config)).await {
        Ok(Ok(server)) => Arc::new(server),
        Ok(Err(err)) => {
            tracing::error!(error = %err, "failed to start server");
            return ExitCode::FAILURE;
        }
        Err(err) => {
            tracing::error!(error = %err, "startup task panicked");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(https_port, http_port, "rampart starting");

    let https_listener = match io::bind_listener(https_port) {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!(error = %err, "failed to bind https listener");
            return ExitCode::FAILURE;
        }
    };
    let redirect_listener = match io::bind_listener(http_port) {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!(error = %err, "failed to bind redirect listener");
            return ExitCode::FAILURE;
        }
    };

    let shutdown = Shutdown::default();

    let https_server = Arc::clone(&server);
    shutdown.spawn_task_fn(async move |guard| {
        let scheduler = Scheduler::new(max_connections, guard.clone());
        https_server.serve_https(https_listener, scheduler, guard).await;
    });

    let redirect_server = Arc::clone(&server);
    shutdown.spawn_task_fn(async move |guard| {
        let scheduler = Scheduler::new(max_connections, guard.clone());
        redirect_server.serve_redirect(redirect_listener, scheduler, guard).await;
    });

    match shutdown.shutdown_with_limit(SHUTDOWN_GRACE_PERIOD).await {
        Ok(()) => {
            tracing::info!(uptime = %server.statistics().uptime_human(), "rampart stopped cleanly");
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::error!(error = %err, "graceful shutdown did not complete in time");
            ExitCode::FAILURE
        }
    }
}
