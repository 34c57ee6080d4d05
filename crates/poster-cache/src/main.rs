use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use keyed_file_store::KeyedFileStore;
use poster_cache::{
    config::{Config, LogFormat, LoggingConfig, defaults::CACHE_FILE_EXTENSION},
    job_scheduling::ReconcileScheduler,
    services::{CatalogReconciler, ImageTransformer, PosterCacheService, ReconcileOptions},
    sources::{CatalogSource, JellyfinClient},
    web::{AppState, WebServer},
};

#[derive(Parser)]
#[command(name = "poster-cache")]
#[command(version)]
#[command(about = "Serves recompressed Jellyfin posters from a disk cache kept in sync on a schedule")]
#[command(long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Listening IP address
    #[arg(short = 'H', long, value_name = "IP")]
    host: Option<String>,

    /// Listening port
    #[arg(short, long, value_name = "PORT")]
    port: Option<u16>,

    /// Log level (overrides config file)
    #[arg(short = 'v', long)]
    log_level: Option<String>,

    /// Log output format (overrides config file)
    #[arg(long, value_enum)]
    log_format: Option<LogFormat>,

    /// Run one reconciliation sweep right after startup
    #[arg(long)]
    reconcile_now: bool,
}

fn init_logging(logging: &LoggingConfig) {
    let log_filter = if logging.level == "trace" {
        format!(
            "poster_cache={0},keyed_file_store={0},tower_http=trace",
            logging.level
        )
    } else {
        format!("poster_cache={0},keyed_file_store={0}", logging.level)
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| log_filter.into());

    let registry = tracing_subscriber::registry().with(env_filter);
    match logging.format {
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
            (Ok(mut sigterm), Ok(mut sigint)) => {
                tokio::select! {
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down gracefully"),
                    _ = sigint.recv() => info!("Received SIGINT (Ctrl+C), shutting down gracefully"),
                }
            }
            _ => {
                warn!("Failed to install unix signal handlers, falling back to Ctrl+C");
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("Received Ctrl+C, shutting down gracefully");
                }
            }
        }
    }

    #[cfg(not(unix))]
    {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, shutting down gracefully");
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration from specified file
    let mut config = Config::load_from_file(&cli.config)?;

    // Override config with CLI arguments
    if let Some(host) = cli.host {
        config.web.host = host;
    }
    if let Some(port) = cli.port {
        config.web.port = port;
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    if let Some(format) = cli.log_format {
        config.logging.format = format;
    }

    init_logging(&config.logging);
    info!("Starting Poster Cache v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration loaded from: {}", cli.config.display());

    config.validate().map_err(|e| anyhow::anyhow!(e))?;

    let store = KeyedFileStore::builder()
        .root_directory(&config.storage.cache_path)
        .extension(CACHE_FILE_EXTENSION)
        .clear_on_open(config.storage.clear_on_startup)
        .build()
        .await?;
    info!("Poster cache at {}", store.root_directory().display());

    let jellyfin = JellyfinClient::new(&config.upstream)?;
    info!(
        "Upstream catalog: {} (library {})",
        jellyfin.base_url(),
        config.upstream.library_id
    );
    let catalog: Arc<dyn CatalogSource> = Arc::new(jellyfin);

    let transformer = ImageTransformer::from_config(&config.transform);
    info!("Posters re-encoded as JPEG at quality {}", transformer.jpeg_quality());

    let posters = PosterCacheService::new(store, catalog, transformer);
    let reconciler = Arc::new(CatalogReconciler::new(
        posters.clone(),
        ReconcileOptions::from_config(&config),
    ));

    let cancellation_token = CancellationToken::new();
    {
        let token = cancellation_token.clone();
        tokio::spawn(async move {
            shutdown_signal().await;
            token.cancel();
        });
    }

    let web_server = WebServer::new(
        &config,
        AppState::new(&config, posters, reconciler.clone()),
    )?;
    info!(
        "Starting web server on {}:{}",
        web_server.host(),
        web_server.port()
    );

    // Create a channel to signal when the server is ready or fails to bind
    let (server_ready_tx, server_ready_rx) = tokio::sync::oneshot::channel();
    let server_token = cancellation_token.clone();
    let server_handle = tokio::spawn(async move {
        if let Err(e) = web_server
            .serve_with_cancellation(server_ready_tx, server_token)
            .await
        {
            error!("Web server failed: {}", e);
        }
    });

    match server_ready_rx.await {
        Ok(Ok(())) => {
            info!("Web server is now listening, starting background services...");
        }
        Ok(Err(bind_error)) => {
            error!("Failed to bind web server: {}", bind_error);
            return Err(bind_error);
        }
        Err(_) => {
            error!("Web server task completed without signaling");
            return Err(anyhow::anyhow!("Web server failed to start"));
        }
    }

    let run_on_startup = config.reconcile.run_on_startup || cli.reconcile_now;
    if config.reconcile.enabled {
        let scheduler = ReconcileScheduler::new(
            reconciler,
            &config.reconcile.schedule,
            run_on_startup,
        )
        .map_err(|e| anyhow::anyhow!(e))?;
        let scheduler_token = cancellation_token.clone();
        tokio::spawn(async move {
            if let Err(e) = scheduler.run(scheduler_token).await {
                error!("Reconcile scheduler failed: {}", e);
            }
        });
    } else {
        info!("Scheduled reconciliation disabled");
        if run_on_startup {
            tokio::spawn(async move {
                if let Err(e) = reconciler.reconcile().await {
                    error!("Startup reconciliation failed: {}", e);
                }
            });
        }
    }

    info!("All services started successfully");

    // Wait for the server to complete (this will block until shutdown)
    server_handle.await?;
    cancellation_token.cancel();

    Ok(())
}
