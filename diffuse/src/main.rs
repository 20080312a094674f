#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

mod args;

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc;
use std::thread::JoinHandle;

use anyhow::Context as _;
use args::{Args, Command};
use clap::Parser;
use diffuse_config::{AdapterConfig, Config, DEFAULT_ADAPTER_PORT, DEFAULT_IMAGES_DIR, ImageServiceConfig};
use diffuse_daemon::DaemonPaths;
use diffuse_mcp::ImageServiceClient;
use diffuse_server::Server;
use tokio_util::sync::CancellationToken;
use url::Url;

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration
    let mut config = Config::load_or_default(&args.config)?;

    match args.command {
        Command::ImageService {
            daemon,
            port,
            images_dir,
        } => {
            if let Some(port) = port {
                config.image_service.set_port(port);
            }
            resolve_images_dir(&mut config.image_service, images_dir, false)?;

            // Detach before telemetry and the runtime start any threads
            let pid_file = if daemon {
                let paths = DaemonPaths::resolve(&config.daemon)?;
                println!("starting image service daemon, logging to {}", paths.log_file.display());
                Some(diffuse_daemon::daemonize(&paths)?)
            } else {
                None
            };

            diffuse_telemetry::init(&config.logging, &args.log_filter)?;
            tracing::info!(config_path = %args.config.display(), daemon, "starting diffuse image service");
            if let Some(ref pid_file) = pid_file {
                tracing::info!(pid = std::process::id(), pid_file = %pid_file.path().display(), "daemonized");
            }

            runtime()?.block_on(run_image_service(&config.image_service))?;
        }
        Command::Adapter { port } => {
            diffuse_telemetry::init(&config.logging, &args.log_filter)?;
            tracing::info!(config_path = %args.config.display(), "starting diffuse protocol adapter");

            if let Some(ref port) = port {
                config.adapter.set_port(adapter_port(port));
            }

            runtime()?.block_on(run_adapter(&config.adapter))?;
        }
        Command::Combined { stdio, images_dir } => {
            diffuse_telemetry::init(&config.logging, &args.log_filter)?;
            tracing::info!(config_path = %args.config.display(), stdio, "starting diffuse in combined mode");

            resolve_images_dir(&mut config.image_service, images_dir, true)?;

            run_combined(config, stdio)?;
        }
    }

    tracing::info!("diffuse stopped");
    Ok(())
}

/// Pick the images directory and make it absolute
///
/// An explicit directory (flag or `IMAGE_GEN_DIR`) wins over the config
/// file. When neither is set, `required` makes that an error instead of
/// falling back to the default.
fn resolve_images_dir(
    config: &mut ImageServiceConfig,
    explicit: Option<PathBuf>,
    required: bool,
) -> anyhow::Result<()> {
    let dir = match (explicit, config.images_dir.take()) {
        (Some(dir), _) | (None, Some(dir)) => dir,
        (None, None) if required => {
            anyhow::bail!("IMAGE_GEN_DIR must be set (or image_service.images_dir configured) in combined mode")
        }
        (None, None) => PathBuf::from(DEFAULT_IMAGES_DIR),
    };

    let dir = std::path::absolute(&dir).with_context(|| format!("failed to resolve images directory {}", dir.display()))?;
    config.images_dir = Some(dir);
    Ok(())
}

/// Parse the adapter's positional port, falling back to the default
fn adapter_port(raw: &str) -> u16 {
    raw.parse().unwrap_or_else(|_| {
        tracing::warn!(port = raw, "invalid port, using {DEFAULT_ADAPTER_PORT}");
        DEFAULT_ADAPTER_PORT
    })
}

fn runtime() -> anyhow::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")
}

/// Cancel `token` on the first shutdown signal
fn cancel_on_signal(token: &CancellationToken) {
    let token = token.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        token.cancel();
    });
}

async fn run_image_service(config: &ImageServiceConfig) -> anyhow::Result<()> {
    let server = Server::image_service(config).await?;

    let shutdown = CancellationToken::new();
    cancel_on_signal(&shutdown);

    server.serve(shutdown).await
}

async fn run_adapter(config: &AdapterConfig) -> anyhow::Result<()> {
    let server = Server::adapter(config).await?;

    let shutdown = CancellationToken::new();
    cancel_on_signal(&shutdown);

    server.serve(shutdown).await
}

/// Image service on its own thread and runtime, adapter on this one
///
/// The adapter reaches the service over loopback HTTP at its bound address.
/// Either side stopping stops the other.
fn run_combined(config: Config, stdio: bool) -> anyhow::Result<()> {
    let shutdown = CancellationToken::new();
    let (url_tx, url_rx) = mpsc::channel::<Url>();

    let service_config = config.image_service;
    let service_shutdown = shutdown.clone();
    let service = std::thread::Builder::new()
        .name("image-service".to_string())
        .spawn(move || -> anyhow::Result<()> {
            runtime()?.block_on(async move {
                let server = Server::image_service(&service_config).await?;
                // The receiver only goes away if the main thread already failed
                let _ = url_tx.send(server.url()?);
                server.serve(service_shutdown).await
            })
        })
        .context("failed to spawn image service thread")?;

    // A closed channel means the service failed before binding
    let Ok(image_service_url) = url_rx.recv() else {
        join_service(service)?;
        anyhow::bail!("image service stopped before it started listening");
    };

    tracing::info!(%image_service_url, "image service started in background thread");

    let mut adapter_config = config.adapter;
    adapter_config.image_service_url = image_service_url;

    let adapter_result = runtime().and_then(|runtime| {
        runtime.block_on(async {
            cancel_on_signal(&shutdown);

            let result = if stdio {
                let client = Arc::new(ImageServiceClient::new(adapter_config.image_service_url.clone()));
                diffuse_mcp::serve_stdio(client, shutdown.clone()).await
            } else {
                match Server::adapter(&adapter_config).await {
                    Ok(server) => server.serve(shutdown.clone()).await,
                    Err(e) => Err(e),
                }
            };

            shutdown.cancel();
            result
        })
    });

    shutdown.cancel();
    let service_result = join_service(service);

    adapter_result?;
    service_result
}

fn join_service(handle: JoinHandle<anyhow::Result<()>>) -> anyhow::Result<()> {
    handle
        .join()
        .map_err(|_| anyhow::anyhow!("image service thread panicked"))?
}

/// Wait for a shutdown signal (`SIGINT` or `SIGTERM`)
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }

    tracing::info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;

    #[test]
    fn explicit_images_dir_wins() {
        let mut config = ImageServiceConfig {
            images_dir: Some(PathBuf::from("/from/config")),
            ..ImageServiceConfig::default()
        };

        resolve_images_dir(&mut config, Some(PathBuf::from("/from/env")), true).unwrap();

        assert_eq!(config.images_dir.as_deref(), Some(Path::new("/from/env")));
    }

    #[test]
    fn configured_images_dir_is_used() {
        let mut config = ImageServiceConfig {
            images_dir: Some(PathBuf::from("/from/config")),
            ..ImageServiceConfig::default()
        };

        resolve_images_dir(&mut config, None, true).unwrap();

        assert_eq!(config.images_dir.as_deref(), Some(Path::new("/from/config")));
    }

    #[test]
    fn standalone_defaults_to_generated_images() {
        let mut config = ImageServiceConfig::default();

        resolve_images_dir(&mut config, None, false).unwrap();

        let dir = config.images_dir.unwrap();
        assert!(dir.is_absolute());
        assert!(dir.ends_with(DEFAULT_IMAGES_DIR));
    }

    #[test]
    fn combined_requires_images_dir() {
        let mut config = ImageServiceConfig::default();

        let err = resolve_images_dir(&mut config, None, true).unwrap_err();

        assert!(err.to_string().contains("IMAGE_GEN_DIR"), "{err}");
    }

    #[test]
    fn adapter_port_parsing() {
        assert_eq!(adapter_port("6100"), 6100);
        assert_eq!(adapter_port("sixty"), 6000);
        assert_eq!(adapter_port("70000"), 6000);
    }
}
