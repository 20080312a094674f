#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use diffuse_config::{AdapterConfig, HealthConfig, ImageServiceConfig};
use diffuse_imagegen::ImageServiceBuilder;
use diffuse_mcp::AdapterState;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use url::Url;

/// A bound listener with its assembled routes and middleware
///
/// The listener is bound when the server is built, so [`Server::local_addr`]
/// is known before serving starts, even for port 0.
pub struct Server {
    name: &'static str,
    router: Router,
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl Server {
    /// Build the image service
    ///
    /// Without a configured `public_url`, image URLs point at the bound
    /// address.
    ///
    /// # Errors
    ///
    /// Returns an error if binding the listener, opening the images
    /// directory or building the model backend fails
    pub async fn image_service(config: &ImageServiceConfig) -> anyhow::Result<Self> {
        let listener = bind(config.listen_address()).await?;
        let local_addr = listener.local_addr()?;

        let service = ImageServiceBuilder::new(config)
            .fallback_public_url(reachable_url(local_addr)?)
            .build()?;

        let app = with_health(Router::new(), &config.health)
            .merge(diffuse_imagegen::endpoint_router().with_state(Arc::new(service)))
            .layer(TraceLayer::new_for_http());

        Ok(Self {
            name: "image service",
            router: app,
            listener,
            local_addr,
        })
    }

    /// Build the HTTP protocol adapter
    ///
    /// # Errors
    ///
    /// Returns an error if binding the listener fails
    pub async fn adapter(config: &AdapterConfig) -> anyhow::Result<Self> {
        let listener = bind(config.listen_address()).await?;
        let local_addr = listener.local_addr()?;

        let state = Arc::new(AdapterState::from_config(config));

        let app = with_health(Router::new(), &config.health)
            .merge(diffuse_mcp::adapter_router(state))
            .layer(TraceLayer::new_for_http());

        Ok(Self {
            name: "protocol adapter",
            router: app,
            listener,
            local_addr,
        })
    }

    /// Address the listener is bound to
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// URL a local client can reach this server at
    ///
    /// # Errors
    ///
    /// Returns an error if the address does not form a valid URL
    pub fn url(&self) -> anyhow::Result<Url> {
        reachable_url(self.local_addr)
    }

    /// Consume the server and return the inner router
    ///
    /// Useful for testing when the caller drives requests directly
    pub fn into_router(self) -> Router {
        self.router
    }

    /// Start serving requests
    ///
    /// Blocks until the cancellation token is triggered.
    ///
    /// # Errors
    ///
    /// Returns an error if serving fails
    pub async fn serve(self, shutdown: CancellationToken) -> anyhow::Result<()> {
        let name = self.name;
        tracing::info!(local_addr = %self.local_addr, "{name} listening");

        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(async move {
                shutdown.cancelled().await;
                tracing::info!("{name}: graceful shutdown initiated");
            })
            .await?;

        Ok(())
    }
}

fn with_health(app: Router, health: &HealthConfig) -> Router {
    if health.enabled {
        app.route(&health.path, get(|| async { "ok" }))
    } else {
        app
    }
}

async fn bind(addr: SocketAddr) -> anyhow::Result<TcpListener> {
    TcpListener::bind(addr)
        .await
        .map_err(|e| anyhow::anyhow!("failed to bind {addr}: {e}"))
}

/// `http://<addr>`, with wildcard hosts replaced by loopback
fn reachable_url(addr: SocketAddr) -> anyhow::Result<Url> {
    let host = match addr.ip() {
        ip if ip.is_unspecified() => IpAddr::V4(Ipv4Addr::LOCALHOST),
        ip => ip,
    };
    let url = Url::parse(&format!("http://{}", SocketAddr::new(host, addr.port())))?;
    Ok(url)
}
