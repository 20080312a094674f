//! Test server wrapper that runs a diffuse service on a random port

use std::net::SocketAddr;

use diffuse_config::Config;
use diffuse_server::Server;
use tokio_util::sync::CancellationToken;

/// A running test server instance
pub struct TestServer {
    addr: SocketAddr,
    shutdown: CancellationToken,
    client: reqwest::Client,
}

impl TestServer {
    /// Start the image service from `config`
    pub async fn image_service(config: &Config) -> anyhow::Result<Self> {
        Ok(Self::spawn(Server::image_service(&config.image_service).await?))
    }

    /// Start the protocol adapter from `config`
    pub async fn adapter(config: &Config) -> anyhow::Result<Self> {
        Ok(Self::spawn(Server::adapter(&config.adapter).await?))
    }

    fn spawn(server: Server) -> Self {
        let addr = server.local_addr();
        let shutdown = CancellationToken::new();
        let shutdown_clone = shutdown.clone();

        tokio::spawn(async move {
            server.serve(shutdown_clone).await.ok();
        });

        Self {
            addr,
            shutdown,
            client: reqwest::Client::new(),
        }
    }

    /// URL of `path` on the running test server
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    /// Base URL, for pointing another service at this one
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Get a reference to the HTTP client
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
