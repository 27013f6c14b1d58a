//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use agent_server::config::ServerConfig;
use agent_server::conversation::ConversationManager;
use agent_server::http::HttpServer;
use agent_server::lifecycle::Shutdown;
use tempfile::TempDir;

pub const INDEX_HTML: &str = "<!doctype html><html><body>agent</body></html>";
pub const APP_JS: &str = "console.log('agent');";

/// A running server on an ephemeral port. Shuts down on drop.
pub struct TestServer {
    pub addr: SocketAddr,
    pub conversations: Arc<ConversationManager>,
    shutdown: Shutdown,
    _frontend: TempDir,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn ws_url(&self, query: &str) -> String {
        format!("ws://{}/ws?{}", self.addr, query)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Frontend build directory with an index and one static asset.
pub fn frontend() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("index.html"), INDEX_HTML).unwrap();
    std::fs::create_dir(dir.path().join("assets")).unwrap();
    std::fs::write(dir.path().join("assets/app.js"), APP_JS).unwrap();
    dir
}

/// Start a server with rate limiting off, after applying `configure`.
pub async fn start_server<F>(configure: F) -> TestServer
where
    F: FnOnce(&mut ServerConfig),
{
    let frontend = frontend();

    let mut config = ServerConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.static_files.directory = frontend.path().display().to_string();
    config.rate_limit.enabled = false;
    configure(&mut config);

    let listener = HttpServer::bind(&config.listener).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config);
    let conversations = server.conversations();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    // Listener is already bound; give the accept loop a moment anyway.
    tokio::time::sleep(Duration::from_millis(50)).await;

    TestServer {
        addr,
        conversations,
        shutdown,
        _frontend: frontend,
    }
}

/// Client without connection pooling or system proxies.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
