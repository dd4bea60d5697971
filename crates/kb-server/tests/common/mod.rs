//! Common test utilities for integration tests.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use reqwest::Client;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio::time::timeout;

use kb_server::{AppState, CookieConfig, Server, ServerConfig};
use kb_session::{SessionConfig, SessionStore};
use kb_storage::SqliteStore;

/// Password every seeded user shares.
pub const PASSWORD: &str = "correct horse";

/// A test server over a SQLite file, running in the background.
///
/// Seeded with organization `acme` (admin alice, member bob) and team
/// `acme/platform` (admin carol, member bob).
pub struct TestServer {
    pub addr: SocketAddr,
    pub store: SqliteStore,
    /// Session store, for inspecting the cache tier.
    pub sessions: Arc<SessionStore>,
    _handle: JoinHandle<()>,
    _temp_dir: TempDir,
}

impl TestServer {
    pub async fn start() -> Result<Self> {
        Self::start_with(ServerConfig::new().with_request_logging(false)).await
    }

    pub async fn start_with(config: ServerConfig) -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let store = SqliteStore::open(temp_dir.path().join("kb.db"))?;
        seed(&store)?;

        let sessions = Arc::new(SessionStore::new(
            SessionConfig::default().without_cleanup_task(),
            Arc::new(store.clone()),
        ));

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let state = AppState::new(
            config.with_bind_address(addr),
            sessions.clone(),
            CookieConfig::default(),
            Arc::new(store.clone()),
            Arc::new(store.clone()),
        );
        let server = Server::from_state(state);
        let handle = tokio::spawn(async move {
            let _ = server.serve(listener).await;
        });

        wait_for_server(&Client::new(), addr).await?;

        Ok(Self {
            addr,
            store,
            sessions,
            _handle: handle,
            _temp_dir: temp_dir,
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// A fresh client with its own cookie jar, like a separate browser.
    pub fn browser(&self) -> Result<Client> {
        Ok(Client::builder().cookie_store(true).build()?)
    }

    /// A browser logged in as `username`.
    pub async fn logged_in(&self, username: &str) -> Result<Client> {
        let client = self.browser()?;
        let resp = client
            .post(self.url("/login"))
            .json(&serde_json::json!({ "username": username, "password": PASSWORD }))
            .send()
            .await?;
        anyhow::ensure!(resp.status().is_success(), "login failed: {}", resp.status());
        Ok(client)
    }
}

fn seed(store: &SqliteStore) -> Result<()> {
    for user in ["alice", "bob", "carol", "dave"] {
        store.create_user(user, PASSWORD)?;
    }
    store.create_organization("acme")?;
    store.add_organization_member("acme", "alice", true)?;
    store.add_organization_member("acme", "bob", false)?;
    store.create_team("acme", "platform")?;
    store.add_team_member("acme", "platform", "carol", true)?;
    store.add_team_member("acme", "platform", "bob", false)?;
    Ok(())
}

/// Wait for the server to become ready.
async fn wait_for_server(client: &Client, addr: SocketAddr) -> Result<()> {
    let url = format!("http://{}/health", addr);

    let result = timeout(Duration::from_secs(5), async {
        loop {
            match client.get(&url).send().await {
                Ok(resp) if resp.status().is_success() => return,
                _ => tokio::time::sleep(Duration::from_millis(50)).await,
            }
        }
    })
    .await;

    match result {
        Ok(()) => Ok(()),
        Err(_) => anyhow::bail!("Timeout waiting for server to start"),
    }
}
