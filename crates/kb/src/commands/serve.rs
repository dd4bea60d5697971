//! Serve command - runs the HTTP server.

use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use clap::Args;
use tracing::{info, warn};

use kb_config::{KbConfig, StorageBackend};
use kb_server::{AppState, CookieConfig, Server, ServerConfig};
use kb_session::{SessionConfig, SessionStore};
use kb_storage::SqliteStore;

use super::Context;

/// Arguments for the serve command.
///
/// CLI arguments override config file values.
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Address to bind to, `host:port` (overrides config)
    #[arg(short, long)]
    pub bind: Option<String>,

    /// Let unauthenticated visitors browse public questions (overrides config)
    #[arg(long)]
    pub allow_public: bool,

    /// Create a user at startup, `NAME:PASSWORD` (repeatable). Existing users
    /// are left alone. Needed for logins on the memory backend.
    #[arg(long = "seed-user", value_name = "NAME:PASSWORD", value_parser = parse_seed_user)]
    pub seed_users: Vec<SeedUser>,
}

/// A user to create when the server starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedUser {
    pub username: String,
    pub password: String,
}

fn parse_seed_user(value: &str) -> std::result::Result<SeedUser, String> {
    match value.split_once(':') {
        Some((username, password)) if !username.is_empty() && !password.is_empty() => {
            Ok(SeedUser {
                username: username.to_string(),
                password: password.to_string(),
            })
        }
        _ => Err("expected NAME:PASSWORD with both parts non-empty".to_string()),
    }
}

/// Run the serve command.
pub async fn run(args: ServeArgs, ctx: &Context) -> Result<()> {
    let loaded = ctx.load()?;
    let config = &loaded.config;

    let sources = loaded.loaded_from();
    if sources.is_empty() {
        println!("No config files found, using defaults + CLI args");
    } else {
        for source in &sources {
            println!("Loaded config: {}", source.display());
        }
    }

    let store = open_store(ctx, config)?;
    let seeded = seed_users(&store, &args.seed_users)?;
    if seeded > 0 {
        println!("Seeded {} user(s)", seeded);
    } else if ctx.storage(config).backend == StorageBackend::Memory {
        warn!("Memory backend has no users; logins will fail without --seed-user");
    }

    let purged = store.purge_expired_sessions(Utc::now())?;
    if purged > 0 {
        info!(purged, "Removed expired sessions from the database");
    }

    let sessions = Arc::new(SessionStore::new(
        session_config(config),
        Arc::new(store.clone()),
    ));
    let _cleanup = sessions.spawn_cleanup_task();

    let server_config = server_config(&args, config)?;
    println!("Bind address: {}", server_config.bind_address);

    let state = AppState::new(
        server_config,
        sessions,
        cookie_config(config),
        Arc::new(store.clone()),
        Arc::new(store),
    );
    Server::from_state(state).run().await?;

    Ok(())
}

fn open_store(ctx: &Context, config: &KbConfig) -> Result<SqliteStore> {
    let storage = ctx.storage(config);
    let store = match storage.backend {
        StorageBackend::Sqlite => {
            println!("Database: {}", storage.path.display());
            SqliteStore::open(&storage.path)?
        }
        StorageBackend::Memory => {
            println!("Database: in-memory (contents are lost on exit)");
            SqliteStore::open_in_memory()?
        }
    };
    Ok(store)
}

/// Create each seed user that does not exist yet. Returns the number created.
fn seed_users(store: &SqliteStore, users: &[SeedUser]) -> Result<usize> {
    let mut created = 0;
    for user in users {
        if store.user_exists(&user.username)? {
            info!(username = %user.username, "Seed user already exists");
            continue;
        }
        store.create_user(&user.username, &user.password)?;
        info!(username = %user.username, "Seeded user");
        created += 1;
    }
    Ok(created)
}

fn server_config(args: &ServeArgs, config: &KbConfig) -> Result<ServerConfig> {
    let mut section = config.server();
    if let Some(bind) = &args.bind {
        section.bind = bind.clone();
    }

    Ok(ServerConfig::new()
        .with_bind_address(section.bind_addr()?)
        .with_allow_public_questions(args.allow_public || section.allow_public_questions)
        .with_request_logging(section.request_logging)
        .with_cors_origins(section.cors_origins))
}

fn session_config(config: &KbConfig) -> SessionConfig {
    let section = config.session();
    let session = SessionConfig::new()
        .with_lifetime(section.lifetime())
        .with_max_cached_sessions(section.max_cached_sessions)
        .with_store_timeout(section.store_timeout())
        .with_enforce_expiry(section.enforce_expiry);

    match section.cleanup_interval() {
        Some(interval) => session.with_cleanup_interval(interval),
        None => session.without_cleanup_task(),
    }
}

fn cookie_config(config: &KbConfig) -> CookieConfig {
    let section = config.session();
    let lifetime = section.lifetime();
    CookieConfig::new()
        .with_name(section.cookie_name)
        .with_public_name(section.public_cookie_name)
        .with_lifetime(lifetime)
        .with_secure(section.secure_cookies)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn args(bind: Option<&str>) -> ServeArgs {
        ServeArgs {
            bind: bind.map(str::to_string),
            allow_public: false,
            seed_users: Vec::new(),
        }
    }

    #[test]
    fn test_cli_bind_overrides_config() {
        let config = KbConfig::from_toml("[server]\nbind = \"0.0.0.0:8080\"\n").unwrap();
        let server = server_config(&args(Some("127.0.0.1:9000")), &config).unwrap();
        assert_eq!(server.bind_address.port(), 9000);

        let server = server_config(&args(None), &config).unwrap();
        assert_eq!(server.bind_address.port(), 8080);
    }

    #[test]
    fn test_seed_user_parsing() {
        let user = parse_seed_user("alice:pa:ss").unwrap();
        assert_eq!(user.username, "alice");
        assert_eq!(user.password, "pa:ss");

        assert!(parse_seed_user("alice").is_err());
        assert!(parse_seed_user(":secret").is_err());
        assert!(parse_seed_user("alice:").is_err());
    }

    #[test]
    fn test_seed_users_enable_login_on_memory_backend() {
        let store = SqliteStore::open_in_memory().unwrap();
        let users = vec![
            parse_seed_user("alice:wonderland").unwrap(),
            parse_seed_user("bob:builder").unwrap(),
        ];

        assert_eq!(seed_users(&store, &users).unwrap(), 2);
        assert!(store.verify_credentials("alice", "wonderland").unwrap());
        assert!(!store.verify_credentials("bob", "wonderland").unwrap());

        // A restart against a persistent store does not fail or reset passwords.
        let again = vec![parse_seed_user("alice:changed").unwrap()];
        assert_eq!(seed_users(&store, &again).unwrap(), 0);
        assert!(store.verify_credentials("alice", "wonderland").unwrap());
    }

    #[test]
    fn test_bad_bind_is_an_error() {
        let config = KbConfig::new();
        assert!(server_config(&args(Some("nowhere")), &config).is_err());
    }

    #[test]
    fn test_session_and_cookie_lifetimes_agree() {
        let config = KbConfig::from_toml(
            r#"
[session]
lifetime_secs = 600
cookie_name = "kb_sid"
cleanup_interval_secs = 0
"#,
        )
        .unwrap();

        let session = session_config(&config);
        let cookies = cookie_config(&config);
        assert_eq!(session.lifetime, Duration::from_secs(600));
        assert_eq!(cookies.lifetime, session.lifetime);
        assert_eq!(cookies.name, "kb_sid");
        assert!(session.cleanup_interval.is_none());
    }
}
