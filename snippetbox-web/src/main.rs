//! Snippetbox server

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use snippetbox_web::{
    routes, AppState, Config, InMemorySessionStore, InMemorySnippetStore, InMemoryUserStore,
    SessionManager, SessionStore, SnippetStore, SqliteStore, TemplateCache, UserStore,
};

/// How often expired sessions are swept from the store
const SESSION_CLEANUP_INTERVAL: Duration = Duration::from_secs(5 * 60);

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "snippetbox_web=debug,snippetbox=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env().context("invalid configuration")?;
    tracing::info!(?config, "Loaded configuration");

    match &config.database {
        Some(path) => {
            let store = Arc::new(
                SqliteStore::open(&path.to_string_lossy())
                    .with_context(|| format!("failed to open database {}", path.display()))?,
            );
            tracing::info!(path = %path.display(), "Using SQLite storage");
            serve(&config, store.clone(), store.clone(), store).await
        }
        None => {
            tracing::warn!("SNIPPETBOX_DATABASE not set, data will not survive a restart");
            serve(
                &config,
                InMemorySnippetStore::new(),
                InMemoryUserStore::new(),
                InMemorySessionStore::new(),
            )
            .await
        }
    }
}

async fn serve<N, U, S>(config: &Config, snippets: N, users: U, sessions: S) -> Result<()>
where
    N: SnippetStore + 'static,
    U: UserStore + 'static,
    S: SessionStore + 'static,
{
    let sessions = SessionManager::new(sessions)
        .with_lifetime(chrono::Duration::hours(config.session_lifetime_hours))
        .with_secure_cookie(config.secure_cookies);

    let state = Arc::new(AppState::new(
        snippets,
        users,
        sessions,
        TemplateCache::new(),
    ));

    // Sweep expired sessions in the background
    let cleanup_state = state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SESSION_CLEANUP_INTERVAL);
        loop {
            interval.tick().await;
            match cleanup_state.sessions.purge_expired() {
                Ok(0) => {}
                Ok(removed) => tracing::debug!(removed, "Purged expired sessions"),
                Err(e) => tracing::error!(error = %e, "Failed to purge expired sessions"),
            }
        }
    });

    let app = routes::create_router_with_static_path(state, &config.static_dir.to_string_lossy());

    let listener = TcpListener::bind(config.addr).await?;
    tracing::info!("Snippetbox listening on http://{}", config.addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received");
}
