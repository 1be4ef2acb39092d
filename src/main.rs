//! Shreddr auth server entry point.
//!
//! 1. Load configuration from environment
//! 2. Build the auth service over an in-memory user directory
//! 3. Serve the RPC router until SIGINT/SIGTERM

use shreddr_auth::{
    config::Config,
    crypto::challenge::ChallengeStore,
    rpc::{self, AppState},
    AuthService, MemoryUserDirectory,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env().expect("Failed to load config");
    tracing::info!(?config, "Starting shreddr-auth");

    let mut auth = AuthService::new(config.jwt.clone(), Arc::new(MemoryUserDirectory::new()));
    if config.nonce_challenges {
        auth = auth.with_challenge_store(ChallengeStore::with_capacity(
            config.challenge_ttl_secs,
            config.max_outstanding_challenges,
        ));
        tracing::info!(
            ttl_secs = config.challenge_ttl_secs,
            capacity = config.max_outstanding_challenges,
            "Nonce challenges enabled"
        );
    }
    let auth = Arc::new(auth);

    if auth.nonce_challenges_enabled() {
        let sweeper = Arc::clone(&auth);
        let interval = Duration::from_secs(config.challenge_ttl_secs.max(1) as u64);
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                let purged = sweeper.purge_expired_challenges();
                if purged > 0 {
                    tracing::debug!(purged, "Purged expired challenges");
                }
            }
        });
    }

    let app = rpc::router(AppState { auth })
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .expect("Failed to bind");
    tracing::info!("Listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    tracing::info!("Server stopped");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Received signal to stop server");
}
