//! Porter Console Gateway
//!
//! Session and authentication broker fronting the management console:
//! credential and single sign-on login, session registry with expiry
//! sweeping, command dispatch and upload staging.

mod authenticator;
mod config;
mod dispatcher;
mod openapi;

use authenticator::ConfigAuthenticator;
use axum::Router;
use chrono::Duration;
use config::ConsoleConfig;
use dispatcher::LocalDispatcher;
use porter_api_auth::{auth_router, not_found, ConsoleState, UploadStaging};
use porter_api_saml::{saml_router, SamlState, SsoService};
use porter_session::{AuthenticationGateway, ExpirySweeper, SessionRegistry};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::limit::RequestBodyLimitLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Load configuration (fail-fast on unreadable or malformed files)
    let mut config = ConsoleConfig::from_file(ConsoleConfig::config_path()).unwrap_or_else(|e| {
        eprintln!("Configuration error: {e}");
        std::process::exit(1);
    });
    config.apply_env_overrides();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.logging.level.clone())),
        )
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        bind_addr = %config.bind_addr(),
        session_timeout_secs = config.session.timeout_secs,
        "starting console gateway"
    );

    if let Err(e) = std::fs::create_dir_all(&config.uploads.dir) {
        eprintln!(
            "Failed to create upload directory {}: {e}",
            config.uploads.dir
        );
        std::process::exit(1);
    }

    // Session layer
    let registry = Arc::new(SessionRegistry::new());
    let gateway = Arc::new(AuthenticationGateway::new(
        registry.clone(),
        Arc::new(ConfigAuthenticator::new(&config.users)),
        Duration::seconds(config.session.timeout_secs),
    ));

    let staging = Arc::new(UploadStaging::new(
        &config.uploads.dir,
        config.uploads.min_free_kib,
        config.uploads.max_file_kib,
    ));

    let dispatcher = Arc::new(LocalDispatcher::new());

    // Single sign-on. No protocol collaborator ships with the gateway;
    // deployments provide one through a factory. Until then every SSO
    // endpoint reports the service as unavailable, and SIGUSR1 retries
    // the factory against the current configuration.
    let sso = SsoService::new(
        gateway.clone(),
        Box::new(|| Err("no identity provider is configured".into())),
        config.sso_config(),
    );
    registry.set_logout_hook(sso.logout_hook());

    // Background expiry sweeping; sessions with a dispatch still in
    // flight are deferred to a later pass.
    let sweeper = Arc::new(ExpirySweeper::new(
        registry.clone(),
        dispatcher.clone(),
        std::time::Duration::from_secs(1),
    ));
    tokio::spawn(sweeper.run());

    // SIGUSR1 reloads the SSO provider configuration.
    #[cfg(unix)]
    {
        let sso = sso.clone();
        tokio::spawn(async move {
            let mut reload = match signal::unix::signal(signal::unix::SignalKind::user_defined1()) {
                Ok(s) => s,
                Err(e) => {
                    tracing::error!("Failed to install SIGUSR1 handler: {e}");
                    return;
                }
            };
            while reload.recv().await.is_some() {
                sso.reload();
            }
        });
    }

    let console_state = ConsoleState {
        gateway: gateway.clone(),
        dispatcher: dispatcher.clone(),
        staging,
        cookie_path: config.session.cookie_path.clone(),
        logout_location: config.session.logout_location.clone(),
        default_target: config.session.default_target.clone(),
        sso_login_path: "/saml/".into(),
        sso_logout_path: "/saml/logout".into(),
    };
    let saml_state = SamlState {
        sso,
        gateway,
        cookie_path: config.session.cookie_path.clone(),
    };

    let app = Router::new()
        .merge(auth_router(console_state))
        .merge(saml_router(saml_state))
        .merge(openapi::swagger_routes())
        .fallback(not_found)
        .layer(RequestBodyLimitLayer::new(config.server.max_body_size_bytes))
        .layer(tower_http::trace::TraceLayer::new_for_http());

    let addr: SocketAddr = match config.bind_addr().parse() {
        Ok(a) => a,
        Err(e) => {
            tracing::error!("Invalid bind address '{}': {e}", config.bind_addr());
            std::process::exit(1);
        }
    };

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!("Failed to bind to address {addr}: {e}");
            std::process::exit(1);
        }
    };

    info!(%addr, "console gateway listening");

    if let Err(e) = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    {
        tracing::error!("Server error: {e}");
        std::process::exit(1);
    }

    info!("Server shutdown complete");
}

/// Graceful shutdown on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
