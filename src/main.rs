// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::{net::SocketAddr, time::Duration};

use axum::{Extension, Router};
use axum_server::{tls_rustls::RustlsConfig, Handle};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use lti_launch_context::{
    api::router,
    config::{ServerConfig, DEFAULT_LOG_FILTER, LOG_FORMAT_ENV},
    lti::Transport,
    state::AppState,
};

/// Longest time in-flight requests get after a shutdown signal.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() {
    init_tracing();

    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            std::process::exit(1);
        }
    };
    let addr: SocketAddr = config.bind_addr().expect("Failed to parse bind address");

    tracing::info!(
        consumer_key = %config.lti.key,
        persist = config.lti.persist,
        persist_failures = config.lti.persist_failures,
        cookie = %config.lti.cookie_name,
        "LTI launch settings loaded"
    );

    let state = AppState::with_oauth1(config.lti.clone(), config.nonce_capacity);
    let app: Router = router(state);

    let handle = Handle::new();
    tokio::spawn(shutdown_on_signal(handle.clone()));

    match config.tls {
        Some(tls) => {
            // Install the ring crypto provider for rustls (must be done before any TLS operations)
            rustls::crypto::ring::default_provider()
                .install_default()
                .expect("Failed to install rustls crypto provider");

            let tls_config = RustlsConfig::from_pem_file(&tls.cert, &tls.key)
                .await
                .expect("Failed to load TLS certificate and key");

            tracing::info!("LTI launch server listening on https://{addr} (docs at /docs)");
            axum_server::bind_rustls(addr, tls_config)
                .handle(handle)
                .serve(app.layer(Extension(Transport::Tls)).into_make_service())
                .await
                .expect("Server failed");
        }
        None => {
            tracing::info!("LTI launch server listening on http://{addr} (docs at /docs)");
            axum_server::bind(addr)
                .handle(handle)
                .serve(app.layer(Extension(Transport::Plain)).into_make_service())
                .await
                .expect("Server failed");
        }
    }
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let json = std::env::var(LOG_FORMAT_ENV)
        .map(|f| f.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().pretty())
            .init();
    }
}

/// Stop accepting on Ctrl-C and let in-flight requests finish.
async fn shutdown_on_signal(handle: Handle<SocketAddr>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!(
        grace_secs = SHUTDOWN_GRACE.as_secs(),
        "Shutdown signal received, draining connections"
    );
    handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
}
