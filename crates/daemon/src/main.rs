// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `dgd`, the Delegate daemon binary.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use dg_core::Layout;
use dg_daemon::{http, lifecycle};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let layout = Layout::discover();
    init_tracing(&layout);

    let handle = match lifecycle::startup(layout).await {
        Ok(handle) => handle,
        Err(e) => {
            eprintln!("dgd: {e}");
            std::process::exit(e.exit_code());
        }
    };

    // Bind the HTTP surface and record the chosen port.
    let addr = std::net::SocketAddr::from(([127, 0, 0, 1], handle.config.port));
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            eprintln!("dgd: bind {addr}: {e}");
            std::process::exit(3);
        }
    };
    let port = listener.local_addr().map(|a| a.port()).unwrap_or(handle.config.port);
    if let Err(e) = std::fs::write(handle.layout.port_path(), format!("{port}\n")) {
        tracing::warn!(error = %e, "failed to write port file");
    }
    tracing::info!(port, "http surface listening");

    let app = http::router(std::sync::Arc::clone(&handle));
    let cancel = handle.cancel.clone();
    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        tokio::select! {
            _ = cancel.cancelled() => {}
            _ = shutdown_signal() => {}
        }
    });

    if let Err(e) = server.await {
        tracing::error!(error = %e, "http server error");
    }

    lifecycle::shutdown(&handle).await;
}

async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};
    let mut term = match signal(SignalKind::terminate()) {
        Ok(term) => term,
        Err(_) => return std::future::pending::<()>().await,
    };
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = term.recv() => {}
    }
}

fn init_tracing(layout: &Layout) {
    let logs = layout.logs_dir();
    let _ = std::fs::create_dir_all(&logs);
    let file_appender = tracing_appender::rolling::daily(&logs, "dgd.log");
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(file_appender)
        .with_ansi(false)
        .init();
}
