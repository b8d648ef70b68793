//! HTTP entry point. Routes live in `abac::web`; this module binds the
//! listener and runs the server.
use crate::abac::{self, AbacState};
use crate::settings::Settings;
use miette::IntoDiagnostic;
use std::net::SocketAddr;
use std::sync::Arc;

pub async fn serve(settings: Settings, state: AbacState) -> miette::Result<()> {
    let addr: SocketAddr = settings
        .bind_addr()
        .parse()
        .map_err(|e| miette::miette!("bad addr: {e}"))?;

    let router = abac::web::router(Arc::new(state));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .into_diagnostic()?;
    tracing::info!(%addr, "Decision API listening");

    axum::serve(listener, router).await.into_diagnostic()?;
    Ok(())
}
