use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use log::info;
use tokio::net::TcpListener;

use getty::{AnyStore, GettyService, api::make_router, config::StoreBackend};

use crate::examples::ExampleGroup;
use crate::output::OutputManager;

pub const EXAMPLES: &[ExampleGroup] = &[
    ExampleGroup {
        title: "Serve",
        commands: &[
            "getty serve                          # In-memory store on 127.0.0.1:3000",
            "getty serve --bind 0.0.0.0:8080",
        ],
    },
    ExampleGroup {
        title: "Redis",
        commands: &[
            "REDIS_URL=redis://127.0.0.1/ getty --backend redis serve",
            "getty --config deploy/getty.toml serve",
        ],
    },
];

#[derive(Args)]
pub struct ServeArgs {
    /// Address to listen on; overrides [server].bind
    #[arg(long)]
    pub bind: Option<String>,
}

pub async fn handle_serve(
    bind: &str,
    backend: StoreBackend,
    service: GettyService<AnyStore>,
    output: &OutputManager,
) -> Result<()> {
    let backend = backend.as_str();
    let listener = TcpListener::bind(bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;
    let address = listener.local_addr()?;

    output.success("getty API listening");
    output.key_value("Address", &format!("http://{address}/api/database"));
    output.key_value("Store", backend);
    info!("listening on {address} with the {backend} store");

    axum::serve(listener, make_router(Arc::new(service)))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    output.info("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        log::error!("failed to listen for ctrl-c: {err}");
    }
    info!("shutdown requested");
}
