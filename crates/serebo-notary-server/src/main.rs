//! serebo-notary-server — the SEREBO Notary web service.
//!
//! Serves the four XML-RPC procedures (register_blackbox,
//! notarizeSereboBB, checkBlackBoxRegistration, checkNotarization) over
//! HTTP POST, backed by a single SQLite state file.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use serebo_notary_server::{router, NotaryService};

#[derive(Parser, Debug)]
#[command(
    name = "serebo-notary-server",
    version,
    about = "SEREBO Notary — co-signs black box ledger heads over XML-RPC"
)]
struct Args {
    /// Path to the notary state database.
    #[arg(long, default_value = "serebo_notary/notabase.sqlite")]
    db: PathBuf,

    /// HTTP listen address.
    #[arg(long, default_value = "127.0.0.1:8099")]
    listen: SocketAddr,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,serebo=debug".parse().unwrap()),
        )
        .init();

    let args = Args::parse();
    let service = Arc::new(
        NotaryService::open(&args.db)
            .with_context(|| format!("opening notary database {}", args.db.display()))?,
    );
    info!(db = %args.db.display(), "notary state ready");

    let listener = tokio::net::TcpListener::bind(args.listen)
        .await
        .with_context(|| format!("binding {}", args.listen))?;
    info!(listen = %args.listen, "notary serving");
    axum::serve(listener, router(service))
        .await
        .context("serving XML-RPC")?;
    Ok(())
}
