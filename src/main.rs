use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::Mutex;

use mailfeed::api::{self, ApiContext};
use mailfeed::db::Database;
use mailfeed::graph::{GraphMailClient, MailProvider};
use mailfeed::outbox::MirrorOutbox;
use mailfeed::realtime::SocketRegistry;

#[derive(Debug, Parser)]
#[command(name = "mailfeed", version, about = "Outlook Inbox Feed Service")]
struct Cli {
    /// Port to listen on
    #[arg(long, env = "MAILFEED_PORT", default_value_t = 3000)]
    port: u16,

    /// SQLite database path (defaults to ~/.mailfeed/mailfeed.db)
    #[arg(long, env = "MAILFEED_DB")]
    db_path: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let db_path = match cli.db_path {
        Some(path) => path,
        None => Database::default_db_path().context("resolve default mailfeed database path")?,
    };
    let db = Database::open(&db_path)
        .with_context(|| format!("open mailfeed database at {}", db_path.display()))?;
    let db = Arc::new(Mutex::new(db));

    let provider: Arc<dyn MailProvider> =
        Arc::new(GraphMailClient::new().context("build graph mail client")?);
    let outbox = MirrorOutbox::spawn(Arc::clone(&provider), Arc::clone(&db));

    let context = ApiContext {
        db,
        provider,
        outbox,
        sockets: Arc::new(SocketRegistry::new()),
    };
    let app = api::router(context);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", cli.port))
        .await
        .with_context(|| format!("bind port {}", cli.port))?;
    tracing::info!(port = cli.port, db = %db_path.display(), "mailfeed listening");

    axum::serve(listener, app).await.context("serve mailfeed api")?;

    Ok(())
}
