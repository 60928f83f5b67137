use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context as _;
use clap::Parser;

use shelfnotes::books::LocalFsBookStore;
use shelfnotes::notes::LocalFsNoteStore;
use shelfnotes::server::{self, AppState};

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct AppArgs {
    /// Address to listen on.
    #[arg(long, default_value = "127.0.0.1:3001")]
    addr: SocketAddr,

    /// Site root; `posts/`, `_data/books/` and `assets/` live beneath it.
    #[arg(long, default_value = ".")]
    site_dir: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(err) = try_main().await {
        eprintln!("{err:#}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

async fn try_main() -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new("info"))
        .context("build log filter")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow::anyhow!("initialize tracing subscriber: {err}"))?;

    let args = AppArgs::parse();
    tracing::info!(?args, "starting shelfnotes admin server");

    let posts_dir = args.site_dir.join("posts");
    let data_dir = args.site_dir.join("_data").join("books");
    let assets_dir = args.site_dir.join("assets");
    let covers_dir = assets_dir.join("images").join("covers");

    for dir in [&posts_dir, &data_dir, &covers_dir] {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("create data dir: {}", dir.display()))?;
    }

    let state = AppState {
        book_store: Arc::new(LocalFsBookStore::new(&posts_dir, &data_dir, &covers_dir)),
        note_store: Arc::new(LocalFsNoteStore::new(&data_dir)),
        covers_dir,
    };
    let app = server::router(state, assets_dir);

    let listener = tokio::net::TcpListener::bind(args.addr)
        .await
        .map_err(|err| anyhow::anyhow!("bind {}: {err}", args.addr))?;
    tracing::info!(addr = %args.addr, "admin API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down");
        })
        .await?;

    Ok(())
}
