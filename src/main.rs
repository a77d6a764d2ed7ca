use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use push_builder::build::CommandBuild;
use push_builder::config::Config;
use push_builder::git::GitRepositoryFactory;
use push_builder::persistence::WatchlistStore;
use push_builder::pipeline::Pipeline;
use push_builder::server::{AppState, build_router};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "push_builder=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::parse();

    let Some(builder) = CommandBuild::from_argv(&config.build_command) else {
        bail!("build command must not be empty");
    };

    let store = WatchlistStore::new(config.watchlist_path());
    match store.load() {
        Ok(watchlist) if watchlist.is_empty() => {
            warn!(path = %store.path().display(), "Watchlist is empty; every push will be ignored");
        }
        Ok(watchlist) => {
            info!(path = %store.path().display(), repos = watchlist.len(), "Loaded watchlist");
        }
        Err(e) => {
            warn!(
                path = %store.path().display(),
                error = %e,
                "Watchlist not usable; pushes will fail until it is fixed"
            );
        }
    }

    let addr = config.listen;
    let repositories = GitRepositoryFactory::new(config.remote_template.clone());
    let pipeline = Pipeline::new(config, Box::new(repositories), Box::new(builder));
    let app = build_router(AppState::new(pipeline));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
