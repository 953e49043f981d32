//! Process entry point: load the corpus, build the index, serve queries,
//! rebuild-and-swap on SIGHUP.

use std::process;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use simdex::loader::{self, IndexHandle};
use simdex::server::{self, AppState};
use simdex::Config;

fn init_logging(verbose: bool) {
    let default = if verbose { "simdex=debug,simdexd=debug,info" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() {
    let cfg = Config::parse();
    init_logging(cfg.verbose);

    if let Err(e) = run(cfg).await {
        error!("{e}");
        process::exit(1);
    }
}

async fn run(cfg: Config) -> simdex::Result<()> {
    cfg.validate()?;

    if let Some(cpus) = cfg.cpus {
        rayon::ThreadPoolBuilder::new()
            .num_threads(cpus)
            .build_global()
            .map_err(|e| simdex::Error::Config(format!("cannot size worker pool: {e}")))?;
    }

    let index = loader::build_index(&cfg)?;
    let handle = Arc::new(IndexHandle::new(index));
    let state = AppState::new(handle.clone());

    #[cfg(unix)]
    spawn_reload_task(cfg.clone(), handle.clone());

    if let Some(endpoint) = cfg.telemetry.clone() {
        spawn_stats_task(endpoint, state.clone());
    }

    let app = server::router(&cfg, state);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", cfg.port)).await?;
    info!(port = cfg.port, "listening");
    axum::serve(listener, app).await?;
    Ok(())
}

/// SIGHUP rebuilds off the request path and publishes atomically; a failed
/// rebuild leaves the current index serving.
#[cfg(unix)]
fn spawn_reload_task(cfg: Config, handle: Arc<IndexHandle>) {
    tokio::spawn(async move {
        use tokio::signal::unix::{signal, SignalKind};

        let mut hangup = match signal(SignalKind::hangup()) {
            Ok(s) => s,
            Err(e) => {
                error!("cannot install reload handler: {e}");
                return;
            }
        };

        while hangup.recv().await.is_some() {
            info!("reload signal received, rebuilding index");
            let build_cfg = cfg.clone();
            let built =
                tokio::task::spawn_blocking(move || loader::build_index(&build_cfg)).await;
            match built {
                Ok(Ok(index)) => {
                    handle.publish(index);
                    info!("new index published");
                }
                Ok(Err(e)) => error!("rebuild failed, keeping current index: {e}"),
                Err(e) => error!("rebuild task died, keeping current index: {e}"),
            }
        }
    });
}

/// Periodic counter report while a telemetry endpoint is configured.
/// Counters are emitted through the log pipeline; shipping them onto the
/// wire is the collector's job, not the index's.
fn spawn_stats_task(endpoint: String, state: AppState) {
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(Duration::from_secs(60));
        loop {
            tick.tick().await;
            let index = state.index.snapshot();
            info!(
                target: "simdex::stats",
                endpoint = %endpoint,
                queries = state.queries.load(std::sync::atomic::Ordering::Relaxed),
                records = index.records,
                corrupt_blocks = index.corrupt_blocks(),
                "stats"
            );
        }
    });
}
