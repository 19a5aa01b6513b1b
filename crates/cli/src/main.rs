mod di;
mod server;

use arc_swap::ArcSwap;
use clap::Parser;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use vigil_dns_application::ports::SessionStore;
use vigil_dns_domain::{CliOverrides, Config};
use vigil_dns_infrastructure::ingest::LogTailer;
use vigil_dns_infrastructure::system::HostProbe;
use vigil_dns_jobs::{Housekeeper, JobRunner, QueryFlushJob};

#[derive(Parser)]
#[command(name = "vigil-dns")]
#[command(version)]
#[command(about = "DNS resolver telemetry sidecar with a JSON API")]
struct Cli {
    /// Configuration file path
    #[arg(short = 'c', long, value_name = "FILE")]
    config: Option<String>,

    /// API server port
    #[arg(short = 'p', long)]
    port: Option<u16>,

    /// Bind address
    #[arg(short = 'b', long)]
    bind: Option<String>,

    /// Long-term database path
    #[arg(long)]
    database: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let overrides = CliOverrides {
        port: cli.port,
        bind_address: cli.bind.clone(),
        database_path: cli.database.clone(),
        log_level: cli.log_level.clone(),
    };

    let config_path = cli.config.clone().or_else(|| {
        ["vigil-dns.toml", "/etc/vigil-dns/config.toml"]
            .iter()
            .find(|p| std::path::Path::new(p).exists())
            .map(|p| p.to_string())
    });

    let config = Config::load(config_path.as_deref(), overrides)?;
    config.validate()?;

    tracing_subscriber::fmt()
        .with_target(true)
        .with_level(true)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level)),
        )
        .init();

    info!("Starting vigil-dns v{}", env!("CARGO_PKG_VERSION"));
    info!(
        config_file = config_path.as_deref().unwrap_or("defaults"),
        bind = %config.server.bind_address,
        port = config.server.port,
        database = %config.database.path,
        resolver_log = %config.files.resolver_log,
        "Configuration loaded"
    );

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0);

    let config = Arc::new(ArcSwap::from_pointee(config));
    let wiring = match di::build(config.clone(), config_path.as_deref(), now).await {
        Ok(w) => w,
        Err(e) => {
            error!(error = %e, "Failed to initialize databases");
            return Err(e);
        }
    };

    // Sessions survive clean restarts
    match wiring.session_store.restore().await {
        Ok(sessions) => {
            let restored = wiring.sessions.restore(sessions, now);
            if restored > 0 {
                info!(restored, "Restored API sessions");
            }
        }
        Err(e) => warn!(error = %e, "Could not restore API sessions"),
    }

    let shutdown = CancellationToken::new();

    let cfg = config.load_full();
    let housekeeper = {
        let job = Housekeeper::new(
            wiring.core.clone(),
            wiring.gc.clone(),
            wiring.history.clone(),
            Arc::new(HostProbe::new()),
            config.clone(),
        );
        match &config_path {
            Some(path) => job.with_config_file(path.clone()),
            None => job,
        }
    };
    let flush_job = QueryFlushJob::new(
        wiring.flush.clone(),
        cfg.database.mem_flush_interval,
        cfg.database.disk_flush_interval,
    );

    JobRunner::new()
        .with_housekeeper(housekeeper)
        .with_query_flush(flush_job)
        .with_shutdown_token(shutdown.clone())
        .start()
        .await;

    let tailer = LogTailer::new(
        wiring.core.clone(),
        cfg.files.resolver_log.clone(),
        shutdown.clone(),
    );
    tokio::spawn(tailer.run());

    server::serve(wiring.state.clone(), &cfg, shutdown.clone()).await?;

    // Shutdown path: stop the jobs, let the final flush drain, store sessions
    shutdown.cancel();
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;

    if let Err(e) = wiring.flush.execute(true).await {
        warn!(error = %e, "Final flush failed during shutdown");
    }
    if let Err(e) = wiring
        .session_store
        .backup(&wiring.sessions.snapshot())
        .await
    {
        warn!(error = %e, "Could not persist API sessions");
    }

    info!("Shutdown complete");
    Ok(())
}
