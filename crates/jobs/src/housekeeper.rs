use arc_swap::ArcSwap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use vigil_dns_application::ports::{QueryHistoryRepository, SystemProbe};
use vigil_dns_application::use_cases::{RunGarbageCollectionUseCase, GC_INTERVAL_SECS};
use vigil_dns_application::Core;
use vigil_dns_domain::Config;

/// Seconds between resource checks (load average, disk usage).
const RESOURCE_CHECK_SECS: i64 = 300;

/// The housekeeping task: a one-second loop that rolls rate-limit windows,
/// samples CPU usage, checks host resources, runs the garbage collector on
/// its aligned interval and reloads the config file when it changes on disk.
pub struct Housekeeper {
    core: Arc<Core>,
    gc: Arc<RunGarbageCollectionUseCase>,
    history: Arc<dyn QueryHistoryRepository>,
    probe: Arc<dyn SystemProbe>,
    config: Arc<ArcSwap<Config>>,
    config_path: Option<PathBuf>,
    cancel: CancellationToken,
    tick: Duration,
}

impl Housekeeper {
    pub fn new(
        core: Arc<Core>,
        gc: Arc<RunGarbageCollectionUseCase>,
        history: Arc<dyn QueryHistoryRepository>,
        probe: Arc<dyn SystemProbe>,
        config: Arc<ArcSwap<Config>>,
    ) -> Self {
        Self {
            core,
            gc,
            history,
            probe,
            config,
            config_path: None,
            cancel: CancellationToken::new(),
            tick: Duration::from_secs(1),
        }
    }

    pub fn with_config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    pub async fn start(self: Arc<Self>) {
        info!("Starting housekeeper");
        tokio::spawn(async move { self.run().await });
    }

    async fn run(&self) {
        let mut last_rate_reset = now_secs();
        let mut last_resource_check = 0i64;
        let mut last_gc = now_secs() - now_secs().rem_euclid(GC_INTERVAL_SECS);
        let mut cpu_ewma = 0.0f64;
        let mut last_db_usage = 0u8;
        let mut last_log_usage = 0u8;
        let mut config_mtime = self.config_mtime();

        let same_device = {
            let cfg = self.config.load();
            // Advisory; when the answer is unavailable both paths get probed.
            self.probe
                .same_device(&cfg.database.path, &cfg.files.log)
                .unwrap_or(false)
        };

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(self.tick) => {}
            }

            let now = now_secs();
            let cfg = self.config.load_full();

            let interval = cfg.dns.rate_limit.interval as i64;
            if interval > 0 && now - last_rate_reset >= interval {
                last_rate_reset = now;
                self.core.reset_rate_limits(now);
            }

            if self.cancel.is_cancelled() {
                break;
            }

            if let Some(sample) = self.probe.cpu_busy_fraction() {
                cpu_ewma = 0.9 * cpu_ewma + 0.1 * sample;
                debug!(cpu_percent = cpu_ewma * 100.0, "CPU usage sample");
            }

            if now - last_resource_check >= RESOURCE_CHECK_SECS {
                last_resource_check = now;
                self.check_load(&cfg).await;
                last_db_usage = self.check_space(&cfg, &cfg.database.path, last_db_usage).await;
                if !same_device {
                    last_log_usage = self.check_space(&cfg, &cfg.files.log, last_log_usage).await;
                }
            }

            if self.cancel.is_cancelled() {
                break;
            }

            if now - last_gc >= GC_INTERVAL_SECS {
                last_gc = now - now.rem_euclid(GC_INTERVAL_SECS);
                if let Err(e) = self.gc.execute(now, true).await {
                    warn!(error = %e, "Garbage collection failed, continuing");
                }
            }

            if self.cancel.is_cancelled() {
                break;
            }

            let mtime = self.config_mtime();
            if mtime != config_mtime {
                config_mtime = mtime;
                self.reload_config();
            }
        }

        info!("Housekeeper stopped");
    }

    async fn check_load(&self, cfg: &Config) {
        if !cfg.misc.check.load {
            return;
        }
        let Some(load) = self.probe.loadavg() else { return };
        let nprocs = self.probe.nprocs();
        if load[2] > nprocs as f64 {
            let message = format!(
                "long-term load ({:.1}) larger than number of processors ({nprocs})",
                load[2]
            );
            warn!("{message}");
            if let Err(e) = self.history.log_message("load", &message).await {
                debug!(error = %e, "Could not record load message");
            }
        }
    }

    /// Returns the current usage so repeat warnings only fire while usage
    /// keeps growing.
    async fn check_space(&self, cfg: &Config, path: &str, last_usage: u8) -> u8 {
        if cfg.misc.check.disk == 0 {
            return 0;
        }
        let Some(usage) = self.probe.disk_usage_percent(path) else {
            return last_usage;
        };
        if usage > cfg.misc.check.disk && usage > last_usage && usage <= 100 {
            let message = format!("partition holding {path} is {usage}% full");
            warn!("{message}");
            if let Err(e) = self.history.log_message("disk", &message).await {
                debug!(error = %e, "Could not record disk message");
            }
        }
        usage
    }

    fn config_mtime(&self) -> Option<SystemTime> {
        let path = self.config_path.as_ref()?;
        std::fs::metadata(path).and_then(|m| m.modified()).ok()
    }

    fn reload_config(&self) {
        let Some(path) = self.config_path.as_ref() else { return };
        let path = path.to_string_lossy();
        info!(config = %path, "Config file changed on disk, reloading");

        let fresh = match Config::from_file(&path) {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!(error = %e, "Ignoring config change, file does not parse");
                return;
            }
        };
        if let Err(e) = fresh.validate() {
            warn!(error = %e, "Ignoring config change, validation failed");
            return;
        }

        let current = self.config.load();
        if current.restart_required(&fresh) {
            warn!("Config change touches restart-only keys; restart to apply them fully");
        }
        self.config.store(Arc::new(fresh));
        info!("Config reloaded");
    }
}

fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
