use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::info;

use crate::clock::Clock;
use crate::config::Config;
use crate::fetcher::MediaFetcher;
use crate::history::{RequestHistory, HISTORY_RETENTION};
use crate::pipeline::{MediaCache, Resolver};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub cache_evicted: usize,
    pub history_evicted: usize,
}

/// Everything a Worker isolate keeps between requests.
pub struct AppState {
    pub config: Config,
    pub resolver: Resolver,
    pub cache: Arc<MediaCache>,
    pub history: Arc<RequestHistory>,
    clock: Arc<dyn Clock>,
    started_at_ms: u64,
    last_sweep_ms: AtomicU64,
}

impl AppState {
    pub fn new(config: Config, fetcher: Box<dyn MediaFetcher>, clock: Arc<dyn Clock>) -> Self {
        let cache = Arc::new(MediaCache::new(clock.clone(), config.cache_ttl));
        let history = Arc::new(RequestHistory::new(clock.clone(), HISTORY_RETENTION));
        let resolver = Resolver::new(fetcher, cache.clone(), history.clone(), clock.clone());
        let now = clock.now_ms();

        Self {
            config,
            resolver,
            cache,
            history,
            clock,
            started_at_ms: now,
            last_sweep_ms: AtomicU64::new(now),
        }
    }

    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    pub fn uptime_ms(&self) -> u64 {
        self.now_ms().saturating_sub(self.started_at_ms)
    }

    /// Evicts expired cache and history entries.
    pub fn sweep(&self) -> SweepReport {
        self.last_sweep_ms.store(self.now_ms(), Ordering::Relaxed);
        let report = SweepReport {
            cache_evicted: self.cache.sweep(),
            history_evicted: self.history.sweep(),
        };
        info!(
            cache_evicted = report.cache_evicted,
            history_evicted = report.history_evicted,
            cache_size = self.cache.len(),
            "[sweep] done"
        );
        report
    }

    /// Sweeps only when the configured interval has passed since the last sweep.
    pub fn sweep_if_due(&self) -> Option<SweepReport> {
        let elapsed = self
            .now_ms()
            .saturating_sub(self.last_sweep_ms.load(Ordering::Relaxed));
        if elapsed >= self.config.sweep_interval.as_millis() as u64 {
            Some(self.sweep())
        } else {
            None
        }
    }
}
