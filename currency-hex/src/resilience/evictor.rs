//! Periodic cache eviction.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use currency_types::RateProvider;

use super::rate_service::ResilientRateService;

/// Time-to-live of each cache, measured as the eviction period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvictionSchedule {
    pub supported_currencies_ttl: Duration,
    pub currency_rates_ttl: Duration,
}

impl Default for EvictionSchedule {
    fn default() -> Self {
        Self {
            supported_currencies_ttl: Duration::from_secs(24 * 60 * 60),
            currency_rates_ttl: Duration::from_secs(60 * 60),
        }
    }
}

/// Background tasks clearing the rate caches on fixed periods, starting one
/// period after launch. Stop with [`CacheEvictor::shutdown`]; dropping the
/// handle aborts the tasks.
pub struct CacheEvictor {
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl CacheEvictor {
    /// Spawns the eviction tasks. Must be called within a Tokio runtime.
    pub fn start<P: RateProvider>(
        service: &ResilientRateService<P>,
        schedule: EvictionSchedule,
    ) -> Self {
        let (shutdown, signal) = watch::channel(false);

        let supported = service.clone();
        let rates = service.clone();
        let tasks = vec![
            spawn_periodic(
                "supported_currencies",
                schedule.supported_currencies_ttl,
                signal.clone(),
                move || supported.evict_supported_currencies(),
            ),
            spawn_periodic(
                "currency_rates",
                schedule.currency_rates_ttl,
                signal,
                move || rates.evict_currency_rates(),
            ),
        ];

        tracing::info!(
            supported_currencies_ttl = ?schedule.supported_currencies_ttl,
            currency_rates_ttl = ?schedule.currency_rates_ttl,
            "Cache evictor started"
        );

        Self { shutdown, tasks }
    }

    /// Signals the tasks to stop and waits for them.
    pub async fn shutdown(mut self) {
        let _ = self.shutdown.send(true);
        for task in self.tasks.drain(..) {
            if let Err(e) = task.await {
                tracing::warn!("Cache evictor task ended abnormally: {}", e);
            }
        }
        tracing::info!("Cache evictor stopped");
    }
}

impl Drop for CacheEvictor {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

fn spawn_periodic<F>(
    cache: &'static str,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
    evict: F,
) -> JoinHandle<()>
where
    F: Fn() + Send + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => evict(),
                _ = shutdown.changed() => {
                    tracing::debug!(cache, "Eviction task stopping");
                    break;
                }
            }
        }
    })
}
