//! Aggregation loop driving scrape cycles on a fixed interval.

use std::future::Future;
use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info};

use super::scraper::{ScrapeOutcome, Scraper};
use super::store::FeedStore;
use crate::{GatorError, Result};

/// Counters returned when the loop stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregateSummary {
    /// Cycles that ran to completion (successfully or not).
    pub cycles: u64,
    /// Cycles that returned an error.
    pub failed: u64,
}

/// Timer-driven scrape loop.
pub struct Aggregator<S> {
    scraper: Scraper<S>,
    interval: Duration,
}

impl<S: FeedStore> Aggregator<S> {
    /// Create an aggregator. `interval` must be non-zero.
    pub fn new(scraper: Scraper<S>, interval: Duration) -> Result<Self> {
        if interval.is_zero() {
            return Err(GatorError::Validation(
                "interval must be greater than zero".to_string(),
            ));
        }
        Ok(Self { scraper, interval })
    }

    /// Run forever.
    pub async fn run(&self) {
        self.run_until(std::future::pending::<()>()).await;
    }

    /// Run cycles until `shutdown` resolves.
    ///
    /// The first cycle starts immediately, then one per tick. Ticks missed
    /// while a slow cycle runs are dropped. A failing cycle is logged and the
    /// loop keeps going. Shutdown also interrupts a cycle in flight.
    pub async fn run_until<F>(&self, shutdown: F) -> AggregateSummary
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        info!(
            "Collecting feeds every {}",
            humantime::format_duration(self.interval)
        );

        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut summary = AggregateSummary::default();

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                _ = ticker.tick() => {}
            }

            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("Shutdown requested during a scrape cycle");
                    break;
                }
                result = self.scraper.scrape_once() => {
                    summary.cycles += 1;
                    match result {
                        Ok(ScrapeOutcome::Idle) => info!("No feeds registered yet"),
                        Ok(ScrapeOutcome::Scraped(report)) => info!(
                            feed_id = report.feed.id,
                            inserted = report.inserted,
                            skipped = report.skipped,
                            "Collected {}",
                            report.feed.name
                        ),
                        Err(e) => {
                            summary.failed += 1;
                            error!("Scrape cycle failed: {}", e);
                        }
                    }
                }
            }
        }

        info!(
            cycles = summary.cycles,
            failed = summary.failed,
            "Aggregator stopped"
        );
        summary
    }
}

/// Parse a duration such as `1m30s` or `10s`. Zero is rejected.
pub fn parse_interval(value: &str) -> Result<Duration> {
    let duration = humantime::parse_duration(value.trim())
        .map_err(|e| GatorError::Validation(format!("invalid interval {:?}: {}", value, e)))?;
    if duration.is_zero() {
        return Err(GatorError::Validation(
            "interval must be greater than zero".to_string(),
        ));
    }
    Ok(duration)
}
