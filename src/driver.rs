//! Collector driver: the periodic probe-and-publish loop
//!
//! Targets are probed strictly one after another in configured order. Each
//! sample is published before the next target is probed, and the driver
//! sleeps for the configured interval between cycles. Every per-target
//! failure (probe or publish) is logged and the loop moves on.

use crate::{
    error::{AppError, Result},
    logging::Logger,
    models::{Config, PingReport, ProbeResult},
    prober::{ProbeOutcome, Prober},
    publisher::Publisher,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Counters for one pass over all targets
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CycleSummary {
    pub cycle: u64,
    /// Probes attempted
    pub probed: usize,
    /// Probes answered with an Echo Reply
    pub succeeded: usize,
    /// Probes that errored or got a non-reply answer
    pub failed: usize,
    /// Samples accepted by the collector
    pub published: usize,
    /// Samples the collector did not accept
    pub publish_failed: usize,
    /// Wall time of the cycle
    pub duration: Duration,
}

/// Drives the probe → publish → sleep loop.
pub struct CollectorDriver<P, U> {
    config: Arc<Config>,
    prober: Arc<P>,
    publisher: U,
    logger: Logger,
}

impl<P, U> CollectorDriver<P, U>
where
    P: Prober + 'static,
    U: Publisher,
{
    pub fn new(config: Arc<Config>, prober: P, publisher: U, logger: Logger) -> Self {
        Self {
            config,
            prober: Arc::new(prober),
            publisher,
            logger,
        }
    }

    /// Run cycles until `cancel` fires. Returns the number of cycles started.
    pub async fn run(&self, cancel: CancellationToken) -> u64 {
        let mut cycle = 0;
        loop {
            if cancel.is_cancelled() {
                break;
            }
            cycle += 1;
            self.run_cycle(cycle, &cancel).await;

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.config.interval()) => {}
            }
        }

        self.logger.info("Collector driver stopped")
            .field("cycles", cycle)
            .log()
            .await;
        cycle
    }

    /// Probe every target once and publish the results.
    pub async fn run_cycle(&self, cycle: u64, cancel: &CancellationToken) -> CycleSummary {
        let started = Instant::now();
        let correlation_id = self.logger.start_cycle(cycle, self.config.targets.len()).await;
        let mut summary = CycleSummary { cycle, ..Default::default() };

        for target in &self.config.targets {
            if cancel.is_cancelled() {
                break;
            }
            summary.probed += 1;

            let outcome = match self.probe_target(target).await {
                Ok(outcome) => outcome,
                Err(error) => {
                    summary.failed += 1;
                    self.logger.error(&format!("Ping of {} aborted: {}", target, error))
                        .error_info(&error)
                        .log()
                        .await;
                    continue;
                }
            };

            match outcome {
                Ok(result) if result.succeeded() => {
                    summary.succeeded += 1;
                    self.logger.debug(&format!("Echo reply from {}", target))
                        .probe(&result)
                        .log()
                        .await;
                    self.publish(&result, &mut summary).await;
                }
                Ok(result) => {
                    summary.failed += 1;
                    self.logger.warn(&format!("Unexpected ICMP answer from {}", target))
                        .probe(&result)
                        .log()
                        .await;
                    if self.config.publish_failures {
                        self.publish(&result, &mut summary).await;
                    }
                }
                Err(error) => {
                    summary.failed += 1;
                    self.logger.warn(&format!("Failed to ping {}: {}", target, error))
                        .probe_error(&error)
                        .log()
                        .await;
                    if self.config.publish_failures {
                        if let Some(address) = error.address() {
                            self.publish(&ProbeResult::failed(address), &mut summary).await;
                        }
                    }
                }
            }
        }

        summary.duration = started.elapsed();
        self.logger.info(&format!("Cycle {} complete", cycle))
            .field("probed", summary.probed)
            .field("succeeded", summary.succeeded)
            .field("failed", summary.failed)
            .field("published", summary.published)
            .field("publish_failed", summary.publish_failed)
            .field("duration_ms", summary.duration.as_millis() as u64)
            .log()
            .await;
        self.logger.end_cycle(&correlation_id).await;

        summary
    }

    async fn probe_target(&self, target: &str) -> Result<ProbeOutcome> {
        let prober = Arc::clone(&self.prober);
        let target = target.to_string();
        let listen_addr = self.config.listen_addr;
        tokio::task::spawn_blocking(move || prober.probe(&target, listen_addr))
            .await
            .map_err(AppError::from)
    }

    async fn publish(&self, result: &ProbeResult, summary: &mut CycleSummary) {
        let report = PingReport::from(result);
        match self.publisher.publish(&report).await {
            Ok(()) => {
                summary.published += 1;
                crate::log_debug!(self.logger, "Published sample for {}", report.ip_address);
            }
            Err(error) => {
                summary.publish_failed += 1;
                self.logger.error(&format!("Failed to publish sample for {}: {}", report.ip_address, error))
                    .error_info(&error)
                    .log()
                    .await;
            }
        }
    }
}
