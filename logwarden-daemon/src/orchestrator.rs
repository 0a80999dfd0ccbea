//! Cycle orchestration -- assembly of collectors, engines and sinks.
//!
//! The [`Orchestrator`] owns every component of the daemon and runs the
//! processing cycle:
//!
//! 1. collect raw records from every collector
//! 2. normalize them into events
//! 3. tag events carrying an IPv4 address with threat-intel reputation
//! 4. store the events, per collector
//! 5. feed the correlation buffer, run anomaly and correlation rules
//! 6. store the alerts and dispatch those with a notify severity
//! 7. purge expired records every `retention_check_hours`
//!
//! Shutdown is only observed between cycles.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, TimeDelta, Utc};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use logwarden_core::config::LogwardenConfig;
use logwarden_core::error::{LogwardenError, StorageError};
use logwarden_core::metrics as m;
use logwarden_core::pipeline::{Collector, EventStore, Notifier};
use logwarden_core::types::{Alert, Event, Severity};
use logwarden_detection::{
    AnomalyDetector, CorrelationEngine, EngineConfig, FileCollector, FileCollectorConfig,
    ParserRouter, RuleLoader, RuleRegistry, SyslogUdpCollector, SyslogUdpConfig,
    extract_first_ipv4,
};
use logwarden_threat_intel::{BlocklistFetcher, HttpFetcher, IntelConfig, ThreatIntel};

use crate::sink::{JsonlStore, WebhookNotifier};

/// Summary of one processing cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Raw records collected.
    pub records: usize,
    /// Events that received a threat-intel annotation.
    pub enriched: usize,
    /// Alerts generated (anomaly + correlation).
    pub alerts: usize,
    /// Alerts successfully delivered.
    pub dispatched: usize,
    /// Records removed by retention, when it ran.
    pub purged: Option<usize>,
}

/// Storage retention settings.
#[derive(Debug, Clone)]
struct Retention {
    log_days: u32,
    alert_days: u32,
    interval: Duration,
    last_run: Instant,
}

impl Retention {
    fn due(&self, now: Instant) -> bool {
        now.duration_since(self.last_run) > self.interval
    }
}

/// Records stored before the returned instant are purged.
/// Saturates at the earliest representable time.
fn retention_cutoff(wall: DateTime<Utc>, days: u32) -> DateTime<Utc> {
    TimeDelta::try_days(i64::from(days))
        .and_then(|keep| wall.checked_sub_signed(keep))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// The daemon orchestrator.
///
/// Generic over the storage, notifier and blocklist fetcher so tests can
/// inject in-memory implementations.
pub struct Orchestrator<S, N, F = HttpFetcher> {
    collectors: Vec<Box<dyn Collector>>,
    router: ParserRouter,
    intel: Option<ThreatIntel<F>>,
    detector: AnomalyDetector,
    engine: CorrelationEngine,
    store: S,
    notifier: N,
    notify_severities: Vec<Severity>,
    storage_timeout: Duration,
    retention: Retention,
    poll_interval: Duration,
}

impl<S: EventStore, N: Notifier, F: BlocklistFetcher> Orchestrator<S, N, F> {
    /// Assemble an orchestrator from already-built parts.
    ///
    /// Collectors are added with [`with_collector`](Self::with_collector).
    pub fn new(
        config: &LogwardenConfig,
        registry: Arc<RuleRegistry>,
        store: S,
        notifier: N,
        intel: Option<ThreatIntel<F>>,
    ) -> Self {
        let engine_config = EngineConfig::from_core(&config.detection);
        let detector = AnomalyDetector::new(Arc::clone(&registry), engine_config.anomaly_threshold);
        let engine = CorrelationEngine::new(registry, &engine_config);

        Self {
            collectors: Vec::new(),
            router: ParserRouter::with_defaults(config.collector.log_format.clone()),
            intel,
            detector,
            engine,
            store,
            notifier,
            notify_severities: config.notifier.severities(),
            storage_timeout: Duration::from_secs(config.storage.timeout_secs),
            retention: Retention {
                log_days: config.storage.log_retention_days,
                alert_days: config.storage.alert_retention_days,
                interval: Duration::from_secs(config.storage.retention_check_hours.saturating_mul(3600)),
                last_run: Instant::now(),
            },
            poll_interval: Duration::from_secs(config.collector.poll_interval_secs),
        }
    }

    /// Add a collector. Collectors are polled in insertion order.
    pub fn with_collector(mut self, collector: Box<dyn Collector>) -> Self {
        self.collectors.push(collector);
        self
    }

    /// Number of registered collectors.
    pub fn collector_count(&self) -> usize {
        self.collectors.len()
    }

    /// Correlation engine, for inspection.
    pub fn engine(&self) -> &CorrelationEngine {
        &self.engine
    }

    /// Run one complete cycle.
    pub async fn run_cycle(&mut self) -> CycleReport {
        let mut report = CycleReport::default();
        let mut batch: Vec<Event> = Vec::new();

        for index in 0..self.collectors.len() {
            let (name, records) = {
                let collector = &mut self.collectors[index];
                let name = collector.name().to_owned();
                match collector.collect() {
                    Ok(records) => (name, records),
                    Err(e) => {
                        tracing::error!(collector = %name, error = %e, "collection failed, skipping collector");
                        continue;
                    }
                }
            };
            if records.is_empty() {
                continue;
            }

            report.records += records.len();
            metrics::counter!(m::RECORDS_COLLECTED_TOTAL, m::LABEL_COLLECTOR => name.clone())
                .increment(records.len() as u64);
            tracing::info!(collector = %name, count = records.len(), "records collected");

            let mut events: Vec<Event> =
                records.iter().map(|r| self.router.normalize(r)).collect();
            report.enriched += self.enrich(&mut events).await;

            if let Err(e) = self
                .bounded("store_logs", self.store.store_logs(&events, &name))
                .await
            {
                tracing::error!(collector = %name, error = %e, "failed to store logs");
            }
            batch.extend(events);
        }

        if !batch.is_empty() {
            self.engine.add_events(&batch).await;
            let mut alerts = self.detector.analyze(&batch);
            alerts.extend(self.engine.evaluate_rules().await);
            report.alerts = alerts.len();

            if !alerts.is_empty() {
                tracing::info!(count = alerts.len(), "alerts generated");
                if let Err(e) = self
                    .bounded("store_alerts", self.store.store_alerts(&alerts))
                    .await
                {
                    tracing::error!(error = %e, "failed to store alerts");
                }
                report.dispatched = self.dispatch(&alerts).await;
            }
        }

        report.purged = self.maybe_purge().await;
        metrics::counter!(m::CYCLES_COMPLETED_TOTAL).increment(1);
        report
    }

    /// Annotate events whose message carries an IPv4 address.
    ///
    /// Lookup failures leave the event unannotated; there is no retry.
    async fn enrich(&self, events: &mut [Event]) -> usize {
        let Some(intel) = &self.intel else {
            return 0;
        };

        let mut enriched = 0;
        for event in events.iter_mut() {
            let Some(ip) = extract_first_ipv4(&event.message).map(str::to_owned) else {
                continue;
            };
            match intel.check_ip(&ip).await {
                Ok(result) => {
                    event.annotate(result);
                    enriched += 1;
                }
                Err(e) => tracing::debug!(ip = %ip, error = %e, "threat intel lookup failed"),
            }
        }
        enriched
    }

    /// Deliver alerts whose severity is in the notify list.
    async fn dispatch(&self, alerts: &[Alert]) -> usize {
        let mut delivered = 0;
        for alert in alerts
            .iter()
            .filter(|a| self.notify_severities.contains(&a.severity))
        {
            let ok = self.notifier.deliver(alert).await;
            let result = if ok { "success" } else { "failure" };
            metrics::counter!(m::ALERTS_DISPATCHED_TOTAL, m::LABEL_RESULT => result).increment(1);

            if ok {
                delivered += 1;
            } else {
                let body = serde_json::to_string(alert)
                    .unwrap_or_else(|e| format!("<unserializable alert: {e}>"));
                tracing::error!(alert_id = %alert.id, alert = %body, "alert dispatch failed");
            }
        }
        delivered
    }

    async fn maybe_purge(&mut self) -> Option<usize> {
        let now = Instant::now();
        if !self.retention.due(now) {
            return None;
        }
        self.retention.last_run = now;

        tracing::info!("running data retention check");
        let wall = Utc::now();
        let log_cutoff = retention_cutoff(wall, self.retention.log_days);
        let alert_cutoff = retention_cutoff(wall, self.retention.alert_days);
        match self
            .bounded(
                "purge_older_than",
                self.store.purge_older_than(log_cutoff, alert_cutoff),
            )
            .await
        {
            Ok(removed) => Some(removed),
            Err(e) => {
                tracing::error!(error = %e, "retention purge failed");
                None
            }
        }
    }

    /// Bound a storage call by `storage.timeout_secs`.
    async fn bounded<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = Result<T, LogwardenError>>,
    ) -> Result<T, LogwardenError> {
        match tokio::time::timeout(self.storage_timeout, call).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(operation, "storage call timed out");
                Err(StorageError::Timeout {
                    secs: self.storage_timeout.as_secs(),
                }
                .into())
            }
        }
    }

    /// Repeat [`run_cycle`](Self::run_cycle) every `poll_interval_secs`
    /// until `cancel` fires or SIGINT/SIGTERM arrives.
    pub async fn run(&mut self, cancel: CancellationToken) -> Result<()> {
        let signal_cancel = cancel.clone();
        let signals = tokio::spawn(async move {
            match wait_for_shutdown_signal().await {
                Ok(signal) => tracing::info!(signal, "shutdown signal received"),
                Err(e) => tracing::error!(error = %e, "signal handler failed"),
            }
            signal_cancel.cancel();
        });

        tracing::info!(
            collectors = self.collectors.len(),
            poll_interval_secs = self.poll_interval.as_secs(),
            "entering main loop"
        );

        while !cancel.is_cancelled() {
            let report = self.run_cycle().await;
            tracing::debug!(?report, "cycle completed");

            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {}
                _ = cancel.cancelled() => {}
            }
        }

        signals.abort();
        self.shutdown().await;
        Ok(())
    }

    /// Persist state that outlives the process.
    pub async fn shutdown(&self) {
        if let Some(intel) = &self.intel {
            if let Err(e) = intel.flush().await {
                tracing::warn!(error = %e, "failed to flush threat intel cache");
            }
        }
        tracing::info!("orchestrator stopped");
    }
}

impl Orchestrator<JsonlStore, WebhookNotifier, HttpFetcher> {
    /// Build the production orchestrator from a validated configuration.
    ///
    /// Fails when rules cannot be loaded, the storage directory cannot be
    /// created, the syslog socket cannot be bound or the notifier config
    /// is invalid.
    pub async fn build_from_config(
        config: &LogwardenConfig,
        cancel: CancellationToken,
    ) -> Result<Self> {
        let engine_config = EngineConfig::from_core(&config.detection);
        engine_config
            .validate()
            .map_err(|e| anyhow::anyhow!("invalid detection config: {}", e))?;

        let extra_rules = if config.detection.rule_dir.is_empty() {
            Vec::new()
        } else {
            RuleLoader::load_directory(&config.detection.rule_dir)
                .await
                .map_err(|e| anyhow::anyhow!("failed to load rules: {}", e))?
        };
        let registry = Arc::new(
            RuleRegistry::standard(&engine_config, extra_rules)
                .map_err(|e| anyhow::anyhow!("failed to build rule registry: {}", e))?,
        );
        tracing::info!(rules = registry.len(), "rule registry built");

        let intel = if config.threat_intel.enabled {
            let intel_config = IntelConfig::from_core(&config.threat_intel, &config.general);
            Some(
                ThreatIntel::open(&intel_config)
                    .await
                    .map_err(|e| anyhow::anyhow!("failed to open threat intel: {}", e))?,
            )
        } else {
            tracing::info!("threat intel disabled");
            None
        };

        let store = JsonlStore::open(config.general.resolve(&config.storage.dir))
            .await
            .map_err(|e| anyhow::anyhow!("failed to open event store: {}", e))?;
        let notifier = WebhookNotifier::from_config(&config.notifier)
            .map_err(|e| anyhow::anyhow!("failed to build notifier: {}", e))?;

        let mut orchestrator = Self::new(config, registry, store, notifier, intel);

        for path in &config.collector.watch_paths {
            tracing::info!(path = %path, "watching log file");
            orchestrator = orchestrator
                .with_collector(Box::new(FileCollector::new(FileCollectorConfig::new(path))));
        }

        if config.collector.syslog_enabled {
            let syslog = SyslogUdpCollector::bind(
                SyslogUdpConfig {
                    bind_addr: config.collector.syslog_bind.clone(),
                    channel_capacity: config.collector.channel_capacity,
                    format_hint: Some("syslog".to_owned()),
                    ..Default::default()
                },
                cancel,
            )
            .await
            .map_err(|e| anyhow::anyhow!("failed to start syslog collector: {}", e))?;
            orchestrator = orchestrator.with_collector(Box::new(syslog));
        }

        tracing::info!(
            collectors = orchestrator.collector_count(),
            "orchestrator initialized"
        );
        Ok(orchestrator)
    }
}

/// Wait for SIGTERM or SIGINT and return the signal name.
async fn wait_for_shutdown_signal() -> Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("failed to install SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("failed to install SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retention_due_only_after_interval() {
        let start = Instant::now();
        let retention = Retention {
            log_days: 90,
            alert_days: 365,
            interval: Duration::from_secs(3600),
            last_run: start,
        };
        assert!(!retention.due(start + Duration::from_secs(3600)));
        assert!(retention.due(start + Duration::from_secs(3601)));
    }

    #[test]
    fn retention_cutoff_saturates_for_huge_periods() {
        let wall = Utc::now();
        assert_eq!(retention_cutoff(wall, 90), wall - TimeDelta::days(90));
        assert_eq!(retention_cutoff(wall, u32::MAX), DateTime::<Utc>::MIN_UTC);
    }
}
