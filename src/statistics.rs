use crate::validator::ValidationResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GlobalStats {
    pub total_validations: u64,
    pub valid_format: u64,
    pub invalid_format: u64,
    pub disposable: u64,
    pub role_emails: u64,
    pub single_requests: u64,
    pub batch_requests: u64,
    pub rejected_requests: u64,
    pub start_time: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl GlobalStats {
    fn new() -> Self {
        let now = Utc::now();
        Self {
            total_validations: 0,
            valid_format: 0,
            invalid_format: 0,
            disposable: 0,
            role_emails: 0,
            single_requests: 0,
            batch_requests: 0,
            rejected_requests: 0,
            start_time: now,
            last_updated: now,
        }
    }
}

#[derive(Debug)]
pub enum StatEvent {
    /// One address went through the validator
    Validated {
        valid_format: bool,
        disposable: bool,
        role_email: bool,
    },
    SingleRequest,
    BatchRequest {
        size: usize,
    },
    /// Request refused before validation (bad input, auth, quota)
    RequestRejected,
    Snapshot(oneshot::Sender<GlobalStats>),
}

impl StatEvent {
    pub fn from_result(result: &ValidationResult) -> Self {
        StatEvent::Validated {
            valid_format: result.is_valid_format,
            disposable: result.is_disposable,
            role_email: result.role_email,
        }
    }
}

/// Counters kept by a background worker fed through a channel, so request
/// handlers never contend on a lock.
#[derive(Debug, Clone)]
pub struct StatisticsCollector {
    sender: mpsc::UnboundedSender<StatEvent>,
}

impl Default for StatisticsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl StatisticsCollector {
    /// Must be called from within a tokio runtime
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        tokio::spawn(Self::stats_worker(receiver));
        Self { sender }
    }

    pub fn record_event(&self, event: StatEvent) {
        if let Err(e) = self.sender.send(event) {
            log::warn!("Failed to send statistics event: {e}");
        }
    }

    pub fn record_results(&self, results: &[ValidationResult]) {
        for result in results {
            self.record_event(StatEvent::from_result(result));
        }
    }

    /// Current counters, reflecting every event recorded before this call
    pub async fn snapshot(&self) -> Option<GlobalStats> {
        let (tx, rx) = oneshot::channel();
        self.record_event(StatEvent::Snapshot(tx));
        rx.await.ok()
    }

    async fn stats_worker(mut receiver: mpsc::UnboundedReceiver<StatEvent>) {
        let mut stats = GlobalStats::new();
        while let Some(event) = receiver.recv().await {
            Self::process_event(event, &mut stats);
        }
        log::debug!(
            "Statistics worker stopped after {} validations",
            stats.total_validations
        );
    }

    fn process_event(event: StatEvent, stats: &mut GlobalStats) {
        match event {
            StatEvent::Snapshot(reply) => {
                // Receiver may have given up; nothing to do then
                let _ = reply.send(stats.clone());
                return;
            }
            StatEvent::Validated {
                valid_format,
                disposable,
                role_email,
            } => {
                stats.total_validations += 1;
                if valid_format {
                    stats.valid_format += 1;
                } else {
                    stats.invalid_format += 1;
                }
                if disposable {
                    stats.disposable += 1;
                }
                if role_email {
                    stats.role_emails += 1;
                }
            }
            StatEvent::SingleRequest => stats.single_requests += 1,
            StatEvent::BatchRequest { size } => {
                stats.batch_requests += 1;
                log::debug!("Batch request with {size} addresses");
            }
            StatEvent::RequestRejected => stats.rejected_requests += 1,
        }
        stats.last_updated = Utc::now();
    }
}
