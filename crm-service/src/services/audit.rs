//! Audit recorder: durable action log, decoupled from the primary path.
//!
//! Writes are dispatched on a detached task with their own error boundary.
//! A failed audit append is logged and dropped; it never rolls back or
//! surfaces into the business operation that triggered it. The detached
//! task also keeps an already-dispatched write alive when the request that
//! triggered it is cancelled.

use service_core::async_trait::async_trait;
use service_core::error::AppError;
use std::sync::Arc;

use super::Database;
use crate::models::AuditRecord;

/// Destination for audit records.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn append(&self, record: &AuditRecord) -> Result<(), AppError>;
}

/// Sink writing to the `audit_records` table.
pub struct PgAuditSink {
    db: Database,
}

impl PgAuditSink {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AuditSink for PgAuditSink {
    async fn append(&self, record: &AuditRecord) -> Result<(), AppError> {
        self.db.insert_audit_record(record).await
    }
}

/// Fire-and-forget audit recorder.
#[derive(Clone)]
pub struct AuditRecorder {
    sink: Arc<dyn AuditSink>,
}

impl AuditRecorder {
    pub fn new(sink: Arc<dyn AuditSink>) -> Self {
        Self { sink }
    }

    /// Record an action asynchronously (non-blocking).
    pub fn record(&self, record: AuditRecord) {
        let sink = self.sink.clone();
        tokio::spawn(async move {
            if let Err(e) = sink.append(&record).await {
                tracing::error!(
                    error = %e,
                    action = %record.action,
                    resource_type = %record.resource_type,
                    "Failed to write audit record"
                );
            } else {
                tracing::debug!(
                    action = %record.action,
                    resource_type = %record.resource_type,
                    "Audit record written"
                );
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AuditAction;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use uuid::Uuid;

    struct FailingSink;

    #[async_trait]
    impl AuditSink for FailingSink {
        async fn append(&self, _record: &AuditRecord) -> Result<(), AppError> {
            Err(AppError::Database(anyhow::anyhow!("audit store is down")))
        }
    }

    struct CountingSink {
        appended: AtomicUsize,
    }

    #[async_trait]
    impl AuditSink for CountingSink {
        async fn append(&self, _record: &AuditRecord) -> Result<(), AppError> {
            self.appended.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn sample_record() -> AuditRecord {
        AuditRecord::new(
            Uuid::new_v4(),
            Some(Uuid::new_v4()),
            AuditAction::CompanyCreated,
            "company",
            Uuid::new_v4(),
            None,
        )
    }

    #[tokio::test]
    async fn sink_failure_does_not_reach_the_caller() {
        let recorder = AuditRecorder::new(Arc::new(FailingSink));

        // The triggering operation's result is computed after dispatch;
        // a failing sink must leave it untouched.
        recorder.record(sample_record());
        let business_result: Result<u16, AppError> = Ok(201);

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert_eq!(business_result.unwrap(), 201);

        // Recorder stays usable after a failure.
        recorder.record(sample_record());
    }

    #[tokio::test]
    async fn records_are_delivered_to_the_sink() {
        let sink = Arc::new(CountingSink {
            appended: AtomicUsize::new(0),
        });
        let recorder = AuditRecorder::new(sink.clone());

        recorder.record(sample_record());
        recorder.record(sample_record());

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert_eq!(sink.appended.load(Ordering::SeqCst), 2);
    }
}
