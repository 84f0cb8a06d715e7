//! Delivery of finished change records.

use async_trait::async_trait;
use tracing::info;

use tally_roster::ChangeRecord;

/// Where the records of a finished cycle go.
///
/// Delivery failures never abort a cycle; the driver logs them and moves
/// on to the next tick.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn deliver(&self, records: &[ChangeRecord]) -> anyhow::Result<()>;
}

/// Sink that writes one structured log line per record.
#[derive(Debug, Default)]
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    async fn deliver(&self, records: &[ChangeRecord]) -> anyhow::Result<()> {
        for record in records {
            info!(
                member = %record.member.display_alias(),
                solves = ?record.new_solves,
                awards = record.new_awards.total(),
                credits = record.new_credits.len(),
                "change record"
            );
        }
        Ok(())
    }
}
