// crates/trellis-publish/src/scheduler.rs
//
// Publication scheduler: republishes own identities that need an insert.
//
// After a startup delay the scheduler runs one cycle per period. A cycle
// walks every own identity needing an insert, snapshots it under the graph
// lock, publishes with no lock held and records the result. Failures are
// logged and retried on the next cycle. At most one insert is in flight.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use trellis_core::error::TrellisError;
use trellis_core::identity::IdentityId;
use trellis_core::traits::ContentNetwork;
use trellis_graph::TrustGraph;

use crate::shutdown::Shutdown;
use crate::state::InsertState;

/// Let the node start up before the first cycle.
pub const DEFAULT_STARTUP_DELAY: Duration = Duration::from_secs(30);
/// Time between cycles.
pub const DEFAULT_PERIOD: Duration = Duration::from_secs(30 * 60);

/// When the scheduler runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublishSchedule {
    /// Wait before the first cycle.
    pub startup_delay: Duration,
    /// Wait between the end of one cycle and the start of the next.
    pub period: Duration,
}

impl Default for PublishSchedule {
    fn default() -> Self {
        Self {
            startup_delay: DEFAULT_STARTUP_DELAY,
            period: DEFAULT_PERIOD,
        }
    }
}

/// Outcome counts of one cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Inserts started, successful or not.
    pub attempted: usize,
    pub published: usize,
    pub failed: usize,
}

/// Background task that inserts own identities needing publication.
pub struct PublicationScheduler {
    graph: Arc<TrustGraph>,
    network: Arc<dyn ContentNetwork>,
    schedule: PublishSchedule,
    /// Identity whose insert is in flight.
    inserting: Mutex<Option<IdentityId>>,
}

impl PublicationScheduler {
    pub fn new(
        graph: Arc<TrustGraph>,
        network: Arc<dyn ContentNetwork>,
        schedule: PublishSchedule,
    ) -> Self {
        Self {
            graph,
            network,
            schedule,
            inserting: Mutex::new(None),
        }
    }

    /// Run cycles until `shutdown` triggers. Shutdown is honoured during
    /// waits and between cycles. A cycle that has started runs to the end.
    pub async fn run(&self, mut shutdown: Shutdown) {
        tracing::info!(
            "Publication scheduler started (startup delay {:?}, period {:?})",
            self.schedule.startup_delay,
            self.schedule.period
        );

        if shutdown.sleep(self.schedule.startup_delay).await {
            loop {
                let report = self.cycle().await;
                if report.attempted > 0 {
                    tracing::info!(
                        "Publication cycle: {} attempted, {} published, {} failed",
                        report.attempted,
                        report.published,
                        report.failed
                    );
                }
                if !shutdown.sleep(self.schedule.period).await {
                    break;
                }
            }
        }

        tracing::info!("Publication scheduler received shutdown signal");
    }

    /// Run a single cycle now.
    pub async fn run_cycle(&self) -> CycleReport {
        self.cycle().await
    }

    /// Publication state of an own identity.
    pub fn status(&self, id: &IdentityId) -> Result<InsertState, TrellisError> {
        let own = self.graph.own_identity(id)?;
        let inserting = self
            .inserting
            .lock()
            .map(|current| current.as_ref() == Some(id))
            .unwrap_or(false);
        Ok(InsertState::derive(own.needs_insert(), inserting))
    }

    async fn cycle(&self) -> CycleReport {
        let mut report = CycleReport::default();
        let due = match self.graph.pending_inserts() {
            Ok(due) => due,
            Err(e) => {
                tracing::error!("Failed to list identities needing an insert: {}", e);
                return report;
            }
        };

        for id in due {
            match self.insert(&id).await {
                Ok(false) => {}
                Ok(true) => {
                    report.attempted += 1;
                    report.published += 1;
                }
                Err(e) => {
                    report.attempted += 1;
                    report.failed += 1;
                    tracing::error!("Identity insert of {} failed: {}", id, e);
                }
            }
        }
        report
    }

    /// Insert one identity. `Ok(false)` if it no longer needed an insert.
    async fn insert(&self, id: &IdentityId) -> Result<bool, TrellisError> {
        let Some(pending) = self.graph.begin_insert(id)? else {
            return Ok(false);
        };

        tracing::debug!(
            "Starting insert of {} at edition {}",
            id,
            pending.insert_uri.edition()
        );
        self.set_inserting(Some(id.clone()));
        let published = self
            .network
            .publish(&pending.insert_uri, &pending.document)
            .await;
        self.set_inserting(None);

        let edition = published?;
        self.graph.complete_insert(&pending, edition)?;
        tracing::debug!("Successful insert of {} at edition {}", id, edition);
        Ok(true)
    }

    fn set_inserting(&self, id: Option<IdentityId>) {
        if let Ok(mut current) = self.inserting.lock() {
            *current = id;
        }
    }
}
