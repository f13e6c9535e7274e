// ── Sync executor ──
//
// Applies a reconciliation plan to an inventory store. Buckets run in order
// (creates, updates, deletes); inside a bucket at most `workers` operations
// are in flight. Each operation writes its result into its own slot, and a
// failed or timed-out operation never affects the others.

use std::future;
use std::time::Duration;

use futures_util::{StreamExt, stream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::ExecutorConfig;
use crate::model::{Entity, NaturalKey};
use crate::reconcile::{EntityUpdate, ReconciliationPlan};
use crate::report::{ExecutionReport, OpOutcome, OpStatus};
use crate::store::InventoryStore;

#[derive(Debug, Clone, Copy)]
enum Op<'a> {
    Create(&'a Entity),
    Update(&'a EntityUpdate),
    Delete(&'a NaturalKey),
}

impl Op<'_> {
    fn key(&self) -> &NaturalKey {
        match self {
            Self::Create(e) => e.key(),
            Self::Update(u) => &u.key,
            Self::Delete(k) => k,
        }
    }

    fn outcome(&self, status: OpStatus) -> OpOutcome {
        match self {
            Self::Create(e) => OpOutcome::create(e, status),
            Self::Update(u) => OpOutcome::update(u, status),
            Self::Delete(k) => OpOutcome::delete(k, status),
        }
    }

    async fn submit<S: InventoryStore>(&self, store: &S) -> Result<(), crate::CoreError> {
        match self {
            Self::Create(e) => store.create(e).await,
            Self::Update(u) => store.update(&u.key, &u.changes).await,
            Self::Delete(k) => store.delete(k).await,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Executor {
    config: ExecutorConfig,
}

impl Executor {
    pub fn new(config: ExecutorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Apply `plan` to `store`.
    ///
    /// With `dry_run` no mutating call is made and every operation is
    /// reported as planned. Cancelling `cancel` stops new submissions;
    /// operations already in flight finish and the rest are reported as
    /// skipped.
    pub async fn apply<S: InventoryStore>(
        &self,
        store: &S,
        plan: &ReconciliationPlan,
        dry_run: bool,
        cancel: &CancellationToken,
    ) -> ExecutionReport {
        if dry_run {
            debug!(operations = plan.operation_count(), "dry run, nothing submitted");
            return ExecutionReport::planned(plan);
        }

        let mut outcomes = Vec::with_capacity(plan.operation_count());
        let creates: Vec<Op<'_>> = plan.to_create.iter().map(Op::Create).collect();
        let updates: Vec<Op<'_>> = plan.to_update.iter().map(Op::Update).collect();
        let deletes: Vec<Op<'_>> = plan.to_delete.iter().map(Op::Delete).collect();

        for bucket in [creates, updates, deletes] {
            let statuses = self.run_bucket(store, &bucket, cancel).await;
            outcomes.extend(bucket.iter().zip(statuses).map(|(op, s)| op.outcome(s)));
        }

        ExecutionReport {
            dry_run: false,
            outcomes,
            unchanged: plan.unchanged.clone(),
            warnings: Vec::new(),
        }
    }

    async fn run_bucket<S: InventoryStore>(
        &self,
        store: &S,
        ops: &[Op<'_>],
        cancel: &CancellationToken,
    ) -> Vec<OpStatus> {
        let workers = self.config.workers.max(1);
        let timeout = self.config.op_timeout;

        let finished: Vec<(usize, OpStatus)> = stream::iter(ops.iter().enumerate())
            .take_while(|_| future::ready(!cancel.is_cancelled()))
            .map(|(slot, op)| async move { (slot, Self::run_one(store, op, timeout).await) })
            .buffer_unordered(workers)
            .collect()
            .await;

        let mut slots: Vec<Option<OpStatus>> = vec![None; ops.len()];
        for (slot, status) in finished {
            if let Some(entry) = slots.get_mut(slot) {
                *entry = Some(status);
            }
        }
        slots
            .into_iter()
            .map(|s| s.unwrap_or(OpStatus::Skipped))
            .collect()
    }

    async fn run_one<S: InventoryStore>(store: &S, op: &Op<'_>, timeout: Duration) -> OpStatus {
        let key = op.key();
        match tokio::time::timeout(timeout, op.submit(store)).await {
            Ok(Ok(())) => {
                info!(%key, "applied");
                OpStatus::Applied
            }
            Ok(Err(e)) => {
                warn!(%key, error = %e, "operation failed");
                OpStatus::Failed {
                    error: e.to_string(),
                }
            }
            Err(_) => {
                warn!(%key, timeout_secs = timeout.as_secs(), "operation timed out");
                OpStatus::Failed {
                    error: format!("timed out after {}s", timeout.as_secs()),
                }
            }
        }
    }
}
