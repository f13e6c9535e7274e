// ── Execution report ──
//
// Per-key outcome of every planned operation, plus the non-fatal warnings
// collected while building the plan.

use serde::Serialize;
use strum::Display;

use crate::model::NaturalKey;
use crate::reconcile::{EntityUpdate, ReconciliationPlan};
use crate::tags::{Ambiguity, SiteElection, Slot};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Create,
    Update,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum OpStatus {
    /// Dry run: reported, not submitted.
    Planned,
    Applied,
    Failed { error: String },
    /// Never started because the run was cancelled.
    Skipped,
}

impl OpStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Planned => "planned",
            Self::Applied => "applied",
            Self::Failed { .. } => "failed",
            Self::Skipped => "skipped",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OpOutcome {
    pub key: NaturalKey,
    pub action: Action,
    pub status: OpStatus,
    /// Human-readable delta: full fields for a create, `field: old -> new`
    /// per update, nothing for a delete.
    pub detail: Vec<String>,
}

impl OpOutcome {
    pub fn create(entity: &crate::model::Entity, status: OpStatus) -> Self {
        Self {
            key: entity.key().clone(),
            action: Action::Create,
            status,
            detail: entity
                .fields()
                .into_iter()
                .map(|(field, value)| format!("{field}: {value}"))
                .collect(),
        }
    }

    pub fn update(update: &EntityUpdate, status: OpStatus) -> Self {
        Self {
            key: update.key.clone(),
            action: Action::Update,
            status,
            detail: update.changes.iter().map(ToString::to_string).collect(),
        }
    }

    pub fn delete(key: &NaturalKey, status: OpStatus) -> Self {
        Self {
            key: key.clone(),
            action: Action::Delete,
            status,
            detail: Vec::new(),
        }
    }
}

/// Non-fatal condition surfaced alongside the outcomes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    AmbiguousElection {
        site: String,
        /// `roles` or `stp`.
        election: String,
        slot: Slot,
        claimants: Vec<String>,
    },
    MalformedInput {
        context: String,
        message: String,
    },
    ProbeFailed {
        device: String,
        message: String,
    },
    TagProvisioning {
        message: String,
    },
}

impl Warning {
    /// Ambiguity warnings for both elections of one site.
    pub fn from_election(site: &SiteElection) -> Vec<Self> {
        let flag = |election: &str, a: &Ambiguity| Self::AmbiguousElection {
            site: site.site.clone(),
            election: election.to_owned(),
            slot: a.slot,
            claimants: a.claimants.clone(),
        };
        site.roles
            .ambiguous
            .iter()
            .map(|a| flag("roles", a))
            .chain(site.stp.ambiguous.iter().map(|a| flag("stp", a)))
            .collect()
    }
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AmbiguousElection {
                site,
                election,
                slot,
                claimants,
            } => write!(
                f,
                "ambiguous {election} election at {site}: {} all claim {slot}",
                claimants.join(", ")
            ),
            Self::MalformedInput { context, message } => write!(f, "{context}: {message}"),
            Self::ProbeFailed { device, message } => write!(f, "probe of {device} failed: {message}"),
            Self::TagProvisioning { message } => write!(f, "tag provisioning failed: {message}"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counts {
    pub create: usize,
    pub update: usize,
    pub delete: usize,
    pub unchanged: usize,
    pub applied: usize,
    pub failed: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExecutionReport {
    pub dry_run: bool,
    pub outcomes: Vec<OpOutcome>,
    pub unchanged: Vec<NaturalKey>,
    pub warnings: Vec<Warning>,
}

impl ExecutionReport {
    /// Dry-run report: every planned operation, nothing submitted.
    pub fn planned(plan: &ReconciliationPlan) -> Self {
        let outcomes = plan
            .to_create
            .iter()
            .map(|e| OpOutcome::create(e, OpStatus::Planned))
            .chain(plan.to_update.iter().map(|u| OpOutcome::update(u, OpStatus::Planned)))
            .chain(plan.to_delete.iter().map(|k| OpOutcome::delete(k, OpStatus::Planned)))
            .collect();
        Self {
            dry_run: true,
            outcomes,
            unchanged: plan.unchanged.clone(),
            warnings: Vec::new(),
        }
    }

    pub fn has_failures(&self) -> bool {
        self.outcomes
            .iter()
            .any(|o| matches!(o.status, OpStatus::Failed { .. }))
    }

    /// Operations a cancelled run never submitted.
    pub fn skipped(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.status == OpStatus::Skipped)
            .count()
    }

    /// True when every planned operation was either reported (dry run) or
    /// attempted.
    pub fn is_complete(&self) -> bool {
        self.skipped() == 0
    }

    pub fn failures(&self) -> impl Iterator<Item = &OpOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, OpStatus::Failed { .. }))
    }

    pub fn counts(&self) -> Counts {
        let mut counts = Counts {
            unchanged: self.unchanged.len(),
            ..Counts::default()
        };
        for outcome in &self.outcomes {
            match outcome.action {
                Action::Create => counts.create += 1,
                Action::Update => counts.update += 1,
                Action::Delete => counts.delete += 1,
            }
            match outcome.status {
                OpStatus::Applied => counts.applied += 1,
                OpStatus::Failed { .. } => counts.failed += 1,
                OpStatus::Skipped => counts.skipped += 1,
                OpStatus::Planned => {}
            }
        }
        counts
    }
}
