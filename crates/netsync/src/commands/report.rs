//! Rendering of sync outcomes, shared by every mutating command.

use std::fmt::Write as _;

use tabled::Tabled;

use netsync_core::{ExecutionReport, OpOutcome, SyncOutcome};

use crate::cli::{GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct OutcomeRow {
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Changes")]
    detail: String,
}

fn row(outcome: &OpOutcome, color: bool) -> OutcomeRow {
    let status = match outcome.status {
        netsync_core::OpStatus::Failed { ref error } => {
            format!("{}: {error}", output::paint_status("failed", color))
        }
        ref other => output::paint_status(other.label(), color),
    };
    OutcomeRow {
        key: outcome.key.to_string(),
        action: output::paint_action(&outcome.action.to_string(), color),
        status,
        detail: outcome.detail.join("\n"),
    }
}

fn plain_line(outcome: &OpOutcome) -> String {
    format!("{}\t{}\t{}", outcome.action, outcome.key, outcome.status.label())
}

// ── Summary ─────────────────────────────────────────────────────────

fn summary(report: &ExecutionReport) -> String {
    let c = report.counts();
    let mut line = format!(
        "{} to create, {} to update, {} to delete, {} unchanged",
        c.create, c.update, c.delete, c.unchanged
    );
    if report.dry_run {
        line.push_str(" (dry run, nothing changed)");
    } else {
        let _ = write!(
            line,
            "; {} applied, {} failed, {} skipped",
            c.applied, c.failed, c.skipped
        );
    }
    line
}

// ── Entry point ─────────────────────────────────────────────────────

/// Print the outcome, then turn operation failures into an error so the
/// exit status reflects them.
pub fn render(outcome: &SyncOutcome, global: &GlobalOpts) -> Result<(), CliError> {
    let report = &outcome.report;
    let color = output::should_color(global.color);

    let out = match global.output {
        OutputFormat::Table => {
            let mut text = String::new();
            if !report.outcomes.is_empty() {
                let rows: Vec<OutcomeRow> =
                    report.outcomes.iter().map(|o| row(o, color)).collect();
                text.push_str(&output::render_table(&rows));
                text.push('\n');
            }
            if !outcome.tags_created.is_empty() {
                let _ = writeln!(text, "created tags: {}", outcome.tags_created.join(", "));
            }
            text.push_str(&summary(report));
            text
        }
        OutputFormat::Plain => report
            .outcomes
            .iter()
            .map(plain_line)
            .collect::<Vec<_>>()
            .join("\n"),
        _ => output::render_single(global.output, outcome, |_| String::new(), |_| String::new())?,
    };
    output::print_output(&out, global.quiet);

    if !global.quiet {
        for warning in &report.warnings {
            eprintln!("warning: {warning}");
        }
    }

    if report.has_failures() {
        return Err(CliError::OperationsFailed {
            failed: report.failures().count(),
            total: report.outcomes.len(),
        });
    }
    if !report.is_complete() {
        return Err(CliError::Cancelled {
            skipped: report.skipped(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use netsync_core::{Action, NaturalKey, OpStatus};

    use super::*;

    fn report(dry_run: bool, status: OpStatus) -> ExecutionReport {
        ExecutionReport {
            dry_run,
            outcomes: vec![OpOutcome {
                key: NaturalKey::device("RDEN01CR01"),
                action: Action::Update,
                status,
                detail: vec!["tags: {} -> {core-router}".into()],
            }],
            unchanged: vec![NaturalKey::device("RDEN01CR02")],
            warnings: Vec::new(),
        }
    }

    #[test]
    fn dry_run_summary_says_nothing_changed() {
        let text = summary(&report(true, OpStatus::Planned));
        assert_eq!(
            text,
            "0 to create, 1 to update, 0 to delete, 1 unchanged (dry run, nothing changed)"
        );
    }

    #[test]
    fn live_summary_counts_results() {
        let text = summary(&report(
            false,
            OpStatus::Failed {
                error: "400".into(),
            },
        ));
        assert!(text.ends_with("; 0 applied, 1 failed, 0 skipped"));
    }

    #[test]
    fn interrupted_run_is_not_a_success() {
        use clap::Parser;

        let global = crate::cli::Cli::try_parse_from(["netsync", "-q", "decode", "x"])
            .unwrap()
            .global;
        let outcome = SyncOutcome {
            scope: vec!["den".into()],
            elections: Vec::new(),
            plan: netsync_core::ReconciliationPlan::default(),
            report: report(false, OpStatus::Skipped),
            tags_created: Vec::new(),
        };

        let err = render(&outcome, &global).unwrap_err();
        assert!(matches!(err, CliError::Cancelled { skipped: 1 }));
        assert_ne!(err.exit_code(), 0);
    }

    #[test]
    fn plain_line_is_tab_separated() {
        let r = report(true, OpStatus::Planned);
        assert_eq!(plain_line(&r.outcomes[0]), "update\tRDEN01CR01\tplanned");
    }
}
