//! Human-readable run summaries.

use std::fmt::Write as _;
use std::path::Path;

use squad_core::{RunSummary, Stage, WorkItemStatus};
use squad_llm::TokenUsage;

/// Render a run summary for the terminal.
pub fn render(summary: &RunSummary, journal_dir: Option<&Path>) -> String {
    let mut out = String::new();

    match summary.stage {
        Stage::Done => {
            let _ = writeln!(out, "✅ Run {} finished: {}", summary.run_id, summary.stage);
        }
        _ => {
            let reason = summary.failure_reason.as_deref().unwrap_or("unknown reason");
            let _ = writeln!(
                out,
                "❌ Run {} finished: {} ({})",
                summary.run_id, summary.stage, reason
            );
        }
    }

    if let Some(finished) = summary.finished_at {
        let elapsed = finished - summary.started_at;
        let _ = writeln!(out, "   Duration: {}s", elapsed.num_seconds());
    }
    let _ = writeln!(out, "   Development cycles: {}", summary.cycles);

    if !summary.features.is_empty() {
        let _ = writeln!(out, "\n📋 Features");
        for feature in &summary.features {
            let _ = writeln!(out, "   - {}", feature);
        }
    }

    let count = |status: WorkItemStatus| {
        summary
            .work_items
            .iter()
            .filter(|item| item.status == status)
            .count()
    };
    let _ = writeln!(
        out,
        "\n🔧 Work items: {} succeeded, {} failed, {} cancelled",
        count(WorkItemStatus::Succeeded),
        count(WorkItemStatus::Failed),
        count(WorkItemStatus::Cancelled)
    );
    for item in &summary.work_items {
        let _ = writeln!(
            out,
            "   [{:<9}] {:<15} {} ({} attempt{})",
            item.status.as_str(),
            item.role.display_name(),
            item.description,
            item.attempts,
            if item.attempts == 1 { "" } else { "s" }
        );
    }

    let (resolved, open): (Vec<_>, Vec<_>) =
        summary.issues.iter().partition(|issue| issue.is_resolved());
    if !summary.issues.is_empty() {
        let _ = writeln!(
            out,
            "\n🔍 Integration issues: {} resolved, {} unresolved",
            resolved.len(),
            open.len()
        );
        for issue in &resolved {
            let _ = writeln!(out, "   ✓ [{}] {}", issue.stage, issue.description);
        }
        for issue in &open {
            let _ = writeln!(
                out,
                "   ✗ [{}] {} ({} failed fixes)",
                issue.stage, issue.description, issue.failed_fixes
            );
        }
    }

    if !summary.usage.is_empty() {
        let _ = writeln!(out, "\n📊 Token usage");
        let mut total = TokenUsage::default();
        for (role, usage) in &summary.usage {
            total.add(*usage);
            let _ = writeln!(
                out,
                "   {:<15} {:>8} in {:>8} out",
                role.display_name(),
                usage.input_tokens,
                usage.output_tokens
            );
        }
        let _ = writeln!(
            out,
            "   {:<15} {:>8} in {:>8} out",
            "Total", total.input_tokens, total.output_tokens
        );
    }

    if let Some(dir) = journal_dir {
        let _ = writeln!(out, "\n📂 Journal: {}", dir.display());
    }
    if summary.journal_degraded {
        let _ = writeln!(out, "⚠️  Journal incomplete: some transitions were not recorded");
    }

    out
}
