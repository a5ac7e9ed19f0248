// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Terminal rendering of info snapshots and category reports.

use crossterm::style::{StyledContent, Stylize};
use sysmark_bench::metrics::format_seconds;
use sysmark_bench::{
    CategoryReport, CategoryStatus, InfoSnapshot, MetricSummary, WorkloadOutcome,
};
use sysmark_core::Category;

const RULE: &str =
    "══════════════════════════════════════════════════════════════════════════════";

fn status_text(status: CategoryStatus) -> StyledContent<String> {
    let text = status.to_string();
    match status {
        CategoryStatus::Complete => text.green(),
        CategoryStatus::PartialFailure => text.yellow(),
        CategoryStatus::Aborted => text.red(),
    }
}

fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(width.saturating_sub(1)).collect();
        out.push('…');
        out
    }
}

/// "at N unit(s): F/M trials failed (kind)" for summaries with failures.
fn failure_line(summary: &MetricSummary) -> Option<String> {
    let kind = summary.error_kind?;
    Some(format!(
        "at {} unit(s): {}/{} trials failed ({})",
        summary.unit_count,
        summary.failure_count,
        summary.trial_count(),
        kind
    ))
}

/// Print the host information gathered for `category`.
pub fn print_info(category: Category, info: &InfoSnapshot) {
    println!("╔{}╗", RULE);
    println!("║ {:<76} ║", format!("{} SYSTEM INFORMATION", category.title().to_uppercase()));
    println!("╠{}╣", RULE);
    for (key, value) in &info.labels {
        println!("║ {:<22} {:<53} ║", truncate(key, 22), truncate(value, 53));
    }
    for (key, value) in &info.facts {
        println!("║ {:<22} {:<53} ║", truncate(key, 22), format!("{:.2}", value));
    }
    println!("╚{}╝", RULE);
}

/// Print every summary of a category report.
pub fn print_report(report: &CategoryReport) {
    println!();
    println!(
        "{} results: {} ({})",
        report.category.title().bold(),
        status_text(report.status),
        format_seconds(report.total_seconds)
    );
    println!("╔═══════════════════════════╦═══════╦═════════╦═══════════════════╦═════════════╗");
    println!("║ Workload                  ║ Units ║ Kind    ║ Result            ║ Trials ok/✗ ║");
    println!("╠═══════════════════════════╬═══════╬═════════╬═══════════════════╬═════════════╣");

    for workload in &report.workloads {
        if workload.outcome == WorkloadOutcome::Skipped && workload.summaries.is_empty() {
            println!(
                "║ {:<25} ║ {:>5} ║ {:<7} ║ {:<17} ║ {:>11} ║",
                truncate(workload.workload.as_str(), 25),
                "-",
                "-",
                "skipped",
                "-"
            );
            continue;
        }
        for summary in &workload.summaries {
            println!(
                "║ {:<25} ║ {:>5} ║ {:<7} ║ {:<17} ║ {:>11} ║",
                truncate(workload.workload.as_str(), 25),
                summary.unit_count,
                summary.unit_kind.to_string(),
                truncate(&summary.headline(), 17),
                format!("{}/{}", summary.success_count, summary.failure_count)
            );
        }
    }
    println!("╚═══════════════════════════╩═══════╩═════════╩═══════════════════╩═════════════╝");

    for workload in &report.workloads {
        if let Some(speedup) = workload.scaling {
            println!("  {} scales {:.2}x over one unit", workload.workload, speedup);
        }
        for summary in &workload.summaries {
            if let (Some(latency), true) = (&summary.latency, summary.unit_count == 1) {
                println!(
                    "  {} latency p50 {} / p95 {} / p99 {}",
                    workload.workload,
                    format_seconds(latency.p50),
                    format_seconds(latency.p95),
                    format_seconds(latency.p99)
                );
            }
            if let Some(line) = failure_line(summary) {
                println!("  {} {}", workload.workload, line.red());
            }
        }
    }
}

/// One line per category after a full run.
pub fn print_overview(reports: &[CategoryReport]) {
    println!();
    println!("{}", "Complete benchmark".bold());
    for report in reports {
        println!(
            "  {:<8} {:<16} {} completed, {} failed, {} skipped in {}",
            report.category.title(),
            status_text(report.status).to_string(),
            report.count(WorkloadOutcome::Completed),
            report.count(WorkloadOutcome::Failed),
            report.count(WorkloadOutcome::Skipped),
            format_seconds(report.total_seconds)
        );
    }
}
