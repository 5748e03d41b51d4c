//! Run report: console summary and JSON document

use crate::error::{Result, RunError};
use crate::scheduler::ScheduleSummary;
use chrono::{DateTime, Utc};
use colored::*;
use serde::Serialize;
use std::path::Path;
use surge_core::{
    CheckCategory, CheckTally, DegradationReport, IterationCounts, OperationSummary, ThresholdStatus, Verdict,
};

/// Everything known about a finished run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub profile: String,
    pub description: String,
    pub environment: String,
    pub base_url: String,
    pub executor: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub schedule: ScheduleSummary,
    pub iterations: IterationCounts,
    pub operations: Vec<OperationSummary>,
    pub checks: CheckTally,
    pub verdict: Verdict,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degradation: Option<DegradationReport>,
    pub token_refreshes: u64,
    /// Status of the teardown logout, 0 when it failed in transport
    pub logout_status: u16,
}

impl RunReport {
    /// Compliant SLA verdict and no drift
    pub fn passed(&self) -> bool {
        self.verdict.compliant && !self.degradation.as_ref().is_some_and(|d| d.drift_detected)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = self.to_json()?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| RunError::ReportIo {
                path: parent.display().to_string(),
                source,
            })?;
        }
        std::fs::write(path, json).map_err(|source| RunError::ReportIo {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn print_console(&self) {
        println!();
        println!(
            "{} {} against {} ({})",
            "Run".bright_cyan().bold(),
            self.profile.bold(),
            self.environment.bold(),
            self.base_url
        );
        println!(
            "  {} → {}  {}",
            self.started_at.format("%Y-%m-%d %H:%M:%S"),
            self.finished_at.format("%H:%M:%S"),
            self.executor.dimmed()
        );
        if let Some(ref reason) = self.schedule.stopped_early {
            print_warning(&format!("Run stopped early ({})", reason));
        }

        let it = &self.iterations;
        println!(
            "  iterations: {} started, {} completed, {} failed, {} dropped, {} abandoned",
            it.started, it.completed, it.failed, it.dropped, it.abandoned
        );
        println!(
            "  workers: {} allocated, {} peak busy, {} token refreshes",
            self.schedule.workers_allocated, self.schedule.peak_busy_workers, self.token_refreshes
        );

        self.print_operations();
        self.print_checks();
        self.print_thresholds();
        if let Some(ref degradation) = self.degradation {
            print_degradation(degradation);
        }

        println!();
        if self.passed() {
            println!("{} {}", "✓".bright_green().bold(), "SLA compliant".bright_green().bold());
        } else {
            println!("{} {}", "✗".bright_red().bold(), "SLA NOT compliant".bright_red().bold());
        }
    }

    fn print_operations(&self) {
        let headers = ["operation", "count", "errors", "p50 ms", "p95 ms", "p99 ms", "max ms"];
        let rows: Vec<Vec<String>> = self
            .operations
            .iter()
            .map(|op| {
                vec![
                    op.operation.to_string(),
                    op.count.to_string(),
                    op.errors.to_string(),
                    format!("{:.1}", op.p50_ms),
                    format!("{:.1}", op.p95_ms),
                    format!("{:.1}", op.p99_ms),
                    format!("{:.1}", op.max_ms),
                ]
            })
            .collect();
        println!();
        print_table(&headers, &rows);
    }

    fn print_checks(&self) {
        if self.checks.is_empty() {
            return;
        }
        println!();
        println!("{}", "Checks".bright_cyan().bold());
        for category in CheckCategory::ALL {
            let tally = self.checks.category(category);
            if tally.total() == 0 {
                continue;
            }
            let line = format!(
                "  {:<14} {:>6.2}%  ({} passed, {} failed)",
                category.as_str(),
                tally.pass_rate() * 100.0,
                tally.passed,
                tally.failed
            );
            if tally.failed == 0 {
                println!("{}", line);
            } else {
                println!("{}", line.bright_yellow());
            }
        }
    }

    fn print_thresholds(&self) {
        let v = &self.verdict;
        println!();
        println!("{}", "Thresholds".bright_cyan().bold());
        for result in &v.thresholds {
            let observed = result
                .observed_ms
                .map(|ms| format!("{:.1} ms", ms))
                .unwrap_or_else(|| "no data".to_string());
            let label = format!(
                "{} p{} < {} ms: {} ({} samples)",
                result.operation, result.percentile, result.max_ms, observed, result.samples
            );
            match result.status {
                ThresholdStatus::Pass => println!("  {} {}", "✓".bright_green(), label),
                ThresholdStatus::Fail | ThresholdStatus::NoData => {
                    println!("  {} {}", "✗".bright_red(), label.bright_red())
                }
            }
        }

        let label = format!(
            "error rate {:.3}% ≤ {:.3}% ({} of {} business calls)",
            v.error_rate * 100.0,
            v.max_error_rate * 100.0,
            v.business_errors,
            v.business_calls
        );
        if v.error_rate_ok {
            println!("  {} {}", "✓".bright_green(), label);
        } else {
            println!("  {} {}", "✗".bright_red(), label.bright_red());
        }

        for divergence in &v.divergences {
            let configured = divergence
                .configured_ms
                .map(|ms| format!("{} ms", ms))
                .unwrap_or_else(|| "unregistered".to_string());
            print_warning(&format!(
                "{} ceiling {} differs from published {} ms",
                divergence.operation, configured, divergence.documented_ms
            ));
        }
    }
}

fn print_degradation(report: &DegradationReport) {
    println!();
    println!(
        "{} ({} buckets of {}s)",
        "Degradation".bright_cyan().bold(),
        report.buckets.len(),
        report.bucket_width_secs
    );
    if !report.judged {
        println!("  {}", "too few buckets to judge trends".dimmed());
    }
    for trend in &report.trends {
        let limit = trend.limit.map(|l| format!(" (limit {:.3})", l)).unwrap_or_default();
        let line = format!(
            "  {:<22} slope {:>9.3}/bucket, {:>5.1}% rising{}",
            trend.series,
            trend.slope,
            trend.monotonic_fraction * 100.0,
            limit
        );
        if trend.drifting {
            println!("{}", line.bright_red());
        } else {
            println!("{}", line);
        }
    }
    if report.drift_detected {
        print_warning("Performance drift detected");
    }
}

fn print_warning(message: &str) {
    println!("{} {}", "⚠".bright_yellow().bold(), message.bright_yellow());
}

fn print_table(headers: &[&str], rows: &[Vec<String>]) {
    if rows.is_empty() {
        println!("{} {}", "ℹ".bright_blue().bold(), "No requests recorded");
        return;
    }

    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(cell.len());
            }
        }
    }

    let separator = |left: &str, mid: &str, right: &str| {
        let inner: Vec<String> = widths.iter().map(|w| "─".repeat(w + 2)).collect();
        println!("{}{}{}", left, inner.join(mid), right);
    };

    separator("┌", "┬", "┐");
    print!("│");
    for (i, header) in headers.iter().enumerate() {
        print!(" {:width$} │", header.bright_cyan().bold(), width = widths[i]);
    }
    println!();
    separator("├", "┼", "┤");
    for row in rows {
        print!("│");
        for (i, cell) in row.iter().enumerate() {
            let width = widths.get(i).copied().unwrap_or(0);
            if i == 0 {
                print!(" {:<width$} │", cell, width = width);
            } else {
                print!(" {:>width$} │", cell, width = width);
            }
        }
        println!();
    }
    separator("└", "┴", "┘");
}

#[cfg(test)]
mod tests {
    use super::*;
    use surge_config::ThresholdTable;
    use surge_core::{MetricsRegistry, ThresholdEvaluator};

    fn report() -> RunReport {
        let registry = MetricsRegistry::new().unwrap();
        let verdict = ThresholdEvaluator::new(ThresholdTable::default()).evaluate(&registry);
        RunReport {
            profile: "smoke".to_string(),
            description: String::new(),
            environment: "local".to_string(),
            base_url: "http://localhost:8080/".to_string(),
            executor: "constant-rate".to_string(),
            started_at: Utc::now(),
            finished_at: Utc::now(),
            schedule: ScheduleSummary::default(),
            iterations: registry.iterations(),
            operations: registry.summaries(),
            checks: registry.checks(),
            verdict,
            degradation: None,
            token_refreshes: 0,
            logout_status: 200,
        }
    }

    #[test]
    fn test_json_uses_camel_case() {
        let json: serde_json::Value = serde_json::from_str(&report().to_json().unwrap()).unwrap();
        assert_eq!(json["profile"], "smoke");
        assert!(json.get("baseUrl").is_some());
        assert!(json.get("tokenRefreshes").is_some());
        assert!(json.get("degradation").is_none());
    }

    #[test]
    fn test_write_json_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports").join("run.json");
        report().write_json(&path).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("\"verdict\""));
    }

    #[test]
    fn test_drift_fails_report() {
        let mut report = report();
        report.verdict.compliant = true;
        assert!(report.passed());

        report.degradation = Some(DegradationReport {
            bucket_width_secs: 60,
            buckets: Vec::new(),
            trends: Vec::new(),
            judged: true,
            drift_detected: true,
        });
        assert!(!report.passed());
    }
}
