pub mod json;
pub mod text;
pub mod types;

pub use types::{AgingBucket, Report, ReportRecord, Statistics, TeamInfo};

use chrono::{DateTime, Utc};
use colored::Colorize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::issue::types::RawIssue;
use crate::summary::Summary;
use types::Aging;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Failed to write report file: {0}")]
    FileWrite(#[from] std::io::Error),

    #[error("Failed to encode or decode JSON report: {0}")]
    Json(#[from] serde_json::Error),
}

/// Whole days between `created` and `now`, rounded down, never negative.
pub fn age_days(created: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - created).num_days().max(0)
}

/// Merge one issue with its team and summary into a report record.
pub fn aggregate(
    issue: RawIssue,
    team: TeamInfo,
    summary: Summary,
    now: DateTime<Utc>,
    browse_base: &str,
) -> ReportRecord {
    let days_open = age_days(issue.created, now);
    ReportRecord {
        bug_url: format!("{}/browse/{}", browse_base.trim_end_matches('/'), issue.key),
        bug_key: issue.key,
        summary: issue.summary,
        status: issue.status,
        priority: issue.priority,
        aging: Aging {
            created_date: issue.created,
            days_open,
            bucket: AgingBucket::from_age_days(days_open),
        },
        last_updated: issue.updated,
        team,
        reporter: issue.reporter,
        assignee: issue.assignee,
        comments: summary,
    }
}

/// Build a Report from records: sort and tally.
///
/// Order is priority rank descending, then age descending, then key, so two
/// runs over the same data always print the same report.
pub fn build(mut records: Vec<ReportRecord>, generated_at: DateTime<Utc>) -> Report {
    records.sort_by(|a, b| {
        b.priority_rank()
            .cmp(&a.priority_rank())
            .then_with(|| b.aging.days_open.cmp(&a.aging.days_open))
            .then_with(|| a.bug_key.cmp(&b.bug_key))
    });
    let statistics = Statistics::from_records(&records);
    Report {
        generated_at,
        records,
        statistics,
    }
}

/// Write both artifacts.
///
/// Both documents are rendered, then written next to their targets as
/// `.tmp` files, and only renamed into place once both writes succeeded.
/// A failed write removes the temporaries and leaves the targets untouched.
#[instrument(skip(report), fields(records = report.records.len()))]
pub fn output(report: &Report, json_path: &Path, text_path: &Path) -> Result<(), ReportError> {
    let json_doc = json::render_json(&report.records)?;
    let text_doc = text::render_text(report);

    let json_tmp = temp_path(json_path);
    let text_tmp = temp_path(text_path);
    let staged = std::fs::write(&json_tmp, &json_doc)
        .and_then(|_| std::fs::write(&text_tmp, &text_doc));
    if let Err(e) = staged {
        std::fs::remove_file(&json_tmp).ok();
        std::fs::remove_file(&text_tmp).ok();
        return Err(e.into());
    }

    debug!(path = %json_path.display(), bytes = json_doc.len(), "writing JSON report");
    std::fs::rename(&json_tmp, json_path)?;
    debug!(path = %text_path.display(), bytes = text_doc.len(), "writing text report");
    std::fs::rename(&text_tmp, text_path)?;
    Ok(())
}

/// `report.json` -> `report.json.tmp`, in the same directory.
fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Print a short coloured run summary to the terminal.
pub fn print_terminal_summary(report: &Report, json_path: &Path, text_path: &Path) {
    println!();
    println!("{}", "Bug Aging Report".bold());
    println!("Total bugs: {}", report.statistics.total.to_string().bold());
    for bucket in AgingBucket::ALL {
        println!(
            "  {} ({}): {}",
            colorize_bucket(bucket),
            bucket.range_label(),
            report.statistics.count(bucket)
        );
    }
    println!();
    println!("JSON report: {}", json_path.display());
    println!("Text report: {}", text_path.display());
    println!();
}

/// Helper to colorize a bucket name for terminal output.
fn colorize_bucket(bucket: AgingBucket) -> colored::ColoredString {
    let label = bucket.to_string();
    match bucket {
        AgingBucket::Critical => label.red().bold(),
        AgingBucket::Aging => label.yellow().bold(),
        AgingBucket::Active => label.cyan(),
        AgingBucket::Recent => label.green(),
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::issue::types::Person;
    use chrono::{Duration, TimeZone};

    pub fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 10, 16, 12, 0, 0).unwrap()
    }

    pub fn raw_issue(key: &str, priority: &str, days_old: i64) -> RawIssue {
        RawIssue {
            key: key.to_string(),
            summary: format!("Summary of {key}"),
            status: "Open".to_string(),
            priority: priority.to_string(),
            created: now() - Duration::days(days_old),
            updated: None,
            assignee: Some(Person {
                name: "Dana Ruiz".to_string(),
                email: None,
            }),
            reporter: None,
            components: vec!["Checkout".to_string()],
            labels: vec!["qa_automation".to_string()],
            custom_fields: Default::default(),
        }
    }

    pub fn record(key: &str, priority: &str, days_old: i64) -> ReportRecord {
        aggregate(
            raw_issue(key, priority, days_old),
            TeamInfo::Fallback {
                components: vec!["Checkout".to_string()],
                labels: vec![],
            },
            Summary::no_discussion(),
            now(),
            "https://jira.example.com",
        )
    }

    #[test]
    fn test_age_days_rounds_down() {
        let created = now() - Duration::days(3) - Duration::hours(23);
        assert_eq!(age_days(created, now()), 3);
    }

    #[test]
    fn test_age_days_future_created_is_zero() {
        assert_eq!(age_days(now() + Duration::hours(5), now()), 0);
    }

    #[test]
    fn test_aggregate_bucket_boundaries() {
        let expected = [
            (7, AgingBucket::Recent),
            (8, AgingBucket::Active),
            (30, AgingBucket::Active),
            (31, AgingBucket::Aging),
            (90, AgingBucket::Aging),
            (91, AgingBucket::Critical),
        ];
        for (days, bucket) in expected {
            let r = record("QA-1", "High", days);
            assert_eq!(r.aging.days_open, days);
            assert_eq!(r.aging.bucket, bucket, "day {days}");
        }
    }

    #[test]
    fn test_aggregate_builds_url() {
        let r = aggregate(
            raw_issue("QA-9", "Low", 1),
            TeamInfo::Fallback {
                components: vec![],
                labels: vec![],
            },
            Summary::no_discussion(),
            now(),
            "https://jira.example.com/",
        );
        assert_eq!(r.bug_url, "https://jira.example.com/browse/QA-9");
        assert_eq!(r.bug_key, "QA-9");
    }

    #[test]
    fn test_build_sorts_by_priority_then_age() {
        let records = vec![
            record("QA-1", "Low", 100),
            record("QA-2", "High", 5),
            record("QA-3", "Blocker", 400),
            record("QA-4", "High", 50),
            record("QA-5", "Highest", 1),
            record("QA-6", "High", 50),
        ];
        let report = build(records, now());
        let keys: Vec<&str> = report.records.iter().map(|r| r.bug_key.as_str()).collect();
        assert_eq!(keys, vec!["QA-5", "QA-4", "QA-6", "QA-2", "QA-1", "QA-3"]);
    }

    #[test]
    fn test_statistics_sum_to_record_count() {
        let records: Vec<ReportRecord> = [0, 7, 8, 30, 31, 90, 91, 365]
            .iter()
            .enumerate()
            .map(|(i, d)| record(&format!("QA-{i}"), "Medium", *d))
            .collect();
        let report = build(records, now());
        let stats = report.statistics;
        let sum: usize = AgingBucket::ALL.iter().map(|b| stats.count(*b)).sum();
        assert_eq!(sum, report.records.len());
        assert_eq!(stats.total, 8);
        assert_eq!(stats.recent, 2);
        assert_eq!(stats.active, 2);
        assert_eq!(stats.aging, 2);
        assert_eq!(stats.critical, 2);
    }

    #[test]
    fn test_build_empty() {
        let report = build(vec![], now());
        assert!(report.records.is_empty());
        assert_eq!(report.statistics, Statistics::default());
    }

    #[test]
    fn test_output_writes_both_files() {
        let report = build(vec![record("QA-1", "High", 3)], now());
        let dir = std::env::temp_dir();
        let json_path = dir.join("bug_report_test_output.json");
        let text_path = dir.join("bug_report_test_output.txt");
        output(&report, &json_path, &text_path).unwrap();

        let json_doc = std::fs::read_to_string(&json_path).unwrap();
        let text_doc = std::fs::read_to_string(&text_path).unwrap();
        assert!(json_doc.contains("\"bug_key\": \"QA-1\""));
        assert!(text_doc.contains("QA-1"));

        std::fs::remove_file(&json_path).ok();
        std::fs::remove_file(&text_path).ok();
    }

    #[test]
    fn test_output_failure_leaves_no_partial_files() {
        let report = build(vec![record("QA-1", "High", 3)], now());
        let dir = std::env::temp_dir();
        let json_path = dir.join("bug_report_test_partial.json");
        let text_path = dir.join("bug_report_no_such_dir").join("report.txt");
        std::fs::remove_file(&json_path).ok();

        let result = output(&report, &json_path, &text_path);
        assert!(matches!(result, Err(ReportError::FileWrite(_))));
        assert!(!json_path.exists());
        assert!(!temp_path(&json_path).exists());
        assert!(!text_path.exists());
    }

    #[test]
    fn test_temp_path_is_a_sibling() {
        let tmp = temp_path(Path::new("out/bug_report.json"));
        assert_eq!(tmp, Path::new("out/bug_report.json.tmp"));
    }

    #[test]
    fn test_terminal_summary_does_not_panic() {
        let report = build(vec![record("QA-1", "High", 3)], now());
        print_terminal_summary(&report, Path::new("a.json"), Path::new("a.txt"));
    }
}
