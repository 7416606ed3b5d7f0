use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, instrument, warn};

use crate::issue::field::{resolve_team, resolve_team_field};
use crate::issue::{self, CommentThread, FieldId, IssueError, IssueQuery, IssueSource, RawIssue};
use crate::report::{self, Report};
use crate::summary::{SummarizationEngine, Summary, SummaryError};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Source(#[from] IssueError),
}

/// Settings for one run, already merged from file, environment and CLI.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub jql: String,
    pub page_size: usize,
    pub max_issues: Option<usize>,
    pub team_field_hint: String,
    pub concurrency: usize,
    /// Tracker base URL used to build issue links
    pub browse_base: String,
}

impl RunOptions {
    pub fn from_config(config: &crate::config::Config) -> Self {
        Self {
            jql: config.jira.jql.clone(),
            page_size: config.jira.page_size,
            max_issues: config.jira.max_issues,
            team_field_hint: config.jira.team_field_hint.clone(),
            concurrency: config.report.concurrency,
            browse_base: config.jira.url.clone(),
        }
    }
}

/// State shared by every issue of one run. Built once, read-only after.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub team_field: Option<FieldId>,
    pub now: DateTime<Utc>,
    pub browse_base: String,
}

/// A non-fatal problem met during the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    FieldResolutionAmbiguous {
        candidates: Vec<FieldId>,
        chosen: FieldId,
    },
    SummarizationUnavailable {
        key: String,
        reason: String,
    },
    MalformedIssueRecord {
        key: String,
        reason: String,
    },
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Diagnostic::FieldResolutionAmbiguous { candidates, chosen } => {
                let ids: Vec<&str> = candidates.iter().map(FieldId::as_str).collect();
                write!(f, "several team fields ({}), using {chosen}", ids.join(", "))
            }
            Diagnostic::SummarizationUnavailable { key, reason } => {
                write!(f, "{key}: summary unavailable ({reason})")
            }
            Diagnostic::MalformedIssueRecord { key, reason } => {
                write!(f, "{key}: skipped malformed record ({reason})")
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RunDiagnostics {
    pub entries: Vec<Diagnostic>,
}

impl RunDiagnostics {
    pub fn push(&mut self, diagnostic: Diagnostic) {
        warn!(%diagnostic, "non-fatal problem");
        self.entries.push(diagnostic);
    }

    /// Issues dropped from the report.
    pub fn skipped(&self) -> usize {
        self.entries
            .iter()
            .filter(|d| matches!(d, Diagnostic::MalformedIssueRecord { .. }))
            .count()
    }

    /// Issues reported with the "summary unavailable" marker.
    pub fn degraded(&self) -> usize {
        self.entries
            .iter()
            .filter(|d| matches!(d, Diagnostic::SummarizationUnavailable { .. }))
            .count()
    }
}

#[derive(Debug)]
pub struct RunOutcome {
    pub report: Report,
    pub diagnostics: RunDiagnostics,
}

/// Run the whole pipeline: resolve the team field, fetch, summarize,
/// aggregate and sort.
///
/// Only a source failure aborts; per-issue problems end up in the
/// diagnostics and the run carries on.
#[instrument(skip_all, fields(jql = %options.jql))]
pub async fn run(
    source: &dyn IssueSource,
    engine: Arc<SummarizationEngine>,
    options: &RunOptions,
    now: DateTime<Utc>,
) -> Result<RunOutcome, PipelineError> {
    let mut diagnostics = RunDiagnostics::default();

    let resolution = resolve_team_field(source, &options.team_field_hint).await;
    if let (true, Some(chosen)) = (resolution.is_ambiguous(), resolution.field.clone()) {
        diagnostics.push(Diagnostic::FieldResolutionAmbiguous {
            candidates: resolution.candidates.clone(),
            chosen,
        });
    }
    let ctx = RunContext {
        team_field: resolution.field,
        now,
        browse_base: options.browse_base.clone(),
    };

    let query = IssueQuery::new(options.jql.clone(), options.page_size);
    let fetched = issue::fetch(source, &query, ctx.team_field.as_ref(), options.max_issues).await?;
    for (key, reason) in fetched.malformed {
        diagnostics.push(Diagnostic::MalformedIssueRecord { key, reason });
    }

    let summaries = summarize_all(engine, &fetched.issues, options.concurrency).await;

    let mut records = Vec::with_capacity(fetched.issues.len());
    for ((issue, thread), outcome) in fetched.issues.into_iter().zip(summaries) {
        let summary = match outcome {
            Ok(summary) => summary,
            Err(e) => {
                diagnostics.push(Diagnostic::SummarizationUnavailable {
                    key: issue.key.clone(),
                    reason: e.to_string(),
                });
                Summary::unavailable(&thread)
            }
        };
        let team = resolve_team(&issue, ctx.team_field.as_ref());
        records.push(report::aggregate(issue, team, summary, ctx.now, &ctx.browse_base));
    }

    let report = report::build(records, ctx.now);
    info!(
        records = report.records.len(),
        skipped = diagnostics.skipped(),
        degraded = diagnostics.degraded(),
        "report assembled"
    );
    Ok(RunOutcome { report, diagnostics })
}

/// Summarize every thread with at most `concurrency` model calls in flight.
/// Results come back in input order.
///
/// Each summarization runs in its own task; a task that panics only costs
/// its own issue, which comes back as unavailable.
async fn summarize_all(
    engine: Arc<SummarizationEngine>,
    issues: &[(RawIssue, CommentThread)],
    concurrency: usize,
) -> Vec<Result<Summary, SummaryError>> {
    let permits = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut tasks = JoinSet::new();

    for (idx, (issue, thread)) in issues.iter().enumerate() {
        let engine = Arc::clone(&engine);
        let permits = Arc::clone(&permits);
        let key = issue.key.clone();
        let thread = thread.clone();
        tasks.spawn(async move {
            let _permit = permits.acquire_owned().await.ok();
            let summarized = tokio::spawn(async move { engine.summarize(&key, &thread).await });
            let outcome = summarized.await.unwrap_or_else(|e| {
                Err(SummaryError::SummarizationUnavailable(format!(
                    "summarization task failed: {e}"
                )))
            });
            (idx, outcome)
        });
    }

    let mut results: Vec<Option<Result<Summary, SummaryError>>> =
        (0..issues.len()).map(|_| None).collect();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((idx, outcome)) => results[idx] = Some(outcome),
            Err(e) => warn!(error = %e, "summarization task lost"),
        }
    }

    results
        .into_iter()
        .map(|r| {
            r.unwrap_or_else(|| {
                Err(SummaryError::SummarizationUnavailable(
                    "summarization task produced no result".to_string(),
                ))
            })
        })
        .collect()
}
