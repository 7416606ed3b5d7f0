use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Mutex;

use super::types::{FieldMeta, IssueQuery, SearchPage};
use super::{IssueError, IssueSource};

const SAMPLE: &str = include_str!("../../tests/fixtures/sample_jira.json");

/// In-memory tracker serving a fixed field catalogue and issue list.
///
/// Backs `--mock` runs and the tests. Pages are chained by token like Jira's
/// search; here the token is just the offset of the next issue.
pub struct FixtureSource {
    fields: Vec<FieldMeta>,
    issues: Vec<serde_json::Value>,
    calls: Mutex<Vec<Vec<String>>>,
}

#[derive(Deserialize)]
struct FixtureFile {
    fields: Vec<FieldMeta>,
    issues: Vec<serde_json::Value>,
}

impl FixtureSource {
    pub fn new(fields: Vec<FieldMeta>, issues: Vec<serde_json::Value>) -> Self {
        Self {
            fields,
            issues,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// The embedded demo data set.
    pub fn sample() -> Result<Self, IssueError> {
        let file: FixtureFile = serde_json::from_str(SAMPLE)
            .map_err(|e| IssueError::SourceUnavailable(format!("bad fixture data: {e}")))?;
        Ok(Self::new(file.fields, file.issues))
    }

    #[cfg(test)]
    pub fn search_calls(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or(0)
    }

    #[cfg(test)]
    pub fn last_requested_fields(&self) -> Vec<String> {
        self.calls
            .lock()
            .ok()
            .and_then(|c| c.last().cloned())
            .unwrap_or_default()
    }
}

#[async_trait]
impl IssueSource for FixtureSource {
    async fn fields(&self) -> Result<Vec<FieldMeta>, IssueError> {
        Ok(self.fields.clone())
    }

    async fn search(&self, query: &IssueQuery, fields: &[String]) -> Result<SearchPage, IssueError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(fields.to_vec());
        }
        let start = match &query.page_token {
            None => 0,
            Some(token) => token.parse::<usize>().map_err(|_| {
                IssueError::SourceUnavailable(format!("unknown page token {token:?}"))
            })?,
        };
        let issues: Vec<serde_json::Value> = self
            .issues
            .iter()
            .skip(start)
            .take(query.page_size)
            .cloned()
            .collect();
        let end = start + issues.len();
        let is_last = end >= self.issues.len();
        Ok(SearchPage {
            issues,
            next_page_token: (!is_last).then(|| end.to_string()),
            is_last,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sample_fixture_loads() {
        let source = FixtureSource::sample().unwrap();
        let fields = source.fields().await.unwrap();
        assert!(fields.iter().any(|f| f.name == "Team"));
        let page = source.search(&IssueQuery::new("any", 100), &[]).await.unwrap();
        assert!(page.is_last);
        assert!(page.issues.len() >= 5);
    }

    #[tokio::test]
    async fn test_pages_chain_by_token() {
        let issues = (1..=3).map(|i| serde_json::json!({"key": format!("QA-{i}")})).collect();
        let source = FixtureSource::new(vec![], issues);
        let query = IssueQuery::new("any", 2);

        let first = source.search(&query, &[]).await.unwrap();
        assert_eq!(first.issues.len(), 2);
        assert!(!first.is_last);
        let token = first.next_token().unwrap().to_string();

        let second = source.search(&query.after(token), &[]).await.unwrap();
        assert_eq!(second.issues.len(), 1);
        assert_eq!(second.issues[0]["key"], "QA-3");
        assert!(second.is_last);
        assert_eq!(second.next_token(), None);
    }

    #[tokio::test]
    async fn test_pages_past_end_are_empty() {
        let source = FixtureSource::new(vec![], vec![serde_json::json!({"key": "QA-1"})]);
        let page = source.search(&IssueQuery::new("any", 10).after("5"), &[]).await.unwrap();
        assert!(page.issues.is_empty());
        assert!(page.is_last);
    }

    #[tokio::test]
    async fn test_unknown_token_is_rejected() {
        let source = FixtureSource::new(vec![], vec![]);
        let result = source.search(&IssueQuery::new("any", 10).after("bogus"), &[]).await;
        assert!(matches!(result, Err(IssueError::SourceUnavailable(_))));
    }
}
