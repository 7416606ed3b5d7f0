pub mod field;
pub mod fixture;
pub mod parse;
pub mod types;

pub use types::{CommentThread, FieldId, FieldMeta, IssueQuery, RawIssue, SearchPage};

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

/// Fields requested from the search endpoint, before the team field is added.
const BASE_FIELDS: &[&str] = &[
    "key",
    "summary",
    "status",
    "priority",
    "assignee",
    "reporter",
    "comment",
    "created",
    "updated",
    "components",
    "labels",
];

#[derive(Debug, Error)]
pub enum IssueError {
    #[error("Issue tracker unavailable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Issue tracker unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Malformed issue record {key}: {reason}")]
    MalformedIssueRecord { key: String, reason: String },

    #[error("Jira credentials not found (set JIRA_EMAIL and JIRA_API_TOKEN)")]
    MissingCredentials,
}

/// Read access to an issue tracker.
#[async_trait]
pub trait IssueSource: Send + Sync {
    /// List every field the tracker knows about.
    async fn fields(&self) -> Result<Vec<FieldMeta>, IssueError>;

    /// Fetch one page of issues matching the query, with the given fields.
    async fn search(&self, query: &IssueQuery, fields: &[String]) -> Result<SearchPage, IssueError>;
}

/// Issues that parsed cleanly plus the ones that were skipped.
#[derive(Debug, Default)]
pub struct FetchOutcome {
    pub issues: Vec<(RawIssue, CommentThread)>,
    /// (issue key, reason) for every record that could not be parsed
    pub malformed: Vec<(String, String)>,
}

/// Page through every issue matching the query, following page tokens
/// until the source reports the last page.
///
/// Transport and HTTP failures abort the whole fetch. A record that fails to
/// parse is logged and skipped.
#[instrument(skip(source, query), fields(jql = %query.jql))]
pub async fn fetch(
    source: &dyn IssueSource,
    query: &IssueQuery,
    team_field: Option<&FieldId>,
    max_issues: Option<usize>,
) -> Result<FetchOutcome, IssueError> {
    let mut fields: Vec<String> = BASE_FIELDS.iter().map(|f| f.to_string()).collect();
    if let Some(id) = team_field {
        fields.push(id.to_string());
    }

    let limit = max_issues.unwrap_or(usize::MAX);
    let mut outcome = FetchOutcome::default();
    let mut page_query = query.clone();
    let mut seen = 0usize;

    while seen < limit {
        let page = source.search(&page_query, &fields).await?;
        debug!(received = page.issues.len(), is_last = page.is_last, "received search page");
        if page.issues.is_empty() {
            break;
        }

        for raw in page.issues.iter().take(limit - seen) {
            seen += 1;
            match parse::parse_issue(raw) {
                Ok(parsed) => outcome.issues.push(parsed),
                Err(IssueError::MalformedIssueRecord { key, reason }) => {
                    warn!(key = %key, reason = %reason, "skipping malformed issue record");
                    outcome.malformed.push((key, reason));
                }
                Err(other) => return Err(other),
            }
        }

        match page.next_token() {
            Some(token) if page_query.page_token.as_deref() != Some(token) => {
                page_query = query.after(token);
            }
            _ => break,
        }
    }

    info!(
        issues = outcome.issues.len(),
        skipped = outcome.malformed.len(),
        "fetched issues"
    );
    Ok(outcome)
}

/// Jira Cloud REST (v3) client, searching through `/rest/api/3/search/jql`.
pub struct JiraClient {
    client: reqwest::Client,
    base_url: String,
    email: String,
    token: String,
}

impl JiraClient {
    pub fn new(config: &crate::config::Config) -> Result<Self, IssueError> {
        let (email, token) = config
            .jira_credentials()
            .ok_or(IssueError::MissingCredentials)?;
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent("bug-aging-report")
            .build()?;
        Ok(Self {
            client,
            base_url: config.jira.url.clone(),
            email,
            token,
        })
    }

    #[cfg(test)]
    fn with_base_url(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            email: "qa@example.com".to_string(),
            token: "token".to_string(),
        }
    }

    fn search_params(query: &IssueQuery, fields: &[String]) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("jql", query.jql.clone()),
            ("maxResults", query.page_size.to_string()),
            ("fields", fields.join(",")),
        ];
        if let Some(token) = &query.page_token {
            params.push(("nextPageToken", token.clone()));
        }
        params
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&'static str, String)],
    ) -> Result<T, IssueError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .basic_auth(&self.email, Some(&self.token))
            .header("Accept", "application/json")
            .query(params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(IssueError::SourceUnavailable(format!(
                "GET {path} returned {}: {}",
                status.as_u16(),
                body.chars().take(200).collect::<String>()
            )));
        }
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl IssueSource for JiraClient {
    async fn fields(&self) -> Result<Vec<FieldMeta>, IssueError> {
        debug!("fetching field catalogue from Jira");
        self.get_json("/rest/api/3/field", &[]).await
    }

    async fn search(&self, query: &IssueQuery, fields: &[String]) -> Result<SearchPage, IssueError> {
        debug!(continued = query.page_token.is_some(), "searching Jira");
        self.get_json("/rest/api/3/search/jql", &Self::search_params(query, fields))
            .await
    }
}
