use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A JQL filter plus the paging cursor for the next search request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueQuery {
    /// Tracker query (JQL). Validated by the tracker, not here.
    pub jql: String,
    /// Opaque cursor returned by the previous page; `None` for the first page
    pub page_token: Option<String>,
    /// Number of issues requested per page
    pub page_size: usize,
}

impl IssueQuery {
    pub fn new(jql: impl Into<String>, page_size: usize) -> Self {
        Self {
            jql: jql.into(),
            page_token: None,
            page_size: page_size.max(1),
        }
    }

    /// The same query continuing after the page that returned `token`.
    pub fn after(&self, token: impl Into<String>) -> Self {
        Self {
            page_token: Some(token.into()),
            ..self.clone()
        }
    }
}

/// Identifier of a tracker field (e.g. "customfield_12000").
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FieldId(pub String);

impl FieldId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for FieldId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One entry of the tracker's field catalogue.
#[derive(Debug, Clone, Deserialize)]
pub struct FieldMeta {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub custom: bool,
    #[serde(default)]
    pub schema: Option<FieldSchema>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FieldSchema {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub custom: Option<String>,
}

/// One page of search results, still in the tracker's wire shape.
///
/// Pages are chained by token: the next request carries `nextPageToken`
/// until the tracker reports `isLast`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchPage {
    #[serde(default)]
    pub issues: Vec<serde_json::Value>,
    #[serde(rename = "nextPageToken", default)]
    pub next_page_token: Option<String>,
    #[serde(rename = "isLast", default)]
    pub is_last: bool,
}

impl SearchPage {
    /// Token for the following page, or `None` when this page is the last.
    pub fn next_token(&self) -> Option<&str> {
        if self.is_last {
            return None;
        }
        self.next_page_token.as_deref().filter(|t| !t.is_empty())
    }
}

/// A user reference (reporter or assignee).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub name: String,
    pub email: Option<String>,
}

/// An issue as fetched from the tracker, before enrichment.
#[derive(Debug, Clone, PartialEq)]
pub struct RawIssue {
    /// Stable issue key (e.g. "QA-123")
    pub key: String,
    pub summary: String,
    pub status: String,
    pub priority: String,
    pub created: DateTime<Utc>,
    pub updated: Option<DateTime<Utc>>,
    pub assignee: Option<Person>,
    pub reporter: Option<Person>,
    pub components: Vec<String>,
    pub labels: Vec<String>,
    /// Every `customfield_*` value present on the issue, keyed by field id
    pub custom_fields: BTreeMap<String, serde_json::Value>,
}

/// A single comment, body already flattened to plain text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub author: String,
    pub created: Option<DateTime<Utc>>,
    pub body: String,
}

/// Comments of one issue in tracker order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommentThread {
    pub comments: Vec<Comment>,
}

impl CommentThread {
    pub fn len(&self) -> usize {
        self.comments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.comments.is_empty()
    }
}
