use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::BTreeMap;

use super::types::{Comment, CommentThread, Person, RawIssue};
use super::IssueError;

/// Convert one issue object from a search response into a RawIssue and its
/// comment thread.
///
/// Required: `key`, `fields.summary`, and a parseable `fields.created`.
/// Anything else missing degrades to a placeholder ("Unknown", empty list,
/// None) instead of rejecting the record.
pub fn parse_issue(raw: &Value) -> Result<(RawIssue, CommentThread), IssueError> {
    let key = raw
        .get("key")
        .and_then(Value::as_str)
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(|| malformed("<unknown>", "missing issue key"))?
        .to_string();

    let fields = raw
        .get("fields")
        .and_then(Value::as_object)
        .ok_or_else(|| malformed(&key, "missing fields object"))?;

    let summary = fields
        .get("summary")
        .and_then(Value::as_str)
        .ok_or_else(|| malformed(&key, "missing summary"))?
        .to_string();

    let created_raw = fields
        .get("created")
        .and_then(Value::as_str)
        .ok_or_else(|| malformed(&key, "missing created timestamp"))?;
    let created = parse_timestamp(created_raw)
        .ok_or_else(|| malformed(&key, &format!("unparseable created timestamp {created_raw:?}")))?;

    let updated = fields
        .get("updated")
        .and_then(Value::as_str)
        .and_then(parse_timestamp);

    let components = fields
        .get("components")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|c| c.get("name").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let labels = fields
        .get("labels")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let custom_fields: BTreeMap<String, Value> = fields
        .iter()
        .filter(|(id, value)| id.starts_with("customfield_") && !value.is_null())
        .map(|(id, value)| (id.clone(), value.clone()))
        .collect();

    let issue = RawIssue {
        key,
        summary,
        status: named(fields.get("status")).unwrap_or_else(|| "Unknown".to_string()),
        priority: named(fields.get("priority")).unwrap_or_else(|| "Unknown".to_string()),
        created,
        updated,
        assignee: parse_person(fields.get("assignee")),
        reporter: parse_person(fields.get("reporter")),
        components,
        labels,
        custom_fields,
    };

    let thread = parse_comments(fields.get("comment"));
    Ok((issue, thread))
}

/// Accepts RFC 3339 and Jira's `2024-01-15T10:30:00.000+0000` form.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f%z"))
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

/// Flatten an Atlassian Document Format node into plain text.
///
/// Text nodes are collected depth-first and joined with single spaces.
pub fn adf_to_text(node: &Value) -> String {
    let mut parts = Vec::new();
    collect_text(node, &mut parts);
    parts.join(" ")
}

fn collect_text<'a>(node: &'a Value, parts: &mut Vec<&'a str>) {
    match node {
        Value::Object(map) => {
            if map.get("type").and_then(Value::as_str) == Some("text") {
                parts.push(map.get("text").and_then(Value::as_str).unwrap_or(""));
            } else if let Some(content) = map.get("content") {
                collect_text(content, parts);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_text(item, parts);
            }
        }
        _ => {}
    }
}

fn parse_comments(comment_field: Option<&Value>) -> CommentThread {
    let Some(items) = comment_field
        .and_then(|c| c.get("comments"))
        .and_then(Value::as_array)
    else {
        return CommentThread::default();
    };

    let comments = items
        .iter()
        .map(|c| Comment {
            author: c
                .get("author")
                .and_then(|a| a.get("displayName"))
                .and_then(Value::as_str)
                .unwrap_or("Unknown")
                .to_string(),
            created: c.get("created").and_then(Value::as_str).and_then(parse_timestamp),
            body: match c.get("body") {
                Some(Value::String(text)) => text.clone(),
                Some(adf @ Value::Object(_)) => adf_to_text(adf),
                _ => String::new(),
            },
        })
        .collect();

    CommentThread { comments }
}

fn parse_person(value: Option<&Value>) -> Option<Person> {
    let value = value.filter(|v| !v.is_null())?;
    let name = value
        .get("displayName")
        .and_then(Value::as_str)
        .or_else(|| value.get("name").and_then(Value::as_str))?;
    Some(Person {
        name: name.to_string(),
        email: value
            .get("emailAddress")
            .and_then(Value::as_str)
            .map(str::to_string),
    })
}

fn named(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        other => other.get("name").and_then(Value::as_str).map(str::to_string),
    }
}

fn malformed(key: &str, reason: &str) -> IssueError {
    IssueError::MalformedIssueRecord {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_issue() -> Value {
        json!({
            "key": "QA-7",
            "fields": {
                "summary": "Login page times out",
                "status": {"name": "In Progress"},
                "priority": {"name": "High"},
                "created": "2024-01-15T10:30:00.000+0000",
                "updated": "2024-02-01T08:00:00.000+0000",
                "assignee": {"displayName": "Dana Ruiz", "emailAddress": "dana@example.com"},
                "reporter": null,
                "components": [{"name": "Auth"}, {"name": "Web"}],
                "labels": ["qa_automation"],
                "customfield_12000": {"name": "CBP Ninja"},
                "customfield_10020": null,
                "comment": {"comments": [
                    {"author": {"displayName": "Sam"}, "created": "2024-01-16T09:00:00.000+0000",
                     "body": {"type": "doc", "content": [
                        {"type": "paragraph", "content": [
                            {"type": "text", "text": "Root cause is"},
                            {"type": "text", "text": "a stale cache."}
                        ]}
                     ]}},
                    {"author": {"displayName": "Lee"}, "created": "2024-01-17T09:00:00Z", "body": "Fixed in build 42"}
                ]}
            }
        })
    }

    #[test]
    fn test_parse_full_issue() {
        let (issue, thread) = parse_issue(&sample_issue()).unwrap();
        assert_eq!(issue.key, "QA-7");
        assert_eq!(issue.status, "In Progress");
        assert_eq!(issue.priority, "High");
        assert_eq!(issue.created.to_rfc3339(), "2024-01-15T10:30:00+00:00");
        assert!(issue.updated.is_some());
        assert_eq!(issue.assignee.as_ref().unwrap().name, "Dana Ruiz");
        assert!(issue.reporter.is_none());
        assert_eq!(issue.components, vec!["Auth", "Web"]);
        assert_eq!(issue.labels, vec!["qa_automation"]);
        assert!(issue.custom_fields.contains_key("customfield_12000"));
        assert!(!issue.custom_fields.contains_key("customfield_10020"));

        assert_eq!(thread.len(), 2);
        assert_eq!(thread.comments[0].body, "Root cause is a stale cache.");
        assert_eq!(thread.comments[1].body, "Fixed in build 42");
        assert_eq!(thread.comments[1].author, "Lee");
    }

    #[test]
    fn test_missing_priority_and_status_degrade_to_unknown() {
        let raw = json!({
            "key": "QA-8",
            "fields": {"summary": "x", "created": "2024-01-15T10:30:00Z"}
        });
        let (issue, thread) = parse_issue(&raw).unwrap();
        assert_eq!(issue.priority, "Unknown");
        assert_eq!(issue.status, "Unknown");
        assert!(thread.is_empty());
    }

    #[test]
    fn test_missing_key_is_malformed() {
        let raw = json!({"fields": {"summary": "x", "created": "2024-01-15T10:30:00Z"}});
        assert!(matches!(
            parse_issue(&raw),
            Err(IssueError::MalformedIssueRecord { .. })
        ));
    }

    #[test]
    fn test_bad_created_is_malformed() {
        let raw = json!({"key": "QA-9", "fields": {"summary": "x", "created": "yesterday"}});
        match parse_issue(&raw) {
            Err(IssueError::MalformedIssueRecord { key, reason }) => {
                assert_eq!(key, "QA-9");
                assert!(reason.contains("created"));
            }
            other => panic!("expected malformed record, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_timestamp_formats() {
        assert!(parse_timestamp("2024-01-15T10:30:00.000+0000").is_some());
        assert!(parse_timestamp("2024-01-15T10:30:00+02:00").is_some());
        assert!(parse_timestamp("2024-01-15").is_none());
    }

    #[test]
    fn test_adf_nested_lists() {
        let adf = json!({"type": "doc", "content": [
            {"type": "bulletList", "content": [
                {"type": "listItem", "content": [
                    {"type": "paragraph", "content": [{"type": "text", "text": "one"}]}
                ]},
                {"type": "listItem", "content": [
                    {"type": "paragraph", "content": [{"type": "text", "text": "two"}]}
                ]}
            ]}
        ]});
        assert_eq!(adf_to_text(&adf), "one two");
        assert_eq!(adf_to_text(&json!({"type": "doc"})), "");
    }
}
