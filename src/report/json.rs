use super::types::ReportRecord;
use super::ReportError;

/// Serialize records as a pretty-printed top-level JSON array.
///
/// Keys follow struct declaration order and absent optional values are
/// written as `null`, so every record has the same schema.
pub fn render_json(records: &[ReportRecord]) -> Result<String, ReportError> {
    Ok(serde_json::to_string_pretty(records)?)
}

/// Read a document produced by [`render_json`] back into records.
#[allow(dead_code)] // Read side of the schema, used by consumers and tests
pub fn parse_json(document: &str) -> Result<Vec<ReportRecord>, ReportError> {
    Ok(serde_json::from_str(document)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::issue::types::{Comment, Person};
    use crate::report::tests::{now, raw_issue, record};
    use crate::report::{aggregate, TeamInfo};
    use crate::summary::{Narrative, Summary};
    use serde_json::Value;

    fn rich_record() -> ReportRecord {
        let mut issue = raw_issue("QA-42", "Highest", 120);
        issue.updated = Some(now());
        issue.reporter = Some(Person {
            name: "QA Bot".to_string(),
            email: Some("qa-bot@example.com".to_string()),
        });
        aggregate(
            issue,
            TeamInfo::Named {
                team_name: "CBP Ninja".to_string(),
                components: vec!["Checkout".to_string()],
                labels: vec!["flaky".to_string()],
            },
            Summary {
                comment_count: 1,
                narrative: Narrative::Generated("- Root cause: retries skipped".to_string()),
                details: vec![Comment {
                    author: "Sam".to_string(),
                    created: Some(now()),
                    body: "Reproduced".to_string(),
                }],
            },
            now(),
            "https://jira.example.com",
        )
    }

    #[test]
    fn test_schema_keys() {
        let doc = render_json(&[rich_record()]).unwrap();
        let value: Value = serde_json::from_str(&doc).unwrap();
        let first = &value.as_array().unwrap()[0];
        assert_eq!(first["bug_key"], "QA-42");
        assert_eq!(first["team"]["team_name"], "CBP Ninja");
        assert_eq!(first["comments"]["count"], 1);
        assert_eq!(first["comments"]["summary"], "- Root cause: retries skipped");
        assert_eq!(first["comments"]["details"][0]["author"], "Sam");
        assert_eq!(first["aging"]["days_open"], 120);
        assert_eq!(first["aging"]["bucket"], "Critical");
        assert_eq!(first["bug_url"], "https://jira.example.com/browse/QA-42");
    }

    #[test]
    fn test_optional_fields_are_null_not_missing() {
        let doc = render_json(&[record("QA-1", "Low", 2)]).unwrap();
        let value: Value = serde_json::from_str(&doc).unwrap();
        let first = value[0].as_object().unwrap();
        assert!(first["team"].as_object().unwrap()["team_name"].is_null());
        assert!(first["reporter"].is_null());
        assert!(first["last_updated"].is_null());
        assert!(first["assignee"]["email"].is_null());
        assert_eq!(first["comments"]["summary"], "No comments available.");
    }

    #[test]
    fn test_key_order_is_stable() {
        let doc = render_json(&[record("QA-1", "Low", 2)]).unwrap();
        let positions: Vec<usize> = ["\"bug_key\"", "\"status\"", "\"aging\"", "\"team\"", "\"comments\""]
            .iter()
            .map(|k| doc.find(k).unwrap())
            .collect();
        let mut sorted = positions.clone();
        sorted.sort();
        assert_eq!(positions, sorted);
    }

    #[test]
    fn test_round_trip_preserves_records() {
        let records = vec![rich_record(), record("QA-1", "Low", 2)];
        let doc = render_json(&records).unwrap();
        let back = parse_json(&doc).unwrap();
        assert_eq!(back, records);
    }

    #[test]
    fn test_empty_is_empty_array() {
        let doc = render_json(&[]).unwrap();
        assert_eq!(doc.trim(), "[]");
        assert!(parse_json(&doc).unwrap().is_empty());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(parse_json("{not json"), Err(ReportError::Json(_))));
    }
}
