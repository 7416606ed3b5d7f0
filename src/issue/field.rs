use serde_json::Value;
use tracing::{info, instrument, warn};

use super::types::{FieldId, FieldMeta, RawIssue};
use super::IssueSource;
use crate::report::types::TeamInfo;

/// Outcome of looking up the "Team" custom field for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeamFieldResolution {
    /// Chosen field, or None when the tracker has no team field
    pub field: Option<FieldId>,
    /// Every field that looked like a team field, sorted by id
    pub candidates: Vec<FieldId>,
}

impl TeamFieldResolution {
    pub fn is_ambiguous(&self) -> bool {
        self.candidates.len() > 1
    }
}

/// Discover which custom field holds team ownership.
///
/// A failed catalogue lookup is logged and treated as "no team field": the
/// report then falls back to components and labels.
#[instrument(skip(source))]
pub async fn resolve_team_field(source: &dyn IssueSource, hint: &str) -> TeamFieldResolution {
    let fields = match source.fields().await {
        Ok(fields) => fields,
        Err(e) => {
            warn!(error = %e, "could not list tracker fields, using components/labels");
            return TeamFieldResolution::default();
        }
    };

    let resolution = choose_team_field(&fields, hint);
    match &resolution.field {
        Some(id) => info!(field = %id, candidates = resolution.candidates.len(), "resolved team field"),
        None => info!("no team field found, using components/labels"),
    }
    resolution
}

/// Pick the team field from a field catalogue.
///
/// Candidates are custom fields named "Team" (case-insensitive) or typed as
/// an Atlassian team. The hinted id wins if it is a candidate; otherwise the
/// lexicographically smallest id does.
pub fn choose_team_field(fields: &[FieldMeta], hint: &str) -> TeamFieldResolution {
    let mut candidates: Vec<FieldId> = fields
        .iter()
        .filter(|f| is_team_field(f))
        .map(|f| FieldId(f.id.clone()))
        .collect();
    candidates.sort();
    candidates.dedup();

    let field = candidates
        .iter()
        .find(|id| id.as_str() == hint)
        .or_else(|| candidates.first())
        .cloned();

    TeamFieldResolution { field, candidates }
}

fn is_team_field(field: &FieldMeta) -> bool {
    let custom_id = field.custom || field.id.starts_with("customfield_");
    if !custom_id {
        return false;
    }
    if field.name.trim().eq_ignore_ascii_case("team") {
        return true;
    }
    field.schema.as_ref().is_some_and(|schema| {
        schema.kind == "team"
            && schema
                .custom
                .as_deref()
                .is_some_and(|c| c.contains("atlassian-team"))
    })
}

/// Build the team information for one issue.
///
/// The team name comes only from the resolved field; without it (or with a
/// blank value) the issue's components and labels are the fallback.
pub fn resolve_team(issue: &RawIssue, team_field: Option<&FieldId>) -> TeamInfo {
    let team_name = team_field
        .and_then(|id| issue.custom_fields.get(id.as_str()))
        .and_then(team_name_from_value);

    match team_name {
        Some(team_name) => TeamInfo::Named {
            team_name,
            components: issue.components.clone(),
            labels: issue.labels.clone(),
        },
        None => TeamInfo::Fallback {
            components: issue.components.clone(),
            labels: issue.labels.clone(),
        },
    }
}

fn team_name_from_value(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => Some(s.as_str()),
        Value::Object(map) => ["name", "title", "value"]
            .iter()
            .find_map(|k| map.get(*k).and_then(Value::as_str).filter(|s| !s.trim().is_empty())),
        _ => None,
    }?;
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}
