use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::issue::types::Person;
use crate::summary::Summary;

/// How long a bug has been open, in four fixed bands.
///
/// Each band is closed at its upper bound: day 7 is Recent, day 30 is Active,
/// day 90 is Aging, day 91 is Critical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgingBucket {
    Recent,
    Active,
    Aging,
    Critical,
}

impl AgingBucket {
    /// Every bucket, oldest first (statistics footer order).
    pub const ALL: [AgingBucket; 4] = [
        AgingBucket::Critical,
        AgingBucket::Aging,
        AgingBucket::Active,
        AgingBucket::Recent,
    ];

    pub fn from_age_days(days: i64) -> Self {
        match days {
            i64::MIN..=7 => AgingBucket::Recent,
            8..=30 => AgingBucket::Active,
            31..=90 => AgingBucket::Aging,
            _ => AgingBucket::Critical,
        }
    }

    /// Coloured dot shown next to the age in the text report.
    pub fn indicator(self) -> &'static str {
        match self {
            AgingBucket::Recent => "🟢",
            AgingBucket::Active => "🟡",
            AgingBucket::Aging => "🟠",
            AgingBucket::Critical => "🔴",
        }
    }

    pub fn range_label(self) -> &'static str {
        match self {
            AgingBucket::Recent => "0-7 days",
            AgingBucket::Active => "8-30 days",
            AgingBucket::Aging => "31-90 days",
            AgingBucket::Critical => "90+ days",
        }
    }
}

impl std::fmt::Display for AgingBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgingBucket::Recent => write!(f, "Recent"),
            AgingBucket::Active => write!(f, "Active"),
            AgingBucket::Aging => write!(f, "Aging"),
            AgingBucket::Critical => write!(f, "Critical Age"),
        }
    }
}

/// Rank of a tracker priority name; higher sorts first. Unknown names rank 0.
pub fn priority_rank(priority: &str) -> u8 {
    match priority.trim().to_ascii_lowercase().as_str() {
        "highest" => 5,
        "high" => 4,
        "medium" => 3,
        "low" => 2,
        "lowest" => 1,
        _ => 0,
    }
}

/// Team ownership of an issue.
///
/// `Named` only when the tracker's team field carried a value; otherwise the
/// components and labels stand in for the team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "TeamFields", into = "TeamFields")]
pub enum TeamInfo {
    Named {
        team_name: String,
        components: Vec<String>,
        labels: Vec<String>,
    },
    Fallback {
        components: Vec<String>,
        labels: Vec<String>,
    },
}

/// Flat wire shape of TeamInfo: `team_name` is null for the fallback.
#[derive(Serialize, Deserialize)]
struct TeamFields {
    team_name: Option<String>,
    #[serde(default)]
    components: Vec<String>,
    #[serde(default)]
    labels: Vec<String>,
}

impl From<TeamFields> for TeamInfo {
    fn from(fields: TeamFields) -> Self {
        match fields.team_name.filter(|n| !n.trim().is_empty()) {
            Some(team_name) => TeamInfo::Named {
                team_name,
                components: fields.components,
                labels: fields.labels,
            },
            None => TeamInfo::Fallback {
                components: fields.components,
                labels: fields.labels,
            },
        }
    }
}

impl From<TeamInfo> for TeamFields {
    fn from(team: TeamInfo) -> Self {
        match team {
            TeamInfo::Named { team_name, components, labels } => TeamFields {
                team_name: Some(team_name),
                components,
                labels,
            },
            TeamInfo::Fallback { components, labels } => TeamFields {
                team_name: None,
                components,
                labels,
            },
        }
    }
}

impl TeamInfo {
    pub fn team_name(&self) -> Option<&str> {
        match self {
            TeamInfo::Named { team_name, .. } => Some(team_name),
            TeamInfo::Fallback { .. } => None,
        }
    }

    /// Text shown in the Teams column: the team name, or the components
    /// followed by the first two labels, or "N/A" when there is nothing.
    pub fn display(&self) -> String {
        match self {
            TeamInfo::Named { team_name, .. } => team_name.clone(),
            TeamInfo::Fallback { components, labels } => {
                let parts: Vec<&str> = components
                    .iter()
                    .chain(labels.iter().take(2))
                    .map(String::as_str)
                    .collect();
                if parts.is_empty() {
                    "N/A".to_string()
                } else {
                    parts.join(", ")
                }
            }
        }
    }
}

/// Creation time and derived age of an issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Aging {
    pub created_date: DateTime<Utc>,
    pub days_open: i64,
    pub bucket: AgingBucket,
}

/// The merged, per-issue unit consumed by both renderers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRecord {
    pub bug_key: String,
    pub summary: String,
    pub status: String,
    pub priority: String,
    pub bug_url: String,
    pub aging: Aging,
    pub last_updated: Option<DateTime<Utc>>,
    pub team: TeamInfo,
    pub reporter: Option<Person>,
    pub assignee: Option<Person>,
    pub comments: Summary,
}

impl ReportRecord {
    pub fn priority_rank(&self) -> u8 {
        priority_rank(&self.priority)
    }
}

/// Per-bucket counts for the statistics footer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Statistics {
    pub total: usize,
    pub critical: usize,
    pub aging: usize,
    pub active: usize,
    pub recent: usize,
}

impl Statistics {
    pub fn from_records(records: &[ReportRecord]) -> Self {
        let mut stats = Statistics {
            total: records.len(),
            ..Statistics::default()
        };
        for record in records {
            match record.aging.bucket {
                AgingBucket::Critical => stats.critical += 1,
                AgingBucket::Aging => stats.aging += 1,
                AgingBucket::Active => stats.active += 1,
                AgingBucket::Recent => stats.recent += 1,
            }
        }
        stats
    }

    pub fn count(&self, bucket: AgingBucket) -> usize {
        match bucket {
            AgingBucket::Critical => self.critical,
            AgingBucket::Aging => self.aging,
            AgingBucket::Active => self.active,
            AgingBucket::Recent => self.recent,
        }
    }
}

/// Complete report: sorted records plus statistics.
#[derive(Debug, Clone)]
pub struct Report {
    pub generated_at: DateTime<Utc>,
    /// Sorted by priority rank, then age, both descending
    pub records: Vec<ReportRecord>,
    pub statistics: Statistics,
}
