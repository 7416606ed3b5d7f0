use serde::Deserialize;
use std::fs;
use std::path::Path;
use thiserror::Error;

pub const DEFAULT_JIRA_URL: &str = "https://cloudbees.atlassian.net";
pub const DEFAULT_JQL: &str =
    "labels = qa_automation AND type = Bug AND status != Done AND status != Rejected";
pub const DEFAULT_TEAM_FIELD_HINT: &str = "customfield_12000";
pub const DEFAULT_MODEL_ENDPOINT: &str = "https://api.anthropic.com/v1/messages";
pub const DEFAULT_MODEL: &str = "claude-3-5-sonnet-20241022";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level configuration loaded from .bug-report.toml.
///
/// Every field has a default, so the tool runs with zero config as long as
/// credentials arrive through the environment.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub jira: JiraConfig,

    #[serde(default)]
    pub model: ModelConfig,

    #[serde(default)]
    pub report: ReportConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct JiraConfig {
    /// Base URL of the Jira instance, without a trailing slash
    pub url: String,
    /// Account email for basic auth. Falls back to JIRA_EMAIL.
    pub email: Option<String>,
    /// API token for basic auth. Falls back to JIRA_API_TOKEN.
    pub api_token: Option<String>,
    /// JQL filter selecting the bugs to report on
    pub jql: String,
    /// Page size requested from the search endpoint
    pub page_size: usize,
    /// Hard cap on the number of issues fetched per run
    pub max_issues: Option<usize>,
    /// Custom field id preferred when several fields look like "Team"
    pub team_field_hint: String,
}

impl Default for JiraConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_JIRA_URL.to_string(),
            email: None,
            api_token: None,
            jql: DEFAULT_JQL.to_string(),
            page_size: 50,
            max_issues: None,
            team_field_hint: DEFAULT_TEAM_FIELD_HINT.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub endpoint: String,
    /// Model identifier. Falls back to MODEL_ID.
    pub model: String,
    /// API key. Falls back to ANTHROPIC_API_KEY.
    pub api_key: Option<String>,
    pub max_tokens: u32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_MODEL_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            max_tokens: 500,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub json_path: String,
    pub text_path: String,
    /// Maximum number of summarization calls in flight
    pub concurrency: usize,
    /// Timeout applied to every external call
    pub timeout_secs: u64,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            json_path: "bug_report.json".to_string(),
            text_path: "bug_report.txt".to_string(),
            concurrency: 1,
            timeout_secs: 60,
        }
    }
}

impl Config {
    /// Load configuration from .bug-report.toml in the current directory.
    /// Returns default config if the file doesn't exist, then layers the
    /// environment on top.
    pub fn load() -> Result<Config, ConfigError> {
        let path = Path::new(".bug-report.toml");
        let config = if path.exists() {
            Self::load_from(path)?
        } else {
            Config::default()
        };
        Ok(config.with_env())
    }

    /// Load from a specific path (useful for testing).
    pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Apply environment overrides. Secrets only fill gaps left by the file;
    /// JIRA_URL, JIRA_JQL and MODEL_ID replace file values when set.
    pub fn with_env(self) -> Config {
        self.with_vars(|name| std::env::var(name).ok())
    }

    fn with_vars(mut self, lookup: impl Fn(&str) -> Option<String>) -> Config {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(url) = non_empty("JIRA_URL") {
            self.jira.url = url;
        }
        if let Some(jql) = non_empty("JIRA_JQL") {
            self.jira.jql = jql;
        }
        if self.jira.email.is_none() {
            self.jira.email = non_empty("JIRA_EMAIL");
        }
        if self.jira.api_token.is_none() {
            self.jira.api_token = non_empty("JIRA_API_TOKEN");
        }
        if let Some(model) = non_empty("MODEL_ID") {
            self.model.model = model;
        }
        if self.model.api_key.is_none() {
            self.model.api_key = non_empty("ANTHROPIC_API_KEY");
        }
        self.jira.url = self.jira.url.trim_end_matches('/').to_string();
        self
    }

    /// Jira credentials as (email, token), if both are known.
    pub fn jira_credentials(&self) -> Option<(String, String)> {
        match (&self.jira.email, &self.jira.api_token) {
            (Some(email), Some(token)) => Some((email.clone(), token.clone())),
            _ => None,
        }
    }

    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.report.timeout_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.jira.url, DEFAULT_JIRA_URL);
        assert_eq!(config.jira.jql, DEFAULT_JQL);
        assert_eq!(config.jira.team_field_hint, "customfield_12000");
        assert!(config.jira.email.is_none());
        assert_eq!(config.model.max_tokens, 500);
        assert_eq!(config.report.json_path, "bug_report.json");
        assert_eq!(config.report.text_path, "bug_report.txt");
        assert_eq!(config.report.concurrency, 1);
    }

    #[test]
    fn test_parse_config_toml() {
        let toml_str = r#"
[jira]
url = "https://example.atlassian.net"
jql = "project = QA"
page_size = 25

[report]
concurrency = 4
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.jira.url, "https://example.atlassian.net");
        assert_eq!(config.jira.jql, "project = QA");
        assert_eq!(config.jira.page_size, 25);
        assert_eq!(config.jira.team_field_hint, DEFAULT_TEAM_FIELD_HINT);
        assert_eq!(config.report.concurrency, 4);
        assert_eq!(config.report.timeout_secs, 60);
        assert_eq!(config.model.model, DEFAULT_MODEL);
    }

    #[test]
    fn test_env_fills_missing_credentials() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("JIRA_EMAIL", "qa@example.com"),
            ("JIRA_API_TOKEN", "secret"),
            ("JIRA_URL", "https://other.atlassian.net/"),
            ("ANTHROPIC_API_KEY", "sk-test"),
        ]);
        let config = Config::default().with_vars(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(
            config.jira_credentials(),
            Some(("qa@example.com".to_string(), "secret".to_string()))
        );
        assert_eq!(config.jira.url, "https://other.atlassian.net");
        assert_eq!(config.model.api_key.as_deref(), Some("sk-test"));
    }

    #[test]
    fn test_file_credentials_take_precedence() {
        let mut config = Config::default();
        config.jira.email = Some("file@example.com".to_string());
        let config = config.with_vars(|k| match k {
            "JIRA_EMAIL" => Some("env@example.com".to_string()),
            "JIRA_JQL" => Some("   ".to_string()),
            _ => None,
        });
        assert_eq!(config.jira.email.as_deref(), Some("file@example.com"));
        assert_eq!(config.jira.jql, DEFAULT_JQL);
        assert!(config.jira_credentials().is_none());
    }

    #[test]
    fn test_load_from_missing_file_errors() {
        let path = std::env::temp_dir().join("bug-report-missing-config.toml");
        assert!(matches!(Config::load_from(&path), Err(ConfigError::FileRead(_))));
    }
}
