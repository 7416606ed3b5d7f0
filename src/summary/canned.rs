use async_trait::async_trait;

use super::{ModelInvoker, SummaryError};

/// Offline invoker for `--mock` runs: answers from the prompt itself.
pub struct CannedInvoker;

#[async_trait]
impl ModelInvoker for CannedInvoker {
    async fn invoke(&self, prompt: &str) -> Result<String, SummaryError> {
        let key = prompt
            .split("for bug ")
            .nth(1)
            .and_then(|rest| rest.split('.').next())
            .unwrap_or("this bug");
        let comments = prompt.lines().filter(|l| l.starts_with("**")).count();
        let latest = prompt
            .lines()
            .rev()
            .take_while(|l| !l.starts_with("Comments:"))
            .find(|l| !l.trim().is_empty() && !l.starts_with("**") && !l.starts_with("Provide"))
            .unwrap_or("no comment text");

        Ok(format!(
            "- Root cause: not determined offline for {key}\n\
             - Solutions attempted: see {comments} comment(s)\n\
             - Current status: {latest}\n\
             - Action items: rerun with a model service for a real summary"
        ))
    }
}
