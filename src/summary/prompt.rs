use crate::issue::types::{Comment, CommentThread};

/// Build the summarization prompt for one issue.
///
/// Asks for four named sections so every narrative in the report has the
/// same shape.
pub fn render(key: &str, thread: &CommentThread) -> String {
    let comments = thread
        .comments
        .iter()
        .map(render_comment)
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "You are analyzing Jira bug comments. Summarize the following comments for bug {key}.

Focus on:
- Root cause identified
- Solutions attempted
- Current status/blockers
- Action items

Comments:
{comments}

Provide a concise summary in 3-5 bullet points."
    )
}

fn render_comment(comment: &Comment) -> String {
    let when = comment
        .created
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| "unknown time".to_string());
    format!("**{}** ({}):\n{}", comment.author, when, comment.body)
}
