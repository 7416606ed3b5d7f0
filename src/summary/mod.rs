pub mod anthropic;
pub mod canned;
pub mod prompt;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::issue::types::{Comment, CommentThread};

/// Narrative used when an issue has no comments.
pub const NO_DISCUSSION: &str = "No comments available.";
/// Narrative used when the model service could not produce a summary.
pub const SUMMARY_UNAVAILABLE: &str = "Failed to generate summary.";

#[derive(Debug, Error)]
pub enum SummaryError {
    #[error("Model service request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Summarization unavailable: {0}")]
    SummarizationUnavailable(String),

    #[error("Model service returned an empty summary")]
    EmptyResponse,

    #[error("Model service returned a reserved marker instead of a summary: {0:?}")]
    ReservedResponse(String),

    #[error("Model service timed out after {0:?}")]
    Timeout(Duration),
}

/// Sends a prompt to a language model and returns its text.
#[async_trait]
pub trait ModelInvoker: Send + Sync {
    async fn invoke(&self, prompt: &str) -> Result<String, SummaryError>;
}

/// Summary text of an issue's discussion.
///
/// Serialized as a plain string; the two fixed sentinels map back to their
/// variants on deserialization. `Generated` never holds a sentinel string
/// (see [`Narrative::is_reserved`]), which keeps the round trip lossless.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Narrative {
    Generated(String),
    NoDiscussion,
    Unavailable,
}

impl Narrative {
    pub fn as_str(&self) -> &str {
        match self {
            Narrative::Generated(text) => text,
            Narrative::NoDiscussion => NO_DISCUSSION,
            Narrative::Unavailable => SUMMARY_UNAVAILABLE,
        }
    }

    /// Whether `text` is one of the sentinel strings.
    pub fn is_reserved(text: &str) -> bool {
        text == NO_DISCUSSION || text == SUMMARY_UNAVAILABLE
    }

    pub fn from_text(text: String) -> Self {
        match text.as_str() {
            NO_DISCUSSION => Narrative::NoDiscussion,
            SUMMARY_UNAVAILABLE => Narrative::Unavailable,
            _ => Narrative::Generated(text),
        }
    }
}

impl Serialize for Narrative {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Narrative {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Narrative::from_text)
    }
}

/// Comment statistics and narrative for one issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    #[serde(rename = "count")]
    pub comment_count: usize,
    #[serde(rename = "summary")]
    pub narrative: Narrative,
    pub details: Vec<Comment>,
}

impl Summary {
    pub fn no_discussion() -> Self {
        Self {
            comment_count: 0,
            narrative: Narrative::NoDiscussion,
            details: Vec::new(),
        }
    }

    /// Record for an issue whose summarization failed; the comments are kept.
    pub fn unavailable(thread: &CommentThread) -> Self {
        Self {
            comment_count: thread.len(),
            narrative: Narrative::Unavailable,
            details: thread.comments.clone(),
        }
    }
}

/// Turns comment threads into summaries, one model call per issue.
pub struct SummarizationEngine {
    invoker: Arc<dyn ModelInvoker>,
    timeout: Duration,
}

impl SummarizationEngine {
    pub fn new(invoker: Arc<dyn ModelInvoker>, timeout: Duration) -> Self {
        Self { invoker, timeout }
    }

    /// Summarize one issue's comments.
    ///
    /// An empty thread short-circuits to the "no discussion" sentinel without
    /// calling the model.
    #[instrument(skip(self, thread), fields(comments = thread.len()))]
    pub async fn summarize(&self, key: &str, thread: &CommentThread) -> Result<Summary, SummaryError> {
        if thread.is_empty() {
            debug!("no comments, skipping model call");
            return Ok(Summary::no_discussion());
        }

        let prompt = prompt::render(key, thread);
        let text = tokio::time::timeout(self.timeout, self.invoker.invoke(&prompt))
            .await
            .map_err(|_| SummaryError::Timeout(self.timeout))??;

        let text = text.trim();
        if text.is_empty() {
            return Err(SummaryError::EmptyResponse);
        }
        if Narrative::is_reserved(text) {
            return Err(SummaryError::ReservedResponse(text.to_string()));
        }
        debug!(chars = text.len(), "received summary");

        Ok(Summary {
            comment_count: thread.len(),
            narrative: Narrative::Generated(text.to_string()),
            details: thread.comments.clone(),
        })
    }
}
