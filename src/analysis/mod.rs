//! Task analysis: ask a chat model who should take a task and how to rate it.
//!
//! # Flow
//!
//! ```text
//! item + team workload ──► AnalyzeTaskRequest ──► ChatPrompt ──► LlmProvider
//!                                                                    │
//!                                        TaskSuggestion (clamped) ◄──┘
//! ```
//!
//! The same [`analyze`] call backs both `POST /analyzeTask` and
//! `vt item suggest`.

pub mod openai;
pub mod provider;
pub mod task;
pub mod workload;

pub use openai::OpenAiCompatibleProvider;
pub use provider::{BoxedProvider, LlmProvider};
#[cfg(test)]
pub use provider::StaticProvider;
pub use task::{build_prompt, AnalyzeTaskRequest, ChatPrompt, TaskSuggestion};
pub use workload::{candidates_for, TeamMemberWorkload};

use crate::config::LlmSettings;
use crate::error::Result;

/// Run one analysis round-trip.
///
/// # Errors
///
/// Returns `Error::Analysis` if the provider fails or replies with something
/// that isn't a suggestion.
pub async fn analyze(provider: &BoxedProvider, request: &AnalyzeTaskRequest) -> Result<TaskSuggestion> {
    let prompt = build_prompt(request);
    let content = provider.complete(&prompt).await?;
    let suggestion = TaskSuggestion::parse(&content)?;

    tracing::info!(
        item = %request.item_id,
        provider = provider.name(),
        confidence = suggestion.confidence,
        "task analyzed"
    );
    Ok(suggestion)
}

/// Build the configured provider.
///
/// # Errors
///
/// Returns `Error::Config` if the HTTP client can't be built.
pub fn provider_from_settings(settings: &LlmSettings) -> Result<BoxedProvider> {
    Ok(BoxedProvider::new(OpenAiCompatibleProvider::from_settings(settings)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn request() -> AnalyzeTaskRequest {
        AnalyzeTaskRequest {
            item_id: "item_1".into(),
            item_title: "Write launch post".into(),
            item_description: None,
            team_members: Vec::new(),
            due_date: None,
        }
    }

    #[tokio::test]
    async fn test_analyze_with_static_provider() {
        let provider = BoxedProvider::new(StaticProvider::replying(
            r#"{"assignTo":"bo@acme.io","priority":3,"subtasks":["Outline","Draft"],"sextant":2,"confidence":80,"reasoning":"Bo has capacity"}"#,
        ));
        let suggestion = analyze(&provider, &request()).await.unwrap();
        assert_eq!(suggestion.assign_to.as_deref(), Some("bo@acme.io"));
        assert_eq!(suggestion.subtasks.len(), 2);
    }

    #[tokio::test]
    async fn test_analyze_propagates_failure() {
        let provider = BoxedProvider::new(StaticProvider::failing("model offline"));
        let err = analyze(&provider, &request()).await.unwrap_err();
        assert!(matches!(err, Error::Analysis(ref m) if m == "model offline"));
    }
}
