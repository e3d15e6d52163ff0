//! Analysis request, prompt construction and the normalized suggestion.

use std::fmt::Write as _;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::workload::TeamMemberWorkload;
use crate::error::{Error, Result};
use crate::model::Item;

/// Body of `POST /analyzeTask`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeTaskRequest {
    pub item_id: String,
    pub item_title: String,
    #[serde(default)]
    pub item_description: Option<String>,
    #[serde(default)]
    pub team_members: Vec<TeamMemberWorkload>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
}

impl AnalyzeTaskRequest {
    /// Build a request for a stored item.
    #[must_use]
    pub fn for_item(item: &Item, team_members: Vec<TeamMemberWorkload>) -> Self {
        Self {
            item_id: item.id.clone(),
            item_title: item.title.clone(),
            item_description: item.description.clone(),
            team_members,
            due_date: item.due_date,
        }
    }
}

/// System and user messages plus the JSON schema the reply must follow.
#[derive(Debug, Clone)]
pub struct ChatPrompt {
    pub system: String,
    pub user: String,
    pub schema: Value,
}

const SYSTEM_PROMPT: &str = "You are a project planning assistant. You assign work to the \
team member best placed to take it, rate its priority (1 low to 3 high) and its sextant \
(1 most urgent and important to 6 least), and break it into concrete subtasks. \
Reply with JSON only.";

/// JSON schema of the suggestion the model must return.
#[must_use]
pub fn suggestion_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "assignTo": { "type": "string" },
            "priority": { "type": "integer", "minimum": 1, "maximum": 3 },
            "subtasks": { "type": "array", "items": { "type": "string" } },
            "sextant": { "type": "integer", "minimum": 1, "maximum": 6 },
            "confidence": { "type": "integer", "minimum": 0, "maximum": 100 },
            "reasoning": { "type": "string" }
        },
        "required": ["assignTo", "priority", "subtasks", "sextant", "confidence", "reasoning"],
        "additionalProperties": false
    })
}

/// Render the prompt for one request.
#[must_use]
pub fn build_prompt(request: &AnalyzeTaskRequest) -> ChatPrompt {
    let mut user = String::new();
    let _ = writeln!(user, "Task: {}", request.item_title);
    if let Some(desc) = request.item_description.as_deref().filter(|d| !d.is_empty()) {
        let _ = writeln!(user, "Description: {desc}");
    }
    match request.due_date {
        Some(due) => {
            let _ = writeln!(user, "Due: {due}");
        }
        None => user.push_str("Due: not set\n"),
    }

    user.push_str("\nTeam workload:\n");
    if request.team_members.is_empty() {
        user.push_str("- nobody available; leave assignTo empty\n");
    }
    for member in &request.team_members {
        let who = member
            .name
            .as_deref()
            .map_or_else(|| member.email.clone(), |n| format!("{n} <{}>", member.email));
        let _ = writeln!(
            user,
            "- {who}: {} active tasks, {:.0}% completion rate",
            member.active_tasks, member.completion_rate
        );
    }

    user.push_str(
        "\nSuggest who should take this task (by email), its priority and sextant, \
         up to five subtasks, your confidence from 0 to 100 and a one-paragraph reasoning.",
    );

    ChatPrompt {
        system: SYSTEM_PROMPT.to_string(),
        user,
        schema: suggestion_schema(),
    }
}

/// Normalized suggestion returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSuggestion {
    pub assign_to: Option<String>,
    pub priority: u8,
    pub subtasks: Vec<String>,
    pub sextant: u8,
    pub confidence: u8,
    pub reasoning: String,
}

/// Raw model reply; numbers may arrive as floats or out of range.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSuggestion {
    #[serde(default)]
    assign_to: Option<String>,
    #[serde(default)]
    priority: Option<f64>,
    #[serde(default)]
    subtasks: Vec<String>,
    #[serde(default)]
    sextant: Option<f64>,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    reasoning: String,
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn clamp_level(value: Option<f64>, min: u8, max: u8, default: u8) -> u8 {
    value
        .filter(|v| v.is_finite())
        .map_or(default, |v| v.round().clamp(f64::from(min), f64::from(max)) as u8)
}

impl TaskSuggestion {
    /// Parse model output, clamping priority to 1-3, sextant to 1-6 and
    /// confidence to 0-100.
    ///
    /// # Errors
    ///
    /// Returns `Error::Analysis` if the text is not a JSON object.
    pub fn parse(content: &str) -> Result<Self> {
        let trimmed = content
            .trim()
            .trim_start_matches("```json")
            .trim_start_matches("```")
            .trim_end_matches("```")
            .trim();
        let raw: RawSuggestion = serde_json::from_str(trimmed)
            .map_err(|e| Error::Analysis(format!("model reply is not a valid suggestion: {e}")))?;

        Ok(Self {
            assign_to: raw
                .assign_to
                .map(|a| a.trim().to_lowercase())
                .filter(|a| !a.is_empty()),
            priority: clamp_level(raw.priority, 1, 3, 2),
            subtasks: raw
                .subtasks
                .into_iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            sextant: clamp_level(raw.sextant, 1, 6, 3),
            confidence: clamp_level(raw.confidence, 0, 100, 0),
            reasoning: raw.reasoning,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> AnalyzeTaskRequest {
        AnalyzeTaskRequest {
            item_id: "item_1".into(),
            item_title: "Ship onboarding emails".into(),
            item_description: Some("Three-step drip".into()),
            team_members: vec![TeamMemberWorkload {
                email: "bo@acme.io".into(),
                name: Some("Bo".into()),
                active_tasks: 4,
                completion_rate: 75.0,
            }],
            due_date: NaiveDate::from_ymd_opt(2026, 4, 1),
        }
    }

    #[test]
    fn test_request_wire_format() {
        let body = r#"{"itemId":"item_1","itemTitle":"T","itemDescription":null,
            "teamMembers":[{"email":"a@b.c","activeTasks":2,"completionRate":50}],"dueDate":"2026-04-01"}"#;
        let req: AnalyzeTaskRequest = serde_json::from_str(body).unwrap();
        assert_eq!(req.team_members[0].active_tasks, 2);
        assert_eq!(req.due_date, NaiveDate::from_ymd_opt(2026, 4, 1));
    }

    #[test]
    fn test_prompt_mentions_everything() {
        let prompt = build_prompt(&request());
        assert!(prompt.user.contains("Ship onboarding emails"));
        assert!(prompt.user.contains("Three-step drip"));
        assert!(prompt.user.contains("2026-04-01"));
        assert!(prompt.user.contains("Bo <bo@acme.io>: 4 active tasks, 75% completion rate"));
        assert_eq!(prompt.schema["required"].as_array().unwrap().len(), 6);
    }

    #[test]
    fn test_parse_clamps() {
        let s = TaskSuggestion::parse(
            r#"{"assignTo":" Bo@Acme.io ","priority":7,"subtasks":["a",""],"sextant":0,"confidence":140.4,"reasoning":"r"}"#,
        )
        .unwrap();
        assert_eq!(s.assign_to.as_deref(), Some("bo@acme.io"));
        assert_eq!(s.priority, 3);
        assert_eq!(s.sextant, 1);
        assert_eq!(s.confidence, 100);
        assert_eq!(s.subtasks, vec!["a".to_string()]);
    }

    #[test]
    fn test_parse_fenced_and_missing_fields() {
        let s = TaskSuggestion::parse("```json\n{\"reasoning\":\"thin\"}\n```").unwrap();
        assert_eq!(s.assign_to, None);
        assert_eq!(s.priority, 2);
        assert_eq!(s.sextant, 3);
        assert_eq!(s.confidence, 0);
    }

    #[test]
    fn test_parse_rejects_non_json() {
        assert!(matches!(
            TaskSuggestion::parse("I think Bo should do it"),
            Err(Error::Analysis(_))
        ));
    }
}
