//! crates/mood_insight_core/src/llm.rs
//!
//! Prompt construction for the language-model path, and validation of the
//! model's JSON reply into the same `Analysis` shape the rule engine returns.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::domain::{
    ActionSuggestion, Analysis, AnalysisSource, ConcerningStudent, DailyBreakdown, Emotion,
    EmotionStats, Sentiment,
};
use crate::ports::{ModelReply, PortError, PortResult};

/// How many concerning students are listed in the prompt.
const PROMPT_STUDENT_LIMIT: usize = 5;

pub const SYSTEM_INSTRUCTIONS: &str = "You are an experienced school psychologist who advises \
primary-school teachers. Always answer with a single valid JSON object.";

const USER_INPUT_TEMPLATE: &str = r#"Analyze the emotion data of a primary-school class over the last {days} days.

DATA:

1. EMOTION OVERVIEW:
- Total check-ins: {total}
- Happy: {happy}%
- Neutral: {neutral}%
- Sad: {sad}%
- Angry: {angry}%
- Tired: {tired}%

2. DAILY BREAKDOWN:
{daily}

3. STUDENTS NEEDING ATTENTION: {concerning_count}
{concerning}

REQUIREMENTS:
Return JSON in exactly this format (NO markdown, JSON only):
{
  "summary": "Short summary of the class mood (2-3 sentences)",
  "keyFindings": ["Key finding 1", "Key finding 2", "Key finding 3"],
  "trends": ["Notable trend 1", "Notable trend 2"],
  "actionSuggestions": [
    { "priority": "high", "action": "High-priority action", "reason": "Reason" },
    { "priority": "medium", "action": "Medium-priority action", "reason": "Reason" },
    { "priority": "low", "action": "Low-priority action", "reason": "Reason" }
  ],
  "positiveNotes": "What is going well in this class",
  "overallSentiment": "positive | neutral | concerning"
}

Notes:
- Use friendly language suited to primary-school teachers.
- Give CONCRETE, FEASIBLE suggestions.
- Focus on SOLUTIONS, not only on describing problems."#;

/// Renders the class data into the user prompt sent to the model.
pub fn build_class_prompt(
    stats: &EmotionStats,
    daily: &[DailyBreakdown],
    concerning: &[ConcerningStudent],
    window_days: u32,
) -> String {
    let percent = |e: Emotion| {
        stats
            .percentages
            .get(&e)
            .cloned()
            .unwrap_or_else(|| "0".to_string())
    };

    let daily_lines = daily
        .iter()
        .map(|d| {
            format!(
                "- {}: Happy: {}, Neutral: {}, Sad: {}, Angry: {}, Tired: {}",
                d.date, d.counts.happy, d.counts.neutral, d.counts.sad, d.counts.angry, d.counts.tired
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let concerning_lines = concerning
        .iter()
        .take(PROMPT_STUDENT_LIMIT)
        .map(|s| {
            format!(
                "- {}: {} negative check-ins, {} in a row",
                s.student.name, s.negative_count, s.consecutive_negative
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    USER_INPUT_TEMPLATE
        .replace("{days}", &window_days.to_string())
        .replace("{total}", &stats.total.to_string())
        .replace("{happy}", &percent(Emotion::Happy))
        .replace("{neutral}", &percent(Emotion::Neutral))
        .replace("{sad}", &percent(Emotion::Sad))
        .replace("{angry}", &percent(Emotion::Angry))
        .replace("{tired}", &percent(Emotion::Tired))
        .replace("{daily}", &daily_lines)
        .replace("{concerning_count}", &concerning.len().to_string())
        .replace("{concerning}", &concerning_lines)
}

/// The fields a model reply must carry. Unknown extra fields are ignored.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelAnalysis {
    summary: String,
    key_findings: Vec<String>,
    trends: Vec<String>,
    action_suggestions: Vec<ActionSuggestion>,
    positive_notes: String,
    overall_sentiment: Sentiment,
}

/// Strips an optional Markdown code fence around a JSON payload.
fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

/// Validates a model reply and normalizes it into an [`Analysis`].
pub fn parse_model_reply(reply: &ModelReply, now: DateTime<Utc>) -> PortResult<Analysis> {
    let parsed: ModelAnalysis = serde_json::from_str(strip_code_fence(&reply.content))
        .map_err(|e| PortError::Unexpected(format!("Model reply is not a valid analysis: {}", e)))?;

    if parsed.summary.trim().is_empty() {
        return Err(PortError::Unexpected(
            "Model reply contained an empty summary.".to_string(),
        ));
    }

    Ok(Analysis {
        summary: parsed.summary,
        key_findings: parsed.key_findings,
        trends: parsed.trends,
        action_suggestions: parsed.action_suggestions,
        positive_notes: parsed.positive_notes,
        overall_sentiment: parsed.overall_sentiment,
        generated_at: now,
        method: AnalysisSource::External,
        tokens_used: reply.tokens_used,
    })
}
