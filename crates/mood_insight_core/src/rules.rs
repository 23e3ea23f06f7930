//! crates/mood_insight_core/src/rules.rs
//!
//! The deterministic analysis engine. It is used on its own when no language
//! model is configured, and as the fallback whenever the model path fails.

use chrono::{DateTime, Utc};

use crate::domain::{
    ActionSuggestion, Analysis, AnalysisSource, ConcerningStudent, DailyBreakdown, Emotion,
    EmotionStats, Priority, Sentiment,
};
use crate::stats::{percent_string, rounded_percent};

/// Number of most recent days compared against the rest of the window.
const RECENT_DAYS: usize = 3;

pub fn analyze_with_rules(
    stats: &EmotionStats,
    daily: &[DailyBreakdown],
    concerning: &[ConcerningStudent],
    window_days: u32,
    now: DateTime<Utc>,
) -> Analysis {
    let negative_rate = percent_string(stats.negative_count, stats.total);
    let positive_rate = percent_string(stats.positive_count, stats.total);
    let negative_value = rounded_percent(stats.negative_count, stats.total);
    let positive_value = rounded_percent(stats.positive_count, stats.total);

    let overall_sentiment = if negative_value > 40.0 {
        Sentiment::Concerning
    } else if positive_value > 50.0 {
        Sentiment::Positive
    } else {
        Sentiment::Neutral
    };

    let mut summary = format!(
        "Over the last {} days the class logged {} mood check-ins. ",
        window_days, stats.total
    );
    summary.push_str(&match overall_sentiment {
        Sentiment::Positive => format!(
            "The overall mood is quite positive, with {}% happy check-ins.",
            positive_rate
        ),
        Sentiment::Concerning => format!(
            "Attention needed: {}% of check-ins were negative, higher than usual.",
            negative_rate
        ),
        Sentiment::Neutral => "The class mood is stable; keep monitoring it.".to_string(),
    });

    let tired = stats.percentage(Emotion::Tired);
    let sad = stats.percentage(Emotion::Sad);
    let angry = stats.percentage(Emotion::Angry);

    let mut key_findings = Vec::new();
    if tired > 30.0 {
        key_findings.push(format!(
            "{}% of check-ins report feeling tired - possibly too much homework or too little sleep",
            stats.percentages[&Emotion::Tired]
        ));
    }
    if sad > 20.0 {
        key_findings.push(format!(
            "{}% of check-ins report feeling sad - worth finding out why",
            stats.percentages[&Emotion::Sad]
        ));
    }
    if !concerning.is_empty() {
        key_findings.push(format!(
            "{} students show signs that need special attention",
            concerning.len()
        ));
    }
    if key_findings.is_empty() {
        key_findings.push("No worrying signals detected".to_string());
        key_findings.push("The classroom climate is relatively healthy".to_string());
    }

    let mut trends = detect_trends(daily);
    if trends.is_empty() {
        trends.push("More data is needed to detect a clear trend".to_string());
    }

    let mut action_suggestions = Vec::new();
    if !concerning.is_empty() {
        action_suggestions.push(suggestion(
            Priority::High,
            format!(
                "Talk privately with the {} students who logged many negative moods",
                concerning.len()
            ),
            "Early detection allows timely support",
        ));
    }
    if tired > 30.0 {
        action_suggestions.push(suggestion(
            Priority::High,
            "Reduce homework for the coming week",
            "Many students feel tired",
        ));
    }
    if angry > 15.0 {
        action_suggestions.push(suggestion(
            Priority::Medium,
            "Run an activity on recognising and managing emotions",
            "Helps students keep their feelings in check",
        ));
    }
    action_suggestions.push(suggestion(
        Priority::Medium,
        "Organize a fun game or extracurricular activity",
        "Creates a relaxed atmosphere and reduces stress",
    ));
    if positive_value > 50.0 {
        action_suggestions.push(suggestion(
            Priority::Low,
            "Keep the current teaching approach",
            "Students are in a positive mood",
        ));
    }

    let positive_notes = if positive_value > 40.0 {
        format!(
            "The classroom is a positive place with {}% happy check-ins. Keep it up!",
            positive_rate
        )
    } else if concerning.is_empty() {
        "No student needs special attention right now - that is great!".to_string()
    } else {
        "Most students are in a stable mood.".to_string()
    };

    Analysis {
        summary,
        key_findings,
        trends,
        action_suggestions,
        positive_notes,
        overall_sentiment,
        generated_at: now,
        method: AnalysisSource::RuleBased,
        tokens_used: None,
    }
}

fn suggestion(
    priority: Priority,
    action: impl Into<String>,
    reason: impl Into<String>,
) -> ActionSuggestion {
    ActionSuggestion {
        priority,
        action: action.into(),
        reason: reason.into(),
    }
}

/// Compares the last days of the window with the earlier ones and names the
/// most tired day. Returns an empty list when nothing stands out.
fn detect_trends(daily: &[DailyBreakdown]) -> Vec<String> {
    let mut trends = Vec::new();

    if daily.len() >= RECENT_DAYS {
        let (older, recent) = daily.split_at(daily.len() - RECENT_DAYS);
        if !older.is_empty() {
            let recent_negative: u32 = recent.iter().map(|d| d.counts.negative()).sum();
            let older_negative: u32 = older.iter().map(|d| d.counts.negative()).sum();
            let recent_negative = recent_negative as f64;
            let older_negative = older_negative as f64;

            if recent_negative > older_negative * 1.3 {
                trends.push(format!(
                    "Negative emotions are TRENDING UP over the last {} days",
                    RECENT_DAYS
                ));
            } else if recent_negative < older_negative * 0.7 {
                trends.push("Negative emotions are TRENDING DOWN - a good sign".to_string());
            }
        }
    }

    // Strictly greater keeps the earliest date on ties.
    let most_tired = daily.iter().fold(None, |best: Option<&DailyBreakdown>, day| {
        let best_tired = best.map(|b| b.counts.tired).unwrap_or(0);
        if day.counts.tired > best_tired {
            Some(day)
        } else {
            best
        }
    });
    if let Some(day) = most_tired {
        trends.push(format!(
            "{} ({}) had the most tired students",
            day.date.format("%A"),
            day.date
        ));
    }

    trends
}
