//! crates/mood_insight_core/src/domain.rs
//!
//! Defines the core data structures for mood tracking and its analysis.
//! These structs know nothing about the database or the language model; the
//! serde derives only fix the JSON shape handed back to callers.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

//=========================================================================================
// Emotions
//=========================================================================================

/// The closed set of moods a student can log. The declaration order is the
/// fixed priority order used for tie-breaking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Happy,
    Neutral,
    Sad,
    Angry,
    Tired,
}

impl Emotion {
    pub const ALL: [Emotion; 5] = [
        Emotion::Happy,
        Emotion::Neutral,
        Emotion::Sad,
        Emotion::Angry,
        Emotion::Tired,
    ];

    /// `sad`, `angry` and `tired` all count as distress for risk scoring.
    pub fn is_negative(self) -> bool {
        matches!(self, Emotion::Sad | Emotion::Angry | Emotion::Tired)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Emotion::Happy => "happy",
            Emotion::Neutral => "neutral",
            Emotion::Sad => "sad",
            Emotion::Angry => "angry",
            Emotion::Tired => "tired",
        }
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown emotion label: {0}")]
pub struct UnknownEmotion(pub String);

impl FromStr for Emotion {
    type Err = UnknownEmotion;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Emotion::ALL
            .into_iter()
            .find(|e| e.as_str() == s)
            .ok_or_else(|| UnknownEmotion(s.to_string()))
    }
}

/// A fully populated emotion -> count table. Every emotion is always present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmotionCounts {
    pub happy: u32,
    pub neutral: u32,
    pub sad: u32,
    pub angry: u32,
    pub tired: u32,
}

impl EmotionCounts {
    pub fn get(&self, emotion: Emotion) -> u32 {
        match emotion {
            Emotion::Happy => self.happy,
            Emotion::Neutral => self.neutral,
            Emotion::Sad => self.sad,
            Emotion::Angry => self.angry,
            Emotion::Tired => self.tired,
        }
    }

    pub fn increment(&mut self, emotion: Emotion) {
        let slot = match emotion {
            Emotion::Happy => &mut self.happy,
            Emotion::Neutral => &mut self.neutral,
            Emotion::Sad => &mut self.sad,
            Emotion::Angry => &mut self.angry,
            Emotion::Tired => &mut self.tired,
        };
        *slot += 1;
    }

    pub fn negative(&self) -> u32 {
        self.sad + self.angry + self.tired
    }

    pub fn total(&self) -> u32 {
        Emotion::ALL.iter().map(|e| self.get(*e)).sum()
    }
}

impl FromIterator<Emotion> for EmotionCounts {
    fn from_iter<I: IntoIterator<Item = Emotion>>(iter: I) -> Self {
        let mut counts = EmotionCounts::default();
        for emotion in iter {
            counts.increment(emotion);
        }
        counts
    }
}

//=========================================================================================
// Students, classes and mood records
//=========================================================================================

/// Display fields of a student, joined onto each mood record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectRef {
    pub id: Uuid,
    pub name: String,
    pub student_code: Option<String>,
}

/// A class (group of students).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: Uuid,
    pub name: String,
    pub code: String,
}

/// A student as resolved by the directory, with the class they belong to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    pub id: Uuid,
    pub name: String,
    pub student_code: Option<String>,
    pub group: Option<Group>,
}

/// One daily mood check-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoodRecord {
    pub id: Uuid,
    pub subject: SubjectRef,
    pub group_id: Uuid,
    pub emotion: Emotion,
    pub occurred_on: DateTime<Utc>,
    pub note: Option<String>,
}

//=========================================================================================
// Derived statistics
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmotionStats {
    pub total: u32,
    pub counts: EmotionCounts,
    /// One-decimal percentages, only for emotions that occur in the window.
    pub percentages: BTreeMap<Emotion, String>,
    pub most_common: Option<Emotion>,
    pub negative_count: u32,
    pub positive_count: u32,
    pub neutral_count: u32,
}

impl EmotionStats {
    /// The rounded percentage for `emotion`, or 0 when it never occurs.
    pub fn percentage(&self, emotion: Emotion) -> f64 {
        self.percentages
            .get(&emotion)
            .and_then(|p| p.parse().ok())
            .unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyBreakdown {
    pub date: NaiveDate,
    #[serde(flatten)]
    pub counts: EmotionCounts,
    pub total: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConcerningStudent {
    pub student: SubjectRef,
    pub negative_count: u32,
    pub consecutive_negative: u32,
    pub total_records: u32,
    pub risk_level: RiskLevel,
}

//=========================================================================================
// Analysis output
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Neutral,
    Concerning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionSuggestion {
    pub priority: Priority,
    pub action: String,
    pub reason: String,
}

/// Which engine produced an analysis, and which one is configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnalysisSource {
    External,
    RuleBased,
}

/// The narrative part of a class analysis, identical in shape for both engines.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    pub summary: String,
    pub key_findings: Vec<String>,
    pub trends: Vec<String>,
    pub action_suggestions: Vec<ActionSuggestion>,
    pub positive_notes: String,
    pub overall_sentiment: Sentiment,
    pub generated_at: DateTime<Utc>,
    pub method: AnalysisSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens_used: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Period {
    pub window_days: u32,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

/// The empty state returned when a window holds too few records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsufficientData {
    pub has_data: bool,
    pub message: String,
}

impl InsufficientData {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            has_data: false,
            message: message.into(),
        }
    }
}

/// Either an empty state or a finished analysis.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AnalysisOutcome<T> {
    Insufficient(InsufficientData),
    Ready(T),
}

impl<T> AnalysisOutcome<T> {
    pub fn has_data(&self) -> bool {
        matches!(self, AnalysisOutcome::Ready(_))
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            AnalysisOutcome::Ready(value) => Some(value),
            AnalysisOutcome::Insufficient(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassTrends {
    pub has_data: bool,
    pub period: Period,
    pub emotion_stats: EmotionStats,
    pub daily_breakdown: Vec<DailyBreakdown>,
    pub concerning_students: Vec<ConcerningStudent>,
    pub analysis: Analysis,
    pub source: AnalysisSource,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentInsight {
    pub has_data: bool,
    pub student: Subject,
    pub period: Period,
    pub total_records: u32,
    pub emotion_counts: EmotionCounts,
    pub negative_count: u32,
    pub consecutive_negative: u32,
    pub risk_level: RiskLevel,
    pub recommendations: Vec<String>,
    pub recent_records: Vec<MoodRecord>,
}

pub type ClassAnalysisResult = AnalysisOutcome<ClassTrends>;
pub type StudentAnalysisResult = AnalysisOutcome<StudentInsight>;

/// Capability report for the optional language-model path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AiStatus {
    pub available: bool,
    pub provider: AnalysisSource,
    pub model: Option<String>,
}
