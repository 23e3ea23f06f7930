//! crates/mood_insight_core/src/analyzer.rs
//!
//! The emotion trend and risk analyzer. It fetches records through the ports,
//! prepares the statistics and asks either the language model or the rule
//! engine for the narrative analysis.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::{
    AiStatus, Analysis, AnalysisOutcome, AnalysisSource, ClassAnalysisResult, ClassTrends,
    ConcerningStudent, DailyBreakdown, EmotionCounts, EmotionStats, InsufficientData, MoodRecord,
    Period, RiskLevel, StudentAnalysisResult, StudentInsight,
};
use crate::llm::{build_class_prompt, parse_model_reply, SYSTEM_INSTRUCTIONS};
use crate::ports::{AnalysisModel, MoodRecordStore, PortError, PortResult, SubjectDirectory};
use crate::rules::analyze_with_rules;
use crate::stats::{
    identify_concerning_students, longest_negative_run, prepare_daily_breakdown,
    prepare_emotion_stats, student_risk,
};

pub const DEFAULT_CLASS_WINDOW_DAYS: u32 = 7;
pub const DEFAULT_STUDENT_WINDOW_DAYS: u32 = 14;
pub const MIN_STUDENT_RECORDS: usize = 3;
const RECENT_RECORD_COUNT: usize = 5;

const CLASS_EMPTY_MESSAGE: &str = "Not enough data to analyze yet";
const STUDENT_EMPTY_MESSAGE: &str =
    "Not enough data to analyze yet (at least 3 check-ins are needed)";

//=========================================================================================
// Settings
//=========================================================================================

#[derive(Debug, Clone)]
pub struct AnalyzerSettings {
    /// The engine selected by configuration.
    pub provider: AnalysisSource,
    /// Upper bound for one language-model call.
    pub model_timeout: Duration,
}

impl Default for AnalyzerSettings {
    fn default() -> Self {
        Self {
            provider: AnalysisSource::RuleBased,
            model_timeout: Duration::from_secs(30),
        }
    }
}

//=========================================================================================
// The Analyzer
//=========================================================================================

#[derive(Clone)]
pub struct EmotionAnalyzer {
    records: Arc<dyn MoodRecordStore>,
    directory: Arc<dyn SubjectDirectory>,
    model: Option<Arc<dyn AnalysisModel>>,
    settings: AnalyzerSettings,
}

impl EmotionAnalyzer {
    pub fn new(
        records: Arc<dyn MoodRecordStore>,
        directory: Arc<dyn SubjectDirectory>,
        settings: AnalyzerSettings,
    ) -> Self {
        Self {
            records,
            directory,
            model: None,
            settings,
        }
    }

    /// Attaches the language model used when the external provider is selected.
    pub fn with_model(mut self, model: Arc<dyn AnalysisModel>) -> Self {
        self.model = Some(model);
        self
    }

    /// True when a model is attached and the external provider is selected.
    pub fn is_ai_available(&self) -> bool {
        self.model.is_some() && self.settings.provider == AnalysisSource::External
    }

    pub fn ai_status(&self) -> AiStatus {
        AiStatus {
            available: self.is_ai_available(),
            provider: self.settings.provider,
            model: self.model.as_ref().map(|m| m.model_name().to_string()),
        }
    }

    /// Analyzes the emotion trends of a whole class over the last `window_days`.
    pub async fn analyze_class_trends(
        &self,
        group_id: Uuid,
        window_days: u32,
        now: DateTime<Utc>,
    ) -> PortResult<ClassAnalysisResult> {
        let period = window(window_days, now)?;
        let mut records = self
            .records
            .records_for_group(group_id, period.start_date)
            .await?;

        if records.is_empty() {
            debug!(%group_id, window_days, "No mood records in window");
            return Ok(AnalysisOutcome::Insufficient(InsufficientData::new(
                CLASS_EMPTY_MESSAGE,
            )));
        }
        records.sort_by_key(|r| r.occurred_on);

        let emotion_stats = prepare_emotion_stats(&records);
        let daily_breakdown = prepare_daily_breakdown(&records);
        let concerning_students = identify_concerning_students(&records);

        let analysis = self
            .analyze(
                &emotion_stats,
                &daily_breakdown,
                &concerning_students,
                window_days,
                now,
            )
            .await;

        info!(
            %group_id,
            records = records.len(),
            concerning = concerning_students.len(),
            method = ?analysis.method,
            "Class analysis complete"
        );

        Ok(AnalysisOutcome::Ready(ClassTrends {
            has_data: true,
            period,
            emotion_stats,
            daily_breakdown,
            concerning_students,
            source: analysis.method,
            analysis,
        }))
    }

    /// Analyzes a single student over the last `window_days`.
    pub async fn analyze_student(
        &self,
        subject_id: Uuid,
        window_days: u32,
        now: DateTime<Utc>,
    ) -> PortResult<StudentAnalysisResult> {
        let period = window(window_days, now)?;
        let mut records = self
            .records
            .records_for_subject(subject_id, period.start_date)
            .await?;
        let student = self.directory.find_subject(subject_id).await?;

        if records.len() < MIN_STUDENT_RECORDS {
            debug!(%subject_id, found = records.len(), "Too few records for student analysis");
            return Ok(AnalysisOutcome::Insufficient(InsufficientData::new(
                STUDENT_EMPTY_MESSAGE,
            )));
        }
        records.sort_by_key(|r| r.occurred_on);

        let emotion_counts: EmotionCounts = records.iter().map(|r| r.emotion).collect();
        let negative_count = emotion_counts.negative();
        let consecutive_negative = longest_negative_run(records.iter().map(|r| r.emotion));
        let risk_level = student_risk(negative_count, consecutive_negative);

        info!(%subject_id, records = records.len(), ?risk_level, "Student analysis complete");

        let recent_records: Vec<MoodRecord> =
            records[records.len().saturating_sub(RECENT_RECORD_COUNT)..].to_vec();

        Ok(AnalysisOutcome::Ready(StudentInsight {
            has_data: true,
            student,
            period,
            total_records: records.len() as u32,
            emotion_counts,
            negative_count,
            consecutive_negative,
            risk_level,
            recommendations: recommendations_for(risk_level),
            recent_records,
        }))
    }

    /// Produces the narrative analysis, falling back to the rules on any model failure.
    async fn analyze(
        &self,
        stats: &EmotionStats,
        daily: &[DailyBreakdown],
        concerning: &[ConcerningStudent],
        window_days: u32,
        now: DateTime<Utc>,
    ) -> Analysis {
        if let Some(model) = self.model.as_ref().filter(|_| self.is_ai_available()) {
            let prompt = build_class_prompt(stats, daily, concerning, window_days);
            match self.delegate(model.as_ref(), &prompt, now).await {
                Ok(analysis) => return analysis,
                Err(e) => warn!("Model analysis failed, using rule-based analysis: {}", e),
            }
        }
        analyze_with_rules(stats, daily, concerning, window_days, now)
    }

    async fn delegate(
        &self,
        model: &dyn AnalysisModel,
        prompt: &str,
        now: DateTime<Utc>,
    ) -> PortResult<Analysis> {
        let timeout = self.settings.model_timeout;
        let reply = tokio::time::timeout(timeout, model.complete_json(SYSTEM_INSTRUCTIONS, prompt))
            .await
            .map_err(|_| {
                PortError::Timeout(format!(
                    "{} did not answer within {:?}",
                    model.model_name(),
                    timeout
                ))
            })??;
        parse_model_reply(&reply, now)
    }
}

fn window(window_days: u32, now: DateTime<Utc>) -> PortResult<Period> {
    if window_days == 0 {
        return Err(PortError::InvalidInput(
            "The analysis window must be at least one day".to_string(),
        ));
    }
    let start_date = chrono::Duration::try_days(i64::from(window_days))
        .and_then(|span| now.checked_sub_signed(span))
        .ok_or_else(|| {
            PortError::InvalidInput(format!(
                "An analysis window of {} days is out of range",
                window_days
            ))
        })?;
    Ok(Period {
        window_days,
        start_date,
        end_date: now,
    })
}

fn recommendations_for(risk_level: RiskLevel) -> Vec<String> {
    let lines: &[&str] = match risk_level {
        RiskLevel::High => &[
            "Talk with the student privately right away",
            "Contact the parents to understand the situation",
            "Follow up closely over the coming days",
        ],
        RiskLevel::Medium => &[
            "Observe for a few more days",
            "Create opportunities for the student to share",
        ],
        RiskLevel::Low => &["Continue routine check-ins"],
    };
    lines.iter().map(|l| l.to_string()).collect()
}
