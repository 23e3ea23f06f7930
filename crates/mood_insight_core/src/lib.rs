pub mod analyzer;
pub mod domain;
pub mod llm;
pub mod ports;
pub mod rules;
pub mod stats;

pub use analyzer::{
    AnalyzerSettings, EmotionAnalyzer, DEFAULT_CLASS_WINDOW_DAYS, DEFAULT_STUDENT_WINDOW_DAYS,
};
pub use domain::{
    AiStatus, Analysis, AnalysisOutcome, AnalysisSource, ClassAnalysisResult, ClassTrends, Emotion,
    Group, MoodRecord, RiskLevel, StudentAnalysisResult, StudentInsight, Subject, SubjectRef,
};
pub use ports::{
    AnalysisModel, ModelReply, MoodRecordStore, PortError, PortResult, SubjectDirectory,
};
