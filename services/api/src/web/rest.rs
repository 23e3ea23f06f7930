//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the analysis endpoints and the master
//! definition for the OpenAPI specification.

use crate::web::state::AppState;
use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::Utc;
use mood_insight_core::{
    ports::PortError, AnalysisSource, ClassAnalysisResult, StudentAnalysisResult,
    DEFAULT_CLASS_WINDOW_DAYS, DEFAULT_STUDENT_WINDOW_DAYS,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use utoipa::{IntoParams, OpenApi, ToSchema};
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        ai_status_handler,
        analyze_class_handler,
        analyze_student_handler,
    ),
    components(
        schemas(AiStatusResponse, ErrorBody)
    ),
    tags(
        (name = "Mood Insight API", description = "Emotion trend and risk analysis for classes and students.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

/// The `{success, data}` envelope wrapped around every successful response.
#[derive(Serialize, Debug)]
pub struct Envelope<T> {
    pub success: bool,
    pub data: T,
}

impl<T> Envelope<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data,
        })
    }
}

/// The body of every error response.
#[derive(Serialize, Debug, ToSchema)]
pub struct ErrorBody {
    pub success: bool,
    pub message: String,
}

pub type HandlerError = (StatusCode, Json<ErrorBody>);

fn failure(status: StatusCode, message: impl Into<String>) -> HandlerError {
    (
        status,
        Json(ErrorBody {
            success: false,
            message: message.into(),
        }),
    )
}

/// Maps a port error onto an HTTP status. Upstream failures are logged and hidden.
pub fn port_failure(e: PortError, context: &str) -> HandlerError {
    match e {
        PortError::NotFound(message) => failure(StatusCode::NOT_FOUND, message),
        PortError::InvalidInput(message) => failure(StatusCode::BAD_REQUEST, message),
        other => {
            error!("{}: {:?}", context, other);
            failure(StatusCode::INTERNAL_SERVER_ERROR, context.to_string())
        }
    }
}

/// Capability report of the analysis model.
#[derive(Serialize, Debug, ToSchema)]
pub struct AiStatusResponse {
    available: bool,
    provider: String,
    /// The attached model, or the configured `AI_MODEL` when none is attached.
    model: String,
}

/// The optional look-back window, in days.
#[derive(Deserialize, Debug, Default, IntoParams)]
pub struct WindowQuery {
    pub days: Option<u32>,
}

/// Resolves the window, answering a malformed query string inside the error envelope.
fn window_days(
    query: Result<Query<WindowQuery>, QueryRejection>,
    default_days: u32,
) -> Result<u32, HandlerError> {
    let Query(query) = query.map_err(|e| failure(StatusCode::BAD_REQUEST, e.body_text()))?;
    Ok(query.days.unwrap_or(default_days))
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Report whether AI-powered analysis is currently available.
#[utoipa::path(
    get,
    path = "/ai/status",
    responses(
        (status = 200, description = "Current analysis capability", body = AiStatusResponse)
    )
)]
pub async fn ai_status_handler(
    State(app_state): State<Arc<AppState>>,
) -> Json<Envelope<AiStatusResponse>> {
    let status = app_state.analyzer.ai_status();
    let provider = match status.provider {
        AnalysisSource::External => "openai",
        AnalysisSource::RuleBased => "rule-based",
    };
    Envelope::ok(AiStatusResponse {
        available: status.available,
        provider: provider.to_string(),
        model: status
            .model
            .unwrap_or_else(|| app_state.config.ai_model.clone()),
    })
}

/// Analyze the emotion trends of a class.
///
/// Returns `hasData: false` when the class logged no moods in the window.
#[utoipa::path(
    get,
    path = "/ai/analyze-class/{class_id}",
    params(
        ("class_id" = Uuid, Path, description = "The class to analyze."),
        WindowQuery
    ),
    responses(
        (status = 200, description = "Class analysis, or an empty state"),
        (status = 400, description = "Invalid or malformed window", body = ErrorBody),
        (status = 404, description = "Class not found", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody)
    )
)]
pub async fn analyze_class_handler(
    State(app_state): State<Arc<AppState>>,
    Path(class_id): Path<Uuid>,
    query: Result<Query<WindowQuery>, QueryRejection>,
) -> Result<Json<Envelope<ClassAnalysisResult>>, HandlerError> {
    let days = window_days(query, DEFAULT_CLASS_WINDOW_DAYS)?;
    app_state
        .directory
        .find_group(class_id)
        .await
        .map_err(|e| port_failure(e, "Failed to look up class"))?;

    let analysis = app_state
        .analyzer
        .analyze_class_trends(class_id, days, Utc::now())
        .await
        .map_err(|e| port_failure(e, "Failed to analyze class"))?;

    Ok(Envelope::ok(analysis))
}

/// Analyze the recent moods of a single student.
///
/// Returns `hasData: false` when fewer than three moods were logged in the window.
#[utoipa::path(
    get,
    path = "/ai/analyze-student/{student_id}",
    params(
        ("student_id" = Uuid, Path, description = "The student to analyze."),
        WindowQuery
    ),
    responses(
        (status = 200, description = "Student analysis, or an empty state"),
        (status = 400, description = "Invalid or malformed window", body = ErrorBody),
        (status = 404, description = "Student not found", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody)
    )
)]
pub async fn analyze_student_handler(
    State(app_state): State<Arc<AppState>>,
    Path(student_id): Path<Uuid>,
    query: Result<Query<WindowQuery>, QueryRejection>,
) -> Result<Json<Envelope<StudentAnalysisResult>>, HandlerError> {
    let days = window_days(query, DEFAULT_STUDENT_WINDOW_DAYS)?;
    let analysis = app_state
        .analyzer
        .analyze_student(student_id, days, Utc::now())
        .await
        .map_err(|e| port_failure(e, "Failed to analyze student"))?;

    Ok(Envelope::ok(analysis))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use async_trait::async_trait;
    use chrono::{DateTime, Duration};
    use mood_insight_core::ports::{MoodRecordStore, PortResult, SubjectDirectory};
    use mood_insight_core::{
        AnalyzerSettings, Emotion, EmotionAnalyzer, Group, MoodRecord, Subject, SubjectRef,
    };

    struct Classroom {
        class: Group,
        student: SubjectRef,
        records: Vec<MoodRecord>,
    }

    impl Classroom {
        fn new(emotions: &[Emotion]) -> Self {
            let class = Group {
                id: Uuid::new_v4(),
                name: "Class 3A".to_string(),
                code: "3A".to_string(),
            };
            let student = SubjectRef {
                id: Uuid::new_v4(),
                name: "Linh".to_string(),
                student_code: Some("HS001".to_string()),
            };
            let start = Utc::now() - Duration::days(emotions.len() as i64);
            let records = emotions
                .iter()
                .enumerate()
                .map(|(i, emotion)| MoodRecord {
                    id: Uuid::new_v4(),
                    subject: student.clone(),
                    group_id: class.id,
                    emotion: *emotion,
                    occurred_on: start + Duration::days(i as i64),
                    note: None,
                })
                .collect();
            Self {
                class,
                student,
                records,
            }
        }
    }

    #[async_trait]
    impl MoodRecordStore for Classroom {
        async fn records_for_group(
            &self,
            group_id: Uuid,
            since: DateTime<Utc>,
        ) -> PortResult<Vec<MoodRecord>> {
            Ok(self
                .records
                .iter()
                .filter(|r| r.group_id == group_id && r.occurred_on >= since)
                .cloned()
                .collect())
        }

        async fn records_for_subject(
            &self,
            subject_id: Uuid,
            since: DateTime<Utc>,
        ) -> PortResult<Vec<MoodRecord>> {
            Ok(self
                .records
                .iter()
                .filter(|r| r.subject.id == subject_id && r.occurred_on >= since)
                .cloned()
                .collect())
        }
    }

    #[async_trait]
    impl SubjectDirectory for Classroom {
        async fn find_subject(&self, subject_id: Uuid) -> PortResult<Subject> {
            if subject_id != self.student.id {
                return Err(PortError::NotFound(format!("Student {} not found", subject_id)));
            }
            Ok(Subject {
                id: self.student.id,
                name: self.student.name.clone(),
                student_code: self.student.student_code.clone(),
                group: Some(self.class.clone()),
            })
        }

        async fn find_group(&self, group_id: Uuid) -> PortResult<Group> {
            if group_id != self.class.id {
                return Err(PortError::NotFound(format!("Class {} not found", group_id)));
            }
            Ok(self.class.clone())
        }
    }

    fn app_state(classroom: Arc<Classroom>) -> Arc<AppState> {
        let config = Config::from_lookup(|key| {
            (key == "DATABASE_URL").then(|| "postgres://localhost/mood".to_string())
        })
        .unwrap();
        Arc::new(AppState {
            analyzer: EmotionAnalyzer::new(
                classroom.clone(),
                classroom.clone(),
                AnalyzerSettings::default(),
            ),
            directory: classroom,
            config: Arc::new(config),
        })
    }

    use Emotion::*;

    #[tokio::test]
    async fn class_analysis_is_wrapped_in_an_envelope() {
        let classroom = Arc::new(Classroom::new(&[Happy, Sad, Sad, Tired, Happy]));
        let class_id = classroom.class.id;
        let state = app_state(classroom);

        let Json(body) = analyze_class_handler(
            State(state),
            Path(class_id),
            Ok(Query(WindowQuery::default())),
        )
        .await
        .unwrap();

        assert!(body.success);
        let json = serde_json::to_value(&body.data).unwrap();
        assert_eq!(json["hasData"], true);
        assert_eq!(json["source"], "rule-based");
        assert_eq!(json["period"]["windowDays"], 7);
        assert_eq!(json["emotionStats"]["counts"]["sad"], 2);
        assert_eq!(json["concerningStudents"][0]["student"]["name"], "Linh");
    }

    #[tokio::test]
    async fn unknown_class_is_not_found() {
        let state = app_state(Arc::new(Classroom::new(&[Happy])));
        let (status, Json(body)) = analyze_class_handler(
            State(state),
            Path(Uuid::new_v4()),
            Ok(Query(WindowQuery::default())),
        )
        .await
        .unwrap_err();
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(!body.success);
    }

    #[tokio::test]
    async fn zero_day_window_is_a_bad_request() {
        let classroom = Arc::new(Classroom::new(&[Happy]));
        let class_id = classroom.class.id;
        let (status, _) = analyze_class_handler(
            State(app_state(classroom)),
            Path(class_id),
            Ok(Query(WindowQuery { days: Some(0) })),
        )
        .await
        .unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn student_with_two_records_gets_an_empty_state() {
        let classroom = Arc::new(Classroom::new(&[Sad, Sad]));
        let student_id = classroom.student.id;

        let Json(body) = analyze_student_handler(
            State(app_state(classroom)),
            Path(student_id),
            Ok(Query(WindowQuery::default())),
        )
        .await
        .unwrap();

        let json = serde_json::to_value(&body.data).unwrap();
        assert_eq!(json["hasData"], false);
        assert!(json["message"].is_string());
    }

    #[tokio::test]
    async fn status_reports_rule_based_without_a_model() {
        let state = app_state(Arc::new(Classroom::new(&[])));
        let Json(body) = ai_status_handler(State(state)).await;
        assert!(body.success);
        assert!(!body.data.available);
        assert_eq!(body.data.provider, "rule-based");
        assert_eq!(body.data.model, "gpt-4o-mini");
    }

    #[tokio::test]
    async fn unknown_student_is_not_found() {
        let state = app_state(Arc::new(Classroom::new(&[Sad, Sad, Sad])));
        let (status, Json(body)) = analyze_student_handler(
            State(state),
            Path(Uuid::new_v4()),
            Ok(Query(WindowQuery::default())),
        )
        .await
        .unwrap_err();
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(!body.success);
        assert!(body.message.contains("not found"));
    }

    #[tokio::test]
    async fn window_past_the_calendar_is_a_bad_request() {
        let classroom = Arc::new(Classroom::new(&[Happy]));
        let class_id = classroom.class.id;
        let (status, Json(body)) = analyze_class_handler(
            State(app_state(classroom)),
            Path(class_id),
            Ok(Query(WindowQuery {
                days: Some(1_000_000_000),
            })),
        )
        .await
        .unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(!body.success);
    }

    #[tokio::test]
    async fn malformed_days_keeps_the_error_envelope() {
        let classroom = Arc::new(Classroom::new(&[Happy]));
        let class_id = classroom.class.id;
        let uri: axum::http::Uri = "http://localhost/ai/analyze-class?days=abc".parse().unwrap();
        let query = Query::<WindowQuery>::try_from_uri(&uri);
        assert!(query.is_err());

        let (status, Json(body)) =
            analyze_class_handler(State(app_state(classroom)), Path(class_id), query)
                .await
                .unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(!body.success);
        assert!(!body.message.is_empty());
    }

    #[test]
    fn upstream_failures_become_internal_errors() {
        let (status, Json(body)) = port_failure(
            PortError::Unexpected("pool timed out".to_string()),
            "Failed to analyze class",
        );
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.message, "Failed to analyze class");
    }
}
