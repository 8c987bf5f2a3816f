use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
};
use serde_json::{Value, json};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{Instrument, error, info, info_span, warn};

use crate::{
    consultations::{CommitError, Consultation, ConsultationStore},
    models::{ConsultationResponse, PlanRequestBody, PlanResponse},
    planner::{Planner, TranscriptCommit},
    transcript::TranscriptBudget,
};

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<Value>)>;
type ApiError = (StatusCode, Json<Value>);

fn bad_request_error(message: &str) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message })))
}

fn not_found_error(message: &str, id: &str) -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": message,
            "consultation_id": id
        })),
    )
}

fn conflict_error(id: &str, current: u64) -> ApiError {
    (
        StatusCode::CONFLICT,
        Json(json!({
            "error": "Consultation was updated by another run",
            "consultation_id": id,
            "revision": current
        })),
    )
}

#[derive(Clone)]
pub struct AppState {
    pub planner: Arc<Planner>,
    pub consultations: Arc<ConsultationStore>,
}

impl AppState {
    pub fn new(planner: Planner, budget: TranscriptBudget) -> Self {
        Self {
            planner: Arc::new(planner),
            consultations: Arc::new(ConsultationStore::new(budget)),
        }
    }
}

pub fn create_app(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/consultations", post(create_consultation))
        .route(
            "/consultations/{consultation_id}",
            get(get_consultation).delete(end_consultation),
        )
        .route("/consultations/{consultation_id}/plan", post(run_plan))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

async fn root() -> Json<Value> {
    Json(json!({
        "service": "Healthcare Diagnosis and Treatment Planner",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Chained diagnosis, treatment and compatibility prompts over a running consultation transcript",
        "endpoints": {
            "POST /consultations": "Start a consultation with an empty transcript",
            "GET /consultations/{consultation_id}": "Get the consultation transcript",
            "POST /consultations/{consultation_id}/plan": "Get a diagnosis and treatment plan",
            "DELETE /consultations/{consultation_id}": "End the consultation",
            "GET /health": "Health check"
        }
    }))
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

fn consultation_response(consultation: &Consultation) -> ConsultationResponse {
    ConsultationResponse {
        consultation_id: consultation.id.clone(),
        transcript: consultation.transcript.as_text(),
        entries: consultation.transcript.entries().map(String::from).collect(),
        revision: consultation.revision,
        created_at: consultation.created_at.to_rfc3339(),
    }
}

async fn create_consultation(
    State(state): State<AppState>,
) -> (StatusCode, Json<ConsultationResponse>) {
    let consultation = state.consultations.create();
    info!("Consultation {} created", consultation.id);
    (StatusCode::CREATED, Json(consultation_response(&consultation)))
}

async fn get_consultation(
    State(state): State<AppState>,
    Path(consultation_id): Path<String>,
) -> ApiResult<ConsultationResponse> {
    state
        .consultations
        .get(&consultation_id)
        .map(|consultation| Json(consultation_response(&consultation)))
        .ok_or_else(|| not_found_error("Consultation not found", &consultation_id))
}

async fn end_consultation(
    State(state): State<AppState>,
    Path(consultation_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state.consultations.delete(&consultation_id) {
        info!("Consultation {} ended", consultation_id);
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found_error("Consultation not found", &consultation_id))
    }
}

fn validate_plan_request(request: &PlanRequestBody) -> Result<(), ApiError> {
    if request.symptoms.trim().is_empty() {
        return Err(bad_request_error("Symptoms are required"));
    }
    if let Some(document) = &request.lab_report {
        if !document.is_pdf() {
            return Err(bad_request_error("Lab report must be a PDF document"));
        }
    }
    Ok(())
}

async fn run_plan(
    State(state): State<AppState>,
    Path(consultation_id): Path<String>,
    Json(request): Json<PlanRequestBody>,
) -> ApiResult<PlanResponse> {
    validate_plan_request(&request)?;

    let consultation = state
        .consultations
        .get(&consultation_id)
        .ok_or_else(|| not_found_error("Consultation not found", &consultation_id))?;

    let span = info_span!("consultation", consultation_id = %consultation_id);
    let result = state
        .planner
        .plan(request.into_request(), consultation.transcript.clone())
        .instrument(span)
        .await;

    match result {
        Ok(outcome) => {
            let committed = state
                .consultations
                .commit(&consultation_id, consultation.revision, outcome.transcript.clone())
                .map_err(|e| commit_error(&consultation_id, e))?;

            Ok(Json(PlanResponse {
                consultation_id,
                run_id: outcome.run_id,
                status: "completed".to_string(),
                diagnosis: outcome.diagnosis,
                treatments: outcome.treatments,
                compatibility: outcome.compatibility,
                lab_content: outcome.lab_content,
                lab_summary: outcome.lab_summary,
                wiki_summary: outcome.wiki_summary,
                arxiv_summary: outcome.arxiv_summary,
                transcript: committed.transcript.as_text(),
                revision: committed.revision,
            }))
        }
        Err(failure) => {
            error!(
                "Plan for consultation {} failed: {}",
                consultation_id, failure
            );

            // an atomic failure hands back the stored transcript untouched
            let partial = state.planner.commit_policy() == TranscriptCommit::AppendAsYouGo
                && failure.transcript != consultation.transcript;
            if partial {
                if let Err(e) = state.consultations.commit(
                    &consultation_id,
                    consultation.revision,
                    failure.transcript.clone(),
                ) {
                    warn!("Could not record transcript after failed run: {}", e);
                }
            }

            Err((
                StatusCode::BAD_GATEWAY,
                Json(json!({
                    "error": "Workflow run failed",
                    "details": failure.source.to_string(),
                    "failed_stage": failure.failed_stage,
                    "run_id": failure.run_id,
                    "consultation_id": consultation_id
                })),
            ))
        }
    }
}

fn commit_error(consultation_id: &str, e: CommitError) -> ApiError {
    match e {
        CommitError::NotFound(_) => not_found_error("Consultation ended during the run", consultation_id),
        CommitError::Stale { current } => conflict_error(consultation_id, current),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{Collaborators, CompletionBackend};
    use crate::models::LabDocument;
    use crate::testing::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn app_with(model: Arc<StubModel>) -> (Router, AppState) {
        app_with_policy(model, TranscriptCommit::AtomicPerRun)
    }

    fn app_with_policy(model: Arc<StubModel>, commit: TranscriptCommit) -> (Router, AppState) {
        let planner = Planner::new(
            &collaborators_with(model, StubExtractor::returning("")),
            commit,
            TranscriptBudget::unbounded(),
        );
        let state = AppState::new(planner, TranscriptBudget::unbounded());
        (create_app(state.clone()), state)
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    #[tokio::test]
    async fn plans_accumulate_on_the_consultation() {
        let (app, _) = app_with(StubModel::echo());

        let (status, created) = send(&app, "POST", "/consultations", None).await;
        assert_eq!(status, StatusCode::CREATED);
        let id = created["consultation_id"].as_str().unwrap().to_string();

        let body = json!({
            "symptoms": "fever",
            "medical_history": "none",
            "current_medications": "none",
            "variant": "base"
        });
        let (status, plan) = send(&app, "POST", &format!("/consultations/{}/plan", id), Some(body.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert!(plan["diagnosis"].as_str().unwrap().contains("fever"));
        assert_eq!(plan["revision"], 1);
        assert!(plan.get("lab_summary").is_none());

        let (status, plan) = send(&app, "POST", &format!("/consultations/{}/plan", id), Some(body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(plan["revision"], 2);

        let (status, consultation) = send(&app, "GET", &format!("/consultations/{}", id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(consultation["entries"].as_array().unwrap().len(), 6);

        let (status, _) = send(&app, "DELETE", &format!("/consultations/{}", id), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&app, "GET", &format!("/consultations/{}", id), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn rejects_invalid_requests() {
        let (app, state) = app_with(StubModel::echo());
        let id = state.consultations.create().id;
        let uri = format!("/consultations/{}/plan", id);

        let (status, _) = send(&app, "POST", &uri, Some(json!({ "symptoms": "  " }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let lab = LabDocument::from_bytes("labs.docx", b"not a pdf");
        let (status, body) = send(
            &app,
            "POST",
            &uri,
            Some(json!({ "symptoms": "cough", "lab_report": lab })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Lab report must be a PDF document");

        let (status, _) = send(&app, "POST", "/consultations/missing/plan", Some(json!({ "symptoms": "cough" }))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn failed_run_reports_stage_and_keeps_transcript() {
        let (app, state) = app_with(StubModel::failing_on(COMPATIBILITY_MARKER));
        let id = state.consultations.create().id;

        let (status, body) = send(
            &app,
            "POST",
            &format!("/consultations/{}/plan", id),
            Some(json!({ "symptoms": "headache", "variant": "base" })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["failed_stage"], "compatibility");

        let consultation = state.consultations.get(&id).unwrap();
        assert!(consultation.transcript.is_empty());
        assert_eq!(consultation.revision, 0);
        assert_eq!(state.planner.active_runs(), 0);
    }

    #[tokio::test]
    async fn failed_append_run_commits_completed_stages() {
        let (app, state) = app_with_policy(
            StubModel::failing_on(COMPATIBILITY_MARKER),
            TranscriptCommit::AppendAsYouGo,
        );
        let id = state.consultations.create().id;

        let (status, _) = send(
            &app,
            "POST",
            &format!("/consultations/{}/plan", id),
            Some(json!({ "symptoms": "headache", "variant": "base" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);

        let consultation = state.consultations.get(&id).unwrap();
        assert_eq!(consultation.revision, 1);
        assert_eq!(consultation.transcript.entry_count(), 2);
    }

    /// Commits to the consultation while the diagnosis prompt is in flight,
    /// as an overlapping run on the same consultation would
    struct InterleavingModel {
        consultations: Arc<ConsultationStore>,
        consultation_id: String,
    }

    #[async_trait]
    impl CompletionBackend for InterleavingModel {
        async fn complete(&self, prompt: &str) -> anyhow::Result<String> {
            if prompt.contains(DIAGNOSIS_MARKER) {
                let current = self.consultations.get(&self.consultation_id).unwrap();
                let mut transcript = current.transcript.clone();
                transcript.record("Diagnosis", "from the other run");
                self.consultations
                    .commit(&self.consultation_id, current.revision, transcript)
                    .unwrap();
            }
            Ok(prompt.to_string())
        }
    }

    #[tokio::test]
    async fn overlapping_commit_is_rejected_as_conflict() {
        let consultations = Arc::new(ConsultationStore::new(TranscriptBudget::unbounded()));
        let id = consultations.create().id;

        let collaborators = Collaborators {
            model: Arc::new(InterleavingModel {
                consultations: consultations.clone(),
                consultation_id: id.clone(),
            }),
            ..stub_collaborators()
        };
        let planner = Planner::new(
            &collaborators,
            TranscriptCommit::AtomicPerRun,
            TranscriptBudget::unbounded(),
        );
        let state = AppState {
            planner: Arc::new(planner),
            consultations: consultations.clone(),
        };
        let app = create_app(state);

        let (status, body) = send(
            &app,
            "POST",
            &format!("/consultations/{}/plan", id),
            Some(json!({ "symptoms": "rash", "variant": "base" })),
        )
        .await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["revision"], 1);

        // only the other run's entry is stored
        let consultation = consultations.get(&id).unwrap();
        assert_eq!(consultation.revision, 1);
        assert_eq!(
            consultation.transcript.as_text(),
            "Diagnosis: from the other run"
        );
    }

    #[tokio::test]
    async fn health_and_root_respond() {
        let (app, _) = app_with(StubModel::echo());
        let (status, body) = send(&app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");

        let (status, body) = send(&app, "GET", "/", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["endpoints"].is_object());
    }
}
