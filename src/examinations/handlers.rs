use axum::{extract::State, routing::post, Router};
use tracing::instrument;

use super::{dto::CreateExaminationRequest, repo_types::Examination, services};
use crate::{
    auth::{
        extractors::AuthUser,
        policy::{authorize, Action, Subject},
    },
    clock::now_wib,
    error::AppResult,
    response::{ApiJson, ApiResponse},
    state::AppState,
};

pub fn examination_routes() -> Router<AppState> {
    Router::new().route("/examination", post(create))
}

#[instrument(skip(state, payload), fields(actor = actor.user_id))]
pub async fn create(
    State(state): State<AppState>,
    actor: AuthUser,
    ApiJson(payload): ApiJson<CreateExaminationRequest>,
) -> AppResult<ApiResponse<Examination>> {
    authorize(&actor, Action::RecordExamination, Subject::Unscoped)?;
    payload.validate()?;

    let examination = services::create(&state.db, &actor, &payload, now_wib()).await?;
    Ok(ApiResponse::created(examination, "Examination result saved successfully"))
}
