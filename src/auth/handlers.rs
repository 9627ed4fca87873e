use axum::{
    extract::{FromRef, State},
    routing::post,
    Router,
};
use tracing::instrument;

use super::{
    dto::{AuthResponse, LoginRequest},
    jwt::JwtKeys,
    services,
};
use crate::{
    error::AppResult,
    response::{ApiJson, ApiResponse},
    state::AppState,
    users::dto::RegisterPatientRequest,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register-patient", post(register_patient))
        .route("/auth/login", post(login))
}

#[instrument(skip(state, payload))]
pub async fn register_patient(
    State(state): State<AppState>,
    ApiJson(mut payload): ApiJson<RegisterPatientRequest>,
) -> AppResult<ApiResponse<AuthResponse>> {
    payload.normalize();
    payload.validate()?;

    let keys = JwtKeys::from_ref(&state);
    let res = services::register_patient(&state.db, &keys, &payload).await?;
    Ok(ApiResponse::created(res, "Patient registered successfully"))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(mut payload): ApiJson<LoginRequest>,
) -> AppResult<ApiResponse<AuthResponse>> {
    payload.normalize();
    payload.validate()?;

    let keys = JwtKeys::from_ref(&state);
    let res = services::login(&state.db, &keys, &payload.email, &payload.password).await?;
    Ok(ApiResponse::ok(res, "Login successful"))
}
