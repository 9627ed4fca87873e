use axum::{
    extract::State,
    routing::{get, patch, put},
    Router,
};
use tracing::{info, instrument};

use super::{
    dto::{
        AdminUpdateRequest, AppointmentPage, CreateAppointmentRequest, ListAppointmentsQuery,
        StatusUpdateRequest, UpdateAppointmentRequest,
    },
    repo_types::Appointment,
    services,
};
use crate::{
    auth::{
        extractors::AuthUser,
        policy::{authorize, Action, Subject},
    },
    clock::now_wib,
    error::AppResult,
    response::{ApiJson, ApiPath, ApiQuery, ApiResponse},
    state::AppState,
};

pub fn appointment_routes() -> Router<AppState> {
    Router::new()
        .route("/appointment", get(list).post(create))
        .route("/appointment/:id", put(update).delete(delete))
        .route("/appointment/:id/admin", put(admin_update))
        .route("/appointment/:id/status", patch(update_status))
}

#[instrument(skip(state, payload), fields(actor = actor.user_id))]
pub async fn create(
    State(state): State<AppState>,
    actor: AuthUser,
    ApiJson(payload): ApiJson<CreateAppointmentRequest>,
) -> AppResult<ApiResponse<Appointment>> {
    authorize(&actor, Action::CreateAppointment, Subject::Unscoped)?;
    let appointment = services::create(&state.db, &actor, &payload, now_wib()).await?;
    Ok(ApiResponse::created(appointment, "Appointment created successfully"))
}

#[instrument(skip(state, query), fields(actor = actor.user_id))]
pub async fn list(
    State(state): State<AppState>,
    actor: AuthUser,
    ApiQuery(query): ApiQuery<ListAppointmentsQuery>,
) -> AppResult<ApiResponse<AppointmentPage>> {
    let page = services::list(&state.db, &actor, &query).await?;
    info!(total = page.pagination.total_items, "appointments listed");
    Ok(ApiResponse::ok(page, "Appointments retrieved successfully"))
}

#[instrument(skip(state, payload), fields(actor = actor.user_id))]
pub async fn update(
    State(state): State<AppState>,
    actor: AuthUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(payload): ApiJson<UpdateAppointmentRequest>,
) -> AppResult<ApiResponse<Appointment>> {
    authorize(&actor, Action::RescheduleAppointment, Subject::Unscoped)?;
    let appointment = services::update_by_patient(&state.db, &actor, id, &payload, now_wib()).await?;
    Ok(ApiResponse::ok(appointment, "Appointment updated successfully"))
}

#[instrument(skip(state, payload), fields(actor = actor.user_id))]
pub async fn admin_update(
    State(state): State<AppState>,
    actor: AuthUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(payload): ApiJson<AdminUpdateRequest>,
) -> AppResult<ApiResponse<Appointment>> {
    authorize(&actor, Action::OverrideAppointment, Subject::Unscoped)?;
    let appointment = services::update_by_admin(&state.db, &actor, id, &payload, now_wib()).await?;
    Ok(ApiResponse::ok(appointment, "Appointment updated successfully"))
}

#[instrument(skip(state, payload), fields(actor = actor.user_id))]
pub async fn update_status(
    State(state): State<AppState>,
    actor: AuthUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(payload): ApiJson<StatusUpdateRequest>,
) -> AppResult<ApiResponse<()>> {
    authorize(&actor, Action::ReviewAppointment, Subject::Unscoped)?;
    services::update_status(&state.db, &actor, id, payload.status).await?;
    Ok(ApiResponse::ok((), "Appointment status updated successfully"))
}

#[instrument(skip(state), fields(actor = actor.user_id))]
pub async fn delete(
    State(state): State<AppState>,
    actor: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<ApiResponse<()>> {
    authorize(&actor, Action::CancelAppointment, Subject::Unscoped)?;
    services::delete(&state.db, &actor, id).await?;
    Ok(ApiResponse::ok((), "Appointment deleted successfully"))
}
