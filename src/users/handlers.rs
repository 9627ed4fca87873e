use axum::{
    extract::State,
    routing::{delete, get, post, put},
    Router,
};
use tracing::{info, instrument};

use super::{
    dto::{CreateDoctorRequest, ListUsersQuery, UpdateDoctorRequest, UpdatePatientRequest, UserPage, UserProfile},
    repo_types::Role,
    services,
};
use crate::{
    auth::{
        extractors::AuthUser,
        policy::{authorize, Action, Subject},
    },
    error::AppResult,
    response::{ApiJson, ApiPath, ApiQuery, ApiResponse},
    state::AppState,
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/user", get(list_users))
        .route("/user/doctors", get(list_doctors))
        .route("/user/create-doctor", post(create_doctor))
        .route("/user/update-doctor/:user_id", put(update_doctor))
        .route("/user/update-patient/:user_id", put(update_patient))
        .route("/user/delete-doctor/:user_id", delete(delete_doctor))
        .route("/user/delete-patient/:user_id", delete(delete_patient))
        .route("/user/:user_id", get(get_user))
}

#[instrument(skip(state, payload), fields(actor = actor.user_id))]
pub async fn create_doctor(
    State(state): State<AppState>,
    actor: AuthUser,
    ApiJson(mut payload): ApiJson<CreateDoctorRequest>,
) -> AppResult<ApiResponse<UserProfile>> {
    authorize(&actor, Action::CreateDoctor, Subject::Unscoped)?;
    payload.normalize();
    payload.validate()?;

    let doctor = services::create_doctor(&state.db, &payload).await?;
    Ok(ApiResponse::created(doctor, "Doctor created successfully"))
}

#[instrument(skip(state, payload), fields(actor = actor.user_id))]
pub async fn update_doctor(
    State(state): State<AppState>,
    actor: AuthUser,
    ApiPath(user_id): ApiPath<i64>,
    ApiJson(mut payload): ApiJson<UpdateDoctorRequest>,
) -> AppResult<ApiResponse<()>> {
    authorize(&actor, Action::UpdateDoctor, Subject::Unscoped)?;
    payload.normalize();
    payload.validate()?;

    services::update_doctor(&state.db, &actor, user_id, &payload).await?;
    Ok(ApiResponse::ok((), "Doctor updated successfully"))
}

#[instrument(skip(state, payload), fields(actor = actor.user_id))]
pub async fn update_patient(
    State(state): State<AppState>,
    actor: AuthUser,
    ApiPath(user_id): ApiPath<i64>,
    ApiJson(mut payload): ApiJson<UpdatePatientRequest>,
) -> AppResult<ApiResponse<()>> {
    authorize(&actor, Action::UpdatePatient, Subject::Unscoped)?;
    payload.normalize();
    payload.validate()?;

    services::update_patient(&state.db, &actor, user_id, &payload).await?;
    Ok(ApiResponse::ok((), "Patient updated successfully"))
}

#[instrument(skip(state), fields(actor = actor.user_id))]
pub async fn delete_doctor(
    State(state): State<AppState>,
    actor: AuthUser,
    ApiPath(user_id): ApiPath<i64>,
) -> AppResult<ApiResponse<()>> {
    authorize(&actor, Action::DeleteDoctor, Subject::Unscoped)?;
    services::delete_doctor(&state.db, &actor, user_id).await?;
    Ok(ApiResponse::ok((), "Doctor deleted successfully"))
}

#[instrument(skip(state), fields(actor = actor.user_id))]
pub async fn delete_patient(
    State(state): State<AppState>,
    actor: AuthUser,
    ApiPath(user_id): ApiPath<i64>,
) -> AppResult<ApiResponse<()>> {
    authorize(&actor, Action::DeletePatient, Subject::Unscoped)?;
    services::delete_patient(&state.db, &actor, user_id).await?;
    Ok(ApiResponse::ok((), "Patient deleted successfully"))
}

#[instrument(skip(state, query), fields(actor = actor.user_id))]
pub async fn list_users(
    State(state): State<AppState>,
    actor: AuthUser,
    ApiQuery(query): ApiQuery<ListUsersQuery>,
) -> AppResult<ApiResponse<UserPage>> {
    authorize(&actor, Action::ListUsers, Subject::Unscoped)?;
    let page = services::list_users(&state.db, &query, None).await?;
    info!(total = page.pagination.total_items, "users listed");
    Ok(ApiResponse::ok(page, "Users retrieved successfully"))
}

#[instrument(skip(state, query), fields(actor = actor.user_id))]
pub async fn list_doctors(
    State(state): State<AppState>,
    actor: AuthUser,
    ApiQuery(query): ApiQuery<ListUsersQuery>,
) -> AppResult<ApiResponse<UserPage>> {
    authorize(&actor, Action::ListDoctors, Subject::Unscoped)?;
    let page = services::list_users(&state.db, &query, Some(Role::Doctor)).await?;
    Ok(ApiResponse::ok(page, "Doctors retrieved successfully"))
}

#[instrument(skip(state), fields(actor = actor.user_id))]
pub async fn get_user(
    State(state): State<AppState>,
    actor: AuthUser,
    ApiPath(user_id): ApiPath<i64>,
) -> AppResult<ApiResponse<UserProfile>> {
    let user = services::get_user(&state.db, &actor, user_id).await?;
    Ok(ApiResponse::ok(user, "User retrieved successfully"))
}
