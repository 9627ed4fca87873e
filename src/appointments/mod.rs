use crate::state::AppState;
use axum::Router;

pub mod dto;
pub mod handlers;
pub mod repo;
pub mod repo_types;
pub mod services;
pub mod status;

pub fn router() -> Router<AppState> {
    handlers::appointment_routes()
}
