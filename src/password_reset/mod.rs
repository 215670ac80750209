pub mod challenge;
mod dto;
pub mod handlers;
pub mod repo;
pub mod services;
pub mod session;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    handlers::reset_routes()
}
