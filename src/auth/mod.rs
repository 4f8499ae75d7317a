use crate::state::AppState;
use axum::Router;

mod dto;
pub(crate) mod extractors;
pub mod handlers;
pub mod jwt;
pub mod model;
pub mod password;
pub mod reset;

pub fn router() -> Router<AppState> {
    handlers::auth_routes()
}
