use axum::{Router, routing::get};

pub mod auth;
pub mod children;
pub mod families;
pub mod growth_records;
pub mod managers;
pub mod system;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/auth/me", get(auth::me))
        .nest("/managers", managers::router())
        .nest("/families", families::router())
        .nest("/children", children::router())
        .nest("/growth-records", growth_records::router())
}
