//! Membership Server - HTTP API over the membership service
//!
//! Exposes scheme setup, benefit and beneficiary registration and benefit
//! processing under `/api/v1/membership`, plus `/health`.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod server;

pub use error::*;
pub use server::MembershipServer;

use axum::{
    http::{header, Method},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub fn create_cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT, header::AUTHORIZATION])
}

/// Create the main application router with all routes and middleware
pub fn create_app(server: MembershipServer) -> Router {
    routes::create_routes()
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(create_cors_layer()),
        )
        .with_state(server)
}
