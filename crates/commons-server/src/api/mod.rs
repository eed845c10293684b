mod auth;
mod communities;
mod invitations;
mod users;

use crate::state::AppState;
use axum::{
    Router,
    routing::{delete, get, patch, post},
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(|| async { "OK" }))
        // Auth routes
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        // User routes
        .route("/api/users/me", get(users::get_me))
        // Community routes
        .route("/api/communities", post(communities::create_community))
        .route("/api/communities", get(communities::list_communities))
        .route("/api/communities/{id}", get(communities::get_community))
        .route("/api/communities/{id}", patch(communities::update_community))
        // Membership routes
        .route("/api/communities/{id}/join", post(communities::join_community))
        .route("/api/communities/{id}/leave", delete(communities::leave_community))
        .route("/api/communities/{id}/members", get(communities::list_members))
        .route(
            "/api/communities/{id}/members/{member_id}",
            patch(communities::update_member_role),
        )
        .route(
            "/api/communities/{id}/members/{member_id}",
            delete(communities::remove_member),
        )
        // Join request routes
        .route("/api/communities/{id}/requests", get(communities::list_join_requests))
        .route(
            "/api/communities/{id}/requests/mine",
            delete(communities::cancel_my_request),
        )
        .route(
            "/api/communities/{id}/requests/{request_id}",
            post(communities::handle_join_request),
        )
        // Invitation routes
        .route("/api/communities/{id}/invitations", post(invitations::invite_user))
        .route(
            "/api/communities/{id}/invitations/bulk",
            post(invitations::bulk_invite),
        )
        .route("/api/invitations", get(invitations::list_my_invitations))
        .route("/api/invitations/{id}", post(invitations::respond))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
