// src/routes.rs

use axum::{
    Router, http::Method,
    middleware,
    routing::{get, post},
};
use tower::Layer;
use tower_http::{cors::CorsLayer, normalize_path::NormalizePathLayer, trace::TraceLayer};

use crate::{
    handlers::{attempt, auth, profile, quiz},
    state::AppState,
    utils::jwt::auth_middleware,
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, profile, quizzes, attempts).
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (pool, config, text provider).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        "http://localhost:3000".parse().unwrap(),
        "http://127.0.0.1:3000".parse().unwrap(),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login));

    let profile_routes = Router::new()
        .route("/me", get(profile::get_me))
        .route(
            "/interests",
            get(profile::list_interests).put(profile::update_interests),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let quiz_routes = Router::new()
        .route("/", get(quiz::list_quizzes))
        .route("/{id}", get(quiz::get_quiz).delete(quiz::delete_quiz))
        .route("/generate", post(quiz::generate_quiz))
        .route(
            "/generate/personalized",
            post(quiz::generate_personalized),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let attempt_routes = Router::new()
        .route("/", post(attempt::start_attempt).get(attempt::list_attempts))
        .route("/{id}", get(attempt::get_attempt))
        .route("/{id}/answers", post(attempt::submit_answer))
        .route("/{id}/complete", post(attempt::complete_attempt))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let router = Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/quizzes", quiz_routes)
        .nest("/api/attempts", attempt_routes)
        .nest("/api/profile", profile_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state);

    // Collection roots are addressed with a trailing slash (e.g.
    // `/api/attempts/`); normalize the path before routing so both the
    // slashed and unslashed forms reach the same handlers.
    let normalized = NormalizePathLayer::trim_trailing_slash().layer(router);
    Router::new().fallback_service(normalized)
}
