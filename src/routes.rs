// src/routes.rs

use axum::{
    Router, http::Method, middleware,
    routing::{delete, get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{admin, auth, exams, practice, profile, saved_questions, test_session},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware},
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, exams, practice, tests, admin).
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (Database Pool, Config, Session Store).
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

    let exam_routes = Router::new().route("/", get(exams::list_exam_configs));

    let practice_routes = Router::new()
        .route("/", post(practice::start_practice))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let test_routes = Router::new()
        .route("/", post(test_session::start_test))
        .route(
            "/current",
            get(test_session::current_session).delete(test_session::discard_session),
        )
        .route("/answers", post(test_session::record_answer))
        .route("/review", post(test_session::toggle_review))
        .route("/submit", post(test_session::submit_test))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let question_routes = Router::new()
        .route("/{id}/save", post(test_session::save_question))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let saved_routes = Router::new()
        .route("/", get(saved_questions::list_saved))
        .route("/{id}", delete(saved_questions::delete_saved))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let profile_routes = Router::new()
        .route("/", get(profile::get_profile).put(profile::update_profile))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let admin_routes = Router::new()
        .route("/users", get(admin::list_users))
        .route("/users/{id}", delete(admin::delete_user))
        .route("/users/{id}/tokens", put(admin::grant_tokens))
        .route("/users/{id}/account-type", put(admin::set_account_type))
        .route(
            "/questions",
            get(admin::list_questions).post(admin::create_question),
        )
        .route("/questions/bulk", post(admin::bulk_upload))
        .route(
            "/questions/{id}",
            put(admin::update_question).delete(admin::delete_question),
        )
        .route("/exams", post(admin::create_exam_config))
        .route(
            "/exams/{id}",
            put(admin::update_exam_config).delete(admin::delete_exam_config),
        )
        // Double middleware protection: Auth first, then Admin check
        .layer(middleware::from_fn(admin_middleware))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/exams", exam_routes)
        .nest("/api/practice", practice_routes)
        .nest("/api/tests", test_routes)
        .nest("/api/questions", question_routes)
        .nest("/api/saved-questions", saved_routes)
        .nest("/api/profile", profile_routes)
        .nest("/api/admin", admin_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
