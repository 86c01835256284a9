//! services/api/src/web/routes.rs
//!
//! Assembles the full HTTP application: public and session-protected routes,
//! CORS, request tracing and the Swagger UI.

use axum::{
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::ConfigError;
use crate::error::ApiError;
use crate::web::{
    admin, auth, courses, learning, middleware::require_auth, rest, state::AppState, submissions,
};

/// Builds the router for the given state.
pub fn build_router(app_state: Arc<AppState>) -> Result<Router, ApiError> {
    let origin = app_state
        .config
        .cors_origin
        .parse::<HeaderValue>()
        .map_err(|e| ConfigError::InvalidValue("CORS_ORIGIN".to_string(), e.to_string()))?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(rest::health_handler))
        .route("/auth/signup", post(auth::signup_handler))
        .route("/auth/login", post(auth::login_handler))
        .route("/auth/logout", post(auth::logout_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/me", get(auth::me_handler))
        .route("/me/courses", get(learning::my_courses_handler))
        .route("/me/submissions", get(submissions::my_submissions_handler))
        .route(
            "/courses",
            get(courses::list_courses_handler).post(courses::create_course_handler),
        )
        .route(
            "/courses/{course_id}",
            get(courses::get_course_handler).delete(courses::delete_course_handler),
        )
        .route(
            "/courses/{course_id}/chapters",
            get(courses::list_chapters_handler).post(courses::add_chapter_handler),
        )
        .route(
            "/courses/{course_id}/enroll",
            post(learning::enroll_handler).delete(learning::unenroll_handler),
        )
        .route(
            "/courses/{course_id}/progress",
            get(learning::get_progress_handler),
        )
        .route(
            "/courses/{course_id}/chapters/{chapter_id}/progress",
            post(learning::record_progress_handler),
        )
        .route(
            "/courses/{course_id}/chapters/{chapter_id}/quiz",
            post(learning::quiz_handler),
        )
        .route(
            "/courses/{course_id}/chapters/{chapter_id}/submissions",
            post(submissions::submit_handler),
        )
        .route(
            "/courses/{course_id}/chapters/{chapter_id}/submission",
            get(submissions::submission_status_handler),
        )
        .route("/submissions/queue", get(submissions::review_queue_handler))
        .route(
            "/submissions/{submission_id}",
            put(submissions::update_submission_handler),
        )
        .route(
            "/submissions/{submission_id}/assign",
            post(submissions::assign_handler),
        )
        .route(
            "/submissions/{submission_id}/review",
            post(submissions::review_handler),
        )
        .route("/admin/users", get(admin::list_users_handler))
        .route("/admin/users/{user_id}/role", put(admin::set_role_handler))
        .route(
            "/admin/users/{user_id}/suspension",
            put(admin::set_suspension_handler),
        )
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    let api_router = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state);

    Ok(Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", rest::ApiDoc::openapi())))
}
