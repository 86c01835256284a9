pub mod admin;
pub mod auth;
pub mod courses;
pub mod dto;
pub mod learning;
pub mod middleware;
pub mod rest;
pub mod routes;
pub mod state;
pub mod submissions;

// Re-export what the binaries need to stand the server up.
pub use middleware::require_auth;
pub use routes::build_router;
pub use state::AppState;
