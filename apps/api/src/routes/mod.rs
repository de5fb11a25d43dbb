pub mod health;
pub mod ui;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::analysis::handlers as analysis;
use crate::session::handlers as session;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(ui::index_handler))
        .route("/health", get(health::health_handler))
        // Session lifecycle
        .route("/api/v1/sessions", post(session::handle_create_session))
        .route(
            "/api/v1/sessions/:id",
            get(session::handle_get_session).delete(session::handle_end_session),
        )
        .route(
            "/api/v1/sessions/:id/credential",
            put(session::handle_set_credential),
        )
        // Experience store
        .route(
            "/api/v1/sessions/:id/experiences",
            get(session::handle_list_experiences)
                .post(session::handle_add_experience)
                .delete(session::handle_remove_experience),
        )
        // Analysis run
        .route(
            "/api/v1/sessions/:id/analysis",
            post(analysis::handle_run_analysis),
        )
        .route(
            "/api/v1/sessions/:id/artifacts/:filename",
            get(analysis::handle_download_artifact),
        )
        .with_state(state)
}
