mod chat;
mod handlers;
mod helpers;
mod problems;

#[cfg(test)]
mod tests;

use axum::{routing::get, routing::post, Router};

use crate::core::state::AppState;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::create_or_resume))
        .route("/:code", get(handlers::get_session))
        .route("/:code/close", post(handlers::close_session))
        .route("/:code/transcript", get(handlers::get_transcript))
        .route("/:code/problems", post(problems::submit_problem))
        .route("/:code/problems/image", post(problems::upload_problem_image))
        .route("/:code/problems/:problem_id/select", post(problems::select_problem))
        .route("/:code/problems/:problem_id/similar", get(problems::similar_problems))
        .route("/:code/chat", post(chat::send_message))
}
