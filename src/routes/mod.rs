pub mod health;
pub mod posts;

pub use posts::{Post, PostStore};

use crate::server::error::ApiError;
use axum::extract::OriginalUri;
use axum::http::Method;
use axum::routing::get;
use axum::Router;
use std::sync::Arc;

/// Routes are registered with the prefix spelled out instead of nested so
/// path parameters stay visible to the request pipeline.
pub fn router(prefix: &str, posts: Arc<PostStore>) -> Router {
    let prefix = prefix.trim_end_matches('/');

    Router::new()
        .route(&format!("{}/health", prefix), get(health::health))
        .route(
            &format!("{}/posts", prefix),
            get(posts::list_posts).post(posts::create_post),
        )
        .route(
            &format!("{}/posts/:id", prefix),
            get(posts::get_post).delete(posts::delete_post),
        )
        .with_state(posts)
        .fallback(unknown_route)
}

async fn unknown_route(method: Method, OriginalUri(uri): OriginalUri) -> ApiError {
    ApiError::NotFound(format!("Cannot {} {}", method, uri.path()))
}
