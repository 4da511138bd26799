use crate::server::error::{ApiError, ApiResult, FieldError, Reply};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use chrono::{SecondsFormat, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

const MAX_TITLE_LEN: usize = 200;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: u64,
    pub title: String,
    pub content: String,
    pub created_at: String,
}

/// Raw create body. Fields stay untyped so bad input becomes a field error
/// rather than a deserialization rejection.
#[derive(Debug, Default, Deserialize)]
pub struct CreatePost {
    pub title: Option<Value>,
    pub content: Option<Value>,
}

impl CreatePost {
    fn validate(self) -> Result<(String, String), ApiError> {
        let mut errors = Vec::new();

        let title = match self.title {
            Some(Value::String(title)) if title.trim().is_empty() => {
                errors.push(FieldError::new("title", "title should not be empty"));
                None
            }
            Some(Value::String(title)) if title.chars().count() > MAX_TITLE_LEN => {
                errors.push(FieldError::new(
                    "title",
                    format!("title must be shorter than or equal to {} characters", MAX_TITLE_LEN),
                ));
                None
            }
            Some(Value::String(title)) => Some(title),
            None | Some(Value::Null) => {
                errors.push(FieldError::new("title", "title should not be empty"));
                None
            }
            Some(_) => {
                errors.push(FieldError::new("title", "title must be a string"));
                None
            }
        };

        let content = match self.content {
            Some(Value::String(content)) => Some(content),
            None | Some(Value::Null) => {
                errors.push(FieldError::new("content", "content should not be empty"));
                None
            }
            Some(_) => {
                errors.push(FieldError::new("content", "content must be a string"));
                None
            }
        };

        match (title, content) {
            (Some(title), Some(content)) if errors.is_empty() => Ok((title, content)),
            _ => Err(ApiError::Validation(errors)),
        }
    }
}

#[derive(Debug, Default)]
pub struct PostStore {
    posts: RwLock<BTreeMap<u64, Post>>,
    next_id: AtomicU64,
}

impl PostStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, title: String, content: String) -> Post {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let post = Post {
            id,
            title,
            content,
            created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        };
        self.posts.write().insert(id, post.clone());
        post
    }

    pub fn get(&self, id: u64) -> Option<Post> {
        self.posts.read().get(&id).cloned()
    }

    pub fn list(&self) -> Vec<Post> {
        self.posts.read().values().cloned().collect()
    }

    pub fn remove(&self, id: u64) -> Option<Post> {
        self.posts.write().remove(&id)
    }
}

fn parse_id(raw: &str) -> Result<u64, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest("Validation failed (numeric string is expected)".to_string()))
}

fn not_found(id: u64) -> ApiError {
    ApiError::NotFound(format!("Post with ID {} not found", id))
}

pub async fn list_posts(State(store): State<Arc<PostStore>>) -> ApiResult<Vec<Post>> {
    Ok(Reply::ok(store.list()))
}

pub async fn get_post(
    State(store): State<Arc<PostStore>>,
    Path(id): Path<String>,
) -> ApiResult<Post> {
    let id = parse_id(&id)?;
    store.get(id).map(Reply::ok).ok_or_else(|| not_found(id))
}

pub async fn create_post(
    State(store): State<Arc<PostStore>>,
    body: Result<Json<CreatePost>, JsonRejection>,
) -> ApiResult<Post> {
    let Json(body) = body.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    let (title, content) = body.validate()?;
    Ok(Reply::created(store.create(title, content)))
}

pub async fn delete_post(
    State(store): State<Arc<PostStore>>,
    Path(id): Path<String>,
) -> ApiResult<Post> {
    let id = parse_id(&id)?;
    store.remove(id).map(Reply::ok).ok_or_else(|| not_found(id))
}
