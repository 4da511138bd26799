use crate::server::error::{ApiResult, Reply};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub version: &'static str,
}

pub async fn health() -> ApiResult<Health> {
    Ok(Reply::ok(Health {
        status: "ok",
        version: crate::VERSION,
    }))
}
