pub mod access_log;
pub mod envelope;
pub mod error;
pub mod pipeline;
pub mod request_id;
pub mod shutdown;

pub use access_log::AccessLog;
pub use envelope::{wrap, wrap_error, ResponseEnvelope};
pub use error::{ApiError, ApiResult, FieldError, Reply};
pub use pipeline::{Completion, Pipeline, RequestContext, Stage};
pub use request_id::RequestId;

use crate::config::Config;
use crate::logging::{retention, LogSink, Redactor};
use crate::routes::{self, PostStore};
use anyhow::{Context, Result};
use axum::http::HeaderName;
use axum::middleware::from_fn_with_state;
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::info;

#[derive(Clone)]
pub struct Server {
    config: Arc<Config>,
    sink: Arc<LogSink>,
    header: HeaderName,
    pipeline: Arc<Pipeline>,
    posts: Arc<PostStore>,
}

impl Server {
    pub fn new(config: Config, sink: Arc<LogSink>) -> Result<Self> {
        let header = HeaderName::from_bytes(config.correlation.header.as_bytes())
            .with_context(|| format!("Invalid correlation header: {}", config.correlation.header))?;

        let pipeline = Pipeline::new(config.server.body_limit)
            .with_redactor(Redactor::new(&config.redaction))
            .with_stage(Arc::new(AccessLog::new(Arc::clone(&sink), &config)));

        Ok(Self {
            config: Arc::new(config),
            sink,
            header,
            pipeline: Arc::new(pipeline),
            posts: Arc::new(PostStore::new()),
        })
    }

    pub fn posts(&self) -> &Arc<PostStore> {
        &self.posts
    }

    /// Application routes wrapped, outermost first, in HTTP tracing,
    /// correlation id assignment and the request pipeline.
    pub fn router(&self) -> Router {
        routes::router(&self.config.server.prefix, Arc::clone(&self.posts)).layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(from_fn_with_state(self.header.clone(), request_id::assign_request_id))
                .layer(from_fn_with_state(Arc::clone(&self.pipeline), pipeline::run_pipeline)),
        )
    }

    pub async fn serve(self) -> Result<()> {
        let addr = format!("{}:{}", self.config.server.host, self.config.server.port);
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind to {}", addr))?;

        let interval = self.config.logging.prune_interval_secs;
        let retention_task = (interval > 0).then(|| {
            retention::spawn_retention_task(Arc::clone(&self.sink), Duration::from_secs(interval))
        });

        info!(
            "Listening on http://{} (prefix \"{}\", environment {})",
            addr, self.config.server.prefix, self.config.environment
        );

        let app = self.router();
        axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
            .with_graceful_shutdown(shutdown::shutdown_signal())
            .await
            .context("HTTP server error")?;

        if let Some(task) = retention_task {
            task.abort();
        }
        info!("Server stopped");
        Ok(())
    }
}
