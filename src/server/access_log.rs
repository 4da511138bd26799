use super::pipeline::{Completion, RequestContext, Stage};
use crate::config::Config;
use crate::logging::{clock, LogCategory, LogRecord, LogSink, Redactor, ACCESS_TARGET};
use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info};

/// One record when a request arrives and one when it completes.
pub struct AccessLog {
    sink: Arc<LogSink>,
    redactor: Redactor,
    /// Copy records to the console. Off in production unless the
    /// application file is disabled, so request lines stay visible.
    mirror_console: bool,
    /// Console copies as JSON objects instead of file lines
    json_console: bool,
    /// Write request/response records to the application file
    application_file: bool,
}

impl AccessLog {
    pub fn new(sink: Arc<LogSink>, config: &Config) -> Self {
        Self {
            sink,
            redactor: Redactor::new(&config.redaction),
            mirror_console: !config.environment.is_production() || !config.logging.application_file,
            json_console: config.logging.format == "json",
            application_file: config.logging.application_file,
        }
    }

    fn timestamp(&self, instant: chrono::DateTime<Utc>) -> String {
        clock::format_timestamp(instant, self.sink.options().utc_offset_hours)
    }

    fn emit(&self, record: &LogRecord, categories: &[LogCategory]) {
        let line = record.to_line(&self.redactor);
        for category in categories {
            self.sink.write(*category, &line);
        }

        if !self.mirror_console {
            return;
        }
        let text = if self.json_console {
            record.to_json(&self.redactor)
        } else {
            line
        };
        match record.kind {
            crate::logging::RecordKind::Error => error!(target: ACCESS_TARGET, "{}", text),
            _ => info!(target: ACCESS_TARGET, "{}", text),
        }
    }

    fn application(&self) -> &'static [LogCategory] {
        if self.application_file {
            &[LogCategory::Application]
        } else {
            &[]
        }
    }
}

impl Stage for AccessLog {
    fn on_request(&self, ctx: &RequestContext) {
        let record = LogRecord::request(
            self.timestamp(ctx.arrived_at),
            ctx.request_id.clone(),
            ctx.method.clone(),
            ctx.url.clone(),
        )
        .with_client(ctx.remote_addr.clone(), ctx.user_agent.clone())
        .with_payload(ctx.payload.clone());

        self.emit(&record, self.application());
    }

    fn on_response(&self, ctx: &RequestContext, done: &Completion<'_>) {
        let record = LogRecord::response(
            self.timestamp(Utc::now()),
            ctx.request_id.clone(),
            ctx.method.clone(),
            ctx.url.clone(),
            done.envelope.code,
            done.elapsed_ms,
        )
        .with_client(ctx.remote_addr.clone(), ctx.user_agent.clone())
        .with_response(done.envelope.data.clone());

        self.emit(&record, self.application());
    }

    fn on_error(&self, ctx: &RequestContext, done: &Completion<'_>) {
        let message = done.cause.unwrap_or(&done.envelope.message).to_string();
        let record = LogRecord::error(
            self.timestamp(Utc::now()),
            ctx.request_id.clone(),
            ctx.method.clone(),
            ctx.url.clone(),
            done.envelope.code,
            done.elapsed_ms,
            message,
        )
        .with_client(ctx.remote_addr.clone(), ctx.user_agent.clone())
        .with_payload(ctx.payload.clone())
        .with_response(done.envelope.data.clone());

        // Error file always; duplicated into the general stream so a
        // request can be read back in order.
        if self.application_file {
            self.emit(&record, &[LogCategory::Error, LogCategory::Application]);
        } else {
            self.emit(&record, &[LogCategory::Error]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Environment;
    use crate::logging::SinkOptions;
    use crate::server::envelope::{wrap, wrap_error};
    use crate::server::error::ApiError;
    use axum::http::StatusCode;
    use serde_json::json;
    use crate::logging::SinkLayer;
    use parking_lot::Mutex;
    use std::fs;
    use std::path::Path;
    use std::time::Duration;
    use tracing::{Event, Subscriber};
    use tracing_subscriber::layer::{Context, SubscriberExt};
    use tracing_subscriber::Layer;

    /// Records the target of every event it sees.
    #[derive(Clone, Default)]
    struct Targets(Arc<Mutex<Vec<String>>>);

    impl<S: Subscriber> Layer<S> for Targets {
        fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
            self.0.lock().push(event.metadata().target().to_string());
        }
    }

    impl Targets {
        fn access_events(&self) -> usize {
            self.0.lock().iter().filter(|t| t.as_str() == ACCESS_TARGET).count()
        }
    }

    /// Runs one request/response pair with a console subscriber installed
    /// that also carries the file bridge.
    fn run_with_console(sink: &Arc<LogSink>, stage: &AccessLog) -> Targets {
        let targets = Targets::default();
        let subscriber = tracing_subscriber::registry()
            .with(targets.clone())
            .with(SinkLayer::new(Arc::clone(sink), false));

        tracing::subscriber::with_default(subscriber, || {
            let ctx = RequestContext::new("req-4", "GET", "/health");
            stage.on_request(&ctx);
            let envelope = wrap(json!({"status": "ok"}), "req-4", StatusCode::OK);
            stage.on_response(
                &ctx,
                &Completion { envelope: &envelope, elapsed_ms: 2, cause: None },
            );
        });
        targets
    }

    fn setup(dir: &Path, application_file: bool) -> (Arc<LogSink>, AccessLog) {
        setup_in(dir, Environment::Production, application_file)
    }

    fn setup_in(
        dir: &Path,
        environment: Environment,
        application_file: bool,
    ) -> (Arc<LogSink>, AccessLog) {
        let options = SinkOptions {
            directory: dir.to_path_buf(),
            max_file_size: 1024 * 1024,
            retention: Duration::from_secs(86400),
            utc_offset_hours: Some(0),
        };
        let (sink, _) = LogSink::open(options).unwrap();
        let sink = Arc::new(sink);

        let mut config = Config::default();
        config.environment = environment;
        config.logging.application_file = application_file;

        let stage = AccessLog::new(Arc::clone(&sink), &config);
        (sink, stage)
    }

    fn read(sink: &LogSink, category: LogCategory) -> Vec<String> {
        let path = sink.path_for(category, clock::local_date(Utc::now(), Some(0)));
        fs::read_to_string(path)
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_request_then_response() {
        let dir = tempfile::tempdir().unwrap();
        let (sink, stage) = setup(dir.path(), true);

        let mut ctx = RequestContext::new("req-1", "GET", "/posts/5");
        ctx.payload = Some(json!({"id": "5"}));
        stage.on_request(&ctx);

        let envelope = wrap(json!({"id": 5, "title": "t"}), "req-1", StatusCode::OK);
        stage.on_response(
            &ctx,
            &Completion { envelope: &envelope, elapsed_ms: 3, cause: None },
        );

        let lines = read(&sink, LogCategory::Application);
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with(r#",req-1,GET,/posts/5,-,-,payload:{"id":"5"}"#));
        assert!(lines[1].contains(",req-1,GET,/posts/5,200,3ms,response:"));
        assert!(read(&sink, LogCategory::Error).is_empty());
    }

    #[test]
    fn test_error_written_to_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let (sink, stage) = setup(dir.path(), true);

        let mut ctx = RequestContext::new("req-2", "POST", "/auth/login");
        ctx.payload = Some(json!({"username": "a", "password": "secret123"}));
        stage.on_request(&ctx);

        let envelope = wrap_error(&ApiError::Unauthorized, "req-2", &Redactor::default());
        stage.on_error(
            &ctx,
            &Completion { envelope: &envelope, elapsed_ms: 1, cause: Some("Unauthorized") },
        );

        let application = read(&sink, LogCategory::Application);
        let errors = read(&sink, LogCategory::Error);
        assert_eq!(application.len(), 2);
        assert_eq!(errors.len(), 1);
        assert_eq!(application[1], errors[0]);
        assert!(errors[0].contains(",401,1ms,"));
        assert!(errors[0].ends_with(",error:Unauthorized"));

        for line in application.iter().chain(&errors) {
            assert!(!line.contains("secret123"));
        }
    }

    #[test]
    fn test_minimal_variant_still_files_errors() {
        let dir = tempfile::tempdir().unwrap();
        let (sink, stage) = setup(dir.path(), false);

        let ctx = RequestContext::new("req-3", "GET", "/posts/9");
        stage.on_request(&ctx);
        let err = ApiError::NotFound("Post with ID 9 not found".into());
        let envelope = wrap_error(&err, "req-3", &Redactor::default());
        stage.on_error(
            &ctx,
            &Completion { envelope: &envelope, elapsed_ms: 0, cause: None },
        );

        assert!(read(&sink, LogCategory::Application).is_empty());
        let errors = read(&sink, LogCategory::Error);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].ends_with(",error:Post with ID 9 not found"));
    }

    #[test]
    fn test_development_mirrors_to_console_once() {
        let dir = tempfile::tempdir().unwrap();
        let (sink, stage) = setup_in(dir.path(), Environment::Development, true);

        let targets = run_with_console(&sink, &stage);

        assert_eq!(targets.access_events(), 2);
        // The file bridge skips the mirrored copies.
        assert_eq!(read(&sink, LogCategory::Application).len(), 2);
    }

    #[test]
    fn test_production_does_not_mirror() {
        let dir = tempfile::tempdir().unwrap();
        let (sink, stage) = setup_in(dir.path(), Environment::Production, true);

        let targets = run_with_console(&sink, &stage);

        assert_eq!(targets.access_events(), 0);
        assert_eq!(read(&sink, LogCategory::Application).len(), 2);
    }

    #[test]
    fn test_production_minimal_variant_mirrors() {
        let dir = tempfile::tempdir().unwrap();
        let (sink, stage) = setup_in(dir.path(), Environment::Production, false);

        let targets = run_with_console(&sink, &stage);

        assert_eq!(targets.access_events(), 2);
        assert!(read(&sink, LogCategory::Application).is_empty());
    }
}
