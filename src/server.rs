use std::net::SocketAddr;
use std::sync::Arc;

use axum::{Router, extract::State, http::StatusCode, routing::post};

use crate::config::AppConfig;
use crate::pipeline::{Invocation, Outcome, Pipeline};

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Pipeline,
    pub config: AppConfig,
}

impl AppState {
    fn invocation(&self) -> Invocation {
        Invocation {
            config_path: self.config.config_path.clone(),
            service_account_path: self.config.service_account_path.clone(),
            scratch_root: self.config.scratch_root.clone(),
            today: chrono::Local::now().date_naive(),
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", post(trigger_handler))
        .with_state(state)
}

/// Runs one invocation. The status code is the only thing the caller learns.
async fn trigger_handler(State(state): State<Arc<AppState>>) -> StatusCode {
    match state.pipeline.run(&state.invocation()).await {
        Outcome::Sent => StatusCode::OK,
        Outcome::Failed => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub async fn serve(state: AppState) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], state.config.port));
    let app = router(Arc::new(state));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::RecordingSink;
    use crate::services::ecb::{FetchError, RateSource};
    use crate::services::mailer::{Mailer, NotifyError, SmtpServer};
    use crate::services::secrets::{Credentials, SecretStore, SecretVersion};
    use crate::errors::AppError;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Method, Request};
    use chrono::NaiveDate;
    use std::path::PathBuf;
    use tower::ServiceExt;

    struct Unreachable;

    #[async_trait]
    impl RateSource for Unreachable {
        async fn daily_series(&self, _: &str, _: NaiveDate) -> Result<String, FetchError> {
            Err(FetchError::Timeout)
        }
    }

    #[async_trait]
    impl SecretStore for Unreachable {
        async fn access(
            &self,
            _: Option<&Credentials>,
            _: &SecretVersion,
        ) -> Result<String, AppError> {
            Err(AppError::SecretStore("unreachable".into()))
        }
    }

    #[async_trait]
    impl Mailer for Unreachable {
        async fn send(&self, _: &SmtpServer, _: lettre::Message) -> Result<(), NotifyError> {
            Err(NotifyError::Smtp("unreachable".into()))
        }
    }

    fn state() -> Arc<AppState> {
        let config = AppConfig::from_lookup(|key| {
            (key == "EXCHANGE_RATES_CONFIG").then(|| "/nonexistent/config.json".to_string())
        });
        Arc::new(AppState {
            pipeline: Pipeline {
                rates: Arc::new(Unreachable),
                secrets: Arc::new(Unreachable),
                mailer: Arc::new(Unreachable),
                log: Arc::new(RecordingSink::new()),
            },
            config,
        })
    }

    #[test]
    fn invocation_uses_configured_paths() {
        let invocation = state().invocation();
        assert_eq!(invocation.config_path, PathBuf::from("/nonexistent/config.json"));
        assert_eq!(invocation.service_account_path, PathBuf::from("service_account.json"));
    }

    #[tokio::test]
    async fn failed_run_answers_500_with_empty_body() {
        let response = router(state())
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn only_post_is_routed() {
        let response = router(state())
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
