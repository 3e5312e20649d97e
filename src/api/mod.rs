//! HTTP client layer for the mediator backend.
//!
//! [`ApiClient`] holds the shared transport (base URL + connection pool)
//! and the liveness/telemetry reads. The dispatch and job-tracking
//! operations live in their own modules:
//! - `dispatch` - instant and background sends
//! - `jobs` - job listing, lookup, pause/resume
//! - `registry` - the user's sending-server pool

pub mod dispatch;
pub mod jobs;
pub mod registry;

pub use dispatch::JobSubmitter;
pub use jobs::{JobTracker, SessionJobSource};
pub use registry::ServerRegistry;

use crate::config::BackendConfig;
use crate::models::{ErrorBody, HostTelemetry, StatusMessage, TelemetryEnvelope};
use crate::session::SessionContext;
use crate::types::{AppError, AppResult};
use reqwest::{Client, Response};

/// Shared transport for all backend calls.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &BackendConfig) -> Self {
        Self::new(config.base_url.clone())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn http(&self) -> &Client {
        &self.client
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Map a non-2xx response to the error taxonomy. The backend's own
    /// `message` is carried verbatim when the body supplies one; the
    /// caller's fallback covers bodies that don't.
    pub(crate) async fn api_error(response: Response, fallback: &str) -> AppError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(|b| b.message);

        match status.as_u16() {
            401 => AppError::Auth("expired. Please login again.".to_string()),
            404 => AppError::NotFound(message.unwrap_or_else(|| fallback.to_string())),
            _ => AppError::Dispatch(
                message.unwrap_or_else(|| format!("{fallback} ({status})")),
            ),
        }
    }

    /// Host telemetry snapshot. Display only.
    pub async fn server_info(&self, session: &SessionContext) -> AppResult<HostTelemetry> {
        let token = session.require_token()?;

        let response = self
            .client
            .get(self.url("/api/server-info"))
            .bearer_auth(token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::api_error(response, "failed to fetch server info").await);
        }

        let envelope: TelemetryEnvelope = response
            .json()
            .await
            .map_err(|e| AppError::Dispatch(format!("failed to parse server info: {e}")))?;

        envelope
            .data
            .ok_or_else(|| AppError::Dispatch("server info response had no data".to_string()))
    }

    /// Mediator liveness probe. Unauthenticated, non-authoritative for
    /// dispatch decisions.
    pub async fn health(&self) -> AppResult<StatusMessage> {
        let response = self.client.get(self.url("/api/health")).send().await?;
        response
            .json()
            .await
            .map_err(|e| AppError::Dispatch(format!("failed to parse health response: {e}")))
    }

    /// Worker liveness probe.
    pub async fn worker_health(&self, session: &SessionContext) -> AppResult<StatusMessage> {
        let token = session.require_token()?;

        let response = self
            .client
            .get(self.url("/api/worker/health"))
            .bearer_auth(token)
            .send()
            .await?;

        response
            .json()
            .await
            .map_err(|e| AppError::Dispatch(format!("failed to parse worker health: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::UserProfile;

    fn session() -> SessionContext {
        SessionContext::new("test-token", UserProfile::default())
    }

    #[tokio::test]
    async fn test_health_probe() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/api/health")
            .with_status(200)
            .with_body(r#"{"success": true, "message": "Email service is running"}"#)
            .create_async()
            .await;

        let api = ApiClient::new(server.url());
        let status = api.health().await.unwrap();
        assert!(status.success);
        assert_eq!(status.message, "Email service is running");
    }

    #[tokio::test]
    async fn test_server_info_requires_token_locally() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/server-info")
            .expect(0)
            .create_async()
            .await;

        let api = ApiClient::new(server.url());
        let err = api
            .server_info(&SessionContext::anonymous())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Authentication"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_server_info_parses_telemetry() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/api/server-info")
            .match_header("authorization", "Bearer test-token")
            .with_status(200)
            .with_body(
                r#"{
                    "success": true,
                    "message": "ok",
                    "data": {
                        "hostname": "mail-1",
                        "platform": "linux",
                        "primaryIp": "10.0.0.4",
                        "uptime": 3600.5,
                        "timestamp": "2025-03-01T10:00:00Z",
                        "newServerEmailCount": 1234
                    }
                }"#,
            )
            .create_async()
            .await;

        let api = ApiClient::new(server.url());
        let info = api.server_info(&session()).await.unwrap();
        assert_eq!(info.hostname, "mail-1");
        assert_eq!(info.primary_ip, "10.0.0.4");
        assert_eq!(info.email_count, 1234);
    }

    #[tokio::test]
    async fn test_expired_token_maps_to_auth_error() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/api/server-info")
            .with_status(401)
            .with_body(r#"{"success": false, "message": "Token expired"}"#)
            .create_async()
            .await;

        let api = ApiClient::new(server.url());
        let err = api.server_info(&session()).await.unwrap_err();
        assert!(matches!(err, AppError::Auth(_)));
    }
}
