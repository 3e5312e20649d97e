//! Job submission: the instant and background send operations.

use super::ApiClient;
use crate::models::{
    DispatchPayload, JobSubmitEnvelope, JobTicket, SendEnvelope, SendReceipt,
};
use crate::session::SessionContext;
use crate::types::{AppError, AppResult};
use chrono::Utc;
use tracing::{info, warn};

/// Submits dispatch requests to the mediator backend.
pub struct JobSubmitter {
    api: ApiClient,
    demo_fallback: bool,
}

impl JobSubmitter {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            demo_fallback: true,
        }
    }

    /// Control the unreachable-backend fallback for instant sends.
    pub fn with_demo_fallback(mut self, enabled: bool) -> Self {
        self.demo_fallback = enabled;
        self
    }

    /// One synchronous send; the backend relays to every recipient before
    /// responding.
    ///
    /// When the backend is unreachable and the fallback is enabled, the
    /// result is a locally synthesized receipt with `demo = true` and a
    /// "DEMO MODE" message — never an authoritative send.
    pub async fn send_instant(
        &self,
        session: &SessionContext,
        payload: &DispatchPayload,
    ) -> AppResult<SendReceipt> {
        let token = session.require_token()?;

        let response = match self
            .api
            .http()
            .post(self.api.url("/api/send-email"))
            .bearer_auth(token)
            .json(payload)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                if self.demo_fallback {
                    warn!("Backend not reachable, synthesizing demo result: {}", e);
                    return demo_receipt(payload);
                }
                return Err(AppError::Network(e.to_string()));
            }
        };

        if !response.status().is_success() {
            return Err(ApiClient::api_error(response, "failed to send emails").await);
        }

        let envelope: SendEnvelope = response
            .json()
            .await
            .map_err(|e| AppError::Dispatch(format!("failed to parse send response: {e}")))?;

        if !envelope.success {
            return Err(AppError::Dispatch(envelope.message));
        }

        let data = envelope.data.unwrap_or_default();
        info!(
            recipients = data.recipient_count,
            "Instant send accepted by backend"
        );

        Ok(SendReceipt {
            message: envelope.message,
            sent_count: data.recipient_count,
            message_id: data.message_id,
            timestamp: data.timestamp,
            server_info: envelope.server_info,
            demo: false,
        })
    }

    /// Queue a background job; returns the ticket whose `job_id` feeds the
    /// tracker. A 503-class response means the server pool has no capacity
    /// and is surfaced as [`AppError::Capacity`] so callers can retry.
    /// Transport failures propagate; there is no demo path here.
    pub async fn send_background(
        &self,
        session: &SessionContext,
        payload: &DispatchPayload,
    ) -> AppResult<JobTicket> {
        let token = session.require_token()?;

        let response = self
            .api
            .http()
            .post(self.api.url("/api/send-email-background"))
            .bearer_auth(token)
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 503 {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<crate::models::ErrorBody>(&body)
                .ok()
                .and_then(|b| b.message)
                .unwrap_or_else(|| {
                    "no servers available for background processing".to_string()
                });
            return Err(AppError::Capacity(message));
        }
        if !status.is_success() {
            return Err(
                ApiClient::api_error(response, "failed to create background email job").await,
            );
        }

        let envelope: JobSubmitEnvelope = response.json().await.map_err(|e| {
            AppError::Dispatch(format!("failed to parse background send response: {e}"))
        })?;

        let data = envelope.data.ok_or_else(|| {
            AppError::Dispatch("background send response had no job data".to_string())
        })?;
        info!(job_id = %data.job_id, total = data.total_emails, "Background job queued");

        Ok(JobTicket {
            job_id: data.job_id,
            status: data.status,
            total_emails: data.total_emails,
            estimated_completion_time: data.estimated_completion_time,
            message: envelope.message,
            server_info: envelope.server_info,
        })
    }
}

/// Locally synthesized instant-send result for when the backend is down.
/// Mirrors the relay's own credential checks so obviously-broken input
/// still fails, and tags the message so nothing downstream mistakes it
/// for a real send.
fn demo_receipt(payload: &DispatchPayload) -> AppResult<SendReceipt> {
    let sender = &payload.sender_email;
    if !sender.contains("@gmail.com") && !sender.contains("@googlemail.com") {
        return Err(AppError::Dispatch(
            "Please use a valid Gmail address".to_string(),
        ));
    }
    if payload.app_password.len() < 8 {
        return Err(AppError::Dispatch(
            "Gmail App Password should be at least 8 characters long".to_string(),
        ));
    }

    Ok(SendReceipt {
        message: format!(
            "DEMO MODE: would send emails from \"{}\" <{}> to {} recipients (backend not connected)",
            payload.sender_name,
            payload.sender_email,
            payload.recipients.len()
        ),
        sent_count: payload.recipients.len() as u32,
        message_id: Some(format!("demo-{}", uuid::Uuid::new_v4())),
        timestamp: Utc::now().to_rfc3339(),
        server_info: None,
        demo: true,
    })
}
