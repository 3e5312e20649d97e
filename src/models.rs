use crate::types::JobStatus;
use chrono::{DateTime, Utc};

// Wire models match the mediator backend's camelCase JSON contract.

/// Weak reference to the sending server attached to a dispatch response
/// or a job record. Display only.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerRef {
    pub server_id: String,
    pub server_name: String,
    pub server_url: String,
}

/// One background dispatch request as tracked by the backend.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailJob {
    pub job_id: String,
    pub status: JobStatus,
    pub total_emails: u32,
    #[serde(default)]
    pub sent_emails: u32,
    #[serde(default)]
    pub failed_emails: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Advisory only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_completion_time: Option<String>,
    /// Backend-computed percentage, 0..=100.
    #[serde(default)]
    pub progress: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_info: Option<ServerRef>,
}

impl EmailJob {
    /// Percentage shown in progress gauges. The backend's own figure wins;
    /// the local computation only covers snapshots that omit it.
    pub fn display_progress(&self) -> u8 {
        if let Some(p) = self.progress {
            return p.clamp(0.0, 100.0).round() as u8;
        }
        if self.total_emails == 0 {
            return 0;
        }
        let done = (self.sent_emails + self.failed_emails) as f64;
        ((done / self.total_emails as f64) * 100.0).clamp(0.0, 100.0).round() as u8
    }
}

/// One sending endpoint owned by the acting user.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerDescriptor {
    pub server_id: String,
    pub server_name: String,
    pub server_url: String,
    #[serde(default)]
    pub server_ip: String,
    /// Health flag.
    #[serde(default)]
    pub is_active: bool,
    /// Advisory concurrency flag.
    #[serde(default)]
    pub is_busy: bool,
    /// Cumulative sent counter, monotonic non-decreasing as observed.
    #[serde(default)]
    pub email_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uptime: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<String>,
}

/// Snapshot of the servers available to the authenticated user.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerList {
    #[serde(default)]
    pub servers: Vec<ServerDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_server_id: Option<String>,
}

impl ServerList {
    /// The designated default server, when the id resolves within the set.
    pub fn default_server(&self) -> Option<&ServerDescriptor> {
        let id = self.default_server_id.as_deref()?;
        self.servers.iter().find(|s| s.server_id == id)
    }
}

/// Ephemeral per-send value object, as entered by the caller. Raw and
/// unvalidated; the planner turns it into a [`DispatchPayload`].
#[derive(Debug, Clone)]
pub struct DispatchRequest {
    pub sender_email: String,
    pub sender_name: String,
    pub app_password: String,
    pub recipients: Vec<String>,
    pub subject: String,
    pub template: String,
}

/// Normalized wire payload for both send endpoints. Absent optional keys
/// are omitted from the JSON entirely, never serialized as null or "".
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchPayload {
    pub sender_email: String,
    pub sender_name: String,
    pub app_password: String,
    pub recipients: Vec<String>,
    pub subject: String,
    pub template: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u8>,
}

/// Outcome of an instant send.
#[derive(Debug, Clone)]
pub struct SendReceipt {
    pub message: String,
    pub sent_count: u32,
    pub message_id: Option<String>,
    pub timestamp: String,
    pub server_info: Option<ServerRef>,
    /// True only for the locally synthesized fallback produced when the
    /// backend is unreachable. Never authoritative.
    pub demo: bool,
}

/// Outcome of a background submission; the job id feeds the tracker.
#[derive(Debug, Clone)]
pub struct JobTicket {
    pub job_id: String,
    pub status: JobStatus,
    pub total_emails: u32,
    pub estimated_completion_time: Option<String>,
    pub message: String,
    pub server_info: Option<ServerRef>,
}

/// Host telemetry snapshot from `/api/server-info`. Display only.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostTelemetry {
    pub hostname: String,
    pub platform: String,
    #[serde(default, alias = "primaryIP")]
    pub primary_ip: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    /// Seconds since the host came up.
    #[serde(default)]
    pub uptime: f64,
    #[serde(default)]
    pub timestamp: String,
    /// Cumulative send count reported by the host.
    #[serde(default, rename = "newServerEmailCount")]
    pub email_count: u64,
}

/// Plain success/message status, used by the liveness probes.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct StatusMessage {
    pub success: bool,
    #[serde(default)]
    pub message: String,
}

// Response envelopes.

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SendEnvelope {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    pub data: Option<SendData>,
    #[serde(default)]
    pub server_info: Option<ServerRef>,
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SendData {
    #[serde(default)]
    pub message_id: Option<String>,
    #[serde(default)]
    pub recipient_count: u32,
    #[serde(default)]
    pub timestamp: String,
}

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct JobSubmitEnvelope {
    #[allow(dead_code)]
    pub success: bool,
    #[serde(default)]
    pub message: String,
    pub data: Option<JobSubmitData>,
    #[serde(default)]
    pub server_info: Option<ServerRef>,
}

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct JobSubmitData {
    pub job_id: String,
    pub status: JobStatus,
    pub total_emails: u32,
    #[serde(default)]
    pub estimated_completion_time: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
pub(crate) struct JobsEnvelope {
    #[allow(dead_code)]
    pub success: bool,
    #[serde(default)]
    pub data: Vec<EmailJob>,
}

#[derive(Debug, serde::Deserialize)]
pub(crate) struct JobEnvelope {
    #[allow(dead_code)]
    pub success: bool,
    pub data: EmailJob,
}

#[derive(Debug, serde::Deserialize)]
pub(crate) struct TelemetryEnvelope {
    #[allow(dead_code)]
    pub success: bool,
    pub data: Option<HostTelemetry>,
}

/// Best-effort parse of a non-2xx body to recover the backend's message.
#[derive(Debug, serde::Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
}
