//! Job tracking: snapshots, lookup, and pause/resume control.
//!
//! The backend owns the job state machine. Pause and resume are sent
//! optimistically; an invalid transition comes back as a rejection whose
//! message is surfaced as-is, and the local snapshot is only updated from
//! successful responses.

use super::ApiClient;
use crate::models::{EmailJob, JobEnvelope, JobsEnvelope};
use crate::session::SessionContext;
use crate::types::{AppError, AppResult, JobStatus};
use crate::watch::JobSource;
use async_trait::async_trait;
use tracing::info;

#[derive(Clone)]
pub struct JobTracker {
    api: ApiClient,
}

impl JobTracker {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Read-only snapshot of the caller's jobs, newest first as returned
    /// by the backend. Filter and limit are forwarded only when present.
    pub async fn list_jobs(
        &self,
        session: &SessionContext,
        status: Option<JobStatus>,
        limit: Option<u32>,
    ) -> AppResult<Vec<EmailJob>> {
        let token = session.require_token()?;

        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(status) = status {
            query.push(("status", status.to_string()));
        }
        if let Some(limit) = limit {
            query.push(("limit", limit.to_string()));
        }

        let response = self
            .api
            .http()
            .get(self.api.url("/api/email-jobs"))
            .query(&query)
            .bearer_auth(token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ApiClient::api_error(response, "failed to fetch email jobs").await);
        }

        let envelope: JobsEnvelope = response
            .json()
            .await
            .map_err(|e| AppError::Dispatch(format!("failed to parse job list: {e}")))?;
        Ok(envelope.data)
    }

    pub async fn get_job(&self, session: &SessionContext, job_id: &str) -> AppResult<EmailJob> {
        let token = session.require_token()?;

        let response = self
            .api
            .http()
            .get(self.api.url(&format!("/api/email-jobs/{job_id}")))
            .bearer_auth(token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ApiClient::api_error(response, "Job not found").await);
        }

        let envelope: JobEnvelope = response
            .json()
            .await
            .map_err(|e| AppError::Dispatch(format!("failed to parse job status: {e}")))?;
        Ok(envelope.data)
    }

    /// Ask the backend to pause a processing job. Any rejection (wrong
    /// state included) carries the backend's message.
    pub async fn pause(&self, session: &SessionContext, job_id: &str) -> AppResult<EmailJob> {
        self.transition(session, job_id, "pause").await
    }

    /// Ask the backend to resume a paused job.
    pub async fn resume(&self, session: &SessionContext, job_id: &str) -> AppResult<EmailJob> {
        self.transition(session, job_id, "resume").await
    }

    async fn transition(
        &self,
        session: &SessionContext,
        job_id: &str,
        action: &str,
    ) -> AppResult<EmailJob> {
        let token = session.require_token()?;

        let response = self
            .api
            .http()
            .post(self.api.url(&format!("/api/email-jobs/{job_id}/{action}")))
            .bearer_auth(token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ApiClient::api_error(response, &format!("failed to {action} job")).await);
        }

        let envelope: JobEnvelope = response.json().await.map_err(|e| {
            AppError::Dispatch(format!("failed to parse {action} response: {e}"))
        })?;
        info!(job_id = %job_id, status = %envelope.data.status, "Job {} accepted", action);
        Ok(envelope.data)
    }
}

/// A tracker bound to one session, usable as a watcher poll source.
pub struct SessionJobSource {
    tracker: JobTracker,
    session: SessionContext,
}

impl SessionJobSource {
    pub fn new(tracker: JobTracker, session: SessionContext) -> Self {
        Self { tracker, session }
    }
}

#[async_trait]
impl JobSource for SessionJobSource {
    async fn fetch(&self, job_id: &str) -> AppResult<EmailJob> {
        self.tracker.get_job(&self.session, job_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::UserProfile;

    fn session() -> SessionContext {
        SessionContext::new("test-token", UserProfile::default())
    }

    fn job_json(status: &str, sent: u32) -> String {
        format!(
            r#"{{
                "jobId": "J1",
                "status": "{status}",
                "totalEmails": 10,
                "sentEmails": {sent},
                "failedEmails": 0,
                "createdAt": "2025-03-01T10:00:00Z",
                "updatedAt": "2025-03-01T10:00:30Z",
                "progress": {progress}
            }}"#,
            progress = sent * 10
        )
    }

    #[tokio::test]
    async fn test_list_jobs_forwards_filters() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/api/email-jobs")
            .match_query(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("status".into(), "processing".into()),
                mockito::Matcher::UrlEncoded("limit".into(), "5".into()),
            ]))
            .with_status(200)
            .with_body(format!(
                r#"{{"success": true, "data": [{}]}}"#,
                job_json("processing", 4)
            ))
            .create_async()
            .await;

        let tracker = JobTracker::new(ApiClient::new(server.url()));
        let jobs = tracker
            .list_jobs(&session(), Some(JobStatus::Processing), Some(5))
            .await
            .unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].status, JobStatus::Processing);
    }

    #[tokio::test]
    async fn test_list_jobs_without_filters_sends_no_query() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/api/email-jobs")
            .match_query(mockito::Matcher::Exact(String::new()))
            .with_status(200)
            .with_body(r#"{"success": true, "data": []}"#)
            .create_async()
            .await;

        let tracker = JobTracker::new(ApiClient::new(server.url()));
        let jobs = tracker.list_jobs(&session(), None, None).await.unwrap();
        assert!(jobs.is_empty());
    }

    #[tokio::test]
    async fn test_get_job_progress_snapshot() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/api/email-jobs/J1")
            .with_status(200)
            .with_body(format!(
                r#"{{"success": true, "data": {}}}"#,
                job_json("processing", 6)
            ))
            .create_async()
            .await;

        let tracker = JobTracker::new(ApiClient::new(server.url()));
        let job = tracker.get_job(&session(), "J1").await.unwrap();
        assert_eq!(job.status, JobStatus::Processing);
        assert!(job.sent_emails <= job.total_emails);
        assert_eq!(job.display_progress(), 60);
    }

    #[tokio::test]
    async fn test_unknown_job_is_not_found() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/api/email-jobs/nope")
            .with_status(404)
            .with_body(r#"{"success": false, "message": "Job not found"}"#)
            .create_async()
            .await;

        let tracker = JobTracker::new(ApiClient::new(server.url()));
        let err = tracker.get_job(&session(), "nope").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_pause_then_resume_roundtrip() {
        let mut server = mockito::Server::new_async().await;
        let _pause = server
            .mock("POST", "/api/email-jobs/J1/pause")
            .with_status(200)
            .with_body(format!(
                r#"{{"success": true, "data": {}}}"#,
                job_json("paused", 4)
            ))
            .create_async()
            .await;
        let _resume = server
            .mock("POST", "/api/email-jobs/J1/resume")
            .with_status(200)
            .with_body(format!(
                r#"{{"success": true, "data": {}}}"#,
                job_json("processing", 4)
            ))
            .create_async()
            .await;

        let tracker = JobTracker::new(ApiClient::new(server.url()));
        let paused = tracker.pause(&session(), "J1").await.unwrap();
        assert_eq!(paused.status, JobStatus::Paused);
        let resumed = tracker.resume(&session(), "J1").await.unwrap();
        assert_eq!(resumed.status, JobStatus::Processing);
    }

    #[tokio::test]
    async fn test_invalid_transition_surfaces_backend_message() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/api/email-jobs/J1/pause")
            .with_status(400)
            .with_body(r#"{"success": false, "message": "Job is not currently processing"}"#)
            .create_async()
            .await;

        let tracker = JobTracker::new(ApiClient::new(server.url()));
        let err = tracker.pause(&session(), "J1").await.unwrap_err();
        assert!(err.to_string().contains("Job is not currently processing"));
    }

    #[tokio::test]
    async fn test_list_requires_token_locally() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/email-jobs")
            .expect(0)
            .create_async()
            .await;

        let tracker = JobTracker::new(ApiClient::new(server.url()));
        let err = tracker
            .list_jobs(&SessionContext::anonymous(), None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Auth(_)));
        mock.assert_async().await;
    }
}
