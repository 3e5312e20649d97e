//! Monitor state.
//!
//! Holds the job snapshot the view renders. Updates flow one way: from
//! backend responses into this state, never back. Pause/resume are sent
//! to the backend as-is; a rejection shows up in the status line with the
//! backend's own message, and the snapshot only changes on success.

use crate::api::JobTracker;
use crate::models::EmailJob;
use crate::session::SessionContext;
use crate::tui::event::AppAction;
use crate::types::JobStatus;
use tracing::warn;

pub struct MonitorApp {
    tracker: JobTracker,
    session: SessionContext,
    pub refresh_interval_secs: u64,

    /// Latest job snapshot, as returned by the backend.
    pub jobs: Vec<EmailJob>,
    pub selected: usize,
    /// Last outcome line shown in the status bar.
    pub status_line: String,
}

impl MonitorApp {
    pub fn new(tracker: JobTracker, session: SessionContext, refresh_interval_secs: u64) -> Self {
        Self {
            tracker,
            session,
            refresh_interval_secs,
            jobs: Vec::new(),
            selected: 0,
            status_line: String::new(),
        }
    }

    pub fn selected_job(&self) -> Option<&EmailJob> {
        self.jobs.get(self.selected)
    }

    /// Pull a fresh job list. Failures keep the previous snapshot.
    pub async fn refresh(&mut self) {
        match self.tracker.list_jobs(&self.session, None, None).await {
            Ok(jobs) => {
                self.jobs = jobs;
                if self.selected >= self.jobs.len() {
                    self.selected = self.jobs.len().saturating_sub(1);
                }
                self.status_line = format!("{} job(s)", self.jobs.len());
            }
            Err(e) => {
                warn!("Job list refresh failed: {}", e);
                self.status_line = e.to_string();
            }
        }
    }

    pub async fn handle_action(&mut self, action: AppAction) {
        match action {
            AppAction::Up => {
                self.selected = self.selected.saturating_sub(1);
            }
            AppAction::Down => {
                if self.selected + 1 < self.jobs.len() {
                    self.selected += 1;
                }
            }
            AppAction::Pause => self.pause_selected().await,
            AppAction::Resume => self.resume_selected().await,
            AppAction::Quit | AppAction::Refresh => {}
        }
    }

    async fn pause_selected(&mut self) {
        let Some(job_id) = self.selected_job().map(|j| j.job_id.clone()) else {
            return;
        };
        match self.tracker.pause(&self.session, &job_id).await {
            Ok(job) => {
                self.status_line = format!("paused {}", job.job_id);
                self.apply_update(job);
            }
            Err(e) => self.status_line = e.to_string(),
        }
    }

    async fn resume_selected(&mut self) {
        let Some(job_id) = self.selected_job().map(|j| j.job_id.clone()) else {
            return;
        };
        match self.tracker.resume(&self.session, &job_id).await {
            Ok(job) => {
                self.status_line = format!("resumed {}", job.job_id);
                self.apply_update(job);
            }
            Err(e) => self.status_line = e.to_string(),
        }
    }

    /// Replace one job's snapshot from a successful control response.
    fn apply_update(&mut self, updated: EmailJob) {
        if let Some(slot) = self.jobs.iter_mut().find(|j| j.job_id == updated.job_id) {
            *slot = updated;
        }
    }

    /// Whether the selected job can be asked to pause/resume at all.
    /// Advisory only — the backend stays the authority.
    pub fn selected_controls(&self) -> (bool, bool) {
        match self.selected_job().map(|j| j.status) {
            Some(JobStatus::Processing) => (true, false),
            Some(JobStatus::Paused) => (false, true),
            _ => (false, false),
        }
    }
}
