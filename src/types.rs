// Type definitions and enums

use std::str::FromStr;

/// Lifecycle states of a background email job, as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Paused,
}

impl JobStatus {
    /// A terminal job never changes again; polling can stop.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "pending"),
            JobStatus::Processing => write!(f, "processing"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Failed => write!(f, "failed"),
            JobStatus::Paused => write!(f, "paused"),
        }
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(JobStatus::Pending),
            "processing" => Ok(JobStatus::Processing),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            "paused" => Ok(JobStatus::Paused),
            other => Err(format!("unknown job status: {other}")),
        }
    }
}

/// Background job priority. Wire representation is the integer value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    High,
    Normal,
    Low,
}

impl Priority {
    /// Integer value expected by the backend: 1 = high, 2 = normal, 3 = low.
    pub fn value(&self) -> u8 {
        match self {
            Priority::High => 1,
            Priority::Normal => 2,
            Priority::Low => 3,
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Normal
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "1" | "high" => Ok(Priority::High),
            "2" | "normal" => Ok(Priority::Normal),
            "3" | "low" => Ok(Priority::Low),
            other => Err(format!("unknown priority: {other} (expected high/normal/low or 1/2/3)")),
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Priority::High => write!(f, "high"),
            Priority::Normal => write!(f, "normal"),
            Priority::Low => write!(f, "low"),
        }
    }
}

/// How a dispatch is executed: synchronously or as a queued job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    Instant,
    Background,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Local pre-flight validation failure. Never reaches the network.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Missing or expired credential. Terminal; the user must log in again.
    #[error("Authentication error: {0}")]
    Auth(String),

    /// 503-class capacity exhaustion on background sends. Retryable.
    #[error("Capacity error: {0}")]
    Capacity(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Non-2xx rejection carrying the backend's own message.
    #[error("Dispatch failed: {0}")]
    Dispatch(String),

    /// Transport-level failure reaching the backend.
    #[error("Network error: {0}")]
    Network(String),
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        AppError::Network(e.to_string())
    }
}

pub type AppResult<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_values() {
        assert_eq!(Priority::High.value(), 1);
        assert_eq!(Priority::Normal.value(), 2);
        assert_eq!(Priority::Low.value(), 3);
    }

    #[test]
    fn test_priority_from_str() {
        assert_eq!("high".parse::<Priority>().unwrap(), Priority::High);
        assert_eq!("2".parse::<Priority>().unwrap(), Priority::Normal);
        assert_eq!("LOW".parse::<Priority>().unwrap(), Priority::Low);
        assert!("urgent".parse::<Priority>().is_err());
    }

    #[test]
    fn test_job_status_terminal() {
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(!JobStatus::Pending.is_terminal());
        assert!(!JobStatus::Processing.is_terminal());
        assert!(!JobStatus::Paused.is_terminal());
    }

    #[test]
    fn test_job_status_wire_format() {
        assert_eq!(serde_json::to_string(&JobStatus::Processing).unwrap(), "\"processing\"");
        let parsed: JobStatus = serde_json::from_str("\"paused\"").unwrap();
        assert_eq!(parsed, JobStatus::Paused);
    }

    #[test]
    fn test_auth_error_names_authentication() {
        let err = AppError::Auth("required. Please login again.".to_string());
        assert!(err.to_string().contains("Authentication"));
    }
}
