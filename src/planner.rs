//! Dispatch planning: validation and normalization of a send request.
//!
//! Pure decision logic, no I/O. Takes the caller's raw
//! [`DispatchRequest`] plus mode/server/priority choices and produces the
//! normalized [`DispatchPayload`] for the wire, or a validation error.
//! Nothing here ever touches the network; a request that fails planning
//! is rejected before any HTTP call is constructed.

use crate::models::{DispatchPayload, DispatchRequest};
use crate::types::{AppError, AppResult, DispatchMode, Priority};

/// Hard cap on recipients per send, instant or background.
pub const MAX_RECIPIENTS: usize = 25;

/// Line-break marker the relay expects inside the template body.
const BREAK_MARKER: &str = "<br>";

/// Validate and normalize one send request.
///
/// * `mode = Instant` drops any priority; the serialized payload carries
///   no `priority` key at all.
/// * An empty or blank `chosen_server_id` means auto-select: the payload
///   omits `serverId` entirely rather than sending an empty string.
/// * Invalid recipient addresses are silently dropped; only the
///   after-filter count is checked against the 0/25 boundary.
pub fn plan(
    mode: DispatchMode,
    chosen_server_id: Option<&str>,
    priority: Option<Priority>,
    request: &DispatchRequest,
) -> AppResult<DispatchPayload> {
    // Required scalar fields, checked in a fixed order; first miss wins.
    let required = [
        ("senderEmail", &request.sender_email),
        ("senderName", &request.sender_name),
        ("appPassword", &request.app_password),
        ("subject", &request.subject),
        ("template", &request.template),
    ];
    for (name, value) in required {
        if value.trim().is_empty() {
            return Err(AppError::Validation(format!("missing field: {name}")));
        }
    }

    if !is_valid_email(&request.sender_email) {
        return Err(AppError::Validation("invalid sender email".to_string()));
    }

    let recipients = filter_recipients(&request.recipients);
    if recipients.is_empty() {
        return Err(AppError::Validation(
            "no valid recipient emails found".to_string(),
        ));
    }
    if recipients.len() > MAX_RECIPIENTS {
        let message = match mode {
            DispatchMode::Instant => "maximum 25 recipients allowed".to_string(),
            DispatchMode::Background => {
                "maximum 25 recipients allowed for background processing".to_string()
            }
        };
        return Err(AppError::Validation(message));
    }

    let server_id = chosen_server_id
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    let priority = match mode {
        DispatchMode::Instant => None,
        DispatchMode::Background => priority.map(|p| p.value()),
    };

    Ok(DispatchPayload {
        sender_email: request.sender_email.trim().to_string(),
        sender_name: request.sender_name.trim().to_string(),
        app_password: request.app_password.trim().to_string(),
        recipients,
        subject: request.subject.trim().to_string(),
        template: normalize_line_breaks(&request.template),
        server_id,
        priority,
    })
}

/// Trim entries, drop blanks and syntactically invalid addresses.
/// Idempotent: filtering an already-filtered list yields the same list.
pub fn filter_recipients(recipients: &[String]) -> Vec<String> {
    recipients
        .iter()
        .map(|r| r.trim())
        .filter(|r| !r.is_empty())
        .filter(|r| is_valid_email(r))
        .map(str::to_string)
        .collect()
}

/// Convert any line-break style to the relay's break marker, uniformly.
/// Idempotent: already-normalized text passes through unchanged.
pub fn normalize_line_breaks(text: &str) -> String {
    text.replace("\r\n", BREAK_MARKER)
        .replace('\n', BREAK_MARKER)
        .replace('\r', BREAK_MARKER)
}

/// RFC-light address check: one `@`, non-empty local part, domain with an
/// interior dot, no whitespace anywhere.
pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let mut parts = email.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        _ => false,
    }
}
