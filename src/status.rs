use crate::config::StatusCheck;
use serde::Deserialize;

/// Body the service returns for a solved job.
pub const SUCCESS_SENTINEL: &str = r#"{"status": "success"}"#;

#[derive(Debug, Deserialize)]
struct JobStatus {
    status: String,
}

pub fn is_successful(body: &str, check: StatusCheck) -> bool {
    match check {
        StatusCheck::Exact => body == SUCCESS_SENTINEL,
        StatusCheck::Parsed => serde_json::from_str::<JobStatus>(body)
            .map(|s| s.status == "success")
            .unwrap_or(false),
    }
}
