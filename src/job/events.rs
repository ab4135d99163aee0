//! Job Events
//!
//! The closed set of named server-sent events a render job emits, and the
//! decoding from SSE (event name + JSON data) into typed values.

use serde::{Deserialize, Serialize};

/// Per-item render progress payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderStart {
    pub idx: u32,
    pub batch_size: u32,
    pub seed: u64,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub sd_model: Option<String>,
}

/// Finished-image payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageResult {
    pub idx: u32,
    pub batch_size: u32,
    pub seed: u64,
    pub width: u32,
    pub height: u32,
    pub url: String,
    pub filename: String,
}

#[derive(Debug, Clone, Deserialize)]
struct LogLine {
    line: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ErrorMessage {
    #[serde(default)]
    message: String,
}

/// One event from a job's stream. Ordering is server-assigned; the client
/// applies events strictly in receipt order.
#[derive(Debug, Clone, PartialEq)]
pub enum JobEvent {
    Hello,
    JobStarted,
    RenderStart(RenderStart),
    Log(String),
    Image(ImageResult),
    /// Per-item completion marker. Carries timing data the UI does not
    /// show; accepted so routine jobs do not log unknown-kind warnings.
    RenderDone,
    JobStopping,
    JobCancelled,
    JobError(String),
    JobDone,
}

impl JobEvent {
    /// True for kinds after which no further events are expected and the
    /// subscription is closed.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobEvent::JobCancelled | JobEvent::JobError(_) | JobEvent::JobDone
        )
    }

    /// Decode a named SSE event. Unknown names are an error so that new
    /// kinds cannot be silently dropped inside a catch-all match arm.
    pub fn parse(name: &str, data: &str) -> Result<Self, String> {
        let data = if data.trim().is_empty() { "{}" } else { data };
        match name {
            "hello" => Ok(JobEvent::Hello),
            "job_started" => Ok(JobEvent::JobStarted),
            "render_start" => serde_json::from_str::<RenderStart>(data)
                .map(JobEvent::RenderStart)
                .map_err(|e| format!("render_start: {}", e)),
            "log" => serde_json::from_str::<LogLine>(data)
                .map(|l| JobEvent::Log(l.line))
                .map_err(|e| format!("log: {}", e)),
            "image" => serde_json::from_str::<ImageResult>(data)
                .map(JobEvent::Image)
                .map_err(|e| format!("image: {}", e)),
            "render_done" => Ok(JobEvent::RenderDone),
            "job_stopping" => Ok(JobEvent::JobStopping),
            "job_cancelled" => Ok(JobEvent::JobCancelled),
            "job_error" => serde_json::from_str::<ErrorMessage>(data)
                .map(|m| JobEvent::JobError(m.message))
                .map_err(|e| format!("job_error: {}", e)),
            "job_done" => Ok(JobEvent::JobDone),
            other => Err(format!("unknown event kind: {}", other)),
        }
    }
}
