//! Job Session
//!
//! The single "current job" state, modeled as an explicit transition
//! function from (state, event) to (new state, UI effects). Effects are
//! emitted to the shell frontend in order; the session itself never
//! touches the DOM or the network.

use serde::Serialize;

use super::events::{ImageResult, JobEvent};

/// One UI update derived from a job event. Applied in arrival order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum UiEffect {
    Toast {
        message: String,
        detail: Option<String>,
    },
    AppendLog {
        line: String,
    },
    AddImageCard {
        image: ImageResult,
        /// Image URL with a cache-busting query parameter, so repeated
        /// renders to the same filename are not served stale.
        display_url: String,
    },
    SetBusy {
        busy: bool,
    },
    ClearLog,
    ClearGallery,
    CloseStream,
}

fn toast(message: &str) -> UiEffect {
    UiEffect::Toast {
        message: message.to_string(),
        detail: None,
    }
}

fn toast_with(message: &str, detail: String) -> UiEffect {
    UiEffect::Toast {
        message: message.to_string(),
        detail: Some(detail),
    }
}

fn cache_busted(url: &str) -> String {
    format!("{}?t={}", url, chrono::Utc::now().timestamp_millis())
}

/// Tracks the at-most-one active render job.
#[derive(Debug, Default)]
pub struct JobSession {
    job_id: Option<String>,
}

impl JobSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// True while a job is active and submission is disabled.
    pub fn is_active(&self) -> bool {
        self.job_id.is_some()
    }

    pub fn job_id(&self) -> Option<&str> {
        self.job_id.as_deref()
    }

    /// Enter the active state for a freshly submitted job. Submitting
    /// while a job is active is rejected.
    pub fn begin(&mut self, job_id: &str) -> Result<Vec<UiEffect>, String> {
        if self.is_active() {
            return Err("a render job is already running".to_string());
        }
        self.job_id = Some(job_id.to_string());
        Ok(vec![
            UiEffect::ClearLog,
            UiEffect::ClearGallery,
            UiEffect::SetBusy { busy: true },
            UiEffect::AppendLog {
                line: format!("Job: {}", job_id),
            },
        ])
    }

    /// Return to idle after a failed submission or stream teardown.
    pub fn abort(&mut self) -> Vec<UiEffect> {
        self.job_id = None;
        vec![UiEffect::SetBusy { busy: false }, UiEffect::CloseStream]
    }

    /// Apply one event, in receipt order, producing the UI effects for it.
    /// Terminal events clear the job id and re-enable submission.
    pub fn apply(&mut self, event: &JobEvent) -> Vec<UiEffect> {
        match event {
            JobEvent::Hello => vec![],
            JobEvent::JobStarted => vec![toast("Start Rendering / 开始渲染")],
            JobEvent::RenderStart(p) => vec![toast_with(
                &format!("Processing {}/{}...", p.idx + 1, p.batch_size),
                format!("{}x{} | seed {}", p.width, p.height, p.seed),
            )],
            JobEvent::Log(line) => vec![UiEffect::AppendLog { line: line.clone() }],
            JobEvent::Image(image) => vec![UiEffect::AddImageCard {
                display_url: cache_busted(&image.url),
                image: image.clone(),
            }],
            JobEvent::RenderDone => vec![],
            JobEvent::JobStopping => vec![toast("Stopping... / 正在停止")],
            JobEvent::JobCancelled => {
                self.job_id = None;
                vec![
                    toast("Cancelled / 已取消"),
                    UiEffect::CloseStream,
                    UiEffect::SetBusy { busy: false },
                ]
            }
            JobEvent::JobError(message) => {
                self.job_id = None;
                vec![
                    UiEffect::AppendLog {
                        line: format!("ERROR: {}", message),
                    },
                    toast_with("Error / 失败", message.clone()),
                    UiEffect::CloseStream,
                    UiEffect::SetBusy { busy: false },
                ]
            }
            JobEvent::JobDone => {
                self.job_id = None;
                vec![
                    toast("Done / 完成"),
                    UiEffect::CloseStream,
                    UiEffect::SetBusy { busy: false },
                ]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::events::RenderStart;

    fn render_start(idx: u32, batch_size: u32) -> JobEvent {
        JobEvent::RenderStart(RenderStart {
            idx,
            batch_size,
            seed: 42,
            width: 1080,
            height: 1080,
            sd_model: None,
        })
    }

    fn image(idx: u32, batch_size: u32) -> JobEvent {
        JobEvent::Image(ImageResult {
            idx,
            batch_size,
            seed: 42,
            width: 1080,
            height: 1080,
            url: format!("/outputs/out_{}.png", idx),
            filename: format!("out_{}.png", idx),
        })
    }

    #[test]
    fn full_batch_produces_two_cards_and_returns_to_idle() {
        let mut session = JobSession::new();
        let begin = session.begin("job-1").unwrap();
        assert!(begin.contains(&UiEffect::SetBusy { busy: true }));
        assert!(session.is_active());

        let sequence = [
            JobEvent::JobStarted,
            render_start(0, 2),
            image(0, 2),
            render_start(1, 2),
            image(1, 2),
            JobEvent::JobDone,
        ];

        let mut cards = 0;
        let mut all_effects = Vec::new();
        for event in &sequence {
            assert!(session.is_active() || event.is_terminal());
            let effects = session.apply(event);
            cards += effects
                .iter()
                .filter(|e| matches!(e, UiEffect::AddImageCard { .. }))
                .count();
            all_effects.extend(effects);
        }

        assert_eq!(cards, 2);
        assert!(!session.is_active());
        assert_eq!(session.job_id(), None);
        assert!(all_effects.contains(&UiEffect::SetBusy { busy: false }));
        assert!(all_effects.contains(&UiEffect::CloseStream));
    }

    #[test]
    fn image_urls_are_cache_busted() {
        let mut session = JobSession::new();
        session.begin("job-1").unwrap();
        let effects = session.apply(&image(0, 1));
        match &effects[0] {
            UiEffect::AddImageCard { display_url, image } => {
                assert!(display_url.starts_with(&format!("{}?t=", image.url)));
            }
            other => panic!("unexpected effect: {:?}", other),
        }
    }

    #[test]
    fn job_error_logs_message_and_reenables_submission() {
        let mut session = JobSession::new();
        session.begin("job-1").unwrap();

        let effects = session.apply(&JobEvent::JobError("OOM".to_string()));
        assert!(effects
            .iter()
            .any(|e| matches!(e, UiEffect::AppendLog { line } if line.contains("OOM"))));
        assert!(effects.contains(&UiEffect::CloseStream));
        assert!(effects.contains(&UiEffect::SetBusy { busy: false }));
        assert!(!session.is_active());

        // Submission is possible again.
        assert!(session.begin("job-2").is_ok());
    }

    #[test]
    fn render_done_has_no_ui_effect() {
        let mut session = JobSession::new();
        session.begin("job-1").unwrap();
        assert!(session.apply(&JobEvent::RenderDone).is_empty());
        assert!(session.is_active());
    }

    #[test]
    fn stopping_is_not_terminal() {
        let mut session = JobSession::new();
        session.begin("job-1").unwrap();
        let effects = session.apply(&JobEvent::JobStopping);
        assert!(session.is_active());
        assert!(!effects.contains(&UiEffect::CloseStream));
    }

    #[test]
    fn concurrent_submission_is_rejected() {
        let mut session = JobSession::new();
        session.begin("job-1").unwrap();
        assert!(session.begin("job-2").is_err());
        assert_eq!(session.job_id(), Some("job-1"));
    }

    #[test]
    fn abort_clears_state() {
        let mut session = JobSession::new();
        session.begin("job-1").unwrap();
        let effects = session.abort();
        assert!(!session.is_active());
        assert!(effects.contains(&UiEffect::SetBusy { busy: false }));
    }
}
