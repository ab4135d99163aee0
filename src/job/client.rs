//! Drawer / Viewer API clients
//!
//! Thin reqwest wrappers over the backend HTTP contract: job submission,
//! cooperative stop, the SSE job stream, and the listing endpoints the
//! shell frontend populates its controls from.

use futures_util::StreamExt;
use reqwest_eventsource::{Event as SseEvent, EventSource};
use serde::{Deserialize, Serialize};

use super::events::JobEvent;

/// Body of `POST /api/render`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderRequest {
    pub prompt: String,
    pub width: u32,
    pub height: u32,
    pub steps: u32,
    pub batch_size: u32,
    pub seed: u64,
    pub auto_random_seed: bool,
    pub sd_model: String,
}

#[derive(Debug, Deserialize)]
struct JobSubmission {
    job_id: String,
}

#[derive(Debug, Deserialize)]
struct ModelList {
    models: Vec<String>,
}

/// One aspect-ratio preset from `GET /api/aspects`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AspectOption {
    pub label: String,
    pub w: u32,
    pub h: u32,
}

#[derive(Debug, Deserialize)]
struct AspectList {
    aspects: Vec<AspectOption>,
}

/// One gallery entry from the viewer's `GET /api/images`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputItem {
    pub filename: String,
    pub url: String,
    #[serde(default)]
    pub mtime: f64,
    #[serde(default)]
    pub size: u64,
}

#[derive(Debug, Deserialize)]
struct OutputList {
    items: Vec<OutputItem>,
}

async fn expect_ok(response: reqwest::Response) -> Result<reqwest::Response, String> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(format!("HTTP {}: {}", status, body))
}

/// Client for the drawer (render) service.
#[derive(Clone)]
pub struct DrawerClient {
    http: reqwest::Client,
    base: String,
}

impl DrawerClient {
    /// `base` must be a normalized base URL (trailing slash). The client
    /// carries no global timeout: the SSE stream stays open for the whole
    /// job.
    pub fn new(base: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base: base.to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path.trim_start_matches('/'))
    }

    /// Submit a render job, returning its opaque id.
    pub async fn submit(&self, request: &RenderRequest) -> Result<String, String> {
        let response = self
            .http
            .post(self.url("api/render"))
            .json(request)
            .send()
            .await
            .map_err(|e| format!("render request failed: {}", e))?;
        let submission: JobSubmission = expect_ok(response)
            .await?
            .json()
            .await
            .map_err(|e| format!("invalid render response: {}", e))?;
        Ok(submission.job_id)
    }

    /// Best-effort cancellation request. The event stream remains the
    /// authority on whether the job actually stops.
    pub async fn stop(&self, job_id: &str) -> Result<(), String> {
        let response = self
            .http
            .post(self.url(&format!("api/render/{}/stop", job_id)))
            .send()
            .await
            .map_err(|e| format!("stop request failed: {}", e))?;
        expect_ok(response).await?;
        Ok(())
    }

    /// Open the SSE stream for a job.
    pub fn subscribe(&self, job_id: &str) -> Result<JobStream, String> {
        let url = self.url(&format!("api/events/{}", job_id));
        let source = EventSource::new(self.http.get(url))
            .map_err(|e| format!("cannot open event stream: {}", e))?;
        Ok(JobStream { source })
    }

    pub async fn list_models(&self) -> Result<Vec<String>, String> {
        let response = self
            .http
            .get(self.url("api/models"))
            .send()
            .await
            .map_err(|e| format!("models request failed: {}", e))?;
        let list: ModelList = expect_ok(response)
            .await?
            .json()
            .await
            .map_err(|e| format!("invalid models response: {}", e))?;
        Ok(list.models)
    }

    pub async fn list_aspects(&self) -> Result<Vec<AspectOption>, String> {
        let response = self
            .http
            .get(self.url("api/aspects"))
            .send()
            .await
            .map_err(|e| format!("aspects request failed: {}", e))?;
        let list: AspectList = expect_ok(response)
            .await?
            .json()
            .await
            .map_err(|e| format!("invalid aspects response: {}", e))?;
        Ok(list.aspects)
    }
}

/// Client for the viewer (gallery) service.
#[derive(Clone)]
pub struct ViewerClient {
    http: reqwest::Client,
    base: String,
}

impl ViewerClient {
    pub fn new(base: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base: base.to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path.trim_start_matches('/'))
    }

    pub async fn list_outputs(&self) -> Result<Vec<OutputItem>, String> {
        let response = self
            .http
            .get(self.url("api/images"))
            .send()
            .await
            .map_err(|e| format!("outputs request failed: {}", e))?;
        let list: OutputList = expect_ok(response)
            .await?
            .json()
            .await
            .map_err(|e| format!("invalid outputs response: {}", e))?;
        Ok(list.items)
    }

    pub async fn metadata(&self, filename: &str) -> Result<serde_json::Value, String> {
        let response = self
            .http
            .get(self.url(&format!("api/metadata/{}", filename)))
            .send()
            .await
            .map_err(|e| format!("metadata request failed: {}", e))?;
        expect_ok(response)
            .await?
            .json()
            .await
            .map_err(|e| format!("invalid metadata response: {}", e))
    }
}

/// A live subscription to one job's event stream. Not restartable: a new
/// subscription does not replay missed events.
pub struct JobStream {
    source: EventSource,
}

impl JobStream {
    /// Next decoded event, in server order. `None` when the server has
    /// closed the stream. Decode failures are returned as errors so the
    /// consumer can log and skip them without losing its place in the
    /// stream.
    pub async fn next_event(&mut self) -> Option<Result<JobEvent, String>> {
        loop {
            match self.source.next().await? {
                Ok(SseEvent::Open) => continue,
                Ok(SseEvent::Message(msg)) => {
                    return Some(JobEvent::parse(&msg.event, &msg.data));
                }
                // The connection ended without a terminal event. Report
                // end-of-stream instead of reconnecting: a new subscription
                // would not replay the missed events anyway.
                Err(reqwest_eventsource::Error::StreamEnded) => {
                    self.source.close();
                    return None;
                }
                Err(e) => return Some(Err(e.to_string())),
            }
        }
    }

    /// Close the underlying connection. Called on terminal events and on
    /// page teardown.
    pub fn close(&mut self) {
        self.source.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    async fn serve_response(response: String) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            if let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = [0u8; 2048];
                let _ = socket.read(&mut buf).await;
                let _ = socket.write_all(response.as_bytes()).await;
                // Hold the connection so the SSE client does not see EOF
                // before the events are consumed.
                tokio::time::sleep(std::time::Duration::from_secs(2)).await;
            }
        });
        format!("http://{}/", addr)
    }

    fn json_response(body: &str) -> String {
        format!(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            body.len(),
            body
        )
    }

    fn sample_request() -> RenderRequest {
        RenderRequest {
            prompt: "a windswept valley".to_string(),
            width: 1080,
            height: 1920,
            steps: 8,
            batch_size: 1,
            seed: 42,
            auto_random_seed: true,
            sd_model: "dreamshaper".to_string(),
        }
    }

    #[tokio::test]
    async fn submit_returns_job_id() {
        let base = serve_response(json_response(r#"{"job_id":"abc123"}"#)).await;
        let client = DrawerClient::new(&base);
        let job_id = client.submit(&sample_request()).await.unwrap();
        assert_eq!(job_id, "abc123");
    }

    #[tokio::test]
    async fn submit_surfaces_http_errors() {
        let base = serve_response(
            "HTTP/1.1 500 Internal Server Error\r\nContent-Length: 4\r\nConnection: close\r\n\r\nboom"
                .to_string(),
        )
        .await;
        let client = DrawerClient::new(&base);
        let err = client.submit(&sample_request()).await.unwrap_err();
        assert!(err.contains("500"), "unexpected error: {}", err);
    }

    #[tokio::test]
    async fn list_models_decodes() {
        let base = serve_response(json_response(r#"{"models":["a","b"]}"#)).await;
        let client = DrawerClient::new(&base);
        assert_eq!(client.list_models().await.unwrap(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn list_outputs_decodes() {
        let body = r#"{"items":[{"filename":"out_1.png","url":"/outputs/out_1.png","mtime":1.0,"size":10}]}"#;
        let base = serve_response(json_response(body)).await;
        let client = ViewerClient::new(&base);
        let items = client.list_outputs().await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].filename, "out_1.png");
    }

    #[tokio::test]
    async fn stream_yields_named_events_in_order() {
        let body = concat!(
            "event: hello\ndata: {\"job_id\":\"j1\"}\n\n",
            "event: job_started\ndata: {}\n\n",
            "event: log\ndata: {\"line\":\"step 1\"}\n\n",
            "event: job_done\ndata: {}\n\n",
        );
        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\nConnection: close\r\n\r\n{}",
            body
        );
        let base = serve_response(response).await;

        let client = DrawerClient::new(&base);
        let mut stream = client.subscribe("j1").unwrap();

        let mut events = Vec::new();
        while let Some(result) = stream.next_event().await {
            let event = result.unwrap();
            let terminal = event.is_terminal();
            events.push(event);
            if terminal {
                break;
            }
        }
        stream.close();

        assert_eq!(
            events,
            vec![
                JobEvent::Hello,
                JobEvent::JobStarted,
                JobEvent::Log("step 1".to_string()),
                JobEvent::JobDone,
            ]
        );
    }

    #[tokio::test]
    async fn dropped_connection_ends_the_stream() {
        // Server closes mid-job, before any terminal event.
        let body = concat!(
            "event: hello\ndata: {}\n\n",
            "event: job_started\ndata: {}\n\n",
        );
        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\nConnection: close\r\n\r\n{}",
            body
        );
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            if let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = [0u8; 2048];
                let _ = socket.read(&mut buf).await;
                let _ = socket.write_all(response.as_bytes()).await;
            }
        });

        let client = DrawerClient::new(&format!("http://{}/", addr));
        let mut stream = client.subscribe("j1").unwrap();

        let mut events = Vec::new();
        while let Some(result) = stream.next_event().await {
            events.push(result.unwrap());
        }

        assert_eq!(events, vec![JobEvent::Hello, JobEvent::JobStarted]);
    }
}
