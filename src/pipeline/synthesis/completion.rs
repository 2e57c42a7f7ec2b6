use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};

use super::types::{ChatMessage, CompletionRequest, TextCompletion};
use super::CompletionError;

/// Marker that ends an SSE completion stream.
const STREAM_DONE: &str = "[DONE]";

/// Client for an OpenAI-compatible chat-completions endpoint
/// (Hugging Face router by default).
pub struct HfChatClient {
    endpoint: String,
    token: String,
    client: reqwest::Client,
    timeout_secs: u64,
    stream: bool,
}

impl HfChatClient {
    pub fn new(endpoint: &str, token: &str, timeout_secs: u64) -> Result<Self, CompletionError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| CompletionError::Connection(e.to_string()))?;

        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            token: token.to_string(),
            client,
            timeout_secs,
            stream: false,
        })
    }

    /// Request a streamed response and collect it into one string.
    pub fn with_streaming(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    fn map_transport_error(&self, e: reqwest::Error) -> CompletionError {
        if e.is_timeout() {
            CompletionError::Timeout(self.timeout_secs)
        } else if e.is_connect() {
            CompletionError::Connection(self.endpoint.clone())
        } else {
            CompletionError::Connection(e.to_string())
        }
    }
}

/// Request body for the chat-completions endpoint.
#[derive(Serialize)]
struct ChatCompletionBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    stream: bool,
}

/// Non-streaming response body.
#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: Option<ChatChoiceMessage>,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

/// One SSE chunk of a streamed response.
#[derive(Deserialize)]
struct ChatCompletionChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Deserialize)]
struct ChunkChoice {
    delta: Option<ChunkDelta>,
}

#[derive(Deserialize)]
struct ChunkDelta {
    content: Option<String>,
}

#[async_trait]
impl TextCompletion for HfChatClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        let body = ChatCompletionBody {
            model: &request.model,
            messages: &request.messages,
            max_tokens: request.max_tokens,
            stream: self.stream,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::Service {
                status: status.as_u16(),
                body,
            });
        }

        if self.stream {
            let mut collector = StreamCollector::default();
            let mut chunks = response.bytes_stream();
            while let Some(chunk) = chunks.next().await {
                let bytes = chunk.map_err(|e| self.map_transport_error(e))?;
                if collector.push(&bytes)? {
                    break;
                }
            }
            return collector.finish();
        }

        let text = response
            .text()
            .await
            .map_err(|e| self.map_transport_error(e))?;
        parse_completion_body(&text)
    }
}

/// Extract the generated text from a non-streaming response body.
/// A well-formed body without content yields an empty string.
fn parse_completion_body(body: &str) -> Result<String, CompletionError> {
    let parsed: ChatCompletionResponse = serde_json::from_str(body)
        .map_err(|e| CompletionError::ResponseParsing(e.to_string()))?;

    Ok(parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message)
        .and_then(|m| m.content)
        .unwrap_or_default())
}

/// Accumulates `data:` lines of an SSE stream. Lines may be split across
/// network chunks, so partial input is buffered until a newline arrives.
#[derive(Default)]
struct StreamCollector {
    pending: Vec<u8>,
    text: String,
    done: bool,
}

impl StreamCollector {
    /// Feed raw bytes. Returns `true` once the end marker has been seen.
    fn push(&mut self, bytes: &[u8]) -> Result<bool, CompletionError> {
        self.pending.extend_from_slice(bytes);
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line);
            self.consume_line(line.trim())?;
            if self.done {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn consume_line(&mut self, line: &str) -> Result<(), CompletionError> {
        let Some(data) = line.strip_prefix("data:") else {
            return Ok(());
        };
        let data = data.trim();
        if data == STREAM_DONE {
            self.done = true;
            return Ok(());
        }
        if data.is_empty() {
            return Ok(());
        }

        let chunk: ChatCompletionChunk = serde_json::from_str(data)
            .map_err(|e| CompletionError::ResponseParsing(e.to_string()))?;
        if let Some(fragment) = chunk
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.delta)
            .and_then(|d| d.content)
        {
            self.text.push_str(&fragment);
        }
        Ok(())
    }

    fn finish(mut self) -> Result<String, CompletionError> {
        if !self.done && !self.pending.is_empty() {
            let rest = std::mem::take(&mut self.pending);
            let line = String::from_utf8_lossy(&rest).into_owned();
            self.consume_line(line.trim())?;
        }
        Ok(self.text)
    }
}

/// Mock text-completion service for testing: returns a configured response
/// (or error) and records every request it receives.
pub struct MockCompletion {
    outcome: Result<String, CompletionError>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl MockCompletion {
    pub fn new(response: &str) -> Self {
        Self {
            outcome: Ok(response.to_string()),
            delay: None,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: CompletionError) -> Self {
        Self {
            outcome: Err(error),
            ..Self::new("")
        }
    }

    /// Wait this long before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl TextCompletion for MockCompletion {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.outcome.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{json, Value};

    async fn spawn_stub(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/v1/chat/completions")
    }

    fn request() -> CompletionRequest {
        CompletionRequest {
            model: "test-model".into(),
            messages: vec![ChatMessage::user("make soup")],
            max_tokens: 64,
        }
    }

    #[tokio::test]
    async fn returns_first_choice_content_and_sends_expected_body() {
        let app = Router::new().route(
            "/v1/chat/completions",
            post(|headers: HeaderMap, Json(body): Json<Value>| async move {
                assert_eq!(headers["authorization"], "Bearer hf_test");
                assert_eq!(body["model"], "test-model");
                assert_eq!(body["max_tokens"], 64);
                assert_eq!(body["stream"], false);
                assert_eq!(body["messages"][0]["role"], "user");
                assert_eq!(body["messages"][0]["content"], "make soup");
                Json(json!({
                    "choices": [{"message": {"role": "assistant", "content": "```json\n{}\n```"}}]
                }))
            }),
        );
        let url = spawn_stub(app).await;
        let client = HfChatClient::new(&url, "hf_test", 5).unwrap();

        let text = client.complete(&request()).await.unwrap();
        assert_eq!(text, "```json\n{}\n```");
    }

    #[tokio::test]
    async fn non_success_status_is_service_error() {
        let app = Router::new().route(
            "/v1/chat/completions",
            post(|| async { (StatusCode::SERVICE_UNAVAILABLE, "model loading") }),
        );
        let url = spawn_stub(app).await;
        let client = HfChatClient::new(&url, "t", 5).unwrap();

        let err = client.complete(&request()).await.unwrap_err();
        assert_eq!(
            err,
            CompletionError::Service {
                status: 503,
                body: "model loading".into()
            }
        );
    }

    #[tokio::test]
    async fn garbage_success_body_is_parse_error() {
        let app = Router::new().route("/v1/chat/completions", post(|| async { "not json" }));
        let url = spawn_stub(app).await;
        let client = HfChatClient::new(&url, "t", 5).unwrap();

        let err = client.complete(&request()).await.unwrap_err();
        assert!(matches!(err, CompletionError::ResponseParsing(_)));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_connection_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let client = HfChatClient::new(&format!("http://{addr}/v1"), "t", 5).unwrap();

        let err = client.complete(&request()).await.unwrap_err();
        assert!(matches!(err, CompletionError::Connection(_)));
    }

    #[tokio::test]
    async fn streamed_response_is_collected() {
        let app = Router::new().route(
            "/v1/chat/completions",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["stream"], true);
                concat!(
                    "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n",
                    "data: {\"choices\":[{\"delta\":{\"content\":\"```json\\n{\\\"title\\\":\"}}]}\n\n",
                    "data: {\"choices\":[{\"delta\":{\"content\":\" \\\"Soup\\\"}\\n```\"}}]}\n\n",
                    "data: [DONE]\n\n",
                )
            }),
        );
        let url = spawn_stub(app).await;
        let client = HfChatClient::new(&url, "t", 5).unwrap().with_streaming(true);

        let text = client.complete(&request()).await.unwrap();
        assert_eq!(text, "```json\n{\"title\": \"Soup\"}\n```");
    }

    #[test]
    fn missing_content_is_empty_text() {
        assert_eq!(parse_completion_body(r#"{"choices": []}"#).unwrap(), "");
        assert_eq!(
            parse_completion_body(r#"{"choices": [{"message": {"content": null}}]}"#).unwrap(),
            ""
        );
    }

    #[test]
    fn stream_collector_handles_split_lines() {
        let mut collector = StreamCollector::default();
        let first: &[u8] = b"data: {\"choices\":[{\"delta\":{\"content\":\"Hel";
        let second: &[u8] =
            b"lo\"}}]}\n\ndata: {\"choices\":[{\"delta\":{\"content\":\" there\"}}]}";
        assert!(!collector.push(first).unwrap());
        assert!(!collector.push(second).unwrap());
        assert_eq!(collector.finish().unwrap(), "Hello there");
    }

    #[test]
    fn stream_collector_stops_at_done() {
        let mut collector = StreamCollector::default();
        let chunk: &[u8] = concat!(
            ": keep-alive\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\n",
            "data: [DONE]\n",
            "data: ignored\n"
        )
        .as_bytes();
        let done = collector.push(chunk).unwrap();
        assert!(done);
        assert_eq!(collector.finish().unwrap(), "a");
    }

    #[test]
    fn stream_collector_rejects_malformed_chunk() {
        let mut collector = StreamCollector::default();
        let err = collector.push(b"data: {oops\n").unwrap_err();
        assert!(matches!(err, CompletionError::ResponseParsing(_)));
    }

    #[tokio::test]
    async fn mock_records_requests() {
        let mock = MockCompletion::new("hello");
        assert_eq!(mock.complete(&request()).await.unwrap(), "hello");
        assert_eq!(mock.call_count(), 1);
        assert_eq!(mock.requests()[0].model, "test-model");
    }

    #[tokio::test]
    async fn failing_mock_returns_error() {
        let mock = MockCompletion::failing(CompletionError::Timeout(3));
        assert_eq!(
            mock.complete(&request()).await.unwrap_err(),
            CompletionError::Timeout(3)
        );
    }

    #[test]
    fn endpoint_trailing_slash_is_trimmed() {
        let client =
            HfChatClient::new("http://localhost:8080/v1/chat/completions/", "t", 10).unwrap();
        assert_eq!(client.endpoint, "http://localhost:8080/v1/chat/completions");
        assert_eq!(client.timeout_secs, 10);
        assert!(!client.stream);
    }
}
