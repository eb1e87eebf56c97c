//! WebSocket client for the Wolfram|Alpha results gateway.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::protocol::Message;
use tracing::{debug, info, warn};

use super::{BackendError, ComputeBackend, ComputeResult, Result};

pub const DEFAULT_ENDPOINT: &str = "wss://gateway.wolframalpha.com/gateway";

const INIT_TIMEOUT: Duration = Duration::from_secs(15);
const MESSAGE_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_MESSAGES: usize = 50;

#[derive(Debug, Clone)]
pub struct WolframAlphaClient {
    endpoint: String,
    init_timeout: Duration,
    message_timeout: Duration,
    max_messages: usize,
}

impl Default for WolframAlphaClient {
    fn default() -> Self {
        Self::new(DEFAULT_ENDPOINT)
    }
}

impl WolframAlphaClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            init_timeout: INIT_TIMEOUT,
            message_timeout: MESSAGE_TIMEOUT,
            max_messages: MAX_MESSAGES,
        }
    }

    pub fn with_timeouts(mut self, init: Duration, message: Duration) -> Self {
        self.init_timeout = init;
        self.message_timeout = message;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

fn init_message(exp: i64) -> Value {
    json!({
        "category": "results",
        "type": "init",
        "lang": "en",
        "waProS": "",
        "waProT": "",
        "waProU": "",
        "exp": exp,
        "displayDebuggingInfo": false,
        "messages": [],
    })
}

fn query_message(query: &str) -> Result<Value> {
    let input = serde_json::to_string(&json!([{ "t": 0, "v": query }]))
        .map_err(|e| BackendError::Protocol(e.to_string()))?;
    Ok(json!({
        "type": "newQuery",
        "locationId": "oi8ft_en_light",
        "language": "en",
        "displayDebuggingInfo": false,
        "yellowIsError": false,
        "requestSidebarAd": false,
        "category": "results",
        "input": STANDARD.encode(input.as_bytes()),
        "i2d": true,
        "assumption": [],
        "apiParams": {},
        "file": null,
        "theme": "light",
    }))
}

#[derive(Debug, PartialEq, Eq)]
enum Frame {
    Continue,
    Complete,
}

/// Folds one gateway message into `results`.
fn collect_frame(message: &Value, image_only: bool, results: &mut Vec<ComputeResult>) -> Frame {
    match message.get("type").and_then(Value::as_str) {
        Some("queryComplete" | "queryCompleted") => Frame::Complete,
        Some("pods") => {
            let related: Vec<String> = message
                .get("relatedQueries")
                .cloned()
                .and_then(|v| serde_json::from_value(v).ok())
                .unwrap_or_default();
            if !related.is_empty() {
                match results.last_mut() {
                    Some(last) => last.related_queries.extend(related),
                    None => results.push(ComputeResult {
                        related_queries: related,
                        ..ComputeResult::default()
                    }),
                }
            }

            let pods = message.get("pods").and_then(Value::as_array);
            for pod in pods.into_iter().flatten() {
                let Some(subpods) = pod.get("subpods").and_then(Value::as_array) else {
                    continue;
                };
                let mut result = ComputeResult {
                    title: pod.get("title").and_then(Value::as_str).map(str::to_string),
                    ..ComputeResult::default()
                };
                for subpod in subpods {
                    if !image_only {
                        let text = |key: &str| subpod.get(key).and_then(Value::as_str);
                        if let Some(plaintext) = text("plaintext") {
                            result.plaintext = Some(plaintext.to_string());
                        }
                        if let Some(minput) = text("minput") {
                            result.minput = Some(minput.to_string());
                        }
                        if let Some(moutput) = text("moutput") {
                            result.moutput = Some(moutput.to_string());
                        }
                    }
                    if let Some(img) = subpod.get("img") {
                        if let Some(data) = img.get("data").and_then(Value::as_str) {
                            result.img_base64 = Some(data.to_string());
                        }
                        if let Some(ctype) = img.get("contenttype").and_then(Value::as_str) {
                            result.img_contenttype = Some(ctype.to_string());
                        }
                    }
                }
                results.push(result);
            }
            Frame::Continue
        }
        Some(other) => {
            debug!(target: "wolfram", message_type = other, "Ignoring gateway message");
            Frame::Continue
        }
        None => {
            warn!(target: "wolfram", "Gateway message without a type field");
            Frame::Continue
        }
    }
}

#[async_trait]
impl ComputeBackend for WolframAlphaClient {
    async fn compute(&self, query: &str, image_only: bool) -> Result<Vec<ComputeResult>> {
        info!(target: "wolfram", query, image_only, endpoint = %self.endpoint, "Starting query");

        let (mut stream, response) = connect_async(self.endpoint.as_str())
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        debug!(target: "wolfram", status = %response.status(), "Connected");

        let init = init_message(chrono::Utc::now().timestamp_millis()).to_string();
        stream
            .send(Message::Text(init))
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        match timeout(self.init_timeout, stream.next()).await {
            Ok(Some(Ok(Message::Text(text)))) => {
                let ready: Value = serde_json::from_str(&text)
                    .map_err(|e| BackendError::Protocol(e.to_string()))?;
                if ready.get("type").and_then(Value::as_str) != Some("ready") {
                    return Err(BackendError::Protocol(format!(
                        "gateway not ready: {ready}"
                    )));
                }
            }
            Ok(Some(Ok(_))) | Ok(None) => {
                return Err(BackendError::Protocol(
                    "unexpected reply to init".to_string(),
                ));
            }
            Ok(Some(Err(e))) => return Err(BackendError::Transport(e.to_string())),
            Err(_) => return Err(BackendError::Timeout("waiting for gateway".to_string())),
        }

        stream
            .send(Message::Text(query_message(query)?.to_string()))
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        let mut results = Vec::new();
        let mut received = 0;
        while let Ok(Some(message)) = timeout(self.message_timeout, stream.next()).await {
            received += 1;
            if received > self.max_messages {
                warn!(target: "wolfram", limit = self.max_messages, "Message limit reached");
                break;
            }
            match message {
                Ok(Message::Text(text)) => {
                    let value: Value = match serde_json::from_str(&text) {
                        Ok(value) => value,
                        Err(e) => {
                            warn!(target: "wolfram", error = %e, "Unparseable gateway message");
                            continue;
                        }
                    };
                    if collect_frame(&value, image_only, &mut results) == Frame::Complete {
                        break;
                    }
                }
                Ok(Message::Close(_)) => break,
                Ok(_) => {}
                Err(e) => return Err(BackendError::Transport(e.to_string())),
            }
        }

        // Best effort; the gateway closes idle sockets on its own.
        let _ = stream.close(None).await;

        info!(target: "wolfram", count = results.len(), "Query finished");
        if results.is_empty() {
            return Err(BackendError::NoResults);
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_input_is_base64_json() {
        let message = query_message("integrate x^2").unwrap();
        let input = message["input"].as_str().unwrap();
        let decoded = STANDARD.decode(input).unwrap();
        let value: Value = serde_json::from_slice(&decoded).unwrap();
        assert_eq!(value, json!([{ "t": 0, "v": "integrate x^2" }]));
        assert_eq!(message["locationId"], "oi8ft_en_light");
        assert_eq!(init_message(42)["exp"], 42);
    }

    #[test]
    fn collects_pods_and_related_queries() {
        let mut results = Vec::new();
        let pods = json!({
            "type": "pods",
            "pods": [{
                "title": "Result",
                "subpods": [{
                    "plaintext": "x^3/3",
                    "minput": "Integrate[x^2, x]",
                    "img": { "data": "AAAA", "contenttype": "image/gif" }
                }]
            }, {
                "title": "No subpods"
            }]
        });
        assert_eq!(collect_frame(&pods, false, &mut results), Frame::Continue);

        let related = json!({ "type": "pods", "relatedQueries": ["derivative of x^2"] });
        collect_frame(&related, false, &mut results);

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].plaintext.as_deref(), Some("x^3/3"));
        assert_eq!(results[0].img_contenttype.as_deref(), Some("image/gif"));
        assert_eq!(results[0].related_queries, vec!["derivative of x^2"]);

        let done = json!({ "type": "queryComplete" });
        assert_eq!(collect_frame(&done, false, &mut results), Frame::Complete);
    }

    #[test]
    fn image_only_skips_text() {
        let mut results = Vec::new();
        let pods = json!({
            "type": "pods",
            "pods": [{ "title": "Plot", "subpods": [{ "plaintext": "ignored", "img": { "data": "BBBB" } }] }]
        });
        collect_frame(&pods, true, &mut results);
        assert_eq!(results[0].plaintext, None);
        assert_eq!(results[0].img_base64.as_deref(), Some("BBBB"));
    }
}
