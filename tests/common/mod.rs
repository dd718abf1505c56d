#![allow(dead_code)]

use docpanel_lib::{ChannelSink, ClientConfig, EventSink, FormParams, ScreenClient, UiEvent};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use wiremock::MockServer;

pub const PREFIX: &str = "docs";

pub fn config(server: &MockServer, chunk_size: u64) -> ClientConfig {
    ClientConfig {
        chunk_size,
        poll_interval_ms: 50,
        ..ClientConfig::for_server(&server.uri())
    }
}

pub fn client(server: &MockServer, chunk_size: u64) -> ScreenClient {
    ScreenClient::new(config(server, chunk_size)).unwrap()
}

pub fn sink(accept_prompts: bool) -> (Arc<dyn EventSink>, UnboundedReceiver<UiEvent>) {
    let (sink, rx) = ChannelSink::new(accept_prompts);
    (Arc::new(sink), rx)
}

pub fn form() -> FormParams {
    [("screen", "EPrint::Edit"), ("eprintid", "42"), ("stage", "files")]
        .into_iter()
        .collect()
}

pub fn drain(rx: &mut UnboundedReceiver<UiEvent>) -> Vec<UiEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

pub fn alerts(events: &[UiEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            UiEvent::Alert { message } => Some(message.clone()),
            _ => None,
        })
        .collect()
}

/// Requests whose body contains `needle`
pub async fn requests_with(server: &MockServer, http_method: &str, needle: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.method.as_str() == http_method)
        .filter(|r| String::from_utf8_lossy(&r.body).contains(needle))
        .count()
}

pub async fn content_ranges(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.method.as_str() == "PUT")
        .map(|r| {
            r.headers
                .get("content-range")
                .unwrap()
                .to_str()
                .unwrap()
                .to_string()
        })
        .collect()
}
