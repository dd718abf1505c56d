//! Polling progress reporter for transfers the client cannot observe directly
//! (form submissions targeted at a hidden frame).

use log::{info, warn};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::bar::ProgressBar;
use crate::error::ClientError;
use crate::events::EventSink;
use crate::http::{parse_json, ScreenClient};

/// Query parameter that ties a submission to its progress record
pub const PROGRESS_PARAM: &str = "progress_id";

/// Client-chosen opaque token identifying one proxied transfer
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProgressToken(String);

impl ProgressToken {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ProgressToken {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for ProgressToken {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for ProgressToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Add the progress token to a form action URL, keeping any `#fragment`
pub fn attach_token(action: &str, token: &ProgressToken) -> String {
    let (base, fragment) = match action.split_once('#') {
        Some((base, fragment)) => (base, Some(fragment)),
        None => (action, None),
    };
    let separator = if base.contains('?') { '&' } else { '?' };
    let mut url = format!(
        "{}{}{}={}",
        base,
        separator,
        PROGRESS_PARAM,
        urlencoding::encode(token.as_str())
    );
    if let Some(fragment) = fragment {
        url.push('#');
        url.push_str(fragment);
    }
    url
}

/// Server-side counters for one transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct TransferStatus {
    pub received: u64,
    pub size: u64,
}

impl TransferStatus {
    pub fn fraction(&self) -> f64 {
        if self.size == 0 {
            return 1.0;
        }
        self.received as f64 / self.size as f64
    }

    pub fn is_complete(&self) -> bool {
        self.received == self.size
    }
}

/// Result of a single poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollTick {
    Continue,
    Complete,
    Unparsable,
}

/// Why a polling loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollEnd {
    Complete,
    Unparsable,
    Stopped,
}

/// Polls the upload progress endpoint and drives a progress bar
#[derive(Clone)]
pub struct ProgressPoller {
    client: ScreenClient,
    sink: Arc<dyn EventSink>,
    interval: Duration,
}

impl ProgressPoller {
    pub fn new(client: ScreenClient, sink: Arc<dyn EventSink>) -> Self {
        let interval = client.config().poll_interval();
        Self {
            client,
            sink,
            interval,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Fetch the counters once and update `bar`
    pub async fn poll_once(
        &self,
        token: &ProgressToken,
        bar: &ProgressBar,
        file_name: &str,
    ) -> PollTick {
        let url = self.client.config().cgi_url("/users/ajax/upload_progress");
        let response = match self
            .client
            .get_query(&url, &[(PROGRESS_PARAM, token.as_str())])
            .await
        {
            Ok(response) => response,
            Err(ClientError::Status { status, .. }) => {
                self.sink
                    .alert(format!("Request for {} failed: {}", url, status));
                return PollTick::Continue;
            }
            Err(e) => {
                self.sink.alert(format!("Error updating progress bar: {}", e));
                return PollTick::Continue;
            }
        };

        let text = match response.text().await {
            Ok(text) => text,
            Err(e) => {
                self.sink.alert(format!("Error updating progress bar: {}", e));
                return PollTick::Continue;
            }
        };
        let status: TransferStatus = match parse_json(&text) {
            Ok(status) => status,
            Err(e) => {
                warn!("poll_unparsable: {} body={}", token, text);
                self.sink.alert(e.to_string());
                return PollTick::Unparsable;
            }
        };

        let fraction = status.fraction();
        let label = format!(
            "{}% {} [{} bytes]",
            (fraction * 100.0).floor() as u64,
            file_name,
            status.size
        );
        bar.update(Some(fraction), label).await;

        if status.is_complete() {
            PollTick::Complete
        } else {
            PollTick::Continue
        }
    }

    /// Poll now and then every interval until complete, unparsable or stopped.
    ///
    /// A tick never starts before the previous one's response was handled.
    pub fn start(
        &self,
        token: ProgressToken,
        bar: Arc<ProgressBar>,
        file_name: impl Into<String>,
    ) -> PollHandle {
        let poller = self.clone();
        let cancel = CancellationToken::new();
        let stop = cancel.clone();
        let file_name = file_name.into();
        let loop_token = token.clone();

        let join = tokio::spawn(async move {
            let mut interval = tokio::time::interval(poller.interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!("poll_start: {}", loop_token);
            loop {
                tokio::select! {
                    _ = stop.cancelled() => {
                        info!("poll_stopped: {}", loop_token);
                        return PollEnd::Stopped;
                    }
                    _ = interval.tick() => {}
                }
                match poller.poll_once(&loop_token, &bar, &file_name).await {
                    PollTick::Continue => {}
                    PollTick::Complete => {
                        info!("poll_complete: {}", loop_token);
                        return PollEnd::Complete;
                    }
                    PollTick::Unparsable => return PollEnd::Unparsable,
                }
            }
        });

        PollHandle {
            token,
            cancel,
            join,
        }
    }
}

/// A running poll loop
#[derive(Debug)]
pub struct PollHandle {
    token: ProgressToken,
    cancel: CancellationToken,
    join: JoinHandle<PollEnd>,
}

impl PollHandle {
    pub fn token(&self) -> &ProgressToken {
        &self.token
    }

    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    pub async fn wait(self) -> PollEnd {
        self.join.await.unwrap_or(PollEnd::Stopped)
    }
}

/// At most one active poll per token
#[derive(Debug, Default)]
pub struct PollRegistry {
    polls: Mutex<HashMap<ProgressToken, PollHandle>>,
}

impl PollRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start polling `token`, replacing (and stopping) any earlier poll for it
    pub async fn start(
        &self,
        poller: &ProgressPoller,
        token: ProgressToken,
        bar: Arc<ProgressBar>,
        file_name: impl Into<String>,
    ) {
        let handle = poller.start(token.clone(), bar, file_name);
        let mut polls = self.polls.lock().await;
        polls.retain(|_, h| !h.is_finished());
        if let Some(previous) = polls.insert(token, handle) {
            previous.stop();
        }
    }

    /// Stop and forget the poll for `token`; returns how it ended
    pub async fn stop(&self, token: &ProgressToken) -> Option<PollEnd> {
        let handle = self.polls.lock().await.remove(token)?;
        handle.stop();
        Some(handle.wait().await)
    }

    pub async fn is_active(&self, token: &ProgressToken) -> bool {
        self.polls
            .lock()
            .await
            .get(token)
            .is_some_and(|h| !h.is_finished())
    }
}
