//! The sequential chunk PUT loop

use log::{debug, info, warn};
use reqwest::header::{CONTENT_RANGE, CONTENT_TYPE};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{PutError, PutResult};
use crate::plan::ChunkPlan;
use crate::source::{CancelFlag, PutSource};

/// Default chunk size: 1 MiB
pub const DEFAULT_CHUNK_SIZE: u64 = 1024 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PutConfig {
    pub chunk_size: u64,
}

impl Default for PutConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

/// How a transfer loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    /// Every byte was accepted
    Completed { sent: u64 },
    /// The cancel flag was observed; `sent` bytes were accepted before that
    Cancelled { sent: u64 },
}

impl PutOutcome {
    pub fn sent(&self) -> u64 {
        match self {
            PutOutcome::Completed { sent } | PutOutcome::Cancelled { sent } => *sent,
        }
    }
}

/// Sends one source to one URL, a chunk at a time
#[derive(Debug, Clone)]
pub struct SequentialPut {
    client: Client,
    config: PutConfig,
}

impl SequentialPut {
    pub fn new(client: Client, config: PutConfig) -> PutResult<Self> {
        if config.chunk_size == 0 {
            return Err(PutError::ChunkSize(0));
        }
        Ok(Self { client, config })
    }

    pub fn chunk_size(&self) -> u64 {
        self.config.chunk_size
    }

    /// PUT `source[offset..total]` to `url`.
    ///
    /// Chunk N+1 is only read and sent after chunk N's response has arrived.
    /// `on_progress(sent, total)` runs after every accepted chunk. A cancelled
    /// flag stops the loop before the next chunk and discards the result of a
    /// chunk whose response arrives after cancellation.
    pub async fn run<F>(
        &self,
        url: &str,
        source: &PutSource,
        offset: u64,
        total: u64,
        cancel: &CancelFlag,
        mut on_progress: F,
    ) -> PutResult<PutOutcome>
    where
        F: FnMut(u64, u64),
    {
        let mut sent = offset.min(total);
        let plan = ChunkPlan::resume_at(sent, total, self.config.chunk_size);
        info!(
            "put_start: {} total={} offset={} chunks={}",
            url,
            total,
            sent,
            plan.remaining()
        );

        for range in plan {
            if cancel.is_cancelled() {
                info!("put_cancelled: {} sent={}", url, sent);
                return Ok(PutOutcome::Cancelled { sent });
            }

            let body = source.read_range(&range).await?;
            debug!("put_chunk: {} range={}", url, range);

            let response = self
                .client
                .put(url)
                .header(CONTENT_RANGE, range.header_value())
                .header(CONTENT_TYPE, "application/octet-stream")
                .body(body)
                .send()
                .await?;

            if cancel.is_cancelled() {
                info!("put_cancelled: {} sent={} (late response ignored)", url, sent);
                return Ok(PutOutcome::Cancelled { sent });
            }

            if !response.status().is_success() {
                let status = response.status().as_u16();
                let body = response.text().await.unwrap_or_default();
                warn!("put_failed: {} range={} status={}", url, range, status);
                return Err(PutError::Status {
                    status,
                    range: range.header_value(),
                    body,
                });
            }

            sent += range.size();
            on_progress(sent, total);
        }

        info!("put_finish: {} sent={}", url, sent);
        Ok(PutOutcome::Completed { sent })
    }
}
