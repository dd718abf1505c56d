//! Upload task state and server payloads

use range_put::{CancelFlag, PutSource};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use crate::error::Result;
use crate::http::deserialize_id;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum UploadStatus {
    #[serde(rename = "queued")]
    Queued,
    #[serde(rename = "creating")]
    Creating,
    #[serde(rename = "uploading")]
    Uploading,
    #[serde(rename = "finishing")]
    Finishing,
    #[serde(rename = "completed")]
    Completed,
    #[serde(rename = "failed")]
    Failed,
    #[serde(rename = "cancelled")]
    Cancelled,
}

impl std::fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UploadStatus::Queued => write!(f, "queued"),
            UploadStatus::Creating => write!(f, "creating"),
            UploadStatus::Uploading => write!(f, "uploading"),
            UploadStatus::Finishing => write!(f, "finishing"),
            UploadStatus::Completed => write!(f, "completed"),
            UploadStatus::Failed => write!(f, "failed"),
            UploadStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Identifiers the server assigns when the record is created
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteIds {
    #[serde(
        rename = "documentId",
        alias = "docid",
        alias = "document_id",
        deserialize_with = "deserialize_id"
    )]
    pub document_id: String,
    #[serde(
        rename = "fileId",
        alias = "fileid",
        alias = "file_id",
        deserialize_with = "deserialize_id"
    )]
    pub file_id: String,
}

/// State shared between a running task and the handles that may cancel it
#[derive(Debug, Default)]
pub(crate) struct TaskShared {
    pub(crate) cancel: CancelFlag,
    pub(crate) sent: AtomicU64,
    pub(crate) remote: OnceLock<RemoteIds>,
    remote_deleted: AtomicBool,
}

/// One local file being uploaded
#[derive(Debug)]
pub struct UploadTask {
    id: String,
    file_name: String,
    mime_type: String,
    source: PutSource,
    total: u64,
    status: UploadStatus,
    shared: Arc<TaskShared>,
}

impl UploadTask {
    pub fn new(
        file_name: impl Into<String>,
        mime_type: impl Into<String>,
        source: PutSource,
        total: u64,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            source,
            total,
            status: UploadStatus::Queued,
            shared: Arc::new(TaskShared::default()),
        }
    }

    pub fn from_bytes(
        file_name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
    ) -> Self {
        let bytes = bytes.into();
        let total = bytes.len() as u64;
        Self::new(file_name, mime_type, PutSource::from_bytes(bytes), total)
    }

    /// Task for a file on disk; the display name is the file name
    pub async fn from_path(path: impl Into<PathBuf>, mime_type: impl Into<String>) -> Result<Self> {
        let path = path.into();
        let total = tokio::fs::metadata(&path).await?.len();
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();
        Ok(Self::new(file_name, mime_type, PutSource::Path(path), total))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn source(&self) -> &PutSource {
        &self.source
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn sent(&self) -> u64 {
        self.shared.sent.load(Ordering::SeqCst)
    }

    pub fn status(&self) -> UploadStatus {
        self.status
    }

    pub fn remote(&self) -> Option<&RemoteIds> {
        self.shared.remote.get()
    }

    /// Document the task's row belongs to, once the record exists
    pub fn document_id(&self) -> Option<&str> {
        self.remote().map(|r| r.document_id.as_str())
    }

    pub fn is_cancelled(&self) -> bool {
        self.shared.cancel.is_cancelled()
    }

    pub fn cancel_flag(&self) -> &CancelFlag {
        &self.shared.cancel
    }

    pub fn handle(&self) -> UploadHandle {
        UploadHandle {
            task_id: self.id.clone(),
            shared: self.shared.clone(),
        }
    }

    pub(crate) fn set_status(&mut self, status: UploadStatus) {
        self.status = status;
    }

    /// Remote identifiers are assigned once; later assignments are ignored
    pub(crate) fn set_remote(&self, ids: RemoteIds) {
        let _ = self.shared.remote.set(ids);
    }

    pub(crate) fn shared(&self) -> Arc<TaskShared> {
        self.shared.clone()
    }
}

impl TaskShared {
    /// Offset only moves forward and never past `total`
    pub(crate) fn advance_to(&self, sent: u64, total: u64) {
        self.sent.fetch_max(sent.min(total), Ordering::SeqCst);
    }

    /// True for exactly one caller: whoever deletes the remote file
    pub(crate) fn claim_remote_delete(&self) -> bool {
        !self.remote_deleted.swap(true, Ordering::SeqCst)
    }
}

/// Cloneable reference used to cancel or observe a running task
#[derive(Debug, Clone)]
pub struct UploadHandle {
    task_id: String,
    shared: Arc<TaskShared>,
}

impl UploadHandle {
    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    /// Set the cancellation flag; it is never cleared
    pub fn cancel(&self) {
        self.shared.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.shared.cancel.is_cancelled()
    }

    pub fn sent(&self) -> u64 {
        self.shared.sent.load(Ordering::SeqCst)
    }

    pub fn file_id(&self) -> Option<&str> {
        self.shared.remote.get().map(|r| r.file_id.as_str())
    }

    pub(crate) fn claim_remote_delete(&self) -> bool {
        self.shared.claim_remote_delete()
    }
}

/// How an upload ended when it did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    Completed { document_id: String },
    Cancelled,
}
