//! Document panel payloads

use serde::{Deserialize, Serialize};

use crate::http::deserialize_id;

/// One entry of the server's canonical document order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerDocument {
    #[serde(alias = "docid", deserialize_with = "deserialize_id")]
    pub id: String,
    /// The row must be fetched again even if it is already shown
    #[serde(default, alias = "dirty")]
    pub refresh: bool,
}

impl ServerDocument {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            refresh: false,
        }
    }

    pub fn dirty(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            refresh: true,
        }
    }
}

/// Canonical document set returned by panel actions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DocumentsResponse {
    pub documents: Vec<ServerDocument>,
    pub messages: Vec<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DocumentsPayload {
    Wrapped {
        documents: Vec<ServerDocument>,
        #[serde(default)]
        messages: Vec<String>,
    },
    Bare(Vec<ServerDocument>),
}

// Older screens answer with the bare document array
impl<'de> Deserialize<'de> for DocumentsResponse {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        Ok(match DocumentsPayload::deserialize(deserializer)? {
            DocumentsPayload::Wrapped {
                documents,
                messages,
            } => DocumentsResponse {
                documents,
                messages,
            },
            DocumentsPayload::Bare(documents) => DocumentsResponse {
                documents,
                messages: Vec::new(),
            },
        })
    }
}

/// Rendered row of one document, acquired once and swapped in place
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRow {
    pub html: String,
}

/// A file stored under a document, as listed by the document resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFile {
    #[serde(alias = "fileid", deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(alias = "filename")]
    pub name: String,
    #[serde(alias = "filesize")]
    pub size: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RemoteDocument {
    #[serde(default)]
    pub files: Vec<RemoteFile>,
}

/// How a panel action expects the server to answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    /// Answer is the canonical document set as JSON
    Automatic,
    /// Answer is an HTML fragment holding a dialog form
    Interactive,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionResult {
    Reconciled(ReconcileReport),
    Dialog(String),
}

/// What a reconciliation changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub removed: Vec<String>,
    pub fetched: Vec<String>,
    pub swaps: Vec<super::list::Swap>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshResult {
    Inserted,
    Replaced,
    /// The server no longer has the document
    Removed,
}

/// Outcome of one multi-file upload batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// The user declined the cardinality prompt; nothing was started
    pub declined: bool,
    pub completed: Vec<String>,
    pub cancelled: Vec<String>,
    pub failed: Vec<(String, String)>,
}

impl BatchReport {
    pub fn declined() -> Self {
        Self {
            declined: true,
            ..Self::default()
        }
    }
}
