//! Document upload panels
//!
//! - `list`: ordered upload list and reconciliation with the server order
//! - `panel`: one panel's rows, actions, uploads and proxied-upload polling
//! - `registry`: the panels of a page
//! - `types`: server payloads and results

mod list;
mod panel;
mod registry;
mod types;

pub use list::{ListEntry, ReconcilePlan, Swap, UploadList};
pub use panel::{DocumentPanel, UploadBatch};
pub use registry::{PanelRegistry, SharedPanel};
pub use types::{
    ActionKind, ActionResult, BatchReport, DocumentRow, DocumentsResponse, ReconcileReport,
    RefreshResult, RemoteFile, ServerDocument,
};
