//! Chunked file upload
//!
//! Each selected or dropped file becomes an `UploadTask` that:
//! - creates a remote document/file record
//! - PUTs its bytes sequentially as `Content-Range` chunks
//! - notifies the server when every byte is in
//!
//! Tasks run independently of each other and can be cancelled at any time.

mod controller;
mod registry;
mod types;

pub use controller::{UploadController, CREATE_FILE_ACTION, UPLOAD_DONE_ACTION};
pub use registry::UploadRegistry;
pub use types::{RemoteIds, UploadHandle, UploadOutcome, UploadStatus, UploadTask};
