//! Chunked upload controller - create record, send chunks, finish, cancel

use log::{info, warn};
use range_put::{PutOutcome, SequentialPut};
use std::sync::Arc;

use super::types::{RemoteIds, UploadHandle, UploadOutcome, UploadStatus, UploadTask};
use crate::error::{ClientError, Result};
use crate::events::{EventSink, UiEvent};
use crate::http::{read_json, FormParams, ScreenClient};

/// `_internal_<prefix>_create_file`: create the document/file placeholder
pub const CREATE_FILE_ACTION: &str = "create_file";
/// `_internal_<prefix>_upload_done`: every byte of the file has been sent
pub const UPLOAD_DONE_ACTION: &str = "upload_done";

pub(crate) fn percent(sent: u64, total: u64) -> u32 {
    if total == 0 {
        return 100;
    }
    std::cmp::min(((sent as f64 / total as f64) * 100.0) as u32, 100)
}

/// Drives uploads for one document panel
#[derive(Clone)]
pub struct UploadController {
    client: ScreenClient,
    put: SequentialPut,
    sink: Arc<dyn EventSink>,
    prefix: String,
    context: FormParams,
}

impl UploadController {
    /// `context` carries the session/form fields every request must repeat
    pub fn new(
        client: ScreenClient,
        sink: Arc<dyn EventSink>,
        prefix: impl Into<String>,
        context: FormParams,
    ) -> Result<Self> {
        let put = SequentialPut::new(client.http().clone(), client.config().put_config())?;
        Ok(Self {
            client,
            put,
            sink,
            prefix: prefix.into(),
            context,
        })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn base_params(&self) -> FormParams {
        let mut params = self.context.clone();
        params.set("component", self.prefix.as_str());
        params
    }

    fn internal_flag(&self, action: &str) -> String {
        format!("_internal_{}_{}", self.prefix, action)
    }

    /// Ask the server for a document/file placeholder for `task`
    pub async fn create_record(&self, task: &UploadTask) -> Result<RemoteIds> {
        let mut params = self.base_params();
        params
            .set("filename", task.file_name())
            .set("filesize", task.total().to_string())
            .set("mime_type", task.mime_type())
            .flag(&self.internal_flag(CREATE_FILE_ACTION));

        let url = self.client.config().screen_url();
        let response = self.client.post_form(&url, &params).await?;
        let ids: RemoteIds = read_json(response).await?;

        info!(
            "upload_create: {} document={} file={}",
            task.id(),
            ids.document_id,
            ids.file_id
        );
        task.set_remote(ids.clone());
        Ok(ids)
    }

    /// Send the remaining bytes of `task`, one chunk per request
    pub async fn send_chunks(&self, task: &UploadTask) -> Result<PutOutcome> {
        let file_id = task
            .remote()
            .map(|r| r.file_id.clone())
            .ok_or_else(|| ClientError::NotCreated {
                task_id: task.id().to_string(),
            })?;
        let url = self.client.config().file_url(&file_id);

        let shared = task.shared();
        let sink = self.sink.clone();
        let task_id = task.id().to_string();
        let outcome = self
            .put
            .run(
                &url,
                task.source(),
                task.sent(),
                task.total(),
                task.cancel_flag(),
                |sent, total| {
                    shared.advance_to(sent, total);
                    sink.emit(UiEvent::UploadProgress {
                        task_id: task_id.clone(),
                        percent: percent(sent, total),
                        uploaded_bytes: sent,
                        total_bytes: total,
                    });
                },
            )
            .await?;
        Ok(outcome)
    }

    /// Tell the server the transfer is complete
    pub async fn finish(&self, task: &UploadTask) -> Result<String> {
        let document_id = task
            .document_id()
            .map(str::to_string)
            .ok_or_else(|| ClientError::NotCreated {
                task_id: task.id().to_string(),
            })?;

        let mut params = self.base_params();
        params
            .set(format!("{}_update_doc", self.prefix), document_id.as_str())
            .flag(&self.internal_flag(UPLOAD_DONE_ACTION));

        let url = self.client.config().screen_url();
        self.client.post_form(&url, &params).await?;

        info!("upload_finish: {} document={}", task.id(), document_id);
        self.sink.emit(UiEvent::UploadFinished {
            task_id: task.id().to_string(),
            document_id: document_id.clone(),
        });
        Ok(document_id)
    }

    /// Cancel a task: hide its progress UI now and drop the remote file if one exists.
    ///
    /// A chunk response that arrives afterwards has no effect.
    pub async fn cancel(&self, handle: &UploadHandle) {
        handle.cancel();
        info!("upload_cancel: {} sent={}", handle.task_id(), handle.sent());
        self.sink.emit(UiEvent::ProgressHidden {
            task_id: handle.task_id().to_string(),
        });
        if let Some(file_id) = handle.file_id() {
            if handle.claim_remote_delete() {
                self.delete_file(file_id).await;
            }
        }
    }

    async fn delete_file(&self, file_id: &str) {
        let url = self.client.config().file_url(file_id);
        match self.client.delete(&url).await {
            Ok(_) => info!("upload_delete: file={}", file_id),
            Err(e) => warn!("upload_delete_failed: file={} error={}", file_id, e),
        }
    }

    /// Create, send and finish one task.
    ///
    /// Failures alert the user and leave the task's progress UI in place; they
    /// are never retried.
    pub async fn upload(&self, task: &mut UploadTask) -> Result<UploadOutcome> {
        if task.is_cancelled() {
            task.set_status(UploadStatus::Cancelled);
            return Ok(UploadOutcome::Cancelled);
        }

        if task.remote().is_none() {
            task.set_status(UploadStatus::Creating);
            if let Err(e) = self.create_record(task).await {
                return Err(self.fail(task, e));
            }
            if task.is_cancelled() {
                // Cancelled while the record was being created; a cancel that
                // already saw the file id has deleted it
                if let Some(ids) = task.remote().cloned() {
                    if task.shared().claim_remote_delete() {
                        self.delete_file(&ids.file_id).await;
                    }
                }
                task.set_status(UploadStatus::Cancelled);
                return Ok(UploadOutcome::Cancelled);
            }
        }

        task.set_status(UploadStatus::Uploading);
        match self.send_chunks(task).await {
            Ok(PutOutcome::Completed { .. }) => {}
            Ok(PutOutcome::Cancelled { .. }) => {
                task.set_status(UploadStatus::Cancelled);
                return Ok(UploadOutcome::Cancelled);
            }
            Err(e) => return Err(self.fail(task, e)),
        }

        task.set_status(UploadStatus::Finishing);
        match self.finish(task).await {
            Ok(document_id) => {
                task.set_status(UploadStatus::Completed);
                Ok(UploadOutcome::Completed { document_id })
            }
            Err(e) => Err(self.fail(task, e)),
        }
    }

    fn fail(&self, task: &mut UploadTask, err: ClientError) -> ClientError {
        warn!(
            "upload_failed: {} status={} error={}",
            task.id(),
            task.status(),
            err
        );
        task.set_status(UploadStatus::Failed);
        self.sink.alert(format!("{}: {}", task.file_name(), err));
        self.sink.emit(UiEvent::UploadFailed {
            task_id: task.id().to_string(),
            error: err.to_string(),
        });
        err
    }
}
