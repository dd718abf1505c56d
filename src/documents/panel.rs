//! Document upload panel: the rows of one component, its actions and uploads

use futures_util::future::join_all;
use log::{info, warn};
use std::sync::Arc;

use super::list::{Swap, UploadList};
use super::registry::SharedPanel;
use super::types::{
    ActionKind, ActionResult, BatchReport, DocumentRow, DocumentsResponse, ReconcileReport,
    RefreshResult, RemoteDocument, RemoteFile,
};
use crate::error::{ClientError, Result};
use crate::events::{EventSink, UiEvent};
use crate::http::{read_json, FormParams, ScreenClient};
use crate::progress::{
    attach_token, PollEnd, PollRegistry, ProgressBar, ProgressPoller, ProgressToken,
};
use crate::upload::{UploadController, UploadOutcome, UploadRegistry, UploadTask};

pub struct DocumentPanel {
    prefix: String,
    client: ScreenClient,
    sink: Arc<dyn EventSink>,
    form: FormParams,
    list: UploadList<DocumentRow>,
    controller: UploadController,
    uploads: Arc<UploadRegistry>,
    poller: ProgressPoller,
    polls: PollRegistry,
}

impl DocumentPanel {
    /// `form` is the serialised form the panel lives in
    pub fn new(
        prefix: impl Into<String>,
        client: ScreenClient,
        sink: Arc<dyn EventSink>,
        form: FormParams,
    ) -> Result<Self> {
        let prefix = prefix.into();
        let controller =
            UploadController::new(client.clone(), sink.clone(), prefix.clone(), form.clone())?;
        let poller = ProgressPoller::new(client.clone(), sink.clone());
        Ok(Self {
            prefix,
            client,
            sink,
            form,
            list: UploadList::new(),
            controller,
            uploads: Arc::new(UploadRegistry::new()),
            poller,
            polls: PollRegistry::new(),
        })
    }

    /// Adopt the rows already rendered on the page, in page order
    pub fn with_rows<I, S>(mut self, rows: I) -> Self
    where
        I: IntoIterator<Item = (S, String)>,
        S: Into<String>,
    {
        for (id, html) in rows {
            self.list.push(id, DocumentRow { html });
        }
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn list(&self) -> &UploadList<DocumentRow> {
        &self.list
    }

    pub fn document_ids(&self) -> Vec<String> {
        self.list.ids()
    }

    /// Controller for cancelling uploads while the panel is busy
    pub fn upload_controller(&self) -> UploadController {
        self.controller.clone()
    }

    pub fn uploads(&self) -> Arc<UploadRegistry> {
        self.uploads.clone()
    }

    pub fn poller(&self) -> &ProgressPoller {
        &self.poller
    }

    fn component_params(&self) -> FormParams {
        let mut params = self.form.clone();
        params.set("component", self.prefix.as_str());
        params
    }

    /// Fetch the rendered row of `docid` and splice it into the list
    pub async fn refresh_document(&mut self, docid: &str) -> Result<RefreshResult> {
        let mut params = self.component_params();
        params.remove(&format!("{}_update_doc", self.prefix));
        params.set(format!("{}_export", self.prefix), docid);

        let url = self.client.config().screen_url();
        let response = match self.client.post_form(&url, &params).await {
            Ok(response) => response,
            Err(e) if e.status_code() == Some(404) => {
                info!("panel_refresh_gone: {} doc={}", self.prefix, docid);
                if self.list.remove(docid).is_some() {
                    self.emit_removed(docid);
                }
                return Ok(RefreshResult::Removed);
            }
            Err(e) => return Err(e),
        };
        let html = response.text().await?;

        let result = match self.list.upsert(docid, DocumentRow { html: html.clone() }) {
            Some(_) => {
                self.sink.emit(UiEvent::RowReplaced {
                    panel: self.prefix.clone(),
                    document_id: docid.to_string(),
                    html,
                });
                RefreshResult::Replaced
            }
            None => {
                self.sink.emit(UiEvent::RowInserted {
                    panel: self.prefix.clone(),
                    document_id: docid.to_string(),
                    html,
                });
                RefreshResult::Inserted
            }
        };
        info!("panel_refresh: {} doc={} result={:?}", self.prefix, docid, result);
        Ok(result)
    }

    fn emit_removed(&self, docid: &str) {
        self.sink.emit(UiEvent::RowRemoved {
            panel: self.prefix.clone(),
            document_id: docid.to_string(),
        });
    }

    /// Bring the rows in line with the server's canonical document set.
    ///
    /// Removes rows the server dropped, fetches new or dirty rows, then
    /// reorders with adjacent swaps so untouched rows keep their state.
    pub async fn apply_server_state(
        &mut self,
        response: DocumentsResponse,
    ) -> Result<ReconcileReport> {
        if !response.messages.is_empty() {
            self.sink.emit(UiEvent::Messages {
                panel: self.prefix.clone(),
                messages: response.messages.clone(),
            });
        }

        let plan = self.list.plan(&response.documents);

        for docid in &plan.removals {
            self.list.remove(docid);
            self.emit_removed(docid);
        }

        for docid in &plan.fetches {
            if let Err(e) = self.refresh_document(docid).await {
                warn!("panel_fetch_failed: {} doc={} error={}", self.prefix, docid, e);
                self.sink.alert(e.to_string());
            }
        }

        if self.list.len() != response.documents.len() {
            let err = ClientError::ListMismatch {
                local: self.list.len(),
                server: response.documents.len(),
            };
            self.sink.alert(err.to_string());
            return Err(err);
        }

        let swaps = self.list.reorder(&plan.order);
        self.emit_swaps(&swaps);

        info!(
            "panel_reconcile: {} removed={} fetched={} swaps={}",
            self.prefix,
            plan.removals.len(),
            plan.fetches.len(),
            swaps.len()
        );
        Ok(ReconcileReport {
            removed: plan.removals,
            fetched: plan.fetches,
            swaps,
        })
    }

    fn emit_swaps(&self, swaps: &[Swap]) {
        for swap in swaps {
            self.sink.emit(UiEvent::RowsSwapped {
                panel: self.prefix.clone(),
                left: swap.left.clone(),
                right: swap.right.clone(),
            });
        }
    }

    /// Run a document action such as `_internal_<prefix>_up` or a conversion.
    ///
    /// Automatic actions answer with the document set; interactive ones with
    /// a dialog fragment to be submitted through `submit_dialog`.
    pub async fn run_action(
        &mut self,
        docid: &str,
        action: &str,
        kind: ActionKind,
    ) -> Result<ActionResult> {
        let mut params = self.component_params();
        params
            .set(format!("{}_update_doc", self.prefix), docid)
            .set(format!("{}_export", self.prefix), docid)
            .flag(action);

        let url = self.client.config().screen_url();
        let response = self.client.post_form(&url, &params).await.inspect_err(|e| {
            self.sink.alert(e.to_string());
        })?;

        match kind {
            ActionKind::Automatic => {
                let documents = self.read_documents(response).await?;
                Ok(ActionResult::Reconciled(
                    self.apply_server_state(documents).await?,
                ))
            }
            ActionKind::Interactive => Ok(ActionResult::Dialog(response.text().await?)),
        }
    }

    /// Submit a dialog form opened by an interactive action; `button` is the
    /// submit input that was pressed
    pub async fn submit_dialog(
        &mut self,
        dialog: FormParams,
        button: &str,
    ) -> Result<ReconcileReport> {
        let mut params = dialog;
        params.flag(button).flag("export");

        let url = self.client.config().screen_url();
        let response = self.client.post_form(&url, &params).await.inspect_err(|e| {
            self.sink.alert(e.to_string());
        })?;
        let documents = self.read_documents(response).await?;
        self.apply_server_state(documents).await
    }

    async fn read_documents(&self, response: reqwest::Response) -> Result<DocumentsResponse> {
        read_json(response).await.inspect_err(|e| {
            self.sink.alert(e.to_string());
        })
    }

    /// Confirm, register and announce a batch of selected or dropped files.
    ///
    /// Batches larger than `max_batch_files` need confirmation; declining
    /// starts nothing and returns `None`. The returned batch runs without
    /// borrowing the panel, so `cancel_upload` stays usable while it runs.
    pub async fn begin_uploads(&self, tasks: Vec<UploadTask>) -> Option<UploadBatch> {
        let limit = self.client.config().max_batch_files;
        if tasks.len() > limit {
            let question = format!(
                "You are about to upload {} files. Do you want to continue?",
                tasks.len()
            );
            if !self.sink.confirm(&question) {
                info!("upload_batch_declined: {} files={}", self.prefix, tasks.len());
                return None;
            }
        }

        for task in &tasks {
            self.uploads.register(task.handle()).await;
            self.sink.emit(UiEvent::UploadQueued {
                task_id: task.id().to_string(),
                file_name: task.file_name().to_string(),
                total_bytes: task.total(),
            });
        }
        Some(UploadBatch {
            controller: self.controller.clone(),
            uploads: self.uploads.clone(),
            tasks,
        })
    }

    /// Show the rows of a finished batch's completed uploads
    pub async fn complete_uploads(&mut self, report: &BatchReport) {
        for docid in &report.completed {
            if let Err(e) = self.refresh_document(docid).await {
                self.sink.alert(e.to_string());
            }
        }
    }

    /// Upload a batch on a panel the caller owns outright.
    ///
    /// Each file runs its own sequential chunk loop and the loops are
    /// interleaved. Rows of completed uploads are refreshed.
    pub async fn upload_files(&mut self, tasks: Vec<UploadTask>) -> BatchReport {
        let Some(batch) = self.begin_uploads(tasks).await else {
            return BatchReport::declined();
        };
        let report = batch.run().await;
        self.complete_uploads(&report).await;
        report
    }

    /// Upload a batch on a shared panel, holding its lock only to start the
    /// batch and to refresh rows afterwards
    pub async fn upload_shared(panel: &SharedPanel, tasks: Vec<UploadTask>) -> BatchReport {
        let batch = panel.lock().await.begin_uploads(tasks).await;
        let Some(batch) = batch else {
            return BatchReport::declined();
        };
        let report = batch.run().await;
        panel.lock().await.complete_uploads(&report).await;
        report
    }

    /// Cancel a running upload of this panel; false if it is not running
    pub async fn cancel_upload(&self, task_id: &str) -> bool {
        match self.uploads.get(task_id).await {
            Some(handle) => {
                self.controller.cancel(&handle).await;
                true
            }
            None => false,
        }
    }

    /// Prepare a form submission whose progress is only visible server-side.
    ///
    /// Returns the form action carrying the progress token; polling starts now.
    pub async fn start_proxied_upload(
        &self,
        form_action: &str,
        file_name: &str,
        bar: Arc<ProgressBar>,
    ) -> (ProgressToken, String) {
        let token = ProgressToken::new();
        let action = attach_token(form_action, &token);
        self.polls
            .start(&self.poller, token.clone(), bar, file_name)
            .await;
        (token, action)
    }

    /// The proxied submission returned: stop polling and show the document
    pub async fn finish_proxied_upload(
        &mut self,
        token: &ProgressToken,
        docid: Option<&str>,
    ) -> Result<Option<PollEnd>> {
        let end = self.polls.stop(token).await;
        if let Some(docid) = docid {
            self.refresh_document(docid).await?;
        }
        Ok(end)
    }

    pub async fn is_polling(&self, token: &ProgressToken) -> bool {
        self.polls.is_active(token).await
    }

    /// Files the server holds for a document
    pub async fn list_remote_files(&self, docid: &str) -> Result<Vec<RemoteFile>> {
        let url = self.client.config().document_url(docid);
        let response = self.client.get_json_resource(&url).await?;
        let document: RemoteDocument = read_json(response).await?;
        Ok(document.files)
    }
}

/// Registered uploads of one panel, detached from the panel while they run
pub struct UploadBatch {
    controller: UploadController,
    uploads: Arc<UploadRegistry>,
    tasks: Vec<UploadTask>,
}

impl UploadBatch {
    pub fn task_ids(&self) -> Vec<String> {
        self.tasks.iter().map(|t| t.id().to_string()).collect()
    }

    /// Run every upload to its end, then deregister them
    pub async fn run(mut self) -> BatchReport {
        let controller = self.controller;
        let results = join_all(self.tasks.iter_mut().map(|task| controller.upload(task))).await;

        let mut report = BatchReport::default();
        for (task, result) in self.tasks.iter().zip(results) {
            self.uploads.deregister(task.id()).await;
            match result {
                Ok(UploadOutcome::Completed { document_id }) => {
                    report.completed.push(document_id)
                }
                Ok(UploadOutcome::Cancelled) => report.cancelled.push(task.id().to_string()),
                Err(e) => report.failed.push((task.id().to_string(), e.to_string())),
            }
        }
        report
    }
}
