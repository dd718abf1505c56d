//! Registry of the document panels shown on one page
//!
//! Owned by the page controller; panels are registered when created and
//! deregistered on teardown.

use log::{info, warn};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::panel::DocumentPanel;
use super::types::RefreshResult;
use crate::error::ClientError;

pub type SharedPanel = Arc<Mutex<DocumentPanel>>;

#[derive(Default)]
pub struct PanelRegistry {
    panels: HashMap<String, SharedPanel>,
}

impl PanelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a panel under its prefix, replacing any panel with the same prefix
    pub fn register(&mut self, panel: DocumentPanel) -> SharedPanel {
        let prefix = panel.prefix().to_string();
        let shared = Arc::new(Mutex::new(panel));
        if self.panels.insert(prefix.clone(), shared.clone()).is_some() {
            warn!("panel_replaced: {}", prefix);
        }
        info!("panel_registered: {}", prefix);
        shared
    }

    pub fn deregister(&mut self, prefix: &str) -> Option<SharedPanel> {
        let panel = self.panels.remove(prefix);
        if panel.is_some() {
            info!("panel_deregistered: {}", prefix);
        }
        panel
    }

    pub fn get(&self, prefix: &str) -> Option<SharedPanel> {
        self.panels.get(prefix).cloned()
    }

    pub fn prefixes(&self) -> Vec<String> {
        let mut prefixes: Vec<String> = self.panels.keys().cloned().collect();
        prefixes.sort();
        prefixes
    }

    pub fn len(&self) -> usize {
        self.panels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.panels.is_empty()
    }

    /// Cancel a running upload in whichever panel started it
    pub async fn cancel_upload(&self, task_id: &str) -> bool {
        for prefix in self.prefixes() {
            if let Some(panel) = self.panels.get(&prefix) {
                if panel.lock().await.cancel_upload(task_id).await {
                    return true;
                }
            }
        }
        false
    }

    /// Refresh a document's row wherever it is shown.
    ///
    /// Panels already listing the document refresh it; when none does, every
    /// panel fetches it as a new row.
    pub async fn refresh_everywhere(
        &self,
        docid: &str,
    ) -> Vec<(String, Result<RefreshResult, ClientError>)> {
        let mut showing = Vec::new();
        for prefix in self.prefixes() {
            if let Some(panel) = self.panels.get(&prefix) {
                if panel.lock().await.list().contains(docid) {
                    showing.push(prefix);
                }
            }
        }
        let targets = if showing.is_empty() {
            self.prefixes()
        } else {
            showing
        };

        let mut results = Vec::new();
        for prefix in targets {
            if let Some(panel) = self.panels.get(&prefix) {
                let result = panel.lock().await.refresh_document(docid).await;
                results.push((prefix, result));
            }
        }
        results
    }
}
