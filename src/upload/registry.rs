//! Registry of running uploads, owned by the panel that started them

use std::collections::HashMap;
use tokio::sync::Mutex;

use super::types::UploadHandle;

#[derive(Debug, Default)]
pub struct UploadRegistry {
    handles: Mutex<HashMap<String, UploadHandle>>,
}

impl UploadRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, handle: UploadHandle) {
        let mut handles = self.handles.lock().await;
        handles.insert(handle.task_id().to_string(), handle);
    }

    pub async fn deregister(&self, task_id: &str) -> Option<UploadHandle> {
        self.handles.lock().await.remove(task_id)
    }

    pub async fn get(&self, task_id: &str) -> Option<UploadHandle> {
        self.handles.lock().await.get(task_id).cloned()
    }

    pub async fn active_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.handles.lock().await.keys().cloned().collect();
        ids.sort();
        ids
    }
}
