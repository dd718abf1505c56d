//! UI event types and the sink the host application implements

use log::{info, warn};
use serde::Serialize;
use tokio::sync::mpsc;

/// Everything the client asks the host UI to show or change
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum UiEvent {
    UploadQueued {
        task_id: String,
        file_name: String,
        total_bytes: u64,
    },
    UploadProgress {
        task_id: String,
        percent: u32,
        uploaded_bytes: u64,
        total_bytes: u64,
    },
    /// The interactive progress UI for a task must disappear
    ProgressHidden { task_id: String },
    UploadFinished {
        task_id: String,
        document_id: String,
    },
    /// The task halted; its progress UI stays so the user can cancel it
    UploadFailed { task_id: String, error: String },
    BarRendered {
        bar_id: String,
        background_offset: i64,
        label: String,
    },
    RowInserted {
        panel: String,
        document_id: String,
        html: String,
    },
    RowReplaced {
        panel: String,
        document_id: String,
        html: String,
    },
    RowRemoved { panel: String, document_id: String },
    /// Adjacent rows exchanged places (animated by the host)
    RowsSwapped {
        panel: String,
        left: String,
        right: String,
    },
    Messages { panel: String, messages: Vec<String> },
    /// Blocking, user-visible alert
    Alert { message: String },
}

impl UiEvent {
    pub fn name(&self) -> &'static str {
        match self {
            UiEvent::UploadQueued { .. } => "upload-queued",
            UiEvent::UploadProgress { .. } => "upload-progress",
            UiEvent::ProgressHidden { .. } => "progress-hidden",
            UiEvent::UploadFinished { .. } => "upload-finished",
            UiEvent::UploadFailed { .. } => "upload-failed",
            UiEvent::BarRendered { .. } => "bar-rendered",
            UiEvent::RowInserted { .. } => "row-inserted",
            UiEvent::RowReplaced { .. } => "row-replaced",
            UiEvent::RowRemoved { .. } => "row-removed",
            UiEvent::RowsSwapped { .. } => "rows-swapped",
            UiEvent::Messages { .. } => "messages",
            UiEvent::Alert { .. } => "alert",
        }
    }
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: UiEvent);

    /// Non-fatal yes/no prompt
    fn confirm(&self, message: &str) -> bool;

    fn alert(&self, message: String) {
        self.emit(UiEvent::Alert { message });
    }
}

/// Forwards events over a channel to the host's UI loop
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: mpsc::UnboundedSender<UiEvent>,
    accept_prompts: bool,
}

impl ChannelSink {
    pub fn new(accept_prompts: bool) -> (Self, mpsc::UnboundedReceiver<UiEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (
            Self {
                sender,
                accept_prompts,
            },
            receiver,
        )
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: UiEvent) {
        // Receiver gone means the page is being torn down
        let _ = self.sender.send(event);
    }

    fn confirm(&self, message: &str) -> bool {
        info!("confirm: {} -> {}", message, self.accept_prompts);
        self.accept_prompts
    }
}

/// Writes events to the log only
#[derive(Debug, Clone, Default)]
pub struct LogSink {
    pub accept_prompts: bool,
}

impl EventSink for LogSink {
    fn emit(&self, event: UiEvent) {
        match &event {
            UiEvent::Alert { message } => warn!("alert: {}", message),
            UiEvent::UploadFailed { task_id, error } => {
                warn!("upload_failed: {} error={}", task_id, error)
            }
            other => info!("{}: {:?}", other.name(), other),
        }
    }

    fn confirm(&self, message: &str) -> bool {
        info!("confirm: {} -> {}", message, self.accept_prompts);
        self.accept_prompts
    }
}
