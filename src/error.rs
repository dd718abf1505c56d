use range_put::PutError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Request for {url} failed: {status} - {body}")]
    Status {
        status: u16,
        url: String,
        body: String,
    },

    #[error("Request could not be sent: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Expected {expected} but got: {raw}")]
    Malformed { expected: &'static str, raw: String },

    #[error("Upload {task_id} has no remote record yet")]
    NotCreated { task_id: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Removing/adding documents resulted in length mismatch ({local} local, {server} on server)")]
    ListMismatch { local: usize, server: usize },

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl ClientError {
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ClientError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<PutError> for ClientError {
    fn from(err: PutError) -> Self {
        match err {
            PutError::Io(e) => ClientError::Io(e),
            PutError::Request(e) => ClientError::Request(e),
            PutError::Status {
                status,
                range,
                body,
            } => ClientError::Status {
                status,
                url: format!("chunk {}", range),
                body,
            },
            PutError::ChunkSize(size) => ClientError::Config(format!("chunk size {}", size)),
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
