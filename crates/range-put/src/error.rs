use thiserror::Error;

#[derive(Error, Debug)]
pub enum PutError {
    #[error("Failed to read source: {0}")]
    Io(#[from] std::io::Error),

    #[error("Chunk request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Chunk {range} rejected: {status} - {body}")]
    Status {
        status: u16,
        range: String,
        body: String,
    },

    #[error("Invalid chunk size: {0}")]
    ChunkSize(u64),
}

pub type PutResult<T> = Result<T, PutError>;
