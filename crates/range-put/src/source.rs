//! Upload sources and the cancellation flag

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt, SeekFrom};

use crate::error::PutResult;
use crate::plan::ByteRange;

/// Where the bytes of an upload come from
#[derive(Debug, Clone)]
pub enum PutSource {
    Memory(Arc<[u8]>),
    Path(PathBuf),
}

impl PutSource {
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        PutSource::Memory(Arc::from(bytes.into()))
    }

    /// Size of the source in bytes
    pub async fn size(&self) -> PutResult<u64> {
        match self {
            PutSource::Memory(bytes) => Ok(bytes.len() as u64),
            PutSource::Path(path) => Ok(tokio::fs::metadata(path).await?.len()),
        }
    }

    /// Read exactly the bytes covered by `range`
    pub async fn read_range(&self, range: &ByteRange) -> PutResult<Vec<u8>> {
        match self {
            PutSource::Memory(bytes) => {
                let start = range.start as usize;
                let end = range.end as usize + 1;
                bytes.get(start..end).map(<[u8]>::to_vec).ok_or_else(|| {
                    std::io::Error::new(
                        std::io::ErrorKind::UnexpectedEof,
                        format!("range {} past end of {} byte source", range, bytes.len()),
                    )
                    .into()
                })
            }
            PutSource::Path(path) => {
                let mut file = File::open(path).await?;
                file.seek(SeekFrom::Start(range.start)).await?;
                let mut buffer = vec![0u8; range.size() as usize];
                file.read_exact(&mut buffer).await?;
                Ok(buffer)
            }
        }
    }
}

/// Set-once cancellation flag shared between a transfer and whoever may cancel it
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
