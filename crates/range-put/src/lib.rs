//! Sequential chunked upload engine
//!
//! Slices a local source into fixed-size byte ranges and PUTs them one at a
//! time to a single remote resource, each request carrying a
//! `Content-Range: <start>-<end>/<total>` header. Provides:
//! - Range planning (`ChunkPlan`, `ByteRange`)
//! - Memory and on-disk sources (`PutSource`)
//! - Cooperative cancellation (`CancelFlag`)
//! - The request loop itself (`SequentialPut`)

mod error;
mod plan;
mod put;
mod source;

pub use error::{PutError, PutResult};
pub use plan::{ByteRange, ChunkPlan};
pub use put::{PutConfig, PutOutcome, SequentialPut, DEFAULT_CHUNK_SIZE};
pub use source::{CancelFlag, PutSource};
