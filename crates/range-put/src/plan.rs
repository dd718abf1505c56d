//! Byte range planning

use serde::Serialize;
use std::fmt;

/// One inclusive byte range of a source of `total` bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64, // inclusive
    pub total: u64,
}

impl ByteRange {
    pub fn size(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Value for the `Content-Range` request header.
    pub fn header_value(&self) -> String {
        format!("{}-{}/{}", self.start, self.end, self.total)
    }
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.header_value())
    }
}

/// Iterator over the chunk ranges of a source, starting at `offset`.
#[derive(Debug, Clone)]
pub struct ChunkPlan {
    offset: u64,
    total: u64,
    chunk_size: u64,
}

impl ChunkPlan {
    pub fn new(total: u64, chunk_size: u64) -> Self {
        Self::resume_at(0, total, chunk_size)
    }

    pub fn resume_at(offset: u64, total: u64, chunk_size: u64) -> Self {
        Self {
            offset: offset.min(total),
            total,
            chunk_size: chunk_size.max(1),
        }
    }

    /// Number of ranges still to be produced.
    pub fn remaining(&self) -> u64 {
        (self.total - self.offset).div_ceil(self.chunk_size)
    }
}

impl Iterator for ChunkPlan {
    type Item = ByteRange;

    fn next(&mut self) -> Option<ByteRange> {
        // An empty remainder means the transfer is complete, never a zero-length PUT
        if self.offset >= self.total {
            return None;
        }
        let start = self.offset;
        let end = std::cmp::min(start + self.chunk_size, self.total);
        self.offset = end;
        Some(ByteRange {
            start,
            end: end - 1,
            total: self.total,
        })
    }
}
