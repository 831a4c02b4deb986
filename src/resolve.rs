use std::fs::File;
use std::io::{self, Read};

use crate::checksum::crc32;
use crate::entry::FileResult;

/// Files at or below this size get their full checksum from the partial
/// checksum instead of a second read.
pub(crate) const INLINE_READ_THRESHOLD: u64 = 1024;

const STREAM_CHUNK_LEN: usize = 1024 * 1024;

/// A completed unit of background work, tagged with the record it belongs
/// to. Produced on a worker thread, applied by the coordinating thread
/// during `tick()`.
#[derive(Debug)]
pub(crate) struct TaskOutcome {
    pub entry_id: u64,
    pub value: FieldValue,
}

#[derive(Debug)]
pub(crate) enum FieldValue {
    Size(FileResult<u64>),
    PartialChecksum(FileResult<u32>),
    FullChecksum(FileResult<u32>),
}

pub(crate) fn compute_size(path: &str) -> FileResult<u64> {
    let metadata = match std::fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(err) => return FileResult::Failed(err.to_string()),
    };
    if !metadata.is_file() {
        return FileResult::Failed("Not a regular file".to_string());
    }
    FileResult::Resolved(metadata.len())
}

/// CRC-32 of the first 1KB. The caller guarantees `size` is the record's
/// resolved size.
pub(crate) fn compute_partial_checksum(path: &str, size: u64) -> FileResult<u32> {
    if size == 0 {
        return FileResult::Resolved(0);
    }

    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(err) => return FileResult::Failed(format!("Failed to open file: {err}")),
    };

    let mut buffer = [0u8; INLINE_READ_THRESHOLD as usize];
    let mut filled = 0;
    while filled < buffer.len() {
        match file.read(&mut buffer[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return FileResult::Failed(format!("Failed to read file: {err}")),
        }
    }

    FileResult::Resolved(crc32(&buffer[..filled], 0))
}

/// CRC-32 of the whole file, streamed in 1MB chunks. Small files reuse the
/// already-resolved partial checksum, which covers their entire content.
pub(crate) fn compute_full_checksum(path: &str, size: u64, partial: u32) -> FileResult<u32> {
    if size <= INLINE_READ_THRESHOLD {
        return FileResult::Resolved(partial);
    }

    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(err) => return FileResult::Failed(format!("Failed to open file: {err}")),
    };

    let mut buffer = vec![0u8; STREAM_CHUNK_LEN];
    let mut crc = 0u32;
    loop {
        match file.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => crc = crc32(&buffer[..n], crc),
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return FileResult::Failed(format!("Failed to read file: {err}")),
        }
    }

    FileResult::Resolved(crc)
}
