//! Brotli precompression with an on-disk artifact cache.
//!
//! Every served file is compressed once at startup and the result kept in
//! memory. Since compression can be expensive for large inputs, a copy of
//! the compressed bytes is also persisted under the cache root so a restart
//! can reuse it instead of recompressing, as long as the artifact is not
//! older than its source file.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use bytes::Bytes;

use crate::error::CacheError;

/// Wire value for the `Content-Encoding` header of a brotli-compressed
/// response body.
pub const ENCODING_BROTLI: &str = "br";

fn artifact_path(cache_root: &Path, site_relative_path: &str) -> PathBuf {
    cache_root
        .join(ENCODING_BROTLI)
        .join(site_relative_path.trim_start_matches('/'))
}

fn try_load(path: &Path, source_modified: SystemTime) -> Option<Bytes> {
    let metadata = std::fs::metadata(path).ok()?;
    let artifact_modified = metadata.modified().ok()?;
    if artifact_modified < source_modified {
        return None;
    }
    std::fs::read(path).ok().map(Bytes::from)
}

fn try_save(path: &Path, data: &[u8]) {
    if let Some(parent) = path.parent()
        && let Err(err) = std::fs::create_dir_all(parent)
    {
        tracing::warn!(path = %path.display(), error = %err, "failed to create brotli artifact directory");
        return;
    }
    if let Err(err) = std::fs::write(path, data) {
        tracing::warn!(path = %path.display(), error = %err, "failed to persist brotli artifact");
    }
}

/// Compress `source_data` with brotli, reusing a cached artifact under
/// `cache_root` when it is at least as new as `source_modified`.
pub fn compress_brotli(
    cache_root: &Path,
    site_relative_path: &str,
    source_data: &[u8],
    source_modified: SystemTime,
) -> Result<Bytes, CacheError> {
    if source_data.is_empty() {
        return Ok(Bytes::new());
    }

    let path = artifact_path(cache_root, site_relative_path);
    if let Some(cached) = try_load(&path, source_modified) {
        return Ok(cached);
    }

    let mut reader = brotli::CompressorReader::new(source_data, 4096, 11, 22);
    let mut compressed = Vec::new();
    reader
        .read_to_end(&mut compressed)
        .map_err(|err| CacheError::Compress(err.to_string()))?;

    try_save(&path, &compressed);

    Ok(Bytes::from(compressed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compress_brotli_round_trips_through_decompression() {
        let dir = tempfile::tempdir().unwrap();
        let source = b"hello hello hello hello hello world".repeat(32);
        let compressed =
            compress_brotli(dir.path(), "/index.html", &source, SystemTime::now()).unwrap();
        assert!(!compressed.is_empty());

        let mut decompressor = brotli::Decompressor::new(compressed.as_ref(), 4096);
        let mut decompressed = Vec::new();
        decompressor.read_to_end(&mut decompressed).unwrap();
        assert_eq!(decompressed, source);
    }

    #[test]
    fn compress_brotli_reuses_fresh_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let source = b"reused payload".repeat(8);
        let now = SystemTime::now();

        let first = compress_brotli(dir.path(), "/a.txt", &source, now).unwrap();
        let path = artifact_path(dir.path(), "/a.txt");
        assert!(path.exists());

        // Corrupt the on-disk artifact; if it were recompressed the
        // returned bytes would differ from this garbage.
        std::fs::write(&path, b"not-brotli-but-still-fresh").unwrap();
        let second = compress_brotli(dir.path(), "/a.txt", &source, now).unwrap();
        assert_eq!(second.as_ref(), b"not-brotli-but-still-fresh");
        assert_ne!(first, second);
    }

    #[test]
    fn compress_brotli_empty_input_short_circuits() {
        let dir = tempfile::tempdir().unwrap();
        let compressed = compress_brotli(dir.path(), "/empty", &[], SystemTime::now()).unwrap();
        assert!(compressed.is_empty());
    }
}
