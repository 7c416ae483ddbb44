//! The startup-time file cache: every file under the content root is read,
//! its media type derived from its extension, precompressed with brotli,
//! and kept resident for the lifetime of the process.
//!
//! There is no invalidation: a new deployment means a process restart.

pub mod compression;

use std::collections::HashMap;
use std::path::Path;
use std::time::SystemTime;

use bytes::Bytes;
use walkdir::WalkDir;

use crate::error::CacheError;

/// Wire value for an uncompressed response body's `Content-Encoding`.
pub const ENCODING_IDENTITY: &str = "identity";

/// A single representation (uncompressed, brotli, ...) of a cached file.
#[derive(Debug, Clone)]
pub struct Variant {
    pub data: Bytes,
    pub encoding: &'static str,
}

/// Everything the cache knows about one file under the content root.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub media_type: &'static str,
    pub media_charset: Option<&'static str>,
    pub modified: SystemTime,
    pub uncompressed: Variant,
    pub brotli: Option<Variant>,
    /// Declared for parity with the brotli slot but never populated: gzip
    /// precompression was never wired up to a real encoder upstream either,
    /// so keeping the slot unfilled here is intentional, not a bug.
    pub gzip: Option<Variant>,
}

/// The result of a successful [`FileCache::lookup`].
#[derive(Debug, Clone)]
pub struct LookupResult {
    pub media_type: &'static str,
    pub media_charset: Option<&'static str>,
    pub modified: SystemTime,
    pub data: Bytes,
    pub encoding: &'static str,
}

/// In-memory, read-only snapshot of the content root.
#[derive(Debug, Default)]
pub struct FileCache {
    entries: HashMap<String, CacheEntry>,
}

const MEDIA_TYPES: &[(&str, &str)] = &[
    ("css", "text/css"),
    ("gif", "image/gif"),
    ("html", "text/html"),
    ("ico", "image/vnd.microsoft.icon"),
    ("jfi", "image/jpeg"),
    ("jif", "image/jpeg"),
    ("jig", "image/jpeg"),
    ("jpe", "image/jpeg"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("js", "application/javascript"),
    ("md", "text/markdown"),
    ("otc", "font/otf"),
    ("otf", "font/otf"),
    ("png", "image/png"),
    ("svg", "image/svg+xml"),
    ("tif", "image/tiff"),
    ("tiff", "image/tiff"),
    ("ttc", "font/otf"),
    ("tte", "font/ttf"),
    ("ttf", "font/ttf"),
    ("webp", "image/webp"),
    ("woff", "font/woff"),
    ("woff2", "font/woff2"),
];

const OCTET_STREAM: &str = "application/octet-stream";

/// Media type and, where applicable, charset for a file name.
///
/// Files without a recognised extension (or without an extension at all)
/// fall back to `application/octet-stream` with no charset. Any `text/*`
/// type, and `application/javascript` specifically, are always served as
/// `utf-8`.
fn media_type_properties(file_name: &str) -> (&'static str, Option<&'static str>) {
    let Some(ext) = file_name.rsplit_once('.').map(|(_, ext)| ext) else {
        return (OCTET_STREAM, None);
    };

    for &(candidate, media_type) in MEDIA_TYPES {
        if candidate.eq_ignore_ascii_case(ext) {
            let charset = if media_type.starts_with("text/") || media_type == "application/javascript"
            {
                Some("utf-8")
            } else {
                None
            };
            return (media_type, charset);
        }
    }

    (OCTET_STREAM, None)
}

impl FileCache {
    /// Walk `content_root` recursively and build a cache entry for every
    /// regular file found, precompressing each with brotli and persisting
    /// compressed artifacts under `cache_root`.
    pub fn build(content_root: &Path, cache_root: &Path) -> Result<Self, CacheError> {
        std::fs::create_dir_all(cache_root).map_err(CacheError::CreateArtifactDir)?;

        let mut entries = HashMap::new();

        for dir_entry in WalkDir::new(content_root)
            .follow_links(false)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
        {
            let path = dir_entry.path();
            let site_relative = path
                .strip_prefix(content_root)
                .map_err(|err| CacheError::Walk(Box::new(err)))?;
            let site_relative = format!(
                "/{}",
                site_relative.to_string_lossy().replace(std::path::MAIN_SEPARATOR, "/")
            );

            let data = std::fs::read(path).map_err(|source| CacheError::Read {
                path: path.display().to_string(),
                source,
            })?;
            let metadata = std::fs::metadata(path).map_err(|source| CacheError::Read {
                path: path.display().to_string(),
                source,
            })?;
            let modified = metadata.modified().map_err(|source| CacheError::Read {
                path: path.display().to_string(),
                source,
            })?;

            let file_name = dir_entry.file_name().to_string_lossy();
            let (media_type, media_charset) = media_type_properties(&file_name);

            let brotli_data =
                compression::compress_brotli(cache_root, &site_relative, &data, modified)?;
            let brotli = if brotli_data.is_empty() {
                None
            } else {
                Some(Variant {
                    data: brotli_data,
                    encoding: compression::ENCODING_BROTLI,
                })
            };

            let entry = CacheEntry {
                media_type,
                media_charset,
                modified,
                uncompressed: Variant {
                    data: Bytes::from(data),
                    encoding: ENCODING_IDENTITY,
                },
                brotli,
                gzip: None,
            };

            entries.insert(site_relative.to_ascii_lowercase(), entry);
        }

        tracing::info!(
            objects = entries.len(),
            octets = entries
                .values()
                .map(|e| e.uncompressed.data.len()
                    + e.brotli.as_ref().map_or(0, |v| v.data.len()))
                .sum::<usize>(),
            "file cache ready"
        );

        Ok(Self { entries })
    }

    /// Look up a request path, preferring the brotli representation when
    /// `accept_brotli` is set and one exists. `/` is treated as an alias for
    /// `/index.html`. Lookup is case-insensitive.
    #[must_use]
    pub fn lookup(&self, path: &str, accept_brotli: bool) -> Option<LookupResult> {
        let path = if path == "/" { "/index.html" } else { path };
        let entry = self.entries.get(&path.to_ascii_lowercase())?;

        let variant = if accept_brotli && entry.brotli.is_some() {
            entry.brotli.as_ref()
        } else if entry.gzip.is_some() {
            entry.gzip.as_ref()
        } else {
            None
        }
        .unwrap_or(&entry.uncompressed);

        Some(LookupResult {
            media_type: entry.media_type,
            media_charset: entry.media_charset,
            modified: entry.modified,
            data: variant.data.clone(),
            encoding: variant.encoding,
        })
    }

    /// Total number of cached files.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    fn write_file(dir: &Path, relative: &str, contents: &[u8]) {
        let path = dir.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        let mut file = std::fs::File::create(path).unwrap();
        file.write_all(contents).unwrap();
    }

    #[test]
    fn media_type_properties_maps_known_extensions() {
        assert_eq!(media_type_properties("style.CSS").0, "text/css");
        let (media_type, charset) = media_type_properties("app.js");
        assert_eq!(media_type, "application/javascript");
        assert_eq!(charset, Some("utf-8"));
    }

    #[test]
    fn media_type_properties_falls_back_for_unknown_extension() {
        assert_eq!(media_type_properties("binary.dat").0, "application/octet-stream");
        assert_eq!(media_type_properties("no-extension").0, "application/octet-stream");
    }

    #[test]
    fn build_walks_and_lookup_aliases_root() {
        let content = tempfile::tempdir().unwrap();
        let cache = tempfile::tempdir().unwrap();
        write_file(content.path(), "index.html", b"<html>hi</html>");
        write_file(content.path(), "css/site.css", b"body{color:red}".repeat(10).as_slice());

        let file_cache = FileCache::build(content.path(), cache.path()).unwrap();
        assert_eq!(file_cache.len(), 2);

        let root = file_cache.lookup("/", false).unwrap();
        assert_eq!(root.media_type, "text/html");

        let css = file_cache.lookup("/CSS/Site.CSS", true).unwrap();
        assert_eq!(css.media_type, "text/css");
        assert_eq!(css.encoding, compression::ENCODING_BROTLI);
    }

    #[test]
    fn lookup_missing_path_returns_none() {
        let content = tempfile::tempdir().unwrap();
        let cache = tempfile::tempdir().unwrap();
        let file_cache = FileCache::build(content.path(), cache.path()).unwrap();
        assert!(file_cache.lookup("/missing.html", false).is_none());
    }
}
