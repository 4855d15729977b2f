//! Local identity resolution for downloaded artifacts
//!
//! An artifact has two identities over its lifetime: the *provisional* one,
//! derived from the requested URL before any network call, and the *final*
//! one, derived after the response arrives. They differ only when the server
//! renames the artifact through a `Content-Disposition` filename directive;
//! that mismatch is a rename event, not an error, and both names act as
//! independent dedup keys.

use reqwest::header::{HeaderMap, CONTENT_DISPOSITION};
use std::path::{Path, PathBuf};
use url::Url;

/// Character used to flatten URL path separators into a single filename
const SEGMENT_JOIN: &str = "-";

/// Identity resolution errors
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    /// URL path carries no usable segments
    #[error("URL has an empty path, cannot derive a file name: {0}")]
    EmptyPath(String),
}

/// Filesystem-safe name and full output path for one artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalIdentity {
    file_name: String,
    path: PathBuf,
}

impl LocalIdentity {
    /// Derive the provisional identity from the requested URL.
    ///
    /// Pure and deterministic: the URL path is split on `/`, the segments are
    /// rejoined with `-`, and the leading separator artifact is stripped.
    /// `https://host/invoices/123/receipt.pdf` becomes
    /// `invoices-123-receipt.pdf` under `output_dir`.
    pub fn provisional(url: &Url, output_dir: &Path) -> Result<Self, IdentityError> {
        let file_name = url
            .path()
            .trim_start_matches('/')
            .replace('/', SEGMENT_JOIN);

        if file_name.is_empty() {
            return Err(IdentityError::EmptyPath(url.to_string()));
        }

        Ok(Self {
            path: output_dir.join(&file_name),
            file_name,
        })
    }

    /// Derive the final identity from the response headers.
    ///
    /// If a `Content-Disposition` header carries a `filename=` directive, the
    /// last URL path segment is replaced with that filename (stripped of
    /// surrounding quotes) and the joined name is recomputed. Otherwise the
    /// result equals the provisional identity. The caller detects a rename by
    /// comparing file names.
    pub fn finalized(&self, url: &Url, headers: &HeaderMap, output_dir: &Path) -> Self {
        let replacement = match content_disposition_filename(headers) {
            Some(name) => name,
            None => return self.clone(),
        };

        let mut segments: Vec<String> = url
            .path()
            .trim_start_matches('/')
            .split('/')
            .map(str::to_string)
            .collect();
        if let Some(last) = segments.last_mut() {
            *last = replacement;
        }

        let file_name = segments.join(SEGMENT_JOIN);
        Self {
            path: output_dir.join(&file_name),
            file_name,
        }
    }

    /// Plain (non-atomic) on-disk existence check used as the dedup gate.
    ///
    /// The window between this check and the eventual write is an accepted
    /// limitation carried over from the original tool.
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Flattened file name
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Full output path
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Extract a `filename=` directive from a Content-Disposition header.
///
/// Unescaping is limited to stripping surrounding quotes; RFC 5987
/// `filename*=` encoding is not interpreted.
fn content_disposition_filename(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(CONTENT_DISPOSITION)?.to_str().ok()?;

    for part in raw.split(';') {
        let part = part.trim();
        let directive = match part.get(..9) {
            Some(prefix) if prefix.eq_ignore_ascii_case("filename=") => &part[9..],
            _ => continue,
        };
        let name = directive.trim().trim_matches('"').trim();
        if !name.is_empty() {
            return Some(name.to_string());
        }
    }

    None
}
