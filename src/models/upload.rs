//! Represents a single upload for the lifetime of one request.

use super::category::Category;
use std::path::PathBuf;
use unicode_normalization::UnicodeNormalization;

/// Longest file name written to disk, in bytes.
pub const MAX_FILENAME_LEN: usize = 255;

/// An accepted upload, before its bytes are written.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadedFile {
    /// Sanitized name the file is stored under. Keeps the client's case.
    pub filename: String,

    /// Lowercase extension taken from `filename`.
    pub extension: String,

    /// Folder the file is routed to.
    pub category: Category,
}

/// Result of a completed write.
#[derive(Clone, Debug)]
pub struct StoredFile {
    /// Final location on disk.
    pub path: PathBuf,

    /// Name of the category folder the file landed in.
    pub folder: &'static str,

    /// Bytes written.
    pub size_bytes: u64,

    /// MD5 of the content, lowercase hex.
    pub md5: String,
}

/// Lowercase text after the last `.`, if the name has one.
pub fn extension_of(name: &str) -> Option<String> {
    name.rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
}

/// Reduce a client-supplied name to something safe to join onto a folder.
///
/// - accents are folded away via NFKD (`é` becomes `e`), other non-ASCII is dropped
/// - only the part after the last `/` or `\` is kept
/// - whitespace runs become `_`
/// - anything outside `[A-Za-z0-9._-]` is dropped
/// - leading and trailing `.`/`_` are trimmed
/// - names longer than [`MAX_FILENAME_LEN`] lose the end of their stem
///
/// May return an empty string.
pub fn secure_filename(raw: &str) -> String {
    let folded: String = raw.nfkd().filter(char::is_ascii).collect();
    let base = folded.rsplit(['/', '\\']).next().unwrap_or("");
    let joined = base.split_whitespace().collect::<Vec<_>>().join("_");
    let filtered: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect();
    let trimmed = filtered.trim_matches(|c| c == '.' || c == '_');

    if trimmed.len() <= MAX_FILENAME_LEN {
        return trimmed.to_string();
    }

    // ASCII only at this point, so byte slicing is safe.
    match trimmed.rsplit_once('.') {
        Some((stem, ext)) if ext.len() + 1 < MAX_FILENAME_LEN => {
            let keep = MAX_FILENAME_LEN - ext.len() - 1;
            format!("{}.{}", &stem[..keep.min(stem.len())], ext)
        }
        _ => trimmed[..MAX_FILENAME_LEN].to_string(),
    }
}
