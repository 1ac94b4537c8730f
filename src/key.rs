//! Object key derivation for new uploads.
//!
//! Key format: `{folder}/{unix_millis}-{uuid}[.{extension}]`. The folder
//! defaults to [`DEFAULT_FOLDER`]. The uuid makes keys unique even when two
//! requests for the same filename arrive within the same millisecond.

use std::{error::Error, fmt::Display};

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Folder used when the request does not name one.
pub const DEFAULT_FOLDER: &str = "uploads";
/// Longest extension carried over from the filename.
pub const MAX_EXTENSION_LEN: usize = 16;
/// Longest key S3 accepts, in bytes.
pub const MAX_KEY_LEN: usize = 1024;

/// Replace whitespace runs with `_` and every other character outside
/// `[A-Za-z0-9._-]` with `_`.
pub fn sanitize_filename(filename: &str) -> String {
    let mut sanitized = String::with_capacity(filename.len());
    let mut in_whitespace = false;
    for c in filename.chars() {
        if c.is_whitespace() {
            if !in_whitespace {
                sanitized.push('_');
            }
            in_whitespace = true;
            continue;
        }
        in_whitespace = false;
        if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
            sanitized.push(c);
        } else {
            sanitized.push('_');
        }
    }
    sanitized
}

/// The part of `filename` after its final `.`, if there is one and it is
/// at most [`MAX_EXTENSION_LEN`] characters long.
pub fn extension(filename: &str) -> Option<&str> {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.is_empty() && ext.chars().count() <= MAX_EXTENSION_LEN)
}

/// Normalize a caller supplied folder into a safe key prefix.
///
/// Every `/` separated segment is sanitized like a filename. Empty, `.` and
/// `..` segments are dropped, and [`DEFAULT_FOLDER`] is used if nothing
/// remains.
pub fn normalize_folder(folder: Option<&str>) -> String {
    let segments = folder
        .unwrap_or_default()
        .split('/')
        .map(str::trim)
        .filter(|segment| !matches!(*segment, "" | "." | ".."))
        .map(sanitize_filename)
        .collect::<Vec<_>>();

    if segments.is_empty() {
        DEFAULT_FOLDER.to_owned()
    } else {
        segments.join("/")
    }
}

/// Generates unique object keys.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyGenerator;

impl KeyGenerator {
    /// Create a new key generator.
    pub fn new() -> Self {
        Self
    }

    /// Derive a fresh key for an upload of `filename` into `folder`.
    pub fn generate(&self, folder: Option<&str>, filename: &str) -> Result<String, KeyError> {
        self.generate_at(folder, filename, Utc::now())
    }

    /// Derive a fresh key using `now` as the creation timestamp.
    ///
    /// Fails when the key would exceed [`MAX_KEY_LEN`] bytes.
    pub fn generate_at(
        &self,
        folder: Option<&str>,
        filename: &str,
        now: DateTime<Utc>,
    ) -> Result<String, KeyError> {
        let unique = format!("{}-{}", now.timestamp_millis(), Uuid::new_v4().simple());
        let key = compose_key(&normalize_folder(folder), &unique, &sanitize_filename(filename));
        if key.len() > MAX_KEY_LEN {
            return Err(KeyError::TooLong { len: key.len() });
        }
        Ok(key)
    }
}

/// Errors that can occur while deriving a key.
#[derive(Debug, Clone, PartialEq)]
pub enum KeyError {
    /// The derived key is longer than the storage service allows.
    TooLong {
        /// Length of the derived key in bytes.
        len: usize,
    },
}

impl Display for KeyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeyError::TooLong { len } => write!(
                f,
                "object key of {} bytes exceeds the limit of {} bytes",
                len, MAX_KEY_LEN
            ),
        }
    }
}

impl Error for KeyError {}

fn compose_key(folder: &str, unique: &str, sanitized_filename: &str) -> String {
    match extension(sanitized_filename) {
        Some(ext) => format!("{}/{}.{}", folder, unique, ext),
        None => format!("{}/{}", folder, unique),
    }
}
