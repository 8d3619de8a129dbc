//! Streamed single-part `multipart/form-data` body for `add`.
//!
//! Only the framing is held in memory; the payload is read from the caller's
//! reader as the request is written.

use std::io::{Cursor, Read};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use sha2::{Digest, Sha256};

static NEXT_FORM: AtomicU64 = AtomicU64::new(0);

/// A form with one `file` field.
#[derive(Debug)]
pub(crate) struct FilePart {
    boundary: String,
}

impl FilePart {
    /// A form with a boundary unique to this process and call.
    pub(crate) fn new() -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_nanos());
        let mut hasher = Sha256::new();
        hasher.update(std::process::id().to_le_bytes());
        hasher.update(nanos.to_le_bytes());
        hasher.update(NEXT_FORM.fetch_add(1, Ordering::Relaxed).to_le_bytes());
        let digest = hex::encode(hasher.finalize());
        Self::with_boundary(format!("mfsmirror-{}", &digest[..32]))
    }

    pub(crate) fn with_boundary(boundary: String) -> Self {
        Self { boundary }
    }

    pub(crate) fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    /// Header, then everything `content` yields, then the closing delimiter.
    pub(crate) fn stream<'a>(&self, content: &'a mut dyn Read) -> impl Read + 'a {
        let head = format!(
            "--{}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"file\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n",
            self.boundary
        );
        let tail = format!("\r\n--{}--\r\n", self.boundary);
        Cursor::new(head.into_bytes())
            .chain(content)
            .chain(Cursor::new(tail.into_bytes()))
    }
}
