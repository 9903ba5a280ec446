//! Upload progress channel and the streaming multipart body it observes.
//!
//! # Design
//! Progress is reported from inside `Read::read` on the request body, so the
//! listener fires exactly while the transport is writing bytes and never
//! before the exchange starts. Listeners observe; they cannot stall or abort
//! the transfer. Cancelling an upload means the transport stops reading.

use std::fs::File;
use std::io::{self, Cursor, Read};
use std::path::Path;

/// Observer for upload body transmission.
///
/// Called zero or more times with monotonically non-decreasing
/// `bytes_sent`, always `<= total_bytes`.
pub trait ProgressListener: Send + Sync {
    fn on_progress(&self, bytes_sent: u64, total_bytes: u64);
}

impl<F> ProgressListener for F
where
    F: Fn(u64, u64) + Send + Sync,
{
    fn on_progress(&self, bytes_sent: u64, total_bytes: u64) {
        self(bytes_sent, total_bytes)
    }
}

/// A text part of a multipart form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FormField {
    pub name: &'static str,
    pub value: String,
}

/// `multipart/form-data` body streaming one file after a set of text parts.
///
/// Owns the open file handle; dropping the body closes it on every path.
pub struct MultipartBody<'a> {
    boundary: String,
    len: u64,
    sent: u64,
    inner: io::Chain<io::Chain<Cursor<Vec<u8>>, io::Take<File>>, Cursor<Vec<u8>>>,
    listener: Option<&'a dyn ProgressListener>,
}

impl<'a> MultipartBody<'a> {
    /// Lay out `fields` followed by `file` (already opened, `file_len` bytes)
    /// under the part name `file_field`.
    pub(crate) fn new(
        fields: &[FormField],
        file_field: &str,
        path: &Path,
        file: File,
        file_len: u64,
        listener: Option<&'a dyn ProgressListener>,
    ) -> Self {
        let boundary = format!("trovebox-{}", uuid::Uuid::new_v4().simple());

        let mut head = String::new();
        for field in fields {
            head.push_str(&format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                field.name, field.value
            ));
        }
        let file_name = path
            .file_name()
            .map(|n| {
                n.to_string_lossy()
                    .chars()
                    .map(|c| if c == '"' || c.is_control() { '_' } else { c })
                    .collect::<String>()
            })
            .unwrap_or_else(|| "upload".to_string());
        head.push_str(&format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"{file_field}\"; filename=\"{file_name}\"\r\nContent-Type: {}\r\n\r\n",
            guess_content_type(path)
        ));
        let tail = format!("\r\n--{boundary}--\r\n");

        let len = head.len() as u64 + file_len + tail.len() as u64;
        let inner = Cursor::new(head.into_bytes())
            .chain(file.take(file_len))
            .chain(Cursor::new(tail.into_bytes()));

        Self {
            boundary,
            len,
            sent: 0,
            inner,
            listener,
        }
    }

    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Total body length in bytes.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn bytes_sent(&self) -> u64 {
        self.sent
    }
}

impl Read for MultipartBody<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        if n > 0 {
            self.sent = (self.sent + n as u64).min(self.len);
            if let Some(listener) = self.listener {
                tracing::trace!(sent = self.sent, total = self.len, "upload progress");
                listener.on_progress(self.sent, self.len);
            }
        }
        Ok(n)
    }
}

fn guess_content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("tif" | "tiff") => "image/tiff",
        _ => "application/octet-stream",
    }
}
