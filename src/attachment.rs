use std::path::Path;

use crate::error::{Error, Result};
use crate::mime;

/// Content type used when none is given. No sniffing is done.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Filename used when a path has no final segment.
const FALLBACK_FILENAME: &str = "attachment";

/// Override applied when loading an attachment from disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachOption {
    /// Replace the filename taken from the path.
    FileName(String),
    /// Use `inline` instead of `attachment` disposition.
    Inline(bool),
}

/// A file or byte blob to embed in a [`Message`](crate::Message).
///
/// Content is fixed once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    filename: String,
    content_type: String,
    content: Vec<u8>,
    inline: bool,
}

impl Attachment {
    /// Read the whole file at `path` into memory.
    ///
    /// The filename is the last path segment and the content type is
    /// [`DEFAULT_CONTENT_TYPE`]. Options are applied in order, so a later
    /// option wins over an earlier one for the same field.
    pub fn from_path<I>(path: impl AsRef<Path>, options: I) -> Result<Self>
    where
        I: IntoIterator<Item = AttachOption>,
    {
        let path = path.as_ref();
        let content = std::fs::read(path).map_err(|e| Error::io(path, e))?;
        log::debug!(
            "Loaded attachment {} ({} bytes)",
            path.display(),
            content.len()
        );

        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| FALLBACK_FILENAME.to_string());

        let attachment = Attachment {
            filename,
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
            content,
            inline: false,
        };
        Ok(options
            .into_iter()
            .fold(attachment, |att, opt| att.apply(opt)))
    }

    /// Build from an in-memory buffer. An empty `content_type` means
    /// [`DEFAULT_CONTENT_TYPE`].
    pub fn from_bytes(
        filename: impl Into<String>,
        content: impl Into<Vec<u8>>,
        content_type: &str,
    ) -> Self {
        let content_type = if content_type.is_empty() {
            DEFAULT_CONTENT_TYPE
        } else {
            content_type
        };
        Attachment {
            filename: filename.into(),
            content_type: content_type.to_string(),
            content: content.into(),
            inline: false,
        }
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = filename.into();
        self
    }

    pub fn with_inline(mut self, inline: bool) -> Self {
        self.inline = inline;
        self
    }

    fn apply(self, option: AttachOption) -> Self {
        match option {
            AttachOption::FileName(name) => self.with_filename(name),
            AttachOption::Inline(inline) => self.with_inline(inline),
        }
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    pub fn is_inline(&self) -> bool {
        self.inline
    }

    /// Standard padded base64 of the content, on one line.
    pub fn base64(&self) -> String {
        mime::base64_encode(&self.content)
    }

    /// Value of the `Content-Disposition` header for this attachment.
    pub(crate) fn disposition(&self) -> String {
        let kind = if self.inline { "inline" } else { "attachment" };
        format!("{kind}; filename={}", mime::quote_param(&self.filename))
    }
}
