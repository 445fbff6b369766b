//! Minimal `multipart/mixed` writer.
//!
//! Writes the parts of a MIME multipart body into any [`io::Write`] sink.
//! Only what outgoing mail needs is here: boundary generation, part
//! delimiters, part headers and base64 bodies.

use std::io::{self, Write};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

/// RFC 2045 caps encoded lines at 76 characters.
const BASE64_LINE_LEN: usize = 76;

/// Random boundary built from `bchars` that need no quoting in a
/// `Content-Type` parameter.
pub fn generate_boundary() -> String {
    format!("nlm-{}", uuid::Uuid::new_v4().simple())
}

/// Standard base64 (RFC 4648, padded) on a single line.
pub fn base64_encode(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Quote a header parameter value, escaping `"` and `\`.
pub fn quote_param(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

pub struct MultipartWriter<W: Write> {
    inner: W,
    boundary: String,
    parts: usize,
}

impl<W: Write> MultipartWriter<W> {
    /// Writer with a freshly generated boundary.
    pub fn new(inner: W) -> Self {
        Self::with_boundary(inner, generate_boundary())
    }

    pub fn with_boundary(inner: W, boundary: String) -> Self {
        MultipartWriter {
            inner,
            boundary,
            parts: 0,
        }
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Value for the enclosing `Content-Type` header.
    pub fn content_type(&self) -> String {
        format!("multipart/mixed; boundary={}", self.boundary)
    }

    /// Start a new part: delimiter, headers in the given order, blank line.
    /// Returns the sink for the part content.
    pub fn start_part(&mut self, headers: &[(&str, &str)]) -> io::Result<&mut W> {
        if self.parts > 0 {
            self.inner.write_all(b"\r\n")?;
        }
        write!(self.inner, "--{}\r\n", self.boundary)?;
        for (name, value) in headers {
            write!(self.inner, "{name}: {value}\r\n")?;
        }
        self.inner.write_all(b"\r\n")?;
        self.parts += 1;
        Ok(&mut self.inner)
    }

    /// Write a part whose content is `data` in base64, wrapped at 76 columns.
    pub fn write_base64_part(&mut self, headers: &[(&str, &str)], data: &[u8]) -> io::Result<()> {
        let encoded = base64_encode(data);
        let out = self.start_part(headers)?;
        let mut lines = encoded.as_bytes().chunks(BASE64_LINE_LEN).peekable();
        while let Some(line) = lines.next() {
            out.write_all(line)?;
            if lines.peek().is_some() {
                out.write_all(b"\r\n")?;
            }
        }
        Ok(())
    }

    /// Write the closing delimiter and hand back the sink.
    pub fn finish(mut self) -> io::Result<W> {
        if self.parts > 0 {
            self.inner.write_all(b"\r\n")?;
        }
        write!(self.inner, "--{}--\r\n", self.boundary)?;
        self.inner.flush()?;
        Ok(self.inner)
    }
}
