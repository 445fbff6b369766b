use std::io::Write;
use std::path::Path;

use crate::attachment::{AttachOption, Attachment};
use crate::error::{Error, Result};
use crate::mime::MultipartWriter;

pub const DEFAULT_BODY_CONTENT_TYPE: &str = "text/plain";

/// An outgoing email.
///
/// Construction and mutation never fail; required fields are checked when the
/// message is serialized with [`Message::to_bytes`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub from: String,
    pub to: Vec<String>,
    pub cc: Vec<String>,
    /// Envelope-only recipients, never written to the headers.
    pub bcc: Vec<String>,
    pub subject: String,
    pub body: String,
    /// Content type of `body`, e.g. `text/plain` or `text/html`.
    pub content_type: String,
    pub attachments: Vec<Attachment>,
}

impl Default for Message {
    fn default() -> Self {
        Self {
            from: String::new(),
            to: Vec::new(),
            cc: Vec::new(),
            bcc: Vec::new(),
            subject: String::new(),
            body: String::new(),
            content_type: DEFAULT_BODY_CONTENT_TYPE.to_string(),
            attachments: Vec::new(),
        }
    }
}

impl Message {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_from(&mut self, from: impl Into<String>) -> &mut Self {
        self.from = from.into();
        self
    }

    pub fn add_to<I, S>(&mut self, addrs: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.to.extend(addrs.into_iter().map(Into::into));
        self
    }

    pub fn add_cc<I, S>(&mut self, addrs: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cc.extend(addrs.into_iter().map(Into::into));
        self
    }

    pub fn add_bcc<I, S>(&mut self, addrs: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.bcc.extend(addrs.into_iter().map(Into::into));
        self
    }

    pub fn set_subject(&mut self, subject: impl Into<String>) -> &mut Self {
        self.subject = subject.into();
        self
    }

    /// Set the body together with its content type.
    pub fn set_body(&mut self, content_type: impl Into<String>, body: impl Into<String>) -> &mut Self {
        self.content_type = content_type.into();
        self.body = body.into();
        self
    }

    /// Load a file from disk and append it as an attachment.
    pub fn add_attachment<I>(&mut self, path: impl AsRef<Path>, options: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = AttachOption>,
    {
        let attachment = Attachment::from_path(path, options)?;
        Ok(self.attach(attachment))
    }

    /// Append an in-memory attachment. An empty `content_type` falls back to
    /// `application/octet-stream`.
    pub fn add_attachment_data(
        &mut self,
        filename: impl Into<String>,
        content: impl Into<Vec<u8>>,
        content_type: &str,
    ) -> &mut Self {
        self.attach(Attachment::from_bytes(filename, content, content_type))
    }

    pub fn attach(&mut self, attachment: Attachment) -> &mut Self {
        self.attachments.push(attachment);
        self
    }

    /// Check the fields serialization requires.
    pub fn validate(&self) -> Result<()> {
        if self.from.is_empty() {
            return Err(Error::MissingField("from"));
        }
        if self.to.is_empty() {
            return Err(Error::MissingField("to"));
        }
        Ok(())
    }

    /// Envelope recipients: `to`, then `cc`, then `bcc`, duplicates kept.
    pub fn recipients(&self) -> Vec<&str> {
        self.to
            .iter()
            .chain(&self.cc)
            .chain(&self.bcc)
            .map(String::as_str)
            .collect()
    }

    /// Serialize to an RFC 5322 payload ready for SMTP `DATA`.
    ///
    /// Without attachments the body is written verbatim under a single
    /// `Content-Type`. With attachments the body becomes the first part of a
    /// `multipart/mixed` payload, followed by one base64 part per attachment.
    /// Each call picks a new boundary; nothing else varies.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        self.validate()?;

        let mut buf = Vec::with_capacity(self.estimated_len());
        self.write_headers(&mut buf).map_err(Error::encoding)?;

        if self.attachments.is_empty() {
            write!(buf, "Content-Type: {}\r\n\r\n", self.content_type).map_err(Error::encoding)?;
            buf.extend_from_slice(self.body.as_bytes());
            return Ok(buf);
        }

        self.write_multipart(buf).map_err(Error::encoding)
    }

    fn write_headers(&self, out: &mut impl Write) -> std::io::Result<()> {
        write!(out, "From: {}\r\n", self.from)?;
        if !self.to.is_empty() {
            write!(out, "To: {}\r\n", self.to.join(", "))?;
        }
        if !self.cc.is_empty() {
            write!(out, "Cc: {}\r\n", self.cc.join(", "))?;
        }
        write!(out, "Subject: {}\r\n", self.subject)?;
        out.write_all(b"MIME-Version: 1.0\r\n")
    }

    fn write_multipart(&self, mut buf: Vec<u8>) -> std::io::Result<Vec<u8>> {
        let mut parts = MultipartWriter::new(Vec::new());
        write!(buf, "Content-Type: {}\r\n\r\n", parts.content_type())?;

        parts
            .start_part(&[("Content-Type", self.content_type.as_str())])?
            .write_all(self.body.as_bytes())?;

        for att in &self.attachments {
            let disposition = att.disposition();
            parts.write_base64_part(
                &[
                    ("Content-Disposition", disposition.as_str()),
                    ("Content-Type", att.content_type()),
                    ("Content-Transfer-Encoding", "base64"),
                ],
                att.content(),
            )?;
        }

        buf.extend_from_slice(&parts.finish()?);
        Ok(buf)
    }

    fn estimated_len(&self) -> usize {
        let attachments: usize = self
            .attachments
            .iter()
            .map(|a| a.content().len() * 4 / 3 + 256)
            .sum();
        512 + self.subject.len() + self.body.len() + attachments
    }
}

#[cfg(test)]
mod tests {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;

    use super::*;

    fn basic() -> Message {
        let mut m = Message::new();
        m.set_from("a@x.com")
            .add_to(["b@x.com"])
            .set_subject("Hi")
            .set_body("text/plain", "hello");
        m
    }

    fn text(m: &Message) -> String {
        String::from_utf8(m.to_bytes().expect("serialize")).expect("utf-8")
    }

    fn boundary_of(raw: &str) -> &str {
        let start = raw.find("boundary=").expect("boundary param") + "boundary=".len();
        let end = raw[start..].find("\r\n").unwrap() + start;
        &raw[start..end]
    }

    /// Split a multipart payload into (headers, content) per part.
    fn parts(raw: &str) -> Vec<(String, String)> {
        let boundary = boundary_of(raw);
        let body = raw.split_once("\r\n\r\n").unwrap().1;
        let closing = format!("\r\n--{boundary}--\r\n");
        assert!(body.ends_with(&closing), "missing close delimiter");
        let body = &body[..body.len() - closing.len()];
        let first = format!("--{boundary}\r\n");
        let body = body.strip_prefix(&first).expect("opening delimiter");
        body.split(&format!("\r\n--{boundary}\r\n"))
            .map(|p| {
                let (h, c) = p.split_once("\r\n\r\n").unwrap();
                (h.to_string(), c.to_string())
            })
            .collect()
    }

    #[test]
    fn new_message_defaults_to_plain_text() {
        let m = Message::new();
        assert_eq!(m.content_type, "text/plain");
        assert!(m.from.is_empty());
        assert!(m.to.is_empty() && m.cc.is_empty() && m.bcc.is_empty());
        assert!(m.attachments.is_empty());
    }

    #[test]
    fn simple_message_layout() {
        let raw = text(&basic());
        assert_eq!(
            raw,
            "From: a@x.com\r\n\
             To: b@x.com\r\n\
             Subject: Hi\r\n\
             MIME-Version: 1.0\r\n\
             Content-Type: text/plain\r\n\
             \r\n\
             hello"
        );
    }

    #[test]
    fn simple_message_keeps_body_verbatim() {
        let mut m = basic();
        m.set_body("text/html", "<p>caf\u{e9}</p>\nline two");
        let raw = text(&m);
        assert_eq!(raw.matches("Content-Type:").count(), 1);
        assert!(raw.contains("Content-Type: text/html\r\n"));
        assert!(raw.ends_with("\r\n\r\n<p>caf\u{e9}</p>\nline two"));
        assert!(!raw.contains("Content-Transfer-Encoding"));
    }

    #[test]
    fn recipients_joined_and_bcc_hidden() {
        let mut m = basic();
        m.add_to(["c@x.com", "b@x.com"])
            .add_cc(["d@x.com", "e@x.com"])
            .add_bcc(["secret@x.com"]);
        let raw = text(&m);
        assert!(raw.contains("To: b@x.com, c@x.com, b@x.com\r\n"));
        assert!(raw.contains("Cc: d@x.com, e@x.com\r\n"));
        assert!(!raw.contains("secret@x.com"));
        assert!(!raw.contains("Bcc"));
    }

    #[test]
    fn empty_cc_is_omitted() {
        let raw = text(&basic());
        assert!(!raw.contains("Cc:"));
    }

    #[test]
    fn header_order_is_fixed() {
        let mut m = basic();
        m.add_cc(["d@x.com"]);
        let raw = text(&m);
        let pos = |h: &str| raw.find(h).unwrap_or_else(|| panic!("{h} missing"));
        assert!(pos("From:") < pos("To:"));
        assert!(pos("To:") < pos("Cc:"));
        assert!(pos("Cc:") < pos("Subject:"));
        assert!(pos("Subject:") < pos("MIME-Version: 1.0"));
        assert!(pos("MIME-Version: 1.0") < pos("Content-Type:"));
    }

    #[test]
    fn missing_from_fails_validation() {
        let mut m = basic();
        m.from.clear();
        assert!(matches!(m.to_bytes(), Err(Error::MissingField("from"))));
    }

    #[test]
    fn missing_to_fails_validation() {
        let mut m = Message::new();
        m.set_from("a@x.com").add_cc(["c@x.com"]).add_bcc(["d@x.com"]);
        let err = m.to_bytes().unwrap_err();
        assert!(matches!(err, Error::MissingField("to")));
        assert!(err.is_validation());
    }

    #[test]
    fn attachment_scenario() {
        let mut m = basic();
        m.add_attachment_data("test.txt", "file content", "text/plain");
        let raw = text(&m);
        assert!(raw.contains("Content-Type: multipart/mixed; boundary="));
        assert!(raw.contains("ZmlsZSBjb250ZW50"));
        assert!(raw.contains("Content-Disposition: attachment; filename=\"test.txt\"\r\n"));
    }

    #[test]
    fn multipart_has_one_part_per_attachment_plus_body() {
        let mut m = basic();
        m.add_attachment_data("a.bin", vec![0u8, 1, 2, 255], "")
            .add_attachment_data("b.txt", "bee", "text/plain")
            .attach(Attachment::from_bytes("logo.png", vec![9u8; 300], "image/png").with_inline(true));
        let raw = text(&m);

        let top = raw.split_once("\r\n\r\n").unwrap().0;
        assert_eq!(top.matches("Content-Type:").count(), 1);
        assert!(top.ends_with(&format!(
            "Content-Type: multipart/mixed; boundary={}",
            boundary_of(&raw)
        )));

        let parts = parts(&raw);
        assert_eq!(parts.len(), 1 + m.attachments.len());

        let (body_headers, body) = &parts[0];
        assert_eq!(body_headers, "Content-Type: text/plain");
        assert_eq!(body, "hello");

        let (headers, _) = &parts[1];
        assert_eq!(
            headers,
            "Content-Disposition: attachment; filename=\"a.bin\"\r\n\
             Content-Type: application/octet-stream\r\n\
             Content-Transfer-Encoding: base64"
        );
        let (headers, _) = &parts[3];
        assert!(headers.starts_with("Content-Disposition: inline; filename=\"logo.png\"\r\n"));
        assert!(headers.contains("Content-Type: image/png\r\n"));
    }

    #[test]
    fn attachment_parts_decode_to_original_bytes() {
        let blobs: Vec<Vec<u8>> = vec![
            b"file content".to_vec(),
            (0..=255u8).cycle().take(1000).collect(),
            Vec::new(),
        ];
        let mut m = basic();
        for (i, blob) in blobs.iter().enumerate() {
            m.add_attachment_data(format!("f{i}.bin"), blob.clone(), "");
        }
        let raw = text(&m);
        let parts = parts(&raw);
        for (blob, (_, content)) in blobs.iter().zip(&parts[1..]) {
            let joined: String = content.split("\r\n").collect();
            assert_eq!(&STANDARD.decode(joined).unwrap(), blob);
        }
    }

    #[test]
    fn serialization_does_not_mutate_and_only_boundary_varies() {
        let mut m = basic();
        m.add_attachment_data("t.txt", "x", "text/plain");
        let before = m.clone();

        let first = text(&m);
        let second = text(&m);
        assert_eq!(m, before);
        assert_ne!(boundary_of(&first), boundary_of(&second));
        assert_eq!(
            first.replace(boundary_of(&first), "B"),
            second.replace(boundary_of(&second), "B")
        );
    }

    #[test]
    fn add_attachment_from_missing_path_leaves_message_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let mut m = basic();
        let err = m.add_attachment(dir.path().join("nope.txt"), []).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
        assert!(m.attachments.is_empty());
    }

    #[test]
    fn add_attachment_from_path_uses_options() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"remember the milk").unwrap();

        let mut m = basic();
        m.add_attachment(&path, [AttachOption::FileName("milk.txt".into())])
            .unwrap();
        let raw = text(&m);
        assert!(raw.contains("filename=\"milk.txt\""));
        assert!(raw.contains(&mime_b64("remember the milk")));
    }

    #[test]
    fn recipients_preserve_order_and_duplicates() {
        let mut m = basic();
        m.add_to(["t2@x.com"])
            .add_cc(["c1@x.com", "b@x.com"])
            .add_bcc(["z@x.com"]);
        assert_eq!(
            m.recipients(),
            vec!["b@x.com", "t2@x.com", "c1@x.com", "b@x.com", "z@x.com"]
        );
    }

    fn mime_b64(s: &str) -> String {
        STANDARD.encode(s)
    }
}
