/*
 * Copyright Stalwart Labs Ltd. See the COPYING
 * file at the top-level directory of this distribution.
 *
 * Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
 * https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
 * <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
 * option. This file may not be copied, modified, or distributed
 * except according to those terms.
 */

use encoding_rs::{Encoding, UTF_8};
use mail_builder::{headers::content_type::ContentType, mime::MimePart};

/// Message content, either a single value with its MIME type or a
/// pre-assembled multipart body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    Text { value: String, mime_type: String },
    Multipart(Multipart),
}

/// A multipart body such as `multipart/mixed` or `multipart/alternative`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Multipart {
    subtype: String,
    parts: Vec<Part>,
}

/// A single body part of a multipart body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    content_type: String,
    body: PartBody,
    file_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartBody {
    Text(String),
    Binary(Vec<u8>),
    Multipart(Multipart),
}

impl Content {
    /// The text value when the content is not multipart.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Content::Text { value, .. } => Some(value),
            Content::Multipart(_) => None,
        }
    }

    pub fn as_multipart(&self) -> Option<&Multipart> {
        match self {
            Content::Multipart(multipart) => Some(multipart),
            Content::Text { .. } => None,
        }
    }

    pub fn mime_type(&self) -> String {
        match self {
            Content::Text { mime_type, .. } => mime_type.clone(),
            Content::Multipart(multipart) => multipart.mime_type(),
        }
    }

    pub(crate) fn to_mime_part(&self, charset: Option<&str>) -> MimePart<'static> {
        match self {
            Content::Text { value, mime_type } => text_part(mime_type, value, charset),
            Content::Multipart(multipart) => multipart.to_mime_part(charset),
        }
    }

    /// Fails if the charset is unknown or can not represent every text part.
    pub(crate) fn check_charset(&self, charset: &str) -> crate::Result<()> {
        match self {
            Content::Text { value, mime_type } => check_text(mime_type, value, charset),
            Content::Multipart(multipart) => multipart.check_charset(charset),
        }
    }
}

impl Default for Multipart {
    fn default() -> Self {
        Multipart::new("mixed")
    }
}

impl Multipart {
    /// Creates an empty multipart body of the given subtype.
    pub fn new(subtype: impl Into<String>) -> Self {
        Multipart {
            subtype: subtype.into(),
            parts: Vec::new(),
        }
    }

    /// Creates an empty `multipart/mixed` body.
    pub fn mixed() -> Self {
        Multipart::new("mixed")
    }

    /// Creates an empty `multipart/alternative` body.
    pub fn alternative() -> Self {
        Multipart::new("alternative")
    }

    /// Appends a body part.
    pub fn part(mut self, part: Part) -> Self {
        self.parts.push(part);
        self
    }

    pub fn add_part(&mut self, part: Part) {
        self.parts.push(part);
    }

    pub fn subtype(&self) -> &str {
        &self.subtype
    }

    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn mime_type(&self) -> String {
        format!("multipart/{}", self.subtype)
    }

    fn to_mime_part(&self, charset: Option<&str>) -> MimePart<'static> {
        MimePart::new(
            ContentType::new(self.mime_type()),
            self.parts
                .iter()
                .map(|part| part.to_mime_part(charset))
                .collect::<Vec<_>>(),
        )
    }

    fn check_charset(&self, charset: &str) -> crate::Result<()> {
        self.parts.iter().try_for_each(|part| match &part.body {
            PartBody::Text(value) => check_text(&part.content_type, value, charset),
            PartBody::Binary(_) => Ok(()),
            PartBody::Multipart(multipart) => multipart.check_charset(charset),
        })
    }
}

impl Part {
    /// Text part with the given MIME type, e.g. `text/html`.
    pub fn text(mime_type: impl Into<String>, value: impl Into<String>) -> Self {
        Part {
            content_type: mime_type.into(),
            body: PartBody::Text(value.into()),
            file_name: None,
        }
    }

    /// Binary part, such as an image or a PDF file.
    pub fn binary(mime_type: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Part {
            content_type: mime_type.into(),
            body: PartBody::Binary(value.into()),
            file_name: None,
        }
    }

    /// Nested multipart part.
    pub fn multipart(multipart: Multipart) -> Self {
        Part {
            content_type: multipart.mime_type(),
            body: PartBody::Multipart(multipart),
            file_name: None,
        }
    }

    /// Marks the part as an attachment with the given file name.
    pub fn attachment(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn body(&self) -> &PartBody {
        &self.body
    }

    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    fn to_mime_part(&self, charset: Option<&str>) -> MimePart<'static> {
        let part = match &self.body {
            PartBody::Text(value) => text_part(&self.content_type, value, charset),
            PartBody::Binary(value) => {
                MimePart::new(ContentType::new(self.content_type.clone()), value.clone())
            }
            PartBody::Multipart(multipart) => multipart.to_mime_part(charset),
        };

        match &self.file_name {
            Some(file_name) => part.attachment(file_name.clone()),
            None => part,
        }
    }
}

fn is_text(mime_type: &str) -> bool {
    mime_type
        .get(..5)
        .map_or(false, |prefix| prefix.eq_ignore_ascii_case("text/"))
}

fn resolve_charset(charset: &str) -> crate::Result<&'static Encoding> {
    Encoding::for_label(charset.trim().as_bytes())
        .ok_or_else(|| crate::Error::InvalidCharset(charset.to_string()))
}

fn check_text(mime_type: &str, value: &str, charset: &str) -> crate::Result<()> {
    if !is_text(mime_type) {
        return Ok(());
    }
    let (_, _, had_errors) = resolve_charset(charset)?.encode(value);
    if had_errors {
        Err(crate::Error::UnmappableCharacters(charset.to_string()))
    } else {
        Ok(())
    }
}

// Text parts are declared and encoded in the configured charset. Charsets
// that fail to resolve are rejected at build time, here they fall back to UTF-8.
fn text_part(mime_type: &str, value: &str, charset: Option<&str>) -> MimePart<'static> {
    let content_type = ContentType::new(mime_type.to_string());
    if !is_text(mime_type) {
        return MimePart::new(content_type, value.to_string());
    }

    match charset.and_then(|charset| resolve_charset(charset).ok()) {
        Some(encoding) if encoding != UTF_8 => {
            let (bytes, encoding, _) = encoding.encode(value);
            MimePart::new(
                content_type.attribute("charset", encoding.name().to_ascii_lowercase()),
                bytes.into_owned(),
            )
        }
        _ => MimePart::new(content_type.attribute("charset", "utf-8"), value.to_string()),
    }
}

#[cfg(test)]
mod test {
    use super::{Content, Multipart, Part, PartBody};
    use crate::Error;

    #[test]
    fn content_variants() {
        let content = Content::Text {
            value: "Email Content".to_string(),
            mime_type: "text/plain".to_string(),
        };
        assert_eq!(content.as_text(), Some("Email Content"));
        assert_eq!(content.as_multipart(), None);
        assert_eq!(content.mime_type(), "text/plain");

        let content = Content::Multipart(Multipart::default());
        assert_eq!(content.as_text(), None);
        assert_eq!(content.as_multipart(), Some(&Multipart::mixed()));
        assert_eq!(content.mime_type(), "multipart/mixed");
    }

    #[test]
    fn nested_multipart() {
        let body = Multipart::mixed()
            .part(Part::multipart(
                Multipart::alternative()
                    .part(Part::text("text/plain", "Hello"))
                    .part(Part::text("text/html", "<p>Hello</p>")),
            ))
            .part(Part::binary("image/png", [1u8, 2, 3, 4]).attachment("image.png"));

        assert_eq!(body.len(), 2);
        assert_eq!(body.parts()[0].content_type(), "multipart/alternative");
        assert_eq!(body.parts()[1].file_name(), Some("image.png"));
        assert!(matches!(
            body.parts()[1].body(),
            PartBody::Binary(bytes) if bytes == &[1, 2, 3, 4]
        ));
    }

    #[test]
    fn check_charset() {
        let content = Content::Text {
            value: "caf\u{e9}".to_string(),
            mime_type: "text/plain".to_string(),
        };
        assert!(content.check_charset("ISO-8859-1").is_ok());
        assert!(content.check_charset("utf-8").is_ok());
        assert!(matches!(
            content.check_charset("no-such-charset"),
            Err(Error::InvalidCharset(_))
        ));

        let body = Multipart::mixed()
            .part(Part::text("text/plain", "plain"))
            .part(Part::multipart(
                Multipart::alternative().part(Part::text("text/html", "\u{65e5}\u{672c}")),
            ))
            .part(Part::binary("image/png", [0xffu8, 0xfe]));
        let content = Content::Multipart(body);
        assert!(content.check_charset("Shift_JIS").is_ok());
        assert!(matches!(
            content.check_charset("ISO-8859-1"),
            Err(Error::UnmappableCharacters(charset)) if charset == "ISO-8859-1"
        ));
    }
}
