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

use std::{collections::HashMap, sync::Arc, time::Duration};

use chrono::{DateTime, Utc};

use crate::session::{Session, DEFAULT_SMTP_PORT, DEFAULT_SSL_SMTP_PORT, DEFAULT_TIMEOUT};

use self::{
    address::{parse_list, EmailAddress},
    content::{Content, Multipart},
    message::MimeMessage,
};

pub mod address;
pub mod content;
pub mod message;
pub mod send;

/// E-mail message under construction.
///
/// Addresses, headers, content and session parameters may be set in any
/// order. `build_message` then freezes them into a `MimeMessage`, which can
/// happen only once per instance.
#[derive(Debug, Default)]
pub struct Email {
    from: Option<EmailAddress>,
    bounce_address: Option<EmailAddress>,
    to: Vec<EmailAddress>,
    cc: Vec<EmailAddress>,
    bcc: Vec<EmailAddress>,
    reply_to: Vec<EmailAddress>,
    headers: HashMap<String, String>,
    subject: Option<String>,
    charset: Option<String>,
    content: Option<Content>,
    sent_date: Option<DateTime<Utc>>,
    transport: Transport,
    session: Option<Arc<Session>>,
    state: BuildState,
}

/// Parameters the mail session is derived from.
#[derive(Debug, Clone)]
struct Transport {
    host_name: Option<String>,
    smtp_port: u16,
    ssl_smtp_port: u16,
    ssl_on_connect: bool,
    start_tls: bool,
    connection_timeout: Duration,
    timeout: Duration,
    credentials: Option<(String, String)>,
    allow_invalid_certs: bool,
    helo_host: Option<String>,
}

#[derive(Debug, Default)]
enum BuildState {
    #[default]
    Unbuilt,
    Built(MimeMessage),
}

impl Default for Transport {
    fn default() -> Self {
        Transport {
            host_name: None,
            smtp_port: DEFAULT_SMTP_PORT,
            ssl_smtp_port: DEFAULT_SSL_SMTP_PORT,
            ssl_on_connect: false,
            start_tls: false,
            connection_timeout: DEFAULT_TIMEOUT,
            timeout: DEFAULT_TIMEOUT,
            credentials: None,
            allow_invalid_certs: false,
            helo_host: None,
        }
    }
}

impl Email {
    /// Creates an empty message.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the sender of the message.
    pub fn set_from(&mut self, address: &str) -> crate::Result<&mut Self> {
        self.from = EmailAddress::parse(address)?.into();
        Ok(self)
    }

    /// Sets the sender of the message along with its display name.
    pub fn set_from_named(
        &mut self,
        address: &str,
        name: impl Into<String>,
    ) -> crate::Result<&mut Self> {
        self.from = EmailAddress::with_name(address, name)?.into();
        Ok(self)
    }

    /// Sets the SMTP envelope sender, bounces are delivered here instead of
    /// the From address.
    pub fn set_bounce_address(&mut self, address: &str) -> crate::Result<&mut Self> {
        self.bounce_address = EmailAddress::parse(address)?.into();
        Ok(self)
    }

    /// Adds a To recipient.
    pub fn add_to(&mut self, address: &str) -> crate::Result<&mut Self> {
        self.to.push(EmailAddress::parse(address)?);
        Ok(self)
    }

    pub fn add_to_named(
        &mut self,
        address: &str,
        name: impl Into<String>,
    ) -> crate::Result<&mut Self> {
        self.to.push(EmailAddress::with_name(address, name)?);
        Ok(self)
    }

    /// Adds a list of To recipients. Fails if the list is empty or contains
    /// a malformed address, in which case nothing is added.
    pub fn add_tos<T: AsRef<str>>(
        &mut self,
        addresses: impl IntoIterator<Item = T>,
    ) -> crate::Result<&mut Self> {
        self.to.extend(parse_list(addresses)?);
        Ok(self)
    }

    /// Replaces the To recipients.
    pub fn set_to<T: AsRef<str>>(
        &mut self,
        addresses: impl IntoIterator<Item = T>,
    ) -> crate::Result<&mut Self> {
        self.to = parse_list(addresses)?;
        Ok(self)
    }

    /// Adds a Cc recipient.
    pub fn add_cc(&mut self, address: &str) -> crate::Result<&mut Self> {
        self.cc.push(EmailAddress::parse(address)?);
        Ok(self)
    }

    pub fn add_cc_named(
        &mut self,
        address: &str,
        name: impl Into<String>,
    ) -> crate::Result<&mut Self> {
        self.cc.push(EmailAddress::with_name(address, name)?);
        Ok(self)
    }

    pub fn add_ccs<T: AsRef<str>>(
        &mut self,
        addresses: impl IntoIterator<Item = T>,
    ) -> crate::Result<&mut Self> {
        self.cc.extend(parse_list(addresses)?);
        Ok(self)
    }

    pub fn set_cc<T: AsRef<str>>(
        &mut self,
        addresses: impl IntoIterator<Item = T>,
    ) -> crate::Result<&mut Self> {
        self.cc = parse_list(addresses)?;
        Ok(self)
    }

    /// Adds a Bcc recipient.
    pub fn add_bcc(&mut self, address: &str) -> crate::Result<&mut Self> {
        self.bcc.push(EmailAddress::parse(address)?);
        Ok(self)
    }

    pub fn add_bcc_named(
        &mut self,
        address: &str,
        name: impl Into<String>,
    ) -> crate::Result<&mut Self> {
        self.bcc.push(EmailAddress::with_name(address, name)?);
        Ok(self)
    }

    pub fn add_bccs<T: AsRef<str>>(
        &mut self,
        addresses: impl IntoIterator<Item = T>,
    ) -> crate::Result<&mut Self> {
        self.bcc.extend(parse_list(addresses)?);
        Ok(self)
    }

    pub fn set_bcc<T: AsRef<str>>(
        &mut self,
        addresses: impl IntoIterator<Item = T>,
    ) -> crate::Result<&mut Self> {
        self.bcc = parse_list(addresses)?;
        Ok(self)
    }

    /// Adds a Reply-To address.
    pub fn add_reply_to(&mut self, address: &str) -> crate::Result<&mut Self> {
        self.reply_to.push(EmailAddress::parse(address)?);
        Ok(self)
    }

    pub fn add_reply_to_named(
        &mut self,
        address: &str,
        name: impl Into<String>,
    ) -> crate::Result<&mut Self> {
        self.reply_to.push(EmailAddress::with_name(address, name)?);
        Ok(self)
    }

    pub fn add_reply_tos<T: AsRef<str>>(
        &mut self,
        addresses: impl IntoIterator<Item = T>,
    ) -> crate::Result<&mut Self> {
        self.reply_to.extend(parse_list(addresses)?);
        Ok(self)
    }

    pub fn set_reply_to<T: AsRef<str>>(
        &mut self,
        addresses: impl IntoIterator<Item = T>,
    ) -> crate::Result<&mut Self> {
        self.reply_to = parse_list(addresses)?;
        Ok(self)
    }

    /// Adds a custom header, replacing any previous value with the same name.
    pub fn add_header(
        &mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> crate::Result<&mut Self> {
        let name = name.into();
        let value = value.into();
        validate_header(&name, &value)?;

        self.headers.insert(name, value);
        Ok(self)
    }

    /// Replaces all custom headers. Nothing changes if any pair is invalid.
    pub fn set_headers<K, V>(
        &mut self,
        headers: impl IntoIterator<Item = (K, V)>,
    ) -> crate::Result<&mut Self>
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.headers = headers
            .into_iter()
            .map(|(name, value)| {
                let name = name.into();
                let value = value.into();
                validate_header(&name, &value).map(|_| (name, value))
            })
            .collect::<crate::Result<HashMap<_, _>>>()?;
        Ok(self)
    }

    pub fn set_subject(&mut self, subject: impl Into<String>) -> &mut Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn set_charset(&mut self, charset: impl Into<String>) -> &mut Self {
        self.charset = Some(charset.into());
        self
    }

    /// Sets the content along with its MIME type, replacing any multipart body.
    pub fn set_content(
        &mut self,
        value: impl Into<String>,
        mime_type: impl Into<String>,
    ) -> &mut Self {
        self.content = Some(Content::Text {
            value: value.into(),
            mime_type: mime_type.into(),
        });
        self
    }

    /// Sets a `text/plain` content.
    pub fn set_text(&mut self, value: impl Into<String>) -> &mut Self {
        self.set_content(value, "text/plain")
    }

    /// Sets a pre-assembled multipart body, replacing any other content.
    pub fn set_multipart_content(&mut self, body: Multipart) -> &mut Self {
        self.content = Some(Content::Multipart(body));
        self
    }

    pub fn set_sent_date(&mut self, date: DateTime<Utc>) -> &mut Self {
        self.sent_date = Some(date);
        self
    }

    pub fn set_host_name(&mut self, host_name: impl Into<String>) -> &mut Self {
        self.transport.host_name = Some(host_name.into());
        self.session = None;
        self
    }

    pub fn set_smtp_port(&mut self, port: u16) -> &mut Self {
        self.transport.smtp_port = port;
        self.session = None;
        self
    }

    pub fn set_ssl_smtp_port(&mut self, port: u16) -> &mut Self {
        self.transport.ssl_smtp_port = port;
        self.session = None;
        self
    }

    /// Connect using implicit TLS on the SSL port.
    pub fn set_ssl_on_connect(&mut self, ssl_on_connect: bool) -> &mut Self {
        self.transport.ssl_on_connect = ssl_on_connect;
        self.session = None;
        self
    }

    /// Upgrade the connection with STARTTLS.
    pub fn set_start_tls_enabled(&mut self, start_tls: bool) -> &mut Self {
        self.transport.start_tls = start_tls;
        self.session = None;
        self
    }

    pub fn set_socket_connection_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.transport.connection_timeout = timeout;
        self.session = None;
        self
    }

    pub fn set_socket_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.transport.timeout = timeout;
        self.session = None;
        self
    }

    /// Authentication credentials.
    pub fn set_authentication(
        &mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> &mut Self {
        self.transport.credentials = Some((username.into(), password.into()));
        self.session = None;
        self
    }

    /// Allow invalid TLS certificates
    pub fn set_allow_invalid_certs(&mut self, allow_invalid_certs: bool) -> &mut Self {
        self.transport.allow_invalid_certs = allow_invalid_certs;
        self.session = None;
        self
    }

    /// Set the EHLO hostname, defaults to the local host name.
    pub fn set_helo_host(&mut self, host: impl Into<String>) -> &mut Self {
        self.transport.helo_host = Some(host.into());
        self.session = None;
        self
    }

    /// Installs an explicit session. Its parameters replace the ones
    /// configured on this message.
    pub fn set_mail_session(&mut self, session: Session) -> &mut Self {
        self.transport = Transport {
            host_name: Some(session.host_name.clone()),
            smtp_port: session.smtp_port,
            ssl_smtp_port: session.ssl_smtp_port,
            ssl_on_connect: session.ssl_on_connect,
            start_tls: session.start_tls,
            connection_timeout: session.connection_timeout,
            timeout: session.timeout,
            credentials: session.credentials.clone(),
            allow_invalid_certs: session.allow_invalid_certs,
            helo_host: session.helo_host.clone(),
        };
        self.session = Some(Arc::new(session));
        self
    }

    /// Returns the mail session, creating it from the current parameters on
    /// first use. The same session is returned until a session parameter
    /// changes.
    pub fn mail_session(&mut self) -> crate::Result<Arc<Session>> {
        if let Some(session) = &self.session {
            return Ok(session.clone());
        }

        let transport = &self.transport;
        let host_name = transport
            .host_name
            .as_deref()
            .filter(|host_name| !host_name.is_empty())
            .ok_or(crate::Error::MissingHostName)?;
        let mut session = Session::new(host_name)
            .smtp_port(transport.smtp_port)
            .ssl_smtp_port(transport.ssl_smtp_port)
            .ssl_on_connect(transport.ssl_on_connect)
            .start_tls(transport.start_tls)
            .connection_timeout(transport.connection_timeout)
            .timeout(transport.timeout)
            .allow_invalid_certs(transport.allow_invalid_certs);
        if let Some((username, password)) = &transport.credentials {
            session = session.credentials(username.clone(), password.clone());
        }
        if let Some(helo_host) = &transport.helo_host {
            session = session.helo_host(helo_host.clone());
        }

        tracing::debug!(
            host = host_name,
            port = session.port(),
            ssl_on_connect = transport.ssl_on_connect,
            "Created mail session"
        );

        let session = Arc::new(session);
        self.session = Some(session.clone());
        Ok(session)
    }

    /// Freezes the current configuration into a `MimeMessage`.
    ///
    /// Fails if the message was already built, or if the host name or the
    /// sender are missing. A failed build leaves the message unbuilt.
    pub fn build_message(&mut self) -> crate::Result<&MimeMessage> {
        if self.is_built() {
            return Err(crate::Error::AlreadyBuilt);
        }
        if self
            .transport
            .host_name
            .as_deref()
            .map_or(true, str::is_empty)
        {
            return Err(crate::Error::MissingHostName);
        }
        let from = self.from.clone().ok_or(crate::Error::MissingFrom)?;
        if let (Some(charset), Some(content)) = (&self.charset, &self.content) {
            content.check_charset(charset)?;
        }

        let message = MimeMessage {
            from,
            bounce_address: self.bounce_address.clone(),
            to: self.to.clone(),
            cc: self.cc.clone(),
            bcc: self.bcc.clone(),
            reply_to: self.reply_to.clone(),
            headers: self.headers.clone(),
            subject: self.subject.clone(),
            charset: self.charset.clone(),
            content: self.content.clone(),
            sent_date: self.sent_date.unwrap_or_else(Utc::now),
            message_id: generate_message_id(),
        };

        tracing::debug!(
            message_id = message.message_id(),
            to = message.to.len(),
            cc = message.cc.len(),
            bcc = message.bcc.len(),
            "Built message"
        );

        self.state = BuildState::Built(message);
        self.mime_message().ok_or(crate::Error::NotBuilt)
    }

    /// The built message, `None` before `build_message` succeeds.
    pub fn mime_message(&self) -> Option<&MimeMessage> {
        match &self.state {
            BuildState::Built(message) => Some(message),
            BuildState::Unbuilt => None,
        }
    }

    pub fn is_built(&self) -> bool {
        matches!(self.state, BuildState::Built(_))
    }

    pub fn from_address(&self) -> Option<&EmailAddress> {
        self.from.as_ref()
    }

    pub fn bounce_address(&self) -> Option<&EmailAddress> {
        self.bounce_address.as_ref()
    }

    pub fn to_addresses(&self) -> &[EmailAddress] {
        &self.to
    }

    pub fn cc_addresses(&self) -> &[EmailAddress] {
        &self.cc
    }

    pub fn bcc_addresses(&self) -> &[EmailAddress] {
        &self.bcc
    }

    pub fn reply_to_addresses(&self) -> &[EmailAddress] {
        &self.reply_to
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    pub fn charset(&self) -> Option<&str> {
        self.charset.as_deref()
    }

    pub fn content(&self) -> Option<&Content> {
        self.content.as_ref()
    }

    pub fn host_name(&self) -> Option<&str> {
        self.transport.host_name.as_deref()
    }

    pub fn smtp_port(&self) -> u16 {
        self.transport.smtp_port
    }

    pub fn ssl_smtp_port(&self) -> u16 {
        self.transport.ssl_smtp_port
    }

    pub fn is_ssl_on_connect(&self) -> bool {
        self.transport.ssl_on_connect
    }

    pub fn is_start_tls_enabled(&self) -> bool {
        self.transport.start_tls
    }

    pub fn socket_connection_timeout(&self) -> Duration {
        self.transport.connection_timeout
    }

    pub fn socket_timeout(&self) -> Duration {
        self.transport.timeout
    }

    pub fn helo_host(&self) -> Option<&str> {
        self.transport.helo_host.as_deref()
    }

    /// Sent date as configured, `None` when it will default to the build time.
    pub fn sent_date(&self) -> Option<DateTime<Utc>> {
        self.sent_date
    }
}

// Generated by `MimeMessage` rendering, a custom value would duplicate them.
const RESERVED_HEADERS: [&str; 11] = [
    "from",
    "to",
    "cc",
    "bcc",
    "reply-to",
    "subject",
    "date",
    "message-id",
    "mime-version",
    "content-type",
    "content-transfer-encoding",
];

fn validate_header(name: &str, value: &str) -> crate::Result<()> {
    if name.is_empty() {
        return Err(crate::Error::InvalidHeaderName);
    }
    if value.is_empty() {
        return Err(crate::Error::InvalidHeaderValue);
    }
    if !name.bytes().all(|ch| (33..=126).contains(&ch) && ch != b':')
        || value.contains(['\r', '\n'])
    {
        return Err(crate::Error::MalformedHeader(name.to_string()));
    }
    if RESERVED_HEADERS
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(name))
    {
        return Err(crate::Error::ReservedHeader(name.to_string()));
    }
    Ok(())
}

fn generate_message_id() -> String {
    format!(
        "{:x}.{:x}@{}",
        Utc::now().timestamp_millis(),
        rand::random::<u64>(),
        gethostname::gethostname()
            .to_str()
            .filter(|host| !host.is_empty())
            .unwrap_or("localhost")
    )
}

#[cfg(test)]
mod test {
    use std::{sync::Arc, time::Duration};

    use chrono::{TimeZone, Utc};
    use mail_parser::MessageParser;

    use crate::{Content, Email, Multipart, RecipientType, Session};

    const TEST_EMAILS: [&str; 3] = [
        "ab@bc.com",
        "a.b@c.org",
        "alkjshdfkjsdhf@skjdhfksjdhf.com.bd",
    ];
    const TEST_EMAIL: &str = "ab@bc.com";

    fn buildable() -> Email {
        let mut email = Email::new();
        email.set_host_name("hostname");
        email.set_from(TEST_EMAIL).unwrap();
        email.add_to(TEST_EMAIL).unwrap();
        email
    }

    #[test]
    fn add_address_lists() {
        let mut email = Email::new();
        email.add_bccs(TEST_EMAILS).unwrap();
        assert_eq!(email.bcc_addresses().len(), 3);
        assert_eq!(
            email
                .bcc_addresses()
                .iter()
                .map(|a| a.email())
                .collect::<Vec<_>>(),
            TEST_EMAILS
        );

        email.add_ccs(TEST_EMAILS).unwrap().add_tos(TEST_EMAILS).unwrap();
        email.add_tos(TEST_EMAILS).unwrap();
        assert_eq!(email.cc_addresses().len(), 3);
        assert_eq!(email.to_addresses().len(), 6);

        email.set_to(["x@y.com"]).unwrap();
        assert_eq!(email.to_addresses().len(), 1);
    }

    #[test]
    fn reject_invalid_address_lists() {
        let mut email = Email::new();
        for result in [
            email.add_bccs(Vec::<&str>::new()).map(|_| ()),
            email.add_ccs(Vec::<String>::new()).map(|_| ()),
            email.add_tos(["ab@bc.com", "invalid"]).map(|_| ()),
            email.add_reply_tos(["@bc.com"]).map(|_| ()),
        ] {
            let err = result.unwrap_err();
            assert!(matches!(err, crate::Error::InvalidAddressList));
            assert_eq!(err.to_string(), "Address List provided was invalid");
        }
        assert!(email.to_addresses().is_empty());
        assert!(email.bcc_addresses().is_empty());

        assert!(matches!(
            email.add_cc("not an address"),
            Err(crate::Error::InvalidAddress(_))
        ));
        assert!(matches!(
            email.set_from("ab@"),
            Err(crate::Error::InvalidAddress(_))
        ));
    }

    #[test]
    fn add_single_addresses() {
        let mut email = Email::new();
        email.add_cc(TEST_EMAIL).unwrap();
        assert_eq!(email.cc_addresses().len(), 1);

        email.add_reply_to_named(TEST_EMAIL, "name").unwrap();
        assert_eq!(email.reply_to_addresses().len(), 1);
        assert_eq!(email.reply_to_addresses()[0].name(), Some("name"));

        // Duplicates are kept
        email.add_cc(TEST_EMAIL).unwrap();
        assert_eq!(email.cc_addresses().len(), 2);
    }

    #[test]
    fn add_headers() {
        let mut email = Email::new();
        email.add_header("name", "value").unwrap();
        assert_eq!(email.headers().len(), 1);

        email.add_header("name", "other value").unwrap();
        assert_eq!(email.headers().len(), 1);
        assert_eq!(
            email.headers().get("name").map(String::as_str),
            Some("other value")
        );

        let err = email.add_header("", "value").unwrap_err();
        assert!(matches!(err, crate::Error::InvalidHeaderName));
        assert_eq!(err.to_string(), "name can not be null or empty");

        let err = email.add_header("name", "").unwrap_err();
        assert!(matches!(err, crate::Error::InvalidHeaderValue));
        assert_eq!(err.to_string(), "value can not be null or empty");

        email
            .set_headers([("X-Priority", "1"), ("X-Mailer", "test")])
            .unwrap();
        assert_eq!(email.headers().len(), 2);
        assert!(!email.headers().contains_key("name"));
    }

    #[test]
    fn reject_malformed_headers() {
        let mut email = Email::new();
        for (name, value) in [
            ("X-Test", "a\r\nBcc: evil@attacker.com"),
            ("X-Test", "a\nb"),
            ("Bad: Name", "v"),
            ("Bad:Name", "v"),
            ("X-Caf\u{e9}", "v"),
            ("X-Tab\t", "v"),
        ] {
            assert!(
                matches!(
                    email.add_header(name, value),
                    Err(crate::Error::MalformedHeader(_))
                ),
                "{name:?}: {value:?}"
            );
        }
        for name in ["Subject", "FROM", "to", "Date", "Message-ID", "Content-Type"] {
            assert!(
                matches!(
                    email.add_header(name, "value"),
                    Err(crate::Error::ReservedHeader(_))
                ),
                "{name}"
            );
        }
        assert!(email.headers().is_empty());

        // Non-ASCII values are encoded when rendered
        email.add_header("X-Comment", "caf\u{e9}").unwrap();
        email.set_host_name("hostname");
        email.set_from(TEST_EMAIL).unwrap();
        email.add_to(TEST_EMAIL).unwrap();
        let raw = email.build_message().unwrap().write_to_vec().unwrap();
        let parsed = MessageParser::default().parse(&raw).unwrap();
        assert!(parsed.bcc().is_none());
        assert_eq!(
            parsed.header("X-Comment").and_then(|h| h.as_text()),
            Some("caf\u{e9}")
        );
    }

    #[test]
    fn set_headers_is_atomic() {
        let mut email = Email::new();
        email.add_header("X-Keep", "1").unwrap();

        assert!(matches!(
            email.set_headers([("X-A", "1"), ("", "x")]),
            Err(crate::Error::InvalidHeaderName)
        ));
        assert!(matches!(
            email.set_headers([("X-A", "1"), ("X-B", "a\r\nb")]),
            Err(crate::Error::MalformedHeader(_))
        ));
        assert_eq!(email.headers().len(), 1);
        assert_eq!(email.headers().get("X-Keep").map(String::as_str), Some("1"));
    }

    #[test]
    fn build_with_charset() {
        let mut email = buildable();
        email
            .set_charset("ISO-8859-1")
            .set_content("caf\u{e9}", "text/plain");
        let raw = email.build_message().unwrap().write_to_vec().unwrap();
        let parsed = MessageParser::default().parse(&raw).unwrap();
        assert_eq!(
            parsed.body_text(0).as_deref().map(str::trim_end),
            Some("caf\u{e9}")
        );

        let mut email = buildable();
        email.set_charset("no-such-charset").set_text("Email Content");
        assert!(matches!(
            email.build_message(),
            Err(crate::Error::InvalidCharset(_))
        ));
        assert!(!email.is_built());

        let mut email = buildable();
        email
            .set_charset("ISO-8859-1")
            .set_text("\u{65e5}\u{672c}\u{8a9e}");
        assert!(matches!(
            email.build_message(),
            Err(crate::Error::UnmappableCharacters(_))
        ));
        assert!(!email.is_built());
    }

    #[test]
    fn build_message() {
        let mut email = buildable();
        let message = email.build_message().unwrap();
        assert_eq!(message.recipients(RecipientType::To).len(), 1);
        assert!(message.recipients(RecipientType::Cc).is_empty());
        assert!(message.recipients(RecipientType::Bcc).is_empty());
        assert!(email.is_built());
        assert!(email.mime_message().is_some());

        let mut email = buildable();
        email.add_cc(TEST_EMAIL).unwrap();
        let message = email.build_message().unwrap();
        assert_eq!(message.recipients(RecipientType::Cc).len(), 1);

        let mut email = buildable();
        email.add_bcc(TEST_EMAIL).unwrap();
        let message = email.build_message().unwrap();
        assert_eq!(message.recipients(RecipientType::Bcc).len(), 1);

        let mut email = buildable();
        email.add_reply_to(TEST_EMAIL).unwrap();
        let message = email.build_message().unwrap();
        assert_eq!(message.reply_to().len(), 1);
    }

    #[test]
    fn build_subject() {
        let mut email = buildable();
        email.set_subject("Email subject");
        assert_eq!(
            email.build_message().unwrap().subject(),
            Some("Email subject")
        );

        let mut email = buildable();
        email.set_subject("Email subject").set_charset("UTF-8");
        let message = email.build_message().unwrap();
        assert_eq!(message.subject(), Some("Email subject"));
        assert_eq!(message.charset(), Some("UTF-8"));
    }

    #[test]
    fn build_content() {
        for mime_type in ["text/plain", "UTF-8"] {
            let mut email = buildable();
            email.set_content("Email Content", mime_type);
            let message = email.build_message().unwrap();
            assert_eq!(
                message.content().and_then(Content::as_text),
                Some("Email Content")
            );
        }

        let body = Multipart::default();
        let mut email = buildable();
        email.set_multipart_content(body.clone());
        let message = email.build_message().unwrap();
        assert_eq!(message.content(), Some(&Content::Multipart(body)));

        // Last content wins
        let mut email = buildable();
        email
            .set_multipart_content(Multipart::default())
            .set_text("Email Content");
        assert_eq!(
            email.build_message().unwrap().content(),
            Some(&Content::Text {
                value: "Email Content".to_string(),
                mime_type: "text/plain".to_string()
            })
        );
    }

    #[test]
    fn build_only_once() {
        let mut email = buildable();
        let message_id = email.build_message().unwrap().message_id().to_string();

        let err = email.build_message().unwrap_err();
        assert!(matches!(err, crate::Error::AlreadyBuilt));
        assert_eq!(err.to_string(), "The MimeMessage is already built.");
        assert_eq!(email.mime_message().unwrap().message_id(), message_id);
    }

    #[test]
    fn build_requires_host_and_from() {
        let mut email = Email::new();
        email.set_from(TEST_EMAIL).unwrap();
        assert!(matches!(
            email.build_message(),
            Err(crate::Error::MissingHostName)
        ));
        assert!(!email.is_built());

        let mut email = Email::new();
        email.set_host_name("hostname");
        assert!(matches!(
            email.build_message(),
            Err(crate::Error::MissingFrom)
        ));
        assert!(email.mime_message().is_none());

        // Fixing the input allows building
        email.set_from(TEST_EMAIL).unwrap();
        assert!(email.build_message().is_ok());
    }

    #[test]
    fn build_sent_date() {
        let date = Utc.with_ymd_and_hms(2022, 11, 4, 10, 30, 0).unwrap();
        let mut email = buildable();
        email.set_sent_date(date);
        assert_eq!(email.sent_date(), Some(date));
        assert_eq!(email.build_message().unwrap().sent_date(), date);

        let mut email = buildable();
        assert_eq!(email.sent_date(), None);
        let before = Utc::now();
        let sent_date = email.build_message().unwrap().sent_date();
        assert!(sent_date >= before && sent_date <= Utc::now());
    }

    #[test]
    fn host_name() {
        let mut email = Email::new();
        assert_eq!(email.host_name(), None);

        email.set_host_name("hostname");
        assert_eq!(email.host_name(), Some("hostname"));

        email.mail_session().unwrap();
        assert_eq!(email.host_name(), Some("hostname"));
    }

    #[test]
    fn mail_session() {
        let mut email = Email::new();
        assert!(matches!(
            email.mail_session(),
            Err(crate::Error::MissingHostName)
        ));

        email.set_host_name("hostname");
        let session = email.mail_session().unwrap();
        assert!(Arc::ptr_eq(&session, &email.mail_session().unwrap()));
        assert!(!session.ssl_on_connect);
        assert_eq!(session.port(), 25);

        email.set_ssl_on_connect(true);
        assert!(email.is_ssl_on_connect());
        let ssl_session = email.mail_session().unwrap();
        assert!(!Arc::ptr_eq(&session, &ssl_session));
        assert!(ssl_session.ssl_on_connect);
        assert_eq!(ssl_session.port(), 465);
        assert!(Arc::ptr_eq(&ssl_session, &email.mail_session().unwrap()));

        // Non-session parameters keep the cached session
        email.set_subject("Email subject");
        assert!(Arc::ptr_eq(&ssl_session, &email.mail_session().unwrap()));
    }

    #[test]
    fn explicit_mail_session() {
        let mut email = Email::new();
        email.set_mail_session(
            Session::new("smtp.example.com")
                .smtp_port(2525)
                .start_tls(true)
                .credentials("john", "p4ssw0rd"),
        );
        assert_eq!(email.host_name(), Some("smtp.example.com"));
        assert_eq!(email.smtp_port(), 2525);
        assert!(email.is_start_tls_enabled());

        let session = email.mail_session().unwrap();
        assert_eq!(
            session.credentials,
            Some(("john".to_string(), "p4ssw0rd".to_string()))
        );
        assert!(Arc::ptr_eq(&session, &email.mail_session().unwrap()));
    }

    #[test]
    fn mail_session_keeps_helo_host() {
        let mut email = Email::new();
        email.set_mail_session(Session::new("smtp.example.com").helo_host("mx.example.com"));
        assert_eq!(email.helo_host(), Some("mx.example.com"));

        email.set_socket_timeout(Duration::from_secs(5));
        let session = email.mail_session().unwrap();
        assert_eq!(session.helo_host.as_deref(), Some("mx.example.com"));
        assert_eq!(session.timeout, Duration::from_secs(5));

        email.set_helo_host("relay.example.com");
        assert_eq!(
            email.mail_session().unwrap().helo_host.as_deref(),
            Some("relay.example.com")
        );
    }

    #[test]
    fn socket_timeouts() {
        let mut email = Email::new();
        assert_eq!(email.socket_connection_timeout(), Duration::from_secs(60));

        email
            .set_socket_connection_timeout(Duration::from_millis(4))
            .set_socket_timeout(Duration::from_millis(8));
        assert_eq!(email.socket_connection_timeout(), Duration::from_millis(4));
        assert_eq!(email.socket_timeout(), Duration::from_millis(8));

        email.set_host_name("hostname");
        let session = email.mail_session().unwrap();
        assert_eq!(session.connection_timeout, Duration::from_millis(4));
        assert_eq!(session.timeout, Duration::from_millis(8));
    }

    #[test]
    fn set_from() {
        let mut email = Email::new();
        email.set_from("ab@bc.com").unwrap();
        let from = email.from_address().unwrap();
        assert_eq!(from.email(), "ab@bc.com");
        assert_eq!(from.name(), None);

        email.set_from_named("ab@bc.com", "John Doe").unwrap();
        assert_eq!(email.from_address().unwrap().name(), Some("John Doe"));
    }
}
