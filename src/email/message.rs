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

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use mail_builder::{
    headers::{address::Address, date::Date, message_id::MessageId, text::Text},
    MessageBuilder,
};
use mail_send::smtp::message::{IntoMessage, Message, Parameters};

use super::{address::EmailAddress, content::Content};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecipientType {
    To,
    Cc,
    Bcc,
}

/// A built message. Immutable once produced by `Email::build_message`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MimeMessage {
    pub(crate) from: EmailAddress,
    pub(crate) bounce_address: Option<EmailAddress>,
    pub(crate) to: Vec<EmailAddress>,
    pub(crate) cc: Vec<EmailAddress>,
    pub(crate) bcc: Vec<EmailAddress>,
    pub(crate) reply_to: Vec<EmailAddress>,
    pub(crate) headers: HashMap<String, String>,
    pub(crate) subject: Option<String>,
    pub(crate) charset: Option<String>,
    pub(crate) content: Option<Content>,
    pub(crate) sent_date: DateTime<Utc>,
    pub(crate) message_id: String,
}

impl MimeMessage {
    pub fn from(&self) -> &EmailAddress {
        &self.from
    }

    /// Recipients of the given type, in the order they were added.
    pub fn recipients(&self, recipient_type: RecipientType) -> &[EmailAddress] {
        match recipient_type {
            RecipientType::To => &self.to,
            RecipientType::Cc => &self.cc,
            RecipientType::Bcc => &self.bcc,
        }
    }

    /// Every recipient, To, Cc and Bcc.
    pub fn all_recipients(&self) -> impl Iterator<Item = &EmailAddress> {
        self.to.iter().chain(self.cc.iter()).chain(self.bcc.iter())
    }

    pub fn reply_to(&self) -> &[EmailAddress] {
        &self.reply_to
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
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

    pub fn sent_date(&self) -> DateTime<Utc> {
        self.sent_date
    }

    /// Message-ID without the enclosing angle brackets.
    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    /// Address used as the SMTP envelope sender.
    pub fn envelope_from(&self) -> &EmailAddress {
        self.bounce_address.as_ref().unwrap_or(&self.from)
    }

    /// Renders the message as RFC 5322 text. Bcc recipients are never written.
    pub fn write_to_vec(&self) -> crate::Result<Vec<u8>> {
        self.to_builder().write_to_vec().map_err(Into::into)
    }

    pub fn write_to_string(&self) -> crate::Result<String> {
        self.to_builder().write_to_string().map_err(Into::into)
    }

    fn to_builder(&self) -> MessageBuilder<'static> {
        let mut builder = MessageBuilder::new()
            .from(self.from.to_header())
            .message_id(MessageId::new(self.message_id.clone()))
            .date(Date::new(self.sent_date.timestamp()));

        if !self.to.is_empty() {
            builder = builder.to(address_list(&self.to));
        }
        if !self.cc.is_empty() {
            builder = builder.cc(address_list(&self.cc));
        }
        if !self.reply_to.is_empty() {
            builder = builder.reply_to(address_list(&self.reply_to));
        }

        if let Some(subject) = &self.subject {
            builder = builder.subject(Text::new(subject.clone()));
        }

        // Sorted so that the rendered output is stable.
        let mut headers = self.headers.iter().collect::<Vec<_>>();
        headers.sort_unstable();
        for (name, value) in headers {
            builder = builder.header(name.clone(), Text::new(value.clone()));
        }

        if let Some(content) = &self.content {
            builder = builder.body(content.to_mime_part(self.charset.as_deref()));
        }

        builder
    }
}

fn address_list(addresses: &[EmailAddress]) -> Address<'static> {
    if addresses.len() == 1 {
        addresses[0].to_header()
    } else {
        Address::new_list(addresses.iter().map(EmailAddress::to_header).collect())
    }
}

impl<'x> IntoMessage<'x> for &MimeMessage {
    fn into_message(self) -> mail_send::Result<Message<'x>> {
        let mut seen = HashSet::new();
        let rcpt_to = self
            .all_recipients()
            .map(|address| address.email().to_string())
            .filter(|email| seen.insert(email.to_lowercase()))
            .map(|email| mail_send::smtp::message::Address::new(email, Parameters::default()))
            .collect::<Vec<_>>();

        if rcpt_to.is_empty() {
            return Err(mail_send::Error::MissingRcptTo);
        }

        Ok(Message {
            mail_from: self.envelope_from().email().to_string().into(),
            rcpt_to,
            body: self
                .to_builder()
                .write_to_vec()
                .map_err(mail_send::Error::Io)?
                .into(),
        })
    }
}
