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

//! # mail-compose
//!
//! _mail-compose_ is a Rust library to compose e-mail messages step by step and
//! deliver them via SMTP. It includes the following features:
//!
//! - Accumulation of **From**, **To**, **Cc**, **Bcc** and **Reply-To** addresses with
//!   validation of every address as it is added.
//! - Custom headers, subject, charset, plain content or pre-assembled **multipart** bodies.
//! - One-shot message building: an `Email` is frozen into a `MimeMessage` exactly once.
//! - Generates messages conforming to the Internet Message Format standard (_RFC 5322_)
//!   using [`mail-builder`](https://crates.io/crates/mail-builder).
//! - SMTP delivery over implicit TLS, STARTTLS or clear text using
//!   [`mail-send`](https://crates.io/crates/mail-send).
//! - Full async delivery (requires Tokio).
//!
//! ## Usage Example
//!
//! ```rust
//!     let mut email = Email::new();
//!     email
//!         .set_host_name("smtp.example.com")
//!         .set_ssl_on_connect(true)
//!         .set_authentication("john", "p4ssw0rd");
//!     email.set_from_named("john@example.com", "John Doe")?;
//!     email.add_to("jane@example.com")?;
//!     email.set_subject("Hi!").set_text("Hello world!");
//!
//!     // Builds the message once and delivers it.
//!     let message_id = email.send().await?;
//! ```
//!
//! ## License
//!
//! Licensed under either of
//!
//!  * Apache License, Version 2.0 ([LICENSE-APACHE](LICENSE-APACHE) or <http://www.apache.org/licenses/LICENSE-2.0>)
//!  * MIT license ([LICENSE-MIT](LICENSE-MIT) or <http://opensource.org/licenses/MIT>)
//!
//! at your option.
//!

pub mod email;
pub mod session;

use std::fmt::Display;

pub use email::{
    address::EmailAddress,
    content::{Content, Multipart, Part, PartBody},
    message::{MimeMessage, RecipientType},
    Email,
};
pub use mail_builder;
pub use session::Session;

#[derive(Debug)]
pub enum Error {
    /// An address list was empty or contained a malformed address.
    InvalidAddressList,

    /// Malformed e-mail address.
    InvalidAddress(String),

    /// Empty header name.
    InvalidHeaderName,

    /// Empty header value.
    InvalidHeaderValue,

    /// Header name with characters outside printable ASCII or a colon, or
    /// header value with a line break.
    MalformedHeader(String),

    /// Header generated from the message fields, it can not be set directly.
    ReservedHeader(String),

    /// Unknown charset.
    InvalidCharset(String),

    /// Content that can not be represented in the configured charset.
    UnmappableCharacters(String),

    /// The message was already built.
    AlreadyBuilt,

    /// The message has not been built yet.
    NotBuilt,

    /// Missing SMTP host name.
    MissingHostName,

    /// Missing message sender.
    MissingFrom,

    /// Missing message recipients.
    MissingRecipients,

    /// I/O error
    Io(std::io::Error),

    /// SMTP delivery error.
    Transport(mail_send::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::InvalidAddressList => write!(f, "Address List provided was invalid"),
            Error::InvalidAddress(address) => write!(f, "Invalid e-mail address: {}", address),
            Error::InvalidHeaderName => write!(f, "name can not be null or empty"),
            Error::InvalidHeaderValue => write!(f, "value can not be null or empty"),
            Error::MalformedHeader(name) => write!(f, "Malformed header: {}", name),
            Error::ReservedHeader(name) => {
                write!(f, "Header {} is generated from the message fields", name)
            }
            Error::InvalidCharset(charset) => write!(f, "Unsupported charset: {}", charset),
            Error::UnmappableCharacters(charset) => {
                write!(f, "Content can not be represented in charset {}", charset)
            }
            Error::AlreadyBuilt => write!(f, "The MimeMessage is already built."),
            Error::NotBuilt => write!(f, "The MimeMessage has not been built yet."),
            Error::MissingHostName => write!(f, "Cannot find valid hostname for mail session"),
            Error::MissingFrom => write!(f, "From address required"),
            Error::MissingRecipients => write!(f, "At least one receiver address required"),
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Transport(e) => write!(f, "SMTP delivery error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Transport(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<mail_send::Error> for Error {
    fn from(err: mail_send::Error) -> Self {
        Error::Transport(err)
    }
}
