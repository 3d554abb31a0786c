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

use std::time::Duration;

use mail_send::SmtpClientBuilder;

use crate::email::message::MimeMessage;

pub(crate) const DEFAULT_SMTP_PORT: u16 = 25;
pub(crate) const DEFAULT_SSL_SMTP_PORT: u16 = 465;
pub(crate) const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// SMTP session parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub host_name: String,
    pub smtp_port: u16,
    pub ssl_smtp_port: u16,
    pub ssl_on_connect: bool,
    pub start_tls: bool,
    pub connection_timeout: Duration,
    pub timeout: Duration,
    pub credentials: Option<(String, String)>,
    pub allow_invalid_certs: bool,
    pub helo_host: Option<String>,
}

impl Session {
    pub fn new(host_name: impl Into<String>) -> Self {
        Session {
            host_name: host_name.into(),
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

    /// Sets the SMTP port used for clear text and STARTTLS connections.
    pub fn smtp_port(mut self, port: u16) -> Self {
        self.smtp_port = port;
        self
    }

    /// Sets the SMTP port used for implicit TLS connections.
    pub fn ssl_smtp_port(mut self, port: u16) -> Self {
        self.ssl_smtp_port = port;
        self
    }

    /// Start connection in TLS
    pub fn ssl_on_connect(mut self, ssl_on_connect: bool) -> Self {
        self.ssl_on_connect = ssl_on_connect;
        self
    }

    /// Upgrade a clear text connection with STARTTLS
    pub fn start_tls(mut self, start_tls: bool) -> Self {
        self.start_tls = start_tls;
        self
    }

    /// Sets the time allowed to establish the connection, including the greeting.
    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    /// Sets the SMTP command timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Authentication credentials.
    pub fn credentials(mut self, username: impl Into<String>, secret: impl Into<String>) -> Self {
        self.credentials = Some((username.into(), secret.into()));
        self
    }

    /// Allow invalid TLS certificates
    pub fn allow_invalid_certs(mut self, allow_invalid_certs: bool) -> Self {
        self.allow_invalid_certs = allow_invalid_certs;
        self
    }

    /// Set the EHLO hostname, defaults to the local host name.
    pub fn helo_host(mut self, host: impl Into<String>) -> Self {
        self.helo_host = Some(host.into());
        self
    }

    /// Port the session connects to, which depends on `ssl_on_connect`.
    pub fn port(&self) -> u16 {
        if self.ssl_on_connect {
            self.ssl_smtp_port
        } else {
            self.smtp_port
        }
    }

    /// Connects to the SMTP server, delivers the message and quits.
    pub async fn send(&self, message: &MimeMessage) -> crate::Result<()> {
        let local_host = self.helo_host.clone().unwrap_or_else(|| {
            gethostname::gethostname()
                .to_str()
                .unwrap_or("[127.0.0.1]")
                .to_string()
        });
        let mut builder = SmtpClientBuilder::new(self.host_name.as_str(), self.port())
            .implicit_tls(self.ssl_on_connect)
            .timeout(self.timeout)
            .helo_host(local_host);
        if let Some((username, secret)) = &self.credentials {
            builder = builder.credentials((username.as_str(), secret.as_str()));
        }
        if self.allow_invalid_certs {
            builder = builder.allow_invalid_certs();
        }

        tracing::debug!(
            host = self.host_name.as_str(),
            port = self.port(),
            ssl_on_connect = self.ssl_on_connect,
            start_tls = self.start_tls,
            "Connecting to SMTP server"
        );

        if self.ssl_on_connect || self.start_tls {
            let mut client = tokio::time::timeout(self.connection_timeout, builder.connect())
                .await
                .map_err(|_| mail_send::Error::Timeout)??;
            client.send(message).await?;
            client.quit().await?;
        } else {
            let mut client = tokio::time::timeout(self.connection_timeout, builder.connect_plain())
                .await
                .map_err(|_| mail_send::Error::Timeout)??;
            client.send(message).await?;
            client.quit().await?;
        }

        tracing::info!(
            message_id = message.message_id(),
            host = self.host_name.as_str(),
            "Message delivered"
        );

        Ok(())
    }
}
