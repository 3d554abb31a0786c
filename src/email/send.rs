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

use super::Email;

impl Email {
    /// Builds the message and delivers it, returning its Message-ID.
    pub async fn send(&mut self) -> crate::Result<String> {
        if self.to.is_empty() && self.cc.is_empty() && self.bcc.is_empty() {
            return Err(crate::Error::MissingRecipients);
        }
        self.build_message()?;
        self.send_mime_message().await
    }

    /// Delivers a message previously built with `build_message`.
    pub async fn send_mime_message(&mut self) -> crate::Result<String> {
        let session = self.mail_session()?;
        let message = self.mime_message().ok_or(crate::Error::NotBuilt)?;
        if message.all_recipients().next().is_none() {
            return Err(crate::Error::MissingRecipients);
        }

        session.send(message).await?;
        Ok(message.message_id().to_string())
    }
}
