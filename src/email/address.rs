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

use std::{convert::TryFrom, fmt::Display};

use mail_builder::headers::address::Address;

const MAX_ADDRESS_LENGTH: usize = 254;
const MAX_LOCAL_PART_LENGTH: usize = 64;

/// E-mail address with an optional display name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EmailAddress {
    email: String,
    name: Option<String>,
}

impl EmailAddress {
    /// Parses either `local@domain` or `Display Name <local@domain>`.
    pub fn parse(address: &str) -> crate::Result<Self> {
        let address = address.trim();

        let (name, email) = match (address.rfind('<'), address.ends_with('>')) {
            (Some(start), true) => {
                let name = address[..start].trim().trim_matches('"').trim();
                (
                    if !name.is_empty() {
                        Some(name.to_string())
                    } else {
                        None
                    },
                    address[start + 1..address.len() - 1].trim(),
                )
            }
            (None, false) => (None, address),
            _ => return Err(crate::Error::InvalidAddress(address.to_string())),
        };

        if is_valid_email(email) {
            Ok(EmailAddress {
                email: email.to_string(),
                name,
            })
        } else {
            Err(crate::Error::InvalidAddress(address.to_string()))
        }
    }

    /// Parses `email` and attaches an explicit display name.
    pub fn with_name(email: &str, name: impl Into<String>) -> crate::Result<Self> {
        let mut address = Self::parse(email)?;
        let name = name.into();
        address.name = if !name.trim().is_empty() {
            Some(name)
        } else {
            None
        };
        Ok(address)
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    /// Display name, `None` when it was not supplied.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub(crate) fn to_header(&self) -> Address<'static> {
        Address::new_address(self.name.clone(), self.email.clone())
    }
}

/// Parses every entry of an address list, failing the whole list if it is
/// empty or any entry is malformed.
pub(crate) fn parse_list<T: AsRef<str>>(
    addresses: impl IntoIterator<Item = T>,
) -> crate::Result<Vec<EmailAddress>> {
    let addresses = addresses
        .into_iter()
        .map(|address| {
            EmailAddress::parse(address.as_ref()).map_err(|_| crate::Error::InvalidAddressList)
        })
        .collect::<crate::Result<Vec<_>>>()?;

    if !addresses.is_empty() {
        Ok(addresses)
    } else {
        Err(crate::Error::InvalidAddressList)
    }
}

fn is_valid_email(email: &str) -> bool {
    if email.is_empty() || email.len() > MAX_ADDRESS_LENGTH {
        return false;
    }

    let (local, domain) = match email.split_once('@') {
        Some(parts) => parts,
        None => return false,
    };

    if local.is_empty()
        || local.len() > MAX_LOCAL_PART_LENGTH
        || local.starts_with('.')
        || local.ends_with('.')
        || local.contains("..")
        || !local.chars().all(is_atext_or_dot)
    {
        return false;
    }

    if let Some(literal) = domain
        .strip_prefix('[')
        .and_then(|domain| domain.strip_suffix(']'))
    {
        !literal.is_empty()
            && literal
                .chars()
                .all(|ch| ch.is_ascii_hexdigit() || matches!(ch, '.' | ':'))
    } else {
        !domain.is_empty()
            && domain.split('.').all(|label| {
                !label.is_empty()
                    && !label.starts_with('-')
                    && !label.ends_with('-')
                    && label
                        .chars()
                        .all(|ch| ch.is_alphanumeric() || ch == '-')
            })
    }
}

fn is_atext_or_dot(ch: char) -> bool {
    ch.is_alphanumeric()
        || matches!(
            ch,
            '.' | '!'
                | '#'
                | '$'
                | '%'
                | '&'
                | '\''
                | '*'
                | '+'
                | '-'
                | '/'
                | '='
                | '?'
                | '^'
                | '_'
                | '`'
                | '{'
                | '|'
                | '}'
                | '~'
        )
}

impl TryFrom<&str> for EmailAddress {
    type Error = crate::Error;

    fn try_from(address: &str) -> crate::Result<Self> {
        EmailAddress::parse(address)
    }
}

impl TryFrom<(&str, &str)> for EmailAddress {
    type Error = crate::Error;

    fn try_from((name, email): (&str, &str)) -> crate::Result<Self> {
        EmailAddress::with_name(email, name)
    }
}

impl Display for EmailAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.name {
            Some(name) => write!(f, "\"{}\" <{}>", name.replace('"', "\\\""), self.email),
            None => f.write_str(&self.email),
        }
    }
}

#[cfg(test)]
mod test {
    use super::{parse_list, EmailAddress};

    #[test]
    fn parse_addresses() {
        for (input, email, name) in [
            ("ab@bc.com", "ab@bc.com", None),
            ("  a.b@c.org ", "a.b@c.org", None),
            (
                "alkjshdfkjsdhf@skjdhfksjdhf.com.bd",
                "alkjshdfkjsdhf@skjdhfksjdhf.com.bd",
                None,
            ),
            ("John Doe <john@example.com>", "john@example.com", Some("John Doe")),
            (
                "\"Doe, John\" <john@example.com>",
                "john@example.com",
                Some("Doe, John"),
            ),
            ("<john@example.com>", "john@example.com", None),
            ("user+tag@[192.168.0.1]", "user+tag@[192.168.0.1]", None),
        ] {
            let address = EmailAddress::parse(input).unwrap();
            assert_eq!(address.email(), email, "{input}");
            assert_eq!(address.name(), name, "{input}");
        }
    }

    #[test]
    fn reject_malformed_addresses() {
        for input in [
            "",
            "ab",
            "ab@",
            "@bc.com",
            "ab@@bc.com",
            "a b@bc.com",
            "ab@bc..com",
            ".ab@bc.com",
            "ab.@bc.com",
            "ab@-bc.com",
            "John <john@example.com",
            "john@example.com>",
        ] {
            assert!(
                matches!(
                    EmailAddress::parse(input),
                    Err(crate::Error::InvalidAddress(_))
                ),
                "{input}"
            );
        }
    }

    #[test]
    fn display_name() {
        let address = EmailAddress::with_name("ab@bc.com", "name").unwrap();
        assert_eq!(address.name(), Some("name"));
        assert_eq!(address.to_string(), "\"name\" <ab@bc.com>");

        let address = EmailAddress::with_name("ab@bc.com", "").unwrap();
        assert_eq!(address.name(), None);
        assert_eq!(address.to_string(), "ab@bc.com");
    }

    #[test]
    fn parse_address_lists() {
        assert_eq!(
            parse_list(["ab@bc.com", "a.b@c.org"])
                .unwrap()
                .iter()
                .map(|a| a.email())
                .collect::<Vec<_>>(),
            vec!["ab@bc.com", "a.b@c.org"]
        );
        assert!(matches!(
            parse_list(Vec::<&str>::new()),
            Err(crate::Error::InvalidAddressList)
        ));
        assert!(matches!(
            parse_list(["ab@bc.com", "not an address"]),
            Err(crate::Error::InvalidAddressList)
        ));
    }
}
