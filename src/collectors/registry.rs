//! Endpoint descriptors and the `^`-delimited auth string they are parsed from.
//!
//! A record looks like `url=postgresql://db1:5432/app,user=monitor,pswd=secret`.
//! Each value runs up to the next marker minus one separator character; the
//! secret runs to the end of the record. A `^` inside a value is not supported.

use crate::collectors::error::ConfigError;
use secrecy::{ExposeSecret, SecretString};
use std::{
    fmt,
    hash::{Hash, Hasher},
};
use url::Url;

pub const RECORD_DELIMITER: char = '^';
pub const ADDRESS_MARKER: &str = "url=";
pub const USERNAME_MARKER: &str = "user=";
pub const SECRET_MARKER: &str = "pswd=";

/// Connection descriptor for one monitored database instance.
///
/// Equality and hashing cover all three fields, secret included, so two
/// records that differ only by password are distinct pool keys.
#[derive(Debug)]
pub struct EndpointConfig {
    address: String,
    username: String,
    secret: SecretString,
}

impl EndpointConfig {
    pub fn new(
        address: impl Into<String>,
        username: impl Into<String>,
        secret: impl Into<String>,
    ) -> Self {
        Self {
            address: address.into(),
            username: username.into(),
            secret: SecretString::from(secret.into()),
        }
    }

    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    #[must_use]
    pub const fn secret(&self) -> &SecretString {
        &self.secret
    }

    /// Address with any embedded user info removed, safe for logs and tags.
    #[must_use]
    pub fn display_address(&self) -> String {
        match Url::parse(&self.address) {
            Ok(mut url) => {
                let _ = url.set_username("");
                let _ = url.set_password(None);
                url.to_string()
            }
            Err(_) => self.address.clone(),
        }
    }
}

impl Clone for EndpointConfig {
    fn clone(&self) -> Self {
        Self::new(
            self.address.clone(),
            self.username.clone(),
            self.secret.expose_secret(),
        )
    }
}

impl PartialEq for EndpointConfig {
    fn eq(&self, other: &Self) -> bool {
        self.address == other.address
            && self.username == other.username
            && self.secret.expose_secret() == other.secret.expose_secret()
    }
}

impl Eq for EndpointConfig {}

impl Hash for EndpointConfig {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.address.hash(state);
        self.username.hash(state);
        self.secret.expose_secret().hash(state);
    }
}

impl fmt::Display for EndpointConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.username, self.display_address())
    }
}

/// Ordered list of endpoints, built once at initialization.
#[derive(Clone, Debug, Default)]
pub struct ConnectionRegistry {
    endpoints: Vec<EndpointConfig>,
}

impl ConnectionRegistry {
    /// Parse the auth string into endpoints, keeping input order.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for the first non-empty record that is malformed.
    pub fn parse(config: &str) -> Result<Self, ConfigError> {
        let endpoints = config
            .split(RECORD_DELIMITER)
            .enumerate()
            .map(|(i, record)| (i + 1, record.trim()))
            .filter(|(_, record)| !record.is_empty())
            .map(|(index, record)| parse_record(index, record))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { endpoints })
    }

    #[must_use]
    pub fn endpoints(&self) -> &[EndpointConfig] {
        &self.endpoints
    }

    pub fn iter(&self) -> std::slice::Iter<'_, EndpointConfig> {
        self.endpoints.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}

impl From<Vec<EndpointConfig>> for ConnectionRegistry {
    fn from(endpoints: Vec<EndpointConfig>) -> Self {
        Self { endpoints }
    }
}

impl<'a> IntoIterator for &'a ConnectionRegistry {
    type Item = &'a EndpointConfig;
    type IntoIter = std::slice::Iter<'a, EndpointConfig>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

fn parse_record(index: usize, record: &str) -> Result<EndpointConfig, ConfigError> {
    let address_at = locate(index, record, 0, ADDRESS_MARKER, None)?;
    let address_start = address_at + ADDRESS_MARKER.len();

    let username_at = locate(
        index,
        record,
        address_start,
        USERNAME_MARKER,
        Some(ADDRESS_MARKER),
    )?;
    let username_start = username_at + USERNAME_MARKER.len();

    let secret_at = locate(
        index,
        record,
        username_start,
        SECRET_MARKER,
        Some(USERNAME_MARKER),
    )?;
    let secret_start = secret_at + SECRET_MARKER.len();

    let address = field(index, record, address_start, username_at, USERNAME_MARKER)?;
    let username = field(index, record, username_start, secret_at, SECRET_MARKER)?;
    let secret = record.get(secret_start..).unwrap_or_default();

    if address.is_empty() {
        return Err(ConfigError::EmptyAddress { record: index });
    }

    Ok(EndpointConfig::new(address, username, secret))
}

// Byte offset of `marker` at or after `from`.
fn locate(
    index: usize,
    record: &str,
    from: usize,
    marker: &'static str,
    after: Option<&'static str>,
) -> Result<usize, ConfigError> {
    if let Some(pos) = record.get(from..).and_then(|rest| rest.find(marker)) {
        return Ok(from + pos);
    }

    match after {
        Some(after) if record.contains(marker) => Err(ConfigError::MarkerOutOfOrder {
            record: index,
            marker,
            after,
        }),
        _ => Err(ConfigError::MissingMarker {
            record: index,
            marker,
        }),
    }
}

// Text in `start..end` without its trailing separator.
fn field<'a>(
    index: usize,
    record: &'a str,
    start: usize,
    end: usize,
    next_marker: &'static str,
) -> Result<&'a str, ConfigError> {
    let mut chars = record.get(start..end).unwrap_or_default().chars();

    if chars.next_back().is_none() {
        return Err(ConfigError::MissingSeparator {
            record: index,
            marker: next_marker,
        });
    }

    Ok(chars.as_str())
}
