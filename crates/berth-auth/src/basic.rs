//! HTTP Basic credential parsing.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// Credentials carried in a Basic `Authorization` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicCredentials {
    /// Username half of the pair.
    pub username: String,
    /// The raw token secret sent as the password.
    pub secret: String,
}

/// Parses a `Basic <base64(user:secret)>` authorization header value.
///
/// Anything else (other schemes, bad base64, missing colon) yields `None`;
/// the caller answers 401 with a `WWW-Authenticate: Basic` challenge.
pub fn parse_basic_header(header: &str) -> Option<BasicCredentials> {
    let encoded = header.trim().strip_prefix("Basic ")?;
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let text = String::from_utf8(decoded).ok()?;
    let (username, secret) = text.split_once(':')?;
    if username.is_empty() {
        return None;
    }
    Some(BasicCredentials {
        username: username.to_string(),
        secret: secret.to_string(),
    })
}
