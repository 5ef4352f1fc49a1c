//! Secret detection and redaction utilities.
//!
//! Device credentials travel through config, logs, and error metadata. These
//! helpers keep the password out of every rendered form.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// The redacted placeholder string.
pub const REDACTED: &str = "[REDACTED]";

const SECRET_MARKERS: &[&str] = &[
    "PASSWORD",
    "PASSWD",
    "SECRET",
    "TOKEN",
    "CREDENTIAL",
    "APIKEY",
    "PRIVATEKEY",
    "AUTH",
];

/// Checks if a key/variable name likely refers to a secret.
///
/// Matching ignores case and `_`/`-` separators. Plain `key` is not a marker,
/// so names such as `resultKey` stay visible in logs.
///
/// # Examples
///
/// ```
/// use fritzbox_shared::is_secret_key;
///
/// assert!(is_secret_key("FRITZBOX_PASSWORD"));
/// assert!(is_secret_key("api_key"));
/// assert!(!is_secret_key("resultKey"));
/// assert!(!is_secret_key("FRITZBOX_HOST"));
/// ```
pub fn is_secret_key(key: &str) -> bool {
    let normalized: String = key
        .chars()
        .filter(|ch| *ch != '_' && *ch != '-')
        .map(|ch| ch.to_ascii_uppercase())
        .collect();
    SECRET_MARKERS
        .iter()
        .any(|marker| normalized.contains(marker))
}

/// Redacts a value if the key is likely a secret.
///
/// # Examples
///
/// ```
/// use fritzbox_shared::redact_if_secret;
///
/// assert_eq!(redact_if_secret("password", "hunter2"), "[REDACTED]");
/// assert_eq!(redact_if_secret("host", "fritz.box"), "fritz.box");
/// ```
pub fn redact_if_secret(key: &str, value: &str) -> String {
    if is_secret_key(key) {
        REDACTED.to_string()
    } else {
        value.to_string()
    }
}

/// A secret string wrapper that redacts on Display/Debug/Serialize.
///
/// Deserialization accepts the plain value so config files can carry it.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct SecretString(Box<str>);

impl SecretString {
    /// Wrap a secret value.
    pub fn new(value: impl Into<Box<str>>) -> Self {
        Self(value.into())
    }

    /// Borrow the underlying secret.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Returns true when no secret was provided.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for SecretString {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(REDACTED)
    }
}

impl std::fmt::Display for SecretString {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(REDACTED)
    }
}

impl From<&str> for SecretString {
    fn from(value: &str) -> Self {
        Self(value.into())
    }
}

impl From<String> for SecretString {
    fn from(value: String) -> Self {
        Self(value.into_boxed_str())
    }
}

impl Serialize for SecretString {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.0.is_empty() {
            serializer.serialize_str("")
        } else {
            serializer.serialize_str(REDACTED)
        }
    }
}

impl<'de> Deserialize<'de> for SecretString {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::from)
    }
}
