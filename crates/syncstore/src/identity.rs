use crate::error::{Result, StoreError};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Bytes that may not appear in a single path component.
const DIR_NAME_SET: &AsciiSet = &CONTROLS.add(b'/').add(b'\\').add(b'%');

/// Session credentials handed over by the account layer.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub device_id: Option<String>,
    #[serde(default)]
    pub homeserver: Option<String>,
}

impl Credentials {
    pub fn for_user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            ..Self::default()
        }
    }
}

/// Stable, non-empty key for one user's persisted snapshot.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct StoreIdentity(String);

impl StoreIdentity {
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.is_empty() {
            return Err(StoreError::EmptyIdentity);
        }
        if id.contains('\0') {
            return Err(StoreError::InvalidIdentity(id.replace('\0', "\\0")));
        }
        Ok(Self(id))
    }

    /// Derive the identity from session credentials (their user id).
    pub fn from_credentials(credentials: &Credentials) -> Result<Self> {
        match credentials.user_id.as_deref() {
            Some(user_id) if !user_id.is_empty() => Self::new(user_id),
            _ => Err(StoreError::MissingUserId),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// A single path component for this identity.
    ///
    /// Separators, `%`, control characters and non-ASCII bytes are
    /// percent-encoded and the names `.`/`..` are encoded whole, so the
    /// result never leaves its parent folder. Plain ids like `@alice:example.org` map to themselves.
    pub fn dir_name(&self) -> String {
        if self.0 == "." || self.0 == ".." {
            return self.0.replace('.', "%2E");
        }

        utf8_percent_encode(&self.0, DIR_NAME_SET).to_string()
    }
}

impl fmt::Display for StoreIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_identity_rejected() {
        assert!(matches!(StoreIdentity::new(""), Err(StoreError::EmptyIdentity)));
    }

    #[test]
    fn test_nul_identity_rejected() {
        assert!(matches!(
            StoreIdentity::new("a\0b"),
            Err(StoreError::InvalidIdentity(_))
        ));
    }

    #[test]
    fn test_from_credentials_requires_user_id() {
        assert!(matches!(
            StoreIdentity::from_credentials(&Credentials::default()),
            Err(StoreError::MissingUserId)
        ));
        assert!(matches!(
            StoreIdentity::from_credentials(&Credentials::for_user("")),
            Err(StoreError::MissingUserId)
        ));

        let id = StoreIdentity::from_credentials(&Credentials::for_user("@bob:example.org")).unwrap();
        assert_eq!(id.as_str(), "@bob:example.org");
    }

    #[test]
    fn test_matrix_id_dir_name_is_unchanged() {
        let id = StoreIdentity::new("@alice:example.org").unwrap();
        assert_eq!(id.dir_name(), "@alice:example.org");
    }

    #[test]
    fn test_separators_are_encoded() {
        let id = StoreIdentity::new("../etc/passwd").unwrap();
        assert_eq!(id.dir_name(), "..%2Fetc%2Fpasswd");

        let id = StoreIdentity::new("a\\b%c").unwrap();
        assert_eq!(id.dir_name(), "a%5Cb%25c");
    }

    #[test]
    fn test_control_characters_are_encoded() {
        let id = StoreIdentity::new("tab\there\x7f").unwrap();
        assert_eq!(id.dir_name(), "tab%09here%7F");
    }

    #[test]
    fn test_dot_names_are_encoded() {
        assert_eq!(StoreIdentity::new(".").unwrap().dir_name(), "%2E");
        assert_eq!(StoreIdentity::new("..").unwrap().dir_name(), "%2E%2E");
    }

    #[test]
    fn test_dir_name_is_deterministic() {
        let a = StoreIdentity::new("@x/y:z").unwrap();
        let b = StoreIdentity::new("@x/y:z").unwrap();
        assert_eq!(a.dir_name(), b.dir_name());
    }
}
