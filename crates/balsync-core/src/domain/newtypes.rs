//! Domain newtypes with validation
//!
//! Strongly-typed wrappers for dataset identifiers and validated values.
//! Each newtype ensures data validity at construction time.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::errors::DomainError;

// ============================================================================
// UUID-based ID types
// ============================================================================

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            #[doc = concat!("Create a new random ", stringify!($name))]
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            #[doc = concat!("Create a ", stringify!($name), " from an existing UUID")]
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Get the inner UUID value
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self).map_err(|e| {
                    DomainError::InvalidId(format!("Invalid {}: {e}", stringify!($name)))
                })
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }
    };
}

uuid_id!(
    /// Identifier for BaseLocale datasets
    BaseLocaleId
);
uuid_id!(
    /// Identifier for Voie (street) records
    VoieId
);
uuid_id!(
    /// Identifier for Numero (house number) records
    NumeroId
);
uuid_id!(
    /// Identifier for Toponyme (named place) records
    ToponymeId
);

// ============================================================================
// Remote identifiers
// ============================================================================

/// Identifier of a habilitation issued by the deposit service
///
/// Opaque to this system; only emptiness is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HabilitationId(String);

impl HabilitationId {
    /// Create a new HabilitationId
    ///
    /// # Errors
    /// Returns error if the identifier is empty or contains whitespace
    pub fn new(id: impl Into<String>) -> Result<Self, DomainError> {
        let id = id.into();
        if id.is_empty() || id.chars().any(char::is_whitespace) {
            return Err(DomainError::InvalidId(format!(
                "Invalid habilitation id: '{id}'"
            )));
        }
        Ok(Self(id))
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for HabilitationId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for HabilitationId {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<HabilitationId> for String {
    fn from(id: HabilitationId) -> Self {
        id.0
    }
}

/// Identifier of a revision published on the deposit service
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RevisionId(String);

impl RevisionId {
    /// Create a new RevisionId
    ///
    /// # Errors
    /// Returns error if the identifier is empty
    pub fn new(id: impl Into<String>) -> Result<Self, DomainError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(DomainError::InvalidId(
                "Revision id cannot be empty".to_string(),
            ));
        }
        Ok(Self(id))
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for RevisionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for RevisionId {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<RevisionId> for String {
    fn from(id: RevisionId) -> Self {
        id.0
    }
}

// ============================================================================
// Commune code
// ============================================================================

/// INSEE code of a French commune
///
/// Five characters: digits, except for Corsica where the department
/// prefix is `2A` or `2B`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CodeCommune(String);

impl CodeCommune {
    /// Create a new validated CodeCommune
    ///
    /// # Errors
    /// Returns error if the code is not a valid INSEE code
    pub fn new(code: impl Into<String>) -> Result<Self, DomainError> {
        let code = code.into().to_uppercase();
        if code.len() != 5 {
            return Err(DomainError::InvalidCommune(code));
        }

        let (department, rest) = code.split_at(2);
        let department_ok = department.chars().all(|c| c.is_ascii_digit())
            || department == "2A"
            || department == "2B";
        if !department_ok || !rest.chars().all(|c| c.is_ascii_digit()) {
            return Err(DomainError::InvalidCommune(code));
        }

        Ok(Self(code))
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Department part of the code (`"2A"`, `"75"`, `"971"` for overseas)
    #[must_use]
    pub fn department(&self) -> &str {
        if self.0.starts_with("97") {
            &self.0[..3]
        } else {
            &self.0[..2]
        }
    }
}

impl Display for CodeCommune {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CodeCommune {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for CodeCommune {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CodeCommune> for String {
    fn from(code: CodeCommune) -> Self {
        code.0
    }
}

// ============================================================================
// Content hash
// ============================================================================

/// SHA-256 digest of an exported file, lowercase hex
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentHash(String);

impl ContentHash {
    const HEX_LEN: usize = 64;

    /// Create a ContentHash from an existing hex digest
    ///
    /// # Errors
    /// Returns error if the value is not 64 hex characters
    pub fn new(hash: impl Into<String>) -> Result<Self, DomainError> {
        let hash = hash.into().to_lowercase();
        if hash.len() != Self::HEX_LEN || !hash.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(DomainError::InvalidHash(hash));
        }
        Ok(Self(hash))
    }

    /// Compute the digest of a file content
    #[must_use]
    pub fn of(content: &[u8]) -> Self {
        Self(format!("{:x}", Sha256::digest(content)))
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ContentHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for ContentHash {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ContentHash> for String {
    fn from(hash: ContentHash) -> Self {
        hash.0
    }
}

// ============================================================================
// Email type
// ============================================================================

/// Validated email address
///
/// Basic structural validation only: exactly one `@`, a non-empty
/// local part and a dotted domain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    /// Create a new validated Email
    ///
    /// # Errors
    /// Returns error if the email format is invalid
    pub fn new(email: impl Into<String>) -> Result<Self, DomainError> {
        let email = email.into().trim().to_lowercase();

        let Some((local, domain)) = email.split_once('@') else {
            return Err(DomainError::InvalidEmail(email));
        };
        if local.is_empty() || local.len() > 64 || domain.contains('@') {
            return Err(DomainError::InvalidEmail(email));
        }
        if !local.chars().all(|c| c.is_alphanumeric() || ".+-_".contains(c)) {
            return Err(DomainError::InvalidEmail(email));
        }

        let labels_ok = domain
            .split('.')
            .all(|l| !l.is_empty() && !l.starts_with('-') && !l.ends_with('-'));
        if !domain.contains('.')
            || !labels_ok
            || !domain.chars().all(|c| c.is_alphanumeric() || ".-".contains(c))
        {
            return Err(DomainError::InvalidEmail(email));
        }

        Ok(Self(email))
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Email {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Email {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Email {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Email> for String {
    fn from(email: Email) -> Self {
        email.0
    }
}

// ============================================================================
// Tests
// ============================================================================
