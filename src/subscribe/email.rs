use derive_more::Deref;
use lazy_regex::regex_is_match;
use serde::Serialize;
use unicode_segmentation::UnicodeSegmentation;

/// A normalized (trimmed, lowercased) and validated subscriber email.
/// This is the uniqueness key of a subscription.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deref, Serialize)]
#[serde(transparent)]
pub struct ValidEmail(String);

impl AsRef<str> for ValidEmail {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ValidEmail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl ValidEmail {
    pub const MAX_GRAPHEMES: usize = 256;

    /// Normalizes `value` and checks it against the address pattern.
    pub fn parse<S>(value: S) -> Result<Self, EmailError>
    where
        S: AsRef<str>,
    {
        let normalized = value.as_ref().trim().to_lowercase();

        if normalized.is_empty() {
            return Err(EmailError::Missing);
        }

        if normalized.graphemes(true).count() > Self::MAX_GRAPHEMES {
            return Err(EmailError::TooLong);
        }

        if regex_is_match!(
            r"^[a-z0-9_]+([.-]?[a-z0-9_]+)*@[a-z0-9_]+([.-]?[a-z0-9_]+)*(\.[a-z0-9_]{2,3})+$",
            &normalized
        ) {
            Ok(ValidEmail(normalized))
        } else {
            Err(EmailError::Invalid(normalized))
        }
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

/// Used when decoding stored rows.
impl TryFrom<String> for ValidEmail {
    type Error = EmailError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        ValidEmail::parse(value)
    }
}

// ###################################
// ->  ERROR
// ###################################
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum EmailError {
    #[error("email is required")]
    Missing,
    #[error("email too long")]
    TooLong,
    #[error("email does not look like an address: {0}")]
    Invalid(String),
}
