//! Key canonicalization shared by merging, resolution and lookups.

use std::borrow::Cow;

/// Canonicalizes property keys according to the configured case policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyNormalizer {
    /// Keys are compared exactly as written.
    #[default]
    CaseSensitive,
    /// Keys are lower-cased before any comparison.
    CaseInsensitive,
}

impl KeyNormalizer {
    pub fn new(case_sensitive: bool) -> Self {
        if case_sensitive {
            Self::CaseSensitive
        } else {
            Self::CaseInsensitive
        }
    }

    pub fn is_case_sensitive(self) -> bool {
        matches!(self, Self::CaseSensitive)
    }

    /// Returns the canonical form of `key`, borrowing when nothing changes.
    pub fn normalize(self, key: &str) -> Cow<'_, str> {
        match self {
            Self::CaseSensitive => Cow::Borrowed(key),
            Self::CaseInsensitive if key.chars().any(char::is_uppercase) => {
                Cow::Owned(key.to_lowercase())
            }
            Self::CaseInsensitive => Cow::Borrowed(key),
        }
    }
}
