//! Content policy for shipment descriptions.
//!
//! The lifecycle service only sees the [`ContentPolicy`] trait. The keyword
//! denylist here is a stub; a moderation service can stand in for it
//! without touching the service.

use std::fmt;

/// Keywords rejected when no denylist is configured.
pub const DEFAULT_DENYLIST: [&str; 4] = ["bomb", "weapon", "drugs", "explosive"];

/// Why a description was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub keyword: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "description contains prohibited keyword '{}'", self.keyword)
    }
}

/// Screens free-text descriptions before anything is written.
pub trait ContentPolicy {
    /// Returns the violation, or `None` if the description is acceptable.
    fn screen(&self, description: &str) -> Option<Violation>;
}

/// Case-insensitive substring denylist.
///
/// Matching ignores word boundaries: "bombastic" trips "bomb".
#[derive(Debug, Clone)]
pub struct KeywordDenylist {
    keywords: Vec<String>,
}

impl KeywordDenylist {
    /// Builds a denylist, lowercasing keywords and dropping blank ones.
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keywords = keywords
            .into_iter()
            .map(|k| k.as_ref().trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        Self { keywords }
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }
}

impl Default for KeywordDenylist {
    fn default() -> Self {
        Self::new(DEFAULT_DENYLIST)
    }
}

impl ContentPolicy for KeywordDenylist {
    fn screen(&self, description: &str) -> Option<Violation> {
        let haystack = description.to_lowercase();
        self.keywords
            .iter()
            .find(|k| haystack.contains(k.as_str()))
            .map(|k| Violation { keyword: k.clone() })
    }
}
