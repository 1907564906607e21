//! URL slugs for products, categories, brands and blog posts.

use core::fmt;

use serde::{Deserialize, Serialize};

/// A URL-safe identifier derived from a title.
///
/// Slugs are lowercase ASCII letters and digits, Arabic letters
/// (U+0600..=U+06FF) and single dashes, never starting or ending with a dash.
///
/// ```
/// use skinior_core::Slug;
///
/// let slug = Slug::from_title("Vitamin C  Serum (30ml)!").unwrap();
/// assert_eq!(slug.as_str(), "vitamin-c-serum-30ml");
/// assert_eq!(slug.with_suffix(2).as_str(), "vitamin-c-serum-30ml-2");
/// assert!(Slug::from_title("!!!").is_none());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Slug(String);

const fn is_arabic(c: char) -> bool {
    matches!(c, '\u{0600}'..='\u{06FF}')
}

impl Slug {
    /// Build a slug from free text.
    ///
    /// Returns `None` when nothing slug-worthy remains (e.g. only punctuation).
    #[must_use]
    pub fn from_title(title: &str) -> Option<Self> {
        let mut out = String::with_capacity(title.len());
        for c in title.trim().chars().flat_map(char::to_lowercase) {
            if c.is_ascii_alphanumeric() || is_arabic(c) {
                out.push(c);
            } else if (c.is_whitespace() || c == '-') && !out.is_empty() && !out.ends_with('-') {
                out.push('-');
            }
        }
        while out.ends_with('-') {
            out.pop();
        }
        if out.is_empty() { None } else { Some(Self(out)) }
    }

    /// The slug with a numeric disambiguation suffix (`serum` -> `serum-2`).
    #[must_use]
    pub fn with_suffix(&self, n: u32) -> Self {
        Self(format!("{}-{n}", self.0))
    }

    /// Returns the slug as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the slug and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Slug {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_collapses_whitespace_and_dashes() {
        let slug = Slug::from_title("  Hydrating -- Face   Cream ").unwrap();
        assert_eq!(slug.as_str(), "hydrating-face-cream");
    }

    #[test]
    fn test_strips_punctuation_and_lowercases() {
        let slug = Slug::from_title("La Roche-Posay: Effaclar DUO+").unwrap();
        assert_eq!(slug.as_str(), "la-roche-posay-effaclar-duo");
    }

    #[test]
    fn test_keeps_arabic_letters() {
        let slug = Slug::from_title("روتين العناية بالبشرة").unwrap();
        assert_eq!(slug.as_str(), "روتين-العناية-بالبشرة");
    }

    #[test]
    fn test_empty_input() {
        assert!(Slug::from_title("").is_none());
        assert!(Slug::from_title("   ").is_none());
        assert!(Slug::from_title("***").is_none());
    }

    #[test]
    fn test_with_suffix() {
        let slug = Slug::from_title("Toner").unwrap();
        assert_eq!(slug.with_suffix(1).to_string(), "toner-1");
    }
}
