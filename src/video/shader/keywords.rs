//! Shader keywords, the switches selecting a compiled variant of a shader.

use std::collections::BTreeSet;

use crate::utils::hash;

/// Normalizes a keyword: whitespaces and semicolons are stripped and letters
/// are upper-cased. Returns `None` if nothing is left, or if the rest is not
/// a valid preprocessor identifier.
///
/// Keywords only contain `[A-Z0-9_]`, so the `-` separated variant keys can
/// not alias.
pub fn normalize(keyword: &str) -> Option<String> {
    let v: String = keyword
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ';')
        .map(|c| c.to_ascii_uppercase())
        .collect();

    let valid = v.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    match v.chars().next() {
        None => None,
        Some(c) if c.is_ascii_digit() || !valid => {
            warn!("Keyword '{}' is not a valid identifier, ignored.", keyword);
            None
        }
        Some(_) => Some(v),
    }
}

/// A sorted set of normalized keywords.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash)]
pub struct KeywordSet {
    keywords: BTreeSet<String>,
}

impl KeywordSet {
    pub fn new() -> Self {
        KeywordSet::default()
    }

    /// Adds a keyword, returns true if the set changed.
    pub fn enable(&mut self, keyword: &str) -> bool {
        match normalize(keyword) {
            Some(v) => self.keywords.insert(v),
            None => false,
        }
    }

    /// Removes a keyword, returns true if the set changed.
    pub fn disable(&mut self, keyword: &str) -> bool {
        match normalize(keyword) {
            Some(v) => self.keywords.remove(&v),
            None => false,
        }
    }

    pub fn contains(&self, keyword: &str) -> bool {
        normalize(keyword).map_or(false, |v| self.keywords.contains(&v))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.keywords.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    pub fn clear(&mut self) {
        self.keywords.clear();
    }

    /// Iterates the keywords in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.keywords.iter().map(|v| v.as_str())
    }

    /// A hash of the content, equal sets have equal hashes.
    pub fn hash_value(&self) -> u64 {
        hash::hash64(&self.keywords)
    }

    /// The keywords joined into a deterministic string.
    pub fn join(&self) -> String {
        let mut v = String::new();
        for (i, keyword) in self.keywords.iter().enumerate() {
            if i > 0 {
                v.push(';');
            }

            v.push_str(keyword);
        }

        v
    }
}

impl<'a> Extend<&'a str> for KeywordSet {
    fn extend<T: IntoIterator<Item = &'a str>>(&mut self, iter: T) {
        for v in iter {
            self.enable(v);
        }
    }
}

/// The engine-wide keywords. Every change bumps `version`, so materials can
/// tell whether their resolved variants are still current.
#[derive(Debug, Default, Clone)]
pub struct GlobalKeywords {
    keywords: KeywordSet,
    version: u64,
}

impl GlobalKeywords {
    pub fn new() -> Self {
        GlobalKeywords::default()
    }

    pub fn enable(&mut self, keyword: &str) {
        if self.keywords.enable(keyword) {
            self.version += 1;
        }
    }

    pub fn disable(&mut self, keyword: &str) {
        if self.keywords.disable(keyword) {
            self.version += 1;
        }
    }

    #[inline]
    pub fn contains(&self, keyword: &str) -> bool {
        self.keywords.contains(keyword)
    }

    #[inline]
    pub fn keywords(&self) -> &KeywordSet {
        &self.keywords
    }

    #[inline]
    pub fn version(&self) -> u64 {
        self.version
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn normalization() {
        assert_eq!(normalize(" use_fog; "), Some("USE_FOG".to_owned()));
        assert_eq!(normalize(" ; "), None);
        assert_eq!(normalize("A-B"), None);
        assert_eq!(normalize("2D"), None);
        assert_eq!(normalize("_srgb2"), Some("_SRGB2".to_owned()));

        let mut set = KeywordSet::new();
        assert!(set.enable("shadows"));
        assert!(!set.enable("SHADOWS;"));
        assert!(set.enable("ALPHA_TEST"));
        assert!(set.contains("Shadows"));
        assert_eq!(set.join(), "ALPHA_TEST;SHADOWS");

        let mut other = KeywordSet::new();
        other.extend(vec!["shadows", "alpha_test"]);
        assert_eq!(set.hash_value(), other.hash_value());

        assert!(set.disable("alpha_test"));
        assert!(!set.disable("alpha_test"));
        assert_ne!(set.hash_value(), other.hash_value());
    }

    #[test]
    fn global_version() {
        let mut globals = GlobalKeywords::new();
        globals.enable("FOG");
        globals.enable("fog");
        assert_eq!(globals.version(), 1);

        globals.disable("RAIN");
        assert_eq!(globals.version(), 1);

        globals.disable("FOG");
        assert_eq!(globals.version(), 2);
        assert!(globals.keywords().is_empty());
    }
}
