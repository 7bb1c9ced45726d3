//! Path exclusion rules.
//!
//! Each rule is a regular expression searched anywhere in a full object key
//! or common prefix (prefixes carry their trailing `/`). Rules are evaluated
//! in configured order and the first match wins.

use crate::ArchiveError;
use crate::Result;
use regex::Regex;

/// A single compiled exclusion pattern.
#[derive(Debug, Clone)]
pub struct ExclusionRule {
    pattern: String,
    compiled: Regex,
}

impl ExclusionRule {
    /// Compiles a rule from a regular expression.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::InvalidPattern`] if the pattern does not
    /// compile.
    pub fn new(pattern: &str) -> Result<Self> {
        let compiled = Regex::new(pattern).map_err(|source| ArchiveError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;

        Ok(Self {
            pattern: pattern.to_string(),
            compiled,
        })
    }

    /// Returns the original pattern string.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Returns `true` if the pattern matches anywhere in `path`.
    pub fn matches(&self, path: &str) -> bool {
        self.compiled.is_match(path)
    }
}

/// Ordered set of exclusion rules.
///
/// # Examples
///
/// ```
/// use s3zip_core::ExclusionMatcher;
///
/// let matcher = ExclusionMatcher::new(&[r"^a/".to_string(), r"\.log$".to_string()])?;
///
/// assert!(matcher.is_excluded("a/1.txt"));
/// assert!(matcher.is_excluded("a/"));
/// assert!(matcher.is_excluded("b/debug.log"));
/// assert!(!matcher.is_excluded("b/3.txt"));
/// # Ok::<(), s3zip_core::ArchiveError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct ExclusionMatcher {
    rules: Vec<ExclusionRule>,
}

impl ExclusionMatcher {
    /// Compiles every pattern, preserving order and duplicates.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::InvalidPattern`] for the first pattern that
    /// does not compile.
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let rules = patterns
            .iter()
            .map(|p| ExclusionRule::new(p.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rules })
    }

    /// Returns `true` if any rule matches `path`.
    pub fn is_excluded(&self, path: &str) -> bool {
        self.first_match(path).is_some()
    }

    /// Returns the index and rule of the first rule matching `path`.
    ///
    /// # Examples
    ///
    /// ```
    /// use s3zip_core::ExclusionMatcher;
    ///
    /// let matcher = ExclusionMatcher::new(&["secret", "^docs/"])?;
    /// let (index, rule) = matcher.first_match("docs/secret.txt").unwrap();
    /// assert_eq!(index, 0);
    /// assert_eq!(rule.pattern(), "secret");
    /// # Ok::<(), s3zip_core::ArchiveError>(())
    /// ```
    pub fn first_match(&self, path: &str) -> Option<(usize, &ExclusionRule)> {
        self.rules
            .iter()
            .enumerate()
            .find(|(_, rule)| rule.matches(path))
    }

    /// Returns the rules in evaluation order.
    pub fn rules(&self) -> &[ExclusionRule] {
        &self.rules
    }

    /// Returns the number of rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns `true` if there are no rules.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_matcher_excludes_nothing() {
        let matcher = ExclusionMatcher::default();
        assert!(matcher.is_empty());
        assert!(!matcher.is_excluded(""));
        assert!(!matcher.is_excluded("a/1.txt"));
    }

    #[test]
    fn test_unanchored_search() {
        let matcher = ExclusionMatcher::new(&["tmp"]).unwrap();
        assert!(matcher.is_excluded("tmp/file"));
        assert!(matcher.is_excluded("a/tmp/file"));
        assert!(matcher.is_excluded("a/file.tmp"));
        assert!(!matcher.is_excluded("a/file.txt"));
    }

    #[test]
    fn test_anchored_prefix_rule() {
        let matcher = ExclusionMatcher::new(&["^a/"]).unwrap();
        assert!(matcher.is_excluded("a/"));
        assert!(matcher.is_excluded("a/1.txt"));
        assert!(!matcher.is_excluded("b/a/1.txt"));
    }

    #[test]
    fn test_prefix_rule_matches_trailing_delimiter() {
        let matcher = ExclusionMatcher::new(&["/cache/$"]).unwrap();
        assert!(matcher.is_excluded("build/cache/"));
        assert!(!matcher.is_excluded("build/cache/item"));
    }

    #[test]
    fn test_first_match_wins() {
        let matcher = ExclusionMatcher::new(&[r"\.txt$", "^a/"]).unwrap();
        let (index, rule) = matcher.first_match("a/1.txt").unwrap();
        assert_eq!(index, 0);
        assert_eq!(rule.pattern(), r"\.txt$");

        let reordered = ExclusionMatcher::new(&["^a/", r"\.txt$"]).unwrap();
        let (index, rule) = reordered.first_match("a/1.txt").unwrap();
        assert_eq!(index, 0);
        assert_eq!(rule.pattern(), "^a/");
    }

    #[test]
    fn test_duplicates_are_kept() {
        let matcher = ExclusionMatcher::new(&["x", "x", "y"]).unwrap();
        assert_eq!(matcher.len(), 3);
        let patterns: Vec<_> = matcher.rules().iter().map(ExclusionRule::pattern).collect();
        assert_eq!(patterns, vec!["x", "x", "y"]);
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        let err = ExclusionMatcher::new(&["ok", "(unclosed"]).unwrap_err();
        assert!(matches!(err, ArchiveError::InvalidPattern { ref pattern, .. } if pattern == "(unclosed"));
    }

    #[test]
    fn test_no_match_returns_none() {
        let matcher = ExclusionMatcher::new(&["^logs/"]).unwrap();
        assert!(matcher.first_match("data/logs/x").is_none());
    }
}
