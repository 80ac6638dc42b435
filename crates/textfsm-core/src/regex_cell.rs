use std::fmt;

use fancy_regex::{Captures, Regex};

/// A compiled regex paired with its source pattern.
///
/// Rule regexes and index cells get duplicated whenever a compiled template
/// or an index table is cloned; keeping the source text alongside the
/// compiled program lets clones share the program while still being able to
/// re-serialize the original pattern.
#[derive(Debug, Clone)]
pub struct RegexCell {
    pattern: String,
    regex: Regex,
}

impl RegexCell {
    pub fn new(pattern: impl Into<String>) -> Result<Self, fancy_regex::Error> {
        let pattern = pattern.into();
        let regex = Regex::new(&pattern)?;
        Ok(RegexCell { pattern, regex })
    }

    /// The source pattern this cell was compiled from.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    /// Matches anchored at the start of `text`, reporting engine failures.
    ///
    /// The leftmost match of a pattern is found before any later one, so a
    /// successful match that does not begin at offset zero means no match
    /// at offset zero exists.
    pub fn try_match_start<'t>(
        &self,
        text: &'t str,
    ) -> Result<Option<Captures<'t>>, fancy_regex::Error> {
        match self.regex.captures(text)? {
            Some(caps) if caps.get(0).is_some_and(|m| m.start() == 0) => Ok(Some(caps)),
            _ => Ok(None),
        }
    }

    /// Matches anchored at the start of `text`; engine failures count as
    /// a non-match.
    pub fn match_start<'t>(&self, text: &'t str) -> Option<Captures<'t>> {
        self.try_match_start(text).ok().flatten()
    }

    pub fn matches_start(&self, text: &str) -> bool {
        self.match_start(text).is_some()
    }
}

impl fmt::Display for RegexCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pattern)
    }
}

#[cfg(test)]
mod tests {
    use super::RegexCell;

    #[test]
    fn clones_share_the_pattern() {
        let cell = RegexCell::new(r"^ab(c)?").unwrap();
        let copy = cell.clone();
        assert_eq!(cell.pattern(), copy.pattern());
        assert!(copy.matches_start("ab"));
        assert!(copy.matches_start("abc"));
    }

    #[test]
    fn match_is_anchored_at_the_start() {
        let cell = RegexCell::new("bc").unwrap();
        assert!(!cell.matches_start("abc"));
        assert!(cell.matches_start("bcd"));
    }

    #[test]
    fn named_groups_are_captured() {
        let cell = RegexCell::new(r"(?P<word>\w+)").unwrap();
        let caps = cell.match_start("hello world").unwrap();
        assert_eq!(caps.name("word").unwrap().as_str(), "hello");
    }
}
