//! Anchored glob matching for state-name patterns.
//!
//! A pattern addresses one or more states by name. The only metacharacter is
//! `*`, which matches zero or more arbitrary characters. Patterns are always
//! anchored at both ends: `"A*"` matches `"A"` and `"AB"` but not `"XA"`.

use std::fmt;

/// The multi-character wildcard marker.
pub const WILDCARD: char = '*';

/// Characters that may never appear in a concrete state name.
pub const RESERVED_CHARS: [char; 2] = [WILDCARD, ':'];

/// A compiled state-name pattern.
///
/// # Example
///
/// ```rust
/// use easyflow::core::StatePattern;
///
/// let pattern = StatePattern::new("A*");
/// assert!(pattern.matches("A"));
/// assert!(pattern.matches("AB"));
/// assert!(!pattern.matches("XA"));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatePattern {
    raw: String,
    segments: Vec<String>,
}

impl StatePattern {
    /// Compile a pattern. Text without `*` compiles to an exact match.
    pub fn new(pattern: &str) -> Self {
        Self {
            raw: pattern.to_string(),
            segments: pattern.split(WILDCARD).map(str::to_string).collect(),
        }
    }

    /// Whether `text` contains the wildcard marker.
    pub fn is_wildcard(text: &str) -> bool {
        text.contains(WILDCARD)
    }

    /// The first reserved character in `name`, if any.
    pub fn reserved_char(name: &str) -> Option<char> {
        name.chars().find(|c| RESERVED_CHARS.contains(c))
    }

    /// The pattern text as written.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Test a full state name against the pattern.
    pub fn matches(&self, name: &str) -> bool {
        let (first, rest) = match self.segments.split_first() {
            Some(split) => split,
            None => return name.is_empty(),
        };

        let Some((last, middle)) = rest.split_last() else {
            return name == first;
        };

        if !name.starts_with(first.as_str()) {
            return false;
        }

        let mut position = first.len();
        for segment in middle {
            match name[position..].find(segment.as_str()) {
                Some(offset) => position += offset + segment.len(),
                None => return false,
            }
        }

        let remainder = &name[position..];
        remainder.len() >= last.len() && remainder.ends_with(last.as_str())
    }
}

impl fmt::Display for StatePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
