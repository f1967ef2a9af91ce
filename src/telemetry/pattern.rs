//! Event matching.
//!
//! Compiles subject patterns into glob or regex matchers and tests events
//! against them. A bare pattern is a glob (`"spear*"`); a `regex:` prefix
//! selects a regular expression. Patterns are compiled once, when the rubric
//! is parsed.

use serde::{Deserialize, Serialize};

use super::event::{EventKind, GameEvent, canonical_name};

/// Compiled subject pattern.
///
/// Serializes back to the pattern text it was compiled from; equality
/// compares that text.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SubjectMatcher {
    source: String,
    compiled: CompiledSubject,
}

#[derive(Debug, Clone)]
enum CompiledSubject {
    Glob(glob::Pattern),
    Regex(regex::Regex),
}

impl SubjectMatcher {
    /// Compiles a subject pattern.
    ///
    /// Glob patterns are canonicalized like event subjects, so `"Town Center"`
    /// matches `town_center`. Regex patterns are used verbatim and
    /// size-limited.
    ///
    /// # Errors
    ///
    /// Returns a description of the problem if the pattern does not compile.
    pub fn parse(pattern: &str) -> Result<Self, String> {
        let compiled = if let Some(regex_str) = pattern.strip_prefix("regex:") {
            let re = regex::RegexBuilder::new(regex_str)
                .size_limit(1 << 20)
                .build()
                .map_err(|e| format!("invalid regex '{regex_str}': {e}"))?;
            CompiledSubject::Regex(re)
        } else {
            let canonical = canonical_glob(pattern);
            let pat = glob::Pattern::new(&canonical)
                .map_err(|e| format!("invalid glob pattern '{pattern}': {e}"))?;
            CompiledSubject::Glob(pat)
        };
        Ok(Self {
            source: pattern.to_string(),
            compiled,
        })
    }

    /// Tests a canonical subject against the pattern.
    #[must_use]
    pub fn matches(&self, subject: &str) -> bool {
        match &self.compiled {
            CompiledSubject::Glob(pat) => pat.matches(subject),
            CompiledSubject::Regex(re) => re.is_match(subject),
        }
    }

    /// Returns the pattern text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl PartialEq for SubjectMatcher {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl TryFrom<String> for SubjectMatcher {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<SubjectMatcher> for String {
    fn from(matcher: SubjectMatcher) -> Self {
        matcher.source
    }
}

/// Canonicalizes a glob pattern segment-wise, keeping wildcard characters.
fn canonical_glob(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    let mut word = String::new();
    for c in pattern.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '!') {
            if !word.is_empty() {
                out.push_str(&canonical_name(&word));
                word.clear();
            }
            out.push(c);
        } else {
            word.push(c);
        }
    }
    if !word.is_empty() {
        out.push_str(&canonical_name(&word));
    }
    out
}

/// Matches events by kind and optional subject, requiring a minimum count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventMatcher {
    /// Event kind to match
    #[serde(rename = "type")]
    pub kind: EventKind,

    /// Subject pattern; absent matches any subject
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<SubjectMatcher>,

    /// Minimum number of matching events
    #[serde(default = "default_count")]
    pub count: u32,
}

const fn default_count() -> u32 {
    1
}

impl EventMatcher {
    /// Creates a matcher for a kind with any subject.
    #[must_use]
    pub const fn new(kind: EventKind) -> Self {
        Self {
            kind,
            subject: None,
            count: 1,
        }
    }

    /// Tests a single event.
    #[must_use]
    pub fn matches(&self, event: &GameEvent) -> bool {
        if event.kind != self.kind {
            return false;
        }
        match (&self.subject, event.subject.as_deref()) {
            (None, _) => true,
            (Some(pattern), Some(subject)) => pattern.matches(subject),
            (Some(_), None) => false,
        }
    }

    /// Counts matching events in a slice.
    #[must_use]
    pub fn count_in(&self, events: &[GameEvent]) -> usize {
        events.iter().filter(|e| self.matches(e)).count()
    }

    /// Returns `true` if the slice holds at least `count` matching events.
    #[must_use]
    pub fn satisfied_by(&self, events: &[GameEvent]) -> bool {
        self.count_in(events) >= self.count as usize
    }

    /// Short human-readable description (`"3x unit_produced spear*"`).
    #[must_use]
    pub fn describe(&self) -> String {
        let subject = self
            .subject
            .as_ref()
            .map_or_else(String::new, |s| format!(" {}", s.as_str()));
        format!("{}x {}{subject}", self.count, self.kind)
    }
}

// ============================================================================
// Tests
// ============================================================================
