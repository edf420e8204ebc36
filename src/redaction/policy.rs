use super::presets;
use super::wildcard_match;
use regex::Regex;
use std::collections::HashSet;
use std::time::Duration;
use thiserror::Error;

pub const MIN_DEPTH_LIMIT: usize = 1;
pub const MAX_DEPTH_LIMIT: usize = 100;
pub const DEFAULT_MAX_DEPTH: usize = 10;
/// Upper bound for `max_body_size` (100 MiB).
pub const MAX_BODY_SIZE_LIMIT: i64 = 100 * 1024 * 1024;
pub const DEFAULT_MAX_BODY_SIZE: usize = 10 * 1024;
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(1000);

#[derive(Error, Debug)]
pub enum PolicyError {
    #[error("Sampling rate must be between 0 and 1, got {0}")]
    InvalidSamplingRate(f64),
    #[error("maxDepth must be between {MIN_DEPTH_LIMIT} and {MAX_DEPTH_LIMIT}, got {0}")]
    InvalidMaxDepth(usize),
    #[error("maxSize must be non-negative, got {0}")]
    NegativeBodySize(i64),
    #[error("maxSize must not exceed {MAX_BODY_SIZE_LIMIT} bytes, got {0}")]
    BodySizeTooLarge(i64),
    #[error("readTimeout must be non-negative, got {0}ms")]
    NegativeReadTimeout(i64),
    #[error("Invalid redaction pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// A pattern-based substitution applied to string values.
#[derive(Debug, Clone)]
pub struct PatternRule {
    pattern: Regex,
    replacement: String,
    fields: Option<HashSet<String>>,
}

impl PatternRule {
    pub fn new(pattern: &str, replacement: impl Into<String>) -> Result<Self, PolicyError> {
        let pattern = Regex::new(pattern).map_err(|source| PolicyError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self::from_regex(pattern, replacement))
    }

    pub fn from_regex(pattern: Regex, replacement: impl Into<String>) -> Self {
        Self {
            pattern,
            replacement: replacement.into(),
            fields: None,
        }
    }

    /// Restricts the rule to values whose containing key matches one of
    /// `fields` (case-insensitive).
    pub fn for_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.fields = Some(fields.into_iter().map(|f| f.as_ref().to_lowercase()).collect());
        self
    }

    pub fn pattern(&self) -> &Regex {
        &self.pattern
    }

    pub fn replacement(&self) -> &str {
        &self.replacement
    }

    pub fn applies_to(&self, key: Option<&str>) -> bool {
        match (&self.fields, key) {
            (None, _) => true,
            (Some(fields), Some(key)) => fields.contains(&key.to_lowercase()),
            (Some(_), None) => false,
        }
    }
}

/// Content-type allow/deny lists; entries may contain `*` wildcards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentTypeFilter {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

impl ContentTypeFilter {
    pub fn with_default_excludes() -> Self {
        Self {
            include: Vec::new(),
            exclude: presets::DEFAULT_EXCLUDED_CONTENT_TYPES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }

    pub fn allows(&self, normalized: &str) -> bool {
        if self
            .exclude
            .iter()
            .any(|pattern| wildcard_match(&pattern.to_lowercase(), normalized))
        {
            return false;
        }
        if !self.include.is_empty() {
            return self
                .include
                .iter()
                .any(|pattern| wildcard_match(&pattern.to_lowercase(), normalized));
        }
        true
    }
}

/// Probabilistic body-capture sampling, optionally scoped to URL patterns.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplingConfig {
    rate: f64,
    url_patterns: Vec<String>,
}

impl SamplingConfig {
    pub fn new(rate: f64) -> Result<Self, PolicyError> {
        if !(0.0..=1.0).contains(&rate) {
            return Err(PolicyError::InvalidSamplingRate(rate));
        }
        Ok(Self {
            rate,
            url_patterns: Vec::new(),
        })
    }

    pub fn with_url_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.url_patterns = patterns.into_iter().map(Into::into).collect();
        self
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn url_patterns(&self) -> &[String] {
        &self.url_patterns
    }

    /// Wildcard match when the pattern has `*`, substring match otherwise.
    pub fn matches_url(&self, url: &str) -> bool {
        self.url_patterns.iter().any(|pattern| {
            if pattern.contains('*') {
                wildcard_match(pattern, url)
            } else {
                url.contains(pattern.as_str())
            }
        })
    }
}

/// Immutable redaction configuration, built once and shared across calls.
#[derive(Debug, Clone)]
pub struct RedactionPolicy {
    pub(crate) sensitive_fields: HashSet<String>,
    pub(crate) sensitive_headers: HashSet<String>,
    pub(crate) patterns: Vec<PatternRule>,
    pub(crate) max_depth: usize,
    pub(crate) content_types: Option<ContentTypeFilter>,
    pub(crate) sampling: Option<SamplingConfig>,
    pub(crate) max_body_size: usize,
    pub(crate) read_timeout: Duration,
}

impl Default for RedactionPolicy {
    fn default() -> Self {
        Self {
            sensitive_fields: lowercase_set(presets::DEFAULT_SENSITIVE_FIELDS),
            sensitive_headers: lowercase_set(presets::DEFAULT_SENSITIVE_HEADERS),
            patterns: Vec::new(),
            max_depth: DEFAULT_MAX_DEPTH,
            content_types: Some(ContentTypeFilter::with_default_excludes()),
            sampling: None,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }
}

impl RedactionPolicy {
    pub fn builder() -> super::RedactionPolicyBuilder {
        super::RedactionPolicyBuilder::new()
    }

    pub fn is_sensitive_field(&self, key: &str) -> bool {
        self.sensitive_fields.contains(&key.to_lowercase())
    }

    pub fn is_sensitive_header(&self, name: &str) -> bool {
        self.sensitive_headers.contains(&name.to_lowercase())
    }

    pub fn sensitive_fields(&self) -> &HashSet<String> {
        &self.sensitive_fields
    }

    pub fn sensitive_headers(&self) -> &HashSet<String> {
        &self.sensitive_headers
    }

    pub fn patterns(&self) -> &[PatternRule] {
        &self.patterns
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn content_types(&self) -> Option<&ContentTypeFilter> {
        self.content_types.as_ref()
    }

    pub fn sampling(&self) -> Option<&SamplingConfig> {
        self.sampling.as_ref()
    }

    pub fn max_body_size(&self) -> usize {
        self.max_body_size
    }

    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    /// Applies every pattern rule that is in scope for `key`, in order.
    pub fn scrub_text(&self, text: &str, key: Option<&str>) -> String {
        let mut scrubbed = text.to_string();
        for rule in self.patterns.iter().filter(|rule| rule.applies_to(key)) {
            scrubbed = rule
                .pattern
                .replace_all(&scrubbed, rule.replacement.as_str())
                .into_owned();
        }
        scrubbed
    }
}

pub(crate) fn lowercase_set<S: AsRef<str>>(items: &[S]) -> HashSet<String> {
    items.iter().map(|s| s.as_ref().to_lowercase()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_matches_documented_defaults() {
        let policy = RedactionPolicy::default();
        assert_eq!(policy.max_depth(), 10);
        assert!(policy.is_sensitive_field("Password"));
        assert!(policy.is_sensitive_header("AUTHORIZATION"));
        assert!(policy.patterns().is_empty());
        assert!(policy.sampling().is_none());
    }

    #[test]
    fn test_pattern_rule_scoping() {
        let rule = PatternRule::new(r"\d+", "#")
            .unwrap()
            .for_fields(["Phone"]);
        assert!(rule.applies_to(Some("phone")));
        assert!(rule.applies_to(Some("PHONE")));
        assert!(!rule.applies_to(Some("name")));
        assert!(!rule.applies_to(None));
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        let err = PatternRule::new("(unclosed", "x").unwrap_err();
        assert!(matches!(err, PolicyError::InvalidPattern { .. }));
    }

    #[test]
    fn test_scrub_text_applies_rules_cumulatively() {
        let mut policy = RedactionPolicy::default();
        policy.patterns = vec![
            PatternRule::new("foo", "bar").unwrap(),
            PatternRule::new("bar", "baz").unwrap(),
        ];
        assert_eq!(policy.scrub_text("foo bar", None), "baz baz");
    }

    #[test]
    fn test_sampling_rate_bounds() {
        assert!(SamplingConfig::new(0.0).is_ok());
        assert!(SamplingConfig::new(1.0).is_ok());
        assert!(SamplingConfig::new(-0.1).is_err());
        assert!(SamplingConfig::new(f64::NAN).is_err());
    }

    #[test]
    fn test_sampling_url_matching() {
        let sampling = SamplingConfig::new(0.5)
            .unwrap()
            .with_url_patterns(["/api/", "https://*.example.com/*"]);
        assert!(sampling.matches_url("http://localhost/api/users"));
        assert!(sampling.matches_url("https://cdn.example.com/img"));
        assert!(!sampling.matches_url("http://localhost/health"));
    }
}
