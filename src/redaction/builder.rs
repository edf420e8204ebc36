use super::policy::{
    ContentTypeFilter, MAX_BODY_SIZE_LIMIT, MAX_DEPTH_LIMIT, MIN_DEPTH_LIMIT, PatternRule,
    PolicyError, RedactionPolicy, SamplingConfig, DEFAULT_READ_TIMEOUT, lowercase_set,
};
use super::presets::Preset;
use std::time::Duration;

/// A pattern rule that has not been compiled yet.
#[derive(Debug, Clone)]
pub(crate) struct PatternSpec {
    pattern: String,
    replacement: String,
    fields: Option<Vec<String>>,
}

impl PatternSpec {
    pub(crate) fn new(pattern: &str, replacement: &str) -> Self {
        Self {
            pattern: pattern.to_string(),
            replacement: replacement.to_string(),
            fields: None,
        }
    }

    fn compile(&self) -> Result<PatternRule, PolicyError> {
        let rule = PatternRule::new(&self.pattern, self.replacement.clone())?;
        Ok(match &self.fields {
            Some(fields) => rule.for_fields(fields),
            None => rule,
        })
    }
}

/// A rule as given to the builder, kept in call order.
#[derive(Debug, Clone)]
enum RuleSource {
    Pending(PatternSpec),
    Compiled(PatternRule),
}

impl RuleSource {
    fn compile(self) -> Result<PatternRule, PolicyError> {
        match self {
            RuleSource::Pending(spec) => spec.compile(),
            RuleSource::Compiled(rule) => Ok(rule),
        }
    }
}

/// Fluent builder accumulating overrides over a preset.
///
/// Everything except the sampling rate is validated in [`build`], so a
/// builder can be assembled from untrusted configuration and checked once.
///
/// [`build`]: RedactionPolicyBuilder::build
#[derive(Debug, Clone)]
pub struct RedactionPolicyBuilder {
    fields: Vec<String>,
    headers: Vec<String>,
    rules: Vec<RuleSource>,
    max_depth: usize,
    content_types: Option<ContentTypeFilter>,
    sampling: Option<SamplingConfig>,
    sampling_urls: Vec<String>,
    max_body_size: i64,
    read_timeout_ms: i64,
}

impl Default for RedactionPolicyBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RedactionPolicyBuilder {
    pub fn new() -> Self {
        Self::preset(Preset::Basic)
    }

    pub fn preset(preset: Preset) -> Self {
        let defaults = preset.defaults();
        // Preset rates are constants inside [0, 1].
        let sampling = defaults
            .sampling_rate
            .and_then(|rate| SamplingConfig::new(rate).ok());

        Self {
            fields: defaults.fields,
            headers: defaults.headers,
            rules: defaults
                .patterns
                .into_iter()
                .map(RuleSource::Pending)
                .collect(),
            max_depth: defaults.max_depth,
            content_types: defaults.content_types,
            sampling,
            sampling_urls: Vec::new(),
            max_body_size: defaults.max_body_size,
            read_timeout_ms: DEFAULT_READ_TIMEOUT.as_millis() as i64,
        }
    }

    pub fn sensitive_field(mut self, name: impl Into<String>) -> Self {
        self.fields.push(name.into());
        self
    }

    pub fn sensitive_fields<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields.extend(names.into_iter().map(Into::into));
        self
    }

    /// Replaces the field list instead of extending it.
    pub fn only_sensitive_fields<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn sensitive_header(mut self, name: impl Into<String>) -> Self {
        self.headers.push(name.into());
        self
    }

    pub fn sensitive_headers<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.headers.extend(names.into_iter().map(Into::into));
        self
    }

    /// Adds a pattern applied to every non-sensitive string value. The regex
    /// is compiled by [`build`](Self::build).
    pub fn pattern(mut self, pattern: &str, replacement: &str) -> Self {
        self.rules
            .push(RuleSource::Pending(PatternSpec::new(pattern, replacement)));
        self
    }

    /// Adds a pattern applied only to values under the given keys.
    pub fn scoped_pattern<I, S>(mut self, pattern: &str, replacement: &str, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut spec = PatternSpec::new(pattern, replacement);
        spec.fields = Some(fields.into_iter().map(Into::into).collect());
        self.rules.push(RuleSource::Pending(spec));
        self
    }

    /// Adds an already compiled rule.
    pub fn rule(mut self, rule: PatternRule) -> Self {
        self.rules.push(RuleSource::Compiled(rule));
        self
    }

    pub fn clear_patterns(mut self) -> Self {
        self.rules.clear();
        self
    }

    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn content_types(mut self, filter: ContentTypeFilter) -> Self {
        self.content_types = Some(filter);
        self
    }

    pub fn include_content_type(mut self, pattern: impl Into<String>) -> Self {
        self.content_types
            .get_or_insert_with(ContentTypeFilter::default)
            .include
            .push(pattern.into());
        self
    }

    pub fn exclude_content_type(mut self, pattern: impl Into<String>) -> Self {
        self.content_types
            .get_or_insert_with(ContentTypeFilter::default)
            .exclude
            .push(pattern.into());
        self
    }

    pub fn no_content_type_filter(mut self) -> Self {
        self.content_types = None;
        self
    }

    /// Sets the body sampling rate. Fails immediately when `rate` is outside
    /// `[0, 1]`.
    pub fn sampling(mut self, rate: f64) -> Result<Self, PolicyError> {
        self.sampling = Some(SamplingConfig::new(rate)?);
        Ok(self)
    }

    /// Scopes sampling to matching URLs. Takes effect only together with a
    /// sampling rate.
    pub fn sampling_urls<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sampling_urls.extend(patterns.into_iter().map(Into::into));
        self
    }

    pub fn no_sampling(mut self) -> Self {
        self.sampling = None;
        self
    }

    pub fn max_body_size(mut self, bytes: i64) -> Self {
        self.max_body_size = bytes;
        self
    }

    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout_ms = timeout.as_millis().min(i64::MAX as u128) as i64;
        self
    }

    pub fn read_timeout_ms(mut self, millis: i64) -> Self {
        self.read_timeout_ms = millis;
        self
    }

    pub fn build(self) -> Result<RedactionPolicy, PolicyError> {
        if !(MIN_DEPTH_LIMIT..=MAX_DEPTH_LIMIT).contains(&self.max_depth) {
            return Err(PolicyError::InvalidMaxDepth(self.max_depth));
        }
        if self.max_body_size < 0 {
            return Err(PolicyError::NegativeBodySize(self.max_body_size));
        }
        if self.max_body_size > MAX_BODY_SIZE_LIMIT {
            return Err(PolicyError::BodySizeTooLarge(self.max_body_size));
        }
        if self.read_timeout_ms < 0 {
            return Err(PolicyError::NegativeReadTimeout(self.read_timeout_ms));
        }

        let patterns = self
            .rules
            .into_iter()
            .map(RuleSource::compile)
            .collect::<Result<Vec<_>, _>>()?;

        let sampling = self.sampling.map(|sampling| {
            if self.sampling_urls.is_empty() {
                sampling
            } else {
                sampling.with_url_patterns(self.sampling_urls)
            }
        });

        Ok(RedactionPolicy {
            sensitive_fields: lowercase_set(&self.fields),
            sensitive_headers: lowercase_set(&self.headers),
            patterns,
            max_depth: self.max_depth,
            content_types: self.content_types,
            sampling,
            max_body_size: self.max_body_size as usize,
            read_timeout: Duration::from_millis(self.read_timeout_ms as u64),
        })
    }
}
