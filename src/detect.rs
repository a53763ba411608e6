//! Pattern-based attack detectors.
//!
//! A detector compiles its pattern set once at construction and classifies
//! single input values against it. Custom patterns supplied via configuration
//! are checked before the built-in defaults, in the order given. Matching is
//! case-insensitive and unanchored: a pattern hits if it occurs anywhere in
//! the value.
//!
//! Detectors hold no mutable state and are shared across requests behind an
//! `Arc` without any locking.

use regex::{Regex, RegexBuilder};
use thiserror::Error;

use crate::types::{Detection, ThreatCategory};

/// Samples longer than this are truncated for logging/telemetry.
const SAMPLE_LIMIT: usize = 50;
/// Retained prefix of over-long samples; the ellipsis marker pads to the limit.
const SAMPLE_PREFIX: usize = 47;

/// SQL keyword blacklist, boolean tautologies, statement/comment markers.
const DEFAULT_SQL_PATTERNS: &[&str] = &[
    r"(\b(SELECT|INSERT|UPDATE|DELETE|UNION|EXEC|ALTER|DROP|TRUNCATE|LOAD_FILE)\b)",
    r"(\b(OR|AND)\s+[\d\w]+\s*=\s*[\d\w]+)",
    r"(--|;|\/\*|\*\/|@@\w+|CHAR\(\d+\))",
];

/// Script/iframe tags, script-capable URI schemes, event handlers, DOM access.
const DEFAULT_XSS_PATTERNS: &[&str] = &[
    r"<script[^>]*>.*?</script>",
    r"javascript\s*:",
    r"on\w+\s*=",
    r"eval\s*\(",
    r"document\.(cookie|location)",
    r"<iframe[^>]*>",
    r"vbscript\s*:",
    r"<\s*img[^>]*src\s*=",
    r"<\s*link[^>]*href\s*=",
    r"expression\s*\(",
];

#[derive(Debug, Error)]
pub enum DetectError {
    #[error("invalid pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Stateless classifier for one attack category.
#[derive(Debug)]
pub struct AttackDetector {
    category: ThreatCategory,
    patterns: Vec<Regex>,
}

impl AttackDetector {
    /// Detector for SQL injection attempts. `custom` patterns take precedence
    /// over the built-in set.
    pub fn sql_injection(custom: &[String]) -> Result<Self, DetectError> {
        Self::compile(ThreatCategory::SqlInjection, custom, DEFAULT_SQL_PATTERNS)
    }

    /// Detector for cross-site-scripting attempts. `custom` patterns take
    /// precedence over the built-in set.
    pub fn xss(custom: &[String]) -> Result<Self, DetectError> {
        Self::compile(ThreatCategory::Xss, custom, DEFAULT_XSS_PATTERNS)
    }

    fn compile(
        category: ThreatCategory,
        custom: &[String],
        defaults: &[&str],
    ) -> Result<Self, DetectError> {
        let mut patterns = Vec::with_capacity(custom.len() + defaults.len());
        for source in custom.iter().map(String::as_str).chain(defaults.iter().copied()) {
            let regex = RegexBuilder::new(source)
                .case_insensitive(true)
                .build()
                .map_err(|e| DetectError::InvalidPattern { pattern: source.to_string(), source: e })?;
            patterns.push(regex);
        }
        Ok(Self { category, patterns })
    }

    pub fn category(&self) -> ThreatCategory {
        self.category
    }

    /// Classify one input value. The first matching pattern wins; `None`
    /// means benign.
    pub fn analyze(&self, input: &str) -> Option<Detection> {
        self.patterns.iter().find(|regex| regex.is_match(input)).map(|regex| Detection {
            category: self.category,
            pattern: regex.as_str().to_string(),
            sample: truncate_sample(input),
        })
    }
}

/// Bounded copy of an offending input: inputs over 50 characters keep their
/// first 47 characters followed by `...` (exactly 50 total), shorter inputs
/// are returned verbatim.
pub fn truncate_sample(input: &str) -> String {
    if input.chars().count() <= SAMPLE_LIMIT {
        return input.to_string();
    }
    let mut sample: String = input.chars().take(SAMPLE_PREFIX).collect();
    sample.push_str("...");
    sample
}
