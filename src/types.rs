use std::fmt;

use serde::Serialize;

/// Classification label attached to a malicious detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ThreatCategory {
    SqlInjection,
    Xss,
}

impl ThreatCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThreatCategory::SqlInjection => "SQL_INJECTION",
            ThreatCategory::Xss => "XSS",
        }
    }
}

impl fmt::Display for ThreatCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of classifying one input value against a compiled pattern set.
///
/// A detector returns `Some(Detection)` for the first pattern that matches
/// and `None` for benign input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    pub category: ThreatCategory,
    /// Source text of the regex that matched.
    pub pattern: String,
    /// Bounded copy of the offending input (see `detect::truncate_sample`).
    pub sample: String,
}

/// Why a request was blocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BlockTaxonomy {
    RateLimit,
    SqlInjection,
    Xss,
}

impl BlockTaxonomy {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockTaxonomy::RateLimit => "RATE_LIMIT",
            BlockTaxonomy::SqlInjection => "SQL_INJECTION",
            BlockTaxonomy::Xss => "XSS",
        }
    }
}

impl fmt::Display for BlockTaxonomy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<ThreatCategory> for BlockTaxonomy {
    fn from(category: ThreatCategory) -> Self {
        match category {
            ThreatCategory::SqlInjection => BlockTaxonomy::SqlInjection,
            ThreatCategory::Xss => BlockTaxonomy::Xss,
        }
    }
}

/// Everything the response shaping and telemetry need to know about a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockReason {
    pub taxonomy: BlockTaxonomy,
    pub pattern: String,
    pub sample: String,
}

impl From<Detection> for BlockReason {
    fn from(detection: Detection) -> Self {
        Self {
            taxonomy: detection.category.into(),
            pattern: detection.pattern,
            sample: detection.sample,
        }
    }
}

/// Outcome of one orchestrated request inspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Allow,
    Block(BlockReason),
}
