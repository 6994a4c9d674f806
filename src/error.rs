//! Error handling for URL rules
//!
//! Two tiers: a [`ConfigurationError`] means a rule or manager could not be built at
//! all, while a [`CreateUrlResult`] other than `Success` is the ordinary
//! "this rule does not apply" outcome of URL creation.

use thiserror::Error;

// ============================================================================
// Configuration Errors
// ============================================================================

/// Errors raised while building rules or a manager from configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    /// The rule has no pattern.
    #[error("URL rule pattern must be set")]
    MissingPattern,

    /// The rule has no route.
    #[error("URL rule route must be set")]
    MissingRoute,

    /// The normalizer setting is neither a normalizer configuration nor `false`.
    #[error("invalid URL normalizer: {0}")]
    InvalidNormalizer(String),

    /// A configuration document could not be read.
    #[error("failed to read URL configuration: {0}")]
    Parse(String),
}

#[cfg(feature = "config")]
impl From<toml::de::Error> for ConfigurationError {
    fn from(err: toml::de::Error) -> Self {
        ConfigurationError::Parse(err.to_string())
    }
}

// ============================================================================
// URL Creation Results
// ============================================================================

/// Outcome of asking a rule to create a URL.
///
/// The failure variants are diagnostics: they tell "wrong rule" apart from
/// "right rule, unusable parameters" but callers should only log them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateUrlResult {
    /// The rule produced a URL.
    Success(String),
    /// The rule only parses requests.
    ParsingOnly,
    /// The route is not one this rule can produce.
    RouteMismatch,
    /// The route matched but the parameters could not be placed.
    ParamsMismatch,
}

impl CreateUrlResult {
    /// Check if a URL was created
    pub fn is_success(&self) -> bool {
        matches!(self, CreateUrlResult::Success(_))
    }

    /// Check if the route matched this rule, whether or not a URL came out.
    ///
    /// Rules for which this holds are worth trying first the next time the
    /// same route is created.
    pub fn route_matched(&self) -> bool {
        matches!(
            self,
            CreateUrlResult::Success(_) | CreateUrlResult::ParamsMismatch
        )
    }

    /// Get the created URL
    pub fn url(&self) -> Option<&str> {
        match self {
            CreateUrlResult::Success(url) => Some(url),
            _ => None,
        }
    }

    /// Consume the result, keeping only the URL
    pub fn into_url(self) -> Option<String> {
        match self {
            CreateUrlResult::Success(url) => Some(url),
            _ => None,
        }
    }

    /// Rank of a failure, higher is more specific.
    pub(crate) fn specificity(&self) -> u8 {
        match self {
            CreateUrlResult::Success(_) => 3,
            CreateUrlResult::ParamsMismatch => 2,
            CreateUrlResult::RouteMismatch => 1,
            CreateUrlResult::ParsingOnly => 0,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
