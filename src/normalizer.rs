//! URL normalization
//!
//! A [`UrlNormalizer`] rewrites the incoming path before rules look at it
//! (collapsing `//` and fixing the trailing slash) and, when it had to change
//! something, decides what happens to the parsed route. By default the client is
//! sent a permanent redirect to the canonical URL.

use crate::{ParseOutcome, ParsedRoute};
use std::fmt;
use std::sync::Arc;

#[cfg(feature = "config")]
use serde::Deserialize;

/// Callback deciding the outcome of a route parsed from a non-canonical path
pub type NormalizeRouteFn = Arc<dyn Fn(ParsedRoute, &UrlNormalizer) -> ParseOutcome + Send + Sync>;

/// What to do with a route parsed from a path the normalizer changed
#[derive(Clone, Default)]
#[cfg_attr(feature = "config", derive(Deserialize))]
#[cfg_attr(feature = "config", serde(rename_all = "snake_case"))]
pub enum NormalizerAction {
    /// Serve the route as if the path had been canonical
    None,
    /// Redirect to the canonical URL with status 301
    #[default]
    RedirectPermanent,
    /// Redirect to the canonical URL with status 302
    RedirectTemporary,
    /// Treat the request as not found
    NotFound,
    /// Let a callback decide
    #[cfg_attr(feature = "config", serde(skip))]
    Custom(NormalizeRouteFn),
}

impl fmt::Debug for NormalizerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NormalizerAction::None => f.write_str("None"),
            NormalizerAction::RedirectPermanent => f.write_str("RedirectPermanent"),
            NormalizerAction::RedirectTemporary => f.write_str("RedirectTemporary"),
            NormalizerAction::NotFound => f.write_str("NotFound"),
            NormalizerAction::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Path normalizer shared by a manager or attached to single rules
#[derive(Debug, Clone)]
#[cfg_attr(feature = "config", derive(Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct UrlNormalizer {
    /// Replace runs of slashes with one slash and drop leading slashes
    pub collapse_slashes: bool,
    /// Make the trailing slash agree with the suffix
    pub normalize_trailing_slash: bool,
    /// Outcome for routes parsed from a changed path
    pub action: NormalizerAction,
}

impl UrlNormalizer {
    /// Status code of a permanent redirect
    pub const REDIRECT_PERMANENT: u16 = 301;
    /// Status code of a temporary redirect
    pub const REDIRECT_TEMPORARY: u16 = 302;

    /// Create a normalizer with every normalization enabled and permanent redirects
    pub fn new() -> Self {
        Self {
            collapse_slashes: true,
            normalize_trailing_slash: true,
            action: NormalizerAction::RedirectPermanent,
        }
    }

    /// Enable or disable slash collapsing
    pub fn collapse_slashes(mut self, enabled: bool) -> Self {
        self.collapse_slashes = enabled;
        self
    }

    /// Enable or disable trailing slash normalization
    pub fn normalize_trailing_slash(mut self, enabled: bool) -> Self {
        self.normalize_trailing_slash = enabled;
        self
    }

    /// Set the action for routes parsed from a changed path
    pub fn action(mut self, action: NormalizerAction) -> Self {
        self.action = action;
        self
    }

    /// Use a callback as the action
    pub fn on_normalized<F>(self, callback: F) -> Self
    where
        F: Fn(ParsedRoute, &UrlNormalizer) -> ParseOutcome + Send + Sync + 'static,
    {
        self.action(NormalizerAction::Custom(Arc::new(callback)))
    }

    /// Normalize a path.
    ///
    /// Returns the path and whether it differs from the input. Empty paths are
    /// returned untouched.
    pub fn normalize_path_info(&self, path_info: &str, suffix: &str) -> (String, bool) {
        if path_info.is_empty() {
            return (String::new(), false);
        }

        let mut path = path_info.to_string();
        if self.collapse_slashes {
            path = crate::compiler::collapse_slashes(&path)
                .trim_start_matches('/')
                .to_string();
        }
        if self.normalize_trailing_slash {
            path = normalize_trailing_slash(path, suffix);
        }

        let changed = path != path_info;
        (path, changed)
    }

    /// Decide the outcome of a route parsed from a normalized path
    pub fn normalize_route(&self, route: ParsedRoute) -> ParseOutcome {
        match &self.action {
            NormalizerAction::None => ParseOutcome::Resolved(route),
            NormalizerAction::RedirectPermanent => ParseOutcome::Redirect {
                target: route,
                status: Self::REDIRECT_PERMANENT,
            },
            NormalizerAction::RedirectTemporary => ParseOutcome::Redirect {
                target: route,
                status: Self::REDIRECT_TEMPORARY,
            },
            NormalizerAction::NotFound => ParseOutcome::NotFound,
            NormalizerAction::Custom(callback) => callback(route, self),
        }
    }
}

impl Default for UrlNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize_trailing_slash(mut path: String, suffix: &str) -> String {
    if suffix.ends_with('/') && !path.ends_with('/') {
        path.push('/');
    } else if !suffix.ends_with('/') && path.ends_with('/') {
        path.truncate(path.trim_end_matches('/').len());
    }
    path
}

// ============================================================================
// Tests
// ============================================================================
