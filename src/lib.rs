//! # URL Rules
//!
//! Bidirectional URL rules for web applications:
//!
//! - **Pattern Compilation** - `post/<year:\d{4}>/<tag>` patterns become anchored regexes
//!   and URL templates
//! - **Request Parsing** - Turn a request path into a route and parameters
//! - **URL Creation** - Turn a route and parameters back into a URL
//! - **Optional Parameters** - Parameters with defaults can be left out of URLs
//! - **Host Rules** - Patterns bound to a scheme and host, including subdomain parameters
//! - **Rule Groups** - Share a pattern and route prefix between rules
//! - **Normalization** - Collapse slashes and fix trailing slashes with redirects
//! - **Configuration** - Load a whole manager from TOML
//!
//! # Quick Start
//!
//! ```
//! use url_rules::*;
//!
//! let mut manager = UrlManager::new();
//! manager
//!     .add_rule_config(RuleConfig::new(r"post/<id:\d+>", "post/view").with_default("id", ""))
//!     .unwrap();
//! manager
//!     .add_rule_config(
//!         RuleConfig::new(r"<controller:\w+>/<action:\w+>", "<controller>/<action>")
//!             .with_default("action", "index"),
//!     )
//!     .unwrap();
//!
//! // Parsing
//! let outcome = manager.parse_request(&Request::get("post/42")).unwrap();
//! let parsed = outcome.route().unwrap();
//! assert_eq!(parsed.route, "post/view");
//! assert_eq!(parsed.params.get("id"), Some("42"));
//!
//! // Creation
//! let url = manager.create_url("post/view", &RouteParams::new().with("id", 42).with("page", 2));
//! assert_eq!(url, "/post/42?page=2");
//!
//! // Defaults collapse
//! assert_eq!(manager.create_url("user/index", &RouteParams::new()), "/user");
//! ```
//!
//! # Shorthand Rules
//!
//! ```
//! use url_rules::*;
//!
//! let mut manager = UrlManager::new();
//! manager.add_shorthand(r"POST,PUT post/<id:\d+>", "post/update").unwrap();
//!
//! assert!(manager.parse_request(&Request::post("post/1")).is_some());
//! ```
//!
//! # Feature Flags
//!
//! - `log` (default) - Uses the standard `log` crate for logging
//! - `tracing` - Uses the `tracing` crate for structured logging (mutually exclusive with `log`)
//! - `cache` (default) - LRU cache of the rules able to create a route
//! - `config` (default) - `serde`/`toml` configuration loading

#![doc(html_root_url = "https://docs.rs/url-rules/0.1.0")]
#![cfg_attr(docsrs, feature(doc_cfg))]
// Lints are configured in Cargo.toml [lints] section

// Logging abstraction
pub mod logging;

// Cache (optional)
#[cfg(feature = "cache")]
pub mod cache;

// Configuration (optional)
#[cfg(feature = "config")]
pub mod config;

// Core modules
pub mod compiler;
pub mod group;
pub mod manager;
pub mod rule;

// Error handling
pub mod error;

// Other modules
pub mod normalizer;
pub mod params;
pub mod request;

// Re-export main types for convenient access
#[cfg(feature = "cache")]
pub use cache::{CacheStats, RuleCache};
pub use compiler::{CompiledPattern, ParamRule};
#[cfg(feature = "config")]
pub use config::{GroupEntry, ManagerConfig, RuleEntry};
pub use error::{ConfigurationError, CreateUrlResult};
pub use group::{GroupConfig, GroupRule};
pub use manager::{ManagerContext, UrlManager};
pub use normalizer::{NormalizeRouteFn, NormalizerAction, UrlNormalizer};
pub use params::{ParamValue, RouteParams};
pub use request::{Request, RequestContext};
pub use rule::{BoxedRule, NormalizerSetting, RouteRule, RuleConfig, RuleMode, UrlRule};

/// A route and its parameters, as produced by request parsing.
///
/// # Example
///
/// ```
/// use url_rules::{ParsedRoute, RouteParams};
///
/// let parsed = ParsedRoute::new("post/view", RouteParams::new().with("id", "5"));
///
/// assert_eq!(parsed.route, "post/view");
/// assert_eq!(parsed.params.get("id"), Some("5"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRoute {
    /// The resolved route
    pub route: String,
    /// Parameters extracted from the path and the rule defaults
    pub params: RouteParams,
}

impl ParsedRoute {
    /// Create a parsed route.
    pub fn new(route: impl Into<String>, params: RouteParams) -> Self {
        Self {
            route: route.into(),
            params,
        }
    }
}

/// Outcome of parsing a request that a rule accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOutcome {
    /// Serve this route
    Resolved(ParsedRoute),
    /// The path was not canonical: redirect to the URL of this route
    Redirect {
        /// Route to create the canonical URL for
        target: ParsedRoute,
        /// HTTP status code of the redirect
        status: u16,
    },
    /// The path was not canonical and must be answered with "not found"
    NotFound,
}

impl ParseOutcome {
    /// Get the route to serve, if any
    pub fn route(&self) -> Option<&ParsedRoute> {
        match self {
            ParseOutcome::Resolved(parsed) => Some(parsed),
            _ => None,
        }
    }

    /// Consume the outcome, keeping only the route to serve
    pub fn into_route(self) -> Option<ParsedRoute> {
        match self {
            ParseOutcome::Resolved(parsed) => Some(parsed),
            _ => None,
        }
    }

    /// Check if the request resolved to a route
    pub fn is_resolved(&self) -> bool {
        matches!(self, ParseOutcome::Resolved(_))
    }

    /// Check if the request must be redirected
    pub fn is_redirect(&self) -> bool {
        matches!(self, ParseOutcome::Redirect { .. })
    }

    /// Check if the request must be answered with "not found"
    pub fn is_not_found(&self) -> bool {
        matches!(self, ParseOutcome::NotFound)
    }
}
