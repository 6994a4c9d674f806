//! URL manager
//!
//! Holds the ordered rule list and the settings rules inherit (suffix and
//! normalizer), parses requests with the first rule that matches and creates
//! URLs with the first rule that succeeds.

use crate::error::ConfigurationError;
use crate::group::{GroupConfig, GroupRule};
use crate::normalizer::UrlNormalizer;
use crate::params::build_query;
use crate::request::RequestContext;
use crate::rule::{BoxedRule, RouteRule, RuleConfig, UrlRule};
use crate::{debug_log, ParseOutcome, ParsedRoute, RouteParams};
use std::sync::Arc;

#[cfg(feature = "cache")]
use crate::cache::{CacheStats, RuleCache};
#[cfg(feature = "cache")]
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Settings a rule may inherit from the manager that invokes it
pub trait ManagerContext {
    /// URL suffix used by rules without their own
    fn suffix(&self) -> &str;
    /// Normalizer used by rules that do not override it
    fn normalizer(&self) -> Option<&UrlNormalizer>;
}

/// Ordered collection of URL rules
///
/// # Example
///
/// ```
/// use url_rules::{Request, RouteParams, UrlManager};
///
/// let mut manager = UrlManager::new();
/// manager.add_shorthand(r"post/<id:\d+>", "post/view").unwrap();
///
/// let parsed = manager.parse_request(&Request::get("post/42")).unwrap();
/// assert_eq!(parsed.route().unwrap().route, "post/view");
///
/// let url = manager.create_url("post/view", &RouteParams::new().with("id", 42));
/// assert_eq!(url, "/post/42");
/// ```
#[derive(Debug)]
pub struct UrlManager {
    rules: Vec<BoxedRule>,
    suffix: String,
    strict_parsing: bool,
    base_url: String,
    host_info: String,
    normalizer: Option<UrlNormalizer>,
    #[cfg(feature = "cache")]
    cache: Mutex<RuleCache>,
}

impl UrlManager {
    /// Host info used when none is configured
    pub const DEFAULT_HOST_INFO: &'static str = "http://localhost";

    /// Create a manager without rules
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            suffix: String::new(),
            strict_parsing: false,
            base_url: String::new(),
            host_info: Self::DEFAULT_HOST_INFO.to_string(),
            normalizer: None,
            #[cfg(feature = "cache")]
            cache: Mutex::new(RuleCache::new()),
        }
    }

    /// Set the default URL suffix
    pub fn suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    /// Require every request to match a rule
    pub fn strict_parsing(mut self, strict: bool) -> Self {
        self.strict_parsing = strict;
        self
    }

    /// Set the base URL prepended to created URLs
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the scheme and host used for absolute URLs
    pub fn host_info(mut self, host_info: impl Into<String>) -> Self {
        self.host_info = host_info.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the normalizer rules inherit
    pub fn normalizer(mut self, normalizer: UrlNormalizer) -> Self {
        self.normalizer = Some(normalizer);
        self
    }

    /// Set the number of routes the rule cache remembers
    #[cfg(feature = "cache")]
    pub fn cache_capacity(self, capacity: usize) -> Self {
        Self {
            cache: Mutex::new(RuleCache::with_capacity(capacity)),
            ..self
        }
    }

    /// Add a rule with builder syntax
    pub fn rule(mut self, rule: impl RouteRule + 'static) -> Self {
        self.add_rule(rule);
        self
    }

    /// Append a rule
    pub fn add_rule(&mut self, rule: impl RouteRule + 'static) {
        self.add_rules(vec![Arc::new(rule)], true);
    }

    /// Build and append a rule
    pub fn add_rule_config(&mut self, config: RuleConfig) -> Result<(), ConfigurationError> {
        self.add_rule(UrlRule::new(config)?);
        Ok(())
    }

    /// Build and append a rule from a `"VERB pattern" => route` declaration
    pub fn add_shorthand(
        &mut self,
        key: &str,
        route: impl Into<String>,
    ) -> Result<(), ConfigurationError> {
        self.add_rule_config(RuleConfig::shorthand(key, route))
    }

    /// Build and append a rule group
    pub fn add_group(&mut self, config: GroupConfig) -> Result<(), ConfigurationError> {
        self.add_rule(GroupRule::new(config)?);
        Ok(())
    }

    /// Add rules after (`append`) or before the existing ones
    pub fn add_rules(&mut self, rules: Vec<BoxedRule>, append: bool) {
        if append {
            self.rules.extend(rules);
        } else {
            let existing = std::mem::replace(&mut self.rules, rules);
            self.rules.extend(existing);
        }
        #[cfg(feature = "cache")]
        self.lock_cache().clear();
    }

    /// Registered rules in evaluation order
    pub fn rules(&self) -> &[BoxedRule] {
        &self.rules
    }

    /// Base URL (without trailing slash)
    pub fn get_base_url(&self) -> &str {
        &self.base_url
    }

    /// Scheme and host used for absolute URLs
    pub fn get_host_info(&self) -> &str {
        &self.host_info
    }

    /// Check if unmatched requests are rejected
    pub fn is_strict_parsing(&self) -> bool {
        self.strict_parsing
    }

    /// Parse a request into a route and parameters.
    ///
    /// Returns `None` when no rule matches and parsing is strict, or when the
    /// fallback rejects the path because of the suffix.
    pub fn parse_request(&self, request: &dyn RequestContext) -> Option<ParseOutcome> {
        for rule in &self.rules {
            if let Some(outcome) = rule.parse_request(self, request) {
                return Some(outcome);
            }
        }

        if self.strict_parsing {
            debug_log!("No URL rule matched '{}'", request.path_info());
            return None;
        }

        debug_log!("No matching URL rules, using path info as the route");

        let (mut path_info, normalized) = match &self.normalizer {
            Some(normalizer) => normalizer.normalize_path_info(request.path_info(), &self.suffix),
            None => (request.path_info().to_string(), false),
        };

        if !self.suffix.is_empty() && !path_info.is_empty() {
            match path_info.strip_suffix(self.suffix.as_str()) {
                Some("") | None => return None,
                Some(stripped) => path_info = stripped.to_string(),
            }
        }

        let parsed = ParsedRoute::new(path_info, RouteParams::new());
        match &self.normalizer {
            Some(normalizer) if normalized => Some(normalizer.normalize_route(parsed)),
            _ => Some(ParseOutcome::Resolved(parsed)),
        }
    }

    /// Create a URL for a route.
    ///
    /// A scalar `#` parameter becomes the fragment. When no rule can create the
    /// URL, the route itself is used as the path and every parameter goes to the
    /// query string.
    pub fn create_url(&self, route: &str, params: &RouteParams) -> String {
        let route = route.trim_matches('/');
        let mut params = params.clone();
        let anchor = match params.remove("#") {
            Some(value) => format!("#{}", value),
            None => String::new(),
        };

        if let Some(url) = self.create_with_rules(route, &params) {
            if url.contains("://") {
                return splice_base_url(&url, 8, &self.base_url) + &anchor;
            }
            if url.starts_with("//") {
                return splice_base_url(&url, 2, &self.base_url) + &anchor;
            }
            return format!("{}/{}{}", self.base_url, url.trim_start_matches('/'), anchor);
        }

        let mut url = format!("{}{}", route, self.suffix);
        let query = build_query(&params);
        if !query.is_empty() {
            url.push('?');
            url.push_str(&query);
        }
        format!("{}/{}{}", self.base_url, url.trim_start_matches('/'), anchor)
    }

    /// Create an absolute URL for a route.
    ///
    /// URLs created by host-bound rules are already absolute; protocol-relative
    /// ones get the scheme of the host info.
    pub fn create_absolute_url(&self, route: &str, params: &RouteParams) -> String {
        let url = self.create_url(route, params);
        if url.contains("://") {
            return url;
        }
        if url.starts_with("//") {
            let scheme = self
                .host_info
                .find("://")
                .map_or("http", |pos| &self.host_info[..pos]);
            return format!("{}:{}", scheme, url);
        }
        format!("{}{}", self.host_info, url)
    }

    #[cfg(not(feature = "cache"))]
    fn create_with_rules(&self, route: &str, params: &RouteParams) -> Option<String> {
        self.rules
            .iter()
            .find_map(|rule| rule.create_url(self, route, params).into_url())
    }

    #[cfg(feature = "cache")]
    fn create_with_rules(&self, route: &str, params: &RouteParams) -> Option<String> {
        let key = RuleCache::key(route, params);
        let cached = self.lock_cache().get(&key).unwrap_or_default();

        for &index in &cached {
            if let Some(rule) = self.rules.get(index) {
                if let Some(url) = rule.create_url(self, route, params).into_url() {
                    return Some(url);
                }
            }
        }

        for (index, rule) in self.rules.iter().enumerate() {
            if cached.contains(&index) {
                continue;
            }
            let result = rule.create_url(self, route, params);
            if result.route_matched() {
                self.lock_cache().remember(&key, index);
            }
            if let Some(url) = result.into_url() {
                return Some(url);
            }
        }
        None
    }

    /// Rule cache statistics
    #[cfg(feature = "cache")]
    pub fn cache_stats(&self) -> CacheStats {
        self.lock_cache().stats().clone()
    }

    /// Forget every cached rule lookup
    #[cfg(feature = "cache")]
    pub fn clear_cache(&self) {
        self.lock_cache().clear();
    }

    #[cfg(feature = "cache")]
    fn lock_cache(&self) -> MutexGuard<'_, RuleCache> {
        // The cache only holds lookup hints, a poisoned one is still usable.
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for UrlManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ManagerContext for UrlManager {
    fn suffix(&self) -> &str {
        &self.suffix
    }

    fn normalizer(&self) -> Option<&UrlNormalizer> {
        self.normalizer.as_ref()
    }
}

/// Insert `base_url` before the first slash at or after byte `from`.
fn splice_base_url(url: &str, from: usize, base_url: &str) -> String {
    if !base_url.is_empty() {
        if let Some(pos) = url.bytes().skip(from).position(|b| b == b'/') {
            let pos = from + pos;
            return format!("{}{}{}", &url[..pos], base_url, &url[pos..]);
        }
    }
    format!("{}{}", url, base_url)
}

// ============================================================================
// Tests
// ============================================================================
