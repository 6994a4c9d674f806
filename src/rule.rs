//! URL rule definition, request parsing and URL creation

use crate::compiler::{collapse_slashes, strtr, trim_slashes, CompiledPattern, ParamRule};
use crate::error::{ConfigurationError, CreateUrlResult};
use crate::manager::ManagerContext;
use crate::normalizer::UrlNormalizer;
use crate::params::{build_query, form_encode, ParamValue, RouteParams};
use crate::request::RequestContext;
use crate::{debug_log, trace_log, ParseOutcome, ParsedRoute};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

/// `VERB[,VERB...] pattern` keys of shorthand rule declarations.
static VERB_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^((?:(?:GET|HEAD|POST|PUT|PATCH|DELETE|OPTIONS),)*(?:GET|HEAD|POST|PUT|PATCH|DELETE|OPTIONS))\s+(.*)$",
    )
    .expect("verb prefix grammar")
});

// ============================================================================
// Rule Trait
// ============================================================================

/// A rule the manager can ask to parse requests and create URLs
pub trait RouteRule: Send + Sync + fmt::Debug {
    /// Parse a request; `None` means the rule does not apply
    fn parse_request(
        &self,
        manager: &dyn ManagerContext,
        request: &dyn RequestContext,
    ) -> Option<ParseOutcome>;

    /// Create a URL for a route and parameters
    fn create_url(
        &self,
        manager: &dyn ManagerContext,
        route: &str,
        params: &RouteParams,
    ) -> CreateUrlResult;
}

/// Shared rule handle stored by managers and groups
pub type BoxedRule = Arc<dyn RouteRule>;

// ============================================================================
// RuleConfig
// ============================================================================

/// Which directions a rule takes part in
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(serde::Deserialize))]
#[cfg_attr(feature = "config", serde(rename_all = "snake_case"))]
pub enum RuleMode {
    /// Parse requests and create URLs
    #[default]
    Bidirectional,
    /// Only parse requests
    ParsingOnly,
    /// Only create URLs
    CreationOnly,
}

/// Normalizer attached to a rule
#[derive(Debug, Clone, Default)]
pub enum NormalizerSetting {
    /// Use the manager's normalizer
    #[default]
    Inherit,
    /// Never normalize for this rule
    Disabled,
    /// Use this normalizer
    Enabled(Arc<UrlNormalizer>),
    /// A configuration value that is neither a normalizer table nor `false`.
    /// Rejected when the rule is built.
    Unsupported(String),
}

/// Rule configuration
///
/// # Example
///
/// ```
/// use url_rules::{RuleConfig, UrlRule};
///
/// let rule = UrlRule::new(
///     RuleConfig::new(r"post/<id:\d+>", "post/view").with_default("id", ""),
/// )
/// .unwrap();
/// assert_eq!(rule.template(), "/post/<id>/");
/// ```
#[derive(Debug, Clone)]
#[cfg_attr(feature = "config", derive(serde::Deserialize))]
#[cfg_attr(feature = "config", serde(default, deny_unknown_fields))]
pub struct RuleConfig {
    /// Rule name, defaults to the pattern
    pub name: Option<String>,
    /// Pattern with `<name:sub-pattern>` tokens
    pub pattern: Option<String>,
    /// `scheme://host` the pattern is matched under
    pub host: Option<String>,
    /// Target route, may contain `<name>` tokens
    pub route: Option<String>,
    /// Default parameter values; parameters with a default are optional
    #[cfg_attr(
        feature = "config",
        serde(deserialize_with = "crate::config::deserialize_defaults")
    )]
    pub defaults: BTreeMap<String, String>,
    /// Accepted HTTP methods, empty accepts all
    pub verb: Vec<String>,
    /// Directions the rule takes part in
    pub mode: RuleMode,
    /// URL suffix, falls back to the manager's
    pub suffix: Option<String>,
    /// Form-encode parameter values placed in created URLs
    pub encode_params: bool,
    /// Normalizer for this rule
    pub normalizer: NormalizerSetting,
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            name: None,
            pattern: None,
            host: None,
            route: None,
            defaults: BTreeMap::new(),
            verb: Vec::new(),
            mode: RuleMode::default(),
            suffix: None,
            encode_params: true,
            normalizer: NormalizerSetting::default(),
        }
    }
}

impl RuleConfig {
    /// Create a configuration from a pattern and a route
    pub fn new(pattern: impl Into<String>, route: impl Into<String>) -> Self {
        Self {
            pattern: Some(pattern.into()),
            route: Some(route.into()),
            ..Self::default()
        }
    }

    /// Create a configuration from a `"VERB,VERB pattern" => route` declaration.
    ///
    /// Rules restricted to verbs other than GET only parse requests.
    pub fn shorthand(key: &str, route: impl Into<String>) -> Self {
        match VERB_PREFIX.captures(key) {
            Some(caps) => {
                let verbs: Vec<String> = caps[1].split(',').map(str::to_string).collect();
                let mode = if verbs.iter().any(|v| v == "GET") {
                    RuleMode::Bidirectional
                } else {
                    RuleMode::ParsingOnly
                };
                Self::new(&caps[2], route).verb(verbs).mode(mode)
            }
            None => Self::new(key, route),
        }
    }

    /// Set rule name
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the host the pattern is matched under
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Add a default parameter value
    pub fn with_default(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.defaults.insert(name.into(), value.into());
        self
    }

    /// Replace all default parameter values
    pub fn defaults(mut self, defaults: BTreeMap<String, String>) -> Self {
        self.defaults = defaults;
        self
    }

    /// Restrict the rule to some HTTP methods
    pub fn verb<I, S>(mut self, verbs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.verb = verbs.into_iter().map(Into::into).collect();
        self
    }

    /// Set the rule mode
    pub fn mode(mut self, mode: RuleMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the URL suffix
    pub fn suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = Some(suffix.into());
        self
    }

    /// Enable or disable encoding of parameter values
    pub fn encode_params(mut self, encode: bool) -> Self {
        self.encode_params = encode;
        self
    }

    /// Set the normalizer
    pub fn normalizer(mut self, normalizer: NormalizerSetting) -> Self {
        self.normalizer = normalizer;
        self
    }

    /// Use a dedicated normalizer for this rule
    pub fn with_normalizer(self, normalizer: UrlNormalizer) -> Self {
        self.normalizer(NormalizerSetting::Enabled(Arc::new(normalizer)))
    }
}

// ============================================================================
// UrlRule
// ============================================================================

/// A compiled URL rule
///
/// Parses request paths into a route and parameters, and creates URLs from a route
/// and parameters. Compiled once in [`UrlRule::new`], read-only afterwards.
#[derive(Debug, Clone)]
pub struct UrlRule {
    name: String,
    route: String,
    defaults: BTreeMap<String, String>,
    verb: Vec<String>,
    mode: RuleMode,
    suffix: Option<String>,
    encode_params: bool,
    normalizer: NormalizerSetting,
    compiled: CompiledPattern,
}

impl UrlRule {
    /// Build and compile a rule
    pub fn new(config: RuleConfig) -> Result<Self, ConfigurationError> {
        let pattern = config.pattern.ok_or(ConfigurationError::MissingPattern)?;
        let route = config.route.ok_or(ConfigurationError::MissingRoute)?;

        if let NormalizerSetting::Unsupported(raw) = &config.normalizer {
            return Err(ConfigurationError::InvalidNormalizer(raw.clone()));
        }

        let verb = config
            .verb
            .iter()
            .map(|v| v.to_ascii_uppercase())
            .collect();
        let name = config.name.unwrap_or_else(|| pattern.clone());
        let compiled =
            CompiledPattern::compile(&pattern, &route, config.host.as_deref(), &config.defaults);

        Ok(Self {
            name,
            route: compiled.route.clone(),
            defaults: config.defaults,
            verb,
            mode: config.mode,
            suffix: config.suffix,
            encode_params: config.encode_params,
            normalizer: config.normalizer,
            compiled,
        })
    }

    /// Rule name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Target route (trimmed)
    pub fn route(&self) -> &str {
        &self.route
    }

    /// Host the rule is bound to, explicit or taken from the pattern
    pub fn host(&self) -> Option<&str> {
        self.compiled.host.as_deref()
    }

    /// Template used to create URLs
    pub fn template(&self) -> &str {
        &self.compiled.template
    }

    /// Source of the regex matched against request paths
    pub fn regex(&self) -> &str {
        &self.compiled.regex_source
    }

    /// Rule mode
    pub fn mode(&self) -> RuleMode {
        self.mode
    }

    /// Accepted HTTP methods (upper case), empty accepts all
    pub fn verbs(&self) -> &[String] {
        &self.verb
    }

    /// Default parameter values
    pub fn defaults(&self) -> &BTreeMap<String, String> {
        &self.defaults
    }

    /// Own suffix, if set
    pub fn suffix(&self) -> Option<&str> {
        self.suffix.as_deref()
    }

    /// Validation rules of parameters that are not part of the route
    pub fn param_rules(&self) -> &BTreeMap<String, ParamRule> {
        &self.compiled.param_rules
    }

    fn effective_suffix<'a>(&'a self, manager: &'a dyn ManagerContext) -> &'a str {
        self.suffix.as_deref().unwrap_or_else(|| manager.suffix())
    }

    fn active_normalizer<'a>(
        &'a self,
        manager: &'a dyn ManagerContext,
    ) -> Option<&'a UrlNormalizer> {
        match &self.normalizer {
            NormalizerSetting::Inherit => manager.normalizer(),
            NormalizerSetting::Enabled(normalizer) => Some(normalizer),
            NormalizerSetting::Disabled | NormalizerSetting::Unsupported(_) => None,
        }
    }

    /// Parse a request.
    ///
    /// Returns `None` when the rule does not apply to the request.
    pub fn parse_request(
        &self,
        manager: &dyn ManagerContext,
        request: &dyn RequestContext,
    ) -> Option<ParseOutcome> {
        if self.mode == RuleMode::CreationOnly {
            return None;
        }
        if !self.verb.is_empty()
            && !self
                .verb
                .iter()
                .any(|v| v.eq_ignore_ascii_case(request.method()))
        {
            return None;
        }

        let suffix = self.effective_suffix(manager);
        let normalizer = self.active_normalizer(manager);
        let (mut path_info, normalized) = match normalizer {
            Some(normalizer) => normalizer.normalize_path_info(request.path_info(), suffix),
            None => (request.path_info().to_string(), false),
        };

        if !suffix.is_empty() && !path_info.is_empty() {
            match path_info.strip_suffix(suffix) {
                // A bare suffix is not a path.
                Some("") | None => return None,
                Some(stripped) => path_info = stripped.to_string(),
            }
        }

        if self.compiled.host.is_some() {
            let host_info = request.host_info().to_lowercase();
            path_info = if path_info.is_empty() {
                host_info
            } else {
                format!("{}/{}", host_info, path_info)
            };
        }

        let caps = self.compiled.matcher.as_ref()?.captures(&path_info)?;
        let mut matches = self.compiled.captured_params(&caps);
        for (name, value) in &self.defaults {
            if matches.get(name).map_or(true, String::is_empty) {
                matches.insert(name.clone(), value.clone());
            }
        }

        let mut params: RouteParams = self.defaults.iter().collect();
        let mut route_tokens = HashMap::new();
        for (name, value) in matches {
            if let Some(token) = self.compiled.route_params.get(&name) {
                route_tokens.insert(token.clone(), value);
                params.remove(&name);
            } else if self.compiled.param_rules.contains_key(&name) {
                params.insert(name, value);
            }
        }

        let route = if self.compiled.route_params.is_empty() {
            self.route.clone()
        } else {
            strtr(&self.route, &route_tokens)
        };

        debug_log!("Request parsed with URL rule: {}", self.name);

        let parsed = ParsedRoute::new(route, params);
        match normalizer {
            Some(normalizer) if normalized => Some(normalizer.normalize_route(parsed)),
            _ => Some(ParseOutcome::Resolved(parsed)),
        }
    }

    /// Create a URL for a route and parameters.
    ///
    /// The caller's parameters are not modified; parameters the pattern does not
    /// consume are appended as a query string.
    pub fn create_url(
        &self,
        manager: &dyn ManagerContext,
        route: &str,
        params: &RouteParams,
    ) -> CreateUrlResult {
        if self.mode == RuleMode::ParsingOnly {
            return CreateUrlResult::ParsingOnly;
        }

        let mut params = params.clone();
        let mut tokens: HashMap<String, String> = HashMap::new();

        if route != self.route {
            let Some(caps) = self
                .compiled
                .route_matcher
                .as_ref()
                .and_then(|matcher| matcher.captures(route))
            else {
                return CreateUrlResult::RouteMismatch;
            };
            let matches = self.compiled.captured_params(&caps);
            for (name, token) in &self.compiled.route_params {
                let value = matches.get(name).map_or("", String::as_str);
                // The default value is the canonical form: leave it out of the URL.
                if self.defaults.get(name).is_some_and(|d| d == value) {
                    tokens.insert(token.clone(), String::new());
                } else {
                    tokens.insert(token.clone(), value.to_string());
                }
            }
        }

        for (name, default) in &self.defaults {
            if self.compiled.route_params.contains_key(name) {
                continue;
            }
            if !params.contains(name) {
                if self.compiled.has_token(name) && default.is_empty() {
                    params.insert(name.clone(), "");
                } else {
                    return CreateUrlResult::ParamsMismatch;
                }
            }
            let is_default = params.get(name) == Some(default.as_str());
            let has_rule = self.compiled.param_rules.contains_key(name);
            if is_default {
                params.remove(name);
                if has_rule {
                    tokens.insert(format!("<{}>", name), String::new());
                }
            } else if !has_rule {
                return CreateUrlResult::ParamsMismatch;
            }
        }

        for (name, rule) in &self.compiled.param_rules {
            let value = params
                .get_value(name)
                .and_then(ParamValue::as_str)
                .map(str::to_string);
            match value {
                Some(value) if rule.accepts(&value) => {
                    let value = if self.encode_params {
                        form_encode(&value)
                    } else {
                        value
                    };
                    tokens.insert(format!("<{}>", name), value);
                    params.remove(name);
                }
                _ => {
                    if !self.defaults.contains_key(name) || params.contains(name) {
                        return CreateUrlResult::ParamsMismatch;
                    }
                }
            }
        }

        let mut url = trim_slashes(&strtr(&self.compiled.template, &tokens));
        if self.compiled.host.is_some() {
            // Keep `scheme://` intact, collapse slashes in the path only.
            if let Some(pos) = url.bytes().skip(8).position(|b| b == b'/') {
                let pos = pos + 8;
                url = format!("{}{}", &url[..pos], collapse_slashes(&url[pos..]));
            }
        } else if url.contains("//") {
            url = collapse_slashes(url.trim_matches('/'));
        }

        if !url.is_empty() {
            url.push_str(self.effective_suffix(manager));
        }

        let query = build_query(&params);
        if !query.is_empty() {
            url.push('?');
            url.push_str(&query);
        }

        trace_log!("URL rule '{}' created '{}' for route '{}'", self.name, url, route);
        CreateUrlResult::Success(url)
    }
}

impl RouteRule for UrlRule {
    fn parse_request(
        &self,
        manager: &dyn ManagerContext,
        request: &dyn RequestContext,
    ) -> Option<ParseOutcome> {
        UrlRule::parse_request(self, manager, request)
    }

    fn create_url(
        &self,
        manager: &dyn ManagerContext,
        route: &str,
        params: &RouteParams,
    ) -> CreateUrlResult {
        UrlRule::create_url(self, manager, route, params)
    }
}

impl fmt::Display for UrlRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        if !self.verb.is_empty() {
            out.push_str(&self.verb.join(","));
            out.push(' ');
        }
        if let Some(host) = &self.compiled.host {
            if !self.name.contains(host.as_str()) {
                out.push_str(host);
                out.push('/');
            }
        }
        out.push_str(&self.name);
        if out.is_empty() {
            out.push('/');
        }
        f.write_str(&out)
    }
}

// ============================================================================
// Tests
// ============================================================================
