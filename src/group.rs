//! Rule groups sharing a pattern prefix
//!
//! A [`GroupRule`] prepends its prefix to every member pattern and its route
//! prefix to every member route, and skips all members at once when a request
//! path or route is outside the prefix.

use crate::error::{ConfigurationError, CreateUrlResult};
use crate::manager::ManagerContext;
use crate::request::RequestContext;
use crate::rule::{RouteRule, RuleConfig, UrlRule};
use crate::{trace_log, ParseOutcome, RouteParams};

/// Group configuration
///
/// # Example
///
/// ```
/// use url_rules::{GroupConfig, GroupRule, RuleConfig};
///
/// let group = GroupRule::new(
///     GroupConfig::new("admin")
///         .rule(RuleConfig::new("login", "user/login"))
///         .shorthand("logout", "user/logout"),
/// )
/// .unwrap();
///
/// assert_eq!(group.rules()[0].name(), "admin/login");
/// assert_eq!(group.rules()[0].route(), "admin/user/login");
/// ```
#[derive(Debug, Clone, Default)]
pub struct GroupConfig {
    /// Pattern prefix
    pub prefix: String,
    /// Route prefix, defaults to the pattern prefix
    pub route_prefix: Option<String>,
    /// Member rules, relative to the prefixes
    pub rules: Vec<RuleConfig>,
}

impl GroupConfig {
    /// Create a group with a prefix
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            ..Self::default()
        }
    }

    /// Set a route prefix different from the pattern prefix
    pub fn route_prefix(mut self, route_prefix: impl Into<String>) -> Self {
        self.route_prefix = Some(route_prefix.into());
        self
    }

    /// Add a member rule
    pub fn rule(mut self, rule: RuleConfig) -> Self {
        self.rules.push(rule);
        self
    }

    /// Add a member from a `"VERB pattern" => route` declaration
    pub fn shorthand(self, key: &str, route: impl Into<String>) -> Self {
        self.rule(RuleConfig::shorthand(key, route))
    }
}

/// A group of rules behind a common prefix
#[derive(Debug, Clone)]
pub struct GroupRule {
    prefix: String,
    route_prefix: String,
    rules: Vec<UrlRule>,
}

impl GroupRule {
    /// Build the member rules with the prefixes applied
    pub fn new(config: GroupConfig) -> Result<Self, ConfigurationError> {
        let prefix = config.prefix.trim_matches('/').to_string();
        let route_prefix = match config.route_prefix {
            Some(route_prefix) => route_prefix.trim_matches('/').to_string(),
            None => prefix.clone(),
        };

        let rules = config
            .rules
            .into_iter()
            .map(|mut rule| {
                if let (Some(pattern), Some(route)) = (&rule.pattern, &rule.route) {
                    rule.pattern = Some(join_prefix(&prefix, pattern));
                    rule.route = Some(join_prefix(&route_prefix, route));
                }
                UrlRule::new(rule)
            })
            .collect::<Result<Vec<_>, _>>()?;

        trace_log!(
            "Built URL rule group '{}' with {} rules",
            prefix,
            rules.len()
        );

        Ok(Self {
            prefix,
            route_prefix,
            rules,
        })
    }

    /// Pattern prefix (trimmed)
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Route prefix (trimmed)
    pub fn route_prefix(&self) -> &str {
        &self.route_prefix
    }

    /// Member rules with prefixes applied
    pub fn rules(&self) -> &[UrlRule] {
        &self.rules
    }
}

impl RouteRule for GroupRule {
    fn parse_request(
        &self,
        manager: &dyn ManagerContext,
        request: &dyn RequestContext,
    ) -> Option<ParseOutcome> {
        if !self.prefix.is_empty()
            && !format!("{}/", request.path_info()).starts_with(&format!("{}/", self.prefix))
        {
            return None;
        }
        self.rules
            .iter()
            .find_map(|rule| rule.parse_request(manager, request))
    }

    fn create_url(
        &self,
        manager: &dyn ManagerContext,
        route: &str,
        params: &RouteParams,
    ) -> CreateUrlResult {
        if !self.route_prefix.is_empty() && !route.starts_with(&format!("{}/", self.route_prefix)) {
            return CreateUrlResult::RouteMismatch;
        }

        let mut status: Option<CreateUrlResult> = None;
        for rule in &self.rules {
            let result = rule.create_url(manager, route, params);
            if result.is_success() {
                return result;
            }
            if status
                .as_ref()
                .map_or(true, |s| result.specificity() > s.specificity())
            {
                status = Some(result);
            }
        }
        status.unwrap_or(CreateUrlResult::RouteMismatch)
    }
}

fn join_prefix(prefix: &str, value: &str) -> String {
    format!("{}/{}", prefix, value)
        .trim_start_matches('/')
        .to_string()
}
