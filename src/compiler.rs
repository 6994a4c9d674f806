//! Pattern compiler
//!
//! Turns a rule pattern such as `post/<year:\d{4}>/<tag>` and a route such as
//! `post/index` into the state a rule needs at runtime:
//!
//! - a matching regex, anchored and with one named group per parameter
//! - a template (`/post/<year>/<tag>/`) used to create URLs
//! - a route regex when the route itself carries `<name>` tokens
//! - a validation rule per parameter that is not part of the route
//!
//! Group names are placeholders derived from a CRC-32 of the parameter name, so
//! parameter names that are not valid group names (`user.id`, `some-name`) work.
//!
//! Optional parameters (those with a default) absorb one adjacent slash so that
//! `post/<page>` matches both `post` and `post/2`. When a pattern is made only of
//! optional parameters the translation runs a second time with leading-slash
//! absorption disabled, otherwise the compiled regex would need doubled slashes.

use crate::{trace_log, warn_log};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, HashMap};

/// Sub-pattern used when a token does not declare one.
pub const DEFAULT_SUBPATTERN: &str = "[^/]+";

/// `<name>` or `<name:sub-pattern>` inside a rule pattern.
static PATTERN_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<([\w._-]+):?([^>]+)?>").expect("pattern token grammar"));

/// `<name>` inside a route. Route tokens never carry a sub-pattern.
static ROUTE_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<([\w._-]+)>").expect("route token grammar"));

/// Regex metacharacters escaped in the literal parts of a pattern.
const ESCAPED: [char; 14] = [
    '\\', '.', '+', '*', '?', '(', ')', '|', '[', ']', '{', '}', '^', '$',
];

// ============================================================================
// Parameter Rules
// ============================================================================

/// Validation applied to a parameter value when creating a URL
#[derive(Debug, Clone)]
pub enum ParamRule {
    /// Default sub-pattern: anything without a slash fits the slot.
    Any,
    /// The value must match the whole regex.
    Matches(Regex),
    /// The sub-pattern did not compile; no value is accepted.
    Unsatisfiable,
}

impl ParamRule {
    fn from_subpattern(name: &str, subpattern: &str) -> Self {
        if subpattern == DEFAULT_SUBPATTERN || subpattern == r"[^\/]+" {
            return ParamRule::Any;
        }
        match Regex::new(&format!("^(?:{})$", subpattern)) {
            Ok(regex) => ParamRule::Matches(regex),
            Err(err) => {
                warn_log!(
                    "Sub-pattern '{}' of parameter '{}' is not a valid regex: {}",
                    subpattern,
                    name,
                    err
                );
                ParamRule::Unsatisfiable
            }
        }
    }

    /// Check whether a value may be placed in this parameter's slot
    pub fn accepts(&self, value: &str) -> bool {
        match self {
            ParamRule::Any => true,
            ParamRule::Matches(regex) => regex.is_match(value),
            ParamRule::Unsatisfiable => false,
        }
    }
}

// ============================================================================
// Compiled Pattern
// ============================================================================

/// Everything derived from a pattern/route pair at rule construction
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    /// Pattern after slash normalization (wrapped in slashes unless it has a host)
    pub pattern: String,
    /// Trimmed route
    pub route: String,
    /// Explicit or inferred `scheme://host` prefix
    pub host: Option<String>,
    /// Pattern with every `<name:sub>` collapsed to `<name>`
    pub template: String,
    /// Source of the matching regex
    pub regex_source: String,
    /// Matching regex; `None` if the regex engine rejected it
    pub matcher: Option<Regex>,
    /// Regex extracting route parameters from a route string
    pub route_matcher: Option<Regex>,
    /// Placeholder group name → parameter name
    pub placeholders: BTreeMap<String, String>,
    /// Parameter name → `<name>` token, for names used in the route
    pub route_params: BTreeMap<String, String>,
    /// Parameter name → validation rule, for names not used in the route
    pub param_rules: BTreeMap<String, ParamRule>,
}

/// Result of one translation pass over the pattern
struct Translation {
    replacements: HashMap<String, String>,
    route_replacements: HashMap<String, String>,
    placeholders: BTreeMap<String, String>,
    param_rules: BTreeMap<String, ParamRule>,
    /// True when nothing but slashes is left once optional tokens are removed
    only_optional: bool,
}

impl CompiledPattern {
    /// Compile a pattern and route.
    ///
    /// `defaults` decides which parameters are optional. Compilation never fails:
    /// invalid sub-patterns are logged and yield a rule that does not match.
    pub fn compile(
        pattern: &str,
        route: &str,
        host: Option<&str>,
        defaults: &BTreeMap<String, String>,
    ) -> Self {
        trace_log!("Compiling URL pattern '{}' for route '{}'", pattern, route);

        let mut pattern = trim_slashes(pattern);
        let route = route.trim_matches('/').to_string();
        let mut host = host.map(|h| h.trim_end_matches('/').to_string());

        if let Some(host) = &host {
            pattern = format!("{}/{}", host, pattern)
                .trim_end_matches('/')
                .to_string();
        } else if pattern.is_empty() {
            return Self::empty(route);
        } else if let Some(pos) = pattern.find("://") {
            host = Some(host_prefix(&pattern, pos + 3));
        } else if pattern.starts_with("//") {
            host = Some(host_prefix(&pattern, 2));
        } else {
            pattern = format!("/{}/", pattern);
        }

        let route_params: BTreeMap<String, String> = if route.contains('<') {
            ROUTE_TOKEN
                .captures_iter(&route)
                .map(|caps| (caps[1].to_string(), format!("<{}>", &caps[1])))
                .collect()
        } else {
            BTreeMap::new()
        };

        let mut translation = translate(&pattern, defaults, &route_params, true);
        if translation.only_optional {
            translation = translate(&pattern, defaults, &route_params, false);
        }

        let template = PATTERN_TOKEN
            .replace_all(&pattern, "<${1}>")
            .into_owned();

        let mut replacements = escape_table();
        replacements.extend(translation.replacements);
        let body = strtr(&template, &replacements);
        let regex_source = match &host {
            Some(host) if host.starts_with("//") => {
                format!(r"^[\w]+://{}$", body.trim_matches('/'))
            }
            _ => format!("^{}$", body.trim_matches('/')),
        };
        let matcher = compile_regex(&regex_source, &pattern);

        let route_matcher = if route_params.is_empty() {
            None
        } else {
            let mut replacements = escape_table();
            replacements.extend(translation.route_replacements);
            compile_regex(&format!("^{}$", strtr(&route, &replacements)), &route)
        };

        trace_log!(
            "Compiled URL pattern '{}' to '{}' (template '{}')",
            pattern,
            regex_source,
            template
        );

        Self {
            pattern,
            route,
            host,
            template,
            regex_source,
            matcher,
            route_matcher,
            placeholders: translation.placeholders,
            route_params,
            param_rules: translation.param_rules,
        }
    }

    /// The identity rule: matches only the empty path, creates only `""`.
    fn empty(route: String) -> Self {
        let regex_source = "^$".to_string();
        Self {
            pattern: String::new(),
            route,
            host: None,
            template: String::new(),
            matcher: compile_regex(&regex_source, ""),
            regex_source,
            route_matcher: None,
            placeholders: BTreeMap::new(),
            route_params: BTreeMap::new(),
            param_rules: BTreeMap::new(),
        }
    }

    /// Check if `name` appears as a token in the pattern
    pub fn has_token(&self, name: &str) -> bool {
        self.placeholders.values().any(|n| n == name)
    }

    /// Map the named groups of a capture back to parameter names.
    ///
    /// Groups that did not participate in the match are left out.
    pub fn captured_params(&self, caps: &regex::Captures<'_>) -> BTreeMap<String, String> {
        self.placeholders
            .iter()
            .filter_map(|(placeholder, name)| {
                caps.name(placeholder)
                    .map(|m| (name.clone(), m.as_str().to_string()))
            })
            .collect()
    }
}

fn translate(
    pattern: &str,
    defaults: &BTreeMap<String, String>,
    route_params: &BTreeMap<String, String>,
    allow_append_slash: bool,
) -> Translation {
    let bytes = pattern.as_bytes();
    let mut replacements = HashMap::new();
    let mut route_replacements = HashMap::new();
    let mut placeholders = BTreeMap::new();
    let mut param_rules = BTreeMap::new();
    let mut required_part = pattern.to_string();
    let mut old_offset = 0;
    let mut append_slash = false;

    for caps in PATTERN_TOKEN.captures_iter(pattern) {
        let Some(token) = caps.get(0) else { continue };
        let name = &caps[1];
        let subpattern = caps.get(2).map_or(DEFAULT_SUBPATTERN, |m| m.as_str());
        let placeholder = placeholder_for(name);
        placeholders.insert(placeholder.clone(), name.to_string());

        if defaults.contains_key(name) {
            let offset = token.start();
            let end = token.end();
            required_part = required_part.replace(&format!("/{}/", token.as_str()), "//");

            if allow_append_slash
                && (append_slash || offset == 1)
                && offset == old_offset + 1
                && bytes.get(end) == Some(&b'/')
                && end + 1 < bytes.len()
            {
                // Leading run of optional parameters: each one takes its trailing slash.
                append_slash = true;
                replacements.insert(
                    format!("<{}>/", name),
                    format!("((?P<{}>{})/)?", placeholder, subpattern),
                );
            } else if offset > 1
                && bytes[offset - 1] == b'/'
                && bytes.get(end).map_or(true, |b| *b == b'/')
            {
                append_slash = false;
                replacements.insert(
                    format!("/<{}>", name),
                    format!("(/(?P<{}>{}))?", placeholder, subpattern),
                );
            }
            replacements.insert(
                format!("<{}>", name),
                format!("(?P<{}>{})?", placeholder, subpattern),
            );
            old_offset = end;
        } else {
            append_slash = false;
            replacements.insert(
                format!("<{}>", name),
                format!("(?P<{}>{})", placeholder, subpattern),
            );
        }

        if route_params.contains_key(name) {
            route_replacements.insert(
                format!("<{}>", name),
                format!("(?P<{}>{})", placeholder, subpattern),
            );
        } else {
            param_rules.insert(name.to_string(), ParamRule::from_subpattern(name, subpattern));
        }
    }

    Translation {
        replacements,
        route_replacements,
        placeholders,
        param_rules,
        only_optional: allow_append_slash && required_part.trim_matches('/').is_empty(),
    }
}

fn compile_regex(source: &str, origin: &str) -> Option<Regex> {
    match Regex::new(source) {
        Ok(regex) => Some(regex),
        Err(err) => {
            warn_log!(
                "URL pattern '{}' compiled to an invalid regex '{}': {}",
                origin,
                source,
                err
            );
            None
        }
    }
}

/// Part of `pattern` up to the first slash at or after `from`.
fn host_prefix(pattern: &str, from: usize) -> String {
    match pattern[from..].find('/') {
        Some(pos) => pattern[..from + pos].to_string(),
        None => pattern.to_string(),
    }
}

fn escape_table() -> HashMap<String, String> {
    ESCAPED
        .iter()
        .map(|c| (c.to_string(), format!("\\{}", c)))
        .collect()
}

// ============================================================================
// String Helpers
// ============================================================================

/// Group name standing in for a parameter name inside regexes.
///
/// Starts with a letter because group names cannot start with a digit.
pub fn placeholder_for(name: &str) -> String {
    format!("a{:08x}", crc32(name.as_bytes()))
}

/// CRC-32 (IEEE 802.3, reflected), as produced by `crc32b`.
pub fn crc32(bytes: &[u8]) -> u32 {
    let mut crc = !0u32;
    for &byte in bytes {
        crc ^= u32::from(byte);
        for _ in 0..8 {
            let mask = (crc & 1).wrapping_neg();
            crc = (crc >> 1) ^ (0xEDB8_8320 & mask);
        }
    }
    !crc
}

/// Trim slashes on both ends, keeping a leading `//` (protocol-relative marker).
pub fn trim_slashes(value: &str) -> String {
    if value.starts_with("//") {
        format!("//{}", value.trim_matches('/'))
    } else {
        value.trim_matches('/').to_string()
    }
}

/// Replace runs of slashes with a single slash.
pub fn collapse_slashes(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut previous_slash = false;
    for c in value.chars() {
        if c == '/' {
            if !previous_slash {
                out.push(c);
            }
            previous_slash = true;
        } else {
            out.push(c);
            previous_slash = false;
        }
    }
    out
}

/// Single-pass substitution, longest key first at every position.
///
/// Replaced text is never scanned again, so a value containing another key is
/// copied through unchanged.
pub fn strtr(subject: &str, replacements: &HashMap<String, String>) -> String {
    let mut pairs: Vec<(&str, &str)> = replacements
        .iter()
        .filter(|(key, _)| !key.is_empty())
        .map(|(key, value)| (key.as_str(), value.as_str()))
        .collect();
    pairs.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

    let mut out = String::with_capacity(subject.len());
    let mut rest = subject;
    'scan: while let Some(c) = rest.chars().next() {
        for (key, value) in &pairs {
            if let Some(tail) = rest.strip_prefix(key) {
                out.push_str(value);
                rest = tail;
                continue 'scan;
            }
        }
        out.push(c);
        rest = &rest[c.len_utf8()..];
    }
    out
}

// ============================================================================
// Tests
// ============================================================================
