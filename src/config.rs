//! Manager configuration from TOML
//!
//! ```toml
//! suffix = ".html"
//! strict_parsing = true
//!
//! [normalizer]
//! action = "redirect_temporary"
//!
//! [[rules]]
//! pattern = "post/<id:\\d+>"
//! route = "post/view"
//! defaults = { id = "" }
//! ```
//!
//! Entries of `rules` may also be `["VERB pattern", "route"]` pairs or group
//! tables with `prefix`, `route_prefix` and their own `rules`. Default values
//! may be strings, integers, floats or booleans (`true` is `"1"`, `false` is `"0"`).

use crate::error::ConfigurationError;
use crate::group::GroupConfig;
use crate::manager::UrlManager;
use crate::normalizer::UrlNormalizer;
use crate::rule::{NormalizerSetting, RuleConfig};
use crate::{debug_log, info_log};
use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

/// Manager settings and rules
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ManagerConfig {
    pub suffix: String,
    pub strict_parsing: bool,
    pub base_url: String,
    pub host_info: Option<String>,
    /// A normalizer table, or `false` for none
    pub normalizer: NormalizerSetting,
    pub cache_capacity: Option<usize>,
    pub rules: Vec<RuleEntry>,
}

/// One entry of a rule list
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RuleEntry {
    /// `["VERB pattern", "route"]`
    Shorthand(String, String),
    /// A rule group
    Group(GroupEntry),
    /// A full rule table
    Rule(RuleConfig),
}

/// A rule group table
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GroupEntry {
    #[serde(default)]
    pub prefix: String,
    #[serde(default)]
    pub route_prefix: Option<String>,
    pub rules: Vec<GroupMember>,
}

/// A rule inside a group table
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum GroupMember {
    Shorthand(String, String),
    Rule(RuleConfig),
}

impl From<GroupMember> for RuleConfig {
    fn from(member: GroupMember) -> Self {
        match member {
            GroupMember::Shorthand(key, route) => RuleConfig::shorthand(&key, route),
            GroupMember::Rule(rule) => rule,
        }
    }
}

impl From<GroupEntry> for GroupConfig {
    fn from(entry: GroupEntry) -> Self {
        GroupConfig {
            prefix: entry.prefix,
            route_prefix: entry.route_prefix,
            rules: entry.rules.into_iter().map(RuleConfig::from).collect(),
        }
    }
}

impl ManagerConfig {
    /// Parse a TOML document
    pub fn from_toml(source: &str) -> Result<Self, ConfigurationError> {
        Ok(toml::from_str(source)?)
    }

    /// Read and parse a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|err| ConfigurationError::Parse(format!("{}: {}", path.display(), err)))?;
        Self::from_toml(&source)
    }
}

impl UrlManager {
    /// Build a manager and all its rules from configuration
    pub fn from_config(config: ManagerConfig) -> Result<Self, ConfigurationError> {
        let mut manager = UrlManager::new()
            .suffix(config.suffix)
            .strict_parsing(config.strict_parsing)
            .base_url(config.base_url);
        if let Some(host_info) = config.host_info {
            manager = manager.host_info(host_info);
        }
        match config.normalizer {
            NormalizerSetting::Inherit | NormalizerSetting::Disabled => {}
            NormalizerSetting::Enabled(normalizer) => {
                manager = manager.normalizer((*normalizer).clone());
            }
            NormalizerSetting::Unsupported(raw) => {
                return Err(ConfigurationError::InvalidNormalizer(raw));
            }
        }
        #[cfg(feature = "cache")]
        if let Some(capacity) = config.cache_capacity {
            manager = manager.cache_capacity(capacity);
        }

        let count = config.rules.len();
        for entry in config.rules {
            match entry {
                RuleEntry::Shorthand(key, route) => manager.add_shorthand(&key, route)?,
                RuleEntry::Group(group) => manager.add_group(group.into())?,
                RuleEntry::Rule(rule) => manager.add_rule_config(rule)?,
            }
        }

        info_log!("URL manager configured with {} rule entries", count);
        Ok(manager)
    }

    /// Build a manager from a TOML document
    pub fn from_toml(source: &str) -> Result<Self, ConfigurationError> {
        Self::from_config(ManagerConfig::from_toml(source)?)
    }
}

// ============================================================================
// Value Helpers
// ============================================================================

#[derive(Deserialize)]
#[serde(untagged)]
enum ScalarValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl From<ScalarValue> for String {
    fn from(value: ScalarValue) -> Self {
        match value {
            ScalarValue::Bool(true) => "1".to_string(),
            ScalarValue::Bool(false) => "0".to_string(),
            ScalarValue::Int(value) => value.to_string(),
            ScalarValue::Float(value) => value.to_string(),
            ScalarValue::Text(value) => value,
        }
    }
}

/// Read a table of default values, turning scalars into strings.
pub(crate) fn deserialize_defaults<'de, D>(
    deserializer: D,
) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, ScalarValue>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|(name, value)| (name, String::from(value)))
        .collect())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawNormalizer {
    Flag(bool),
    Table(UrlNormalizer),
    Text(String),
    Other(IgnoredAny),
}

impl<'de> Deserialize<'de> for NormalizerSetting {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let setting = match RawNormalizer::deserialize(deserializer)? {
            RawNormalizer::Flag(false) => NormalizerSetting::Disabled,
            RawNormalizer::Flag(true) => NormalizerSetting::Unsupported("true".to_string()),
            RawNormalizer::Table(normalizer) => NormalizerSetting::Enabled(Arc::new(normalizer)),
            RawNormalizer::Text(text) => NormalizerSetting::Unsupported(text),
            RawNormalizer::Other(_) => {
                NormalizerSetting::Unsupported("unsupported value".to_string())
            }
        };
        debug_log!("Read normalizer setting {:?}", setting);
        Ok(setting)
    }
}

// ============================================================================
// Tests
// ============================================================================
