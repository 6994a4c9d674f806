//! Route parameters and query string building
//!
//! [`RouteParams`] is the parameter bag passed to URL creation and returned by
//! request parsing. Values are usually scalars; lists and maps are allowed so that
//! left-over parameters can be rendered as `tag[0]=a&tag[1]=b` query strings.

use std::collections::BTreeMap;
use std::fmt;

/// A single parameter value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    /// Plain string value
    Scalar(String),
    /// Indexed list, rendered as `key[0]=…&key[1]=…`
    List(Vec<ParamValue>),
    /// Keyed map, rendered as `key[sub]=…`
    Map(BTreeMap<String, ParamValue>),
}

impl ParamValue {
    /// Get the value as a string slice if it is a scalar
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Scalar(value) => Some(value),
            _ => None,
        }
    }

    /// Check if the value is a list or a map
    pub fn is_array(&self) -> bool {
        !matches!(self, ParamValue::Scalar(_))
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Scalar(value) => f.write_str(value),
            ParamValue::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            ParamValue::Map(entries) => {
                f.write_str("{")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", key, value)?;
                }
                f.write_str("}")
            }
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Scalar(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Scalar(value)
    }
}

impl From<&String> for ParamValue {
    fn from(value: &String) -> Self {
        ParamValue::Scalar(value.clone())
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Scalar(if value { "1" } else { "0" }.to_string())
    }
}

macro_rules! scalar_from_number {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for ParamValue {
                fn from(value: $ty) -> Self {
                    ParamValue::Scalar(value.to_string())
                }
            }
        )*
    };
}

scalar_from_number!(i32, i64, u32, u64, usize, f64);

impl<T: Into<ParamValue>> From<Vec<T>> for ParamValue {
    fn from(items: Vec<T>) -> Self {
        ParamValue::List(items.into_iter().map(Into::into).collect())
    }
}

/// Route parameters
///
/// Keys are kept sorted so generated query strings are deterministic.
///
/// # Example
///
/// ```
/// use url_rules::RouteParams;
///
/// let params = RouteParams::new().with("id", 123).with("page", "2");
///
/// assert_eq!(params.get("id"), Some("123"));
/// assert_eq!(params.get_as::<i32>("id"), Some(123));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteParams {
    params: BTreeMap<String, ParamValue>,
}

impl RouteParams {
    /// Create new empty route params
    pub fn new() -> Self {
        Self::default()
    }

    /// Create from a map of values
    pub fn from_map(params: BTreeMap<String, ParamValue>) -> Self {
        Self { params }
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Get a scalar parameter as a string
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key)?.as_str()
    }

    /// Get a parameter value of any shape
    pub fn get_value(&self, key: &str) -> Option<&ParamValue> {
        self.params.get(key)
    }

    /// Get a parameter and parse it as a specific type
    ///
    /// Returns `None` if the parameter doesn't exist, is not a scalar or cannot be parsed.
    pub fn get_as<T>(&self, key: &str) -> Option<T>
    where
        T: std::str::FromStr,
    {
        self.get(key)?.parse().ok()
    }

    /// Insert a parameter, replacing any previous value
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) {
        self.params.insert(key.into(), value.into());
    }

    /// Remove a parameter
    pub fn remove(&mut self, key: &str) -> Option<ParamValue> {
        self.params.remove(key)
    }

    /// Check if parameter exists
    pub fn contains(&self, key: &str) -> bool {
        self.params.contains_key(key)
    }

    /// Iterate over parameter names
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.params.keys()
    }

    /// Iterate over all parameters
    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamValue)> {
        self.params.iter()
    }

    /// Check if parameters are empty
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Get number of parameters
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Render the parameters as a query string (without the leading `?`)
    pub fn to_query_string(&self) -> String {
        build_query(self)
    }
}

impl<K, V> FromIterator<(K, V)> for RouteParams
where
    K: Into<String>,
    V: Into<ParamValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = RouteParams::new();
        for (key, value) in iter {
            params.insert(key, value);
        }
        params
    }
}

// ============================================================================
// Query String Building
// ============================================================================

/// Build a form-encoded query string from the parameters.
///
/// Nested values use bracketed keys, which are encoded as well.
pub fn build_query(params: &RouteParams) -> String {
    let mut pairs = Vec::new();
    for (key, value) in params.iter() {
        push_pairs(&mut pairs, key.clone(), value);
    }
    pairs.join("&")
}

fn push_pairs(pairs: &mut Vec<String>, key: String, value: &ParamValue) {
    match value {
        ParamValue::Scalar(value) => {
            pairs.push(format!("{}={}", form_encode(&key), form_encode(value)));
        }
        ParamValue::List(items) => {
            for (i, item) in items.iter().enumerate() {
                push_pairs(pairs, format!("{}[{}]", key, i), item);
            }
        }
        ParamValue::Map(entries) => {
            for (sub, item) in entries {
                push_pairs(pairs, format!("{}[{}]", key, sub), item);
            }
        }
    }
}

/// Form-encode a value: percent-encoding with spaces as `+` and `~` as `%7E`.
pub fn form_encode(value: &str) -> String {
    urlencoding::encode(value)
        .replace("%20", "+")
        .replace('~', "%7E")
}

/// Decode a form-encoded path (`+` is a space), leaving it untouched if it is
/// not valid UTF-8.
pub(crate) fn decode_path(value: &str) -> String {
    let value = value.replace('+', " ");
    match urlencoding::decode(&value) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => value,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_params_basic() {
        let mut params = RouteParams::new();
        params.insert("id", "123");

        assert_eq!(params.get("id"), Some("123"));
        assert!(params.contains("id"));
        assert!(!params.contains("missing"));
    }

    #[test]
    fn test_route_params_get_as() {
        let params = RouteParams::new().with("id", 123).with("active", true);

        assert_eq!(params.get_as::<i32>("id"), Some(123));
        assert_eq!(params.get_as::<u32>("id"), Some(123));
        assert_eq!(params.get("active"), Some("1"));
        assert_eq!(params.get_as::<i32>("missing"), None);
    }

    #[test]
    fn test_array_values_are_not_scalars() {
        let params = RouteParams::new().with("tag", vec!["a", "b"]);

        assert_eq!(params.get("tag"), None);
        assert!(params.get_value("tag").is_some_and(ParamValue::is_array));
    }

    #[test]
    fn test_remove_and_len() {
        let mut params: RouteParams = [("a", "1"), ("b", "2")].into_iter().collect();
        assert_eq!(params.len(), 2);

        assert_eq!(params.remove("a"), Some(ParamValue::from("1")));
        assert_eq!(params.len(), 1);
        assert!(!params.is_empty());
    }

    #[test]
    fn test_query_string_is_sorted() {
        let params = RouteParams::new().with("sort", "name").with("page", 1);
        assert_eq!(build_query(&params), "page=1&sort=name");
    }

    #[test]
    fn test_query_string_nested_values() {
        let mut filter = BTreeMap::new();
        filter.insert("status".to_string(), ParamValue::from("open"));

        let params = RouteParams::new()
            .with("tag", vec!["rust", "web"])
            .with("filter", ParamValue::Map(filter));

        assert_eq!(
            params.to_query_string(),
            "filter%5Bstatus%5D=open&tag%5B0%5D=rust&tag%5B1%5D=web"
        );
    }

    #[test]
    fn test_form_encode() {
        assert_eq!(form_encode("hello world"), "hello+world");
        assert_eq!(form_encode("a/b&c"), "a%2Fb%26c");
        assert_eq!(form_encode("plain-text_1.0"), "plain-text_1.0");
        assert_eq!(form_encode("~user"), "%7Euser");
    }

    #[test]
    fn test_decode_path() {
        assert_eq!(decode_path("post/hello%20world"), "post/hello world");
        assert_eq!(decode_path("caf%C3%A9"), "café");
        assert_eq!(decode_path("tag/a+b%2Bc%26d"), "tag/a b+c&d");
    }

    #[test]
    fn test_display() {
        let value = ParamValue::from(vec!["a", "b"]);
        assert_eq!(value.to_string(), "[a, b]");
    }
}
