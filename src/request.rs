//! Request context consumed by rules

use crate::params::decode_path;

/// What a rule needs to know about an incoming request
pub trait RequestContext {
    /// Upper-case HTTP method
    fn method(&self) -> &str;
    /// Decoded path after the entry script, without leading slash or query string
    fn path_info(&self) -> &str;
    /// Scheme and host, e.g. `http://example.com`
    fn host_info(&self) -> &str;
}

/// A plain request value
///
/// # Example
///
/// ```
/// use url_rules::{Request, RequestContext};
///
/// let request =
///     Request::from_request_uri("get", "http://example.com", "/post/hello%20world?page=2");
/// assert_eq!(request.method(), "GET");
/// assert_eq!(request.path_info(), "post/hello world");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    method: String,
    path_info: String,
    host_info: String,
}

impl Request {
    /// Host info used when none is given
    pub const DEFAULT_HOST_INFO: &'static str = "http://localhost";

    /// Create a request with the given method and path info
    pub fn new(method: impl Into<String>, path_info: impl Into<String>) -> Self {
        Self {
            method: method.into().to_ascii_uppercase(),
            path_info: path_info.into(),
            host_info: Self::DEFAULT_HOST_INFO.to_string(),
        }
    }

    /// Create a GET request
    pub fn get(path_info: impl Into<String>) -> Self {
        Self::new("GET", path_info)
    }

    /// Create a POST request
    pub fn post(path_info: impl Into<String>) -> Self {
        Self::new("POST", path_info)
    }

    /// Build a request from a raw request URI.
    ///
    /// The query string and fragment are dropped, the leading slash is removed and
    /// the path is percent-decoded.
    pub fn from_request_uri(
        method: impl Into<String>,
        host_info: impl Into<String>,
        uri: &str,
    ) -> Self {
        let path = uri
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .trim_start_matches('/');
        Self::new(method, decode_path(path)).with_host_info(host_info)
    }

    /// Set the host info
    pub fn with_host_info(mut self, host_info: impl Into<String>) -> Self {
        self.host_info = host_info.into().trim_end_matches('/').to_string();
        self
    }
}

impl RequestContext for Request {
    fn method(&self) -> &str {
        &self.method
    }

    fn path_info(&self) -> &str {
        &self.path_info
    }

    fn host_info(&self) -> &str {
        &self.host_info
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults() {
        let request = Request::get("post/view");
        assert_eq!(request.method(), "GET");
        assert_eq!(request.path_info(), "post/view");
        assert_eq!(request.host_info(), "http://localhost");
    }

    #[test]
    fn test_method_is_upper_cased() {
        assert_eq!(Request::new("patch", "").method(), "PATCH");
    }

    #[test]
    fn test_from_request_uri() {
        let request = Request::from_request_uri("GET", "https://example.com/", "/a/b%2Fc/?x=1#top");
        assert_eq!(request.path_info(), "a/b/c/");
        assert_eq!(request.host_info(), "https://example.com");
    }
}
