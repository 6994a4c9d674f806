//! Integration tests for url-rules
//!
//! These tests verify complete parse/create workflows through rules and the
//! manager, including suffixes, hosts, verbs, defaults and configuration.

use std::sync::Arc;
use std::thread;
use url_rules::*;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn rule(config: RuleConfig) -> UrlRule {
    UrlRule::new(config).expect("valid rule")
}

fn params(pairs: &[(&str, &str)]) -> RouteParams {
    pairs.iter().copied().collect()
}

fn parsed(outcome: Option<ParseOutcome>) -> ParsedRoute {
    outcome
        .and_then(ParseOutcome::into_route)
        .expect("request should resolve")
}

// ============================================================================
// Example Scenarios
// ============================================================================

#[test]
fn test_controller_action_scenario() {
    init_logging();
    let manager = UrlManager::new();
    let r = rule(RuleConfig::new(
        r"<controller:\w+>/<action:\w+>",
        "<controller>/<action>",
    ));

    let result = parsed(r.parse_request(&manager, &Request::get("post/view")));
    assert_eq!(result.route, "post/view");
    assert!(result.params.is_empty());

    assert_eq!(
        r.create_url(&manager, "post/view", &RouteParams::new()),
        CreateUrlResult::Success("post/view".to_string())
    );
}

#[test]
fn test_optional_id_scenario() {
    init_logging();
    let manager = UrlManager::new();
    let r = rule(RuleConfig::new(r"post/<id:\d+>", "post/view").with_default("id", ""));

    let result = parsed(r.parse_request(&manager, &Request::get("post")));
    assert_eq!(result.route, "post/view");
    assert_eq!(result.params, params(&[("id", "")]));

    assert_eq!(
        r.create_url(&manager, "post/view", &params(&[("id", "5")])).url(),
        Some("post/5")
    );
}

// ============================================================================
// Properties
// ============================================================================

#[test]
fn test_round_trip() {
    init_logging();
    let manager = UrlManager::new().suffix(".html");
    let cases: Vec<(RuleConfig, &str, RouteParams)> = vec![
        (
            RuleConfig::new(r"post/<year:\d{4}>/<tag>", "post/index"),
            "post/index",
            params(&[("year", "2024"), ("tag", "rust")]),
        ),
        (
            RuleConfig::new(r"post/<id:\d+>", "post/view").with_default("id", ""),
            "post/view",
            params(&[("id", "17")]),
        ),
        (
            RuleConfig::new(r"<controller:\w+>/<action:\w+>", "<controller>/<action>")
                .with_default("action", "index"),
            "user/edit",
            RouteParams::new(),
        ),
        (
            RuleConfig::new("<lang:en|fr>/<page>/docs", "doc/index")
                .with_default("lang", "en")
                .with_default("page", "intro"),
            "doc/index",
            params(&[("lang", "fr"), ("page", "setup")]),
        ),
        (
            RuleConfig::new("archive/<user.name>", "archive/user").suffix("/"),
            "archive/user",
            params(&[("user.name", "alice")]),
        ),
    ];

    for (config, route, input) in cases {
        let r = rule(config);
        let url = r
            .create_url(&manager, route, &input)
            .into_url()
            .unwrap_or_else(|| panic!("{} should create a URL", r));
        let result = parsed(r.parse_request(&manager, &Request::get(url.clone())));

        assert_eq!(result.route, route, "route of {}", url);
        for (name, value) in input.iter() {
            assert_eq!(result.params.get_value(name), Some(value), "{} of {}", name, url);
        }
    }
}

#[test]
fn test_round_trip_with_host() {
    init_logging();
    let manager = UrlManager::new();
    let r = rule(RuleConfig::new(
        "http://<user:\\w+>.example.com/<lang:en|de>/profile",
        "user/profile",
    ));
    let input = params(&[("user", "bob"), ("lang", "de")]);

    let url = r.create_url(&manager, "user/profile", &input).into_url().unwrap();
    assert_eq!(url, "http://bob.example.com/de/profile");

    let (host_info, path_info) = url.split_at(url.find("/de").unwrap());
    let request = Request::get(path_info.trim_start_matches('/')).with_host_info(host_info);
    let result = parsed(r.parse_request(&manager, &request));
    assert_eq!(result.route, "user/profile");
    assert_eq!(result.params, input);
}

#[test]
fn test_optional_parameter_boundary() {
    let manager = UrlManager::new();
    let r = rule(RuleConfig::new(r"post/<id:\d+>", "post/view").with_default("id", ""));

    assert_eq!(
        parsed(r.parse_request(&manager, &Request::get("post"))).params.get("id"),
        Some("")
    );
    assert_eq!(
        parsed(r.parse_request(&manager, &Request::get("post/5"))).params.get("id"),
        Some("5")
    );
    assert_eq!(r.create_url(&manager, "post/view", &RouteParams::new()).url(), Some("post"));
    assert_eq!(
        r.create_url(&manager, "post/view", &params(&[("id", "5")])).url(),
        Some("post/5")
    );
}

#[test]
fn test_suffix_boundary() {
    let manager = UrlManager::new().suffix(".html");
    let index = rule(RuleConfig::new("index", "site/index"));
    let home = rule(RuleConfig::new("", "site/home"));

    assert_eq!(
        parsed(index.parse_request(&manager, &Request::get("index.html"))).route,
        "site/index"
    );
    assert!(home.parse_request(&manager, &Request::get(".html")).is_none());
    assert!(index.parse_request(&manager, &Request::get(".html")).is_none());
}

#[test]
fn test_host_constraint() {
    let manager = UrlManager::new();
    let r = rule(RuleConfig::new(
        "http://admin.example.com/<controller>",
        "<controller>/index",
    ));

    let request = Request::get("post").with_host_info("http://www.example.com");
    assert!(r.parse_request(&manager, &request).is_none());

    let request = Request::get("post").with_host_info("HTTP://ADMIN.EXAMPLE.COM");
    let result = parsed(r.parse_request(&manager, &request));
    assert_eq!(result.route, "post/index");

    assert_eq!(
        r.create_url(&manager, "post/index", &RouteParams::new()).url(),
        Some("http://admin.example.com/post")
    );
}

#[test]
fn test_verb_restriction() {
    let manager = UrlManager::new();
    let r = rule(RuleConfig::new(r"post/<id:\d+>", "post/update").verb(["POST"]));

    assert!(r.parse_request(&manager, &Request::get("post/5")).is_none());
    assert!(r.parse_request(&manager, &Request::post("post/5")).is_some());
    assert_eq!(
        r.create_url(&manager, "post/update", &params(&[("id", "5")])).url(),
        Some("post/5")
    );
}

#[test]
fn test_default_collapse() {
    let manager = UrlManager::new();
    let r = rule(
        RuleConfig::new(r"<controller:\w+>/<action:\w+>", "<controller>/<action>")
            .with_default("action", "index"),
    );

    let url = r.create_url(&manager, "post/index", &RouteParams::new()).into_url().unwrap();
    assert_eq!(url, "post");

    let result = parsed(r.parse_request(&manager, &Request::get(url)));
    assert_eq!(result.route, "post/index");
}

#[test]
fn test_unconstrained_parameter_pass_through() {
    let manager = UrlManager::new();
    let r = rule(RuleConfig::new(r"<controller:\w+>/<action:\w+>", "<controller>/<action>"));

    assert_eq!(
        r.create_url(&manager, "post/view", &params(&[("id", "5"), ("sort", "-date")]))
            .url(),
        Some("post/view?id=5&sort=-date")
    );

    let result = parsed(r.parse_request(&manager, &Request::get("post/view")));
    assert!(!result.params.contains("controller"));
    assert!(!result.params.contains("action"));
}

// ============================================================================
// Manager Tests
// ============================================================================

#[test]
fn test_manager_workflow() {
    init_logging();
    let mut manager = UrlManager::new().base_url("/app").suffix(".html");
    manager.add_shorthand("", "site/index").unwrap();
    manager.add_shorthand(r"PUT,PATCH post/<id:\d+>", "post/update").unwrap();
    manager
        .add_rule_config(RuleConfig::new(r"post/<id:\d+>", "post/view"))
        .unwrap();
    manager
        .add_group(
            GroupConfig::new("admin")
                .shorthand("", "dashboard/index")
                .shorthand(r"<controller:\w+>", "<controller>/index"),
        )
        .unwrap();

    assert_eq!(parsed(manager.parse_request(&Request::get(""))).route, "site/index");
    assert_eq!(
        parsed(manager.parse_request(&Request::new("PATCH", "post/3.html"))).route,
        "post/update"
    );
    assert_eq!(
        parsed(manager.parse_request(&Request::get("admin/user.html"))).route,
        "admin/user/index"
    );

    assert_eq!(manager.create_url("site/index", &RouteParams::new()), "/app/");
    assert_eq!(
        manager.create_url("post/view", &params(&[("id", "3")])),
        "/app/post/3.html"
    );
    assert_eq!(
        manager.create_url("admin/user/index", &RouteParams::new()),
        "/app/admin/user.html"
    );
    assert_eq!(
        manager.create_absolute_url("post/view", &params(&[("id", "3")])),
        "http://localhost/app/post/3.html"
    );
}

#[test]
fn test_manager_normalizer_redirect() {
    init_logging();
    let mut manager = UrlManager::new().normalizer(UrlNormalizer::new());
    manager
        .add_rule_config(RuleConfig::new(r"post/<id:\d+>", "post/view"))
        .unwrap();

    let outcome = manager.parse_request(&Request::get("post//3/")).unwrap();
    let ParseOutcome::Redirect { target, status } = outcome else {
        panic!("expected a redirect");
    };
    assert_eq!(status, UrlNormalizer::REDIRECT_PERMANENT);
    assert_eq!(manager.create_url(&target.route, &target.params), "/post/3");
}

#[test]
fn test_request_from_uri() {
    let mut manager = UrlManager::new();
    manager.add_shorthand("tag/<name>", "tag/view").unwrap();

    let request = Request::from_request_uri("GET", "http://example.com", "/tag/c%2B%2B?page=2");
    let result = parsed(manager.parse_request(&request));
    assert_eq!(result.params.get("name"), Some("c++"));

    assert_eq!(
        manager.create_url("tag/view", &params(&[("name", "c++")])),
        "/tag/c%2B%2B"
    );
}

#[test]
fn test_round_trip_through_request_uri() {
    let mut manager = UrlManager::new();
    manager.add_shorthand("tag/<name>", "tag/view").unwrap();

    let name = "a b&c+d~e";
    let url = manager.create_url("tag/view", &params(&[("name", name)]));
    assert_eq!(url, "/tag/a+b%26c%2Bd%7Ee");

    let request = Request::from_request_uri("GET", "http://example.com", &url);
    assert_eq!(request.path_info(), "tag/a b&c+d~e");
    let result = parsed(manager.parse_request(&request));
    assert_eq!(result.route, "tag/view");
    assert_eq!(result.params.get("name"), Some(name));
}

#[cfg(feature = "config")]
#[test]
fn test_manager_from_toml() {
    init_logging();
    let manager = UrlManager::from_toml(
        r#"
base_url = "/shop"
strict_parsing = true

[[rules]]
pattern = "product/<slug:[a-z0-9-]+>"
route = "product/view"

[[rules]]
pattern = "catalog/<page:\\d+>"
route = "catalog/index"
defaults = { page = 1 }
"#,
    )
    .unwrap();

    assert_eq!(
        parsed(manager.parse_request(&Request::get("product/red-shoe"))).params.get("slug"),
        Some("red-shoe")
    );
    assert!(manager.parse_request(&Request::get("cart")).is_none());
    assert_eq!(
        manager.create_url("catalog/index", &params(&[("page", "1")])),
        "/shop/catalog"
    );
    assert_eq!(
        manager.create_url("catalog/index", &params(&[("page", "4")])),
        "/shop/catalog/4"
    );
}

#[test]
fn test_configuration_errors() {
    let err = UrlRule::new(RuleConfig::default().name("broken")).unwrap_err();
    assert_eq!(err, ConfigurationError::MissingPattern);

    let mut manager = UrlManager::new();
    let err = manager
        .add_group(GroupConfig::new("api").rule(RuleConfig {
            pattern: Some("users".to_string()),
            ..RuleConfig::default()
        }))
        .unwrap_err();
    assert_eq!(err, ConfigurationError::MissingRoute);
    assert!(manager.rules().is_empty());
}

// ============================================================================
// Concurrency Tests
// ============================================================================

#[test]
fn test_shared_manager_across_threads() {
    init_logging();
    let mut manager = UrlManager::new();
    manager
        .add_rule_config(RuleConfig::new(r"post/<id:\d+>", "post/view"))
        .unwrap();
    manager
        .add_rule_config(RuleConfig::new(r"<controller:\w+>/<action:\w+>", "<controller>/<action>"))
        .unwrap();
    let manager = Arc::new(manager);

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let manager = Arc::clone(&manager);
            thread::spawn(move || {
                for j in 0..50 {
                    let id = (i * 100 + j).to_string();
                    let url = manager.create_url("post/view", &params(&[("id", id.as_str())]));
                    assert_eq!(url, format!("/post/{}", id));

                    let path = url.trim_start_matches('/').to_string();
                    let result = parsed(manager.parse_request(&Request::get(path)));
                    assert_eq!(result.params.get("id"), Some(id.as_str()));

                    // Failed creation on one thread must not affect others.
                    let url = manager.create_url("post/view", &params(&[("id", "abc")]));
                    assert_eq!(url, "/post/view?id=abc");
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("worker thread panicked");
    }

    #[cfg(feature = "cache")]
    assert!(manager.cache_stats().hits > 0);
}
