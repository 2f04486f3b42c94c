use super::*;
use axum::http::{HeaderValue, Method};

fn request(headers: &[(&'static str, &'static str)]) -> RequestInfo {
    let mut info = RequestInfo::for_test(Method::GET, "/");
    for (name, value) in headers {
        info.headers.insert(*name, HeaderValue::from_static(value));
    }
    info
}

#[test]
fn full_render_includes_everything() {
    let cfg = PartialConfig::from_request(&request(&[]), "Home", None);
    assert!(!cfg.is_partial());
    assert!(cfg.should_include("heavy"));
    assert!(!cfg.explicitly_included("heavy"));
}

#[test]
fn only_applies_when_component_matches() {
    let headers = [("x-inertia-partial-component", "Users"), ("x-inertia-partial-data", "heavy")];
    let cfg = PartialConfig::from_request(&request(&headers), "Home", None);
    assert!(!cfg.is_partial());
    assert!(cfg.should_include("title"));
}

#[test]
fn only_filters_and_forces_reserved_props() {
    let headers = [("x-inertia-partial-component", "Home"), ("x-inertia-partial-data", "heavy, plan")];
    let cfg = PartialConfig::from_request(&request(&headers), "Home", Some("csrf_token"));
    assert!(cfg.should_include("heavy"));
    assert!(cfg.explicitly_included("plan"));
    assert!(!cfg.should_include("title"));
    assert!(cfg.should_include("errors"));
    assert!(cfg.should_include("flash"));
    assert!(cfg.should_include("csrf_token"));
}

#[test]
fn except_wins_over_only() {
    let headers = [
        ("x-inertia-partial-component", "Home"),
        ("x-inertia-partial-data", "heavy"),
        ("x-inertia-partial-except", "title"),
    ];
    let cfg = PartialConfig::from_request(&request(&headers), "Home", None);
    assert!(!cfg.should_include("title"));
    assert!(cfg.should_include("heavy"));
    assert!(!cfg.explicitly_included("heavy"));
}

#[test]
fn once_skip_respects_explicit_include() {
    let headers = [
        ("x-inertia-except-once-props", "plan_v1"),
        ("x-inertia-partial-component", "Home"),
        ("x-inertia-partial-data", "plan"),
    ];
    let cfg = PartialConfig::from_request(&request(&headers), "Home", None);
    assert!(!cfg.should_skip_once("plan_v1", "plan"));

    let cfg = PartialConfig::from_request(&request(&[("x-inertia-except-once-props", "plan_v1")]), "Home", None);
    assert!(cfg.should_skip_once("plan_v1", "plan"));
    assert!(!cfg.should_skip_once("other", "other"));
}

#[test]
fn reset_and_scroll_intent() {
    let headers = [("x-inertia-reset", "users"), ("x-inertia-infinite-scroll-merge-intent", " Prepend ")];
    let cfg = PartialConfig::from_request(&request(&headers), "Users", None);
    assert!(cfg.is_reset("users"));
    assert!(!cfg.is_reset("posts"));
    assert!(cfg.prepend_scroll());
}
