use super::*;
use serde_json::json;

fn sample_page() -> Page {
    let mut props = Map::new();
    props.insert("title".into(), json!("Home"));
    props.insert("errors".into(), json!({}));
    Page {
        component: "Home".into(),
        props,
        url: "/?tab=1".into(),
        version: "v1".into(),
        deferred_props: BTreeMap::from([("default".into(), vec!["heavy".into()])]),
        ..Page::default()
    }
}

#[test]
fn page_encodes_with_camel_case_and_omits_empty_metadata() {
    let bytes = encode_page(&sample_page());
    let value: Value = serde_json::from_slice(&bytes).expect("valid json");

    assert_eq!(value["component"], "Home");
    assert_eq!(value["url"], "/?tab=1");
    assert_eq!(value["deferredProps"]["default"], json!(["heavy"]));
    assert!(value.get("mergeProps").is_none());
    assert!(value.get("encryptHistory").is_none());
    assert!(value.get("onceProps").is_none());
}

#[test]
fn encode_is_deterministic_for_equal_pages() {
    assert_eq!(encode_page(&sample_page()), encode_page(&sample_page()));
}

#[test]
fn decode_page_accepts_minimal_descriptor() {
    let page = decode_page(br#"{"component":"Users","props":{},"url":"/users","version":""}"#)
        .expect("decode");
    assert_eq!(page.component, "Users");
    assert!(page.deferred_props.is_empty());
}

#[test]
fn decode_page_rejects_missing_component() {
    let err = decode_page(br#"{"props":{}}"#).unwrap_err();
    assert!(matches!(err, WireError::Decode(_)));
}

#[test]
fn once_prop_without_expiry_encodes_null() {
    let cfg = OncePropConfig { prop: "plan".into(), expires_at: None };
    let value = serde_json::to_value(&cfg).expect("serialize");
    assert_eq!(value, json!({"prop": "plan", "expiresAt": null}));
}

#[test]
fn deferred_keys_span_groups() {
    let page = sample_page();
    assert!(page.deferred_keys().contains("heavy"));
    assert!(!page.deferred_keys().contains("title"));
}

#[test]
fn decode_ssr_defaults_missing_fields() {
    let ssr = decode_ssr(br#"{"body":"<div></div>"}"#).expect("decode");
    assert!(ssr.head.is_empty());
    assert_eq!(ssr.body, "<div></div>");
}

#[test]
fn parse_header_list_trims_and_drops_blanks() {
    let set = parse_header_list(" a, b ,,c ").expect("non-empty");
    assert_eq!(set.into_iter().collect::<Vec<_>>(), vec!["a", "b", "c"]);
    assert!(parse_header_list(" , ").is_none());
    assert!(parse_header_list("").is_none());
}

#[test]
fn join_header_list_uses_commas() {
    assert_eq!(join_header_list(["heavy", "stats"]), "heavy,stats");
}

#[test]
fn normalize_accepts_strings_lists_and_bags() {
    let errors = normalize_validation_errors(&json!({
        "email": ["invalid", "taken"],
        "name": "required",
        "login": {"password": "short"},
        "ignored": 42
    }));

    assert_eq!(errors["email"], vec!["invalid", "taken"]);
    assert_eq!(errors["name"], vec!["required"]);
    assert_eq!(errors["password"], vec!["short"]);
    assert!(!errors.contains_key("ignored"));
}

#[test]
fn normalize_non_object_is_empty() {
    assert!(normalize_validation_errors(&json!(["x"])).is_empty());
    assert!(normalize_validation_errors(&Value::Null).is_empty());
}

#[test]
fn flatten_keeps_first_message() {
    let errors = ValidationErrors::from([
        ("email".into(), vec!["invalid".into(), "taken".into()]),
        ("name".into(), vec![]),
    ]);
    let flat = flatten_validation_errors(&errors);
    assert_eq!(flat.get("email").map(String::as_str), Some("invalid"));
    assert!(!flat.contains_key("name"));
}
