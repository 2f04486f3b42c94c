use super::*;
use serde_json::json;

#[test]
fn deferred_without_group_uses_default() {
    let prop = Prop::value("x").deferred("");
    assert_eq!(prop.deferred.as_deref(), Some(DEFAULT_DEFERRED_GROUP));
    assert_eq!(prop.kind(), &PropKind::Plain);
}

#[test]
fn deferred_keeps_named_group() {
    let prop = Prop::value("x").deferred("stats");
    assert_eq!(prop.deferred.as_deref(), Some("stats"));
}

#[test]
fn merge_variants_map_to_strategies() {
    assert_eq!(Prop::value(json!([])).merge().kind(), &PropKind::Merge(MergeStrategy::Append));
    assert_eq!(Prop::value(json!([])).prepend().kind(), &PropKind::Merge(MergeStrategy::Prepend));
    assert_eq!(Prop::value(json!({})).deep_merge().kind(), &PropKind::Merge(MergeStrategy::Deep));
}

#[test]
fn once_options_accumulate() {
    let prop = Prop::value("Pro").once_key("plan_v1").expires_at(1_700_000_000_000);
    let once = prop.once.expect("once spec");
    assert_eq!(once.key.as_deref(), Some("plan_v1"));
    assert_eq!(once.expires_at, Some(1_700_000_000_000));
    assert_eq!(prop.kind, PropKind::Plain);
}

#[test]
fn once_composes_with_kind() {
    let prop = Prop::value("x").deferred("default").once();
    assert!(prop.once.is_some());
    assert_eq!(prop.deferred.as_deref(), Some("default"));
}

#[test]
fn deferred_composes_with_merge_in_either_order() {
    let deferred_first = Prop::value(json!([])).deferred("feed").merge();
    let merge_first = Prop::value(json!([])).merge().deferred("feed");
    for prop in [deferred_first, merge_first] {
        assert_eq!(prop.deferred.as_deref(), Some("feed"));
        assert_eq!(prop.kind(), &PropKind::Merge(MergeStrategy::Append));
    }
}

#[test]
fn json_serializes_structs() {
    #[derive(serde::Serialize)]
    struct Item {
        label: &'static str,
    }
    let prop = Prop::json(&[Item { label: "Home" }]).expect("serialize");
    let PropSource::Value(value) = prop.source else {
        panic!("expected eager value");
    };
    assert_eq!(value, json!([{"label": "Home"}]));
}

#[tokio::test]
async fn lazy_prop_evaluates_with_request() {
    let prop = LazyProp::new(|req: &RequestInfo| {
        let path = req.uri.path().to_owned();
        async move { Ok(json!(path)) }
    });
    let req = RequestInfo::for_test(axum::http::Method::GET, "/users?page=2");
    assert_eq!(prop.evaluate(&req).await.unwrap(), json!("/users"));
}

#[test]
fn props_builder_orders_keys() {
    let props = Props::new().with("b", 2_i64).with("a", "one");
    assert_eq!(props.keys().collect::<Vec<_>>(), vec!["a", "b"]);
    assert!(props.contains_key("a"));
}

#[test]
fn props_extend_overrides() {
    let mut base = Props::new().with("title", "Old");
    base.extend(Props::new().with("title", "New"));
    let PropSource::Value(value) = &base.get("title").expect("title").source else {
        panic!("expected eager value");
    };
    assert_eq!(value, &json!("New"));
}
