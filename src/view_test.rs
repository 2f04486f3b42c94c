use super::*;
use crate::markup::Slot;
use crate::registry::{PageComponent, PageRegistryBuilder};
use serde_json::json;
use std::sync::Mutex;

type Handler = Box<dyn Fn(&VisitRequest) -> VisitResponse + Send + Sync>;

struct FakeTransport {
    handler: Handler,
    seen: Mutex<Vec<VisitRequest>>,
}

impl FakeTransport {
    fn new(handler: impl Fn(&VisitRequest) -> VisitResponse + Send + Sync + 'static) -> Self {
        Self { handler: Box::new(handler), seen: Mutex::new(Vec::new()) }
    }

    fn seen(&self) -> Vec<VisitRequest> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Transport for FakeTransport {
    async fn send(&self, request: VisitRequest) -> Result<VisitResponse, TransportError> {
        let response = (self.handler)(&request);
        self.seen.lock().unwrap().push(request);
        Ok(response)
    }
}

fn page_response(component: &str, props: Value) -> VisitResponse {
    let page = Page {
        component: component.to_owned(),
        props: props.as_object().cloned().unwrap(),
        url: "/".to_owned(),
        version: "1".to_owned(),
        ..Page::default()
    };
    VisitResponse { status: 200, headers: Vec::new(), body: wire::encode_page(&page) }
}

fn status(code: u16) -> VisitResponse {
    VisitResponse { status: code, ..VisitResponse::default() }
}

fn demo_registry() -> Arc<PageRegistry> {
    Arc::new(crate::pages::registry().unwrap())
}

fn home_page() -> Page {
    Page {
        component: "Home".to_owned(),
        props: json!({ "title": "Home" }).as_object().cloned().unwrap(),
        url: "/".to_owned(),
        version: "1".to_owned(),
        deferred_props: [("default".to_owned(), vec!["heavy".to_owned()])].into(),
        ..Page::default()
    }
}

// =============================================================================
// DEFERRED
// =============================================================================

#[test]
fn mount_paints_placeholder_before_any_request() {
    let view = PageView::mount(demo_registry(), home_page()).unwrap();
    assert!(view.html().contains(crate::pages::home::HEAVY_PLACEHOLDER));
    assert_eq!(view.prop_state("heavy"), Some(&PropState::Pending));

    let requests = view.deferred_requests();
    assert_eq!(requests.len(), 1);
    let (group, request) = &requests[0];
    assert_eq!(group, "default");
    assert_eq!(request.header_value(wire::HEADER_PARTIAL_ONLY), Some("heavy"));
    assert_eq!(request.header_value(wire::HEADER_PARTIAL_COMPONENT), Some("Home"));
    assert_eq!(request.header_value(wire::HEADER_INERTIA), Some("true"));
}

#[test]
fn mount_unknown_page_fails() {
    let page = Page { component: "Nope".to_owned(), ..home_page() };
    assert!(matches!(PageView::mount(demo_registry(), page), Err(RenderError::PageNotFound(_))));
}

#[tokio::test]
async fn deferred_success_rerenders_only_its_region() {
    let mut view = PageView::mount(demo_registry(), home_page()).unwrap();
    let before = view.html();
    let transport = FakeTransport::new(|_| page_response("Home", json!({ "heavy": ["a", "b"] })));

    view.load_deferred(&transport).await;

    assert_eq!(view.prop_state("heavy"), Some(&PropState::Resolved(json!(["a", "b"]))));
    let after = view.html();
    assert!(after.contains("<ul><li>a</li><li>b</li></ul>"));
    let region_start = before.find(r#"<div data-region="heavy">"#).unwrap();
    assert_eq!(before[..region_start], after[..region_start]);
    assert!(view.deferred_requests().is_empty());
}

#[tokio::test]
async fn deferred_failure_marks_props_failed() {
    let mut view = PageView::mount(demo_registry(), home_page()).unwrap();
    let transport = FakeTransport::new(|_| status(500));

    view.load_deferred(&transport).await;

    assert!(matches!(view.prop_state("heavy"), Some(PropState::Failed(_))));
    let html = view.html();
    assert!(html.contains("Failed to load heavy data"));
    assert!(html.contains("Welcome to the Home page."));
}

#[tokio::test]
async fn missing_prop_in_response_is_failure() {
    let mut view = PageView::mount(demo_registry(), home_page()).unwrap();
    let transport = FakeTransport::new(|_| page_response("Home", json!({})));
    view.load_deferred(&transport).await;
    assert_eq!(view.prop_state("heavy"), Some(&PropState::Failed("missing from response".to_owned())));
}

struct TwoRegions;

fn region_text(props: &PropsView<'_>, key: &str) -> Markup {
    let mut out = Markup::new();
    match props.slot(key) {
        Slot::Ready(value) => out.text(&value.to_string()),
        Slot::Failed(_) => out.push_str("failed"),
        Slot::Pending | Slot::Missing => out.push_str("pending"),
    }
    out
}

impl PageComponent for TwoRegions {
    fn render(&self, props: &PropsView<'_>, out: &mut Markup) {
        out.region("a", region_text(props, "a"));
        out.region("b", region_text(props, "b"));
    }

    fn render_region(&self, region: &str, props: &PropsView<'_>) -> Option<Markup> {
        Some(region_text(props, region))
    }
}

#[tokio::test]
async fn groups_are_fetched_separately_and_settle_independently() {
    let registry = Arc::new(
        PageRegistryBuilder::new()
            .register(ComponentDef::new("Two", "test/two", TwoRegions))
            .unwrap()
            .build(),
    );
    let page = Page {
        component: "Two".to_owned(),
        url: "/two".to_owned(),
        deferred_props: [("g1".to_owned(), vec!["a".to_owned()]), ("g2".to_owned(), vec!["b".to_owned()])].into(),
        ..Page::default()
    };
    let mut view = PageView::mount(registry, page).unwrap();
    let transport = FakeTransport::new(|request| match request.header_value(wire::HEADER_PARTIAL_ONLY) {
        Some("a") => page_response("Two", json!({ "a": 1 })),
        _ => status(500),
    });

    view.load_deferred(&transport).await;

    let seen = transport.seen();
    assert_eq!(seen.len(), 2);
    assert_eq!(view.prop_state("a"), Some(&PropState::Resolved(json!(1))));
    assert!(matches!(view.prop_state("b"), Some(PropState::Failed(_))));
    assert_eq!(
        view.html(),
        r#"<div data-region="a">1</div><div data-region="b">failed</div>"#
    );
}

#[tokio::test]
async fn response_for_another_component_is_rejected() {
    let mut view = PageView::mount(demo_registry(), home_page()).unwrap();
    let transport = FakeTransport::new(|_| page_response("Users", json!({ "heavy": [1] })));
    view.load_deferred(&transport).await;
    assert!(matches!(view.prop_state("heavy"), Some(PropState::Failed(_))));
}

// =============================================================================
// RELOAD AND NAVIGATION
// =============================================================================

fn settings_page() -> Page {
    Page {
        component: "Settings".to_owned(),
        props: json!({ "title": "Settings" }).as_object().cloned().unwrap(),
        url: "/settings".to_owned(),
        version: "1".to_owned(),
        ..Page::default()
    }
}

#[tokio::test]
async fn reload_only_fetches_diagnostics() {
    let mut view = PageView::mount(demo_registry(), settings_page()).unwrap();
    assert!(view.html().contains(crate::pages::settings::DIAGNOSTICS_CTA));

    let transport = FakeTransport::new(|_| page_response("Settings", json!({ "diagnostics": "ok" })));
    view.reload_only(&transport, &["diagnostics"]).await.unwrap();

    let request = &transport.seen()[0];
    assert_eq!(request.url, "/settings");
    assert_eq!(request.header_value(wire::HEADER_PARTIAL_ONLY), Some("diagnostics"));
    assert_eq!(request.header_value(wire::HEADER_PARTIAL_COMPONENT), Some("Settings"));

    let html = view.html();
    assert!(html.contains(r#"<pre class="diagnostics">ok</pre>"#));
    assert!(!html.contains(crate::pages::settings::DIAGNOSTICS_CTA));
    assert!(html.contains("<h1>Settings</h1>"));
}

#[tokio::test]
async fn reload_only_appends_merge_props() {
    let page = Page {
        component: "Users".to_owned(),
        props: json!({ "users": [{ "id": 1, "name": "Alice", "role": "Admin" }] }).as_object().cloned().unwrap(),
        url: "/users".to_owned(),
        ..Page::default()
    };
    let mut view = PageView::mount(demo_registry(), page).unwrap();
    let transport = FakeTransport::new(|_| {
        let page = Page {
            component: "Users".to_owned(),
            props: json!({ "users": [{ "id": 2, "name": "Bob", "role": "Editor" }] }).as_object().cloned().unwrap(),
            merge_props: vec!["users".to_owned()],
            ..Page::default()
        };
        VisitResponse { status: 200, headers: Vec::new(), body: wire::encode_page(&page) }
    });

    view.reload_only(&transport, &["users"]).await.unwrap();

    assert_eq!(view.page().props["users"].as_array().map(Vec::len), Some(2));
    let html = view.html();
    assert!(html.find("Alice").unwrap() < html.find("Bob").unwrap());
}

#[tokio::test]
async fn reload_only_deep_merges_nested_objects() {
    let page = Page {
        component: "Settings".to_owned(),
        props: json!({ "title": "Settings", "prefs": { "theme": { "color": "red", "size": 1 }, "lang": "en" } })
            .as_object()
            .cloned()
            .unwrap(),
        url: "/settings".to_owned(),
        ..Page::default()
    };
    let mut view = PageView::mount(demo_registry(), page).unwrap();
    let transport = FakeTransport::new(|_| {
        let page = Page {
            component: "Settings".to_owned(),
            props: json!({ "prefs": { "theme": { "size": 2 } } }).as_object().cloned().unwrap(),
            deep_merge_props: vec!["prefs".to_owned()],
            ..Page::default()
        };
        VisitResponse { status: 200, headers: Vec::new(), body: wire::encode_page(&page) }
    });

    view.reload_only(&transport, &["prefs"]).await.unwrap();

    assert_eq!(view.page().props["prefs"], json!({ "theme": { "color": "red", "size": 2 }, "lang": "en" }));
}

#[tokio::test]
async fn navigate_discards_pending_state() {
    let mut view = PageView::mount(demo_registry(), home_page()).unwrap();
    let transport = FakeTransport::new(|_| page_response("Settings", json!({ "title": "Settings" })));

    view.navigate(&transport, "/settings").await.unwrap();

    assert_eq!(view.prop_state("heavy"), None);
    assert!(view.deferred_requests().is_empty());
    assert_eq!(view.page().component, "Settings");
    assert!(!view.html().contains(crate::pages::home::HEAVY_PLACEHOLDER));
}

#[tokio::test]
async fn navigate_conflict_reports_location() {
    let mut view = PageView::mount(demo_registry(), home_page()).unwrap();
    let transport = FakeTransport::new(|_| VisitResponse {
        status: 409,
        headers: vec![(wire::HEADER_LOCATION.to_owned(), "http://localhost/users".to_owned())],
        body: Vec::new(),
    });

    let err = view.navigate(&transport, "/users").await.unwrap_err();
    assert!(matches!(err, TransportError::Conflict { location } if location == "http://localhost/users"));
    assert_eq!(view.page().component, "Home");
}

// =============================================================================
// VALIDATION FORM
// =============================================================================

fn validation_response(code: u16, errors: Value) -> VisitResponse {
    let body = if code == 422 { serde_json::to_vec(&json!({ "errors": errors })).unwrap() } else { Vec::new() };
    VisitResponse { status: code, headers: Vec::new(), body }
}

#[tokio::test]
async fn validate_sends_precognition_post() {
    let mut form = ValidationForm::new("/users/create", "1");
    form.set("name", "Ann Lee");
    let transport = FakeTransport::new(|_| status(204));

    form.validate(&transport, &["name"]).await.unwrap();

    let request = &transport.seen()[0];
    assert_eq!(request.method, Method::POST);
    assert_eq!(request.url, "/users/create");
    assert_eq!(request.header_value(wire::HEADER_PRECOGNITION), Some("true"));
    assert_eq!(request.header_value(wire::HEADER_PRECOGNITION_VALIDATE_ONLY), Some("name"));
    assert_eq!(request.body.as_deref(), Some(b"name=Ann+Lee".as_slice()));
}

#[tokio::test]
async fn validate_fills_then_clears_errors() {
    let mut form = ValidationForm::new("/users/create", "1");
    let failing = FakeTransport::new(|_| validation_response(422, json!({ "name": ["Name is required"] })));
    form.validate(&failing, &[]).await.unwrap();
    assert_eq!(form.error("name"), Some("Name is required"));
    assert!(!form.is_valid());
    assert!(form.html().contains("Name is required"));

    form.set("name", "Ann");
    let passing = FakeTransport::new(|_| status(204));
    form.validate(&passing, &[]).await.unwrap();
    assert!(form.is_valid());
    assert_eq!(form.value("name"), Some("Ann"));
}

#[tokio::test]
async fn validate_reports_invalid_email_only() {
    let mut form = ValidationForm::new("/users/create", "1");
    form.set("name", "Ann");
    form.set("email", "not-an-email");
    let transport = FakeTransport::new(|_| validation_response(422, json!({ "email": ["invalid"] })));

    form.validate(&transport, &[]).await.unwrap();

    assert_eq!(form.error("email"), Some("invalid"));
    assert_eq!(form.error("name"), None);
    let html = form.html();
    assert!(html.contains(r#"<p class="field-error" data-field="email">invalid</p>"#));
    assert!(!html.contains(r#"data-field="name""#));
}

#[tokio::test]
async fn validate_only_touches_named_fields() {
    let mut form = ValidationForm::new("/users/create", "1");
    let both = FakeTransport::new(|_| validation_response(422, json!({ "name": "Name is required", "email": "Email is required" })));
    form.validate(&both, &[]).await.unwrap();

    let name_ok = FakeTransport::new(|_| validation_response(422, json!({ "email": "Email is required" })));
    form.validate(&name_ok, &["name"]).await.unwrap();

    assert_eq!(form.error("name"), None);
    assert_eq!(form.error("email"), Some("Email is required"));
}

#[tokio::test]
async fn validate_unexpected_status_keeps_errors() {
    let mut form = ValidationForm::new("/users/create", "1");
    let failing = FakeTransport::new(|_| validation_response(422, json!({ "name": "Name is required" })));
    form.validate(&failing, &[]).await.unwrap();

    let broken = FakeTransport::new(|_| status(500));
    assert!(matches!(form.validate(&broken, &[]).await, Err(TransportError::Status(500))));
    assert_eq!(form.error("name"), Some("Name is required"));
}
