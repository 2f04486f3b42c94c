//! Demo page handlers.
//!
//! Each handler builds props and hands them to the adapter; everything about
//! the response shape (JSON vs HTML, partial reloads, precognition) is decided
//! there.

use std::collections::BTreeMap;

use axum::extract::{Form, Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use wire::ScrollPropConfig;

use super::users::{PAGE_SIZE, all_users, paginate, sort_users};
use crate::error::AppError;
use crate::inertia::Inertia;
use crate::pages::users::UserSort;
use crate::props::{Prop, PropError, Props};
use crate::scope::{InertiaRequest, RequestInfo};

pub const HEAVY_ITEMS: [i64; 5] = [123, 234, 345, 456, 789];

pub const USER_CREATED: &str = "User created";
pub const CONFLICT_REDIRECT: &str = "You have been redirected because the page was not found (409 -> Redirect).";

/// `GET /`
pub async fn home(State(inertia): State<Inertia>, req: InertiaRequest) -> Result<Response, AppError> {
    let props = Props::new()
        .with("title", "Home")
        .with("plan", Prop::value("Pro").once_key("plan_v1"))
        .with("heavy", Prop::lazy(|_: &RequestInfo| async { Ok(json!(HEAVY_ITEMS)) }).deferred(""));
    Ok(inertia.render(&req, "Home", props).await?)
}

#[derive(Debug, Default, Deserialize)]
pub struct UsersQuery {
    pub sort: Option<String>,
    pub page: Option<String>,
}

impl UsersQuery {
    /// Missing, unparseable and non-positive pages read as page 1.
    fn page(&self) -> usize {
        self.page.as_deref().and_then(|p| p.trim().parse().ok()).filter(|p| *p > 0).unwrap_or(1)
    }
}

/// `GET /users?sort=..&page=..`
pub async fn users(
    State(inertia): State<Inertia>,
    req: InertiaRequest,
    Query(query): Query<UsersQuery>,
) -> Result<Response, AppError> {
    let sort = UserSort::parse(query.sort.as_deref().unwrap_or_default());
    let mut all = all_users();
    sort_users(&mut all, sort);
    let page = paginate(&all, query.page(), PAGE_SIZE);

    req.with_match_props_on(&["sort"]);

    let scroll = ScrollPropConfig {
        page_name: Some("page".to_owned()),
        previous_page: page.prev_page.map(Value::from),
        next_page: page.next_page.map(Value::from),
        current_page: Some(Value::from(page.page)),
    };
    let users = Prop::json(&page.users).map_err(AppError::internal)?.scroll(scroll);

    let props = Props::new()
        .with("title", "Users")
        .with("sort", sort.as_str())
        .with("page", json!(page.page))
        .with("pageSize", json!(PAGE_SIZE))
        .with("total", json!(all.len()))
        .with("totalPages", json!(page.total_pages))
        .with("prevPage", json!(page.prev_page))
        .with("nextPage", json!(page.next_page))
        .with("users", users);
    Ok(inertia.render(&req, "Users", props).await?)
}

/// `GET /settings`
pub async fn settings(State(inertia): State<Inertia>, req: InertiaRequest) -> Result<Response, AppError> {
    Ok(inertia.render(&req, "Settings", settings_props()).await?)
}

fn settings_props() -> Props {
    Props::new()
        .with("title", "Settings")
        .with("diagnostics", Prop::lazy(|_: &RequestInfo| async { diagnostics() }).optional())
}

fn diagnostics() -> Result<Value, PropError> {
    let server_time = OffsetDateTime::now_utc().format(&Rfc3339).map_err(|e| PropError::Failed(e.to_string()))?;
    Ok(json!({ "server_time": server_time, "version": env!("CARGO_PKG_VERSION") }))
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateUserForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

impl CreateUserForm {
    #[must_use]
    pub fn validate(&self) -> BTreeMap<String, String> {
        let mut errors = BTreeMap::new();
        if self.name.trim().is_empty() {
            errors.insert("name".to_owned(), "Name is required".to_owned());
        }
        if self.email.trim().is_empty() {
            errors.insert("email".to_owned(), "Email is required".to_owned());
        }
        errors
    }

    fn old_input(&self) -> Map<String, Value> {
        let mut old = Map::new();
        old.insert("name".to_owned(), Value::from(self.name.as_str()));
        old.insert("email".to_owned(), Value::from(self.email.as_str()));
        old
    }
}

/// `POST /users/create`. Precognition requests only validate.
pub async fn create_user(
    State(inertia): State<Inertia>,
    req: InertiaRequest,
    Form(form): Form<CreateUserForm>,
) -> Result<Response, AppError> {
    let errors = form.validate();
    if errors.is_empty() && !req.is_precognition() {
        tracing::info!(name = %form.name, "user created");
        req.with_flash_success(USER_CREATED);
        return Ok(inertia.redirect_back(&req));
    }

    req.with_errors(errors);
    if !req.is_precognition() {
        req.with_old(form.old_input());
    }
    Ok(inertia.render(&req, "Settings", settings_props()).await?)
}

/// `GET /not-found`: flash an error and bounce back.
pub async fn not_found_conflict(State(inertia): State<Inertia>, req: InertiaRequest) -> Response {
    req.with_flash_error(CONFLICT_REDIRECT);
    inertia.redirect_back(&req)
}

/// Any unmatched route renders the `Error` component with a 404.
pub async fn fallback(State(inertia): State<Inertia>, req: InertiaRequest) -> Result<Response, AppError> {
    let props = Props::new().with("status", 404_i64).with("message", "Page not found");
    let mut response = inertia.render(&req, "Error", props).await?;
    *response.status_mut() = StatusCode::NOT_FOUND;
    Ok(response)
}
