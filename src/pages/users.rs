//! Users page: sort links, the current slice of users and a pager.
//!
//! Users are listed in the order received. A null `prevPage` hides "Prev"
//! and a null `nextPage` hides "Load more".

use std::fmt::Write;

use serde_json::Value;

use super::value_text;
use crate::markup::{Markup, PropsView, attr};
use crate::registry::PageComponent;

pub const MODULE: &str = "pages/users";

/// Sort orders offered by the sort links.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UserSort {
    #[default]
    Name,
    NameDesc,
    IdDesc,
    Role,
}

impl UserSort {
    pub const ALL: [Self; 4] = [Self::Name, Self::NameDesc, Self::IdDesc, Self::Role];

    /// Unknown values sort by name.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw {
            "name_desc" => Self::NameDesc,
            "id_desc" => Self::IdDesc,
            "role" => Self::Role,
            _ => Self::Name,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::NameDesc => "name_desc",
            Self::IdDesc => "id_desc",
            Self::Role => "role",
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Name => "Name A-Z",
            Self::NameDesc => "Name Z-A",
            Self::IdDesc => "Newest",
            Self::Role => "Role",
        }
    }
}

pub struct UsersPage;

impl PageComponent for UsersPage {
    fn render(&self, props: &PropsView<'_>, out: &mut Markup) {
        let sort = UserSort::parse(props.str("sort").unwrap_or_default());

        out.push_str("<div><h1>");
        out.text(props.str("title").unwrap_or_default());
        out.push_str(r#"</h1><p class="sort">Sort: "#);
        for option in UserSort::ALL {
            let class = if option == sort { " class=\"active\"" } else { "" };
            let href = format!("/users?sort={}", option.as_str());
            let _ = write!(out, r#"<a href="{}"{class}>"#, attr(&href));
            out.text(option.label());
            out.push_str("</a> ");
        }
        out.push_str("</p>");

        out.region("users", user_list(props));

        let _ = write!(
            out,
            r#"<p class="page-info">Page {} of {}</p><nav class="pager">"#,
            props.i64("page").unwrap_or(1),
            props.i64("totalPages").unwrap_or(1),
        );
        if let Some(prev) = page_link(props, "prevPage") {
            let href = format!("/users?sort={}&page={prev}", sort.as_str());
            let _ = write!(out, r#"<a href="{}" class="prev">Prev</a>"#, attr(&href));
        }
        if let Some(next) = page_link(props, "nextPage") {
            let href = format!("/users?sort={}&page={next}", sort.as_str());
            let _ = write!(out, r#"<a href="{}" class="load-more" data-inertia-merge="users">Load more</a>"#, attr(&href));
        }
        out.push_str("</nav></div>");
    }

    fn render_region(&self, region: &str, props: &PropsView<'_>) -> Option<Markup> {
        (region == "users").then(|| user_list(props))
    }
}

fn user_list(props: &PropsView<'_>) -> Markup {
    let mut out = Markup::new();
    out.push_str(r#"<ul class="users">"#);
    if let Some(Value::Array(users)) = props.get("users") {
        for user in users {
            let id = user.get("id").map(value_text).unwrap_or_default();
            let _ = write!(out, r#"<li data-id="{}">"#, attr(&id));
            out.text(&user.get("name").map(value_text).unwrap_or_default());
            out.push_str(r#" <span class="role">"#);
            out.text(&user.get("role").map(value_text).unwrap_or_default());
            out.push_str("</span></li>");
        }
    }
    out.push_str("</ul>");
    out
}

/// Page number behind a pager link; null or absent means no link.
fn page_link(props: &PropsView<'_>, key: &str) -> Option<i64> {
    props.i64(key).filter(|page| *page > 0)
}
