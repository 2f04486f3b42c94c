//! Users directory: fixed demo data, sorting and pagination.
//!
//! Ordering and slicing happen here, on the server; the Users page renders
//! whatever order it is given.

use serde::Serialize;

use crate::pages::users::UserSort;

pub const PAGE_SIZE: usize = 3;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: u32,
    pub name: String,
    pub role: String,
}

impl User {
    fn new(id: u32, name: &str, role: &str) -> Self {
        Self { id, name: name.to_owned(), role: role.to_owned() }
    }
}

#[must_use]
pub fn all_users() -> Vec<User> {
    vec![
        User::new(1, "Alice", "Admin"),
        User::new(2, "Bob", "Editor"),
        User::new(3, "Carla", "Viewer"),
        User::new(4, "Dmitry", "Admin"),
        User::new(5, "Elena", "Editor"),
        User::new(6, "Farid", "Viewer"),
        User::new(7, "Gita", "Editor"),
        User::new(8, "Hector", "Viewer"),
        User::new(9, "Ira", "Admin"),
    ]
}

/// Stable sort, so equal roles keep id order.
pub fn sort_users(users: &mut [User], sort: UserSort) {
    match sort {
        UserSort::Name => users.sort_by(|a, b| a.name.cmp(&b.name)),
        UserSort::NameDesc => users.sort_by(|a, b| b.name.cmp(&a.name)),
        UserSort::IdDesc => users.sort_by(|a, b| b.id.cmp(&a.id)),
        UserSort::Role => users.sort_by(|a, b| a.role.cmp(&b.role)),
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserPage {
    pub users: Vec<User>,
    /// Clamped into `1..=total_pages`.
    pub page: usize,
    pub total_pages: usize,
    pub prev_page: Option<usize>,
    pub next_page: Option<usize>,
}

/// Slice one page out of `users`. Out-of-range pages are clamped.
#[must_use]
pub fn paginate(users: &[User], page: usize, page_size: usize) -> UserPage {
    let page_size = page_size.max(1);
    let total_pages = users.len().div_ceil(page_size).max(1);
    let page = page.clamp(1, total_pages);

    let start = ((page - 1) * page_size).min(users.len());
    let end = (start + page_size).min(users.len());

    UserPage {
        users: users[start..end].to_vec(),
        page,
        total_pages,
        prev_page: (page > 1).then(|| page - 1),
        next_page: (page < total_pages).then(|| page + 1),
    }
}

#[cfg(test)]
#[path = "users_test.rs"]
mod tests;
