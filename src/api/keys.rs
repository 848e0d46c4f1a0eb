//! Query keys for every cached read.

use crate::query::QueryKey;

pub const BLOGS: &str = "blogs";
pub const BLOG: &str = "blog";
pub const MY_BLOGS: &str = "my-blogs";
pub const ADMIN_BLOGS: &str = "admin-blogs";
pub const ADMIN_USERS: &str = "admin-users";
pub const ADMIN_USER: &str = "admin-user";

/// Infinite list of all posts.
pub fn blogs() -> QueryKey {
    QueryKey::new(BLOGS)
}

pub fn blog(id: &str) -> QueryKey {
    QueryKey::new(BLOG).with(id)
}

pub fn my_blogs() -> QueryKey {
    QueryKey::new(MY_BLOGS)
}

/// One page of the admin post table. `admin_blogs_all()` matches every page.
pub fn admin_blogs(page: u32) -> QueryKey {
    QueryKey::new(ADMIN_BLOGS).with(page)
}

pub fn admin_blogs_all() -> QueryKey {
    QueryKey::new(ADMIN_BLOGS)
}

pub fn admin_users(page: u32) -> QueryKey {
    QueryKey::new(ADMIN_USERS).with(page)
}

pub fn admin_users_all() -> QueryKey {
    QueryKey::new(ADMIN_USERS)
}

pub fn admin_user(id: &str) -> QueryKey {
    QueryKey::new(ADMIN_USER).with(id)
}

/// Keys made stale by creating, editing or deleting a post.
pub fn blog_writes(id: Option<&str>) -> Vec<QueryKey> {
    let mut keys = vec![blogs(), my_blogs(), admin_blogs_all()];
    if let Some(id) = id {
        keys.push(blog(id));
    }
    keys
}

/// Keys made stale by an admin edit or delete of an account.
pub fn user_writes(id: &str) -> Vec<QueryKey> {
    vec![admin_users_all(), admin_user(id)]
}
