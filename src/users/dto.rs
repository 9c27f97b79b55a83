use serde::{Deserialize, Serialize};

use crate::{
    pagination::{PaginationParams, PaginationResult},
    users::repo_types::User,
};

/// Query string of `GET /users`. Values stay strings so that junk input falls
/// back to the defaults instead of rejecting the request.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub name: Option<String>,
    pub page: Option<String>,
    #[serde(rename = "pageSize")]
    pub page_size: Option<String>,
}

impl ListQuery {
    pub fn pagination(&self) -> PaginationParams {
        PaginationParams::new(lenient(&self.page), lenient(&self.page_size))
    }
}

fn lenient(v: &Option<String>) -> i64 {
    v.as_deref()
        .and_then(|s| s.trim().parse::<i64>().ok())
        .unwrap_or(0)
}

#[derive(Debug, Serialize)]
pub struct UserListView {
    pub current_user: User,
    pub name: String,
    pub data: Vec<User>,
    pub page: i64,
    pub page_size: i64,
    pub pagination: PaginationResult,
}

#[derive(Debug, Serialize)]
pub struct UserFormView {
    pub csrf_token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UserEditView {
    pub user: User,
    pub csrf_token: Option<String>,
}
