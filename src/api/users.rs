//! Batched user lookup endpoint

use std::collections::BTreeMap;

use serde_json::Value;

use crate::api::{extract_list, extract_user_id};
use crate::client::{ApiClient, ApiResult, Payload};

/// Batch-fetch user objects by id (`users[]=1&users[]=2&..`).
///
/// `status=true` is requested so the closed-account flag is present for the
/// skip policy downstream.
pub async fn fetch_by_ids(client: &mut ApiClient, user_ids: &[i64]) -> ApiResult<Payload> {
    let mut params: Vec<(String, String)> = user_ids
        .iter()
        .map(|id| ("users[]".to_string(), id.to_string()))
        .collect();
    params.push(("compact".to_string(), "true".to_string()));
    params.push(("status".to_string(), "true".to_string()));
    client.get("/users/0.1/users", &params).await
}

/// Normalize a batch-users payload into an id-keyed map.
///
/// Entries that are not objects or carry no usable id are dropped.
pub fn extract_users_map(payload: &Payload) -> BTreeMap<i64, Value> {
    let mut out = BTreeMap::new();
    for user in extract_list(payload, "users") {
        if !user.is_object() {
            continue;
        }
        if let Some(id) = extract_user_id(user) {
            out.insert(id, user.clone());
        }
    }
    out
}
