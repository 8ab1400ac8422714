//! Per-user reviews endpoint

use std::collections::BTreeSet;

use serde_json::Value;

use crate::api::{extract_list, id_from_value};
use crate::client::{ApiClient, ApiResult, Payload};

/// Fetch the reviews left for one directory user.
///
/// The endpoint has no offset pagination, so a single call with a large
/// `limit` is made. Only the reviewer id is load-bearing downstream.
pub async fn fetch_for_user(
    client: &mut ApiClient,
    to_user_id: i64,
    limit: u64,
) -> ApiResult<Payload> {
    let params = [
        ("limit".to_string(), limit.to_string()),
        ("role".to_string(), "freelancer".to_string()),
        ("to_users[]".to_string(), to_user_id.to_string()),
        ("review_types[]".to_string(), "contest".to_string()),
        ("review_types[]".to_string(), "project".to_string()),
        ("order_by".to_string(), "submit_date_desc".to_string()),
        ("webapp".to_string(), "1".to_string()),
        ("compact".to_string(), "true".to_string()),
    ];
    client.get("/projects/0.1/reviews/", &params).await
}

/// The raw review objects in a reviews payload.
pub fn extract_reviews(payload: &Payload) -> &[Value] {
    extract_list(payload, "reviews")
}

/// Extract the reviewer ids from a reviews payload, deduplicated and in
/// ascending order.
///
/// Reads `from_user_id`, falling back to an embedded `from_user` object's
/// `id`/`user_id` (some envelope variants inline the reviewer). Reviews
/// without a usable reviewer id are ignored.
pub fn extract_reviewer_ids(payload: &Payload) -> BTreeSet<i64> {
    let mut reviewers = BTreeSet::new();
    for review in extract_reviews(payload) {
        let Some(review) = review.as_object() else {
            continue;
        };
        let raw = review
            .get("from_user_id")
            .filter(|v| !v.is_null())
            .or_else(|| review.get("from_user"));
        let Some(raw) = raw else {
            continue;
        };
        let id = if raw.is_object() {
            raw.get("id")
                .filter(|v| !v.is_null())
                .or_else(|| raw.get("user_id"))
                .and_then(id_from_value)
        } else {
            id_from_value(raw)
        };
        if let Some(id) = id {
            reviewers.insert(id);
        }
    }
    reviewers
}
