//! Directory listing endpoint

use serde_json::Value;

use crate::api::extract_list;
use crate::client::{ApiClient, ApiResult, Payload};

/// Fetch one page of the user directory.
///
/// Params are kept minimal (`compact=true`) to reduce payload size and
/// rate-limit pressure.
pub async fn fetch_page(
    client: &mut ApiClient,
    limit: u64,
    offset: u64,
    query: &str,
) -> ApiResult<Payload> {
    let params = [
        ("limit".to_string(), limit.to_string()),
        ("offset".to_string(), offset.to_string()),
        ("query".to_string(), query.to_string()),
        ("compact".to_string(), "true".to_string()),
    ];
    client.get("/users/0.1/users/directory/", &params).await
}

/// The entities on a directory page. An empty slice means the last page was
/// passed (terminal state for the pipeline).
pub fn extract_entities(payload: &Payload) -> &[Value] {
    extract_list(payload, "users")
}
