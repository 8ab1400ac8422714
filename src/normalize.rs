//! Raw payload normalization
//!
//! Pure functions mapping raw API user objects to the stored [`CachedUser`]
//! shape, and cached users to the remote store's [`ClientRow`] contract. No
//! I/O happens here.

use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use crate::sink::ClientRow;
use crate::{CachedUser, UserLocation};

/// Reduce a raw user object to the fields the pipeline stores.
///
/// Containers that would be all-null (`location` with neither country nor
/// city, non-object `status`/`timezone`) are dropped entirely.
pub fn minimize_user(user_obj: &Value) -> CachedUser {
    let country = user_obj
        .pointer("/location/country/name")
        .and_then(Value::as_str)
        .map(str::to_string);
    let city = user_obj
        .pointer("/location/city")
        .and_then(Value::as_str)
        .map(str::to_string);
    let location = if country.is_none() && city.is_none() {
        None
    } else {
        Some(UserLocation { country, city })
    };

    CachedUser {
        username: user_obj
            .get("username")
            .and_then(Value::as_str)
            .map(str::to_string),
        closed: user_obj.get("closed").and_then(Value::as_bool),
        registration_date: user_obj.get("registration_date").and_then(Value::as_i64),
        display_name: user_obj
            .get("display_name")
            .and_then(Value::as_str)
            .map(str::to_string),
        location,
        status: user_obj.get("status").filter(|v| v.is_object()).cloned(),
        public_name: user_obj
            .get("public_name")
            .and_then(Value::as_str)
            .map(str::to_string),
        timezone: user_obj.get("timezone").filter(|v| v.is_object()).cloned(),
        registration_completed: user_obj
            .get("registration_completed")
            .and_then(Value::as_bool),
    }
}

/// Map a cached user onto the remote store's column contract.
///
/// The store requires non-empty `username`/`display_name`/`public_name`, so
/// each falls back along a fixed chain ending at the stringified id.
/// `joined_at` is derived from the registration epoch when it converts
/// cleanly, otherwise "now"; `reg_at` is set only from a clean conversion.
pub fn to_client_row(user_id: i64, user: &CachedUser) -> ClientRow {
    let raw_username = user.username.clone().unwrap_or_default();
    let mut display_name = user.display_name.clone().unwrap_or_default();
    if display_name.is_empty() {
        display_name = if raw_username.is_empty() {
            user_id.to_string()
        } else {
            raw_username.clone()
        };
    }
    let mut public_name = user.public_name.clone().unwrap_or_default();
    if public_name.is_empty() {
        public_name = display_name.clone();
    }
    let username = if raw_username.is_empty() {
        display_name.clone()
    } else {
        raw_username
    };

    let location = user.location.clone().unwrap_or_default();

    let registered = user
        .registration_date
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0).map(|dt| (secs, dt)));
    let reg_at = registered.map(|(secs, _)| secs);
    let joined_at = registered
        .map(|(_, dt)| dt)
        .unwrap_or_else(Utc::now)
        .naive_utc()
        .format("%Y-%m-%d %H:%M:%S")
        .to_string();

    ClientRow {
        id: user_id,
        username,
        display_name,
        public_name,
        location: json!({
            "country": location.country,
            "city": location.city,
        }),
        timezone: user.timezone.clone().unwrap_or_else(|| json!({})),
        joined_at,
        status: user.status.clone().unwrap_or_else(|| json!({})),
        reg_at,
    }
}
