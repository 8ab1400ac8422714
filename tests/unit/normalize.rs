//! Normalization tests

use lead_collector::normalize::{minimize_user, to_client_row};
use lead_collector::{CachedUser, UserLocation};
use serde_json::json;

#[test]
fn test_minimize_user_full_shape() {
    let raw = json!({
        "id": 5,
        "username": "alice",
        "closed": false,
        "registration_date": 1458235929,
        "display_name": "Alice",
        "public_name": "Alice L.",
        "location": {"country": {"name": "Australia"}, "city": "Sydney"},
        "status": {"email_verified": true},
        "timezone": {"timezone": "Australia/Sydney"},
        "registration_completed": true,
        "hourly_rate": 50.0
    });

    let user = minimize_user(&raw);
    assert_eq!(user.username.as_deref(), Some("alice"));
    assert_eq!(user.closed, Some(false));
    assert_eq!(user.registration_date, Some(1458235929));
    assert_eq!(user.display_name.as_deref(), Some("Alice"));
    assert_eq!(user.public_name.as_deref(), Some("Alice L."));
    assert_eq!(
        user.location,
        Some(UserLocation {
            country: Some("Australia".to_string()),
            city: Some("Sydney".to_string()),
        })
    );
    assert_eq!(user.status, Some(json!({"email_verified": true})));
    assert_eq!(user.timezone, Some(json!({"timezone": "Australia/Sydney"})));
    assert_eq!(user.registration_completed, Some(true));
}

#[test]
fn test_minimize_user_partial_shapes() {
    // Country only: location is kept with city None
    let user = minimize_user(&json!({"location": {"country": {"name": "France"}}}));
    assert_eq!(
        user.location,
        Some(UserLocation {
            country: Some("France".to_string()),
            city: None,
        })
    );

    // Neither country nor city: location is dropped entirely
    let user = minimize_user(&json!({"location": {"administrative_area": "x"}}));
    assert!(user.location.is_none());

    // Non-object status/timezone are dropped
    let user = minimize_user(&json!({"status": "active", "timezone": 42}));
    assert!(user.status.is_none());
    assert!(user.timezone.is_none());

    // Empty object yields all-None
    let user = minimize_user(&json!({}));
    assert_eq!(user, CachedUser::default());
}

#[test]
fn test_to_client_row_converts_registration_epoch() {
    let user = CachedUser {
        username: Some("alice".to_string()),
        display_name: Some("Alice".to_string()),
        public_name: Some("Alice L.".to_string()),
        registration_date: Some(1458235929),
        ..CachedUser::default()
    };

    let row = to_client_row(5, &user);
    assert_eq!(row.id, 5);
    assert_eq!(row.username, "alice");
    assert_eq!(row.display_name, "Alice");
    assert_eq!(row.public_name, "Alice L.");
    assert_eq!(row.joined_at, "2016-03-17 17:32:09");
    assert_eq!(row.reg_at, Some(1458235929));
}

#[test]
fn test_to_client_row_name_fallback_chains() {
    // No names at all: everything falls back to the stringified id
    let row = to_client_row(77, &CachedUser::default());
    assert_eq!(row.display_name, "77");
    assert_eq!(row.public_name, "77");
    assert_eq!(row.username, "77");

    // Username only: display and public names fall back to it
    let user = CachedUser {
        username: Some("bob".to_string()),
        ..CachedUser::default()
    };
    let row = to_client_row(8, &user);
    assert_eq!(row.display_name, "bob");
    assert_eq!(row.public_name, "bob");
    assert_eq!(row.username, "bob");

    // Display name only: username and public name fall back to it
    let user = CachedUser {
        display_name: Some("Carol".to_string()),
        ..CachedUser::default()
    };
    let row = to_client_row(9, &user);
    assert_eq!(row.username, "Carol");
    assert_eq!(row.public_name, "Carol");
}

#[test]
fn test_to_client_row_missing_registration() {
    let row = to_client_row(5, &CachedUser::default());
    assert_eq!(row.reg_at, None);
    // joined_at falls back to "now" and keeps the fixed format
    assert_eq!(row.joined_at.len(), 19);
    assert!(row.joined_at.contains(' '));
}

#[test]
fn test_to_client_row_location_and_raw_objects() {
    let user = CachedUser {
        location: Some(UserLocation {
            country: Some("Japan".to_string()),
            city: None,
        }),
        ..CachedUser::default()
    };
    let row = to_client_row(3, &user);
    assert_eq!(row.location, json!({"country": "Japan", "city": null}));
    assert_eq!(row.timezone, json!({}));
    assert_eq!(row.status, json!({}));

    // Absent location serializes as an all-null object
    let row = to_client_row(4, &CachedUser::default());
    assert_eq!(row.location, json!({"country": null, "city": null}));
}

#[test]
fn test_client_row_serialization_omits_missing_reg_at() {
    let row = to_client_row(4, &CachedUser::default());
    let value = serde_json::to_value(&row).unwrap();
    assert!(value.get("reg_at").is_none());
    assert_eq!(value.get("id"), Some(&json!(4)));
}
