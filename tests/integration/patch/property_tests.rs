//! Property-Based Testing for SCIM PATCH Operations
//!
//! Verifies that PATCH operations maintain their invariants over generated
//! values and paths. Uses proptest for random inputs with automatic shrinking.

use super::patch_resource;
use crate::common::fixtures::rfc_examples;
use proptest::prelude::*;
use scim_core::error::PatchError;
use serde_json::{Value, json};

fn email_type() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["work", "home", "other", "fax", "pager"]).prop_map(str::to_string)
}

proptest! {
    #[test]
    fn test_replace_then_read_back(display_name in "[a-zA-Z ]{1,50}") {
        let user = rfc_examples::user_full();
        let result = patch_resource(
            "User",
            &user,
            vec![json!({"op": "replace", "path": "displayName", "value": display_name.clone()})],
        ).expect("replace succeeds");
        prop_assert_eq!(&result["displayName"], &Value::String(display_name));
        prop_assert_eq!(&result["userName"], &user["userName"]);
    }

    #[test]
    fn test_add_is_idempotent(local in "[a-z]{1,12}", kind in email_type()) {
        let user = rfc_examples::user_full();
        let operation = json!({
            "op": "add",
            "path": "emails",
            "value": [{"value": format!("{}@example.net", local), "type": kind}]
        });
        let once = patch_resource("User", &user, vec![operation.clone()]).expect("add succeeds");
        let twice = patch_resource("User", &user, vec![operation.clone(), operation])
            .expect("add succeeds");
        prop_assert_eq!(&once, &twice);
        prop_assert_eq!(once["emails"].as_array().map(Vec::len), Some(3));
    }

    #[test]
    fn test_add_to_absent_collection_creates_one_element(local in "[a-z]{1,12}") {
        let user = rfc_examples::user_minimal();
        let email = json!({"value": format!("{}@b.com", local)});
        let result = patch_resource(
            "User",
            &user,
            vec![json!({"op": "add", "path": "emails", "value": [email.clone()]})],
        ).expect("add succeeds");
        prop_assert_eq!(&result["emails"], &json!([email]));
    }

    #[test]
    fn test_filtered_remove_matches_or_reports_no_target(kind in email_type()) {
        let user = rfc_examples::user_full();
        let path = format!("emails[type eq \"{}\"]", kind);
        let result = patch_resource("User", &user, vec![json!({"op": "remove", "path": path.clone()})]);

        let present = user["emails"]
            .as_array()
            .expect("emails")
            .iter()
            .filter(|email| email["type"] == kind.as_str())
            .count();
        match result {
            Ok(patched) => {
                prop_assert!(present > 0);
                let remaining = patched["emails"].as_array().map_or(0, Vec::len);
                prop_assert_eq!(remaining, 2 - present);
            }
            Err(err) => {
                prop_assert_eq!(present, 0);
                prop_assert_eq!(err, PatchError::no_target(path));
            }
        }
    }

    #[test]
    fn test_read_only_replace_always_rejected(value in "[a-zA-Z0-9-]{1,36}") {
        let user = rfc_examples::user_full();
        let result = patch_resource(
            "User",
            &user,
            vec![json!({"op": "replace", "path": "id", "value": value})],
        );
        prop_assert!(matches!(result, Err(PatchError::Mutability { .. })), "expected Mutability error, got {:?}", result);
    }
}
