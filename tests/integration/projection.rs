//! Attribute projection (`attributes` / `excludedAttributes`).

use crate::common::{self, fixtures::rfc_examples};
use proptest::prelude::*;
use scim_core::error::ProjectionError;
use scim_core::path::AttributeReference;
use scim_core::projection::{AttributeSelection, project};
use serde_json::{Value, json};

fn references(names: &[&str]) -> Vec<AttributeReference> {
    names
        .iter()
        .map(|name| AttributeReference::parse(name).expect("valid attribute name"))
        .collect()
}

fn project_user(included: &[&str], excluded: &[&str]) -> Value {
    let registry = common::core_registry();
    let users = registry.resource_schema("User").expect("User");
    let included = references(included);
    let excluded = references(excluded);
    project(
        &rfc_examples::enterprise_user(),
        &users,
        Some(&included[..]),
        Some(&excluded[..]),
    )
    .expect("projection succeeds")
}

fn project_device(included: &[&str], excluded: &[&str]) -> Value {
    let registry = common::registry_with_devices();
    let devices = registry.resource_schema("Device").expect("Device");
    let included = references(included);
    let excluded = references(excluded);
    project(
        &rfc_examples::device(),
        &devices,
        Some(&included[..]),
        Some(&excluded[..]),
    )
    .expect("projection succeeds")
}

#[test]
fn test_default_projection() {
    let user = project_user(&[], &[]);
    assert!(user.get("password").is_none());
    assert_eq!(user["userName"], "bjensen@example.com");
    assert_eq!(user["id"], "2819c223-7f76-453a-919d-413861904646");
    assert_eq!(user["emails"].as_array().map(Vec::len), Some(2));
    assert_eq!(
        user["urn:ietf:params:scim:schemas:extension:enterprise:2.0:User"]["employeeNumber"],
        "701984"
    );
    assert_eq!(user["schemas"].as_array().map(Vec::len), Some(2));

    let device = project_device(&[], &[]);
    assert!(device.get("enrollmentSecret").is_none());
    // returned=request attributes need to be asked for
    assert!(device.get("firmware").is_none());
    assert!(device["location"].get("rack").is_none());
    assert_eq!(device["location"]["assetTag"], "A-100");
}

#[test]
fn test_attributes_parameter() {
    let user = project_user(&["userName", "name.givenName"], &[]);
    let keys: Vec<&str> = user
        .as_object()
        .expect("object")
        .keys()
        .map(String::as_str)
        .collect();
    let mut keys = keys;
    keys.sort_unstable();
    assert_eq!(keys, vec!["id", "name", "schemas", "userName"]);
    assert_eq!(user["name"], json!({"givenName": "Barbara"}));
}

#[test]
fn test_attributes_parameter_request_and_never() {
    let device = project_device(&["firmware", "enrollmentSecret", "location.rack"], &[]);
    assert_eq!(device["firmware"], "AAECAwQ=");
    assert!(device.get("enrollmentSecret").is_none());
    // The always-returned sub-attribute comes along with the requested one
    assert_eq!(device["location"], json!({"rack": "R12", "assetTag": "A-100"}));
    assert!(device.get("displayName").is_none());
    assert_eq!(device["id"], "dev-001");
}

#[test]
fn test_excluded_attributes_parameter() {
    let user = project_user(
        &[],
        &[
            "emails",
            "name.middleName",
            "id",
            "urn:ietf:params:scim:schemas:extension:enterprise:2.0:User:manager",
        ],
    );
    assert!(user.get("emails").is_none());
    assert!(user["name"].get("middleName").is_none());
    assert_eq!(user["name"]["givenName"], "Barbara");
    // id is returned=always
    assert!(user.get("id").is_some());
    let enterprise = &user["urn:ietf:params:scim:schemas:extension:enterprise:2.0:User"];
    assert!(enterprise.get("manager").is_none());
    assert_eq!(enterprise["costCenter"], "4130");
}

#[test]
fn test_whole_extension_selection() {
    let urn = "urn:ietf:params:scim:schemas:extension:enterprise:2.0:User";

    let user = project_user(&[urn], &[]);
    assert_eq!(user[urn]["department"], "Tour Operations");
    assert!(user.get("userName").is_none());

    let user = project_user(&[], &[urn]);
    assert!(user.get(urn).is_none());
    assert_eq!(user["userName"], "bjensen@example.com");
}

#[test]
fn test_unknown_names_are_ignored() {
    let user = project_user(&["shoeSize", "userName"], &[]);
    assert_eq!(user["userName"], "bjensen@example.com");
    assert!(user.get("shoeSize").is_none());

    let registry = common::core_registry();
    let users = registry.resource_schema("User").expect("User");
    let mut resource = rfc_examples::user_minimal();
    resource["x-internal"] = json!("dropped");
    let projected = project(&resource, &users, None, None).expect("projection succeeds");
    assert!(projected.get("x-internal").is_none());
}

#[test]
fn test_selection_from_query_parameters() {
    let registry = common::core_registry();
    let users = registry.resource_schema("User").expect("User");

    let selection = AttributeSelection::from_params(Some("userName, emails.value"), None)
        .expect("valid selection");
    let user = selection
        .apply(&rfc_examples::user_full(), &users)
        .expect("projection succeeds");
    assert_eq!(
        user["emails"],
        json!([{"value": "bjensen@example.com"}, {"value": "babs@jensen.org"}])
    );

    let selection = AttributeSelection::from_params(Some(""), Some("")).expect("empty lists");
    assert_eq!(selection, AttributeSelection::default());

    assert_eq!(
        AttributeSelection::from_params(Some("userName"), Some("emails")),
        Err(ProjectionError::AmbiguousProjection)
    );
    assert!(matches!(
        AttributeSelection::from_params(Some("urn:example:"), None),
        Err(ProjectionError::InvalidAttribute(_))
    ));
}

#[test]
fn test_both_lists_rejected() {
    let registry = common::core_registry();
    let users = registry.resource_schema("User").expect("User");
    let included = references(&["userName"]);
    let excluded = references(&["emails"]);
    let result = project(
        &rfc_examples::user_full(),
        &users,
        Some(&included[..]),
        Some(&excluded[..]),
    );
    assert_eq!(result, Err(ProjectionError::AmbiguousProjection));
}

const USER_NAMES: &[&str] = &[
    "userName",
    "password",
    "PASSWORD",
    "name",
    "name.givenName",
    "emails",
    "emails.value",
    "groups.display",
    "meta",
    "id",
    "urn:ietf:params:scim:schemas:core:2.0:User:password",
    "urn:ietf:params:scim:schemas:extension:enterprise:2.0:User",
    "urn:ietf:params:scim:schemas:extension:enterprise:2.0:User:employeeNumber",
];

const DEVICE_NAMES: &[&str] = &[
    "enrollmentSecret",
    "firmware",
    "location",
    "location.rack",
    "interfaces.speed",
    "serialNumber",
    "tags",
];

fn selection(names: &'static [&'static str]) -> impl Strategy<Value = (bool, Vec<&'static str>)> {
    (any::<bool>(), prop::sample::subsequence(names.to_vec(), 0..=names.len()))
}

proptest! {
    #[test]
    fn test_returned_never_is_never_projected((include, names) in selection(USER_NAMES)) {
        let projected = if include {
            project_user(&names, &[])
        } else {
            project_user(&[], &names)
        };
        prop_assert!(projected.get("password").is_none());
        prop_assert!(projected.get("schemas").is_some());
        prop_assert!(projected.get("id").is_some());
    }

    #[test]
    fn test_write_only_is_never_projected((include, names) in selection(DEVICE_NAMES)) {
        let projected = if include {
            project_device(&names, &[])
        } else {
            project_device(&[], &names)
        };
        prop_assert!(projected.get("enrollmentSecret").is_none());
        if !include || !names.contains(&"firmware") {
            prop_assert!(projected.get("firmware").is_none());
        }
    }
}

#[test]
fn test_versioned_extension_urn_in_lists() {
    let registry = common::widget_registry();
    let widgets = registry.resource_schema("Widget").expect("Widget");
    let mut widget = json!({
        "schemas": [common::WIDGET_URN, common::WIDGET_EXTENSION_URN],
        "label": "Sprocket"
    });
    widget[common::WIDGET_EXTENSION_URN] = json!({"serial": "W-1", "batch": 7});

    let included = AttributeSelection::from_params(Some(common::WIDGET_EXTENSION_URN), None)
        .expect("versioned URN parses");
    let projected = included.apply(&widget, &widgets).expect("projection succeeds");
    assert!(projected.get("label").is_none());
    assert_eq!(projected[common::WIDGET_EXTENSION_URN]["batch"], 7);

    let excluded = AttributeSelection::from_params(None, Some(common::WIDGET_EXTENSION_URN))
        .expect("versioned URN parses");
    let projected = excluded.apply(&widget, &widgets).expect("projection succeeds");
    assert_eq!(projected["label"], "Sprocket");
    assert!(projected.get(common::WIDGET_EXTENSION_URN).is_none());
}
