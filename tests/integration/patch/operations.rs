//! RFC 7644 section 3.5.2 PATCH examples.

use super::patch_resource;
use crate::common::{self, fixtures::rfc_examples};
use scim_core::error::PatchError;
use scim_core::patch::apply_patch;
use scim_core::schema::Mutability;
use serde_json::json;

const BABS: &str = "2819c223-7f76-453a-919d-413861904646";
const MANDY: &str = "902c246b-6245-4190-8e05-00816be7344a";

#[test]
fn test_add_member_to_group() {
    let group = rfc_examples::group();
    let result = patch_resource(
        "Group",
        &group,
        vec![json!({
            "op": "add",
            "path": "members",
            "value": [{
                "display": "John Smith",
                "$ref": "https://example.com/v2/Users/26118915-6090-4610-87e4-49d8ca9f808d",
                "value": "26118915-6090-4610-87e4-49d8ca9f808d"
            }]
        })],
    )
    .expect("add succeeds");

    let members = result["members"].as_array().expect("members array");
    assert_eq!(members.len(), 3);
    assert_eq!(members[2]["display"], "John Smith");
    assert_eq!(members[0]["value"], BABS);
}

#[test]
fn test_add_without_path_merges_attributes() {
    let user = rfc_examples::user_full();
    let result = patch_resource(
        "User",
        &user,
        vec![json!({
            "op": "add",
            "value": {
                "emails": [{"value": "babs@jensen.org", "type": "home"}],
                "nickname": "Babsy"
            }
        })],
    )
    .expect("add succeeds");

    // The home email is already present and is not duplicated
    assert_eq!(result["emails"].as_array().map(Vec::len), Some(2));
    // The key takes the schema-declared casing
    assert_eq!(result["nickName"], "Babsy");
    assert!(result.get("nickname").is_none());
}

#[test]
fn test_add_to_empty_collection() {
    let user = rfc_examples::user_minimal();
    let result = patch_resource(
        "User",
        &user,
        vec![json!({"op": "add", "path": "emails", "value": [{"value": "a@b.com"}]})],
    )
    .expect("add succeeds");
    assert_eq!(result["emails"], json!([{"value": "a@b.com"}]));
}

#[test]
fn test_remove_single_member() {
    let group = rfc_examples::group();
    let result = patch_resource(
        "Group",
        &group,
        vec![json!({"op": "remove", "path": format!("members[value eq \"{}\"]", BABS)})],
    )
    .expect("remove succeeds");

    let members = result["members"].as_array().expect("members array");
    assert_eq!(members.len(), 1);
    assert_eq!(members[0]["value"], MANDY);
}

#[test]
fn test_remove_all_members() {
    let group = rfc_examples::group();
    let result = patch_resource("Group", &group, vec![json!({"op": "remove", "path": "members"})])
        .expect("remove succeeds");
    assert!(result.get("members").is_none());
    assert_eq!(result["displayName"], "Tour Guides");
}

#[test]
fn test_remove_then_add_members() {
    let group = rfc_examples::group();
    let result = patch_resource(
        "Group",
        &group,
        vec![
            json!({"op": "remove", "path": "members"}),
            json!({"op": "add", "path": "members", "value": [
                {"display": "James Smith", "value": "08e1d05d-121c-4561-8b96-473d93df9210"}
            ]}),
        ],
    )
    .expect("patch succeeds");
    assert_eq!(
        result["members"],
        json!([{"display": "James Smith", "value": "08e1d05d-121c-4561-8b96-473d93df9210"}])
    );
}

#[test]
fn test_replace_members() {
    let group = rfc_examples::group();
    let result = patch_resource(
        "Group",
        &group,
        vec![json!({"op": "replace", "path": "members", "value": [
            {"display": "Babs Jensen", "value": BABS},
            {"display": "James Smith", "value": "08e1d05d-121c-4561-8b96-473d93df9210"}
        ]})],
    )
    .expect("replace succeeds");
    let members = result["members"].as_array().expect("members array");
    assert_eq!(members.len(), 2);
    assert!(members.iter().all(|m| m.get("type").is_none()));
}

#[test]
fn test_replace_filtered_element() {
    let user = rfc_examples::user_full();
    let result = patch_resource(
        "User",
        &user,
        vec![json!({
            "op": "replace",
            "path": "addresses[type eq \"work\"]",
            "value": {
                "type": "work",
                "streetAddress": "911 Universal City Plaza",
                "locality": "Hollywood",
                "region": "CA",
                "postalCode": "91608",
                "country": "US",
                "formatted": "911 Universal City Plaza\nHollywood, CA 91608 US",
                "primary": true
            }
        })],
    )
    .expect("replace succeeds");

    let addresses = result["addresses"].as_array().expect("addresses");
    assert_eq!(addresses.len(), 2);
    assert_eq!(addresses[0]["streetAddress"], "911 Universal City Plaza");
    assert_eq!(addresses[0]["country"], "US");
    assert_eq!(addresses[1]["streetAddress"], "456 Hollywood Blvd");
}

#[test]
fn test_replace_filtered_sub_attribute() {
    let user = rfc_examples::user_full();
    let result = patch_resource(
        "User",
        &user,
        vec![json!({
            "op": "replace",
            "path": "addresses[type eq \"work\"].streetAddress",
            "value": "1010 Broadway Ave"
        })],
    )
    .expect("replace succeeds");

    assert_eq!(result["addresses"][0]["streetAddress"], "1010 Broadway Ave");
    assert_eq!(result["addresses"][0]["locality"], "Hollywood");
    assert_eq!(result["addresses"][1]["streetAddress"], "456 Hollywood Blvd");
}

#[test]
fn test_replace_without_path() {
    let user = rfc_examples::user_full();
    let result = patch_resource(
        "User",
        &user,
        vec![json!({
            "op": "replace",
            "value": {
                "emails": [{"value": "bjensen@example.com", "type": "work", "primary": true}],
                "nickName": "Babs",
                "name": {"givenName": "Barb"}
            }
        })],
    )
    .expect("replace succeeds");

    assert_eq!(result["emails"].as_array().map(Vec::len), Some(1));
    assert_eq!(result["nickName"], "Babs");
    // Single-valued complex attributes merge
    assert_eq!(result["name"]["givenName"], "Barb");
    assert_eq!(result["name"]["familyName"], "Jensen");
}

#[test]
fn test_remove_with_filter_no_match() {
    let user = rfc_examples::user_full();
    let result = patch_resource(
        "User",
        &user,
        vec![json!({"op": "remove", "path": "emails[type eq \"fax\"]"})],
    );
    assert_eq!(result, Err(PatchError::no_target("emails[type eq \"fax\"]")));
    assert_scim_type!(result, "noTarget");
}

#[test]
fn test_replace_with_filter_no_match() {
    let user = rfc_examples::user_full();
    let result = patch_resource(
        "User",
        &user,
        vec![json!({"op": "replace", "path": "phoneNumbers[type eq \"fax\"].value", "value": "555"})],
    );
    assert_scim_type!(result, "noTarget");
}

#[test]
fn test_remove_filtered_sub_attribute() {
    let user = rfc_examples::user_full();
    let result = patch_resource(
        "User",
        &user,
        vec![json!({"op": "remove", "path": "emails[type eq \"work\"].primary"})],
    )
    .expect("remove succeeds");
    assert!(result["emails"][0].get("primary").is_none());
    assert_eq!(result["emails"][0]["value"], "bjensen@example.com");
}

#[test]
fn test_extension_attribute_registers_schema() {
    let user = rfc_examples::user_full();
    let result = patch_resource(
        "User",
        &user,
        vec![json!({
            "op": "replace",
            "path": "urn:ietf:params:scim:schemas:extension:enterprise:2.0:User:employeeNumber",
            "value": "701984"
        })],
    )
    .expect("replace succeeds");

    assert_eq!(
        result["urn:ietf:params:scim:schemas:extension:enterprise:2.0:User"]["employeeNumber"],
        "701984"
    );
    assert_eq!(
        result["schemas"],
        json!([
            "urn:ietf:params:scim:schemas:core:2.0:User",
            "urn:ietf:params:scim:schemas:extension:enterprise:2.0:User"
        ])
    );
}

#[test]
fn test_read_only_sub_attribute_rejected() {
    let user = rfc_examples::enterprise_user();
    let result = patch_resource(
        "User",
        &user,
        vec![json!({
            "op": "replace",
            "path": "urn:ietf:params:scim:schemas:extension:enterprise:2.0:User:manager.displayName",
            "value": "Jane Smith"
        })],
    );
    assert_eq!(
        result,
        Err(PatchError::mutability("displayName", Mutability::ReadOnly))
    );
}

#[test]
fn test_read_only_sub_attribute_inside_object_value() {
    let user = rfc_examples::enterprise_user();
    let result = patch_resource(
        "User",
        &user,
        vec![json!({
            "op": "add",
            "path": "urn:ietf:params:scim:schemas:extension:enterprise:2.0:User:manager",
            "value": {"displayName": "Boss"}
        })],
    );
    assert_eq!(
        result,
        Err(PatchError::mutability("displayName", Mutability::ReadOnly))
    );

    let device = rfc_examples::device();
    let result = patch_resource(
        "Device",
        &device,
        vec![json!({"op": "replace", "path": "location", "value": {"site": "DC2", "assetTag": "A-200"}})],
    );
    assert_eq!(result, Err(PatchError::mutability("assetTag", Mutability::ReadOnly)));
    assert_scim_type!(result, "mutability");

    let moved = patch_resource(
        "Device",
        &device,
        vec![json!({"op": "replace", "path": "location", "value": {"site": "DC2"}})],
    )
    .expect("read-write sub-attribute");
    assert_eq!(moved["location"]["site"], "DC2");
    assert_eq!(moved["location"]["assetTag"], "A-100");
}

#[test]
fn test_immutable_sub_attribute_inside_filtered_replace() {
    let group = rfc_examples::group();
    let result = patch_resource(
        "Group",
        &group,
        vec![json!({
            "op": "replace",
            "path": format!("members[value eq \"{}\"]", BABS),
            "value": {"value": "08e1d05d-121c-4561-8b96-473d93df9210"}
        })],
    );
    assert_eq!(result, Err(PatchError::mutability("value", Mutability::Immutable)));

    // Same outcome as addressing the sub-attribute directly
    let direct = patch_resource(
        "Group",
        &group,
        vec![json!({
            "op": "replace",
            "path": format!("members[value eq \"{}\"].value", BABS),
            "value": "08e1d05d-121c-4561-8b96-473d93df9210"
        })],
    );
    assert_eq!(direct, result);
}

#[test]
fn test_extension_manager_and_removal() {
    let user = rfc_examples::enterprise_user();
    let result = patch_resource(
        "User",
        &user,
        vec![
            json!({
                "op": "replace",
                "path": "urn:ietf:params:scim:schemas:extension:enterprise:2.0:User:manager.value",
                "value": "08e1d05d-121c-4561-8b96-473d93df9210"
            }),
            json!({
                "op": "remove",
                "path": "urn:ietf:params:scim:schemas:extension:enterprise:2.0:User"
            }),
        ],
    )
    .expect("patch succeeds");

    assert!(
        result
            .get("urn:ietf:params:scim:schemas:extension:enterprise:2.0:User")
            .is_none()
    );
    assert_eq!(result["schemas"], json!(["urn:ietf:params:scim:schemas:core:2.0:User"]));
}

#[test]
fn test_mutability_enforcement() {
    let user = rfc_examples::user_full();

    let result = patch_resource(
        "User",
        &user,
        vec![json!({"op": "replace", "path": "id", "value": "new-id"})],
    );
    assert_eq!(result, Err(PatchError::mutability("id", Mutability::ReadOnly)));

    let result = patch_resource(
        "User",
        &user,
        vec![json!({"op": "remove", "path": "groups"})],
    );
    assert_scim_type!(result, "mutability");

    let result = patch_resource(
        "User",
        &user,
        vec![json!({"op": "replace", "path": "meta.lastModified", "value": "2020-01-01T00:00:00Z"})],
    );
    assert_scim_type!(result, "mutability");
}

#[test]
fn test_immutable_attribute_set_once() {
    let mut device = rfc_examples::device();

    let result = patch_resource(
        "Device",
        &device,
        vec![json!({"op": "replace", "path": "serialNumber", "value": "SN-0000"})],
    );
    assert_eq!(
        result,
        Err(PatchError::mutability("serialNumber", Mutability::Immutable))
    );

    device
        .as_object_mut()
        .expect("device object")
        .remove("serialNumber");
    let result = patch_resource(
        "Device",
        &device,
        vec![json!({"op": "add", "path": "serialNumber", "value": "SN-0000"})],
    )
    .expect("initial assignment succeeds");
    assert_eq!(result["serialNumber"], "SN-0000");
}

#[test]
fn test_invalid_paths() {
    let user = rfc_examples::user_full();
    for (operation, reason) in [
        (json!({"op": "remove"}), "requires a path"),
        (json!({"op": "add", "path": "emails[type eq \"work\"]", "value": {"value": "x@y.com"}}), "value filter"),
        (json!({"op": "replace", "path": "shoeSize", "value": 11}), "not defined"),
        (json!({"op": "replace", "path": "title[value eq \"x\"]", "value": "y"}), "multi-valued complex"),
        (json!({"op": "replace", "path": "emails[type eq \"work\"].label", "value": "y"}), "no sub-attribute"),
    ] {
        let result = patch_resource("User", &user, vec![operation]);
        assert_scim_type!(result, "invalidPath");
        assert_error_message_contains!(result, reason);
    }
}

#[test]
fn test_invalid_values() {
    let device = rfc_examples::device();
    for operation in [
        json!({"op": "replace", "path": "slots", "value": "eight"}),
        json!({"op": "replace", "path": "slots", "value": 8.5}),
        json!({"op": "replace", "path": "rating", "value": true}),
        json!({"op": "add", "path": "tags", "value": [1, 2]}),
        json!({"op": "replace", "path": "tags", "value": "single"}),
        json!({"op": "add", "path": "interfaces", "value": [{"value": "eth1", "mtu": 1500}]}),
        json!({"op": "replace", "path": "interfaces[type eq \"wifi\"].speed", "value": "fast"}),
        json!({"op": "add", "path": "location", "value": "HQ"}),
        json!({"op": "add", "path": "displayName"}),
    ] {
        let result = patch_resource("Device", &device, vec![operation.clone()]);
        assert!(
            matches!(result, Err(PatchError::InvalidValue { .. })),
            "{} should be rejected, got {:?}",
            operation,
            result
        );
    }
}

#[test]
fn test_operations_commit_one_at_a_time() {
    let registry = common::core_registry();
    let users = registry.resource_schema("User").expect("User");
    let mut user = rfc_examples::user_full();

    let operations = vec![
        common::op(json!({"op": "replace", "path": "title", "value": "Chief Guide"})),
        common::op(json!({"op": "replace", "path": "id", "value": "other"})),
        common::op(json!({"op": "replace", "path": "nickName", "value": "never applied"})),
    ];
    let err = apply_patch(&mut user, &users, &operations).expect_err("id is read-only");
    assert!(matches!(err, PatchError::Mutability { .. }));

    // The first operation is committed, the failing one and its successors are not
    assert_eq!(user["title"], "Chief Guide");
    assert_eq!(user["id"], BABS);
    assert_eq!(user["nickName"], "Babs");
}

#[test]
fn test_replace_with_null_removes() {
    let user = rfc_examples::user_full();
    let result = patch_resource(
        "User",
        &user,
        vec![
            json!({"op": "replace", "path": "nickName", "value": null}),
            json!({"op": "replace", "path": "name", "value": {"middleName": null}}),
        ],
    )
    .expect("patch succeeds");
    assert!(result.get("nickName").is_none());
    assert!(result["name"].get("middleName").is_none());
    assert_eq!(result["name"]["givenName"], "Barbara");
}

#[test]
fn test_versioned_extension_urn_as_path() {
    let registry = common::widget_registry();
    let widgets = registry.resource_schema("Widget").expect("Widget");
    let mut widget = json!({"schemas": [common::WIDGET_URN], "label": "Sprocket"});

    let operations = vec![common::op(json!({
        "op": "add",
        "path": common::WIDGET_EXTENSION_URN,
        "value": {"serial": "W-1", "batch": 7}
    }))];
    apply_patch(&mut widget, &widgets, &operations).expect("add extension");
    assert_eq!(widget[common::WIDGET_EXTENSION_URN], json!({"serial": "W-1", "batch": 7}));
    assert_eq!(
        widget["schemas"],
        json!([common::WIDGET_URN, common::WIDGET_EXTENSION_URN])
    );

    let operations = vec![common::op(json!({
        "op": "remove",
        "path": common::WIDGET_EXTENSION_URN
    }))];
    apply_patch(&mut widget, &widgets, &operations).expect("remove extension");
    assert!(widget.get(common::WIDGET_EXTENSION_URN).is_none());
    assert_eq!(widget["schemas"], json!([common::WIDGET_URN]));
}
