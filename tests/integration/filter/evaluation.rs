//! Filter evaluation against RFC 7643 example resources.

use crate::common::{self, fixtures::rfc_examples};
use scim_core::filter::{FilterExpression, filter_matches, parse_filter};
use scim_core::schema::SchemaRegistry;
use serde_json::{Value, json};

fn matches_in(registry: &SchemaRegistry, resource_type: &str, resource: &Value, filter: &str) -> bool {
    let schema = registry
        .resource_schema(resource_type)
        .expect("resource type registered");
    let expression = parse_filter(filter).expect("filter parses");
    filter_matches(resource, &schema, &expression)
}

fn user_matches(filter: &str) -> bool {
    common::init_logging();
    matches_in(
        &common::core_registry(),
        "User",
        &rfc_examples::enterprise_user(),
        filter,
    )
}

fn device_matches(filter: &str) -> bool {
    common::init_logging();
    matches_in(
        &common::registry_with_devices(),
        "Device",
        &rfc_examples::device(),
        filter,
    )
}

#[test]
fn test_rfc_search_examples() {
    assert!(user_matches(r#"userName eq "bjensen@example.com""#));
    assert!(user_matches(r#"name.familyName co "ens""#));
    assert!(user_matches(r#"userName sw "BJ""#));
    assert!(user_matches("title pr"));
    assert!(user_matches(r#"meta.lastModified gt "2011-05-13T04:42:34-07:00" or title pr"#));
    assert!(user_matches(r#"meta.lastModified ge "2011-05-13T04:42:34Z""#));
    assert!(user_matches(r#"meta.lastModified lt "2011-05-13T04:42:35Z""#));
    assert!(user_matches(
        r#"title pr and (emails co "example.com" or emails.value co "example.org")"#
    ));
    assert!(user_matches(r#"userType eq "Employee" and emails[type eq "work" and value co "@example.com"]"#));
    assert!(!user_matches(r#"userType ne "Employee" and not (emails co "example.com")"#));
}

#[test]
fn test_case_exact_controls_string_equality() {
    // userName is caseExact=false, id is caseExact=true
    assert!(user_matches(r#"userName eq "BJensen@Example.com""#));
    assert!(user_matches(r#"id eq "2819c223-7f76-453a-919d-413861904646""#));
    assert!(!user_matches(r#"id eq "2819C223-7F76-453A-919D-413861904646""#));

    // caseExact sub-attribute in a custom schema
    assert!(device_matches(r#"interfaces.value eq "eth0""#));
    assert!(!device_matches(r#"interfaces.value eq "ETH0""#));
    assert!(device_matches(r#"serialNumber sw "SN-""#));
    assert!(!device_matches(r#"serialNumber sw "sn-""#));
}

#[test]
fn test_multi_valued_existential_match() {
    assert!(user_matches(r#"emails.type eq "home""#));
    assert!(user_matches(r#"emails.type eq "work""#));
    assert!(!user_matches(r#"emails.type eq "other""#));
    assert!(user_matches(r#"phoneNumbers.value ew "4444""#));

    // Simple multi-valued attributes
    assert!(device_matches(r#"tags eq "core""#));
    assert!(device_matches(r#"tags sw "ed""#));
    assert!(!device_matches(r#"tags eq "lab""#));
}

#[test]
fn test_value_path_scopes_each_element() {
    assert!(user_matches(r#"addresses[type eq "work"]"#));
    assert!(user_matches(r#"addresses[type eq "home" and streetAddress co "Hollywood Blvd"]"#));
    // Conditions split across two different elements do not combine
    assert!(!user_matches(r#"addresses[type eq "home" and primary eq true]"#));
    assert!(user_matches(r#"addresses[type eq "work" and primary eq true]"#));
    assert!(!user_matches(r#"emails[type eq "fax"]"#));

    assert!(device_matches(r#"interfaces[speed gt 500 and primary eq true]"#));
    assert!(!device_matches(r#"interfaces[speed gt 500 and type eq "wifi"]"#));
}

#[test]
fn test_extension_attributes() {
    assert!(user_matches(
        r#"urn:ietf:params:scim:schemas:extension:enterprise:2.0:User:employeeNumber eq "701984""#
    ));
    assert!(user_matches(
        r#"urn:ietf:params:scim:schemas:extension:enterprise:2.0:User:manager.displayName sw "John""#
    ));
    // Unqualified names fall back to the extension schema
    assert!(user_matches(r#"costCenter eq "4130""#));
    assert!(!user_matches(r#"department eq "Sales""#));
}

#[test]
fn test_numeric_and_date_time_ordering() {
    assert!(device_matches("slots eq 8"));
    assert!(device_matches("slots ge 8 and slots lt 9"));
    assert!(device_matches("rating gt 4"));
    assert!(device_matches("rating le 4.5"));
    assert!(!device_matches("rating gt 4.5"));
    assert!(device_matches("interfaces.speed lt 500"));

    // 10:15 at +01:00 is 09:15 UTC
    assert!(device_matches(r#"lastSeen eq "2024-03-01T09:15:00Z""#));
    assert!(device_matches(r#"lastSeen gt "2024-03-01T09:00:00Z""#));
    assert!(!device_matches(r#"lastSeen gt "2024-03-01T10:00:00Z""#));
}

#[test]
fn test_boolean_and_binary_support_equality_only() {
    assert!(user_matches("active eq true"));
    assert!(user_matches("active ne false"));
    assert!(!user_matches("active gt false"));

    assert!(device_matches(r#"firmware eq "AAECAwQ=""#));
    assert!(!device_matches(r#"firmware eq "aaecawq=""#));
    assert!(!device_matches(r#"firmware sw "AAE""#));
}

#[test]
fn test_type_mismatch_does_not_match() {
    assert!(!user_matches("userName eq 42"));
    assert!(!user_matches(r#"active eq "true""#));
    assert!(!device_matches(r#"slots eq "8""#));
    assert!(!device_matches(r#"lastSeen gt "yesterday""#));
    // Negation of a mismatch is a match
    assert!(user_matches("not (userName eq 42)"));
}

#[test]
fn test_unknown_attribute_does_not_match() {
    assert!(!user_matches(r#"nickname2 eq "Babs""#));
    assert!(!user_matches("shoeSize pr"));
    assert!(!user_matches(r#"emails[label eq "work"]"#));
    assert!(!user_matches(r#"urn:example:unknown:2.0:User:nickName eq "Babs""#));
    // The rest of the expression still evaluates
    assert!(user_matches(r#"shoeSize gt 10 or nickName eq "Babs""#));
}

#[test]
fn test_null_literal() {
    assert!(user_matches("nickName ne null"));
    assert!(user_matches("ims eq null"));
    assert!(!user_matches("ims ne null"));
    assert!(!user_matches("nickName gt null"));
}

#[test]
fn test_implicit_value_sub_attribute() {
    assert!(user_matches(r#"emails eq "babs@jensen.org""#));
    assert!(user_matches(r#"emails co "@example.com""#));
    assert!(device_matches(r#"interfaces eq "wlan0""#));
    // name has no value sub-attribute
    assert!(!user_matches(r#"name eq "Barbara""#));
}

#[test]
fn test_group_filters() {
    let registry = common::core_registry();
    let group = rfc_examples::group();
    assert!(matches_in(&registry, "Group", &group, r#"displayName eq "tour guides""#));
    assert!(matches_in(
        &registry,
        "Group",
        &group,
        r#"members[value eq "902c246b-6245-4190-8e05-00816be7344a"]"#
    ));
    assert!(!matches_in(&registry, "Group", &group, r#"members.display eq "John Smith""#));
}

#[test]
fn test_search_scan_over_resources() {
    let registry = common::core_registry();
    let users = registry.resource_schema_for_endpoint("/Users").expect("Users endpoint");
    let expression = parse_filter(r#"emails[type eq "work"] and active eq true"#).expect("filter parses");

    let resources: Vec<Value> = (0..10)
        .map(|n| {
            json!({
                "schemas": ["urn:ietf:params:scim:schemas:core:2.0:User"],
                "userName": format!("user{}", n),
                "active": n % 2 == 0,
                "emails": [{"value": format!("user{}@example.com", n), "type": if n < 5 { "work" } else { "home" }}]
            })
        })
        .collect();

    let hits: Vec<&str> = resources
        .iter()
        .filter(|resource| expression.matches(resource, &users))
        .filter_map(|resource| resource["userName"].as_str())
        .collect();
    assert_eq!(hits, vec!["user0", "user2", "user4"]);
}

#[test]
fn test_non_object_resource_never_matches() {
    let registry = common::core_registry();
    let users = registry.resource_schema("User").expect("User");
    let expression = FilterExpression::present(scim_core::AttributeReference::attribute("userName"));
    assert!(!filter_matches(&json!(["userName"]), &users, &expression));
    assert!(!filter_matches(&Value::Null, &users, &expression));
}
