//! Schema document decoding and JSON Schema validation.

use lig_core::errors::CoreError;
use lig_core::relation::{Cardinality, RelationDescriptor};
use lig_core::schema::SchemaDoc;
use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::json;

const USERS_TOML: &str = r#"
[[class]]
name = "User"

[[class.relation]]
name = "settings"
cardinality = "one"
target = "Settings"
inverse = "user"

[[class.relation]]
name = "contacts"
cardinality = "many"
target = "User"
source = "users"

[[class]]
name = "Admin"
extends = "User"

[[class]]
name = "Settings"
cid_attribute = "_cid"

[[class.relation]]
name = "user"
cardinality = "one"
target = "User"
inverse = "settings"
"#;

#[test]
fn toml_document_decodes() {
    let doc = SchemaDoc::from_toml_str(USERS_TOML).expect("document decodes");

    assert_eq!(doc.classes.len(), 3);
    let user = doc.class("User").unwrap();
    assert_eq!(
        user.relations,
        vec![
            RelationDescriptor::one("settings", "Settings").with_inverse("user"),
            RelationDescriptor::many("contacts", "User").with_source("users"),
        ]
    );

    let admin = doc.class("Admin").unwrap();
    assert_eq!(admin.extends.as_deref(), Some("User"));
    assert!(!admin.own_registry);
    assert!(admin.relations.is_empty());

    let settings = doc.class("Settings").unwrap();
    assert_eq!(settings.cid_attribute.as_deref(), Some("_cid"));
    assert_eq!(settings.relations[0].cardinality, Cardinality::One);
}

#[test]
fn json_document_roundtrips() {
    let doc = SchemaDoc::from_toml_str(USERS_TOML).unwrap();
    let encoded = serde_json::to_string(&doc).unwrap();
    let decoded = SchemaDoc::from_json_str(&encoded).unwrap();
    assert_eq!(decoded, doc);
}

#[rstest]
#[case(json!({"class": [{"name": "User", "relation": [{"name": "x", "cardinality": "few", "target": "User"}]}]}))]
#[case(json!({"class": [{"relation": []}]}))]
#[case(json!({"class": "User"}))]
fn malformed_documents_are_rejected(#[case] value: serde_json::Value) {
    let err = SchemaDoc::from_value(value).unwrap_err();
    match err {
        CoreError::InvalidSchema { errors } => assert!(!errors.is_empty()),
        other => panic!("expected InvalidSchema, got {other:?}"),
    }
}

#[test]
fn empty_document_is_valid() {
    let doc = SchemaDoc::from_toml_str("").unwrap();
    assert!(doc.classes.is_empty());
}

#[test]
fn toml_syntax_errors_are_decode_errors() {
    let err = SchemaDoc::from_toml_str("[[class]\nname = ").unwrap_err();
    assert!(matches!(err, CoreError::Decode(_)));
}
