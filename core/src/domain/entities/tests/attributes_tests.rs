//! Unit tests for bounded token attributes

use std::collections::BTreeSet;

use crate::domain::entities::attributes::{
    AttributeValue, TokenAttributes, MAX_ATTRIBUTES, MAX_ATTRIBUTE_VALUE_LEN,
};
use crate::errors::TokenError;

#[test]
fn test_accepts_scalar_values() {
    let attrs = TokenAttributes::new()
        .with("tenant", "acme")
        .and_then(|a| a.with("mfa", true))
        .and_then(|a| a.with("tier.level", 3i64))
        .unwrap();

    assert_eq!(attrs.len(), 3);
    assert_eq!(attrs.get("mfa"), Some(&AttributeValue::Bool(true)));
    assert_eq!(attrs.get("tier.level"), Some(&AttributeValue::Integer(3)));
}

#[test]
fn test_rejects_invalid_keys() {
    let mut attrs = TokenAttributes::new();
    let too_long = "k".repeat(65);
    for key in ["Tenant", "1st", "", "has space", too_long.as_str()] {
        let result = attrs.insert(key, "x");
        assert!(
            matches!(result, Err(TokenError::AttributesRejected { .. })),
            "key {:?} should be rejected",
            key
        );
    }
    assert!(attrs.is_empty());
}

#[test]
fn test_rejects_reserved_claim_names() {
    let mut attrs = TokenAttributes::new();
    assert!(attrs.insert("sub", "admin").is_err());
    assert!(attrs.insert("exp", 0i64).is_err());
    assert!(attrs.insert("roles", "admin").is_err());
}

#[test]
fn test_rejects_oversized_text() {
    let mut attrs = TokenAttributes::new();
    assert!(attrs.insert("note", "a".repeat(MAX_ATTRIBUTE_VALUE_LEN)).is_ok());
    assert!(attrs
        .insert("note", "a".repeat(MAX_ATTRIBUTE_VALUE_LEN + 1))
        .is_err());
}

#[test]
fn test_entry_count_is_bounded() {
    let mut attrs = TokenAttributes::new();
    for i in 0..MAX_ATTRIBUTES {
        attrs.insert(format!("key{}", i), i as i64).unwrap();
    }
    assert!(attrs.insert("overflow", 1i64).is_err());
    // Overwriting an existing key does not grow the map
    assert!(attrs.insert("key0", 42i64).is_ok());
}

#[test]
fn test_allow_list() {
    let attrs = TokenAttributes::new().with("tenant", "acme").unwrap();
    let allowed: BTreeSet<String> = ["tenant".to_string()].into_iter().collect();
    assert!(attrs.validate(Some(&allowed)).is_ok());

    let other: BTreeSet<String> = ["region".to_string()].into_iter().collect();
    assert!(matches!(
        attrs.validate(Some(&other)),
        Err(TokenError::AttributesRejected { .. })
    ));
}

#[test]
fn test_deserialized_map_is_revalidated() {
    let attrs: TokenAttributes = serde_json::from_str(r#"{"Bad Key": 1}"#).unwrap();
    assert!(attrs.validate(None).is_err());

    let nested = serde_json::from_str::<TokenAttributes>(r#"{"k": {"a": 1}}"#);
    assert!(nested.is_err());
}
