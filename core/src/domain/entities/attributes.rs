//! Bounded extra attributes carried in token claims.
//!
//! Attributes are a closed set of scalar values under validated keys. They never
//! influence verification; they are carried for the relying service to read.

use std::collections::{BTreeMap, BTreeSet};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::TokenError;

/// Maximum number of attributes per token
pub const MAX_ATTRIBUTES: usize = 16;

/// Maximum byte length of a text attribute value
pub const MAX_ATTRIBUTE_VALUE_LEN: usize = 256;

/// Claim names that attributes may not shadow
pub const RESERVED_CLAIMS: &[&str] = &[
    "typ", "sub", "roles", "sid", "fid", "gen", "iat", "exp", "nbf", "sexp", "jti", "iss",
    "aud", "client", "attrs",
];

static ATTRIBUTE_KEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z][a-z0-9_.-]{0,63}$").expect("valid attribute key regex"));

/// A single attribute value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Bool(bool),
    Integer(i64),
    Text(String),
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Bool(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Integer(value)
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::Text(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::Text(value)
    }
}

/// Validated attribute map
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenAttributes(BTreeMap<String, AttributeValue>);

impl TokenAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, key: &str) -> Option<&AttributeValue> {
        self.0.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &AttributeValue)> {
        self.0.iter()
    }

    /// Insert an attribute after validating key, value and count
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) -> Result<(), TokenError> {
        let key = key.into();
        let value = value.into();
        validate_key(&key)?;
        validate_value(&key, &value)?;
        if !self.0.contains_key(&key) && self.0.len() >= MAX_ATTRIBUTES {
            return Err(rejected(format!("more than {} attributes", MAX_ATTRIBUTES)));
        }
        self.0.insert(key, value);
        Ok(())
    }

    /// Builder-style insert
    pub fn with(
        mut self,
        key: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) -> Result<Self, TokenError> {
        self.insert(key, value)?;
        Ok(self)
    }

    /// Re-check bounds, used for maps that arrived through deserialization
    ///
    /// When `allowed` is set, every key must appear in it.
    pub fn validate(&self, allowed: Option<&BTreeSet<String>>) -> Result<(), TokenError> {
        if self.0.len() > MAX_ATTRIBUTES {
            return Err(rejected(format!("more than {} attributes", MAX_ATTRIBUTES)));
        }
        for (key, value) in &self.0 {
            validate_key(key)?;
            validate_value(key, value)?;
            if let Some(allowed) = allowed {
                if !allowed.contains(key) {
                    return Err(rejected(format!("attribute '{}' is not allowed", key)));
                }
            }
        }
        Ok(())
    }
}

fn validate_key(key: &str) -> Result<(), TokenError> {
    if !ATTRIBUTE_KEY.is_match(key) {
        return Err(rejected(format!("invalid attribute key '{}'", key)));
    }
    if RESERVED_CLAIMS.contains(&key) {
        return Err(rejected(format!("attribute '{}' shadows a reserved claim", key)));
    }
    Ok(())
}

fn validate_value(key: &str, value: &AttributeValue) -> Result<(), TokenError> {
    match value {
        AttributeValue::Text(text) if text.len() > MAX_ATTRIBUTE_VALUE_LEN => Err(rejected(
            format!("attribute '{}' exceeds {} bytes", key, MAX_ATTRIBUTE_VALUE_LEN),
        )),
        _ => Ok(()),
    }
}

fn rejected(reason: String) -> TokenError {
    TokenError::AttributesRejected { reason }
}
