//! Verified principal handed to the token core by the login collaborator.

use std::collections::BTreeSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::attributes::TokenAttributes;
use crate::errors::DomainError;

/// A verified identity
///
/// Produced by an external [`PrincipalStore`] after credential verification, or
/// reconstructed from verified token claims. Fields are read-only once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    subject: String,
    roles: BTreeSet<String>,
    session_binding_id: String,
    #[serde(default, skip_serializing_if = "TokenAttributes::is_empty")]
    attributes: TokenAttributes,
}

impl Principal {
    /// Creates a principal without extra attributes
    ///
    /// # Arguments
    ///
    /// * `subject` - Stable subject identifier
    /// * `roles` - Granted roles
    /// * `session_binding_id` - Identifier binding tokens to the login session (device, cookie, ...)
    pub fn new<I, R>(
        subject: impl Into<String>,
        roles: I,
        session_binding_id: impl Into<String>,
    ) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<String>,
    {
        Self {
            subject: subject.into(),
            roles: roles.into_iter().map(Into::into).collect(),
            session_binding_id: session_binding_id.into(),
            attributes: TokenAttributes::new(),
        }
    }

    /// Returns a copy carrying the given attributes
    pub fn with_attributes(mut self, attributes: TokenAttributes) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn roles(&self) -> &BTreeSet<String> {
        &self.roles
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    pub fn session_binding_id(&self) -> &str {
        &self.session_binding_id
    }

    pub fn attributes(&self) -> &TokenAttributes {
        &self.attributes
    }
}

/// External credential verifier
///
/// Password, OTP or any other login flow lives behind this trait; the token core
/// only receives the verified [`Principal`].
#[async_trait]
pub trait PrincipalStore: Send + Sync {
    /// Credential payload understood by this store
    type Credentials: Send + Sync;

    /// Verify credentials and return the principal they belong to
    ///
    /// # Returns
    /// * `Ok(Principal)` - Credentials verified
    /// * `Err(DomainError::Unauthorized)` - Credentials rejected
    async fn verify(&self, credentials: &Self::Credentials) -> Result<Principal, DomainError>;
}
