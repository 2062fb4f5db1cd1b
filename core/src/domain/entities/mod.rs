//! Domain entities representing principals, tokens and revocation records.

pub mod attributes;
pub mod principal;
pub mod revocation;
pub mod token;

#[cfg(test)]
mod tests;

pub use attributes::{AttributeValue, TokenAttributes, MAX_ATTRIBUTES, MAX_ATTRIBUTE_VALUE_LEN};
pub use principal::{Principal, PrincipalStore};
pub use revocation::{
    FamilyRevocation, FamilySession, RecordOutcome, RevocationEntry, RevocationReason,
};
pub use token::{
    AccessClaims, AccessToken, ClientKind, RefreshClaims, RefreshToken, TokenClaims, TokenKind,
    TokenPair, ABSOLUTE_SESSION_DAYS, ACCESS_TOKEN_EXPIRY_MINUTES, JWT_AUDIENCE, JWT_ISSUER,
    REFRESH_TOKEN_EXPIRY_DAYS,
};
