/// Authentication error taxonomy
///
/// Every failure of the token, identity and guard chain is one of these
/// variants. Messages are fixed strings: no variant carries the secret, the
/// raw token, or any part of a decoded payload.
///
/// All variants are terminal for the current request. The caller either
/// re-authenticates or is denied.

/// Error type for token verification, identity resolution and role guards
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// Request carried no bearer token
    #[error("Missing bearer token")]
    MissingToken,

    /// Token does not have exactly three dot-separated segments
    #[error("Malformed token")]
    MalformedToken,

    /// Signature does not match the header and payload
    #[error("Invalid token signature")]
    InvalidSignature,

    /// Token has no `exp` claim or it lies in the past
    #[error("Token has expired")]
    ExpiredToken,

    /// Payload segment could not be decoded into claims
    #[error("Malformed token payload")]
    MalformedPayload,

    /// Token subject has no matching identity record
    #[error("Unknown token subject")]
    UnknownSubject,

    /// Resolved identity lacks the required role
    #[error("Insufficient permissions")]
    Forbidden,

    /// Identity store failed or timed out
    #[error("Identity store unavailable")]
    StoreUnavailable,

    /// Token could not be produced
    #[error("Internal authentication failure")]
    Internal,
}

impl AuthError {
    /// Whether the error maps to an unauthorized (401) response
    ///
    /// The caller's credentials were not accepted; obtaining a fresh token
    /// may succeed.
    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            AuthError::MissingToken
                | AuthError::MalformedToken
                | AuthError::InvalidSignature
                | AuthError::ExpiredToken
                | AuthError::MalformedPayload
                | AuthError::UnknownSubject
        )
    }

    /// Short machine-readable code, suitable for structured log fields
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::MissingToken => "missing_token",
            AuthError::MalformedToken => "malformed_token",
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::ExpiredToken => "expired_token",
            AuthError::MalformedPayload => "malformed_payload",
            AuthError::UnknownSubject => "unknown_subject",
            AuthError::Forbidden => "forbidden",
            AuthError::StoreUnavailable => "store_unavailable",
            AuthError::Internal => "internal",
        }
    }
}
