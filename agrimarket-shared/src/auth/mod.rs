/// Authentication and authorization core
///
/// # Modules
///
/// - [`password`]: credential hashing (Argon2id, legacy SHA-256) and verification
/// - [`token`]: signed token encoding ([`token::TokenCodec`]) and verification
///   ([`token::TokenVerifier`])
/// - [`identity`]: identity store trait and claim-to-user resolution
/// - [`authorization`]: role guards
/// - [`middleware`]: Axum middleware wiring the chain together
/// - [`error`]: the [`AuthError`] taxonomy
///
/// # Flow
///
/// Login: password verify → `TokenCodec::encode`.
///
/// Protected request: `TokenVerifier::decode` → `IdentityResolver::resolve` →
/// `require_role` → handler.
///
/// # Example
///
/// ```
/// use agrimarket_shared::auth::password::{hash_password, verify_password, PasswordScheme};
/// use agrimarket_shared::auth::token::{Claims, TokenCodec, TokenSecret};
/// use chrono::Duration;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("user_password", PasswordScheme::Sha256)?;
/// assert!(verify_password("user_password", &hash));
///
/// let codec = TokenCodec::new(TokenSecret::from("secret-key"));
/// let token = codec.encode(&Claims::new("alice"), Duration::minutes(30))?;
/// assert_eq!(codec.verifier().decode(&token)?.sub, "alice");
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod error;
pub mod identity;
pub mod middleware;
pub mod password;
pub mod token;

pub use error::AuthError;
