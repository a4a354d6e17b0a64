/// Password hashing and verification
///
/// Two credential schemes are supported:
///
/// - **Argon2id** (default): salted PHC string, 64 MB memory, 3 iterations,
///   4 lanes, 32-byte output. Used for every new credential unless the
///   deployment is configured otherwise.
/// - **Sha256** (legacy): unsalted lowercase hex SHA-256 digest. Deterministic:
///   the same password always yields the same digest. Kept so that accounts
///   created before the Argon2id migration can still log in.
///
/// [`verify_password`] recognises the scheme from the stored digest, so both
/// kinds of credential can live side by side in the same table. Both paths
/// compare in constant time.
///
/// # Example
///
/// ```
/// use agrimarket_shared::auth::password::{hash_password, verify_password, PasswordScheme};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("super_secret_password_123", PasswordScheme::Argon2id)?;
/// assert!(verify_password("super_secret_password_123", &hash));
/// assert!(!verify_password("wrong_password", &hash));
/// # Ok(())
/// # }
/// ```

use std::str::FromStr;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, ParamsBuilder, Version,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Length of a hex-encoded SHA-256 digest
const SHA256_HEX_LENGTH: usize = 64;

/// Error type for password hashing operations
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    /// Failed to hash password
    #[error("Failed to hash password: {0}")]
    HashError(String),

    /// Unknown scheme name in configuration
    #[error("Unknown password scheme: {0}")]
    UnknownScheme(String),
}

/// Credential digest scheme
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PasswordScheme {
    /// Salted Argon2id PHC string
    #[default]
    Argon2id,

    /// Unsalted hex SHA-256 digest
    Sha256,
}

impl PasswordScheme {
    /// Gets scheme as string
    pub fn as_str(&self) -> &'static str {
        match self {
            PasswordScheme::Argon2id => "argon2id",
            PasswordScheme::Sha256 => "sha256",
        }
    }

    /// Detects the scheme a stored digest was produced with
    ///
    /// Returns `None` for digests in neither format.
    pub fn detect(digest: &str) -> Option<Self> {
        if digest.starts_with("$argon2") {
            Some(PasswordScheme::Argon2id)
        } else if digest.len() == SHA256_HEX_LENGTH
            && digest.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
        {
            Some(PasswordScheme::Sha256)
        } else {
            None
        }
    }
}

impl FromStr for PasswordScheme {
    type Err = PasswordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "argon2id" | "argon2" => Ok(PasswordScheme::Argon2id),
            "sha256" => Ok(PasswordScheme::Sha256),
            other => Err(PasswordError::UnknownScheme(other.to_string())),
        }
    }
}

/// Hashes a password with the given scheme
///
/// # Errors
///
/// Returns `PasswordError::HashError` if Argon2 hashing fails. The SHA-256
/// scheme never fails.
///
/// # Example
///
/// ```
/// use agrimarket_shared::auth::password::{hash_password, PasswordScheme};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("my_password", PasswordScheme::Argon2id)?;
/// assert!(hash.starts_with("$argon2id$"));
///
/// let legacy = hash_password("my_password", PasswordScheme::Sha256)?;
/// assert_eq!(legacy.len(), 64);
/// # Ok(())
/// # }
/// ```
pub fn hash_password(password: &str, scheme: PasswordScheme) -> Result<String, PasswordError> {
    match scheme {
        PasswordScheme::Argon2id => hash_argon2id(password),
        PasswordScheme::Sha256 => Ok(sha256_digest(password)),
    }
}

/// Deterministic hex SHA-256 digest of a password
pub fn sha256_digest(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

fn hash_argon2id(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    let params = ParamsBuilder::new()
        .m_cost(65536) // 64 MB
        .t_cost(3)
        .p_cost(4)
        .output_len(32)
        .build()
        .map_err(|e| PasswordError::HashError(format!("Invalid parameters: {}", e)))?;

    let argon2 = Argon2::new(argon2::Algorithm::Argon2id, Version::V0x13, params);

    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PasswordError::HashError(format!("Hash generation failed: {}", e)))?;

    Ok(password_hash.to_string())
}

/// Verifies a password against a stored digest
///
/// Returns `true` iff `password` produces `digest` under the digest's own
/// scheme. Mismatches, unrecognised formats and unparseable PHC strings all
/// return `false`; callers report every one of them as invalid credentials.
///
/// # Example
///
/// ```
/// use agrimarket_shared::auth::password::{sha256_digest, verify_password};
///
/// let digest = sha256_digest("correct_password");
/// assert!(verify_password("correct_password", &digest));
/// assert!(!verify_password("incorrect_password", &digest));
/// ```
pub fn verify_password(password: &str, digest: &str) -> bool {
    match PasswordScheme::detect(digest) {
        Some(PasswordScheme::Argon2id) => verify_argon2id(password, digest),
        Some(PasswordScheme::Sha256) => {
            let computed = sha256_digest(password);
            computed.as_bytes().ct_eq(digest.as_bytes()).into()
        }
        None => {
            tracing::warn!("Stored credential has an unrecognised digest format");
            false
        }
    }
}

/// Stand-in Argon2id credential for logins that match no account
///
/// Same parameters as freshly hashed credentials, so verifying against it
/// costs as much as verifying a real one. No password produces it.
const DUMMY_ARGON2ID_DIGEST: &str =
    "$argon2id$v=19$m=65536,t=3,p=4$RtLG5m8r5JmISifoFBZdRQ$Jcu6pl1miKMeF/cIJ/uCXrIpkU8YxX+mLXO8wDyulrg";

/// Stand-in legacy credential for logins that match no account
const DUMMY_SHA256_DIGEST: &str =
    "c7c7575b7335e967444124249414fab3d014c5fbcfb6717e60828a398bd4003e";

/// Digest a login attempt should be verified against
///
/// Returns the stored digest when an account was found, otherwise a dummy
/// digest of `scheme`. Verifying every attempt keeps unknown and known
/// identifiers indistinguishable by response time.
pub fn login_digest(stored: Option<&str>, scheme: PasswordScheme) -> &str {
    match (stored, scheme) {
        (Some(digest), _) => digest,
        (None, PasswordScheme::Argon2id) => DUMMY_ARGON2ID_DIGEST,
        (None, PasswordScheme::Sha256) => DUMMY_SHA256_DIGEST,
    }
}

fn verify_argon2id(password: &str, digest: &str) -> bool {
    let parsed_hash = match PasswordHash::new(digest) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::warn!(error = %e, "Stored Argon2 credential could not be parsed");
            return false;
        }
    };

    // Parameters are embedded in the PHC string
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// Validates password strength
///
/// Checks that password meets minimum security requirements:
/// - At least 8 characters long
/// - Contains at least one uppercase letter
/// - Contains at least one lowercase letter
/// - Contains at least one digit
/// - Contains at least one special character
///
/// # Example
///
/// ```
/// use agrimarket_shared::auth::password::validate_password_strength;
///
/// assert!(validate_password_strength("MyP@ssw0rd!").is_ok());
/// assert!(validate_password_strength("Sh0rt!").is_err());
/// assert!(validate_password_strength("Password123").is_err());
/// ```
pub fn validate_password_strength(password: &str) -> Result<(), String> {
    if password.chars().count() < 8 {
        return Err("Password must be at least 8 characters long".to_string());
    }

    if !password.chars().any(|c| c.is_uppercase()) {
        return Err("Password must contain at least one uppercase letter".to_string());
    }

    if !password.chars().any(|c| c.is_lowercase()) {
        return Err("Password must contain at least one lowercase letter".to_string());
    }

    if !password.chars().any(|c| c.is_numeric()) {
        return Err("Password must contain at least one digit".to_string());
    }

    if !password.chars().any(|c| !c.is_alphanumeric()) {
        return Err("Password must contain at least one special character".to_string());
    }

    Ok(())
}
