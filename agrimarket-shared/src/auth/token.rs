/// Compact signed identity tokens
///
/// Tokens are three base64url segments (no padding) joined by `.`:
///
/// ```text
/// base64url({"alg":"HS256","typ":"TOKEN"}) . base64url(claims) . base64url(signature)
/// ```
///
/// The signature is HMAC-SHA256 over the exact ASCII bytes
/// `header_b64 + "." + payload_b64`. Verification recomputes it over the
/// received segments and compares in constant time, so no re-serialization
/// ever takes part in verification. Claims are serialized with keys in
/// lexicographic order, which keeps minted payloads byte-stable.
///
/// Tokens are stateless: there is no revocation. A token stops being valid
/// only when the verification-time clock passes its `exp` claim.
///
/// # Example
///
/// ```
/// use agrimarket_shared::auth::token::{Claims, TokenCodec, TokenSecret};
/// use chrono::Duration;
///
/// # fn example() -> Result<(), agrimarket_shared::auth::AuthError> {
/// let codec = TokenCodec::new(TokenSecret::from("k"));
/// let token = codec.encode(&Claims::new("alice"), Duration::hours(1))?;
///
/// let claims = codec.verifier().decode(&token)?;
/// assert_eq!(claims.sub, "alice");
/// # Ok(())
/// # }
/// ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use super::error::AuthError;

type HmacSha256 = Hmac<Sha256>;

/// Signing algorithm written into every token header
pub const TOKEN_ALGORITHM: &str = "HS256";

/// Token type written into every token header
pub const TOKEN_TYPE: &str = "TOKEN";

/// Claim keys owned by [`Claims`] fields rather than the extra map
const RESERVED_CLAIMS: [&str; 2] = ["sub", "exp"];

/// Process-wide signing secret
///
/// Loaded once at startup and shared read-only behind an `Arc`. The `Debug`
/// impl never prints the secret bytes.
#[derive(Clone)]
pub struct TokenSecret(Arc<[u8]>);

impl TokenSecret {
    /// Wraps raw secret bytes
    pub fn new(bytes: impl AsRef<[u8]>) -> Self {
        Self(Arc::from(bytes.as_ref()))
    }

    /// Length of the secret in bytes
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the secret is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for TokenSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TokenSecret(<redacted>)")
    }
}

impl From<&str> for TokenSecret {
    fn from(value: &str) -> Self {
        Self::new(value.as_bytes())
    }
}

impl From<String> for TokenSecret {
    fn from(value: String) -> Self {
        Self::new(value.into_bytes())
    }
}

/// Fixed token header
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenHeader {
    /// Signing algorithm, always `HS256`
    pub alg: String,

    /// Token type, always `TOKEN`
    pub typ: String,
}

impl Default for TokenHeader {
    fn default() -> Self {
        Self {
            alg: TOKEN_ALGORITHM.to_string(),
            typ: TOKEN_TYPE.to_string(),
        }
    }
}

/// Primitive claim value
///
/// Nested objects and arrays are not valid claim values; a payload that
/// contains one fails to decode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClaimValue {
    /// Boolean claim
    Bool(bool),

    /// Integer claim
    Integer(i64),

    /// Floating point claim
    Float(f64),

    /// String claim
    Text(String),
}

impl From<bool> for ClaimValue {
    fn from(value: bool) -> Self {
        ClaimValue::Bool(value)
    }
}

impl From<i64> for ClaimValue {
    fn from(value: i64) -> Self {
        ClaimValue::Integer(value)
    }
}

impl From<f64> for ClaimValue {
    fn from(value: f64) -> Self {
        ClaimValue::Float(value)
    }
}

impl From<&str> for ClaimValue {
    fn from(value: &str) -> Self {
        ClaimValue::Text(value.to_string())
    }
}

impl From<String> for ClaimValue {
    fn from(value: String) -> Self {
        ClaimValue::Text(value)
    }
}

/// Identity and expiry data carried inside a token
///
/// - `sub`: subject, the username of the authenticated user
/// - `exp`: absolute expiry in Unix seconds, stamped by [`TokenCodec::encode`]
/// - `extra`: any additional primitive claims, carried opaquely
#[derive(Debug, Clone, PartialEq)]
pub struct Claims {
    /// Subject (username)
    pub sub: String,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Additional claims, keyed by name
    pub extra: BTreeMap<String, ClaimValue>,
}

impl Claims {
    /// Creates claims for a subject
    ///
    /// `exp` starts at zero and is overwritten when the claims are encoded.
    pub fn new(sub: impl Into<String>) -> Self {
        Self {
            sub: sub.into(),
            exp: 0,
            extra: BTreeMap::new(),
        }
    }

    /// Adds an extra claim
    ///
    /// `sub` and `exp` are reserved and silently ignored here; set the
    /// fields directly instead.
    pub fn with_claim(mut self, key: impl Into<String>, value: impl Into<ClaimValue>) -> Self {
        let key = key.into();
        if !RESERVED_CLAIMS.contains(&key.as_str()) {
            self.extra.insert(key, value.into());
        }
        self
    }

    /// Looks up an extra claim
    pub fn get(&self, key: &str) -> Option<&ClaimValue> {
        self.extra.get(key)
    }

    /// Expiry as a timestamp, if representable
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }

    /// Checks if the claims have expired at `now`
    ///
    /// A token is still valid during the second named by `exp`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.exp < now.timestamp()
    }

    /// Canonical payload bytes: a JSON object with keys in sorted order
    ///
    /// Non-finite floats have no JSON form and are refused.
    fn canonical_payload(&self) -> Result<Vec<u8>, AuthError> {
        if self
            .extra
            .values()
            .any(|value| matches!(value, ClaimValue::Float(f) if !f.is_finite()))
        {
            tracing::debug!("Refusing to encode a non-finite float claim");
            return Err(AuthError::Internal);
        }

        let mut ordered: BTreeMap<&str, ClaimValue> = self
            .extra
            .iter()
            .filter(|(key, _)| !RESERVED_CLAIMS.contains(&key.as_str()))
            .map(|(key, value)| (key.as_str(), value.clone()))
            .collect();
        ordered.insert("sub", ClaimValue::Text(self.sub.clone()));
        ordered.insert("exp", ClaimValue::Integer(self.exp));

        serde_json::to_vec(&ordered).map_err(|_| AuthError::Internal)
    }
}

/// Payload shape accepted on the wire
///
/// `exp` is optional here so that a missing expiry is reported as
/// [`AuthError::ExpiredToken`] rather than a parse failure.
#[derive(Deserialize)]
struct WireClaims {
    sub: String,

    #[serde(default)]
    exp: Option<i64>,

    #[serde(flatten)]
    extra: BTreeMap<String, ClaimValue>,
}

/// Computes the base64url HMAC-SHA256 signature of `signing_input`
fn sign(secret: &TokenSecret, signing_input: &str) -> Result<String, AuthError> {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| AuthError::Internal)?;
    mac.update(signing_input.as_bytes());
    Ok(URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes()))
}

/// Mints signed tokens
#[derive(Debug, Clone)]
pub struct TokenCodec {
    secret: TokenSecret,
}

impl TokenCodec {
    /// Creates a codec that signs with `secret`
    pub fn new(secret: TokenSecret) -> Self {
        Self { secret }
    }

    /// Returns a verifier sharing this codec's secret
    pub fn verifier(&self) -> TokenVerifier {
        TokenVerifier::new(self.secret.clone())
    }

    /// Encodes claims into a token expiring `ttl` from now
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Internal`] if serialization or signing fails.
    pub fn encode(&self, claims: &Claims, ttl: Duration) -> Result<String, AuthError> {
        self.encode_at(claims, ttl, Utc::now())
    }

    /// Encodes claims into a token expiring `ttl` after `now`
    ///
    /// A negative `ttl` produces a token that is already expired.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Internal`] if `now + ttl` is out of range or a
    /// float claim is NaN or infinite.
    pub fn encode_at(
        &self,
        claims: &Claims,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<String, AuthError> {
        let expires_at = now.checked_add_signed(ttl).ok_or_else(|| {
            tracing::debug!("Token expiry is outside the representable range");
            AuthError::Internal
        })?;

        let mut stamped = claims.clone();
        stamped.exp = expires_at.timestamp();

        let header = serde_json::to_vec(&TokenHeader::default()).map_err(|_| AuthError::Internal)?;
        let payload = stamped.canonical_payload()?;

        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(header),
            URL_SAFE_NO_PAD.encode(payload)
        );
        let signature = sign(&self.secret, &signing_input)?;

        Ok(format!("{}.{}", signing_input, signature))
    }
}

/// Verifies tokens and recovers their claims
#[derive(Debug, Clone)]
pub struct TokenVerifier {
    secret: TokenSecret,
}

impl TokenVerifier {
    /// Creates a verifier that checks signatures against `secret`
    pub fn new(secret: TokenSecret) -> Self {
        Self { secret }
    }

    /// Decodes and validates a token against the current clock
    ///
    /// # Errors
    ///
    /// In check order:
    /// - [`AuthError::MalformedToken`]: not exactly three segments
    /// - [`AuthError::InvalidSignature`]: signature mismatch
    /// - [`AuthError::MalformedPayload`]: payload is not valid claims
    /// - [`AuthError::ExpiredToken`]: `exp` missing or in the past
    pub fn decode(&self, token: &str) -> Result<Claims, AuthError> {
        self.decode_at(token, Utc::now())
    }

    /// Decodes and validates a token against an explicit clock instant
    pub fn decode_at(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, AuthError> {
        let segments: Vec<&str> = token.split('.').collect();
        let [header_b64, payload_b64, signature_b64] = segments.as_slice() else {
            return Err(AuthError::MalformedToken);
        };

        let expected = sign(&self.secret, &format!("{}.{}", header_b64, payload_b64))?;
        if !bool::from(signature_b64.as_bytes().ct_eq(expected.as_bytes())) {
            return Err(AuthError::InvalidSignature);
        }

        let payload = URL_SAFE_NO_PAD
            .decode(payload_b64)
            .map_err(|_| AuthError::MalformedPayload)?;
        let wire: WireClaims =
            serde_json::from_slice(&payload).map_err(|_| AuthError::MalformedPayload)?;

        let exp = wire.exp.ok_or(AuthError::ExpiredToken)?;
        let claims = Claims {
            sub: wire.sub,
            exp,
            extra: wire.extra,
        };
        if claims.is_expired_at(now) {
            return Err(AuthError::ExpiredToken);
        }

        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec(secret: &str) -> TokenCodec {
        TokenCodec::new(TokenSecret::from(secret))
    }

    /// Produces a correctly signed token around an arbitrary payload
    fn sign_payload(secret: &str, payload: &[u8]) -> String {
        let header_b64 = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"TOKEN"}"#);
        let signing_input = format!("{}.{}", header_b64, URL_SAFE_NO_PAD.encode(payload));
        let signature = sign(&TokenSecret::from(secret), &signing_input).unwrap();
        format!("{}.{}", signing_input, signature)
    }

    #[test]
    fn test_round_trip_adds_exp() {
        let codec = codec("test-secret");
        let now = Utc::now();
        let claims = Claims::new("alice")
            .with_claim("role", "seller")
            .with_claim("verified", true)
            .with_claim("shop_id", 42i64);

        let token = codec.encode_at(&claims, Duration::seconds(3600), now).unwrap();
        let decoded = codec.verifier().decode_at(&token, now).unwrap();

        let mut expected = claims.clone();
        expected.exp = now.timestamp() + 3600;
        assert_eq!(decoded, expected);
    }

    #[test]
    fn test_header_segment_is_fixed() {
        let token = codec("k").encode(&Claims::new("alice"), Duration::minutes(5)).unwrap();
        let header_b64 = token.split('.').next().unwrap();

        let header = URL_SAFE_NO_PAD.decode(header_b64).unwrap();
        assert_eq!(header, br#"{"alg":"HS256","typ":"TOKEN"}"#);
        assert!(!token.contains('='));
    }

    #[test]
    fn test_payload_keys_are_sorted() {
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let claims = Claims::new("alice").with_claim("zone", "north").with_claim("a", 1i64);

        let token = codec("k").encode_at(&claims, Duration::seconds(60), now).unwrap();
        let payload_b64 = token.split('.').nth(1).unwrap();
        let payload = String::from_utf8(URL_SAFE_NO_PAD.decode(payload_b64).unwrap()).unwrap();

        assert_eq!(
            payload,
            r#"{"a":1,"exp":1700000060,"sub":"alice","zone":"north"}"#
        );
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let codec = codec("k");
        let now = Utc::now();
        let claims = Claims::new("bob").with_claim("x", "y");

        let first = codec.encode_at(&claims, Duration::hours(1), now).unwrap();
        let second = codec.encode_at(&claims, Duration::hours(1), now).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_reserved_keys_are_not_extra_claims() {
        let claims = Claims::new("alice").with_claim("sub", "mallory").with_claim("exp", 1i64);
        assert!(claims.extra.is_empty());
        assert_eq!(claims.sub, "alice");
    }

    #[test]
    fn test_tampered_segments_fail_signature() {
        let codec = codec("tamper-secret");
        let verifier = codec.verifier();
        let token = codec
            .encode(&Claims::new("alice").with_claim("role", "user"), Duration::hours(1))
            .unwrap();
        let parts: Vec<&str> = token.split('.').collect();

        for segment in 0..2 {
            let original = URL_SAFE_NO_PAD.decode(parts[segment]).unwrap();
            for index in 0..original.len() {
                for bit in 0..8 {
                    let mut flipped = original.clone();
                    flipped[index] ^= 1 << bit;

                    let mut tampered: Vec<String> = parts.iter().map(|p| p.to_string()).collect();
                    tampered[segment] = URL_SAFE_NO_PAD.encode(&flipped);

                    assert_eq!(
                        verifier.decode(&tampered.join(".")),
                        Err(AuthError::InvalidSignature),
                        "segment {} byte {} bit {}",
                        segment,
                        index,
                        bit
                    );
                }
            }
        }
    }

    #[test]
    fn test_tampered_signature_fails() {
        let codec = codec("k");
        let token = codec.encode(&Claims::new("alice"), Duration::hours(1)).unwrap();
        let (signed, signature) = token.rsplit_once('.').unwrap();

        let truncated = format!("{}.{}", signed, &signature[..signature.len() - 1]);
        assert_eq!(codec.verifier().decode(&truncated), Err(AuthError::InvalidSignature));

        let empty = format!("{}.", signed);
        assert_eq!(codec.verifier().decode(&empty), Err(AuthError::InvalidSignature));
    }

    #[test]
    fn test_wrong_secret_fails_signature() {
        let token = codec("secret1").encode(&Claims::new("alice"), Duration::hours(1)).unwrap();
        let result = codec("wrong-secret").verifier().decode(&token);
        assert_eq!(result, Err(AuthError::InvalidSignature));
    }

    #[test]
    fn test_negative_ttl_is_expired() {
        let codec = codec("k");
        let token = codec.encode(&Claims::new("alice"), Duration::seconds(-1)).unwrap();
        assert_eq!(codec.verifier().decode(&token), Err(AuthError::ExpiredToken));
    }

    #[test]
    fn test_expiry_boundary_is_inclusive() {
        let codec = codec("k");
        let issued = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let token = codec.encode_at(&Claims::new("alice"), Duration::seconds(10), issued).unwrap();
        let verifier = codec.verifier();

        let at_exp = issued + Duration::seconds(10);
        assert!(verifier.decode_at(&token, at_exp).is_ok());

        let after_exp = at_exp + Duration::seconds(1);
        assert_eq!(verifier.decode_at(&token, after_exp), Err(AuthError::ExpiredToken));
    }

    #[test]
    fn test_wrong_segment_count_is_malformed() {
        let verifier = codec("k").verifier();

        assert_eq!(verifier.decode("a.b"), Err(AuthError::MalformedToken));
        assert_eq!(verifier.decode("a.b.c.d"), Err(AuthError::MalformedToken));
        assert_eq!(verifier.decode(""), Err(AuthError::MalformedToken));
        assert_eq!(verifier.decode("no-dots-at-all"), Err(AuthError::MalformedToken));
    }

    #[test]
    fn test_segment_check_happens_before_signature() {
        let token = codec("k").encode(&Claims::new("alice"), Duration::hours(1)).unwrap();
        let extended = format!("{}.extra", token);
        assert_eq!(codec("k").verifier().decode(&extended), Err(AuthError::MalformedToken));
    }

    #[test]
    fn test_signed_garbage_payload_is_malformed() {
        let verifier = codec("k").verifier();

        let not_json = sign_payload("k", b"not json");
        assert_eq!(verifier.decode(&not_json), Err(AuthError::MalformedPayload));

        let missing_sub = sign_payload("k", br#"{"exp":9999999999}"#);
        assert_eq!(verifier.decode(&missing_sub), Err(AuthError::MalformedPayload));

        let nested = sign_payload("k", br#"{"sub":"alice","exp":9999999999,"profile":{"a":1}}"#);
        assert_eq!(verifier.decode(&nested), Err(AuthError::MalformedPayload));

        let array = sign_payload("k", br#"["alice"]"#);
        assert_eq!(verifier.decode(&array), Err(AuthError::MalformedPayload));
    }

    #[test]
    fn test_signed_payload_without_exp_is_expired() {
        let verifier = codec("k").verifier();
        let token = sign_payload("k", br#"{"sub":"alice"}"#);
        assert_eq!(verifier.decode(&token), Err(AuthError::ExpiredToken));
    }

    #[test]
    fn test_errors_do_not_echo_token_contents() {
        let verifier = codec("super-secret-value").verifier();
        let token = sign_payload("other", br#"{"sub":"alice","exp":1}"#);

        let message = verifier.decode(&token).unwrap_err().to_string();
        assert!(!message.contains("alice"));
        assert!(!message.contains(&token));
        assert!(!message.contains("super-secret-value"));
    }

    #[test]
    fn test_secret_debug_is_redacted() {
        let secret = TokenSecret::from("super-secret-value");
        let rendered = format!("{:?}", TokenCodec::new(secret));
        assert!(!rendered.contains("super-secret-value"));
        assert!(rendered.contains("redacted"));
    }

    #[test]
    fn test_claims_expiry_helpers() {
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let mut claims = Claims::new("alice");
        claims.exp = now.timestamp();

        assert!(!claims.is_expired_at(now));
        assert!(claims.is_expired_at(now + Duration::seconds(1)));
        assert_eq!(claims.expires_at(), Some(now));
    }

    #[test]
    fn test_out_of_range_ttl_is_an_error() {
        let codec = codec("test-secret");

        let result = codec.encode(&Claims::new("alice"), Duration::days(365 * 300_000));
        assert_eq!(result, Err(AuthError::Internal));

        let result = codec.encode_at(&Claims::new("alice"), -Duration::days(365 * 300_000), Utc::now());
        assert_eq!(result, Err(AuthError::Internal));
    }

    #[test]
    fn test_non_finite_float_claims_are_refused() {
        let codec = codec("test-secret");

        for value in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let claims = Claims::new("alice").with_claim("score", value);
            assert_eq!(codec.encode(&claims, Duration::hours(1)), Err(AuthError::Internal));
        }

        let claims = Claims::new("alice").with_claim("score", 0.5);
        let token = codec.encode(&claims, Duration::hours(1)).unwrap();
        let decoded = codec.verifier().decode(&token).unwrap();
        assert_eq!(decoded.get("score"), Some(&ClaimValue::Float(0.5)));
    }
}
