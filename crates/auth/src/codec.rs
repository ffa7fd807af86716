//! Token issuance and verification (HS256 JWTs).
//!
//! Access and refresh tokens are signed with independent secrets. The codec is
//! built once at startup and only read afterwards, so it can be shared across
//! request tasks behind an `Arc` without locking.

use chrono::{DateTime, Duration, SubsecRound, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::Serialize;
use thiserror::Error;

use crate::claims::{validate_claims, Claims, Identity, TokenKind, TokenValidationError};

pub const DEFAULT_ISSUER: &str = "quill-api";
pub const DEFAULT_ACCESS_TTL_SECS: i64 = 24 * 60 * 60;
pub const DEFAULT_REFRESH_TTL_SECS: i64 = 7 * 24 * 60 * 60;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("malformed token: {0}")]
    Malformed(String),

    #[error("invalid token signature")]
    InvalidSignature,

    #[error("token has expired")]
    Expired,

    #[error("token signing failed: {0}")]
    Signing(String),
}

impl TokenError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            TokenError::Malformed(_) => "malformed_token",
            TokenError::InvalidSignature => "invalid_signature",
            TokenError::Expired => "token_expired",
            TokenError::Signing(_) => "signing_error",
        }
    }

    fn from_jwt(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => TokenError::InvalidSignature,
            ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Malformed(err.to_string()),
        }
    }
}

impl From<TokenValidationError> for TokenError {
    fn from(err: TokenValidationError) -> Self {
        match err {
            TokenValidationError::Expired => TokenError::Expired,
            other => TokenError::Malformed(other.to_string()),
        }
    }
}

/// Signing configuration, built from the environment at startup.
#[derive(Clone)]
pub struct TokenConfig {
    pub access_secret: String,
    pub refresh_secret: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    pub issuer: String,
}

impl TokenConfig {
    pub fn new(access_secret: impl Into<String>, refresh_secret: impl Into<String>) -> Self {
        Self {
            access_secret: access_secret.into(),
            refresh_secret: refresh_secret.into(),
            access_ttl: Duration::seconds(DEFAULT_ACCESS_TTL_SECS),
            refresh_ttl: Duration::seconds(DEFAULT_REFRESH_TTL_SECS),
            issuer: DEFAULT_ISSUER.to_string(),
        }
    }

    pub fn with_ttls(mut self, access_ttl: Duration, refresh_ttl: Duration) -> Self {
        self.access_ttl = access_ttl;
        self.refresh_ttl = refresh_ttl;
        self
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = issuer.into();
        self
    }
}

impl core::fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TokenConfig")
            .field("access_secret", &"<redacted>")
            .field("refresh_secret", &"<redacted>")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .field("issuer", &self.issuer)
            .finish()
    }
}

/// A freshly signed token together with the claims it carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub kind: TokenKind,
    pub token: String,
    pub claims: Claims,
}

/// Access + refresh token pair handed out at login/register/refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
}

/// Verification seam used by request middleware.
pub trait TokenVerifier: Send + Sync {
    fn verify_at(&self, kind: TokenKind, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenError>;
}

struct SigningKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl SigningKeys {
    fn new(kind: TokenKind, secret: &str, ttl: Duration) -> Result<Self, TokenError> {
        if secret.is_empty() {
            return Err(TokenError::Signing(format!("{kind} secret is empty")));
        }
        if ttl <= Duration::zero() {
            return Err(TokenError::Signing(format!("{kind} ttl must be positive")));
        }
        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        })
    }
}

pub struct TokenCodec {
    access: SigningKeys,
    refresh: SigningKeys,
    issuer: String,
    validation: Validation,
}

impl TokenCodec {
    /// Build the codec. Fails with `TokenError::Signing` on an empty secret,
    /// identical access/refresh secrets, or a non-positive TTL.
    pub fn new(config: &TokenConfig) -> Result<Self, TokenError> {
        if config.access_secret == config.refresh_secret && !config.access_secret.is_empty() {
            return Err(TokenError::Signing(
                "access and refresh secrets must differ".to_string(),
            ));
        }

        let access = SigningKeys::new(TokenKind::Access, &config.access_secret, config.access_ttl)?;
        let refresh = SigningKeys::new(TokenKind::Refresh, &config.refresh_secret, config.refresh_ttl)?;

        // Expiry is checked by `validate_claims` so the boundary is exact.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub", "iss"]);
        validation.set_issuer(&[config.issuer.as_str()]);

        Ok(Self {
            access,
            refresh,
            issuer: config.issuer.clone(),
            validation,
        })
    }

    fn keys(&self, kind: TokenKind) -> &SigningKeys {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        }
    }

    pub fn ttl(&self, kind: TokenKind) -> Duration {
        self.keys(kind).ttl
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn issue(&self, kind: TokenKind, identity: &Identity) -> Result<IssuedToken, TokenError> {
        self.issue_at(kind, identity, Utc::now())
    }

    /// Issue a token as if the current time were `now`.
    pub fn issue_at(
        &self,
        kind: TokenKind,
        identity: &Identity,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, TokenError> {
        let keys = self.keys(kind);
        let issued_at = now.trunc_subsecs(0);
        let claims = Claims {
            subject_id: identity.subject_id,
            email: identity.email.clone(),
            role: identity.role,
            issued_at,
            expires_at: issued_at + keys.ttl,
            issuer: self.issuer.clone(),
        };

        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &keys.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))?;

        tracing::debug!(
            kind = %kind,
            subject_id = %claims.subject_id,
            expires_at = %claims.expires_at,
            "issued token"
        );

        Ok(IssuedToken { kind, token, claims })
    }

    pub fn verify(&self, kind: TokenKind, token: &str) -> Result<Claims, TokenError> {
        self.verify_at(kind, token, Utc::now())
    }

    pub fn issue_access_token(&self, identity: &Identity) -> Result<String, TokenError> {
        Ok(self.issue(TokenKind::Access, identity)?.token)
    }

    pub fn issue_refresh_token(&self, identity: &Identity) -> Result<String, TokenError> {
        Ok(self.issue(TokenKind::Refresh, identity)?.token)
    }

    pub fn verify_access(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify(TokenKind::Access, token)
    }

    pub fn verify_refresh(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify(TokenKind::Refresh, token)
    }

    pub fn issue_pair(&self, identity: &Identity) -> Result<TokenPair, TokenError> {
        Ok(TokenPair {
            access_token: self.issue_access_token(identity)?,
            refresh_token: self.issue_refresh_token(identity)?,
            token_type: "Bearer",
            expires_in: self.access.ttl.num_seconds(),
        })
    }
}

impl TokenVerifier for TokenCodec {
    fn verify_at(&self, kind: TokenKind, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenError> {
        let keys = self.keys(kind);
        let data = jsonwebtoken::decode::<Claims>(token, &keys.decoding, &self.validation)
            .map_err(TokenError::from_jwt)?;

        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use quill_core::UserId;

    use super::*;
    use crate::Role;

    const ALPHABET: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";

    fn codec() -> TokenCodec {
        TokenCodec::new(&TokenConfig::new("access-secret", "refresh-secret")).unwrap()
    }

    fn identity(role: Role) -> Identity {
        Identity {
            subject_id: UserId::new(),
            email: "u1@example.com".to_string(),
            role,
        }
    }

    #[test]
    fn access_round_trip_preserves_claims() {
        let codec = codec();
        let issued = codec.issue(TokenKind::Access, &identity(Role::User)).unwrap();

        let claims = codec.verify(TokenKind::Access, &issued.token).unwrap();
        assert_eq!(claims, issued.claims);
        assert_eq!(claims.expires_at, claims.issued_at + Duration::hours(24));
        assert_eq!(claims.issuer, DEFAULT_ISSUER);
    }

    #[test]
    fn refresh_ttl_is_seven_days() {
        let codec = codec();
        let issued = codec.issue(TokenKind::Refresh, &identity(Role::Admin)).unwrap();
        let claims = codec.verify_refresh(&issued.token).unwrap();
        assert_eq!(claims.ttl(), Duration::days(7));
        assert_eq!(claims.role, Role::Admin);
    }

    #[test]
    fn cross_kind_verification_fails_with_invalid_signature() {
        let codec = codec();
        let id = identity(Role::Admin);

        let access = codec.issue_access_token(&id).unwrap();
        let refresh = codec.issue_refresh_token(&id).unwrap();

        assert_eq!(codec.verify_refresh(&access), Err(TokenError::InvalidSignature));
        assert_eq!(codec.verify_access(&refresh), Err(TokenError::InvalidSignature));
    }

    #[test]
    fn expired_token_is_rejected_even_with_valid_signature() {
        let codec = codec();
        let long_ago = Utc::now() - Duration::days(2);
        let issued = codec.issue_at(TokenKind::Access, &identity(Role::User), long_ago).unwrap();

        assert_eq!(codec.verify_access(&issued.token), Err(TokenError::Expired));
    }

    #[test]
    fn token_is_expired_exactly_at_expires_at() {
        let codec = codec();
        let issued = codec.issue(TokenKind::Access, &identity(Role::User)).unwrap();
        let exp = issued.claims.expires_at;

        assert!(codec.verify_at(TokenKind::Access, &issued.token, exp - Duration::seconds(1)).is_ok());
        assert_eq!(
            codec.verify_at(TokenKind::Access, &issued.token, exp),
            Err(TokenError::Expired)
        );
    }

    #[test]
    fn garbage_is_malformed() {
        let codec = codec();
        assert!(matches!(codec.verify_access(""), Err(TokenError::Malformed(_))));
        assert!(matches!(codec.verify_access("abc"), Err(TokenError::Malformed(_))));
        assert!(matches!(codec.verify_access("a.b.c"), Err(TokenError::Malformed(_))));
    }

    #[test]
    fn token_from_another_deployment_fails_signature() {
        let ours = codec();
        let theirs = TokenCodec::new(&TokenConfig::new("other-access", "other-refresh")).unwrap();
        let token = theirs.issue_access_token(&identity(Role::Admin)).unwrap();
        assert_eq!(ours.verify_access(&token), Err(TokenError::InvalidSignature));
    }

    #[test]
    fn foreign_issuer_is_malformed() {
        let ours = codec();
        let theirs = TokenCodec::new(
            &TokenConfig::new("access-secret", "refresh-secret").with_issuer("someone-else"),
        )
        .unwrap();
        let token = theirs.issue_access_token(&identity(Role::User)).unwrap();
        assert!(matches!(ours.verify_access(&token), Err(TokenError::Malformed(_))));
    }

    #[test]
    fn correctly_signed_unknown_role_is_malformed() {
        let now = Utc::now().timestamp();
        let claims = serde_json::json!({
            "sub": UserId::new().to_string(),
            "email": "u1@example.com",
            "role": "superuser",
            "iat": now,
            "exp": now + 600,
            "iss": DEFAULT_ISSUER,
        });
        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"access-secret"),
        )
        .unwrap();

        assert!(matches!(codec().verify_access(&token), Err(TokenError::Malformed(_))));
    }

    #[test]
    fn empty_secret_is_a_signing_error() {
        let err = TokenCodec::new(&TokenConfig::new("", "refresh")).err().unwrap();
        assert!(matches!(err, TokenError::Signing(_)));

        let err = TokenCodec::new(&TokenConfig::new("access", "")).err().unwrap();
        assert!(matches!(err, TokenError::Signing(_)));
    }

    #[test]
    fn identical_secrets_are_rejected() {
        let err = TokenCodec::new(&TokenConfig::new("same", "same")).err().unwrap();
        assert!(matches!(err, TokenError::Signing(_)));
    }

    #[test]
    fn configured_ttls_are_used() {
        let config = TokenConfig::new("a", "r").with_ttls(Duration::minutes(15), Duration::days(30));
        let codec = TokenCodec::new(&config).unwrap();
        let pair = codec.issue_pair(&identity(Role::User)).unwrap();

        assert_eq!(pair.token_type, "Bearer");
        assert_eq!(pair.expires_in, 15 * 60);
        assert_eq!(codec.verify_refresh(&pair.refresh_token).unwrap().ttl(), Duration::days(30));
    }

    #[test]
    fn config_debug_redacts_secrets() {
        let rendered = format!("{:?}", TokenConfig::new("hunter2", "hunter3"));
        assert!(!rendered.contains("hunter2"));
        assert!(!rendered.contains("hunter3"));
    }

    fn mutate_char(token: &str, position: prop::sample::Index, shift: usize) -> String {
        // Only payload and signature characters are candidates.
        let header_end = token.find('.').unwrap();
        let candidates: Vec<usize> = token
            .char_indices()
            .filter(|(i, c)| *i > header_end && *c != '.')
            .map(|(i, _)| i)
            .collect();
        let at = candidates[position.index(candidates.len())];

        let original = token[at..].chars().next().unwrap();
        let from = ALPHABET.find(original).unwrap();
        let replacement = ALPHABET.as_bytes()[(from + shift) % ALPHABET.len()] as char;

        let mut mutated = String::with_capacity(token.len());
        mutated.push_str(&token[..at]);
        mutated.push(replacement);
        mutated.push_str(&token[at + 1..]);
        mutated
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: any single-character change to payload or signature breaks the signature.
        #[test]
        fn single_char_mutation_is_detected(
            position in any::<prop::sample::Index>(),
            shift in 1usize..64,
            admin in any::<bool>(),
        ) {
            let codec = codec();
            let role = if admin { Role::Admin } else { Role::User };
            let token = codec.issue_access_token(&identity(role)).unwrap();
            let mutated = mutate_char(&token, position, shift);

            prop_assert_ne!(&mutated, &token);
            prop_assert_eq!(codec.verify_access(&mutated), Err(TokenError::InvalidSignature));
        }

        /// Property: verify(issue(claims)) returns exactly the issued claims, for both kinds.
        #[test]
        fn round_trip_for_any_identity(
            local in "[a-z0-9._]{1,24}",
            admin in any::<bool>(),
            refresh in any::<bool>(),
        ) {
            let codec = codec();
            let kind = if refresh { TokenKind::Refresh } else { TokenKind::Access };
            let id = Identity {
                subject_id: UserId::new(),
                email: format!("{local}@example.com"),
                role: if admin { Role::Admin } else { Role::User },
            };

            let issued = codec.issue(kind, &id).unwrap();
            let claims = codec.verify(kind, &issued.token).unwrap();

            prop_assert_eq!(claims.identity(), id);
            prop_assert_eq!(claims.expires_at, claims.issued_at + codec.ttl(kind));
            prop_assert_eq!(claims, issued.claims);
        }
    }
}
