// Token Codec Service
// Issues and verifies RS256-signed bearer credentials. Stateless after
// init: the key material is read once from the configured PEM files.

use std::fs;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

use crate::app_config::JwtSettings;

/// Errors for token encode/decode operations
#[derive(Error, Debug)]
pub enum TokenError {
    #[error("Token expired.")]
    Expired,

    #[error("Invalid token: {0}")]
    Invalid(String),

    #[error("Token encoding error: {0}")]
    Encoding(String),

    #[error("Invalid key material: {0}")]
    KeyLoad(String),
}

/// The two credential kinds the codec can mint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenType {
    Access,
    Refresh,
}

/// A freshly minted credential with its validity window
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Optional claims merged into the payload: `sid` on both kinds,
/// `fam`/`jti` only on refresh credentials.
#[derive(Debug, Clone, Default)]
pub struct ExtraClaims {
    pub sid: Option<Uuid>,
    pub fam: Option<Uuid>,
    pub jti: Option<Uuid>,
}

/// Verified payload of a decoded credential.
///
/// Kept as the raw claim map so the configured type-field name works, with
/// typed getters for everything the service layer reads.
#[derive(Debug, Clone)]
pub struct Claims(Map<String, Value>);

impl Claims {
    pub fn user_id(&self) -> Option<i64> {
        self.0.get("user_id").and_then(Value::as_i64)
    }

    pub fn str_claim(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(Value::as_str)
    }

    pub fn uuid_claim(&self, name: &str) -> Option<Uuid> {
        self.str_claim(name).and_then(|s| Uuid::parse_str(s).ok())
    }
}

/// RS256 codec for access and refresh credentials
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    algorithm: Algorithm,
    type_field: String,
    access_type: String,
    refresh_type: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("algorithm", &self.algorithm)
            .field("type_field", &self.type_field)
            .field("access_type", &self.access_type)
            .field("refresh_type", &self.refresh_type)
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .field("encoding_key", &"<redacted>")
            .field("decoding_key", &"<redacted>")
            .finish()
    }
}

impl TokenCodec {
    /// Build the codec from settings, reading the key files once
    pub fn from_config(settings: &JwtSettings) -> Result<Self, TokenError> {
        let private_pem = fs::read(&settings.private_key_path).map_err(|e| {
            TokenError::KeyLoad(format!(
                "cannot read {}: {}",
                settings.private_key_path.display(),
                e
            ))
        })?;
        let public_pem = fs::read(&settings.public_key_path).map_err(|e| {
            TokenError::KeyLoad(format!(
                "cannot read {}: {}",
                settings.public_key_path.display(),
                e
            ))
        })?;

        Self::from_rsa_pem(settings, &private_pem, &public_pem)
    }

    /// Build the codec from in-memory PEM key material
    pub fn from_rsa_pem(
        settings: &JwtSettings,
        private_pem: &[u8],
        public_pem: &[u8],
    ) -> Result<Self, TokenError> {
        let algorithm = Algorithm::from_str(&settings.algorithm)
            .map_err(|_| TokenError::KeyLoad(format!("unknown algorithm {}", settings.algorithm)))?;

        let encoding_key = EncodingKey::from_rsa_pem(private_pem)
            .map_err(|e| TokenError::KeyLoad(format!("private key: {}", e)))?;
        let decoding_key = DecodingKey::from_rsa_pem(public_pem)
            .map_err(|e| TokenError::KeyLoad(format!("public key: {}", e)))?;

        Ok(Self {
            encoding_key,
            decoding_key,
            algorithm,
            type_field: settings.type_field.clone(),
            access_type: settings.access_type.clone(),
            refresh_type: settings.refresh_type.clone(),
            access_ttl: Duration::minutes(settings.access_ttl_min),
            refresh_ttl: Duration::minutes(settings.refresh_ttl_min),
        })
    }

    /// Configured name of a token type ("access"/"refresh" by default)
    pub fn type_name(&self, token_type: TokenType) -> &str {
        match token_type {
            TokenType::Access => &self.access_type,
            TokenType::Refresh => &self.refresh_type,
        }
    }

    fn ttl_for(&self, token_type: TokenType) -> Duration {
        match token_type {
            TokenType::Access => self.access_ttl,
            TokenType::Refresh => self.refresh_ttl,
        }
    }

    /// Mint a signed credential for `user_id`.
    ///
    /// Payload: `user_id`, the configured type field, `iat`, `exp`, plus
    /// whatever `extra` carries. TTL is selected by token type.
    pub fn encode(
        &self,
        user_id: i64,
        token_type: TokenType,
        extra: ExtraClaims,
    ) -> Result<IssuedToken, TokenError> {
        let issued_at = Utc::now();
        let expires_at = issued_at + self.ttl_for(token_type);

        let mut payload = Map::new();
        payload.insert("user_id".to_string(), Value::from(user_id));
        payload.insert(
            self.type_field.clone(),
            Value::from(self.type_name(token_type)),
        );
        payload.insert("iat".to_string(), Value::from(issued_at.timestamp()));
        payload.insert("exp".to_string(), Value::from(expires_at.timestamp()));

        if let Some(sid) = extra.sid {
            payload.insert("sid".to_string(), Value::from(sid.to_string()));
        }
        if let Some(fam) = extra.fam {
            payload.insert("fam".to_string(), Value::from(fam.to_string()));
        }
        if let Some(jti) = extra.jti {
            payload.insert("jti".to_string(), Value::from(jti.to_string()));
        }

        let header = Header::new(self.algorithm);
        let token = encode(&header, &payload, &self.encoding_key)
            .map_err(|e| TokenError::Encoding(e.to_string()))?;

        Ok(IssuedToken {
            token,
            issued_at,
            expires_at,
        })
    }

    /// Verify signature and expiry, returning the claims.
    ///
    /// `iat` and `exp` are required, audience is not verified, no expiry
    /// leeway.
    pub fn decode(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(self.algorithm);
        validation.validate_aud = false;
        validation.validate_nbf = false;
        validation.set_required_spec_claims(&["exp"]);
        validation.leeway = 0;

        let data = decode::<Map<String, Value>>(token, &self.decoding_key, &validation).map_err(
            |e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid(e.to_string()),
            },
        )?;

        // jsonwebtoken does not know iat as a required claim, enforce it here
        if !data.claims.contains_key("iat") {
            return Err(TokenError::Invalid("missing iat claim".to_string()));
        }

        Ok(Claims(data.claims))
    }

    /// The declared type of a decoded credential, if any
    pub fn type_of<'c>(&self, claims: &'c Claims) -> Option<&'c str> {
        claims.str_claim(&self.type_field)
    }

    /// Whether the claims declare the expected token type
    pub fn is_type(&self, claims: &Claims, token_type: TokenType) -> bool {
        self.type_of(claims) == Some(self.type_name(token_type))
    }
}
