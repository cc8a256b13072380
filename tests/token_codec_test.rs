// Codec and bearer-extraction tests: round-trip laws, the failure
// taxonomy and the header parsing order. No database required.

mod common;

use auth_backend_core::middleware::verify_bearer;
use auth_backend_core::models::RefreshCredential;
use auth_backend_core::services::{ExtraClaims, TokenCodec, TokenError, TokenType};
use auth_backend_core::utils::auth_errors::AuthError;
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use uuid::Uuid;

fn codec() -> TokenCodec {
    common::test_codec()
}

/// Sign an arbitrary payload with the test private key, bypassing the codec
fn raw_token(payload: serde_json::Value) -> String {
    let key = EncodingKey::from_rsa_pem(common::TEST_RSA_PRIVATE_PEM.as_bytes()).unwrap();
    encode(&Header::new(Algorithm::RS256), &payload, &key).unwrap()
}

#[test]
fn test_access_round_trip_preserves_payload() {
    let codec = codec();
    let sid = Uuid::new_v4();

    let issued = codec
        .encode(
            1,
            TokenType::Access,
            ExtraClaims {
                sid: Some(sid),
                ..Default::default()
            },
        )
        .unwrap();

    let claims = codec.decode(&issued.token).unwrap();
    assert_eq!(claims.user_id(), Some(1));
    assert_eq!(codec.type_of(&claims), Some("access"));
    assert_eq!(claims.uuid_claim("sid"), Some(sid));
    assert_eq!(claims.uuid_claim("fam"), None);
    assert_eq!(claims.uuid_claim("jti"), None);

    // Access TTL default is 15 minutes
    assert_eq!((issued.expires_at - issued.issued_at).num_seconds(), 900);
}

#[test]
fn test_refresh_round_trip_carries_family_claims() {
    let codec = codec();
    let (sid, fam, jti) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

    let issued = codec
        .encode(
            42,
            TokenType::Refresh,
            ExtraClaims {
                sid: Some(sid),
                fam: Some(fam),
                jti: Some(jti),
            },
        )
        .unwrap();

    let claims = codec.decode(&issued.token).unwrap();
    assert_eq!(claims.user_id(), Some(42));
    assert_eq!(codec.type_of(&claims), Some("refresh"));
    assert!(codec.is_type(&claims, TokenType::Refresh));
    assert!(!codec.is_type(&claims, TokenType::Access));
    assert_eq!(claims.uuid_claim("sid"), Some(sid));
    assert_eq!(claims.uuid_claim("fam"), Some(fam));
    assert_eq!(claims.uuid_claim("jti"), Some(jti));

    // Refresh TTL default is 14 days
    assert_eq!(
        (issued.expires_at - issued.issued_at).num_seconds(),
        14 * 24 * 3600
    );
}

#[test]
fn test_expired_token_is_distinguished_from_invalid() {
    let codec = codec();
    let now = Utc::now().timestamp();

    let expired = raw_token(serde_json::json!({
        "user_id": 1,
        "type": "access",
        "iat": now - 3600,
        "exp": now - 60,
    }));

    assert!(matches!(codec.decode(&expired), Err(TokenError::Expired)));
}

#[test]
fn test_tampered_token_is_invalid() {
    let codec = codec();
    let issued = codec
        .encode(1, TokenType::Access, ExtraClaims::default())
        .unwrap();

    let mut tampered = issued.token.clone();
    tampered.pop();
    tampered.push('A');

    assert!(matches!(
        codec.decode(&tampered),
        Err(TokenError::Invalid(_))
    ));
    assert!(matches!(
        codec.decode("not.a.token"),
        Err(TokenError::Invalid(_))
    ));
}

#[test]
fn test_missing_iat_is_invalid() {
    let codec = codec();
    let now = Utc::now().timestamp();

    let no_iat = raw_token(serde_json::json!({
        "user_id": 1,
        "type": "access",
        "exp": now + 600,
    }));

    assert!(matches!(codec.decode(&no_iat), Err(TokenError::Invalid(_))));
}

#[test]
fn test_missing_exp_is_invalid() {
    let codec = codec();
    let now = Utc::now().timestamp();

    let no_exp = raw_token(serde_json::json!({
        "user_id": 1,
        "type": "access",
        "iat": now,
    }));

    assert!(matches!(codec.decode(&no_exp), Err(TokenError::Invalid(_))));
}

#[test]
fn test_configurable_type_field() {
    let mut settings = common::test_jwt_settings();
    settings.type_field = "typ".to_string();

    let codec = TokenCodec::from_rsa_pem(
        &settings,
        common::TEST_RSA_PRIVATE_PEM.as_bytes(),
        common::TEST_RSA_PUBLIC_PEM.as_bytes(),
    )
    .unwrap();

    let issued = codec
        .encode(1, TokenType::Refresh, ExtraClaims::default())
        .unwrap();
    let claims = codec.decode(&issued.token).unwrap();

    assert_eq!(claims.str_claim("typ"), Some("refresh"));
    assert_eq!(claims.str_claim("type"), None);
    assert!(codec.is_type(&claims, TokenType::Refresh));
}

#[test]
fn test_token_hash_is_stable() {
    let codec = codec();
    let issued = codec
        .encode(1, TokenType::Refresh, ExtraClaims::default())
        .unwrap();

    let hash1 = RefreshCredential::hash_token(&issued.token);
    let hash2 = RefreshCredential::hash_token(&issued.token);

    assert_eq!(hash1, hash2);
    assert_eq!(hash1.len(), 64);
}

// ---------------------------------------------------------------------------
// Bearer extraction failure order
// ---------------------------------------------------------------------------

#[test]
fn test_bearer_missing_header() {
    let codec = codec();
    assert!(matches!(
        verify_bearer(None, TokenType::Access, &codec),
        Err(AuthError::AuthHeaderMissing)
    ));
    assert!(matches!(
        verify_bearer(Some(""), TokenType::Access, &codec),
        Err(AuthError::AuthHeaderMissing)
    ));
    assert!(matches!(
        verify_bearer(Some("   "), TokenType::Access, &codec),
        Err(AuthError::AuthHeaderMissing)
    ));
}

#[test]
fn test_bearer_wrong_scheme() {
    let codec = codec();
    assert!(matches!(
        verify_bearer(Some("Basic dXNlcjpwYXNz"), TokenType::Access, &codec),
        Err(AuthError::AuthSchemeInvalid)
    ));
}

#[test]
fn test_bearer_scheme_without_credential() {
    let codec = codec();
    assert!(matches!(
        verify_bearer(Some("Bearer"), TokenType::Access, &codec),
        Err(AuthError::AuthHeaderMissing)
    ));
    assert!(matches!(
        verify_bearer(Some("Bearer   "), TokenType::Access, &codec),
        Err(AuthError::AuthHeaderMissing)
    ));
}

#[test]
fn test_bearer_scheme_is_case_insensitive() {
    let codec = codec();
    let issued = codec
        .encode(7, TokenType::Access, ExtraClaims::default())
        .unwrap();

    for scheme in ["Bearer", "bearer", "BEARER", "BeArEr"] {
        let header = format!("{} {}", scheme, issued.token);
        let verified = verify_bearer(Some(&header), TokenType::Access, &codec).unwrap();
        assert_eq!(verified.raw_token, issued.token);
        assert_eq!(verified.user_id().unwrap(), 7);
    }
}

#[test]
fn test_bearer_decode_failures_pass_through() {
    let codec = codec();
    let now = Utc::now().timestamp();

    assert!(matches!(
        verify_bearer(Some("Bearer garbage"), TokenType::Access, &codec),
        Err(AuthError::TokenInvalid(_))
    ));

    let expired = raw_token(serde_json::json!({
        "user_id": 1,
        "type": "access",
        "iat": now - 3600,
        "exp": now - 60,
    }));
    let header = format!("Bearer {}", expired);
    assert!(matches!(
        verify_bearer(Some(&header), TokenType::Access, &codec),
        Err(AuthError::TokenExpired)
    ));
}

#[test]
fn test_bearer_wrong_type_for_endpoint() {
    let codec = codec();

    let access = codec
        .encode(1, TokenType::Access, ExtraClaims::default())
        .unwrap();
    let refresh = codec
        .encode(1, TokenType::Refresh, ExtraClaims::default())
        .unwrap();

    // Access token presented to a refresh endpoint: named mismatch (400)
    let header = format!("Bearer {}", access.token);
    assert!(matches!(
        verify_bearer(Some(&header), TokenType::Refresh, &codec),
        Err(AuthError::TokenWrongType)
    ));

    // Refresh token presented to an access endpoint: unauthenticated (401)
    let header = format!("Bearer {}", refresh.token);
    assert!(matches!(
        verify_bearer(Some(&header), TokenType::Access, &codec),
        Err(AuthError::TokenInvalid(_))
    ));
}
