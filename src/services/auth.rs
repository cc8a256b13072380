// Auth Service
// Session lifecycle and refresh-credential rotation with reuse detection.
//
// Every operation runs over one UnitOfWork. Rotation is the delicate part:
// the predecessor's transition to used and the successor's insertion happen
// in a single transaction, and a failed rotation escalates to revocation of
// the whole family plus its session in a second transaction that commits
// even though the request itself fails.

use std::sync::Arc;

use chrono::Utc;
use ipnetwork::IpNetwork;
use serde::Serialize;
use uuid::Uuid;

use crate::db::UnitOfWork;
use crate::models::revoke_reason::RevokeReason;
use crate::models::{AuthSession, RefreshCredential, RefreshTokenError, SessionRead};
use crate::services::token::{ExtraClaims, TokenCodec, TokenType};
use crate::utils::auth_errors::AuthError;

/// The credential pair handed to clients
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// Maximum stored user-agent length; longer values are cut, not rejected
const USER_AGENT_MAX_LEN: usize = 255;

enum RotationAttempt {
    Rotated,
    NotActive,
}

pub struct AuthService<'u> {
    uow: &'u mut UnitOfWork,
    codec: Arc<TokenCodec>,
}

impl<'u> AuthService<'u> {
    pub fn new(uow: &'u mut UnitOfWork, codec: Arc<TokenCodec>) -> Self {
        Self { uow, codec }
    }

    /// Open a session for an already-authenticated, active user: one new
    /// session row, one root refresh credential (fresh family), and the
    /// token pair.
    pub async fn login(
        &mut self,
        user_id: i64,
        user_agent: Option<String>,
        ip_address: Option<IpNetwork>,
    ) -> Result<TokenPair, AuthError> {
        let sid = Uuid::new_v4();
        let fam = Uuid::new_v4();
        let jti = Uuid::new_v4();

        let access = self.codec.encode(
            user_id,
            TokenType::Access,
            ExtraClaims {
                sid: Some(sid),
                ..Default::default()
            },
        )?;
        let refresh = self.codec.encode(
            user_id,
            TokenType::Refresh,
            ExtraClaims {
                sid: Some(sid),
                fam: Some(fam),
                jti: Some(jti),
            },
        )?;

        let token_hash = RefreshCredential::hash_token(&refresh.token);
        let user_agent = user_agent.map(|ua| ua.chars().take(USER_AGENT_MAX_LEN).collect());
        let now = Utc::now();
        let refresh_issued_at = refresh.issued_at;
        let refresh_expires_at = refresh.expires_at;

        self.uow
            .transaction::<_, AuthError, _>(|tx| {
                Box::pin(async move {
                    AuthSession::create_session(tx, user_id, sid, user_agent, ip_address, now)
                        .await?;
                    RefreshCredential::create_refresh(
                        tx,
                        user_id,
                        jti,
                        fam,
                        sid,
                        token_hash,
                        refresh_issued_at,
                        refresh_expires_at,
                    )
                    .await?;
                    Ok(())
                })
            })
            .await?;

        tracing::info!(user_id, session_id = %sid, "session opened");

        Ok(TokenPair {
            access_token: access.token,
            refresh_token: refresh.token,
            token_type: "Bearer".to_string(),
            expires_in: (access.expires_at - access.issued_at).num_seconds(),
        })
    }

    /// Redeem a refresh credential for a new pair.
    ///
    /// Exactly one concurrent redemption of the same token can succeed: the
    /// rotation UPDATE only matches an active row. Any other presentation
    /// (already used, revoked, expired, unknown) is treated as a compromise
    /// indicator; the whole family and its session are revoked, that
    /// revocation is committed, and the request fails with
    /// `RefreshReuseDetected`.
    pub async fn rotate(&mut self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        let claims = self.codec.decode(refresh_token)?;
        if !self.codec.is_type(&claims, TokenType::Refresh) {
            return Err(AuthError::TokenWrongType);
        }

        let sid = claims
            .uuid_claim("sid")
            .ok_or(AuthError::MalformedRefreshToken)?;
        let fam = claims
            .uuid_claim("fam")
            .ok_or(AuthError::MalformedRefreshToken)?;
        let user_id = claims.user_id().ok_or(AuthError::MalformedRefreshToken)?;

        // Captured before encoding so the successor's issued_at can never
        // precede the predecessor's used_at
        let now = Utc::now();

        let new_jti = Uuid::new_v4();
        let new_refresh = self.codec.encode(
            user_id,
            TokenType::Refresh,
            ExtraClaims {
                sid: Some(sid),
                fam: Some(fam),
                jti: Some(new_jti),
            },
        )?;
        let new_access = self.codec.encode(
            user_id,
            TokenType::Access,
            ExtraClaims {
                sid: Some(sid),
                ..Default::default()
            },
        )?;

        let old_hash = RefreshCredential::hash_token(refresh_token);
        let new_hash = RefreshCredential::hash_token(&new_refresh.token);
        let new_issued_at = new_refresh.issued_at;
        let new_expires_at = new_refresh.expires_at;

        let attempt = self
            .uow
            .transaction::<_, AuthError, _>(|tx| {
                Box::pin(async move {
                    match RefreshCredential::rotate_active(
                        tx,
                        &old_hash,
                        new_jti,
                        new_hash,
                        new_issued_at,
                        new_expires_at,
                        now,
                    )
                    .await
                    {
                        Ok(_successor) => {}
                        Err(RefreshTokenError::NotActive) => {
                            return Ok(RotationAttempt::NotActive)
                        }
                        Err(e) => return Err(e.into()),
                    }

                    AuthSession::touch(tx, sid, now).await?;
                    Ok(RotationAttempt::Rotated)
                })
            })
            .await?;

        match attempt {
            RotationAttempt::Rotated => Ok(TokenPair {
                access_token: new_access.token,
                refresh_token: new_refresh.token,
                token_type: "Bearer".to_string(),
                expires_in: (new_access.expires_at - new_access.issued_at).num_seconds(),
            }),
            RotationAttempt::NotActive => {
                tracing::warn!(
                    family_id = %fam,
                    session_id = %sid,
                    "refresh reuse detected, revoking family and session"
                );

                let when = Utc::now();
                // This revocation must outlive the failing request, so it
                // commits in its own transaction before the error surfaces.
                self.uow
                    .transaction::<_, AuthError, _>(|tx| {
                        Box::pin(async move {
                            RefreshCredential::revoke_family(
                                tx,
                                fam,
                                RevokeReason::ReuseDetected,
                                when,
                            )
                            .await?;
                            AuthSession::revoke_session(tx, sid, RevokeReason::ReuseDetected, when)
                                .await?;
                            Ok(())
                        })
                    })
                    .await?;

                Err(AuthError::RefreshReuseDetected)
            }
        }
    }

    /// Revoke the presented refresh credential and its session. Zero
    /// affected rows is not an error, replaying the call is a no-op.
    pub async fn logout_by_refresh(&mut self, refresh_token: &str) -> Result<(), AuthError> {
        let claims = self.codec.decode(refresh_token)?;
        if !self.codec.is_type(&claims, TokenType::Refresh) {
            return Err(AuthError::TokenWrongType);
        }

        let jti = claims
            .uuid_claim("jti")
            .ok_or(AuthError::MalformedRefreshToken)?;
        let sid = claims
            .uuid_claim("sid")
            .ok_or(AuthError::MalformedRefreshToken)?;

        let when = Utc::now();
        self.uow
            .transaction::<_, AuthError, _>(|tx| {
                Box::pin(async move {
                    RefreshCredential::revoke_by_jti(tx, jti, RevokeReason::UserLogout, when)
                        .await?;
                    AuthSession::revoke_session(tx, sid, RevokeReason::UserLogout, when).await?;
                    Ok(())
                })
            })
            .await
    }

    /// Global logout: revoke every refresh credential and session of the
    /// user. Outstanding access tokens stay valid until their exp; the
    /// short access TTL is the mitigation.
    pub async fn logout_all(&mut self, user_id: i64) -> Result<(), AuthError> {
        let when = Utc::now();
        let (credentials, sessions) = self
            .uow
            .transaction::<_, AuthError, _>(|tx| {
                Box::pin(async move {
                    let credentials = RefreshCredential::revoke_all_for_user(
                        tx,
                        user_id,
                        RevokeReason::AdminForce,
                        when,
                    )
                    .await?;
                    let sessions = AuthSession::revoke_all_for_user(
                        tx,
                        user_id,
                        RevokeReason::AdminForce,
                        when,
                    )
                    .await?;
                    Ok((credentials, sessions))
                })
            })
            .await?;

        tracing::info!(user_id, credentials, sessions, "global logout");
        Ok(())
    }

    /// Non-revoked sessions of the user, most recently seen first
    pub async fn list_sessions(&mut self, user_id: i64) -> Result<Vec<SessionRead>, AuthError> {
        let sessions = AuthSession::list_active_by_user(self.uow.conn(), user_id).await?;
        Ok(sessions.iter().map(SessionRead::from).collect())
    }
}
