// Refresh Credential Database Model
// One row per issued refresh token; rows are terminal once used or revoked.
//
// Only the SHA-256 hex digest of the serialized token is stored. The raw
// token never touches the database, so a leaked table cannot be replayed.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::models::revoke_reason::RevokeReason;
use crate::schema::refreshtokens;

/// Refresh credential row with rotation-chain bookkeeping.
///
/// Within one `family_id` at most one row is ever active: rotation flips the
/// predecessor to `used_at` in the same statement that observes it active,
/// and the unique index on `token_hash` rules out duplicate successors.
#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Identifiable)]
#[diesel(table_name = refreshtokens)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct RefreshCredential {
    pub id: i64,
    pub user_id: i64,
    pub jti: Uuid,
    pub family_id: Uuid,
    pub session_id: Uuid,
    pub token_hash: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub revoked_reason: Option<RevokeReason>,
    pub replaced_by_jti: Option<Uuid>,
}

/// New refresh credential for insertion
#[derive(Debug, Insertable)]
#[diesel(table_name = refreshtokens)]
pub struct NewRefreshCredential {
    pub user_id: i64,
    pub jti: Uuid,
    pub family_id: Uuid,
    pub session_id: Uuid,
    pub token_hash: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Errors for refresh credential operations
#[derive(thiserror::Error, Debug)]
pub enum RefreshTokenError {
    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("Credential not found")]
    NotFound,

    #[error("Credential not active (used, revoked or expired)")]
    NotActive,

    #[error("Rotation failed: {0}")]
    Rotate(String),
}

impl RefreshCredential {
    /// SHA-256 hex digest of a serialized token, the stored lookup key
    pub fn hash_token(token: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// The active predicate: never used, never revoked, not yet expired
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.used_at.is_none() && self.revoked_at.is_none() && self.expires_at > now
    }

    pub fn is_active(&self) -> bool {
        self.is_active_at(Utc::now())
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }

    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }

    pub fn is_used(&self) -> bool {
        self.used_at.is_some()
    }

    pub async fn create_refresh(
        conn: &mut AsyncPgConnection,
        user_id_val: i64,
        jti_val: Uuid,
        family_id_val: Uuid,
        session_id_val: Uuid,
        token_hash_val: String,
        issued_at_val: DateTime<Utc>,
        expires_at_val: DateTime<Utc>,
    ) -> Result<Self, RefreshTokenError> {
        use crate::schema::refreshtokens::dsl::*;

        let new_credential = NewRefreshCredential {
            user_id: user_id_val,
            jti: jti_val,
            family_id: family_id_val,
            session_id: session_id_val,
            token_hash: token_hash_val,
            issued_at: issued_at_val,
            expires_at: expires_at_val,
        };

        diesel::insert_into(refreshtokens)
            .values(&new_credential)
            .get_result::<RefreshCredential>(conn)
            .await
            .map_err(RefreshTokenError::Database)
    }

    pub async fn get_by_jti(
        conn: &mut AsyncPgConnection,
        jti_val: Uuid,
    ) -> Result<Self, RefreshTokenError> {
        use crate::schema::refreshtokens::dsl::*;

        refreshtokens
            .filter(jti.eq(jti_val))
            .first::<RefreshCredential>(conn)
            .await
            .map_err(|e| match e {
                diesel::result::Error::NotFound => RefreshTokenError::NotFound,
                _ => RefreshTokenError::Database(e),
            })
    }

    /// Lookup by stored hash, applying the active predicate in SQL
    pub async fn get_active_by_hash(
        conn: &mut AsyncPgConnection,
        token_hash_val: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Self>, RefreshTokenError> {
        use crate::schema::refreshtokens::dsl::*;

        let row = refreshtokens
            .filter(token_hash.eq(token_hash_val))
            .filter(used_at.is_null())
            .filter(revoked_at.is_null())
            .filter(expires_at.gt(now))
            .first::<RefreshCredential>(conn)
            .await
            .optional()?;

        Ok(row)
    }

    /// Atomic rotation: consume the predecessor and insert its successor.
    ///
    /// The UPDATE carries the full active predicate in its WHERE clause, so
    /// under concurrent redemption of the same token exactly one caller sees
    /// the returned row; every other caller gets `NotActive`. The successor
    /// inherits `user_id`, `family_id` and `session_id` from the predecessor.
    /// Must run inside the caller's transaction.
    pub async fn rotate_active(
        conn: &mut AsyncPgConnection,
        old_token_hash: &str,
        new_jti: Uuid,
        new_token_hash: String,
        issued_at_val: DateTime<Utc>,
        expires_at_val: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Self, RefreshTokenError> {
        use crate::schema::refreshtokens::dsl::*;

        let prior = diesel::update(
            refreshtokens
                .filter(token_hash.eq(old_token_hash))
                .filter(used_at.is_null())
                .filter(revoked_at.is_null())
                .filter(expires_at.gt(now)),
        )
        .set((
            used_at.eq(Some(now)),
            replaced_by_jti.eq(Some(new_jti)),
            revoked_reason.eq(Some(RevokeReason::Rotated)),
        ))
        .get_result::<RefreshCredential>(conn)
        .await
        .optional()?
        .ok_or(RefreshTokenError::NotActive)?;

        let successor = NewRefreshCredential {
            user_id: prior.user_id,
            jti: new_jti,
            family_id: prior.family_id,
            session_id: prior.session_id,
            token_hash: new_token_hash,
            issued_at: issued_at_val,
            expires_at: expires_at_val,
        };

        diesel::insert_into(refreshtokens)
            .values(&successor)
            .get_result::<RefreshCredential>(conn)
            .await
            .map_err(|e| RefreshTokenError::Rotate(e.to_string()))
    }

    /// Revoke one credential by jti; idempotent
    pub async fn revoke_by_jti(
        conn: &mut AsyncPgConnection,
        jti_val: Uuid,
        reason: RevokeReason,
        when: DateTime<Utc>,
    ) -> Result<usize, RefreshTokenError> {
        use crate::schema::refreshtokens::dsl::*;

        let updated = diesel::update(
            refreshtokens
                .filter(jti.eq(jti_val))
                .filter(revoked_at.is_null()),
        )
        .set((revoked_at.eq(Some(when)), revoked_reason.eq(Some(reason))))
        .execute(conn)
        .await?;

        Ok(updated)
    }

    /// Revoke every non-revoked credential in a rotation family
    pub async fn revoke_family(
        conn: &mut AsyncPgConnection,
        family_id_val: Uuid,
        reason: RevokeReason,
        when: DateTime<Utc>,
    ) -> Result<usize, RefreshTokenError> {
        use crate::schema::refreshtokens::dsl::*;

        let updated = diesel::update(
            refreshtokens
                .filter(family_id.eq(family_id_val))
                .filter(revoked_at.is_null()),
        )
        .set((revoked_at.eq(Some(when)), revoked_reason.eq(Some(reason))))
        .execute(conn)
        .await?;

        Ok(updated)
    }

    /// Revoke every non-revoked credential bound to a session
    pub async fn revoke_by_session(
        conn: &mut AsyncPgConnection,
        session_id_val: Uuid,
        reason: RevokeReason,
        when: DateTime<Utc>,
    ) -> Result<usize, RefreshTokenError> {
        use crate::schema::refreshtokens::dsl::*;

        let updated = diesel::update(
            refreshtokens
                .filter(session_id.eq(session_id_val))
                .filter(revoked_at.is_null()),
        )
        .set((revoked_at.eq(Some(when)), revoked_reason.eq(Some(reason))))
        .execute(conn)
        .await?;

        Ok(updated)
    }

    /// Revoke every non-revoked credential of a user; returns affected count
    pub async fn revoke_all_for_user(
        conn: &mut AsyncPgConnection,
        user_id_val: i64,
        reason: RevokeReason,
        when: DateTime<Utc>,
    ) -> Result<usize, RefreshTokenError> {
        use crate::schema::refreshtokens::dsl::*;

        let updated = diesel::update(
            refreshtokens
                .filter(user_id.eq(user_id_val))
                .filter(revoked_at.is_null()),
        )
        .set((revoked_at.eq(Some(when)), revoked_reason.eq(Some(reason))))
        .execute(conn)
        .await?;

        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_token_hashing() {
        let hash1 = RefreshCredential::hash_token("token-one");
        let hash2 = RefreshCredential::hash_token("token-two");

        assert_ne!(hash1, hash2);
        assert_eq!(hash1, RefreshCredential::hash_token("token-one"));

        // SHA-256 produces 32 bytes = 64 hex chars
        assert_eq!(hash1.len(), 64);
        assert!(hash1.chars().all(|c| c.is_ascii_hexdigit()));
    }

    fn sample_credential(now: DateTime<Utc>) -> RefreshCredential {
        RefreshCredential {
            id: 1,
            user_id: 42,
            jti: Uuid::new_v4(),
            family_id: Uuid::new_v4(),
            session_id: Uuid::new_v4(),
            token_hash: RefreshCredential::hash_token("sample"),
            issued_at: now - Duration::hours(1),
            expires_at: now + Duration::days(14),
            used_at: None,
            revoked_at: None,
            revoked_reason: None,
            replaced_by_jti: None,
        }
    }

    #[test]
    fn test_active_predicate_from_local_columns() {
        let now = Utc::now();
        let active = sample_credential(now);
        assert!(active.is_active_at(now));

        let used = RefreshCredential {
            used_at: Some(now - Duration::minutes(5)),
            revoked_reason: Some(RevokeReason::Rotated),
            replaced_by_jti: Some(Uuid::new_v4()),
            ..active.clone()
        };
        assert!(!used.is_active_at(now));
        assert!(used.is_used());
        assert!(!used.is_revoked());

        let revoked = RefreshCredential {
            revoked_at: Some(now - Duration::minutes(5)),
            revoked_reason: Some(RevokeReason::UserLogout),
            ..active.clone()
        };
        assert!(!revoked.is_active_at(now));
        assert!(revoked.is_revoked());

        let expired = RefreshCredential {
            expires_at: now - Duration::seconds(1),
            ..active.clone()
        };
        assert!(!expired.is_active_at(now));
    }

    #[test]
    fn test_expiry_boundary_is_exclusive() {
        let now = Utc::now();
        let credential = RefreshCredential {
            expires_at: now,
            ..sample_credential(now)
        };

        // expires_at == now is already inactive: the predicate is expires_at > now
        assert!(!credential.is_active_at(now));
    }
}
