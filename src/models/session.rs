// Auth Session Database Model
// One row per device/browser binding; terminal state is revoked

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use ipnetwork::IpNetwork;
use serde::Serialize;
use uuid::Uuid;

use crate::models::revoke_reason::RevokeReason;
use crate::schema::authsessions;

/// Session row. `session_id` is the public handle (the `sid` claim);
/// `id` stays internal.
///
/// Once `revoked_at` is set the row is terminal: every mutating operation
/// here is guarded by `revoked_at IS NULL`, so the timestamp and reason can
/// never be overwritten and `last_seen_at` never moves again.
#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = authsessions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct AuthSession {
    pub id: i64,
    pub user_id: i64,
    pub session_id: Uuid,
    pub user_agent: Option<String>,
    pub ip_address: Option<IpNetwork>,
    pub last_seen_at: Option<DateTime<Utc>>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub revoked_reason: Option<RevokeReason>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// New session for insertion
#[derive(Debug, Insertable)]
#[diesel(table_name = authsessions)]
pub struct NewAuthSession {
    pub user_id: i64,
    pub session_id: Uuid,
    pub user_agent: Option<String>,
    pub ip_address: Option<IpNetwork>,
    pub last_seen_at: Option<DateTime<Utc>>,
}

/// Outward-facing session representation
#[derive(Debug, Clone, Serialize)]
pub struct SessionRead {
    pub session_id: Uuid,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_seen_at: Option<DateTime<Utc>>,
}

impl From<&AuthSession> for SessionRead {
    fn from(session: &AuthSession) -> Self {
        SessionRead {
            session_id: session.session_id,
            user_agent: session.user_agent.clone(),
            ip_address: session.ip_address.map(|net| net.ip().to_string()),
            created_at: session.created_at,
            last_seen_at: session.last_seen_at,
        }
    }
}

/// Errors for session persistence operations
#[derive(thiserror::Error, Debug)]
pub enum SessionError {
    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("Session not found")]
    NotFound,
}

impl AuthSession {
    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }

    pub async fn create_session(
        conn: &mut AsyncPgConnection,
        user_id_val: i64,
        session_id_val: Uuid,
        user_agent_val: Option<String>,
        ip_address_val: Option<IpNetwork>,
        last_seen_at_val: DateTime<Utc>,
    ) -> Result<Self, SessionError> {
        use crate::schema::authsessions::dsl::*;

        let new_session = NewAuthSession {
            user_id: user_id_val,
            session_id: session_id_val,
            user_agent: user_agent_val,
            ip_address: ip_address_val,
            last_seen_at: Some(last_seen_at_val),
        };

        diesel::insert_into(authsessions)
            .values(&new_session)
            .get_result::<AuthSession>(conn)
            .await
            .map_err(SessionError::Database)
    }

    pub async fn get_by_session_id(
        conn: &mut AsyncPgConnection,
        session_id_val: Uuid,
    ) -> Result<Self, SessionError> {
        use crate::schema::authsessions::dsl::*;

        authsessions
            .filter(session_id.eq(session_id_val))
            .first::<AuthSession>(conn)
            .await
            .map_err(|e| match e {
                diesel::result::Error::NotFound => SessionError::NotFound,
                _ => SessionError::Database(e),
            })
    }

    /// Non-revoked sessions of a user, most recently seen first
    pub async fn list_active_by_user(
        conn: &mut AsyncPgConnection,
        user_id_val: i64,
    ) -> Result<Vec<Self>, SessionError> {
        use crate::schema::authsessions::dsl::*;

        let rows = authsessions
            .filter(user_id.eq(user_id_val))
            .filter(revoked_at.is_null())
            .order(last_seen_at.desc())
            .load::<AuthSession>(conn)
            .await?;

        Ok(rows)
    }

    /// Bump `last_seen_at` on a live session; 0 rows when revoked or unknown
    pub async fn touch(
        conn: &mut AsyncPgConnection,
        session_id_val: Uuid,
        when: DateTime<Utc>,
    ) -> Result<usize, SessionError> {
        use crate::schema::authsessions::dsl::*;

        let updated = diesel::update(
            authsessions
                .filter(session_id.eq(session_id_val))
                .filter(revoked_at.is_null()),
        )
        .set((last_seen_at.eq(Some(when)), updated_at.eq(when)))
        .execute(conn)
        .await?;

        Ok(updated)
    }

    /// Revoke one session; idempotent, 0 rows when already revoked
    pub async fn revoke_session(
        conn: &mut AsyncPgConnection,
        session_id_val: Uuid,
        reason: RevokeReason,
        when: DateTime<Utc>,
    ) -> Result<usize, SessionError> {
        use crate::schema::authsessions::dsl::*;

        let updated = diesel::update(
            authsessions
                .filter(session_id.eq(session_id_val))
                .filter(revoked_at.is_null()),
        )
        .set((
            revoked_at.eq(Some(when)),
            revoked_reason.eq(Some(reason)),
            updated_at.eq(when),
        ))
        .execute(conn)
        .await?;

        Ok(updated)
    }

    /// Revoke every live session of a user; returns affected count
    pub async fn revoke_all_for_user(
        conn: &mut AsyncPgConnection,
        user_id_val: i64,
        reason: RevokeReason,
        when: DateTime<Utc>,
    ) -> Result<usize, SessionError> {
        use crate::schema::authsessions::dsl::*;

        let updated = diesel::update(
            authsessions
                .filter(user_id.eq(user_id_val))
                .filter(revoked_at.is_null()),
        )
        .set((
            revoked_at.eq(Some(when)),
            revoked_reason.eq(Some(reason)),
            updated_at.eq(when),
        ))
        .execute(conn)
        .await?;

        Ok(updated)
    }
}
