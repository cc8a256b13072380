// Revocation reason enumeration shared by sessions and refresh credentials
// Maps onto the Postgres enum type `revoke_reason_enum`

use std::io::Write;

use diesel::deserialize::{self, FromSql, FromSqlRow};
use diesel::expression::AsExpression;
use diesel::pg::{Pg, PgValue};
use diesel::serialize::{self, IsNull, Output, ToSql};
use serde::{Deserialize, Serialize};

#[derive(diesel::sql_types::SqlType)]
#[diesel(postgres_type(name = "revoke_reason_enum"))]
pub struct RevokeReasonSqlType;

/// Why a session or refresh credential stopped being usable.
///
/// `Rotated` marks the predecessor in a rotation chain and is the only
/// reason that does not indicate an actively revoked credential.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, FromSqlRow, AsExpression, Serialize, Deserialize,
)]
#[diesel(sql_type = RevokeReasonSqlType)]
#[serde(rename_all = "snake_case")]
pub enum RevokeReason {
    UserLogout,
    ReuseDetected,
    AdminForce,
    PasswordChange,
    Rotated,
}

impl RevokeReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RevokeReason::UserLogout => "user_logout",
            RevokeReason::ReuseDetected => "reuse_detected",
            RevokeReason::AdminForce => "admin_force",
            RevokeReason::PasswordChange => "password_change",
            RevokeReason::Rotated => "rotated",
        }
    }
}

impl ToSql<RevokeReasonSqlType, Pg> for RevokeReason {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        out.write_all(self.as_str().as_bytes())?;
        Ok(IsNull::No)
    }
}

impl FromSql<RevokeReasonSqlType, Pg> for RevokeReason {
    fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
        match bytes.as_bytes() {
            b"user_logout" => Ok(RevokeReason::UserLogout),
            b"reuse_detected" => Ok(RevokeReason::ReuseDetected),
            b"admin_force" => Ok(RevokeReason::AdminForce),
            b"password_change" => Ok(RevokeReason::PasswordChange),
            b"rotated" => Ok(RevokeReason::Rotated),
            other => Err(format!(
                "Unrecognized revoke_reason_enum variant: {}",
                String::from_utf8_lossy(other)
            )
            .into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_labels_match_database_enum() {
        assert_eq!(RevokeReason::UserLogout.as_str(), "user_logout");
        assert_eq!(RevokeReason::ReuseDetected.as_str(), "reuse_detected");
        assert_eq!(RevokeReason::AdminForce.as_str(), "admin_force");
        assert_eq!(RevokeReason::PasswordChange.as_str(), "password_change");
        assert_eq!(RevokeReason::Rotated.as_str(), "rotated");
    }

    #[test]
    fn test_reason_serde_uses_snake_case() {
        let json = serde_json::to_string(&RevokeReason::ReuseDetected).unwrap();
        assert_eq!(json, "\"reuse_detected\"");

        let parsed: RevokeReason = serde_json::from_str("\"rotated\"").unwrap();
        assert_eq!(parsed, RevokeReason::Rotated);
    }
}
