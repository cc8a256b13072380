// Users Service
// Registration, credential verification and password management over the
// unit of work. This is the user-lookup collaborator the auth flows consume.

use chrono::Utc;

use crate::db::UnitOfWork;
use crate::models::revoke_reason::RevokeReason;
use crate::models::{AuthSession, NewUser, RefreshCredential, User, UserError};
use crate::utils::auth_errors::AuthError;
use crate::utils::password::{hash_password, verify_password};

pub struct UsersService<'u> {
    uow: &'u mut UnitOfWork,
    bcrypt_cost: u32,
}

impl<'u> UsersService<'u> {
    pub fn new(uow: &'u mut UnitOfWork, bcrypt_cost: u32) -> Self {
        Self { uow, bcrypt_cost }
    }

    pub async fn get(&mut self, user_id: i64) -> Result<Option<User>, AuthError> {
        match User::find_by_id(self.uow.conn(), user_id).await {
            Ok(user) => Ok(Some(user)),
            Err(UserError::NotFound) => Ok(None),
            Err(UserError::Database(e)) => Err(e.into()),
        }
    }

    /// Create an account. The e-mail is stored lowercased; the password is
    /// stored only as its bcrypt verifier.
    pub async fn register(
        &mut self,
        email: &str,
        raw_password: &str,
        full_name: Option<String>,
    ) -> Result<User, AuthError> {
        let email = email.trim().to_lowercase();
        let hashed = hash_password(raw_password, self.bcrypt_cost)
            .map_err(|e| AuthError::Internal(e.to_string()))?;

        self.uow
            .transaction::<_, AuthError, _>(|tx| {
                Box::pin(async move {
                    if User::email_exists(tx, &email)
                        .await
                        .map_err(|e| AuthError::Internal(e.to_string()))?
                    {
                        return Err(AuthError::EmailAlreadyUsed);
                    }

                    let user = User::create(
                        tx,
                        NewUser {
                            email,
                            hashed_password: hashed,
                            full_name,
                            is_superuser: false,
                            is_active: true,
                        },
                    )
                    .await
                    .map_err(|e| AuthError::Internal(e.to_string()))?;

                    Ok(user)
                })
            })
            .await
    }

    /// Verify credentials. Unknown user and wrong password surface as the
    /// same response to callers; the verifier check always goes through
    /// bcrypt, a stored plaintext value can never match.
    pub async fn authenticate(
        &mut self,
        email: &str,
        raw_password: &str,
    ) -> Result<User, AuthError> {
        let user = match User::find_by_email(self.uow.conn(), email).await {
            Ok(user) => user,
            Err(UserError::NotFound) => return Err(AuthError::UserNotFound),
            Err(UserError::Database(e)) => return Err(e.into()),
        };

        let verified = verify_password(raw_password, &user.hashed_password)
            .map_err(|e| AuthError::Internal(e.to_string()))?;
        if !verified {
            return Err(AuthError::WrongPassword);
        }

        Ok(user)
    }

    /// Replace the password verifier and invalidate everything issued under
    /// the old one: all sessions and refresh credentials of the user are
    /// revoked with reason `password_change` in the same transaction.
    pub async fn change_password(
        &mut self,
        user_id: i64,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let user = match User::find_by_id(self.uow.conn(), user_id).await {
            Ok(user) => user,
            Err(UserError::NotFound) => return Err(AuthError::CurrentUserNotFound),
            Err(UserError::Database(e)) => return Err(e.into()),
        };

        let verified = verify_password(current_password, &user.hashed_password)
            .map_err(|e| AuthError::Internal(e.to_string()))?;
        if !verified {
            return Err(AuthError::WrongPassword);
        }

        let hashed = hash_password(new_password, self.bcrypt_cost)
            .map_err(|e| AuthError::Internal(e.to_string()))?;
        let when = Utc::now();

        self.uow
            .transaction::<_, AuthError, _>(|tx| {
                Box::pin(async move {
                    User::set_password(tx, user_id, &hashed)
                        .await
                        .map_err(|e| AuthError::Internal(e.to_string()))?;

                    RefreshCredential::revoke_all_for_user(
                        tx,
                        user_id,
                        RevokeReason::PasswordChange,
                        when,
                    )
                    .await?;
                    AuthSession::revoke_all_for_user(tx, user_id, RevokeReason::PasswordChange, when)
                        .await?;

                    Ok(())
                })
            })
            .await?;

        tracing::info!(user_id, "password changed, outstanding credentials revoked");
        Ok(())
    }
}
