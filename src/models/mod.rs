pub mod refresh_token;
pub mod revoke_reason;
pub mod session;
pub mod user;

// Re-export common types
pub use refresh_token::{NewRefreshCredential, RefreshCredential, RefreshTokenError};
pub use revoke_reason::RevokeReason;
pub use session::{AuthSession, NewAuthSession, SessionError, SessionRead};
pub use user::{NewUser, User, UserError, UserRead};
