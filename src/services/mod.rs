// Services module
// Business logic layer for the application

pub mod auth;
pub mod token;
pub mod users;

// Re-export commonly used services
pub use auth::{AuthService, TokenPair};
pub use token::{Claims, ExtraClaims, IssuedToken, TokenCodec, TokenError, TokenType};
pub use users::UsersService;
