// Middleware modules

pub mod bearer;

pub use bearer::{verify_bearer, AccessBearer, RefreshBearer, VerifiedToken};
