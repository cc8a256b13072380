pub mod diesel_pool;
pub mod uow;

pub use diesel_pool::{
    check_diesel_health, create_diesel_pool, mask_connection_string, run_migrations,
    DieselDatabaseConfig, DieselPool, MIGRATIONS,
};
pub use uow::{UnitOfWork, UowError};
