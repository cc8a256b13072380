// Unit of Work: one request, one connection, explicit transaction scopes
//
// A `UnitOfWork` checks a connection out of the pool for the lifetime of one
// logical request. Repository calls bind to that connection, so everything a
// service does inside a `transaction` scope commits or rolls back together:
// the closure returning `Ok` commits, returning `Err` rolls back. Calling
// `transaction` again on the connection from inside an open scope opens a
// SAVEPOINT (diesel's ANSI transaction manager), which is the nested
// locally-atomic scope used by multi-step operations.

use bb8::PooledConnection;
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::{AsyncConnection, AsyncPgConnection};
use scoped_futures::ScopedBoxFuture;

use crate::db::DieselPool;

type OwnedConn = PooledConnection<'static, AsyncDieselConnectionManager<AsyncPgConnection>>;

/// Errors raised while acquiring the unit-of-work connection
#[derive(thiserror::Error, Debug)]
pub enum UowError {
    #[error("Connection pool error: {0}")]
    Pool(String),
}

pub struct UnitOfWork {
    conn: OwnedConn,
}

impl UnitOfWork {
    /// Check a connection out of the pool for this request
    pub async fn new(pool: &DieselPool) -> Result<Self, UowError> {
        let conn = pool
            .get_owned()
            .await
            .map_err(|e| UowError::Pool(e.to_string()))?;

        Ok(Self { conn })
    }

    /// The open connection; repository operations take it as the current
    /// transaction handle.
    pub fn conn(&mut self) -> &mut AsyncPgConnection {
        &mut self.conn
    }

    /// Run `callback` inside a database transaction: commit on `Ok`,
    /// roll back on `Err`.
    pub async fn transaction<'a, R, E, F>(&'a mut self, callback: F) -> Result<R, E>
    where
        F: for<'r> FnOnce(&'r mut AsyncPgConnection) -> ScopedBoxFuture<'a, 'r, Result<R, E>>
            + Send
            + 'a,
        E: From<diesel::result::Error> + Send + 'a,
        R: Send + 'a,
    {
        use std::ops::DerefMut;
        self.conn.deref_mut().transaction(callback).await
    }
}
