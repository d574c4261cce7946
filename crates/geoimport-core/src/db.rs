use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};

use crate::error::Result;

pub type DbPool = Pool<Postgres>;

/// Build a lazily-connecting Postgres pool.
///
/// No connection is attempted until the first query runs, so constructing
/// the pool never touches the network and an unreachable database only
/// surfaces once a table replacement starts.
pub fn connect_lazy(database_url: &str) -> Result<DbPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect_lazy(database_url)?;
    Ok(pool)
}
