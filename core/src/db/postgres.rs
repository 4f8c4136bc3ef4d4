// III-IV
// Copyright 2023 Julio Merino
//
// Licensed under the Apache License, Version 2.0 (the "License"); you may not
// use this file except in compliance with the License.  You may obtain a copy
// of the License at:
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.  See the
// License for the specific language governing permissions and limitations
// under the License.

//! PostgreSQL backend, used in production.

use crate::db::{Db, DbError, DbResult, Executor, TxExecutor, split_schema};
use crate::env::{get_optional_var, get_required_var};
use async_trait::async_trait;
use derivative::Derivative;
use futures::Future;
use log::warn;
use sqlx::Transaction;
use sqlx::pool::PoolConnection;
use sqlx::postgres::{
    PgConnectOptions, PgConnection, PgDatabaseError, PgPool, PgPoolOptions, Postgres,
};
use std::time::Duration;

/// Default value for the `max_retries` configuration property.
const DEFAULT_MAX_RETRIES: u16 = 60;

/// How long to wait for a free connection in the pool before giving up on one attempt.
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(2);

/// Upper bound of the delay between retries, ignoring jitter.
const MAX_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Converts a raw `sqlx` error into a `DbError`, classifying known PostgreSQL error codes.
pub fn map_sqlx_error(e: sqlx::Error) -> DbError {
    match e {
        sqlx::Error::ColumnDecode { source, .. } => DbError::DataIntegrityError(source.to_string()),
        sqlx::Error::Database(e) => match e.downcast_ref::<PgDatabaseError>().code() {
            "23503" /* foreign_key_violation */ => DbError::NotFound,
            "23505" /* unique_violation */ => DbError::AlreadyExists,
            "53300" /* too_many_connections */ => DbError::Unavailable,
            code => DbError::BackendError(format!("pgsql error {}: {}", code, e)),
        },
        sqlx::Error::PoolTimedOut => DbError::Unavailable,
        sqlx::Error::RowNotFound => DbError::NotFound,
        e => DbError::BackendError(e.to_string()),
    }
}

/// Connection settings for a PostgreSQL server.
#[derive(Derivative)]
#[derivative(Debug, Default)]
#[cfg_attr(test, derivative(PartialEq))]
pub struct PostgresOptions {
    /// Server hostname.
    pub host: String,

    /// Server port, usually 5432.
    pub port: u16,

    /// Name of the database holding the service's tables.
    pub database: String,

    /// Role to log in as.
    pub username: String,

    /// Password of the role.  Never printed.
    #[derivative(Debug = "ignore")]
    pub password: String,

    /// Lower bound on the size of the pool, if any.
    pub min_connections: Option<u32>,

    /// Upper bound on the size of the pool, if any.
    pub max_connections: Option<u32>,

    /// How many times to retry getting a connection while the server refuses new ones.
    pub max_retries: u16,
}

impl PostgresOptions {
    /// Reads the options from the `<prefix>_HOST`, `<prefix>_PORT`, `<prefix>_DATABASE`,
    /// `<prefix>_USERNAME` and `<prefix>_PASSWORD` variables, all required, plus the optional
    /// `<prefix>_MIN_CONNECTIONS`, `<prefix>_MAX_CONNECTIONS` and `<prefix>_MAX_RETRIES`.
    pub fn from_env(prefix: &str) -> Result<PostgresOptions, String> {
        Ok(PostgresOptions {
            host: get_required_var::<String>(prefix, "HOST")?,
            port: get_required_var::<u16>(prefix, "PORT")?,
            database: get_required_var::<String>(prefix, "DATABASE")?,
            username: get_required_var::<String>(prefix, "USERNAME")?,
            password: get_required_var::<String>(prefix, "PASSWORD")?,
            min_connections: get_optional_var::<u32>(prefix, "MIN_CONNECTIONS")?,
            max_connections: get_optional_var::<u32>(prefix, "MAX_CONNECTIONS")?,
            max_retries: get_optional_var::<u16>(prefix, "MAX_RETRIES")?
                .unwrap_or(DEFAULT_MAX_RETRIES),
        })
    }

    /// Builds the settings of the pool.
    fn pool_options(&self) -> PgPoolOptions {
        let mut pool_options = PgPoolOptions::new().acquire_timeout(ACQUIRE_TIMEOUT);
        if let Some(n) = self.min_connections {
            pool_options = pool_options.min_connections(n);
        }
        if let Some(n) = self.max_connections {
            pool_options = pool_options.max_connections(n);
        }
        pool_options
    }

    /// Builds the settings of every connection in the pool.
    fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .database(&self.database)
            .username(&self.username)
            .password(&self.password)
    }
}

/// Executor for PostgreSQL, either on a pooled connection or inside a transaction.
#[derive(Debug)]
pub enum PostgresExecutor {
    /// Queries go straight to a connection taken from the pool.
    PoolExec(PoolConnection<Postgres>),

    /// Queries go to an open transaction.
    TxExec(Transaction<'static, Postgres>),
}

impl PostgresExecutor {
    /// Returns the raw connection to pass to `sqlx` queries.
    pub fn conn(&mut self) -> &mut PgConnection {
        match self {
            PostgresExecutor::PoolExec(conn) => &mut **conn,
            PostgresExecutor::TxExec(tx) => &mut **tx,
        }
    }

    /// Commits the transaction behind this executor.
    ///
    /// Panics if the executor is not backed by a transaction.
    pub(super) async fn commit(self) -> DbResult<()> {
        match self {
            PostgresExecutor::PoolExec(_) => unreachable!("Do not call commit on direct executors"),
            PostgresExecutor::TxExec(tx) => tx.commit().await.map_err(map_sqlx_error),
        }
    }
}

/// Returns a random delay of up to `max_ms` milliseconds.
fn jitter(max_ms: u16) -> Duration {
    Duration::from_millis(u64::from(rand::random::<u16>() % max_ms))
}

/// Runs `op` until it stops failing with `Unavailable` or until `retries` are exhausted.
///
/// The delay between attempts grows with random increments until it reaches `MAX_RETRY_DELAY`.
async fn retry<Op, OpFut, T>(op: Op, mut retries: u16) -> DbResult<T>
where
    Op: Fn() -> OpFut,
    OpFut: Future<Output = Result<T, sqlx::Error>>,
    T: Send,
{
    let mut delay = Duration::from_millis(100) + jitter(900);
    loop {
        match op().await.map_err(map_sqlx_error) {
            Err(DbError::Unavailable) if retries > 0 => {
                retries -= 1;
                warn!(
                    "Database is unavailable; waiting {}ms before retrying with {} attempts left",
                    delay.as_millis(),
                    retries
                );
                tokio::time::sleep(delay).await;
                if delay < MAX_RETRY_DELAY {
                    delay += jitter(1000);
                }
            }
            result => return result,
        }
    }
}

/// Database backed by a pool of PostgreSQL connections.
pub struct PostgresDb {
    /// Pool shared by all executors of this database.
    pool: PgPool,

    /// How many times to retry getting a connection while the server refuses new ones.
    max_retries: u16,
}

impl Drop for PostgresDb {
    fn drop(&mut self) {
        if !self.pool.is_closed() {
            if cfg!(debug_assertions) {
                panic!("Dropping connection without having called close() first");
            } else {
                warn!("Dropping connection without having called close() first");
            }
        }
    }
}

impl PostgresDb {
    /// Sets up a pool as described by `opts`.
    ///
    /// Connections are opened lazily, so this does not contact the server.
    pub fn connect(opts: PostgresOptions) -> DbResult<Self> {
        let pool = opts.pool_options().connect_lazy_with(opts.connect_options());
        Ok(Self { pool, max_retries: opts.max_retries })
    }

    /// Returns an executor of the specific type used by this database.
    pub async fn typed_ex(&self) -> DbResult<PostgresExecutor> {
        let conn = retry(|| self.pool.acquire(), self.max_retries).await?;
        Ok(PostgresExecutor::PoolExec(conn))
    }
}

#[async_trait]
impl Db for PostgresDb {
    async fn ex(&self) -> DbResult<Executor> {
        Ok(Executor::Postgres(self.typed_ex().await?))
    }

    async fn begin(&self) -> DbResult<TxExecutor> {
        let tx = retry(|| self.pool.begin(), self.max_retries).await?;
        Ok(TxExecutor(Executor::Postgres(PostgresExecutor::TxExec(tx))))
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

/// Runs every statement in `schema` on `e`.
pub async fn run_schema(e: &mut PostgresExecutor, schema: &str) -> DbResult<()> {
    for query_str in split_schema(schema)? {
        sqlx::query(&query_str).execute(e.conn()).await.map_err(map_sqlx_error)?;
    }
    Ok(())
}

/// Test utilities for the PostgreSQL connection.
#[cfg(any(feature = "testutils", test))]
pub mod testutils {
    use super::*;

    /// Connects to the database configured in the `PGSQL_TEST_*` variables.
    ///
    /// The pool holds exactly one connection whose `search_path` points to `pg_temp`, so any
    /// tables created by a test vanish when the pool is closed.
    ///
    /// Panics on any error.
    pub async fn setup() -> PostgresDb {
        let _can_fail = env_logger::builder().is_test(true).try_init();

        let mut opts = PostgresOptions::from_env("PGSQL_TEST").unwrap();
        opts.min_connections = Some(1);
        opts.max_connections = Some(1);
        let db = PostgresDb::connect(opts).unwrap();

        let mut ex = db.typed_ex().await.unwrap();
        sqlx::query("SET search_path TO pg_temp").execute(ex.conn()).await.unwrap();
        db
    }
}
