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

//! SQLite backend, used by unit tests.

use crate::db::{Db, DbError, DbResult, Executor, TxExecutor, split_schema};
use async_trait::async_trait;
use log::warn;
use sqlx::Transaction;
use sqlx::pool::PoolConnection;
use sqlx::sqlite::{Sqlite, SqliteConnection, SqlitePool};

/// Converts a raw `sqlx` error into a `DbError`.
///
/// SQLite reports constraint violations only through their message, so they are matched by text.
pub fn map_sqlx_error(e: sqlx::Error) -> DbError {
    match e {
        sqlx::Error::ColumnDecode { source, .. } => DbError::DataIntegrityError(source.to_string()),
        sqlx::Error::RowNotFound => DbError::NotFound,
        e => {
            let message = e.to_string();
            if message.contains("UNIQUE constraint failed") {
                DbError::AlreadyExists
            } else if message.contains("FOREIGN KEY constraint failed") {
                DbError::NotFound
            } else {
                DbError::BackendError(message)
            }
        }
    }
}

/// Opens a pool for the database at `conn_str`, which can be `:memory:`.
pub async fn connect(conn_str: &str) -> DbResult<SqliteDb> {
    let pool = SqlitePool::connect(conn_str).await.map_err(map_sqlx_error)?;
    Ok(SqliteDb { pool })
}

/// Executor for SQLite, either on a pooled connection or inside a transaction.
#[derive(Debug)]
pub enum SqliteExecutor {
    /// Queries go straight to a connection taken from the pool.
    PoolExec(PoolConnection<Sqlite>),

    /// Queries go to an open transaction.
    TxExec(Transaction<'static, Sqlite>),
}

impl SqliteExecutor {
    /// Returns the raw connection to pass to `sqlx` queries.
    pub fn conn(&mut self) -> &mut SqliteConnection {
        match self {
            SqliteExecutor::PoolExec(conn) => &mut **conn,
            SqliteExecutor::TxExec(tx) => &mut **tx,
        }
    }

    /// Commits the transaction behind this executor.
    ///
    /// Panics if the executor is not backed by a transaction.
    pub(super) async fn commit(self) -> DbResult<()> {
        let SqliteExecutor::TxExec(tx) = self else {
            unreachable!("Do not call commit on direct executors");
        };
        tx.commit().await.map_err(map_sqlx_error)
    }
}

/// Database backed by a pool of SQLite connections.
pub struct SqliteDb {
    /// Pool shared by all executors of this database.
    pool: SqlitePool,
}

impl SqliteDb {
    /// Returns an executor of the specific type used by this database.
    pub async fn typed_ex(&self) -> DbResult<SqliteExecutor> {
        self.pool.acquire().await.map(SqliteExecutor::PoolExec).map_err(map_sqlx_error)
    }
}

impl Drop for SqliteDb {
    fn drop(&mut self) {
        if !self.pool.is_closed() {
            warn!("Dropping connection without having called close() first");
        }
    }
}

#[async_trait]
impl Db for SqliteDb {
    async fn ex(&self) -> DbResult<Executor> {
        Ok(Executor::Sqlite(self.typed_ex().await?))
    }

    async fn begin(&self) -> DbResult<TxExecutor> {
        let tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        Ok(TxExecutor(Executor::Sqlite(SqliteExecutor::TxExec(tx))))
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

/// Runs every statement in `schema` on `e`.
pub async fn run_schema(e: &mut SqliteExecutor, schema: &str) -> DbResult<()> {
    for query_str in split_schema(schema)? {
        sqlx::query(&query_str).execute(e.conn()).await.map_err(map_sqlx_error)?;
    }
    Ok(())
}

/// Test utilities for the SQLite connection.
#[cfg(any(feature = "testutils", test))]
pub mod testutils {
    use super::*;

    /// Opens a fresh in-memory database, shared by the connections of its pool.
    ///
    /// Panics on any error.
    pub async fn setup() -> SqliteDb {
        let _can_fail = env_logger::builder().is_test(true).try_init();
        connect(":memory:").await.unwrap()
    }
}
