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

//! Database access shared by all services.
//!
//! PostgreSQL serves production traffic and SQLite backs the unit tests.  Each backend lives in
//! its own module behind a cargo feature of the same name.
//!
//! Services write their queries as free functions that take an `&mut Executor` and match on it
//! to reach the connection of the active backend, so that every backend gets its own SQL.

use crate::model::ModelError;
use async_trait::async_trait;

#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "sqlite")]
pub mod sqlite;

/// Errors reported by the persistence layer.
///
/// Failures that the backend does not classify end up as `BackendError`.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum DbError {
    /// A row could not be inserted because it collides with an existing one.
    #[error("Already exists")]
    AlreadyExists,

    /// The database failed in an unexpected way.
    #[error("Database error: {0}")]
    BackendError(String),

    /// A stored row cannot be turned into a valid domain object.
    #[error("Data integrity error: {0}")]
    DataIntegrityError(String),

    /// The requested row does not exist.
    #[error("Entity not found")]
    NotFound,

    /// The database refused to serve the request, for example when it is out of connections.
    #[error("Unavailable")]
    Unavailable,
}

impl From<ModelError> for DbError {
    fn from(e: ModelError) -> Self {
        DbError::DataIntegrityError(e.0)
    }
}

/// Result type for this module.
pub type DbResult<T> = Result<T, DbError>;

/// Handle to issue queries against whichever backend is in use.
///
/// The handle may sit on a pooled connection or on an open transaction.  Callers match on the
/// variants to reach the typed connection of each backend.
#[derive(Debug)]
pub enum Executor {
    /// Handle for the PostgreSQL backend.
    #[cfg(feature = "postgres")]
    Postgres(postgres::PostgresExecutor),

    /// Handle for the SQLite backend.
    #[cfg(feature = "sqlite")]
    Sqlite(sqlite::SqliteExecutor),
}

/// An `Executor` inside a transaction, which is rolled back on drop unless committed.
#[derive(Debug)]
pub struct TxExecutor(Executor);

impl TxExecutor {
    /// Gives access to the executor so that queries run inside the transaction.
    pub fn ex(&mut self) -> &mut Executor {
        &mut self.0
    }

    /// Makes the changes of the transaction durable.
    pub async fn commit(self) -> DbResult<()> {
        match self.0 {
            #[cfg(feature = "postgres")]
            Executor::Postgres(ex) => ex.commit().await,

            #[cfg(feature = "sqlite")]
            Executor::Sqlite(ex) => ex.commit().await,
        }
    }
}

/// A database that hands out executors.
///
/// Services hold it as `Arc<dyn Db + Send + Sync>` so that tests can inject SQLite.
#[async_trait]
pub trait Db {
    /// Returns an executor on a pooled connection.  Every query commits on its own.
    async fn ex(&self) -> DbResult<Executor>;

    /// Opens a transaction.  The caller must `commit` it for its changes to persist.
    async fn begin(&self) -> DbResult<TxExecutor>;

    /// Closes the pool once all of its connections are returned.
    ///
    /// Later attempts to get an executor fail.
    async fn close(&self);
}

/// Splits a `schema` made of multiple SQL statements into the individual statements.
///
/// Comments are stripped before splitting the schema on semicolons, so semicolons must not appear
/// inside string literals.  Blank statements are skipped.
#[cfg(any(feature = "postgres", feature = "sqlite"))]
fn split_schema(schema: &str) -> DbResult<Vec<String>> {
    let comments = regex::RegexBuilder::new("--.*$")
        .multi_line(true)
        .build()
        .map_err(|e| DbError::BackendError(format!("Invalid comment pattern: {}", e)))?;
    let schema = comments.replace_all(schema, "");

    Ok(schema
        .split(';')
        .map(str::trim)
        .filter(|query_str| !query_str.is_empty())
        .map(str::to_owned)
        .collect())
}

/// Macros to run the same test bodies against every backend.
#[cfg(any(test, feature = "testutils"))]
pub mod testutils {
    pub use paste::paste;

    /// Declares a `#[tokio::test]` called `name` that passes the database returned by `setup`
    /// to `module::name`.  An optional trailing attribute such as `#[ignore]` is applied to it.
    #[macro_export]
    macro_rules! generate_one_test [
        ( $name:ident, $setup:expr, $module:path $(, #[$extra:meta] )? ) => {
            #[tokio::test]
            $(#[$extra])?
            async fn $name() {
                $crate::db::testutils::paste! {
                    $module :: [< $name >]($setup).await;
                }
            }
        }
    ];

    pub use generate_one_test;

    /// Declares one test per `name` with `generate_one_test!`.
    ///
    /// `setup` must evaluate to an `Arc` of a database that already has the schema that the
    /// tests need.  The optional leading attribute is applied to every test.
    #[macro_export]
    macro_rules! generate_tests [
        ( #[$extra:meta], $setup:expr, $module:path $(, $name:ident)+ ) => {
            $(
                $crate::db::testutils::generate_one_test!($name, $setup, $module, #[$extra]);
            )+
        };

        ( $setup:expr, $module:path $(, $name:ident)+ ) => {
            $(
                $crate::db::testutils::generate_one_test!($name, $setup, $module);
            )+
        };
    ];

    pub use generate_tests;
}
