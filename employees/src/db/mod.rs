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

//! Database abstraction to manipulate employee records.

use crate::model::{Employee, EmployeeId};
use futures::TryStreamExt;
#[cfg(feature = "postgres")]
use iii_iv_core::db::postgres;
#[cfg(any(feature = "sqlite", test))]
use iii_iv_core::db::sqlite;
use iii_iv_core::db::{DbError, DbResult, Executor};
use sqlx::Row;
#[cfg(feature = "postgres")]
use sqlx::postgres::PgRow;
#[cfg(any(feature = "sqlite", test))]
use sqlx::sqlite::SqliteRow;


/// Initializes the database schema.
pub(crate) async fn init_schema(ex: &mut Executor) -> DbResult<()> {
    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => postgres::run_schema(ex, include_str!("postgres.sql")).await,

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => sqlite::run_schema(ex, include_str!("sqlite.sql")).await,

        #[allow(unused)]
        _ => unreachable!(),
    }
}

#[cfg(feature = "postgres")]
impl TryFrom<PgRow> for Employee {
    type Error = DbError;

    fn try_from(row: PgRow) -> DbResult<Self> {
        let id: i64 = row.try_get("id").map_err(postgres::map_sqlx_error)?;
        let first_name: String = row.try_get("first_name").map_err(postgres::map_sqlx_error)?;
        let last_name: String = row.try_get("last_name").map_err(postgres::map_sqlx_error)?;
        let email: String = row.try_get("email").map_err(postgres::map_sqlx_error)?;

        Ok(Employee::new(Some(EmployeeId::new(id)?), first_name, last_name, email))
    }
}

#[cfg(any(feature = "sqlite", test))]
impl TryFrom<SqliteRow> for Employee {
    type Error = DbError;

    fn try_from(row: SqliteRow) -> DbResult<Self> {
        let id: i64 = row.try_get("id").map_err(sqlite::map_sqlx_error)?;
        let first_name: String = row.try_get("first_name").map_err(sqlite::map_sqlx_error)?;
        let last_name: String = row.try_get("last_name").map_err(sqlite::map_sqlx_error)?;
        let email: String = row.try_get("email").map_err(sqlite::map_sqlx_error)?;

        Ok(Employee::new(Some(EmployeeId::new(id)?), first_name, last_name, email))
    }
}

/// Gets all employees, sorted by their identifier.
pub(crate) async fn find_all(ex: &mut Executor) -> DbResult<Vec<Employee>> {
    let query_str = "SELECT * FROM employees ORDER BY id";

    let mut employees = vec![];
    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let mut rows = sqlx::query(query_str).fetch(ex.conn());
            while let Some(row) = rows.try_next().await.map_err(postgres::map_sqlx_error)? {
                employees.push(Employee::try_from(row)?);
            }
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let mut rows = sqlx::query(query_str).fetch(ex.conn());
            while let Some(row) = rows.try_next().await.map_err(sqlite::map_sqlx_error)? {
                employees.push(Employee::try_from(row)?);
            }
        }

        #[allow(unused)]
        _ => unreachable!(),
    }
    Ok(employees)
}

/// Gets the employee identified by `id`.
pub(crate) async fn find_by_id(ex: &mut Executor, id: EmployeeId) -> DbResult<Employee> {
    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "SELECT * FROM employees WHERE id = $1";
            let row = sqlx::query(query_str)
                .bind(id.as_i64())
                .fetch_one(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            Employee::try_from(row)
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "SELECT * FROM employees WHERE id = ?";
            let row = sqlx::query(query_str)
                .bind(id.as_i64())
                .fetch_one(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            Employee::try_from(row)
        }

        #[allow(unused)]
        _ => unreachable!(),
    }
}

/// Inserts a new row for `employee` and returns the identifier assigned to it.
async fn insert(ex: &mut Executor, employee: &Employee) -> DbResult<EmployeeId> {
    let id: i64 = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "
                INSERT INTO employees (first_name, last_name, email)
                VALUES ($1, $2, $3)
                RETURNING id";
            let row = sqlx::query(query_str)
                .bind(employee.first_name().as_str())
                .bind(employee.last_name().as_str())
                .bind(employee.email().as_str())
                .fetch_one(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            row.try_get("id").map_err(postgres::map_sqlx_error)?
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "INSERT INTO employees (first_name, last_name, email) VALUES (?, ?, ?)";
            let done = sqlx::query(query_str)
                .bind(employee.first_name().as_str())
                .bind(employee.last_name().as_str())
                .bind(employee.email().as_str())
                .execute(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            done.last_insert_rowid()
        }

        #[allow(unused)]
        _ => unreachable!(),
    };

    Ok(EmployeeId::new(id)?)
}

/// Replaces all fields of the existing row identified by `id` with those in `employee`.
async fn update(ex: &mut Executor, id: EmployeeId, employee: &Employee) -> DbResult<()> {
    let rows_affected = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "
                UPDATE employees SET first_name = $1, last_name = $2, email = $3
                WHERE id = $4";
            let done = sqlx::query(query_str)
                .bind(employee.first_name().as_str())
                .bind(employee.last_name().as_str())
                .bind(employee.email().as_str())
                .bind(id.as_i64())
                .execute(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            done.rows_affected()
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "
                UPDATE employees SET first_name = ?, last_name = ?, email = ?
                WHERE id = ?";
            let done = sqlx::query(query_str)
                .bind(employee.first_name().as_str())
                .bind(employee.last_name().as_str())
                .bind(employee.email().as_str())
                .bind(id.as_i64())
                .execute(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            done.rows_affected()
        }

        #[allow(unused)]
        _ => unreachable!(),
    };

    match rows_affected {
        0 => Err(DbError::NotFound),
        1 => Ok(()),
        n => Err(DbError::BackendError(format!("Update affected {} rows instead of 1", n))),
    }
}

/// Persists `employee` and returns it as stored.
///
/// An employee without an identifier is inserted as a new row and gets a fresh identifier.  An
/// employee with an identifier replaces the existing row with that identifier, and the operation
/// fails with `NotFound` if there is no such row: rows are never created with a caller-chosen
/// identifier.
pub(crate) async fn save(ex: &mut Executor, employee: Employee) -> DbResult<Employee> {
    match *employee.id() {
        None => {
            let id = insert(ex, &employee).await?;
            Ok(employee.with_id(id))
        }
        Some(id) => {
            update(ex, id, &employee).await?;
            Ok(employee)
        }
    }
}

/// Deletes the employee identified by `id`.
///
/// Deleting an employee that does not exist fails with `NotFound`.
pub(crate) async fn delete_by_id(ex: &mut Executor, id: EmployeeId) -> DbResult<()> {
    let rows_affected = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "DELETE FROM employees WHERE id = $1";
            let done = sqlx::query(query_str)
                .bind(id.as_i64())
                .execute(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            done.rows_affected()
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "DELETE FROM employees WHERE id = ?";
            let done = sqlx::query(query_str)
                .bind(id.as_i64())
                .execute(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            done.rows_affected()
        }

        #[allow(unused)]
        _ => unreachable!(),
    };

    match rows_affected {
        0 => Err(DbError::NotFound),
        1 => Ok(()),
        n => Err(DbError::BackendError(format!("Deletion affected {} rows instead of 1", n))),
    }
}
